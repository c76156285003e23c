//! Well-known parameter keys.

pub const PREVIEW_SIZE: &str = "preview-size";
pub const SUPPORTED_PREVIEW_SIZES: &str = "preview-size-values";
pub const PREVIEW_FORMAT: &str = "preview-format";
pub const SUPPORTED_PREVIEW_FORMATS: &str = "preview-format-values";
pub const PREVIEW_FRAME_RATE: &str = "preview-frame-rate";
pub const SUPPORTED_PREVIEW_FRAME_RATES: &str = "preview-frame-rate-values";
pub const PREVIEW_FPS_RANGE: &str = "preview-fps-range";
pub const SUPPORTED_PREVIEW_FPS_RANGE: &str = "preview-fps-range-values";

pub const PICTURE_SIZE: &str = "picture-size";
pub const SUPPORTED_PICTURE_SIZES: &str = "picture-size-values";
pub const PICTURE_FORMAT: &str = "picture-format";
pub const SUPPORTED_PICTURE_FORMATS: &str = "picture-format-values";

pub const VIDEO_SIZE: &str = "video-size";
pub const VIDEO_FRAME_FORMAT: &str = "video-frame-format";
pub const RECORDING_HINT: &str = "recording-hint";

pub const JPEG_QUALITY: &str = "jpeg-quality";
pub const JPEG_THUMBNAIL_WIDTH: &str = "jpeg-thumbnail-width";
pub const JPEG_THUMBNAIL_HEIGHT: &str = "jpeg-thumbnail-height";
pub const JPEG_THUMBNAIL_QUALITY: &str = "jpeg-thumbnail-quality";
pub const SUPPORTED_JPEG_THUMBNAIL_SIZES: &str = "jpeg-thumbnail-size-values";

pub const EXPOSURE_COMPENSATION: &str = "exposure-compensation";
pub const MAX_EXPOSURE_COMPENSATION: &str = "max-exposure-compensation";
pub const MIN_EXPOSURE_COMPENSATION: &str = "min-exposure-compensation";
pub const EXPOSURE_COMPENSATION_STEP: &str = "exposure-compensation-step";

pub const WHITE_BALANCE: &str = "whitebalance";
pub const SUPPORTED_WHITE_BALANCE: &str = "whitebalance-values";

pub const FOCUS_MODE: &str = "focus-mode";
pub const SUPPORTED_FOCUS_MODES: &str = "focus-mode-values";
pub const FOCAL_LENGTH: &str = "focal-length";
pub const HORIZONTAL_VIEW_ANGLE: &str = "horizontal-view-angle";
pub const VERTICAL_VIEW_ANGLE: &str = "vertical-view-angle";

pub const FACING: &str = "prop-facing";
pub const ORIENTATION: &str = "prop-orientation";

pub const TRUE: &str = "true";
pub const FALSE: &str = "false";
