//! camhal: camera device session controller
//!
//! This crate drives one camera sensor through its lifecycle and routes the
//! frames it produces to a preview surface and to the application.
//!
//! # Features
//! - Operating state machine: idle, connected, previewing, recording and
//!   single-picture capture
//! - Strong rollback: a failed transition leaves the session as it was
//! - Frame fan-out through an optional pixel converter, preview first
//! - Flattened `key=value;...` parameter sets with exposure clamping and
//!   white-balance negotiation
//! - A synthetic sensor, software converter and reference sinks for running
//!   the whole pipeline without hardware
//!
//! # Usage
//! ```rust,no_run
//! use camhal::{CameraSession, SessionConfig, SyntheticSensor};
//! use camhal::convert::SoftwareConverter;
//! use camhal::sinks::{CallbackNotifier, PreviewWindow};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), camhal::SessionError> {
//! let config = SessionConfig::default();
//! let (notifier, events) = CallbackNotifier::new(16);
//! let session = CameraSession::builder(config)
//!     .sensor(SyntheticSensor::new(0, 30))
//!     .preview_sink(Arc::new(PreviewWindow::new()))
//!     .delivery_sink(Arc::new(notifier))
//!     .converter(Arc::new(SoftwareConverter::new()))
//!     .build()?;
//!
//! session.connect()?;
//! session.start_preview()?;
//! session.take_picture()?;
//! let _picture = events.recv();
//! session.close()?;
//! # Ok(())
//! # }
//! ```
pub mod capability;
pub mod config;
pub mod convert;
pub mod device;
pub mod errors;
pub mod format;
pub mod params;
pub mod sensor;
pub mod session;
pub mod sinks;
pub mod timing;

// Testing utilities - synthetic data for offline testing
pub mod testing;

// Re-exports for convenience
pub use capability::{
    DeliverySink, FormatConverter, FrameDescriptor, FrameListener, FrameSink, PreviewSink,
    SensorId, SensorSession,
};
pub use config::{ConfigError, Facing, SessionConfig};
pub use errors::{SessionError, SessionErrorKind};
pub use format::{FourCc, PixelFormat};
pub use params::ParameterSet;
pub use sensor::SyntheticSensor;
pub use session::{CameraInfo, CameraSession, OperatingState, SessionBuilder, SessionDiagnostics};

/// Initialize logging for the camera session
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camhal=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        jpeg: cfg!(feature = "jpeg"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Whether still pictures are JPEG-encoded
    pub jpeg: bool,
}
