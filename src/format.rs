//! Pixel formats at the two levels the session deals with: the parameter-level
//! names negotiated with the application, and the sensor-level FourCC codes.

use crate::errors::SessionError;
use std::fmt;
use std::str::FromStr;

/// Four-character code identifying a sensor or converted pixel layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(u32);

impl FourCc {
    /// Packed YUV 4:2:2, Y0 U0 Y1 V0.
    pub const YUYV: FourCc = FourCc::new(*b"YUYV");
    /// Planar YUV 4:2:0.
    pub const YU12: FourCc = FourCc::new(*b"YU12");
    /// Semi-planar YUV 4:2:0 with interleaved V/U.
    pub const NV21: FourCc = FourCc::new(*b"NV21");
    pub const RGBP: FourCc = FourCc::new(*b"RGBP");
    pub const AB24: FourCc = FourCc::new(*b"AB24");
    pub const JPEG: FourCc = FourCc::new(*b"JPEG");

    pub const fn new(code: [u8; 4]) -> Self {
        FourCc(u32::from_le_bytes(code))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.bytes() {
            let c = if b.is_ascii_graphic() { b as char } else { '?' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}

/// Pixel format names as they appear in the parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    Yuv420p,
    Yuv420sp,
    Yuv422i,
    Rgb565,
    Rgba8888,
    Jpeg,
}

impl PixelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Yuv420sp => "yuv420sp",
            PixelFormat::Yuv422i => "yuv422i-yuyv",
            PixelFormat::Rgb565 => "rgb565",
            PixelFormat::Rgba8888 => "rgba8888",
            PixelFormat::Jpeg => "jpeg",
        }
    }

    pub fn is_yuv(&self) -> bool {
        matches!(
            self,
            PixelFormat::Yuv420p | PixelFormat::Yuv420sp | PixelFormat::Yuv422i
        )
    }

    /// Layout code of a frame that has been converted into this format.
    pub fn fourcc(&self) -> FourCc {
        match self {
            PixelFormat::Yuv420p => FourCc::YU12,
            PixelFormat::Yuv420sp => FourCc::NV21,
            PixelFormat::Yuv422i => FourCc::YUYV,
            PixelFormat::Rgb565 => FourCc::RGBP,
            PixelFormat::Rgba8888 => FourCc::AB24,
            PixelFormat::Jpeg => FourCc::JPEG,
        }
    }

    /// Buffer size for a frame of this format, `None` for compressed formats.
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Yuv420p | PixelFormat::Yuv420sp => Some(pixels * 3 / 2),
            PixelFormat::Yuv422i | PixelFormat::Rgb565 => Some(pixels * 2),
            PixelFormat::Rgba8888 => Some(pixels * 4),
            PixelFormat::Jpeg => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yuv420p" => Ok(PixelFormat::Yuv420p),
            "yuv420sp" => Ok(PixelFormat::Yuv420sp),
            "yuv422i-yuyv" => Ok(PixelFormat::Yuv422i),
            "rgb565" => Ok(PixelFormat::Rgb565),
            "rgba8888" => Ok(PixelFormat::Rgba8888),
            "jpeg" => Ok(PixelFormat::Jpeg),
            other => Err(SessionError::InvalidFormat(format!(
                "unknown pixel format '{other}'"
            ))),
        }
    }
}

/// Resolves the format the sensor must produce for a preview/video stream.
///
/// Only the YUV family can be streamed.
pub fn preview_source_format(
    requested: PixelFormat,
    native: FourCc,
) -> Result<FourCc, SessionError> {
    if requested.is_yuv() {
        Ok(native)
    } else {
        Err(SessionError::InvalidFormat(format!(
            "{requested} cannot be streamed from the sensor"
        )))
    }
}

/// Resolves the format the sensor must produce for a still picture.
///
/// YUV-family and JPEG-tagged formats are accepted; JPEG is encoded downstream
/// from the sensor's native output.
pub fn picture_source_format(requested: &str, native: FourCc) -> Result<FourCc, SessionError> {
    let unsupported = || {
        SessionError::UnsupportedFormat(format!("picture format '{requested}' is not supported"))
    };
    let format: PixelFormat = requested.parse().map_err(|_| unsupported())?;
    if format.is_yuv() || format == PixelFormat::Jpeg {
        Ok(native)
    } else {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_display() {
        assert_eq!(FourCc::YUYV.to_string(), "YUYV");
        assert_eq!(format!("{:?}", FourCc::NV21), "FourCc(NV21)");
        assert_eq!(FourCc::new([0, b'A', b'B', b'C']).to_string(), "?ABC");
    }

    #[test]
    fn test_fourcc_matches_v4l2_packing() {
        // v4l2_fourcc('Y','U','Y','V')
        let expected =
            (b'Y' as u32) | (b'U' as u32) << 8 | (b'Y' as u32) << 16 | (b'V' as u32) << 24;
        assert_eq!(FourCc::YUYV.as_u32(), expected);
    }

    #[test]
    fn test_pixel_format_names() {
        for format in [
            PixelFormat::Yuv420p,
            PixelFormat::Yuv420sp,
            PixelFormat::Yuv422i,
            PixelFormat::Rgb565,
            PixelFormat::Rgba8888,
            PixelFormat::Jpeg,
        ] {
            assert_eq!(format.as_str().parse::<PixelFormat>().unwrap(), format);
        }
        assert!("bayer".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn test_preview_accepts_yuv_only() {
        assert_eq!(
            preview_source_format(PixelFormat::Yuv420sp, FourCc::YUYV).unwrap(),
            FourCc::YUYV
        );
        let err = preview_source_format(PixelFormat::Jpeg, FourCc::YUYV).unwrap_err();
        assert!(matches!(err, SessionError::InvalidFormat(_)));
    }

    #[test]
    fn test_picture_accepts_jpeg_and_yuv() {
        assert_eq!(picture_source_format("jpeg", FourCc::YUYV).unwrap(), FourCc::YUYV);
        assert_eq!(picture_source_format("yuv420p", FourCc::YUYV).unwrap(), FourCc::YUYV);
        for rejected in ["rgb565", "png", ""] {
            let err = picture_source_format(rejected, FourCc::YUYV).unwrap_err();
            assert!(matches!(err, SessionError::UnsupportedFormat(_)), "{rejected}");
        }
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(PixelFormat::Yuv420p.frame_size(640, 480), Some(460_800));
        assert_eq!(PixelFormat::Rgba8888.frame_size(2, 2), Some(16));
        assert_eq!(PixelFormat::Jpeg.frame_size(640, 480), None);
    }
}
