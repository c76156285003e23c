//! Capability contracts the session controller drives.
//!
//! The sensor, the pixel converter and the two frame sinks are collaborators
//! outside the controller; it only sequences calls into them. Sinks and the
//! converter are shared with the sensor's worker thread through the fan-out
//! hook, so their methods take `&self` and implementations keep their own
//! interior locking.

use crate::errors::SessionError;
use crate::format::{FourCc, PixelFormat};
use std::sync::Arc;
use std::time::Duration;

/// Identifies the sensor a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SensorId(pub u32);

/// A produced frame, borrowed for the duration of one fan-out call.
///
/// The sensor owns the pixel buffer; a sink that needs the data afterwards
/// must copy it.
#[derive(Debug, Clone, Copy)]
pub struct FrameDescriptor<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCc,
    /// Monotonic capture time since the sensor's clock origin
    pub timestamp: Duration,
    pub source: SensorId,
}

/// Receives frames and device errors from the sensor's worker.
pub trait FrameListener: Send + Sync {
    fn on_next_frame(&self, frame: &FrameDescriptor<'_>);
    fn on_device_error(&self, code: i32);
}

/// The frame-producing sensor.
///
/// `stop_delivering_frames` must not return until the worker guarantees no
/// further listener call will happen.
pub trait SensorSession: Send {
    fn id(&self) -> SensorId;

    /// Native layout the sensor streams in.
    fn native_format(&self) -> FourCc {
        FourCc::YUYV
    }

    fn set_frame_listener(&mut self, listener: Arc<dyn FrameListener>);

    fn connect(&mut self) -> Result<(), SessionError>;
    fn disconnect(&mut self) -> Result<(), SessionError>;
    fn is_connected(&self) -> bool;

    fn start_device(&mut self, width: u32, height: u32, fourcc: FourCc)
        -> Result<(), SessionError>;
    fn stop_device(&mut self) -> Result<(), SessionError>;
    fn is_started(&self) -> bool;

    fn start_delivering_frames(&mut self, single_frame_only: bool) -> Result<(), SessionError>;
    fn stop_delivering_frames(&mut self);

    /// Exposure compensation in EV.
    fn set_exposure_compensation(&mut self, ev: f32) -> Result<(), SessionError>;
    fn initialize_white_balance_mode(&mut self, mode: &str, red_scale: f32, blue_scale: f32);
    fn set_white_balance_mode(&mut self, mode: &str) -> Result<(), SessionError>;
}

/// Converts sensor frames into the format the application asked for.
pub trait FormatConverter: Send + Sync {
    fn set_destination_format(&self, format: PixelFormat) -> Result<(), SessionError>;
    fn destination_format(&self) -> Option<PixelFormat>;
    fn is_valid(&self) -> bool;
    fn convert(&self, frame: &FrameDescriptor<'_>) -> Result<Vec<u8>, SessionError>;
}

/// Anything that consumes frames during fan-out.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: &FrameDescriptor<'_>);
}

pub trait PreviewSink: FrameSink {
    fn activate(&self, frame_rate_hint: u32) -> Result<(), SessionError>;
    fn deactivate(&self);
    fn is_active(&self) -> bool;
    fn frame_count(&self) -> u64;
}

/// Still-picture and video-recording delivery to the application.
pub trait DeliverySink: FrameSink {
    fn arm_for_single_picture(&self, jpeg_quality: u8);
    fn disarm_picture(&self);
    fn is_picture_pending(&self) -> bool;

    fn enable_video_recording(&self, frame_rate_hint: u32) -> Result<(), SessionError>;
    fn disable_video_recording(&self);
    fn is_recording_active(&self) -> bool;

    fn store_metadata_in_buffers(&self, enable: bool) -> Result<(), SessionError>;
    fn notify_error(&self, code: i32);

    /// Drops picture/recording bookkeeping when the camera closes.
    fn reset(&self);
}
