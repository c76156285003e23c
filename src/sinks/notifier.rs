//! Delivery of still pictures, recorded video frames and device errors to
//! the application.
//!
//! Events leave through a bounded channel; when the application falls behind
//! new events are dropped and counted rather than stalling the sensor worker.

use crate::capability::{DeliverySink, FrameDescriptor, FrameSink};
use crate::errors::SessionError;
use crate::format::FourCc;
use crate::timing::frame_interval;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureEncoding {
    Jpeg,
    /// Sensor bytes passed through unencoded
    Raw(FourCc),
}

#[derive(Debug, Clone)]
pub struct CapturedPicture {
    pub width: u32,
    pub height: u32,
    pub encoding: PictureEncoding,
    pub quality: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum NotifierEvent {
    Shutter { timestamp: Duration },
    Picture(CapturedPicture),
    VideoFrame {
        timestamp: Duration,
        width: u32,
        height: u32,
        fourcc: FourCc,
        data: Vec<u8>,
    },
    Error(i32),
}

#[derive(Debug)]
struct NotifierState {
    taking_picture: bool,
    jpeg_quality: u8,
    recording: bool,
    video_interval: Duration,
    last_video_frame: Option<Duration>,
    metadata_in_buffers: bool,
}

impl Default for NotifierState {
    fn default() -> Self {
        Self {
            taking_picture: false,
            jpeg_quality: 90,
            recording: false,
            video_interval: Duration::ZERO,
            last_video_frame: None,
            metadata_in_buffers: false,
        }
    }
}

pub struct CallbackNotifier {
    state: Mutex<NotifierState>,
    events: Sender<NotifierEvent>,
    dropped: AtomicU64,
}

impl CallbackNotifier {
    /// Creates the notifier and the receiving end for the application.
    pub fn new(capacity: usize) -> (Self, Receiver<NotifierEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        let notifier = Self {
            state: Mutex::new(NotifierState::default()),
            events: tx,
            dropped: AtomicU64::new(0),
        };
        (notifier, rx)
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn metadata_in_buffers(&self) -> bool {
        self.lock().metadata_in_buffers
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: NotifierEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Notifier receiver gone, event discarded");
            }
        }
    }

    fn encode_picture(frame: &FrameDescriptor<'_>, quality: u8) -> CapturedPicture {
        #[cfg(feature = "jpeg")]
        if frame.fourcc == FourCc::YUYV {
            match encode_jpeg(frame, quality) {
                Ok(data) => {
                    return CapturedPicture {
                        width: frame.width,
                        height: frame.height,
                        encoding: PictureEncoding::Jpeg,
                        quality,
                        data,
                    }
                }
                Err(e) => log::warn!("JPEG encoding failed, delivering raw frame: {}", e),
            }
        }

        CapturedPicture {
            width: frame.width,
            height: frame.height,
            encoding: PictureEncoding::Raw(frame.fourcc),
            quality,
            data: frame.data.to_vec(),
        }
    }
}

#[cfg(feature = "jpeg")]
fn encode_jpeg(frame: &FrameDescriptor<'_>, quality: u8) -> Result<Vec<u8>, String> {
    let rgb = crate::convert::yuyv_to_rgb(frame.data, frame.width, frame.height);
    let image = image::RgbImage::from_raw(frame.width, frame.height, rgb)
        .ok_or("frame data shorter than its dimensions")?;
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(&image)
        .map_err(|e| format!("Failed to encode JPEG: {}", e))?;
    Ok(buf)
}

impl FrameSink for CallbackNotifier {
    fn on_frame(&self, frame: &FrameDescriptor<'_>) {
        let (picture_quality, record) = {
            let mut state = self.lock();
            let picture = state.taking_picture.then_some(state.jpeg_quality);
            state.taking_picture = false;

            let record = state.recording
                && state.last_video_frame.map_or(true, |last| {
                    frame.timestamp.saturating_sub(last) >= state.video_interval
                });
            if record {
                state.last_video_frame = Some(frame.timestamp);
            }
            (picture, record)
        };

        if let Some(quality) = picture_quality {
            self.emit(NotifierEvent::Shutter {
                timestamp: frame.timestamp,
            });
            let picture = Self::encode_picture(frame, quality);
            log::debug!(
                "Picture delivered: {}x{} {:?} ({} bytes)",
                picture.width,
                picture.height,
                picture.encoding,
                picture.data.len()
            );
            self.emit(NotifierEvent::Picture(picture));
        }

        if record {
            self.emit(NotifierEvent::VideoFrame {
                timestamp: frame.timestamp,
                width: frame.width,
                height: frame.height,
                fourcc: frame.fourcc,
                data: frame.data.to_vec(),
            });
        }
    }
}

impl DeliverySink for CallbackNotifier {
    fn arm_for_single_picture(&self, jpeg_quality: u8) {
        let mut state = self.lock();
        state.jpeg_quality = jpeg_quality;
        state.taking_picture = true;
    }

    fn disarm_picture(&self) {
        self.lock().taking_picture = false;
    }

    fn is_picture_pending(&self) -> bool {
        self.lock().taking_picture
    }

    fn enable_video_recording(&self, frame_rate_hint: u32) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.recording = true;
        state.video_interval = frame_interval(frame_rate_hint);
        state.last_video_frame = None;
        log::debug!("Video recording enabled at {} fps", frame_rate_hint);
        Ok(())
    }

    fn disable_video_recording(&self) {
        let mut state = self.lock();
        state.recording = false;
        state.last_video_frame = None;
    }

    fn is_recording_active(&self) -> bool {
        self.lock().recording
    }

    fn store_metadata_in_buffers(&self, enable: bool) -> Result<(), SessionError> {
        self.lock().metadata_in_buffers = enable;
        Ok(())
    }

    fn notify_error(&self, code: i32) {
        self.emit(NotifierEvent::Error(code));
    }

    fn reset(&self) {
        *self.lock() = NotifierState::default();
    }
}
