use crate::capability::{FrameDescriptor, FrameSink, PreviewSink};
use crate::errors::SessionError;
use crate::format::FourCc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Copy of the most recent frame shown in the preview.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCc,
    pub timestamp: Duration,
    pub data: Vec<u8>,
}

/// Headless preview sink: counts frames while active and keeps the latest one.
#[derive(Debug, Default)]
pub struct PreviewWindow {
    active: AtomicBool,
    frames: AtomicU64,
    frame_rate: Mutex<u32>,
    latest: Mutex<Option<PreviewFrame>>,
}

impl PreviewWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_frame(&self) -> Option<PreviewFrame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn frame_rate(&self) -> u32 {
        *self.frame_rate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSink for PreviewWindow {
    fn on_frame(&self, frame: &FrameDescriptor<'_>) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        self.frames.fetch_add(1, Ordering::Relaxed);
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        match latest.as_mut() {
            Some(previous) if previous.data.len() == frame.data.len() => {
                previous.data.copy_from_slice(frame.data);
                previous.width = frame.width;
                previous.height = frame.height;
                previous.fourcc = frame.fourcc;
                previous.timestamp = frame.timestamp;
            }
            _ => {
                *latest = Some(PreviewFrame {
                    width: frame.width,
                    height: frame.height,
                    fourcc: frame.fourcc,
                    timestamp: frame.timestamp,
                    data: frame.data.to_vec(),
                })
            }
        }
    }
}

impl PreviewSink for PreviewWindow {
    fn activate(&self, frame_rate_hint: u32) -> Result<(), SessionError> {
        *self.frame_rate.lock().unwrap_or_else(PoisonError::into_inner) = frame_rate_hint;
        if !self.active.swap(true, Ordering::AcqRel) {
            self.frames.store(0, Ordering::Relaxed);
            log::debug!("Preview window active at {} fps", frame_rate_hint);
        }
        Ok(())
    }

    fn deactivate(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            log::debug!(
                "Preview window inactive after {} frames",
                self.frames.load(Ordering::Relaxed)
            );
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::SensorId;

    fn frame(data: &[u8]) -> FrameDescriptor<'_> {
        FrameDescriptor {
            data,
            width: 2,
            height: 1,
            fourcc: FourCc::YUYV,
            timestamp: Duration::from_millis(5),
            source: SensorId(1),
        }
    }

    #[test]
    fn test_inactive_window_ignores_frames() {
        let window = PreviewWindow::new();
        window.on_frame(&frame(&[1, 2, 3, 4]));
        assert_eq!(window.frame_count(), 0);
        assert!(window.latest_frame().is_none());
    }

    #[test]
    fn test_active_window_counts_and_copies() {
        let window = PreviewWindow::new();
        window.activate(15).unwrap();
        window.on_frame(&frame(&[1, 2, 3, 4]));
        window.on_frame(&frame(&[5, 6, 7, 8]));
        assert_eq!(window.frame_count(), 2);
        assert_eq!(window.frame_rate(), 15);
        assert_eq!(window.latest_frame().unwrap().data, vec![5, 6, 7, 8]);

        window.deactivate();
        assert!(!window.is_active());
        window.on_frame(&frame(&[9, 9, 9, 9]));
        assert_eq!(window.frame_count(), 2);
    }

    #[test]
    fn test_reactivation_resets_count() {
        let window = PreviewWindow::new();
        window.activate(20).unwrap();
        window.on_frame(&frame(&[0; 4]));
        window.deactivate();
        window.activate(20).unwrap();
        assert_eq!(window.frame_count(), 0);
    }
}
