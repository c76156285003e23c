use crate::capability::{DeliverySink, FormatConverter, FrameDescriptor, FrameListener, PreviewSink};
use std::sync::{Arc, PoisonError, RwLock};

/// The sensor's frame-arrival hook.
///
/// Fans every frame out to the preview sink first and the delivery sink
/// second. When a converter is wired the frame is converted once, upstream
/// of both sinks. The converter slot is only swapped under the write lock,
/// which waits for any in-flight frame to finish.
pub struct FrameRouter {
    preview: Arc<dyn PreviewSink>,
    delivery: Arc<dyn DeliverySink>,
    converter: RwLock<Option<Arc<dyn FormatConverter>>>,
}

impl FrameRouter {
    pub fn new(preview: Arc<dyn PreviewSink>, delivery: Arc<dyn DeliverySink>) -> Self {
        Self {
            preview,
            delivery,
            converter: RwLock::new(None),
        }
    }

    pub fn attach_converter(&self, converter: Arc<dyn FormatConverter>) {
        *self.converter.write().unwrap_or_else(PoisonError::into_inner) = Some(converter);
    }

    pub fn detach_converter(&self) {
        *self.converter.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_converter(&self) -> bool {
        self.converter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn preview(&self) -> &Arc<dyn PreviewSink> {
        &self.preview
    }

    pub fn delivery(&self) -> &Arc<dyn DeliverySink> {
        &self.delivery
    }

    fn deliver(&self, frame: &FrameDescriptor<'_>) {
        self.preview.on_frame(frame);
        self.delivery.on_frame(frame);
    }
}

impl FrameListener for FrameRouter {
    fn on_next_frame(&self, frame: &FrameDescriptor<'_>) {
        let slot = self.converter.read().unwrap_or_else(PoisonError::into_inner);
        let Some(converter) = slot.as_ref() else {
            self.deliver(frame);
            return;
        };
        let Some(format) = converter.destination_format() else {
            log::warn!("Converter wired without a destination format, dropping frame");
            return;
        };
        match converter.convert(frame) {
            Ok(buffer) => {
                let converted = FrameDescriptor {
                    data: &buffer,
                    fourcc: format.fourcc(),
                    ..*frame
                };
                self.deliver(&converted);
            }
            Err(e) => log::warn!("Dropping frame at {:?}: {}", frame.timestamp, e),
        }
    }

    fn on_device_error(&self, code: i32) {
        log::error!("Sensor reported error {}", code);
        self.delivery.notify_error(code);
    }
}
