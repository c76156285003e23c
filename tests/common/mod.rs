//! Recording mocks for session controller tests.
//!
//! Every mock appends to one shared call log so tests can assert the exact
//! order of side effects across the sensor, the converter and both sinks.

#![allow(dead_code)]

use camhal::capability::{
    DeliverySink, FormatConverter, FrameDescriptor, FrameListener, FrameSink, PreviewSink,
    SensorId, SensorSession,
};
use camhal::{CameraSession, FourCc, PixelFormat, SessionConfig, SessionError};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

fn tripped(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

/// Fault flags fail the next matching call once.
fn fires(fault: &AtomicBool) -> bool {
    fault.swap(false, Ordering::SeqCst)
}

#[derive(Default)]
pub struct MockFaults {
    pub connect: AtomicBool,
    pub disconnect: AtomicBool,
    pub start: AtomicBool,
    pub stop: AtomicBool,
    pub delivery: AtomicBool,
    pub exposure: AtomicBool,
    pub white_balance: AtomicBool,
}

/// Holds `start_device` until the test releases it.
pub struct Gate {
    pub entered: Sender<()>,
    pub release: Receiver<()>,
}

/// State shared between a [`MockSensor`] owned by the session and the test.
#[derive(Default)]
pub struct SensorHandle {
    pub faults: MockFaults,
    connected: AtomicBool,
    started: AtomicBool,
    delivering: AtomicBool,
    listener: Mutex<Option<Arc<dyn FrameListener>>>,
    pub exposure_writes: Mutex<Vec<f32>>,
    pub white_balance_writes: Mutex<Vec<String>>,
    pub white_balance_modes: Mutex<Vec<String>>,
    gate: Mutex<Option<Gate>>,
}

impl SensorHandle {
    pub fn is_connected(&self) -> bool {
        tripped(&self.connected)
    }

    pub fn is_started(&self) -> bool {
        tripped(&self.started)
    }

    pub fn is_delivering(&self) -> bool {
        tripped(&self.delivering)
    }

    pub fn install_gate(&self, gate: Gate) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    /// Pushes one YUYV frame through the registered listener, as the sensor
    /// worker would.
    pub fn emit_frame(&self, width: u32, height: u32) {
        let listener = self.listener.lock().unwrap().clone();
        let data = camhal::testing::synthetic_yuyv_frame(0, width, height);
        if let Some(listener) = listener {
            listener.on_next_frame(&FrameDescriptor {
                data: &data,
                width,
                height,
                fourcc: FourCc::YUYV,
                timestamp: Duration::from_millis(1),
                source: SensorId(7),
            });
        }
    }

    pub fn emit_error(&self, code: i32) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener.on_device_error(code);
        }
    }
}

pub struct MockSensor {
    log: CallLog,
    handle: Arc<SensorHandle>,
}

impl SensorSession for MockSensor {
    fn id(&self) -> SensorId {
        SensorId(7)
    }

    fn set_frame_listener(&mut self, listener: Arc<dyn FrameListener>) {
        *self.handle.listener.lock().unwrap() = Some(listener);
    }

    fn connect(&mut self) -> Result<(), SessionError> {
        self.log.push("sensor.connect");
        if fires(&self.handle.faults.connect) {
            return Err(SessionError::DeviceUnavailable("mock sensor absent".into()));
        }
        self.handle.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SessionError> {
        self.log.push("sensor.disconnect");
        if fires(&self.handle.faults.disconnect) {
            return Err(SessionError::hardware("mock disconnect failed"));
        }
        self.handle.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    fn start_device(
        &mut self,
        width: u32,
        height: u32,
        fourcc: FourCc,
    ) -> Result<(), SessionError> {
        let gate = self.handle.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.send(()).unwrap();
            gate.release.recv().unwrap();
        }
        self.log
            .push(format!("sensor.start_device {}x{} {}", width, height, fourcc));
        if fires(&self.handle.faults.start) {
            return Err(SessionError::hardware("mock start failed"));
        }
        self.handle.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_device(&mut self) -> Result<(), SessionError> {
        self.log.push("sensor.stop_device");
        if fires(&self.handle.faults.stop) {
            return Err(SessionError::hardware("mock stop failed"));
        }
        self.handle.delivering.store(false, Ordering::SeqCst);
        self.handle.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.handle.is_started()
    }

    fn start_delivering_frames(&mut self, single_frame_only: bool) -> Result<(), SessionError> {
        self.log
            .push(format!("sensor.start_delivery single={}", single_frame_only));
        if fires(&self.handle.faults.delivery) {
            return Err(SessionError::hardware("mock delivery failed"));
        }
        self.handle.delivering.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_delivering_frames(&mut self) {
        self.log.push("sensor.stop_delivery");
        self.handle.delivering.store(false, Ordering::SeqCst);
    }

    fn set_exposure_compensation(&mut self, ev: f32) -> Result<(), SessionError> {
        self.log.push(format!("sensor.exposure {}", ev));
        if fires(&self.handle.faults.exposure) {
            return Err(SessionError::hardware("mock exposure failed"));
        }
        self.handle.exposure_writes.lock().unwrap().push(ev);
        Ok(())
    }

    fn initialize_white_balance_mode(&mut self, mode: &str, _red_scale: f32, _blue_scale: f32) {
        self.handle
            .white_balance_modes
            .lock()
            .unwrap()
            .push(mode.to_string());
    }

    fn set_white_balance_mode(&mut self, mode: &str) -> Result<(), SessionError> {
        self.log.push(format!("sensor.white_balance {}", mode));
        if fires(&self.handle.faults.white_balance) {
            return Err(SessionError::hardware("mock white balance failed"));
        }
        self.handle
            .white_balance_writes
            .lock()
            .unwrap()
            .push(mode.to_string());
        Ok(())
    }
}

pub struct MockPreview {
    log: CallLog,
    active: AtomicBool,
    frames: AtomicU64,
    pub last_fourcc: Mutex<Option<FourCc>>,
    pub fail_activate: AtomicBool,
}

impl FrameSink for MockPreview {
    fn on_frame(&self, frame: &FrameDescriptor<'_>) {
        self.log.push("preview.frame");
        self.frames.fetch_add(1, Ordering::SeqCst);
        *self.last_fourcc.lock().unwrap() = Some(frame.fourcc);
    }
}

impl PreviewSink for MockPreview {
    fn activate(&self, frame_rate_hint: u32) -> Result<(), SessionError> {
        self.log.push(format!("preview.activate {}", frame_rate_hint));
        if fires(&self.fail_activate) {
            return Err(SessionError::hardware("mock window lost"));
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&self) {
        self.log.push("preview.deactivate");
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        tripped(&self.active)
    }

    fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

pub struct MockDelivery {
    log: CallLog,
    picture_pending: AtomicBool,
    recording: AtomicBool,
    pub metadata_in_buffers: AtomicBool,
    pub errors: Mutex<Vec<i32>>,
    pub pictures: AtomicU64,
    pub fail_recording: AtomicBool,
}

impl FrameSink for MockDelivery {
    fn on_frame(&self, _frame: &FrameDescriptor<'_>) {
        self.log.push("delivery.frame");
        if self.picture_pending.swap(false, Ordering::SeqCst) {
            self.pictures.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl DeliverySink for MockDelivery {
    fn arm_for_single_picture(&self, jpeg_quality: u8) {
        self.log.push(format!("delivery.arm {}", jpeg_quality));
        self.picture_pending.store(true, Ordering::SeqCst);
    }

    fn disarm_picture(&self) {
        self.log.push("delivery.disarm");
        self.picture_pending.store(false, Ordering::SeqCst);
    }

    fn is_picture_pending(&self) -> bool {
        tripped(&self.picture_pending)
    }

    fn enable_video_recording(&self, frame_rate_hint: u32) -> Result<(), SessionError> {
        self.log.push(format!("delivery.record {}", frame_rate_hint));
        if fires(&self.fail_recording) {
            return Err(SessionError::hardware("mock encoder refused"));
        }
        self.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable_video_recording(&self) {
        self.log.push("delivery.stop_record");
        self.recording.store(false, Ordering::SeqCst);
    }

    fn is_recording_active(&self) -> bool {
        tripped(&self.recording)
    }

    fn store_metadata_in_buffers(&self, enable: bool) -> Result<(), SessionError> {
        self.metadata_in_buffers.store(enable, Ordering::SeqCst);
        Ok(())
    }

    fn notify_error(&self, code: i32) {
        self.errors.lock().unwrap().push(code);
    }

    fn reset(&self) {
        self.log.push("delivery.reset");
        self.picture_pending.store(false, Ordering::SeqCst);
        self.recording.store(false, Ordering::SeqCst);
    }
}

pub struct MockConverter {
    log: CallLog,
    destination: Mutex<Option<PixelFormat>>,
    pub reject_destination: AtomicBool,
    pub report_invalid: AtomicBool,
    pub conversions: AtomicU64,
}

impl FormatConverter for MockConverter {
    fn set_destination_format(&self, format: PixelFormat) -> Result<(), SessionError> {
        self.log.push(format!("converter.set {}", format));
        if fires(&self.reject_destination) {
            return Err(SessionError::hardware("mock converter refused"));
        }
        *self.destination.lock().unwrap() = Some(format);
        Ok(())
    }

    fn destination_format(&self) -> Option<PixelFormat> {
        *self.destination.lock().unwrap()
    }

    fn is_valid(&self) -> bool {
        !tripped(&self.report_invalid) && self.destination_format().is_some()
    }

    fn convert(&self, frame: &FrameDescriptor<'_>) -> Result<Vec<u8>, SessionError> {
        self.log.push("converter.convert");
        self.conversions.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0u8; frame.data.len()])
    }
}

/// A session wired to recording mocks.
pub struct Rig {
    pub session: CameraSession,
    pub log: CallLog,
    pub sensor: Arc<SensorHandle>,
    pub preview: Arc<MockPreview>,
    pub delivery: Arc<MockDelivery>,
    pub converter: Arc<MockConverter>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let log = CallLog::default();
        let sensor = Arc::new(SensorHandle::default());
        let preview = Arc::new(MockPreview {
            log: log.clone(),
            active: AtomicBool::new(false),
            frames: AtomicU64::new(0),
            last_fourcc: Mutex::new(None),
            fail_activate: AtomicBool::new(false),
        });
        let delivery = Arc::new(MockDelivery {
            log: log.clone(),
            picture_pending: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            metadata_in_buffers: AtomicBool::new(false),
            errors: Mutex::new(Vec::new()),
            pictures: AtomicU64::new(0),
            fail_recording: AtomicBool::new(false),
        });
        let converter = Arc::new(MockConverter {
            log: log.clone(),
            destination: Mutex::new(None),
            reject_destination: AtomicBool::new(false),
            report_invalid: AtomicBool::new(false),
            conversions: AtomicU64::new(0),
        });

        let session = CameraSession::builder(config)
            .sensor(MockSensor {
                log: log.clone(),
                handle: sensor.clone(),
            })
            .preview_sink(preview.clone())
            .delivery_sink(delivery.clone())
            .converter(converter.clone())
            .build()
            .expect("session builds with all capabilities");
        log.clear();

        Self {
            session,
            log,
            sensor,
            preview,
            delivery,
            converter,
        }
    }

    /// Rig already previewing, with the call log cleared.
    pub fn previewing() -> Self {
        let rig = Self::new();
        rig.session.connect().unwrap();
        rig.session.start_preview().unwrap();
        rig.log.clear();
        rig
    }

    pub fn trip(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    pub fn clear(flag: &AtomicBool) {
        flag.store(false, Ordering::SeqCst);
    }
}
