//! Test-pattern sensor.
//!
//! Streams packed YUYV gradient frames from a worker thread at a fixed frame
//! rate. Exposure and white balance are applied to the generated pixels so
//! parameter changes are visible downstream, and every device operation can
//! be made to fail through [`SensorFaults`].

use crate::capability::{FrameDescriptor, FrameListener, SensorId, SensorSession};
use crate::errors::SessionError;
use crate::format::FourCc;
use crate::testing::synthetic_yuyv_frame;
use crate::timing::{frame_interval, FrameClock};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

/// Failure switches for the synthetic sensor.
///
/// Each flag makes the matching operation fail until it is cleared.
/// `stream_error` is consumed by the worker: the next frame slot reports it
/// to the listener and the stream ends.
#[derive(Debug, Default)]
pub struct SensorFaults {
    pub fail_connect: AtomicBool,
    pub fail_disconnect: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub fail_delivery: AtomicBool,
    pub fail_exposure: AtomicBool,
    pub stream_error: AtomicI32,
}

impl SensorFaults {
    fn tripped(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }

    pub fn inject_stream_error(&self, code: i32) {
        self.stream_error.store(code, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WhiteBalanceGains {
    red: f32,
    blue: f32,
}

#[derive(Debug)]
struct Tuning {
    exposure_ev: f32,
    white_balance: Option<(String, WhiteBalanceGains)>,
}

impl Tuning {
    fn apply(&self, frame: &mut [u8]) {
        let luma_offset = (self.exposure_ev * 20.0) as i32;
        let (v_offset, u_offset) = match &self.white_balance {
            Some((_, gains)) => (
                ((gains.red - 1.0) * 64.0) as i32,
                ((gains.blue - 1.0) * 64.0) as i32,
            ),
            None => (0, 0),
        };
        if luma_offset == 0 && v_offset == 0 && u_offset == 0 {
            return;
        }
        let shift = |sample: &mut u8, offset: i32| {
            *sample = (*sample as i32 + offset).clamp(0, 255) as u8;
        };
        // Y0 U Y1 V
        for group in frame.chunks_exact_mut(4) {
            shift(&mut group[0], luma_offset);
            shift(&mut group[1], u_offset);
            shift(&mut group[2], luma_offset);
            shift(&mut group[3], v_offset);
        }
    }
}

/// Read-only view of a sensor that has been moved into a session.
#[derive(Clone)]
pub struct SensorMonitor {
    tuning: Arc<Mutex<Tuning>>,
    produced: Arc<AtomicU64>,
    faults: Arc<SensorFaults>,
}

impl SensorMonitor {
    pub fn frames_produced(&self) -> u64 {
        self.produced.load(Ordering::SeqCst)
    }

    pub fn exposure_compensation(&self) -> f32 {
        self.tuning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .exposure_ev
    }

    pub fn white_balance_mode(&self) -> Option<String> {
        self.tuning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .white_balance
            .as_ref()
            .map(|(mode, _)| mode.clone())
    }

    pub fn faults(&self) -> &Arc<SensorFaults> {
        &self.faults
    }
}

struct StreamConfig {
    width: u32,
    height: u32,
    fourcc: FourCc,
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct SyntheticSensor {
    id: SensorId,
    frame_rate: u32,
    clock: FrameClock,
    listener: Option<Arc<dyn FrameListener>>,
    connected: bool,
    stream: Option<StreamConfig>,
    worker: Option<Worker>,
    white_balance_modes: HashMap<String, WhiteBalanceGains>,
    tuning: Arc<Mutex<Tuning>>,
    produced: Arc<AtomicU64>,
    faults: Arc<SensorFaults>,
}

impl SyntheticSensor {
    pub fn new(id: u32, frame_rate: u32) -> Self {
        Self {
            id: SensorId(id),
            frame_rate: frame_rate.max(1),
            clock: FrameClock::new(),
            listener: None,
            connected: false,
            stream: None,
            worker: None,
            white_balance_modes: HashMap::new(),
            tuning: Arc::new(Mutex::new(Tuning {
                exposure_ev: 0.0,
                white_balance: None,
            })),
            produced: Arc::new(AtomicU64::new(0)),
            faults: Arc::new(SensorFaults::default()),
        }
    }

    pub fn monitor(&self) -> SensorMonitor {
        SensorMonitor {
            tuning: self.tuning.clone(),
            produced: self.produced.clone(),
            faults: self.faults.clone(),
        }
    }

    pub fn faults(&self) -> Arc<SensorFaults> {
        self.faults.clone()
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    fn tuning(&self) -> std::sync::MutexGuard<'_, Tuning> {
        self.tuning.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct StreamContext {
    source: SensorId,
    width: u32,
    height: u32,
    fourcc: FourCc,
    interval: std::time::Duration,
    single_frame_only: bool,
    clock: FrameClock,
    listener: Arc<dyn FrameListener>,
    tuning: Arc<Mutex<Tuning>>,
    produced: Arc<AtomicU64>,
    faults: Arc<SensorFaults>,
}

fn stream_loop(ctx: StreamContext, stop: Receiver<()>) {
    let mut frame_number = 0u64;
    loop {
        let error = ctx.faults.stream_error.swap(0, Ordering::SeqCst);
        if error != 0 {
            log::warn!("Sensor {:?} stream failed with code {}", ctx.source, error);
            ctx.listener.on_device_error(error);
            break;
        }

        let mut data = synthetic_yuyv_frame(frame_number, ctx.width, ctx.height);
        ctx.tuning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(&mut data);
        let frame = FrameDescriptor {
            data: &data,
            width: ctx.width,
            height: ctx.height,
            fourcc: ctx.fourcc,
            timestamp: ctx.clock.now(),
            source: ctx.source,
        };
        ctx.listener.on_next_frame(&frame);
        ctx.produced.fetch_add(1, Ordering::SeqCst);
        frame_number += 1;

        if ctx.single_frame_only {
            break;
        }
        match stop.recv_timeout(ctx.interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::trace!("Sensor {:?} worker exiting after {} frames", ctx.source, frame_number);
}

impl SensorSession for SyntheticSensor {
    fn id(&self) -> SensorId {
        self.id
    }

    fn set_frame_listener(&mut self, listener: Arc<dyn FrameListener>) {
        self.listener = Some(listener);
    }

    fn connect(&mut self) -> Result<(), SessionError> {
        if SensorFaults::tripped(&self.faults.fail_connect) {
            return Err(SessionError::DeviceUnavailable(format!(
                "sensor {} did not respond",
                self.id.0
            )));
        }
        self.connected = true;
        log::debug!("Sensor {:?} connected", self.id);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SessionError> {
        if SensorFaults::tripped(&self.faults.fail_disconnect) {
            return Err(SessionError::hardware("sensor refused to disconnect"));
        }
        self.stop_device()?;
        self.connected = false;
        log::debug!("Sensor {:?} disconnected", self.id);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn start_device(
        &mut self,
        width: u32,
        height: u32,
        fourcc: FourCc,
    ) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::DeviceUnavailable(
                "sensor is not connected".to_string(),
            ));
        }
        if self.stream.is_some() {
            return Err(SessionError::hardware("sensor is already started"));
        }
        if fourcc != self.native_format() {
            return Err(SessionError::UnsupportedFormat(format!(
                "sensor streams {} only, {} requested",
                self.native_format(),
                fourcc
            )));
        }
        if width == 0 || height == 0 || width % 2 != 0 {
            return Err(SessionError::InvalidFormat(format!(
                "cannot stream {}x{} packed 4:2:2",
                width, height
            )));
        }
        if SensorFaults::tripped(&self.faults.fail_start) {
            return Err(SessionError::hardware("sensor failed to start"));
        }
        self.stream = Some(StreamConfig {
            width,
            height,
            fourcc,
        });
        log::debug!("Sensor {:?} started at {}x{} {}", self.id, width, height, fourcc);
        Ok(())
    }

    fn stop_device(&mut self) -> Result<(), SessionError> {
        if self.stream.is_none() {
            return Ok(());
        }
        self.stop_delivering_frames();
        if SensorFaults::tripped(&self.faults.fail_stop) {
            return Err(SessionError::hardware("sensor failed to stop"));
        }
        self.stream = None;
        log::debug!("Sensor {:?} stopped", self.id);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.stream.is_some()
    }

    fn start_delivering_frames(&mut self, single_frame_only: bool) -> Result<(), SessionError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| SessionError::hardware("sensor is not started"))?;
        let listener = self.listener.clone().ok_or_else(|| {
            SessionError::DeviceUnavailable("no frame listener registered".to_string())
        })?;
        if SensorFaults::tripped(&self.faults.fail_delivery) {
            return Err(SessionError::hardware("frame delivery could not start"));
        }

        let ctx = StreamContext {
            source: self.id,
            width: stream.width,
            height: stream.height,
            fourcc: stream.fourcc,
            interval: frame_interval(self.frame_rate),
            single_frame_only,
            clock: self.clock.clone(),
            listener,
            tuning: self.tuning.clone(),
            produced: self.produced.clone(),
            faults: self.faults.clone(),
        };
        self.stop_delivering_frames();

        let (stop, stop_rx) = bounded(1);
        let handle = std::thread::Builder::new()
            .name(format!("camhal-sensor-{}", self.id.0))
            .spawn(move || stream_loop(ctx, stop_rx))
            .map_err(|e| SessionError::hardware(format!("spawn failed: {e}")))?;
        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    fn stop_delivering_frames(&mut self) {
        if let Some(Worker { stop, handle }) = self.worker.take() {
            drop(stop);
            if handle.join().is_err() {
                log::error!("Sensor {:?} worker panicked", self.id);
            }
        }
    }

    fn set_exposure_compensation(&mut self, ev: f32) -> Result<(), SessionError> {
        if SensorFaults::tripped(&self.faults.fail_exposure) {
            return Err(SessionError::hardware("exposure register write failed"));
        }
        self.tuning().exposure_ev = ev;
        Ok(())
    }

    fn initialize_white_balance_mode(&mut self, mode: &str, red_scale: f32, blue_scale: f32) {
        self.white_balance_modes.insert(
            mode.to_string(),
            WhiteBalanceGains {
                red: red_scale,
                blue: blue_scale,
            },
        );
    }

    fn set_white_balance_mode(&mut self, mode: &str) -> Result<(), SessionError> {
        let gains = *self.white_balance_modes.get(mode).ok_or_else(|| {
            SessionError::hardware(format!("white balance mode '{mode}' was never initialized"))
        })?;
        self.tuning().white_balance = Some((mode.to_string(), gains));
        Ok(())
    }
}

impl Drop for SyntheticSensor {
    fn drop(&mut self) {
        self.stop_delivering_frames();
    }
}
