//! The camera session controller.
//!
//! [`CameraSession`] owns the operating state of one sensor and the active
//! parameter set, and sequences every transition across the sensor, the
//! format converter and the two frame sinks. Control calls are serialized
//! through a transition gate: a call that arrives while another transition
//! is in flight fails with [`SessionError::DeviceBusy`] instead of queueing.
//! Queries never take the gate; they wait for the state lock.

pub mod fanout;
mod negotiate;
mod transaction;

use crate::capability::{DeliverySink, FormatConverter, PreviewSink, SensorSession};
use crate::config::{Facing, SessionConfig};
use crate::errors::SessionError;
use crate::format::{picture_source_format, preview_source_format, FourCc, PixelFormat};
use crate::params::{keys, ParameterSet};
use fanout::FrameRouter;
use negotiate::{negotiate_exposure, negotiate_white_balance};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;
use transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum OperatingState {
    Idle,
    Connected,
    Previewing,
    /// Video recording; implies previewing
    Recording,
    /// Single-frame still capture; preview is suspended
    CapturingPicture,
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatingState::Idle => "idle",
            OperatingState::Connected => "connected",
            OperatingState::Previewing => "previewing",
            OperatingState::Recording => "recording",
            OperatingState::CapturingPicture => "capturing a picture",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CameraInfo {
    pub facing: Facing,
    pub orientation: u32,
}

/// Snapshot returned by [`CameraSession::dump`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionDiagnostics {
    pub state: OperatingState,
    pub preview_frames: u64,
    /// Frames per second measured since preview started
    pub preview_fps: Option<f64>,
    pub recording: bool,
    pub converter_attached: bool,
}

struct SessionInner {
    state: OperatingState,
    params: ParameterSet,
    preview_started_at: Option<Instant>,
    sensor: Option<Box<dyn SensorSession>>,
}

/// Held for the length of one control call. Field order matters: the state
/// lock is released before the gate.
struct Transition<'a> {
    inner: MutexGuard<'a, SessionInner>,
    _gate: MutexGuard<'a, ()>,
}

impl Deref for Transition<'_> {
    type Target = SessionInner;

    fn deref(&self) -> &SessionInner {
        &self.inner
    }
}

impl DerefMut for Transition<'_> {
    fn deref_mut(&mut self) -> &mut SessionInner {
        &mut self.inner
    }
}

pub struct CameraSession {
    gate: Mutex<()>,
    inner: Mutex<SessionInner>,
    router: Arc<FrameRouter>,
    converter: Arc<dyn FormatConverter>,
    config: SessionConfig,
}

pub struct SessionBuilder {
    config: SessionConfig,
    sensor: Option<Box<dyn SensorSession>>,
    preview: Option<Arc<dyn PreviewSink>>,
    delivery: Option<Arc<dyn DeliverySink>>,
    converter: Option<Arc<dyn FormatConverter>>,
}

impl SessionBuilder {
    pub fn sensor<S: SensorSession + 'static>(mut self, sensor: S) -> Self {
        self.sensor = Some(Box::new(sensor));
        self
    }

    pub fn preview_sink(mut self, preview: Arc<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn delivery_sink(mut self, delivery: Arc<dyn DeliverySink>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn FormatConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Wires the capabilities together and advertises the default parameters.
    ///
    /// The sensor is optional; without one every operation that needs the
    /// device fails with `DeviceUnavailable`.
    pub fn build(self) -> Result<CameraSession, SessionError> {
        let missing = |what: &str| SessionError::DeviceUnavailable(format!("no {what} bound"));
        let preview = self.preview.ok_or_else(|| missing("preview sink"))?;
        let delivery = self.delivery.ok_or_else(|| missing("delivery sink"))?;
        let converter = self.converter.ok_or_else(|| missing("format converter"))?;

        let router = Arc::new(FrameRouter::new(preview, delivery));
        let params = ParameterSet::from_config(&self.config);

        let mut sensor = self.sensor;
        if let Some(sensor) = sensor.as_deref_mut() {
            for wb in &self.config.white_balance {
                sensor.initialize_white_balance_mode(&wb.mode, wb.red_scale, wb.blue_scale);
            }
            if let Some(mode) = params.get(keys::WHITE_BALANCE) {
                if let Err(e) = sensor.set_white_balance_mode(mode) {
                    log::warn!("Failed to select initial white balance '{}': {}", mode, e);
                }
            }
            sensor.set_frame_listener(router.clone());
            log::debug!("Bound sensor {:?} to session", sensor.id());
        } else {
            log::warn!("Session built without a sensor");
        }

        Ok(CameraSession {
            gate: Mutex::new(()),
            inner: Mutex::new(SessionInner {
                state: OperatingState::Idle,
                params,
                preview_started_at: None,
                sensor,
            }),
            router,
            converter,
            config: self.config,
        })
    }
}

fn no_sensor() -> SessionError {
    SessionError::DeviceUnavailable("no sensor bound to the session".to_string())
}

fn as_hardware_fault(error: SessionError) -> SessionError {
    match error {
        SessionError::HardwareFault(_) => error,
        other => SessionError::HardwareFault(other.to_string()),
    }
}

fn as_invalid_format(error: SessionError) -> SessionError {
    match error {
        SessionError::InvalidFormat(_) => error,
        other => SessionError::InvalidFormat(other.to_string()),
    }
}

/// Frame size for a streaming start. Recording-hinted sessions prefer the
/// video size.
fn resolve_stream_size(params: &ParameterSet) -> Result<(u32, u32), SessionError> {
    let size = if params.recording_hint() {
        params.video_size().or_else(|| params.preview_size())
    } else {
        params.preview_size()
    };
    match size {
        Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(SessionError::InvalidFormat(
            "unable to resolve frame size".to_string(),
        )),
    }
}

/// Destination pixel format for a streaming start. Recording-hinted sessions
/// prefer the video frame format.
fn resolve_stream_format(params: &ParameterSet) -> Result<PixelFormat, SessionError> {
    let video = if params.recording_hint() {
        params.video_format()
    } else {
        None
    };
    video
        .or_else(|| params.preview_format())
        .ok_or_else(|| SessionError::InvalidFormat("unable to obtain pixel format".to_string()))?
        .parse()
}

impl CameraSession {
    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            sensor: None,
            preview: None,
            delivery: None,
            converter: None,
        }
    }

    /// Claims the session for a transition. Only another transition makes
    /// this fail with `DeviceBusy`; a concurrent query just delays it.
    fn transition(&self) -> Result<Transition<'_>, SessionError> {
        let gate = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(SessionError::DeviceBusy),
            Err(TryLockError::Poisoned(_)) => return Err(SessionError::poisoned_lock()),
        };
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| SessionError::poisoned_lock())?;
        self.settle(&mut inner);
        Ok(Transition {
            inner,
            _gate: gate,
        })
    }

    fn query(&self) -> MutexGuard<'_, SessionInner> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        self.settle(&mut inner);
        inner
    }

    /// A delivered picture ends the capture state.
    fn settle(&self, inner: &mut SessionInner) {
        if inner.state == OperatingState::CapturingPicture
            && !self.router.delivery().is_picture_pending()
        {
            log::debug!("Picture delivered, session back to connected");
            inner.state = OperatingState::Connected;
        }
    }

    pub fn state(&self) -> OperatingState {
        self.query().state
    }

    pub fn connect(&self) -> Result<(), SessionError> {
        let mut inner = self.transition()?;
        log::debug!("connect from {}", inner.state);
        if inner.state != OperatingState::Idle {
            return Ok(());
        }
        let sensor = inner.sensor.as_deref_mut().ok_or_else(no_sensor)?;
        if !sensor.is_connected() {
            sensor.connect()?;
        }
        inner.state = OperatingState::Connected;
        Ok(())
    }

    pub fn start_preview(&self) -> Result<(), SessionError> {
        let mut inner = self.transition()?;
        log::debug!("start preview from {}", inner.state);
        self.start_preview_locked(&mut inner)
    }

    fn start_preview_locked(&self, inner: &mut SessionInner) -> Result<(), SessionError> {
        if inner.state == OperatingState::Recording {
            return Err(SessionError::InvalidState {
                operation: "start preview",
                state: inner.state,
            });
        }
        let SessionInner {
            state,
            params,
            preview_started_at,
            sensor,
        } = inner;
        let sensor = sensor.as_deref_mut().ok_or_else(no_sensor)?;

        if sensor.is_started() {
            log::debug!("Sensor already streaming, tearing down before reconfiguration");
            sensor.stop_delivering_frames();
            sensor.stop_device().map_err(as_hardware_fault)?;
            self.router.detach_converter();
            self.router.preview().deactivate();
            if self.router.delivery().is_picture_pending() {
                self.router.delivery().disarm_picture();
            }
            *preview_started_at = None;
            if *state != OperatingState::Idle {
                *state = OperatingState::Connected;
            }
        }

        let frame_rate = params
            .preview_frame_rate()
            .unwrap_or(self.config.camera.preview_fps);

        let mut txn = Transaction::begin("start preview", sensor, &self.router);
        txn.activate_preview(frame_rate)?;
        txn.ensure_connected()?;

        let (width, height) = resolve_stream_size(params)?;
        let format = resolve_stream_format(params)?;
        let source = preview_source_format(format, txn.sensor().native_format())?;

        self.converter
            .set_destination_format(format)
            .map_err(as_invalid_format)?;
        if !self.converter.is_valid() {
            return Err(SessionError::InvalidFormat(format!(
                "no conversion path from {source} to {format}"
            )));
        }

        log::info!("Starting camera: {}x{} -> {}({})", width, height, source, format);
        txn.start_device(width, height, source)?;
        txn.attach_converter(self.converter.clone());
        txn.start_delivery(false)?;
        txn.commit();

        *preview_started_at = Some(Instant::now());
        *state = OperatingState::Previewing;
        Ok(())
    }

    pub fn stop_preview(&self) -> Result<(), SessionError> {
        let mut inner = self.transition()?;
        log::debug!("stop preview from {}", inner.state);
        self.stop_preview_locked(&mut inner)
    }

    fn stop_preview_locked(&self, inner: &mut SessionInner) -> Result<(), SessionError> {
        if !matches!(
            inner.state,
            OperatingState::Previewing | OperatingState::Recording
        ) {
            return Ok(());
        }
        if let Some(sensor) = inner.sensor.as_deref_mut() {
            if sensor.is_started() {
                sensor.stop_delivering_frames();
                sensor.stop_device().map_err(as_hardware_fault)?;
            }
        }
        self.router.detach_converter();
        let delivery = self.router.delivery();
        if delivery.is_recording_active() {
            log::debug!("Preview stopping, disabling video recording");
            delivery.disable_video_recording();
        }
        self.router.preview().deactivate();

        inner.preview_started_at = None;
        inner.state = OperatingState::Connected;
        Ok(())
    }

    pub fn start_recording(&self) -> Result<(), SessionError> {
        let mut inner = self.transition()?;
        log::debug!("start recording from {}", inner.state);
        match inner.state {
            OperatingState::Previewing => {}
            OperatingState::Recording => return Ok(()),
            state => {
                return Err(SessionError::InvalidState {
                    operation: "start recording",
                    state,
                })
            }
        }
        let frame_rate = inner
            .params
            .preview_frame_rate()
            .unwrap_or(self.config.camera.preview_fps);
        self.router.delivery().enable_video_recording(frame_rate)?;
        inner.state = OperatingState::Recording;
        Ok(())
    }

    pub fn stop_recording(&self) -> Result<(), SessionError> {
        let mut inner = self.transition()?;
        log::debug!("stop recording from {}", inner.state);
        if inner.state == OperatingState::Recording {
            self.router.delivery().disable_video_recording();
            inner.state = OperatingState::Previewing;
        }
        Ok(())
    }

    pub fn is_recording_enabled(&self) -> bool {
        self.router.delivery().is_recording_active()
    }

    pub fn is_preview_enabled(&self) -> bool {
        self.router.preview().is_active()
    }

    pub fn store_metadata_in_buffers(&self, enable: bool) -> Result<(), SessionError> {
        let _inner = self.transition()?;
        self.router.delivery().store_metadata_in_buffers(enable)
    }

    pub fn take_picture(&self) -> Result<(), SessionError> {
        let mut inner = self.transition()?;
        log::debug!("take picture from {}", inner.state);
        match inner.state {
            OperatingState::Connected | OperatingState::Previewing => {}
            OperatingState::CapturingPicture => return Err(SessionError::DeviceBusy),
            state => {
                return Err(SessionError::InvalidState {
                    operation: "take picture",
                    state,
                })
            }
        }

        let native = inner
            .sensor
            .as_deref()
            .ok_or_else(no_sensor)?
            .native_format();
        let requested = inner.params.picture_format().unwrap_or_default().to_string();
        let source = picture_source_format(&requested, native)?;
        let (width, height) = inner.params.picture_size().ok_or_else(|| {
            SessionError::InvalidFormat("unable to resolve picture size".to_string())
        })?;
        let jpeg_quality = inner
            .params
            .get_int(keys::JPEG_QUALITY)
            .filter(|q| *q > 0)
            .map(|q| q.min(100) as u8)
            .unwrap_or(self.config.picture.jpeg_quality);

        let preview_on = inner.state == OperatingState::Previewing;
        if preview_on {
            self.stop_preview_locked(&mut inner)?;
        }

        match self.capture_locked(&mut inner, width, height, source, &requested, jpeg_quality) {
            Ok(()) => {
                inner.state = OperatingState::CapturingPicture;
                Ok(())
            }
            Err(e) => {
                if preview_on {
                    log::warn!("Picture failed ({}), restoring preview", e);
                    if let Err(restore) = self.start_preview_locked(&mut inner) {
                        log::error!("Failed to restore preview: {}", restore);
                    }
                }
                Err(e)
            }
        }
    }

    fn capture_locked(
        &self,
        inner: &mut SessionInner,
        width: u32,
        height: u32,
        source: FourCc,
        requested: &str,
        jpeg_quality: u8,
    ) -> Result<(), SessionError> {
        let after_picture = inner.state == OperatingState::Connected;
        let sensor = inner.sensor.as_deref_mut().ok_or_else(no_sensor)?;
        if sensor.is_started() {
            // a settled picture leaves its single-frame stream running
            if after_picture {
                log::debug!("Stopping the previous picture stream");
            } else {
                log::warn!("Sensor is still started, stopping it before the picture");
            }
            sensor.stop_delivering_frames();
            sensor.stop_device().map_err(as_hardware_fault)?;
        }

        log::info!(
            "Starting camera for picture: {}({})[{}x{}]",
            source,
            requested,
            width,
            height
        );
        let mut txn = Transaction::begin("take picture", sensor, &self.router);
        txn.start_device(width, height, source)?;
        txn.arm_picture(jpeg_quality);
        txn.start_delivery(true)?;
        txn.commit();
        Ok(())
    }

    /// Acknowledged without touching the device.
    pub fn cancel_picture(&self) -> Result<(), SessionError> {
        log::debug!("cancel picture");
        Ok(())
    }

    /// Fixed-focus sensor: acknowledged.
    pub fn auto_focus(&self) -> Result<(), SessionError> {
        log::debug!("auto focus");
        Ok(())
    }

    pub fn cancel_auto_focus(&self) -> Result<(), SessionError> {
        log::debug!("cancel auto focus");
        Ok(())
    }

    pub fn send_command(&self, cmd: i32, arg1: i32, arg2: i32) -> Result<(), SessionError> {
        log::debug!("send command: cmd = {}, arg1 = {}, arg2 = {}", cmd, arg1, arg2);
        Ok(())
    }

    /// Parses a flattened parameter string and applies it.
    pub fn set_parameters(&self, flattened: &str) -> Result<(), SessionError> {
        self.apply_parameters(ParameterSet::unflatten(flattened))
    }

    /// Applies the exposure and white-balance diffs to the sensor, then
    /// replaces the active set with the candidate. Device reconfiguration
    /// failures are logged and do not reject the set.
    pub fn apply_parameters(&self, mut candidate: ParameterSet) -> Result<(), SessionError> {
        let mut inner = self.transition()?;

        if log::log_enabled!(log::Level::Debug) {
            for change in inner.params.diff(&candidate) {
                log::debug!("param {}: {:?} -> {:?}", change.key, change.old, change.new);
            }
        }

        let exposure = negotiate_exposure(&mut candidate, &inner.params);
        let white_balance = negotiate_white_balance(&candidate, &inner.params).map(str::to_owned);

        match inner.sensor.as_deref_mut() {
            Some(sensor) => {
                if let Some(ev) = exposure {
                    log::debug!("Setting exposure compensation to {} EV", ev);
                    if let Err(e) = sensor.set_exposure_compensation(ev) {
                        log::warn!("Exposure compensation not applied: {}", e);
                    }
                }
                if let Some(mode) = white_balance {
                    log::debug!("Setting white balance to {}", mode);
                    if let Err(e) = sensor.set_white_balance_mode(&mode) {
                        log::warn!("White balance '{}' not applied: {}", mode, e);
                    }
                }
            }
            None if exposure.is_some() || white_balance.is_some() => {
                log::debug!("No sensor bound, device reconfiguration skipped");
            }
            None => {}
        }

        inner.params = candidate;
        Ok(())
    }

    /// The active parameter set, flattened.
    pub fn get_parameters(&self) -> String {
        self.query().params.flatten()
    }

    pub fn parameters(&self) -> ParameterSet {
        self.query().params.clone()
    }

    pub fn camera_info(&self) -> CameraInfo {
        let inner = self.query();
        let facing = match inner.params.get(keys::FACING) {
            Some("front") => Facing::Front,
            _ => Facing::Back,
        };
        let orientation = inner
            .params
            .get_int(keys::ORIENTATION)
            .and_then(|o| u32::try_from(o).ok())
            .unwrap_or(0);
        CameraInfo {
            facing,
            orientation,
        }
    }

    pub fn dump(&self) -> SessionDiagnostics {
        let inner = self.query();
        let preview_frames = self.router.preview().frame_count();
        let preview_fps = inner.preview_started_at.and_then(|started| {
            let elapsed = started.elapsed().as_secs_f64();
            (elapsed > 0.0).then(|| preview_frames as f64 / elapsed)
        });
        SessionDiagnostics {
            state: inner.state,
            preview_frames,
            preview_fps,
            recording: self.router.delivery().is_recording_active(),
            converter_attached: self.router.has_converter(),
        }
    }

    /// Stops preview, stops and disconnects the sensor, and resets delivery
    /// bookkeeping. A sensor that fails to stop or disconnect aborts the close
    /// with that fault.
    pub fn close(&self) -> Result<(), SessionError> {
        let mut inner = self.transition()?;
        log::debug!("close from {}", inner.state);
        self.stop_preview_locked(&mut inner)?;

        if let Some(sensor) = inner.sensor.as_deref_mut() {
            if sensor.is_started() {
                sensor.stop_delivering_frames();
                sensor.stop_device().map_err(as_hardware_fault)?;
                self.router.detach_converter();
            }
            if sensor.is_connected() {
                sensor.disconnect().map_err(as_hardware_fault)?;
            }
        }
        self.router.delivery().reset();

        inner.preview_started_at = None;
        inner.state = OperatingState::Idle;
        Ok(())
    }

    pub fn release(&self) -> Result<(), SessionError> {
        self.close()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.query().state == OperatingState::Idle {
            return;
        }
        if let Err(e) = self.close() {
            log::warn!("Error closing camera session in drop: {}", e);
        }
    }
}
