//! Scoped rollback for multi-step transitions.
//!
//! Each acquisition helper records how to undo itself. Dropping a
//! [`Transaction`] that was not committed unwinds the recorded steps in
//! reverse order, so a failure at any step leaves the sensor and sinks as
//! they were before the transition began.

use super::fanout::FrameRouter;
use crate::capability::{FormatConverter, SensorSession};
use crate::errors::SessionError;
use crate::format::FourCc;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Undo {
    DeactivatePreview,
    Disconnect,
    StopDevice,
    DetachConverter,
    StopDelivery,
    DisarmPicture,
}

pub(crate) struct Transaction<'a> {
    label: &'static str,
    sensor: &'a mut dyn SensorSession,
    router: &'a FrameRouter,
    undo: Vec<Undo>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(
        label: &'static str,
        sensor: &'a mut dyn SensorSession,
        router: &'a FrameRouter,
    ) -> Self {
        Self {
            label,
            sensor,
            router,
            undo: Vec::with_capacity(6),
        }
    }

    pub(crate) fn sensor(&mut self) -> &mut dyn SensorSession {
        &mut *self.sensor
    }

    pub(crate) fn activate_preview(&mut self, frame_rate_hint: u32) -> Result<(), SessionError> {
        self.router.preview().activate(frame_rate_hint)?;
        self.undo.push(Undo::DeactivatePreview);
        Ok(())
    }

    /// Connects the sensor unless it already is; only a connection made here
    /// is undone.
    pub(crate) fn ensure_connected(&mut self) -> Result<(), SessionError> {
        if self.sensor.is_connected() {
            return Ok(());
        }
        self.sensor.connect()?;
        self.undo.push(Undo::Disconnect);
        Ok(())
    }

    pub(crate) fn start_device(
        &mut self,
        width: u32,
        height: u32,
        fourcc: FourCc,
    ) -> Result<(), SessionError> {
        self.sensor.start_device(width, height, fourcc)?;
        self.undo.push(Undo::StopDevice);
        Ok(())
    }

    pub(crate) fn attach_converter(&mut self, converter: Arc<dyn FormatConverter>) {
        self.router.attach_converter(converter);
        self.undo.push(Undo::DetachConverter);
    }

    pub(crate) fn arm_picture(&mut self, jpeg_quality: u8) {
        self.router.delivery().arm_for_single_picture(jpeg_quality);
        self.undo.push(Undo::DisarmPicture);
    }

    pub(crate) fn start_delivery(&mut self, single_frame_only: bool) -> Result<(), SessionError> {
        self.sensor.start_delivering_frames(single_frame_only)?;
        self.undo.push(Undo::StopDelivery);
        Ok(())
    }

    pub(crate) fn commit(mut self) {
        self.undo.clear();
    }

    fn run(&mut self, step: Undo) {
        log::debug!("{}: undo {:?}", self.label, step);
        match step {
            Undo::DeactivatePreview => self.router.preview().deactivate(),
            Undo::Disconnect => {
                if let Err(e) = self.sensor.disconnect() {
                    log::error!("{}: disconnect during rollback failed: {}", self.label, e);
                }
            }
            Undo::StopDevice => {
                if let Err(e) = self.sensor.stop_device() {
                    log::error!("{}: stop during rollback failed: {}", self.label, e);
                }
            }
            Undo::DetachConverter => self.router.detach_converter(),
            Undo::StopDelivery => self.sensor.stop_delivering_frames(),
            Undo::DisarmPicture => self.router.delivery().disarm_picture(),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        log::warn!("{}: rolling back {} step(s)", self.label, self.undo.len());
        while let Some(step) = self.undo.pop() {
            self.run(step);
        }
    }
}
