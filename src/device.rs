//! Device adapter boundary.
//!
//! Host frameworks that speak in integer statuses dispatch through
//! [`CameraDevice`]; `0` is success and failures carry the negative errno
//! of the [`SessionError`] kind.

use crate::errors::SessionError;
use crate::session::CameraSession;

pub type Status = i32;

pub const OK: Status = 0;

pub fn status_of(result: Result<(), SessionError>) -> Status {
    match result {
        Ok(()) => OK,
        Err(e) => {
            log::debug!("device call failed: {}", e);
            e.errno()
        }
    }
}

pub trait CameraDevice: Send + Sync {
    fn connect(&self) -> Status;
    fn start_preview(&self) -> Status;
    fn stop_preview(&self);
    fn preview_enabled(&self) -> bool;
    fn store_meta_data_in_buffers(&self, enable: bool) -> Status;
    fn start_recording(&self) -> Status;
    fn stop_recording(&self);
    fn recording_enabled(&self) -> bool;
    fn auto_focus(&self) -> Status;
    fn cancel_auto_focus(&self) -> Status;
    fn take_picture(&self) -> Status;
    fn cancel_picture(&self) -> Status;
    fn set_parameters(&self, params: &str) -> Status;
    fn get_parameters(&self) -> String;
    fn send_command(&self, cmd: i32, arg1: i32, arg2: i32) -> Status;
    fn release(&self);
    fn dump(&self) -> String;
}

impl CameraDevice for CameraSession {
    fn connect(&self) -> Status {
        status_of(CameraSession::connect(self))
    }

    fn start_preview(&self) -> Status {
        status_of(CameraSession::start_preview(self))
    }

    fn stop_preview(&self) {
        if let Err(e) = CameraSession::stop_preview(self) {
            log::error!("stop preview failed: {}", e);
        }
    }

    fn preview_enabled(&self) -> bool {
        self.is_preview_enabled()
    }

    fn store_meta_data_in_buffers(&self, enable: bool) -> Status {
        status_of(self.store_metadata_in_buffers(enable))
    }

    fn start_recording(&self) -> Status {
        status_of(CameraSession::start_recording(self))
    }

    fn stop_recording(&self) {
        if let Err(e) = CameraSession::stop_recording(self) {
            log::error!("stop recording failed: {}", e);
        }
    }

    fn recording_enabled(&self) -> bool {
        self.is_recording_enabled()
    }

    fn auto_focus(&self) -> Status {
        status_of(CameraSession::auto_focus(self))
    }

    fn cancel_auto_focus(&self) -> Status {
        status_of(CameraSession::cancel_auto_focus(self))
    }

    fn take_picture(&self) -> Status {
        status_of(CameraSession::take_picture(self))
    }

    fn cancel_picture(&self) -> Status {
        status_of(CameraSession::cancel_picture(self))
    }

    fn set_parameters(&self, params: &str) -> Status {
        status_of(CameraSession::set_parameters(self, params))
    }

    fn get_parameters(&self) -> String {
        CameraSession::get_parameters(self)
    }

    fn send_command(&self, cmd: i32, arg1: i32, arg2: i32) -> Status {
        status_of(CameraSession::send_command(self, cmd, arg1, arg2))
    }

    fn release(&self) {
        if let Err(e) = CameraSession::release(self) {
            log::error!("release failed: {}", e);
        }
    }

    fn dump(&self) -> String {
        let diagnostics = CameraSession::dump(self);
        match diagnostics.preview_fps {
            Some(fps) => format!("state: {}\n    preview fps: {:.2}", diagnostics.state, fps),
            None => format!("state: {}", diagnostics.state),
        }
    }
}
