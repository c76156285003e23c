use crate::session::OperatingState;

/// Failure kinds reported by every control entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Device busy: another transition is in flight")]
    DeviceBusy,
    #[error("Hardware fault: {0}")]
    HardwareFault(String),
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: OperatingState,
    },
}

/// Fieldless mirror of [`SessionError`] for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum SessionErrorKind {
    DeviceUnavailable,
    InvalidFormat,
    UnsupportedFormat,
    DeviceBusy,
    HardwareFault,
    InvalidState,
}

const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const EBUSY: i32 = 16;
const EIO: i32 = 5;
const ENOSYS: i32 = 38;

impl SessionError {
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::DeviceUnavailable(_) => SessionErrorKind::DeviceUnavailable,
            SessionError::InvalidFormat(_) => SessionErrorKind::InvalidFormat,
            SessionError::UnsupportedFormat(_) => SessionErrorKind::UnsupportedFormat,
            SessionError::DeviceBusy => SessionErrorKind::DeviceBusy,
            SessionError::HardwareFault(_) => SessionErrorKind::HardwareFault,
            SessionError::InvalidState { .. } => SessionErrorKind::InvalidState,
        }
    }

    /// Negative errno used at the device adapter boundary.
    pub fn errno(&self) -> i32 {
        match self.kind() {
            SessionErrorKind::DeviceUnavailable => -ENODEV,
            SessionErrorKind::InvalidFormat | SessionErrorKind::UnsupportedFormat => -EINVAL,
            SessionErrorKind::DeviceBusy => -EBUSY,
            SessionErrorKind::HardwareFault => -EIO,
            SessionErrorKind::InvalidState => -ENOSYS,
        }
    }

    pub fn hardware(message: impl Into<String>) -> Self {
        SessionError::HardwareFault(message.into())
    }

    pub fn poisoned_lock() -> Self {
        SessionError::HardwareFault("session lock poisoned by previous panic".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let error = SessionError::InvalidFormat("yuv411".to_string());
        assert_eq!(error.to_string(), "Invalid format: yuv411");
    }

    #[test]
    fn test_invalid_state_display() {
        let error = SessionError::InvalidState {
            operation: "start recording",
            state: OperatingState::Connected,
        };
        assert_eq!(
            error.to_string(),
            "Invalid state: cannot start recording while connected"
        );
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(SessionError::DeviceBusy.errno(), -16);
        assert_eq!(SessionError::hardware("stop failed").errno(), -5);
        assert_eq!(SessionError::DeviceUnavailable("none".into()).errno(), -19);
        assert_eq!(SessionError::UnsupportedFormat("bayer".into()).errno(), -22);
        assert_eq!(SessionError::InvalidFormat("bayer".into()).errno(), -22);
    }

    #[test]
    fn test_kind_is_stable_across_messages() {
        assert_eq!(
            SessionError::hardware("a").kind(),
            SessionError::hardware("b").kind()
        );
        assert_eq!(SessionError::poisoned_lock().kind(), SessionErrorKind::HardwareFault);
    }
}
