#[cfg(test)]
mod error_tests {
    use camhal::config::ConfigError;
    use camhal::device::status_of;
    use camhal::{OperatingState, SessionError, SessionErrorKind};
    use std::error::Error;

    #[test]
    fn test_session_error_device_unavailable() {
        let error = SessionError::DeviceUnavailable("no sensor bound".to_string());
        assert!(error.to_string().contains("Device unavailable"));
        assert!(error.to_string().contains("no sensor bound"));
        assert_eq!(error.kind(), SessionErrorKind::DeviceUnavailable);
    }

    #[test]
    fn test_session_error_busy() {
        let error = SessionError::DeviceBusy;
        assert!(error.to_string().contains("Device busy"));
        assert_eq!(status_of(Err(error)), -16);
    }

    #[test]
    fn test_session_error_hardware_fault() {
        let error = SessionError::hardware("stop failed");
        assert_eq!(error.to_string(), "Hardware fault: stop failed");
        assert_eq!(error.errno(), -5);
    }

    #[test]
    fn test_session_error_invalid_state() {
        let error = SessionError::InvalidState {
            operation: "take picture",
            state: OperatingState::Recording,
        };
        assert_eq!(
            error.to_string(),
            "Invalid state: cannot take picture while recording"
        );
        assert_eq!(error.errno(), -38);
    }

    #[test]
    fn test_session_error_debug_format() {
        let error = SessionError::UnsupportedFormat("png".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("UnsupportedFormat"));
        assert!(debug_str.contains("png"));
    }

    #[test]
    fn test_session_error_implements_error_trait() {
        let error = SessionError::InvalidFormat("Error trait test".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_session_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<SessionError>();
    }

    #[test]
    fn test_session_error_converts_to_anyhow() {
        let result: anyhow::Result<()> = Err(SessionError::DeviceBusy.into());
        assert!(result.unwrap_err().to_string().contains("busy"));
    }

    #[test]
    fn test_config_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: ConfigError = io.into();
        assert!(error.to_string().contains("Failed to access config file"));
        assert!(error.source().is_some());
    }
}
