#[cfg(test)]
mod error_tests {
    use crabclip::CaptureError;
    use std::error::Error;

    #[test]
    fn test_display_messages() {
        assert_eq!(CaptureError::NoDevice.to_string(), "No video input device found");
        assert_eq!(
            CaptureError::MediaAccess("busy".to_string()).to_string(),
            "Media access error: busy"
        );
        assert_eq!(
            CaptureError::RecordingNotFound(3).to_string(),
            "Recording not found at index 3"
        );
        assert!(CaptureError::PermissionDenied("denied".to_string())
            .to_string()
            .contains("Permission denied"));
    }

    #[test]
    fn test_implements_error_trait() {
        let error = CaptureError::Recorder("flush failed".to_string());
        let as_error: &dyn Error = &error;
        assert!(as_error.source().is_none());
    }

    #[test]
    fn test_only_missing_session_is_benign() {
        assert!(CaptureError::RecorderUnavailable.is_benign());
        assert!(!CaptureError::NoDevice.is_benign());
        assert!(!CaptureError::Recorder("x".to_string()).is_benign());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: CaptureError = io.into();
        assert!(matches!(error, CaptureError::Io(ref msg) if msg.contains("gone")));
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&CaptureError::NoDevice).unwrap();
        assert_eq!(json, "\"No video input device found\"");
    }
}
