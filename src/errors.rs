use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No video input device was enumerated
    NoDevice,
    PermissionDenied(String),
    /// The stream could not be created under the requested constraints
    MediaAccess(String),
    /// Stop was requested while no session is active
    RecorderUnavailable,
    Recorder(String),
    RecordingNotFound(usize),
    Config(String),
    Io(String),
}

impl CaptureError {
    /// Whether the error is a benign no-op that should not reach the user
    pub fn is_benign(&self) -> bool {
        matches!(self, CaptureError::RecorderUnavailable)
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CaptureError::NoDevice => write!(f, "No video input device found"),
            CaptureError::PermissionDenied(msg) => write!(f, "Permission denied error: {}", msg),
            CaptureError::MediaAccess(msg) => write!(f, "Media access error: {}", msg),
            CaptureError::RecorderUnavailable => write!(f, "No active recording session"),
            CaptureError::Recorder(msg) => write!(f, "Recorder error: {}", msg),
            CaptureError::RecordingNotFound(index) => {
                write!(f, "Recording not found at index {}", index)
            }
            CaptureError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CaptureError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        CaptureError::Io(e.to_string())
    }
}

impl serde::Serialize for CaptureError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
