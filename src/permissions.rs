//! Camera permission probing for native capture
//!
//! A denied status short-circuits stream requests with
//! [`CaptureError::PermissionDenied`] instead of a backend error.

use crate::errors::CaptureError;

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user hasn't been asked yet, or the platform can't tell
    NotDetermined,
    /// Restricted by system policy
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Detailed permission information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub status: PermissionStatus,
    pub message: String,
}

impl PermissionInfo {
    /// Turn a refusal into the error stream requests report
    pub fn ensure_allowed(&self) -> Result<(), CaptureError> {
        match self.status {
            PermissionStatus::Denied | PermissionStatus::Restricted => {
                Err(CaptureError::PermissionDenied(self.message.clone()))
            }
            PermissionStatus::Granted | PermissionStatus::NotDetermined => Ok(()),
        }
    }
}

pub fn check_permission() -> PermissionInfo {
    #[cfg(target_os = "linux")]
    {
        check_permission_linux()
    }

    #[cfg(not(target_os = "linux"))]
    {
        // Other platforms prompt on first open; the open itself reports refusal
        PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "Permission is requested by the OS when the camera opens".to_string(),
        }
    }
}

#[cfg(target_os = "linux")]
fn check_permission_linux() -> PermissionInfo {
    use std::fs::OpenOptions;
    use std::path::Path;

    let video_devices: Vec<String> = (0..10)
        .map(|i| format!("/dev/video{}", i))
        .filter(|path| Path::new(path).exists())
        .collect();

    let first_device = match video_devices.first() {
        Some(device) => device,
        None => {
            return PermissionInfo {
                status: PermissionStatus::NotDetermined,
                message: "No video devices found at /dev/video*".to_string(),
            }
        }
    };

    match OpenOptions::new().read(true).open(first_device) {
        Ok(_) => PermissionInfo {
            status: PermissionStatus::Granted,
            message: format!("Camera access granted ({} readable)", first_device),
        },
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => PermissionInfo {
            status: PermissionStatus::Denied,
            message: format!(
                "Camera device {} is not readable - run: sudo usermod -a -G video $USER",
                first_device
            ),
        },
        // Busy or otherwise unavailable devices are not a permission problem
        Err(e) => PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: format!("Cannot open {}: {}", first_device, e),
        },
    }
}
