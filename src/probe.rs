//! Capability probing
//!
//! Runs once at startup: enumerates video inputs, opens the chosen device just
//! long enough to read its capability ranges, and releases it again.

use crate::errors::CaptureError;
use crate::platform::CaptureProvider;
use crate::types::{CapabilitySnapshot, FacingMode};
use serde::{Deserialize, Serialize};

/// Progress of the startup probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ProbeState {
    Pending,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CapabilityProber {
    device_index: usize,
    facing_mode: FacingMode,
}

impl CapabilityProber {
    pub fn new(device_index: usize, facing_mode: FacingMode) -> Self {
        Self {
            device_index,
            facing_mode,
        }
    }

    pub async fn probe<C: CaptureProvider>(
        &self,
        provider: &C,
    ) -> Result<CapabilitySnapshot, CaptureError> {
        let devices = provider.enumerate_video_inputs().await?;
        if devices.is_empty() {
            return Err(CaptureError::NoDevice);
        }

        let device = match devices.get(self.device_index) {
            Some(device) => device,
            None => {
                log::warn!(
                    "Configured device index {} out of range ({} devices), using first device",
                    self.device_index,
                    devices.len()
                );
                &devices[0]
            }
        };

        log::info!("Probing capabilities of video input {}", device);
        let snapshot = provider.get_capabilities(device, self.facing_mode).await?;
        log::info!("Camera capability: {}", snapshot.describe());
        Ok(snapshot)
    }
}

impl Default for CapabilityProber {
    fn default() -> Self {
        Self::new(0, FacingMode::Environment)
    }
}
