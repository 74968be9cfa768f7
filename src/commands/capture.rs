//! Tauri commands for capability probing and parameter selection

use super::lock_controller;
use crate::probe::ProbeState;
use crate::selection::FrameRateOption;
use crate::session::SessionStatus;
use crate::types::{CapabilitySnapshot, FrameRate, Resolution, SelectionState};
use serde::{Deserialize, Serialize};
use tauri::command;

/// Everything a capture screen needs to render its controls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureState {
    pub probe: ProbeState,
    pub capability: Option<CapabilitySnapshot>,
    pub selection: SelectionState,
    pub container: String,
    pub status: SessionStatus,
}

fn capture_state(controller: &super::NativeController) -> CaptureState {
    CaptureState {
        probe: controller.probe_state().clone(),
        capability: controller.capability().copied(),
        selection: controller.selection(),
        container: controller.container().mime_type().to_string(),
        status: controller.status(),
    }
}

/// Probe the camera and derive the initial selection
#[command]
pub async fn probe_camera() -> Result<CaptureState, String> {
    let mut guard = lock_controller().await;
    let controller = guard.as_mut().ok_or("Controller unavailable")?;

    log::info!("Probing camera capabilities");
    controller.probe().await;
    Ok(capture_state(controller))
}

#[command]
pub async fn get_capture_state() -> Result<CaptureState, String> {
    let guard = lock_controller().await;
    let controller = guard.as_ref().ok_or("Controller unavailable")?;
    Ok(capture_state(controller))
}

/// All frame rates; those above the camera maximum are flagged disabled
#[command]
pub async fn get_frame_rate_options() -> Result<Vec<FrameRateOption>, String> {
    let guard = lock_controller().await;
    let controller = guard.as_ref().ok_or("Controller unavailable")?;
    Ok(controller.frame_rate_options())
}

/// Override the resolution, e.g. "1920x1080". `None` clears it.
#[command]
pub async fn set_resolution(resolution: Option<String>) -> Result<SelectionState, String> {
    let resolution = resolution
        .map(|r| r.parse::<Resolution>())
        .transpose()?;

    let mut guard = lock_controller().await;
    let controller = guard.as_mut().ok_or("Controller unavailable")?;
    Ok(controller.set_resolution(resolution))
}

/// Override the frame rate in fps. `None` clears it.
#[command]
pub async fn set_frame_rate(frame_rate: Option<u32>) -> Result<SelectionState, String> {
    let frame_rate = frame_rate.map(FrameRate::try_from).transpose()?;

    let mut guard = lock_controller().await;
    let controller = guard.as_mut().ok_or("Controller unavailable")?;
    Ok(controller.set_frame_rate(frame_rate))
}
