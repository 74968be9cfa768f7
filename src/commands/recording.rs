//! Tauri commands for the recording lifecycle and the clip catalog

use super::{current_status, lock_controller};
use crate::catalog::{ClipMetadata, RecordingDescriptor};
use crate::session::{SessionStatus, StartOutcome};
use tauri::command;

/// Start recording with the current selection.
///
/// Refusals (already recording, no stream) come back as an outcome, not an error.
#[command]
pub async fn start_recording() -> Result<StartOutcome, String> {
    let mut guard = lock_controller().await;
    let controller = guard.as_mut().ok_or("Controller unavailable")?;
    Ok(controller.start().await)
}

/// Stop recording and return the new catalog entry, if anything was recording
#[command]
pub async fn stop_recording() -> Result<Option<RecordingDescriptor>, String> {
    let mut guard = lock_controller().await;
    let controller = guard.as_mut().ok_or("Controller unavailable")?;

    let index = controller.stop().await.map_err(|e| e.to_string())?;
    Ok(index.and_then(|i| controller.catalog().get(i).cloned()))
}

/// Current session status. Does not wait for a stop that is still
/// finalizing; the Idle flip is visible immediately.
#[command]
pub async fn get_recording_status() -> Result<SessionStatus, String> {
    Ok(current_status())
}

#[command]
pub async fn list_recordings() -> Result<Vec<RecordingDescriptor>, String> {
    let guard = lock_controller().await;
    let controller = guard.as_ref().ok_or("Controller unavailable")?;
    Ok(controller.catalog().list().to_vec())
}

/// Attach playback metadata reported by the frontend player
#[command]
pub async fn attach_recording_metadata(
    index: usize,
    metadata: ClipMetadata,
) -> Result<RecordingDescriptor, String> {
    let mut guard = lock_controller().await;
    let controller = guard.as_mut().ok_or("Controller unavailable")?;

    controller
        .attach_metadata(index, metadata)
        .map_err(|e| e.to_string())?;
    controller
        .catalog()
        .get(index)
        .cloned()
        .ok_or_else(|| format!("Recording {} not found", index))
}
