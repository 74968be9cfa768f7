pub mod capture;
pub mod config;
pub mod recording;

pub use capture::*;
pub use config::*;
pub use recording::*;

use crate::controller::CaptureController;
use crate::monitoring::Monitor;
use crate::platform::NativeCaptureProvider;
use crate::recording::NativeRecorderProvider;
use crate::session::SessionStatus;
use std::sync::{Arc, RwLock};
use tokio::sync::{watch, Mutex as AsyncMutex, MutexGuard};

pub(crate) type NativeController = CaptureController<NativeCaptureProvider, NativeRecorderProvider>;

// Process-wide controller, built from the current config on first use
lazy_static::lazy_static! {
    static ref CONTROLLER: Arc<AsyncMutex<Option<NativeController>>> = Arc::new(AsyncMutex::new(None));
    // Status observer readable while a command holds the controller, e.g.
    // during a stop that is still finalizing
    static ref STATUS: RwLock<Option<watch::Receiver<SessionStatus>>> = RwLock::new(None);
}

fn track_status(receiver: Option<watch::Receiver<SessionStatus>>) {
    match STATUS.write() {
        Ok(mut status) => *status = receiver,
        Err(poisoned) => *poisoned.into_inner() = receiver,
    }
}

/// Latest published session status; Idle when no controller exists yet
pub(crate) fn current_status() -> SessionStatus {
    let status = match STATUS.read() {
        Ok(status) => status,
        Err(poisoned) => poisoned.into_inner(),
    };
    status
        .as_ref()
        .map(|receiver| *receiver.borrow())
        .unwrap_or_default()
}

fn build_controller() -> NativeController {
    let config = config::current_config();
    let recorder = NativeRecorderProvider::new(&config.recording.output_directory);
    CaptureController::new(&config, NativeCaptureProvider::new(), recorder)
        .with_monitor(Monitor::from_config(&config.monitoring))
}

pub(crate) async fn lock_controller() -> MutexGuard<'static, Option<NativeController>> {
    let mut guard = CONTROLLER.lock().await;
    if guard.is_none() {
        let controller = build_controller();
        track_status(Some(controller.subscribe_status()));
        *guard = Some(controller);
    }
    guard
}

/// Drop the controller so the next command rebuilds it from the current
/// config. Refused while a recording is active.
pub(crate) async fn reset_controller() -> Result<(), String> {
    let mut guard = CONTROLLER.lock().await;
    if let Some(controller) = guard.as_ref() {
        if controller.status() == crate::session::SessionStatus::Recording {
            return Err("Cannot apply configuration while recording".to_string());
        }
    }
    *guard = None;
    track_status(None);
    Ok(())
}
