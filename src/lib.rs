//! CrabClip: capture-parameter negotiation and clip recording for Tauri applications
//!
//! Probes a camera's capability ranges, derives a consistent resolution,
//! frame rate and bit rate from them, drives the start/stop recording cycle
//! against a live stream, and keeps a catalog of finished clips.
//!
//! # Features
//! - Capability probing with guaranteed stream release
//! - Dependency-ordered parameter derivation with user overrides
//! - Portrait/landscape aware stream constraints
//! - Exclusive recording sessions with an observable status
//! - Clip catalog with late metadata attachment
//! - Optional transaction/span instrumentation
//!
//! # Usage
//! ```toml
//! [dependencies]
//! crabclip = { version = "0.1", features = ["plugin"] }
//! ```
//!
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(crabclip::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! Without the plugin, drive a [`CaptureController`] directly:
//! ```rust
//! use crabclip::config::CrabClipConfig;
//! use crabclip::testing::{SyntheticCamera, SyntheticRecorder};
//! use crabclip::CaptureController;
//!
//! # tokio_test::block_on(async {
//! let config = CrabClipConfig::default();
//! let mut controller =
//!     CaptureController::new(&config, SyntheticCamera::hd720(), SyntheticRecorder::new());
//! controller.probe().await;
//! assert!(controller.start().await.is_started());
//! let index = controller.stop().await.unwrap().unwrap();
//! assert_eq!(controller.catalog().list()[index].name, "VideoRecord-1");
//! # });
//! ```
pub mod acquire;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod errors;
pub mod monitoring;
pub mod platform;
pub mod probe;
pub mod selection;
pub mod session;
pub mod types;

#[cfg(feature = "native")]
pub mod permissions;

#[cfg(feature = "recording")]
pub mod recording;

#[cfg(feature = "plugin")]
pub mod commands;

// Synthetic providers - available for external tests
pub mod testing;

pub use catalog::{ClipMetadata, RecordingCatalog, RecordingDescriptor};
pub use controller::CaptureController;
pub use errors::CaptureError;
pub use session::{SessionStatus, StartOutcome};
pub use types::{
    BitRate, CapabilitySnapshot, ContainerFormat, FrameRate, Orientation, Resolution,
    SelectionState,
};

#[cfg(feature = "plugin")]
use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the CrabClip plugin with all commands
#[cfg(feature = "plugin")]
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("crabclip")
        .invoke_handler(tauri::generate_handler![
            // Capability and selection
            commands::capture::probe_camera,
            commands::capture::get_capture_state,
            commands::capture::get_frame_rate_options,
            commands::capture::set_resolution,
            commands::capture::set_frame_rate,
            // Recording lifecycle
            commands::recording::start_recording,
            commands::recording::stop_recording,
            commands::recording::get_recording_status,
            commands::recording::list_recordings,
            commands::recording::attach_recording_metadata,
            // Configuration
            commands::config::get_config,
            commands::config::update_config,
            commands::config::reset_config,
        ])
        .build()
}

/// Initialize logging for the capture system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabclip=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        features: enabled_features(),
    }
}

fn enabled_features() -> Vec<String> {
    let mut features = Vec::new();
    if cfg!(feature = "native") {
        features.push("native".to_string());
    }
    if cfg!(feature = "recording") {
        features.push("recording".to_string());
    }
    if cfg!(feature = "plugin") {
        features.push("plugin".to_string());
    }
    features
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub features: Vec<String>,
}
