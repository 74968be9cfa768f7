//! Native recording engine
//!
//! - openh264 for H.264 encoding
//! - muxide for MP4 muxing
//!
//! [`NativeRecorderProvider`] binds the engine to a [`crate::platform::NativeStream`]
//! so the controller can drive it like any other recorder:
//! ```rust,ignore
//! use crabclip::platform::NativeCaptureProvider;
//! use crabclip::recording::NativeRecorderProvider;
//!
//! let controller = CaptureController::new(
//!     &config,
//!     NativeCaptureProvider::new(),
//!     NativeRecorderProvider::new(&config.recording.output_directory),
//! );
//! ```

mod encoder;
mod provider;
mod writer;

pub use encoder::{EncodedFrame, H264Encoder};
pub use provider::{NativeRecorderHandle, NativeRecorderProvider, MP4_MIME_TYPE};
pub use writer::{ClipSettings, ClipStats, Mp4ClipWriter};
