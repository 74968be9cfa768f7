//! Testing utilities for CrabClip
//!
//! Synthetic camera and recorder providers that behave like real devices
//! (capability reports, permission refusal, finalize latency) and count live
//! resources, so lifecycle guarantees can be checked offline.

pub mod synthetic;

pub use synthetic::{CollectingSink, RecordingPreview, SyntheticCamera, SyntheticRecorder, SyntheticStream};
