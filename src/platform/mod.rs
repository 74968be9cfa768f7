//! Provider seams for the media-capture subsystem and the recording engine
//!
//! The controller only talks to cameras and encoders through these traits.
//! `native` backs them with nokhwa/openh264; `crate::testing` backs them with
//! synthetic devices for offline use.

use crate::catalog::ClipMetadata;
use crate::errors::CaptureError;
use crate::types::{CapabilitySnapshot, DeviceId, FacingMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "native")]
pub use native::{NativeCaptureProvider, NativeStream};

/// Constraints passed when requesting a live stream. `None` means the
/// device is free to choose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamConstraints {
    pub device_id: Option<DeviceId>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
    pub facing_mode: FacingMode,
}

impl StreamConstraints {
    /// Constraints used only to open a device for capability inspection
    pub fn for_device(device_id: DeviceId, facing_mode: FacingMode) -> Self {
        Self {
            device_id: Some(device_id),
            facing_mode,
            ..Default::default()
        }
    }
}

/// Describes a live stream to preview sinks and log lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: String,
    pub device_id: Option<DeviceId>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
}

/// A live camera stream. Dropping without `stop_all_tracks` is a leak the
/// controller never allows.
pub trait LiveStream: Send {
    fn info(&self) -> StreamInfo;

    /// Capability ranges of the device backing this stream
    fn capabilities(&self) -> CapabilitySnapshot;

    /// Stop and release every track. Must be idempotent.
    fn stop_all_tracks(&mut self);

    fn is_live(&self) -> bool;
}

#[async_trait]
pub trait CaptureProvider: Send + Sync {
    type Stream: LiveStream + 'static;

    async fn enumerate_video_inputs(&self) -> Result<Vec<DeviceId>, CaptureError>;

    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Self::Stream, CaptureError>;

    /// Briefly opens the device to read its capabilities, then releases it
    async fn get_capabilities(
        &self,
        device_id: &DeviceId,
        facing_mode: FacingMode,
    ) -> Result<CapabilitySnapshot, CaptureError> {
        let constraints = StreamConstraints::for_device(device_id.clone(), facing_mode);
        let mut stream = self.request_stream(&constraints).await?;
        let snapshot = stream.capabilities();
        stream.stop_all_tracks();
        Ok(snapshot)
    }
}

/// Options handed to the recording engine when binding it to a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderOptions {
    pub mime_type: String,
    pub bits_per_second: Option<u64>,
}

/// Output of a finished recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedBlob {
    pub size: u64,
    pub mime_type: String,
    /// Playable reference to the encoded media
    pub url: String,
    /// Playback metadata the engine already knows, if any
    pub metadata: Option<ClipMetadata>,
}

#[async_trait]
pub trait RecorderProvider: Send + Sync {
    type Stream: LiveStream;
    type Handle: Send + 'static;

    fn supports_mime_type(&self, mime_type: &str) -> bool;

    fn create(
        &self,
        stream: &Self::Stream,
        options: &RecorderOptions,
    ) -> Result<Self::Handle, CaptureError>;

    fn start(&self, handle: &mut Self::Handle) -> Result<(), CaptureError>;

    /// Flush and finalize. Consumes the handle, so completion happens once.
    async fn stop(&self, handle: Self::Handle) -> Result<RecordedBlob, CaptureError>;
}

/// Where the live stream is shown while recording
pub trait PreviewSink: Send {
    fn attach(&mut self, stream: &StreamInfo);
    fn clear(&mut self);
}

/// Preview sink for headless use
#[derive(Debug, Default)]
pub struct NoPreview;

impl PreviewSink for NoPreview {
    fn attach(&mut self, stream: &StreamInfo) {
        log::debug!("Preview attached to stream {}", stream.id);
    }

    fn clear(&mut self) {
        log::debug!("Preview cleared");
    }
}
