//! Synthetic providers modelled on a browser's media-capture behavior

use crate::catalog::ClipMetadata;
use crate::errors::CaptureError;
use crate::monitoring::{InstrumentationSink, MonitoringError, MonitoringEvent};
use crate::platform::{
    CaptureProvider, LiveStream, PreviewSink, RecordedBlob, RecorderOptions, RecorderProvider,
    StreamConstraints, StreamInfo,
};
use crate::types::{CapabilitySnapshot, DeviceId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct CameraCounters {
    open_streams: AtomicUsize,
    requested: AtomicUsize,
}

/// Camera that reports a fixed capability snapshot
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    devices: Vec<DeviceId>,
    capability: CapabilitySnapshot,
    deny_permission: bool,
    fail_streams: bool,
    last_constraints: Arc<Mutex<Option<StreamConstraints>>>,
    counters: Arc<CameraCounters>,
}

impl SyntheticCamera {
    pub fn new(capability: CapabilitySnapshot) -> Self {
        Self {
            devices: vec![DeviceId::new("synthetic-0")],
            capability,
            deny_permission: false,
            fail_streams: false,
            last_constraints: Arc::new(Mutex::new(None)),
            counters: Arc::new(CameraCounters::default()),
        }
    }

    /// Camera advertising 1280x720 at up to 30 fps
    pub fn hd720() -> Self {
        Self::new(CapabilitySnapshot::new(Some(30.0), Some(1280), Some(720)))
    }

    pub fn without_devices() -> Self {
        let mut camera = Self::new(CapabilitySnapshot::default());
        camera.devices.clear();
        camera
    }

    /// Every stream request is refused as if the user denied access
    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Probing works, but recording streams cannot be satisfied
    pub fn failing_streams(mut self) -> Self {
        self.fail_streams = true;
        self
    }

    pub fn open_streams(&self) -> usize {
        self.counters.open_streams.load(Ordering::SeqCst)
    }

    pub fn streams_requested(&self) -> usize {
        self.counters.requested.load(Ordering::SeqCst)
    }

    pub fn last_constraints(&self) -> Option<StreamConstraints> {
        self.last_constraints.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl CaptureProvider for SyntheticCamera {
    type Stream = SyntheticStream;

    async fn enumerate_video_inputs(&self) -> Result<Vec<DeviceId>, CaptureError> {
        Ok(self.devices.clone())
    }

    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Self::Stream, CaptureError> {
        self.counters.requested.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_constraints.lock() {
            *last = Some(constraints.clone());
        }

        if self.deny_permission {
            return Err(CaptureError::PermissionDenied(
                "user dismissed the camera prompt".to_string(),
            ));
        }
        if self.fail_streams && constraints.device_id.is_none() {
            return Err(CaptureError::MediaAccess(
                "constraints could not be satisfied".to_string(),
            ));
        }

        let sequence = self.counters.requested.load(Ordering::SeqCst);
        self.counters.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(SyntheticStream {
            info: StreamInfo {
                id: format!("synthetic-stream-{}", sequence),
                device_id: constraints
                    .device_id
                    .clone()
                    .or_else(|| self.devices.first().cloned()),
                width: constraints.width.or(self.capability.max_width).unwrap_or(640),
                height: constraints.height.or(self.capability.max_height).unwrap_or(480),
                frame_rate: constraints
                    .frame_rate
                    .map(f64::from)
                    .or(self.capability.max_frame_rate),
            },
            capability: self.capability,
            live: true,
            counters: self.counters.clone(),
        })
    }
}

#[derive(Debug)]
pub struct SyntheticStream {
    info: StreamInfo,
    capability: CapabilitySnapshot,
    live: bool,
    counters: Arc<CameraCounters>,
}

impl LiveStream for SyntheticStream {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }

    fn capabilities(&self) -> CapabilitySnapshot {
        self.capability
    }

    fn stop_all_tracks(&mut self) {
        if self.live {
            self.live = false;
            self.counters.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

#[derive(Debug, Default)]
struct RecorderCounters {
    live: AtomicUsize,
    created: AtomicUsize,
}

/// Recorder producing blobs of a fixed size after a short flush delay
#[derive(Debug, Clone)]
pub struct SyntheticRecorder {
    supported: Vec<String>,
    blob_size: u64,
    flush_delay: Duration,
    metadata: Option<ClipMetadata>,
    fail_create: bool,
    fail_stop: bool,
    last_options: Arc<Mutex<Option<RecorderOptions>>>,
    counters: Arc<RecorderCounters>,
}

impl SyntheticRecorder {
    pub fn new() -> Self {
        Self {
            supported: vec![
                "video/webm;codecs=vp8".to_string(),
                "video/mp4".to_string(),
            ],
            blob_size: 1_572_864,
            flush_delay: Duration::from_millis(5),
            metadata: None,
            fail_create: false,
            fail_stop: false,
            last_options: Arc::new(Mutex::new(None)),
            counters: Arc::new(RecorderCounters::default()),
        }
    }

    /// Restrict supported mime types, e.g. to model an MP4-only runtime
    pub fn supporting(mut self, mime_types: &[&str]) -> Self {
        self.supported = mime_types.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_blob_size(mut self, size: u64) -> Self {
        self.blob_size = size;
        self
    }

    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    /// Metadata reported together with the finished blob
    pub fn with_metadata(mut self, metadata: ClipMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Recorders created and not yet stopped
    pub fn live_recorders(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn recorders_created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<RecorderOptions> {
        self.last_options.lock().ok().and_then(|o| o.clone())
    }
}

impl Default for SyntheticRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct SyntheticRecorderHandle {
    id: usize,
    mime_type: String,
    stream_id: String,
    started: Arc<AtomicBool>,
}

#[async_trait]
impl RecorderProvider for SyntheticRecorder {
    type Stream = SyntheticStream;
    type Handle = SyntheticRecorderHandle;

    fn supports_mime_type(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|m| m == mime_type)
    }

    fn create(
        &self,
        stream: &Self::Stream,
        options: &RecorderOptions,
    ) -> Result<Self::Handle, CaptureError> {
        if self.fail_create {
            return Err(CaptureError::Recorder("recorder could not be created".to_string()));
        }
        if !stream.is_live() {
            return Err(CaptureError::Recorder("stream has ended".to_string()));
        }
        if let Ok(mut last) = self.last_options.lock() {
            *last = Some(options.clone());
        }

        let id = self.counters.created.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        Ok(SyntheticRecorderHandle {
            id,
            mime_type: options.mime_type.clone(),
            stream_id: stream.info().id,
            started: Arc::new(AtomicBool::new(false)),
        })
    }

    fn start(&self, handle: &mut Self::Handle) -> Result<(), CaptureError> {
        handle.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, handle: Self::Handle) -> Result<RecordedBlob, CaptureError> {
        tokio::time::sleep(self.flush_delay).await;
        self.counters.live.fetch_sub(1, Ordering::SeqCst);

        if self.fail_stop || !handle.started.load(Ordering::SeqCst) {
            return Err(CaptureError::Recorder(format!(
                "recorder {} failed to flush",
                handle.id
            )));
        }

        let mime_type = handle
            .mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(RecordedBlob {
            size: self.blob_size,
            mime_type,
            url: format!("blob:synthetic/{}/{}", handle.stream_id, handle.id),
            metadata: self.metadata,
        })
    }
}

/// Instrumentation sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<MonitoringEvent>>,
    failing: bool,
}

impl CollectingSink {
    /// Sink whose every write fails
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn events(&self) -> Vec<MonitoringEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl InstrumentationSink for CollectingSink {
    fn record(&self, event: MonitoringEvent) -> Result<(), MonitoringError> {
        if self.failing {
            return Err(MonitoringError::Unavailable("collector offline".to_string()));
        }
        self.events
            .lock()
            .map_err(|_| MonitoringError::Rejected("collector lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Preview sink that remembers which stream it shows
#[derive(Debug, Clone, Default)]
pub struct RecordingPreview {
    current: Arc<Mutex<Option<String>>>,
}

impl RecordingPreview {
    pub fn current(&self) -> Option<String> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

impl PreviewSink for RecordingPreview {
    fn attach(&mut self, stream: &StreamInfo) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(stream.id.clone());
        }
    }

    fn clear(&mut self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }
}
