//! Native camera provider backed by nokhwa
//!
//! Each stream owns a capture thread that holds the nokhwa camera and keeps
//! the most recent RGB frame. The camera never leaves that thread.

use super::{CaptureProvider, LiveStream, StreamConstraints, StreamInfo};
use crate::errors::CaptureError;
use crate::permissions::check_permission;
use crate::types::{CapabilitySnapshot, DeviceId, FacingMode};
use async_trait::async_trait;
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    },
    Camera,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;

/// One decoded RGB24 frame
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// State shared between a stream and its capture thread
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Arc<RgbFrame>>>,
    sequence: AtomicU64,
    stop: AtomicBool,
}

impl FrameSlot {
    pub fn latest(&self) -> Option<Arc<RgbFrame>> {
        self.latest.lock().ok().and_then(|f| f.clone())
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn publish(&self, width: u32, height: u32, data: Vec<u8>) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(Arc::new(RgbFrame {
                sequence,
                width,
                height,
                data,
            }));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NativeCaptureProvider {
    backend: Backend,
}

/// Thin wrapper so the provider stays `Debug + Default`
#[derive(Debug, Clone, Copy)]
struct Backend(ApiBackend);

impl Default for Backend {
    fn default() -> Self {
        Backend(ApiBackend::Auto)
    }
}

impl NativeCaptureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(backend: ApiBackend) -> Self {
        Self {
            backend: Backend(backend),
        }
    }
}

fn parse_index(device_id: &DeviceId) -> Result<CameraIndex, CaptureError> {
    device_id
        .as_str()
        .parse::<u32>()
        .map(CameraIndex::Index)
        .map_err(|_| CaptureError::MediaAccess(format!("Invalid device ID: {}", device_id)))
}

fn open_error(e: nokhwa::NokhwaError) -> CaptureError {
    let message = e.to_string();
    if message.to_lowercase().contains("permission") {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::MediaAccess(format!("Failed to open camera: {}", message))
    }
}

/// Capability ranges from the formats a camera advertises
fn snapshot_from_camera(camera: &mut Camera) -> CapabilitySnapshot {
    match camera.compatible_camera_formats() {
        Ok(formats) if !formats.is_empty() => CapabilitySnapshot {
            max_frame_rate: formats.iter().map(|f| f.frame_rate() as f64).reduce(f64::max),
            max_width: formats.iter().map(|f| f.resolution().width_x).max(),
            max_height: formats.iter().map(|f| f.resolution().height_y).max(),
        },
        Ok(_) => CapabilitySnapshot::default(),
        Err(e) => {
            log::warn!("Camera did not report compatible formats: {}", e);
            let format = camera.camera_format();
            CapabilitySnapshot::new(
                Some(format.frame_rate() as f64),
                Some(format.resolution().width_x),
                Some(format.resolution().height_y),
            )
        }
    }
}

/// Only the constraints that are set reach the device: a missing frame rate
/// leaves the rate to the camera
fn requested_format_type(constraints: &StreamConstraints) -> RequestedFormatType {
    match (constraints.width, constraints.height, constraints.frame_rate) {
        (Some(width), Some(height), Some(fps)) => RequestedFormatType::Closest(CameraFormat::new(
            nokhwa::utils::Resolution::new(width, height),
            FrameFormat::MJPEG,
            fps,
        )),
        (Some(width), Some(height), None) => {
            RequestedFormatType::HighestResolution(nokhwa::utils::Resolution::new(width, height))
        }
        (_, _, Some(fps)) => RequestedFormatType::HighestFrameRate(fps),
        (_, _, None) => RequestedFormatType::AbsoluteHighestResolution,
    }
}

fn requested_format(constraints: &StreamConstraints) -> RequestedFormat<'static> {
    RequestedFormat::new::<RgbFormat>(requested_format_type(constraints))
}

#[async_trait]
impl CaptureProvider for NativeCaptureProvider {
    type Stream = NativeStream;

    async fn enumerate_video_inputs(&self) -> Result<Vec<DeviceId>, CaptureError> {
        let backend = self.backend.0;
        let cameras = tokio::task::spawn_blocking(move || query(backend))
            .await
            .map_err(|e| CaptureError::MediaAccess(format!("Device query task failed: {}", e)))?
            .map_err(|e| CaptureError::MediaAccess(format!("Failed to query cameras: {}", e)))?;

        Ok(cameras
            .iter()
            .map(|info| {
                log::debug!("Found camera [{}] {}", info.index(), info.human_name());
                match info.index() {
                    CameraIndex::Index(i) => DeviceId::new(i.to_string()),
                    CameraIndex::String(s) => DeviceId::new(s.clone()),
                }
            })
            .collect())
    }

    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Self::Stream, CaptureError> {
        check_permission().ensure_allowed()?;

        let index = match &constraints.device_id {
            Some(id) => parse_index(id)?,
            None => CameraIndex::Index(0),
        };
        if constraints.facing_mode == FacingMode::User {
            log::debug!("Facing mode is advisory for native cameras");
        }

        let requested = requested_format(constraints);
        let slot = Arc::new(FrameSlot::default());
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread_slot = slot.clone();
        let thread = std::thread::Builder::new()
            .name("crabclip-capture".to_string())
            .spawn(move || capture_loop(index, requested, thread_slot, ready_tx))
            .map_err(|e| CaptureError::MediaAccess(format!("Failed to spawn capture thread: {}", e)))?;

        let ready = ready_rx
            .await
            .map_err(|_| CaptureError::MediaAccess("Capture thread exited early".to_string()));

        match ready.and_then(|r| r) {
            Ok((info, capability)) => Ok(NativeStream {
                info,
                capability,
                slot,
                thread: Some(thread),
            }),
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    async fn get_capabilities(
        &self,
        device_id: &DeviceId,
        _facing_mode: FacingMode,
    ) -> Result<CapabilitySnapshot, CaptureError> {
        check_permission().ensure_allowed()?;
        let index = parse_index(device_id)?;

        // Opening without streaming is enough to list formats; the camera is
        // dropped (released) before the task returns
        tokio::task::spawn_blocking(move || {
            let mut camera = Camera::new(
                index,
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
            )
            .map_err(open_error)?;
            Ok(snapshot_from_camera(&mut camera))
        })
        .await
        .map_err(|e| CaptureError::MediaAccess(format!("Capability task failed: {}", e)))?
    }
}

type Ready = Result<(StreamInfo, CapabilitySnapshot), CaptureError>;

fn capture_loop(
    index: CameraIndex,
    requested: RequestedFormat<'static>,
    slot: Arc<FrameSlot>,
    ready: oneshot::Sender<Ready>,
) {
    let device_id = DeviceId::new(index.to_string());
    let mut camera = match Camera::new(index, requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(open_error(e)));
            return;
        }
    };

    let capability = snapshot_from_camera(&mut camera);

    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(CaptureError::MediaAccess(format!(
            "Failed to start stream: {}",
            e
        ))));
        return;
    }

    let format = camera.camera_format();
    let info = StreamInfo {
        id: uuid::Uuid::new_v4().to_string(),
        device_id: Some(device_id),
        width: format.resolution().width_x,
        height: format.resolution().height_y,
        frame_rate: Some(format.frame_rate() as f64),
    };
    if ready.send(Ok((info, capability))).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    while !slot.is_stopped() {
        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Frame capture failed: {}", e);
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        let resolution = frame.resolution();
        match frame.decode_image::<RgbFormat>() {
            Ok(image) => slot.publish(resolution.width_x, resolution.height_y, image.into_raw()),
            Err(e) => log::debug!("Frame decode failed: {}", e),
        }
    }

    if let Err(e) = camera.stop_stream() {
        log::warn!("Failed to stop camera stream: {}", e);
    }
}

/// Live native stream; frames are read through [`NativeStream::frames`]
pub struct NativeStream {
    info: StreamInfo,
    capability: CapabilitySnapshot,
    slot: Arc<FrameSlot>,
    thread: Option<JoinHandle<()>>,
}

impl NativeStream {
    /// Shared view of the stream's latest frame, for recorders
    pub fn frames(&self) -> Arc<FrameSlot> {
        self.slot.clone()
    }
}

impl LiveStream for NativeStream {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }

    fn capabilities(&self) -> CapabilitySnapshot {
        self.capability
    }

    fn stop_all_tracks(&mut self) {
        self.slot.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            release_capture_thread(thread, self.info.id.clone());
        }
    }

    fn is_live(&self) -> bool {
        self.thread.is_some() && !self.slot.is_stopped()
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

/// Join the capture thread, which may still be inside a blocking
/// `camera.frame()`. Inside a tokio runtime the join runs on the blocking
/// pool so no async worker waits on the camera.
fn release_capture_thread(thread: JoinHandle<()>, stream_id: String) {
    let join = move || {
        if thread.join().is_err() {
            log::warn!("Capture thread panicked while stopping");
        }
        log::info!("Stream {} released", stream_id);
    };

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(join);
        }
        Err(_) => join(),
    }
}
