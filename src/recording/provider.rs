//! Recording engine for native streams
//!
//! A started recorder polls the stream's latest frame at the stream frame
//! rate on its own thread and feeds new frames into an MP4 clip writer.
//! Timestamps come from wall-clock time since `start`.

use super::writer::{ClipSettings, ClipStats, Mp4ClipWriter};
use crate::catalog::ClipMetadata;
use crate::errors::CaptureError;
use crate::platform::native::{FrameSlot, NativeStream};
use crate::platform::{LiveStream, RecordedBlob, RecorderOptions, RecorderProvider};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const MP4_MIME_TYPE: &str = "video/mp4";

const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct NativeRecorderProvider {
    output_directory: PathBuf,
}

impl NativeRecorderProvider {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    fn next_output_path(&self) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.output_directory
            .join(format!("clip-{}-{}.mp4", stamp, &suffix[..8]))
    }
}

/// A recorder bound to one native stream
pub struct NativeRecorderHandle {
    output_path: PathBuf,
    frames: Arc<FrameSlot>,
    settings: ClipSettings,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<ClipStats, CaptureError>>>,
}

impl NativeRecorderHandle {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some() && !self.stop.load(Ordering::Relaxed)
    }
}

impl Drop for NativeRecorderHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl RecorderProvider for NativeRecorderProvider {
    type Stream = NativeStream;
    type Handle = NativeRecorderHandle;

    fn supports_mime_type(&self, mime_type: &str) -> bool {
        mime_type
            .split(';')
            .next()
            .map(|base| base.trim().eq_ignore_ascii_case(MP4_MIME_TYPE))
            .unwrap_or(false)
    }

    fn create(
        &self,
        stream: &NativeStream,
        options: &RecorderOptions,
    ) -> Result<NativeRecorderHandle, CaptureError> {
        if !self.supports_mime_type(&options.mime_type) {
            return Err(CaptureError::Recorder(format!(
                "Unsupported container: {}",
                options.mime_type
            )));
        }
        if !stream.is_live() {
            return Err(CaptureError::Recorder("Stream is not live".to_string()));
        }

        std::fs::create_dir_all(&self.output_directory)?;

        let info = stream.info();
        let settings = ClipSettings {
            width: info.width,
            height: info.height,
            fps: info
                .frame_rate
                .filter(|fps| fps.is_finite() && *fps > 0.0)
                .unwrap_or(DEFAULT_FPS),
            bits_per_second: options.bits_per_second,
            title: None,
        };

        Ok(NativeRecorderHandle {
            output_path: self.next_output_path(),
            frames: stream.frames(),
            settings,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }

    fn start(&self, handle: &mut NativeRecorderHandle) -> Result<(), CaptureError> {
        if handle.worker.is_some() {
            return Err(CaptureError::Recorder("Recorder already started".to_string()));
        }

        let path = handle.output_path.clone();
        let settings = handle.settings.clone();
        let frames = handle.frames.clone();
        let stop = handle.stop.clone();
        let interval = Duration::from_secs_f64(1.0 / handle.settings.fps);
        let (ready_tx, ready_rx) = mpsc::channel();

        // The encoder is created on, and never leaves, the worker thread
        let worker = std::thread::Builder::new()
            .name("crabclip-recorder".to_string())
            .spawn(move || {
                let writer = match Mp4ClipWriter::create(&path, settings) {
                    Ok(writer) => writer,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.clone()));
                        return Err(e);
                    }
                };
                let _ = ready_tx.send(Ok(()));
                record_loop(writer, frames, stop, interval)
            })
            .map_err(|e| CaptureError::Recorder(format!("Failed to spawn recorder thread: {}", e)))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| CaptureError::Recorder("Recorder thread exited early".to_string()))
            .and_then(|r| r);
        if let Err(e) = ready {
            let _ = worker.join();
            return Err(e);
        }

        log::info!(
            "Recording {}x{} @ {:.0} fps to {}",
            handle.settings.width,
            handle.settings.height,
            handle.settings.fps,
            handle.output_path.display()
        );
        handle.worker = Some(worker);
        Ok(())
    }

    async fn stop(&self, mut handle: NativeRecorderHandle) -> Result<RecordedBlob, CaptureError> {
        handle.stop.store(true, Ordering::Relaxed);
        let worker = handle
            .worker
            .take()
            .ok_or_else(|| CaptureError::Recorder("Recorder was never started".to_string()))?;

        let stats = tokio::task::spawn_blocking(move || worker.join())
            .await
            .map_err(|e| CaptureError::Recorder(format!("Recorder join task failed: {}", e)))?
            .map_err(|_| CaptureError::Recorder("Recorder thread panicked".to_string()))??;

        log::info!(
            "Finalized {} ({} frames, {} dropped, {:.2}s)",
            stats.output_path.display(),
            stats.video_frames,
            stats.dropped_frames,
            stats.duration_secs
        );

        Ok(blob_from_stats(&stats))
    }
}

fn blob_from_stats(stats: &ClipStats) -> RecordedBlob {
    let size = std::fs::metadata(&stats.output_path)
        .map(|m| m.len())
        .unwrap_or(stats.bytes_written);

    RecordedBlob {
        size,
        mime_type: MP4_MIME_TYPE.to_string(),
        url: format!("file://{}", stats.output_path.display()),
        metadata: Some(
            ClipMetadata::default()
                .with_duration(stats.duration_secs)
                .with_dimensions(stats.width, stats.height),
        ),
    }
}

fn record_loop(
    mut writer: Mp4ClipWriter,
    frames: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) -> Result<ClipStats, CaptureError> {
    let started = Instant::now();
    let mut last_sequence = 0u64;

    // The source stream stopping also ends the clip
    while !stop.load(Ordering::Relaxed) && !frames.is_stopped() {
        if let Some(frame) = frames.latest() {
            if frame.sequence != last_sequence {
                last_sequence = frame.sequence;
                let pts = started.elapsed().as_secs_f64();
                writer.write_rgb(&frame.data, frame.width, frame.height, pts)?;
            }
        }
        std::thread::sleep(interval);
    }

    writer.finish()
}
