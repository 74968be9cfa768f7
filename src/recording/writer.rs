//! MP4 clip writer combining the H.264 encoder and the muxide muxer

use super::encoder::H264Encoder;
use crate::errors::CaptureError;
use muxide::api::{Metadata, MuxerBuilder, VideoCodec};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub bits_per_second: Option<u64>,
    pub title: Option<String>,
}

/// Statistics of a finished clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipStats {
    pub video_frames: u64,
    pub dropped_frames: u64,
    pub duration_secs: f64,
    pub bytes_written: u64,
    pub width: u32,
    pub height: u32,
    pub output_path: PathBuf,
}

pub struct Mp4ClipWriter {
    encoder: H264Encoder,
    muxer: muxide::api::Muxer<BufWriter<File>>,
    settings: ClipSettings,
    output_path: PathBuf,
    frame_count: u64,
    dropped_frames: u64,
    last_pts: Option<f64>,
}

impl Mp4ClipWriter {
    pub fn create<P: AsRef<Path>>(output_path: P, settings: ClipSettings) -> Result<Self, CaptureError> {
        let output_path = output_path.as_ref().to_path_buf();
        let file = File::create(&output_path)
            .map_err(|e| CaptureError::Io(format!("Failed to create output file: {}", e)))?;

        let encoder = H264Encoder::new(settings.width, settings.height, settings.bits_per_second)?;

        let mut metadata = Metadata::new().with_current_time();
        if let Some(title) = &settings.title {
            metadata = metadata.with_title(title);
        }

        let muxer = MuxerBuilder::new(BufWriter::new(file))
            .video(VideoCodec::H264, settings.width, settings.height, settings.fps)
            .with_fast_start(true)
            .with_metadata(metadata)
            .build()
            .map_err(|e| CaptureError::Recorder(format!("Failed to create muxer: {}", e)))?;

        Ok(Self {
            encoder,
            muxer,
            settings,
            output_path,
            frame_count: 0,
            dropped_frames: 0,
            last_pts: None,
        })
    }

    /// Encode one RGB24 frame at `pts` seconds from clip start.
    /// Frames of the wrong size or with non-increasing timestamps are dropped.
    pub fn write_rgb(&mut self, rgb: &[u8], width: u32, height: u32, pts: f64) -> Result<(), CaptureError> {
        if width != self.settings.width || height != self.settings.height {
            self.dropped_frames += 1;
            log::debug!(
                "Dropping {}x{} frame for {}x{} clip",
                width,
                height,
                self.settings.width,
                self.settings.height
            );
            return Ok(());
        }
        if self.last_pts.map(|last| pts <= last).unwrap_or(false) {
            self.dropped_frames += 1;
            return Ok(());
        }

        let encoded = self.encoder.encode_rgb(rgb)?;
        if encoded.data.is_empty() {
            self.dropped_frames += 1;
            return Ok(());
        }

        self.muxer
            .write_video(pts, &encoded.data, encoded.is_keyframe)
            .map_err(|e| CaptureError::Recorder(format!("Failed to write frame: {}", e)))?;

        self.frame_count += 1;
        self.last_pts = Some(pts);
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn finish(self) -> Result<ClipStats, CaptureError> {
        let stats = self
            .muxer
            .finish_with_stats()
            .map_err(|e| CaptureError::Recorder(format!("Failed to finalize recording: {}", e)))?;

        Ok(ClipStats {
            video_frames: stats.video_frames,
            dropped_frames: self.dropped_frames,
            duration_secs: stats.duration_secs,
            bytes_written: stats.bytes_written,
            width: self.settings.width,
            height: self.settings.height,
            output_path: self.output_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ClipSettings {
        ClipSettings {
            width: 320,
            height: 240,
            fps: 15.0,
            bits_per_second: Some(800_000),
            title: Some("writer test".to_string()),
        }
    }

    #[test]
    fn test_write_and_finish() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.mp4");
        let mut writer = Mp4ClipWriter::create(&path, settings()).expect("writer");

        for i in 0..15u64 {
            let rgb = vec![(i * 10) as u8; 320 * 240 * 3];
            writer.write_rgb(&rgb, 320, 240, i as f64 / 15.0).expect("write");
        }
        assert_eq!(writer.frame_count(), 15);

        let stats = writer.finish().expect("finish");
        assert_eq!(stats.video_frames, 15);
        assert!(stats.bytes_written > 0);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_mismatched_and_stale_frames_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut writer = Mp4ClipWriter::create(dir.path().join("drops.mp4"), settings()).expect("writer");

        writer.write_rgb(&vec![0u8; 320 * 240 * 3], 320, 240, 0.0).unwrap();
        writer.write_rgb(&vec![0u8; 16 * 16 * 3], 16, 16, 0.1).unwrap();
        writer.write_rgb(&vec![0u8; 320 * 240 * 3], 320, 240, 0.0).unwrap();

        let stats = writer.finish().expect("finish");
        assert_eq!(stats.video_frames, 1);
        assert_eq!(stats.dropped_frames, 2);
    }
}
