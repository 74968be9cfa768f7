//! Finished recordings, in completion order
//!
//! Entries are appended once and only ever enriched afterwards with playback
//! metadata that arrives late (duration, pixel dimensions). Callers keep the
//! index returned by [`RecordingCatalog::append`] to address an entry.

use crate::errors::CaptureError;
use crate::platform::RecordedBlob;
use crate::types::{BitRate, FrameRate, Resolution, SelectionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Late-arriving playback metadata for one clip
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub duration: Option<f64>,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
}

impl ClipMetadata {
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.video_width = Some(width);
        self.video_height = Some(height);
        self
    }

    /// Drop malformed fields: non-finite or negative durations (streamed
    /// WebM reports an infinite duration until seeked) and zero dimensions
    fn sanitized(self) -> Self {
        Self {
            duration: self.duration.filter(|d| d.is_finite() && *d >= 0.0),
            video_width: self.video_width.filter(|w| *w > 0),
            video_height: self.video_height.filter(|h| *h > 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDescriptor {
    /// Stable catalog slot
    pub index: usize,
    /// `VideoRecord-<N>`
    pub name: String,
    /// Name plus container extension, used as the download file name
    pub file_name: String,
    pub resolution: Option<Resolution>,
    pub bit_rate: Option<BitRate>,
    pub frame_rate: Option<FrameRate>,
    pub size_bytes: u64,
    pub size_label: String,
    pub mime_type: String,
    pub url: String,
    pub recorded_at: DateTime<Utc>,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub duration: Option<f64>,
}

impl RecordingDescriptor {
    pub fn new(
        name: String,
        extension: &str,
        selection: &SelectionState,
        blob: &RecordedBlob,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            index: 0,
            file_name: format!("{}{}", name, extension),
            name,
            resolution: selection.resolution,
            bit_rate: selection.bit_rate,
            frame_rate: selection.frame_rate,
            size_bytes: blob.size,
            size_label: size_label(blob.size),
            mime_type: blob.mime_type.clone(),
            url: blob.url.clone(),
            recorded_at,
            video_width: None,
            video_height: None,
            duration: None,
        }
    }

    fn merge(&mut self, metadata: ClipMetadata) {
        let metadata = metadata.sanitized();
        if let Some(duration) = metadata.duration {
            self.duration = Some(duration);
        }
        if let Some(width) = metadata.video_width {
            self.video_width = Some(width);
        }
        if let Some(height) = metadata.video_height {
            self.video_height = Some(height);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingCatalog {
    entries: Vec<RecordingDescriptor>,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next recording will carry (1-based)
    pub fn next_sequence(&self) -> usize {
        self.entries.len() + 1
    }

    /// Append a finished recording and return its stable index
    pub fn append(&mut self, mut descriptor: RecordingDescriptor) -> usize {
        let index = self.entries.len();
        descriptor.index = index;
        self.entries.push(descriptor);
        index
    }

    /// Merge late metadata into the entry at `index`. Repeated identical
    /// calls leave the entry unchanged.
    pub fn attach_metadata(&mut self, index: usize, metadata: ClipMetadata) -> Result<(), CaptureError> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(CaptureError::RecordingNotFound(index))?;
        entry.merge(metadata);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&RecordingDescriptor> {
        self.entries.get(index)
    }

    pub fn list(&self) -> &[RecordingDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Human readable size in 1024-based units ("n/a" for empty blobs)
pub fn size_label(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "n/a".to_string();
    }

    let mut unit = 0;
    while unit < UNITS.len() - 1 && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        let value = bytes as f64 / 1024f64.powi(unit as i32);
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(size: u64) -> RecordedBlob {
        RecordedBlob {
            size,
            mime_type: "video/mp4".to_string(),
            url: "blob:test".to_string(),
            metadata: None,
        }
    }

    fn descriptor(n: usize) -> RecordingDescriptor {
        RecordingDescriptor::new(
            format!("VideoRecord-{}", n),
            ".mp4",
            &SelectionState::default(),
            &blob(2048),
            Utc::now(),
        )
    }

    #[test]
    fn test_size_labels() {
        assert_eq!(size_label(0), "n/a");
        assert_eq!(size_label(512), "512 Bytes");
        assert_eq!(size_label(1024), "1.0 KB");
        assert_eq!(size_label(1536 * 1024), "1.5 MB");
        assert_eq!(size_label(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_append_preserves_order() {
        let mut catalog = RecordingCatalog::new();
        assert_eq!(catalog.next_sequence(), 1);
        assert_eq!(catalog.append(descriptor(1)), 0);
        assert_eq!(catalog.append(descriptor(2)), 1);
        let names: Vec<&str> = catalog.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["VideoRecord-1", "VideoRecord-2"]);
        assert_eq!(catalog.get(1).unwrap().index, 1);
        assert_eq!(catalog.get(0).unwrap().file_name, "VideoRecord-1.mp4");
    }

    #[test]
    fn test_attach_metadata_is_idempotent() {
        let mut catalog = RecordingCatalog::new();
        let index = catalog.append(descriptor(1));
        let meta = ClipMetadata::default().with_dimensions(720, 1280);

        catalog.attach_metadata(index, meta).unwrap();
        let first = catalog.get(index).unwrap().clone();
        catalog.attach_metadata(index, meta).unwrap();
        assert_eq!(catalog.get(index).unwrap(), &first);
    }

    #[test]
    fn test_attach_metadata_merges_separately() {
        let mut catalog = RecordingCatalog::new();
        let index = catalog.append(descriptor(1));
        catalog
            .attach_metadata(index, ClipMetadata::default().with_dimensions(640, 480))
            .unwrap();
        catalog
            .attach_metadata(index, ClipMetadata::default().with_duration(4.5))
            .unwrap();

        let entry = catalog.get(index).unwrap();
        assert_eq!(entry.video_width, Some(640));
        assert_eq!(entry.video_height, Some(480));
        assert_eq!(entry.duration, Some(4.5));
        assert_eq!(entry.size_label, "2.0 KB");
    }

    #[test]
    fn test_malformed_metadata_ignored_per_field() {
        let mut catalog = RecordingCatalog::new();
        let index = catalog.append(descriptor(1));
        let meta = ClipMetadata {
            duration: Some(f64::INFINITY),
            video_width: Some(0),
            video_height: Some(480),
        };
        catalog.attach_metadata(index, meta).unwrap();

        let entry = catalog.get(index).unwrap();
        assert_eq!(entry.duration, None);
        assert_eq!(entry.video_width, None);
        assert_eq!(entry.video_height, Some(480));
    }

    #[test]
    fn test_attach_to_missing_entry() {
        let mut catalog = RecordingCatalog::new();
        let err = catalog.attach_metadata(3, ClipMetadata::default()).unwrap_err();
        assert_eq!(err, CaptureError::RecordingNotFound(3));
    }
}
