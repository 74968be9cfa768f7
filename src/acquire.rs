//! Live stream acquisition for preview and recording

use crate::errors::CaptureError;
use crate::platform::{CaptureProvider, LiveStream, PreviewSink, StreamConstraints};
use crate::types::{FacingMode, Orientation, SelectionState};

#[derive(Debug, Clone, Default)]
pub struct StreamAcquirer {
    orientation: Orientation,
    facing_mode: FacingMode,
}

impl StreamAcquirer {
    pub fn new(orientation: Orientation, facing_mode: FacingMode) -> Self {
        Self {
            orientation,
            facing_mode,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Translate a selection into device constraints.
    ///
    /// Portrait capture swaps the landscape dimensions of the resolution.
    /// An unset frame rate passes no frame-rate constraint at all.
    pub fn constraints(&self, selection: &SelectionState) -> StreamConstraints {
        let (width, height) = match selection.resolution.map(|r| r.dimensions()) {
            Some((w, h)) if self.orientation == Orientation::Portrait => (Some(h), Some(w)),
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };

        StreamConstraints {
            device_id: None,
            width,
            height,
            frame_rate: selection.frame_rate.map(|f| f.fps()),
            facing_mode: self.facing_mode,
        }
    }

    /// Request a stream matching the selection and bind it to the preview
    pub async fn acquire<C: CaptureProvider>(
        &self,
        provider: &C,
        selection: &SelectionState,
        preview: &mut dyn PreviewSink,
    ) -> Result<C::Stream, CaptureError> {
        let constraints = self.constraints(selection);
        log::debug!("Requesting stream with {:?}", constraints);

        let stream = provider
            .request_stream(&constraints)
            .await
            .map_err(|e| match e {
                CaptureError::MediaAccess(_) => e,
                other => CaptureError::MediaAccess(other.to_string()),
            })?;

        let info = stream.info();
        log::info!(
            "Acquired stream {} at {}x{}",
            info.id,
            info.width,
            info.height
        );
        preview.attach(&info);
        Ok(stream)
    }
}
