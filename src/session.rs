//! Recording session: one live stream and one recorder, from start to stop

use crate::errors::CaptureError;
use crate::monitoring::Transaction;
use crate::platform::{LiveStream, RecordedBlob, RecorderOptions, RecorderProvider};
use crate::types::SelectionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Recording,
}

/// Result of asking to start a recording. Refusals are user notices, not
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    /// A session is already active; no second recorder was created
    AlreadyRecording,
    /// Stream or recorder could not be set up
    CannotRecord { reason: String },
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, StartOutcome::Started)
    }
}

/// Exclusive owner of the live stream and recorder handle while recording
pub struct RecordingSession<S, H> {
    stream: S,
    recorder: H,
    selection: SelectionState,
    started_at: DateTime<Utc>,
    transaction: Option<Transaction>,
}

impl<S: LiveStream, H: Send + 'static> RecordingSession<S, H> {
    /// Bind a recorder to `stream` and start it.
    ///
    /// On failure every track of `stream` is stopped before returning, so no
    /// stream outlives a failed start.
    pub fn begin<R>(
        provider: &R,
        mut stream: S,
        options: &RecorderOptions,
        selection: SelectionState,
    ) -> Result<Self, CaptureError>
    where
        R: RecorderProvider<Stream = S, Handle = H>,
    {
        let mut recorder = match provider.create(&stream, options) {
            Ok(recorder) => recorder,
            Err(e) => {
                stream.stop_all_tracks();
                return Err(e);
            }
        };

        if let Err(e) = provider.start(&mut recorder) {
            stream.stop_all_tracks();
            return Err(e);
        }

        Ok(Self {
            stream,
            recorder,
            selection,
            started_at: Utc::now(),
            transaction: None,
        })
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Flush the recorder, then release every track of the stream. The
    /// stream is released whether or not the recorder finished cleanly.
    pub async fn finalize<R>(self, provider: &R) -> FinishedSession
    where
        R: RecorderProvider<Stream = S, Handle = H>,
    {
        let RecordingSession {
            mut stream,
            recorder,
            selection,
            started_at,
            transaction,
        } = self;

        let blob = provider.stop(recorder).await;
        stream.stop_all_tracks();

        FinishedSession {
            blob,
            selection,
            started_at,
            transaction,
        }
    }
}

/// What is left of a session after finalize
#[derive(Debug)]
pub struct FinishedSession {
    pub blob: Result<RecordedBlob, CaptureError>,
    pub selection: SelectionState,
    pub started_at: DateTime<Utc>,
    pub transaction: Option<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{CaptureProvider, StreamConstraints};
    use crate::testing::{SyntheticCamera, SyntheticRecorder};
    use crate::types::CapabilitySnapshot;

    fn options() -> RecorderOptions {
        RecorderOptions {
            mime_type: "video/webm;codecs=vp8".to_string(),
            bits_per_second: Some(8_000_000),
        }
    }

    #[tokio::test]
    async fn test_begin_and_finalize_release_stream() {
        let camera = SyntheticCamera::new(CapabilitySnapshot::default());
        let recorder = SyntheticRecorder::new();
        let stream = camera.request_stream(&StreamConstraints::default()).await.unwrap();

        let session =
            RecordingSession::begin(&recorder, stream, &options(), SelectionState::default()).unwrap();
        assert_eq!(camera.open_streams(), 1);
        assert_eq!(recorder.live_recorders(), 1);

        let finished = session.finalize(&recorder).await;
        assert!(finished.blob.is_ok());
        assert_eq!(camera.open_streams(), 0);
        assert_eq!(recorder.live_recorders(), 0);
    }

    #[tokio::test]
    async fn test_failed_create_stops_stream() {
        let camera = SyntheticCamera::new(CapabilitySnapshot::default());
        let recorder = SyntheticRecorder::new().failing_create();
        let stream = camera.request_stream(&StreamConstraints::default()).await.unwrap();

        let result = RecordingSession::begin(&recorder, stream, &options(), SelectionState::default());
        assert!(result.is_err());
        assert_eq!(camera.open_streams(), 0);
    }

    #[tokio::test]
    async fn test_finalize_releases_stream_on_recorder_error() {
        let camera = SyntheticCamera::new(CapabilitySnapshot::default());
        let recorder = SyntheticRecorder::new().failing_stop();
        let stream = camera.request_stream(&StreamConstraints::default()).await.unwrap();

        let session =
            RecordingSession::begin(&recorder, stream, &options(), SelectionState::default()).unwrap();
        let finished = session.finalize(&recorder).await;
        assert!(finished.blob.is_err());
        assert_eq!(camera.open_streams(), 0);
    }
}
