//! Top-level capture controller
//!
//! Owns the selector, the single active recording session and the catalog.
//! Data flows probe -> selection -> stream -> session -> catalog; every
//! mutation goes through `&mut self`, so at most one session exists.

use crate::acquire::StreamAcquirer;
use crate::catalog::{ClipMetadata, RecordingCatalog, RecordingDescriptor};
use crate::config::{ContainerPreference, CrabClipConfig};
use crate::errors::CaptureError;
use crate::monitoring::{
    Monitor, MonitoringStatus, SPAN_ASK_PERMISSION, SPAN_TAKE_VIDEO, TAG_INSPECTION_ID,
    TRANSACTION_VIDEO_PROCESSING,
};
use crate::platform::{
    CaptureProvider, NoPreview, PreviewSink, RecorderOptions, RecorderProvider,
};
use crate::probe::{CapabilityProber, ProbeState};
use crate::selection::{FrameRateOption, ParameterSelector};
use crate::session::{RecordingSession, SessionStatus, StartOutcome};
use crate::types::{CapabilitySnapshot, ContainerFormat, FrameRate, Resolution, SelectionState};
use tokio::sync::watch;

pub struct CaptureController<C, R>
where
    C: CaptureProvider,
    R: RecorderProvider<Stream = C::Stream>,
{
    capture: C,
    recorder: R,
    prober: CapabilityProber,
    probe_state: ProbeState,
    selector: ParameterSelector,
    acquirer: StreamAcquirer,
    container: ContainerFormat,
    name_prefix: String,
    session: Option<RecordingSession<C::Stream, R::Handle>>,
    catalog: RecordingCatalog,
    status: watch::Sender<SessionStatus>,
    preview: Box<dyn PreviewSink>,
    monitor: Monitor,
}

impl<C, R> CaptureController<C, R>
where
    C: CaptureProvider,
    R: RecorderProvider<Stream = C::Stream>,
{
    pub fn new(config: &CrabClipConfig, capture: C, recorder: R) -> Self {
        let container = match config.recording.container {
            ContainerPreference::Webm => ContainerFormat::Webm,
            ContainerPreference::Mp4 => ContainerFormat::Mp4,
            ContainerPreference::Auto => {
                ContainerFormat::detect(|mime| recorder.supports_mime_type(mime))
            }
        };
        log::info!("Recording container: {}", container.mime_type());

        let (status, _) = watch::channel(SessionStatus::Idle);

        Self {
            capture,
            recorder,
            prober: CapabilityProber::new(config.capture.device_index, config.capture.facing_mode),
            probe_state: ProbeState::Pending,
            selector: ParameterSelector::new(
                config.capture.default_resolution,
                config.capture.default_frame_rate,
            ),
            acquirer: StreamAcquirer::new(config.capture.orientation, config.capture.facing_mode),
            container,
            name_prefix: config.recording.name_prefix.clone(),
            session: None,
            catalog: RecordingCatalog::new(),
            status,
            preview: Box::new(NoPreview),
            monitor: Monitor::disabled(),
        }
    }

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_preview(mut self, preview: Box<dyn PreviewSink>) -> Self {
        self.preview = preview;
        self
    }

    /// Probe the camera once and seed the selector. Failures degrade to the
    /// configured defaults.
    pub async fn probe(&mut self) -> &ProbeState {
        match self.prober.probe(&self.capture).await {
            Ok(snapshot) => {
                self.selector.apply_capability(Some(snapshot));
                self.probe_state = ProbeState::Ready;
            }
            Err(e) => {
                log::warn!("Camera probe failed, using default selection: {}", e);
                self.selector.apply_capability(None);
                self.probe_state = ProbeState::Failed(e.to_string());
            }
        }
        &self.probe_state
    }

    pub fn probe_state(&self) -> &ProbeState {
        &self.probe_state
    }

    pub fn capability(&self) -> Option<&CapabilitySnapshot> {
        self.selector.capability()
    }

    pub fn selection(&self) -> SelectionState {
        self.selector.selection()
    }

    pub fn frame_rate_options(&self) -> Vec<FrameRateOption> {
        self.selector.frame_rate_options()
    }

    pub fn set_resolution(&mut self, resolution: Option<Resolution>) -> SelectionState {
        self.selector.set_resolution(resolution)
    }

    pub fn set_frame_rate(&mut self, frame_rate: Option<FrameRate>) -> SelectionState {
        self.selector.set_frame_rate(frame_rate)
    }

    pub fn container(&self) -> ContainerFormat {
        self.container
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Receiver that observes the Idle flip as soon as stop is requested,
    /// before finalize has completed
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn catalog(&self) -> &RecordingCatalog {
        &self.catalog
    }

    pub fn attach_metadata(&mut self, index: usize, metadata: ClipMetadata) -> Result<(), CaptureError> {
        self.catalog.attach_metadata(index, metadata)
    }

    /// Acquire a stream for the current selection and start recording it
    pub async fn start(&mut self) -> StartOutcome {
        if self.session.is_some() {
            log::warn!("Start ignored: a recording session is already active");
            return StartOutcome::AlreadyRecording;
        }

        let transaction = self.monitor.start_transaction(TRANSACTION_VIDEO_PROCESSING);
        transaction.set_tag(TAG_INSPECTION_ID, &uuid::Uuid::new_v4().to_string());

        let selection = self.selector.selection();

        transaction.start_span(SPAN_ASK_PERMISSION);
        let acquired = self
            .acquirer
            .acquire(&self.capture, &selection, self.preview.as_mut())
            .await;
        transaction.finish_span(SPAN_ASK_PERMISSION);

        let stream = match acquired {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("Cannot record now: {}", e);
                transaction.finish(MonitoringStatus::Aborted);
                return StartOutcome::CannotRecord {
                    reason: e.to_string(),
                };
            }
        };

        let options = RecorderOptions {
            mime_type: self.container.mime_type().to_string(),
            bits_per_second: selection.bit_rate.map(|b| b.bits_per_second()),
        };

        match RecordingSession::begin(&self.recorder, stream, &options, selection) {
            Ok(session) => {
                transaction.start_span(SPAN_TAKE_VIDEO);
                self.session = Some(session.with_transaction(transaction));
                self.status.send_replace(SessionStatus::Recording);
                log::info!(
                    "Recording started ({} @ {} fps, {} bps)",
                    display_or_default(selection.resolution),
                    display_or_default(selection.frame_rate),
                    display_or_default(selection.bit_rate)
                );
                StartOutcome::Started
            }
            Err(e) => {
                log::warn!("Cannot record now: {}", e);
                self.preview.clear();
                transaction.finish(MonitoringStatus::Aborted);
                StartOutcome::CannotRecord {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Stop the active session and catalog the finished clip.
    ///
    /// Status flips to Idle before finalize runs. Returns the catalog index
    /// of the new entry, or `None` when nothing was recording.
    pub async fn stop(&mut self) -> Result<Option<usize>, CaptureError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                log::debug!("Stop ignored: {}", CaptureError::RecorderUnavailable);
                return Ok(None);
            }
        };

        self.status.send_replace(SessionStatus::Idle);

        let finished = session.finalize(&self.recorder).await;
        self.preview.clear();

        if let Some(transaction) = &finished.transaction {
            transaction.finish_span(SPAN_TAKE_VIDEO);
        }

        let blob = match finished.blob {
            Ok(blob) => blob,
            Err(e) => {
                log::error!("Failed to finalize recording: {}", e);
                if let Some(transaction) = finished.transaction {
                    transaction.finish(MonitoringStatus::UnknownError);
                }
                return Err(e);
            }
        };

        let name = format!("{}-{}", self.name_prefix, self.catalog.next_sequence());
        let descriptor = RecordingDescriptor::new(
            name,
            self.container.extension(),
            &finished.selection,
            &blob,
            finished.started_at,
        );
        let index = self.catalog.append(descriptor);

        if let Some(metadata) = blob.metadata {
            self.catalog.attach_metadata(index, metadata)?;
        }

        if let Some(transaction) = finished.transaction {
            transaction.finish(MonitoringStatus::Ok);
        }

        log::info!(
            "Recording finished: {} ({})",
            self.catalog.list()[index].file_name,
            self.catalog.list()[index].size_label
        );
        Ok(Some(index))
    }
}

fn display_or_default<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "default".to_string())
}
