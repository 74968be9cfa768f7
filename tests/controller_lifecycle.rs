//! End-to-end recording lifecycle against synthetic providers

use crabclip::config::{ContainerPreference, CrabClipConfig};
use crabclip::monitoring::{Monitor, MonitoringEvent, MonitoringStatus};
use crabclip::probe::ProbeState;
use crabclip::testing::{CollectingSink, RecordingPreview, SyntheticCamera, SyntheticRecorder};
use crabclip::{
    BitRate, CaptureController, CaptureError, ClipMetadata, ContainerFormat, FrameRate,
    Orientation, Resolution, SessionStatus, StartOutcome,
};
use std::sync::Arc;
use std::time::Duration;

fn controller(
    camera: &SyntheticCamera,
    recorder: &SyntheticRecorder,
) -> CaptureController<SyntheticCamera, SyntheticRecorder> {
    CaptureController::new(&CrabClipConfig::default(), camera.clone(), recorder.clone())
}

#[tokio::test]
async fn test_probe_start_stop_catalogs_clip() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);

    assert_eq!(controller.probe().await, &ProbeState::Ready);
    let selection = controller.selection();
    assert_eq!(selection.resolution, Some(Resolution::Hd720));
    assert_eq!(selection.frame_rate, Some(FrameRate::Fps30));
    assert_eq!(selection.bit_rate, Some(BitRate::Bps8M));
    assert_eq!(camera.open_streams(), 0, "probe must release its stream");

    assert_eq!(controller.start().await, StartOutcome::Started);
    assert_eq!(controller.status(), SessionStatus::Recording);
    assert_eq!(camera.open_streams(), 1);
    assert_eq!(recorder.live_recorders(), 1);

    let index = controller.stop().await.unwrap().expect("a clip");
    assert_eq!(controller.status(), SessionStatus::Idle);
    assert_eq!(camera.open_streams(), 0);
    assert_eq!(recorder.live_recorders(), 0);

    let clip = &controller.catalog().list()[index];
    assert_eq!(index, 0);
    assert_eq!(clip.name, "VideoRecord-1");
    assert_eq!(clip.file_name, "VideoRecord-1.webm");
    assert_eq!(clip.resolution, Some(Resolution::Hd720));
    assert_eq!(clip.frame_rate, Some(FrameRate::Fps30));
    assert_eq!(clip.bit_rate, Some(BitRate::Bps8M));
    assert_eq!(clip.size_label, "1.5 MB");
    assert_eq!(clip.mime_type, "video/webm");
}

#[tokio::test]
async fn test_sequence_numbers_follow_catalog() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);
    controller.probe().await;

    for _ in 0..3 {
        assert!(controller.start().await.is_started());
        controller.stop().await.unwrap();
    }

    let names: Vec<_> = controller.catalog().list().iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, ["VideoRecord-1", "VideoRecord-2", "VideoRecord-3"]);
    let indices: Vec<_> = controller.catalog().list().iter().map(|c| c.index).collect();
    assert_eq!(indices, [0, 1, 2]);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);
    controller.probe().await;

    assert!(controller.start().await.is_started());
    assert_eq!(controller.start().await, StartOutcome::AlreadyRecording);

    assert_eq!(recorder.recorders_created(), 1);
    assert_eq!(camera.open_streams(), 1);
    assert_eq!(controller.status(), SessionStatus::Recording);

    controller.stop().await.unwrap();
    assert_eq!(controller.catalog().len(), 1);
}

#[tokio::test]
async fn test_stop_without_session_is_noop() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);

    assert_eq!(controller.stop().await, Ok(None));
    assert!(controller.catalog().is_empty());
    assert_eq!(controller.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn test_status_flips_before_finalize_completes() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new().with_flush_delay(Duration::from_millis(50));
    let mut controller = controller(&camera, &recorder);
    controller.probe().await;
    controller.start().await;

    let mut status = controller.subscribe_status();
    assert_eq!(*status.borrow(), SessionStatus::Recording);

    let observer = recorder.clone();
    let (stopped, flushing_when_idle) = tokio::join!(controller.stop(), async move {
        status.changed().await.unwrap();
        assert_eq!(*status.borrow(), SessionStatus::Idle);
        observer.live_recorders() == 1
    });

    assert!(flushing_when_idle, "Idle must be visible while the recorder still flushes");
    assert!(stopped.unwrap().is_some());
}

#[tokio::test]
async fn test_failed_finalize_still_releases_stream() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new().failing_stop();
    let mut controller = controller(&camera, &recorder);
    controller.probe().await;
    controller.start().await;

    let result = controller.stop().await;
    assert!(matches!(result, Err(CaptureError::Recorder(_))));
    assert_eq!(camera.open_streams(), 0);
    assert_eq!(controller.status(), SessionStatus::Idle);
    assert!(controller.catalog().is_empty());

    // The session is gone; a new one can start
    assert_eq!(controller.stop().await, Ok(None));
    assert!(controller.start().await.is_started());
}

#[tokio::test]
async fn test_denied_permission_cannot_record() {
    let camera = SyntheticCamera::hd720().deny_permission();
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);

    assert!(matches!(controller.probe().await, ProbeState::Failed(_)));
    assert_eq!(controller.capability(), None);

    match controller.start().await {
        StartOutcome::CannotRecord { reason } => assert!(reason.contains("user dismissed")),
        other => panic!("expected refusal, got {:?}", other),
    }
    assert_eq!(recorder.recorders_created(), 0);
    assert_eq!(camera.open_streams(), 0);
    assert_eq!(controller.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn test_unsatisfiable_stream_cannot_record() {
    let camera = SyntheticCamera::hd720().failing_streams();
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);

    assert_eq!(controller.probe().await, &ProbeState::Ready);
    assert!(matches!(
        controller.start().await,
        StartOutcome::CannotRecord { .. }
    ));
    assert_eq!(recorder.recorders_created(), 0);
}

#[tokio::test]
async fn test_recorder_failure_releases_stream_and_preview() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new().failing_create();
    let preview = RecordingPreview::default();
    let mut controller = controller(&camera, &recorder).with_preview(Box::new(preview.clone()));
    controller.probe().await;

    assert!(matches!(
        controller.start().await,
        StartOutcome::CannotRecord { .. }
    ));
    assert_eq!(camera.open_streams(), 0);
    assert_eq!(preview.current(), None);
    assert_eq!(controller.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn test_preview_follows_session() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new();
    let preview = RecordingPreview::default();
    let mut controller = controller(&camera, &recorder).with_preview(Box::new(preview.clone()));
    controller.probe().await;

    controller.start().await;
    assert!(preview.current().is_some());

    controller.stop().await.unwrap();
    assert_eq!(preview.current(), None);
}

#[tokio::test]
async fn test_probe_without_devices_keeps_defaults() {
    let camera = SyntheticCamera::without_devices();
    let recorder = SyntheticRecorder::new();
    let mut config = CrabClipConfig::default();
    config.capture.default_resolution = Some(Resolution::Sd480);
    config.capture.default_frame_rate = Some(FrameRate::Fps15);
    let mut controller = CaptureController::new(&config, camera, recorder);

    assert_eq!(
        controller.probe().await,
        &ProbeState::Failed(CaptureError::NoDevice.to_string())
    );
    let selection = controller.selection();
    assert_eq!(selection.resolution, Some(Resolution::Sd480));
    assert_eq!(selection.frame_rate, Some(FrameRate::Fps15));
    assert_eq!(selection.bit_rate, Some(BitRate::Bps800K));
}

#[tokio::test]
async fn test_user_overrides_reach_stream_constraints() {
    let camera = SyntheticCamera::new(crabclip::CapabilitySnapshot::new(
        Some(60.0),
        Some(1920),
        Some(1080),
    ));
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);
    controller.probe().await;

    controller.set_resolution(Some(Resolution::Hd720));
    let selection = controller.set_frame_rate(Some(FrameRate::Fps24));
    assert_eq!(selection.bit_rate, Some(BitRate::Bps8M));

    controller.start().await;
    let constraints = camera.last_constraints().unwrap();
    assert_eq!((constraints.width, constraints.height), (Some(1280), Some(720)));
    assert_eq!(constraints.frame_rate, Some(24));
    assert_eq!(
        recorder.last_options().unwrap().bits_per_second,
        Some(8_000_000)
    );
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_portrait_swaps_requested_dimensions() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new();
    let mut config = CrabClipConfig::default();
    config.capture.orientation = Orientation::Portrait;
    let mut controller = CaptureController::new(&config, camera.clone(), recorder);
    controller.probe().await;

    controller.start().await;
    let constraints = camera.last_constraints().unwrap();
    assert_eq!((constraints.width, constraints.height), (Some(720), Some(1280)));
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_unset_frame_rate_passes_no_constraint() {
    let camera = SyntheticCamera::new(crabclip::CapabilitySnapshot::new(None, Some(1280), Some(720)));
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder);
    controller.probe().await;
    assert_eq!(controller.selection().frame_rate, None);
    assert_eq!(controller.selection().bit_rate, None);

    assert!(controller.start().await.is_started());
    assert_eq!(camera.last_constraints().unwrap().frame_rate, None);
    assert_eq!(recorder.last_options().unwrap().bits_per_second, None);
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_container_detection() {
    let camera = SyntheticCamera::hd720();

    let webm = controller(&camera, &SyntheticRecorder::new());
    assert_eq!(webm.container(), ContainerFormat::Webm);

    let mp4_only = SyntheticRecorder::new().supporting(&["video/mp4"]);
    let mut mp4 = controller(&camera, &mp4_only);
    assert_eq!(mp4.container(), ContainerFormat::Mp4);

    mp4.probe().await;
    mp4.start().await;
    let index = mp4.stop().await.unwrap().unwrap();
    assert_eq!(mp4.catalog().list()[index].file_name, "VideoRecord-1.mp4");
    assert_eq!(mp4_only.last_options().unwrap().mime_type, "video/mp4");
}

#[tokio::test]
async fn test_container_preference_overrides_detection() {
    let mut config = CrabClipConfig::default();
    config.recording.container = ContainerPreference::Mp4;
    config.recording.name_prefix = "Inspection".to_string();
    let mut controller =
        CaptureController::new(&config, SyntheticCamera::hd720(), SyntheticRecorder::new());
    assert_eq!(controller.container(), ContainerFormat::Mp4);

    controller.probe().await;
    controller.start().await;
    let index = controller.stop().await.unwrap().unwrap();
    assert_eq!(controller.catalog().list()[index].file_name, "Inspection-1.mp4");
}

#[tokio::test]
async fn test_late_metadata_is_sanitized_and_merged() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new().with_metadata(
        ClipMetadata::default()
            .with_duration(f64::INFINITY)
            .with_dimensions(1280, 720),
    );
    let mut controller = controller(&camera, &recorder);
    controller.probe().await;
    controller.start().await;
    let index = controller.stop().await.unwrap().unwrap();

    let clip = controller.catalog().get(index).unwrap();
    assert_eq!(clip.duration, None);
    assert_eq!((clip.video_width, clip.video_height), (Some(1280), Some(720)));

    controller
        .attach_metadata(index, ClipMetadata::default().with_duration(12.5))
        .unwrap();
    let clip = controller.catalog().get(index).unwrap();
    assert_eq!(clip.duration, Some(12.5));
    assert_eq!(clip.video_width, Some(1280));

    assert_eq!(
        controller.attach_metadata(7, ClipMetadata::default()),
        Err(CaptureError::RecordingNotFound(7))
    );
}

#[tokio::test]
async fn test_transaction_spans_wrap_recording() {
    let sink = Arc::new(CollectingSink::default());
    let mut controller = controller(&SyntheticCamera::hd720(), &SyntheticRecorder::new())
        .with_monitor(Monitor::new(sink.clone()));
    controller.probe().await;
    controller.start().await;
    controller.stop().await.unwrap();

    let events = sink.events();
    assert!(matches!(
        &events[0],
        MonitoringEvent::TransactionStarted { name, .. } if name == "Video Processing"
    ));
    assert!(matches!(
        &events[1],
        MonitoringEvent::Tag { key, value, .. } if key == "inspectionId" && !value.is_empty()
    ));

    let spans: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            MonitoringEvent::SpanStarted { op, .. } => Some(format!("+{}", op)),
            MonitoringEvent::SpanFinished { op, .. } => Some(format!("-{}", op)),
            _ => None,
        })
        .collect();
    assert_eq!(
        spans,
        [
            "+Asking Permission",
            "-Asking Permission",
            "+Take Video",
            "-Take Video"
        ]
    );
    assert!(matches!(
        events.last(),
        Some(MonitoringEvent::TransactionFinished {
            status: MonitoringStatus::Ok,
            ..
        })
    ));
}

#[tokio::test]
async fn test_refused_start_aborts_transaction() {
    let sink = Arc::new(CollectingSink::default());
    let mut controller = controller(
        &SyntheticCamera::hd720().deny_permission(),
        &SyntheticRecorder::new(),
    )
    .with_monitor(Monitor::new(sink.clone()));

    controller.start().await;
    assert!(matches!(
        sink.events().last(),
        Some(MonitoringEvent::TransactionFinished {
            status: MonitoringStatus::Aborted,
            ..
        })
    ));
}

#[tokio::test]
async fn test_failing_sink_changes_nothing() {
    let camera = SyntheticCamera::hd720();
    let recorder = SyntheticRecorder::new();
    let mut controller = controller(&camera, &recorder)
        .with_monitor(Monitor::new(Arc::new(CollectingSink::failing())));

    controller.probe().await;
    assert!(controller.start().await.is_started());
    let index = controller.stop().await.unwrap().unwrap();
    assert_eq!(controller.catalog().list()[index].name, "VideoRecord-1");
    assert_eq!(camera.open_streams(), 0);
}
