mod common;

use common::{FakeAudio, FakeRecognizer};
use sparkvoice_core::error::CaptureError;
use sparkvoice_core::intent::Intent;
use sparkvoice_core::types::SpeechAuthorization;
use sparkvoice_engine::capture::{CaptureSession, CaptureState};
use sparkvoice_engine::events::{ControllerEvent, EventSink};
use sparkvoice_engine::traits::RecognitionEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

fn session(
    audio: Arc<FakeAudio>,
    recognizer: Arc<FakeRecognizer>,
) -> (CaptureSession, mpsc::UnboundedReceiver<ControllerEvent>) {
    let (events, rx) = EventSink::channel();
    (CaptureSession::new(audio, recognizer, events), rx)
}

fn final_result(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        text: text.into(),
        is_final: true,
    }
}

fn partial_result(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        text: text.into(),
        is_final: false,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test]
async fn stop_then_final_result_tears_down_once() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, mut rx) = session(audio.clone(), recognizer.clone());

    assert!(capture.start().await.unwrap());
    assert_eq!(capture.state(), CaptureState::Active);

    assert!(capture.request_stop());
    assert_eq!(capture.state(), CaptureState::Finalizing);
    assert_eq!(*recognizer.last_task().end_audio_calls.lock(), 1);

    let sink = recognizer.last_sink();
    sink.deliver(final_result("take off"));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(capture.teardown_count(), 1);
    assert_eq!(*audio.deactivations.lock(), 1);

    // A late duplicate changes nothing.
    sink.deliver(final_result("land"));
    assert_eq!(capture.teardown_count(), 1);

    assert_eq!(
        drain(&mut rx),
        vec![ControllerEvent::IntentDetected {
            text: "take off".into(),
            intent: Intent::TakeOff,
        }]
    );
}

#[tokio::test]
async fn error_then_final_result_tears_down_once() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, mut rx) = session(audio.clone(), recognizer.clone());

    capture.start().await.unwrap();
    let sink = recognizer.last_sink();
    sink.deliver(RecognitionEvent::Error {
        message: "network lost".into(),
        partial: None,
    });
    sink.deliver(final_result("take off"));

    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(capture.teardown_count(), 1);
    assert_eq!(*audio.deactivations.lock(), 1);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn racing_terminal_signals_from_threads_tear_down_once() {
    for _ in 0..50 {
        let audio = Arc::new(FakeAudio::default());
        let recognizer = Arc::new(FakeRecognizer::authorized());
        let (capture, mut rx) = session(audio.clone(), recognizer.clone());

        capture.start().await.unwrap();
        let sink = recognizer.last_sink();

        std::thread::scope(|s| {
            let a = sink.clone();
            let b = sink.clone();
            s.spawn(move || a.deliver(final_result("take off")));
            s.spawn(move || {
                b.deliver(RecognitionEvent::Error {
                    message: "cancelled".into(),
                    partial: Some("land".into()),
                })
            });
            s.spawn(|| {
                capture.request_stop();
            });
        });

        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(capture.teardown_count(), 1);
        assert_eq!(*audio.deactivations.lock(), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1, "got {events:?}");
    }
}

#[tokio::test]
async fn result_after_stop_is_authoritative_even_if_not_final() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, mut rx) = session(audio, recognizer.clone());

    capture.start().await.unwrap();
    let sink = recognizer.last_sink();

    sink.deliver(partial_result("selfie"));
    assert_eq!(capture.state(), CaptureState::Active);
    assert_eq!(capture.partial_transcript().as_deref(), Some("selfie"));
    assert!(drain(&mut rx).is_empty());

    capture.request_stop();
    sink.deliver(partial_result("selfie mode"));

    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(capture.partial_transcript(), None);
    assert_eq!(
        drain(&mut rx),
        vec![ControllerEvent::IntentDetected {
            text: "selfie mode".into(),
            intent: Intent::PhotoPosition,
        }]
    );
}

#[tokio::test]
async fn error_with_partial_text_still_classifies_it() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, mut rx) = session(audio, recognizer.clone());

    capture.start().await.unwrap();
    recognizer.last_sink().deliver(RecognitionEvent::Error {
        message: "interrupted".into(),
        partial: Some("please land".into()),
    });

    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(
        drain(&mut rx),
        vec![ControllerEvent::IntentDetected {
            text: "please land".into(),
            intent: Intent::Land,
        }]
    );
}

#[tokio::test]
async fn unmatched_or_blank_transcripts_emit_nothing() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, mut rx) = session(audio, recognizer.clone());

    capture.start().await.unwrap();
    recognizer.last_sink().deliver(final_result("do a barrel roll"));
    capture.start().await.unwrap();
    recognizer.last_sink().deliver(final_result("   "));

    assert_eq!(capture.teardown_count(), 2);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn start_while_running_is_a_no_op() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, _rx) = session(audio.clone(), recognizer.clone());

    assert!(capture.start().await.unwrap());
    assert!(!capture.start().await.unwrap());
    assert_eq!(*audio.activations.lock(), 1);
    assert_eq!(recognizer.tasks.lock().len(), 1);

    capture.request_stop();
    assert!(!capture.start().await.unwrap());
    assert!(!capture.request_stop());
}

#[tokio::test]
async fn stop_without_session_is_ignored() {
    let (capture, _rx) = session(
        Arc::new(FakeAudio::default()),
        Arc::new(FakeRecognizer::authorized()),
    );
    assert!(!capture.request_stop());
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[tokio::test]
async fn unauthorized_recognizer_never_touches_audio() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::with_authorization(
        SpeechAuthorization::Denied,
    ));
    let (capture, _rx) = session(audio.clone(), recognizer.clone());

    let err = capture.start().await.unwrap_err();
    assert_eq!(err, CaptureError::NotAuthorized(SpeechAuthorization::Denied));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(*audio.activations.lock(), 0);
    assert!(recognizer.tasks.lock().is_empty());
}

#[tokio::test]
async fn audio_start_failure_cancels_task_and_returns_to_idle() {
    let audio = Arc::new(FakeAudio {
        fail_start: true,
        ..FakeAudio::default()
    });
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, _rx) = session(audio.clone(), recognizer.clone());

    assert!(matches!(capture.start().await, Err(CaptureError::Audio(_))));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(capture.teardown_count(), 1);
    assert_eq!(*recognizer.last_task().cancels.lock(), 1);

    // Session can be retried once the device is back.
    assert!(matches!(capture.start().await, Err(CaptureError::Audio(_))));
    assert_eq!(capture.teardown_count(), 2);
}

#[tokio::test]
async fn activation_failure_does_not_deactivate_audio() {
    let audio = Arc::new(FakeAudio {
        fail_activate: true,
        ..FakeAudio::default()
    });
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, _rx) = session(audio.clone(), recognizer.clone());

    assert!(matches!(capture.start().await, Err(CaptureError::Audio(_))));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(capture.teardown_count(), 1);
    assert_eq!(*audio.deactivations.lock(), 0);
    assert!(recognizer.tasks.lock().is_empty());
}

#[tokio::test]
async fn audio_start_failure_deactivates_the_activated_session() {
    let audio = Arc::new(FakeAudio {
        fail_start: true,
        ..FakeAudio::default()
    });
    let (capture, _rx) = session(audio.clone(), Arc::new(FakeRecognizer::authorized()));

    assert!(capture.start().await.is_err());
    assert_eq!(*audio.activations.lock(), 1);
    assert_eq!(*audio.deactivations.lock(), 1);
}

#[tokio::test]
async fn stale_callbacks_do_not_touch_a_newer_session() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, mut rx) = session(audio.clone(), recognizer.clone());

    capture.start().await.unwrap();
    let old_sink = recognizer.last_sink();
    capture.request_stop();
    old_sink.deliver(final_result("land"));
    assert_eq!(capture.state(), CaptureState::Idle);

    capture.start().await.unwrap();
    old_sink.deliver(final_result("take off"));
    old_sink.deliver(RecognitionEvent::Error {
        message: "late".into(),
        partial: None,
    });

    assert_eq!(capture.state(), CaptureState::Active);
    assert_eq!(capture.teardown_count(), 1);
    assert_eq!(
        drain(&mut rx),
        vec![ControllerEvent::IntentDetected {
            text: "land".into(),
            intent: Intent::Land,
        }]
    );
}

#[tokio::test]
async fn frames_reach_the_task_only_while_active() {
    let audio = Arc::new(FakeAudio::default());
    let recognizer = Arc::new(FakeRecognizer::authorized());
    let (capture, _rx) = session(audio.clone(), recognizer.clone());

    capture.start().await.unwrap();
    audio.push_frame();
    audio.push_frame();
    let task = recognizer.last_task();
    assert_eq!(*task.frames.lock(), 2);

    capture.request_stop();
    audio.push_frame();
    assert_eq!(*task.frames.lock(), 2);
}
