mod common;

use bow_bridge::config::{Mode, ModeConfig};
use bow_bridge::inference::{InferenceResult, Predictor};
use bow_bridge::streaming::record::NormalizedRecord;
use bow_bridge::streaming::{
    Channel, Notification, SessionEvent, SessionState, StreamError, StreamSession,
    TerminationCause, Value,
};
use common::{normalized, raw, AfterScript, Call, MockTransport, RecordingPublisher};
use std::sync::Arc;
use tokio::sync::mpsc;

struct FixedPredictor;

impl Predictor for FixedPredictor {
    fn predict(&self, input: &NormalizedRecord) -> InferenceResult<[f32; 2]> {
        Ok([input.values()[0], 0.5])
    }
}

fn interleaved_script() -> Vec<Notification> {
    vec![
        normalized([0.1, 0.2, 0.3, 0.4]),
        raw(10),
        normalized([0.5, 0.6, 0.7, 0.8]),
        raw(20),
        raw(30),
    ]
}

fn session(
    mode: Mode,
    transport: MockTransport,
    publisher: Arc<RecordingPublisher>,
) -> (StreamSession, mpsc::UnboundedReceiver<SessionEvent>) {
    let mut session = StreamSession::new(
        ModeConfig::new(mode),
        Box::new(transport),
        publisher,
        Some(Arc::new(FixedPredictor)),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    session.set_event_callback(move |event| {
        let _ = tx.send(event);
    });
    (session, rx)
}

fn drain(mut events: mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn states(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

fn finished_count(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Finished { .. }))
        .count()
}

#[tokio::test]
async fn test_dataset_mode_publishes_example_per_raw() {
    let transport = MockTransport::new(interleaved_script(), AfterScript::Close);
    let calls = transport.calls();
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, events) = session(Mode::Dataset, transport, publisher.clone());

    let summary = session.run().await.unwrap();

    let examples = publisher.messages_to("/dataset_example");
    assert_eq!(examples.len(), 3);
    assert!(examples.iter().all(|e| e.len() == 36));
    // Second and third raw records pair with the second normalized record
    assert_eq!(examples[0][0], Value::Float(0.1));
    assert_eq!(examples[1][0], Value::Float(0.5));
    assert_eq!(examples[2][0], Value::Float(0.5));
    assert_eq!(examples[2][35], Value::Int(30));

    assert_eq!(publisher.count("/distances"), 2);
    assert_eq!(publisher.count("/debug"), 3);
    assert_eq!(publisher.count("/pred"), 0);

    assert_eq!(summary.normalized_samples, 2);
    assert_eq!(summary.raw_samples, 3);

    assert_eq!(
        *calls.lock(),
        vec![
            Call::Connect,
            Call::Subscribe(Channel::Normalized),
            Call::Subscribe(Channel::Raw),
            Call::StartStreaming,
            Call::Unsubscribe(Channel::Normalized),
            Call::Unsubscribe(Channel::Raw),
            Call::Disconnect,
        ]
    );

    let events = drain(events);
    assert_eq!(
        states(&events),
        vec![
            SessionState::Connecting,
            SessionState::Subscribed,
            SessionState::Streaming,
            SessionState::Unsubscribing,
            SessionState::Terminated,
        ]
    );
    assert_eq!(finished_count(&events), 1);
}

#[tokio::test]
async fn test_prod_mode_predicts_and_never_assembles() {
    let transport = MockTransport::new(interleaved_script(), AfterScript::Close);
    let calls = transport.calls();
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, _events) = session(Mode::Prod, transport, publisher.clone());

    let summary = session.run().await.unwrap();

    assert_eq!(publisher.count("/dataset_example"), 0);
    assert_eq!(publisher.count("/debug"), 0);
    let predictions = publisher.messages_to("/pred");
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0], vec![Value::Float(0.1), Value::Float(0.5)]);
    assert_eq!(summary.normalized_samples, 2);
    assert_eq!(summary.raw_samples, 0);

    // Only the readings characteristic is used in prod mode
    assert!(!calls.lock().contains(&Call::Subscribe(Channel::Raw)));
    assert!(calls.lock().contains(&Call::Unsubscribe(Channel::Normalized)));
}

#[tokio::test]
async fn test_operator_cancellation_terminates_once() {
    let transport = MockTransport::new(interleaved_script(), AfterScript::Idle);
    let calls = transport.calls();
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, mut events) = session(Mode::Dataset, transport, publisher.clone());
    let termination = session.termination();

    let handle = tokio::spawn(session.run());

    loop {
        match events.recv().await {
            Some(SessionEvent::StateChanged {
                state: SessionState::Streaming,
                ..
            }) => break,
            Some(_) => continue,
            None => panic!("session ended before streaming"),
        }
    }

    assert!(termination.trigger(TerminationCause::OperatorCancelled));
    assert!(!termination.trigger(TerminationCause::OperatorCancelled));
    assert!(!termination.trigger(TerminationCause::PeerDisconnected));

    // Everything delivered before the interrupt is still handled
    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.normalized_samples, 2);
    assert_eq!(summary.raw_samples, 3);
    assert_eq!(publisher.count("/distances"), 2);
    assert_eq!(publisher.count("/debug"), 3);
    assert_eq!(publisher.count("/dataset_example"), 3);

    let events = drain(events);
    let terminated = states(&events)
        .into_iter()
        .filter(|s| *s == SessionState::Terminated)
        .count();
    assert_eq!(terminated, 1);
    assert_eq!(finished_count(&events), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Terminating {
            cause: TerminationCause::OperatorCancelled,
            ..
        }
    )));

    let calls = calls.lock();
    assert_eq!(
        &calls[calls.len() - 3..],
        &[
            Call::Unsubscribe(Channel::Normalized),
            Call::Unsubscribe(Channel::Raw),
            Call::Disconnect,
        ]
    );
}

#[tokio::test]
async fn test_peer_disconnect_releases_all_subscriptions() {
    let transport = MockTransport::new(interleaved_script(), AfterScript::Disconnect);
    let calls = transport.calls();
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, events) = session(Mode::Dataset, transport, publisher.clone());
    let termination = session.termination();

    let summary = session.run().await.unwrap();

    assert_eq!(termination.cause(), Some(TerminationCause::PeerDisconnected));

    // Notifications queued before the disconnect are handled exactly once
    assert_eq!(summary.normalized_samples, 2);
    assert_eq!(summary.raw_samples, 3);
    assert_eq!(publisher.count("/distances"), 2);
    assert_eq!(publisher.count("/debug"), 3);
    let examples = publisher.messages_to("/dataset_example");
    assert_eq!(examples.len(), 3);
    assert_eq!(examples[2][0], Value::Float(0.5));

    let calls = calls.lock();
    assert!(calls.contains(&Call::Unsubscribe(Channel::Normalized)));
    assert!(calls.contains(&Call::Unsubscribe(Channel::Raw)));
    assert_eq!(calls.last(), Some(&Call::Disconnect));

    let events = drain(events);
    assert_eq!(states(&events).last(), Some(&SessionState::Terminated));
    assert_eq!(finished_count(&events), 1);
}

#[tokio::test]
async fn test_closed_channel_counts_as_peer_disconnect() {
    let transport = MockTransport::new(Vec::new(), AfterScript::Close);
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, _events) = session(Mode::Dataset, transport, publisher);
    let termination = session.termination();

    let summary = session.run().await.unwrap();

    assert_eq!(termination.cause(), Some(TerminationCause::PeerDisconnected));
    assert_eq!(summary.normalized_samples, 0);
}

#[tokio::test]
async fn test_subscribe_failure_releases_earlier_subscriptions() {
    let transport = MockTransport::new(interleaved_script(), AfterScript::Close)
        .failing_subscribe(Channel::Raw);
    let calls = transport.calls();
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, events) = session(Mode::Dataset, transport, publisher.clone());

    let result = session.run().await;
    assert!(matches!(
        result,
        Err(StreamError::Subscription {
            channel: Channel::Raw,
            ..
        })
    ));

    assert_eq!(
        *calls.lock(),
        vec![
            Call::Connect,
            Call::Subscribe(Channel::Normalized),
            Call::Subscribe(Channel::Raw),
            Call::Unsubscribe(Channel::Normalized),
            Call::Disconnect,
        ]
    );
    assert_eq!(publisher.count("/distances"), 0);

    let events = drain(events);
    assert_eq!(states(&events).last(), Some(&SessionState::Terminated));
    assert_eq!(finished_count(&events), 0);
}

#[tokio::test]
async fn test_malformed_notifications_do_not_end_session() {
    let script = vec![
        Notification::new(Channel::Normalized, vec![0; 12], 0.0),
        normalized([0.1, 0.2, 0.3, 0.4]),
        Notification::new(Channel::Raw, vec![0; 32], 0.0),
        raw(5),
    ];
    let transport = MockTransport::new(script, AfterScript::Close);
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, _events) = session(Mode::Dataset, transport, publisher.clone());

    let summary = session.run().await.unwrap();

    assert_eq!(summary.normalized_samples, 1);
    assert_eq!(summary.raw_samples, 1);
    assert_eq!(publisher.count("/dataset_example"), 1);
}

#[tokio::test]
async fn test_raw_before_normalized_waits_for_realignment() {
    let script = vec![raw(1), raw(2), normalized([0.0; 4]), raw(3)];
    let transport = MockTransport::new(script, AfterScript::Close);
    let publisher = Arc::new(RecordingPublisher::default());
    let (session, _events) = session(Mode::Dataset, transport, publisher.clone());

    let summary = session.run().await.unwrap();

    assert_eq!(summary.raw_samples, 3);
    assert_eq!(publisher.count("/debug"), 3);
    let examples = publisher.messages_to("/dataset_example");
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0][35], Value::Int(3));
}
