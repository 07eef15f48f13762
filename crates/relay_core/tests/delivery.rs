use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_core::{
    Backoff, DeliveryEffect, DeliveryEvent, DeliveryMachine, DeliveryState, FailureKind, Response,
    RetryPolicy, MAX_BACKOFF, NOT_READY_ERROR, RESTRICTED_SURFACE_ERROR, UNREACHABLE_ERROR,
};

fn init_logging() {
    relay_logging::initialize_for_tests();
}

fn started(policy: RetryPolicy) -> DeliveryMachine {
    let mut machine = DeliveryMachine::new(policy);
    let effect = machine.step(DeliveryEvent::Start { restricted: false });
    assert_eq!(
        effect,
        Some(DeliveryEffect::EnsureReady {
            force_reinject: false
        })
    );
    machine
}

fn completed(effect: Option<DeliveryEffect>) -> Response {
    match effect {
        Some(DeliveryEffect::Complete(response)) => response,
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn restricted_target_fails_without_probe_or_delivery() {
    init_logging();
    let mut machine = DeliveryMachine::new(RetryPolicy::popup());
    let response = completed(machine.step(DeliveryEvent::Start { restricted: true }));

    assert_eq!(response.error_text(), Some(RESTRICTED_SURFACE_ERROR));
    assert_eq!(
        machine.state(),
        &DeliveryState::Failed(FailureKind::RestrictedSurface)
    );
    assert_eq!(machine.transport_attempts(), 0);
}

#[test]
fn failed_probe_is_terminal() {
    init_logging();
    let mut machine = started(RetryPolicy::popup());
    let response = completed(machine.step(DeliveryEvent::ProbeFinished { ready: false }));

    assert_eq!(response.error_text(), Some(NOT_READY_ERROR));
    assert_eq!(machine.transport_attempts(), 0);
    assert!(machine.is_finished());
    // Late events are ignored once finished.
    assert_eq!(machine.step(DeliveryEvent::TransportFailed), None);
}

#[test]
fn delivered_failure_is_returned_on_first_attempt() {
    init_logging();
    let mut machine = started(RetryPolicy::popup());
    assert_eq!(
        machine.step(DeliveryEvent::ProbeFinished { ready: true }),
        Some(DeliveryEffect::Deliver { attempt: 1 })
    );

    let app_failure = Response::failure("no article found");
    let response = completed(machine.step(DeliveryEvent::Delivered(app_failure.clone())));

    assert_eq!(response, app_failure);
    assert_eq!(machine.state(), &DeliveryState::Succeeded);
    assert_eq!(machine.transport_attempts(), 1);
}

#[test]
fn exhausted_attempts_end_unreachable_with_growing_sleeps() {
    init_logging();
    let policy = RetryPolicy::new(4, 300, Backoff::Exponential);
    let mut machine = started(policy);
    let mut effect = machine.step(DeliveryEvent::ProbeFinished { ready: true });
    let mut sleeps = Vec::new();
    let mut reinjections = 0;

    loop {
        effect = match effect {
            Some(DeliveryEffect::Deliver { .. }) => machine.step(DeliveryEvent::TransportFailed),
            Some(DeliveryEffect::Sleep(delay)) => {
                sleeps.push(delay);
                machine.step(DeliveryEvent::BackoffElapsed)
            }
            Some(DeliveryEffect::EnsureReady {
                force_reinject: true,
            }) => {
                reinjections += 1;
                machine.step(DeliveryEvent::ReinjectFinished { ready: false })
            }
            Some(DeliveryEffect::Complete(response)) => {
                assert_eq!(response.error_text(), Some(UNREACHABLE_ERROR));
                break;
            }
            other => panic!("unexpected effect {other:?}"),
        };
    }

    assert_eq!(machine.transport_attempts(), 4);
    assert_eq!(reinjections, 1);
    assert_eq!(
        sleeps,
        vec![
            Duration::from_millis(300),
            Duration::from_millis(600),
            Duration::from_millis(1200),
        ]
    );
    assert!(sleeps.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(sleeps.iter().all(|delay| *delay <= MAX_BACKOFF));
}

#[test]
fn reinjection_happens_once_before_middle_attempt() {
    init_logging();
    let mut machine = started(RetryPolicy::popup());
    machine.step(DeliveryEvent::ProbeFinished { ready: true });

    // Attempt 1 fails, sleep, attempt 2.
    assert!(matches!(
        machine.step(DeliveryEvent::TransportFailed),
        Some(DeliveryEffect::Sleep(_))
    ));
    assert_eq!(
        machine.step(DeliveryEvent::BackoffElapsed),
        Some(DeliveryEffect::Deliver { attempt: 2 })
    );

    // Attempt 2 fails; re-injection precedes attempt 3.
    machine.step(DeliveryEvent::TransportFailed);
    assert_eq!(
        machine.step(DeliveryEvent::BackoffElapsed),
        Some(DeliveryEffect::EnsureReady {
            force_reinject: true
        })
    );
    assert_eq!(machine.state(), &DeliveryState::Reinjecting { attempt: 3 });
    assert_eq!(
        machine.step(DeliveryEvent::ReinjectFinished { ready: true }),
        Some(DeliveryEffect::Deliver { attempt: 3 })
    );

    let response = completed(machine.step(DeliveryEvent::Delivered(Response::ok("done"))));
    assert!(response.is_success());
    assert_eq!(machine.transport_attempts(), 3);
}

#[test]
fn out_of_order_events_are_ignored() {
    init_logging();
    let mut machine = DeliveryMachine::new(RetryPolicy::trigger());
    assert_eq!(machine.step(DeliveryEvent::BackoffElapsed), None);
    assert_eq!(
        machine.step(DeliveryEvent::Delivered(Response::ok("x"))),
        None
    );
    assert_eq!(machine.state(), &DeliveryState::NotStarted);
}
