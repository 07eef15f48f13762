//! Delivery state machine for one `send` call.
//!
//! The machine is pure: the dispatcher feeds it [`DeliveryEvent`]s and performs
//! the [`DeliveryEffect`] each step asks for (probe, deliver, sleep). Only a
//! transport failure leads to another attempt; a delivered response, whatever
//! its `success` flag, finishes the call.
//!
//! ```text
//! NotStarted -> Probing -> Delivering -> Succeeded
//!                  |           |  ^
//!                  v           v  |
//!               Failed <- Retrying -> Reinjecting (once)
//! ```

use std::time::Duration;

use crate::{FailureKind, Response, RetryPolicy};

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryState {
    NotStarted,
    /// Waiting for the initial readiness check.
    Probing,
    /// Transport attempt `attempt` is in flight.
    Delivering { attempt: u32 },
    /// Attempt `attempt` failed; sleeping before the next one.
    Retrying { attempt: u32 },
    /// Forced re-injection in flight; attempt `attempt` follows it.
    Reinjecting { attempt: u32 },
    Succeeded,
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryEvent {
    Start { restricted: bool },
    ProbeFinished { ready: bool },
    Delivered(Response),
    TransportFailed,
    BackoffElapsed,
    ReinjectFinished { ready: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryEffect {
    EnsureReady { force_reinject: bool },
    Deliver { attempt: u32 },
    Sleep(Duration),
    /// Final answer for the caller; no further events are accepted.
    Complete(Response),
}

#[derive(Debug, Clone)]
pub struct DeliveryMachine {
    policy: RetryPolicy,
    state: DeliveryState,
    reinjected: bool,
    transport_attempts: u32,
}

impl DeliveryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: DeliveryState::NotStarted,
            reinjected: false,
            transport_attempts: 0,
        }
    }

    pub fn state(&self) -> &DeliveryState {
        &self.state
    }

    pub fn transport_attempts(&self) -> u32 {
        self.transport_attempts
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            DeliveryState::Succeeded | DeliveryState::Failed(_)
        )
    }

    /// Applies `event` and returns the effect to perform next, if any.
    ///
    /// Events that do not belong to the current state are ignored.
    pub fn step(&mut self, event: DeliveryEvent) -> Option<DeliveryEffect> {
        let state = std::mem::replace(&mut self.state, DeliveryState::NotStarted);
        let (next, effect) = match (state, event) {
            (DeliveryState::NotStarted, DeliveryEvent::Start { restricted: true }) => {
                self.fail(FailureKind::RestrictedSurface)
            }
            (DeliveryState::NotStarted, DeliveryEvent::Start { restricted: false }) => (
                DeliveryState::Probing,
                Some(DeliveryEffect::EnsureReady {
                    force_reinject: false,
                }),
            ),
            (DeliveryState::Probing, DeliveryEvent::ProbeFinished { ready: false }) => {
                self.fail(FailureKind::NotReady)
            }
            (DeliveryState::Probing, DeliveryEvent::ProbeFinished { ready: true }) => {
                self.deliver(1)
            }
            (DeliveryState::Delivering { .. }, DeliveryEvent::Delivered(response)) => (
                DeliveryState::Succeeded,
                Some(DeliveryEffect::Complete(response)),
            ),
            (DeliveryState::Delivering { attempt }, DeliveryEvent::TransportFailed) => {
                if attempt >= self.policy.max_attempts {
                    self.fail(FailureKind::Unreachable)
                } else {
                    (
                        DeliveryState::Retrying { attempt },
                        Some(DeliveryEffect::Sleep(self.policy.delay_for(attempt))),
                    )
                }
            }
            (DeliveryState::Retrying { attempt }, DeliveryEvent::BackoffElapsed) => {
                let next = attempt + 1;
                if !self.reinjected && self.policy.reinject_before == Some(next) {
                    self.reinjected = true;
                    (
                        DeliveryState::Reinjecting { attempt: next },
                        Some(DeliveryEffect::EnsureReady {
                            force_reinject: true,
                        }),
                    )
                } else {
                    self.deliver(next)
                }
            }
            // The attempt goes ahead either way; a dead target fails it fast.
            (DeliveryState::Reinjecting { attempt }, DeliveryEvent::ReinjectFinished { .. }) => {
                self.deliver(attempt)
            }
            (state, _) => (state, None),
        };
        self.state = next;
        effect
    }

    fn deliver(&mut self, attempt: u32) -> (DeliveryState, Option<DeliveryEffect>) {
        self.transport_attempts += 1;
        (
            DeliveryState::Delivering { attempt },
            Some(DeliveryEffect::Deliver { attempt }),
        )
    }

    fn fail(&self, kind: FailureKind) -> (DeliveryState, Option<DeliveryEffect>) {
        (
            DeliveryState::Failed(kind),
            Some(DeliveryEffect::Complete(kind.to_response())),
        )
    }
}
