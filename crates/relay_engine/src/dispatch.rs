use std::sync::Arc;

use relay_core::{
    DeliveryEffect, DeliveryEvent, DeliveryMachine, DeliveryState, FailureKind, Request, Response,
    RetryPolicy, Target,
};
use relay_logging::{relay_debug, relay_error, relay_info, relay_warn, BACKGROUND};

use crate::{ReadinessProbe, Transport};

/// Sends requests to page responders with bounded retries.
///
/// Each `send` drives its own [`DeliveryMachine`]; concurrent sends to the
/// same tab are independent and are not queued behind each other. Delivery
/// is at-least-once: an attempt whose reply was lost may already have run
/// its action before the retry.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    probe: Arc<ReadinessProbe>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, probe: Arc<ReadinessProbe>) -> Self {
        Self { transport, probe }
    }

    pub async fn send(&self, target: &Target, request: &Request, policy: &RetryPolicy) -> Response {
        let mut machine = DeliveryMachine::new(policy.clone());
        let restricted = target.is_restricted();
        if restricted {
            relay_info!(
                target: BACKGROUND,
                "refusing {} on restricted tab {} ({})",
                request.action(),
                target.id,
                target.url
            );
        }

        let mut effect = machine.step(DeliveryEvent::Start { restricted });
        loop {
            let event = match effect {
                Some(DeliveryEffect::EnsureReady {
                    force_reinject: false,
                }) => DeliveryEvent::ProbeFinished {
                    ready: self.probe.ensure_ready(target.id, false).await,
                },
                Some(DeliveryEffect::EnsureReady {
                    force_reinject: true,
                }) => DeliveryEvent::ReinjectFinished {
                    ready: self.probe.ensure_ready(target.id, true).await,
                },
                Some(DeliveryEffect::Deliver { attempt }) => {
                    match self.transport.deliver(target.id, request).await {
                        Ok(response) => DeliveryEvent::Delivered(response),
                        Err(err) => {
                            relay_warn!(
                                target: BACKGROUND,
                                "{} to tab {}: attempt {}/{} got no response: {}",
                                request.action(),
                                target.id,
                                attempt,
                                policy.max_attempts,
                                err
                            );
                            DeliveryEvent::TransportFailed
                        }
                    }
                }
                Some(DeliveryEffect::Sleep(delay)) => {
                    tokio::time::sleep(delay).await;
                    DeliveryEvent::BackoffElapsed
                }
                Some(DeliveryEffect::Complete(response)) => {
                    match machine.state() {
                        DeliveryState::Failed(kind) => relay_warn!(
                            target: BACKGROUND,
                            "{} to tab {} failed ({}) after {} attempt(s)",
                            request.action(),
                            target.id,
                            kind,
                            machine.transport_attempts()
                        ),
                        _ => relay_debug!(
                            target: BACKGROUND,
                            "{} to tab {} answered after {} attempt(s), success={}",
                            request.action(),
                            target.id,
                            machine.transport_attempts(),
                            response.is_success()
                        ),
                    }
                    return response;
                }
                None => {
                    relay_error!(
                        target: BACKGROUND,
                        "delivery stalled in state {:?}",
                        machine.state()
                    );
                    return FailureKind::Unreachable.to_response();
                }
            };
            effect = machine.step(event);
            relay_debug!(target: BACKGROUND, "delivery state -> {:?}", machine.state());
        }
    }
}
