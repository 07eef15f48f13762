use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ceiling applied to every backoff delay, whatever the policy says.
pub const MAX_BACKOFF: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `base * 2^(attempt - 1)`
    Exponential,
    /// `base * attempt^2`
    Quadratic,
}

/// Retry tuning for one dispatch path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff: Backoff,
    /// Attempt number before which the responder is force re-injected, once.
    pub reinject_before: Option<u32>,
}

impl RetryPolicy {
    /// Tuning for requests relayed from the popup.
    pub fn popup() -> Self {
        Self::new(5, 100, Backoff::Exponential)
    }

    /// Tuning for context-menu and key-command triggers.
    pub fn trigger() -> Self {
        Self::new(3, 500, Backoff::Quadratic)
    }

    /// Builds a policy that re-injects before the middle attempt.
    pub fn new(max_attempts: u32, base_delay_ms: u64, backoff: Backoff) -> Self {
        let max_attempts = max_attempts.max(1);
        let middle = max_attempts.div_ceil(2);
        Self {
            max_attempts,
            base_delay_ms,
            backoff,
            reinject_before: (middle > 1).then_some(middle),
        }
    }

    /// Delay to sleep after the failed `attempt` (1-based), capped at [`MAX_BACKOFF`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = u64::from(attempt.max(1));
        let factor = match self.backoff {
            Backoff::Exponential => 1u64.checked_shl((attempt - 1) as u32).unwrap_or(u64::MAX),
            Backoff::Quadratic => attempt.saturating_mul(attempt),
        };
        let millis = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(millis).min(MAX_BACKOFF)
    }
}

/// A policy as written in a config file: any subset of the fields.
///
/// Missing fields come from the preset of the path being configured. The
/// re-injection slot follows the resulting attempt budget unless it is
/// given explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub backoff: Option<Backoff>,
    pub reinject_before: Option<u32>,
}

impl PolicyOverrides {
    pub fn resolve(self, preset: RetryPolicy) -> RetryPolicy {
        let mut policy = RetryPolicy::new(
            self.max_attempts.unwrap_or(preset.max_attempts),
            self.base_delay_ms.unwrap_or(preset.base_delay_ms),
            self.backoff.unwrap_or(preset.backoff),
        );
        if let Some(before) = self.reinject_before {
            policy.reinject_before = (before > 1 && before <= policy.max_attempts).then_some(before);
        }
        policy
    }
}

impl From<RetryPolicy> for PolicyOverrides {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: Some(policy.max_attempts),
            base_delay_ms: Some(policy.base_delay_ms),
            backoff: Some(policy.backoff),
            reinject_before: policy.reinject_before,
        }
    }
}
