use std::fs;
use std::path::Path;
use std::time::Duration;

use relay_core::{PolicyOverrides, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, TriggerSource, DEFAULT_REPLY_TIMEOUT, DEFAULT_SETTLE_DELAY};

/// Engine tuning. Every field has a default, so a config file may name only
/// what it changes, down to single fields of a retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EngineConfigFile")]
pub struct EngineConfig {
    pub settle_delay_ms: u64,
    pub reply_timeout_ms: u64,
    pub popup_policy: RetryPolicy,
    pub menu_policy: RetryPolicy,
    pub command_policy: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT.as_millis() as u64,
            popup_policy: RetryPolicy::popup(),
            menu_policy: RetryPolicy::trigger(),
            command_policy: RetryPolicy::trigger(),
        }
    }
}

/// On-disk shape; each policy is completed from its own path's preset.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EngineConfigFile {
    settle_delay_ms: Option<u64>,
    reply_timeout_ms: Option<u64>,
    popup_policy: PolicyOverrides,
    menu_policy: PolicyOverrides,
    command_policy: PolicyOverrides,
}

impl From<EngineConfigFile> for EngineConfig {
    fn from(file: EngineConfigFile) -> Self {
        let defaults = EngineConfig::default();
        Self {
            settle_delay_ms: file.settle_delay_ms.unwrap_or(defaults.settle_delay_ms),
            reply_timeout_ms: file.reply_timeout_ms.unwrap_or(defaults.reply_timeout_ms),
            popup_policy: file.popup_policy.resolve(defaults.popup_policy),
            menu_policy: file.menu_policy.resolve(defaults.menu_policy),
            command_policy: file.command_policy.resolve(defaults.command_policy),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn policy_for(&self, source: TriggerSource) -> &RetryPolicy {
        match source {
            TriggerSource::Popup => &self.popup_policy,
            TriggerSource::ContextMenu => &self.menu_policy,
            TriggerSource::KeyCommand => &self.command_policy,
        }
    }
}
