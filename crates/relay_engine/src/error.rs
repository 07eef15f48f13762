use std::io;
use std::time::Duration;

use relay_core::TabId;
use thiserror::Error;

use crate::persist::PersistError;

/// A request produced no response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no responder is listening in tab {0}")]
    NoReceiver(TabId),
    #[error("reply channel closed before a response arrived")]
    ChannelClosed,
    #[error("tab {0} no longer exists")]
    TargetGone(TabId),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("no such tab: {0}")]
    NoSuchTab(TabId),
    #[error("script injection is not allowed on {0}")]
    InjectionForbidden(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Failure reported by a page action handler; its text reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings io error: {0}")]
    Io(#[from] io::Error),
    #[error("settings write failed: {0}")]
    Persist(#[from] PersistError),
    #[error("settings could not be serialized: {0}")]
    Serialize(String),
    #[error("stored settings are unreadable: {0}")]
    Corrupt(String),
    #[error("settings task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Parse(String),
}
