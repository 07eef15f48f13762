use relay_core::{Request, Response, TabId, Target};

use crate::{HostError, TransportError};

/// Carries one request to the responder in a tab and waits for its answer.
///
/// `Ok` means a response came back, whatever its `success` flag says. `Err`
/// means nothing came back; that is the only case a caller may retry.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, tab: TabId, request: &Request) -> Result<Response, TransportError>;
}

/// Script-level access to tabs, as the background context sees them.
#[async_trait::async_trait]
pub trait PageHost: Send + Sync {
    /// Evaluates the responder's ready flag inside the tab. Has no side effects.
    async fn evaluate_ready_flag(&self, tab: TabId) -> Result<bool, HostError>;

    /// Injects the responder program into the tab.
    async fn inject_responder(&self, tab: TabId) -> Result<(), HostError>;

    /// The tab the user is currently looking at, if any.
    async fn active_target(&self) -> Option<Target>;
}
