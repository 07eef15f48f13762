use std::sync::Arc;
use std::time::Duration;

use relay_core::TabId;
use relay_logging::{relay_debug, relay_warn, BACKGROUND};

use crate::PageHost;

/// Time given to a freshly injected responder to run its initialization.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Checks whether a tab's responder is initialized and injects it on demand.
///
/// Neither operation fails: every host error collapses to "not ready".
pub struct ReadinessProbe {
    host: Arc<dyn PageHost>,
    settle_delay: Duration,
}

impl ReadinessProbe {
    pub fn new(host: Arc<dyn PageHost>, settle_delay: Duration) -> Self {
        Self { host, settle_delay }
    }

    pub async fn is_ready(&self, tab: TabId) -> bool {
        match self.host.evaluate_ready_flag(tab).await {
            Ok(ready) => ready,
            Err(err) => {
                relay_debug!(target: BACKGROUND, "ready check on tab {} failed: {}", tab, err);
                false
            }
        }
    }

    pub async fn ensure_ready(&self, tab: TabId, force_reinject: bool) -> bool {
        if !force_reinject && self.is_ready(tab).await {
            return true;
        }

        relay_debug!(
            target: BACKGROUND,
            "injecting responder into tab {} (forced={})",
            tab,
            force_reinject
        );
        if let Err(err) = self.host.inject_responder(tab).await {
            relay_warn!(target: BACKGROUND, "injection into tab {} failed: {}", tab, err);
            return false;
        }

        tokio::time::sleep(self.settle_delay).await;
        self.is_ready(tab).await
    }
}
