//! In-process browser: tabs whose page contexts run as tokio tasks.
//!
//! Each injected responder owns a request channel; every request carries a
//! oneshot sender for its reply. A reply sender dropped without an answer is
//! what "no response" looks like to the caller.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use relay_core::{is_restricted_surface, Request, Response, TabId, Target};
use relay_logging::{relay_debug, relay_info, relay_trace, BACKGROUND, PAGE};
use tokio::sync::{mpsc, oneshot};

use crate::{
    ChannelCheck, HostError, HtmlPageActions, PageActions, PageContextListener, PageHost,
    Transport, TransportError,
};

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_QUEUE_DEPTH: usize = 32;

/// Builds the action handlers for a freshly injected page.
pub type ActionsFactory = Arc<dyn Fn(&Target, &str) -> Arc<dyn PageActions> + Send + Sync>;

struct Envelope {
    request: Request,
    reply: oneshot::Sender<Response>,
}

struct PageHandle {
    listener: Arc<PageContextListener>,
    tx: mpsc::Sender<Envelope>,
    alive: Arc<AtomicBool>,
    drop_replies: Arc<AtomicBool>,
}

impl PageHandle {
    fn tear_down(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

struct TabSlot {
    url: String,
    html: String,
    injectable: bool,
    channel_blocked: bool,
    drop_replies: bool,
    injections: u32,
    page: Option<PageHandle>,
}

impl TabSlot {
    fn clear_page(&mut self) {
        if let Some(page) = self.page.take() {
            page.tear_down();
        }
    }
}

#[derive(Default)]
struct BrowserState {
    tabs: BTreeMap<TabId, TabSlot>,
    active: Option<TabId>,
    next_id: TabId,
}

struct ChannelProbe<'a> {
    tx: &'a mpsc::Sender<Envelope>,
    blocked: bool,
}

impl ChannelCheck for ChannelProbe<'_> {
    fn verify(&self) -> Result<(), String> {
        if self.blocked {
            return Err("host rejected the message listener".to_string());
        }
        if self.tx.is_closed() {
            return Err("request channel is closed".to_string());
        }
        Ok(())
    }
}

/// Simulated browser implementing both [`Transport`] and [`PageHost`].
///
/// Cloning yields another handle to the same tabs.
#[derive(Clone)]
pub struct InProcessBrowser {
    state: Arc<Mutex<BrowserState>>,
    reply_timeout: Duration,
    actions: ActionsFactory,
}

impl Default for InProcessBrowser {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_TIMEOUT)
    }
}

impl InProcessBrowser {
    pub fn new(reply_timeout: Duration) -> Self {
        Self::with_actions(
            reply_timeout,
            Arc::new(|target: &Target, html: &str| {
                Arc::new(HtmlPageActions::new(target.url.clone(), html)) as Arc<dyn PageActions>
            }),
        )
    }

    pub fn with_actions(reply_timeout: Duration, actions: ActionsFactory) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrowserState {
                next_id: 1,
                ..BrowserState::default()
            })),
            reply_timeout,
            actions,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrowserState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens a tab without a responder and makes it the active one.
    pub fn open_tab(&self, url: impl Into<String>, html: impl Into<String>) -> TabId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.tabs.insert(
            id,
            TabSlot {
                url: url.into(),
                html: html.into(),
                injectable: true,
                channel_blocked: false,
                drop_replies: false,
                injections: 0,
                page: None,
            },
        );
        state.active = Some(id);
        id
    }

    pub fn activate(&self, tab: TabId) -> bool {
        let mut state = self.lock();
        if state.tabs.contains_key(&tab) {
            state.active = Some(tab);
            true
        } else {
            false
        }
    }

    pub fn target(&self, tab: TabId) -> Option<Target> {
        let state = self.lock();
        state.tabs.get(&tab).map(|slot| Target::new(tab, slot.url.clone()))
    }

    /// Loads a new document; the old page context is destroyed with it.
    pub fn navigate(&self, tab: TabId, url: impl Into<String>, html: impl Into<String>) {
        let mut state = self.lock();
        if let Some(slot) = state.tabs.get_mut(&tab) {
            slot.clear_page();
            slot.url = url.into();
            slot.html = html.into();
        }
    }

    /// Reloads the document, destroying the page context.
    pub fn reload(&self, tab: TabId) {
        let mut state = self.lock();
        if let Some(slot) = state.tabs.get_mut(&tab) {
            slot.clear_page();
        }
    }

    pub fn close_tab(&self, tab: TabId) {
        let mut state = self.lock();
        if let Some(mut slot) = state.tabs.remove(&tab) {
            slot.clear_page();
        }
        if state.active == Some(tab) {
            state.active = None;
        }
    }

    /// Forbids (or allows again) script injection, as a policy-protected page would.
    pub fn set_injectable(&self, tab: TabId, injectable: bool) {
        if let Some(slot) = self.lock().tabs.get_mut(&tab) {
            slot.injectable = injectable;
        }
    }

    /// Makes listener verification fail in pages injected from now on.
    pub fn set_channel_blocked(&self, tab: TabId, blocked: bool) {
        if let Some(slot) = self.lock().tabs.get_mut(&tab) {
            slot.channel_blocked = blocked;
        }
    }

    /// Makes the page swallow replies: requests run, answers never arrive.
    pub fn set_drop_replies(&self, tab: TabId, drop_replies: bool) {
        if let Some(slot) = self.lock().tabs.get_mut(&tab) {
            slot.drop_replies = drop_replies;
            if let Some(page) = &slot.page {
                page.drop_replies.store(drop_replies, Ordering::SeqCst);
            }
        }
    }

    pub fn has_responder(&self, tab: TabId) -> bool {
        self.lock()
            .tabs
            .get(&tab)
            .is_some_and(|slot| slot.page.is_some())
    }

    pub fn injection_count(&self, tab: TabId) -> u32 {
        self.lock()
            .tabs
            .get(&tab)
            .map_or(0, |slot| slot.injections)
    }

    fn spawn_page(&self, tab: TabId, slot: &TabSlot) -> PageHandle {
        let target = Target::new(tab, slot.url.clone());
        let actions = (self.actions)(&target, &slot.html);
        let listener = Arc::new(PageContextListener::new(tab, actions));
        let (tx, mut rx) = mpsc::channel::<Envelope>(REQUEST_QUEUE_DEPTH);
        let alive = Arc::new(AtomicBool::new(true));
        let drop_replies = Arc::new(AtomicBool::new(slot.drop_replies));

        let page = PageHandle {
            listener: listener.clone(),
            tx,
            alive: alive.clone(),
            drop_replies: drop_replies.clone(),
        };

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                if !alive.load(Ordering::SeqCst) {
                    break;
                }
                let listener = listener.clone();
                let alive = alive.clone();
                let drop_replies = drop_replies.clone();
                // Requests are handled concurrently and may interleave.
                tokio::spawn(async move {
                    let action = envelope.request.action().clone();
                    let response = listener.handle(envelope.request).await;
                    if !alive.load(Ordering::SeqCst) || drop_replies.load(Ordering::SeqCst) {
                        relay_trace!(target: PAGE, "reply to {} in tab {} lost", action, tab);
                        return;
                    }
                    let _ = envelope.reply.send(response);
                });
            }
            relay_debug!(target: PAGE, "page context in tab {} stopped", tab);
        });

        page
    }
}

#[async_trait::async_trait]
impl PageHost for InProcessBrowser {
    async fn evaluate_ready_flag(&self, tab: TabId) -> Result<bool, HostError> {
        let state = self.lock();
        let slot = state.tabs.get(&tab).ok_or(HostError::NoSuchTab(tab))?;
        if is_restricted_surface(&slot.url) || !slot.injectable {
            return Err(HostError::Evaluation(format!(
                "cannot access contents of {}",
                slot.url
            )));
        }
        // An absent responder leaves the flag undefined, which reads as false.
        Ok(slot.page.as_ref().is_some_and(|page| {
            page.alive.load(Ordering::SeqCst) && page.listener.is_ready()
        }))
    }

    async fn inject_responder(&self, tab: TabId) -> Result<(), HostError> {
        let mut state = self.lock();
        let slot = state.tabs.get_mut(&tab).ok_or(HostError::NoSuchTab(tab))?;
        if is_restricted_surface(&slot.url) || !slot.injectable {
            return Err(HostError::InjectionForbidden(slot.url.clone()));
        }
        slot.injections += 1;

        let page = match slot.page.take() {
            Some(page) if page.alive.load(Ordering::SeqCst) && !page.tx.is_closed() => {
                relay_debug!(target: PAGE, "re-initializing listener in tab {}", tab);
                page
            }
            stale => {
                if let Some(stale) = stale {
                    stale.tear_down();
                }
                relay_info!(target: BACKGROUND, "injected responder into tab {}", tab);
                self.spawn_page(tab, slot)
            }
        };
        page.listener.initialize(&ChannelProbe {
            tx: &page.tx,
            blocked: slot.channel_blocked,
        });
        slot.page = Some(page);
        Ok(())
    }

    async fn active_target(&self) -> Option<Target> {
        let state = self.lock();
        let tab = state.active?;
        state
            .tabs
            .get(&tab)
            .map(|slot| Target::new(tab, slot.url.clone()))
    }
}

#[async_trait::async_trait]
impl Transport for InProcessBrowser {
    async fn deliver(&self, tab: TabId, request: &Request) -> Result<Response, TransportError> {
        let tx = {
            let state = self.lock();
            let slot = state.tabs.get(&tab).ok_or(TransportError::TargetGone(tab))?;
            match &slot.page {
                Some(page) if page.alive.load(Ordering::SeqCst) => page.tx.clone(),
                _ => return Err(TransportError::NoReceiver(tab)),
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(Envelope {
            request: request.clone(),
            reply: reply_tx,
        })
        .await
        .map_err(|_| TransportError::NoReceiver(tab))?;

        match tokio::time::timeout(self.reply_timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TransportError::ChannelClosed),
            Err(_) => Err(TransportError::Timeout(self.reply_timeout)),
        }
    }
}
