#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use relay_core::{Request, Response, TabId, Target};
use relay_engine::{HostError, PageHost, Transport, TransportError};

/// What the scripted tab does when probed, injected into or messaged.
#[derive(Debug, Clone)]
pub struct Script {
    /// Value the ready flag evaluates to.
    pub flag: bool,
    /// Whether a responder is actually receiving messages.
    pub listening: bool,
    pub injectable: bool,
    /// State the tab ends up in after an injection.
    pub ready_after_injection: bool,
    /// Answer of a listening responder.
    pub response: Response,
    pub active: Option<Target>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            flag: true,
            listening: true,
            injectable: true,
            ready_after_injection: true,
            response: Response::ok("done"),
            active: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub ready_checks: u32,
    pub injections: u32,
    pub transport_attempts: u32,
}

#[derive(Default)]
struct Inner {
    script: Script,
    counters: Counters,
    delivered: Vec<Request>,
}

/// A single fake tab implementing both host seams, recording every call.
#[derive(Clone, Default)]
pub struct ScriptedPage {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedPage {
    pub fn new(script: Script) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                script,
                ..Inner::default()
            })),
        }
    }

    pub fn counters(&self) -> Counters {
        self.inner.lock().unwrap().counters
    }

    pub fn delivered(&self) -> Vec<Request> {
        self.inner.lock().unwrap().delivered.clone()
    }

    pub fn update(&self, change: impl FnOnce(&mut Script)) {
        change(&mut self.inner.lock().unwrap().script);
    }
}

#[async_trait::async_trait]
impl PageHost for ScriptedPage {
    async fn evaluate_ready_flag(&self, _tab: TabId) -> Result<bool, HostError> {
        let mut inner = self.inner.lock().unwrap();
        inner.counters.ready_checks += 1;
        Ok(inner.script.flag)
    }

    async fn inject_responder(&self, _tab: TabId) -> Result<(), HostError> {
        let mut inner = self.inner.lock().unwrap();
        inner.counters.injections += 1;
        if !inner.script.injectable {
            return Err(HostError::InjectionForbidden("scripted".into()));
        }
        let ready = inner.script.ready_after_injection;
        inner.script.flag = ready;
        inner.script.listening = ready;
        Ok(())
    }

    async fn active_target(&self) -> Option<Target> {
        self.inner.lock().unwrap().script.active.clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedPage {
    async fn deliver(&self, tab: TabId, request: &Request) -> Result<Response, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.counters.transport_attempts += 1;
        if !inner.script.listening {
            return Err(TransportError::NoReceiver(tab));
        }
        inner.delivered.push(request.clone());
        Ok(inner.script.response.clone())
    }
}

pub fn web_target() -> Target {
    Target::new(7, "https://example.com/article")
}
