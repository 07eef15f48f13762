//! Responder that lives inside one page context.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use relay_core::{Action, Request, Response, TabId, NOT_READY_ERROR};
use relay_logging::{relay_debug, relay_warn, PAGE};
use serde_json::Value;

use crate::ActionError;

/// Successful handler result; the listener turns it into a [`Response`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    pub message: String,
    pub data: Option<Value>,
}

impl ActionOutput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }

    fn into_response(self) -> Response {
        match self.data {
            Some(data) => Response::ok_with_data(self.message, data),
            None => Response::ok(self.message),
        }
    }
}

/// The page-side action handlers, one method per known action.
#[async_trait::async_trait]
pub trait PageActions: Send + Sync {
    async fn summarize(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError>;
    async fn extract_text(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError>;
    async fn extract_images(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError>;
    async fn export_pdf(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError>;
    async fn export_markdown(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError>;
    async fn social_content(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError>;
}

/// Verifies that the context can actually receive messages, not merely that
/// its initialization code ran.
pub trait ChannelCheck {
    fn verify(&self) -> Result<(), String>;
}

pub struct PageContextListener {
    tab: TabId,
    ready: AtomicBool,
    actions: Arc<dyn PageActions>,
}

impl PageContextListener {
    /// A listener starts not ready; call [`initialize`](Self::initialize).
    pub fn new(tab: TabId, actions: Arc<dyn PageActions>) -> Self {
        Self {
            tab,
            ready: AtomicBool::new(false),
            actions,
        }
    }

    /// Marks the listener ready, then downgrades it if the inbound channel
    /// fails verification. Safe to call again on an initialized listener.
    pub fn initialize(&self, channel: &dyn ChannelCheck) -> bool {
        self.ready.store(true, Ordering::SeqCst);
        match channel.verify() {
            Ok(()) => {
                relay_debug!(target: PAGE, "listener in tab {} is ready", self.tab);
                true
            }
            Err(reason) => {
                relay_warn!(
                    target: PAGE,
                    "listener in tab {} cannot receive messages: {}",
                    self.tab,
                    reason
                );
                self.ready.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Answers one request. Always yields a response; handler errors and
    /// panics become failure responses.
    pub async fn handle(&self, request: Request) -> Response {
        if !self.is_ready() {
            return Response::failure(NOT_READY_ERROR);
        }

        let action = request.action();
        let routed = AssertUnwindSafe(self.route(action, request.data()))
            .catch_unwind()
            .await;
        match routed {
            Ok(Ok(output)) => output.into_response(),
            Ok(Err(err)) => {
                relay_debug!(target: PAGE, "{} failed in tab {}: {}", action, self.tab, err);
                Response::failure(err.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                relay_warn!(target: PAGE, "{} panicked in tab {}: {}", action, self.tab, message);
                Response::failure(message)
            }
        }
    }

    async fn route(
        &self,
        action: &Action,
        data: Option<&Value>,
    ) -> Result<ActionOutput, ActionError> {
        match action {
            Action::Ping => Ok(ActionOutput::message("ready")),
            Action::Summarize => self.actions.summarize(data).await,
            Action::ExtractText => self.actions.extract_text(data).await,
            Action::ExtractImages => self.actions.extract_images(data).await,
            Action::ExportPdf => self.actions.export_pdf(data).await,
            Action::ExportMarkdown => self.actions.export_markdown(data).await,
            Action::SocialContent => self.actions.social_content(data).await,
            // Settings live in the background context, never in a page.
            Action::GetSettings | Action::SaveSettings | Action::Unrecognized(_) => {
                Err(ActionError::new(format!("unknown action: {action}")))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("action failed: {text}")
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("action failed: {text}")
    } else {
        "action failed unexpectedly".to_string()
    }
}
