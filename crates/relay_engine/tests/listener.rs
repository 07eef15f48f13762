use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use relay_core::{Action, Request, NOT_READY_ERROR};
use relay_engine::{ActionError, ActionOutput, ChannelCheck, PageActions, PageContextListener};
use serde_json::{json, Value};

fn init_logging() {
    relay_logging::initialize_for_tests();
}

/// Counts handler invocations; `extract-images` fails and `export-pdf` panics.
#[derive(Default)]
struct RecordingActions {
    calls: AtomicU32,
}

impl RecordingActions {
    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PageActions for RecordingActions {
    async fn summarize(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        self.record();
        Ok(ActionOutput::with_data(
            "summary ready",
            json!({ "echo": data.cloned() }),
        ))
    }

    async fn extract_text(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        self.record();
        tokio::task::yield_now().await;
        Ok(ActionOutput::message("extracted 3 words"))
    }

    async fn extract_images(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        self.record();
        Err(ActionError::new("no images found on this page"))
    }

    async fn export_pdf(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        self.record();
        panic!("printer on fire");
    }

    async fn export_markdown(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        self.record();
        Ok(ActionOutput::message("saved page.md"))
    }

    async fn social_content(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        self.record();
        Ok(ActionOutput::message("found 2 social tag(s)"))
    }
}

struct Channel(Result<(), String>);

impl ChannelCheck for Channel {
    fn verify(&self) -> Result<(), String> {
        self.0.clone()
    }
}

fn ready_listener() -> (PageContextListener, Arc<RecordingActions>) {
    let actions = Arc::new(RecordingActions::default());
    let listener = PageContextListener::new(3, actions.clone());
    assert!(listener.initialize(&Channel(Ok(()))));
    (listener, actions)
}

const PAGE_ACTIONS: [Action; 7] = [
    Action::Ping,
    Action::Summarize,
    Action::ExtractText,
    Action::ExtractImages,
    Action::ExportPdf,
    Action::ExportMarkdown,
    Action::SocialContent,
];

#[tokio::test]
async fn uninitialized_listener_refuses_every_action() {
    init_logging();
    let actions = Arc::new(RecordingActions::default());
    let listener = PageContextListener::new(3, actions.clone());

    for action in PAGE_ACTIONS {
        let response = listener.handle(Request::new(action)).await;
        assert_eq!(response.error_text(), Some(NOT_READY_ERROR));
    }
    assert_eq!(actions.calls(), 0);
}

#[tokio::test]
async fn failed_channel_verification_downgrades_readiness() {
    init_logging();
    let actions = Arc::new(RecordingActions::default());
    let listener = PageContextListener::new(3, actions.clone());

    assert!(!listener.initialize(&Channel(Err("listener rejected".into()))));
    assert!(!listener.is_ready());

    let response = listener.handle(Request::new(Action::ExtractText)).await;
    assert_eq!(response.error_text(), Some(NOT_READY_ERROR));
    assert_eq!(actions.calls(), 0);
}

#[tokio::test]
async fn repeated_initialization_keeps_listener_working() {
    init_logging();
    let (listener, actions) = ready_listener();
    assert!(listener.initialize(&Channel(Ok(()))));
    assert!(listener.initialize(&Channel(Ok(()))));

    let response = listener.handle(Request::new(Action::ExportMarkdown)).await;
    assert_eq!(response.message(), Some("saved page.md"));
    assert_eq!(actions.calls(), 1);
}

#[tokio::test]
async fn ping_answers_without_a_handler() {
    init_logging();
    let (listener, actions) = ready_listener();

    let response = listener.handle(Request::new(Action::Ping)).await;
    assert!(response.is_success());
    assert_eq!(response.message(), Some("ready"));
    assert_eq!(actions.calls(), 0);
}

#[tokio::test]
async fn unknown_actions_name_the_action() {
    init_logging();
    let (listener, actions) = ready_listener();

    for raw in ["dance", "EXTRACT-TEXT", "getSettings", ""] {
        let response = listener.handle(Request::new(Action::parse(raw))).await;
        assert!(!response.is_success());
        assert_eq!(
            response.error_text(),
            Some(format!("unknown action: {raw}").as_str())
        );
    }
    assert_eq!(actions.calls(), 0);
}

#[tokio::test]
async fn handler_errors_become_failure_responses() {
    init_logging();
    let (listener, _actions) = ready_listener();

    let response = listener.handle(Request::new(Action::ExtractImages)).await;
    assert_eq!(response.error_text(), Some("no images found on this page"));
    assert!(response.validate().is_ok());
}

#[tokio::test]
async fn handler_panics_are_contained() {
    init_logging();
    let (listener, actions) = ready_listener();

    let response = listener.handle(Request::new(Action::ExportPdf)).await;
    assert!(!response.is_success());
    assert!(response
        .error_text()
        .is_some_and(|error| error.contains("printer on fire")));

    // The listener keeps serving after a panic.
    let response = listener.handle(Request::new(Action::SocialContent)).await;
    assert!(response.is_success());
    assert_eq!(actions.calls(), 2);
}

#[tokio::test]
async fn request_payload_reaches_the_handler() {
    init_logging();
    let (listener, _actions) = ready_listener();

    let request = Request::with_data(Action::Summarize, json!({ "summaryLength": "short" }));
    let response = listener.handle(request).await;
    assert_eq!(
        response.data(),
        Some(&json!({ "echo": { "summaryLength": "short" } }))
    );
}
