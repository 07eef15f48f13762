//! The long-lived background context.

use std::sync::Arc;

use relay_core::{
    Action, FailureKind, Notification, Request, Response, Settings, SettingsPatch, Target,
};
use relay_logging::{relay_debug, relay_info, relay_warn, BACKGROUND};
use serde_json::{Map, Value};

use crate::{Dispatcher, EngineConfig, Notifier, PageHost, SettingsStore};

const MENU_ITEM_PREFIX: &str = "page-relay-";
const SETTINGS_UNAVAILABLE: &str = "could not access settings, try again";
const SUMMARY_LENGTH_KEY: &str = "summaryLength";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Popup,
    ContextMenu,
    KeyCommand,
}

/// A trigger owned by the background context, normalized to an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub source: TriggerSource,
    pub action: Action,
    /// Tab the trigger came from; the active tab is used when absent.
    pub target: Option<Target>,
    pub data: Option<Value>,
}

impl Trigger {
    /// Menu items are registered as `page-relay-<action>`.
    pub fn from_menu_item(menu_item_id: &str, target: Option<Target>) -> Self {
        let name = menu_item_id
            .strip_prefix(MENU_ITEM_PREFIX)
            .unwrap_or(menu_item_id);
        Self {
            source: TriggerSource::ContextMenu,
            action: Action::parse(name),
            target,
            data: None,
        }
    }

    pub fn from_command(command: &str, target: Option<Target>) -> Self {
        let action = match command {
            "summarize-page" => Action::Summarize,
            "extract-page-text" => Action::ExtractText,
            "export-page-markdown" => Action::ExportMarkdown,
            other => Action::parse(other),
        };
        Self {
            source: TriggerSource::KeyCommand,
            action,
            target,
            data: None,
        }
    }

    fn request(&self) -> Request {
        match &self.data {
            Some(data) => Request::with_data(self.action.clone(), data.clone()),
            None => Request::new(self.action.clone()),
        }
    }
}

pub struct Coordinator {
    dispatcher: Dispatcher,
    host: Arc<dyn PageHost>,
    store: Arc<dyn SettingsStore>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl Coordinator {
    pub fn new(
        dispatcher: Dispatcher,
        host: Arc<dyn PageHost>,
        store: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            dispatcher,
            host,
            store,
            notifier,
            config,
        }
    }

    /// Answers a request sent by the popup.
    ///
    /// Settings requests are answered here; everything else is relayed to
    /// `target`, or to the active tab when no target is given.
    pub async fn handle_request(&self, request: Request, target: Option<Target>) -> Response {
        if request.action().is_context_local() {
            return self.answer_locally(&request).await;
        }
        let Some(target) = self.resolve_target(target).await else {
            return FailureKind::TargetNotFound.to_response();
        };
        let request = self.with_stored_preferences(request).await;
        self.dispatcher
            .send(&target, &request, self.config.policy_for(TriggerSource::Popup))
            .await
    }

    /// Runs a menu or key-command trigger and notifies the user of the outcome.
    pub async fn on_trigger(&self, trigger: Trigger) -> Response {
        relay_info!(
            target: BACKGROUND,
            "{:?} trigger for {}",
            trigger.source,
            trigger.action
        );
        let request = trigger.request();
        let response = if trigger.action.is_context_local() {
            self.answer_locally(&request).await
        } else {
            match self.resolve_target(trigger.target.clone()).await {
                Some(target) => {
                    let request = self.with_stored_preferences(request).await;
                    self.dispatcher
                        .send(&target, &request, self.config.policy_for(trigger.source))
                        .await
                }
                None => FailureKind::TargetNotFound.to_response(),
            }
        };
        self.notify(&trigger.action, &response).await;
        response
    }

    async fn resolve_target(&self, target: Option<Target>) -> Option<Target> {
        match target {
            Some(target) => Some(target),
            None => self.host.active_target().await,
        }
    }

    /// Summaries use the stored length unless the caller picked one.
    async fn with_stored_preferences(&self, request: Request) -> Request {
        if !matches!(request.action(), Action::Summarize) {
            return request;
        }
        let fields = match request.data() {
            None => Some(Map::new()),
            Some(Value::Object(fields)) if !fields.contains_key(SUMMARY_LENGTH_KEY) => {
                Some(fields.clone())
            }
            Some(_) => None,
        };
        let Some(mut fields) = fields else {
            return request;
        };
        let settings = match self.store.load().await {
            Ok(settings) => settings,
            Err(err) => {
                relay_warn!(target: BACKGROUND, "loading settings failed: {}", err);
                return request;
            }
        };
        match serde_json::to_value(settings.summary_length) {
            Ok(length) => {
                fields.insert(SUMMARY_LENGTH_KEY.to_string(), length);
                Request::with_data(Action::Summarize, Value::Object(fields))
            }
            Err(_) => request,
        }
    }

    async fn answer_locally(&self, request: &Request) -> Response {
        match request.action() {
            Action::GetSettings => match self.store.load().await {
                Ok(settings) => settings_response("settings loaded", &settings),
                Err(err) => {
                    relay_warn!(target: BACKGROUND, "loading settings failed: {}", err);
                    Response::failure(SETTINGS_UNAVAILABLE)
                }
            },
            Action::SaveSettings => {
                let patch = match request.data() {
                    None => SettingsPatch::default(),
                    Some(data) => match serde_json::from_value::<SettingsPatch>(data.clone()) {
                        Ok(patch) => patch,
                        Err(err) => return Response::failure(format!("invalid settings: {err}")),
                    },
                };
                match self.store.merge(patch).await {
                    Ok(settings) => settings_response("settings saved", &settings),
                    Err(err) => {
                        relay_warn!(target: BACKGROUND, "saving settings failed: {}", err);
                        Response::failure(SETTINGS_UNAVAILABLE)
                    }
                }
            }
            other => Response::failure(format!("unknown action: {other}")),
        }
    }

    /// The notification switch is read now, not when the trigger fired.
    async fn notify(&self, action: &Action, response: &Response) {
        let enabled = match self.store.load().await {
            Ok(settings) => settings.show_notifications,
            Err(err) => {
                relay_warn!(target: BACKGROUND, "loading settings failed: {}", err);
                true
            }
        };
        if !enabled {
            relay_debug!(target: BACKGROUND, "notifications disabled; dropping {}", action);
            return;
        }
        self.notifier.notify(Notification::for_outcome(action, response));
    }
}

fn settings_response(message: &str, settings: &Settings) -> Response {
    match serde_json::to_value(settings) {
        Ok(data) => Response::ok_with_data(message, data),
        Err(err) => Response::failure(format!("settings could not be encoded: {err}")),
    }
}
