use std::fmt;

use serde::{Deserialize, Serialize};

/// The action named by a request.
///
/// Known actions get their own variant so routing is an exhaustive `match`;
/// anything else is kept verbatim in `Unrecognized` so the responder can
/// report it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    /// Liveness round-trip, answered by the page listener itself.
    Ping,
    Summarize,
    ExtractText,
    ExtractImages,
    ExportPdf,
    ExportMarkdown,
    SocialContent,
    /// Context-local: answered by the coordinator from the settings store.
    GetSettings,
    /// Context-local: merged into the settings store by the coordinator.
    SaveSettings,
    Unrecognized(String),
}

impl Action {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ping" => Action::Ping,
            "summarize" => Action::Summarize,
            "extract-text" => Action::ExtractText,
            "extract-images" => Action::ExtractImages,
            "export-pdf" => Action::ExportPdf,
            "export-markdown" => Action::ExportMarkdown,
            "social-content" => Action::SocialContent,
            "getSettings" => Action::GetSettings,
            "saveSettings" => Action::SaveSettings,
            other => Action::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Ping => "ping",
            Action::Summarize => "summarize",
            Action::ExtractText => "extract-text",
            Action::ExtractImages => "extract-images",
            Action::ExportPdf => "export-pdf",
            Action::ExportMarkdown => "export-markdown",
            Action::SocialContent => "social-content",
            Action::GetSettings => "getSettings",
            Action::SaveSettings => "saveSettings",
            Action::Unrecognized(raw) => raw,
        }
    }

    /// Actions the coordinator answers without reaching any page.
    pub fn is_context_local(&self) -> bool {
        matches!(self, Action::GetSettings | Action::SaveSettings)
    }
}

impl From<String> for Action {
    fn from(raw: String) -> Self {
        Action::parse(&raw)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
