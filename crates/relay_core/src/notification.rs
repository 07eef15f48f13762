use crate::{Action, Response};

pub const ERROR_TITLE: &str = "Page Relay error";

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Shapes the notification for the final response of a trigger.
    pub fn for_outcome(action: &Action, response: &Response) -> Self {
        if let Some(error) = response.error_text() {
            return Self::new(ERROR_TITLE, error);
        }
        let message = response.message().unwrap_or("done");
        Self::new(success_title(action), message)
    }
}

fn success_title(action: &Action) -> String {
    match action {
        Action::Ping => "Page ready".to_string(),
        Action::Summarize => "Summary ready".to_string(),
        Action::ExtractText => "Text extracted".to_string(),
        Action::ExtractImages => "Images extracted".to_string(),
        Action::ExportPdf => "PDF exported".to_string(),
        Action::ExportMarkdown => "Markdown exported".to_string(),
        Action::SocialContent => "Social content extracted".to_string(),
        Action::GetSettings | Action::SaveSettings => "Settings".to_string(),
        Action::Unrecognized(raw) => format!("{raw} finished"),
    }
}
