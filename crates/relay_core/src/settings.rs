use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Openai,
    Anthropic,
    Google,
    Ollama,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    /// Number of sentences an extractive summary keeps.
    pub fn sentence_budget(self) -> usize {
        match self {
            SummaryLength::Short => 2,
            SummaryLength::Medium => 4,
            SummaryLength::Long => 8,
        }
    }
}

/// The persisted settings record, keyed exactly as on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub ai_provider: AiProvider,
    pub api_key: String,
    pub model: String,
    pub summary_length: SummaryLength,
    pub auto_save: bool,
    pub show_notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai_provider: AiProvider::Openai,
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            summary_length: SummaryLength::Medium,
            auto_save: true,
            show_notifications: true,
        }
    }
}

impl Settings {
    /// Merges `patch` into the record; keys absent from the patch keep their value.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(provider) = patch.ai_provider {
            self.ai_provider = provider;
        }
        if let Some(api_key) = patch.api_key {
            self.api_key = api_key;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(length) = patch.summary_length {
            self.summary_length = length;
        }
        if let Some(auto_save) = patch.auto_save {
            self.auto_save = auto_save;
        }
        if let Some(show) = patch.show_notifications {
            self.show_notifications = show;
        }
    }
}

/// A partial write: any subset of the settings keys. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<AiProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<SummaryLength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_save: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_notifications: Option<bool>,
}

impl SettingsPatch {
    /// Parses one `key=value` pair using the wire key names.
    pub fn parse_assignment(assignment: &str) -> Result<Self, String> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{assignment}'"))?;
        let key = key.trim();
        let value = value.trim();
        let json_value = match key {
            "autoSave" | "showNotifications" => {
                let flag: bool = value
                    .parse()
                    .map_err(|_| format!("{key} expects true or false, got '{value}'"))?;
                serde_json::Value::Bool(flag)
            }
            "aiProvider" | "apiKey" | "model" | "summaryLength" => {
                serde_json::Value::String(value.to_string())
            }
            other => return Err(format!("unknown settings key '{other}'")),
        };
        let mut object = serde_json::Map::new();
        object.insert(key.to_string(), json_value);
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|err| format!("invalid value for {key}: {err}"))
    }
}
