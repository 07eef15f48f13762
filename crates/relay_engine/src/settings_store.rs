use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use relay_core::{Settings, SettingsPatch};
use relay_logging::{relay_info, relay_warn, BACKGROUND};
use tokio::sync::Mutex;

use crate::{AtomicFileWriter, StoreError};

/// Persistent home of the settings record.
///
/// Implementations serialize their own writes: concurrent `merge` calls are
/// applied one after the other, each on top of the previous result.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Settings, StoreError>;

    /// Merges `patch` into the stored record and returns the result.
    async fn merge(&self, patch: SettingsPatch) -> Result<Settings, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

#[async_trait::async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        Ok(self.settings.lock().await.clone())
    }

    async fn merge(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let mut settings = self.settings.lock().await;
        settings.apply(patch);
        Ok(settings.clone())
    }
}

/// Settings kept in a RON file, replaced atomically on every write.
pub struct RonSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SettingsStore for RonSettingsStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            read_settings(&path).unwrap_or_else(|err| {
                relay_warn!(target: BACKGROUND, "Using default settings: {}", err);
                Settings::default()
            })
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))
    }

    /// A record that exists but cannot be read is left untouched.
    async fn merge(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut settings = read_settings(&path)?;
            settings.apply(patch);
            write_settings(&path, &settings)?;
            Ok(settings)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

/// Only a missing file means defaults.
fn read_settings(path: &Path) -> Result<Settings, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
        Err(err) => return Err(StoreError::Io(err)),
    };
    ron::from_str(&content)
        .map_err(|err| StoreError::Corrupt(format!("{}: {}", path.display(), err)))
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), StoreError> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(settings, pretty)
        .map_err(|err| StoreError::Serialize(err.to_string()))?;
    AtomicFileWriter::new(path.to_path_buf()).write(&content)?;
    relay_info!(target: BACKGROUND, "Saved settings to {:?}", path);
    Ok(())
}
