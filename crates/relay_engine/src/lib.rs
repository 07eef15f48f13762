//! Relay engine: page hosts, delivery and the background coordinator.
mod actions;
mod browser;
mod config;
mod coordinator;
mod dispatch;
mod error;
mod listener;
mod notify;
mod persist;
mod probe;
mod settings_store;
mod transport;

pub use actions::HtmlPageActions;
pub use browser::{ActionsFactory, InProcessBrowser, DEFAULT_REPLY_TIMEOUT};
pub use config::EngineConfig;
pub use coordinator::{Coordinator, Trigger, TriggerSource};
pub use dispatch::Dispatcher;
pub use error::{ActionError, ConfigError, HostError, StoreError, TransportError};
pub use listener::{ActionOutput, ChannelCheck, PageActions, PageContextListener};
pub use notify::{ChannelNotifier, LogNotifier, Notifier};
pub use persist::{ensure_parent_dir, AtomicFileWriter, PersistError};
pub use probe::{ReadinessProbe, DEFAULT_SETTLE_DELAY};
pub use settings_store::{MemorySettingsStore, RonSettingsStore, SettingsStore};
pub use transport::{PageHost, Transport};
