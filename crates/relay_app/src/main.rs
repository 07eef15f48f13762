mod platform;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use relay_core::{Action, Request, Response, SettingsPatch, Target};
use relay_engine::{
    Coordinator, Dispatcher, EngineConfig, InProcessBrowser, LogNotifier, ReadinessProbe,
    RonSettingsStore, Trigger,
};
use relay_logging::{relay_info, POPUP};
use serde_json::{Map, Value};

use platform::logging::{self, LogDestination};

const FALLBACK_PAGE: &str = "<html><head><title>Blank</title></head><body></body></html>";

/// Where the request originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Popup,
    Menu,
    Key,
}

/// Runs one page action through the relay against a simulated tab.
#[derive(Debug, Parser)]
#[command(name = "page-relay", version)]
struct Cli {
    /// URL of the tab the action runs in.
    #[arg(long, default_value = "https://example.com/")]
    url: String,

    /// HTML document loaded into the tab.
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// Action name, menu item id or key command, depending on --source.
    #[arg(long, default_value = "ping")]
    action: String,

    #[arg(long, value_enum, default_value_t = Source::Popup)]
    source: Source,

    /// Settings record, created on first save.
    #[arg(long, value_name = "FILE", default_value = "relay-settings.ron")]
    settings: PathBuf,

    /// Engine configuration in RON; defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    log: LogDestination,

    #[arg(short, long)]
    verbose: bool,

    /// Settings assignment for saveSettings, e.g. `--set model=gpt-4`.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    assignments: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let html = match &cli.html {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading page {}", path.display()))?,
        None => FALLBACK_PAGE.to_string(),
    };
    let data = settings_data(&cli.assignments)?;

    let browser = InProcessBrowser::new(config.reply_timeout());
    let tab = browser.open_tab(cli.url.clone(), html);
    let target = browser.target(tab);

    let browser = Arc::new(browser);
    let probe = ReadinessProbe::new(browser.clone(), config.settle_delay());
    let dispatcher = Dispatcher::new(browser.clone(), Arc::new(probe));
    let coordinator = Coordinator::new(
        dispatcher,
        browser,
        Arc::new(RonSettingsStore::new(cli.settings.clone())),
        Arc::new(LogNotifier),
        config,
    );

    let response = run(&coordinator, &cli, target, data).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run(
    coordinator: &Coordinator,
    cli: &Cli,
    target: Option<Target>,
    data: Option<Value>,
) -> Response {
    match cli.source {
        Source::Popup => {
            let action = Action::parse(&cli.action);
            relay_info!(target: POPUP, "sending {} to the background", action);
            let request = match data {
                Some(data) => Request::with_data(action, data),
                None => Request::new(action),
            };
            coordinator.handle_request(request, None).await
        }
        Source::Menu => {
            let mut trigger = Trigger::from_menu_item(&cli.action, target);
            trigger.data = data;
            coordinator.on_trigger(trigger).await
        }
        Source::Key => {
            let mut trigger = Trigger::from_command(&cli.action, target);
            trigger.data = data;
            coordinator.on_trigger(trigger).await
        }
    }
}

/// Folds `key=value` assignments into one saveSettings payload.
fn settings_data(assignments: &[String]) -> Result<Option<Value>> {
    if assignments.is_empty() {
        return Ok(None);
    }
    let mut fields = Map::new();
    for assignment in assignments {
        let patch = SettingsPatch::parse_assignment(assignment).map_err(|err| anyhow!(err))?;
        if let Value::Object(object) = serde_json::to_value(patch)? {
            fields.extend(object);
        }
    }
    Ok(Some(Value::Object(fields)))
}
