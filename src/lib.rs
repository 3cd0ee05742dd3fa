//! devtabs runs every long-lived development command of a project side by
//! side in one terminal, one tab per command.

pub mod config;
pub mod format;
pub mod process_manager;
pub mod session;
pub mod text;
pub mod theme;
pub mod tui;
pub mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::{AppContext, CommandTrust, ConfigError, DEFAULT_CONFIG_FILE};
use crate::process_manager::{ShellSpawner, Spawner};
use crate::theme::ThemeRegistry;
use crate::tui::{CrosstermTerminal, Dashboard, DashboardError};
use crate::ui::{KeyValue, OutputMode, PlainRenderer, Renderer, TableSpec, UiError};

pub const LOG_FILTER_ENV: &str = "DEVTABS_LOG";

#[derive(Debug, Clone, Parser)]
#[command(name = "devtabs", version, about)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Theme name, overriding the configuration file.
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Append diagnostics to this file. Nothing is logged otherwise.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Print the configured sessions and exit.
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] UiError),
}

impl AppError {
    pub fn title(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Configuration error",
            AppError::Dashboard(_) => "Dashboard failed",
            AppError::LogFile { .. } => "Logging unavailable",
            AppError::Output(_) => "Output failed",
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            AppError::Config(ConfigError::Read { .. }) => Some(format!(
                "Create `{DEFAULT_CONFIG_FILE}` or pass `--config <PATH>`"
            )),
            AppError::Config(ConfigError::NoCommands { .. }) => {
                Some("Add at least one `[commands.<name>]` entry".to_owned())
            }
            _ => None,
        }
    }
}

/// Installs a file-backed subscriber. The dashboard owns the terminal, so
/// logs never go to stdout or stderr. Keep the guard alive until exit.
pub fn init_logging(path: &Path) -> Result<WorkerGuard, AppError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AppError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| "devtabs=info".into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init();

    Ok(guard)
}

pub fn run(cli: &Cli) -> Result<(), AppError> {
    let _guard = cli
        .log_file
        .as_deref()
        .map(init_logging)
        .transpose()?;

    let registry = ThemeRegistry::default();
    let context = config::load(&cli.config, cli.theme.as_deref(), &registry)?;
    let mut renderer = PlainRenderer::stdout(OutputMode::from_env());

    if cli.list {
        renderer.section(&format!("Sessions ({})", context.config_path.display()))?;
        renderer.table(&session_table(&context))?;
        return Ok(());
    }

    let spawner: Rc<dyn Spawner> = Rc::new(ShellSpawner::new(context.root.clone()));
    let mut dashboard = Dashboard::new(&context, spawner);
    {
        let mut terminal = CrosstermTerminal::enter().map_err(DashboardError::from)?;
        dashboard.run(&mut terminal)?;
        terminal.restore().map_err(DashboardError::from)?;
    }

    renderer.section("Sessions")?;
    renderer.key_values(&summary_items(&dashboard.summary()))?;
    Ok(())
}

/// The `--list` table: one row per configured command.
pub fn session_table(context: &AppContext) -> TableSpec {
    let rows = context
        .commands
        .iter()
        .map(|command| {
            let trust = match &command.trust {
                CommandTrust::Trusted => "trusted".to_owned(),
                CommandTrust::Untrusted { source } => format!("disabled ({source} not allowed)"),
            };
            vec![
                command.name.clone(),
                command.run.clone(),
                command.format.as_str().to_owned(),
                if command.autostart { "yes" } else { "lazy" }.to_owned(),
                trust,
            ]
        })
        .collect();
    TableSpec::new(&["name", "command", "format", "autostart", "trust"], rows)
}

pub fn summary_items(summary: &[(String, String)]) -> Vec<KeyValue> {
    summary
        .iter()
        .map(|(name, state)| KeyValue::new(name, state))
        .collect()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
