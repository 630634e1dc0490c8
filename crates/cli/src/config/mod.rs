use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use importer::{CategoryRef, MAX_FILE_BYTES, RowId};
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/moneysmart.toml";
const DEFAULT_STATE_PATH: &str = "config/moneysmart_state.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Bearer token; read from the config file or `MONEYSMART_API_TOKEN` only.
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub state_path: String,
    pub level: String,
    pub max_file_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            api_token: None,
            timeout_secs: 15,
            state_path: DEFAULT_STATE_PATH.to_string(),
            level: "info".to_string(),
            max_file_bytes: MAX_FILE_BYTES,
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "moneysmart",
    about = "Import bank transactions into MoneySmart",
    disable_version_flag = true
)]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:5000/api).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override the staging file location.
    #[arg(long, global = true)]
    state_path: Option<String>,
    /// Override the per-request timeout, in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, clap::Args)]
pub struct TimeframeArgs {
    /// Month, 1-12.
    #[arg(long)]
    pub month: Option<u32>,
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub row: RowId,
    pub category: CategoryRef,
}

fn parse_assignment(raw: &str) -> std::result::Result<Assignment, String> {
    let (row, category) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ROW=CATEGORY, got \"{raw}\""))?;
    let row = row
        .trim()
        .parse::<usize>()
        .map_err(|err| format!("invalid row id \"{row}\": {err}"))?;
    let category = category.parse::<CategoryRef>().map_err(|err| err.to_string())?;
    Ok(Assignment {
        row: RowId(row),
        category,
    })
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the sample upload file.
    Template {
        /// Destination; `-` writes to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the categories available for a month.
    Categories {
        #[command(flatten)]
        timeframe: TimeframeArgs,
    },
    /// Decode a file and stage its rows for review.
    Stage {
        /// Files to import; only the first accepted one is read.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        timeframe: TimeframeArgs,
        /// Category for a row, as ROW=CATEGORY (e.g. 2="Saving Goal:g1").
        #[arg(long = "assign", value_parser = parse_assignment)]
        assignments: Vec<Assignment>,
        /// Do not fill categories from the notes.
        #[arg(long)]
        no_auto: bool,
    },
    /// Set the category of one staged row.
    Assign {
        row: usize,
        /// `Budget:<id>`, `Saving Goal:<id>` or an income label.
        category: String,
    },
    /// Reload budgets and saving goals for the staged import.
    Refresh,
    /// Show the staged rows.
    Preview,
    /// Save the staged rows as transactions.
    Commit,
    /// Drop the staged import.
    Discard,
}

pub fn load() -> Result<(AppConfig, Command)> {
    let cli = Cli::parse();
    let settings = resolve(&cli)?;
    Ok((settings, cli.command))
}

fn resolve(cli: &Cli) -> Result<AppConfig> {
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("MONEYSMART"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &cli.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(state_path) = &cli.state_path {
        settings.state_path = state_path.clone();
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        settings.timeout_secs = timeout_secs;
    }
    if let Some(level) = &cli.level {
        settings.level = level.clone();
    }

    // Zero would make every backend call time out at once.
    if settings.timeout_secs == 0 {
        return Err(AppError::InvalidSetting {
            key: "timeout_secs",
            message: "must be at least 1 second".to_string(),
        });
    }

    Ok(settings)
}
