mod app;
mod attrs;
mod coordinator;
mod error;
mod logging;
mod model;
mod nav;
mod panels;
mod services;
mod theme;
mod ui;
mod validate;
mod widgets;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Terminal console for a local 389 Directory Server instance.
#[derive(Parser)]
#[command(name = "ds-console")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Instance name, the part after `slapd-`.
    #[arg(long, env = "DS_CONSOLE_SERVER_ID")]
    server_id: Option<String>,

    /// YAML settings; defaults to ./ds-console.yaml when present.
    #[arg(long, env = "DS_CONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Write tracing output here; filter with DS_CONSOLE_LOG.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Render to an off-screen buffer and print a JSON summary.
    #[arg(long, env = "DS_CONSOLE_HEADLESS")]
    headless: bool,

    #[arg(long, env = "DS_CONSOLE_TICKS", default_value = "10")]
    ticks: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = model::load_console_config(cli.config.as_deref())
        .context("loading console configuration")?;
    if let Some(id) = cli.server_id {
        cfg.server_id = id;
    }
    if cli.log_file.is_some() {
        cfg.log_file = cli.log_file;
    }
    model::validate_console_config(&cfg).context("invalid console configuration")?;
    logging::initialize_logging(cfg.log_file.as_deref())?;
    ui::run(cfg, cli.headless, cli.ticks)
}
