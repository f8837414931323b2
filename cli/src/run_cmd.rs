//! `quake-triage run`: triage an account file against one earthquake.
//!
//! Writes the assessments (or the full report with `--report`) as JSON to
//! stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use quake_triage::input::{self, merge_safety_log};
use quake_triage::{TriageEngine, TriageError};
use tokio_util::sync::CancellationToken;

use crate::config_cmd::load_config;
use crate::exit_codes;

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Event catalogue: one event object or an array
    #[arg(long, value_name = "PATH")]
    pub event: PathBuf,

    /// Accounts file (JSON array)
    #[arg(long, value_name = "PATH")]
    pub accounts: PathBuf,

    /// Separate safety-response log merged into account histories
    #[arg(long, value_name = "PATH")]
    pub safety_log: Option<PathBuf>,

    /// Event to triage (default: the latest in the catalogue)
    #[arg(long, value_name = "ID")]
    pub event_id: Option<String>,

    /// Config file (default: ./quake-triage.toml, then the user config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Extra gazetteer entries, overriding `gazetteer.path`
    #[arg(long, value_name = "PATH")]
    pub gazetteer: Option<PathBuf>,

    /// Emit warnings and counts alongside the assessments
    #[arg(long)]
    pub report: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: RunArgs) -> i32 {
    match execute(&args).await {
        Ok(output) => {
            println!("{output}");
            exit_codes::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            crate::exit_code_for(&err)
        }
    }
}

async fn execute(args: &RunArgs) -> anyhow::Result<String> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(path) = &args.gazetteer {
        config.gazetteer.path = Some(path.clone());
    }
    let engine = TriageEngine::new(&config).context("failed to initialise triage engine")?;

    let events = input::load_events(&args.event)?;
    let event = input::select_event(&events, args.event_id.as_deref(), engine.utc_offset())
        .with_context(|| format!("unusable event in {}", args.event.display()))?;

    let mut accounts = input::load_accounts(&args.accounts)?;
    if let Some(path) = &args.safety_log {
        let summary = merge_safety_log(&mut accounts, input::load_safety_log(path)?);
        tracing::info!(
            merged = summary.merged,
            unmatched = summary.unmatched.len(),
            "Merged safety log"
        );
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    let report = engine.run_with_cancel(&event, &accounts, &cancel).await;
    interrupt.abort();
    let report = report.map_err(|err| match err {
        TriageError::Cancelled => anyhow::Error::new(err).context("interrupted"),
        other => anyhow::Error::new(other),
    })?;

    let rendered = match (args.report, args.pretty) {
        (true, true) => serde_json::to_string_pretty(&report)?,
        (true, false) => serde_json::to_string(&report)?,
        (false, true) => serde_json::to_string_pretty(&report.assessments)?,
        (false, false) => serde_json::to_string(&report.assessments)?,
    };
    Ok(rendered)
}
