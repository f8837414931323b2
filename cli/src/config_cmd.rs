//! `quake-triage config`: print the effective configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use quake_triage::{ConfigLoader, TriageConfig};

use crate::exit_codes;

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Config file (default: ./quake-triage.toml, then the user config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

/// Resolve configuration the same way `run` does.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<TriageConfig> {
    let loaded = match path {
        Some(path) => ConfigLoader::new().with_file(path).load(),
        None => ConfigLoader::load_default(),
    };
    loaded.context("failed to load configuration")
}

pub fn run(args: ConfigArgs) -> i32 {
    match render(&args) {
        Ok(text) => {
            println!("{text}");
            exit_codes::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            crate::exit_code_for(&err)
        }
    }
}

fn render(args: &ConfigArgs) -> anyhow::Result<String> {
    let config = load_config(args.config.as_ref())?;
    if args.json {
        Ok(serde_json::to_string_pretty(&config)?)
    } else {
        toml::to_string_pretty(&config).context("failed to render configuration as TOML")
    }
}
