//! CLI argument definitions for the Warden application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use warden_action::OperatorDecision;
use warden_core::config::WardenConfig;
use warden_core::types::{BatchId, ExecutionMode};

/// Warden - policy-gated execution of planned system administration actions.
#[derive(Parser, Debug)]
#[command(name = "warden", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the SQLite database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Policy rule set (TOML).
    #[arg(short = 'r', long = "rules", global = true)]
    pub rules: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Log actions instead of running them on this host.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate and run a planner batch (JSON from a file or stdin).
    Submit {
        /// Planner output file; `-` or omitted reads stdin.
        input: Option<PathBuf>,
        /// Execution mode when the payload does not name one.
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ExecutionMode>,
    },
    /// List batches with actions awaiting confirmation.
    Pending,
    /// Approve or reject pending actions of a batch.
    Confirm {
        #[arg(value_parser = parse_batch_id)]
        batch_id: BatchId,
        #[arg(value_parser = parse_decision)]
        decision: OperatorDecision,
        /// Only this action index; default is every awaiting action.
        #[arg(short = 'i', long = "index")]
        index: Option<usize>,
    },
    /// Print the audit history of a batch.
    History {
        #[arg(value_parser = parse_batch_id)]
        batch_id: BatchId,
    },
    /// Expire stale confirmations.
    Sweep {
        /// Override the configured time-to-live, in seconds.
        #[arg(long = "ttl-secs")]
        ttl_secs: Option<u64>,
        /// Keep sweeping on the configured interval until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Show the verdicts a batch would get, without running anything.
    Check {
        /// Planner output file; `-` or omitted reads stdin.
        input: Option<PathBuf>,
    },
    /// Re-evaluate a recorded batch against the current rule set.
    Replay {
        #[arg(value_parser = parse_batch_id)]
        batch_id: BatchId,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > WARDEN_CONFIG env var > ~/.warden/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("WARDEN_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut WardenConfig) {
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref rules) = self.rules {
            config.policy.rules_path = rules.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.dry_run {
            config.execution.dry_run = true;
        }
    }
}

fn parse_batch_id(s: &str) -> Result<BatchId, String> {
    s.parse()
}

fn parse_decision(s: &str) -> Result<OperatorDecision, String> {
    s.to_ascii_lowercase().parse()
}

fn parse_mode(s: &str) -> Result<ExecutionMode, String> {
    s.replace('-', "_").parse()
}

/// Default config file path.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".warden").join("config.toml");
    }
    PathBuf::from("config.toml")
}
