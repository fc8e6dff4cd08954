//! Warden application binary - composition root.
//!
//! Ties together all Warden crates into a single executable:
//! 1. Load configuration from TOML and apply CLI overrides
//! 2. Open the SQLite database behind the pending store and audit log
//! 3. Load the policy rule set
//! 4. Build the orchestrator around the host executor
//! 5. Run the requested subcommand and print its report as JSON

mod cli;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use warden_action::{ExpirySweeper, HostExecutor, Orchestrator, OrchestratorError, RuleSet};
use warden_core::config::WardenConfig;
use warden_core::types::ActionBatch;
use warden_storage::{Database, SqliteAuditLog, SqlitePendingStore};

use cli::{CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Read planner output from a file, or stdin for `-` or no path.
fn read_input(input: Option<&Path>) -> AppResult<String> {
    match input {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

/// Load the rule set. A missing file yields an empty set, which sends every
/// action to confirmation.
fn load_rules(path: &Path) -> AppResult<RuleSet> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "Policy file not found; every action will require confirmation"
        );
        return Ok(RuleSet::default());
    }
    let rules = RuleSet::load(path)?;
    for fault in rules.lint() {
        tracing::warn!(%fault, "Policy rule references an unknown parameter");
    }
    Ok(rules)
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    let config_file: PathBuf = args.resolve_config_path();
    let loaded = if config_file.exists() {
        Some(WardenConfig::load(&config_file))
    } else {
        None
    };
    let mut config = match loaded {
        Some(Ok(ref config)) => config.clone(),
        _ => WardenConfig::default(),
    };
    args.apply_overrides(&mut config);

    // Reports go to stdout; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match loaded {
        Some(Ok(_)) => tracing::debug!(path = %config_file.display(), "Configuration loaded"),
        Some(Err(e)) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
        None => tracing::debug!(
            path = %config_file.display(),
            "No config file. Using defaults."
        ),
    }

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let db = Arc::new(Database::new(&config.database_path())?);
    let pending = Arc::new(SqlitePendingStore::new(Arc::clone(&db)));
    let audit = Arc::new(SqliteAuditLog::new(db));
    let executor = Arc::new(HostExecutor::new(config.execution.dry_run));
    if executor.is_dry_run() {
        tracing::info!("Dry-run mode: actions will be logged, not run");
    }
    let orchestrator = Arc::new(
        Orchestrator::new(pending, audit, executor).with_timeout(config.execution.timeout()),
    );

    match args.command {
        Command::Submit { input, mode } => {
            let rules = load_rules(&config.rules_path())?;
            let raw = read_input(input.as_deref())?;
            let batch = ActionBatch::from_planner_json(
                &raw,
                mode.unwrap_or(config.execution.default_mode),
            )?;
            let report = orchestrator.process(&batch, &rules).await?;
            print_json(&report)?;
        }
        Command::Pending => {
            print_json(&orchestrator.pending()?)?;
        }
        Command::Confirm {
            batch_id,
            decision,
            index,
        } => {
            match orchestrator.resolve(batch_id, decision, index).await {
                Ok(results) => print_json(&results)?,
                Err(OrchestratorError::PartialResolution { completed, source }) => {
                    print_json(&completed)?;
                    let source: Box<dyn std::error::Error> = source;
                    return Err(source);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::History { batch_id } => {
            print_json(&orchestrator.history(batch_id)?)?;
        }
        Command::Sweep { ttl_secs, watch } => {
            let ttl = match ttl_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => config.pending.ttl(),
            };
            let Some(ttl) = ttl else {
                tracing::warn!("Confirmation expiry is disabled (ttl_secs = 0)");
                return Ok(());
            };

            if watch {
                let sweeper = Arc::new(ExpirySweeper::new(
                    Arc::clone(&orchestrator),
                    ttl,
                    Duration::from_secs(config.pending.sweep_interval_secs),
                ));
                let handle = tokio::spawn({
                    let sweeper = Arc::clone(&sweeper);
                    async move { sweeper.run().await }
                });
                tokio::signal::ctrl_c().await?;
                tracing::info!("Shutdown signal received");
                sweeper.shutdown();
                handle.await?;
            } else {
                print_json(&orchestrator.expire_stale(ttl).await?)?;
            }
        }
        Command::Check { input } => {
            let rules = load_rules(&config.rules_path())?;
            let raw = read_input(input.as_deref())?;
            let batch = ActionBatch::from_planner_json(&raw, config.execution.default_mode)?;
            let verdicts: Vec<_> = batch
                .actions
                .iter()
                .enumerate()
                .map(|(index, action)| {
                    serde_json::json!({
                        "index": index,
                        "kind": action.kind,
                        "verdict": warden_action::evaluate(action, &rules),
                    })
                })
                .collect();
            print_json(&verdicts)?;
        }
        Command::Replay { batch_id } => {
            let rules = load_rules(&config.rules_path())?;
            print_json(&orchestrator.replay(batch_id, &rules)?)?;
        }
    }

    Ok(())
}
