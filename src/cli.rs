use crate::runner::{default_source, ImportRunner, Step};
use crate::state::{open_database, CleanupManager, ImportStateStore, MetadataStore, SourceSpec};
use crate::utils::AppConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Import the KATOTTG register into the division store.
#[derive(Debug, Parser)]
#[clap(
    name = "katottg-import",
    version,
    about = "Resumable staged import of the KATOTTG administrative division register"
)]
pub struct Cli {
    /// Path to the TOML config file. Defaults apply when it is missing.
    #[clap(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run an import to completion, resuming it if the run id already exists
    Run {
        #[clap(long)]
        run_id: Option<String>,
        /// Register location: a local path or an http(s) URL
        #[clap(long)]
        source: Option<String>,
    },
    /// Execute one step of an existing run
    Step {
        #[clap(long)]
        run_id: String,
    },
    /// Show the persisted state of a run
    Status {
        #[clap(long)]
        run_id: String,
    },
    /// List known runs and their stages
    List,
    /// Delete expired completed runs and orphaned work directories
    Cleanup {
        /// Keep running, repeating the sweep every `cleanup_interval_hours`
        #[clap(long)]
        watch: bool,
    },
}

pub fn load_config(path: &std::path::Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let path = path.to_str().context("config path is not valid UTF-8")?;
    Ok(AppConfig::load_from_file(path)?)
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let db = open_database(&config.store.db_path)
        .with_context(|| format!("opening {}", config.store.db_path.display()))?;

    match cli.command {
        Commands::Run { run_id, source } => {
            let states = ImportStateStore::open(db.clone())?;
            let existing = match &run_id {
                Some(id) => states.load_state(id)?,
                None => None,
            };

            let mut runner = match existing {
                Some(state) => ImportRunner::resume(db, &config, &state.run_id)?,
                None => {
                    let source = source
                        .as_deref()
                        .map(SourceSpec::parse)
                        .unwrap_or_else(|| default_source(&config));
                    ImportRunner::start(db, &config, source, run_id)?
                }
            };

            println!("Import run {} starting at stage {}", runner.state().run_id, runner.state().stage());
            let steps = runner.run().await?;
            println!(
                "Import run {} complete after {} steps: {} divisions in store",
                runner.state().run_id,
                steps,
                runner.store().count()?
            );
        }
        Commands::Step { run_id } => {
            let mut runner = ImportRunner::resume(db, &config, &run_id)?;
            match runner.step().await? {
                Step::Continue => println!("{}: {} (continuing)", run_id, runner.state().stage()),
                Step::Done(stage) => println!("{}: advanced to {}", run_id, stage),
            }
        }
        Commands::Status { run_id } => {
            let state = ImportStateStore::open(db.clone())?.require_state(&run_id)?;
            let metadata = MetadataStore::open(db)?.get(&run_id)?;
            let status = serde_json::json!({
                "state": state,
                "source_metadata": metadata,
                "complete": state.is_complete(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::List => {
            for state in ImportStateStore::open(db)?.list_states()? {
                println!("{}\t{}\t{}", state.run_id, state.stage(), state.updated_at);
            }
        }
        Commands::Cleanup { watch } => {
            let manager = CleanupManager::new(
                ImportStateStore::open(db.clone())?,
                MetadataStore::open(db)?,
                config.cleanup.run_ttl_days,
                config.import.work_dir.clone(),
            );
            if watch {
                manager.start_background_cleanup(config.cleanup.cleanup_interval_hours);
                tokio::signal::ctrl_c().await?;
            } else {
                let report = manager.run_cleanup().await?;
                println!("{:#?}", report);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_source() {
        let cli = Cli::try_parse_from([
            "katottg-import",
            "--config",
            "/etc/katottg.toml",
            "run",
            "--source",
            "/data/katottg.csv",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/katottg.toml"));
        match cli.command {
            Commands::Run { run_id, source } => {
                assert_eq!(run_id, None);
                assert_eq!(source.as_deref(), Some("/data/katottg.csv"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cleanup_watch_flag() {
        let cli = Cli::try_parse_from(["katottg-import", "cleanup", "--watch"]).unwrap();
        assert!(matches!(cli.command, Commands::Cleanup { watch: true }));
    }

    #[test]
    fn step_requires_run_id() {
        assert!(Cli::try_parse_from(["katottg-import", "step"]).is_err());
    }
}
