use crate::state::checkpoint::ImportStateStore;
use crate::state::metadata::MetadataStore;
use crate::state::stage::ImportState;
use crate::utils::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

/// Removes a run's temporary artifacts. The source file is only removed when
/// the run downloaded it. Returns the number of bytes freed.
pub fn remove_run_artifacts(state: &ImportState, remove_downloaded: bool) -> Result<u64> {
    let mut freed = remove_file_if_exists(&state.parsed_file)?;

    if remove_downloaded && state.source.is_remote() {
        freed += remove_file_if_exists(&state.source_file)?;
    }

    if let Some(run_dir) = state.run_dir() {
        let is_empty = std::fs::read_dir(run_dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            std::fs::remove_dir(run_dir)?;
        }
    }

    Ok(freed)
}

fn remove_file_if_exists(path: &Path) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            std::fs::remove_file(path)?;
            Ok(metadata.len())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

pub struct CleanupManager {
    states: ImportStateStore,
    metadata: MetadataStore,
    run_ttl_seconds: u64,
    work_dir: PathBuf,
}

impl CleanupManager {
    pub fn new(
        states: ImportStateStore,
        metadata: MetadataStore,
        run_ttl_days: u64,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            states,
            metadata,
            run_ttl_seconds: run_ttl_days * 24 * 60 * 60,
            work_dir: work_dir.into(),
        }
    }

    pub async fn run_cleanup(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        let live_runs = self.cleanup_expired_runs(&mut report)?;

        self.cleanup_orphan_dirs(&live_runs, &mut report)?;

        info!(
            runs_deleted = report.runs_deleted,
            dirs_deleted = report.dirs_deleted,
            bytes_freed = report.bytes_freed,
            "Cleanup completed"
        );

        Ok(report)
    }

    /// Deletes completed runs past their TTL. Returns the ids still kept.
    fn cleanup_expired_runs(&self, report: &mut CleanupReport) -> Result<HashSet<String>> {
        let now = crate::utils::unix_now();
        let mut kept = HashSet::new();

        for state in self.states.list_states()? {
            let age = now.saturating_sub(state.updated_at);
            let should_delete = state.is_complete() && age > self.run_ttl_seconds;

            if !should_delete {
                kept.insert(state.run_id);
                continue;
            }

            match remove_run_artifacts(&state, true) {
                Ok(freed) => report.bytes_freed += freed,
                Err(e) => warn!(run_id = %state.run_id, error = %e, "Failed to remove run artifacts"),
            }

            if let Err(e) = self.metadata.delete(&state.run_id) {
                warn!(run_id = %state.run_id, error = %e, "Failed to delete run metadata");
            }

            match self.states.delete_state(&state.run_id) {
                Ok(_) => {
                    report.runs_deleted += 1;
                    info!(run_id = %state.run_id, "Deleted expired import run");
                }
                Err(e) => {
                    warn!(run_id = %state.run_id, error = %e, "Failed to delete expired import run");
                }
            }
        }

        Ok(kept)
    }

    /// Removes run directories left behind by runs that no longer exist.
    fn cleanup_orphan_dirs(
        &self,
        live_runs: &HashSet<String>,
        report: &mut CleanupReport,
    ) -> Result<()> {
        if !self.work_dir.exists() {
            return Ok(());
        }

        for entry in std::fs::read_dir(&self.work_dir)?.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if live_runs.contains(name) {
                continue;
            }

            let size = dir_size(&path);
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(path = %path.display(), error = %e, "Failed to delete orphan run directory");
            } else {
                report.dirs_deleted += 1;
                report.bytes_freed += size;
            }
        }

        Ok(())
    }

    pub fn start_background_cleanup(self, cleanup_interval_hours: u64) {
        let interval_duration = Duration::from_secs(cleanup_interval_hours.max(1) * 60 * 60);

        tokio::spawn(async move {
            let mut timer = interval(interval_duration);

            loop {
                timer.tick().await;

                match self.run_cleanup().await {
                    Ok(report) => {
                        info!(?report, "Background cleanup completed");
                    }
                    Err(e) => {
                        warn!(error = %e, "Background cleanup failed");
                    }
                }
            }
        });
    }
}

fn dir_size(path: &Path) -> u64 {
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub runs_deleted: usize,
    pub dirs_deleted: usize,
    pub bytes_freed: u64,
}
