use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where the register comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Remote { url: String },
    Local { path: PathBuf },
}

impl SourceSpec {
    /// Treats anything with an http(s) scheme as remote.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            SourceSpec::Remote {
                url: value.to_string(),
            }
        } else {
            SourceSpec::Local {
                path: PathBuf::from(value),
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceSpec::Remote { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initial,
    Download,
    Parsing,
    Merge,
    MergeTranslations,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Initial => write!(f, "initial"),
            Stage::Download => write!(f, "download"),
            Stage::Parsing => write!(f, "parsing"),
            Stage::Merge => write!(f, "merge"),
            Stage::MergeTranslations => write!(f, "merge_translations"),
            Stage::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Progress markers, only those the current stage needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageState {
    Initial,
    Download,
    Parsing,
    Merge {
        country: bool,
        merge_offset: usize,
    },
    MergeTranslations {
        merge_translations_offset: usize,
    },
    Cleanup {
        cleaned: bool,
    },
}

impl StageState {
    pub fn stage(&self) -> Stage {
        match self {
            StageState::Initial => Stage::Initial,
            StageState::Download => Stage::Download,
            StageState::Parsing => Stage::Parsing,
            StageState::Merge { .. } => Stage::Merge,
            StageState::MergeTranslations { .. } => Stage::MergeTranslations,
            StageState::Cleanup { .. } => Stage::Cleanup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportState {
    pub run_id: String,
    pub source: SourceSpec,
    /// Register file on disk: the download target or the local source.
    pub source_file: PathBuf,
    pub parsed_file: PathBuf,
    #[serde(flatten)]
    pub stage: StageState,
    pub created_at: u64,
    pub updated_at: u64,
}

impl ImportState {
    pub fn new(run_id: impl Into<String>, source: SourceSpec, work_dir: PathBuf) -> Self {
        let run_id = run_id.into();
        let run_dir = work_dir.join(&run_id);
        let source_file = match &source {
            SourceSpec::Remote { .. } => run_dir.join("source.csv"),
            SourceSpec::Local { path } => path.clone(),
        };
        let now = crate::utils::unix_now();

        Self {
            run_id,
            source,
            source_file,
            parsed_file: run_dir.join("parsed.json"),
            stage: StageState::Initial,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage.stage()
    }

    /// Directory holding the run's temporary artifacts.
    pub fn run_dir(&self) -> Option<&std::path::Path> {
        self.parsed_file.parent()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.stage, StageState::Cleanup { cleaned: true })
    }

    /// Moves to the next stage with fresh progress markers. Cleanup is
    /// terminal and advancing it marks the run cleaned.
    pub fn advance(mut self) -> Self {
        self.stage = match &self.stage {
            StageState::Initial if self.source.is_remote() => StageState::Download,
            StageState::Initial | StageState::Download => StageState::Parsing,
            StageState::Parsing => StageState::Merge {
                country: false,
                merge_offset: 0,
            },
            StageState::Merge { .. } => StageState::MergeTranslations {
                merge_translations_offset: 0,
            },
            StageState::MergeTranslations { .. } => StageState::Cleanup { cleaned: false },
            StageState::Cleanup { .. } => StageState::Cleanup { cleaned: true },
        };
        self.touch();
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = crate::utils::unix_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_state() -> ImportState {
        ImportState::new(
            "run-1",
            SourceSpec::parse("/data/katottg.csv"),
            PathBuf::from("/work"),
        )
    }

    #[test]
    fn local_source_skips_download() {
        let state = local_state();
        assert_eq!(state.source_file, PathBuf::from("/data/katottg.csv"));
        assert_eq!(state.parsed_file, PathBuf::from("/work/run-1/parsed.json"));

        let stages: Vec<Stage> = std::iter::successors(Some(state), |s| {
            (!s.is_complete()).then(|| s.clone().advance())
        })
        .map(|s| s.stage())
        .collect();

        assert_eq!(
            stages,
            vec![
                Stage::Initial,
                Stage::Parsing,
                Stage::Merge,
                Stage::MergeTranslations,
                Stage::Cleanup,
                Stage::Cleanup,
            ]
        );
    }

    #[test]
    fn remote_source_downloads_into_run_dir() {
        let state = ImportState::new(
            "run-2",
            SourceSpec::parse("https://example.org/katottg.csv"),
            PathBuf::from("/work"),
        );
        assert_eq!(state.source_file, PathBuf::from("/work/run-2/source.csv"));
        assert_eq!(state.advance().stage(), Stage::Download);
    }

    #[test]
    fn merge_translations_starts_from_zero() {
        let mut state = local_state();
        state.stage = StageState::Merge {
            country: true,
            merge_offset: 42,
        };
        assert_eq!(
            state.advance().stage,
            StageState::MergeTranslations {
                merge_translations_offset: 0
            }
        );
    }

    #[test]
    fn serialises_stage_tag_with_markers() {
        let mut state = local_state();
        state.stage = StageState::Merge {
            country: true,
            merge_offset: 500,
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["stage"], "merge");
        assert_eq!(json["country"], true);
        assert_eq!(json["merge_offset"], 500);

        let back: ImportState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
