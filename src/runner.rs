use crate::merger::{
    DivisionCode, DivisionItem, DivisionLevel, DivisionStore, DivisionTranslationItem,
    MergeOptions, Seeker, SeekerRegistry, ISO3166_SEEKER, KATOTTG_SEEKER,
};
use crate::source::{parse_source, Batcher, ParseOptions, ParsedFile, SourceDownloader};
use crate::state::{
    remove_run_artifacts, ImportState, ImportStateStore, MetadataStore, SourceSpec, Stage,
    StageState,
};
use crate::utils::{AppConfig, ImportError, Result};
use redb::Database;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of one tick of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One unit of work was committed; the stage has more to do.
    Continue,
    /// The stage finished and the run now sits in the given stage.
    Done(Stage),
}

/// Drives one import run through its stages. Every call to [`step`] commits
/// at most one batch together with the progress markers, so a run can be
/// stopped between any two calls and resumed from the persisted state.
///
/// [`step`]: ImportRunner::step
pub struct ImportRunner {
    config: AppConfig,
    store: DivisionStore,
    states: ImportStateStore,
    metadata: MetadataStore,
    batcher: Batcher,
    state: ImportState,
}

impl ImportRunner {
    /// Starts a new run. Fails if `run_id` is already taken.
    pub fn start(
        db: Arc<Database>,
        config: &AppConfig,
        source: SourceSpec,
        run_id: Option<String>,
    ) -> Result<Self> {
        let states = ImportStateStore::open(db.clone())?;
        let run_id = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        if states.load_state(&run_id)?.is_some() {
            return Err(ImportError::ConfigError(format!(
                "import run {} already exists",
                run_id
            )));
        }

        let state = ImportState::new(run_id, source, config.import.work_dir.clone());
        states.save_state(&state)?;
        info!(run_id = %state.run_id, source = ?state.source, "Import run created");

        Self::open(db, config, state)
    }

    /// Loads a persisted run.
    pub fn resume(db: Arc<Database>, config: &AppConfig, run_id: &str) -> Result<Self> {
        let state = ImportStateStore::open(db.clone())?.require_state(run_id)?;
        info!(run_id = %run_id, stage = %state.stage(), "Import run resumed");
        Self::open(db, config, state)
    }

    fn open(db: Arc<Database>, config: &AppConfig, state: ImportState) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            store: DivisionStore::open(db.clone(), SeekerRegistry::new())?,
            states: ImportStateStore::open(db.clone())?,
            metadata: MetadataStore::open(db)?,
            batcher: Batcher::new(config.import.chunk_size),
            state,
        })
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    pub fn store(&self) -> &DivisionStore {
        &self.store
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Runs the handler of the current stage once.
    pub async fn step(&mut self) -> Result<Step> {
        match self.state.stage.clone() {
            StageState::Initial => self.run_initial(),
            StageState::Download => self.run_download().await,
            StageState::Parsing => self.run_parsing(),
            StageState::Merge {
                country,
                merge_offset,
            } => self.run_merge(country, merge_offset),
            StageState::MergeTranslations {
                merge_translations_offset,
            } => self.run_merge_translations(merge_translations_offset),
            StageState::Cleanup { cleaned } => self.run_cleanup(cleaned),
        }
    }

    /// Steps until the run is complete. Returns the number of steps taken.
    pub async fn run(&mut self) -> Result<usize> {
        let mut steps = 0;
        while !self.is_complete() {
            self.step().await?;
            steps += 1;
        }

        info!(run_id = %self.state.run_id, steps, "Import run completed");
        Ok(steps)
    }

    fn run_initial(&mut self) -> Result<Step> {
        if let Some(run_dir) = self.state.run_dir() {
            std::fs::create_dir_all(run_dir)?;
        }
        self.advance()
    }

    async fn run_download(&mut self) -> Result<Step> {
        let SourceSpec::Remote { url } = &self.state.source else {
            return self.advance();
        };

        let downloader =
            SourceDownloader::new(Duration::from_secs(self.config.source.timeout_seconds))?;
        downloader.download(url, &self.state.source_file).await?;

        self.advance()
    }

    fn run_parsing(&mut self) -> Result<Step> {
        let metadata = parse_source(
            &self.state.source_file,
            &self.state.parsed_file,
            ParseOptions::from(&self.config.source),
        )?;

        let next = self.state.clone().advance();
        let txn = self.store.database().begin_write()?;
        self.metadata.save_in(&txn, &next.run_id, &metadata)?;
        self.states.save_state_in(&txn, &next)?;
        txn.commit()?;

        Ok(self.transition(next))
    }

    fn run_merge(&mut self, country: bool, merge_offset: usize) -> Result<Step> {
        self.ensure_seekers(&[KATOTTG_SEEKER, ISO3166_SEEKER]);
        let root = self.country_item();
        let options = MergeOptions::default();

        if !country {
            let mut next = self.state.clone();
            next.stage = StageState::Merge {
                country: true,
                merge_offset,
            };
            next.touch();

            let txn = self.store.database().begin_write()?;
            self.store
                .merge_divisions(&txn, std::slice::from_ref(&root), &options)?;
            self.states.save_state_in(&txn, &next)?;
            txn.commit()?;

            info!(run_id = %next.run_id, code = %root.code, "Country division merged");
            self.state = next;
            return Ok(Step::Continue);
        }

        let parsed = ParsedFile::load(&self.state.parsed_file)?;
        let range = self.batcher.division_batch(parsed.items(), merge_offset);
        let batch: Vec<DivisionItem> = parsed.items()[range.clone()]
            .iter()
            .cloned()
            .map(|item| item.with_root(&root.code))
            .collect();

        let mut next = self.state.clone();
        next.stage = StageState::Merge {
            country: true,
            merge_offset: range.end,
        };
        next.touch();
        if range.end >= parsed.len() {
            next = next.advance();
        }

        let txn = self.store.database().begin_write()?;
        let report = self.store.merge_divisions(&txn, &batch, &options)?;
        self.states.save_state_in(&txn, &next)?;
        txn.commit()?;

        info!(
            run_id = %next.run_id,
            offset = range.end,
            total = parsed.len(),
            batch = batch.len(),
            depth = batch.first().map(DivisionItem::depth).unwrap_or_default(),
            created = report.created,
            updated = report.updated,
            "Division batch merged"
        );

        Ok(self.transition(next))
    }

    fn run_merge_translations(&mut self, offset: usize) -> Result<Step> {
        self.ensure_seekers(&[KATOTTG_SEEKER]);

        let parsed = ParsedFile::load(&self.state.parsed_file)?;
        let range = self.batcher.translation_batch(parsed.len(), offset);
        let batch: Vec<DivisionTranslationItem> = parsed.items()[range.clone()]
            .iter()
            .map(DivisionTranslationItem::from)
            .collect();

        let mut next = self.state.clone();
        next.stage = StageState::MergeTranslations {
            merge_translations_offset: range.end,
        };
        next.touch();
        if range.end >= parsed.len() {
            next = next.advance();
        }

        let language = self.config.import.language.as_str();
        let txn = self.store.database().begin_write()?;
        let written = self
            .store
            .merge_division_translations(&txn, language, &batch, true)?;
        self.states.save_state_in(&txn, &next)?;
        txn.commit()?;

        info!(
            run_id = %next.run_id,
            language,
            offset = range.end,
            total = parsed.len(),
            written,
            "Translation batch merged"
        );

        Ok(self.transition(next))
    }

    fn run_cleanup(&mut self, cleaned: bool) -> Result<Step> {
        if cleaned {
            return Ok(Step::Done(Stage::Cleanup));
        }

        let freed = remove_run_artifacts(&self.state, self.config.cleanup.remove_downloaded)?;
        info!(run_id = %self.state.run_id, bytes_freed = freed, "Run artifacts removed");

        self.advance()
    }

    /// Persists the next stage on its own.
    fn advance(&mut self) -> Result<Step> {
        let next = self.state.clone().advance();
        self.states.save_state(&next)?;
        Ok(self.transition(next))
    }

    fn transition(&mut self, next: ImportState) -> Step {
        let previous = self.state.stage();
        let stage = next.stage();
        self.state = next;

        if previous == stage && !self.state.is_complete() {
            return Step::Continue;
        }

        info!(run_id = %self.state.run_id, from = %previous, to = %stage, "Stage finished");
        Step::Done(stage)
    }

    fn ensure_seekers(&mut self, seekers: &[Seeker]) {
        for seeker in seekers {
            if self.store.registry_mut().register(*seeker) {
                debug!(seeker = seeker.name, "Code seeker registered");
            }
        }
    }

    fn country_item(&self) -> DivisionItem {
        DivisionItem {
            name: self.config.import.country_name.clone(),
            code: DivisionCode::new(ISO3166_SEEKER.name, self.config.import.country_code.clone()),
            path: Vec::new(),
            level: DivisionLevel::Country,
            types: BTreeSet::from(["country".to_string()]),
        }
    }
}

/// Source named by the configuration: the local path when set, else the URL.
pub fn default_source(config: &AppConfig) -> SourceSpec {
    match &config.source.path {
        Some(path) => SourceSpec::Local { path: path.clone() },
        None => SourceSpec::Remote {
            url: config.source.url.clone(),
        },
    }
}
