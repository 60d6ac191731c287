pub mod checkpoint;
pub mod cleanup;
pub mod metadata;
pub mod stage;

pub use checkpoint::ImportStateStore;
pub use cleanup::{remove_run_artifacts, CleanupManager, CleanupReport};
pub use metadata::{MetadataStore, SourceMetadata};
pub use stage::{ImportState, SourceSpec, Stage, StageState};

use crate::utils::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

/// Opens (or creates) the database shared by the division store and the
/// import state tables.
pub fn open_database(db_path: &Path) -> Result<Arc<Database>> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::create(db_path)?;
    Ok(Arc::new(db))
}
