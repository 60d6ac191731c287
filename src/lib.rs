pub mod cli;
pub mod merger;
pub mod runner;
pub mod source;
pub mod state;
pub mod utils;

pub use merger::{
    DivisionCode, DivisionItem, DivisionLevel, DivisionStore, DivisionTranslationItem,
    MergeOptions, SeekerRegistry, StoredDivision,
};
pub use runner::{ImportRunner, Step};
pub use source::{Batcher, ParsedFile};
pub use state::{open_database, ImportState, ImportStateStore, SourceSpec, Stage, StageState};
pub use utils::{AppConfig, ImportError, Result};
