pub mod dtos;
pub mod seeker;
pub mod store;

pub use dtos::{DivisionCode, DivisionItem, DivisionLevel, DivisionTranslationItem};
pub use seeker::{Seeker, SeekerRegistry, ISO3166_SEEKER, KATOTTG_SEEKER, KOATUU_SEEKER};
pub use store::{DivisionStore, MergeOptions, MergeReport, StoredDivision};
