#![allow(dead_code)]

use katottg_import::{open_database, AppConfig, DivisionCode, DivisionStore, SeekerRegistry};
use redb::Database;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Three regions followed by two districts, in register (depth-first) order.
pub const REGISTER: &str = "\
Перший рівень;Другий рівень;Третій рівень;Четвертий рівень;Додатковий рівень;Категорія об'єкта;Назва об'єкта
UA01000000000013043;;;;;O;Автономна Республіка Крим
UA05000000000010236;;;;;O;Вінницька
UA05000000000010236;UA05020000000026686;;;;P;Вінницький
UA07000000000024379;;;;;O;Волинська
UA07000000000024379;UA07020000000045460;;;;P;Володимирський
";

pub const CODES: [&str; 5] = [
    "UA01000000000013043",
    "UA05000000000010236",
    "UA07000000000024379",
    "UA05020000000026686",
    "UA07020000000045460",
];

pub struct Workspace {
    pub dir: TempDir,
    pub config: AppConfig,
    pub db: Arc<Database>,
    pub source: PathBuf,
}

impl Workspace {
    pub fn new(register: &str, chunk_size: usize) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let source = dir.path().join("katottg.csv");
        std::fs::write(&source, register).expect("write register");

        let mut config = AppConfig::default();
        config.import.chunk_size = chunk_size;
        config.import.work_dir = dir.path().join("work");
        config.store.db_path = dir.path().join("geo.redb");
        config.source.path = Some(source.clone());

        let db = open_database(&config.store.db_path).expect("open database");

        Self {
            dir,
            config,
            db,
            source,
        }
    }

    pub fn store(&self) -> DivisionStore {
        DivisionStore::open(self.db.clone(), SeekerRegistry::with_builtins()).expect("store")
    }
}

pub fn katottg(code: &str) -> DivisionCode {
    DivisionCode::new("KATOTTG", code)
}

pub fn country() -> DivisionCode {
    DivisionCode::new("ISO3166", "UA")
}
