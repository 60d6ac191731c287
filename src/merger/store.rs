use crate::merger::dtos::{DivisionCode, DivisionItem, DivisionLevel, DivisionTranslationItem};
use crate::merger::seeker::SeekerRegistry;
use crate::utils::{ImportError, Result};
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

const DIVISIONS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("divisions");
const CODES_TABLE: TableDefinition<&str, u64> = TableDefinition::new("division_codes");
const TRANSLATIONS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("division_translations");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("division_meta");

const NEXT_ID_KEY: &str = "next_division_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDivision {
    pub id: u64,
    pub name: String,
    pub level: DivisionLevel,
    pub types: BTreeSet<String>,
    pub parent_id: Option<u64>,
    /// Ancestor ids from the root down to the parent.
    pub path: Vec<u64>,
    pub codes: Vec<DivisionCode>,
}

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub should_create: bool,
    pub override_name: bool,
    pub change_path: bool,
    pub change_level: bool,
    pub change_types: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            should_create: true,
            override_name: true,
            change_path: true,
            change_level: true,
            change_types: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Division records indexed by code, upserted inside caller-owned write
/// transactions.
pub struct DivisionStore {
    db: Arc<Database>,
    registry: SeekerRegistry,
}

impl DivisionStore {
    pub fn open(db: Arc<Database>, registry: SeekerRegistry) -> Result<Self> {
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(DIVISIONS_TABLE)?;
            write_txn.open_table(CODES_TABLE)?;
            write_txn.open_table(TRANSLATIONS_TABLE)?;
            write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db, registry })
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn registry_mut(&mut self) -> &mut SeekerRegistry {
        &mut self.registry
    }

    pub fn merge_divisions(
        &self,
        txn: &WriteTransaction,
        items: &[DivisionItem],
        options: &MergeOptions,
    ) -> Result<MergeReport> {
        let mut divisions = txn.open_table(DIVISIONS_TABLE)?;
        let mut codes = txn.open_table(CODES_TABLE)?;
        let mut meta = txn.open_table(META_TABLE)?;

        let mut next_id = meta.get(NEXT_ID_KEY)?.map(|g| g.value()).unwrap_or(1);
        let mut report = MergeReport::default();

        for item in items {
            self.registry.validate(&item.code)?;

            let parent = match item.parent() {
                Some(parent_code) => {
                    self.registry.validate(parent_code)?;
                    let parent = codes
                        .get(parent_code.key().as_str())?
                        .map(|g| g.value())
                        .map(|id| load_division(&divisions, id))
                        .transpose()?
                        .flatten()
                        .ok_or_else(|| ImportError::MissingParent {
                            code: item.code.to_string(),
                            parent: parent_code.to_string(),
                        })?;
                    Some(parent)
                }
                None => None,
            };
            let (parent_id, path) = match &parent {
                Some(p) => {
                    let mut path = p.path.clone();
                    path.push(p.id);
                    (Some(p.id), path)
                }
                None => (None, Vec::new()),
            };

            let existing_id = codes.get(item.code.key().as_str())?.map(|g| g.value());
            let existing = match existing_id {
                Some(id) => load_division(&divisions, id)?,
                None => None,
            };

            let division = match existing {
                Some(mut division) => {
                    if options.override_name {
                        division.name = item.name.clone();
                    }
                    if options.change_path {
                        division.parent_id = parent_id;
                        division.path = path;
                    }
                    if options.change_level {
                        division.level = item.level;
                    }
                    if options.change_types {
                        division.types = item.types.clone();
                    }
                    report.updated += 1;
                    division
                }
                None if !options.should_create => {
                    report.skipped += 1;
                    continue;
                }
                None => {
                    let division = StoredDivision {
                        id: next_id,
                        name: item.name.clone(),
                        level: item.level,
                        types: item.types.clone(),
                        parent_id,
                        path,
                        codes: vec![item.code.clone()],
                    };
                    next_id += 1;
                    codes.insert(item.code.key().as_str(), division.id)?;
                    report.created += 1;
                    division
                }
            };

            let data = serde_json::to_vec(&division)?;
            divisions.insert(division.id, data.as_slice())?;
        }

        meta.insert(NEXT_ID_KEY, next_id)?;

        Ok(report)
    }

    /// Writes translations for divisions that must already exist. Returns the
    /// number of translations written.
    pub fn merge_division_translations(
        &self,
        txn: &WriteTransaction,
        language: &str,
        items: &[DivisionTranslationItem],
        override_name: bool,
    ) -> Result<usize> {
        let codes = txn.open_table(CODES_TABLE)?;
        let mut translations = txn.open_table(TRANSLATIONS_TABLE)?;
        let mut written = 0;

        for item in items {
            let id = codes
                .get(item.code.key().as_str())?
                .map(|g| g.value())
                .ok_or_else(|| ImportError::DivisionNotFound(item.code.to_string()))?;

            let key = translation_key(language, id);
            let exists = translations.get(key.as_str())?.is_some();
            if exists && !override_name {
                continue;
            }

            translations.insert(key.as_str(), item.name.as_str())?;
            written += 1;
        }

        Ok(written)
    }

    pub fn get(&self, id: u64) -> Result<Option<StoredDivision>> {
        let read_txn = self.db.begin_read()?;
        let divisions = read_txn.open_table(DIVISIONS_TABLE)?;
        load_division(&divisions, id)
    }

    pub fn get_by_code(&self, code: &DivisionCode) -> Result<Option<StoredDivision>> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(CODES_TABLE)?;
        let divisions = read_txn.open_table(DIVISIONS_TABLE)?;

        let id = codes.get(code.key().as_str())?.map(|g| g.value());
        match id {
            Some(id) => load_division(&divisions, id),
            None => Ok(None),
        }
    }

    pub fn children(&self, parent_id: u64) -> Result<Vec<StoredDivision>> {
        let read_txn = self.db.begin_read()?;
        let divisions = read_txn.open_table(DIVISIONS_TABLE)?;

        let mut children = Vec::new();
        for entry in divisions.iter()? {
            let (_, data) = entry?;
            let division: StoredDivision = serde_json::from_slice(data.value())?;
            if division.parent_id == Some(parent_id) {
                children.push(division);
            }
        }
        Ok(children)
    }

    pub fn translation(&self, code: &DivisionCode, language: &str) -> Result<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(CODES_TABLE)?;
        let translations = read_txn.open_table(TRANSLATIONS_TABLE)?;

        let Some(id) = codes.get(code.key().as_str())?.map(|g| g.value()) else {
            return Ok(None);
        };
        let key = translation_key(language, id);
        let name = translations.get(key.as_str())?.map(|g| g.value().to_string());
        Ok(name)
    }

    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let divisions = read_txn.open_table(DIVISIONS_TABLE)?;
        let mut count = 0;
        for entry in divisions.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    pub fn translation_count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let translations = read_txn.open_table(TRANSLATIONS_TABLE)?;
        let mut count = 0;
        for entry in translations.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

fn translation_key(language: &str, id: u64) -> String {
    format!("{}:{}", language, id)
}

fn load_division<T>(table: &T, id: u64) -> Result<Option<StoredDivision>>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    let data = table.get(id)?;
    let division = data
        .map(|d| serde_json::from_slice(d.value()))
        .transpose()?;
    Ok(division)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::open_database;
    use tempfile::TempDir;

    fn item(name: &str, code: &str, path: &[&str], level: DivisionLevel) -> DivisionItem {
        DivisionItem {
            name: name.to_string(),
            code: DivisionCode::new("KATOTTG", code),
            path: path
                .iter()
                .map(|c| DivisionCode::new("KATOTTG", *c))
                .collect(),
            level,
            types: BTreeSet::new(),
        }
    }

    fn open_store(dir: &TempDir) -> DivisionStore {
        let db = open_database(&dir.path().join("geo.redb")).unwrap();
        DivisionStore::open(db, SeekerRegistry::with_builtins()).unwrap()
    }

    const REGION: &str = "UA01000000000013043";
    const DISTRICT: &str = "UA01020000000022387";

    #[test]
    fn merge_creates_then_updates_by_code() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let items = vec![item("Крим", REGION, &[], DivisionLevel::Region)];

        let txn = store.database().begin_write().unwrap();
        let report = store
            .merge_divisions(&txn, &items, &MergeOptions::default())
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(report.created, 1);

        let renamed = vec![item("АР Крим", REGION, &[], DivisionLevel::Region)];
        let txn = store.database().begin_write().unwrap();
        let report = store
            .merge_divisions(&txn, &renamed, &MergeOptions::default())
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(store.count().unwrap(), 1);
        let stored = store
            .get_by_code(&DivisionCode::new("KATOTTG", REGION))
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "АР Крим");
    }

    #[test]
    fn child_records_parent_path() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let txn = store.database().begin_write().unwrap();
        store
            .merge_divisions(
                &txn,
                &[item("Крим", REGION, &[], DivisionLevel::Region)],
                &MergeOptions::default(),
            )
            .unwrap();
        store
            .merge_divisions(
                &txn,
                &[item("Бахчисарайський", DISTRICT, &[REGION], DivisionLevel::Subregion)],
                &MergeOptions::default(),
            )
            .unwrap();
        txn.commit().unwrap();

        let region = store
            .get_by_code(&DivisionCode::new("KATOTTG", REGION))
            .unwrap()
            .unwrap();
        let district = store
            .get_by_code(&DivisionCode::new("KATOTTG", DISTRICT))
            .unwrap()
            .unwrap();
        assert_eq!(district.parent_id, Some(region.id));
        assert_eq!(district.path, vec![region.id]);
        assert_eq!(store.children(region.id).unwrap(), vec![district]);
    }

    #[test]
    fn missing_parent_fails_the_batch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let txn = store.database().begin_write().unwrap();
        let err = store
            .merge_divisions(
                &txn,
                &[item("Бахчисарайський", DISTRICT, &[REGION], DivisionLevel::Subregion)],
                &MergeOptions::default(),
            )
            .unwrap_err();
        txn.abort().unwrap();

        assert!(matches!(err, ImportError::MissingParent { .. }));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn should_create_false_skips_unknown_codes() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let options = MergeOptions {
            should_create: false,
            ..MergeOptions::default()
        };

        let txn = store.database().begin_write().unwrap();
        let report = store
            .merge_divisions(&txn, &[item("Крим", REGION, &[], DivisionLevel::Region)], &options)
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn translations_require_existing_division() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let translation = DivisionTranslationItem {
            name: "Crimea".to_string(),
            code: DivisionCode::new("KATOTTG", REGION),
        };

        let txn = store.database().begin_write().unwrap();
        let err = store
            .merge_division_translations(&txn, "en", std::slice::from_ref(&translation), true)
            .unwrap_err();
        txn.abort().unwrap();
        assert!(matches!(err, ImportError::DivisionNotFound(_)));

        let txn = store.database().begin_write().unwrap();
        store
            .merge_divisions(
                &txn,
                &[item("Крим", REGION, &[], DivisionLevel::Region)],
                &MergeOptions::default(),
            )
            .unwrap();
        let written = store
            .merge_division_translations(&txn, "en", &[translation], true)
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            store
                .translation(&DivisionCode::new("KATOTTG", REGION), "en")
                .unwrap()
                .as_deref(),
            Some("Crimea")
        );
        assert_eq!(store.translation_count().unwrap(), 1);
    }

    #[test]
    fn unknown_seeker_is_rejected() {
        let dir = TempDir::new().unwrap();
        let db = open_database(&dir.path().join("geo.redb")).unwrap();
        let store = DivisionStore::open(db, SeekerRegistry::new()).unwrap();

        let txn = store.database().begin_write().unwrap();
        let err = store
            .merge_divisions(
                &txn,
                &[item("Крим", REGION, &[], DivisionLevel::Region)],
                &MergeOptions::default(),
            )
            .unwrap_err();
        txn.abort().unwrap();

        assert!(matches!(err, ImportError::UnknownSeeker(name) if name == "KATOTTG"));
    }
}
