use crate::utils::Result;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const SOURCE_METADATA_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("source_metadata");

/// Summary of a parsed register, recorded once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source_file: String,
    pub file_size_bytes: u64,
    pub total_records: usize,
    /// Record count keyed by path depth.
    pub records_per_depth: BTreeMap<usize, usize>,
    pub parsed_at: u64,
}

pub struct MetadataStore {
    db: Arc<Database>,
}

impl MetadataStore {
    pub fn open(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(SOURCE_METADATA_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn save_in(
        &self,
        txn: &WriteTransaction,
        run_id: &str,
        metadata: &SourceMetadata,
    ) -> Result<()> {
        let data = serde_json::to_vec(metadata)?;
        let mut table = txn.open_table(SOURCE_METADATA_TABLE)?;
        table.insert(run_id, data.as_slice())?;
        Ok(())
    }

    pub fn get(&self, run_id: &str) -> Result<Option<SourceMetadata>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SOURCE_METADATA_TABLE)?;

        let data = table.get(run_id)?;
        let metadata = data
            .map(|d| serde_json::from_slice(d.value()))
            .transpose()?;
        Ok(metadata)
    }

    pub fn delete(&self, run_id: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SOURCE_METADATA_TABLE)?;
            table.remove(run_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
