use crate::state::stage::ImportState;
use crate::utils::{ImportError, Result};
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::sync::Arc;

const IMPORT_STATES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("import_states");

/// Persists `ImportState` per run id. Writes can join a caller's transaction
/// so progress markers commit together with merged data.
pub struct ImportStateStore {
    db: Arc<Database>,
}

impl ImportStateStore {
    pub fn open(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(IMPORT_STATES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn save_state(&self, state: &ImportState) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        self.save_state_in(&write_txn, state)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn save_state_in(&self, txn: &WriteTransaction, state: &ImportState) -> Result<()> {
        let data = serde_json::to_vec(state)?;
        let mut table = txn.open_table(IMPORT_STATES_TABLE)?;
        table.insert(state.run_id.as_str(), data.as_slice())?;
        Ok(())
    }

    pub fn load_state(&self, run_id: &str) -> Result<Option<ImportState>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IMPORT_STATES_TABLE)?;

        let data = table.get(run_id)?;
        let state = data
            .map(|d| serde_json::from_slice(d.value()))
            .transpose()?;
        Ok(state)
    }

    pub fn require_state(&self, run_id: &str) -> Result<ImportState> {
        self.load_state(run_id)?
            .ok_or_else(|| ImportError::RunNotFound(run_id.to_string()))
    }

    pub fn delete_state(&self, run_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(IMPORT_STATES_TABLE)?;
            let removed = table.remove(run_id)?.is_some();
            removed
        };
        write_txn.commit()?;

        Ok(removed)
    }

    pub fn list_runs(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IMPORT_STATES_TABLE)?;

        let mut runs = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            runs.push(key.value().to_string());
        }

        Ok(runs)
    }

    pub fn list_states(&self) -> Result<Vec<ImportState>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IMPORT_STATES_TABLE)?;

        let mut states = Vec::new();
        for entry in table.iter()? {
            let (_, data) = entry?;
            states.push(serde_json::from_slice(data.value())?);
        }

        Ok(states)
    }
}
