//! Strategy repository over the file store.
//!
//! One strategy id maps to four durable artifacts:
//!
//! ```text
//! <root>/strategies/<id>/strategy.json   policy document
//! <root>/state/<id>.json                 runtime state
//! <root>/state/<id>.lock                 advisory tick lock
//! <root>/runs/<id>.jsonl                 per-tick audit records
//! <root>/events/<id>.jsonl               notable action events
//! ```

use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::domain::RuntimeState;
use crate::error::{MintrunnerError, Result};
use crate::strategy::schema::StrategyConfig;

use super::store::{FileStore, LockGuard};

/// Repository of strategy configuration and runtime state.
#[derive(Debug, Clone)]
pub struct StrategyRepository {
    store: FileStore,
}

impl StrategyRepository {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(FileStore::new(root))
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Reject ids that would escape the layout or produce unreadable paths.
    /// Malformed ids abort before any side effect.
    pub fn validate_id(id: &str) -> Result<()> {
        if id.is_empty() || id.len() > 64 {
            return Err(MintrunnerError::Validation(format!(
                "strategy id must be 1-64 characters, got {}",
                id.len()
            )));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(MintrunnerError::Validation(format!(
                "strategy id may only contain [A-Za-z0-9_-]: {id:?}"
            )));
        }
        Ok(())
    }

    fn config_key(id: &str) -> String {
        format!("strategies/{id}/strategy.json")
    }

    fn state_key(id: &str) -> String {
        format!("state/{id}.json")
    }

    fn lock_key(id: &str) -> String {
        format!("state/{id}.lock")
    }

    pub fn state_path(&self, id: &str) -> PathBuf {
        self.store.path(&Self::state_key(id))
    }

    pub fn lock_path(&self, id: &str) -> PathBuf {
        self.store.path(&Self::lock_key(id))
    }

    /// All strategy ids present under the root, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = self.store.path("strategies");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn try_load(&self, id: &str) -> Result<Option<StrategyConfig>> {
        Self::validate_id(id)?;
        self.store.read_json(&Self::config_key(id))
    }

    pub fn load(&self, id: &str) -> Result<StrategyConfig> {
        self.try_load(id)?
            .ok_or_else(|| MintrunnerError::StrategyNotFound(id.to_string()))
    }

    pub fn save(&self, id: &str, config: &StrategyConfig) -> Result<()> {
        Self::validate_id(id)?;
        self.store.write_json_atomic(&Self::config_key(id), config)
    }

    pub fn load_state(&self, id: &str) -> Result<Option<RuntimeState>> {
        Self::validate_id(id)?;
        self.store.read_json(&Self::state_key(id))
    }

    pub fn save_state(&self, id: &str, state: &RuntimeState) -> Result<()> {
        Self::validate_id(id)?;
        self.store.write_json_atomic(&Self::state_key(id), state)
    }

    /// Append a tick summary to the per-strategy runs log.
    pub fn append_run<T: Serialize>(&self, id: &str, record: &T) -> Result<()> {
        Self::validate_id(id)?;
        self.store.append_jsonl(&format!("runs/{id}.jsonl"), record)
    }

    /// Append a notable action event (buys, sells, reconciliations).
    pub fn append_event<T: Serialize>(&self, id: &str, record: &T) -> Result<()> {
        Self::validate_id(id)?;
        self.store
            .append_jsonl(&format!("events/{id}.jsonl"), record)
    }

    /// Acquire the per-strategy tick lock.
    pub fn lock(&self, id: &str) -> Result<LockGuard> {
        Self::validate_id(id)?;
        self.store.acquire_lock(&Self::lock_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::schema::{Preset, StrategyConfig};
    use chrono::Utc;

    fn repo() -> (tempfile::TempDir, StrategyRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = StrategyRepository::open(dir.path());
        (dir, repo)
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(StrategyRepository::validate_id("ok-id_2").is_ok());
        assert!(StrategyRepository::validate_id("").is_err());
        assert!(StrategyRepository::validate_id("../escape").is_err());
        assert!(StrategyRepository::validate_id("a b").is_err());
    }

    #[test]
    fn load_missing_strategy_is_not_found() {
        let (_dir, repo) = repo();
        assert!(matches!(
            repo.load("ghost"),
            Err(MintrunnerError::StrategyNotFound(_))
        ));
    }

    #[test]
    fn save_list_load_round_trip() {
        let (_dir, repo) = repo();
        let cfg = StrategyConfig::with_preset("s1", Preset::Conservative);
        repo.save("s1", &cfg).unwrap();
        assert_eq!(repo.list().unwrap(), vec!["s1".to_string()]);
        let loaded = repo.load("s1").unwrap();
        assert_eq!(loaded.id, "s1");
        assert!(loaded.enabled);
    }

    #[test]
    fn state_round_trip_and_lock() {
        let (_dir, repo) = repo();
        let state = RuntimeState::new("s1", Utc::now());
        repo.save_state("s1", &state).unwrap();
        let loaded = repo.load_state("s1").unwrap().unwrap();
        assert_eq!(loaded.id, "s1");

        let guard = repo.lock("s1").unwrap();
        assert!(repo.lock_path("s1").exists());
        assert!(repo.lock("s1").is_err());
        drop(guard);
        assert!(!repo.lock_path("s1").exists());
    }
}
