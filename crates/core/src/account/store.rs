//! Credential persistence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::types::Account;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode accounts: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Load/save boundary for account credentials.
pub trait AccountStore: Send + Sync {
    /// Load all stored accounts, in stored order.
    fn load(&self) -> Result<Vec<Account>, StoreError>;

    /// Persist the full account list, replacing what was stored.
    fn save(&self, accounts: &[Account]) -> Result<(), StoreError>;
}

/// On-disk document layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountsDocument {
    #[serde(default)]
    accounts: Vec<Account>,
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonAccountStore {
    path: PathBuf,
}

impl JsonAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl AccountStore for JsonAccountStore {
    fn load(&self) -> Result<Vec<Account>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_slice::<AccountsDocument>(&raw) {
            Ok(doc) => Ok(doc.accounts),
            Err(e) => {
                warn!(
                    "Ignoring unreadable account store {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, accounts: &[Account]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let doc = AccountsDocument {
            accounts: accounts.to_vec(),
        };
        let encoded = serde_json::to_vec_pretty(&doc)?;

        // Write to a sibling and rename so readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonAccountStore::new(dir.path().join("accounts.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonAccountStore::new(dir.path().join("nested/dir/accounts.json"));
        let accounts = vec![
            Account::new("a@example.com", "pw-a"),
            Account::new("b@example.com", "pw-b"),
        ];

        store.save(&accounts).unwrap();
        assert_eq!(store.load().unwrap(), accounts);
        assert!(!dir.path().join("nested/dir/accounts.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = JsonAccountStore::new(&path);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_document_without_accounts_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.json");
        fs::write(&path, b"{}").unwrap();

        let store = JsonAccountStore::new(&path);
        assert!(store.load().unwrap().is_empty());
    }
}
