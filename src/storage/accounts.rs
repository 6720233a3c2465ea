//! Operator-maintained account registry
//!
//! Accounts live in a flat JSON file edited by hand or by external tooling.
//! The store re-reads the file on every call instead of caching, so edits
//! are picked up on the very next scheduler firing without a restart.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::Account;

/// Read-through access to the accounts file
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every configured account in file order
    pub fn load(&self) -> Result<Vec<Account>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read accounts file: {}", self.path.display()))?;
        let accounts: Vec<Account> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse accounts file: {}", self.path.display()))?;

        let mut seen = HashSet::new();
        for account in &accounts {
            if account.id.trim().is_empty() {
                bail!(
                    "Account '{}' has an empty id in {}",
                    account.name,
                    self.path.display()
                );
            }
            if !seen.insert(account.id.as_str()) {
                bail!(
                    "Duplicate account id '{}' in {}",
                    account.id,
                    self.path.display()
                );
            }
        }
        Ok(accounts)
    }

    /// Active accounts in file order; the batch loop runs them in exactly
    /// this order
    pub fn active(&self) -> Result<Vec<Account>> {
        Ok(self.load()?.into_iter().filter(|a| a.active).collect())
    }

    /// Look up one account by id
    pub fn get(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.load()?.into_iter().find(|a| a.id == id))
    }
}
