//! Random-without-replacement resource selection
//!
//! Tracks which images an account has already used and draws uniformly from
//! the remainder. Once every image has been used the pool recycles, so long
//! running accounts never starve but repeats only start after full coverage.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::ImageStore;
use anyhow::Result;

/// Per-account rotating selector over an image pool
pub struct ResourceRotator {
    store: Arc<dyn ImageStore>,
    used: Mutex<HashMap<String, HashSet<String>>>,
}

impl ResourceRotator {
    pub fn new(store: Arc<dyn ImageStore>) -> Self {
        Self {
            store,
            used: Mutex::new(HashMap::new()),
        }
    }

    /// Select the next resource for the account.
    ///
    /// Returns `Ok(None)` only when the account has no resources at all.
    /// An exhausted pool resets and keeps serving.
    pub fn select(&self, account_id: &str) -> Result<Option<String>> {
        let all = self.store.list(account_id)?;
        if all.is_empty() {
            return Ok(None);
        }

        let mut table = self.used.lock();
        let used = table.entry(account_id.to_string()).or_default();

        let mut available: Vec<String> = all.difference(used).cloned().collect();
        if available.is_empty() {
            debug!(
                account_id = %account_id,
                pool_size = all.len(),
                "Resource pool exhausted, recycling"
            );
            used.clear();
            available = all.iter().cloned().collect();
        }

        // `available` is non-empty here, so `choose` cannot fail
        let Some(choice) = available.choose(&mut rand::thread_rng()).cloned() else {
            return Ok(None);
        };
        used.insert(choice.clone());

        Ok(Some(choice))
    }

    /// Drop usage state for an account, treating its pool as fresh
    pub fn reset(&self, account_id: &str) {
        self.used.lock().remove(account_id);
    }
}
