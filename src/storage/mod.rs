//! Flat-file persistence for accounts, run history, and scheduler state
//!
//! The engine deliberately stays on plain files: an operator-edited JSON
//! account registry, an append-only JSONL run history, and a tiny atomic
//! run-flag record. The quota ledger is a derived view over the history
//! rather than stored state, so nothing here can fall out of sync with
//! what actually happened.

pub mod accounts;
pub mod history;
pub mod ledger;
pub mod runflag;

// Re-export main types
pub use accounts::AccountStore;
pub use history::{HistoryFilter, HistoryStore};
pub use ledger::QuotaLedger;
pub use runflag::RunFlagStore;
