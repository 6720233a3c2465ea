//! Single-account publish execution
//!
//! `AccountRunner` drives one account through a full publish attempt:
//! claim the account, pick an image, generate content, resolve the per-run
//! channel and visibility, deliver (or skip in test mode), and append the
//! history record. Every terminal path writes history and releases the claim.

pub mod locks;

// Re-export main types
pub use locks::{AccountRunState, RunStateTable};

use rand::thread_rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::generator::{ContentGenerator, GeneratorError};
use crate::models::{
    Account, ContentMeta, HistoryRecord, RecordStatus, ResolvedOptions, RunKind, RunSummary,
};
use crate::poster::Poster;
use crate::resources::ResourceRotator;
use crate::storage::HistoryStore;

/// Errors from a single account run, one per hard-stop step
#[derive(Debug, Error)]
pub enum RunError {
    /// Another run currently holds this account
    #[error("account {account_id} already has a run in progress")]
    AlreadyRunning { account_id: String },

    /// The account's image pool is empty
    #[error("account {account_id} has no resources")]
    NoResource { account_id: String },

    #[error("content generation failed for {account_id}: {source}")]
    GenerationFailed {
        account_id: String,
        #[source]
        source: GeneratorError,
    },

    #[error("publish failed for {account_id}: {detail}")]
    PublishFailed { account_id: String, detail: String },

    /// Storage-layer failure (history append, resource listing)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Successful result of one account run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub account_id: String,
    /// `Success` for delivered posts, `TestSkipped` when posting is disabled
    pub status: RecordStatus,
    pub title: String,
    pub resource: String,
}

/// Executes one publish attempt for one account
pub struct AccountRunner {
    generator: Arc<dyn ContentGenerator>,
    poster: Arc<dyn Poster>,
    rotator: Arc<ResourceRotator>,
    history: Arc<HistoryStore>,
    state_table: Arc<RunStateTable>,
    posting_enabled: bool,
}

impl AccountRunner {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        poster: Arc<dyn Poster>,
        rotator: Arc<ResourceRotator>,
        history: Arc<HistoryStore>,
        state_table: Arc<RunStateTable>,
        posting_enabled: bool,
    ) -> Self {
        Self {
            generator,
            poster,
            rotator,
            history,
            state_table,
            posting_enabled,
        }
    }

    /// Shared run-state table, used by the facade for status snapshots
    pub fn state_table(&self) -> Arc<RunStateTable> {
        Arc::clone(&self.state_table)
    }

    /// Execute one full publish attempt for the account.
    ///
    /// Not queued: if the account is already mid-run the attempt fails fast
    /// with a failure record, and the caller may retry later.
    pub async fn run(&self, account: &Account, kind: RunKind) -> Result<RunOutcome, RunError> {
        info!(account_id = %account.id, kind = %kind, "Starting account run");

        let Some(guard) = self.state_table.try_begin(&account.id) else {
            warn!(account_id = %account.id, "Run refused, account already in progress");
            self.record_failure(account, kind, "run already in progress")?;
            return Err(RunError::AlreadyRunning {
                account_id: account.id.clone(),
            });
        };

        let result = self.run_claimed(account, kind).await;

        let summary = match &result {
            Ok(outcome) => RunSummary::ok(outcome.status),
            Err(e) => RunSummary::failed(e.to_string()),
        };
        guard.complete(summary);

        result
    }

    /// Steps after the claim; the caller holds the guard for every path here
    async fn run_claimed(&self, account: &Account, kind: RunKind) -> Result<RunOutcome, RunError> {
        let resource = match self.rotator.select(&account.id) {
            Ok(Some(resource)) => resource,
            Ok(None) => {
                self.record_failure(account, kind, "no resources available")?;
                return Err(RunError::NoResource {
                    account_id: account.id.clone(),
                });
            }
            Err(e) => {
                self.record_failure(account, kind, format!("resource listing failed: {e:#}"))?;
                return Err(RunError::Internal(e));
            }
        };

        let post = match self.generator.generate(account, Some(&resource)).await {
            Ok(post) => post,
            Err(e) => {
                self.record_failure(account, kind, format!("generation failed: {e}"))?;
                return Err(RunError::GenerationFailed {
                    account_id: account.id.clone(),
                    source: e,
                });
            }
        };

        // Random channel/visibility resolve once per run, before any record
        // is written, so even test-skip records carry the audited choice.
        let options = {
            let mut rng = thread_rng();
            ResolvedOptions {
                channel: account.channel.resolve(&mut rng),
                visibility: account.visibility.resolve(&mut rng),
            }
        };
        let meta = ContentMeta::new(&post, &resource, options);

        if !self.posting_enabled {
            info!(
                account_id = %account.id,
                title = %post.title,
                "Posting disabled, recording test skip"
            );
            self.history
                .append(&HistoryRecord::test_skipped(account, kind, meta))?;
            return Ok(RunOutcome {
                account_id: account.id.clone(),
                status: RecordStatus::TestSkipped,
                title: post.title,
                resource,
            });
        }

        match self.poster.publish(account, &post, &resource, options).await {
            Ok(receipt) if receipt.success => {
                self.history
                    .append(&HistoryRecord::success(account, kind, meta))?;
                info!(
                    account_id = %account.id,
                    title = %post.title,
                    channel = %options.channel,
                    visibility = %options.visibility,
                    "Publish succeeded"
                );
                Ok(RunOutcome {
                    account_id: account.id.clone(),
                    status: RecordStatus::Success,
                    title: post.title,
                    resource,
                })
            }
            Ok(receipt) => {
                let detail = receipt
                    .message
                    .unwrap_or_else(|| "service reported failure".to_string());
                self.record_failure(account, kind, format!("publish failed: {detail}"))?;
                Err(RunError::PublishFailed {
                    account_id: account.id.clone(),
                    detail,
                })
            }
            Err(e) => {
                let detail = e.to_string();
                self.record_failure(account, kind, format!("publish failed: {detail}"))?;
                Err(RunError::PublishFailed {
                    account_id: account.id.clone(),
                    detail,
                })
            }
        }
    }

    fn record_failure(
        &self,
        account: &Account,
        kind: RunKind,
        message: impl Into<String>,
    ) -> Result<(), RunError> {
        self.history
            .append(&HistoryRecord::failure(account, kind, message))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorError;
    use crate::models::GeneratedPost;
    use crate::poster::{PostReceipt, PosterError};
    use crate::resources::ImageStore;
    use crate::storage::HistoryFilter;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    struct StubGenerator {
        fail: bool,
    }

    #[async_trait]
    impl ContentGenerator for StubGenerator {
        async fn generate(
            &self,
            _account: &Account,
            resource_hint: Option<&str>,
        ) -> Result<GeneratedPost, GeneratorError> {
            if self.fail {
                return Err(GeneratorError::Upstream {
                    status: Some(500),
                    detail: "stub failure".to_string(),
                });
            }
            Ok(GeneratedPost::from_parts(
                "Stub title".to_string(),
                format!("Body about {}", resource_hint.unwrap_or("nothing")),
            ))
        }
    }

    struct StubPoster {
        reject: bool,
        calls: AtomicU32,
    }

    impl StubPoster {
        fn new(reject: bool) -> Self {
            Self {
                reject,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Poster for StubPoster {
        async fn publish(
            &self,
            _account: &Account,
            _post: &GeneratedPost,
            _resource: &str,
            _options: ResolvedOptions,
        ) -> Result<PostReceipt, PosterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(PosterError::Rejected {
                    status: 400,
                    detail: "stub rejection".to_string(),
                });
            }
            Ok(PostReceipt {
                success: true,
                message: None,
                posted_at: Utc::now(),
            })
        }
    }

    struct StubStore {
        names: Vec<String>,
    }

    impl ImageStore for StubStore {
        fn list(&self, _account_id: &str) -> anyhow::Result<HashSet<String>> {
            Ok(self.names.iter().cloned().collect())
        }
    }

    struct Harness {
        _dir: TempDir,
        runner: AccountRunner,
        history: Arc<HistoryStore>,
        poster: Arc<StubPoster>,
    }

    fn harness(
        resources: &[&str],
        generator_fails: bool,
        poster_rejects: bool,
        posting_enabled: bool,
    ) -> Harness {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(HistoryStore::new(dir.path().join("history.jsonl")).unwrap());
        let poster = Arc::new(StubPoster::new(poster_rejects));
        let rotator = Arc::new(ResourceRotator::new(Arc::new(StubStore {
            names: resources.iter().map(|s| s.to_string()).collect(),
        })));

        let runner = AccountRunner::new(
            Arc::new(StubGenerator {
                fail: generator_fails,
            }),
            Arc::clone(&poster) as Arc<dyn Poster>,
            rotator,
            Arc::clone(&history),
            Arc::new(RunStateTable::new()),
            posting_enabled,
        );

        Harness {
            _dir: dir,
            runner,
            history,
            poster,
        }
    }

    fn records_for(history: &HistoryStore, account_id: &str) -> Vec<HistoryRecord> {
        history
            .query(&HistoryFilter::new().for_account(account_id))
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_records_success() {
        let h = harness(&["a.jpg"], false, false, true);
        let account = Account::new("a1", "Alpha");

        let outcome = h.runner.run(&account, RunKind::Publish).await.unwrap();
        assert_eq!(outcome.status, RecordStatus::Success);
        assert_eq!(outcome.resource, "a.jpg");

        let records = records_for(&h.history, "a1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RecordStatus::Success);
        assert_eq!(records[0].kind, RunKind::Publish);
        let content = records[0].content.as_ref().unwrap();
        assert_eq!(content.resource, "a.jpg");

        assert!(!h.runner.state_table.is_running("a1"));
    }

    #[tokio::test]
    async fn test_test_mode_skips_poster() {
        let h = harness(&["a.jpg"], false, false, false);
        let account = Account::new("a1", "Alpha");

        let outcome = h.runner.run(&account, RunKind::Publish).await.unwrap();
        assert_eq!(outcome.status, RecordStatus::TestSkipped);
        assert_eq!(h.poster.calls.load(Ordering::SeqCst), 0);

        let records = records_for(&h.history, "a1");
        assert_eq!(records[0].status, RecordStatus::TestSkipped);
        assert!(records[0].content.is_some(), "skip keeps content metadata");
    }

    #[tokio::test]
    async fn test_no_resources_aborts_before_generation() {
        let h = harness(&[], false, false, true);
        let account = Account::new("a1", "Alpha");

        let err = h.runner.run(&account, RunKind::Publish).await.unwrap_err();
        assert!(matches!(err, RunError::NoResource { .. }));
        assert_eq!(h.poster.calls.load(Ordering::SeqCst), 0);

        let records = records_for(&h.history, "a1");
        assert_eq!(records[0].status, RecordStatus::Failed);
    }

    #[tokio::test]
    async fn test_generation_failure_recorded() {
        let h = harness(&["a.jpg"], true, false, true);
        let account = Account::new("a1", "Alpha");

        let err = h.runner.run(&account, RunKind::Publish).await.unwrap_err();
        assert!(matches!(err, RunError::GenerationFailed { .. }));

        let records = records_for(&h.history, "a1");
        assert_eq!(records[0].status, RecordStatus::Failed);
        assert!(records[0]
            .message
            .as_deref()
            .unwrap()
            .contains("generation failed"));
    }

    #[tokio::test]
    async fn test_rejected_publish_recorded() {
        let h = harness(&["a.jpg"], false, true, true);
        let account = Account::new("a1", "Alpha");

        let err = h.runner.run(&account, RunKind::Publish).await.unwrap_err();
        assert!(matches!(err, RunError::PublishFailed { .. }));

        let records = records_for(&h.history, "a1");
        assert_eq!(records[0].status, RecordStatus::Failed);
    }

    #[tokio::test]
    async fn test_claimed_account_fails_fast() {
        let h = harness(&["a.jpg"], false, false, true);
        let account = Account::new("a1", "Alpha");

        let _held = h.runner.state_table.try_begin("a1").unwrap();
        let err = h.runner.run(&account, RunKind::Publish).await.unwrap_err();
        assert!(matches!(err, RunError::AlreadyRunning { .. }));

        let records = records_for(&h.history, "a1");
        assert_eq!(records[0].status, RecordStatus::Failed);
        assert_eq!(h.poster.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_notification_kind_flows_to_record() {
        let h = harness(&["a.jpg"], false, false, true);
        let account = Account::new("a1", "Alpha");

        h.runner.run(&account, RunKind::Notification).await.unwrap();
        let records = records_for(&h.history, "a1");
        assert_eq!(records[0].kind, RunKind::Notification);
    }
}
