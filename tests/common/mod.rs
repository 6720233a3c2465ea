//! Common test utilities
//!
//! Stub collaborators and a pre-wired engine harness shared by the
//! integration tests. The stubs count their calls so tests can assert how
//! far the pipeline got.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use herald::generator::{ContentGenerator, GeneratorError};
use herald::models::{Account, GeneratedPost, ResolvedOptions};
use herald::poster::{PostReceipt, Poster, PosterError};
use herald::resources::{DirImageStore, ResourceRotator};
use herald::runner::{AccountRunner, RunStateTable};
use herald::storage::{AccountStore, HistoryStore, RunFlagStore};

/// Test generator that fabricates a post, or fails for selected accounts
pub struct StubGenerator {
    pub calls: AtomicU32,
    fail_for: HashSet<String>,
    delay_ms: u64,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_for: HashSet::new(),
            delay_ms: 0,
        }
    }

    #[allow(dead_code)]
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            fail_for: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::new()
        }
    }

    /// Slow generator, used to hold the account lock across a race
    #[allow(dead_code)]
    pub fn with_delay_ms(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new()
        }
    }
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn generate(
        &self,
        account: &Account,
        resource_hint: Option<&str>,
    ) -> Result<GeneratedPost, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail_for.contains(&account.id) {
            return Err(GeneratorError::Upstream {
                status: Some(500),
                detail: format!("stub failure for {}", account.id),
            });
        }
        Ok(GeneratedPost::from_parts(
            format!("Post for {}", account.name),
            format!(
                "Body written by the stub generator about {}.",
                resource_hint.unwrap_or("nothing in particular")
            ),
        ))
    }
}

/// Test poster that acknowledges or rejects every submission
pub struct StubPoster {
    pub calls: AtomicU32,
    reject: bool,
}

impl StubPoster {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            reject: false,
        }
    }

    #[allow(dead_code)]
    pub fn rejecting() -> Self {
        Self {
            calls: AtomicU32::new(0),
            reject: true,
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
                status: 422,
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

/// Fully wired engine over temp storage with counting stubs
pub struct TestEngine {
    pub dir: TempDir,
    pub accounts: Arc<AccountStore>,
    pub history: Arc<HistoryStore>,
    pub run_flag: Arc<RunFlagStore>,
    pub state_table: Arc<RunStateTable>,
    pub runner: Arc<AccountRunner>,
    pub generator: Arc<StubGenerator>,
    pub poster: Arc<StubPoster>,
}

impl TestEngine {
    /// Image files visible to the engine for one account
    pub fn seed_images(&self, account_id: &str, names: &[&str]) {
        let dir = self.dir.path().join("images").join(account_id);
        std::fs::create_dir_all(&dir).unwrap();
        for name in names {
            std::fs::write(dir.join(name), b"img").unwrap();
        }
    }

    #[allow(dead_code)]
    pub fn poster_calls(&self) -> u32 {
        self.poster.calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn generator_calls(&self) -> u32 {
        self.generator.calls.load(Ordering::SeqCst)
    }
}

/// Build an engine from an accounts JSON body and explicit stubs
pub fn engine_with(
    accounts_json: &str,
    generator: StubGenerator,
    poster: StubPoster,
    posting_enabled: bool,
) -> TestEngine {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("accounts.json"), accounts_json).unwrap();

    let accounts = Arc::new(AccountStore::new(dir.path().join("accounts.json")));
    let history = Arc::new(HistoryStore::new(dir.path().join("history.jsonl")).unwrap());
    let run_flag = Arc::new(RunFlagStore::new(dir.path().join("run_flag.json")));
    let state_table = Arc::new(RunStateTable::new());

    let generator = Arc::new(generator);
    let poster = Arc::new(poster);
    let rotator = Arc::new(ResourceRotator::new(Arc::new(DirImageStore::new(
        dir.path().join("images"),
    ))));

    let runner = Arc::new(AccountRunner::new(
        generator.clone(),
        poster.clone(),
        rotator,
        Arc::clone(&history),
        Arc::clone(&state_table),
        posting_enabled,
    ));

    TestEngine {
        dir,
        accounts,
        history,
        run_flag,
        state_table,
        runner,
        generator,
        poster,
    }
}

/// Engine with well-behaved stubs and real posting enabled
#[allow(dead_code)]
pub fn engine(accounts_json: &str) -> TestEngine {
    engine_with(accounts_json, StubGenerator::new(), StubPoster::new(), true)
}

/// A single-account registry body
#[allow(dead_code)]
pub fn one_account_json(id: &str, posts_per_day: u32) -> String {
    format!(r#"[{{"id": "{id}", "name": "Account {id}", "posts_per_day": {posts_per_day}}}]"#)
}
