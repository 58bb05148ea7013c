use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::normalize::normalize;
use crate::types::{Canonical, OperationKind};

/// Delay before a mock answer resolves, so loaders behave the same as on the live path.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(220);

/// Offline answers built from static fixtures, one per operation kind.
///
/// Fixtures come from `fixtures_dir` when set, otherwise from the copies compiled into
/// the binary. They go through the same normalizer as live bodies.
#[derive(Debug, Clone)]
pub struct MockProvider {
    fixtures_dir: Option<PathBuf>,
    latency: Duration,
}

impl Default for MockProvider {
    fn default() -> Self { Self::new(None) }
}

impl MockProvider {
    pub fn new(fixtures_dir: Option<PathBuf>) -> Self {
        Self { fixtures_dir, latency: DEFAULT_LATENCY }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Never fails: an unreadable or malformed fixture yields the empty shape.
    pub async fn provide(&self, kind: OperationKind) -> Canonical {
        tokio::time::sleep(self.latency).await;
        match self.load(kind).await {
            Ok(raw) => normalize(kind, &raw),
            Err(e) => {
                warn!(?kind, error = %format!("{e:#}"), "mock fixture unavailable");
                Canonical::empty(kind)
            }
        }
    }

    async fn load(&self, kind: OperationKind) -> Result<Value> {
        let text = match &self.fixtures_dir {
            Some(dir) => {
                let path = dir.join(kind.fixture_name());
                debug!(path = %path.display(), "loading mock fixture");
                tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading fixture {}", path.display()))?
            }
            None => embedded(kind).to_string(),
        };
        serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", kind.fixture_name()))
    }
}

fn embedded(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Search => include_str!("../fixtures/search.json"),
        OperationKind::Detail => include_str!("../fixtures/info.json"),
        OperationKind::Sources => include_str!("../fixtures/sources.json"),
    }
}
