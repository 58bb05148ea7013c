//! The request facade: the only way the rest of the crate talks to the catalog API.
//!
//! Every public operation is total. Transport failures become a notification plus a mock
//! answer, so callers always get a canonical value back.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode, NON_ALPHANUMERIC};
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::FetchError;
use crate::mock::MockProvider;
use crate::normalize::normalize;
use crate::notify::Notifier;
use crate::transport::{HttpTransport, Transport};
use crate::types::{Canonical, DetailResult, OperationKind, SearchResult, SourceList};

/// Per-call cache behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Read from and write to the cache. When false the cache is not touched at all.
    pub use_cache: bool,
    /// Skip the cache read but still store the fresh answer.
    pub force_refresh: bool,
}

impl Default for RequestOptions {
    fn default() -> Self { Self { use_cache: true, force_refresh: false } }
}

impl RequestOptions {
    pub fn refresh() -> Self { Self { use_cache: true, force_refresh: true } }
    pub fn uncached() -> Self { Self { use_cache: false, force_refresh: false } }
}

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped, matching what browsers
/// send for a URI component. Cache keys depend on the exact spelling.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode(component: &str) -> PercentEncode<'_> {
    utf8_percent_encode(component, COMPONENT)
}

pub fn search_endpoint(query: &str, page: u32, media_type: &str) -> String {
    format!("/search/{}?page={}&type={}", encode(query), page, encode(media_type))
}

pub fn detail_endpoint(id: &str) -> String {
    format!("/info/{}", encode(id))
}

/// Season and episode are only sent as a pair.
pub fn sources_endpoint(id: &str, season: Option<&str>, episode: Option<&str>) -> String {
    let mut endpoint = format!("/sources/{}", encode(id));
    if let (Some(s), Some(e)) = (non_empty(season), non_empty(episode)) {
        endpoint.push_str(&format!("?season={}&episode={}", encode(s), encode(e)));
    }
    endpoint
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

pub struct MovieApi {
    transport: Arc<dyn Transport>,
    mock: MockProvider,
    cache: ResponseCache,
    notifier: Arc<dyn Notifier>,
    offline: AtomicBool,
}

impl MovieApi {
    pub fn new(transport: Arc<dyn Transport>, mock: MockProvider, notifier: Arc<dyn Notifier>) -> Self {
        Self { transport, mock, cache: ResponseCache::new(), notifier, offline: AtomicBool::new(false) }
    }

    /// Build the live HTTP stack described by `config`.
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let transport = HttpTransport::new(&config.base_url, config.timeout())?;
        let mock = MockProvider::new(config.fixtures_dir.clone()).with_latency(config.mock_latency());
        let api = Self::new(Arc::new(transport), mock, notifier);
        api.set_offline(config.mock_mode);
        Ok(api)
    }

    /// Swap in a caller-owned cache (a fresh one per test, or one shared between facades).
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ResponseCache { &self.cache }

    pub fn notifier(&self) -> &Arc<dyn Notifier> { &self.notifier }

    /// Offline mode answers everything from the mock provider without touching the network.
    pub fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::Relaxed) }

    pub fn is_offline(&self) -> bool { self.offline.load(Ordering::Relaxed) }

    pub async fn search(&self, query: &str, page: u32, media_type: &str, opts: RequestOptions) -> SearchResult {
        let endpoint = search_endpoint(query, page, media_type);
        self.fetch(&endpoint, OperationKind::Search, opts).await.into_search().unwrap_or_default()
    }

    /// An empty id answers `{results: {subject: null}}` without any network activity.
    pub async fn get_detail(&self, id: Option<&str>, opts: RequestOptions) -> DetailResult {
        let Some(id) = non_empty(id) else { return DetailResult::default() };
        self.fetch(&detail_endpoint(id), OperationKind::Detail, opts).await.into_detail().unwrap_or_default()
    }

    pub async fn get_sources(
        &self,
        id: Option<&str>,
        season: Option<&str>,
        episode: Option<&str>,
        opts: RequestOptions,
    ) -> SourceList {
        let Some(id) = non_empty(id) else { return SourceList::default() };
        let endpoint = sources_endpoint(id, season, episode);
        self.fetch(&endpoint, OperationKind::Sources, opts).await.into_sources().unwrap_or_default()
    }

    async fn fetch(&self, endpoint: &str, kind: OperationKind, opts: RequestOptions) -> Canonical {
        if self.is_offline() {
            debug!(endpoint, "offline mode, answering from mock");
            return self.mock.provide(kind).await;
        }

        if opts.use_cache && !opts.force_refresh {
            if let Some(hit) = self.cache.get(endpoint) {
                debug!(endpoint, "cache hit");
                return hit;
            }
        }

        let outcome = AssertUnwindSafe(self.transport.perform(endpoint))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(FetchError::Network("transport panicked".into())));

        match outcome {
            Ok(raw) => {
                let canonical = normalize(kind, &raw);
                if opts.use_cache {
                    self.cache.put(endpoint, canonical.clone());
                }
                canonical
            }
            Err(e) => {
                warn!(endpoint, error = %e, "falling back to mock data");
                self.notifier.error(e.user_message());
                self.mock.provide(kind).await
            }
        }
    }
}
