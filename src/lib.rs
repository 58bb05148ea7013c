pub mod api;
pub mod cache;
pub mod config;
pub mod dao;
pub mod db;
pub mod downloads;
pub mod error;
pub mod mapping;
pub mod mock;
pub mod normalize;
pub mod notify;
pub mod storage;
pub mod transport;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::{MovieApi, RequestOptions};
    pub use crate::config::Config;
    pub use crate::dao::{DownloadRecord, DownloadStatus, HistoryEntry};
    pub use crate::downloads::{DownloadHandle, DownloadMeta};
    pub use crate::error::FetchError;
    pub use crate::notify::{Notification, Notifier, Severity};
    pub use crate::types::{DetailResult, MediaDetail, MediaKind, MediaSummary, SearchResult, Source, SourceList};
    pub use crate::MaxMovies;
}

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::api::{MovieApi, RequestOptions};
use crate::config::Config;
use crate::dao::HistoryEntry;
use crate::db::Database;
use crate::downloads::{DownloadHandle, DownloadManager, DownloadMeta};
use crate::mapping::{history_entry_from_detail, pick_stream, playback_url};
use crate::notify::Notifier;
use crate::storage::HistoryStore;
use crate::types::{DetailResult, SearchResult};

/// The query behind the home view.
pub const TRENDING_QUERY: &str = "action";

/// Async library entry point. Owns the database, the request facade and the download manager.
pub struct MaxMovies {
    config: Config,
    db: Database,
    api: MovieApi,
    downloads: DownloadManager,
}

impl MaxMovies {
    /// Open the database (running migrations) and build the live HTTP stack from `config`.
    pub async fn connect(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let db = Database::open(config.database_url.as_deref()).await?;
        let api = MovieApi::from_config(&config, notifier.clone())?;
        let downloads = DownloadManager::new(Arc::new(db.clone()), notifier, config.resolved_download_dir()?)?;
        Ok(Self { config, db, api, downloads })
    }

    /// Assemble from pre-built parts, e.g. a facade over a scripted transport.
    pub fn from_parts(config: Config, db: Database, api: MovieApi, downloads: DownloadManager) -> Self {
        Self { config, db, api, downloads }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn api(&self) -> &MovieApi { &self.api }

    pub fn downloads(&self) -> &DownloadManager { &self.downloads }

    pub fn database(&self) -> &Database { &self.db }

    pub async fn trending(&self) -> SearchResult {
        self.api.search(TRENDING_QUERY, 1, "movie", RequestOptions::default()).await
    }

    /// Fetch a detail and record it in the viewing history. The requested id stands in
    /// when the subject carries none.
    pub async fn view_detail(&self, id: &str, opts: RequestOptions) -> Result<DetailResult> {
        let detail = self.api.get_detail(Some(id), opts).await;
        if let Some(entry) = detail.subject().and_then(|d| history_entry_from_detail(d, id)) {
            self.add_to_history(&entry).await?;
        }
        Ok(detail)
    }

    /// Returns false when the entry was ignored for having no id.
    pub async fn add_to_history(&self, entry: &HistoryEntry) -> Result<bool> {
        if entry.id.is_empty() {
            return Ok(false);
        }
        let limit = self.config.history_limit.max(1);
        self.db.push_history(entry, downloads::current_millis(), limit).await?;
        debug!(id = %entry.id, "recorded in history");
        Ok(true)
    }

    /// Most recent first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.db.list_history().await
    }

    pub async fn clear_history(&self) -> Result<u64> {
        dao::clear_history(self.db.pool()).await
    }

    /// The URL a player should open for this title, if any source exists.
    pub async fn play_url(&self, id: &str, season: Option<&str>, episode: Option<&str>) -> Option<String> {
        let sources = self.api.get_sources(Some(id), season, episode, RequestOptions::default()).await;
        pick_stream(&sources.results).and_then(playback_url).map(str::to_string)
    }

    /// Start a download of the first source for `meta.id`. With no usable source the user
    /// is told and nothing starts.
    pub async fn download_best_source(
        &self,
        meta: DownloadMeta,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Result<Option<DownloadHandle>> {
        let sources = self.api.get_sources(meta.id.as_deref(), season, episode, RequestOptions::default()).await;
        let Some(url) = sources.results.first().and_then(playback_url).map(str::to_string) else {
            self.api.notifier().error("No sources");
            return Ok(None);
        };
        self.downloads.start_download(meta, &url).await.map(Some)
    }
}
