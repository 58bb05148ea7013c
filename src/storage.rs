use anyhow::Result;
use async_trait::async_trait;

use crate::dao::{self, DownloadRecord, HistoryEntry};
use crate::db::Database;

/// Persistent download records keyed by id.
#[async_trait]
pub trait DownloadStore: Send + Sync {
    async fn save_download(&self, record: &DownloadRecord) -> Result<()>;
    async fn get_download(&self, id: &str) -> Result<Option<DownloadRecord>>;
    async fn list_downloads(&self) -> Result<Vec<DownloadRecord>>;
}

/// Recently viewed titles, most recent first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn push_history(&self, entry: &HistoryEntry, viewed_at: i64, limit: usize) -> Result<()>;
    async fn list_history(&self) -> Result<Vec<HistoryEntry>>;
}

#[async_trait]
impl DownloadStore for Database {
    async fn save_download(&self, record: &DownloadRecord) -> Result<()> {
        dao::upsert_download(self.pool(), record).await
    }

    async fn get_download(&self, id: &str) -> Result<Option<DownloadRecord>> {
        dao::get_download(self.pool(), id).await
    }

    async fn list_downloads(&self) -> Result<Vec<DownloadRecord>> {
        dao::list_downloads(self.pool()).await
    }
}

#[async_trait]
impl HistoryStore for Database {
    async fn push_history(&self, entry: &HistoryEntry, viewed_at: i64, limit: usize) -> Result<()> {
        dao::push_history(self.pool(), entry, viewed_at, limit).await
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>> {
        dao::list_history(self.pool()).await
    }
}
