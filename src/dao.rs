use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sqlx::AnyPool;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Starting,
    Downloading,
    Complete,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStatus::Starting => "starting",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Complete => "complete",
            DownloadStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for DownloadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "starting" => Ok(DownloadStatus::Starting),
            "downloading" => Ok(DownloadStatus::Downloading),
            "complete" => Ok(DownloadStatus::Complete),
            "failed" => Ok(DownloadStatus::Failed),
            other => Err(anyhow!("unknown download status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: String,
    pub title: String,
    pub poster: String,
    pub url: String,
    pub status: DownloadStatus,
    /// 0-100
    pub progress: u8,
    /// Epoch milliseconds
    pub created: i64,
    /// Where the finished file was written.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub poster: String,
}

type DownloadRow = (String, String, String, String, String, i64, i64, Option<String>);

fn record_from_row(row: DownloadRow) -> Result<DownloadRecord> {
    let (id, title, poster, url, status, progress, created, path) = row;
    Ok(DownloadRecord {
        id,
        title,
        poster,
        url,
        status: status.parse()?,
        progress: progress.clamp(0, 100) as u8,
        created,
        path,
    })
}

const DOWNLOAD_COLUMNS: &str = "id, title, poster, url, status, progress, created, path";

pub async fn upsert_download(pool: &AnyPool, r: &DownloadRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO downloads(id, title, poster, url, status, progress, created, path)\n         VALUES(?, ?, ?, ?, ?, ?, ?, ?)\n         ON CONFLICT(id) DO UPDATE SET\n           title=excluded.title, poster=excluded.poster, url=excluded.url, status=excluded.status,\n           progress=excluded.progress, created=excluded.created, path=excluded.path,\n           updated_at=CURRENT_TIMESTAMP",
    )
    .bind(&r.id)
    .bind(&r.title)
    .bind(&r.poster)
    .bind(&r.url)
    .bind(r.status.as_str())
    .bind(i64::from(r.progress))
    .bind(r.created)
    .bind(&r.path)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_download(pool: &AnyPool, id: &str) -> Result<Option<DownloadRecord>> {
    let row = sqlx::query_as::<_, DownloadRow>(&format!("SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(record_from_row).transpose()
}

pub async fn list_downloads(pool: &AnyPool) -> Result<Vec<DownloadRecord>> {
    let rows = sqlx::query_as::<_, DownloadRow>(&format!("SELECT {DOWNLOAD_COLUMNS} FROM downloads ORDER BY created DESC, id"))
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(record_from_row).collect()
}

/// Move `entry` to the front of the history and trim to `limit` entries.
pub async fn push_history(pool: &AnyPool, entry: &HistoryEntry, viewed_at: i64, limit: usize) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM history WHERE id = ?").bind(&entry.id).execute(&mut *tx).await?;
    sqlx::query("INSERT INTO history(id, title, poster, viewed_at) VALUES(?, ?, ?, ?)")
        .bind(&entry.id)
        .bind(&entry.title)
        .bind(&entry.poster)
        .bind(viewed_at)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM history WHERE seq NOT IN (SELECT seq FROM history ORDER BY seq DESC LIMIT ?)")
        .bind(limit as i64)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn list_history(pool: &AnyPool) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query_as::<_, (String, String, String)>("SELECT id, title, poster FROM history ORDER BY seq DESC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id, title, poster)| HistoryEntry { id, title, poster }).collect())
}

pub async fn clear_history(pool: &AnyPool) -> Result<u64> {
    let res = sqlx::query("DELETE FROM history").execute(pool).await?;
    Ok(res.rows_affected())
}
