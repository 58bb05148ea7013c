//! Background downloads: each one is its own tokio task that streams the body to disk and
//! persists its progress record as it goes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dao::{DownloadRecord, DownloadStatus};
use crate::notify::Notifier;
use crate::storage::DownloadStore;

/// What the caller knows about the title being downloaded. Missing pieces get defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadMeta {
    pub id: Option<String>,
    pub title: Option<String>,
    pub poster: Option<String>,
}

/// A started download. The record is the initial `starting` snapshot.
pub struct DownloadHandle {
    pub record: DownloadRecord,
    task: JoinHandle<DownloadRecord>,
}

impl DownloadHandle {
    /// Wait for the worker and return the final record.
    pub async fn wait(self) -> Result<DownloadRecord> {
        self.task.await.context("download task did not finish")
    }
}

pub struct DownloadManager {
    client: Client,
    store: Arc<dyn DownloadStore>,
    notifier: Arc<dyn Notifier>,
    dir: PathBuf,
}

impl DownloadManager {
    pub fn new(store: Arc<dyn DownloadStore>, notifier: Arc<dyn Notifier>, dir: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("maxmovies/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building download client")?;
        Ok(Self { client, store, notifier, dir })
    }

    /// Save a `starting` record, announce it, and spawn the worker.
    pub async fn start_download(&self, meta: DownloadMeta, url: &str) -> Result<DownloadHandle> {
        let created = current_millis();
        let record = DownloadRecord {
            id: non_empty(meta.id).unwrap_or_else(|| created.to_string()),
            title: non_empty(meta.title).unwrap_or_else(|| "Unknown".to_string()),
            poster: meta.poster.unwrap_or_default(),
            url: url.to_string(),
            status: DownloadStatus::Starting,
            progress: 0,
            created,
            path: None,
        };
        self.store.save_download(&record).await?;
        self.notifier.info(&format!("Starting download: {}", record.title));
        info!(id = %record.id, url, "download started");

        let worker = Worker {
            client: self.client.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            target: self.dir.join(file_name_for(&record.id, &record.url)),
        };
        let task = tokio::spawn(worker.run(record.clone()));
        Ok(DownloadHandle { record, task })
    }

    pub async fn list_downloads(&self) -> Result<Vec<DownloadRecord>> {
        self.store.list_downloads().await
    }

    pub async fn get_download(&self, id: &str) -> Result<Option<DownloadRecord>> {
        self.store.get_download(id).await
    }
}

struct Worker {
    client: Client,
    store: Arc<dyn DownloadStore>,
    notifier: Arc<dyn Notifier>,
    target: PathBuf,
}

impl Worker {
    async fn run(self, mut rec: DownloadRecord) -> DownloadRecord {
        match self.stream_to_disk(&mut rec).await {
            Ok(()) => {
                rec.status = DownloadStatus::Complete;
                rec.progress = 100;
                rec.path = Some(self.target.to_string_lossy().into_owned());
                self.persist(&rec).await;
                info!(id = %rec.id, path = %self.target.display(), "download complete");
                self.notifier.info(&format!("Download complete: {}", rec.title));
            }
            Err(e) => {
                warn!(id = %rec.id, error = %format!("{e:#}"), "download failed");
                let _ = tokio::fs::remove_file(&self.target).await;
                rec.status = DownloadStatus::Failed;
                self.persist(&rec).await;
                self.notifier.error(&format!("Download failed: {}", rec.title));
            }
        }
        rec
    }

    async fn stream_to_disk(&self, rec: &mut DownloadRecord) -> Result<()> {
        let resp = self.client.get(&rec.url).send().await.context("sending download request")?;
        if !resp.status().is_success() {
            bail!("download responded with {}", resp.status());
        }
        let total = resp.content_length().filter(|n| *n > 0);

        if let Some(parent) = self.target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating download dir: {}", parent.display()))?;
        }
        let mut file = tokio::fs::File::create(&self.target)
            .await
            .with_context(|| format!("creating {}", self.target.display()))?;

        rec.status = DownloadStatus::Downloading;
        self.store.save_download(rec).await?;

        let mut received: u64 = 0;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("reading download body")?;
            file.write_all(&chunk).await.context("writing download chunk")?;
            received += chunk.len() as u64;
            let next = next_progress(rec.progress, received, total);
            if next != rec.progress {
                rec.progress = next;
                debug!(id = %rec.id, progress = next, "download progress");
                self.store.save_download(rec).await?;
            }
        }
        file.flush().await.context("flushing download")?;
        Ok(())
    }

    async fn persist(&self, rec: &DownloadRecord) {
        if let Err(e) = self.store.save_download(rec).await {
            warn!(id = %rec.id, error = %format!("{e:#}"), "failed to persist download record");
        }
    }
}

/// Percentage from bytes received when the length is known; otherwise creep by 5 and
/// never claim completion before the body ends.
pub fn next_progress(current: u8, received: u64, total: Option<u64>) -> u8 {
    match total {
        Some(t) => (received.saturating_mul(100) / t).min(100) as u8,
        None => current.saturating_add(5).min(99),
    }
}

/// `{id}.{ext}` with the id reduced to filesystem-safe characters and the extension taken
/// from the URL path.
pub fn file_name_for(id: &str, url: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('.');
    let stem = if stem.is_empty() { "download" } else { stem };

    let ext = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            let last = u.path_segments()?.next_back()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| "bin".to_string());
    format!("{stem}.{ext}")
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

pub(crate) fn current_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{sqlite_url_for, Database};
    use crate::notify::{ChannelNotifier, Notification, Severity};
    use tokio::sync::mpsc::UnboundedReceiver;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        _dir: tempfile::TempDir,
        files: PathBuf,
        db: Database,
        manager: DownloadManager,
        notes: UnboundedReceiver<Notification>,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(Some(&sqlite_url_for(&dir.path().join("dl.db")))).await.unwrap();
        let (notifier, notes) = ChannelNotifier::new();
        let files = dir.path().join("files");
        let manager = DownloadManager::new(Arc::new(db.clone()), Arc::new(notifier), files.clone()).unwrap();
        Fixture { _dir: dir, files, db, manager, notes }
    }

    fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    #[test]
    fn progress_with_known_length() {
        assert_eq!(next_progress(0, 250, Some(1000)), 25);
        assert_eq!(next_progress(25, 999, Some(1000)), 99);
        assert_eq!(next_progress(99, 1000, Some(1000)), 100);
        assert_eq!(next_progress(0, 5000, Some(1000)), 100);
    }

    #[test]
    fn progress_without_length_creeps_and_caps() {
        assert_eq!(next_progress(0, 10, None), 5);
        assert_eq!(next_progress(95, 10, None), 99);
        assert_eq!(next_progress(99, 10, None), 99);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(file_name_for("mock-1001", "https://cdn.example/v/720p.MP4?sig=1"), "mock-1001.mp4");
        assert_eq!(file_name_for("a/b c", "https://cdn.example/playlist.m3u8"), "a_b_c.m3u8");
        assert_eq!(file_name_for("..", "https://cdn.example/stream"), "download.bin");
        assert_eq!(file_name_for("x", "not a url"), "x.bin");
    }

    #[tokio::test]
    async fn aborted_worker_reports_unfinished() {
        let record = DownloadRecord {
            id: "x".into(),
            title: "X".into(),
            poster: String::new(),
            url: String::new(),
            status: DownloadStatus::Starting,
            progress: 0,
            created: 0,
            path: None,
        };
        let pending = record.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            pending
        });
        task.abort();
        let err = DownloadHandle { record, task }.wait().await.unwrap_err();
        assert_eq!(err.to_string(), "download task did not finish");
        assert!(err.root_cause().to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn completes_and_persists_file() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        Mock::given(method("GET"))
            .and(path("/v/movie.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;
        let mut f = fixture().await;

        let meta = DownloadMeta { id: Some("mock-1001".into()), title: Some("The Last Horizon".into()), poster: None };
        let handle = f.manager.start_download(meta, &format!("{}/v/movie.mp4", server.uri())).await.unwrap();
        assert_eq!(handle.record.status, DownloadStatus::Starting);
        assert_eq!(handle.record.progress, 0);

        let done = handle.wait().await.unwrap();
        assert_eq!(done.status, DownloadStatus::Complete);
        assert_eq!(done.progress, 100);
        let written = std::fs::read(done.path.as_deref().unwrap()).unwrap();
        assert_eq!(written, body);

        let stored = f.manager.get_download("mock-1001").await.unwrap().unwrap();
        assert_eq!(stored, done);
        assert_eq!(f.db.list_downloads().await.unwrap().len(), 1);

        let notes = drain(&mut f.notes);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].message, "Starting download: The Last Horizon");
        assert_eq!(notes[1].message, "Download complete: The Last Horizon");
        assert!(notes.iter().all(|n| n.severity == Severity::Info));
    }

    #[tokio::test]
    async fn http_failure_marks_record_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&server).await;
        let mut f = fixture().await;

        let meta = DownloadMeta { id: Some("gone".into()), title: Some("Gone".into()), poster: Some("p.jpg".into()) };
        let done = f.manager.start_download(meta, &format!("{}/missing.mp4", server.uri())).await.unwrap().wait().await.unwrap();
        assert_eq!(done.status, DownloadStatus::Failed);
        assert_eq!(done.path, None);
        assert!(!f.files.join("gone.mp4").exists());

        let stored = f.manager.get_download("gone").await.unwrap().unwrap();
        assert_eq!(stored.status, DownloadStatus::Failed);
        assert_eq!(stored.poster, "p.jpg");

        let notes = drain(&mut f.notes);
        let last = notes.last().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert_eq!(last.message, "Download failed: Gone");
    }

    #[tokio::test]
    async fn missing_meta_gets_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec())).mount(&server).await;
        let f = fixture().await;

        let handle = f.manager.start_download(DownloadMeta::default(), &format!("{}/clip", server.uri())).await.unwrap();
        assert_eq!(handle.record.title, "Unknown");
        assert_eq!(handle.record.poster, "");
        assert!(handle.record.id.parse::<i64>().is_ok(), "id falls back to a millisecond timestamp");
        assert_eq!(handle.wait().await.unwrap().status, DownloadStatus::Complete);
        assert_eq!(f.manager.list_downloads().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_downloads_are_independent() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/ok")).respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 2048])).mount(&server).await;
        Mock::given(method("GET")).and(path("/bad")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
        let f = fixture().await;

        let ok = f.manager.start_download(DownloadMeta { id: Some("ok".into()), ..Default::default() }, &format!("{}/ok", server.uri())).await.unwrap();
        let bad = f.manager.start_download(DownloadMeta { id: Some("bad".into()), ..Default::default() }, &format!("{}/bad", server.uri())).await.unwrap();
        let (ok, bad) = (ok.wait().await.unwrap(), bad.wait().await.unwrap());
        assert_eq!(ok.status, DownloadStatus::Complete);
        assert_eq!(bad.status, DownloadStatus::Failed);
        assert_eq!(f.manager.list_downloads().await.unwrap().len(), 2);
    }
}
