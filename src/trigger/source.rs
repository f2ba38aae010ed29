use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::error::{Error, Result};
use crate::page::Snapshot;

/// Whatever hosts the document: hands out its current URL cheaply and a full
/// snapshot on demand.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn current_url(&mut self) -> Result<String>;
    async fn snapshot(&mut self) -> Result<Snapshot>;
}

/// Snapshot pushed in by the embedder. Clones share the same document, so a
/// kept handle can simulate navigation while the trigger owns the source.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Option<Snapshot>>>,
}

impl MemorySource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// Replace the whole document (full page load).
    pub fn load(&self, snapshot: Snapshot) {
        *self.lock() = Some(snapshot);
    }

    /// Change only the URL, as history-API navigation does.
    pub fn navigate(&self, url: impl Into<String>) {
        if let Some(snapshot) = self.lock().as_mut() {
            snapshot.url = url.into();
        }
    }

    pub fn set_html(&self, html: impl Into<String>) {
        if let Some(snapshot) = self.lock().as_mut() {
            snapshot.html = html.into();
        }
    }

    pub fn unload(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Snapshot>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotSource for MemorySource {
    async fn current_url(&mut self) -> Result<String> {
        self.lock()
            .as_ref()
            .map(|s| s.url.clone())
            .ok_or(Error::NoDocument)
    }

    async fn snapshot(&mut self) -> Result<Snapshot> {
        self.lock().clone().ok_or(Error::NoDocument)
    }
}

/// An HTML file on disk served under a fixed URL. Re-read on every snapshot.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    url: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
        }
    }
}

impl SnapshotSource for FileSource {
    async fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn snapshot(&mut self) -> Result<Snapshot> {
        let html = tokio::fs::read_to_string(&self.path).await?;
        Ok(Snapshot::new(self.url.clone(), html))
    }
}

/// Live page fetched with a single GET per snapshot. No retries.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("job_detector/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl SnapshotSource for HttpSource {
    async fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn snapshot(&mut self) -> Result<Snapshot> {
        info!("Fetching {}", self.url);
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        // Redirects land on the real posting URL; scan against that one.
        let url = response.url().to_string();
        let html = response.text().await?;
        Ok(Snapshot::new(url, html))
    }
}

// ── Tests ──
