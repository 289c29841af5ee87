//! JSON-file-backed store: the whole record set lives in one pretty-printed
//! file, loaded at open and rewritten on every insert. Fine for the
//! record volumes a paced harvester produces.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

use super::{fuzzy_job_match, JobStore, StoredJob};

pub struct JsonFileStore {
    path: PathBuf,
    jobs: Mutex<Vec<StoredJob>>,
}

impl JsonFileStore {
    /// Open (or create) the store at `path`. A missing file is an empty
    /// store; a corrupt file is an error rather than silent data loss.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let jobs: Vec<StoredJob> = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("corrupt store file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e).context(format!("reading {}", path.display())),
        };
        info!(
            "🗄️ Store opened: {} ({} existing records)",
            path.display(),
            jobs.len()
        );
        Ok(Self {
            path,
            jobs: Mutex::new(jobs),
        })
    }

    async fn persist(&self, jobs: &[StoredJob]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let contents = serde_json::to_string_pretty(jobs)?;
        tokio::fs::write(&self.path, contents)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

#[async_trait]
impl JobStore for JsonFileStore {
    async fn insert(&self, job: StoredJob) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        jobs.push(job);
        self.persist(&jobs).await
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<StoredJob>> {
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .find(|j| j.posting.url == url)
            .cloned())
    }

    async fn find_similar(&self, title: &str, company: &str) -> Result<Option<StoredJob>> {
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .find(|j| fuzzy_job_match(j, title, company))
            .cloned())
    }
}
