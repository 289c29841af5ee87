//! In-memory store, used by tests and dry runs.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{fuzzy_job_match, JobStore, StoredJob};

#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<Vec<StoredJob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<StoredJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, job: StoredJob) -> anyhow::Result<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> anyhow::Result<Option<StoredJob>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.posting.url == url)
            .cloned())
    }

    async fn find_similar(
        &self,
        title: &str,
        company: &str,
    ) -> anyhow::Result<Option<StoredJob>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| fuzzy_job_match(j, title, company))
            .cloned())
    }
}
