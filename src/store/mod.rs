//! Persistence gate: de-duplication in front of an opaque record store.
//!
//! The store itself is a collaborator behind the [`JobStore`] trait -
//! anything that can insert a record and look one up by URL (and,
//! optionally, by fuzzy title+company) qualifies. The gate owns the dedup
//! policy and the save/skip/error tally; one record's failure never aborts
//! the batch.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify;
use crate::core::types::{JobPosting, SaveError, SaveReport};

/// A persisted record: the posting plus storage identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredJob {
    pub id: Uuid,
    pub scraped_at: DateTime<Utc>,
    #[serde(flatten)]
    pub posting: JobPosting,
}

/// External record store, treated as an opaque dependency.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: StoredJob) -> anyhow::Result<()>;
    async fn find_by_url(&self, url: &str) -> anyhow::Result<Option<StoredJob>>;
    async fn find_similar(
        &self,
        title: &str,
        company: &str,
    ) -> anyhow::Result<Option<StoredJob>>;
}

fn normalized(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and whitespace-insensitive containment in either direction, the
/// moral equivalent of the `ilike %…%` lookup the gate fronts.
pub(crate) fn fuzzy_field_match(a: &str, b: &str) -> bool {
    let (a, b) = (normalized(a), normalized(b));
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

pub(crate) fn fuzzy_job_match(stored: &StoredJob, title: &str, company: &str) -> bool {
    fuzzy_field_match(&stored.posting.title, title)
        && fuzzy_field_match(&stored.posting.company, company)
}

/// De-duplicating writer in front of a [`JobStore`].
pub struct PersistenceGate {
    store: Arc<dyn JobStore>,
    fuzzy_dedup: bool,
}

impl PersistenceGate {
    pub fn new(store: Arc<dyn JobStore>, fuzzy_dedup: bool) -> Self {
        Self { store, fuzzy_dedup }
    }

    /// Write a batch, skipping records already present (exact URL match,
    /// plus fuzzy title+company when enabled). Classification fields are
    /// derived here, just before insert. Per-record failures are collected
    /// into the report - the batch always runs to completion.
    pub async fn save_all(&self, records: Vec<JobPosting>) -> SaveReport {
        info!("💾 Saving {} records", records.len());
        let mut report = SaveReport::default();

        for mut posting in records {
            let duplicate = match self.find_duplicate(&posting).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("❌ Lookup failed for \"{}\": {}", posting.title, e);
                    report.errors.push(SaveError {
                        title: posting.title.clone(),
                        reason: format!("lookup: {e}"),
                    });
                    continue;
                }
            };
            if duplicate {
                debug!(
                    "⏭️ Duplicate, skipping: {} at {}",
                    posting.title, posting.company
                );
                report.skipped += 1;
                continue;
            }

            classify::enrich(&mut posting);
            let title = posting.title.clone();
            let sample = format!("{} at {}", posting.title, posting.company);
            let stored = StoredJob {
                id: Uuid::new_v4(),
                scraped_at: Utc::now(),
                posting,
            };
            match self.store.insert(stored).await {
                Ok(()) => {
                    report.saved += 1;
                    if report.samples.len() < 3 {
                        report.samples.push(sample);
                    }
                }
                Err(e) => {
                    warn!("❌ Insert failed for \"{}\": {}", title, e);
                    report.errors.push(SaveError {
                        title,
                        reason: format!("insert: {e}"),
                    });
                }
            }
        }

        info!(
            "📊 Save summary: {} saved, {} skipped, {} errors",
            report.saved,
            report.skipped,
            report.errors.len()
        );
        report
    }

    async fn find_duplicate(&self, posting: &JobPosting) -> anyhow::Result<bool> {
        if self.store.find_by_url(posting.dedup_key()).await?.is_some() {
            return Ok(true);
        }
        if self.fuzzy_dedup {
            return Ok(self
                .store
                .find_similar(&posting.title, &posting.company)
                .await?
                .is_some());
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_field_match_ignores_case_and_spacing() {
        assert!(fuzzy_field_match("Junior  Developer", "junior developer"));
        assert!(fuzzy_field_match("Senior Rust Engineer", "rust engineer"));
        assert!(!fuzzy_field_match("Backend Engineer", "Frontend Engineer"));
        assert!(!fuzzy_field_match("", "anything"));
    }
}
