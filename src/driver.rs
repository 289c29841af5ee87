//! Query driver: per-run orchestration.
//!
//! Control flow: connectivity check → per-query scrape (challenge-aware)
//! → salary enrichment → persistence gate. Strictly sequential, one
//! browser, one page - the pacing *is* the anti-detection strategy, so the
//! wide inter-query sleeps must not be shortened casually.

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::types::{HarvestError, HarvestReport, JobPosting};
use crate::core::{CancelToken, HarvestConfig};
use crate::extract;
use crate::salary;
use crate::scraping::challenge::{self, ChallengeState, Clearance};
use crate::scraping::{humanize, ScrapeSession};
use crate::store::PersistenceGate;

pub struct HarvestRunner {
    cfg: HarvestConfig,
    gate: PersistenceGate,
}

impl HarvestRunner {
    pub fn new(cfg: HarvestConfig, gate: PersistenceGate) -> Self {
        Self { cfg, gate }
    }

    /// Build the search URL for one query: query text, recency filter, sort
    /// order, radius.
    pub fn search_url(&self, query: &str) -> Result<String, HarvestError> {
        let mut url = url::Url::parse(&self.cfg.base_url)
            .map_err(|e| HarvestError::Navigation(format!("bad base_url: {e}")))?;
        url.set_path("/jobs");
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("fromage", &self.cfg.recency_days.to_string())
            .append_pair("sort", &self.cfg.sort)
            .append_pair("radius", &self.cfg.radius_miles.to_string());
        Ok(url.to_string())
    }

    /// Run the full harvest. Query-level failures are logged and skipped;
    /// only session-level failures (homepage unreachable after the bounded
    /// backoff) abort the run. The caller owns session cleanup.
    pub async fn run(
        &self,
        session: &ScrapeSession,
        cancel: &CancelToken,
    ) -> Result<HarvestReport, HarvestError> {
        let mut report = HarvestReport::default();

        // A challenge on the very first navigation means the whole session
        // is burned - fail the run here rather than grinding the query list
        // against a blocked fingerprint.
        self.connectivity_check(session, cancel, &mut report).await?;

        let mut collected: Vec<JobPosting> = Vec::new();
        let total = self.cfg.queries.len();

        for (i, query) in self.cfg.queries.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("🛑 Cancelled - stopping before query {:?}", query);
                break;
            }
            if collected.len() >= self.cfg.max_records {
                info!("🎯 Reached {} records - stopping early", self.cfg.max_records);
                break;
            }

            report.queries_attempted += 1;
            info!("🔍 Query {}/{}: {:?}", i + 1, total, query);

            match self.scrape_query(session, query, cancel, &mut report).await {
                Ok(mut records) => {
                    info!("✅ {} records from {:?}", records.len(), query);
                    for posting in &mut records {
                        salary::enrich(posting);
                    }
                    collected.append(&mut records);
                    collected.truncate(self.cfg.max_records);
                }
                Err(e) => {
                    report.queries_failed += 1;
                    warn!("❌ Query {:?} failed: {}", query, e);
                }
            }

            let more_to_do = i + 1 < total && collected.len() < self.cfg.max_records;
            if more_to_do && !cancel.is_cancelled() {
                let pause = humanize::query_pause(
                    self.cfg.query_delay_min_secs,
                    self.cfg.query_delay_max_secs,
                );
                info!("⏱️ Waiting {}s before next query", pause.as_secs());
                tokio::time::sleep(pause).await;
                humanize::browse(session.page()).await;
            }
        }

        report.extracted = collected.len();
        report.save = self.gate.save_all(collected).await;
        Ok(report)
    }

    /// Once-per-run homepage navigation under the bounded exponential
    /// backoff policy. Distinct from per-query scraping on purpose: failing
    /// here exits before any query is attempted.
    async fn connectivity_check(
        &self,
        session: &ScrapeSession,
        cancel: &CancelToken,
        report: &mut HarvestReport,
    ) -> Result<(), HarvestError> {
        info!("🌐 Connectivity check: {}", self.cfg.base_url);

        let shots: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(5))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(Some(Duration::from_secs(
                self.cfg.connect_retry_max_elapsed_secs,
            )))
            .build();

        let outcome = retry(policy, || async {
            if cancel.is_cancelled() {
                return Err(backoff::Error::permanent(HarvestError::Session(
                    "cancelled".to_string(),
                )));
            }
            session
                .navigate(&self.cfg.base_url)
                .await
                .map_err(|e| backoff::Error::transient(HarvestError::Navigation(e.to_string())))?;

            match challenge::probe_page(session.page()).await {
                ChallengeState::Clear => Ok(()),
                ChallengeState::Challenged => {
                    match challenge::await_clearance(
                        session.page(),
                        self.cfg.challenge_wait_secs,
                        cancel,
                    )
                    .await
                    {
                        Clearance::Cleared { .. } => Ok(()),
                        Clearance::Cancelled => Err(backoff::Error::permanent(
                            HarvestError::Session("cancelled during clearance".to_string()),
                        )),
                        Clearance::TimedOut => {
                            if let Ok(p) =
                                session.screenshot(&self.cfg.screenshot_dir, "challenge").await
                            {
                                shots.lock().unwrap().push(p.display().to_string());
                            }
                            Err(backoff::Error::transient(HarvestError::Blocked(
                                "challenge not cleared on homepage".to_string(),
                            )))
                        }
                    }
                }
                ChallengeState::Blocked => {
                    if let Ok(p) = session.screenshot(&self.cfg.screenshot_dir, "blocked").await {
                        shots.lock().unwrap().push(p.display().to_string());
                    }
                    Err(backoff::Error::transient(HarvestError::Blocked(
                        "block signature on homepage".to_string(),
                    )))
                }
            }
        })
        .await;

        report
            .screenshots
            .extend(shots.into_inner().unwrap_or_default());

        outcome.map_err(|e| HarvestError::Session(format!("connectivity check failed: {e}")))?;
        info!("✅ Target reachable, session clear");
        Ok(())
    }

    async fn scrape_query(
        &self,
        session: &ScrapeSession,
        query: &str,
        cancel: &CancelToken,
        report: &mut HarvestReport,
    ) -> Result<Vec<JobPosting>, HarvestError> {
        let url = self.search_url(query)?;
        session
            .navigate(&url)
            .await
            .map_err(|e| HarvestError::Navigation(e.to_string()))?;

        match challenge::probe_page(session.page()).await {
            ChallengeState::Clear => {}
            ChallengeState::Challenged => {
                match challenge::await_clearance(
                    session.page(),
                    self.cfg.challenge_wait_secs,
                    cancel,
                )
                .await
                {
                    Clearance::Cleared { .. } => {}
                    Clearance::Cancelled => return Ok(Vec::new()),
                    Clearance::TimedOut => {
                        if let Ok(p) =
                            session.screenshot(&self.cfg.screenshot_dir, "challenge").await
                        {
                            report.screenshots.push(p.display().to_string());
                        }
                        return Err(HarvestError::Blocked(
                            "challenge not cleared on results page".to_string(),
                        ));
                    }
                }
            }
            ChallengeState::Blocked => {
                if let Ok(p) = session.screenshot(&self.cfg.screenshot_dir, "blocked").await {
                    report.screenshots.push(p.display().to_string());
                }
                return Err(HarvestError::Blocked(
                    "block signature on results page".to_string(),
                ));
            }
        }

        humanize::browse(session.page()).await;

        let html = session
            .page()
            .content()
            .await
            .map_err(|e| HarvestError::Navigation(format!("content capture: {e}")))?;

        let records = extract::extract_results_page(&html, &url, &self.cfg);
        if records.is_empty() {
            warn!("⚠️ 0 records for {:?} - empty results or selector drift", query);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PersistenceGate};
    use std::sync::Arc;

    #[test]
    fn search_url_carries_query_and_filters() {
        let cfg = HarvestConfig::default();
        let gate = PersistenceGate::new(Arc::new(MemoryStore::new()), false);
        let runner = HarvestRunner::new(cfg, gate);

        let url = runner.search_url("junior developer").unwrap();
        assert!(url.starts_with("https://www.indeed.com/jobs?"));
        assert!(url.contains("q=junior+developer"));
        assert!(url.contains("fromage=14"));
        assert!(url.contains("sort=date"));
        assert!(url.contains("radius=50"));
    }
}
