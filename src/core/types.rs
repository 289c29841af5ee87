use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::salary::SalaryPeriod;

/// A single extracted job posting - the unit the whole pipeline moves around.
///
/// A posting is only constructed once it has passed the configured
/// required-field policy; partial records are dropped at extraction time,
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// De-duplication key. An apply-action URL when one was discovered,
    /// otherwise the (parameter-stripped) source page URL, otherwise a
    /// synthetic `page#card-N` key that cannot dedupe across runs.
    pub url: String,
    /// Origin tag, e.g. `"indeed"`.
    pub source: String,
    #[serde(default)]
    pub salary_raw: Option<String>,
    #[serde(default)]
    pub salary_min: Option<u64>,
    #[serde(default)]
    pub salary_max: Option<u64>,
    /// Periodicity the normalizer assumed when deriving min/max (annualized).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_period_assumed: Option<SalaryPeriod>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub extracted_data: ExtractionMeta,
}

impl JobPosting {
    /// The exact-match de-duplication key.
    pub fn dedup_key(&self) -> &str {
        &self.url
    }
}

/// Provenance carried alongside every posting: how it was extracted, when,
/// and which selector alternative matched each field. The matched-selector
/// map is what tells an operator which chain entries are still alive after
/// the target site ships a markup change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMeta {
    /// e.g. `"results-page"` or `"detail-page"`.
    pub page_type: String,
    /// e.g. `"selector-chain"` or `"content-sniff"`.
    pub extraction_method: String,
    /// RFC 3339 extraction timestamp.
    pub extracted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_href: Option<String>,
    /// True when a dedicated apply-action link was found and stored as `url`.
    #[serde(default)]
    pub apply_link_found: bool,
    /// True when no href was found and `url` is a positional synthetic key.
    #[serde(default)]
    pub synthetic_url: bool,
    /// field name → zero-based index of the selector alternative that matched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selectors_matched: BTreeMap<String, usize>,
}

/// Which fields a record must carry to be accepted into the pipeline.
///
/// The server-side harvester defaults to `TitleAndCompany`; the embedded
/// detail-page extractor historically accepted `TitleOrCompany`. The policy
/// is explicit configuration rather than a per-call-site constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequiredFields {
    #[default]
    TitleAndCompany,
    TitleOrCompany,
}

/// Outcome tally for one `PersistenceGate::save_all` batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveReport {
    pub saved: usize,
    pub skipped: usize,
    pub errors: Vec<SaveError>,
    /// A few "title at company" lines from the saved records, for the
    /// end-of-run summary.
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveError {
    pub title: String,
    pub reason: String,
}

/// Summary of a whole harvest run. The run always ends with one of these,
/// however many queries failed along the way.
#[derive(Debug, Default, Serialize)]
pub struct HarvestReport {
    pub queries_attempted: usize,
    pub queries_failed: usize,
    pub extracted: usize,
    pub save: SaveReport,
    /// Diagnostic screenshots captured on failed clearances / block pages.
    pub screenshots: Vec<String>,
}

/// Error taxonomy for the harvesting engine.
///
/// `Session` aborts the run. `Blocked` and `Navigation` abort one query; the
/// driver logs them and moves on. Record-level failures never surface here -
/// they are tallied in [`SaveReport::errors`].
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("session failure: {0}")]
    Session(String),
    #[error("blocked: {0}")]
    Blocked(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
}
