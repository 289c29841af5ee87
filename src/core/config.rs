use crate::core::types::RequiredFields;
use crate::extract::selectors::SelectorChains;

// ---------------------------------------------------------------------------
// HarvestConfig - file-based config loader (job-harvester.json) with env-var
// fallback for the operator-facing tunables.
// ---------------------------------------------------------------------------

/// Raw shape of `job-harvester.json`. Every field is optional; anything
/// missing falls back to an env var and then to the built-in default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct RawHarvestConfig {
    pub source: Option<String>,
    pub base_url: Option<String>,
    pub queries: Option<Vec<String>>,
    pub max_records: Option<usize>,
    /// Recency filter passed to the search URL (days).
    pub recency_days: Option<u32>,
    pub sort: Option<String>,
    pub radius_miles: Option<u32>,
    pub required_fields: Option<RequiredFields>,
    pub fuzzy_dedup: Option<bool>,
    pub warm_up: Option<bool>,
    pub warmup_sites: Option<Vec<String>>,
    /// Inter-query sleep window, seconds. Wide on purpose - human pacing.
    pub query_delay_min_secs: Option<u64>,
    pub query_delay_max_secs: Option<u64>,
    /// Challenge clearance budget per navigation, seconds.
    pub challenge_wait_secs: Option<u64>,
    /// Total time budget for the first-navigation connectivity check,
    /// including backoff between attempts.
    pub connect_retry_max_elapsed_secs: Option<u64>,
    pub screenshot_dir: Option<String>,
    pub store_path: Option<String>,
    pub description_max_chars: Option<usize>,
    /// Per-field selector fallback chains. Operators update these when the
    /// target site ships a markup change - no recompile needed.
    pub selectors: Option<SelectorChains>,
    pub known_employers: Option<Vec<String>>,
}

/// Fully-resolved run configuration.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub source: String,
    pub base_url: String,
    pub queries: Vec<String>,
    pub max_records: usize,
    pub recency_days: u32,
    pub sort: String,
    pub radius_miles: u32,
    pub required_fields: RequiredFields,
    pub fuzzy_dedup: bool,
    pub warm_up: bool,
    pub warmup_sites: Vec<String>,
    pub query_delay_min_secs: u64,
    pub query_delay_max_secs: u64,
    pub challenge_wait_secs: u64,
    pub connect_retry_max_elapsed_secs: u64,
    pub screenshot_dir: String,
    pub store_path: String,
    pub description_max_chars: usize,
    pub selectors: SelectorChains,
    pub known_employers: Vec<String>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse().ok())
}

impl RawHarvestConfig {
    /// Queries: JSON field → `HARVEST_QUERIES` (comma-separated) → defaults.
    fn resolve_queries(&self) -> Vec<String> {
        if let Some(q) = &self.queries {
            if !q.is_empty() {
                return q.clone();
            }
        }
        if let Some(csv) = env_string("HARVEST_QUERIES") {
            let parsed: Vec<String> = csv
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                return parsed;
            }
        }
        vec![
            "entry level software engineer".to_string(),
            "junior developer".to_string(),
        ]
    }

    fn resolve_warmup_sites(&self) -> Vec<String> {
        self.warmup_sites.clone().unwrap_or_else(|| {
            vec![
                "https://stackoverflow.com".to_string(),
                "https://github.com".to_string(),
            ]
        })
    }

    fn resolve_known_employers(&self) -> Vec<String> {
        self.known_employers.clone().unwrap_or_else(|| {
            [
                "Lockheed Martin",
                "General Dynamics",
                "Microsoft",
                "Google",
                "Amazon",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect()
        })
    }

    pub fn resolve(self) -> HarvestConfig {
        let queries = self.resolve_queries();
        let warmup_sites = self.resolve_warmup_sites();
        let known_employers = self.resolve_known_employers();

        let delay_min = self
            .query_delay_min_secs
            .or_else(|| env_parse("HARVEST_QUERY_DELAY_MIN_SECS"))
            .unwrap_or(15);
        // Clamp so the sampling window is never inverted.
        let delay_max = self
            .query_delay_max_secs
            .or_else(|| env_parse("HARVEST_QUERY_DELAY_MAX_SECS"))
            .unwrap_or(30)
            .max(delay_min);

        HarvestConfig {
            source: self.source.unwrap_or_else(|| "indeed".to_string()),
            base_url: self
                .base_url
                .unwrap_or_else(|| "https://www.indeed.com".to_string()),
            queries,
            max_records: self
                .max_records
                .or_else(|| env_parse("HARVEST_MAX_RECORDS"))
                .unwrap_or(30),
            recency_days: self.recency_days.unwrap_or(14),
            sort: self.sort.unwrap_or_else(|| "date".to_string()),
            radius_miles: self.radius_miles.unwrap_or(50),
            required_fields: self.required_fields.unwrap_or_default(),
            fuzzy_dedup: self.fuzzy_dedup.unwrap_or(true),
            warm_up: self
                .warm_up
                .unwrap_or_else(|| env_string("HARVEST_WARMUP").map(|v| v != "0").unwrap_or(true)),
            warmup_sites,
            query_delay_min_secs: delay_min,
            query_delay_max_secs: delay_max,
            challenge_wait_secs: self.challenge_wait_secs.unwrap_or(30),
            connect_retry_max_elapsed_secs: self.connect_retry_max_elapsed_secs.unwrap_or(90),
            screenshot_dir: self
                .screenshot_dir
                .or_else(|| env_string("HARVEST_SCREENSHOT_DIR"))
                .unwrap_or_else(|| "diagnostics".to_string()),
            store_path: self
                .store_path
                .or_else(|| env_string("HARVEST_STORE_PATH"))
                .unwrap_or_else(|| "jobs.json".to_string()),
            description_max_chars: self.description_max_chars.unwrap_or(5_000),
            selectors: self.selectors.unwrap_or_default(),
            known_employers,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        RawHarvestConfig::default().resolve()
    }
}

/// Load `job-harvester.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `JOB_HARVESTER_CONFIG` env var path
/// 2. `./job-harvester.json`
/// 3. `../job-harvester.json`
///
/// Missing file → defaults (silent, env-var fallbacks apply).
/// Parse error → log a warning, return defaults.
pub fn load_harvest_config() -> HarvestConfig {
    let mut candidates = vec![
        std::path::PathBuf::from("job-harvester.json"),
        std::path::PathBuf::from("../job-harvester.json"),
    ];
    if let Ok(env_path) = std::env::var("JOB_HARVESTER_CONFIG") {
        candidates.insert(0, std::path::PathBuf::from(env_path));
    }

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawHarvestConfig>(&contents) {
                Ok(raw) => {
                    tracing::info!("job-harvester.json loaded from {}", path.display());
                    return raw.resolve();
                }
                Err(e) => {
                    tracing::warn!(
                        "job-harvester.json parse error at {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    return HarvestConfig::default();
                }
            },
            Err(_) => continue,
        }
    }

    HarvestConfig::default()
}
