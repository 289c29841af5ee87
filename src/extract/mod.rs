//! Extraction engine: selector-fallback-chain scraping of results pages and
//! job detail pages.
//!
//! The engine operates on a captured HTML string, never on the live page -
//! parsing is synchronous, side-effect free, and testable without a
//! browser. Resilience against markup drift comes from the ordered
//! per-field chains in [`selectors::SelectorChains`]; which alternative
//! matched is recorded in each record's provenance so operators can see
//! which chain entries are still alive after a site deploy.

pub mod selectors;
pub mod sniff;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};
use url::Url;

use crate::core::types::{ExtractionMeta, JobPosting, RequiredFields};
use crate::core::HarvestConfig;

/// Explicit policy string stored in place of a missing non-required field
/// under the `title-or-company` policy. Never silently substituted - the
/// value is greppable and documented.
pub const FIELD_UNAVAILABLE: &str = "[unavailable]";

// ── chain walking ────────────────────────────────────────────────────────────

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined = parts.collect::<Vec<_>>().join(" ");
    joined
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_start_matches('•')
        .trim()
        .to_string()
}

/// First selector alternative under `scope` that resolves to an element.
fn first_element<'a>(
    scope: ElementRef<'a>,
    chain: &[String],
) -> Option<(usize, ElementRef<'a>)> {
    for (idx, raw) in chain.iter().enumerate() {
        let Ok(sel) = Selector::parse(raw) else {
            warn!("invalid selector skipped: {:?}", raw);
            continue;
        };
        if let Some(el) = scope.select(&sel).next() {
            return Some((idx, el));
        }
    }
    None
}

/// First selector alternative yielding non-empty trimmed text.
fn first_text(scope: ElementRef<'_>, chain: &[String]) -> Option<(usize, String)> {
    for (idx, raw) in chain.iter().enumerate() {
        let Ok(sel) = Selector::parse(raw) else {
            warn!("invalid selector skipped: {:?}", raw);
            continue;
        };
        for el in scope.select(&sel) {
            let text = collapse(el.text());
            if !text.is_empty() {
                return Some((idx, text));
            }
        }
    }
    None
}

/// Like [`first_text`] but only accepts text carrying at least one digit -
/// salary snippets without a number are label noise.
fn first_salary(scope: ElementRef<'_>, chain: &[String]) -> Option<(usize, String)> {
    for (idx, raw) in chain.iter().enumerate() {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        for el in scope.select(&sel) {
            let text = collapse(el.text());
            if text.chars().any(|c| c.is_ascii_digit()) {
                return Some((idx, text));
            }
        }
    }
    None
}

// ── cleaning & validation ────────────────────────────────────────────────────

static TITLE_SUFFIX_RE: OnceLock<Regex> = OnceLock::new();

/// Strip site-appended suffixes like " - job post" from a raw title.
pub fn clean_title(raw: &str) -> String {
    let re = TITLE_SUFFIX_RE.get_or_init(|| {
        Regex::new(r"(?i)(\s*-\s*job post\s*$|\s*\|\s*indeed\.com\s*$)")
            .expect("valid title suffix pattern")
    });
    re.replace_all(raw.trim(), "").trim().to_string()
}

/// Strip tracking parameters from a page URL, keeping only the job-key
/// parameters that identify the posting.
pub fn clean_page_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let keep: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k == "jk" || k == "vjk")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.set_query(None);
    if !keep.is_empty() {
        let mut qp = url.query_pairs_mut();
        for (k, v) in &keep {
            qp.append_pair(k, v);
        }
    }
    url.to_string()
}

fn title_ok(t: &str) -> bool {
    t.len() > 3 && !t.to_lowercase().contains("not found")
}

fn company_ok(c: &str) -> bool {
    c.len() > 1 && !c.to_lowercase().contains("not found")
}

/// Apply the required-field policy. Returns the final (title, company) pair
/// or `None` when the record must be discarded. Under `TitleOrCompany` the
/// missing side is filled with [`FIELD_UNAVAILABLE`].
fn finalize_required(
    title: Option<String>,
    company: Option<String>,
    policy: RequiredFields,
) -> Option<(String, String)> {
    let title = title.map(|t| clean_title(&t)).filter(|t| title_ok(t));
    let company = company.filter(|c| company_ok(c));

    match policy {
        RequiredFields::TitleAndCompany => Some((title?, company?)),
        RequiredFields::TitleOrCompany => {
            if title.is_none() && company.is_none() {
                return None;
            }
            Some((
                title.unwrap_or_else(|| FIELD_UNAVAILABLE.to_string()),
                company.unwrap_or_else(|| FIELD_UNAVAILABLE.to_string()),
            ))
        }
    }
}

fn cap_description(raw: String, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw;
    }
    let mut capped: String = raw.chars().take(max_chars).collect();
    capped.push_str("...");
    capped
}

// ── results-page extraction ──────────────────────────────────────────────────

/// Extract every acceptable posting from a search-results page.
///
/// Cards are located with the first `cards` chain entry that matches at all;
/// each field then walks its own fallback chain. Cards failing the
/// required-field policy are dropped, never returned partially. A page where
/// no card selector matches yields an empty vec - markup drift degrades to
/// fewer records, not a crash.
pub fn extract_results_page(html: &str, page_url: &str, cfg: &HarvestConfig) -> Vec<JobPosting> {
    let doc = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let mut cards: Option<(usize, Vec<ElementRef>)> = None;
    for (idx, raw) in cfg.selectors.cards.iter().enumerate() {
        let Ok(sel) = Selector::parse(raw) else {
            warn!("invalid card selector skipped: {:?}", raw);
            continue;
        };
        let found: Vec<_> = doc.select(&sel).collect();
        if !found.is_empty() {
            debug!("card selector #{} ({:?}) matched {} cards", idx, raw, found.len());
            cards = Some((idx, found));
            break;
        }
    }

    let Some((cards_idx, cards)) = cards else {
        warn!("no job cards found on results page - selector drift?");
        return Vec::new();
    };

    let mut out = Vec::new();
    for (index, card) in cards.into_iter().enumerate() {
        match extract_card(card, index, page_url, base.as_ref(), cards_idx, cfg) {
            Some(posting) => out.push(posting),
            None => debug!("card {} skipped: required fields missing", index),
        }
    }
    out
}

fn extract_card(
    card: ElementRef<'_>,
    index: usize,
    page_url: &str,
    base: Option<&Url>,
    cards_idx: usize,
    cfg: &HarvestConfig,
) -> Option<JobPosting> {
    let chains = &cfg.selectors;
    let mut matched = BTreeMap::new();
    matched.insert("cards".to_string(), cards_idx);
    let mut sniffed = false;

    // Title and URL come from the title anchor when one is present.
    let mut title = None;
    let mut original_href = None;
    if let Some((link_idx, link)) = first_element(card, &chains.title_link) {
        matched.insert("title_link".to_string(), link_idx);
        original_href = link.value().attr("href").map(str::to_string);
        if let Some((idx, text)) = first_text(link, &chains.title) {
            matched.insert("title".to_string(), idx);
            title = Some(text);
        } else {
            let text = collapse(link.text());
            if !text.is_empty() {
                title = Some(text);
            }
        }
    }
    if title.is_none() {
        if let Some((idx, text)) = first_text(card, &chains.title) {
            matched.insert("title".to_string(), idx);
            title = Some(text);
        }
    }

    let mut company = None;
    if let Some((idx, text)) = first_text(card, &chains.company) {
        matched.insert("company".to_string(), idx);
        company = Some(text);
    } else if let Some(text) = sniff::sniff_company(card, &cfg.known_employers) {
        debug!("card {}: company via content sniff", index);
        sniffed = true;
        company = Some(text);
    }

    let mut location = None;
    if let Some((idx, text)) = first_text(card, &chains.location) {
        matched.insert("location".to_string(), idx);
        location = Some(text);
    } else if let Some(text) = sniff::sniff_location(card) {
        debug!("card {}: location via content sniff", index);
        sniffed = true;
        location = Some(text);
    }

    let salary_raw = first_salary(card, &chains.salary).map(|(idx, text)| {
        matched.insert("salary".to_string(), idx);
        text
    });

    let description = first_text(card, &chains.description).map(|(idx, text)| {
        matched.insert("description".to_string(), idx);
        cap_description(text, cfg.description_max_chars)
    });

    let mut synthetic_url = false;
    let url = match (&original_href, base) {
        (Some(href), Some(base)) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.clone()),
        (Some(href), None) => href.clone(),
        (None, _) => {
            // Cannot be deduplicated across runs; flagged in provenance.
            synthetic_url = true;
            format!("{}#card-{}", page_url, index)
        }
    };

    let (title, company) = finalize_required(title, company, cfg.required_fields)?;

    for (field, idx) in &matched {
        debug!("card {}: {} ← selector #{}", index, field, idx);
    }

    Some(JobPosting {
        title,
        company,
        location,
        description,
        url,
        source: cfg.source.clone(),
        salary_raw,
        salary_min: None,
        salary_max: None,
        salary_period_assumed: None,
        job_type: None,
        experience_level: None,
        is_remote: false,
        tags: Vec::new(),
        extracted_data: ExtractionMeta {
            page_type: "results-page".to_string(),
            extraction_method: if sniffed {
                "selector-chain+content-sniff".to_string()
            } else {
                "selector-chain".to_string()
            },
            extracted_at: chrono::Utc::now().to_rfc3339(),
            card_index: Some(index),
            original_href,
            apply_link_found: false,
            synthetic_url,
            selectors_matched: matched,
        },
    })
}

// ── detail-page extraction ───────────────────────────────────────────────────

/// Extract one posting from a job detail page, preferring an explicit
/// apply-action URL over the page's own URL when one can be located.
///
/// Whether a true apply link was found is recorded in the provenance - an
/// apply URL is actionable by the end user, a bare listing URL may not be.
pub fn extract_detail_page(
    html: &str,
    page_url: &str,
    cfg: &HarvestConfig,
    policy: RequiredFields,
) -> Option<JobPosting> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let chains = &cfg.selectors;
    let base = Url::parse(page_url).ok();

    let mut matched = BTreeMap::new();
    let mut sniffed = false;

    let title = first_text(root, &chains.detail_title).map(|(idx, text)| {
        matched.insert("detail_title".to_string(), idx);
        text
    });

    let mut company = None;
    if let Some((idx, text)) = first_text(root, &chains.detail_company) {
        matched.insert("detail_company".to_string(), idx);
        company = Some(text);
    } else if let Some(text) = sniff::sniff_company(root, &cfg.known_employers) {
        sniffed = true;
        company = Some(text);
    }

    let mut location = None;
    if let Some((idx, text)) = first_text(root, &chains.detail_location) {
        matched.insert("detail_location".to_string(), idx);
        location = Some(text);
    } else if let Some(text) = sniff::sniff_location(root) {
        sniffed = true;
        location = Some(text);
    }

    let salary_raw = first_salary(root, &chains.detail_salary).map(|(idx, text)| {
        matched.insert("detail_salary".to_string(), idx);
        text
    });

    let description = first_text(root, &chains.detail_description).map(|(idx, text)| {
        matched.insert("detail_description".to_string(), idx);
        cap_description(text, cfg.description_max_chars)
    });

    // Prefer a dedicated apply-action URL over the page URL.
    let mut apply_url = None;
    if let Some((idx, el)) = first_element(root, &chains.apply) {
        if let Some(href) = el.value().attr("href") {
            matched.insert("apply".to_string(), idx);
            apply_url = match &base {
                Some(b) => b.join(href).map(|u| u.to_string()).ok(),
                None => Some(href.to_string()),
            };
        }
    }
    if apply_url.is_none() {
        if let Some(b) = &base {
            apply_url = sniff::find_apply_link(&doc, b);
            if apply_url.is_some() {
                sniffed = true;
            }
        }
    }

    let apply_link_found = apply_url.is_some();
    let url = apply_url.unwrap_or_else(|| clean_page_url(page_url));

    let (title, company) = finalize_required(title, company, policy)?;

    Some(JobPosting {
        title,
        company,
        location,
        description,
        url,
        source: cfg.source.clone(),
        salary_raw,
        salary_min: None,
        salary_max: None,
        salary_period_assumed: None,
        job_type: None,
        experience_level: None,
        is_remote: false,
        tags: Vec::new(),
        extracted_data: ExtractionMeta {
            page_type: "detail-page".to_string(),
            extraction_method: if sniffed {
                "selector-chain+content-sniff".to_string()
            } else {
                "selector-chain".to_string()
            },
            extracted_at: chrono::Utc::now().to_rfc3339(),
            card_index: None,
            original_href: None,
            apply_link_found,
            synthetic_url: false,
            selectors_matched: matched,
        },
    })
}

/// In-page extractor variant for the browser-extension host: handed the
/// live, authenticated DOM of a page the user is already viewing, so no
/// navigation or stealth applies. Historically this variant accepted a
/// record with either a title or a company, so it runs under
/// [`RequiredFields::TitleOrCompany`] regardless of the engine-wide policy.
pub fn extract_in_page(html: &str, page_url: &str, cfg: &HarvestConfig) -> Option<JobPosting> {
    extract_detail_page(html, page_url, cfg, RequiredFields::TitleOrCompany)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_suffixes_are_stripped() {
        assert_eq!(clean_title("Platform Engineer - job post"), "Platform Engineer");
        assert_eq!(clean_title("Platform Engineer | Indeed.com"), "Platform Engineer");
        assert_eq!(clean_title("  Platform Engineer  "), "Platform Engineer");
    }

    #[test]
    fn page_url_keeps_only_job_key_params() {
        let cleaned = clean_page_url(
            "https://www.example.com/viewjob?jk=abc123&from=serp&tk=tracking&vjk=xyz",
        );
        assert!(cleaned.contains("jk=abc123"));
        assert!(cleaned.contains("vjk=xyz"));
        assert!(!cleaned.contains("tracking"));
        assert!(!cleaned.contains("from=serp"));
    }

    #[test]
    fn and_policy_rejects_missing_company() {
        assert!(finalize_required(
            Some("Backend Engineer".into()),
            None,
            RequiredFields::TitleAndCompany
        )
        .is_none());
    }

    #[test]
    fn or_policy_fills_the_missing_side_with_the_policy_string() {
        let (title, company) = finalize_required(
            Some("Backend Engineer".into()),
            None,
            RequiredFields::TitleOrCompany,
        )
        .unwrap();
        assert_eq!(title, "Backend Engineer");
        assert_eq!(company, FIELD_UNAVAILABLE);
    }

    #[test]
    fn placeholder_scrapes_are_rejected() {
        assert!(finalize_required(
            Some("Not Found".into()),
            Some("Not Found".into()),
            RequiredFields::TitleOrCompany
        )
        .is_none());
    }

    #[test]
    fn short_titles_fail_the_sanity_check() {
        assert!(finalize_required(
            Some("dev".into()),
            Some("Acme".into()),
            RequiredFields::TitleAndCompany
        )
        .is_none());
    }

    #[test]
    fn long_descriptions_are_capped_with_a_marker() {
        let capped = cap_description("x".repeat(50), 10);
        assert_eq!(capped, format!("{}...", "x".repeat(10)));
    }
}
