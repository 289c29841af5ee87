//! Extraction-engine tests against fixture markup: selector fallback
//! ordering, required-field policies, apply-link preference, and graceful
//! degradation under markup drift.

use job_harvester::core::HarvestConfig;
use job_harvester::extract::{
    extract_detail_page, extract_in_page, extract_results_page, FIELD_UNAVAILABLE,
};
use job_harvester::RequiredFields;

fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

const RESULTS_PAGE: &str = r#"
<html><body><div id="results">
  <div class="job_seen_beacon" data-jk="abc111">
    <h2 class="jobTitle"><a href="/viewjob?jk=abc111"><span title="Junior Developer">Junior Developer</span></a></h2>
    <span data-testid="company-name">Initech</span>
    <div data-testid="text-location">Austin, TX 78701</div>
    <div class="salary-snippet-container">$55,000 - $70,000 a year</div>
    <div class="job-snippet">Build internal tools with React and SQL.</div>
  </div>
  <div class="job_seen_beacon" data-jk="def222">
    <h2 class="jobTitle"><a href="/viewjob?jk=def222"><span title="Frontend Developer">Frontend Developer</span></a></h2>
    <span data-testid="company-name">Hooli</span>
    <div data-testid="text-location">Remote</div>
    <div class="salary-snippet-container">45k-65k</div>
    <div class="job-snippet">JavaScript and TypeScript, fully remote.</div>
  </div>
  <div class="job_seen_beacon" data-jk="ghi333">
    <h2 class="jobTitle"><a href="/viewjob?jk=ghi333"><span title="QA Engineer">QA Engineer</span></a></h2>
    <span data-testid="company-name">Globex</span>
    <div data-testid="text-location">Springfield, IL</div>
  </div>
  <div class="job_seen_beacon" data-jk="bad444">
    <h2 class="jobTitle"><a href="/viewjob?jk=bad444"><span title="Ghost Posting">Ghost Posting</span></a></h2>
    <div data-testid="text-location">Nowhere, KS</div>
  </div>
</div></body></html>
"#;

const PAGE_URL: &str = "https://www.indeed.com/jobs?q=junior+developer&fromage=14";

#[test]
fn results_page_returns_only_well_formed_cards() {
    init_logger();
    let cfg = HarvestConfig::default();

    let records = extract_results_page(RESULTS_PAGE, PAGE_URL, &cfg);

    // 3 well-formed cards, 1 malformed (missing company) dropped.
    assert_eq!(records.len(), 3);
    for record in &records {
        assert!(!record.title.is_empty());
        assert!(!record.company.is_empty());
        assert!(record.url.starts_with("https://www.indeed.com/viewjob?jk="));
        assert!(!record.extracted_data.synthetic_url);
    }
    assert_eq!(records[0].title, "Junior Developer");
    assert_eq!(records[0].company, "Initech");
    assert_eq!(records[0].location.as_deref(), Some("Austin, TX 78701"));
    assert_eq!(
        records[0].salary_raw.as_deref(),
        Some("$55,000 - $70,000 a year")
    );
    // Third card simply has no salary snippet.
    assert!(records[2].salary_raw.is_none());
}

#[test]
fn matched_selector_indices_are_recorded() {
    init_logger();
    let cfg = HarvestConfig::default();

    let records = extract_results_page(RESULTS_PAGE, PAGE_URL, &cfg);
    let meta = &records[0].extracted_data;

    // Card selector "[data-jk]" is the first alternative.
    assert_eq!(meta.selectors_matched.get("cards"), Some(&0));
    // The anchor carries no data-jk, so "h2 a[data-jk]" misses and "h2 a"
    // (index 1) matches.
    assert_eq!(meta.selectors_matched.get("title_link"), Some(&1));
    // "span[title]" inside the anchor is the first title alternative.
    assert_eq!(meta.selectors_matched.get("title"), Some(&0));
    assert_eq!(meta.selectors_matched.get("company"), Some(&0));
    // "[data-testid=\"job-location\"]" misses, "[data-testid=\"text-location\"]" hits.
    assert_eq!(meta.selectors_matched.get("location"), Some(&1));
    assert_eq!(meta.page_type, "results-page");
    assert_eq!(meta.card_index, Some(0));
}

#[test]
fn third_of_five_title_selectors_matches_and_is_recorded() {
    init_logger();
    let mut cfg = HarvestConfig::default();
    cfg.selectors.title = vec![
        "h4.headline".to_string(),
        ".title-alpha".to_string(),
        ".title-charlie".to_string(),
        ".title-delta".to_string(),
        ".title-echo".to_string(),
    ];

    let html = r#"
    <div class="job_seen_beacon">
      <div class="title-charlie">Platform Engineer</div>
      <span data-testid="company-name">Initech</span>
    </div>"#;

    let records = extract_results_page(html, PAGE_URL, &cfg);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Platform Engineer");
    assert_eq!(
        records[0].extracted_data.selectors_matched.get("title"),
        Some(&2)
    );
}

#[test]
fn card_without_href_gets_a_synthetic_positional_key() {
    let cfg = HarvestConfig::default();
    let html = r#"
    <div class="job_seen_beacon">
      <span class="jobTitle"><span title="Data Analyst">Data Analyst</span></span>
      <span data-testid="company-name">Initech</span>
    </div>"#;

    let records = extract_results_page(html, PAGE_URL, &cfg);
    assert_eq!(records.len(), 1);
    assert!(records[0].extracted_data.synthetic_url);
    assert_eq!(records[0].url, format!("{}#card-0", PAGE_URL));
}

#[test]
fn markup_drift_degrades_to_zero_records_not_a_crash() {
    let cfg = HarvestConfig::default();
    let records = extract_results_page(
        "<html><body><table><tr><td>totally different markup</td></tr></table></body></html>",
        PAGE_URL,
        &cfg,
    );
    assert!(records.is_empty());
}

#[test]
fn company_falls_back_to_known_employer_sniffing() {
    init_logger();
    let cfg = HarvestConfig::default();
    // No selector in the company chain matches; the employer name only
    // appears as free text.
    let html = r#"
    <div class="job_seen_beacon">
      <h2><a href="/viewjob?jk=lm1"><span title="Systems Engineer">Systems Engineer</span></a></h2>
      <div class="misc"><span>Lockheed Martin</span></div>
    </div>"#;

    let records = extract_results_page(html, PAGE_URL, &cfg);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].company, "Lockheed Martin");
    assert_eq!(
        records[0].extracted_data.extraction_method,
        "selector-chain+content-sniff"
    );
}

const DETAIL_PAGE: &str = r#"
<html><body>
  <h1><span title="Full Stack Engineer - job post">Full Stack Engineer - job post</span></h1>
  <div data-testid="companyName-block"><a href="/cmp/lockheed-martin">Lockheed Martin</a></div>
  <div data-testid="job-location"><span>King of Prussia, PA 19406</span></div>
  <div id="jobDescriptionText">Develop mission systems software. Java and AWS required.</div>
  <div id="applyButtonLinkContainer"><a href="https://apply.example.com/job/123">Apply now</a></div>
</body></html>
"#;

const DETAIL_URL: &str = "https://www.indeed.com/viewjob?jk=xyz999&from=email&tk=tracker";

#[test]
fn detail_page_prefers_the_apply_link_as_url() {
    init_logger();
    let cfg = HarvestConfig::default();

    let record =
        extract_detail_page(DETAIL_PAGE, DETAIL_URL, &cfg, RequiredFields::TitleAndCompany)
            .expect("detail page should extract");

    assert_eq!(record.title, "Full Stack Engineer");
    assert_eq!(record.company, "Lockheed Martin");
    assert_eq!(
        record.location.as_deref(),
        Some("King of Prussia, PA 19406")
    );
    assert_eq!(record.url, "https://apply.example.com/job/123");
    assert!(record.extracted_data.apply_link_found);
    assert_eq!(record.extracted_data.page_type, "detail-page");
}

#[test]
fn detail_page_without_apply_link_falls_back_to_cleaned_page_url() {
    let cfg = HarvestConfig::default();
    let html = r#"
    <html><body>
      <h1><span title="Backend Engineer">Backend Engineer</span></h1>
      <div data-testid="companyName-block">Globex</div>
      <div id="jobDescriptionText">Ship services.</div>
    </body></html>"#;

    let record = extract_detail_page(html, DETAIL_URL, &cfg, RequiredFields::TitleAndCompany)
        .expect("detail page should extract");

    assert!(!record.extracted_data.apply_link_found);
    assert!(record.url.contains("jk=xyz999"));
    assert!(!record.url.contains("from=email"));
    assert!(!record.url.contains("tk=tracker"));
}

#[test]
fn in_page_variant_accepts_title_without_company() {
    let cfg = HarvestConfig::default();
    let html = r#"
    <html><body>
      <h1><span title="Embedded Engineer">Embedded Engineer</span></h1>
      <div id="jobDescriptionText">Firmware role.</div>
    </body></html>"#;

    let record = extract_in_page(html, DETAIL_URL, &cfg).expect("or-policy should accept");
    assert_eq!(record.title, "Embedded Engineer");
    assert_eq!(record.company, FIELD_UNAVAILABLE);

    // The engine-wide and-policy rejects the same page.
    assert!(extract_detail_page(html, DETAIL_URL, &cfg, RequiredFields::TitleAndCompany).is_none());
}

#[test]
fn fully_empty_detail_page_extracts_nothing() {
    let cfg = HarvestConfig::default();
    assert!(extract_in_page("<html><body></body></html>", DETAIL_URL, &cfg).is_none());
}
