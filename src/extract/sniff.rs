//! Content-sniffing fallbacks for when every configured selector misses.
//!
//! These scan leaf text nodes for field-shaped content: a "City, ST 12345"
//! pattern for locations, a known-employer list for companies, apply-ish
//! anchors for the application URL. Last resort by design - a sniffed value
//! is tagged as such in the record's provenance.

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

static LOCATION_RE: OnceLock<Regex> = OnceLock::new();

fn location_re() -> &'static Regex {
    LOCATION_RE.get_or_init(|| {
        // "King of Prussia, PA 19406" / "Austin, TX" - city words may be
        // lowercase after the first, the zip is optional.
        Regex::new(r"\b[A-Z][A-Za-z .'\-]{1,40},\s*[A-Z]{2}(?:\s+\d{5})?\b")
            .expect("valid location pattern")
    })
}

fn leaf_text(el: ElementRef) -> Option<String> {
    if el.children().any(|c| c.value().is_element()) {
        return None;
    }
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn leaves<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = (ElementRef<'a>, String)> + 'a {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|el| leaf_text(el).map(|t| (el, t)))
}

/// Scan leaf text nodes under `scope` for something that reads like a
/// "City, ST 12345" location. Returns the matched fragment, not the whole
/// node text.
pub fn sniff_location(scope: ElementRef) -> Option<String> {
    for (_, text) in leaves(scope) {
        if let Some(m) = location_re().find(&text) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

/// Scan leaf text nodes for a known employer name. Short node text is
/// returned as-is (it usually *is* the company element); long text falls
/// back to the canonical name from the configured list.
pub fn sniff_company(scope: ElementRef, known_employers: &[String]) -> Option<String> {
    if known_employers.is_empty() {
        return None;
    }
    let matcher = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(known_employers)
        .ok()?;

    for (_, text) in leaves(scope) {
        if let Some(m) = matcher.find(&text) {
            if text.len() <= 100 {
                return Some(text);
            }
            return Some(known_employers[m.pattern().as_usize()].clone());
        }
    }
    None
}

/// Hunt a detail page for an explicit apply-action link: an anchor whose
/// href, text, or data attributes indicate an application action. Returns
/// the absolute URL when found.
pub fn find_apply_link(doc: &Html, base: &Url) -> Option<String> {
    let anchors = Selector::parse("a[href]").ok()?;
    for a in doc.select(&anchors) {
        let href = a.value().attr("href")?;
        let text = a.text().collect::<Vec<_>>().join(" ").to_lowercase();
        let attrs_applyish = a.value().attrs().any(|(name, value)| {
            (name.starts_with("data-") || name == "id" || name == "aria-label")
                && value.to_lowercase().contains("apply")
        });

        if href.to_lowercase().contains("apply")
            || text.contains("apply")
            || attrs_applyish
        {
            if let Ok(resolved) = base.join(href) {
                return Some(resolved.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn location_pattern_matches_city_state_zip() {
        let html = doc(
            "<div><span>Posted today</span><span>King of Prussia, PA 19406</span></div>",
        );
        let got = sniff_location(html.root_element()).unwrap();
        assert_eq!(got, "King of Prussia, PA 19406");
    }

    #[test]
    fn location_pattern_matches_without_zip() {
        let html = doc("<p>Role based in Austin, TX (hybrid)</p>");
        assert_eq!(sniff_location(html.root_element()).unwrap(), "Austin, TX");
    }

    #[test]
    fn no_location_shaped_text_yields_none() {
        let html = doc("<p>fully remote, apply below</p>");
        assert!(sniff_location(html.root_element()).is_none());
    }

    #[test]
    fn company_sniff_prefers_the_short_node_text() {
        let html = doc("<div><span>Lockheed Martin</span></div>");
        let known = vec!["Lockheed Martin".to_string()];
        assert_eq!(
            sniff_company(html.root_element(), &known).unwrap(),
            "Lockheed Martin"
        );
    }

    #[test]
    fn apply_link_found_by_href_substring() {
        let html = doc(r#"<a href="/viewjob/apply?jk=abc">Apply now</a>"#);
        let base = Url::parse("https://www.example.com/viewjob?jk=abc").unwrap();
        let got = find_apply_link(&html, &base).unwrap();
        assert!(got.starts_with("https://www.example.com/viewjob/apply"));
    }

    #[test]
    fn apply_link_found_by_data_attribute() {
        let html = doc(r#"<a href="/forward?x=1" data-testid="applyButton">Go</a>"#);
        let base = Url::parse("https://www.example.com/").unwrap();
        assert!(find_apply_link(&html, &base).is_some());
    }
}
