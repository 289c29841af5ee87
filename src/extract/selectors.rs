//! Selector fallback chains, kept as *data* rather than code branches.
//!
//! Each field maps to an ordered list of CSS selector alternatives, tried in
//! sequence until one yields non-empty text. Operators override any chain
//! from `job-harvester.json` when the target site ships a markup change -
//! no recompile. The defaults reproduce the chains that survived several
//! generations of the target's markup drift.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorChains {
    /// Repeated "card" structures on a results page. The first selector
    /// yielding any matches wins for the whole page.
    pub cards: Vec<String>,
    /// The title anchor inside a card - also the source of the job URL.
    pub title_link: Vec<String>,
    /// Title text, scoped to the title anchor (falling back to the card).
    pub title: Vec<String>,
    pub company: Vec<String>,
    pub location: Vec<String>,
    pub salary: Vec<String>,
    pub description: Vec<String>,
    /// Document-scoped chains for a single job's detail page.
    pub detail_title: Vec<String>,
    pub detail_company: Vec<String>,
    pub detail_location: Vec<String>,
    pub detail_salary: Vec<String>,
    pub detail_description: Vec<String>,
    /// Explicit apply-action elements on a detail page.
    pub apply: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectorChains {
    fn default() -> Self {
        Self {
            cards: owned(&["[data-jk]", ".jobsearch-SerpJobCard", ".job_seen_beacon"]),
            title_link: owned(&[
                "h2 a[data-jk]",
                "h2 a",
                ".jobTitle a",
                r#"[data-testid="job-title"] a"#,
            ]),
            title: owned(&["span[title]", "span", r#"[data-testid="job-title"]"#]),
            company: owned(&[
                r#"[data-testid="company-name"]"#,
                r#"span[data-testid="company-name"]"#,
                ".companyName a",
                ".companyName span",
                ".companyName",
                ".company",
            ]),
            location: owned(&[
                r#"[data-testid="job-location"]"#,
                r#"[data-testid="text-location"]"#,
                r#"div[data-testid="text-location"]"#,
                ".companyLocation",
                ".location",
            ]),
            salary: owned(&[
                ".salary-snippet-container",
                ".salary-snippet",
                r#"[data-testid="salary-snippet"]"#,
                ".salaryOnly",
                ".estimated-salary",
            ]),
            description: owned(&[
                ".summary",
                ".job-snippet",
                r#"[data-testid="job-snippet"]"#,
            ]),
            detail_title: owned(&[
                r#"[data-testid="jobsearch-JobInfoHeader-title"] span"#,
                ".jobsearch-JobInfoHeader-title span",
                "h1 span[title]",
                "h1",
                "h2",
            ]),
            detail_company: owned(&[
                r#"[data-testid*="companyName"] a"#,
                r#"[data-testid*="companyName"]"#,
                r#"[id*="company"] a"#,
                ".companyName a",
                ".companyName",
                r#"a[href*="/cmp/"]"#,
            ]),
            detail_location: owned(&[
                r#"[data-testid*="location"] span"#,
                r#"[data-testid*="location"]"#,
                r#"[id*="location"]"#,
                ".location",
            ]),
            detail_salary: owned(&[
                ".jobsearch-JobMetadataHeader-item",
                ".salary-snippet",
                r#"[data-testid*="salary"]"#,
            ]),
            detail_description: owned(&[
                "#jobDescriptionText",
                ".jobsearch-JobComponent-description",
                r#"[data-testid*="description"]"#,
            ]),
            apply: owned(&[
                "#applyButtonLinkContainer a",
                r#"[data-testid*="apply"] a"#,
                r#"a[data-testid*="apply"]"#,
                r#"a[href*="apply"]"#,
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chains_are_ordered_lists() {
        let chains = SelectorChains::default();
        assert!(chains.cards.len() >= 2);
        assert!(chains.company.len() >= 3);
        // Primary structural attribute selector comes first.
        assert_eq!(chains.cards[0], "[data-jk]");
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let chains: SelectorChains =
            serde_json::from_str(r#"{"title": ["h3.changed"]}"#).unwrap();
        assert_eq!(chains.title, vec!["h3.changed"]);
        assert_eq!(chains.cards, SelectorChains::default().cards);
    }
}
