//! Keyword-rule classification applied before a record is persisted:
//! job type, experience level, remote flag, and technology tags.

use aho_corasick::{AhoCorasick, MatchKind};
use std::sync::OnceLock;

use crate::core::types::JobPosting;

/// Fixed technology vocabulary scanned over title + description.
/// Ordered so longer variants shadow their substrings under
/// leftmost-longest matching ("javascript" never also tags "java").
const TECH_KEYWORDS: &[&str] = &[
    "javascript",
    "typescript",
    "react",
    "node",
    "python",
    "java",
    "sql",
    "aws",
    "docker",
    "kubernetes",
    "rust",
];

const MAX_TAGS: usize = 10;

static TAG_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

fn tag_matcher() -> &'static AhoCorasick {
    TAG_MATCHER.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(TECH_KEYWORDS)
            .expect("valid tag vocabulary")
    })
}

pub fn detect_job_type(title: &str) -> &'static str {
    let t = title.to_lowercase();
    if t.contains("intern") {
        "internship"
    } else if t.contains("contract") {
        "contract"
    } else if t.contains("part-time") || t.contains("part time") {
        "part-time"
    } else {
        "full-time"
    }
}

pub fn detect_experience_level(title: &str, description: Option<&str>) -> &'static str {
    let text = format!("{} {}", title, description.unwrap_or("")).to_lowercase();
    if text.contains("intern") {
        "internship"
    } else if text.contains("entry level") || text.contains("junior") {
        "entry-level"
    } else if text.contains("senior") || text.contains("staff") || text.contains("principal") {
        "senior"
    } else if text.contains("mid-level") || text.contains("mid level") {
        "mid-level"
    } else {
        "entry-level"
    }
}

pub fn detect_remote(title: &str, description: Option<&str>, location: Option<&str>) -> bool {
    let text = format!(
        "{} {} {}",
        title,
        description.unwrap_or(""),
        location.unwrap_or("")
    )
    .to_lowercase();
    text.contains("remote") || text.contains("work from home")
}

/// Technology tags found in title + description, deduplicated, capped.
pub fn extract_tags(title: &str, description: Option<&str>) -> Vec<String> {
    let text = format!("{} {}", title, description.unwrap_or("")).to_lowercase();
    let mut tags = Vec::new();
    for m in tag_matcher().find_iter(&text) {
        let tag = TECH_KEYWORDS[m.pattern().as_usize()];
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Fill the derived classification fields on a posting in place.
pub fn enrich(posting: &mut JobPosting) {
    posting.job_type = Some(detect_job_type(&posting.title).to_string());
    posting.experience_level = Some(
        detect_experience_level(&posting.title, posting.description.as_deref()).to_string(),
    );
    posting.is_remote = detect_remote(
        &posting.title,
        posting.description.as_deref(),
        posting.location.as_deref(),
    );
    posting.tags = extract_tags(&posting.title, posting.description.as_deref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_from_title_keywords() {
        assert_eq!(detect_job_type("Software Engineering Intern"), "internship");
        assert_eq!(detect_job_type("DevOps Engineer (Contract)"), "contract");
        assert_eq!(detect_job_type("Backend Developer"), "full-time");
    }

    #[test]
    fn experience_level_prefers_intern_then_junior() {
        assert_eq!(detect_experience_level("SWE Intern", None), "internship");
        assert_eq!(
            detect_experience_level("Junior Developer", Some("great team")),
            "entry-level"
        );
        assert_eq!(detect_experience_level("Senior Rust Engineer", None), "senior");
        assert_eq!(detect_experience_level("Web Developer", None), "entry-level");
    }

    #[test]
    fn remote_flag_checks_all_three_fields() {
        assert!(detect_remote("Engineer", None, Some("Remote, US")));
        assert!(detect_remote("Engineer", Some("work from home ok"), None));
        assert!(!detect_remote("Engineer", Some("on-site"), Some("Boston, MA")));
    }

    #[test]
    fn javascript_does_not_also_tag_java() {
        let tags = extract_tags("JavaScript Developer", None);
        assert_eq!(tags, vec!["javascript"]);
    }

    #[test]
    fn tags_are_deduped_and_collected_across_fields() {
        let tags = extract_tags(
            "Python Engineer",
            Some("Python, SQL and AWS experience. More Python."),
        );
        assert_eq!(tags, vec!["python", "sql", "aws"]);
    }
}
