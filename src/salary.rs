//! Free-text compensation parsing.
//!
//! Job boards render salary in a handful of notations - `$45,000 - $60,000 a
//! year`, `$28 an hour`, `45k-65k` - and the normalizer reduces all of them
//! to an annualized numeric range. Text with no recognizable money token
//! yields `{None, None}`; the parser never guesses.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Periodicity the parser detected (and annualized from). Stored alongside
/// the derived range so the assumption is auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hourly,
    Monthly,
    Yearly,
}

/// Annualized numeric range derived from a raw compensation string.
///
/// Invariant: `min <= max` whenever both are present (held by construction -
/// they are the extremes of the same token set).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalaryRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub period_assumed: Option<SalaryPeriod>,
}

const HOURS_PER_YEAR: f64 = 2_080.0;
const MONTHS_PER_YEAR: f64 = 12.0;

static MONEY_TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn money_token_re() -> &'static Regex {
    MONEY_TOKEN_RE.get_or_init(|| {
        // Two token shapes in one scan:
        //   group 1 - currency amount, optional thousands separators: $45,000 / $22.50
        //   group 2 - bare number, only accepted with a k/K suffix: 45k
        //   group 3 - the k/K shorthand suffix (×1000), valid for either shape
        Regex::new(r"(?:\$\s?(\d{1,3}(?:,\d{3})*(?:\.\d+)?)|\b(\d+(?:\.\d+)?))\s*([kK]\b)?")
            .expect("valid money token pattern")
    })
}

fn detect_period(lower: &str) -> SalaryPeriod {
    const HOURLY: &[&str] = &["/hr", "/hour", "per hour", "an hour", "hourly"];
    const MONTHLY: &[&str] = &["/mo", "/month", "per month", "a month", "monthly"];
    if HOURLY.iter().any(|n| lower.contains(n)) {
        SalaryPeriod::Hourly
    } else if MONTHLY.iter().any(|n| lower.contains(n)) {
        SalaryPeriod::Monthly
    } else {
        SalaryPeriod::Yearly
    }
}

/// Parse a raw compensation string into an annualized `(min, max)` range.
///
/// All money tokens in the text are collected; `min`/`max` are their
/// extremes. Hourly and monthly figures are annualized (×2080 / ×12) and the
/// detected periodicity is recorded in `period_assumed`.
pub fn parse_range(raw: &str) -> SalaryRange {
    let lower = raw.to_lowercase();
    let period = detect_period(&lower);

    let mut values: Vec<f64> = Vec::new();
    for caps in money_token_re().captures_iter(raw) {
        let k_suffix = caps.get(3).is_some();
        let token = match (caps.get(1), caps.get(2)) {
            (Some(currency), _) => currency.as_str(),
            // A bare number is only a money token with the k shorthand;
            // otherwise it is zip codes, years, "401(k)" noise.
            (None, Some(bare)) if k_suffix => bare.as_str(),
            _ => continue,
        };
        let Ok(mut value) = token.replace(',', "").parse::<f64>() else {
            continue;
        };
        if k_suffix {
            value *= 1_000.0;
        }
        value *= match period {
            SalaryPeriod::Hourly => HOURS_PER_YEAR,
            SalaryPeriod::Monthly => MONTHS_PER_YEAR,
            SalaryPeriod::Yearly => 1.0,
        };
        values.push(value);
    }

    if values.is_empty() {
        return SalaryRange::default();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    SalaryRange {
        min: Some(min.round() as u64),
        max: Some(max.round() as u64),
        period_assumed: Some(period),
    }
}

/// Fill the derived salary fields on a posting from its raw text, if any.
pub fn enrich(posting: &mut crate::core::types::JobPosting) {
    if let Some(raw) = &posting.salary_raw {
        let range = parse_range(raw);
        posting.salary_min = range.min;
        posting.salary_max = range.max;
        posting.salary_period_assumed = range.period_assumed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_range_with_separators() {
        let r = parse_range("$40,000 - $60,000 a year");
        assert_eq!((r.min, r.max), (Some(40_000), Some(60_000)));
        assert_eq!(r.period_assumed, Some(SalaryPeriod::Yearly));
    }

    #[test]
    fn single_k_shorthand_gives_a_point_range() {
        let r = parse_range("$45K");
        assert_eq!((r.min, r.max), (Some(45_000), Some(45_000)));
    }

    #[test]
    fn bare_k_range() {
        let r = parse_range("45k-65k DOE");
        assert_eq!((r.min, r.max), (Some(45_000), Some(65_000)));
    }

    #[test]
    fn no_digits_yields_nulls() {
        let r = parse_range("Competitive compensation");
        assert_eq!(r, SalaryRange::default());
        assert!(r.period_assumed.is_none());
    }

    #[test]
    fn hourly_rates_are_annualized() {
        let r = parse_range("$25 - $35 an hour");
        assert_eq!((r.min, r.max), (Some(52_000), Some(72_800)));
        assert_eq!(r.period_assumed, Some(SalaryPeriod::Hourly));
    }

    #[test]
    fn monthly_rates_are_annualized() {
        let r = parse_range("$5,000 per month");
        assert_eq!((r.min, r.max), (Some(60_000), Some(60_000)));
        assert_eq!(r.period_assumed, Some(SalaryPeriod::Monthly));
    }

    #[test]
    fn bare_numbers_without_k_are_not_money() {
        // "401(k)" and zip-code-like digits must not become salary figures.
        let r = parse_range("401(k) matching, office in 19406");
        assert_eq!(r, SalaryRange::default());
    }

    #[test]
    fn min_never_exceeds_max() {
        for raw in ["$90,000 - $70,000", "$10 - $80,000", "$55K - $45K"] {
            let r = parse_range(raw);
            assert!(r.min.unwrap() <= r.max.unwrap(), "violated for {raw}");
        }
    }

    #[test]
    fn decimal_hourly_rate() {
        let r = parse_range("$22.50/hr");
        assert_eq!((r.min, r.max), (Some(46_800), Some(46_800)));
    }
}
