use once_cell::sync::Lazy;
use regex::Regex;

use crate::common::text::{contains_term, normalize_text};
use crate::types::CompanySize;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}$").expect("valid email regex")
});

/// Integers with an optional "+" / "plus" / "or more" suffix
static HEADCOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d[\d,]*)(\s*(?:\+|plus\b|or more\b))?").expect("valid headcount regex")
});

const SOLO_TERMS: &[&str] = &[
    "solo",
    "individual",
    "freelancer",
    "freelance",
    "self-employed",
    "sole proprietor",
    "one person",
    "just me",
];
const SMALL_TERMS: &[&str] = &["small", "startup", "micro", "small team"];
const MEDIUM_TERMS: &[&str] = &["medium", "mid-size", "midsize", "mid-sized", "growing"];
const LARGE_TERMS: &[&str] = &["large", "enterprise", "corporation", "global", "multinational"];

/// Lower-case and validate an email address; `None` when it does not look
/// like `local@domain.tld`
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("mailto:")
        .or_else(|| trimmed.strip_prefix("MAILTO:"))
        .unwrap_or(trimmed);
    let candidate = without_scheme.to_lowercase();
    EMAIL_PATTERN.is_match(&candidate).then_some(candidate)
}

/// Map free-text company size into an ordinal bucket.
///
/// Solo wording wins, then the largest headcount mentioned, then size words.
/// Anything else is `Unknown`.
pub fn parse_company_size(raw: &str) -> CompanySize {
    let text = normalize_text(raw);
    if text.is_empty() {
        return CompanySize::Unknown;
    }

    if SOLO_TERMS.iter().any(|term| contains_term(&text, term)) {
        return CompanySize::Solo;
    }

    let lowered = raw.to_lowercase();
    let headcount = HEADCOUNT_PATTERN
        .captures_iter(&lowered)
        .filter_map(|caps| {
            let value: u64 = caps[1].replace(',', "").parse().ok()?;
            let open_ended = caps.get(2).is_some();
            // a bare founding year is not a headcount
            if !open_ended && (1900..=2100).contains(&value) && !lowered.contains("employee") {
                return None;
            }
            Some(if open_ended { value.saturating_add(1) } else { value })
        })
        .max();

    if let Some(count) = headcount {
        return match count {
            0 | 1 => CompanySize::Solo,
            2..=10 => CompanySize::Small,
            11..=50 => CompanySize::Medium,
            _ => CompanySize::Large,
        };
    }

    if LARGE_TERMS.iter().any(|term| contains_term(&text, term)) {
        CompanySize::Large
    } else if MEDIUM_TERMS.iter().any(|term| contains_term(&text, term)) {
        CompanySize::Medium
    } else if SMALL_TERMS.iter().any(|term| contains_term(&text, term)) {
        CompanySize::Small
    } else {
        CompanySize::Unknown
    }
}
