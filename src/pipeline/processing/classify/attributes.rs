use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::common::text::{matched_terms, normalize_text};
use crate::pipeline::processing::normalize::NormalizedLead;
use crate::types::LeadCategory;

static HOURLY_RATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$\s?(\d+(?:\.\d+)?)\s?(?:/|per)\s?(?:hr|hour|h)\b").expect("valid hourly rate regex")
});

static REVENUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$\s?\d+(?:[.,]\d+)?\s?(?:k|mm|m|b|million|billion)\b").expect("valid revenue regex")
});

const DECISION_MAKER_ROLES: &[&str] = &[
    "co-founder",
    "founder",
    "ceo",
    "cto",
    "owner",
    "managing director",
    "director",
    "president",
    "managing partner",
    "head of operations",
];

const SENIOR_TERMS: &[&str] = &["senior", "sr", "lead", "principal", "staff engineer", "expert", "architect"];
const MID_TERMS: &[&str] = &["mid-level", "mid level", "intermediate"];
const JUNIOR_TERMS: &[&str] = &["junior", "jr", "entry level", "graduate", "intern", "bootcamp"];

const AVAILABILITY_PHRASES: &[&str] = &[
    "available now",
    "available immediately",
    "immediately available",
    "open to work",
    "open to new projects",
    "accepting new clients",
    "full-time",
    "part-time",
    "contract",
    "weekends",
];

/// Attributes only a business lead carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessAttributes {
    pub annual_revenue: Option<String>,
    pub tech_stack: Vec<String>,
    pub automation_needs: Vec<String>,
    pub decision_maker: Option<String>,
    pub location: Option<String>,
}

/// Attributes only a developer lead carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeveloperAttributes {
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    pub hourly_rate: Option<String>,
    pub availability: Option<String>,
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
}

/// Category-specific attributes; a lead holds exactly one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryAttributes {
    Business(BusinessAttributes),
    Developer(DeveloperAttributes),
}

impl CategoryAttributes {
    pub fn category(&self) -> LeadCategory {
        match self {
            CategoryAttributes::Business(_) => LeadCategory::Business,
            CategoryAttributes::Developer(_) => LeadCategory::Developer,
        }
    }

    pub fn as_business(&self) -> Option<&BusinessAttributes> {
        match self {
            CategoryAttributes::Business(attrs) => Some(attrs),
            CategoryAttributes::Developer(_) => None,
        }
    }

    pub fn as_developer(&self) -> Option<&DeveloperAttributes> {
        match self {
            CategoryAttributes::Developer(attrs) => Some(attrs),
            CategoryAttributes::Business(_) => None,
        }
    }
}

/// Vocabularies the extractors match against
pub struct AttributeVocabulary<'a> {
    pub technologies: &'a [String],
    pub automation_indicators: &'a [String],
}

/// Free-text fields searched by the heuristics
fn searchable_fields(lead: &NormalizedLead) -> Vec<&str> {
    [
        Some(lead.name.as_str()),
        lead.industry.as_deref(),
        lead.pain_points.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Union of vocabulary hits over several fields, in discovery order.
///
/// Fields are matched one at a time so a phrase never spans two fields.
fn hits_across<S: AsRef<str>>(fields: &[&str], vocabulary: &[S]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut hits = Vec::new();
    for field in fields {
        for term in matched_terms(field, vocabulary) {
            let key = normalize_text(term);
            if !seen.contains(&key) {
                seen.push(key);
                hits.push(term.to_string());
            }
        }
    }
    hits
}

/// Distinct automation indicators mentioned in pain points or industry
pub fn automation_hits(lead: &NormalizedLead, indicators: &[String]) -> Vec<String> {
    let fields: Vec<&str> = [lead.pain_points.as_deref(), lead.industry.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    hits_across(&fields, indicators)
}

/// Split a hint like "Shopify, Stripe; Zapier" into trimmed items
fn split_list(hint: &str) -> Vec<String> {
    hint.split([',', ';', '|'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn first_phrase(fields: &[&str], phrases: &[&str]) -> Option<String> {
    hits_across(fields, phrases).into_iter().next()
}

fn experience_level(fields: &[&str]) -> Option<String> {
    if first_phrase(fields, SENIOR_TERMS).is_some() {
        Some("senior".to_string())
    } else if first_phrase(fields, JUNIOR_TERMS).is_some() {
        Some("junior".to_string())
    } else if first_phrase(fields, MID_TERMS).is_some() {
        Some("mid".to_string())
    } else {
        None
    }
}

fn hourly_rate(fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        HOURLY_RATE_PATTERN
            .captures(field)
            .map(|caps| format!("${}/hr", &caps[1]))
    })
}

fn annual_revenue(fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| REVENUE_PATTERN.find(field).map(|m| m.as_str().to_string()))
}

fn is_github(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.trim_start_matches("www.") == "github.com"))
        .unwrap_or(false)
}

/// Fill business attributes; explicit hints win over heuristics
pub fn extract_business(lead: &NormalizedLead, vocabulary: &AttributeVocabulary<'_>) -> BusinessAttributes {
    let fields = searchable_fields(lead);

    BusinessAttributes {
        annual_revenue: lead
            .hint("annual_revenue")
            .map(String::from)
            .or_else(|| annual_revenue(&fields)),
        tech_stack: lead
            .hint("tech_stack")
            .map(split_list)
            .unwrap_or_else(|| hits_across(&fields, vocabulary.technologies)),
        automation_needs: lead
            .hint("automation_needs")
            .map(split_list)
            .unwrap_or_else(|| automation_hits(lead, vocabulary.automation_indicators)),
        decision_maker: lead
            .hint("decision_maker")
            .map(String::from)
            .or_else(|| first_phrase(&fields, DECISION_MAKER_ROLES)),
        location: lead.hint("location").map(String::from),
    }
}

/// Fill developer attributes; explicit hints win over heuristics
pub fn extract_developer(lead: &NormalizedLead, vocabulary: &AttributeVocabulary<'_>) -> DeveloperAttributes {
    let fields = searchable_fields(lead);

    let github_url = lead
        .hint("github_url")
        .map(String::from)
        .or_else(|| is_github(&lead.website).then(|| lead.website.clone()));

    DeveloperAttributes {
        skills: lead
            .hint("skills")
            .map(split_list)
            .unwrap_or_else(|| hits_across(&fields, vocabulary.technologies)),
        experience_level: lead
            .hint("experience_level")
            .map(String::from)
            .or_else(|| experience_level(&fields)),
        hourly_rate: lead
            .hint("hourly_rate")
            .map(String::from)
            .or_else(|| hourly_rate(&fields)),
        availability: lead
            .hint("availability")
            .map(String::from)
            .or_else(|| first_phrase(&fields, AVAILABILITY_PHRASES)),
        portfolio_url: lead
            .hint("portfolio_url")
            .map(String::from)
            .or_else(|| Some(lead.website.clone())),
        github_url,
    }
}
