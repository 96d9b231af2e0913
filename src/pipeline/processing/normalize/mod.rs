pub mod fields;
pub mod website;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::text::{collapse_whitespace, truncate_chars};
use crate::constants::{fields as field_names, UNKNOWN_SOURCE};
use crate::types::{CompanySize, RawRecord, RejectedRecord, RejectionReason};

use self::fields::{normalize_email, parse_company_size};
use self::website::canonicalize_website;

/// Number of optional fields counted towards data quality
pub const OPTIONAL_FIELD_COUNT: usize = 5;

/// A lead in canonical form, derived from one raw record (or from several
/// merged by the deduplicator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLead {
    pub name: String,
    /// Canonical absolute URL, https preferred
    pub website: String,
    /// Scheme-less host and path used to detect duplicates
    pub identity_key: String,
    /// Origin tag of the first record seen for this identity
    pub data_source: String,
    pub industry: Option<String>,
    pub linkedin: Option<String>,
    pub email: Option<String>,
    pub company_size: Option<CompanySize>,
    /// Size text as the source wrote it, kept for classification signals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size_text: Option<String>,
    pub pain_points: Option<String>,
    pub discovered_at: Option<DateTime<Utc>>,
    /// Extra source attributes (github_url, hourly_rate, ...) used as hints
    /// by attribute extraction
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hints: BTreeMap<String, String>,
    /// Sources of later duplicates folded into this lead
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_sources: Vec<String>,
    pub normalization: NormalizationMetadata,
}

impl NormalizedLead {
    /// How many of the optional fields (industry, linkedin, email,
    /// company_size, pain_points) are present
    pub fn optional_fields_present(&self) -> usize {
        [
            self.industry.is_some(),
            self.linkedin.is_some(),
            self.email.is_some(),
            self.company_size.is_some(),
            self.pain_points.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(String::as_str)
    }
}

/// Metadata about the normalization process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationMetadata {
    /// Non-fatal problems, e.g. an email that was dropped
    pub warnings: Vec<String>,
    /// The normalization strategy used
    pub strategy: String,
}

/// Trait for turning raw collector output into canonical leads
pub trait Normalizer {
    /// Normalize one raw record, or explain why it cannot be used
    fn normalize(&self, raw: &RawRecord) -> Result<NormalizedLead, RejectedRecord>;
}

/// Field-by-field normalizer shared by every source
#[derive(Debug, Clone)]
pub struct DefaultNormalizer {
    pub min_name_length: usize,
    pub max_name_length: usize,
}

impl Default for DefaultNormalizer {
    fn default() -> Self {
        Self {
            min_name_length: 2,
            max_name_length: 100,
        }
    }
}

impl DefaultNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn clean_name(&self, raw: &str, warnings: &mut Vec<String>) -> Option<String> {
        let name = collapse_whitespace(raw);
        if name.is_empty() {
            return None;
        }

        let length = name.chars().count();
        if length > self.max_name_length {
            warnings.push(format!(
                "name truncated from {} to {} characters",
                length, self.max_name_length
            ));
            return Some(truncate_chars(&name, self.max_name_length).trim_end().to_string());
        }
        if length < self.min_name_length {
            warnings.push(format!("name '{}' is unusually short", name));
        }
        Some(name)
    }

    fn optional_text(raw: &RawRecord, keys: &[&str]) -> Option<String> {
        raw.first_text(keys)
            .map(|value| collapse_whitespace(&value))
            .filter(|value| !value.is_empty())
    }

    fn extract_linkedin(raw: &RawRecord, warnings: &mut Vec<String>) -> Option<String> {
        let value = Self::optional_text(raw, field_names::LINKEDIN)?;
        match canonicalize_website(&value) {
            Ok(site) => Some(site.url),
            Err(reason) => {
                warnings.push(format!("dropped invalid linkedin: {}", reason));
                None
            }
        }
    }

    fn extract_email(raw: &RawRecord, warnings: &mut Vec<String>) -> Option<String> {
        let value = Self::optional_text(raw, field_names::EMAIL)?;
        let email = normalize_email(&value);
        if email.is_none() {
            warnings.push(format!("dropped invalid email '{}'", value));
        }
        email
    }

    fn extract_hints(raw: &RawRecord) -> BTreeMap<String, String> {
        field_names::HINTS
            .iter()
            .filter_map(|key| Self::optional_text(raw, &[key]).map(|value| (key.to_string(), value)))
            .collect()
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, raw: &RawRecord) -> Result<NormalizedLead, RejectedRecord> {
        let mut warnings = Vec::new();

        let name = raw
            .first_text(field_names::NAME)
            .and_then(|value| self.clean_name(&value, &mut warnings))
            .ok_or_else(|| {
                RejectedRecord::new(raw.clone(), RejectionReason::MissingIdentity, "name is missing or blank")
            })?;

        let website_raw = raw.first_text(field_names::WEBSITE).ok_or_else(|| {
            RejectedRecord::new(raw.clone(), RejectionReason::MissingIdentity, "website is missing or blank")
        })?;
        let website = canonicalize_website(&website_raw)
            .map_err(|reason| RejectedRecord::new(raw.clone(), RejectionReason::InvalidWebsite, reason))?;

        let company_size_text = Self::optional_text(raw, field_names::COMPANY_SIZE);
        let company_size = company_size_text.as_deref().map(|text| {
            let bucket = parse_company_size(text);
            if bucket == CompanySize::Unknown {
                warnings.push(format!("unrecognized company size '{}'", text));
            }
            bucket
        });

        let linkedin = Self::extract_linkedin(raw, &mut warnings);
        let email = Self::extract_email(raw, &mut warnings);

        Ok(NormalizedLead {
            name,
            website: website.url,
            identity_key: website.identity_key,
            data_source: raw.data_source().unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            industry: Self::optional_text(raw, field_names::INDUSTRY),
            linkedin,
            email,
            company_size,
            company_size_text,
            pain_points: Self::optional_text(raw, field_names::PAIN_POINTS),
            discovered_at: raw.discovered_at(),
            hints: Self::extract_hints(raw),
            merged_sources: Vec::new(),
            normalization: NormalizationMetadata {
                warnings,
                strategy: "default_field_normalizer".to_string(),
            },
        })
    }
}
