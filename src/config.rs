use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::common::text::{contains_term, normalize_text};
use crate::constants::{default_source_priorities, DEFAULT_SOURCE_PRIORITY};
use crate::error::{ConfigError, PipelineError, Result};
use crate::types::CompanySize;

/// Default config file looked up by the CLI
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "LEAD_PIPELINE_CONFIG";

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Everything the classifier, scorer and orchestrator read from outside.
///
/// Each section falls back to its defaults, so a TOML file only has to list
/// what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadConfig {
    pub pipeline: PipelineSettings,
    pub scoring: ScoringConfig,
    pub classifier: ClassifierConfig,
    pub sources: SourceSettings,
}

impl LeadConfig {
    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigFile(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LeadConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant that would otherwise bias the whole run
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.scoring.validate()?;
        self.classifier.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Minimum fit score for a lead to qualify
    pub min_score: f64,
    /// Stop scoring once this many leads have qualified
    pub target_total_leads: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_score: 7.0,
            target_total_leads: 20,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(1.0..=10.0).contains(&self.min_score) {
            return Err(ConfigError::MinScoreOutOfRange(self.min_score));
        }
        if self.target_total_leads == 0 {
            return Err(ConfigError::ZeroTargetLeads);
        }
        Ok(())
    }
}

/// Weights of the five sub-scores; they must sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub company_size: f64,
    pub automation_indicators: f64,
    pub industry_relevance: f64,
    pub data_quality: f64,
    pub contact_availability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            company_size: 0.25,
            automation_indicators: 0.30,
            industry_relevance: 0.20,
            data_quality: 0.15,
            contact_availability: 0.10,
        }
    }
}

impl ScoringWeights {
    /// Weights paired with their sub-score names
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("company_size", self.company_size),
            ("automation_indicators", self.automation_indicators),
            ("industry_relevance", self.industry_relevance),
            ("data_quality", self.data_quality),
            ("contact_availability", self.contact_availability),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.entries().iter().map(|(_, w)| w).sum()
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (name, value) in self.entries() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::WeightOutOfRange { name, value });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }
}

/// Company-size sub-score per bucket for one classification branch.
///
/// `unknown` also applies when the record carried no size at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompanySizeTable {
    pub solo: f64,
    pub small: f64,
    pub medium: f64,
    pub large: f64,
    pub unknown: f64,
}

impl CompanySizeTable {
    pub fn business_default() -> Self {
        Self {
            solo: 9.0,
            small: 8.0,
            medium: 6.0,
            large: 3.0,
            unknown: 5.0,
        }
    }

    /// Developers are individuals first, so a missing size reads as solo
    pub fn developer_default() -> Self {
        Self {
            solo: 10.0,
            small: 8.0,
            medium: 5.0,
            large: 2.0,
            unknown: 10.0,
        }
    }

    /// Bucket scores paired with their bucket names
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("solo", self.solo),
            ("small", self.small),
            ("medium", self.medium),
            ("large", self.large),
            ("unknown", self.unknown),
        ]
    }

    pub fn validate(&self, table: &'static str) -> std::result::Result<(), ConfigError> {
        for (bucket, value) in self.entries() {
            if !(0.0..=10.0).contains(&value) {
                return Err(ConfigError::CompanySizeScoreOutOfRange { table, bucket, value });
            }
        }
        Ok(())
    }

    pub fn lookup(&self, size: Option<CompanySize>) -> f64 {
        match size {
            Some(CompanySize::Solo) => self.solo,
            Some(CompanySize::Small) => self.small,
            Some(CompanySize::Medium) => self.medium,
            Some(CompanySize::Large) => self.large,
            Some(CompanySize::Unknown) | None => self.unknown,
        }
    }
}

/// An industry text resolved against the configured table
#[derive(Debug, Clone, PartialEq)]
pub struct IndustryMatch {
    pub key: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Industry key (snake_case) to relevance score
    pub industry_scores: BTreeMap<String, f64>,
    /// Free-text keyword to industry key
    pub industry_aliases: BTreeMap<String, String>,
    /// Relevance used when the industry is absent or unrecognized
    pub unknown_industry_score: f64,
    /// Phrases that signal work worth automating
    pub automation_indicators: Vec<String>,
    /// Distinct indicator hits needed for a full automation score
    pub automation_hit_threshold: usize,
    pub business_company_size: CompanySizeTable,
    pub developer_company_size: CompanySizeTable,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let industry_scores = [
            ("web_design", 9.0),
            ("digital_marketing", 8.0),
            ("ecommerce", 9.0),
            ("saas", 8.0),
            ("consulting", 7.0),
            ("real_estate", 6.0),
            ("healthcare", 5.0),
            ("education", 6.0),
            ("finance", 7.0),
            ("retail", 8.0),
            ("manufacturing", 6.0),
            ("other", 5.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let industry_aliases = [
            ("software", "saas"),
            ("tech", "saas"),
            ("technology", "saas"),
            ("startup", "saas"),
            ("agency", "digital_marketing"),
            ("marketing", "digital_marketing"),
            ("seo", "digital_marketing"),
            ("advertising", "digital_marketing"),
            ("web development", "web_design"),
            ("website design", "web_design"),
            ("web designers", "web_design"),
            ("online store", "ecommerce"),
            ("e-commerce", "ecommerce"),
            ("shopify", "ecommerce"),
            ("store", "retail"),
            ("shop", "retail"),
            ("consultancy", "consulting"),
            ("freelance", "consulting"),
            ("property", "real_estate"),
            ("realty", "real_estate"),
            ("medical", "healthcare"),
            ("clinic", "healthcare"),
            ("dental", "healthcare"),
            ("school", "education"),
            ("tutoring", "education"),
            ("accounting", "finance"),
            ("insurance", "finance"),
            ("fintech", "finance"),
            ("factory", "manufacturing"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let automation_indicators = [
            "repetitive tasks",
            "repetitive data entry",
            "manual scheduling",
            "appointment scheduling",
            "high inquiry volume",
            "customer inquiries",
            "inventory management",
            "customer touchpoints",
            "contact forms",
            "social media updates",
            "booking systems",
            "lead follow up",
            "invoicing",
            "reporting",
            "client communication",
            "project management",
            "order processing",
            "email campaigns",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            weights: ScoringWeights::default(),
            industry_scores,
            industry_aliases,
            unknown_industry_score: 4.0,
            automation_indicators,
            automation_hit_threshold: 2,
            business_company_size: CompanySizeTable::business_default(),
            developer_company_size: CompanySizeTable::developer_default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.weights.validate()?;
        if self.industry_scores.is_empty() {
            return Err(ConfigError::EmptyIndustryTable);
        }
        for (industry, value) in &self.industry_scores {
            if !(0.0..=10.0).contains(value) {
                return Err(ConfigError::IndustryScoreOutOfRange {
                    industry: industry.clone(),
                    value: *value,
                });
            }
        }
        if !(0.0..=10.0).contains(&self.unknown_industry_score) {
            return Err(ConfigError::UnknownIndustryScoreOutOfRange(self.unknown_industry_score));
        }
        self.business_company_size.validate("business_company_size")?;
        self.developer_company_size.validate("developer_company_size")?;
        if self.automation_hit_threshold == 0 {
            return Err(ConfigError::ZeroAutomationThreshold);
        }
        if self.automation_indicators.is_empty() {
            return Err(ConfigError::EmptyKeywordList("automation_indicators"));
        }
        Ok(())
    }

    /// Resolve free industry text to a configured industry.
    ///
    /// Tries the exact snake_case key, then table keys appearing as phrases,
    /// then aliases. Within a tier the longest phrase wins, so "digital
    /// marketing agency" resolves through "digital marketing" rather than
    /// the "agency" alias.
    pub fn resolve_industry(&self, industry: &str) -> Option<IndustryMatch> {
        let normalized = normalize_text(industry);
        if normalized.is_empty() {
            return None;
        }

        let as_key = normalized.replace(' ', "_");
        if let Some(score) = self.industry_scores.get(&as_key) {
            return Some(IndustryMatch {
                key: as_key,
                score: *score,
            });
        }

        let by_key = self
            .industry_scores
            .keys()
            .filter(|key| contains_term(&normalized, &key.replace('_', " ")))
            .max_by_key(|key| key.len());
        if let Some(key) = by_key {
            return Some(IndustryMatch {
                key: key.clone(),
                score: self.industry_scores[key],
            });
        }

        self.industry_aliases
            .iter()
            .filter(|(alias, target)| {
                self.industry_scores.contains_key(*target) && contains_term(&normalized, alias)
            })
            .max_by_key(|(alias, _)| alias.len())
            .map(|(_, target)| IndustryMatch {
                key: target.clone(),
                score: self.industry_scores[target],
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Words that point at an individual developer or freelancer
    pub developer_keywords: Vec<String>,
    /// Words that point at an organization with customers or staff
    pub business_keywords: Vec<String>,
    /// Name tokens that make a multi-word name look like a company
    pub organization_markers: Vec<String>,
    /// Technologies reported as tech stack (business) or skills (developer)
    pub technology_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            developer_keywords: owned(&[
                "developer",
                "dev",
                "programmer",
                "coder",
                "freelancer",
                "freelance",
                "consultant",
                "full-stack",
                "frontend",
                "backend",
                "react",
                "python",
                "javascript",
                "node.js",
                "vue",
                "angular",
                "php",
                "java",
                "c#",
                "ruby",
                "golang",
                "ios",
                "android",
                "flutter",
                "solo",
                "individual",
                "indie",
            ]),
            business_keywords: owned(&[
                "agency",
                "company",
                "store",
                "shop",
                "clinic",
                "firm",
                "studio",
                "restaurant",
                "salon",
                "retailer",
                "brand",
                "customers",
                "clients",
                "employees",
                "staff",
                "franchise",
                "marketplace",
            ]),
            organization_markers: owned(&[
                "inc",
                "llc",
                "ltd",
                "limited",
                "corp",
                "corporation",
                "co",
                "company",
                "agency",
                "studio",
                "studios",
                "group",
                "solutions",
                "labs",
                "technologies",
                "partners",
                "media",
                "digital",
                "gmbh",
                "holdings",
                "enterprises",
                "store",
                "shop",
            ]),
            technology_keywords: owned(&[
                "shopify",
                "wordpress",
                "woocommerce",
                "magento",
                "squarespace",
                "wix",
                "hubspot",
                "salesforce",
                "zapier",
                "stripe",
                "mailchimp",
                "react",
                "vue",
                "angular",
                "node.js",
                "python",
                "django",
                "flask",
                "javascript",
                "typescript",
                "php",
                "laravel",
                "ruby",
                "rails",
                "java",
                "c#",
                "golang",
                "rust",
                "swift",
                "kotlin",
                "flutter",
                "aws",
                "docker",
                "kubernetes",
            ]),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.developer_keywords.is_empty() {
            return Err(ConfigError::EmptyKeywordList("developer_keywords"));
        }
        if self.business_keywords.is_empty() {
            return Err(ConfigError::EmptyKeywordList("business_keywords"));
        }
        Ok(())
    }
}

/// Merge priority per data source, used to order parallel batches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub priorities: BTreeMap<String, u32>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            priorities: default_source_priorities()
                .into_iter()
                .map(|(source, priority)| (source.to_string(), priority))
                .collect(),
        }
    }
}

impl SourceSettings {
    pub fn priority_of(&self, data_source: &str) -> u32 {
        self.priorities
            .get(data_source)
            .copied()
            .unwrap_or(DEFAULT_SOURCE_PRIORITY)
    }
}
