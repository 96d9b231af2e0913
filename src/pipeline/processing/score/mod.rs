use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ScoringConfig;
use crate::error::ConfigError;
use crate::pipeline::processing::classify::attributes::automation_hits;
use crate::pipeline::processing::classify::ClassifiedLead;
use crate::pipeline::processing::normalize::OPTIONAL_FIELD_COUNT;
use crate::types::LeadCategory;

pub const MIN_FIT_SCORE: f64 = 1.0;
pub const MAX_FIT_SCORE: f64 = 10.0;

/// One weighted sub-score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    /// Raw sub-score on a 0-10 scale
    pub subscore: f64,
    pub weight: f64,
    /// `subscore * weight`
    pub contribution: f64,
}

impl ScoreComponent {
    fn new(subscore: f64, weight: f64) -> Self {
        Self {
            subscore,
            weight,
            contribution: subscore * weight,
        }
    }
}

/// How a fit score was put together.
///
/// The contributions plus `adjustment` add up to the fit score; the
/// adjustment is whatever clamping and rounding moved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub company_size: ScoreComponent,
    pub automation_indicators: ScoreComponent,
    pub industry_relevance: ScoreComponent,
    pub data_quality: ScoreComponent,
    pub contact_availability: ScoreComponent,
    pub adjustment: f64,
}

impl ScoreBreakdown {
    pub fn components(&self) -> [(&'static str, &ScoreComponent); 5] {
        [
            ("company_size", &self.company_size),
            ("automation_indicators", &self.automation_indicators),
            ("industry_relevance", &self.industry_relevance),
            ("data_quality", &self.data_quality),
            ("contact_availability", &self.contact_availability),
        ]
    }

    /// Sum of weighted contributions before clamping and rounding
    pub fn weighted_sum(&self) -> f64 {
        self.components().iter().map(|(_, c)| c.contribution).sum()
    }
}

/// Outreach priority derived from the fit score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityBand {
    High,
    Medium,
    Low,
}

impl PriorityBand {
    pub fn from_score(fit_score: f64) -> Self {
        if fit_score >= 8.0 {
            PriorityBand::High
        } else if fit_score >= 5.0 {
            PriorityBand::Medium
        } else {
            PriorityBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityBand::High => "high",
            PriorityBand::Medium => "medium",
            PriorityBand::Low => "low",
        }
    }
}

impl fmt::Display for PriorityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified lead with its fit score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLead {
    #[serde(flatten)]
    pub classified: ClassifiedLead,
    pub fit_score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub priority: PriorityBand,
    /// Stamped by the orchestrator, never by the scorer
    pub last_updated: Option<DateTime<Utc>>,
}

impl ScoredLead {
    pub fn category(&self) -> LeadCategory {
        self.classified.category
    }

    pub fn name(&self) -> &str {
        &self.classified.lead.name
    }
}

/// Weighted five-part fit scorer
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    /// Build a scorer, refusing configuration that would bias every score
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, classified: &ClassifiedLead) -> ScoredLead {
        let breakdown = self.breakdown(classified);
        let weighted_sum = breakdown.weighted_sum();
        let fit_score = round2(weighted_sum.clamp(MIN_FIT_SCORE, MAX_FIT_SCORE));

        ScoredLead {
            classified: classified.clone(),
            fit_score,
            score_breakdown: ScoreBreakdown {
                adjustment: fit_score - weighted_sum,
                ..breakdown
            },
            priority: PriorityBand::from_score(fit_score),
            last_updated: None,
        }
    }

    fn breakdown(&self, classified: &ClassifiedLead) -> ScoreBreakdown {
        let weights = &self.config.weights;
        ScoreBreakdown {
            company_size: ScoreComponent::new(self.company_size_score(classified), weights.company_size),
            automation_indicators: ScoreComponent::new(
                self.automation_score(classified),
                weights.automation_indicators,
            ),
            industry_relevance: ScoreComponent::new(self.industry_score(classified), weights.industry_relevance),
            data_quality: ScoreComponent::new(data_quality_score(classified), weights.data_quality),
            contact_availability: ScoreComponent::new(contact_score(classified), weights.contact_availability),
            adjustment: 0.0,
        }
    }

    fn company_size_score(&self, classified: &ClassifiedLead) -> f64 {
        let table = match classified.category {
            LeadCategory::Business => &self.config.business_company_size,
            LeadCategory::Developer => &self.config.developer_company_size,
        };
        table.lookup(classified.lead.company_size)
    }

    /// Saturates once the hit threshold is reached
    fn automation_score(&self, classified: &ClassifiedLead) -> f64 {
        let threshold = self.config.automation_hit_threshold;
        let hits = automation_hits(&classified.lead, &self.config.automation_indicators).len();
        10.0 * hits.min(threshold) as f64 / threshold as f64
    }

    fn industry_score(&self, classified: &ClassifiedLead) -> f64 {
        classified
            .lead
            .industry
            .as_deref()
            .and_then(|industry| self.config.resolve_industry(industry))
            .map(|matched| matched.score)
            .unwrap_or(self.config.unknown_industry_score)
    }
}

fn data_quality_score(classified: &ClassifiedLead) -> f64 {
    10.0 * classified.lead.optional_fields_present() as f64 / OPTIONAL_FIELD_COUNT as f64
}

fn contact_score(classified: &ClassifiedLead) -> f64 {
    let lead = &classified.lead;
    if lead.email.is_some() {
        10.0
    } else if lead.linkedin.is_some() {
        5.0
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompanySizeTable;
    use crate::pipeline::processing::classify::Classifier;
    use crate::pipeline::processing::normalize::{DefaultNormalizer, Normalizer};
    use crate::types::RawRecord;
    use serde_json::json;

    fn classified(value: serde_json::Value) -> ClassifiedLead {
        let raw: RawRecord = serde_json::from_value(value).unwrap();
        let lead = DefaultNormalizer::new().normalize(&raw).unwrap();
        Classifier::new().classify(lead)
    }

    fn assert_breakdown_consistent(scored: &ScoredLead) {
        let breakdown = &scored.score_breakdown;
        let total = breakdown.weighted_sum() + breakdown.adjustment;
        assert!((total - scored.fit_score).abs() < 1e-9);
        assert!((MIN_FIT_SCORE..=MAX_FIT_SCORE).contains(&scored.fit_score));
    }

    #[test]
    fn test_freelance_developer_scores_high() {
        let scorer = Scorer::new(ScoringConfig::default()).unwrap();
        let scored = scorer.score(&classified(json!({
            "name": "Jane Doe Freelance Dev",
            "website": "HTTP://JaneDev.IO/",
            "industry": "software",
            "pain_points": "manual scheduling, repetitive data entry",
            "email": "jane@janedev.io"
        })));

        let breakdown = &scored.score_breakdown;
        assert_eq!(breakdown.company_size.subscore, 10.0);
        assert_eq!(breakdown.automation_indicators.subscore, 10.0);
        assert_eq!(breakdown.industry_relevance.subscore, 8.0);
        assert_eq!(breakdown.data_quality.subscore, 6.0);
        assert_eq!(breakdown.contact_availability.subscore, 10.0);
        assert_eq!(scored.fit_score, 9.0);
        assert_eq!(scored.priority, PriorityBand::High);
        assert!(scored.last_updated.is_none());
        assert_breakdown_consistent(&scored);
        assert!((breakdown.weighted_sum() - scored.fit_score).abs() < 0.01);
    }

    #[test]
    fn test_bare_business_lead() {
        let scorer = Scorer::new(ScoringConfig::default()).unwrap();
        let scored = scorer.score(&classified(json!({ "name": "Acme", "website": "acme.com" })));

        assert_eq!(scored.category(), LeadCategory::Business);
        // 0.25 * 5 + 0.20 * 4
        assert_eq!(scored.fit_score, 2.05);
        assert_eq!(scored.priority, PriorityBand::Low);
        assert_breakdown_consistent(&scored);
    }

    #[test]
    fn test_linkedin_only_contact() {
        let scorer = Scorer::new(ScoringConfig::default()).unwrap();
        let scored = scorer.score(&classified(json!({
            "name": "Acme",
            "website": "acme.com",
            "linkedin": "linkedin.com/company/acme"
        })));
        assert_eq!(scored.score_breakdown.contact_availability.subscore, 5.0);
    }

    #[test]
    fn test_score_is_clamped_to_minimum() {
        let zero = CompanySizeTable {
            solo: 0.0,
            small: 0.0,
            medium: 0.0,
            large: 0.0,
            unknown: 0.0,
        };
        let config = ScoringConfig {
            unknown_industry_score: 0.0,
            business_company_size: zero,
            developer_company_size: zero,
            ..ScoringConfig::default()
        };
        let scorer = Scorer::new(config).unwrap();
        let scored = scorer.score(&classified(json!({ "name": "Acme", "website": "acme.com" })));

        assert_eq!(scored.fit_score, MIN_FIT_SCORE);
        assert_eq!(scored.score_breakdown.adjustment, 1.0);
        assert_breakdown_consistent(&scored);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let mut config = ScoringConfig::default();
        config.weights.contact_availability = 0.5;
        assert!(matches!(
            Scorer::new(config),
            Err(ConfigError::WeightsDoNotSumToOne { .. })
        ));

        let mut empty = ScoringConfig::default();
        empty.industry_scores.clear();
        assert!(matches!(Scorer::new(empty), Err(ConfigError::EmptyIndustryTable)));

        let mut biased = ScoringConfig::default();
        biased.unknown_industry_score = 50.0;
        assert!(matches!(
            Scorer::new(biased),
            Err(ConfigError::UnknownIndustryScoreOutOfRange(_))
        ));

        let mut negative = ScoringConfig::default();
        negative.business_company_size.solo = -40.0;
        assert!(matches!(
            Scorer::new(negative),
            Err(ConfigError::CompanySizeScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn test_automation_saturates_at_configured_threshold() {
        let config = ScoringConfig {
            automation_hit_threshold: 3,
            ..ScoringConfig::default()
        };
        let scorer = Scorer::new(config).unwrap();

        let two_hits = scorer.score(&classified(json!({
            "name": "Jane Doe Freelance Dev",
            "website": "janedev.io",
            "pain_points": "manual scheduling, repetitive data entry"
        })));
        let subscore = two_hits.score_breakdown.automation_indicators.subscore;
        assert!((subscore - 20.0 / 3.0).abs() < 1e-9, "got {}", subscore);

        let three_hits = scorer.score(&classified(json!({
            "name": "Jane Doe Freelance Dev",
            "website": "janedev.io",
            "pain_points": "manual scheduling, repetitive data entry, invoicing"
        })));
        assert_eq!(three_hits.score_breakdown.automation_indicators.subscore, 10.0);
        assert_breakdown_consistent(&three_hits);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let scorer = Scorer::new(ScoringConfig::default()).unwrap();
        let lead = classified(json!({
            "name": "Bloom Flowers Shop",
            "website": "bloomflowers.com",
            "industry": "retail",
            "company_size": "2-10",
            "pain_points": "inventory management and customer inquiries",
            "email": "hi@bloomflowers.com"
        }));

        let first = scorer.score(&lead);
        let second = scorer.score(&lead);
        assert_eq!(first.fit_score.to_bits(), second.fit_score.to_bits());
        assert_eq!(first.score_breakdown, second.score_breakdown);
    }

    #[test]
    fn test_priority_bands() {
        assert_eq!(PriorityBand::from_score(8.0), PriorityBand::High);
        assert_eq!(PriorityBand::from_score(7.99), PriorityBand::Medium);
        assert_eq!(PriorityBand::from_score(5.0), PriorityBand::Medium);
        assert_eq!(PriorityBand::from_score(4.99), PriorityBand::Low);
    }
}
