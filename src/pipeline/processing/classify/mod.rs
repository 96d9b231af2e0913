pub mod attributes;

use serde::{Deserialize, Serialize};

use crate::common::text::{contains_term, matched_terms};
use crate::config::{ClassifierConfig, LeadConfig, ScoringConfig};
use crate::pipeline::processing::normalize::NormalizedLead;
use crate::types::{CompanySize, LeadCategory};

pub use self::attributes::{BusinessAttributes, CategoryAttributes, DeveloperAttributes};
use self::attributes::{extract_business, extract_developer, AttributeVocabulary};

/// A normalized lead with its category decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLead {
    #[serde(flatten)]
    pub lead: NormalizedLead,
    pub category: LeadCategory,
    pub attributes: CategoryAttributes,
    pub signals: ClassificationSignals,
}

/// The counted evidence behind a category decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSignals {
    pub developer: usize,
    pub business: usize,
    /// Developer evidence as `field:keyword`
    pub developer_hits: Vec<String>,
    /// Business evidence as `kind:detail`
    pub business_hits: Vec<String>,
}

impl ClassificationSignals {
    /// Developer only on a strict majority; ties go to business
    pub fn decide(&self) -> LeadCategory {
        if self.developer > self.business {
            LeadCategory::Developer
        } else {
            LeadCategory::Business
        }
    }
}

/// Counted-signal business/developer classifier.
///
/// A pure function of the lead and the keyword tables it was built with.
#[derive(Debug, Clone)]
pub struct Classifier {
    pub config: ClassifierConfig,
    pub scoring: ScoringConfig,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default(), ScoringConfig::default())
    }

    /// The scoring section supplies the industry taxonomy and the
    /// automation vocabulary
    pub fn with_config(config: ClassifierConfig, scoring: ScoringConfig) -> Self {
        Self { config, scoring }
    }

    pub fn from_lead_config(config: &LeadConfig) -> Self {
        Self::with_config(config.classifier.clone(), config.scoring.clone())
    }

    pub fn classify(&self, lead: NormalizedLead) -> ClassifiedLead {
        let signals = self.count_signals(&lead);
        let category = signals.decide();

        let vocabulary = AttributeVocabulary {
            technologies: &self.config.technology_keywords,
            automation_indicators: &self.scoring.automation_indicators,
        };
        let attributes = match category {
            LeadCategory::Business => CategoryAttributes::Business(extract_business(&lead, &vocabulary)),
            LeadCategory::Developer => CategoryAttributes::Developer(extract_developer(&lead, &vocabulary)),
        };

        ClassifiedLead {
            lead,
            category,
            attributes,
            signals,
        }
    }

    pub fn count_signals(&self, lead: &NormalizedLead) -> ClassificationSignals {
        let mut signals = ClassificationSignals::default();

        let text_fields = [
            ("name", Some(lead.name.as_str())),
            ("industry", lead.industry.as_deref()),
            ("pain_points", lead.pain_points.as_deref()),
            ("company_size", lead.company_size_text.as_deref()),
        ];
        for (field, text) in text_fields {
            if let Some(text) = text {
                for keyword in matched_terms(text, &self.config.developer_keywords) {
                    signals.developer_hits.push(format!("{}:{}", field, keyword));
                }
            }
        }
        let keyword_hits = signals.developer_hits.len();
        let size_keyword = signals.developer_hits.iter().any(|hit| hit.starts_with("company_size:"));
        // a solo bucket read from a developer keyword is one signal, not two
        if lead.company_size == Some(CompanySize::Solo) && !size_keyword {
            signals.developer_hits.push("company_size:solo".to_string());
        }

        if let Some(industry) = lead.industry.as_deref() {
            if let Some(matched) = self.scoring.resolve_industry(industry) {
                signals.business_hits.push(format!("industry:{}", matched.key));
            }
        }
        if self.is_company_like_name(&lead.name) {
            signals.business_hits.push("name:organization".to_string());
        }
        for (field, text) in [
            ("industry", lead.industry.as_deref()),
            ("pain_points", lead.pain_points.as_deref()),
        ] {
            if let Some(text) = text {
                for keyword in matched_terms(text, &self.config.business_keywords) {
                    signals.business_hits.push(format!("{}:{}", field, keyword));
                }
            }
        }
        if matches!(lead.company_size, Some(CompanySize::Medium | CompanySize::Large)) {
            signals.business_hits.push("company_size:organization".to_string());
        }
        if keyword_hits == 0 {
            signals.business_hits.push("no_developer_keywords".to_string());
        }

        signals.developer = signals.developer_hits.len();
        signals.business = signals.business_hits.len();
        signals
    }

    /// Two or more words, one of them an organizational marker
    fn is_company_like_name(&self, name: &str) -> bool {
        name.split_whitespace().count() >= 2
            && self
                .config
                .organization_markers
                .iter()
                .any(|marker| contains_term(name, marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{DefaultNormalizer, Normalizer};
    use crate::types::RawRecord;
    use serde_json::json;

    fn lead(value: serde_json::Value) -> NormalizedLead {
        let raw: RawRecord = serde_json::from_value(value).unwrap();
        DefaultNormalizer::new().normalize(&raw).unwrap()
    }

    fn jane() -> NormalizedLead {
        lead(json!({
            "name": "Jane Doe Freelance Dev",
            "website": "HTTP://JaneDev.IO/",
            "industry": "software",
            "pain_points": "manual scheduling, repetitive data entry",
            "email": "jane@janedev.io"
        }))
    }

    #[test]
    fn test_freelance_dev_is_developer() {
        let classified = Classifier::new().classify(jane());

        assert_eq!(classified.category, LeadCategory::Developer);
        assert_eq!(classified.signals.developer, 2);
        assert_eq!(classified.signals.business, 1);
        assert_eq!(classified.signals.business_hits, vec!["industry:saas"]);

        let attrs = classified.attributes.as_developer().unwrap();
        assert_eq!(attrs.portfolio_url.as_deref(), Some("https://janedev.io"));
        assert!(classified.attributes.as_business().is_none());
    }

    #[test]
    fn test_agency_is_business() {
        let classified = Classifier::new().classify(lead(json!({
            "name": "Northwind Digital Agency",
            "website": "northwind.agency",
            "industry": "digital marketing",
            "company_size": "11-50 employees",
            "pain_points": "lead follow up for clients"
        })));

        assert_eq!(classified.category, LeadCategory::Business);
        assert_eq!(classified.signals.developer, 0);
        // industry, name, "clients", size, no developer keywords
        assert_eq!(classified.signals.business, 5);
        assert!(classified.attributes.as_developer().is_none());
        assert_eq!(
            classified.attributes.as_business().unwrap().automation_needs,
            vec!["lead follow up"]
        );
    }

    #[test]
    fn test_tie_goes_to_business() {
        let signals = ClassificationSignals {
            developer: 2,
            business: 2,
            ..Default::default()
        };
        assert_eq!(signals.decide(), LeadCategory::Business);

        // "developer" (1) against the industry taxonomy hit (1)
        let classified = Classifier::new().classify(lead(json!({
            "name": "Riverside Developer",
            "website": "riverside.io",
            "industry": "retail"
        })));
        assert_eq!(classified.signals.developer, 1);
        assert_eq!(classified.signals.business, 1);
        assert_eq!(classified.category, LeadCategory::Business);
    }

    #[test]
    fn test_solo_size_counts_for_developer() {
        let classified = Classifier::new().classify(lead(json!({
            "name": "Kim Lee",
            "website": "kimlee.dev",
            "pain_points": "React and Python work",
            "company_size": "Freelancer"
        })));
        // react, python, "freelancer" size
        assert_eq!(classified.signals.developer, 3);
        assert!(classified
            .signals
            .developer_hits
            .contains(&"company_size:freelancer".to_string()));
        assert_eq!(classified.category, LeadCategory::Developer);
        assert_eq!(
            classified.attributes.as_developer().unwrap().skills,
            vec!["react", "python"]
        );
    }

    #[test]
    fn test_size_text_keywords_count_for_developer() {
        let classified = Classifier::new().classify(lead(json!({
            "name": "Sam",
            "website": "sam.codes",
            "company_size": "freelance python developer"
        })));
        assert_eq!(
            classified.signals.developer_hits,
            vec!["company_size:developer", "company_size:freelance", "company_size:python"]
        );
        assert_eq!(classified.category, LeadCategory::Developer);

        let numeric = Classifier::new().classify(lead(json!({
            "name": "Sam",
            "website": "sam.codes",
            "company_size": "1"
        })));
        assert_eq!(numeric.signals.developer_hits, vec!["company_size:solo"]);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = Classifier::new();
        assert_eq!(classifier.classify(jane()), classifier.classify(jane()));
    }
}
