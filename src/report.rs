use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::pipeline::orchestrator::RunReport;
use crate::pipeline::processing::score::PriorityBand;
use crate::types::LeadCategory;

/// Headline numbers of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_records: usize,
    pub unique_leads: usize,
    pub qualified_leads: usize,
    pub business_leads: usize,
    pub developer_leads: usize,
    pub rejected_records: usize,
    /// Qualified leads as a percentage of input records
    pub qualification_rate: f64,
}

/// Human-facing summary written next to the lead files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub timestamp: DateTime<Utc>,
    pub run_id: Uuid,
    pub summary: RunSummary,
    /// Qualified leads per priority band
    pub score_distribution: BTreeMap<String, usize>,
    /// Qualified business leads per industry
    pub industry_distribution: BTreeMap<String, usize>,
    /// Input records per data source
    pub data_source_distribution: BTreeMap<String, usize>,
    /// Every classified lead per category, qualified or not
    pub category_split: BTreeMap<String, usize>,
}

impl SummaryReport {
    pub fn from_run(report: &RunReport) -> Self {
        let stats = &report.stats;

        let mut score_distribution: BTreeMap<String, usize> = [PriorityBand::High, PriorityBand::Medium, PriorityBand::Low]
            .iter()
            .map(|band| (band.as_str().to_string(), 0))
            .collect();
        for lead in &report.qualified {
            *score_distribution.entry(lead.priority.as_str().to_string()).or_insert(0) += 1;
        }

        let mut industry_distribution = BTreeMap::new();
        for lead in report.qualified_in(LeadCategory::Business) {
            let industry = lead
                .classified
                .lead
                .industry
                .clone()
                .unwrap_or_else(|| "Unknown".to_string());
            *industry_distribution.entry(industry).or_insert(0) += 1;
        }

        let category_split = [
            (LeadCategory::Business.as_str().to_string(), stats.classified_business),
            (LeadCategory::Developer.as_str().to_string(), stats.classified_developer),
        ]
        .into_iter()
        .collect();

        let qualification_rate = if stats.input == 0 {
            0.0
        } else {
            (stats.qualified as f64 / stats.input as f64 * 10000.0).round() / 100.0
        };

        Self {
            timestamp: report.finished_at,
            run_id: report.run_id,
            summary: RunSummary {
                total_records: stats.input,
                unique_leads: stats.normalized - stats.deduplicated_away,
                qualified_leads: stats.qualified,
                business_leads: report.qualified_in(LeadCategory::Business).count(),
                developer_leads: report.qualified_in(LeadCategory::Developer).count(),
                rejected_records: stats.rejected,
                qualification_rate,
            },
            score_distribution,
            industry_distribution,
            data_source_distribution: report.input_by_source.clone(),
            category_split,
        }
    }
}
