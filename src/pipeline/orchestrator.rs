use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::{LeadConfig, PipelineSettings};
use crate::constants::UNKNOWN_SOURCE;
use crate::error::{ConfigError, PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::classify::{ClassifiedLead, Classifier};
use crate::pipeline::processing::dedupe::{DedupOutcome, Deduplicator};
use crate::pipeline::processing::normalize::{DefaultNormalizer, NormalizedLead, Normalizer};
use crate::pipeline::processing::score::{ScoredLead, Scorer};
use crate::types::{LeadCategory, RawRecord, RejectedRecord, RejectionReason};

/// Result of normalizing one record ahead of time, e.g. by the fan-in
pub type NormalizationOutcome = std::result::Result<NormalizedLead, RejectedRecord>;

/// Stages of one run, in the only order they may be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Collecting,
    Normalizing,
    Deduplicating,
    Classifying,
    Scoring,
    Done,
}

impl RunStage {
    pub fn next(&self) -> Option<RunStage> {
        match self {
            RunStage::Collecting => Some(RunStage::Normalizing),
            RunStage::Normalizing => Some(RunStage::Deduplicating),
            RunStage::Deduplicating => Some(RunStage::Classifying),
            RunStage::Classifying => Some(RunStage::Scoring),
            RunStage::Scoring => Some(RunStage::Done),
            RunStage::Done => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Collecting => "collecting",
            RunStage::Normalizing => "normalizing",
            RunStage::Deduplicating => "deduplicating",
            RunStage::Classifying => "classifying",
            RunStage::Scoring => "scoring",
            RunStage::Done => "done",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters kept for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub input: usize,
    pub normalized: usize,
    pub rejected: usize,
    pub rejected_missing_identity: usize,
    pub rejected_invalid_website: usize,
    pub deduplicated_away: usize,
    pub classified_business: usize,
    pub classified_developer: usize,
    pub scored: usize,
    pub qualified: usize,
    pub below_threshold: usize,
    /// Leads never scored because the target was already met
    pub unevaluated: usize,
}

/// Everything a finished run hands to its consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub min_score: f64,
    /// Leads at or above `min_score`, best first
    pub qualified: Vec<ScoredLead>,
    pub below_threshold: Vec<ScoredLead>,
    pub rejected: Vec<RejectedRecord>,
    pub stats: RunStats,
    /// Input records per data source, before any rejection or merge
    pub input_by_source: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn qualified_in(&self, category: LeadCategory) -> impl Iterator<Item = &ScoredLead> {
        self.qualified.iter().filter(move |lead| lead.category() == category)
    }
}

enum Collected {
    Raw(RawRecord),
    Normalized(NormalizationOutcome),
}

impl Collected {
    fn data_source(&self) -> String {
        let source = match self {
            Collected::Raw(record) => record.data_source(),
            Collected::Normalized(Ok(lead)) => Some(lead.data_source.clone()),
            Collected::Normalized(Err(rejected)) => rejected.record.data_source(),
        };
        source.unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
    }
}

/// One orchestration run over a batch of raw records.
///
/// The run owns its dedup index and counters; nothing is shared between
/// runs, so independent runs can proceed concurrently.
pub struct PipelineRun {
    run_id: Uuid,
    stage: RunStage,
    started_at: DateTime<Utc>,
    settings: PipelineSettings,
    normalizer: Box<dyn Normalizer + Send + Sync>,
    deduplicator: Deduplicator,
    classifier: Classifier,
    scorer: Scorer,
    collected: Vec<Collected>,
    rejected: Vec<RejectedRecord>,
    stats: RunStats,
    input_by_source: BTreeMap<String, usize>,
}

impl PipelineRun {
    /// Start a run, validating the whole configuration up front
    pub fn new(config: &LeadConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_normalizer(config, Box::new(DefaultNormalizer::new()))
    }

    pub fn with_normalizer(
        config: &LeadConfig,
        normalizer: Box<dyn Normalizer + Send + Sync>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let scorer = Scorer::new(config.scoring.clone())?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            stage: RunStage::Collecting,
            started_at: Utc::now(),
            settings: config.pipeline.clone(),
            normalizer,
            deduplicator: Deduplicator::new(),
            classifier: Classifier::from_lead_config(config),
            scorer,
            collected: Vec::new(),
            rejected: Vec::new(),
            stats: RunStats::default(),
            input_by_source: BTreeMap::new(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Add raw records; may be called any number of times while collecting
    pub fn collect(&mut self, records: impl IntoIterator<Item = RawRecord>) -> Result<()> {
        self.ensure_collecting()?;
        self.push_collected(records.into_iter().map(Collected::Raw));
        Ok(())
    }

    /// Add records that were already normalized elsewhere, keeping their order
    pub fn collect_normalized(&mut self, outcomes: impl IntoIterator<Item = NormalizationOutcome>) -> Result<()> {
        self.ensure_collecting()?;
        self.push_collected(outcomes.into_iter().map(Collected::Normalized));
        Ok(())
    }

    fn push_collected(&mut self, items: impl Iterator<Item = Collected>) {
        for item in items {
            *self.input_by_source.entry(item.data_source()).or_insert(0) += 1;
            self.stats.input += 1;
            self.collected.push(item);
        }
    }

    fn ensure_collecting(&self) -> Result<()> {
        if self.stage != RunStage::Collecting {
            return Err(PipelineError::InvalidTransition {
                from: self.stage.to_string(),
                to: RunStage::Collecting.to_string(),
            });
        }
        Ok(())
    }

    fn advance(&mut self, to: RunStage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(PipelineError::InvalidTransition {
                from: self.stage.to_string(),
                to: to.to_string(),
            });
        }
        debug!("Run {} stage {} -> {}", self.run_id, self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Run the remaining stages and hand over the results
    pub fn finish(&mut self) -> Result<RunReport> {
        let span = info_span!("pipeline_run", run_id = %self.run_id);
        let _enter = span.enter();
        let timer = Instant::now();

        self.advance(RunStage::Normalizing)?;
        metrics::run::started();
        metrics::run::records_input(self.stats.input);
        info!("Normalizing {} records", self.stats.input);
        let normalized = self.normalize_all();

        self.advance(RunStage::Deduplicating)?;
        let unique = self.dedupe_all(normalized);
        info!(
            "Deduplicated to {} leads ({} merged)",
            unique.len(),
            self.stats.deduplicated_away
        );

        self.advance(RunStage::Classifying)?;
        let classified = self.classify_all(unique);
        info!(
            "Classified {} business and {} developer leads",
            self.stats.classified_business, self.stats.classified_developer
        );

        self.advance(RunStage::Scoring)?;
        let (mut qualified, below_threshold) = self.score_until_target(classified);
        // stable: equal scores keep dedup order
        qualified.sort_by(|a, b| b.fit_score.total_cmp(&a.fit_score));

        self.advance(RunStage::Done)?;
        let elapsed = timer.elapsed();
        metrics::run::completed(elapsed.as_secs_f64());
        info!(
            "Run finished in {:.2}ms: {} qualified, {} below threshold, {} rejected, {} unevaluated",
            elapsed.as_secs_f64() * 1000.0,
            self.stats.qualified,
            self.stats.below_threshold,
            self.stats.rejected,
            self.stats.unevaluated
        );

        Ok(RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            min_score: self.settings.min_score,
            qualified,
            below_threshold,
            rejected: std::mem::take(&mut self.rejected),
            stats: self.stats.clone(),
            input_by_source: self.input_by_source.clone(),
        })
    }

    fn normalize_all(&mut self) -> Vec<NormalizedLead> {
        let mut leads = Vec::new();
        for item in std::mem::take(&mut self.collected) {
            let outcome = match item {
                Collected::Raw(record) => self.normalizer.normalize(&record),
                Collected::Normalized(outcome) => outcome,
            };
            match outcome {
                Ok(lead) => {
                    metrics::normalize::record_normalized(&lead.normalization.strategy);
                    if !lead.normalization.warnings.is_empty() {
                        metrics::normalize::warnings_logged(lead.normalization.warnings.len());
                        for warning in &lead.normalization.warnings {
                            debug!("Normalization warning for '{}': {}", lead.name, warning);
                        }
                    }
                    self.stats.normalized += 1;
                    leads.push(lead);
                }
                Err(rejected) => self.reject(rejected),
            }
        }
        leads
    }

    fn reject(&mut self, rejected: RejectedRecord) {
        warn!("Rejected record ({}): {}", rejected.reason, rejected.detail);
        metrics::normalize::record_rejected(rejected.reason.as_str());
        self.stats.rejected += 1;
        match rejected.reason {
            RejectionReason::MissingIdentity => self.stats.rejected_missing_identity += 1,
            RejectionReason::InvalidWebsite => self.stats.rejected_invalid_website += 1,
        }
        self.rejected.push(rejected);
    }

    fn dedupe_all(&mut self, leads: Vec<NormalizedLead>) -> Vec<NormalizedLead> {
        for lead in leads {
            if let DedupOutcome::Merged { .. } = self.deduplicator.insert(lead) {
                metrics::dedupe::merged();
                self.stats.deduplicated_away += 1;
            }
        }
        let unique = self.deduplicator.take();
        metrics::dedupe::unique_leads(unique.len());
        unique
    }

    fn classify_all(&mut self, leads: Vec<NormalizedLead>) -> Vec<ClassifiedLead> {
        leads
            .into_iter()
            .map(|lead| {
                let classified = self.classifier.classify(lead);
                debug!(
                    "Classified '{}' as {} (developer {} / business {})",
                    classified.lead.name,
                    classified.category,
                    classified.signals.developer,
                    classified.signals.business
                );
                metrics::classify::lead_classified(classified.category.as_str());
                match classified.category {
                    LeadCategory::Business => self.stats.classified_business += 1,
                    LeadCategory::Developer => self.stats.classified_developer += 1,
                }
                classified
            })
            .collect()
    }

    /// Score in dedup order until `target_total_leads` leads qualify
    fn score_until_target(&mut self, classified: Vec<ClassifiedLead>) -> (Vec<ScoredLead>, Vec<ScoredLead>) {
        let total = classified.len();
        let mut qualified = Vec::new();
        let mut below_threshold = Vec::new();

        for lead in &classified {
            if qualified.len() >= self.settings.target_total_leads {
                break;
            }

            let mut scored = self.scorer.score(lead);
            scored.last_updated = Some(Utc::now());
            self.stats.scored += 1;
            metrics::score::lead_scored(scored.category().as_str(), scored.fit_score);

            if scored.fit_score >= self.settings.min_score {
                metrics::score::qualified();
                qualified.push(scored);
            } else {
                metrics::score::below_threshold();
                below_threshold.push(scored);
            }
        }

        self.stats.qualified = qualified.len();
        self.stats.below_threshold = below_threshold.len();
        self.stats.unevaluated = total - self.stats.scored;
        if self.stats.unevaluated > 0 {
            info!(
                "Target of {} qualified leads reached; {} leads left unevaluated",
                self.settings.target_total_leads, self.stats.unevaluated
            );
            metrics::score::unevaluated(self.stats.unevaluated);
        }

        (qualified, below_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    fn strong_business(index: usize) -> RawRecord {
        record(json!({
            "name": format!("Shop Number {}", index),
            "website": format!("shop{}.com", index),
            "industry": "ecommerce",
            "company_size": "2-10",
            "pain_points": "inventory management, order processing",
            "email": format!("owner@shop{}.com", index),
            "linkedin": format!("linkedin.com/company/shop{}", index)
        }))
    }

    #[test]
    fn test_run_walks_every_stage() {
        let mut run = PipelineRun::new(&LeadConfig::default()).unwrap();
        assert_eq!(run.stage(), RunStage::Collecting);

        run.collect(vec![strong_business(1)]).unwrap();
        run.collect(vec![
            record(json!({ "name": "", "website": "acme.com" })),
            record(json!({ "name": "Acme", "website": "not a url" })),
        ])
        .unwrap();

        let report = run.finish().unwrap();
        assert_eq!(run.stage(), RunStage::Done);
        assert_eq!(report.stats.input, 3);
        assert_eq!(report.stats.normalized, 1);
        assert_eq!(report.stats.rejected_missing_identity, 1);
        assert_eq!(report.stats.rejected_invalid_website, 1);
        assert_eq!(report.qualified.len(), 1);
        assert!(report.qualified[0].last_updated.is_some());
        assert_eq!(report.input_by_source.get(UNKNOWN_SOURCE), Some(&3));
    }

    #[test]
    fn test_stages_never_go_backwards() {
        let mut run = PipelineRun::new(&LeadConfig::default()).unwrap();
        run.finish().unwrap();

        assert!(matches!(
            run.collect(vec![strong_business(1)]),
            Err(PipelineError::InvalidTransition { .. })
        ));
        assert!(matches!(run.finish(), Err(PipelineError::InvalidTransition { .. })));
    }

    #[test]
    fn test_target_stops_scoring() {
        let mut config = LeadConfig::default();
        config.pipeline.target_total_leads = 2;
        let mut run = PipelineRun::new(&config).unwrap();
        run.collect((1..=5).map(strong_business)).unwrap();

        let report = run.finish().unwrap();
        assert_eq!(report.stats.qualified, 2);
        assert_eq!(report.stats.scored, 2);
        assert_eq!(report.stats.unevaluated, 3);
        assert_eq!(report.qualified.len(), 2);
    }

    #[test]
    fn test_qualified_sorted_best_first() {
        let mut config = LeadConfig::default();
        config.pipeline.min_score = 1.0;
        let mut run = PipelineRun::new(&config).unwrap();
        run.collect(vec![
            record(json!({ "name": "Plain", "website": "plain.com" })),
            strong_business(1),
        ])
        .unwrap();

        let report = run.finish().unwrap();
        assert_eq!(report.qualified.len(), 2);
        assert!(report.qualified[0].fit_score >= report.qualified[1].fit_score);
        assert_eq!(report.qualified[0].name(), "Shop Number 1");
    }

    #[test]
    fn test_invalid_config_fails_start() {
        let mut config = LeadConfig::default();
        config.scoring.weights.company_size = 0.9;
        assert!(PipelineRun::new(&config).is_err());
    }

    #[test]
    fn test_runs_have_distinct_ids() {
        let a = PipelineRun::new(&LeadConfig::default()).unwrap();
        let b = PipelineRun::new(&LeadConfig::default()).unwrap();
        assert_ne!(a.run_id(), b.run_id());
    }
}
