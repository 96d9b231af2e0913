//! Metrics for the lead pipeline
//!
//! Every stage records through the helpers below using the standard
//! Prometheus naming conventions. Nothing is exported until [`init`] installs
//! the Prometheus recorder; before that the `metrics` macros are no-ops.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Run metrics
    RunsStarted,
    RunsCompleted,
    RunDuration,
    RecordsInput,

    // Source metrics
    SourceBatchesLoaded,
    SourceLoadErrors,

    // Normalize metrics
    NormalizeRecordsNormalized,
    NormalizeRecordsRejected,
    NormalizeWarnings,

    // Dedupe metrics
    DedupeMerged,
    DedupeUniqueLeads,

    // Classify metrics
    ClassifyLeads,

    // Score metrics
    ScoreLeadsScored,
    ScoreFitScore,
    ScoreQualified,
    ScoreBelowThreshold,
    ScoreUnevaluated,

    // Output metrics
    OutputWritesSuccess,
    OutputWritesError,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RunsStarted => "lead_pipeline_runs_started_total",
            MetricName::RunsCompleted => "lead_pipeline_runs_completed_total",
            MetricName::RunDuration => "lead_pipeline_run_duration_seconds",
            MetricName::RecordsInput => "lead_pipeline_run_records_input_total",

            MetricName::SourceBatchesLoaded => "lead_pipeline_source_batches_loaded_total",
            MetricName::SourceLoadErrors => "lead_pipeline_source_load_errors_total",

            MetricName::NormalizeRecordsNormalized => "lead_pipeline_normalize_records_normalized_total",
            MetricName::NormalizeRecordsRejected => "lead_pipeline_normalize_records_rejected_total",
            MetricName::NormalizeWarnings => "lead_pipeline_normalize_warnings_total",

            MetricName::DedupeMerged => "lead_pipeline_dedupe_merged_total",
            MetricName::DedupeUniqueLeads => "lead_pipeline_dedupe_unique_leads",

            MetricName::ClassifyLeads => "lead_pipeline_classify_leads_total",

            MetricName::ScoreLeadsScored => "lead_pipeline_score_leads_scored_total",
            MetricName::ScoreFitScore => "lead_pipeline_score_fit_score",
            MetricName::ScoreQualified => "lead_pipeline_score_qualified_total",
            MetricName::ScoreBelowThreshold => "lead_pipeline_score_below_threshold_total",
            MetricName::ScoreUnevaluated => "lead_pipeline_score_unevaluated_total",

            MetricName::OutputWritesSuccess => "lead_pipeline_output_writes_success_total",
            MetricName::OutputWritesError => "lead_pipeline_output_writes_error_total",
        }
    }

    /// Get all metric names as an iterator
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            RunsStarted,
            RunsCompleted,
            RunDuration,
            RecordsInput,
            SourceBatchesLoaded,
            SourceLoadErrors,
            NormalizeRecordsNormalized,
            NormalizeRecordsRejected,
            NormalizeWarnings,
            DedupeMerged,
            DedupeUniqueLeads,
            ClassifyLeads,
            ScoreLeadsScored,
            ScoreFitScore,
            ScoreQualified,
            ScoreBelowThreshold,
            ScoreUnevaluated,
            OutputWritesSuccess,
            OutputWritesError,
        ]
        .into_iter()
    }

    /// Returns (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::RunsStarted => ("run", "Pipeline runs started", None),
            MetricName::RunsCompleted => ("run", "Pipeline runs completed", None),
            MetricName::RunDuration => ("run", "Pipeline run duration", Some("s")),
            MetricName::RecordsInput => ("run", "Raw records handed to the pipeline", None),

            MetricName::SourceBatchesLoaded => ("source", "Source batches loaded", None),
            MetricName::SourceLoadErrors => ("source", "Source batches that failed to load", None),

            MetricName::NormalizeRecordsNormalized => ("normalize", "Records normalized", None),
            MetricName::NormalizeRecordsRejected => ("normalize", "Records rejected by reason", None),
            MetricName::NormalizeWarnings => ("normalize", "Normalization warnings", None),

            MetricName::DedupeMerged => ("dedupe", "Duplicates merged into an earlier lead", None),
            MetricName::DedupeUniqueLeads => ("dedupe", "Unique leads after deduplication", None),

            MetricName::ClassifyLeads => ("classify", "Leads classified by category", None),

            MetricName::ScoreLeadsScored => ("score", "Leads scored", None),
            MetricName::ScoreFitScore => ("score", "Fit score distribution", None),
            MetricName::ScoreQualified => ("score", "Leads at or above the minimum score", None),
            MetricName::ScoreBelowThreshold => ("score", "Leads scored below the minimum score", None),
            MetricName::ScoreUnevaluated => ("score", "Leads left unscored after the target was met", None),

            MetricName::OutputWritesSuccess => ("output", "Successful output writes", None),
            MetricName::OutputWritesError => ("output", "Failed output writes", None),
        }
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();

    info!("Metrics system initialized");
    Ok(())
}

/// Render the Prometheus exposition text, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Run Metrics
// ============================================================================

pub mod run {
    use super::MetricName;

    pub fn started() {
        ::metrics::counter!(MetricName::RunsStarted.as_str()).increment(1);
    }

    pub fn completed(duration_secs: f64) {
        ::metrics::counter!(MetricName::RunsCompleted.as_str()).increment(1);
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(duration_secs);
    }

    pub fn records_input(count: usize) {
        ::metrics::counter!(MetricName::RecordsInput.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Source Metrics
// ============================================================================

pub mod source {
    use super::MetricName;

    pub fn batch_loaded(data_source: &str) {
        ::metrics::counter!(MetricName::SourceBatchesLoaded.as_str(), "data_source" => data_source.to_string())
            .increment(1);
    }

    pub fn load_error() {
        ::metrics::counter!(MetricName::SourceLoadErrors.as_str()).increment(1);
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    /// Record that a record was normalized with a specific strategy
    pub fn record_normalized(strategy: &str) {
        ::metrics::counter!(
            MetricName::NormalizeRecordsNormalized.as_str(),
            "strategy" => strategy.to_string()
        )
        .increment(1);
    }

    pub fn record_rejected(reason: &str) {
        ::metrics::counter!(
            MetricName::NormalizeRecordsRejected.as_str(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    pub fn warnings_logged(count: usize) {
        ::metrics::counter!(MetricName::NormalizeWarnings.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Dedupe Metrics
// ============================================================================

pub mod dedupe {
    use super::MetricName;

    pub fn merged() {
        ::metrics::counter!(MetricName::DedupeMerged.as_str()).increment(1);
    }

    pub fn unique_leads(count: usize) {
        ::metrics::gauge!(MetricName::DedupeUniqueLeads.as_str()).set(count as f64);
    }
}

// ============================================================================
// Classify Metrics
// ============================================================================

pub mod classify {
    use super::MetricName;

    pub fn lead_classified(category: &str) {
        ::metrics::counter!(MetricName::ClassifyLeads.as_str(), "category" => category.to_string()).increment(1);
    }
}

// ============================================================================
// Score Metrics
// ============================================================================

pub mod score {
    use super::MetricName;

    pub fn lead_scored(category: &str, fit_score: f64) {
        ::metrics::counter!(MetricName::ScoreLeadsScored.as_str(), "category" => category.to_string())
            .increment(1);
        ::metrics::histogram!(MetricName::ScoreFitScore.as_str()).record(fit_score);
    }

    pub fn qualified() {
        ::metrics::counter!(MetricName::ScoreQualified.as_str()).increment(1);
    }

    pub fn below_threshold() {
        ::metrics::counter!(MetricName::ScoreBelowThreshold.as_str()).increment(1);
    }

    pub fn unevaluated(count: usize) {
        ::metrics::counter!(MetricName::ScoreUnevaluated.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Output Metrics
// ============================================================================

pub mod output {
    use super::MetricName;

    pub fn write_success(kind: &str) {
        ::metrics::counter!(MetricName::OutputWritesSuccess.as_str(), "kind" => kind.to_string()).increment(1);
    }

    pub fn write_error(kind: &str) {
        ::metrics::counter!(MetricName::OutputWritesError.as_str(), "kind" => kind.to_string()).increment(1);
    }
}
