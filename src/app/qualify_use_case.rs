use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::ports::{LeadSink, RawRecordSource};
use crate::config::LeadConfig;
use crate::observability::metrics;
use crate::pipeline::fan_in::{self, SourceBatch};
use crate::pipeline::orchestrator::{PipelineRun, RunReport};
use crate::report::SummaryReport;

/// Use case for turning everything a source yields into qualified leads
pub struct QualifyUseCase {
    source: Arc<dyn RawRecordSource>,
    sink: Arc<dyn LeadSink>,
    config: LeadConfig,
    parallel: bool,
}

impl QualifyUseCase {
    pub fn new(source: Arc<dyn RawRecordSource>, sink: Arc<dyn LeadSink>, config: LeadConfig) -> Self {
        Self {
            source,
            sink,
            config,
            parallel: false,
        }
    }

    /// Normalize source batches concurrently before the serial dedup pass
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load, run the pipeline and hand the results to the sink
    pub async fn run(&self) -> Result<(RunReport, SummaryReport)> {
        let batches = self.load().await?;
        let report = self.execute(batches).await?;
        let summary = SummaryReport::from_run(&report);

        if let Err(e) = self.sink.write_run(&report, &summary).await {
            error!("Failed to write run {}: {}", report.run_id, e);
            metrics::output::write_error("run");
            return Err(e);
        }
        metrics::output::write_success("run");

        info!(
            "Run {} complete: {} qualified ({} business, {} developer), {} rejected",
            report.run_id,
            summary.summary.qualified_leads,
            summary.summary.business_leads,
            summary.summary.developer_leads,
            summary.summary.rejected_records
        );
        Ok((report, summary))
    }

    /// Score every lead without the target stop rule; nothing is written
    pub async fn score_all(&self) -> Result<RunReport> {
        let batches = self.load().await?;
        let mut config = self.config.clone();
        config.pipeline.target_total_leads = usize::MAX;
        self.execute_with(&config, batches).await
    }

    async fn load(&self) -> Result<Vec<SourceBatch>> {
        let batches = match self.source.load_batches().await {
            Ok(batches) => batches,
            Err(e) => {
                metrics::source::load_error();
                return Err(e);
            }
        };

        for batch in &batches {
            metrics::source::batch_loaded(&batch.data_source);
            if batch.records.is_empty() {
                warn!("Source batch '{}' is empty", batch.data_source);
            }
        }
        info!(
            "Loaded {} batches with {} records",
            batches.len(),
            batches.iter().map(|b| b.records.len()).sum::<usize>()
        );
        Ok(batches)
    }

    async fn execute(&self, batches: Vec<SourceBatch>) -> Result<RunReport> {
        self.execute_with(&self.config, batches).await
    }

    async fn execute_with(&self, config: &LeadConfig, batches: Vec<SourceBatch>) -> Result<RunReport> {
        if self.parallel {
            return Ok(fan_in::run_parallel(config, batches).await?);
        }

        let mut run = PipelineRun::new(config)?;
        for batch in batches {
            run.collect(batch.into_tagged_records())?;
        }
        Ok(run.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::json_output_adapter::MemorySink;
    use crate::types::{LeadCategory, RawRecord};
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticSource {
        batches: Vec<SourceBatch>,
    }

    #[async_trait]
    impl RawRecordSource for StaticSource {
        async fn load_batches(&self) -> Result<Vec<SourceBatch>> {
            Ok(self.batches.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RawRecordSource for FailingSource {
        async fn load_batches(&self) -> Result<Vec<SourceBatch>> {
            anyhow::bail!("source offline")
        }
    }

    fn create_test_source() -> Arc<StaticSource> {
        let record = |value: serde_json::Value| -> RawRecord { serde_json::from_value(value).unwrap() };
        Arc::new(StaticSource {
            batches: vec![
                SourceBatch::new(
                    "LinkedIn",
                    vec![record(json!({
                        "name": "Jane Doe Freelance Dev",
                        "website": "HTTP://JaneDev.IO/",
                        "industry": "software",
                        "pain_points": "manual scheduling, repetitive data entry",
                        "email": "jane@janedev.io",
                        "data_source": "LinkedIn"
                    }))],
                ),
                SourceBatch::new(
                    "Clutch.co",
                    vec![
                        record(json!({ "name": "Acme", "website": "acme.com", "data_source": "Clutch.co" })),
                        record(json!({ "name": "Nope", "website": "not a url", "data_source": "Clutch.co" })),
                    ],
                ),
            ],
        })
    }

    #[tokio::test]
    async fn test_qualify_writes_to_sink() {
        let sink = Arc::new(MemorySink::new());
        let use_case = QualifyUseCase::new(create_test_source(), sink.clone(), LeadConfig::default());

        let (report, summary) = use_case.run().await.unwrap();
        assert_eq!(report.qualified.len(), 1);
        assert_eq!(report.qualified[0].category(), LeadCategory::Developer);
        assert_eq!(summary.summary.rejected_records, 1);

        let runs = sink.runs().await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].0.run_id, report.run_id);
    }

    #[tokio::test]
    async fn test_parallel_and_sequential_agree() {
        let sequential = QualifyUseCase::new(create_test_source(), Arc::new(MemorySink::new()), LeadConfig::default())
            .run()
            .await
            .unwrap()
            .0;
        let parallel = QualifyUseCase::new(create_test_source(), Arc::new(MemorySink::new()), LeadConfig::default())
            .with_parallel(true)
            .run()
            .await
            .unwrap()
            .0;

        assert_eq!(sequential.stats, parallel.stats);
    }

    #[tokio::test]
    async fn test_score_all_ignores_target() {
        let mut config = LeadConfig::default();
        config.pipeline.target_total_leads = 1;
        config.pipeline.min_score = 1.0;
        let use_case = QualifyUseCase::new(create_test_source(), Arc::new(MemorySink::new()), config);

        let report = use_case.score_all().await.unwrap();
        assert_eq!(report.stats.scored, 2);
        assert_eq!(report.stats.unevaluated, 0);
    }

    #[tokio::test]
    async fn test_sequential_run_tags_untagged_records() {
        let source = Arc::new(StaticSource {
            batches: vec![SourceBatch::new(
                "Product Hunt",
                vec![serde_json::from_value(json!({ "name": "Acme", "website": "acme.com" })).unwrap()],
            )],
        });
        let use_case = QualifyUseCase::new(source, Arc::new(MemorySink::new()), LeadConfig::default());

        let report = use_case.score_all().await.unwrap();
        assert_eq!(report.below_threshold[0].classified.lead.data_source, "Product Hunt");
        assert_eq!(report.input_by_source.get("Product Hunt"), Some(&1));
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let use_case = QualifyUseCase::new(Arc::new(FailingSource), Arc::new(MemorySink::new()), LeadConfig::default());
        let err = use_case.run().await.unwrap_err();
        assert!(err.to_string().contains("source offline"));
    }
}
