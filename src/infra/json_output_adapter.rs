use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::app::ports::LeadSink;
use crate::observability::metrics;
use crate::pipeline::orchestrator::RunReport;
use crate::pipeline::processing::score::ScoredLead;
use crate::report::SummaryReport;
use crate::types::LeadCategory;

/// Writes a finished run as pretty-printed JSON files:
/// `<prefix>_qualified.json`, `<prefix>_business.json`,
/// `<prefix>_developers.json`, `<prefix>_rejected.json` and
/// `<prefix>_report.json`
pub struct JsonFileSink {
    pub output_dir: PathBuf,
    pub prefix: String,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Path of one output file, e.g. `out/leads_qualified.json`
    pub fn path_for(&self, kind: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}.json", self.prefix, kind))
    }

    async fn write_json<T: Serialize + ?Sized>(&self, kind: &str, value: &T) -> anyhow::Result<PathBuf> {
        let path = self.path_for(kind);
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| anyhow::anyhow!("Failed to serialize {} output: {}", kind, e))?;

        if let Err(e) = tokio::fs::write(&path, bytes).await {
            metrics::output::write_error(kind);
            return Err(anyhow::anyhow!("Failed to write output file {:?}: {}", path, e));
        }
        metrics::output::write_success(kind);
        debug!("Wrote {:?}", path);
        Ok(path)
    }

    async fn ensure_output_directory(&self) -> anyhow::Result<()> {
        if !Path::new(&self.output_dir).exists() {
            tokio::fs::create_dir_all(&self.output_dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create output directory {:?}: {}", self.output_dir, e))?;
            debug!("Created output directory: {:?}", self.output_dir);
        }
        Ok(())
    }
}

fn in_category(leads: &[ScoredLead], category: LeadCategory) -> Vec<&ScoredLead> {
    leads.iter().filter(|lead| lead.category() == category).collect()
}

#[async_trait]
impl LeadSink for JsonFileSink {
    async fn write_run(&self, report: &RunReport, summary: &SummaryReport) -> anyhow::Result<()> {
        self.ensure_output_directory().await?;

        self.write_json("qualified", &report.qualified).await?;
        self.write_json("business", &in_category(&report.qualified, LeadCategory::Business))
            .await?;
        self.write_json("developers", &in_category(&report.qualified, LeadCategory::Developer))
            .await?;
        self.write_json("rejected", &report.rejected).await?;
        let report_path = self.write_json("report", summary).await?;

        info!(
            "Saved run {} to {:?} (report: {:?})",
            report.run_id, self.output_dir, report_path
        );
        Ok(())
    }
}

/// Keeps finished runs in memory; used by tests and embedding callers
#[derive(Default, Clone)]
pub struct MemorySink {
    runs: Arc<Mutex<Vec<(RunReport, SummaryReport)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn runs(&self) -> Vec<(RunReport, SummaryReport)> {
        self.runs.lock().await.clone()
    }
}

#[async_trait]
impl LeadSink for MemorySink {
    async fn write_run(&self, report: &RunReport, summary: &SummaryReport) -> anyhow::Result<()> {
        self.runs.lock().await.push((report.clone(), summary.clone()));
        Ok(())
    }
}
