use anyhow::Result;
use async_trait::async_trait;

use crate::pipeline::fan_in::SourceBatch;
use crate::pipeline::orchestrator::RunReport;
use crate::report::SummaryReport;

/// Where raw records come from; collectors and file readers sit behind it
#[async_trait]
pub trait RawRecordSource: Send + Sync {
    async fn load_batches(&self) -> Result<Vec<SourceBatch>>;
}

/// Where a finished run goes: export files, a database, a test buffer
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn write_run(&self, report: &RunReport, summary: &SummaryReport) -> Result<()>;
}
