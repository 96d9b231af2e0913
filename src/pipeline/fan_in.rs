//! Parallel fan-in of independent source batches.
//!
//! Batches are normalized concurrently on the blocking pool, then put into
//! one fixed order before the run deduplicates them: source priority, then
//! discovery time (undated last), then batch position, then record position.
//! The run's output is the same as feeding that order to a single run.

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::{LeadConfig, SourceSettings};
use crate::error::Result;
use crate::pipeline::orchestrator::{NormalizationOutcome, PipelineRun, RunReport};
use crate::pipeline::processing::normalize::{DefaultNormalizer, Normalizer};
use crate::types::RawRecord;

/// Records delivered by one collector
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub data_source: String,
    pub records: Vec<RawRecord>,
}

impl SourceBatch {
    pub fn new(data_source: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            data_source: data_source.into(),
            records,
        }
    }

    /// The batch's records, with the batch source filled in where a record
    /// names none
    pub fn into_tagged_records(self) -> Vec<RawRecord> {
        let data_source = self.data_source;
        self.records
            .into_iter()
            .map(|record| {
                if record.data_source().is_some() {
                    record
                } else {
                    record.with("data_source", data_source.clone())
                }
            })
            .collect()
    }
}

/// Positions `(batch, record)` in the order deduplication must see them
pub fn merge_order(batches: &[SourceBatch], sources: &SourceSettings) -> Vec<(usize, usize)> {
    let mut keyed: Vec<_> = batches
        .iter()
        .enumerate()
        .flat_map(|(batch_index, batch)| {
            let priority = sources.priority_of(&batch.data_source);
            batch.records.iter().enumerate().map(move |(record_index, record)| {
                let discovered = record.discovered_at();
                (
                    (priority, discovered.is_none(), discovered, batch_index, record_index),
                    (batch_index, record_index),
                )
            })
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, position)| position).collect()
}

/// Normalize every batch in parallel and return the outcomes in merge order
pub async fn normalize_in_parallel<N>(
    normalizer: Arc<N>,
    batches: Vec<SourceBatch>,
    sources: &SourceSettings,
) -> Result<Vec<NormalizationOutcome>>
where
    N: Normalizer + Send + Sync + 'static,
{
    let order = merge_order(&batches, sources);
    let batch_count = batches.len();

    let mut tasks = JoinSet::new();
    for (batch_index, batch) in batches.into_iter().enumerate() {
        let normalizer = Arc::clone(&normalizer);
        tasks.spawn_blocking(move || {
            debug!(
                "Normalizing batch {} from {} ({} records)",
                batch_index,
                batch.data_source,
                batch.records.len()
            );
            let outcomes: Vec<Option<NormalizationOutcome>> = batch
                .into_tagged_records()
                .iter()
                .map(|record| Some(normalizer.normalize(record)))
                .collect();
            (batch_index, outcomes)
        });
    }

    let mut normalized: Vec<Vec<Option<NormalizationOutcome>>> = vec![Vec::new(); batch_count];
    while let Some(joined) = tasks.join_next().await {
        let (batch_index, outcomes) = joined?;
        normalized[batch_index] = outcomes;
    }

    Ok(order
        .into_iter()
        .filter_map(|(batch_index, record_index)| normalized[batch_index][record_index].take())
        .collect())
}

/// Run the whole pipeline over several batches with parallel normalization
pub async fn run_parallel(config: &LeadConfig, batches: Vec<SourceBatch>) -> Result<RunReport> {
    let mut run = PipelineRun::new(config)?;
    info!(
        "Fan-in of {} batches into run {}",
        batches.len(),
        run.run_id()
    );

    let outcomes = normalize_in_parallel(Arc::new(DefaultNormalizer::new()), batches, &config.sources).await?;
    run.collect_normalized(outcomes)?;
    run.finish()
}
