use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::app::ports::RawRecordSource;
use crate::constants::{fields, UNKNOWN_SOURCE};
use crate::pipeline::fan_in::SourceBatch;
use crate::types::RawRecord;

/// Reads raw records from JSON array or JSON Lines files, one batch per file
pub struct JsonFileSource {
    pub paths: Vec<PathBuf>,
}

impl JsonFileSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Parse file content; a leading `[` means a JSON array, anything else
    /// is read as one object per non-blank line
    pub fn parse_records(content: &str, path: &Path) -> anyhow::Result<Vec<RawRecord>> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('[') {
            return serde_json::from_str(trimmed)
                .map_err(|e| anyhow::anyhow!("Failed to parse JSON array in {:?}: {}", path, e));
        }

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line)
                    .map_err(|e| anyhow::anyhow!("Failed to parse line {} of {:?}: {}", index + 1, path, e))
            })
            .collect()
    }

    /// File stem used as the data source of records that carry none
    fn default_source(path: &Path) -> String {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(String::from)
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
    }

    async fn load_file(&self, path: &Path) -> anyhow::Result<SourceBatch> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read input file {:?}: {}", path, e))?;
        let fallback = Self::default_source(path);

        let records: Vec<RawRecord> = Self::parse_records(&content, path)?
            .into_iter()
            .map(|record| {
                if record.first_text(fields::DATA_SOURCE).is_some() {
                    record
                } else {
                    record.with("data_source", fallback.clone())
                }
            })
            .collect();

        // A file from one collector is ordered by that collector's priority
        let first = records.first().and_then(RawRecord::data_source);
        let data_source = match first {
            Some(source) if records.iter().all(|r| r.data_source().as_ref() == Some(&source)) => source,
            _ => fallback,
        };

        debug!("Read {} records from {:?} as '{}'", records.len(), path, data_source);
        Ok(SourceBatch::new(data_source, records))
    }
}

#[async_trait]
impl RawRecordSource for JsonFileSource {
    async fn load_batches(&self) -> anyhow::Result<Vec<SourceBatch>> {
        let mut batches = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            batches.push(self.load_file(path).await?);
        }
        info!("Loaded {} input files", batches.len());
        Ok(batches)
    }
}
