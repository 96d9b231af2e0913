pub mod common;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub use config::LeadConfig;
pub use error::{ConfigError, PipelineError, Result};
pub use pipeline::{PipelineRun, RunReport, RunStage, RunStats, SourceBatch};
pub use types::{CompanySize, LeadCategory, RawRecord, RejectedRecord, RejectionReason};
