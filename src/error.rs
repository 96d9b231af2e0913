use thiserror::Error;

/// Configuration problems detected before a run starts.
///
/// Any of these would bias every score in the run, so they are surfaced at
/// start-up instead of being defaulted away.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("scoring weights must sum to 1.0, got {sum:.4}")]
    WeightsDoNotSumToOne { sum: f64 },

    #[error("scoring weight '{name}' must be within [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("industry score table is empty")]
    EmptyIndustryTable,

    #[error("industry score for '{industry}' must be within [0, 10], got {value}")]
    IndustryScoreOutOfRange { industry: String, value: f64 },

    #[error("unknown_industry_score must be within [0, 10], got {0}")]
    UnknownIndustryScoreOutOfRange(f64),

    #[error("company size score {table}.{bucket} must be within [0, 10], got {value}")]
    CompanySizeScoreOutOfRange {
        table: &'static str,
        bucket: &'static str,
        value: f64,
    },

    #[error("automation hit threshold must be at least 1")]
    ZeroAutomationThreshold,

    #[error("min_score must be within [1, 10], got {0}")]
    MinScoreOutOfRange(f64),

    #[error("target_total_leads must be at least 1")]
    ZeroTargetLeads,

    #[error("keyword list '{0}' is empty")]
    EmptyKeywordList(&'static str),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration file error: {0}")]
    ConfigFile(String),

    #[error("Invalid pipeline stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
