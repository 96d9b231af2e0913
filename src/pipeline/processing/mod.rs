// Pipeline processing: normalization, deduplication, classification and scoring

pub mod classify;
pub mod dedupe;
pub mod normalize;
pub mod score;
