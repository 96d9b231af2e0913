// Observability: metrics and monitoring

pub mod metrics;

pub use metrics::{init, render};
