// Lead pipeline: per-record processing stages and the run that sequences them

pub mod fan_in;
pub mod orchestrator;
pub mod processing;

pub use fan_in::{run_parallel, SourceBatch};
pub use orchestrator::{PipelineRun, RunReport, RunStage, RunStats};
