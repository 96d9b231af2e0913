pub mod json_output_adapter;
pub mod json_source_adapter;
