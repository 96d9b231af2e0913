// Common utilities shared across pipeline stages

pub mod text;
