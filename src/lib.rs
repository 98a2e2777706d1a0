//! Job funnel — classify job-application email and report the pipeline.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod source;
