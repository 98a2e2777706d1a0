//! Classification and aggregation pipeline.
//!
//! Records flow one way:
//! 1. `MailSource::fetch()` — raw application and meeting records
//! 2. `Classifier::evaluate()` / `extract_domain()` — per-record, pure
//! 3. `build_funnel()` — key-based grouping and ghosted arithmetic
//! 4. `report::emit()` — text or JSON output

pub mod domain;
pub mod funnel;
pub mod processor;
pub mod rules;
pub mod types;
