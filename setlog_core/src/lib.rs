#![forbid(unsafe_code)]

//! Core domain model and business logic for setlog, a volume-based
//! workout tracker.
//!
//! This crate provides:
//! - Domain types (exercises, history entries, training interval)
//! - Volume ledger (remaining volume per exercise)
//! - Aggregate load statistics
//! - Workout suggestions
//! - Priority-weighted volume allocation and per-group plans
//! - Persistence (library store, CSV export) and configuration

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod ledger;
pub mod stats;
pub mod suggest;
pub mod allocator;
pub mod plan;
pub mod catalog;
pub mod steps;
pub mod store;
pub mod csv_export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use ledger::{DecayModel, VolumeLedger, VolumePolicy};
pub use stats::{load_report, LoadCategory, LoadReport, StepSeries};
pub use suggest::{suggest_workout, SuggestedWorkout, SuggestionLimits};
pub use allocator::allocate;
pub use plan::VolumePlan;
pub use catalog::{default_plan, onboard, starter_templates};
pub use steps::load_step_series;
pub use store::Library;
pub use csv_export::export_history_csv;
