//! Sweep Executor
//!
//! Runs the planned grid and turns its results into reports.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Vec<TrialConfig> (from the planner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │    sweep    │  One trial at a time, CSV row after each
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  execution  │  Monitor + process control around one trial
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  SweepReport with metadata and winner
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - `RunOrchestrator`, one trial end to end
//! - [`sweep`] - `SweepRunner`, the grid loop with progress and persistence
//! - [`report`] - Report building
//! - [`formatting`] - Human-readable output formatting
//! - [`metadata`] - System metadata collection

mod execution;
mod formatting;
mod metadata;
mod report;
mod sweep;

pub use execution::{ExecutionConfig, RunOrchestrator};
pub use formatting::format_human_output;
pub use metadata::build_report_meta;
pub use report::build_report;
pub use sweep::SweepRunner;
