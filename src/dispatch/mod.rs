//! Evaluation run coordination.
//!
//! A run resets the benchmark, lists every scenario, selects a sample,
//! dispatches each selected case to the counterparty one at a time and then
//! fetches the aggregate score once. Dispatch is strictly sequential: every
//! exchange after the first continues the conversation the first one opened.

pub mod config;
pub mod coordinator;
pub mod run;

pub use config::{RunConfig, RunParams};
pub use coordinator::DispatchCoordinator;
pub use run::{CaseOutcome, CaseRecord, EvaluationRun};
