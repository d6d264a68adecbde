//! deckbench: PowerPoint-editing benchmark orchestrator.
//!
//! The coordinating side resets the benchmark, samples cases by difficulty and
//! dispatches them one at a time to an agent under test. The responding side
//! turns each case into an LLM-generated changeset, repairs it against the
//! slide's shapes and submits it for scoring.

// Core modules
pub mod changeset;
pub mod schema;
pub mod selection;

// Run orchestration
pub mod dispatch;
pub mod responder;

// Boundaries
pub mod benchmark;
pub mod exchange;
pub mod llm;
pub mod protocol;
pub mod reporting;

pub mod cli;
pub mod config;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use changeset::{sanitize, Changeset, ChangesetSanitizer};
pub use dispatch::{DispatchCoordinator, EvaluationRun, RunConfig};
pub use error::{BenchmarkError, CaseError, ConfigError, ExchangeError, LlmError, RunError};
pub use schema::{ShapeIndex, ShapeType};
pub use selection::CaseSelector;
