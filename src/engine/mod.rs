//! Execution engine
//!
//! This module contains:
//! - `runner` - Depth-first interpreter over typed action trees
//! - `result` - Per-action results, summaries and run reports
//! - `cancel` - Cooperative cancellation signal
//! - `config` - Runner tuning knobs and their YAML loading
//! - `error` - Structural error taxonomy

pub mod cancel;
pub mod config;
pub mod error;
pub mod result;
pub mod runner;

pub use cancel::CancellationSignal;
pub use config::{LoopFailurePolicy, RunnerConfig};
pub use error::EngineError;
pub use result::{ActionResult, ActionStatus, ExecutionSummary, RunReport, RunStatus};
pub use runner::WorkflowRunner;
