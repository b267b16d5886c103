//! Engine error taxonomy
//!
//! Structural errors (validation, factory, loading) fail fast before any
//! execution begins. Execution-time driver failures never surface here: the
//! runner captures them as FAILURE results. Cancellation is a terminal run
//! status, not an error.

use crate::workflow::{FactoryError, LoadError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("factory error: {0}")]
    Factory(#[from] FactoryError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("template '{0}' could not be resolved")]
    TemplateResolution(String),
}
