//! Capability interfaces consumed by the engine
//!
//! The engine never owns a browser session, a credential store, or a template
//! store. The caller supplies these as trait objects for the lifetime of one
//! run; the engine neither opens nor closes them. Every failure a capability
//! raises is caught inside the runner and turned into a FAILURE result.

use async_trait::async_trait;
use serde_json::Value;

use crate::workflow::ActionDefinition;

pub mod mock;

pub use mock::{MockCredentials, MockDriver, MockTemplates};

/// Errors raised by driver operations
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("script error: {0}")]
    ScriptError(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("driver error: {0}")]
    Other(String),
}

impl DriverError {
    /// Stable identifier for the error category, recorded in results and in
    /// the `try_block_error_type` context key
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::ElementNotFound(_) => "element_not_found",
            DriverError::NavigationFailed(_) => "navigation_failed",
            DriverError::ScriptError(_) => "script_error",
            DriverError::Timeout(_) => "timeout",
            DriverError::Other(_) => "driver_error",
        }
    }
}

/// Errors raised by the credential and template lookup capabilities
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("lookup failed: {0}")]
    Backend(String),
}

/// Browser automation operations the engine dispatches leaf actions to
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    async fn wait(&self, seconds: f64) -> Result<(), DriverError>;

    async fn screenshot(&self, path: &str) -> Result<(), DriverError>;

    async fn element_present(&self, selector: &str) -> Result<bool, DriverError>;

    async fn evaluate_script(&self, code: &str) -> Result<Value, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;
}

/// Resolves a named credential field (e.g. ("gmail", "username"))
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn resolve(&self, name: &str, field: &str) -> Result<String, LookupError>;
}

/// Resolves a named template to the action definitions it expands to
#[async_trait]
pub trait TemplateLookup: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Vec<ActionDefinition>, LookupError>;
}
