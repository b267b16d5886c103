//! # BrowserFlow
//!
//! A composable workflow execution engine for browser automation. Workflows
//! are stored as flat action definitions (YAML or JSON), materialized into a
//! typed action tree by a registry-driven factory, then interpreted
//! depth-first against a pluggable browser driver.
//!
//! ## Features
//!
//! - **Declarative workflows** - Flat `type` + fields records, no code
//! - **Composable actions** - Conditionals, loops, try/catch and templates
//!   nest to any depth
//! - **Open registry** - New action vocabulary registers at the factory
//!   boundary without touching the interpreter
//! - **Cooperative cancellation** - A shared signal observed at every
//!   suspension point, with skipped actions accounted for in the report
//! - **Complete reports** - One ordered result per executed or skipped
//!   action node, plus aggregate counts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use browserflow::driver::{MockCredentials, MockDriver, MockTemplates};
//! use browserflow::engine::{CancellationSignal, WorkflowRunner};
//! use browserflow::workflow::{ActionDefinition, ExecutionContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let definitions = vec![
//!         ActionDefinition::new("navigate").with_field("url", "https://example.com/login"),
//!         ActionDefinition::new("click")
//!             .with_name("open login form")
//!             .with_field("selector", "#login"),
//!     ];
//!
//!     let driver = MockDriver::new();
//!     let credentials = MockCredentials::new();
//!     let templates = MockTemplates::new();
//!     let runner = WorkflowRunner::new(
//!         &driver,
//!         &credentials,
//!         &templates,
//!         CancellationSignal::new(),
//!     );
//!
//!     let mut context = ExecutionContext::new();
//!     let report = runner.run_definitions("login", &definitions, &mut context).await?;
//!
//!     println!("run {} finished: {:?}", report.run_id, report.final_status);
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod engine;
pub mod workflow;

pub use driver::{CredentialLookup, Driver, DriverError, LookupError, TemplateLookup};
pub use engine::{
    ActionResult, ActionStatus, CancellationSignal, EngineError, ExecutionSummary,
    LoopFailurePolicy, RunReport, RunStatus, RunnerConfig, WorkflowRunner,
};
pub use workflow::{
    Action, ActionDefinition, ActionFactory, ActionRegistry, Condition, ExecutionContext,
    FactoryError, LoadError, ValidationError, WorkflowDocument, WorkflowLoader,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::driver::{CredentialLookup, Driver, DriverError, LookupError, TemplateLookup};
    pub use crate::engine::{
        ActionResult, ActionStatus, CancellationSignal, EngineError, RunReport, RunStatus,
        RunnerConfig, WorkflowRunner,
    };
    pub use crate::workflow::{
        Action, ActionDefinition, ActionFactory, ActionRegistry, Condition, ExecutionContext,
        WorkflowDocument, WorkflowLoader,
    };
}
