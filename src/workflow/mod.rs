//! Workflow model
//!
//! This module contains:
//! - `definition` - Raw, externally supplied action records
//! - `action` - The typed, validated action tree
//! - `condition` - Condition grammar for conditionals and while loops
//! - `factory` - Registry and factory materializing definitions into actions
//! - `context` - Mutable variable scope for one run
//! - `loader` - YAML/JSON workflow document loading

pub mod action;
pub mod condition;
pub mod context;
pub mod definition;
pub mod factory;
pub mod loader;

pub use action::{
    Action, ActionExecutionError, ClickAction, ConditionalAction, ErrorHandlingAction, LoopAction,
    LoopKind, NavigateAction, ScreenshotAction, TemplateAction, TypeAction, ValidationError,
    ValueSource, WaitAction,
};
pub use condition::{is_truthy, Condition};
pub use context::{keys, value_to_string, ExecutionContext};
pub use definition::ActionDefinition;
pub use factory::{ActionFactory, ActionRegistry, BuildError, Builder, FactoryError};
pub use loader::{LoadError, WorkflowDocument, WorkflowLoader};
