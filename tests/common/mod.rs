//! Shared helpers for integration tests
#![allow(dead_code)]

use serde_json::{json, Value};

use browserflow::driver::{MockCredentials, MockDriver, MockTemplates};
use browserflow::engine::{CancellationSignal, RunnerConfig, WorkflowRunner};
use browserflow::workflow::ActionDefinition;

/// Owns one set of mock capabilities; runners borrow from it
pub struct Harness {
    pub driver: MockDriver,
    pub credentials: MockCredentials,
    pub templates: MockTemplates,
    pub cancel: CancellationSignal,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            driver: MockDriver::new(),
            credentials: MockCredentials::new(),
            templates: MockTemplates::new(),
            cancel: CancellationSignal::new(),
        }
    }

    pub fn runner(&self) -> WorkflowRunner<'_> {
        WorkflowRunner::new(
            &self.driver,
            &self.credentials,
            &self.templates,
            self.cancel.clone(),
        )
    }

    pub fn runner_with_config(&self, config: RunnerConfig) -> WorkflowRunner<'_> {
        self.runner().with_config(config)
    }
}

/// Honor RUST_LOG when tests run with --nocapture; repeat calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn nav_def(url: &str) -> ActionDefinition {
    ActionDefinition::new("navigate").with_field("url", url)
}

pub fn click_def(selector: &str) -> ActionDefinition {
    ActionDefinition::new("click").with_field("selector", selector)
}

pub fn type_def(selector: &str, value: Value) -> ActionDefinition {
    ActionDefinition::new("type")
        .with_field("selector", selector)
        .with_field("value", value)
}

pub fn wait_def(seconds: f64) -> ActionDefinition {
    ActionDefinition::new("wait").with_field("seconds", seconds)
}

pub fn screenshot_def(path: &str) -> ActionDefinition {
    ActionDefinition::new("screenshot").with_field("path", path)
}

pub fn loop_count_def(count: u64, actions: Value) -> ActionDefinition {
    ActionDefinition::new("loop")
        .with_field("loop_type", "count")
        .with_field("count", count)
        .with_field("actions", actions)
}

pub fn loop_for_each_def(source: &str, actions: Value) -> ActionDefinition {
    ActionDefinition::new("loop")
        .with_field("loop_type", "for_each")
        .with_field("source", source)
        .with_field("actions", actions)
}

pub fn loop_while_def(condition: Value, actions: Value) -> ActionDefinition {
    ActionDefinition::new("loop")
        .with_field("loop_type", "while")
        .with_field("condition", condition)
        .with_field("actions", actions)
}

pub fn conditional_def(
    condition: Value,
    true_actions: Value,
    false_actions: Value,
) -> ActionDefinition {
    ActionDefinition::new("conditional")
        .with_field("condition", condition)
        .with_field("true_actions", true_actions)
        .with_field("false_actions", false_actions)
}

pub fn error_handling_def(try_actions: Value, catch_actions: Value) -> ActionDefinition {
    ActionDefinition::new("error_handling")
        .with_field("try_actions", try_actions)
        .with_field("catch_actions", catch_actions)
}

pub fn template_def(template: &str) -> ActionDefinition {
    ActionDefinition::new("template").with_field("template", template)
}

pub fn element_present(selector: &str) -> Value {
    json!({ "kind": "element_present", "selector": selector })
}

pub fn variable_equals(variable: &str, value: Value) -> Value {
    json!({ "kind": "variable_equals", "variable": variable, "value": value })
}

pub fn script(code: &str) -> Value {
    json!({ "kind": "script", "code": code })
}
