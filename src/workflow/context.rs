//! Execution context for workflow runtime
//!
//! One mutable variable scope is created per run and threaded by reference
//! through every nested call. Composite actions write the well-known keys in
//! [`keys`] before invoking their children; loop keys are scoped with
//! [`ExecutionContext::snapshot`] / [`ExecutionContext::restore`] so they do
//! not leak to sibling actions once a loop completes.

use std::collections::HashMap;

use serde_json::Value;

/// Well-known context keys written by composite actions
pub mod keys {
    pub const LOOP_INDEX: &str = "loop_index";
    pub const LOOP_ITEM: &str = "loop_item";
    pub const LOOP_TOTAL: &str = "loop_total";
    pub const LOOP_ITERATION: &str = "loop_iteration";
    pub const TRY_BLOCK_ERROR_MESSAGE: &str = "try_block_error_message";
    pub const TRY_BLOCK_ERROR_TYPE: &str = "try_block_error_type";

    /// Keys scoped to a loop body, restored when the loop returns
    pub const LOOP_KEYS: [&str; 4] = [LOOP_INDEX, LOOP_ITEM, LOOP_TOTAL, LOOP_ITERATION];
}

/// Runtime variable scope for one workflow run
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Run ID
    pub run_id: String,

    variables: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Create a new execution context with a generated run ID
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            variables: HashMap::new(),
        }
    }

    /// Create a context seeded with user variables
    pub fn with_variables(variables: HashMap<String, Value>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            variables,
        }
    }

    /// Set a variable
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.variables.insert(key.to_string(), value.into());
    }

    /// Get a variable
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Get a variable as a display string (strings verbatim, others as JSON)
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.variables.get(key).map(value_to_string)
    }

    /// Remove a variable
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.variables.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// All variables currently in scope
    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    /// Capture the current values of the given keys so a nested block can
    /// overwrite them and have them put back afterwards
    pub fn snapshot(&self, keys: &[&str]) -> Vec<(String, Option<Value>)> {
        keys.iter()
            .map(|key| (key.to_string(), self.variables.get(*key).cloned()))
            .collect()
    }

    /// Restore values captured by [`snapshot`](Self::snapshot)
    pub fn restore(&mut self, saved: Vec<(String, Option<Value>)>) {
        for (key, value) in saved {
            match value {
                Some(value) => {
                    self.variables.insert(key, value);
                }
                None => {
                    self.variables.remove(&key);
                }
            }
        }
    }
}

/// Render a JSON value the way a user would type it into a field
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_context_has_run_id() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.run_id.is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let mut ctx = ExecutionContext::new();
        ctx.set("user", "alice");
        ctx.set("attempts", 3);

        assert_eq!(ctx.get("user"), Some(&json!("alice")));
        assert_eq!(ctx.get_string("attempts"), Some("3".to_string()));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_seeded_variables() {
        let mut vars = HashMap::new();
        vars.insert("rows".to_string(), json!(["a", "b"]));
        let ctx = ExecutionContext::with_variables(vars);

        assert!(ctx.contains("rows"));
        assert_eq!(ctx.get("rows").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_snapshot_restores_previous_values() {
        let mut ctx = ExecutionContext::new();
        ctx.set(keys::LOOP_INDEX, 7);

        let saved = ctx.snapshot(&keys::LOOP_KEYS);
        ctx.set(keys::LOOP_INDEX, 0);
        ctx.set(keys::LOOP_ITEM, "x");
        ctx.restore(saved);

        assert_eq!(ctx.get(keys::LOOP_INDEX), Some(&json!(7)));
        assert_eq!(ctx.get(keys::LOOP_ITEM), None);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("plain")), "plain");
        assert_eq!(value_to_string(&json!(2.5)), "2.5");
        assert_eq!(value_to_string(&json!({"a": 1})), "{\"a\":1}");
    }
}
