//! Condition grammar shared by conditional actions and `while` loops
//!
//! A condition is evaluated fresh each time it is consulted: element presence
//! and script conditions go through the driver, variable equality reads the
//! execution context.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::action::ValidationError;
use super::context::ExecutionContext;
use crate::driver::{Driver, DriverError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// True when the selector matches an element on the page
    ElementPresent { selector: String },

    /// True when the selector matches nothing
    ElementAbsent { selector: String },

    /// True when the context variable equals the expected value;
    /// an unset variable compares as not-equal
    VariableEquals { variable: String, value: Value },

    /// True when the script result is truthy
    Script { code: String },
}

impl Condition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Condition::ElementPresent { selector } | Condition::ElementAbsent { selector } => {
                if selector.trim().is_empty() {
                    return Err(ValidationError::InvalidField {
                        field: "condition".to_string(),
                        reason: "selector must not be empty".to_string(),
                    });
                }
            }
            Condition::VariableEquals { variable, .. } => {
                if variable.trim().is_empty() {
                    return Err(ValidationError::InvalidField {
                        field: "condition".to_string(),
                        reason: "variable must not be empty".to_string(),
                    });
                }
            }
            Condition::Script { code } => {
                if code.trim().is_empty() {
                    return Err(ValidationError::InvalidField {
                        field: "condition".to_string(),
                        reason: "script code must not be empty".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub async fn evaluate(
        &self,
        driver: &dyn Driver,
        ctx: &ExecutionContext,
    ) -> Result<bool, DriverError> {
        match self {
            Condition::ElementPresent { selector } => driver.element_present(selector).await,
            Condition::ElementAbsent { selector } => {
                Ok(!driver.element_present(selector).await?)
            }
            Condition::VariableEquals { variable, value } => {
                Ok(ctx.get(variable) == Some(value))
            }
            Condition::Script { code } => Ok(is_truthy(&driver.evaluate_script(code).await?)),
        }
    }

    /// Parse a condition from the raw `condition` field of a definition
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value.clone()).map_err(|e| ValidationError::InvalidField {
            field: "condition".to_string(),
            reason: e.to_string(),
        })
    }

    /// Rebuild the raw field value (inverse of [`from_value`](Self::from_value))
    pub fn to_value(&self) -> Value {
        match self {
            Condition::ElementPresent { selector } => {
                json!({ "kind": "element_present", "selector": selector })
            }
            Condition::ElementAbsent { selector } => {
                json!({ "kind": "element_absent", "selector": selector })
            }
            Condition::VariableEquals { variable, value } => {
                json!({ "kind": "variable_equals", "variable": variable, "value": value })
            }
            Condition::Script { code } => json!({ "kind": "script", "code": code }),
        }
    }

    /// Short description for result messages
    pub fn describe(&self) -> String {
        match self {
            Condition::ElementPresent { selector } => format!("element_present({selector})"),
            Condition::ElementAbsent { selector } => format!("element_absent({selector})"),
            Condition::VariableEquals { variable, .. } => format!("variable_equals({variable})"),
            Condition::Script { .. } => "script".to_string(),
        }
    }
}

/// JSON truthiness: null and false are falsy, as are 0, "", "false",
/// empty arrays and empty objects
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
