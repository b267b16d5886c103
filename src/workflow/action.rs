//! Typed action tree
//!
//! [`Action`] is the closed set of node variants the runner interprets:
//! five leaf actions that talk to the driver, and four composite actions that
//! own child action lists (Conditional, Loop, ErrorHandling) or a template
//! name resolved at run time (Template). The tree is immutable after the
//! factory builds it; only the execution context mutates during a run.
//!
//! Every variant validates its parameters, executes (leaves only — composite
//! semantics live in the runner), and serializes back to the raw definition
//! form, so `create` followed by `to_definition` round-trips.

use serde_json::{json, Value};

use super::condition::Condition;
use super::context::{value_to_string, ExecutionContext};
use super::definition::ActionDefinition;
use crate::driver::{CredentialLookup, Driver, DriverError, LookupError};

/// Rejected action parameters, raised at factory time before execution starts
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

/// A leaf action failure, captured by the runner as a FAILURE result
#[derive(Debug, thiserror::Error)]
pub enum ActionExecutionError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("credential lookup failed: {0}")]
    Credential(#[from] LookupError),

    #[error("{0}")]
    CheckFailed(String),

    #[error("context variable '{0}' is not set")]
    MissingVariable(String),
}

impl ActionExecutionError {
    /// Stable identifier recorded in results and `try_block_error_type`
    pub fn kind(&self) -> &'static str {
        match self {
            ActionExecutionError::Driver(e) => e.kind(),
            ActionExecutionError::Credential(_) => "credential_error",
            ActionExecutionError::CheckFailed(_) => "check_failed",
            ActionExecutionError::MissingVariable(_) => "missing_variable",
        }
    }
}

/// Where a typed value comes from at execute time
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// The text itself
    Literal(String),

    /// A field of a stored credential, resolved through the lookup capability
    Credential { name: String, field: String },

    /// A context variable, enabling parameterization and template reuse
    Variable(String),
}

impl ValueSource {
    /// Parse the raw `value` field: a plain string is a literal, an object is
    /// tagged by its `source` field
    pub fn from_value(raw: &Value) -> Result<Self, ValidationError> {
        match raw {
            Value::String(s) => Ok(ValueSource::Literal(s.clone())),
            Value::Object(map) => {
                let source = map.get("source").and_then(Value::as_str).ok_or_else(|| {
                    ValidationError::InvalidField {
                        field: "value".to_string(),
                        reason: "object form requires a 'source' tag".to_string(),
                    }
                })?;
                match source {
                    "literal" => {
                        let text = map.get("value").and_then(Value::as_str).ok_or_else(|| {
                            ValidationError::InvalidField {
                                field: "value".to_string(),
                                reason: "literal source requires a string 'value'".to_string(),
                            }
                        })?;
                        Ok(ValueSource::Literal(text.to_string()))
                    }
                    "credential" => {
                        let name = require_map_str(map, "name")?;
                        let field = require_map_str(map, "field")?;
                        Ok(ValueSource::Credential { name, field })
                    }
                    "context" => {
                        let variable = require_map_str(map, "variable")?;
                        Ok(ValueSource::Variable(variable))
                    }
                    other => Err(ValidationError::InvalidField {
                        field: "value".to_string(),
                        reason: format!("unknown value source '{other}'"),
                    }),
                }
            }
            _ => Err(ValidationError::InvalidField {
                field: "value".to_string(),
                reason: "expected a string or a tagged object".to_string(),
            }),
        }
    }

    /// Rebuild the raw field value; plain literals serialize back to a string
    pub fn to_value(&self) -> Value {
        match self {
            ValueSource::Literal(text) => Value::String(text.clone()),
            ValueSource::Credential { name, field } => {
                json!({ "source": "credential", "name": name, "field": field })
            }
            ValueSource::Variable(variable) => {
                json!({ "source": "context", "variable": variable })
            }
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let bad = |reason: &str| ValidationError::InvalidField {
            field: "value".to_string(),
            reason: reason.to_string(),
        };
        match self {
            ValueSource::Literal(_) => Ok(()),
            ValueSource::Credential { name, field } => {
                if name.trim().is_empty() {
                    return Err(bad("credential name must not be empty"));
                }
                if field.trim().is_empty() {
                    return Err(bad("credential field must not be empty"));
                }
                Ok(())
            }
            ValueSource::Variable(variable) => {
                if variable.trim().is_empty() {
                    return Err(bad("context variable name must not be empty"));
                }
                Ok(())
            }
        }
    }

    /// Resolve to concrete text at execute time
    pub async fn resolve(
        &self,
        credentials: &dyn CredentialLookup,
        ctx: &ExecutionContext,
    ) -> Result<String, ActionExecutionError> {
        match self {
            ValueSource::Literal(text) => Ok(text.clone()),
            ValueSource::Credential { name, field } => {
                Ok(credentials.resolve(name, field).await?)
            }
            ValueSource::Variable(variable) => ctx
                .get(variable)
                .map(value_to_string)
                .ok_or_else(|| ActionExecutionError::MissingVariable(variable.clone())),
        }
    }
}

fn require_map_str(
    map: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, ValidationError> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::InvalidField {
            field: "value".to_string(),
            reason: format!("missing string field '{key}'"),
        })
}

// ============================================================================
// Leaf actions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NavigateAction {
    pub name: Option<String>,
    pub url: String,
}

impl NavigateAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty("url", &self.url)
    }

    pub async fn execute(&self, driver: &dyn Driver) -> Result<String, ActionExecutionError> {
        driver.navigate(&self.url).await?;
        Ok(format!("navigated to {}", self.url))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickAction {
    pub name: Option<String>,
    pub selector: String,
    /// Selector that must be present after the click for it to count
    pub success_check: Option<String>,
    /// Selector that, when present after the click, marks it failed
    pub failure_check: Option<String>,
}

impl ClickAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty("selector", &self.selector)
    }

    pub async fn execute(&self, driver: &dyn Driver) -> Result<String, ActionExecutionError> {
        driver.click(&self.selector).await?;

        if let Some(failure_check) = &self.failure_check {
            if driver.element_present(failure_check).await? {
                return Err(ActionExecutionError::CheckFailed(format!(
                    "failure indicator '{failure_check}' appeared after clicking '{}'",
                    self.selector
                )));
            }
        }
        if let Some(success_check) = &self.success_check {
            if !driver.element_present(success_check).await? {
                return Err(ActionExecutionError::CheckFailed(format!(
                    "success indicator '{success_check}' missing after clicking '{}'",
                    self.selector
                )));
            }
        }

        Ok(format!("clicked {}", self.selector))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAction {
    pub name: Option<String>,
    pub selector: String,
    pub value: ValueSource,
}

impl TypeAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty("selector", &self.selector)?;
        self.value.validate()
    }

    pub async fn execute(
        &self,
        driver: &dyn Driver,
        credentials: &dyn CredentialLookup,
        ctx: &ExecutionContext,
    ) -> Result<String, ActionExecutionError> {
        let text = self.value.resolve(credentials, ctx).await?;
        driver.type_text(&self.selector, &text).await?;
        Ok(format!("typed into {}", self.selector))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitAction {
    pub name: Option<String>,
    pub seconds: f64,
}

impl WaitAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.seconds.is_finite() || self.seconds < 0.0 {
            return Err(ValidationError::InvalidField {
                field: "seconds".to_string(),
                reason: format!("wait duration must be >= 0, got {}", self.seconds),
            });
        }
        Ok(())
    }

    pub async fn execute(&self, driver: &dyn Driver) -> Result<String, ActionExecutionError> {
        driver.wait(self.seconds).await?;
        Ok(format!("waited {}s", self.seconds))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotAction {
    pub name: Option<String>,
    pub path: String,
}

impl ScreenshotAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty("path", &self.path)
    }

    pub async fn execute(&self, driver: &dyn Driver) -> Result<String, ActionExecutionError> {
        driver.screenshot(&self.path).await?;
        Ok(format!("saved screenshot to {}", self.path))
    }
}

// ============================================================================
// Composite actions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalAction {
    pub name: Option<String>,
    pub condition: Condition,
    pub true_actions: Vec<Action>,
    pub false_actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopKind {
    /// Fixed number of passes
    Count(u64),
    /// One pass per element of a context list variable
    ForEach { source: String },
    /// Re-evaluate the condition before every pass, bounded by the runner's
    /// iteration cap
    While(Condition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopAction {
    pub name: Option<String>,
    pub kind: LoopKind,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorHandlingAction {
    pub name: Option<String>,
    pub try_actions: Vec<Action>,
    pub catch_actions: Vec<Action>,
}

/// Named indirection: only the name is validated at factory time, expansion
/// happens in the runner through the template-lookup capability
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAction {
    pub name: Option<String>,
    pub template: String,
}

// ============================================================================
// The closed action variant set
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(NavigateAction),
    Click(ClickAction),
    Type(TypeAction),
    Wait(WaitAction),
    Screenshot(ScreenshotAction),
    Conditional(ConditionalAction),
    Loop(LoopAction),
    ErrorHandling(ErrorHandlingAction),
    Template(TemplateAction),
}

impl Action {
    /// The canonical type tag this variant serializes under
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::Navigate(_) => "navigate",
            Action::Click(_) => "click",
            Action::Type(_) => "type",
            Action::Wait(_) => "wait",
            Action::Screenshot(_) => "screenshot",
            Action::Conditional(_) => "conditional",
            Action::Loop(_) => "loop",
            Action::ErrorHandling(_) => "error_handling",
            Action::Template(_) => "template",
        }
    }

    /// Explicit name, or the type tag
    pub fn display_name(&self) -> String {
        let name = match self {
            Action::Navigate(a) => &a.name,
            Action::Click(a) => &a.name,
            Action::Type(a) => &a.name,
            Action::Wait(a) => &a.name,
            Action::Screenshot(a) => &a.name,
            Action::Conditional(a) => &a.name,
            Action::Loop(a) => &a.name,
            Action::ErrorHandling(a) => &a.name,
            Action::Template(a) => &a.name,
        };
        name.clone().unwrap_or_else(|| self.action_type().to_string())
    }

    /// Validate this node and, for composites, every child
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Action::Navigate(a) => a.validate(),
            Action::Click(a) => a.validate(),
            Action::Type(a) => a.validate(),
            Action::Wait(a) => a.validate(),
            Action::Screenshot(a) => a.validate(),
            Action::Conditional(a) => {
                a.condition.validate()?;
                validate_all(&a.true_actions)?;
                validate_all(&a.false_actions)
            }
            Action::Loop(a) => {
                match &a.kind {
                    LoopKind::Count(_) => {}
                    LoopKind::ForEach { source } => non_empty("source", source)?,
                    LoopKind::While(condition) => condition.validate()?,
                }
                validate_all(&a.actions)
            }
            Action::ErrorHandling(a) => {
                validate_all(&a.try_actions)?;
                validate_all(&a.catch_actions)
            }
            Action::Template(a) => non_empty("template", &a.template),
        }
    }

    /// Rebuild the raw definition this action was created from
    pub fn to_definition(&self) -> ActionDefinition {
        let mut def = ActionDefinition::new(self.action_type());
        match self {
            Action::Navigate(a) => {
                def.name = a.name.clone();
                def = def.with_field("url", a.url.clone());
            }
            Action::Click(a) => {
                def.name = a.name.clone();
                def = def.with_field("selector", a.selector.clone());
                if let Some(success_check) = &a.success_check {
                    def = def.with_field("success_check", success_check.clone());
                }
                if let Some(failure_check) = &a.failure_check {
                    def = def.with_field("failure_check", failure_check.clone());
                }
            }
            Action::Type(a) => {
                def.name = a.name.clone();
                def = def
                    .with_field("selector", a.selector.clone())
                    .with_field("value", a.value.to_value());
            }
            Action::Wait(a) => {
                def.name = a.name.clone();
                def = def.with_field("seconds", a.seconds);
            }
            Action::Screenshot(a) => {
                def.name = a.name.clone();
                def = def.with_field("path", a.path.clone());
            }
            Action::Conditional(a) => {
                def.name = a.name.clone();
                def = def
                    .with_field("condition", a.condition.to_value())
                    .with_field("true_actions", serialize_all(&a.true_actions))
                    .with_field("false_actions", serialize_all(&a.false_actions));
            }
            Action::Loop(a) => {
                def.name = a.name.clone();
                def = match &a.kind {
                    LoopKind::Count(count) => def
                        .with_field("loop_type", "count")
                        .with_field("count", *count),
                    LoopKind::ForEach { source } => def
                        .with_field("loop_type", "for_each")
                        .with_field("source", source.clone()),
                    LoopKind::While(condition) => def
                        .with_field("loop_type", "while")
                        .with_field("condition", condition.to_value()),
                };
                def = def.with_field("actions", serialize_all(&a.actions));
            }
            Action::ErrorHandling(a) => {
                def.name = a.name.clone();
                def = def
                    .with_field("try_actions", serialize_all(&a.try_actions))
                    .with_field("catch_actions", serialize_all(&a.catch_actions));
            }
            Action::Template(a) => {
                def.name = a.name.clone();
                def = def.with_field("template", a.template.clone());
            }
        }
        def
    }
}

fn validate_all(actions: &[Action]) -> Result<(), ValidationError> {
    for action in actions {
        action.validate()?;
    }
    Ok(())
}

fn serialize_all(actions: &[Action]) -> Value {
    Value::Array(
        actions
            .iter()
            .map(|action| action.to_definition().to_value())
            .collect(),
    )
}

fn non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_leaves() {
        let good = NavigateAction {
            name: None,
            url: "https://example.com".to_string(),
        };
        assert!(good.validate().is_ok());

        let empty = NavigateAction {
            name: None,
            url: " ".to_string(),
        };
        assert!(empty.validate().is_err());

        let negative = WaitAction {
            name: None,
            seconds: -1.0,
        };
        assert!(negative.validate().is_err());

        let zero = WaitAction {
            name: None,
            seconds: 0.0,
        };
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn test_value_source_parsing() {
        let literal = ValueSource::from_value(&json!("hello")).unwrap();
        assert_eq!(literal, ValueSource::Literal("hello".to_string()));

        let credential = ValueSource::from_value(&json!({
            "source": "credential", "name": "gmail", "field": "username"
        }))
        .unwrap();
        assert_eq!(
            credential,
            ValueSource::Credential {
                name: "gmail".to_string(),
                field: "username".to_string()
            }
        );

        let variable =
            ValueSource::from_value(&json!({ "source": "context", "variable": "loop_item" }))
                .unwrap();
        assert_eq!(variable, ValueSource::Variable("loop_item".to_string()));

        assert!(ValueSource::from_value(&json!({ "source": "telepathy" })).is_err());
        assert!(ValueSource::from_value(&json!(17)).is_err());
    }

    #[test]
    fn test_value_source_round_trip() {
        let sources = [
            ValueSource::Literal("plain".to_string()),
            ValueSource::Credential {
                name: "db".to_string(),
                field: "password".to_string(),
            },
            ValueSource::Variable("row".to_string()),
        ];
        for source in sources {
            assert_eq!(ValueSource::from_value(&source.to_value()).unwrap(), source);
        }
    }

    #[tokio::test]
    async fn test_resolve_variable_missing() {
        let credentials = crate::driver::MockCredentials::new();
        let ctx = ExecutionContext::new();
        let source = ValueSource::Variable("nope".to_string());

        let err = source.resolve(&credentials, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "missing_variable");
    }

    #[tokio::test]
    async fn test_click_checks() {
        let driver = crate::driver::MockDriver::new();
        driver.mark_absent("#welcome").await;

        let click = ClickAction {
            name: None,
            selector: "#login".to_string(),
            success_check: Some("#welcome".to_string()),
            failure_check: None,
        };
        let err = click.execute(&driver).await.unwrap_err();
        assert_eq!(err.kind(), "check_failed");
    }

    #[test]
    fn test_validate_recurses_into_children() {
        let action = Action::Loop(LoopAction {
            name: None,
            kind: LoopKind::Count(2),
            actions: vec![Action::Navigate(NavigateAction {
                name: None,
                url: String::new(),
            })],
        });
        assert!(action.validate().is_err());
    }
}
