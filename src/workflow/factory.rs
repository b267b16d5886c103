//! Action registry and factory
//!
//! The factory turns raw [`ActionDefinition`]s into the typed [`Action`] tree
//! the runner interprets. Composite definitions (conditional branches, loop
//! bodies, try/catch blocks) are materialized recursively and eagerly at load
//! time; template definitions only have their name checked, since expansion
//! is deferred to run time.
//!
//! The registry is the extension point: new type tags can be registered with
//! a builder closure without touching the runner, which stays an exhaustive
//! match over the closed [`Action`] enum.

use std::collections::HashMap;

use tracing::debug;

use super::action::{
    Action, ClickAction, ConditionalAction, ErrorHandlingAction, LoopAction, LoopKind,
    NavigateAction, ScreenshotAction, TemplateAction, TypeAction, ValidationError, ValueSource,
    WaitAction,
};
use super::condition::Condition;
use super::definition::ActionDefinition;
use serde_json::Value;

/// Structural errors raised while materializing an action tree, carrying the
/// (parent type, field name) pair so nested failures stay traceable
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("action definition in {parent_type}.{field} has an empty type tag")]
    MissingType { parent_type: String, field: String },

    #[error("unknown action type '{action_type}' in {parent_type}.{field}")]
    UnknownType {
        action_type: String,
        parent_type: String,
        field: String,
    },

    #[error("invalid '{action_type}' action in {parent_type}.{field}: {source}")]
    Invalid {
        action_type: String,
        parent_type: String,
        field: String,
        #[source]
        source: ValidationError,
    },

    #[error("field '{field}' of '{parent_type}' must be a list of action definitions")]
    NotAList { parent_type: String, field: String },

    #[error("element {index} of {parent_type}.{field} is not an action definition: {error}")]
    MalformedElement {
        parent_type: String,
        field: String,
        index: usize,
        error: String,
    },
}

/// What a builder can fail with: parameter validation, or a structural error
/// from recursing into nested definitions
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Builds one action variant from its raw definition
pub type Builder =
    Box<dyn Fn(&ActionDefinition, &ActionFactory) -> Result<Action, BuildError> + Send + Sync>;

/// Open mapping from type tag to builder, consulted only at factory time
pub struct ActionRegistry {
    builders: HashMap<String, Builder>,
}

impl ActionRegistry {
    /// Registry with no builders; useful for fully custom vocabularies
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registry with the nine built-in action types
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("navigate", Box::new(build_navigate));
        registry.register("click", Box::new(build_click));
        registry.register("type", Box::new(build_type));
        registry.register("wait", Box::new(build_wait));
        registry.register("screenshot", Box::new(build_screenshot));
        registry.register("conditional", Box::new(build_conditional));
        registry.register("loop", Box::new(build_loop));
        registry.register("error_handling", Box::new(build_error_handling));
        registry.register("template", Box::new(build_template));
        registry
    }

    /// Register (or replace) the builder for a type tag
    pub fn register(&mut self, tag: &str, builder: Builder) {
        self.builders.insert(tag.to_string(), builder);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.builders.contains_key(tag)
    }

    pub fn known_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    fn get(&self, tag: &str) -> Option<&Builder> {
        self.builders.get(tag)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Materializes typed action trees from stored definitions
pub struct ActionFactory {
    registry: ActionRegistry,
}

impl ActionFactory {
    pub fn new(registry: ActionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Build one action tree from a top-level definition
    pub fn create(&self, def: &ActionDefinition) -> Result<Action, FactoryError> {
        self.create_nested(def, "workflow", "actions")
    }

    /// Build a full top-level action list
    pub fn create_all(&self, defs: &[ActionDefinition]) -> Result<Vec<Action>, FactoryError> {
        defs.iter().map(|def| self.create(def)).collect()
    }

    fn create_nested(
        &self,
        def: &ActionDefinition,
        parent_type: &str,
        field: &str,
    ) -> Result<Action, FactoryError> {
        let tag = def.action_type.trim();
        if tag.is_empty() {
            return Err(FactoryError::MissingType {
                parent_type: parent_type.to_string(),
                field: field.to_string(),
            });
        }

        let builder = self
            .registry
            .get(tag)
            .ok_or_else(|| FactoryError::UnknownType {
                action_type: tag.to_string(),
                parent_type: parent_type.to_string(),
                field: field.to_string(),
            })?;

        debug!(action_type = tag, parent = parent_type, "building action");

        match builder(def, self) {
            Ok(action) => Ok(action),
            Err(BuildError::Factory(e)) => Err(e),
            Err(BuildError::Validation(source)) => Err(FactoryError::Invalid {
                action_type: tag.to_string(),
                parent_type: parent_type.to_string(),
                field: field.to_string(),
                source,
            }),
        }
    }

    /// Materialize a nested action list field; a missing field is an empty
    /// list, anything other than a list of objects is a structural error
    pub fn create_list(
        &self,
        def: &ActionDefinition,
        parent_type: &str,
        field: &str,
    ) -> Result<Vec<Action>, FactoryError> {
        let Some(raw) = def.field(field) else {
            return Ok(Vec::new());
        };
        let items = raw.as_array().ok_or_else(|| FactoryError::NotAList {
            parent_type: parent_type.to_string(),
            field: field.to_string(),
        })?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let child: ActionDefinition =
                    serde_json::from_value(item.clone()).map_err(|e| {
                        FactoryError::MalformedElement {
                            parent_type: parent_type.to_string(),
                            field: field.to_string(),
                            index,
                            error: e.to_string(),
                        }
                    })?;
                self.create_nested(&child, parent_type, field)
            })
            .collect()
    }
}

impl Default for ActionFactory {
    fn default() -> Self {
        Self::new(ActionRegistry::with_builtins())
    }
}

// ============================================================================
// Field extraction helpers
// ============================================================================

fn require_str(def: &ActionDefinition, field: &str) -> Result<String, ValidationError> {
    match def.field(field) {
        None => Err(ValidationError::MissingField(field.to_string())),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

fn optional_str(def: &ActionDefinition, field: &str) -> Result<Option<String>, ValidationError> {
    match def.field(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

fn require_f64(def: &ActionDefinition, field: &str) -> Result<f64, ValidationError> {
    def.field(field)
        .ok_or_else(|| ValidationError::MissingField(field.to_string()))?
        .as_f64()
        .ok_or_else(|| ValidationError::InvalidField {
            field: field.to_string(),
            reason: "expected a number".to_string(),
        })
}

fn require_u64(def: &ActionDefinition, field: &str) -> Result<u64, ValidationError> {
    def.field(field)
        .ok_or_else(|| ValidationError::MissingField(field.to_string()))?
        .as_u64()
        .ok_or_else(|| ValidationError::InvalidField {
            field: field.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
}

fn require_condition(def: &ActionDefinition) -> Result<Condition, ValidationError> {
    let raw = def
        .field("condition")
        .ok_or_else(|| ValidationError::MissingField("condition".to_string()))?;
    let condition = Condition::from_value(raw)?;
    condition.validate()?;
    Ok(condition)
}

// ============================================================================
// Built-in builders
// ============================================================================

fn build_navigate(def: &ActionDefinition, _: &ActionFactory) -> Result<Action, BuildError> {
    let action = NavigateAction {
        name: def.name.clone(),
        url: require_str(def, "url")?,
    };
    action.validate()?;
    Ok(Action::Navigate(action))
}

fn build_click(def: &ActionDefinition, _: &ActionFactory) -> Result<Action, BuildError> {
    let action = ClickAction {
        name: def.name.clone(),
        selector: require_str(def, "selector")?,
        success_check: optional_str(def, "success_check")?,
        failure_check: optional_str(def, "failure_check")?,
    };
    action.validate()?;
    Ok(Action::Click(action))
}

fn build_type(def: &ActionDefinition, _: &ActionFactory) -> Result<Action, BuildError> {
    let raw_value = def
        .field("value")
        .ok_or_else(|| ValidationError::MissingField("value".to_string()))?;
    let action = TypeAction {
        name: def.name.clone(),
        selector: require_str(def, "selector")?,
        value: ValueSource::from_value(raw_value)?,
    };
    action.validate()?;
    Ok(Action::Type(action))
}

fn build_wait(def: &ActionDefinition, _: &ActionFactory) -> Result<Action, BuildError> {
    let action = WaitAction {
        name: def.name.clone(),
        seconds: require_f64(def, "seconds")?,
    };
    action.validate()?;
    Ok(Action::Wait(action))
}

fn build_screenshot(def: &ActionDefinition, _: &ActionFactory) -> Result<Action, BuildError> {
    let action = ScreenshotAction {
        name: def.name.clone(),
        path: require_str(def, "path")?,
    };
    action.validate()?;
    Ok(Action::Screenshot(action))
}

fn build_conditional(
    def: &ActionDefinition,
    factory: &ActionFactory,
) -> Result<Action, BuildError> {
    Ok(Action::Conditional(ConditionalAction {
        name: def.name.clone(),
        condition: require_condition(def)?,
        true_actions: factory.create_list(def, "conditional", "true_actions")?,
        false_actions: factory.create_list(def, "conditional", "false_actions")?,
    }))
}

fn build_loop(def: &ActionDefinition, factory: &ActionFactory) -> Result<Action, BuildError> {
    let loop_type = require_str(def, "loop_type")?;
    let kind = match loop_type.as_str() {
        "count" => LoopKind::Count(require_u64(def, "count")?),
        "for_each" => LoopKind::ForEach {
            source: require_str(def, "source")?,
        },
        "while" => LoopKind::While(require_condition(def)?),
        other => {
            return Err(ValidationError::InvalidField {
                field: "loop_type".to_string(),
                reason: format!("expected count, for_each or while, got '{other}'"),
            }
            .into());
        }
    };

    let action = Action::Loop(LoopAction {
        name: def.name.clone(),
        kind,
        actions: factory.create_list(def, "loop", "actions")?,
    });
    action.validate().map_err(BuildError::Validation)?;
    Ok(action)
}

fn build_error_handling(
    def: &ActionDefinition,
    factory: &ActionFactory,
) -> Result<Action, BuildError> {
    Ok(Action::ErrorHandling(ErrorHandlingAction {
        name: def.name.clone(),
        try_actions: factory.create_list(def, "error_handling", "try_actions")?,
        catch_actions: factory.create_list(def, "error_handling", "catch_actions")?,
    }))
}

fn build_template(def: &ActionDefinition, _: &ActionFactory) -> Result<Action, BuildError> {
    let template = require_str(def, "template")?;
    if template.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "template".to_string(),
            reason: "template name must not be empty".to_string(),
        }
        .into());
    }
    Ok(Action::Template(TemplateAction {
        name: def.name.clone(),
        template,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn factory() -> ActionFactory {
        ActionFactory::default()
    }

    #[test]
    fn test_create_leaf() {
        let def = ActionDefinition::new("navigate").with_field("url", "https://example.com");
        let action = factory().create(&def).unwrap();
        assert!(matches!(action, Action::Navigate(_)));
        assert_eq!(action.action_type(), "navigate");
    }

    #[test]
    fn test_unknown_type_names_parent_and_field() {
        let def = ActionDefinition::new("teleport");
        let err = factory().create(&def).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("teleport"));
        assert!(message.contains("workflow.actions"));
    }

    #[test]
    fn test_nested_unknown_type_is_traceable() {
        let def = ActionDefinition::new("loop")
            .with_field("loop_type", "count")
            .with_field("count", 2)
            .with_field("actions", json!([{ "type": "teleport" }]));

        let err = factory().create(&def).unwrap_err();
        match err {
            FactoryError::UnknownType {
                action_type,
                parent_type,
                field,
            } => {
                assert_eq!(action_type, "teleport");
                assert_eq!(parent_type, "loop");
                assert_eq!(field, "actions");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_failure_is_wrapped() {
        let def = ActionDefinition::new("wait").with_field("seconds", -2.5);
        let err = factory().create(&def).unwrap_err();
        assert!(matches!(err, FactoryError::Invalid { .. }));
        assert!(err.to_string().contains("wait"));
    }

    #[test]
    fn test_missing_nested_field_is_empty_list() {
        let def = ActionDefinition::new("error_handling")
            .with_field("try_actions", json!([{ "type": "wait", "seconds": 1.5 }]));
        let action = factory().create(&def).unwrap();
        match action {
            Action::ErrorHandling(a) => {
                assert_eq!(a.try_actions.len(), 1);
                assert!(a.catch_actions.is_empty());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_nested_field_must_be_a_list() {
        let def = ActionDefinition::new("loop")
            .with_field("loop_type", "count")
            .with_field("count", 1)
            .with_field("actions", "not-a-list");
        let err = factory().create(&def).unwrap_err();
        assert!(matches!(err, FactoryError::NotAList { .. }));
    }

    #[test]
    fn test_template_not_expanded_at_factory_time() {
        // "missing" resolves nowhere, but the factory only validates the name
        let def = ActionDefinition::new("template").with_field("template", "missing");
        let action = factory().create(&def).unwrap();
        assert!(matches!(action, Action::Template(_)));

        let empty = ActionDefinition::new("template").with_field("template", "");
        assert!(factory().create(&empty).is_err());
    }

    #[test]
    fn test_registry_is_open_for_extension() {
        let mut registry = ActionRegistry::with_builtins();
        // alias tag mapping onto an existing variant
        registry.register(
            "open_page",
            Box::new(|def, _| {
                let action = NavigateAction {
                    name: def.name.clone(),
                    url: require_str(def, "url")?,
                };
                action.validate()?;
                Ok(Action::Navigate(action))
            }),
        );
        assert!(registry.contains("open_page"));

        let factory = ActionFactory::new(registry);
        let def = ActionDefinition::new("open_page").with_field("url", "https://example.com");
        assert!(matches!(
            factory.create(&def).unwrap(),
            Action::Navigate(_)
        ));
    }

    #[test]
    fn test_round_trip_simple() {
        let def = ActionDefinition::new("click")
            .with_name("press submit")
            .with_field("selector", "#submit")
            .with_field("success_check", "#done");
        let action = factory().create(&def).unwrap();
        assert_eq!(action.to_definition(), def);
    }

    #[test]
    fn test_round_trip_nested() {
        let def = ActionDefinition::new("conditional")
            .with_field(
                "condition",
                json!({ "kind": "element_present", "selector": "#banner" }),
            )
            .with_field(
                "true_actions",
                json!([{ "type": "click", "selector": "#dismiss" }]),
            )
            .with_field("false_actions", json!([]));

        let action = factory().create(&def).unwrap();
        let back = action.to_definition();
        assert_eq!(back.to_value(), def.to_value());
    }
}
