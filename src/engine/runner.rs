//! Workflow runner - the tree interpreter
//!
//! Walks a typed action tree depth-first, left to right, threading one
//! mutable execution context through every nested call. The runner owns the
//! control-flow semantics: branching, iteration, exception capture and
//! recovery, and run-time template expansion. Driver failures are captured
//! as FAILURE results and never escape as errors; cancellation is polled
//! cooperatively at every suspension point.

use async_recursion::async_recursion;
use chrono::Utc;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::cancel::CancellationSignal;
use super::config::{LoopFailurePolicy, RunnerConfig};
use super::error::EngineError;
use super::result::{ActionResult, ActionStatus, ExecutionSummary, RunReport, RunStatus};
use crate::driver::{CredentialLookup, Driver, LookupError, TemplateLookup};
use crate::workflow::action::{
    Action, ActionExecutionError, ConditionalAction, ErrorHandlingAction, LoopAction, LoopKind,
    TemplateAction,
};
use crate::workflow::condition::Condition;
use crate::workflow::context::{keys, ExecutionContext};
use crate::workflow::{ActionDefinition, ActionFactory};

/// How a sequence of actions ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceOutcome {
    /// Every action reported SUCCESS
    Completed,
    /// An action failed and the rest of the sequence was halted
    Failed,
    /// Cancellation was observed; remaining actions were marked SKIPPED
    Cancelled,
}

/// Interprets action trees against caller-owned capabilities
pub struct WorkflowRunner<'a> {
    driver: &'a dyn Driver,
    credentials: &'a dyn CredentialLookup,
    templates: &'a dyn TemplateLookup,
    cancel: CancellationSignal,
    config: RunnerConfig,
    factory: ActionFactory,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(
        driver: &'a dyn Driver,
        credentials: &'a dyn CredentialLookup,
        templates: &'a dyn TemplateLookup,
        cancel: CancellationSignal,
    ) -> Self {
        Self {
            driver,
            credentials,
            templates,
            cancel,
            config: RunnerConfig::default(),
            factory: ActionFactory::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the factory used for run-time template expansion (custom
    /// registries propagate into templates this way)
    pub fn with_factory(mut self, factory: ActionFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Run a materialized action tree to completion
    #[instrument(skip(self, actions, context), fields(workflow = workflow_name))]
    pub async fn run(
        &self,
        workflow_name: &str,
        actions: &[Action],
        context: &mut ExecutionContext,
    ) -> RunReport {
        let start_time = Utc::now();
        let started = Instant::now();
        info!(actions = actions.len(), "starting workflow run");

        let mut results = Vec::new();
        let outcome = self.run_sequence(actions, context, 0, &mut results).await;

        let final_status = match outcome {
            SequenceOutcome::Completed => RunStatus::Success,
            SequenceOutcome::Failed => RunStatus::Failed,
            SequenceOutcome::Cancelled => RunStatus::Cancelled,
        };
        let summary = ExecutionSummary::from_results(&results);
        info!(
            status = ?final_status,
            total = summary.total,
            failures = summary.failure_count,
            "workflow run finished"
        );

        RunReport {
            workflow_name: workflow_name.to_string(),
            run_id: context.run_id.clone(),
            start_time,
            end_time: Utc::now(),
            duration_seconds: started.elapsed().as_secs_f64(),
            final_status,
            action_results: results,
            summary,
        }
    }

    /// Build the tree from raw definitions, then run it. Structural errors
    /// surface here, before any action executes.
    pub async fn run_definitions(
        &self,
        workflow_name: &str,
        definitions: &[ActionDefinition],
        context: &mut ExecutionContext,
    ) -> Result<RunReport, EngineError> {
        let actions = self.factory.create_all(definitions)?;
        Ok(self.run(workflow_name, &actions, context).await)
    }

    /// Execute a sequence depth-first. Fail-fast: the first FAILURE halts the
    /// rest of the sequence. Cancellation marks the current and remaining
    /// actions SKIPPED.
    #[async_recursion]
    async fn run_sequence(
        &self,
        actions: &[Action],
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> SequenceOutcome {
        for (index, action) in actions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.skip_remaining(&actions[index..], results);
                return SequenceOutcome::Cancelled;
            }

            match self.run_action(action, ctx, depth, results).await {
                ActionStatus::Success | ActionStatus::Skipped => {}
                ActionStatus::Failure => return SequenceOutcome::Failed,
                ActionStatus::Cancelled => {
                    self.skip_remaining(&actions[index + 1..], results);
                    return SequenceOutcome::Cancelled;
                }
            }
        }
        SequenceOutcome::Completed
    }

    /// Dispatch one action. Returns the status of the action's own result;
    /// composite actions append their children's results before their own.
    async fn run_action(
        &self,
        action: &Action,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        debug!(
            action = %action.display_name(),
            action_type = action.action_type(),
            "executing action"
        );
        match action {
            Action::Navigate(a) => self.record_leaf(action, a.execute(self.driver).await, results),
            Action::Click(a) => self.record_leaf(action, a.execute(self.driver).await, results),
            Action::Type(a) => self.record_leaf(
                action,
                a.execute(self.driver, self.credentials, ctx).await,
                results,
            ),
            Action::Wait(a) => self.record_leaf(action, a.execute(self.driver).await, results),
            Action::Screenshot(a) => {
                self.record_leaf(action, a.execute(self.driver).await, results)
            }
            Action::Conditional(a) => self.run_conditional(a, ctx, depth, results).await,
            Action::Loop(a) => self.run_loop(a, ctx, depth, results).await,
            Action::ErrorHandling(a) => self.run_error_handling(a, ctx, depth, results).await,
            Action::Template(a) => self.run_template(a, ctx, depth, results).await,
        }
    }

    /// Convert a leaf outcome into a result; driver errors stop here
    fn record_leaf(
        &self,
        action: &Action,
        outcome: Result<String, ActionExecutionError>,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        let name = action.display_name();
        let action_type = action.action_type();
        match outcome {
            Ok(message) => {
                results.push(ActionResult::success(name, action_type, message));
                ActionStatus::Success
            }
            Err(error) => {
                warn!(action = %name, %error, "action failed");
                results.push(ActionResult::failure(
                    name,
                    action_type,
                    error.to_string(),
                    error.kind(),
                ));
                ActionStatus::Failure
            }
        }
    }

    async fn run_conditional(
        &self,
        conditional: &ConditionalAction,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        let name = conditional
            .name
            .clone()
            .unwrap_or_else(|| "conditional".to_string());

        let taken = match conditional.condition.evaluate(self.driver, ctx).await {
            Ok(value) => value,
            Err(error) => {
                warn!(action = %name, %error, "condition evaluation failed");
                results.push(ActionResult::failure(
                    name,
                    "conditional",
                    format!(
                        "condition {} failed to evaluate: {error}",
                        conditional.condition.describe()
                    ),
                    "condition_error",
                ));
                return ActionStatus::Failure;
            }
        };

        let (branch, branch_name) = if taken {
            (&conditional.true_actions, "true")
        } else {
            (&conditional.false_actions, "false")
        };
        debug!(action = %name, branch = branch_name, "condition evaluated");

        // An empty or absent branch is a no-op success
        if branch.is_empty() {
            results.push(ActionResult::success(
                name,
                "conditional",
                format!(
                    "condition {} took empty {branch_name} branch",
                    conditional.condition.describe()
                ),
            ));
            return ActionStatus::Success;
        }

        match self.run_sequence(branch, ctx, depth, results).await {
            SequenceOutcome::Completed => {
                results.push(ActionResult::success(
                    name,
                    "conditional",
                    format!(
                        "condition {} took {branch_name} branch",
                        conditional.condition.describe()
                    ),
                ));
                ActionStatus::Success
            }
            SequenceOutcome::Failed => {
                results.push(ActionResult::failure(
                    name,
                    "conditional",
                    format!("{branch_name} branch failed"),
                    "action_failure",
                ));
                ActionStatus::Failure
            }
            SequenceOutcome::Cancelled => {
                results.push(ActionResult::cancelled(
                    name,
                    "conditional",
                    format!("cancelled during {branch_name} branch"),
                ));
                ActionStatus::Cancelled
            }
        }
    }

    async fn run_loop(
        &self,
        loop_action: &LoopAction,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        // Loop keys are scoped to this loop; siblings see the previous values
        let saved = ctx.snapshot(&keys::LOOP_KEYS);
        let status = self.run_loop_inner(loop_action, ctx, depth, results).await;
        ctx.restore(saved);
        status
    }

    async fn run_loop_inner(
        &self,
        loop_action: &LoopAction,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        let name = loop_action.name.clone().unwrap_or_else(|| "loop".to_string());

        match &loop_action.kind {
            LoopKind::Count(count) => {
                self.run_counted(loop_action, &name, *count as usize, None, ctx, depth, results)
                    .await
            }
            LoopKind::ForEach { source } => {
                let Some(items) = ctx.get(source).and_then(Value::as_array).cloned() else {
                    results.push(ActionResult::failure(
                        name,
                        "loop",
                        format!("context variable '{source}' is not a list"),
                        "missing_variable",
                    ));
                    return ActionStatus::Failure;
                };
                let total = items.len();
                self.run_counted(loop_action, &name, total, Some(items), ctx, depth, results)
                    .await
            }
            LoopKind::While(condition) => {
                self.run_while(loop_action, &name, condition, ctx, depth, results)
                    .await
            }
        }
    }

    /// Shared body for count and for_each loops
    #[allow(clippy::too_many_arguments)]
    async fn run_counted(
        &self,
        loop_action: &LoopAction,
        name: &str,
        total: usize,
        items: Option<Vec<Value>>,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        let mut failed_iterations = 0usize;

        for index in 0..total {
            // Iteration boundary is a suspension point
            if self.cancel.is_cancelled() {
                self.skip_iterations(name, index, total, results);
                results.push(ActionResult::cancelled(
                    name.to_string(),
                    "loop",
                    format!("cancelled after {index} of {total} iteration(s)"),
                ));
                return ActionStatus::Cancelled;
            }

            ctx.set(keys::LOOP_INDEX, index);
            ctx.set(keys::LOOP_ITERATION, index + 1);
            ctx.set(keys::LOOP_TOTAL, total);
            if let Some(items) = &items {
                ctx.set(keys::LOOP_ITEM, items[index].clone());
            }

            match self
                .run_sequence(&loop_action.actions, ctx, depth, results)
                .await
            {
                SequenceOutcome::Completed => {}
                SequenceOutcome::Failed => match self.config.loop_failure_policy {
                    LoopFailurePolicy::Abort => {
                        results.push(ActionResult::failure(
                            name.to_string(),
                            "loop",
                            format!("iteration {} failed, loop aborted", index + 1),
                            "action_failure",
                        ));
                        return ActionStatus::Failure;
                    }
                    LoopFailurePolicy::Continue => {
                        failed_iterations += 1;
                    }
                },
                SequenceOutcome::Cancelled => {
                    self.skip_iterations(name, index + 1, total, results);
                    results.push(ActionResult::cancelled(
                        name.to_string(),
                        "loop",
                        format!("cancelled during iteration {} of {total}", index + 1),
                    ));
                    return ActionStatus::Cancelled;
                }
            }
        }

        let message = if failed_iterations > 0 {
            format!("completed {total} iteration(s), {failed_iterations} failed")
        } else {
            format!("completed {total} iteration(s)")
        };
        results.push(ActionResult::success(name.to_string(), "loop", message));
        ActionStatus::Success
    }

    async fn run_while(
        &self,
        loop_action: &LoopAction,
        name: &str,
        condition: &Condition,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        let mut iterations = 0u64;
        let mut failed_iterations = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                results.push(ActionResult::cancelled(
                    name.to_string(),
                    "loop",
                    format!("cancelled after {iterations} iteration(s)"),
                ));
                return ActionStatus::Cancelled;
            }

            match condition.evaluate(self.driver, ctx).await {
                Ok(false) => break,
                Ok(true) => {}
                Err(error) => {
                    results.push(ActionResult::failure(
                        name.to_string(),
                        "loop",
                        format!(
                            "while condition {} failed to evaluate: {error}",
                            condition.describe()
                        ),
                        "condition_error",
                    ));
                    return ActionStatus::Failure;
                }
            }

            // A re-evaluated condition guarantees nothing about termination
            if iterations >= self.config.max_while_iterations {
                results.push(ActionResult::failure(
                    name.to_string(),
                    "loop",
                    format!(
                        "aborted after {iterations} iteration(s): exceeded cap of {}",
                        self.config.max_while_iterations
                    ),
                    "loop_iteration_limit",
                ));
                return ActionStatus::Failure;
            }

            ctx.set(keys::LOOP_INDEX, iterations);
            ctx.set(keys::LOOP_ITERATION, iterations + 1);
            iterations += 1;

            match self
                .run_sequence(&loop_action.actions, ctx, depth, results)
                .await
            {
                SequenceOutcome::Completed => {}
                SequenceOutcome::Failed => match self.config.loop_failure_policy {
                    LoopFailurePolicy::Abort => {
                        results.push(ActionResult::failure(
                            name.to_string(),
                            "loop",
                            format!("iteration {iterations} failed, loop aborted"),
                            "action_failure",
                        ));
                        return ActionStatus::Failure;
                    }
                    LoopFailurePolicy::Continue => {
                        failed_iterations += 1;
                    }
                },
                SequenceOutcome::Cancelled => {
                    results.push(ActionResult::cancelled(
                        name.to_string(),
                        "loop",
                        format!("cancelled during iteration {iterations}"),
                    ));
                    return ActionStatus::Cancelled;
                }
            }
        }

        let message = if failed_iterations > 0 {
            format!("while loop finished after {iterations} iteration(s), {failed_iterations} failed")
        } else {
            format!("while loop finished after {iterations} iteration(s)")
        };
        results.push(ActionResult::success(name.to_string(), "loop", message));
        ActionStatus::Success
    }

    async fn run_error_handling(
        &self,
        handler: &ErrorHandlingAction,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        let name = handler
            .name
            .clone()
            .unwrap_or_else(|| "error_handling".to_string());
        let try_start = results.len();

        match self
            .run_sequence(&handler.try_actions, ctx, depth, results)
            .await
        {
            SequenceOutcome::Completed => {
                results.push(ActionResult::success(
                    name,
                    "error_handling",
                    "try block completed".to_string(),
                ));
                ActionStatus::Success
            }
            SequenceOutcome::Cancelled => {
                results.push(ActionResult::cancelled(
                    name,
                    "error_handling",
                    "cancelled during try block".to_string(),
                ));
                ActionStatus::Cancelled
            }
            SequenceOutcome::Failed => {
                // Expose the root cause to the catch branch; composites record
                // their failure after their children, so the first failure in
                // the try span is the deepest one
                let (message, kind) = results[try_start..]
                    .iter()
                    .find(|r| r.status == ActionStatus::Failure)
                    .map(|r| {
                        (
                            r.message.clone(),
                            r.error_kind
                                .clone()
                                .unwrap_or_else(|| r.action_type.clone()),
                        )
                    })
                    .unwrap_or_else(|| {
                        ("try block failed".to_string(), "action_failure".to_string())
                    });

                ctx.set(keys::TRY_BLOCK_ERROR_MESSAGE, message.clone());
                ctx.set(keys::TRY_BLOCK_ERROR_TYPE, kind);
                info!(action = %name, error = %message, "try block failed, running catch actions");

                if handler.catch_actions.is_empty() {
                    results.push(ActionResult::failure(
                        name,
                        "error_handling",
                        format!("try block failed with no catch actions: {message}"),
                        "action_failure",
                    ));
                    return ActionStatus::Failure;
                }

                match self
                    .run_sequence(&handler.catch_actions, ctx, depth, results)
                    .await
                {
                    SequenceOutcome::Completed => {
                        results.push(ActionResult::success(
                            name,
                            "error_handling",
                            format!("recovered from: {message}"),
                        ));
                        ActionStatus::Success
                    }
                    SequenceOutcome::Failed => {
                        results.push(ActionResult::failure(
                            name,
                            "error_handling",
                            format!("catch block failed after: {message}"),
                            "action_failure",
                        ));
                        ActionStatus::Failure
                    }
                    SequenceOutcome::Cancelled => {
                        results.push(ActionResult::cancelled(
                            name,
                            "error_handling",
                            "cancelled during catch block".to_string(),
                        ));
                        ActionStatus::Cancelled
                    }
                }
            }
        }
    }

    async fn run_template(
        &self,
        template: &TemplateAction,
        ctx: &mut ExecutionContext,
        depth: u32,
        results: &mut Vec<ActionResult>,
    ) -> ActionStatus {
        let name = template
            .name
            .clone()
            .unwrap_or_else(|| template.template.clone());

        // The factory cannot see template cycles; the depth guard catches
        // direct and transitive self-reference at run time
        if depth >= self.config.max_template_depth {
            results.push(ActionResult::failure(
                name,
                "template",
                format!(
                    "template '{}' exceeded expansion depth {}",
                    template.template, self.config.max_template_depth
                ),
                "template_recursion_limit",
            ));
            return ActionStatus::Failure;
        }

        let definitions = match self.templates.resolve(&template.template).await {
            Ok(definitions) => definitions,
            Err(LookupError::NotFound(_)) => {
                let error = EngineError::TemplateResolution(template.template.clone());
                warn!(template = %template.template, "template resolution failed");
                results.push(ActionResult::failure(
                    name,
                    "template",
                    error.to_string(),
                    "template_resolution_error",
                ));
                return ActionStatus::Failure;
            }
            Err(error) => {
                results.push(ActionResult::failure(
                    name,
                    "template",
                    format!("template '{}' lookup failed: {error}", template.template),
                    "template_lookup_error",
                ));
                return ActionStatus::Failure;
            }
        };

        // Just-in-time expansion through the same factory as load time
        let actions = match self.factory.create_all(&definitions) {
            Ok(actions) => actions,
            Err(error) => {
                results.push(ActionResult::failure(
                    name,
                    "template",
                    format!("template '{}' is invalid: {error}", template.template),
                    "factory_error",
                ));
                return ActionStatus::Failure;
            }
        };

        debug!(template = %template.template, actions = actions.len(), "expanding template");
        match self.run_sequence(&actions, ctx, depth + 1, results).await {
            SequenceOutcome::Completed => {
                results.push(ActionResult::success(
                    name,
                    "template",
                    format!(
                        "template '{}' expanded {} action(s)",
                        template.template,
                        actions.len()
                    ),
                ));
                ActionStatus::Success
            }
            SequenceOutcome::Failed => {
                results.push(ActionResult::failure(
                    name,
                    "template",
                    format!("template '{}' failed", template.template),
                    "action_failure",
                ));
                ActionStatus::Failure
            }
            SequenceOutcome::Cancelled => {
                results.push(ActionResult::cancelled(
                    name,
                    "template",
                    format!("cancelled inside template '{}'", template.template),
                ));
                ActionStatus::Cancelled
            }
        }
    }

    fn skip_remaining(&self, actions: &[Action], results: &mut Vec<ActionResult>) {
        for action in actions {
            results.push(ActionResult::skipped(
                action.display_name(),
                action.action_type(),
                "skipped after cancellation".to_string(),
            ));
        }
    }

    fn skip_iterations(
        &self,
        name: &str,
        from: usize,
        total: usize,
        results: &mut Vec<ActionResult>,
    ) {
        for iteration in from..total {
            results.push(ActionResult::skipped(
                format!("{name} iteration {}", iteration + 1),
                "loop",
                "skipped after cancellation".to_string(),
            ));
        }
    }
}
