//! The PLAN → CONTINUE → OUTPUT loop.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use todoclaw_core::event::{DomainEvent, EventBus};
use todoclaw_core::todo::TodoStore;
use tracing::{debug, info, warn};

use crate::decision::{ContinueStep, Decision, PlanStep, ToolArgs};
use crate::invoker::ModelInvoker;
use crate::operations::{OperationOutcome, TodoOperations};
use crate::parser::parse_response;
use crate::prompt::{PromptContext, SYSTEM_PROMPT, build_prompt};

/// Default step budget per request.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

pub const UNRECOGNIZED_RESPONSE_MESSAGE: &str =
    "I'm having trouble understanding the response format. Please try again.";

pub const TOO_MANY_STEPS_MESSAGE: &str =
    "The operation took too many steps. Please try breaking it down into simpler requests.";

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model produced an OUTPUT
    Completed,
    /// The model could not be reached
    ModelError,
    /// A reply decoded but was not a PLAN, CONTINUE or OUTPUT
    UnrecognizedResponse,
    /// The step budget ran out
    Exhausted,
    /// Something else went wrong inside an iteration
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ModelError => "model_error",
            Self::UnrecognizedResponse => "unrecognized_response",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

/// What happened on one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepRecord {
    Plan {
        iteration: u32,
        tool: String,
        args: Option<ToolArgs>,
        outcome: OperationOutcome,
    },
    Continue {
        iteration: u32,
        tool: String,
        args: Option<ToolArgs>,
        outcome: OperationOutcome,
    },
    Output {
        iteration: u32,
        action_taken: String,
    },
    /// The reply could not be decoded; the same prompt was sent again.
    Undecodable {
        iteration: u32,
        reason: String,
    },
}

/// Full report of one request.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    /// The message for the user
    pub message: String,
    pub status: RunStatus,
    /// Model calls made
    pub iterations: u32,
    pub steps: Vec<StepRecord>,
}

/// Where the loop goes after one iteration.
enum Transition {
    Next(Option<PromptContext>),
    Retry,
    Finish(RunStatus, String),
}

/// The todo agent: drives the model through a bounded decision loop and runs
/// the storage operations it asks for.
pub struct TodoAgent {
    invoker: Arc<dyn ModelInvoker>,
    operations: TodoOperations,
    system_prompt: String,
    max_iterations: u32,
    event_bus: Arc<EventBus>,
}

impl TodoAgent {
    pub fn new(invoker: Arc<dyn ModelInvoker>, store: Arc<dyn TodoStore>) -> Self {
        let event_bus = Arc::new(EventBus::default());
        Self {
            invoker,
            operations: TodoOperations::new(store).with_event_bus(event_bus.clone()),
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            event_bus,
        }
    }

    /// Apply `[agent]` settings from the config.
    pub fn from_config(
        config: &todoclaw_config::AppConfig,
        invoker: Arc<dyn ModelInvoker>,
        store: Arc<dyn TodoStore>,
    ) -> Self {
        let agent = Self::new(invoker, store).with_max_iterations(config.agent.max_iterations);
        match &config.agent.system_prompt_override {
            Some(prompt) => agent.with_system_prompt(prompt.clone()),
            None => agent,
        }
    }

    /// Set the step budget. Zero is raised to one.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Replace the built-in instructions.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Share an event bus with observers.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.operations = TodoOperations::new(self.operations.store().clone())
            .with_event_bus(event_bus.clone());
        self.event_bus = event_bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn store(&self) -> &Arc<dyn TodoStore> {
        self.operations.store()
    }

    /// Handle one request and return only the user-facing message.
    pub async fn process_request(&self, user_input: &str) -> String {
        self.run(user_input).await.message
    }

    /// Handle one request.
    pub async fn run(&self, user_input: &str) -> AgentRun {
        info!(input_len = user_input.len(), "Processing todo request");
        self.event_bus.publish(DomainEvent::RequestReceived {
            input_preview: user_input.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        let mut steps = Vec::new();
        let mut prompt = build_prompt(&self.system_prompt, user_input, None);
        let mut iteration = 0;

        let (status, message) = loop {
            if iteration >= self.max_iterations {
                warn!(iterations = iteration, "Step budget exhausted");
                break (RunStatus::Exhausted, TOO_MANY_STEPS_MESSAGE.to_string());
            }
            iteration += 1;
            debug!(iteration, "Agent loop iteration");

            match self.iterate(iteration, &prompt, &mut steps).await {
                Ok(Transition::Next(context)) => {
                    prompt = build_prompt(&self.system_prompt, user_input, context.as_ref());
                }
                Ok(Transition::Retry) => {}
                Ok(Transition::Finish(status, message)) => break (status, message),
                Err(e) => {
                    warn!(iteration, error = %e, "Iteration failed");
                    self.publish_error("agent_loop", &e.to_string());
                    break (
                        RunStatus::Failed,
                        format!("An error occurred while processing your request: {e}"),
                    );
                }
            }
        };

        info!(status = status.as_str(), iterations = iteration, "Todo request finished");
        self.event_bus.publish(DomainEvent::ResponseGenerated {
            iterations: iteration,
            status: status.as_str().to_string(),
            timestamp: Utc::now(),
        });

        AgentRun {
            message,
            status,
            iterations: iteration,
            steps,
        }
    }

    /// One model call and whatever it asks for.
    async fn iterate(
        &self,
        iteration: u32,
        prompt: &str,
        steps: &mut Vec<StepRecord>,
    ) -> todoclaw_core::Result<Transition> {
        let raw = match self.invoker.call(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(iteration, error = %e, "Model call failed");
                self.publish_error("model_invoker", &e.to_string());
                return Ok(Transition::Finish(
                    RunStatus::ModelError,
                    format!("Error processing request: {e}"),
                ));
            }
        };

        let value = match parse_response(&raw) {
            Ok(value) => value,
            // Not terminal: the same prompt goes out again and the step budget
            // bounds the retries, ending in TOO_MANY_STEPS_MESSAGE.
            Err(e) => {
                warn!(iteration, error = %e, "Undecodable model reply, re-issuing prompt");
                steps.push(StepRecord::Undecodable {
                    iteration,
                    reason: e.reason,
                });
                return Ok(Transition::Retry);
            }
        };

        let decision = match Decision::from_value(value) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(iteration, error = %e, "Unrecognized decision shape");
                return Ok(Transition::Finish(
                    RunStatus::UnrecognizedResponse,
                    UNRECOGNIZED_RESPONSE_MESSAGE.to_string(),
                ));
            }
        };
        debug!(iteration, decision = decision.tag(), "Model decision");

        match decision {
            Decision::Plan(plan) => self.run_plan(iteration, plan, steps).await,
            Decision::Continue(step) => Ok(self.run_continue(iteration, step, steps).await),
            Decision::Output(output) => {
                steps.push(StepRecord::Output {
                    iteration,
                    action_taken: output.action_taken,
                });
                Ok(Transition::Finish(RunStatus::Completed, output.message))
            }
        }
    }

    async fn run_plan(
        &self,
        iteration: u32,
        plan: PlanStep,
        steps: &mut Vec<StepRecord>,
    ) -> todoclaw_core::Result<Transition> {
        let outcome = self.operations.execute(&plan.tool, plan.args.as_ref()).await;
        steps.push(StepRecord::Plan {
            iteration,
            tool: plan.tool.clone(),
            args: plan.args.clone(),
            outcome: outcome.clone(),
        });

        let context = if plan.is_multi_step && outcome.success {
            PromptContext::Continue {
                tool: plan.tool,
                args: plan.args,
                success: outcome.success,
                result: outcome.output,
            }
        } else {
            PromptContext::Output {
                plan: serde_json::to_value(&plan)?,
                success: outcome.success,
                result: outcome.output,
            }
        };
        Ok(Transition::Next(Some(context)))
    }

    async fn run_continue(
        &self,
        iteration: u32,
        step: ContinueStep,
        steps: &mut Vec<StepRecord>,
    ) -> Transition {
        let outcome = self.operations.execute(&step.tool, step.args.as_ref()).await;
        steps.push(StepRecord::Continue {
            iteration,
            tool: step.tool.clone(),
            args: step.args.clone(),
            outcome: outcome.clone(),
        });

        let OperationOutcome { success, output } = outcome;
        let context = if step.is_final_step || !success {
            PromptContext::FinalOutput {
                tool: step.tool,
                args: step.args,
                success,
                result: output,
            }
        } else {
            PromptContext::Continue {
                tool: step.tool,
                args: step.args,
                success,
                result: output,
            }
        };
        Transition::Next(Some(context))
    }

    fn publish_error(&self, context: &str, message: &str) {
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: context.to_string(),
            error_message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}
