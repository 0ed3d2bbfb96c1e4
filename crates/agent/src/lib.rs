//! The todo agent, the heart of todoclaw.
//!
//! Each request runs a bounded **PLAN → CONTINUE → OUTPUT** loop:
//!
//! 1. **Prompt** the model with the instructions and the user's text
//! 2. **Parse** the reply into a [`Decision`], tolerating formatting noise
//! 3. **Execute** the storage operation a PLAN or CONTINUE asks for
//! 4. **Fold** the outcome into the next prompt and loop back to step 1
//! 5. **Return** the message of the first OUTPUT
//!
//! The loop stops at the first OUTPUT, on a model error, or when the step
//! budget runs out. Every ending produces a message for the user.

pub mod decision;
pub mod invoker;
pub mod loop_runner;
pub mod operations;
pub mod parser;
pub mod prompt;

pub use decision::{ContinueStep, Decision, FinalOutput, PlanStep, ShapeError, ToolArgs};
pub use invoker::{InvokerError, ModelInvoker, ProviderInvoker};
pub use loop_runner::{AgentRun, RunStatus, StepRecord, TodoAgent};
pub use operations::{OperationOutcome, TodoOperations};
pub use parser::{DecodeError, parse_response, repair_string_concatenation};
pub use prompt::{PromptContext, SYSTEM_PROMPT, build_prompt};
