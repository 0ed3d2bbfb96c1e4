//! Prompt construction for each turn of the agent loop.

use crate::decision::ToolArgs;
use serde_json::Value;

/// Built-in instructions sent ahead of every prompt.
pub const SYSTEM_PROMPT: &str = r#"You are an intelligent TodoAgent that understands natural language and manages todo tasks. You have access to database operations and should use your reasoning abilities to understand user intent, even when it is expressed indirectly or ambiguously.

Available database operations:
- get_all_todos() -> retrieves all existing todos with their IDs
- create_todos(task: str) -> creates a new todo task
- delete_todos(task: str) -> deletes a todo by text matching
- delete_todos_by_id(task_id: int) -> deletes a todo by specific ID

Understand the many ways users express intent:
- Direct commands: "Delete the market todo", "Add buy milk"
- Indirect references: "I finished that shopping thing", "Remove what I said about calling mom"
- Contextual clues: "The first one I mentioned", "That task about going somewhere"
- Emotional expressions: "I'm done with that annoying task"
- Partial descriptions: "The one with 'dumb' in it", "Something about market"
- Implicit todo statements: "I want to go to market" -> extract the actionable task "go to market"

Decision making:
1. Understand what the user really wants to accomplish.
2. Extract actionable tasks from statements.
3. Tell todo-worthy statements apart from statements that are not tasks.
4. Gather information first when you need it (for example, list the current todos).
5. Execute the right database operations.
6. Chain operations when a request needs several steps.
7. Be conversational and explain what you did.

Statement-to-todo conversion:
- "I want to go to market" -> "go to market"
- "I need to call mom" -> "call mom"
- "I should finish that report" -> "finish report"
- "Don't forget to buy groceries" -> "buy groceries"

Statements that are not todos:
- Factual observations: "There is a tree in my street"
- General comments: "The weather is nice today"
- Random thoughts: "I like chocolate"
For these, answer honestly with OUTPUT: "That doesn't sound like a todo task to me. Could you please let me know what you're trying to add more clearly?"

Multi-step examples:
- "Remove the market one" -> get all todos -> find the todo containing "market" -> delete it by ID
- "Clear everything except the school one" -> get all todos -> delete every todo not about school -> confirm
- "Change my mind about telling my friend" -> get all todos -> find the friend-related task -> delete it
- "I want to go to market" -> create the todo "go to market"
- "There is a tree in my street" -> not actionable -> ask for clarification

Technical rules:
- Return valid JSON only, with no code inside JSON strings.
- Escape newlines inside strings as \n.
- Report the actual results of database operations honestly.
- For bulk operations, process items one at a time.

Multi-step operations:
1. Use PLAN for the first database operation.
2. Use CONTINUE for each following operation.
3. Use OUTPUT only when the whole request is complete.

Return exactly ONE of these objects per reply.

PLAN (the first database operation):
{
  "PLAN": {
    "reasoning": "your analysis of what the user wants",
    "tool": "database_operation_name",
    "args": "arguments_for_operation",
    "expected_outcome": "what you expect to achieve",
    "is_multi_step": true or false,
    "next_step_intent": "what you will do after this operation (if multi-step)"
  }
}

CONTINUE (each additional database operation):
{
  "CONTINUE": {
    "reasoning": "analysis based on the previous operation result",
    "tool": "database_operation_name",
    "args": "arguments_for_operation",
    "expected_outcome": "what you expect to achieve",
    "is_final_step": true or false
  }
}

OUTPUT (your final response to the user):
{
  "OUTPUT": {
    "message": "natural, conversational response explaining what you did",
    "action_taken": "summary of the database changes actually made"
  }
}

For multi-step operations follow the sequence PLAN -> CONTINUE -> ... -> OUTPUT."#;

/// What happened on the previous turn, phrased into the next prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptContext {
    /// A step succeeded and more steps follow.
    Continue {
        tool: String,
        args: Option<ToolArgs>,
        success: bool,
        result: String,
    },
    /// A single-step plan ran (or a multi-step plan failed); ask for OUTPUT.
    Output {
        plan: Value,
        success: bool,
        result: String,
    },
    /// The last step of a multi-step request ran; ask for OUTPUT.
    FinalOutput {
        tool: String,
        args: Option<ToolArgs>,
        success: bool,
        result: String,
    },
}

fn call_signature(tool: &str, args: Option<&ToolArgs>) -> String {
    match args {
        Some(args) => format!("{tool}({args})"),
        None => format!("{tool}()"),
    }
}

/// Assemble the prompt for the next model call.
pub fn build_prompt(base: &str, user_input: &str, context: Option<&PromptContext>) -> String {
    let Some(context) = context else {
        return format!("{base}\n\nUser input: {user_input}\n");
    };

    match context {
        PromptContext::Continue {
            tool,
            args,
            success,
            result,
        } => format!(
            "{base}\n\n\
             User input: {user_input}\n\
             Previous operation: {}\n\
             Operation success: {success}\n\
             Operation result: {result}\n\
             Continue with the next step to complete the user's request.",
            call_signature(tool, args.as_ref()),
        ),
        PromptContext::Output {
            plan,
            success,
            result,
        } => format!(
            "{base}\n\n\
             User input: {user_input}\n\
             You planned: {plan}\n\
             Database operation success: {success}\n\
             Database result: {result}\n\
             Now provide OUTPUT with a user-friendly response."
        ),
        PromptContext::FinalOutput {
            tool,
            args,
            success,
            result,
        } => format!(
            "{base}\n\n\
             User input: {user_input}\n\
             Final operation: {}\n\
             Operation success: {success}\n\
             Operation result: {result}\n\
             Now provide OUTPUT with a user-friendly response about the completed operation.",
            call_signature(tool, args.as_ref()),
        ),
    }
}
