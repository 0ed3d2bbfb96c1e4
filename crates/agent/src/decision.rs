//! Model decisions: the structured reply the model gives on every turn.
//!
//! A decoded reply must carry exactly one of the `PLAN`, `CONTINUE` or
//! `OUTPUT` tags. Field-level gaps are filled with defaults; a payload of the
//! wrong type is rejected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Arguments attached to a tool call.
///
/// Models send text (`"buy milk"`), single ids (`3`) or lists (`[3]`); each
/// storage operation normalizes what it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolArgs {
    Text(String),
    IdList(Vec<i64>),
}

impl ToolArgs {
    /// Lenient conversion from whatever the model put in `args`.
    ///
    /// `null` means no arguments. Integers and all-integer arrays become
    /// [`ToolArgs::IdList`]; everything else becomes text.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(id) => Self::IdList(vec![id]),
                None => Self::Text(n.to_string()),
            }),
            Value::Array(items) => {
                if let Some(ids) = items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>() {
                    return Some(Self::IdList(ids));
                }
                let texts: Vec<String> = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                Some(Self::Text(texts.join(", ")))
            }
            other => Some(Self::Text(other.to_string())),
        }
    }

    /// True for blank text or an empty id list.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::IdList(ids) => ids.is_empty(),
        }
    }

    /// Coerce to a todo id. A list contributes its first element.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Self::IdList(ids) => ids.first().copied(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ToolArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::IdList(ids) if ids.len() == 1 => write!(f, "{}", ids[0]),
            Self::IdList(ids) => {
                let joined: Vec<String> = ids.iter().map(i64::to_string).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}

fn lenient_args<'de, D>(deserializer: D) -> Result<Option<ToolArgs>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(ToolArgs::from_value(&value))
}

fn default_true() -> bool {
    true
}

fn default_output_message() -> String {
    "Operation completed.".into()
}

/// First operation of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default, deserialize_with = "lenient_args")]
    pub args: Option<ToolArgs>,
    #[serde(default)]
    pub expected_outcome: String,
    #[serde(default)]
    pub is_multi_step: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_intent: Option<String>,
}

/// A follow-up operation in a multi-step request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueStep {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default, deserialize_with = "lenient_args")]
    pub args: Option<ToolArgs>,
    #[serde(default)]
    pub expected_outcome: String,
    #[serde(default = "default_true")]
    pub is_final_step: bool,
}

/// The user-facing answer that ends a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalOutput {
    #[serde(default = "default_output_message")]
    pub message: String,
    #[serde(default)]
    pub action_taken: String,
}

/// One model turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Decision {
    #[serde(rename = "PLAN")]
    Plan(PlanStep),
    #[serde(rename = "CONTINUE")]
    Continue(ContinueStep),
    #[serde(rename = "OUTPUT")]
    Output(FinalOutput),
}

/// Why a decoded reply is not a usable decision.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("response carries none of PLAN, CONTINUE or OUTPUT")]
    MissingTag,

    #[error("response carries more than one decision tag: {0:?}")]
    AmbiguousTags(Vec<&'static str>),

    #[error("malformed {tag} payload: {reason}")]
    MalformedPayload { tag: &'static str, reason: String },
}

const TAGS: [&str; 3] = ["PLAN", "CONTINUE", "OUTPUT"];

impl Decision {
    /// Classify a decoded reply. Exactly one tag must be present; other keys
    /// are ignored.
    pub fn from_value(value: Value) -> Result<Self, ShapeError> {
        let Value::Object(mut map) = value else {
            return Err(ShapeError::NotAnObject);
        };

        let present: Vec<&'static str> = TAGS.into_iter().filter(|t| map.contains_key(*t)).collect();
        let tag = match present.as_slice() {
            [] => return Err(ShapeError::MissingTag),
            [tag] => *tag,
            _ => return Err(ShapeError::AmbiguousTags(present)),
        };

        let payload = map.remove(tag).unwrap_or(Value::Null);
        let malformed = |e: serde_json::Error| ShapeError::MalformedPayload {
            tag,
            reason: e.to_string(),
        };

        match tag {
            "PLAN" => serde_json::from_value(payload).map(Self::Plan).map_err(malformed),
            "CONTINUE" => serde_json::from_value(payload).map(Self::Continue).map_err(malformed),
            _ => serde_json::from_value(payload).map(Self::Output).map_err(malformed),
        }
    }

    /// The tag this decision is sent under.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Plan(_) => "PLAN",
            Self::Continue(_) => "CONTINUE",
            Self::Output(_) => "OUTPUT",
        }
    }
}
