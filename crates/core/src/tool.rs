//! Tool names: the storage operations a model decision may reference.
//!
//! The model refers to tools by their snake_case names. Parsing happens at
//! execution time so an unknown name becomes a failed operation the model
//! can react to, not a decode error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// List every todo with its id
    GetAllTodos,
    /// Create a todo from text
    CreateTodos,
    /// Delete the first todo whose text matches
    DeleteTodos,
    /// Delete a todo by id
    DeleteTodosById,
}

impl ToolName {
    /// Every tool, in the order they are described to the model.
    pub const ALL: [ToolName; 4] = [
        ToolName::GetAllTodos,
        ToolName::CreateTodos,
        ToolName::DeleteTodos,
        ToolName::DeleteTodosById,
    ];

    /// The wire name used in model decisions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetAllTodos => "get_all_todos",
            ToolName::CreateTodos => "create_todos",
            ToolName::DeleteTodos => "delete_todos",
            ToolName::DeleteTodosById => "delete_todos_by_id",
        }
    }

    /// Whether the tool needs non-empty arguments.
    pub fn requires_args(&self) -> bool {
        !matches!(self, ToolName::GetAllTodos)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a decision names a tool that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTool(pub String);

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_names() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>(), Ok(tool));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "drop_table".parse::<ToolName>().unwrap_err();
        assert_eq!(err, UnknownTool("drop_table".into()));
    }

    #[test]
    fn only_listing_takes_no_args() {
        assert!(!ToolName::GetAllTodos.requires_args());
        assert!(ToolName::CreateTodos.requires_args());
        assert!(ToolName::DeleteTodosById.requires_args());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ToolName::DeleteTodosById).unwrap();
        assert_eq!(json, "\"delete_todos_by_id\"");
    }
}
