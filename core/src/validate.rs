//! Data-quality checks for inferred API schemas.
//!
//! Inference is heuristic, so the builder never rejects a schema outright.
//! Instead [`validate_schema`] reports issues that deserve a human look:
//! duplicate parameter names, over-long names that suggest prose was
//! mistaken for a declaration, malformed return bindings, and functions with
//! no return type.
//!
//! # Examples
//!
//! ```
//! use helpapi_core::*;
//!
//! let mut entry = CommandEntry::new("Swap two values.", CommandKind::Subroutine);
//! entry.sig.push(SignatureItem::new("a", "Long"));
//! entry.sig.push(SignatureItem::new("a", "Double"));
//!
//! let mut schema = ApiSchema::new();
//! schema.insert("Swap", entry);
//!
//! let issues = validate_schema(&schema, MAX_PARAM_NAME_LEN);
//! assert_eq!(
//!     issues,
//!     vec![ValidationIssue::DuplicateParameter { command: "Swap".into(), name: "a".into() }]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{ApiSchema, CommandEntry, CommandKind};

/// Default longest accepted parameter name: the longest seen in real help
/// archives, plus one.
pub const MAX_PARAM_NAME_LEN: usize = 32;

/// A data-quality issue found in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    /// Command name is empty or whitespace-only.
    #[error("schema contains an empty command name")]
    EmptyCommandName,
    /// Two parameters of one command share a name.
    #[error("{command}: duplicate parameter name '{name}'")]
    DuplicateParameter { command: String, name: String },
    /// A parameter name is longer than the configured limit.
    #[error("{command}: parameter name '{name}' exceeds {limit} characters")]
    ParameterNameTooLong {
        command: String,
        name: String,
        limit: usize,
    },
    /// A parameter has an empty name or type.
    #[error("{command}: parameter #{position} has an empty name or type")]
    EmptyParameter { command: String, position: usize },
    /// The return binding has more than two elements.
    #[error("{command}: return binding has {len} elements (expected at most 2)")]
    MalformedReturns { command: String, len: usize },
    /// A function has no return type.
    #[error("{command}: function has no return type")]
    FunctionWithoutReturnType { command: String },
}

/// Validates every command in `schema`, returning issues in command order.
///
/// `max_name_len` should match the limit signature inference ran with.
pub fn validate_schema(schema: &ApiSchema, max_name_len: usize) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (name, entry) in schema.iter() {
        if name.trim().is_empty() {
            issues.push(ValidationIssue::EmptyCommandName);
            continue;
        }
        issues.extend(validate_entry(name, entry, max_name_len));
    }
    issues
}

/// Validates one command entry.
pub fn validate_entry(
    command: &str,
    entry: &CommandEntry,
    max_name_len: usize,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (position, item) in entry.sig.iter().enumerate() {
        if item.name.trim().is_empty() || item.type_name.trim().is_empty() {
            issues.push(ValidationIssue::EmptyParameter {
                command: command.to_string(),
                position: position + 1,
            });
            continue;
        }
        if item.name.chars().count() > max_name_len {
            issues.push(ValidationIssue::ParameterNameTooLong {
                command: command.to_string(),
                name: item.name.clone(),
                limit: max_name_len,
            });
        }
        if !seen.insert(item.name.as_str()) {
            issues.push(ValidationIssue::DuplicateParameter {
                command: command.to_string(),
                name: item.name.clone(),
            });
        }
    }

    if entry.returns.len() > 2 {
        issues.push(ValidationIssue::MalformedReturns {
            command: command.to_string(),
            len: entry.returns.len(),
        });
    }

    if entry.cmdtype == CommandKind::Function && entry.return_type().is_none() {
        issues.push(ValidationIssue::FunctionWithoutReturnType {
            command: command.to_string(),
        });
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignatureItem;

    fn function(returns: &[&str]) -> CommandEntry {
        let mut entry = CommandEntry::new("f", CommandKind::Function);
        entry.returns = returns.iter().map(|s| s.to_string()).collect();
        entry
    }

    #[test]
    fn test_valid_function_has_no_issues() {
        let mut entry = function(&["units", "String"]);
        entry.sig.push(SignatureItem::new("nid", "Long"));
        assert!(validate_entry("GetUnits", &entry, MAX_PARAM_NAME_LEN).is_empty());
    }

    #[test]
    fn test_function_without_return_type() {
        let issues = validate_entry("GetUnits", &function(&["units"]), MAX_PARAM_NAME_LEN);
        assert_eq!(
            issues,
            vec![ValidationIssue::FunctionWithoutReturnType {
                command: "GetUnits".into()
            }]
        );
    }

    #[test]
    fn test_long_and_empty_parameters() {
        let mut entry = CommandEntry::new("s", CommandKind::Subroutine);
        entry
            .sig
            .push(SignatureItem::new("a".repeat(MAX_PARAM_NAME_LEN + 1), "Long"));
        entry.sig.push(SignatureItem::new("b", " "));
        let issues = validate_entry("Cmd", &entry, MAX_PARAM_NAME_LEN);
        assert!(matches!(issues[0], ValidationIssue::ParameterNameTooLong { .. }));
        assert_eq!(
            issues[1],
            ValidationIssue::EmptyParameter {
                command: "Cmd".into(),
                position: 2
            }
        );
    }

    #[test]
    fn test_malformed_returns() {
        let issues = validate_entry("Cmd", &function(&["a", "b", "c"]), MAX_PARAM_NAME_LEN);
        assert_eq!(
            issues,
            vec![ValidationIssue::MalformedReturns {
                command: "Cmd".into(),
                len: 3
            }]
        );
    }

    #[test]
    fn test_empty_command_name() {
        let mut schema = ApiSchema::new();
        schema.insert(" ", CommandEntry::new("x", CommandKind::Unknown));
        assert_eq!(
            validate_schema(&schema, MAX_PARAM_NAME_LEN),
            vec![ValidationIssue::EmptyCommandName]
        );
    }

    #[test]
    fn test_name_limit_follows_caller() {
        let mut entry = CommandEntry::new("s", CommandKind::Subroutine);
        entry.sig.push(SignatureItem::new("position", "Long"));

        assert!(validate_entry("Cmd", &entry, MAX_PARAM_NAME_LEN).is_empty());
        let issues = validate_entry("Cmd", &entry, 4);
        assert_eq!(
            issues,
            vec![ValidationIssue::ParameterNameTooLong {
                command: "Cmd".into(),
                name: "position".into(),
                limit: 4,
            }]
        );
        assert_eq!(
            issues[0].to_string(),
            "Cmd: parameter name 'position' exceeds 4 characters"
        );
    }
}
