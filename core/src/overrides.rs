//! Manual override tables patched onto a freshly built schema.
//!
//! Help archives contain mistakes the inference engine cannot recover from:
//! commands documented as functions that are more useful as procedures,
//! signatures split across prose, and so on. An [`OverrideTable`] lists
//! field-level corrections keyed by command name. [`apply_overrides`] patches
//! them onto an [`ApiSchema`], refusing to touch command names the schema
//! does not already contain.
//!
//! # Example
//!
//! ```
//! use helpapi_core::*;
//!
//! let mut schema = ApiSchema::new();
//! schema.insert("GetPosition", CommandEntry::new("Gets a position.", CommandKind::Function));
//!
//! let table = OverrideTable::from_yaml_str(
//!     "GetPosition:\n  cmdtype: subroutine\n",
//! ).unwrap();
//! apply_overrides(&mut schema, &table).unwrap();
//!
//! assert_eq!(schema.get("GetPosition").unwrap().cmdtype, CommandKind::Subroutine);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ApiSchema, CommandEntry, CommandKind, SignatureItem};

/// Errors raised while loading or applying an override table.
#[derive(Debug, Error)]
pub enum OverrideError {
    /// The table names commands the current schema does not contain.
    ///
    /// This means the table has drifted from the documentation snapshot.
    #[error("override table references unknown command(s): {}", .0.join(", "))]
    UnknownCommands(Vec<String>),

    /// The table is not a valid YAML override document.
    #[error("invalid override table: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Partial replacement for the fields of one [`CommandEntry`].
///
/// Fields left as `None` keep their extracted value. Unknown field names,
/// and a field repeated within one record, are rejected when the table is
/// parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<Vec<SignatureItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmdtype: Option<CommandKind>,
}

impl CommandOverride {
    /// Overwrites each field present in this override.
    ///
    /// Fields are written in declaration order, so a later field never
    /// observes a stale value of an earlier one.
    pub fn apply_to(&self, entry: &mut CommandEntry) {
        if let Some(descr) = &self.descr {
            entry.descr = descr.clone();
        }
        if let Some(sig) = &self.sig {
            entry.sig = sig.clone();
        }
        if let Some(returns) = &self.returns {
            entry.returns = returns.clone();
        }
        if let Some(cmdtype) = self.cmdtype {
            entry.cmdtype = cmdtype;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.descr.is_none() && self.sig.is_none() && self.returns.is_none() && self.cmdtype.is_none()
    }
}

/// Command name → [`CommandOverride`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideTable {
    entries: BTreeMap<String, CommandOverride>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a YAML override document. An empty document is an empty table.
    pub fn from_yaml_str(raw: &str) -> Result<Self, OverrideError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, patch: CommandOverride) {
        self.entries.insert(name.into(), patch);
    }

    pub fn get(&self, name: &str) -> Option<&CommandOverride> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandOverride)> {
        self.entries.iter().map(|(name, patch)| (name.as_str(), patch))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in the table that `schema` does not contain, sorted.
    pub fn unknown_commands(&self, schema: &ApiSchema) -> Vec<String> {
        self.entries
            .keys()
            .filter(|name| !schema.contains(name))
            .cloned()
            .collect()
    }
}

/// Applies every override in `table` to `schema`.
///
/// All names are checked before anything is written: if any name is missing
/// from `schema`, the schema is left untouched and
/// [`OverrideError::UnknownCommands`] lists every offender. Returns the
/// number of commands patched.
///
/// # Examples
///
/// ```
/// use helpapi_core::*;
///
/// let mut schema = ApiSchema::new();
/// schema.insert("GetUnits", CommandEntry::new("Gets units.", CommandKind::Function));
///
/// let mut table = OverrideTable::new();
/// table.insert("NoSuchCommand", CommandOverride::default());
///
/// let err = apply_overrides(&mut schema, &table).unwrap_err();
/// assert!(matches!(err, OverrideError::UnknownCommands(ref names) if names == &["NoSuchCommand"]));
/// ```
pub fn apply_overrides(schema: &mut ApiSchema, table: &OverrideTable) -> Result<usize, OverrideError> {
    let unknown = table.unknown_commands(schema);
    if !unknown.is_empty() {
        return Err(OverrideError::UnknownCommands(unknown));
    }

    let mut applied = 0;
    for (name, patch) in table.iter() {
        if let Some(entry) = schema.get_mut(name) {
            patch.apply_to(entry);
            applied += 1;
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ApiSchema {
        let mut schema = ApiSchema::new();
        let mut get_pos = CommandEntry::new("Gets a position.", CommandKind::Function);
        get_pos.sig.push(SignatureItem::new("nid", "Long"));
        get_pos.returns = vec!["ok".to_string(), "Boolean".to_string()];
        schema.insert("GetPosition", get_pos);
        schema.insert(
            "SetUnits",
            CommandEntry::new("Sets units.", CommandKind::Subroutine),
        );
        schema
    }

    #[test]
    fn test_override_patches_only_named_fields() {
        let mut schema = schema();
        let table = OverrideTable::from_yaml_str(
            r#"
GetPosition:
  cmdtype: subroutine
  sig:
    - [nid, Long]
    - [pos, T_POSITION]
"#,
        )
        .unwrap();

        assert_eq!(apply_overrides(&mut schema, &table).unwrap(), 1);
        let entry = schema.get("GetPosition").unwrap();
        assert_eq!(entry.cmdtype, CommandKind::Subroutine);
        assert_eq!(entry.sig.len(), 2);
        assert_eq!(entry.sig[1], SignatureItem::new("pos", "T_POSITION"));
        assert_eq!(entry.descr, "Gets a position.");
        assert_eq!(entry.returns, vec!["ok", "Boolean"]);
    }

    #[test]
    fn test_unknown_command_leaves_schema_untouched() {
        let mut schema = schema();
        let before = schema.clone();
        let table = OverrideTable::from_yaml_str(
            "GetPosition:\n  descr: changed\nMissingB:\n  descr: x\nMissingA:\n  descr: y\n",
        )
        .unwrap();

        let err = apply_overrides(&mut schema, &table).unwrap_err();
        match err {
            OverrideError::UnknownCommands(names) => {
                assert_eq!(names, vec!["MissingA", "MissingB"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(schema, before);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = OverrideTable::from_yaml_str("GetPosition:\n  description: typo\n").unwrap_err();
        assert!(matches!(err, OverrideError::Parse(_)));
    }

    #[test]
    fn test_repeated_field_in_one_record_is_rejected() {
        let err = OverrideTable::from_yaml_str("SetUnits:\n  descr: first\n  descr: second\n")
            .unwrap_err();
        assert!(matches!(err, OverrideError::Parse(_)));
        assert!(err.to_string().contains("duplicate field `descr`"), "{err}");
    }

    #[test]
    fn test_empty_document_is_empty_table() {
        assert!(OverrideTable::from_yaml_str("").unwrap().is_empty());
        assert!(OverrideTable::from_yaml_str("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_distinct_commands_apply_in_any_order() {
        let mut a = OverrideTable::new();
        a.insert(
            "GetPosition",
            CommandOverride {
                descr: Some("one".into()),
                ..Default::default()
            },
        );
        a.insert(
            "SetUnits",
            CommandOverride {
                returns: Some(vec!["units".into(), "String".into()]),
                ..Default::default()
            },
        );

        let mut first = schema();
        apply_overrides(&mut first, &a).unwrap();

        let mut second = schema();
        for (name, patch) in a.iter().collect::<Vec<_>>().into_iter().rev() {
            patch.apply_to(second.get_mut(name).unwrap());
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_later_patch_wins_when_applied_in_sequence() {
        let mut schema = schema();
        let entry = schema.get_mut("SetUnits").unwrap();
        CommandOverride {
            descr: Some("first".into()),
            ..Default::default()
        }
        .apply_to(entry);
        CommandOverride {
            descr: Some("second".into()),
            cmdtype: Some(CommandKind::Function),
            ..Default::default()
        }
        .apply_to(entry);

        assert_eq!(entry.descr, "second");
        assert_eq!(entry.cmdtype, CommandKind::Function);
    }
}
