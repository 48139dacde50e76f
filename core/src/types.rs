//! Schema type definitions for help-derived command APIs.
//!
//! This module defines the data model shared by every pipeline stage: the
//! table-of-contents entries that index a help archive, the per-topic
//! documentation recovered from HTML fragments, and the [`ApiSchema`] that
//! maps each command name to its inferred calling convention. The schema
//! types serialize with [`serde`] into the exact document shape consumed by
//! stub generation and runtime dispatch:
//!
//! ```yaml
//! GetUnits:
//!   descr: Returns the system units.
//!   sig: []
//!   returns: [units, String]
//!   cmdtype: function
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name prefix reserved for data-structure topics (e.g. `T_RAY`).
pub const STRUCT_PREFIX: &str = "T_";

/// One topic discovered in a table-of-contents document.
///
/// # Examples
///
/// ```
/// use helpapi_core::TocEntry;
///
/// let entry = TocEntry::new("GetUnits", "html/getunits.htm");
/// assert!(entry.is_command_name());
///
/// let prose = TocEntry::new("Add Plane Tool", "html/addplane.htm");
/// assert!(!prose.is_command_name());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Topic name as shown in the table of contents.
    pub name: String,
    /// Fragment path relative to the unpacked archive root.
    pub local_path: String,
}

impl TocEntry {
    pub fn new(name: impl Into<String>, local_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_path: local_path.into(),
        }
    }

    /// Returns `true` when the topic name can be a callable command.
    ///
    /// Names containing whitespace are chapter titles or tool pages, never
    /// commands.
    pub fn is_command_name(&self) -> bool {
        !self.name.is_empty() && !self.name.chars().any(char::is_whitespace)
    }
}

/// Documentation sections recovered from one topic fragment.
///
/// Sections keep the order in which their headings first appeared. Inserting
/// a heading that already exists replaces its text in place. The type
/// serializes as a plain mapping from heading to text.
///
/// # Examples
///
/// ```
/// use helpapi_core::TopicDoc;
///
/// let mut doc = TopicDoc::new();
/// doc.insert("Syntax", "units = GetUnits()");
/// doc.insert("Description", "Returns the system units.");
/// doc.insert("Syntax", "GetUnits units");
///
/// assert_eq!(doc.get("Syntax"), Some("GetUnits units"));
/// assert_eq!(doc.headings().collect::<Vec<_>>(), vec!["Syntax", "Description"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDoc {
    sections: Vec<(String, String)>,
}

impl TopicDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a section.
    pub fn insert(&mut self, heading: impl Into<String>, text: impl Into<String>) {
        let heading = heading.into();
        let text = text.into();
        match self.sections.iter_mut().find(|(h, _)| *h == heading) {
            Some(slot) => slot.1 = text,
            None => self.sections.push((heading, text)),
        }
    }

    pub fn get(&self, heading: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(h, _)| h == heading)
            .map(|(_, text)| text.as_str())
    }

    pub fn contains(&self, heading: &str) -> bool {
        self.get(heading).is_some()
    }

    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.iter().map(|(h, t)| (h.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Serialize for TopicDoc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (heading, text) in &self.sections {
            map.serialize_entry(heading, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TopicDoc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TopicDocVisitor;

        impl<'de> Visitor<'de> for TopicDocVisitor {
            type Value = TopicDoc;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping from section heading to section text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TopicDoc, A::Error> {
                let mut doc = TopicDoc::new();
                while let Some((heading, text)) = access.next_entry::<String, String>()? {
                    doc.insert(heading, text);
                }
                Ok(doc)
            }
        }

        deserializer.deserialize_map(TopicDocVisitor)
    }
}

/// Per-topic documentation for a whole archive, keyed by command name.
pub type DocumentationMap = BTreeMap<String, TopicDoc>;

/// A `(parameter name, type name)` pair from a command signature.
///
/// Serializes as a two-element list, `[name, type]`.
///
/// # Examples
///
/// ```
/// use helpapi_core::SignatureItem;
///
/// let item = SignatureItem::new("xval", "Double");
/// assert_eq!(item.to_string(), "xval As Double");
/// assert_eq!(serde_json::to_string(&item).unwrap(), r#"["xval","Double"]"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct SignatureItem {
    pub name: String,
    pub type_name: String,
}

impl SignatureItem {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Parameter name with array parentheses removed, as used in call
    /// expressions.
    pub fn bare_name(&self) -> String {
        self.name.chars().filter(|c| !matches!(c, '(' | ')')).collect()
    }
}

impl From<(String, String)> for SignatureItem {
    fn from((name, type_name): (String, String)) -> Self {
        Self { name, type_name }
    }
}

impl From<SignatureItem> for (String, String) {
    fn from(item: SignatureItem) -> Self {
        (item.name, item.type_name)
    }
}

impl fmt::Display for SignatureItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} As {}", self.name, self.type_name)
    }
}

/// How a documented command behaves when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Produces a value through assignment (`x = Cmd(...)`).
    Function,
    /// A procedure with no return value.
    Subroutine,
    /// A documented data structure, not a callable command.
    Datastruct,
    /// No syntax section was available to classify the command.
    Unknown,
}

impl CommandKind {
    pub const ALL: [CommandKind; 4] = [
        CommandKind::Function,
        CommandKind::Subroutine,
        CommandKind::Datastruct,
        CommandKind::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Function => "function",
            CommandKind::Subroutine => "subroutine",
            CommandKind::Datastruct => "datastruct",
            CommandKind::Unknown => "unknown",
        }
    }

    /// Returns `true` for kinds that get a generated stub.
    pub fn is_callable(self) -> bool {
        matches!(self, CommandKind::Function | CommandKind::Subroutine)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized [`CommandKind`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command kind '{0}' (expected function, subroutine, datastruct or unknown)")]
pub struct ParseCommandKindError(pub String);

impl FromStr for CommandKind {
    type Err = ParseCommandKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCommandKindError(s.to_string()))
    }
}

/// Inferred API entry for one command.
///
/// # Examples
///
/// ```
/// use helpapi_core::{CommandEntry, CommandKind, SignatureItem};
///
/// let mut entry = CommandEntry::new("Distance between two nodes.", CommandKind::Function);
/// entry.sig.push(SignatureItem::new("nid", "Long"));
/// entry.returns = vec!["dist".into(), "Double".into()];
///
/// assert_eq!(entry.return_name(), Some("dist"));
/// assert_eq!(entry.return_type(), Some("Double"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Natural-language description.
    pub descr: String,
    /// Ordered parameter list.
    pub sig: Vec<SignatureItem>,
    /// `[]`, `[name]` or `[name, type]` for the return binding.
    pub returns: Vec<String>,
    /// Classification of the command.
    pub cmdtype: CommandKind,
}

impl CommandEntry {
    pub fn new(descr: impl Into<String>, cmdtype: CommandKind) -> Self {
        Self {
            descr: descr.into(),
            sig: Vec::new(),
            returns: Vec::new(),
            cmdtype,
        }
    }

    pub fn return_name(&self) -> Option<&str> {
        self.returns.first().map(String::as_str)
    }

    pub fn return_type(&self) -> Option<&str> {
        self.returns.get(1).map(String::as_str)
    }

    pub fn has_returns(&self) -> bool {
        !self.returns.is_empty()
    }

    /// The return binding rendered as `name As Type`.
    pub fn returns_display(&self) -> String {
        self.returns.join(" As ")
    }
}

/// The full API description: command name → [`CommandEntry`].
///
/// Backed by an ordered map so iteration and serialization are always in
/// lexicographic command order.
///
/// # Examples
///
/// ```
/// use helpapi_core::{ApiSchema, CommandEntry, CommandKind};
///
/// let mut schema = ApiSchema::new();
/// schema.insert("SetUnits", CommandEntry::new("Sets units.", CommandKind::Subroutine));
/// schema.insert("GetUnits", CommandEntry::new("Gets units.", CommandKind::Function));
///
/// assert_eq!(schema.names().collect::<Vec<_>>(), vec!["GetUnits", "SetUnits"]);
/// assert_eq!(schema.names_of_kind(CommandKind::Function), vec!["GetUnits"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiSchema {
    commands: BTreeMap<String, CommandEntry>,
}

impl ApiSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: CommandEntry) -> Option<CommandEntry> {
        self.commands.insert(name.into(), entry)
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CommandEntry> {
        self.commands.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandEntry)> {
        self.commands.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command names of one kind, in lexicographic order.
    pub fn names_of_kind(&self, kind: CommandKind) -> Vec<&str> {
        self.iter()
            .filter(|(_, entry)| entry.cmdtype == kind)
            .map(|(name, _)| name)
            .collect()
    }

    /// Number of commands per kind; kinds with no commands report zero.
    pub fn kind_counts(&self) -> BTreeMap<CommandKind, usize> {
        let mut counts: BTreeMap<CommandKind, usize> =
            CommandKind::ALL.into_iter().map(|kind| (kind, 0)).collect();
        for (_, entry) in self.iter() {
            *counts.entry(entry.cmdtype).or_default() += 1;
        }
        counts
    }
}

impl FromIterator<(String, CommandEntry)> for ApiSchema {
    fn from_iter<I: IntoIterator<Item = (String, CommandEntry)>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}
