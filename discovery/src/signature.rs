//! Signature inference from topic documentation.
//!
//! Help topics describe parameters in prose-like blocks such as
//!
//! ```text
//! lresult (Long)
//! ByVal xval As Double
//! ```
//!
//! Inference picks the parameter block, normalizes each line through an
//! ordered rule table, peels off the return binding for functions and keeps
//! only lines that look like genuine `name As Type` declarations. Nothing
//! here fails: unparseable lines are dropped and reported in
//! [`Inference::dropped_lines`].

use std::sync::LazyLock;

use helpapi_core::{CommandEntry, CommandKind, STRUCT_PREFIX, SignatureItem, TopicDoc};
use regex::Regex;
use tracing::debug;

use crate::typemap::TYPE_KEYWORDS;

/// Description used when a topic has no `Description` section.
pub const NO_DESCRIPTION: &str = "No description found";

/// Canonical connector between a parameter name and its type.
const CONNECTOR: &str = " As ";

/// Reserved words of the stub language, compared case-insensitively.
const RESERVED_WORDS: &[&str] = &[
    "and", "as", "boolean", "byref", "byte", "byval", "call", "case", "class", "const",
    "currency", "dim", "do", "double", "each", "else", "elseif", "empty", "end", "eqv", "erase",
    "error", "exit", "false", "for", "function", "get", "goto", "if", "imp", "in", "integer",
    "is", "let", "like", "long", "loop", "me", "mod", "new", "next", "not", "nothing", "null",
    "on", "option", "optional", "or", "paramarray", "preserve", "private", "property", "public",
    "redim", "rem", "resume", "select", "set", "single", "static", "step", "stop", "string",
    "sub", "then", "to", "true", "type", "until", "variant", "wend", "while", "with", "xor",
];

/// Alternation of documented type keywords plus the record prefix.
fn type_alternation() -> String {
    let keywords: Vec<String> = TYPE_KEYWORDS
        .iter()
        .map(|(keyword, _)| regex::escape(keyword.trim_end_matches('_')))
        .collect();
    // `Huge_` is written with and without its trailing underscore.
    format!(
        r"(?:(?:{})_?\b|{})",
        keywords.join("|"),
        regex::escape(STRUCT_PREFIX)
    )
}

/// One named normalization step applied to every parameter line.
struct LineRule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

/// Normalization rules, applied in order.
static LINE_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    vec![
        LineRule {
            name: "strip-pass-qualifier",
            pattern: Regex::new(r"(?i)\s*\b(?:byval|byref)\b\s*")
                .expect("static regex must compile"),
            replacement: " ",
        },
        LineRule {
            name: "canonical-connector",
            pattern: Regex::new(&format!(r"(?i)(?:\s+as\s+|\s*\(\s*)({})", type_alternation()))
                .expect("static regex must compile"),
            replacement: " As $1",
        },
    ]
});

/// A canonical connector followed by a type; group 1 starts the type.
static DECLARATION_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\s+as\s+({})", type_alternation()))
        .expect("static regex must compile")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("static regex must compile"));

static SPACE_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\)").expect("static regex must compile"));

/// Section a signature was read from, in order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSection {
    Parameters,
    Definition,
    /// Fallback that may pick up free text.
    Syntax,
}

impl ParamSection {
    pub const PRECEDENCE: [ParamSection; 3] = [
        ParamSection::Parameters,
        ParamSection::Definition,
        ParamSection::Syntax,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            ParamSection::Parameters => "Parameters",
            ParamSection::Definition => "Definition",
            ParamSection::Syntax => "Syntax",
        }
    }

    /// Finds the highest-precedence parameter section present in `doc`.
    pub fn locate(doc: &TopicDoc) -> Option<(ParamSection, &str)> {
        Self::PRECEDENCE
            .into_iter()
            .find_map(|section| doc.get(section.heading()).map(|text| (section, text)))
    }
}

/// Outcome of inferring one command's entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    pub entry: CommandEntry,
    /// Section the signature came from; `None` when there was none.
    pub source: Option<ParamSection>,
    /// Non-empty lines that did not parse as declarations.
    pub dropped_lines: Vec<String>,
}

impl Inference {
    /// `true` when the signature was read from the `Syntax` fallback.
    pub fn is_low_confidence(&self) -> bool {
        self.source == Some(ParamSection::Syntax)
    }
}

/// Classifies a command from its name and `Syntax` section.
pub fn classify(name: &str, doc: &TopicDoc) -> CommandKind {
    if name.starts_with(STRUCT_PREFIX) {
        return CommandKind::Datastruct;
    }
    match doc.get("Syntax") {
        Some(syntax) if syntax.contains('=') => CommandKind::Function,
        Some(_) => CommandKind::Subroutine,
        None => CommandKind::Unknown,
    }
}

/// Applies [`LINE_RULES`] to one raw line.
pub fn normalize_line(line: &str) -> String {
    let mut out = line.to_string();
    for rule in LINE_RULES.iter() {
        let replaced = rule.pattern.replace_all(&out, rule.replacement);
        if replaced != out {
            debug!(rule = rule.name, before = %out, after = %replaced, "normalized");
        }
        out = replaced.into_owned();
    }
    out.trim().to_string()
}

/// Splits a normalized line at each connector that precedes a type.
fn split_declaration(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for caps in DECLARATION_SPLIT.captures_iter(line) {
        let (Some(whole), Some(type_start)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        parts.push(&line[start..whole.start()]);
        start = type_start.start();
    }
    parts.push(&line[start..]);
    parts
}

/// Parses the return binding from a function's first parameter line.
fn parse_returns(line: &str) -> Vec<String> {
    let mut words: Vec<String> = WORD.find_iter(line).map(|m| m.as_str().to_string()).collect();
    if let Some(pos) = words.iter().position(|w| w == CONNECTOR.trim()) {
        words.remove(pos);
    }
    if words.len() > 2 {
        let rest = words.split_off(1).join(" ");
        words.push(rest);
    }
    words
}

/// Parses one normalized line as a declaration.
///
/// Returns `None` unless the line splits into exactly a name and a type, the
/// name is at most `max_name_len` characters and neither part contains a
/// period.
pub fn parse_declaration(line: &str, max_name_len: usize) -> Option<SignatureItem> {
    let parts = split_declaration(line);
    let [name, type_name] = parts.as_slice() else {
        return None;
    };
    let name = name.trim();
    if name.is_empty() || name.chars().count() > max_name_len {
        return None;
    }
    if name.contains('.') || type_name.contains('.') {
        return None;
    }

    let mut type_name = SPACE_PAREN.replace_all(type_name.trim(), "").into_owned();
    if type_name.ends_with(')') && !type_name.contains('(') {
        type_name.pop();
    }
    let type_name = type_name.trim();
    if type_name.is_empty() {
        return None;
    }

    let name = if is_reserved(name) {
        format!("{name}_")
    } else {
        name.to_string()
    };
    Some(SignatureItem::new(name, type_name))
}

fn is_reserved(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_WORDS.contains(&lower.as_str())
}

/// Infers the [`CommandEntry`] for command `name` from its documentation.
pub fn infer_entry(name: &str, doc: &TopicDoc, max_name_len: usize) -> Inference {
    let cmdtype = classify(name, doc);
    let descr = doc
        .get("Description")
        .map(str::trim)
        .unwrap_or(NO_DESCRIPTION);
    let mut entry = CommandEntry::new(descr, cmdtype);

    let Some((source, text)) = ParamSection::locate(doc) else {
        debug!(command = name, "no parameter section");
        return Inference {
            entry,
            source: None,
            dropped_lines: Vec::new(),
        };
    };

    let mut lines: Vec<String> = text.split('\n').map(normalize_line).collect();
    if cmdtype == CommandKind::Function && !lines.is_empty() {
        let first = lines.remove(0);
        entry.returns = parse_returns(&first);
    }

    let mut dropped_lines = Vec::new();
    for line in lines {
        match parse_declaration(&line, max_name_len) {
            Some(item) => entry.sig.push(item),
            None if line.is_empty() => {}
            None => {
                debug!(command = name, line = %line, "dropped signature line");
                dropped_lines.push(line);
            }
        }
    }

    Inference {
        entry,
        source: Some(source),
        dropped_lines,
    }
}
