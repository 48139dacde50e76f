//! Human-readable renderings of documentation and schema entries.

use std::fmt::Write as _;
use std::sync::LazyLock;

use helpapi_core::{CommandEntry, DocumentationMap, TopicDoc};
use regex::Regex;

use crate::error::Result;
use crate::typemap::{TypeRendering, render_type};

static SPACE_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+,").expect("static regex must compile"));

const RULE_WIDTH: usize = 80;
const INDENT: &str = "  ";

/// Heading prefixes whose lines alternate between one and two indents.
const PAIRED_HEADING_PREFIXES: [&str; 2] = ["param", "member"];

/// Renders one topic block.
///
/// ```text
///
/// ================================================================================
/// TOPIC: GetUnits
/// ----------------
///
/// Description:
///   Returns the system units.
/// ```
pub fn render_topic(name: &str, doc: &TopicDoc) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');

    let title = format!("TOPIC: {name}\n");
    out.push_str(&title);
    out.push_str(&"-".repeat(title.chars().count()));
    out.push('\n');

    for (heading, text) in doc.iter() {
        let _ = write!(out, "\n{heading}:\n");
        let text = SPACE_COMMA.replace_all(text, ",");
        let paired = is_paired_heading(heading);
        for (i, line) in text.split('\n').enumerate() {
            let depth = if paired { i % 2 + 1 } else { 1 };
            out.push_str(&INDENT.repeat(depth));
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

fn is_paired_heading(heading: &str) -> bool {
    let lower = heading.to_lowercase();
    PAIRED_HEADING_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Renders the topics named in `names`, in that order. Names without
/// documentation are skipped.
pub fn render_topics<'a, I>(names: I, docs: &DocumentationMap) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| docs.get(name).map(|doc| render_topic(name, doc)))
        .collect()
}

/// Wraps `text` after `columns` characters at the next whitespace.
///
/// Each source line is wrapped on its own. A piece is cut only once it is
/// longer than `columns`, so words are never split; the whitespace at the
/// cut is dropped. Empty pieces are omitted.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    text.split('\n')
        .flat_map(|line| wrap_line(line, columns))
        .collect()
}

fn wrap_line(line: &str, columns: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while chars.len() > start + columns {
        let cut = chars[start + columns + 1..]
            .iter()
            .position(|c| c.is_whitespace())
            .map(|offset| start + columns + 1 + offset);
        let Some(cut) = cut else {
            break;
        };
        pieces.push(chars[start..cut].iter().collect::<String>());
        start = cut + 1;
    }

    let rest: String = chars[start.min(chars.len())..].iter().collect();
    pieces.push(rest);
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

/// Describes one command with its parameter types mapped to host types.
pub fn describe_entry(name: &str, entry: &CommandEntry, rendering: TypeRendering) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "{name} ({})", entry.cmdtype);
    for line in wrap_text(&entry.descr, 72) {
        let _ = writeln!(out, "{INDENT}{line}");
    }

    if entry.has_returns() {
        let host = match entry.return_type() {
            Some(ty) => render_type(ty, rendering)?,
            None => "unknown".to_string(),
        };
        let _ = writeln!(out, "{INDENT}returns: {} -> {host}", entry.returns_display());
    }

    if entry.sig.is_empty() {
        let _ = writeln!(out, "{INDENT}params: none");
    } else {
        let _ = writeln!(out, "{INDENT}params:");
        for item in &entry.sig {
            let host = render_type(&item.type_name, rendering)?;
            let _ = writeln!(out, "{INDENT}{INDENT}{item} -> {host}");
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpapi_core::{CommandKind, SignatureItem};

    #[test]
    fn test_topic_block_layout() {
        let mut doc = TopicDoc::new();
        doc.insert("Description", "Returns the units.");
        doc.insert("See Also", "SetUnits , GetScale");

        let rendered = render_topic("GetUnits", &doc);
        let expected = format!(
            "\n{}\nTOPIC: GetUnits\n{}\n\nDescription:\n  Returns the units.\n\nSee Also:\n  SetUnits, GetScale\n",
            "=".repeat(80),
            "-".repeat(16)
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_parameter_headings_alternate_indent() {
        let mut doc = TopicDoc::new();
        doc.insert("Parameters", "nid As Long\nNode identifier.\nunits As String\nUnit name.");
        let rendered = render_topic("Cmd", &doc);
        assert!(rendered.ends_with(
            "Parameters:\n  nid As Long\n    Node identifier.\n  units As String\n    Unit name.\n"
        ));
    }

    #[test]
    fn test_render_topics_skips_undocumented() {
        let mut docs = DocumentationMap::new();
        docs.insert("A".to_string(), TopicDoc::new());
        let rendered = render_topics(["A", "Missing"], &docs);
        assert!(rendered.contains("TOPIC: A"));
        assert!(!rendered.contains("Missing"));
    }

    #[test]
    fn test_wrap_text() {
        let text = "aaaa bbbb cccc dddd";
        assert_eq!(wrap_text(text, 5), vec!["aaaa bbbb", "cccc dddd"]);
        assert_eq!(wrap_text("short", 60), vec!["short"]);
        assert_eq!(wrap_text("one\ntwo", 60), vec!["one", "two"]);
        assert!(wrap_text("", 60).is_empty());
        // A single long word is never split.
        let word = "x".repeat(80);
        assert_eq!(wrap_text(&word, 60), vec![word.clone()]);
    }

    #[test]
    fn test_describe_entry() {
        let mut entry = CommandEntry::new("Gets units.", CommandKind::Function);
        entry.returns = vec!["units".into(), "String".into()];
        entry.sig.push(SignatureItem::new("nid", "Long"));
        let text = describe_entry("GetUnits", &entry, TypeRendering::Str).unwrap();
        assert_eq!(
            text,
            "GetUnits (function)\n  Gets units.\n  returns: units As String -> str\n  params:\n    nid As Long -> int\n"
        );
    }
}
