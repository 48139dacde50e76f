//! Topic fragment parsing.
//!
//! A topic fragment is a loosely structured HTML page in which section
//! headings are spans styled with one of [`HEADING_CLASSES`]. Everything
//! between one heading and the next is that section's text. The parser is an
//! explicit state machine driven by markup tokens:
//!
//! ```text
//!            heading span                 </span>              heading span
//!   Idle ──────────────▶ HeadingPending ─────────▶ Accumulating ─────────────▶ HeadingPending
//!                          │    ▲                    │   ▲                     (flush)
//!                      text│    │                text│   │<br>
//!                          ▼    │                    ▼   │
//!                        HeadingPending            Accumulating ── </body> ──▶ Done (flush)
//! ```
//!
//! The heading is the trimmed text inside the heading span, nested markup
//! included. A span holding only whitespace yields an empty heading; text
//! after the span never becomes the heading.

use std::path::Path;
use std::sync::LazyLock;

use helpapi_core::TopicDoc;
use regex::Regex;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::markup::{MarkupLexer, Token};

/// Span classes that mark section headings.
pub const HEADING_CLASSES: [&str; 2] = ["ts14", "ts7"];

/// Heading prefixes whose sections are lists rendered on one line.
const LIST_HEADING_PREFIXES: [&str; 2] = ["used as parameter", "see also"];

const HORIZONTAL_WS: [char; 4] = [' ', '\t', '\x0b', '\x0c'];

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]\s*[\r\n]").expect("static regex must compile"));

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*[\r\n]\s*").expect("static regex must compile"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    Idle,
    /// Inside a heading span; `depth` counts open spans including it.
    HeadingPending { depth: usize, text: String },
    Accumulating { heading: String, value: String },
    Done,
}

/// Result of parsing one topic fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTopic {
    pub doc: TopicDoc,
    /// `true` when at least one heading span was seen.
    pub keep: bool,
}

/// Streaming topic parser.
#[derive(Debug)]
pub struct TopicParser {
    state: ParseState,
    keep: bool,
    doc: TopicDoc,
}

impl Default for TopicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            keep: false,
            doc: TopicDoc::new(),
        }
    }

    pub fn feed(&mut self, token: &Token) {
        if self.state == ParseState::Done {
            return;
        }

        if let ParseState::HeadingPending { depth, text } = &mut self.state {
            match token {
                Token::StartTag { name, self_closing: false, .. } if name == "span" => *depth += 1,
                Token::EndTag { name } if name == "span" => {
                    *depth -= 1;
                    if *depth == 0 {
                        let heading = text.trim().to_string();
                        debug!(heading = %heading, "section heading");
                        self.state = ParseState::Accumulating {
                            heading,
                            value: String::new(),
                        };
                    }
                }
                Token::EndTag { name } if name == "body" => {
                    self.flush();
                    self.state = ParseState::Done;
                }
                Token::Text(chunk) => text.push_str(chunk),
                _ => {}
            }
            return;
        }

        match token {
            Token::StartTag { name, .. } if name == "span" && is_heading_span(token) => {
                self.keep = true;
                self.flush();
                self.state = ParseState::HeadingPending {
                    depth: 1,
                    text: String::new(),
                };
            }
            Token::StartTag { name, .. } if name == "br" => {
                if let ParseState::Accumulating { value, .. } = &mut self.state {
                    value.push('\n');
                }
            }
            Token::EndTag { name } if name == "body" => {
                self.flush();
                self.state = ParseState::Done;
            }
            Token::Text(text) => self.on_text(text),
            _ => {}
        }
    }

    fn on_text(&mut self, text: &str) {
        if let ParseState::Accumulating { value, .. } = &mut self.state {
            value.push_str(text.trim_matches(HORIZONTAL_WS));
            value.push(' ');
        }
    }

    /// Commits the in-progress section, if any, and returns to `Idle`.
    ///
    /// A heading span that never closed becomes a section with empty text.
    fn flush(&mut self) {
        let state = std::mem::replace(&mut self.state, ParseState::Idle);
        match state {
            ParseState::Accumulating { heading, value } => {
                let text = normalize_section(&heading, &value);
                self.doc.insert(heading, text);
            }
            ParseState::HeadingPending { text, .. } => {
                self.doc.insert(text.trim(), String::new());
            }
            ParseState::Idle | ParseState::Done => {}
        }
    }

    /// Ends the parse. A missing `</body>` still flushes the last section.
    pub fn finish(mut self) -> ParsedTopic {
        self.flush();
        ParsedTopic {
            doc: self.doc,
            keep: self.keep,
        }
    }
}

fn is_heading_span(token: &Token) -> bool {
    token
        .attr("class")
        .is_some_and(|class| class.split_whitespace().any(|c| HEADING_CLASSES.contains(&c)))
}

/// Applies the section text normalization rules in order:
///
/// 1. drop leading whitespace;
/// 2. collapse runs of blank lines to a single line break;
/// 3. drop trailing whitespace;
/// 4. for list headings ("Used as parameter…", "See also…"), join lines
///    with `", "`.
pub fn normalize_section(heading: &str, raw: &str) -> String {
    let trimmed = raw.trim_start();
    let collapsed = BLANK_LINES.replace_all(trimmed, "\n");
    let text = collapsed.trim_end();

    if is_list_heading(heading) {
        LINE_BREAK.replace_all(text, ", ").into_owned()
    } else {
        text.to_string()
    }
}

fn is_list_heading(heading: &str) -> bool {
    let lower = heading.to_lowercase();
    LIST_HEADING_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Parses one topic fragment.
pub fn parse_topic(markup: &str) -> ParsedTopic {
    let mut parser = TopicParser::new();
    for token in MarkupLexer::tokenize(markup) {
        parser.feed(&token);
    }
    parser.finish()
}

/// Reads and parses the fragment for topic `name`.
///
/// # Errors
///
/// Returns [`PipelineError::TopicNotFound`] when the fragment does not exist.
pub fn read_topic(name: &str, path: &Path) -> Result<ParsedTopic> {
    let markup = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::TopicNotFound {
                name: name.to_string(),
                path: path.to_path_buf(),
            }
        } else {
            PipelineError::io(path, e)
        }
    })?;
    Ok(parse_topic(&markup))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_UNITS: &str = r#"<html><body>
<p><span class="ts14">Description</span></p>
<p>Returns the   system units.</p>
<p><span class="ts14">Syntax</span></p>
<p>units = GetUnits( )</p>
<p><span class="ts7">Parameters</span></p>
<p>units As String<br>nid As Long</p>
<p><span class="ts14">See Also</span></p>
<p>SetUnits<br><br>GetUnitsScale</p>
</body>
<p><span class="ts14">Ignored</span>after body</p>
</html>"#;

    #[test]
    fn test_sections_in_document_order() {
        let parsed = parse_topic(GET_UNITS);
        assert!(parsed.keep);
        assert_eq!(
            parsed.doc.headings().collect::<Vec<_>>(),
            vec!["Description", "Syntax", "Parameters", "See Also"]
        );
        assert_eq!(parsed.doc.get("Description"), Some("Returns the   system units."));
        assert_eq!(parsed.doc.get("Syntax"), Some("units = GetUnits( )"));
        assert_eq!(parsed.doc.get("Parameters"), Some("units As String \nnid As Long"));
    }

    #[test]
    fn test_list_heading_joins_with_commas() {
        let parsed = parse_topic(GET_UNITS);
        assert_eq!(parsed.doc.get("See Also"), Some("SetUnits, GetUnitsScale"));
    }

    #[test]
    fn test_content_after_body_is_ignored() {
        let parsed = parse_topic(GET_UNITS);
        assert!(!parsed.doc.contains("Ignored"));
    }

    #[test]
    fn test_no_headings_means_not_kept() {
        let parsed = parse_topic("<html><body><p>Just some prose.</p></body></html>");
        assert!(!parsed.keep);
        assert!(parsed.doc.is_empty());
    }

    #[test]
    fn test_missing_body_end_still_flushes() {
        let parsed = parse_topic(r#"<span class="ts14">Description</span> Unterminated text"#);
        assert_eq!(parsed.doc.get("Description"), Some("Unterminated text"));
    }

    #[test]
    fn test_blank_heading_span_keeps_following_prose_as_text() {
        let parsed = parse_topic(
            "<body><span class=\"ts14\">&nbsp;</span><p>Sets the system units for the model.</p>\
             <span class=\"ts14\">Syntax</span>SetUnits u</body>",
        );
        assert_eq!(
            parsed.doc.iter().collect::<Vec<_>>(),
            vec![("", "Sets the system units for the model."), ("Syntax", "SetUnits u")]
        );
    }

    #[test]
    fn test_unclosed_heading_span_is_flushed_empty() {
        let parsed = parse_topic(r#"<body><span class="ts14">Remarks"#);
        assert_eq!(parsed.doc.get("Remarks"), Some(""));
    }

    #[test]
    fn test_whitespace_before_heading_text_is_skipped() {
        let parsed = parse_topic("<span class=\"ts14\">\n  <b>Remarks</b></span>Note.</body>");
        assert_eq!(parsed.doc.get("Remarks"), Some("Note."));
    }

    #[test]
    fn test_other_span_classes_are_text() {
        let parsed = parse_topic(
            r#"<span class="ts14">Description</span><span class="ts3">Plain</span> text</body>"#,
        );
        assert_eq!(parsed.doc.get("Description"), Some("Plain text"));
    }

    #[test]
    fn test_normalize_section_rules() {
        assert_eq!(normalize_section("Remarks", "\r\n\nfirst \n \n\nsecond  \n"), "first \nsecond");
        assert_eq!(
            normalize_section("Used as parameter in", "A \n B\nC "),
            "A, B, C"
        );
    }
}
