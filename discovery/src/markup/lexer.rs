//! Tolerant tokenizer for help-archive HTML.
//!
//! Help archives are produced by authoring tools that do not emit valid
//! markup, so the lexer never fails: malformed constructs degrade to text and
//! unterminated tags run to the end of input. Tag and attribute names are
//! lowercased; attribute values and text are entity-decoded. Comments,
//! declarations, processing instructions and the bodies of `script`/`style`
//! elements produce no tokens.

use super::entities::decode_entities;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(String),
}

impl Token {
    /// Value of attribute `key` on a start tag. `key` must be lowercase.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Token::StartTag { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn is_start(&self, tag: &str) -> bool {
        matches!(self, Token::StartTag { name, .. } if name == tag)
    }

    pub fn is_end(&self, tag: &str) -> bool {
        matches!(self, Token::EndTag { name } if name == tag)
    }
}

pub struct MarkupLexer;

impl MarkupLexer {
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let bytes = input.as_bytes();
        let mut pos = 0;
        let mut text_start = 0;

        while pos < bytes.len() {
            if bytes[pos] != b'<' {
                pos += 1;
                continue;
            }

            let Some((token, next)) = lex_markup(input, pos) else {
                // Stray `<` stays part of the surrounding text.
                pos += 1;
                continue;
            };

            push_text(&mut tokens, &input[text_start..pos]);

            let raw_text_end = match &token {
                Some(Token::StartTag {
                    name,
                    self_closing: false,
                    ..
                }) if is_raw_text_element(name) => Some(find_close_tag(input, next, name)),
                _ => None,
            };

            if let Some(tok) = token {
                tokens.push(tok);
            }

            pos = raw_text_end.unwrap_or(next);
            text_start = pos;
        }

        push_text(&mut tokens, &input[text_start..]);
        tokens
    }
}

fn push_text(tokens: &mut Vec<Token>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    tokens.push(Token::Text(decode_entities(raw)));
}

fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// Lexes the construct starting at the `<` at `start`.
///
/// Returns `None` when the `<` does not open markup. Otherwise returns the
/// token (or `None` for skipped constructs such as comments) and the byte
/// offset just past the construct.
fn lex_markup(input: &str, start: usize) -> Option<(Option<Token>, usize)> {
    let rest = &input[start..];

    if rest.starts_with("<!--") {
        let end = rest[4..]
            .find("-->")
            .map_or(input.len(), |i| start + 4 + i + 3);
        return Some((None, end));
    }

    let bytes = rest.as_bytes();
    let second = *bytes.get(1)?;

    if second == b'!' || second == b'?' {
        return Some((None, skip_past_gt(input, start)));
    }

    if second == b'/' {
        let name_len = tag_name_len(&rest[2..]);
        if name_len == 0 {
            return None;
        }
        let name = rest[2..2 + name_len].to_ascii_lowercase();
        return Some((Some(Token::EndTag { name }), skip_past_gt(input, start)));
    }

    if !second.is_ascii_alphabetic() {
        return None;
    }

    let name_len = tag_name_len(&rest[1..]);
    let name = rest[1..1 + name_len].to_ascii_lowercase();
    let (attrs, self_closing, end) = lex_attributes(input, start + 1 + name_len);

    Some((
        Some(Token::StartTag {
            name,
            attrs,
            self_closing,
        }),
        end,
    ))
}

fn tag_name_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
        .count()
}

fn skip_past_gt(input: &str, from: usize) -> usize {
    input[from..].find('>').map_or(input.len(), |i| from + i + 1)
}

/// Parses attributes from `pos` up to and including the closing `>`.
fn lex_attributes(input: &str, mut pos: usize) -> (Vec<(String, String)>, bool, usize) {
    let bytes = input.as_bytes();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return (attrs, self_closing, pos);
        }

        match bytes[pos] {
            b'>' => return (attrs, self_closing, pos + 1),
            b'/' => {
                self_closing = true;
                pos += 1;
                continue;
            }
            _ => {}
        }
        self_closing = false;

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        if pos == name_start {
            // Lone `=` or similar junk.
            pos += 1;
            continue;
        }
        let key = input[name_start..pos].to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'=' {
            attrs.push((key, String::new()));
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = match bytes.get(pos) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let value_start = pos + 1;
                let value_end = input[value_start..]
                    .find(quote as char)
                    .map_or(input.len(), |i| value_start + i);
                pos = (value_end + 1).min(input.len());
                &input[value_start..value_end]
            }
            _ => {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                {
                    pos += 1;
                }
                &input[value_start..pos]
            }
        };
        attrs.push((key, decode_entities(value)));
    }
}

/// Offset of the `</name` that closes a raw-text element, or end of input.
fn find_close_tag(input: &str, from: usize, name: &str) -> usize {
    let needle = format!("</{name}");
    input[from..]
        .to_ascii_lowercase()
        .find(&needle)
        .map_or(input.len(), |i| from + i)
}
