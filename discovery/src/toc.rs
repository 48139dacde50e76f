//! Table-of-contents parsing and the topic index built from it.
//!
//! Two layouts are understood. The primary one lists each topic as an
//! `<object>` holding `<param name="Name">` and `<param name="Local">`
//! children. The legacy layout lists topics as plain `<a href>` links whose
//! text is the topic name. Both are tracked in one pass; [`TocMode`] selects
//! which result is returned.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use helpapi_core::TocEntry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::markup::{MarkupLexer, Token};

/// Which table-of-contents layout to extract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(try_from = "String", into = "String")]
pub enum TocMode {
    /// `<object>` nodes with `Name`/`Local` parameters.
    #[default]
    Objects,
    /// `<a href>` links.
    Links,
}

impl TocMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TocMode::Objects => "objects",
            TocMode::Links => "links",
        }
    }
}

impl fmt::Display for TocMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TocMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "objects" => Ok(TocMode::Objects),
            "links" => Ok(TocMode::Links),
            _ => Err(PipelineError::UnsupportedTocMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for TocMode {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TocMode> for String {
    fn from(mode: TocMode) -> Self {
        mode.as_str().to_string()
    }
}

#[derive(Debug, Default)]
struct NodeAccumulator {
    name: Option<String>,
    local: Option<String>,
}

impl NodeAccumulator {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.local.is_none()
    }
}

#[derive(Debug, Default)]
struct LinkAccumulator {
    href: Option<String>,
    text: String,
}

/// Streaming table-of-contents parser.
///
/// Feed tokens with [`TocParser::feed`], then call [`TocParser::finish`].
/// Unmatched end tags are ignored.
#[derive(Debug, Default)]
pub struct TocParser {
    node: Option<NodeAccumulator>,
    nodes: Vec<NodeAccumulator>,
    link: Option<LinkAccumulator>,
    links: Vec<TocEntry>,
}

impl TocParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, token: &Token) {
        match token {
            Token::StartTag { name, .. } => match name.as_str() {
                "object" => self.node = Some(NodeAccumulator::default()),
                "param" => self.capture_param(token),
                "a" => {
                    self.link = Some(LinkAccumulator {
                        href: token.attr("href").map(str::to_string),
                        text: String::new(),
                    });
                }
                _ => {}
            },
            Token::EndTag { name } => match name.as_str() {
                "object" => {
                    if let Some(node) = self.node.take() {
                        if !node.is_empty() {
                            self.nodes.push(node);
                        }
                    }
                }
                "a" => {
                    if let Some(link) = self.link.take() {
                        match link.href {
                            Some(href) if !href.is_empty() => {
                                self.links.push(TocEntry::new(link.text.trim(), href));
                            }
                            _ => debug!(text = %link.text.trim(), "skipping anchor without target"),
                        }
                    }
                }
                _ => {}
            },
            Token::Text(text) => {
                if let Some(link) = self.link.as_mut() {
                    link.text.push_str(text);
                }
            }
        }
    }

    fn capture_param(&mut self, token: &Token) {
        let Some(node) = self.node.as_mut() else {
            return;
        };
        let (Some(key), Some(value)) = (token.attr("name"), token.attr("value")) else {
            return;
        };
        if key.eq_ignore_ascii_case("name") {
            node.name = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("local") {
            node.local = Some(value.to_string());
        }
    }

    /// Returns the entries collected for `mode`, in document order.
    ///
    /// Object nodes lacking either a name or a target are dropped.
    pub fn finish(self, mode: TocMode) -> Vec<TocEntry> {
        match mode {
            TocMode::Links => self.links,
            TocMode::Objects => self
                .nodes
                .into_iter()
                .filter_map(|node| match (node.name, node.local) {
                    (Some(name), Some(local)) => Some(TocEntry::new(name, local)),
                    (name, local) => {
                        debug!(?name, ?local, "skipping incomplete table-of-contents node");
                        None
                    }
                })
                .collect(),
        }
    }
}

/// Parses table-of-contents markup into ordered entries.
pub fn parse_toc(markup: &str, mode: TocMode) -> Vec<TocEntry> {
    let mut parser = TocParser::new();
    for token in MarkupLexer::tokenize(markup) {
        parser.feed(&token);
    }
    parser.finish(mode)
}

/// Reads and parses a table-of-contents file.
pub fn read_toc(path: &Path, mode: TocMode) -> Result<Vec<TocEntry>> {
    let markup = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    let entries = parse_toc(&markup, mode);
    info!(path = %path.display(), entries = entries.len(), %mode, "parsed table of contents");
    Ok(entries)
}

/// Topic name → fragment path, in table-of-contents order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicIndex {
    topics: Vec<(String, PathBuf)>,
    bypassed: Vec<String>,
}

impl TopicIndex {
    /// Builds the index, excluding entries whose names contain whitespace.
    ///
    /// A repeated topic name keeps its first position and takes the latest
    /// path.
    pub fn build(entries: &[TocEntry], html_dir: &Path) -> Self {
        let mut index = TopicIndex::default();

        for entry in entries {
            if !entry.is_command_name() {
                info!(name = %entry.name, "bypassing");
                index.bypassed.push(entry.name.clone());
                continue;
            }

            let path = html_dir.join(normalize_local_path(&entry.local_path));
            match index.topics.iter_mut().find(|(name, _)| *name == entry.name) {
                Some(slot) => slot.1 = path,
                None => index.topics.push((entry.name.clone(), path)),
            }
        }

        index
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.topics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, path)| path.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.topics
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// Names excluded because they contain whitespace.
    pub fn bypassed(&self) -> &[String] {
        &self.bypassed
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Strips `#anchor` suffixes and converts backslash separators.
fn normalize_local_path(local: &str) -> String {
    let without_hash = local.split('#').next().unwrap_or_default();
    without_hash
        .replace('\\', "/")
        .trim_start_matches('/')
        .to_string()
}
