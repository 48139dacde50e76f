//! Serialization of machine-readable artifacts.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Supported formats for persisted schema and documentation documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    /// Serializes `value` in this format.
    pub fn serialize<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
            Self::Json => {
                let mut out = serde_json::to_string_pretty(value)?;
                out.push('\n');
                Ok(out)
            }
        }
    }

    /// Deserializes a value from text in this format.
    pub fn deserialize<T: DeserializeOwned>(self, raw: &str) -> Result<T> {
        match self {
            Self::Yaml => Ok(serde_yaml::from_str(raw)?),
            Self::Json => Ok(serde_json::from_str(raw)?),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(PipelineError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.extension().to_string()
    }
}

/// Writes `value` to `path` in `format`, creating parent directories.
pub fn write_document<T: Serialize>(path: &Path, value: &T, format: OutputFormat) -> Result<()> {
    let body = format.serialize(value)?;
    write_text(path, &body)
}

/// Reads a document written by [`write_document`].
pub fn read_document<T: DeserializeOwned>(path: &Path, format: OutputFormat) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    format.deserialize(&raw)
}

/// Writes text to `path`, creating parent directories.
pub fn write_text(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    std::fs::write(path, body).map_err(|e| PipelineError::io(path, e))
}
