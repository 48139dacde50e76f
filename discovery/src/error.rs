//! Error type shared by every pipeline stage.

use std::path::{Path, PathBuf};

use helpapi_core::OverrideError;

/// Errors that abort a pipeline run.
///
/// Conditions that only reduce the information extracted (a topic without
/// headings, a signature line that does not parse, a failed decompiler run)
/// are not errors; they are logged and recorded in the build report.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Filesystem I/O failure on a specific path.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The compiled help archive was not found in any search root.
    #[error("could not locate help file '{name}' (searched: {})", format_roots(.searched))]
    HelpFileNotFound { name: String, searched: Vec<PathBuf> },

    /// No table-of-contents file exists in the unpacked archive directory.
    #[error("no table of contents ending in '{suffix}' found in '{}'", .dir.display())]
    TocNotFound { dir: PathBuf, suffix: String },

    /// A topic listed in the table of contents has no fragment on disk.
    #[error("topic '{name}' fragment not found at '{}'", .path.display())]
    TopicNotFound { name: String, path: PathBuf },

    /// The persisted schema file does not exist.
    #[error("schema file '{}' not found; run `build` first", .0.display())]
    SchemaNotFound(PathBuf),

    /// Override table failed to parse or drifted from the schema.
    #[error(transparent)]
    Override(#[from] OverrideError),

    /// An output format selector was not recognized.
    #[error("unsupported output format '{0}' (expected yaml or json)")]
    UnsupportedFormat(String),

    /// A table-of-contents mode selector was not recognized.
    #[error("unsupported table-of-contents mode '{0}' (expected objects or links)")]
    UnsupportedTocMode(String),

    /// A type rendering selector was not recognized.
    #[error("unsupported type rendering '{0}' (expected type, repr or str)")]
    UnsupportedRendering(String),

    /// A documented type has no host-language analogue.
    #[error("{0} does not have an analogous host type")]
    NoHostType(String),
}

impl PipelineError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

fn format_roots(roots: &[PathBuf]) -> String {
    if roots.is_empty() {
        return "<no search roots>".to_string();
    }
    roots
        .iter()
        .map(|root| root.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias for results with [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_file_not_found_lists_roots() {
        let err = PipelineError::HelpFileNotFound {
            name: "Fred.chm".into(),
            searched: vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")],
        };
        assert_eq!(
            err.to_string(),
            "could not locate help file 'Fred.chm' (searched: /opt/a, /opt/b)"
        );
    }

    #[test]
    fn test_override_drift_message_is_transparent() {
        let err = PipelineError::from(OverrideError::UnknownCommands(vec![
            "Gone".into(),
            "Renamed".into(),
        ]));
        assert_eq!(
            err.to_string(),
            "override table references unknown command(s): Gone, Renamed"
        );
    }
}
