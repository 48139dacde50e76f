//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at startup (from defaults, a YAML file,
//! and command-line overrides) and then passed by reference to every stage.
//! Nothing in the pipeline reads process-wide settings.
//!
//! # Example YAML
//!
//! ```yaml
//! data_dir: ./data
//! help_file_name: Fred.chm
//! vendor_dir: Photon Engineering
//! decompiler:
//!   program: hh.exe
//!   args: ["-decompile", "{output}", "{input}"]
//!   timeout_secs: 300
//! toc_mode: objects
//! format: yaml
//! distributable: false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::output::OutputFormat;
use crate::toc::TocMode;

/// External decompiler invocation settings.
///
/// `{input}` and `{output}` in `args` are replaced with the archive path and
/// the HTML output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompilerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            program: "hh.exe".to_string(),
            args: vec![
                "-decompile".to_string(),
                "{output}".to_string(),
                "{input}".to_string(),
            ],
            timeout_secs: 300,
        }
    }
}

impl DecompilerConfig {
    /// Substitutes the archive and output paths into the argument template.
    pub fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

/// Settings for one pipeline run.
///
/// Relative paths resolve against `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root for every generated artifact.
    pub data_dir: PathBuf,
    /// Directory holding the unpacked HTML fragments.
    pub html_dir: PathBuf,
    /// Directory receiving generated stubs.
    pub stub_dir: PathBuf,
    /// File stem of the final schema document.
    pub api_file_stem: String,
    /// File stem of the per-topic documentation document.
    pub doc_file_stem: String,
    /// Manual override table.
    pub override_file: PathBuf,
    /// Archive file name matched case-insensitively during auto-location.
    pub help_file_name: String,
    /// Explicit archive path; disables auto-location when set.
    pub help_file: Option<PathBuf>,
    /// Extra roots searched when no install variable is set.
    pub search_paths: Vec<PathBuf>,
    /// Environment variables naming install roots.
    pub install_env_vars: Vec<String>,
    /// Vendor directory appended to each install root.
    pub vendor_dir: String,
    pub decompiler: DecompilerConfig,
    /// File-name suffix of the table-of-contents document.
    pub toc_suffix: String,
    pub toc_mode: TocMode,
    /// Extension of generated stub files, without the dot.
    pub stub_extension: String,
    /// Column at which stub descriptions wrap.
    pub wrap_columns: usize,
    /// Longest accepted parameter name.
    pub max_param_name_len: usize,
    /// Format of machine-readable artifacts.
    pub format: OutputFormat,
    /// Replace vendor documentation with placeholders before persisting.
    pub distributable: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            html_dir: PathBuf::from("html"),
            stub_dir: PathBuf::from("stubs"),
            api_file_stem: "api_build".to_string(),
            doc_file_stem: "alldocs".to_string(),
            override_file: PathBuf::from("api_overrides.yaml"),
            help_file_name: "Fred.chm".to_string(),
            help_file: None,
            search_paths: Vec::new(),
            install_env_vars: vec![
                "PROGRAMW6432".to_string(),
                "PROGRAMFILES".to_string(),
                "PROGRAMFILES(X86)".to_string(),
            ],
            vendor_dir: "Photon Engineering".to_string(),
            decompiler: DecompilerConfig::default(),
            toc_suffix: ".hhc".to_string(),
            toc_mode: TocMode::Objects,
            stub_extension: "frs".to_string(),
            wrap_columns: 60,
            max_param_name_len: helpapi_core::MAX_PARAM_NAME_LEN,
            format: OutputFormat::Yaml,
            distributable: false,
        }
    }
}

impl PipelineConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from a YAML file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read, or
    /// [`PipelineError::Yaml`] if it does not parse (including unknown
    /// selector values such as `format: xml`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn html_dir(&self) -> PathBuf {
        self.resolve(&self.html_dir)
    }

    pub fn stub_dir(&self) -> PathBuf {
        self.resolve(&self.stub_dir)
    }

    pub fn override_path(&self) -> PathBuf {
        self.resolve(&self.override_file)
    }

    /// Explicit archive path, if configured.
    pub fn help_file(&self) -> Option<PathBuf> {
        self.help_file.as_deref().map(|path| self.resolve(path))
    }

    /// Extra archive search roots.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths
            .iter()
            .map(|path| self.resolve(path))
            .collect()
    }

    /// Final (post-override) schema document.
    pub fn api_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", self.api_file_stem, self.format.extension()))
    }

    /// Schema document as extracted, before overrides.
    pub fn raw_api_path(&self) -> PathBuf {
        self.data_dir.join(format!(
            "{}_no-override.{}",
            self.api_file_stem,
            self.format.extension()
        ))
    }

    /// Per-topic documentation document.
    pub fn doc_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", self.doc_file_stem, self.format.extension()))
    }

    /// Human-readable rendering named `stem`.
    pub fn rendering_path(&self, stem: &str) -> PathBuf {
        self.data_dir.join(format!("{stem}.txt"))
    }

    pub fn report_path(&self) -> PathBuf {
        self.data_dir.join("build-report.json")
    }

    /// Stub path for one command.
    pub fn stub_path(&self, command: &str) -> PathBuf {
        self.stub_dir()
            .join(format!("{command}.{}", self.stub_extension))
    }
}
