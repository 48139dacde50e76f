//! Schema assembly, override application and artifact persistence.
//!
//! A build always regenerates everything from the HTML fragments. Overrides
//! are applied and validated before anything is written, so a drifted
//! override table leaves the data directory untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use helpapi_core::{
    ApiSchema, CommandKind, DocumentationMap, OverrideTable, TopicDoc, apply_overrides,
    validate_schema,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::archive::{self, DecompileOutcome};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::output::{OutputFormat, read_document, write_text};
use crate::render::render_topics;
use crate::signature::infer_entry;
use crate::toc::{TopicIndex, read_toc};
use crate::topic::read_topic;

/// Section added to function topics holding the inferred return binding.
pub const RETURNS_SECTION: &str = "Returns";

/// File stem of the rendering covering every topic.
pub const ALL_DOCS_STEM: &str = "alldocs";

/// File stem of the per-kind rendering for `kind`.
pub fn rendering_stem(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Function => "allfuncts",
        CommandKind::Subroutine => "allsubs",
        CommandKind::Datastruct => "allstructs",
        CommandKind::Unknown => "allunknowns",
    }
}

/// Topics recovered from an unpacked archive.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub help_file: PathBuf,
    pub decompile: DecompileOutcome,
    pub toc_file: PathBuf,
    pub index: TopicIndex,
    pub docs: DocumentationMap,
    /// Topics dropped because no heading span was found.
    pub without_headings: Vec<String>,
}

/// Locates and unpacks the archive, then parses its table of contents and
/// every indexed topic.
pub fn extract(config: &PipelineConfig) -> Result<Extraction> {
    let help_file = archive::locate_help_file(config)?;
    info!(path = %help_file.display(), "extracting API information");

    let decompile = archive::decompile(config, &help_file)?;
    let html_dir = config.html_dir();
    let toc_file = archive::find_toc(&html_dir, &config.toc_suffix)?;
    let entries = read_toc(&toc_file, config.toc_mode)?;
    let index = TopicIndex::build(&entries, &html_dir);
    let (docs, without_headings) = collect_topics(&index)?;

    Ok(Extraction {
        help_file,
        decompile,
        toc_file,
        index,
        docs,
        without_headings,
    })
}

/// Parses every topic in `index`, keeping those with at least one heading.
pub fn collect_topics(index: &TopicIndex) -> Result<(DocumentationMap, Vec<String>)> {
    let mut docs = DocumentationMap::new();
    let mut without_headings = Vec::new();

    for (name, path) in index.iter() {
        info!(topic = name, "parsing");
        let parsed = read_topic(name, path)?;
        if parsed.keep {
            docs.insert(name.to_string(), parsed.doc);
        } else {
            debug!(topic = name, "no section headings; dropping");
            without_headings.push(name.to_string());
        }
    }

    Ok((docs, without_headings))
}

/// Inferred schema plus the bookkeeping the build report needs.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuild {
    pub schema: ApiSchema,
    /// Commands whose signature came from the `Syntax` fallback.
    pub low_confidence: Vec<String>,
    pub dropped_lines: usize,
}

/// Infers an entry for every documented topic, in lexicographic order.
///
/// Function topics gain a [`RETURNS_SECTION`] with their return binding.
/// In distributable mode descriptions are replaced with placeholders.
pub fn build_schema(docs: &mut DocumentationMap, config: &PipelineConfig) -> SchemaBuild {
    let mut build = SchemaBuild::default();

    for (name, doc) in docs.iter_mut() {
        info!(command = %name, "building");
        let inference = infer_entry(name, doc, config.max_param_name_len);

        if inference.is_low_confidence() {
            warn!(command = %name, "signature read from Syntax section; may include free text");
            build.low_confidence.push(name.clone());
        }
        build.dropped_lines += inference.dropped_lines.len();

        let mut entry = inference.entry;
        if entry.cmdtype == CommandKind::Function && inference.source.is_some() {
            doc.insert(RETURNS_SECTION, entry.returns_display());
        }
        if config.distributable {
            entry.descr = format!("Wrapper stub for {name}");
        }
        build.schema.insert(name.clone(), entry);
    }

    build
}

/// Placeholder documentation persisted in distributable mode.
pub fn redacted_doc() -> TopicDoc {
    let mut doc = TopicDoc::new();
    doc.insert("Documentation", "Not Available");
    doc
}

/// Reads the override table. A missing file is an empty table.
pub fn load_overrides(path: &Path) -> Result<OverrideTable> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no override table");
            return Ok(OverrideTable::default());
        }
        Err(e) => return Err(PipelineError::io(path, e)),
    };
    Ok(OverrideTable::from_yaml_str(&raw)?)
}

/// Machine-readable summary of one build, written as `build-report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub generated_at: String,
    pub help_file: Option<PathBuf>,
    pub decompile: DecompileOutcome,
    pub toc_file: Option<PathBuf>,
    pub topics_indexed: usize,
    pub topics_kept: usize,
    pub topics_without_headings: Vec<String>,
    pub bypassed: Vec<String>,
    pub kind_counts: BTreeMap<CommandKind, usize>,
    pub low_confidence: Vec<String>,
    pub dropped_lines: usize,
    pub overrides_applied: usize,
    pub warnings: Vec<String>,
    /// SHA-256 of the final schema document as written.
    pub schema_sha256: String,
    pub artifacts: Vec<PathBuf>,
}

/// Everything a build produced.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub raw_schema: ApiSchema,
    pub schema: ApiSchema,
    pub docs: DocumentationMap,
    pub report: BuildReport,
}

/// Runs the full build: extract, infer, override, persist.
pub fn run_build(config: &PipelineConfig) -> Result<BuildOutput> {
    let extraction = extract(config)?;
    build_from_extraction(config, extraction)
}

/// Builds and persists artifacts from an existing [`Extraction`].
///
/// # Errors
///
/// [`PipelineError::Override`] if the override table names a command that
/// was not extracted; in that case nothing is written.
pub fn build_from_extraction(config: &PipelineConfig, extraction: Extraction) -> Result<BuildOutput> {
    let Extraction {
        help_file,
        decompile,
        toc_file,
        index,
        mut docs,
        without_headings,
    } = extraction;

    let build = build_schema(&mut docs, config);
    let raw_schema = build.schema.clone();
    let mut schema = build.schema;

    let overrides = load_overrides(&config.override_path())?;
    let overrides_applied = apply_overrides(&mut schema, &overrides)?;
    if overrides_applied > 0 {
        info!(count = overrides_applied, "applied overrides");
    }

    if config.distributable {
        info!("purging vendor documentation");
        for doc in docs.values_mut() {
            *doc = redacted_doc();
        }
    }

    let mut warnings = Vec::new();
    if let DecompileOutcome::Failed { reason } = &decompile {
        warnings.push(format!("decompiler: {reason}"));
    }
    for issue in validate_schema(&schema, config.max_param_name_len) {
        warn!(%issue, "schema issue");
        warnings.push(issue.to_string());
    }

    let mut report = BuildReport {
        generated_at: Utc::now().to_rfc3339(),
        help_file: Some(help_file),
        decompile,
        toc_file: Some(toc_file),
        topics_indexed: index.len(),
        topics_kept: docs.len(),
        topics_without_headings: without_headings,
        bypassed: index.bypassed().to_vec(),
        kind_counts: schema.kind_counts(),
        low_confidence: build.low_confidence,
        dropped_lines: build.dropped_lines,
        overrides_applied,
        warnings,
        schema_sha256: String::new(),
        artifacts: Vec::new(),
    };

    persist(config, &raw_schema, &schema, &docs, &mut report)?;

    Ok(BuildOutput {
        raw_schema,
        schema,
        docs,
        report,
    })
}

/// Writes every build artifact and fills in the report's digest and
/// artifact list. All artifacts are rewritten on every call.
pub fn persist(
    config: &PipelineConfig,
    raw_schema: &ApiSchema,
    schema: &ApiSchema,
    docs: &DocumentationMap,
    report: &mut BuildReport,
) -> Result<()> {
    let format = config.format;
    let mut artifacts = Vec::new();

    let raw_path = config.raw_api_path();
    write_text(&raw_path, &format.serialize(raw_schema)?)?;
    info!(path = %raw_path.display(), "saved raw API schema");
    artifacts.push(raw_path);

    let final_body = format.serialize(schema)?;
    let api_path = config.api_path();
    write_text(&api_path, &final_body)?;
    info!(path = %api_path.display(), "saved API schema");
    report.schema_sha256 = format!("{:x}", Sha256::digest(final_body.as_bytes()));
    artifacts.push(api_path);

    let doc_path = config.doc_path();
    write_text(&doc_path, &format.serialize(docs)?)?;
    artifacts.push(doc_path);

    let all_path = config.rendering_path(ALL_DOCS_STEM);
    write_text(&all_path, &render_topics(docs.keys().map(String::as_str), docs))?;
    info!(path = %all_path.display(), "saved human readable documentation");
    artifacts.push(all_path);

    for kind in CommandKind::ALL {
        let path = config.rendering_path(rendering_stem(kind));
        write_text(&path, &render_topics(schema.names_of_kind(kind), docs))?;
        debug!(%kind, path = %path.display(), "saved rendering");
        artifacts.push(path);
    }

    let report_path = config.report_path();
    artifacts.push(report_path.clone());
    report.artifacts = artifacts;
    write_text(&report_path, &OutputFormat::Json.serialize(report)?)?;

    Ok(())
}

/// Loads the final schema written by a previous build.
pub fn load_schema(config: &PipelineConfig) -> Result<ApiSchema> {
    let path = config.api_path();
    if !path.is_file() {
        return Err(PipelineError::SchemaNotFound(path));
    }
    read_document(&path, config.format)
}

/// Loads a schema document, picking the format from the file extension.
pub fn load_schema_file(path: &Path) -> Result<ApiSchema> {
    if !path.is_file() {
        return Err(PipelineError::SchemaNotFound(path.to_path_buf()));
    }
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
        _ => OutputFormat::Yaml,
    };
    read_document(path, format)
}
