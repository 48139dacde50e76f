//! Wrapper stub generation.
//!
//! Every callable command gets one stub exposing a single entry point,
//! [`ENTRY_POINT`], that always returns a value:
//!
//! | kind       | return binding | stub returns                                   |
//! |------------|----------------|------------------------------------------------|
//! | function   | any            | the command's result                           |
//! | subroutine | present        | `Array(result, params...)`                     |
//! | subroutine | absent, 2+     | `Array(params...)`                             |
//! | subroutine | absent, 1      | that parameter                                 |
//! | subroutine | absent, 0      | nothing                                        |
//!
//! Data structures and unknown commands get no stub.

use std::fmt::Write as _;
use std::path::PathBuf;

use helpapi_core::{ApiSchema, CommandEntry, CommandKind, SignatureItem};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::output::write_text;
use crate::render::wrap_text;

/// Name of the function every stub defines.
pub const ENTRY_POINT: &str = "libfunct";

const GENERIC_TYPE: &str = "Variant";
const BODY_INDENT: &str = "    ";

/// How a stub hands results back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// The command's own return value.
    Direct,
    /// `Array(result, params...)` for a subroutine with a return binding.
    ResultAndParams,
    /// `Array(params...)`.
    Params,
    /// The single parameter's post-call value.
    SingleParam,
    /// No return value.
    Nothing,
}

impl ReturnShape {
    /// Selects the shape for `entry`, or `None` when no stub is generated.
    pub fn for_entry(entry: &CommandEntry) -> Option<Self> {
        let shape = match entry.cmdtype {
            CommandKind::Function => ReturnShape::Direct,
            CommandKind::Subroutine if entry.has_returns() => ReturnShape::ResultAndParams,
            CommandKind::Subroutine => match entry.sig.len() {
                0 => ReturnShape::Nothing,
                1 => ReturnShape::SingleParam,
                _ => ReturnShape::Params,
            },
            CommandKind::Datastruct | CommandKind::Unknown => return None,
        };
        Some(shape)
    }
}

/// Renders the stub source for one command.
///
/// Returns `None` for data structures and unknown commands.
pub fn render_stub(name: &str, entry: &CommandEntry, wrap_columns: usize) -> Option<String> {
    let shape = ReturnShape::for_entry(entry)?;

    let declaration = if entry.sig.is_empty() {
        format!("dummy As {GENERIC_TYPE}")
    } else {
        entry
            .sig
            .iter()
            .map(SignatureItem::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let call_args: Vec<String> = entry.sig.iter().map(SignatureItem::bare_name).collect();
    let call_list = call_args.join(", ");
    let result_name = entry.return_name().unwrap_or("result");
    let result_type = entry.return_type().unwrap_or(GENERIC_TYPE);

    let mut out = String::new();

    let declared = match shape {
        ReturnShape::Direct => Some(result_type),
        ReturnShape::ResultAndParams | ReturnShape::Params => Some(GENERIC_TYPE),
        ReturnShape::SingleParam => entry.sig.first().map(|item| item.type_name.as_str()),
        ReturnShape::Nothing => None,
    };
    match declared {
        Some(ty) => {
            let _ = writeln!(out, "Function {ENTRY_POINT} ({declaration}) As {ty}");
        }
        None => {
            let _ = writeln!(out, "Function {ENTRY_POINT} ({declaration})");
        }
    }

    write_header(&mut out, name, entry, shape, wrap_columns);

    match shape {
        ReturnShape::Direct => {
            let _ = writeln!(out, "{BODY_INDENT}{ENTRY_POINT} = {name} ({call_list})");
        }
        ReturnShape::ResultAndParams => {
            let _ = writeln!(out, "{BODY_INDENT}Dim {result_name} As {result_type}");
            let _ = writeln!(out, "{BODY_INDENT}{result_name} = {name}({call_list})");
            let collected: Vec<&str> = std::iter::once(result_name)
                .chain(call_args.iter().map(String::as_str))
                .collect();
            let _ = writeln!(
                out,
                "{BODY_INDENT}{ENTRY_POINT} = Array({})",
                collected.join(", ")
            );
        }
        ReturnShape::Params => {
            let _ = writeln!(out, "{BODY_INDENT}{name} {call_list}");
            let _ = writeln!(out, "{BODY_INDENT}{ENTRY_POINT} = Array({call_list})");
        }
        ReturnShape::SingleParam => {
            let _ = writeln!(out, "{BODY_INDENT}{name} {call_list}");
            let _ = writeln!(out, "{BODY_INDENT}{ENTRY_POINT} = {call_list}");
        }
        ReturnShape::Nothing => {
            let _ = writeln!(out, "{BODY_INDENT}{name}");
        }
    }

    out.push_str("End Function\n");
    Some(out)
}

fn write_header(
    out: &mut String,
    name: &str,
    entry: &CommandEntry,
    shape: ReturnShape,
    wrap_columns: usize,
) {
    let comment = |out: &mut String, text: &str| {
        if text.is_empty() {
            let _ = writeln!(out, "{BODY_INDENT}'");
        } else {
            let _ = writeln!(out, "{BODY_INDENT}' {text}");
        }
    };

    let kind_caps = entry.cmdtype.as_str().to_uppercase();
    comment(out, &format!("Wrapper stub for {name} {kind_caps}"));
    comment(out, "");
    for line in kind_notes(name, entry, shape) {
        comment(out, &line);
    }
    comment(out, "");
    comment(out, "Description:");
    for line in wrap_text(&entry.descr, wrap_columns) {
        comment(out, &format!("  {line}"));
    }
    comment(out, "");
    comment(out, "Returns:");
    for line in returns_doc(entry, shape) {
        comment(out, &format!("  {line}"));
    }
    comment(out, "");
    comment(out, &format!("Load with CreateLib(<path>/{name}) and call lib.{ENTRY_POINT}()."));
    comment(out, "Editing this file changes the behaviour of the wrapped command.");
}

fn kind_notes(name: &str, entry: &CommandEntry, shape: ReturnShape) -> Vec<String> {
    let mut notes = Vec::new();
    match entry.cmdtype {
        CommandKind::Function => {
            notes.push(format!("{name} is implemented as a Function."));
            notes.push("Its return value is what this wrapper returns.".to_string());
        }
        _ => {
            notes.push(format!("{name} is implemented as a Subroutine."));
            let detail = match shape {
                ReturnShape::ResultAndParams => {
                    "Its result is returned first, followed by every parameter, in an Array()."
                }
                ReturnShape::Params => {
                    "It may alter any of its parameters, so all of them are returned in an Array()."
                }
                ReturnShape::SingleParam => {
                    "It may alter its only parameter, which is returned with the same type."
                }
                _ => "It takes no parameters and returns nothing.",
            };
            notes.push(detail.to_string());
        }
    }
    notes
}

fn returns_doc(entry: &CommandEntry, shape: ReturnShape) -> Vec<String> {
    let params = entry.sig.iter().map(SignatureItem::to_string);
    match shape {
        ReturnShape::Direct => {
            if entry.has_returns() {
                vec![entry.returns_display()]
            } else {
                vec![GENERIC_TYPE.to_string()]
            }
        }
        ReturnShape::ResultAndParams => std::iter::once("Array of:".to_string())
            .chain(std::iter::once(entry.returns_display()))
            .chain(params)
            .collect(),
        ReturnShape::Params => std::iter::once("Array of:".to_string())
            .chain(params)
            .collect(),
        ReturnShape::SingleParam => params.collect(),
        ReturnShape::Nothing => vec!["Does not have a return value.".to_string()],
    }
}

/// Stubs written by one [`write_stubs`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubSummary {
    pub written: Vec<PathBuf>,
    /// Commands without a stub (data structures and unknowns).
    pub skipped: Vec<String>,
    /// Stubs from earlier runs with no callable command behind them.
    pub removed: Vec<PathBuf>,
}

/// Writes one stub per callable command into the configured stub directory.
///
/// Existing stubs are overwritten; output depends only on the schema, so
/// repeated runs produce identical files. Stub files left by earlier runs
/// for commands that are no longer callable are deleted.
pub fn write_stubs(config: &PipelineConfig, schema: &ApiSchema) -> Result<StubSummary> {
    let mut summary = StubSummary::default();

    for (name, entry) in schema.iter() {
        let Some(source) = render_stub(name, entry, config.wrap_columns) else {
            debug!(command = name, kind = %entry.cmdtype, "no stub for this kind");
            summary.skipped.push(name.to_string());
            continue;
        };
        let path = config.stub_path(name);
        write_text(&path, &source)?;
        info!(command = name, path = %path.display(), "generated stub");
        summary.written.push(path);
    }

    summary.removed = remove_stale_stubs(config, &summary.written)?;
    Ok(summary)
}

fn remove_stale_stubs(config: &PipelineConfig, written: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let stub_dir = config.stub_dir();
    let entries = match std::fs::read_dir(&stub_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PipelineError::io(&stub_dir, e)),
    };

    let mut stale: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&config.stub_extension))
        })
        .filter(|path| !written.contains(path))
        .collect();
    stale.sort();

    for path in &stale {
        std::fs::remove_file(path).map_err(|e| PipelineError::io(path, e))?;
        info!(path = %path.display(), "removed stale stub");
    }
    Ok(stale)
}
