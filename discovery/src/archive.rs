//! Locating and unpacking the compiled help archive.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("static regex must compile"));

/// Result of running the external decompiler.
///
/// Only `Completed` means fresh fragments were written; the pipeline carries
/// on in every case and assumes fragments already exist on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecompileOutcome {
    Completed,
    Failed { reason: String },
    /// No decompiler program is configured.
    Skipped,
}

impl fmt::Display for DecompileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompileOutcome::Completed => write!(f, "completed"),
            DecompileOutcome::Failed { reason } => write!(f, "failed: {reason}"),
            DecompileOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Roots searched for the help archive, in order.
///
/// Install roots come from the configured environment variables (deduplicated,
/// sorted, each joined with the vendor directory). When none of them is set,
/// the explicit search paths and the data directory are used instead.
pub fn search_roots(config: &PipelineConfig) -> Vec<PathBuf> {
    search_roots_with(config, |var| std::env::var(var).ok())
}

pub fn search_roots_with<F>(config: &PipelineConfig, lookup: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let installs: BTreeSet<String> = config
        .install_env_vars
        .iter()
        .filter_map(|var| lookup(var))
        .filter(|value| !value.is_empty())
        .collect();

    if !installs.is_empty() {
        return installs
            .into_iter()
            .map(|root| PathBuf::from(root).join(&config.vendor_dir))
            .collect();
    }

    debug!("no install variables set; using local search paths");
    let mut roots = config.search_paths();
    if !roots.contains(&config.data_dir) {
        roots.push(config.data_dir.clone());
    }
    roots
}

/// Files under `root` whose name equals `file_name`, ignoring case.
pub fn find_in_root(root: &Path, file_name: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(root = %root.display(), error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(file_name))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// First `major.minor.patch` in `path`, or `(0, 0, 0)`.
pub fn path_version(path: &Path) -> (u64, u64, u64) {
    let text = path.to_string_lossy();
    let Some(caps) = VERSION.captures(&text) else {
        return (0, 0, 0);
    };
    let part = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    (part(1), part(2), part(3))
}

/// Picks the match with the highest version; ties keep the earliest.
pub fn newest(matches: &[PathBuf]) -> Option<&PathBuf> {
    let mut best: Option<(&PathBuf, (u64, u64, u64))> = None;
    for candidate in matches {
        let version = path_version(candidate);
        match best {
            Some((_, best_version)) if version <= best_version => {}
            _ => best = Some((candidate, version)),
        }
    }
    best.map(|(path, _)| path)
}

/// Resolves the help archive to read.
///
/// # Errors
///
/// [`PipelineError::HelpFileNotFound`] when no root contains the archive.
pub fn locate_help_file(config: &PipelineConfig) -> Result<PathBuf> {
    if let Some(explicit) = config.help_file() {
        if explicit.is_file() {
            return Ok(explicit);
        }
        return Err(PipelineError::HelpFileNotFound {
            name: explicit.display().to_string(),
            searched: vec![explicit],
        });
    }

    let roots = search_roots(config);
    for root in &roots {
        let matches = find_in_root(root, &config.help_file_name);
        if let Some(found) = newest(&matches) {
            info!(path = %found.display(), candidates = matches.len(), "located help file");
            return Ok(found.clone());
        }
    }

    Err(PipelineError::HelpFileNotFound {
        name: config.help_file_name.clone(),
        searched: roots,
    })
}

/// Unpacks `help_file` into the configured HTML directory.
///
/// The decompiler runs with the archive's directory as its working
/// directory. Spawn failures, non-zero exits and timeouts are reported as
/// [`DecompileOutcome::Failed`], not as errors.
///
/// # Errors
///
/// Only when the HTML directory cannot be created.
pub fn decompile(config: &PipelineConfig, help_file: &Path) -> Result<DecompileOutcome> {
    let html_dir = config.html_dir();
    std::fs::create_dir_all(&html_dir).map_err(|e| PipelineError::io(&html_dir, e))?;

    let settings = &config.decompiler;
    if settings.program.trim().is_empty() {
        info!("no decompiler configured; using existing fragments");
        return Ok(DecompileOutcome::Skipped);
    }

    let html_dir = std::path::absolute(&html_dir).map_err(|e| PipelineError::io(&html_dir, e))?;
    let workdir = help_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let input = help_file
        .file_name()
        .map_or_else(|| help_file.to_path_buf(), PathBuf::from);
    let args = settings.render_args(&input, &html_dir);

    info!(program = %settings.program, ?args, workdir = %workdir.display(), "decompiling help file");

    let spawned = Command::new(&settings.program)
        .args(&args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => return Ok(failed(format!("could not start {}: {e}", settings.program))),
    };

    let timeout = Duration::from_secs(settings.timeout_secs);
    let outcome = match child.wait_timeout(timeout) {
        Ok(Some(status)) if status.success() => DecompileOutcome::Completed,
        Ok(Some(status)) => failed(format!("{} exited with {status}", settings.program)),
        Ok(None) => {
            if let Err(e) = child.kill() {
                debug!(error = %e, "failed to kill decompiler");
            }
            if let Err(e) = child.wait() {
                debug!(error = %e, "failed to reap decompiler");
            }
            failed(format!(
                "{} timed out after {}s",
                settings.program, settings.timeout_secs
            ))
        }
        Err(e) => failed(format!("waiting on {} failed: {e}", settings.program)),
    };

    if outcome == DecompileOutcome::Completed {
        info!(html_dir = %html_dir.display(), "decompiled help file");
    }
    Ok(outcome)
}

fn failed(reason: String) -> DecompileOutcome {
    warn!(
        reason = %reason,
        "unable to invoke help file decompiler; continuing with fragments already on disk"
    );
    DecompileOutcome::Failed { reason }
}

/// The lexicographically first file in `html_dir` ending with `suffix`.
pub fn find_toc(html_dir: &Path, suffix: &str) -> Result<PathBuf> {
    let not_found = || PipelineError::TocNotFound {
        dir: html_dir.to_path_buf(),
        suffix: suffix.to_string(),
    };

    let entries = match std::fs::read_dir(html_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(PipelineError::io(html_dir, e)),
    };

    let suffix_lower = suffix.to_ascii_lowercase();
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.to_ascii_lowercase().ends_with(&suffix_lower))
        })
        .collect();
    candidates.sort();

    let toc = candidates.into_iter().next().ok_or_else(not_found)?;
    info!(path = %toc.display(), "found table of contents");
    Ok(toc)
}
