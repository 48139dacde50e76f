//! Mapping from documented parameter types to host-language types.

use std::fmt;
use std::str::FromStr;

use helpapi_core::STRUCT_PREFIX;

use crate::error::{PipelineError, Result};

/// Host-language analogue of a documented type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostType {
    Bool,
    Int,
    Float,
    Str,
    /// A `T_`-prefixed record type.
    Record(String),
    /// A documented type with no host analogue (`Variant`, `Object`).
    NoAnalogue,
}

impl HostType {
    fn name(&self) -> &str {
        match self {
            HostType::Bool => "bool",
            HostType::Int => "int",
            HostType::Float => "float",
            HostType::Str => "str",
            HostType::Record(name) => name,
            HostType::NoAnalogue => "unknown",
        }
    }
}

/// Documented type keywords and their host analogues.
pub const TYPE_KEYWORDS: [(&str, HostType); 10] = [
    ("Boolean", HostType::Bool),
    ("Byte", HostType::Int),
    ("Huge_", HostType::Int),
    ("Double", HostType::Float),
    ("Long", HostType::Int),
    ("Integer", HostType::Int),
    ("Single", HostType::Float),
    ("String", HostType::Str),
    ("Variant", HostType::NoAnalogue),
    ("Object", HostType::NoAnalogue),
];

/// Looks up the host analogue of a documented type, ignoring case.
///
/// Returns `None` for keywords not in [`TYPE_KEYWORDS`].
pub fn host_type(doc_type: &str) -> Option<HostType> {
    let doc_type = doc_type.trim();
    if doc_type.starts_with(STRUCT_PREFIX) {
        return Some(HostType::Record(doc_type.to_string()));
    }
    TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(doc_type))
        .map(|(_, host)| host.clone())
}

/// How [`render_type`] presents a host type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TypeRendering {
    /// Host type name; types without an analogue are an error.
    #[default]
    Type,
    /// Debug-style representation, e.g. `<type 'int'>`.
    Repr,
    /// Bare name, `unknown` for types without an analogue.
    Str,
}

impl fmt::Display for TypeRendering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeRendering::Type => "type",
            TypeRendering::Repr => "repr",
            TypeRendering::Str => "str",
        })
    }
}

impl FromStr for TypeRendering {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "type" => Ok(TypeRendering::Type),
            "repr" => Ok(TypeRendering::Repr),
            "str" => Ok(TypeRendering::Str),
            _ => Err(PipelineError::UnsupportedRendering(s.to_string())),
        }
    }
}

/// Renders the host analogue of `doc_type`. Unrecognized keywords render as
/// `unknown` in every mode.
///
/// # Errors
///
/// [`PipelineError::NoHostType`] when `rendering` is [`TypeRendering::Type`]
/// and the documented type has no analogue.
pub fn render_type(doc_type: &str, rendering: TypeRendering) -> Result<String> {
    let Some(host) = host_type(doc_type) else {
        return Ok("unknown".to_string());
    };

    let rendered = match (rendering, &host) {
        (TypeRendering::Type, HostType::NoAnalogue) => {
            return Err(PipelineError::NoHostType(doc_type.trim().to_string()));
        }
        (TypeRendering::Type, HostType::Record(name)) => format!("record {name}"),
        (TypeRendering::Type, _) | (TypeRendering::Str, _) => host.name().to_string(),
        (TypeRendering::Repr, HostType::Record(name)) => format!("<record '{name}'>"),
        (TypeRendering::Repr, _) => format!("<type '{}'>", host.name()),
    };
    Ok(rendered)
}
