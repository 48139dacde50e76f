//! Core schema types for APIs mined from compiled help archives.
//!
//! This crate defines the data model passed between pipeline stages:
//!
//! - [`TocEntry`]: one topic listed in an archive's table of contents.
//! - [`TopicDoc`]: section heading → section text for one topic.
//! - [`SignatureItem`], [`CommandKind`], [`CommandEntry`]: the inferred
//!   calling convention of one command.
//! - [`ApiSchema`]: command name → [`CommandEntry`], the persisted artifact
//!   that stub generation and runtime dispatch consume.
//!
//! Manual corrections are expressed as an [`OverrideTable`] and applied with
//! [`apply_overrides`], which fails on names the schema does not contain.
//! [`validate_schema`] reports data-quality issues without rejecting the
//! schema.
//!
//! # Example
//!
//! ```
//! use helpapi_core::*;
//!
//! let mut entry = CommandEntry::new("Sets the system units.", CommandKind::Subroutine);
//! entry.sig.push(SignatureItem::new("units", "String"));
//!
//! let mut schema = ApiSchema::new();
//! schema.insert("SetUnits", entry);
//!
//! let yaml = serde_yaml::to_string(&schema).unwrap();
//! assert!(yaml.contains("cmdtype: subroutine"));
//! assert!(validate_schema(&schema, MAX_PARAM_NAME_LEN).is_empty());
//! ```

mod overrides;
mod types;
mod validate;

pub use overrides::{CommandOverride, OverrideError, OverrideTable, apply_overrides};
pub use types::*;
pub use validate::{MAX_PARAM_NAME_LEN, ValidationIssue, validate_entry, validate_schema};
