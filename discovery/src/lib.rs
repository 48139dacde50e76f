//! Mine command signatures from compiled help archives and generate wrapper
//! stubs.
//!
//! The pipeline runs in fixed stages, each a plain function taking a
//! [`PipelineConfig`]:
//!
//! 1. [`archive`] locates the help archive and unpacks it with an external
//!    decompiler.
//! 2. [`toc`] parses the table of contents into a [`toc::TopicIndex`].
//! 3. [`topic`] recovers the documentation sections of every topic.
//! 4. [`signature`] infers parameters, return binding and command kind.
//! 5. [`builder`] assembles the [`ApiSchema`], applies overrides and writes
//!    every artifact.
//! 6. [`stubgen`] writes one wrapper stub per callable command.
//!
//! Parsing entry points work on in-memory text and need no archive:
//!
//! ```
//! use helpapi_discovery::{signature::infer_entry, topic::parse_topic};
//! use helpapi_core::{CommandKind, SignatureItem, MAX_PARAM_NAME_LEN};
//!
//! let html = r#"<body>
//!   <span class="ts14">Syntax</span> SetUnits units
//!   <span class="ts14">Parameters</span> ByVal units As String
//! </body>"#;
//!
//! let parsed = parse_topic(html);
//! assert!(parsed.keep);
//!
//! let inference = infer_entry("SetUnits", &parsed.doc, MAX_PARAM_NAME_LEN);
//! assert_eq!(inference.entry.cmdtype, CommandKind::Subroutine);
//! assert_eq!(inference.entry.sig, vec![SignatureItem::new("units", "String")]);
//! ```
//!
//! [`ApiSchema`]: helpapi_core::ApiSchema

pub mod archive;
pub mod builder;
pub mod config;
pub mod error;
pub mod markup;
pub mod output;
pub mod render;
pub mod signature;
pub mod stubgen;
pub mod toc;
pub mod topic;
pub mod typemap;

pub use builder::{BuildOutput, BuildReport, run_build};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use output::OutputFormat;
pub use stubgen::{StubSummary, write_stubs};
