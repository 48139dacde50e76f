use std::fs;
use std::path::{Path, PathBuf};

use helpapi_core::{CommandKind, SignatureItem};
use helpapi_discovery::archive::DecompileOutcome;
use helpapi_discovery::builder::{self, RETURNS_SECTION};
use helpapi_discovery::output::read_document;
use helpapi_discovery::{OutputFormat, PipelineConfig, PipelineError, run_build, write_stubs};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn copy_tree(src: &Path, dst: &Path) {
    for entry in WalkDir::new(src) {
        let entry = entry.expect("fixture tree should be readable");
        let rel = entry.path().strip_prefix(src).unwrap();
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// A data directory holding the unpacked fixture archive and a dummy
/// `Fred.chm`. The decompiler is disabled so the fragments on disk are used.
fn workspace(overrides: Option<&str>) -> (tempfile::TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    copy_tree(&fixtures().join("help"), &data_dir.join("html"));

    let help_file = dir.path().join("Fred.chm");
    fs::write(&help_file, b"ITSF").unwrap();

    let mut config = PipelineConfig::with_data_dir(&data_dir);
    config.help_file = Some(help_file);
    config.decompiler.program = String::new();

    if let Some(name) = overrides {
        install_overrides(&config, name);
    }
    (dir, config)
}

fn install_overrides(config: &PipelineConfig, name: &str) {
    fs::copy(
        fixtures().join("overrides").join(name),
        config.override_path(),
    )
    .unwrap();
}

#[test]
fn test_build_extracts_fixture_archive() {
    let (_dir, config) = workspace(None);
    let output = run_build(&config).expect("fixture build should succeed");
    let report = &output.report;

    assert_eq!(report.decompile, DecompileOutcome::Skipped);
    assert_eq!(report.topics_indexed, 6);
    assert_eq!(report.topics_kept, 5);
    assert_eq!(report.topics_without_headings, vec!["Overview"]);
    assert_eq!(report.low_confidence, vec!["ResetAll"]);
    assert_eq!(report.dropped_lines, 1);
    assert_eq!(report.overrides_applied, 0);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    assert_eq!(report.kind_counts[&CommandKind::Function], 1);
    assert_eq!(report.kind_counts[&CommandKind::Subroutine], 3);
    assert_eq!(report.kind_counts[&CommandKind::Datastruct], 1);
    assert_eq!(report.kind_counts[&CommandKind::Unknown], 0);

    let names: Vec<&str> = output.schema.names().collect();
    assert_eq!(names, vec!["GetUnits", "NodeDist", "ResetAll", "SetUnits", "T_RAY"]);

    let ray = output.schema.get("T_RAY").unwrap();
    assert_eq!(ray.cmdtype, CommandKind::Datastruct);
    assert_eq!(
        ray.sig,
        vec![SignatureItem::new("x", "Double"), SignatureItem::new("y", "Double")]
    );
    assert!(ray.descr.ends_with("data structure."));
}

#[test]
fn test_function_return_binding_is_split_from_parameters() {
    let (_dir, config) = workspace(None);
    let output = run_build(&config).unwrap();

    let get_units = output.schema.get("GetUnits").unwrap();
    assert_eq!(get_units.cmdtype, CommandKind::Function);
    assert_eq!(get_units.descr, "Returns the current system units.");
    assert_eq!(get_units.returns, vec!["lresult", "Long"]);
    assert_eq!(get_units.sig, vec![SignatureItem::new("xval", "Double")]);

    let doc = &output.docs["GetUnits"];
    assert_eq!(doc.get(RETURNS_SECTION), Some("lresult As Long"));
    assert_eq!(doc.get("See Also"), Some("SetUnits, NodeDist"));
}

#[test]
fn test_names_with_spaces_are_excluded() {
    let (_dir, config) = workspace(None);
    let output = run_build(&config).unwrap();

    assert_eq!(output.report.bypassed, vec!["Add Plane Tool"]);
    assert!(!output.schema.contains("Add Plane Tool"));
    assert!(!output.docs.contains_key("Add Plane Tool"));
}

#[test]
fn test_build_writes_every_artifact() {
    let (_dir, config) = workspace(None);
    let output = run_build(&config).unwrap();

    for path in [
        config.api_path(),
        config.raw_api_path(),
        config.doc_path(),
        config.rendering_path("alldocs"),
        config.rendering_path("allfuncts"),
        config.rendering_path("allsubs"),
        config.rendering_path("allstructs"),
        config.rendering_path("allunknowns"),
        config.report_path(),
    ] {
        assert!(path.is_file(), "missing artifact {}", path.display());
        assert!(output.report.artifacts.contains(&path));
    }
    assert_eq!(output.report.artifacts.len(), 9);

    let body = fs::read(config.api_path()).unwrap();
    assert_eq!(output.report.schema_sha256, format!("{:x}", Sha256::digest(&body)));

    let funcs = fs::read_to_string(config.rendering_path("allfuncts")).unwrap();
    assert!(funcs.contains("TOPIC: GetUnits\n"));
    assert!(!funcs.contains("TOPIC: SetUnits"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.report_path()).unwrap()).unwrap();
    assert_eq!(report["decompile"]["status"], "skipped");
    assert_eq!(report["topics_kept"], 5);
}

#[test]
fn test_persisted_documents_round_trip() {
    for format in [OutputFormat::Yaml, OutputFormat::Json] {
        let (_dir, mut config) = workspace(None);
        config.format = format;
        let output = run_build(&config).unwrap();

        assert_eq!(builder::load_schema(&config).unwrap(), output.schema);
        assert_eq!(
            builder::load_schema_file(&config.raw_api_path()).unwrap(),
            output.raw_schema
        );
        let docs: helpapi_core::DocumentationMap =
            read_document(&config.doc_path(), format).unwrap();
        assert_eq!(docs, output.docs);
    }
}

#[test]
fn test_subroutine_stubs() {
    let (_dir, config) = workspace(None);
    let output = run_build(&config).unwrap();
    let summary = write_stubs(&config, &output.schema).unwrap();

    assert_eq!(summary.written.len(), 4);
    assert_eq!(summary.skipped, vec!["T_RAY"]);
    assert!(!config.stub_path("T_RAY").exists());

    let node_dist = fs::read_to_string(config.stub_path("NodeDist")).unwrap();
    assert!(node_dist.starts_with("Function libfunct (nid As Long, dist As Double) As Variant\n"));
    assert!(node_dist.contains("\n    NodeDist nid, dist\n    libfunct = Array(nid, dist)\n"));
    assert!(node_dist.ends_with("End Function\n"));

    let set_units = fs::read_to_string(config.stub_path("SetUnits")).unwrap();
    assert!(set_units.starts_with("Function libfunct (units As String) As String\n"));
    assert!(set_units.contains("\n    SetUnits units\n    libfunct = units\n"));

    let reset_all = fs::read_to_string(config.stub_path("ResetAll")).unwrap();
    assert!(reset_all.starts_with("Function libfunct (dummy As Variant)\n"));
    assert!(reset_all.contains("\n    ResetAll\nEnd Function\n"));

    let get_units = fs::read_to_string(config.stub_path("GetUnits")).unwrap();
    assert!(get_units.starts_with("Function libfunct (xval As Double) As Long\n"));
    assert!(get_units.contains("    libfunct = GetUnits (xval)\n"));
}

#[test]
fn test_stub_generation_is_repeatable() {
    let (_dir, config) = workspace(None);
    run_build(&config).unwrap();
    let schema = builder::load_schema(&config).unwrap();

    write_stubs(&config, &schema).unwrap();
    let first = fs::read_to_string(config.stub_path("NodeDist")).unwrap();
    write_stubs(&config, &schema).unwrap();
    let second = fs::read_to_string(config.stub_path("NodeDist")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_overrides_patch_final_schema_only() {
    let (_dir, config) = workspace(Some("valid.yaml"));
    let output = run_build(&config).unwrap();

    assert_eq!(output.report.overrides_applied, 2);
    assert_eq!(
        output.schema.get("NodeDist").unwrap().descr,
        "Distance between a node and the origin."
    );
    assert_eq!(
        output.raw_schema.get("NodeDist").unwrap().descr,
        "Computes the distance from a node to the origin."
    );
    assert_eq!(
        output.schema.get("ResetAll").unwrap().sig,
        vec![SignatureItem::new("keepUnits", "Boolean")]
    );

    write_stubs(&config, &output.schema).unwrap();
    let reset_all = fs::read_to_string(config.stub_path("ResetAll")).unwrap();
    assert!(reset_all.contains("    libfunct = keepUnits\n"));
}

#[test]
fn test_override_drift_writes_nothing() {
    let (_dir, config) = workspace(Some("drift.yaml"));
    let err = run_build(&config).unwrap_err();

    assert!(matches!(err, PipelineError::Override(_)));
    assert!(err.to_string().contains("RemovedCommand"));
    assert!(!config.api_path().exists());
    assert!(!config.raw_api_path().exists());
    assert!(!config.report_path().exists());
}

#[test]
fn test_override_drift_keeps_previous_build() {
    let (_dir, config) = workspace(None);
    run_build(&config).unwrap();
    let before = fs::read_to_string(config.api_path()).unwrap();

    install_overrides(&config, "drift.yaml");
    assert!(run_build(&config).is_err());
    assert_eq!(fs::read_to_string(config.api_path()).unwrap(), before);
}

#[test]
fn test_distributable_build_redacts_documentation() {
    let (_dir, mut config) = workspace(None);
    config.distributable = true;
    let output = run_build(&config).unwrap();

    assert_eq!(output.schema.get("GetUnits").unwrap().descr, "Wrapper stub for GetUnits");
    assert_eq!(output.schema.get("GetUnits").unwrap().returns, vec!["lresult", "Long"]);
    for doc in output.docs.values() {
        assert_eq!(doc.get("Documentation"), Some("Not Available"));
    }
    let all_docs = fs::read_to_string(config.doc_path()).unwrap();
    assert!(!all_docs.contains("Returns the current system units."));
}

#[test]
fn test_failed_decompiler_falls_back_to_existing_fragments() {
    let (_dir, mut config) = workspace(None);
    config.decompiler.program = "helpapi-no-such-decompiler".to_string();
    let output = run_build(&config).unwrap();

    assert!(matches!(output.report.decompile, DecompileOutcome::Failed { .. }));
    assert_eq!(output.report.warnings.len(), 1);
    assert!(output.report.warnings[0].starts_with("decompiler:"));
    assert_eq!(output.schema.len(), 5);
}

#[test]
fn test_missing_help_file_is_fatal() {
    let (dir, mut config) = workspace(None);
    config.help_file = Some(dir.path().join("Missing.chm"));
    assert!(matches!(
        run_build(&config),
        Err(PipelineError::HelpFileNotFound { .. })
    ));
}

#[test]
fn test_missing_table_of_contents_is_fatal() {
    let (_dir, config) = workspace(None);
    fs::remove_file(config.html_dir().join("Fred.hhc")).unwrap();
    assert!(matches!(
        run_build(&config),
        Err(PipelineError::TocNotFound { .. })
    ));
}

#[test]
fn test_missing_topic_fragment_is_fatal() {
    let (_dir, config) = workspace(None);
    fs::remove_file(config.html_dir().join("topics/SetUnits.htm")).unwrap();
    let err = run_build(&config).unwrap_err();
    assert!(matches!(err, PipelineError::TopicNotFound { ref name, .. } if name == "SetUnits"));
}

#[test]
fn test_validation_uses_configured_name_limit() {
    let long_name = "n".repeat(40);
    let overrides = format!("NodeDist:\n  sig:\n    - [{long_name}, Long]\n");

    let (_dir, mut config) = workspace(None);
    fs::write(config.override_path(), &overrides).unwrap();
    let output = run_build(&config).unwrap();
    assert_eq!(output.report.warnings.len(), 1);
    assert!(output.report.warnings[0].contains("exceeds 32 characters"));

    config.max_param_name_len = 64;
    let output = run_build(&config).unwrap();
    assert!(output.report.warnings.is_empty(), "{:?}", output.report.warnings);
}
