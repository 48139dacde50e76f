use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use helpapi_core::{CommandEntry, TopicDoc, validate_schema};
use helpapi_discovery::builder::{self, BuildOutput};
use helpapi_discovery::render::describe_entry;
use helpapi_discovery::signature::infer_entry;
use helpapi_discovery::toc::TocMode;
use helpapi_discovery::topic::parse_topic;
use helpapi_discovery::typemap::TypeRendering;
use helpapi_discovery::{OutputFormat, PipelineConfig, StubSummary, write_stubs};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "helpapi", version = PACKAGE_VERSION)]
#[command(about = "Extract an API schema from a compiled help archive and generate wrapper stubs")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Pipeline configuration YAML file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory for all generated artifacts (overrides the config file).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Format of schema and documentation documents.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
    /// Log debug-level detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Locate, decompile and parse the help archive, then write the API schema.
    Build(BuildArgs),
    /// Generate wrapper stubs from a previously built schema.
    Stubs,
    /// Build the schema, then generate stubs.
    Run(BuildArgs),
    /// Parse one topic fragment and print its sections and inferred entry.
    ParseTopic(ParseTopicArgs),
    /// Check a schema file for data-quality issues.
    Validate(SchemaArgs),
    /// Show one command's signature with host-language types.
    Describe(DescribeArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Help archive to read instead of searching install locations.
    #[arg(long)]
    help_file: Option<PathBuf>,
    /// Table-of-contents layout.
    #[arg(long, value_enum)]
    toc_mode: Option<TocMode>,
    /// Replace vendor documentation with placeholders.
    #[arg(long)]
    distributable: bool,
}

#[derive(Debug, Args)]
struct ParseTopicArgs {
    /// Topic fragment (HTML) to parse.
    #[arg(long)]
    input: PathBuf,
    /// Command name; defaults to the file stem.
    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Schema file; defaults to the final schema in the data directory.
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct DescribeArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Command to describe.
    #[arg(long)]
    command: String,
    /// How host types are shown.
    #[arg(long, value_enum, default_value_t = TypeRendering::Str)]
    types: TypeRendering,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = load_config(&cli.global).and_then(|config| match cli.command {
        Command::Build(args) => run_build(config, args).map(|_| ()),
        Command::Stubs => run_stubs(&config),
        Command::Run(args) => run_all(config, args),
        Command::ParseTopic(args) => run_parse_topic(&config, args),
        Command::Validate(args) => run_validate(&config, args),
        Command::Describe(args) => run_describe(&config, args),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn load_config(global: &GlobalArgs) -> Result<PipelineConfig, String> {
    let mut config = match &global.config {
        Some(path) => PipelineConfig::load(path).map_err(|e| e.to_string())?,
        None => PipelineConfig::default(),
    };
    if let Some(data_dir) = &global.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(format) = global.format {
        config.format = format;
    }
    debug!(?config, "effective configuration");
    Ok(config)
}

fn apply_build_args(mut config: PipelineConfig, args: BuildArgs) -> Result<PipelineConfig, String> {
    // Relative to the working directory, not to the data directory.
    if let Some(help_file) = args.help_file {
        let help_file = std::path::absolute(&help_file)
            .map_err(|e| format!("Invalid help file path '{}': {e}", help_file.display()))?;
        config.help_file = Some(help_file);
    }
    if let Some(toc_mode) = args.toc_mode {
        config.toc_mode = toc_mode;
    }
    if args.distributable {
        config.distributable = true;
    }
    Ok(config)
}

fn run_build(config: PipelineConfig, args: BuildArgs) -> Result<(PipelineConfig, BuildOutput), String> {
    let config = apply_build_args(config, args)?;
    let output = builder::run_build(&config).map_err(|e| e.to_string())?;
    let report = &output.report;

    println!("Build summary:");
    println!("  Topics indexed: {}", report.topics_indexed);
    println!("  Topics kept: {}", report.topics_kept);
    println!("  Bypassed names: {}", report.bypassed.len());
    for (kind, count) in &report.kind_counts {
        println!("  {kind}: {count}");
    }
    println!("  Overrides applied: {}", report.overrides_applied);
    println!("  Decompiler: {}", report.decompile);
    if !report.warnings.is_empty() {
        println!("  Warnings: {}", report.warnings.len());
    }
    println!("\nWrote {} artifact(s):", report.artifacts.len());
    for path in &report.artifacts {
        println!("  {}", path.display());
    }

    Ok((config, output))
}

fn print_stub_summary(config: &PipelineConfig, summary: &StubSummary) {
    println!(
        "Generated {} stub(s) in {} ({} skipped).",
        summary.written.len(),
        config.stub_dir().display(),
        summary.skipped.len()
    );
    if !summary.removed.is_empty() {
        println!("Removed {} stale stub(s).", summary.removed.len());
    }
}

fn run_stubs(config: &PipelineConfig) -> Result<(), String> {
    let schema = builder::load_schema(config).map_err(|e| e.to_string())?;
    let summary = write_stubs(config, &schema).map_err(|e| e.to_string())?;
    print_stub_summary(config, &summary);
    Ok(())
}

fn run_all(config: PipelineConfig, args: BuildArgs) -> Result<(), String> {
    let (config, output) = run_build(config, args)?;
    let summary = write_stubs(&config, &output.schema).map_err(|e| e.to_string())?;
    print_stub_summary(&config, &summary);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ParsedTopicView {
    name: String,
    keep: bool,
    documentation: TopicDoc,
    entry: CommandEntry,
    low_confidence: bool,
    dropped_lines: Vec<String>,
}

fn run_parse_topic(config: &PipelineConfig, args: ParseTopicArgs) -> Result<(), String> {
    let html = fs::read_to_string(&args.input)
        .map_err(|e| format!("Failed to read '{}': {e}", args.input.display()))?;
    let name = match args.name {
        Some(name) => name,
        None => args
            .input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| "Cannot derive a command name; pass --name".to_string())?,
    };

    let parsed = parse_topic(&html);
    let inference = infer_entry(&name, &parsed.doc, config.max_param_name_len);
    let view = ParsedTopicView {
        low_confidence: inference.is_low_confidence(),
        name,
        keep: parsed.keep,
        documentation: parsed.doc,
        entry: inference.entry,
        dropped_lines: inference.dropped_lines,
    };

    let rendered = config.format.serialize(&view).map_err(|e| e.to_string())?;
    print!("{rendered}");
    Ok(())
}

fn schema_path(config: &PipelineConfig, args: &SchemaArgs) -> PathBuf {
    args.schema.clone().unwrap_or_else(|| config.api_path())
}

fn run_validate(config: &PipelineConfig, args: SchemaArgs) -> Result<(), String> {
    let path = schema_path(config, &args);
    let schema = builder::load_schema_file(&path).map_err(|e| e.to_string())?;
    let issues = validate_schema(&schema, config.max_param_name_len);

    if issues.is_empty() {
        println!("{}: {} command(s), no issues.", path.display(), schema.len());
        return Ok(());
    }
    for issue in &issues {
        println!("  {issue}");
    }
    Err(format!("{} issue(s) found in '{}'", issues.len(), path.display()))
}

fn run_describe(config: &PipelineConfig, args: DescribeArgs) -> Result<(), String> {
    let path = schema_path(config, &args.schema);
    let schema = builder::load_schema_file(&path).map_err(|e| e.to_string())?;
    let entry = schema
        .get(&args.command)
        .ok_or_else(|| format!("Command '{}' not found in '{}'", args.command, path.display()))?;
    let text = describe_entry(&args.command, entry, args.types).map_err(|e| e.to_string())?;
    print!("{text}");
    Ok(())
}
