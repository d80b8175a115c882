// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! echo-wire-gen: command-line front end for the wire schema compiler.
//!
//! Reads a JSON array of schema nodes (from a path, or `-` for stdin), runs
//! the compile driver, and prints diagnostics, derived codec plans, the
//! factory table, or a decoded buffer as JSON on stdout. Logs go to stderr.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use echo_wire_schema::{compile, parse_nodes, CodecPlan, Compilation, CompileError, CompileOptions};

#[derive(Parser)]
#[command(
    name = "echo-wire-gen",
    version,
    about = "Compile binary wire schemas into codec plans",
    disable_help_subcommand = true
)]
struct Cli {
    /// JSON file overriding compile options (missing keys keep their defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity: -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schema and list every diagnostic.
    Check(SchemaArg),
    /// Print derived size / serialize / deserialize plans.
    Plan(PlanArgs),
    /// Print the polymorphic factory table.
    Factory(SchemaArg),
    /// Decode a buffer with the reference interpreter.
    Decode(DecodeArgs),
}

#[derive(Args)]
struct SchemaArg {
    /// Schema node JSON, or `-` for stdin.
    schema: String,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    schema: SchemaArg,

    /// Only print the plan of this struct.
    #[arg(long = "struct")]
    strukt: Option<String>,
}

#[derive(Args)]
struct DecodeArgs {
    #[command(flatten)]
    schema: SchemaArg,

    #[command(flatten)]
    target: Target,

    #[command(flatten)]
    input: Input,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Decode as this struct.
    #[arg(long = "type")]
    type_name: Option<String>,

    /// Pick the struct from this discriminator enum's header.
    #[arg(long)]
    group: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Input {
    /// Buffer as hex digits (an optional `0x` prefix and whitespace are ignored).
    #[arg(long)]
    hex: Option<String>,

    /// Buffer as a raw binary file.
    #[arg(long)]
    raw: Option<PathBuf>,
}

#[derive(Serialize)]
struct PlanDocument<'a> {
    schema_blake3: String,
    options: &'a CompileOptions,
    plans: Vec<&'a CodecPlan>,
}

#[derive(Serialize)]
struct CheckReport {
    ok: bool,
    diagnostics: Vec<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let options = load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::Check(args) => run_check(&args, &options),
        Commands::Plan(args) => run_plan(&args, &options).map(|()| ExitCode::SUCCESS),
        Commands::Factory(args) => run_factory(&args, &options).map(|()| ExitCode::SUCCESS),
        Commands::Decode(args) => run_decode(&args, &options).map(|()| ExitCode::SUCCESS),
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn load_options(path: Option<&Path>) -> Result<CompileOptions> {
    let Some(path) = path else {
        return Ok(CompileOptions::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let options = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    debug!(?options, "options loaded");
    Ok(options)
}

fn read_schema(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read schema from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(source).with_context(|| format!("failed to read schema {source}"))
}

/// Schema text plus the outcome of compiling it.
fn compile_schema(
    args: &SchemaArg,
    options: &CompileOptions,
) -> Result<(String, Result<Compilation, CompileError>)> {
    let text = read_schema(&args.schema)?;
    let nodes = parse_nodes(&text).context("schema is not a valid node list")?;
    info!(source = %args.schema, nodes = nodes.len(), "schema loaded");
    let compiled = compile(&nodes, options);
    Ok((text, compiled))
}

/// Like [`compile_schema`], but a rejected schema is an error.
fn compile_or_bail(args: &SchemaArg, options: &CompileOptions) -> Result<(String, Compilation)> {
    let (text, compiled) = compile_schema(args, options)?;
    match compiled {
        Ok(compiled) => Ok((text, compiled)),
        Err(err) => Err(anyhow!("{err}:\n  {}", err.diagnostics().join("\n  "))),
    }
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("failed to write JSON")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

fn run_check(args: &SchemaArg, options: &CompileOptions) -> Result<ExitCode> {
    let (_, compiled) = compile_schema(args, options)?;
    let report = match compiled {
        Ok(compiled) => {
            info!(structs = compiled.schema.structs().len(), "schema ok");
            CheckReport {
                ok: true,
                diagnostics: Vec::new(),
            }
        }
        Err(err) => CheckReport {
            ok: false,
            diagnostics: err.diagnostics(),
        },
    };
    emit(&report)?;
    Ok(if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_plan(args: &PlanArgs, options: &CompileOptions) -> Result<()> {
    let (text, compiled) = compile_or_bail(&args.schema, options)?;
    let plans = match &args.strukt {
        Some(name) => vec![compiled
            .plan(name)
            .with_context(|| format!("struct '{name}' not declared"))?],
        None => compiled
            .schema
            .structs()
            .iter()
            .filter_map(|s| compiled.plan(&s.name))
            .collect(),
    };
    let document = PlanDocument {
        schema_blake3: blake3::hash(text.as_bytes()).to_hex().to_string(),
        options,
        plans,
    };
    emit(&document)
}

fn run_factory(args: &SchemaArg, options: &CompileOptions) -> Result<()> {
    let (_, compiled) = compile_or_bail(args, options)?;
    emit(&compiled.factory.entries())
}

fn run_decode(args: &DecodeArgs, options: &CompileOptions) -> Result<()> {
    let (_, compiled) = compile_or_bail(&args.schema, options)?;
    let bytes = match (&args.input.hex, &args.input.raw) {
        (Some(digits), _) => parse_hex(digits)?,
        (None, Some(path)) => {
            fs::read(path).with_context(|| format!("failed to read buffer {}", path.display()))?
        }
        (None, None) => bail!("either --hex or --raw is required"),
    };
    info!(bytes = bytes.len(), "decoding buffer");
    let interp = compiled.interpreter();
    let record = match (&args.target.type_name, &args.target.group) {
        (Some(name), _) => interp
            .decode(name, &bytes)
            .with_context(|| format!("failed to decode as '{name}'"))?,
        (None, Some(group)) => interp
            .decode_any(group, &bytes)
            .with_context(|| format!("failed to decode from group '{group}'"))?,
        (None, None) => bail!("either --type or --group is required"),
    };
    emit(&record)
}

fn parse_hex(digits: &str) -> Result<Vec<u8>> {
    let trimmed = digits.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact).context("--hex is not valid hex")
}
