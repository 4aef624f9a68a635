//! JSON:API document CLI
//!
//! Command-line interface for building compound documents from datasets
//! and validating encoded documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsonapi_document::{
    load_dataset_auto, validate_document, BaseUrlLinks, BuildContext, DocumentBuilder,
    DocumentOptions, IncludeTree, Meta, Operation, SparseFieldsets, StaticMeta, UnloadedPolicy,
    ValidateError,
};
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(name = "jsonapi-document")]
#[command(about = "Build and validate JSON:API compound documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a document from a dataset's primary resources
    Build {
        /// Dataset source: file path or URL (http:// or https://)
        dataset: String,

        /// Include paths, e.g. "author.blogs,reviewer"
        #[arg(long, short, default_value = "")]
        include: String,

        /// Sparse fieldset as TYPE=field,field (repeatable)
        #[arg(long = "fields", value_name = "TYPE=FIELDS")]
        fields: Vec<String>,

        /// Base URL for self/related links (no links if omitted)
        #[arg(long)]
        base_url: Option<String>,

        /// Operation the document answers: read, create or update
        #[arg(long, short, default_value = "read")]
        op: String,

        /// Rendering of unloaded relationships: omit or null
        #[arg(long, default_value = "omit")]
        unloaded: String,

        /// Meta member added to every resource after a create or update,
        /// as KEY=VALUE (repeatable)
        #[arg(long = "resource-meta", value_name = "KEY=VALUE")]
        resource_meta: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Validate the document before writing it
        #[arg(long)]
        check: bool,
    },

    /// Validate an encoded document
    Validate {
        /// Document file to validate
        document: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    setup_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            dataset,
            include,
            fields,
            base_url,
            op,
            unloaded,
            resource_meta,
            output,
            pretty,
            check,
        } => run_build(BuildArgs {
            dataset,
            include,
            fields,
            base_url,
            op,
            unloaded,
            resource_meta,
            output,
            pretty,
            check,
        }),

        Commands::Validate { document, json } => run_validate(&document, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Log to stderr, filtered by `RUST_LOG`, so stdout stays clean JSON.
fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

struct BuildArgs {
    dataset: String,
    include: String,
    fields: Vec<String>,
    base_url: Option<String>,
    op: String,
    unloaded: String,
    resource_meta: Vec<String>,
    output: Option<PathBuf>,
    pretty: bool,
    check: bool,
}

fn run_build(args: BuildArgs) -> Result<(), u8> {
    let BuildArgs {
        dataset: source,
        include,
        fields,
        base_url,
        op,
        unloaded,
        resource_meta,
        output,
        pretty,
        check,
    } = args;

    let operation = Operation::parse(&op).ok_or_else(|| {
        eprintln!("Error: unknown operation \"{}\": expected read, create or update", op);
        2u8
    })?;
    let unloaded = UnloadedPolicy::parse(&unloaded).ok_or_else(|| {
        eprintln!("Error: unknown unloaded policy \"{}\": expected omit or null", unloaded);
        2u8
    })?;

    let include = IncludeTree::parse(&include).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let mut fieldsets = SparseFieldsets::new();
    for entry in &fields {
        fieldsets = fieldsets.parse_entry(entry).map_err(|e| {
            eprintln!("Error: {}", e);
            2u8
        })?;
    }

    let mut meta = Meta::new();
    for entry in &resource_meta {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            eprintln!("Error: invalid --resource-meta \"{}\": expected KEY=VALUE", entry);
            2u8
        })?;
        meta.insert(key.to_string(), Value::String(value.to_string()));
    }
    let meta = StaticMeta::new(meta).writes_only(true);

    let dataset = load_dataset_auto(&source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    info!(source = %source, resources = dataset.graph.len(), "dataset loaded");

    let mut context = BuildContext::new(operation);
    if let Some(base_url) = base_url {
        context = context.base_url(base_url);
    }
    let options = DocumentOptions::new().unloaded(unloaded).context(context);

    let document = DocumentBuilder::new(&dataset.schema)
        .fields(&fieldsets)
        .links(&BaseUrlLinks)
        .meta(&meta)
        .options(options)
        .build(&dataset.graph, &dataset.primary, &include)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let value = document.to_value().map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    if check {
        if let Err(e) = validate_document(&value) {
            report_validation(&e, false);
            return Err(e.exit_code() as u8);
        }
    }

    let json_output = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_validate(path: &Path, json_output: bool) -> Result<(), u8> {
    if !path.exists() {
        report_error(json_output, &format!("file not found: {}", path.display()));
        return Err(3);
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        report_error(json_output, &format!("cannot read {}: {}", path.display(), e));
        3u8
    })?;
    let document: Value = serde_json::from_str(&content).map_err(|e| {
        report_error(json_output, &format!("invalid JSON: {}", e));
        2u8
    })?;

    match validate_document(&document) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(e) => {
            report_validation(&e, json_output);
            Err(e.exit_code() as u8)
        }
    }
}

fn report_validation(error: &ValidateError, json_output: bool) {
    match error {
        ValidateError::Invalid { errors } => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
        }
        other => report_error(json_output, &other.to_string()),
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!(
            "{}",
            serde_json::json!({ "valid": false, "error": msg })
        );
    } else {
        eprintln!("Error: {}", msg);
    }
}
