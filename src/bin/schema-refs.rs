//! Command-line interface for inspecting JSON Schema documents: resolve
//! references, list identifiers, check reference pointers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use schema_refs::{
    compute_identifiers, resolve_reference, validate_reference, DirLoader, ResolveConfig, Schema,
};

#[derive(Parser)]
#[command(name = "schema-refs")]
#[command(about = "Inspect JSON Schema identifiers and resolve references")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a reference against a schema document
    Resolve {
        /// Path to the schema document
        schema: PathBuf,

        /// The reference to resolve (e.g. "#/$defs/foo", "other.json#bar")
        #[arg(long = "ref", short)]
        reference: String,

        /// Root directory for file:// references (defaults to the
        /// schema's directory)
        #[arg(long)]
        root_dir: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the identifier map of a schema document
    Identifiers {
        /// Path to the schema document
        schema: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a schema reference pointer
    CheckPointer {
        /// The pointer to validate (e.g. "#/properties/foo")
        pointer: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            schema,
            reference,
            root_dir,
            pretty,
        } => run_resolve(&schema, &reference, root_dir, pretty),
        Commands::Identifiers { schema, pretty } => run_identifiers(&schema, pretty),
        Commands::CheckPointer { pointer } => run_check_pointer(&pointer),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load_document(path: &Path) -> Result<Schema, u8> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: cannot read {}: {}", path.display(), e);
        3u8
    })?;
    serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error: invalid schema in {}: {}", path.display(), e);
        2u8
    })
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), u8> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", text);
    Ok(())
}

fn run_resolve(
    schema_path: &Path,
    reference: &str,
    root_dir: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let schema = load_document(schema_path)?;

    let root = root_dir.unwrap_or_else(|| {
        schema_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let config = ResolveConfig::new().loader(Arc::new(DirLoader::new(root)));

    let resolved = resolve_reference(&config, reference, &schema).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    print_json(&resolved, pretty)
}

fn run_identifiers(schema_path: &Path, pretty: bool) -> Result<(), u8> {
    let schema = load_document(schema_path)?;

    let identifiers = compute_identifiers(&schema).map_err(|e| {
        eprintln!("Error: {}", e);
        1u8
    })?;

    // Flatten the records into plain JSON for scripting.
    let mut out = BTreeMap::new();
    for (pointer, record) in &identifiers {
        let mut entry = serde_json::Map::new();
        entry.insert("baseUri".into(), record.base_uri.clone().into());
        entry.insert(
            "canonicalPointerUri".into(),
            record.canonical_pointer_uri.clone().into(),
        );
        if let Some(plain) = &record.canonical_plain_uri {
            entry.insert("canonicalPlainUri".into(), plain.clone().into());
        }
        if !record.enclosing_resource_uris.is_empty() {
            let mut uris = record.enclosing_resource_uris.clone();
            uris.sort();
            entry.insert("enclosingResourceUris".into(), uris.into());
        }
        out.insert(pointer.clone(), serde_json::Value::Object(entry));
    }

    print_json(&out, pretty)
}

fn run_check_pointer(pointer: &str) -> Result<(), u8> {
    match validate_reference(pointer) {
        Ok(()) => {
            println!("valid");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(1)
        }
    }
}
