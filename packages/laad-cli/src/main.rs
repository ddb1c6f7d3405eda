//! LaaD compiler CLI
//!
//! # Usage
//!
//! ```bash
//! # Compile to LNJ (stdout unless -o is given)
//! laad compile program.laad -o program.lnj.json --pretty
//!
//! # Run every stage without writing output
//! laad check program.laad
//!
//! # Print the parsed AST
//! laad dump-ast program.laad
//!
//! # Load an LNJ document and print it
//! laad dump-json program.lnj.json
//!
//! # Also write logs to a file
//! laad --log-level debug --log-file laad.log compile program.laad
//!
//! # List built-in node templates
//! laad templates
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use laad_core::features::templates;
use laad_core::{parse, CompilerConfig, Compiler, LnjDocument};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "laad")]
#[command(about = "LaaD compiler - text programs to LNJ node graphs", long_about = None)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Copy log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file to LNJ JSON
    Compile {
        file: PathBuf,

        /// Output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML compiler configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Compile without writing output
    Check {
        file: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the parsed AST
    DumpAst { file: PathBuf },

    /// Load an LNJ JSON document and print it
    DumpJson { file: PathBuf },

    /// List built-in node templates
    Templates,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Compile {
            file,
            output,
            config,
            pretty,
        } => compile(&file, output.as_deref(), config.as_deref(), pretty),
        Commands::Check { file, config } => check(&file, config.as_deref()),
        Commands::DumpAst { file } => dump_ast(&file),
        Commands::DumpJson { file } => dump_json(&file),
        Commands::Templates => {
            for path in templates::registry::all_paths() {
                println!("{}", path);
            }
            Ok(())
        }
    }
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level `{}`", level))?;
    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("installing the log subscriber")?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    match path {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(CompilerConfig::default()),
    }
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

fn compile(file: &Path, output: Option<&Path>, config: Option<&Path>, pretty: bool) -> Result<()> {
    let config = load_config(config)?;
    let pretty = pretty || config.emit.pretty;
    let source = read_source(file)?;
    let result = Compiler::new(config)
        .compile(&source)
        .with_context(|| format!("compiling {}", file.display()))?;
    let json = result.to_json(pretty)?;

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(output = %path.display(), "wrote LNJ");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn check(file: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let source = read_source(file)?;
    let result = Compiler::new(config)
        .compile(&source)
        .with_context(|| format!("checking {}", file.display()))?;
    println!(
        "{}: ok ({} vertices, {} edges, {:?})",
        file.display(),
        result.document.vertices.len(),
        result.document.edges.len(),
        result.total_duration()
    );
    Ok(())
}

fn dump_ast(file: &Path) -> Result<()> {
    let source = read_source(file)?;
    let program = parse(&source).with_context(|| format!("parsing {}", file.display()))?;
    println!("{:#?}", program);
    Ok(())
}

fn dump_json(file: &Path) -> Result<()> {
    let json = read_source(file)?;
    let document =
        LnjDocument::from_json(&json).with_context(|| format!("loading {}", file.display()))?;
    info!(
        vertices = document.vertices.len(),
        edges = document.edges.len(),
        "loaded LNJ"
    );
    println!("{:#?}", document);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_file_is_global() {
        let cli = Cli::try_parse_from(["laad", "dump-json", "a.json", "--log-file", "laad.log"]).unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("laad.log")));
        assert!(matches!(cli.command, Commands::DumpJson { .. }));
    }

    #[test]
    fn test_dump_json_loads_compiled_document() {
        let output = laad_core::compile("\"hi\" -> display").unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(output.to_json(true).unwrap().as_bytes()).unwrap();
        assert!(dump_json(file.path()).is_ok());
    }

    #[test]
    fn test_dump_json_rejects_malformed_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ \"vertices\": ").unwrap();
        let err = dump_json(file.path()).unwrap_err();
        assert!(err.to_string().contains("loading"));
    }
}
