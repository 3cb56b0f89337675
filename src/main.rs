//! blobkit CLI - Command line interface for blob backends
//!
//! Stores and reads blobs through a configured backend, and runs the
//! conformance checks and benchmark scenarios against it.

use blobkit::harness::{Scenario, Suite};
use blobkit::{Backend, BackendConfig, BackendKind, Config, FileType, Handle, Id};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blobkit")]
#[command(about = "Content-addressed blob storage with a conformance and benchmark harness")]
#[command(version)]
struct Cli {
    /// Backend to use (overrides the config file)
    #[arg(short, long)]
    backend: Option<BackendArg>,

    /// Repository directory for the local backend
    #[arg(short, long)]
    repo: Option<PathBuf>,

    /// Config file (defaults to ~/.config/blobkit/config.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum BackendArg {
    Memory,
    Local,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a local repository
    Init,

    /// Store a file; data blobs are named by their content hash
    Put {
        /// File to store
        file: PathBuf,
        /// Object category
        #[arg(short = 't', long = "type", default_value = "data")]
        file_type: FileType,
        /// Object name (required for categories other than data and config;
        /// for data it must equal the content hash)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Write (part of) a stored blob to stdout
    Cat {
        /// Object name
        name: String,
        #[arg(short = 't', long = "type", default_value = "data")]
        file_type: FileType,
        /// Byte offset to start at
        #[arg(short, long, default_value = "0")]
        offset: u64,
        /// Number of bytes (0 reads to the end)
        #[arg(short, long, default_value = "0")]
        length: usize,
    },

    /// Show the size of a stored blob
    Stat {
        name: String,
        #[arg(short = 't', long = "type", default_value = "data")]
        file_type: FileType,
    },

    /// Remove a stored blob
    Rm {
        name: String,
        #[arg(short = 't', long = "type", default_value = "data")]
        file_type: FileType,
    },

    /// List stored names
    Ls {
        #[arg(short = 't', long = "type", default_value = "data")]
        file_type: FileType,
    },

    /// Check the backend against the contract
    Check,

    /// Run benchmark scenarios
    Bench {
        /// Scenarios to run (all when omitted)
        #[arg(short, long)]
        scenario: Vec<Scenario>,
        /// Iterations per scenario
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        /// Fixture size in bytes
        #[arg(long)]
        blob_length: Option<usize>,
        /// Bytes loaded by the partial scenarios
        #[arg(long)]
        window_length: Option<usize>,
        /// Offset of the offset-window scenario
        #[arg(long)]
        window_offset: Option<u64>,
        /// Fixture seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        output(
            &cli.format,
            &serde_json::json!({
                "status": "error",
                "message": format!("{e:#}")
            }),
        );
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(kind) = cli.backend {
        config.backend.kind = match kind {
            BackendArg::Memory => BackendKind::Memory,
            BackendArg::Local => BackendKind::Local,
        };
    }
    if let Some(repo) = &cli.repo {
        config.backend.path = Some(repo.clone());
    }

    match &cli.command {
        Commands::Init => {
            let repo = config.backend.repo();
            blobkit::LocalBackend::create(&repo)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Created repository at {}", repo.display())
                }),
            );
        }

        Commands::Put {
            file,
            file_type,
            name,
        } => {
            let backend = config.backend.open()?;
            let handle = match (file_type, name) {
                (FileType::Data, name) => {
                    let (id, _) = Id::hash_reader(File::open(file)?)?;
                    let digest = id.to_hex();
                    if let Some(name) = name.as_deref().filter(|n| *n != digest) {
                        anyhow::bail!("data objects are named by content: {name} is not {digest}");
                    }
                    Handle::new(FileType::Data, digest)
                }
                (FileType::Config, _) => Handle::config(),
                (file_type, Some(name)) => Handle::new(*file_type, name.clone()),
                (file_type, None) => {
                    anyhow::bail!("--name is required for {file_type} objects")
                }
            };
            backend.save(&handle, &mut File::open(file)?)?;
            let size = backend.stat(&handle)?.size;
            backend.close()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "type": handle.file_type,
                    "name": handle.name,
                    "size": size
                }),
            );
        }

        Commands::Cat {
            name,
            file_type,
            offset,
            length,
        } => {
            let backend = config.backend.open()?;
            let handle = Handle::new(*file_type, name.clone());
            let mut rd = backend.load(&handle, *length, *offset)?;
            let mut stdout = io::stdout().lock();
            io::copy(&mut rd, &mut stdout)?;
            stdout.flush()?;
            rd.close()?;
            backend.close()?;
        }

        Commands::Stat { name, file_type } => {
            let backend = config.backend.open()?;
            let handle = Handle::new(*file_type, name.clone());
            let info = backend.stat(&handle)?;
            backend.close()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "type": handle.file_type,
                    "name": handle.name,
                    "size": info.size
                }),
            );
        }

        Commands::Rm { name, file_type } => {
            let backend = config.backend.open()?;
            backend.remove(&Handle::new(*file_type, name.clone()))?;
            backend.close()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "name": name
                }),
            );
        }

        Commands::Ls { file_type } => {
            let backend = config.backend.open()?;
            let names = backend.list(*file_type)?;
            backend.close()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "type": file_type,
                    "count": names.len(),
                    "names": names
                }),
            );
        }

        Commands::Check => {
            let report = suite(&config.backend)
                .with_config(config.bench.clone())
                .run_conformance()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "backend": report.backend,
                    "passed": report.passed
                }),
            );
        }

        Commands::Bench {
            scenario,
            iterations,
            blob_length,
            window_length,
            window_offset,
            seed,
        } => {
            let mut bench = config.bench.clone();
            if let Some(len) = blob_length {
                bench.blob_length = *len;
            }
            if let Some(len) = window_length {
                bench.window_length = *len;
            }
            if let Some(offset) = window_offset {
                bench.window_offset = *offset;
            }
            if let Some(seed) = seed {
                bench.seed = *seed;
            }
            if let Some(n) = iterations {
                bench.iterations = *n;
            }
            bench.validate()?;
            let iterations = bench.iterations;

            let scenarios = if scenario.is_empty() {
                Scenario::ALL.to_vec()
            } else {
                scenario.clone()
            };

            let suite = suite(&config.backend).with_config(bench);
            let reports = scenarios
                .into_iter()
                .map(|sc| suite.run(sc, iterations))
                .collect::<blobkit::Result<Vec<_>>>()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "count": reports.len(),
                    "reports": reports
                }),
            );
        }
    }

    Ok(())
}

fn suite(backend: &BackendConfig) -> Suite<Box<dyn Backend>> {
    let backend = backend.clone();
    Suite::new(move || backend.open())
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", value);
        }
        OutputFormat::Text => {
            println!("{:#}", value);
        }
    }
}
