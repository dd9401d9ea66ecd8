mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use arbor_query::QueryEngine;
use arbor_store::{
    BackendConfig, FileStore, SetOptions, SqliteStore, StoreError, Version, VersionStore,
    open_store,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "arbor", about = "Versioned hierarchical configuration store")]
struct Cli {
    /// Config file (YAML). Falls back to $ARBOR_CONFIG, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and print the effective configuration
    Config,
    /// Create the storage layout for the configured backend
    Migrate,
    /// List every stored path (persistent backends)
    Ls,
    /// Check stored data integrity (persistent backends)
    Verify,
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that go through the store contract, whichever backend is configured.
#[derive(Subcommand)]
enum StoreCommand {
    /// Print the first value of a path
    Get {
        path: String,
        /// Read this version instead of the current one
        #[arg(short = 'n', long = "version")]
        version: Option<Version>,
    },
    /// Print every value of a path
    GetMany {
        path: String,
        /// Read this version instead of the current one
        #[arg(short = 'n', long = "version")]
        version: Option<Version>,
    },
    /// Write one value as a new version
    Set {
        path: String,
        value: String,
        /// Do not promote the new version to current
        #[arg(short, long)]
        keep_current: bool,
    },
    /// Write several values as one new version
    SetMany {
        path: String,
        values: Vec<String>,
        /// Do not promote the new version to current
        #[arg(short, long)]
        keep_current: bool,
    },
    /// Print version metadata of a path
    Metadata { path: String },
    /// Run a nested query and print the result tree
    Query {
        /// Query text, e.g. '{ service { hosts port } }'
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,
        /// Read the query from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print the selections a query resolves to, without reading values
    Plan { text: String },
}

/// Backends that keep data beyond the process and can list or check it.
enum PersistentStore {
    File(FileStore),
    Sqlite(SqliteStore),
}

impl PersistentStore {
    fn open(backend: &BackendConfig) -> anyhow::Result<Self> {
        match backend {
            BackendConfig::File { root } => FileStore::open(root)
                .map(Self::File)
                .with_context(|| format!("failed to open store at {}", root.display())),
            BackendConfig::Sqlite { path } => SqliteStore::open(path)
                .map(Self::Sqlite)
                .with_context(|| format!("failed to open database {}", path.display())),
            BackendConfig::Memory => bail!("this command needs a persistent backend"),
        }
    }

    fn paths(&self) -> Result<Vec<String>, StoreError> {
        match self {
            Self::File(store) => store.paths(),
            Self::Sqlite(store) => store.paths(),
        }
    }

    fn verify_integrity(&self) -> Result<(), StoreError> {
        match self {
            Self::File(store) => store.verify_integrity(),
            Self::Sqlite(store) => store.verify_integrity(),
        }
    }
}

#[derive(Serialize)]
struct ValueOutput {
    value: String,
}

#[derive(Serialize)]
struct ValuesOutput {
    values: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;

    let filter = if cli.verbose {
        "debug"
    } else {
        config.logs.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }
        Commands::Migrate => migrate(&config.backend)?,
        Commands::Ls => {
            for path in PersistentStore::open(&config.backend)?.paths()? {
                println!("{path}");
            }
        }
        Commands::Verify => {
            PersistentStore::open(&config.backend)?
                .verify_integrity()
                .context("integrity check failed")?;
            println!("OK");
        }
        Commands::Store(command) => {
            let store = open_store(&config.backend).context("failed to open store")?;
            let result = run(command, &store);
            store.close()?;
            result?;
        }
    }

    Ok(())
}

fn run(command: StoreCommand, store: &Arc<dyn VersionStore>) -> anyhow::Result<()> {
    match command {
        StoreCommand::Get { path, version } => {
            let value = match version {
                Some(version) => store.get(&path, version)?,
                None => store.get_current(&path)?,
            };
            print_json(&ValueOutput { value })
        }
        StoreCommand::GetMany { path, version } => {
            let values = match version {
                Some(version) => store.get_many(&path, version)?,
                None => store.get_many_current(&path)?,
            };
            print_json(&ValuesOutput { values })
        }
        StoreCommand::Set {
            path,
            value,
            keep_current,
        } => {
            let meta = store.set(&path, &value, SetOptions { keep_current })?;
            tracing::info!(path = %path, version = meta.latest_version, "wrote value");
            print_json(&meta)
        }
        StoreCommand::SetMany {
            path,
            values,
            keep_current,
        } => {
            let meta = store.set_many(&path, &values, SetOptions { keep_current })?;
            tracing::info!(
                path = %path,
                version = meta.latest_version,
                count = values.len(),
                "wrote values"
            );
            print_json(&meta)
        }
        StoreCommand::Metadata { path } => print_json(&store.metadata(&path)?),
        StoreCommand::Query { text, file } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => read_query(&file)?,
                (None, None) => bail!("a query text or --file is required"),
            };
            let tree = QueryEngine::new(store.clone()).query(&text)?;
            print_json(&tree)
        }
        StoreCommand::Plan { text } => {
            let selections = QueryEngine::new(store.clone()).plan(&text)?;
            print_json(&selections)
        }
    }
}

fn migrate(backend: &BackendConfig) -> anyhow::Result<()> {
    match backend {
        BackendConfig::Memory => {
            tracing::info!("in-memory backend has no storage layout");
            println!("nothing to migrate for the memory backend");
        }
        BackendConfig::File { root } => {
            tracing::info!(root = %root.display(), "creating store layout");
            let store = FileStore::open(root)
                .with_context(|| format!("failed to initialize store at {}", root.display()))?;
            println!(
                "store ready at {} (schema v{})",
                store.root().display(),
                store.meta().schema_version
            );
        }
        BackendConfig::Sqlite { path } => {
            tracing::info!(db = %path.display(), "creating tables");
            SqliteStore::open(path)
                .with_context(|| format!("failed to initialize database {}", path.display()))?;
            println!("database ready at {}", path.display());
        }
    }
    Ok(())
}

fn read_query(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file)
        .with_context(|| format!("failed to read query from {}", file.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
