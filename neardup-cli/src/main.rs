//! neardup: find near-duplicate documents in a directory of JSON files.

mod error;
mod loader;
mod report;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use neardup_core::config::{CliOverrides, NeardupConfig, StorageBackend, VerifyMode};
use neardup_core::errors::{NeardupErrorCode, StorageError};
use neardup_core::tracing::{init_tracing, setup::init_tracing_with};
use neardup_core::traits::PersistenceAdapter;
use neardup_engine::{DedupOutcome, DedupPipeline};
use neardup_storage::{MemoryStore, SqliteStore};

use crate::error::CliError;
use crate::loader::JsonDirLoader;

/// neardup builds a MinHash/LSH index over a directory of JSON documents
/// and reports groups of near-duplicates.
///
/// Typical workflow:
///   1. Index a corpus with `neardup build data/`.
///   2. Check new documents against it with `neardup query incoming/`.
#[derive(Parser)]
#[command(name = "neardup", version, about = "Near-duplicate document detection with MinHash and LSH")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log filter directive, overrides NEARDUP_LOG (e.g. "neardup_engine=debug")
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign every document, persist signatures and buckets, report duplicates.
    Build {
        #[command(flatten)]
        run: RunArgs,

        /// Clear the index before building
        #[arg(long)]
        fresh: bool,
    },

    /// Compare documents against a built index without writing to it.
    Query {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Directory of JSON documents, one object per file
    data_dir: PathBuf,

    /// SQLite index path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep the index in memory (pair with --snapshot to persist it)
    #[arg(long)]
    memory: bool,

    /// Portable snapshot file: written after build, read when the index is unavailable
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Jaccard threshold for a duplicate
    #[arg(long)]
    threshold: Option<f64>,

    /// MinHash signature length
    #[arg(long)]
    num_perm: Option<usize>,

    /// Signature worker threads (0 = available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Stop after this many documents
    #[arg(long)]
    max_docs: Option<usize>,

    /// Verify candidates with exact Jaccard instead of the signature estimate
    #[arg(long)]
    exact: bool,

    /// Print the text of every duplicate group
    #[arg(long)]
    display: bool,

    /// Write duplicate groups as newline-delimited JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "duplicates.json.nl")]
    export: Option<PathBuf>,

    /// Characters of text shown per document with --display
    #[arg(long, default_value_t = 250)]
    print_width: usize,

    /// Print the full outcome as JSON instead of the text summary
    #[arg(long)]
    json: bool,

    /// Directory holding neardup.toml
    #[arg(long, default_value = ".")]
    config_root: PathBuf,
}

impl RunArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            threshold: self.threshold,
            num_perm: self.num_perm,
            workers: self.workers,
            max_docs: self.max_docs,
            verify_mode: self.exact.then_some(VerifyMode::Exact),
            storage_backend: self.memory.then_some(StorageBackend::Memory),
            storage_path: self.db.clone(),
            snapshot_path: self.snapshot.clone(),
        }
    }
}

/// The index a run works against.
enum IndexStore {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl IndexStore {
    fn adapter(&self) -> &dyn PersistenceAdapter {
        match self {
            Self::Sqlite(s) => s,
            Self::Memory(m) => m,
        }
    }

    fn for_build(config: &NeardupConfig) -> Result<Self, StorageError> {
        match config.storage.effective_backend() {
            StorageBackend::Sqlite => Ok(Self::Sqlite(SqliteStore::open(
                &config.storage.effective_path(),
            )?)),
            StorageBackend::Memory => {
                // an in-memory build extends the previous snapshot, if any
                let store = MemoryStore::new();
                if let Some(path) = config.storage.snapshot_path.as_deref() {
                    if path.exists() {
                        store.load_snapshot(path)?;
                    }
                }
                Ok(Self::Memory(store))
            }
        }
    }

    /// SQLite when reachable, otherwise the snapshot loaded into memory.
    fn for_query(config: &NeardupConfig) -> Result<Self, StorageError> {
        let snapshot = config.storage.snapshot_path.as_deref();
        if config.storage.effective_backend() == StorageBackend::Memory {
            return match snapshot {
                Some(path) => Ok(Self::Memory(MemoryStore::from_snapshot(path)?)),
                None => Err(StorageError::Unavailable {
                    message: "an in-memory query needs --snapshot".to_string(),
                }),
            };
        }

        let path = config.storage.effective_path();
        match SqliteStore::open_existing(&path) {
            Ok(store) => Ok(Self::Sqlite(store)),
            Err(StorageError::Unavailable { message }) => match snapshot {
                Some(snap) => {
                    tracing::warn!(
                        db = %path.display(),
                        snapshot = %snap.display(),
                        reason = %message,
                        "index unavailable, falling back to snapshot"
                    );
                    Ok(Self::Memory(MemoryStore::from_snapshot(snap)?))
                }
                None => Err(StorageError::Unavailable { message }),
            },
            Err(e) => Err(e),
        }
    }

    fn finish(&self) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(s) => s.checkpoint(),
            Self::Memory(_) => Ok(()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.log_level.as_deref() {
        Some(directive) => init_tracing_with(directive),
        None => init_tracing(),
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.coded_string());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Build { run, fresh } => {
            let config = NeardupConfig::load(&run.config_root, Some(&run.overrides()))?;
            let pipeline = DedupPipeline::from_config(&config)?;
            let loader = JsonDirLoader::open(&run.data_dir, &config.ingest)?;

            let store = IndexStore::for_build(&config)?;
            if fresh {
                store.adapter().clear()?;
                tracing::info!("cleared index before build");
            }
            let outcome = pipeline.build(store.adapter(), loader.documents())?;
            if let Some(path) = config.storage.snapshot_path.as_deref() {
                store.adapter().snapshot(path)?;
            }
            store.finish()?;
            report(&run, &loader, &outcome)
        }
        Command::Query { run } => {
            let config = NeardupConfig::load(&run.config_root, Some(&run.overrides()))?;
            let pipeline = DedupPipeline::from_config(&config)?;
            let loader = JsonDirLoader::open(&run.data_dir, &config.ingest)?;

            let store = IndexStore::for_query(&config)?;
            let outcome = pipeline.query(store.adapter(), loader.documents())?;
            report(&run, &loader, &outcome)
        }
    }
}

fn report(run: &RunArgs, loader: &JsonDirLoader, outcome: &DedupOutcome) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = if run.json {
        serde_json::to_writer_pretty(&mut out, outcome)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(out))
    } else {
        report::print_summary(&mut out, &outcome.summary)
    };
    written.map_err(|e| output_error(Path::new("<stdout>"), e))?;

    if run.display {
        // a second pass over the directory; only group members are kept
        let texts = report::group_texts(&outcome.report, loader.documents().flatten());
        report::display_groups(&mut out, &outcome.report, &texts, run.print_width)
            .map_err(|e| output_error(Path::new("<stdout>"), e))?;
    }
    if let Some(path) = run.export.as_deref() {
        report::export_groups(path, &outcome.report).map_err(|e| output_error(path, e))?;
    }
    Ok(())
}

fn output_error(path: &Path, e: io::Error) -> CliError {
    CliError::Output {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
