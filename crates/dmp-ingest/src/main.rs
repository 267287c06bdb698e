//! DMP Ingest - data source sync tool

use anyhow::{Context, Result};
use clap::Parser;
use dmp_common::config::SyncConfig;
use dmp_common::logging::{init_logging, LogConfig, LogLevel};
use dmp_common::types::{DataSource, SourceType};
use dmp_ingest::store::MemoryStore;
use dmp_ingest::sync::SyncManager;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "dmp-ingest")]
#[command(author, version, about = "DMP data source sync tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Sync a single uploaded file ad hoc
    File {
        /// Path to the file to ingest
        #[arg(short, long)]
        path: PathBuf,

        /// Source name used in measurements and reports
        #[arg(short, long, default_value = "ad-hoc")]
        source_name: String,

        /// Actor recorded in the audit trail (omit to skip auditing)
        #[arg(short, long)]
        actor: Option<String>,
    },

    /// Sync configured data sources from a JSON config file
    Sources {
        /// Path to a JSON file holding an array of data sources
        #[arg(short, long)]
        config: PathBuf,

        /// Sync all active sources (respects sync intervals)
        #[arg(long)]
        all: bool,

        /// Sync a specific source by name, regardless of interval
        #[arg(long)]
        source_name: Option<String>,

        /// Force sync regardless of sync interval
        #[arg(long)]
        force: bool,

        /// Actor recorded in the audit trail (omit to skip auditing)
        #[arg(short, long)]
        actor: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("dmp-ingest".to_string())
        .build();

    // Environment variables override the flag-derived settings, but
    // only the ones actually set
    let log_config = log_config.apply_env()?;

    init_logging(&log_config)?;

    match cli.command {
        Command::File {
            path,
            source_name,
            actor,
        } => sync_single_file(&path, &source_name, actor.as_deref()),
        Command::Sources {
            config,
            all,
            source_name,
            force,
            actor,
        } => sync_sources(&config, all, source_name.as_deref(), force, actor.as_deref()),
    }
}

/// Sync one file without any persisted source configuration.
fn sync_single_file(path: &Path, source_name: &str, actor: Option<&str>) -> Result<()> {
    let media_root = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let file_name = path
        .file_name()
        .context("Path has no file name")?
        .to_string_lossy()
        .into_owned();

    let source_type = match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
        Some(ext) if ext == "csv" => SourceType::Csv,
        _ => SourceType::File,
    };

    let manager = SyncManager::new(SyncConfig { media_root });
    let mut source = DataSource::new(source_name, source_type, file_name);
    let mut store = MemoryStore::new();

    let outcome = manager.sync_data_source(&mut source, &mut store, actor);

    info!(
        events = store.events().len(),
        data_points = store.data_points().len(),
        "Ad-hoc sync finished"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Sync sources from a JSON config file, writing updated sync
/// timestamps back to the same file.
fn sync_sources(
    config_path: &Path,
    all: bool,
    source_name: Option<&str>,
    force: bool,
    actor: Option<&str>,
) -> Result<()> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Could not read sources config: {}", config_path.display()))?;
    let mut sources: Vec<DataSource> =
        serde_json::from_str(&content).context("Sources config is not a JSON array of sources")?;

    let manager = SyncManager::new(SyncConfig::from_env()?);
    let mut store = MemoryStore::new();

    if let Some(name) = source_name {
        let source = sources
            .iter_mut()
            .find(|source| source.name == name)
            .with_context(|| format!("No data source named '{name}'"))?;

        // A named source syncs regardless of its interval
        let outcome = manager.sync_data_source(source, &mut store, actor);
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if all && force {
        // Force: ignore intervals, sync every active source
        for source in sources.iter_mut().filter(|source| source.is_active) {
            let outcome = manager.sync_data_source(source, &mut store, actor);
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    } else if all {
        let summary = manager.sync_all_active_sources(&mut sources, &mut store, actor);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        warn!("Nothing to do: pass --all or --source-name");
        return Ok(());
    }

    let updated = serde_json::to_string_pretty(&sources)?;
    std::fs::write(config_path, updated)
        .with_context(|| format!("Could not write back: {}", config_path.display()))?;

    Ok(())
}
