//! Strata CLI — maintenance commands for the execution-graph cache.
//!
//! Provides `strata stats` for a summary of the cache contents,
//! `strata verify` to decode every entry and report corruption, and
//! `strata gc` to remove unreferenced entry files.

#![warn(missing_docs)]

mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use strata_cache::GraphCache;
use strata_common::Interner;

use crate::config::{load_config, StrataConfig};

/// Strata — execution-graph cache maintenance.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata build-graph cache tool")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Cache directory (overrides the configuration file).
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Path to a custom `strata.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a summary of the cache contents.
    Stats,
    /// Decode every cached graph and report corrupt entries.
    Verify,
    /// Remove entry files not referenced by the manifest.
    Gc,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(message) => {
            eprintln!("error: {message}");
            process::exit(2);
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<i32, String> {
    let cache_dir = resolve_cache_dir(cli)?;
    let cache = GraphCache::load_or_create(&cache_dir, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Stats => {
            run_stats(&cache, cli.quiet);
            Ok(0)
        }
        Command::Verify => Ok(run_verify(&cache, cli.quiet)),
        Command::Gc => run_gc(&cache, cli.quiet),
    }
}

/// Picks the cache directory: flag, then config file, then default.
fn resolve_cache_dir(cli: &Cli) -> Result<PathBuf, String> {
    if let Some(dir) = &cli.cache_dir {
        return Ok(dir.clone());
    }

    let config = match &cli.config {
        Some(path) => load_config(path).map_err(|e| e.to_string())?,
        None => {
            let default_path = PathBuf::from("strata.toml");
            if default_path.exists() {
                load_config(&default_path).map_err(|e| e.to_string())?
            } else {
                StrataConfig::default()
            }
        }
    };
    Ok(config.cache.dir)
}

fn run_stats(cache: &GraphCache, quiet: bool) {
    let manifest = cache.manifest();
    let total_nodes: u64 = manifest.entries.values().map(|e| e.node_count).sum();

    println!("entries: {}", manifest.entries.len());
    println!("nodes:   {total_nodes}");
    if quiet {
        return;
    }

    let mut keys: Vec<&String> = manifest.entries.keys().collect();
    keys.sort();
    for key in keys {
        let meta = &manifest.entries[key];
        println!("  {key}  nodes={}  checksum={}", meta.node_count, meta.checksum);
    }
}

fn run_verify(cache: &GraphCache, quiet: bool) -> i32 {
    let interner = Interner::new();
    let mut keys: Vec<String> = cache.manifest().entries.keys().cloned().collect();
    keys.sort();

    let mut corrupt = 0usize;
    for key in &keys {
        match cache.load_graph(key, &interner) {
            Some(nodes) => {
                if !quiet {
                    println!("ok       {key} ({} nodes)", nodes.len());
                }
            }
            None => {
                corrupt += 1;
                println!("corrupt  {key}");
            }
        }
    }

    if corrupt > 0 {
        println!("{corrupt} of {} entries corrupt", keys.len());
        1
    } else {
        if !quiet {
            println!("all {} entries ok", keys.len());
        }
        0
    }
}

fn run_gc(cache: &GraphCache, quiet: bool) -> Result<i32, String> {
    let removed = cache.gc().map_err(|e| e.to_string())?;
    if !quiet {
        println!("removed {removed} stale files");
    }
    Ok(0)
}
