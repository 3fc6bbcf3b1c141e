use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;

use blockpress::api::{self, Envelope};
use blockpress::block::ParallelLayout;
use blockpress::container;
use blockpress::parallel::{ParallelOptions, DEFAULT_BLOCK_SIZE};
use blockpress::registry::{self, AlgorithmCategory, AlgorithmInfo};

#[derive(Parser)]
#[command(name = "blockpress", version, about = "Multi-algorithm compressor with a block-parallel mode")]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a container
    Compress {
        /// Algorithm name or numeric id (see list-algorithms)
        #[arg(short, long)]
        algo: String,
        /// Split into blocks and compress them on a worker pool
        #[arg(short, long)]
        parallel: bool,
        /// Block size in KiB for --parallel
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE / 1024)]
        block_size: usize,
        /// Worker threads for --parallel (0 = one per core)
        #[arg(short = 'j', long, default_value_t = 0)]
        threads: usize,
        input:  PathBuf,
        output: PathBuf,
    },
    /// Decompress a container; parallel envelopes also need --algo
    Decompress {
        #[arg(short, long)]
        algo: Option<String>,
        #[arg(short = 'j', long, default_value_t = 0)]
        threads: usize,
        input:  PathBuf,
        output: PathBuf,
    },
    /// Show the registered algorithms
    ListAlgorithms {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Only show one category: entropy, dictionary, transform, hybrid
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the envelope header and block table of a compressed file
    Inspect {
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {

        // ── Compress ─────────────────────────────────────────────────────────
        Commands::Compress { algo, parallel, block_size, threads, input, output } => {
            let id = registry::resolve(&algo)?;
            if parallel {
                let options = ParallelOptions::default()
                    .with_block_size(block_size.saturating_mul(1024))
                    .with_threads(threads);
                api::compress_file_parallel(&input, &output, id, options)?;
            } else {
                api::compress_file(&input, &output, id)?;
            }
            let before = fs::metadata(&input)?.len();
            let after  = fs::metadata(&output)?.len();
            info!("{id}: {before} -> {after} bytes");
            println!("Compressed {} -> {} ({id}, {before} -> {after} bytes)", input.display(), output.display());
        }

        // ── Decompress ───────────────────────────────────────────────────────
        Commands::Decompress { algo, threads, input, output } => {
            let id = algo.as_deref().map(registry::resolve).transpose()?;
            let data = fs::read(&input)?;
            let out = api::decompress_auto(&data, id, threads)?;
            fs::write(&output, &out)?;
            println!("Decompressed {} -> {} ({} bytes)", input.display(), output.display(), out.len());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::ListAlgorithms { json, category } => {
            let filter = match category {
                Some(c) => Some(AlgorithmCategory::from_name(&c)
                    .ok_or_else(|| format!("unknown category '{c}'"))?),
                None => None,
            };
            let algos: Vec<&AlgorithmInfo> = registry::list_with_metadata()
                .iter()
                .filter(|a| filter.map_or(true, |c| a.category == c))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&algos)?);
            } else {
                println!("{:<4} {:<10} {:<11} Description", "Id", "Name", "Category");
                for a in algos {
                    println!("{:<4} {:<10} {:<11} {}", a.id.as_byte(), a.name, a.category.as_str(), a.description);
                }
            }
        }

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { input } => {
            let data = fs::read(&input)?;
            match Envelope::detect(&data) {
                Some(Envelope::Single) => {
                    let (header, payload) = container::peek_header(&data)?;
                    println!("── Single container ─────────────────────────────────");
                    println!("  Path           {}", input.display());
                    println!("  Algorithm      {} (id {})", header.algorithm, header.algorithm.as_byte());
                    println!("  Original size  {} B", header.original_size);
                    println!("  Payload size   {} B", payload.len());
                }
                Some(Envelope::Parallel) => {
                    let layout = ParallelLayout::parse(&data)?;
                    println!("── Parallel envelope ────────────────────────────────");
                    println!("  Path           {}", input.display());
                    println!("  Original size  {} B", layout.header.total_original_size);
                    println!("  Blocks         {}", layout.header.block_count);
                    println!("{:>8} {:>12} {:>12} {:>12}", "Block", "Offset", "Original", "Compressed");
                    for (i, b) in layout.blocks.iter().enumerate() {
                        println!("{:>8} {:>12} {:>12} {:>12}",
                            i, b.payload.start, b.header.original_size, b.header.compressed_size);
                    }
                }
                None if data.is_empty() => println!("{}: empty file", input.display()),
                None => return Err(format!("{}: not a blockpress file", input.display()).into()),
            }
        }
    }
    Ok(())
}
