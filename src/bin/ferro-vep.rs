// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-vep CLI
//!
//! Command-line interface for cached variant annotation.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, Local, Timelike};
use clap::{Parser, Subcommand};
use ferro_vep::cache::AnnotationCache;
use ferro_vep::config::VepConfig;
use ferro_vep::gateway::{ReqwestTransport, RetryPolicy, RetryingGateway};
use ferro_vep::liftover::LiftoverClient;
use ferro_vep::pipeline::{run_batch, AnnotationPipeline, BatchOptions, RunOutcome};
use ferro_vep::region::{classify, classify_key, classify_query, classify_structural};
use ferro_vep::table::{delimiter_for_path, VariantTable, WriteOptions};
use ferro_vep::variant::VariantKey;
use ferro_vep::{AnnotationExtractor, VepError};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ferro-vep")]
#[command(author, version, about = "Cached variant annotation against a remote VEP service")]
#[command(
    long_about = "Annotate GRCh37 variant tables through a remote VEP service, lifting each
variant to GRCh38 and caching every response so reruns only query new variants.

Examples:
  ferro-vep annotate -i variants.tsv -o annotated.csv
  ferro-vep annotate -i variants.tsv --gene-regions genes.tsv --transcripts tx.tsv
  ferro-vep classify 3 319780 GA G
  ferro-vep classify --query 'rs699'
  ferro-vep lift 17 41244936 G A
  ferro-vep cache stats"
)]
struct Cli {
    /// Log filter, e.g. 'info' or 'ferro_vep=debug'
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Configuration file (default: .ferro-vep.toml, then ~/.config/ferro/vep.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate every row of a variant table
    Annotate {
        /// Input table with CHROM, POS, REF and ALT columns (may be gzipped)
        #[arg(short, long)]
        input: PathBuf,

        /// Output table (default: <input>.vep.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Annotation cache file
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Gene-region TSV (chrom, start, end, exon, gene-info)
        #[arg(long)]
        gene_regions: Option<PathBuf>,

        /// Transcript TSV (gene, transcript-id, refseq-id)
        #[arg(long)]
        transcripts: Option<PathBuf>,

        /// Rows between partial output snapshots
        #[arg(long)]
        checkpoint: Option<usize>,

        /// Output delimiter
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Show the region notation for a variant or free-text query
    Classify {
        /// Chromosome
        #[arg(required_unless_present = "query")]
        chrom: Option<String>,

        /// VCF position
        #[arg(required_unless_present = "query")]
        pos: Option<u64>,

        /// Reference allele
        #[arg(required_unless_present = "query")]
        reference: Option<String>,

        /// Alternate allele
        #[arg(required_unless_present = "query")]
        alternate: Option<String>,

        /// END coordinate for a symbolic <DUP> or <DEL> allele
        #[arg(long)]
        end: Option<u64>,

        /// Pseudo-VCF line, rsID or HGVS expression
        #[arg(short, long, conflicts_with_all = ["chrom", "pos", "reference", "alternate"])]
        query: Option<String>,
    },

    /// Lift a GRCh37 variant to GRCh38 through the mapping service
    Lift {
        /// Chromosome
        chrom: String,
        /// VCF position on GRCh37
        pos: u64,
        /// Reference allele
        reference: String,
        /// Alternate allele
        alternate: String,
        /// END coordinate for a symbolic <DUP> or <DEL> allele
        #[arg(long)]
        end: Option<u64>,
    },

    /// Inspect the annotation cache
    Cache {
        /// Cache file
        #[arg(long)]
        path: Option<PathBuf>,

        #[command(subcommand)]
        action: CacheAction,
    },

    /// Write a configuration file with every setting at its default
    Config {
        /// Destination
        #[arg(short, long, default_value = ".ferro-vep.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry count and size
    Stats,
    /// Print the cached payload and extracted fields for a variant
    Show {
        chrom: String,
        pos: u64,
        reference: String,
        alternate: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_dir.as_deref())?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Annotate {
            input,
            output,
            cache,
            gene_regions,
            transcripts,
            checkpoint,
            delimiter,
            no_progress,
        } => {
            let mut config = config;
            if let Some(path) = cache {
                config.cache.path = path;
            }
            if gene_regions.is_some() {
                config.lookup.gene_regions = gene_regions;
            }
            if transcripts.is_some() {
                config.lookup.transcripts = transcripts;
            }
            if let Some(interval) = checkpoint {
                config.output.checkpoint_interval = interval;
            }
            if let Some(delimiter) = delimiter {
                config.output.delimiter = delimiter;
            }
            config.validate()?;
            let output = output.unwrap_or_else(|| default_output(&input));
            run_annotate(&config, &input, &output, !no_progress)
        }
        Commands::Classify {
            chrom,
            pos,
            reference,
            alternate,
            end,
            query,
        } => run_classify(chrom, pos, reference, alternate, end, query),
        Commands::Lift {
            chrom,
            pos,
            reference,
            alternate,
            end,
        } => run_lift(&config, &chrom, pos, &reference, &alternate, end),
        Commands::Cache { path, action } => {
            let path = path.unwrap_or_else(|| config.cache.path.clone());
            run_cache(&config, &path, action)
        }
        Commands::Config { output, force } => {
            if output.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                )
                .into());
            }
            VepConfig::default().to_file(&output)?;
            println!("Wrote {}", output.display());
            Ok(())
        }
    }
}

fn init_tracing(level: &str, log_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(log_file_name());
            let file = File::create(&path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Per-run log file name, e.g. `2025-3-7-14-5-9.log`
fn log_file_name() -> String {
    let now = Local::now();
    format!(
        "{}-{}-{}-{}-{}-{}.log",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

fn load_config(path: Option<&Path>) -> Result<VepConfig, VepError> {
    match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            VepConfig::from_file(path)
        }
        None => VepConfig::load(),
    }
}

/// `dir/variants.tsv.gz` -> `dir/variants.vep.tsv`
fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let output = match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}.vep.{}", stem, ext),
        None => format!("{}.vep.csv", name),
    };
    input.with_file_name(output)
}

fn transport(config: &VepConfig) -> Result<Arc<ReqwestTransport>, VepError> {
    let timeout = Duration::from_secs(config.endpoints.timeout_seconds);
    Ok(Arc::new(ReqwestTransport::new(
        timeout,
        &config.endpoints.user_agent,
    )?))
}

fn run_annotate(
    config: &VepConfig,
    input: &Path,
    output: &Path,
    show_progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut table = VariantTable::read(input, delimiter_for_path(input))?;
    info!("Read {} variants from {}", table.len(), input.display());

    let mut cache = AnnotationCache::load(&config.cache.path)?;
    let mut pipeline =
        AnnotationPipeline::new(&mut cache, transport(config)?, config).with_lookups(&config.lookup)?;
    if config.lookup.gene_regions.is_none() {
        warn!("No gene-region file configured; requests will not be pinned to a transcript");
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = Arc::clone(&interrupt);
        ctrlc::set_handler(move || {
            interrupt.store(true, Ordering::SeqCst);
        })?;
    }

    let options = BatchOptions {
        checkpoint_interval: config.output.checkpoint_interval,
        output: Some(output.to_path_buf()),
        write_options: WriteOptions {
            delimiter: config.output.delimiter_byte()?,
            uppercase_columns: config.output.uppercase_columns,
        },
    };

    let pb = if show_progress {
        let pb = ProgressBar::new(table.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
                .progress_chars("##-"),
        );
        Some(pb)
    } else {
        None
    };

    let summary = run_batch(&mut pipeline, &mut table, &options, &interrupt, |progress| {
        if let Some(ref pb) = pb {
            pb.set_position(progress.processed as u64);
            pb.set_message(format!(
                "{} cached, {} fetched, {} skipped",
                progress.cache_hits, progress.fetched, progress.skipped
            ));
        }
    });
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    println!(
        "{}: {} of {} variants in {:.1}s ({} cached, {} fetched, {} skipped) -> {}",
        summary.outcome.as_str(),
        summary.processed,
        summary.total,
        summary.elapsed.as_secs_f64(),
        summary.cache_hits,
        summary.fetched,
        summary.skipped_total(),
        output.display()
    );

    match summary.outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Interrupted => Err("Interrupted; partial output written".into()),
        RunOutcome::Failed(e) => Err(e.detailed_message().into()),
    }
}

fn run_classify(
    chrom: Option<String>,
    pos: Option<u64>,
    reference: Option<String>,
    alternate: Option<String>,
    end: Option<u64>,
    query: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let region = match (query, chrom, pos, reference, alternate) {
        (Some(query), ..) => classify_query(&query)?,
        (None, Some(chrom), Some(pos), Some(reference), Some(alternate)) => match end {
            Some(end) => classify_structural(&chrom, pos, end, &alternate)?,
            None => classify(&chrom, pos, &reference, &alternate)?,
        },
        _ => return Err("Provide CHROM POS REF ALT or --query".into()),
    };
    println!("{}\t{}", region.kind.as_str(), region.value);
    Ok(())
}

fn run_lift(
    config: &VepConfig,
    chrom: &str,
    pos: u64,
    reference: &str,
    alternate: &str,
    end: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = RetryingGateway::new(transport(config)?, RetryPolicy::from(&config.retry));
    let client = LiftoverClient::new(
        gateway,
        &config.endpoints.liftover_url,
        &config.endpoints.species,
    );

    let key = VariantKey::new(chrom, pos, reference, alternate).with_end(end);
    let grch37 = classify_key(&key)?;
    let lifted = client.try_lift(&grch37, &key)?;
    println!("GRCh37\t{}", grch37.value);
    println!("GRCh38\t{}\tPOS={}", lifted.region.value, lifted.pos);
    Ok(())
}

fn run_cache(
    config: &VepConfig,
    path: &Path,
    action: CacheAction,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No cache at {}", path.display()).into());
    }
    let cache = AnnotationCache::load(path)?;

    match action {
        CacheAction::Stats => {
            let bytes = fs::metadata(path)?.len();
            println!("Cache: {}", path.display());
            println!("Entries: {}", cache.len());
            println!("Size: {} bytes", bytes);
        }
        CacheAction::Show {
            chrom,
            pos,
            reference,
            alternate,
        } => {
            let key = VariantKey::new(&chrom, pos, &reference, &alternate);
            let Some(payload) = cache.get(&key) else {
                return Err(format!("'{}' is not cached", key.signature()).into());
            };
            let extractor = AnnotationExtractor::new(config.extraction.clone())
                .with_clinical_field(config.output.clinical_significance_column.clone());
            let record = extractor.annotate(payload, &key.alternate);

            println!("{}", serde_json::to_string_pretty(payload)?);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}
