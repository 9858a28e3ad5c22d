use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use alnbench::aligners::{AlignerSet, ExhaustiveAligner, HeuristicAligner};
use alnbench::genomes::{all_pairs, discover_genomes, GenomePair};
use alnbench::invoke::ProcessInvoker;
use alnbench::params::{collect_configurations, ParameterConfiguration, DEFAULT_PRESETS};
use alnbench::report;
use alnbench::runner::{BenchmarkRunner, PassCriteria, RunnerConfig, DEFAULT_MIN_AGREEMENT};

/// alnbench - per-base identity benchmark of lastz against blastn
///
/// Runs both aligners on every pair of genomes, folds their hits into identity
/// profiles over the reference, and reports how closely the heuristic aligner
/// reproduces the exhaustive one under each parameter configuration.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Directory of genomes (.fna/.fa/.fasta, optionally .gz); every pair is aligned
    #[clap(value_name = "GENOME_DIR", required_unless_present_any = ["reference", "list_presets"])]
    genome_dir: Option<PathBuf>,

    /// Single reference genome (instead of GENOME_DIR)
    #[clap(long, requires = "query", conflicts_with = "genome_dir")]
    reference: Option<PathBuf>,

    /// Single query genome (instead of GENOME_DIR)
    #[clap(long, requires = "reference")]
    query: Option<PathBuf>,

    /// Heuristic configuration as NAME:key=value,flag,... (repeatable)
    #[clap(short = 'c', long = "config", value_name = "SPEC")]
    configs: Vec<ParameterConfiguration>,

    /// Built-in configuration by name (repeatable, see --list-presets)
    #[clap(short = 'p', long = "preset", value_name = "NAME")]
    presets: Vec<String>,

    /// Print the built-in configurations and exit
    #[clap(long = "list-presets")]
    list_presets: bool,

    /// Time the heuristic aligner alone on the first pair (no exhaustive runs)
    #[clap(long)]
    probe: bool,

    /// blastn binary
    #[clap(long, default_value = "blastn")]
    blastn: PathBuf,

    /// makeblastdb binary
    #[clap(long, default_value = "makeblastdb")]
    makeblastdb: PathBuf,

    /// lastz binary
    #[clap(long, default_value = "lastz")]
    lastz: PathBuf,

    /// E-value cutoff for the exhaustive search
    #[clap(long, default_value = "1e-10")]
    evalue: String,

    /// Threads given to each blastn search
    #[clap(long = "blast-threads", default_value = "4")]
    blast_threads: usize,

    /// Kill an aligner process after this many seconds
    #[clap(long, value_name = "SECONDS")]
    timeout: Option<f64>,

    /// Combinations run concurrently
    #[clap(short = 't', long = "threads", default_value = "1")]
    threads: usize,

    /// Minimum average agreement (%) for a configuration to pass
    #[clap(long = "min-agreement", default_value_t = DEFAULT_MIN_AGREEMENT)]
    min_agreement: f64,

    /// Minimum average overlap coverage (%) for a configuration to pass
    #[clap(long = "min-overlap")]
    min_overlap: Option<f64>,

    /// Directory for temporary blast databases and decompressed genomes
    #[clap(long)]
    tempdir: Option<PathBuf>,

    /// Write one TSV row per combination to this file
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Only warnings and errors on stderr
    #[clap(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.list_presets {
        for (name, description) in ParameterConfiguration::list_presets() {
            writeln!(out, "{name:<12} {description}")?;
        }
        return Ok(());
    }

    let configs = resolve_configurations(&args)?;
    let pairs = resolve_pairs(&args)?;
    if pairs.is_empty() {
        bail!("Need at least two genomes to form a pair");
    }

    let timeout = args.timeout.map(parse_timeout).transpose()?;
    if args.threads == 0 {
        bail!("--threads must be at least 1");
    }

    let config = RunnerConfig {
        aligners: AlignerSet {
            exhaustive: ExhaustiveAligner {
                program: args.blastn.clone(),
                makedb_program: args.makeblastdb.clone(),
                evalue: args.evalue.clone(),
                threads: args.blast_threads,
            },
            heuristic: HeuristicAligner {
                program: args.lastz.clone(),
            },
        },
        criteria: PassCriteria {
            min_agreement: args.min_agreement,
            min_overlap: args.min_overlap,
        },
        threads: args.threads,
        tempdir: args.tempdir.clone(),
    };

    let invoker = ProcessInvoker::new(timeout);
    let runner = BenchmarkRunner::new(&invoker, config);
    let start = Instant::now();

    if args.probe {
        let pair = &pairs[0];
        info!("[bench] Probing {} configurations on {}", configs.len(), pair);
        let probes = runner.probe_heuristic(pair, &configs);
        report::write_probe(&mut out, &probes)?;
        info!("[bench] Probe finished in {:.1}s", start.elapsed().as_secs_f64());
        return Ok(());
    }

    info!(
        "[bench] {} pairs, configurations: {}",
        pairs.len(),
        configs
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let batch = runner.run(&pairs, &configs)?;
    report::write_report(&mut out, &batch, &runner.config().criteria)?;
    out.flush()?;

    if let Some(path) = &args.output {
        report::write_tsv(path, &batch)?;
        info!("[bench] Wrote {}", path.display());
    }

    if !batch.failures.is_empty() {
        warn!(
            "[bench] {} of {} combinations failed",
            batch.failures.len(),
            batch.failures.len() + batch.records.len()
        );
    }
    info!("[bench] Finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Positive, representable number of seconds
fn parse_timeout(secs: f64) -> Result<Duration> {
    if secs <= 0.0 {
        bail!("Invalid timeout: {secs} (must be positive)");
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid timeout: {secs}"))
}

/// Presets first, then explicit configurations; a repeated name keeps the last definition
fn resolve_configurations(args: &Args) -> Result<Vec<ParameterConfiguration>> {
    let mut selected = Vec::new();

    let preset_names: Vec<&str> = if args.presets.is_empty() && args.configs.is_empty() {
        DEFAULT_PRESETS.to_vec()
    } else {
        args.presets.iter().map(String::as_str).collect()
    };
    for name in preset_names {
        let preset = ParameterConfiguration::preset(name)
            .with_context(|| format!("Unknown preset '{name}' (see --list-presets)"))?;
        selected.push(preset);
    }
    selected.extend(args.configs.iter().cloned());

    Ok(collect_configurations(selected).into_values().collect())
}

fn resolve_pairs(args: &Args) -> Result<Vec<GenomePair>> {
    if let (Some(reference), Some(query)) = (&args.reference, &args.query) {
        return Ok(vec![GenomePair::new(reference.clone(), query.clone())]);
    }

    let Some(dir) = &args.genome_dir else {
        bail!("Provide a genome directory or --reference and --query");
    };
    let genomes = discover_genomes(dir)?;
    info!("[bench] Found {} genomes in {}", genomes.len(), dir.display());
    Ok(all_pairs(&genomes))
}
