/// alncompare - Compare two saved aligner outputs by per-base identity
///
/// Folds a standard tabular file (e.g. blastn -outfmt 6) and an extended
/// tabular file (e.g. lastz --format=BLASTN) into identity profiles over one
/// reference and prints coverage, agreement and correlation.
use alnbench::compare::compare;
use alnbench::identity::IdentityProfile;
use alnbench::report::write_metrics;
use alnbench::sequence_length::sequence_length;
use alnbench::tabular::{open_tabular, TabularFormat};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[clap(
    name = "alncompare",
    about = "Compare two aligner outputs by per-base identity over a reference"
)]
struct Args {
    /// Reference sequence (FASTA, optionally bgzip-compressed)
    reference: PathBuf,

    /// First alignment output
    first: PathBuf,

    /// Second alignment output
    second: PathBuf,

    /// Layout of the first file
    #[clap(long = "first-format", default_value = "standard")]
    first_format: TabularFormat,

    /// Layout of the second file
    #[clap(long = "second-format", default_value = "extended")]
    second_format: TabularFormat,

    /// Only warnings and errors on stderr
    #[clap(long)]
    quiet: bool,
}

fn load_profile(path: &Path, format: TabularFormat, length: usize) -> Result<IdentityProfile> {
    let reader = open_tabular(format, path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let profile = IdentityProfile::fold(reader, length)
        .with_context(|| format!("Failed to build identity profile from {}", path.display()))?;
    info!(
        "[alncompare] {}: {} alignments ({}), {:.2}% coverage",
        path.display(),
        profile.records(),
        format,
        profile.coverage()
    );
    Ok(profile)
}

fn label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let length = sequence_length(&args.reference)
        .with_context(|| format!("Failed to read reference {}", args.reference.display()))?;
    info!("[alncompare] Reference length: {length} bp");

    let first = load_profile(&args.first, args.first_format, length)?;
    let second = load_profile(&args.second, args.second_format, length)?;
    let metrics = compare(&first, &second)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let (first_label, second_label) = (label(&args.first), label(&args.second));
    write_metrics(&mut out, (first_label.as_str(), second_label.as_str()), &metrics)?;
    out.flush()?;
    Ok(())
}
