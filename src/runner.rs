//! Benchmark orchestration
//!
//! For every (configuration, genome pair) combination both aligners are run
//! and timed, their outputs folded into identity profiles over the reference,
//! and the profiles compared. A failing combination is recorded and the batch
//! moves on; a reference that cannot be read or indexed fails every
//! combination that uses it.
//!
//! Genomes are prepared serially up front (compressed inputs decompressed into
//! the run directory, reference lengths and exhaustive databases), so the
//! combination loop only reads shared state and can run on a rayon pool.

use crate::aligners::{AlignerSet, ExhaustiveAligner, HeuristicAligner};
use crate::compare::{compare, MetricSet};
use crate::error::BenchError;
use crate::genomes::{file_label, GenomePair};
use crate::identity::IdentityProfile;
use crate::input::stage_plain;
use crate::invoke::{ToolCommand, ToolInvoker};
use crate::params::{collect_configurations, ParameterConfiguration};
use crate::sequence_length::LengthCache;
use crate::tabular::{parse_output, TabularFormat};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Minimum average agreement for a configuration to pass
pub const DEFAULT_MIN_AGREEMENT: f64 = 95.0;

/// Thresholds a configuration's averages must meet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassCriteria {
    pub min_agreement: f64,
    /// Optional floor on the average overlap coverage
    pub min_overlap: Option<f64>,
}

impl Default for PassCriteria {
    fn default() -> Self {
        PassCriteria {
            min_agreement: DEFAULT_MIN_AGREEMENT,
            min_overlap: None,
        }
    }
}

/// Everything the runner needs besides the invoker
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub aligners: AlignerSet,
    pub criteria: PassCriteria,
    /// Combinations run concurrently when greater than 1
    pub threads: usize,
    /// Parent directory for exhaustive databases (system temp dir if unset)
    pub tempdir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            aligners: AlignerSet::default(),
            criteria: PassCriteria::default(),
            threads: 1,
            tempdir: None,
        }
    }
}

/// Stage at which a combination failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Reference,
    Query,
    Exhaustive,
    Heuristic,
    Compare,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Reference => write!(f, "reference"),
            FailureStage::Query => write!(f, "query"),
            FailureStage::Exhaustive => write!(f, "exhaustive"),
            FailureStage::Heuristic => write!(f, "heuristic"),
            FailureStage::Compare => write!(f, "compare"),
        }
    }
}

/// Result of one successful combination
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub pair: GenomePair,
    pub configuration: String,
    pub reference_length: usize,
    pub exhaustive_seconds: f64,
    pub heuristic_seconds: f64,
    /// Exhaustive runtime over heuristic runtime
    pub speedup: f64,
    pub exhaustive_hits: usize,
    pub heuristic_hits: usize,
    /// Exhaustive profile as A, heuristic profile as B
    pub metrics: MetricSet,
}

/// One failed combination
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub pair: GenomePair,
    pub configuration: String,
    pub stage: FailureStage,
    /// Shared when one reference failure fails many combinations
    pub error: Arc<BenchError>,
}

/// Per-configuration averages over the successful combinations
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSummary {
    pub name: String,
    pub completed: usize,
    pub failed: usize,
    pub average_agreement: f64,
    pub average_correlation: f64,
    pub average_speedup: f64,
    pub average_overlap: f64,
    pub passed: bool,
}

/// Everything a batch produced, successes and failures alike
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub records: Vec<RunRecord>,
    pub failures: Vec<RunFailure>,
    pub summaries: Vec<ConfigSummary>,
}

impl BatchReport {
    pub fn all_passed(&self) -> bool {
        !self.summaries.is_empty() && self.summaries.iter().all(|s| s.passed)
    }
}

/// Heuristic-only timing of one configuration
#[derive(Debug, Clone)]
pub struct ProbeRun {
    pub configuration: String,
    /// Wall time until the aligner finished, failed or was killed
    pub seconds: f64,
    /// Alignment count, or why the run produced none
    pub outcome: std::result::Result<usize, Arc<BenchError>>,
}

impl ProbeRun {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// A timed aligner run folded into a profile
struct ToolRun {
    profile: IdentityProfile,
    seconds: f64,
}

#[derive(Debug, Clone)]
struct PreparedReference {
    length: usize,
    /// Uncompressed sequence handed to the aligners
    sequence: PathBuf,
    database: PathBuf,
}

type Preparation = Result<PreparedReference, Arc<BenchError>>;
type Staged = Result<PathBuf, Arc<BenchError>>;

pub struct BenchmarkRunner<'a, I: ToolInvoker> {
    invoker: &'a I,
    config: RunnerConfig,
    lengths: LengthCache,
}

impl<'a, I: ToolInvoker> BenchmarkRunner<'a, I> {
    pub fn new(invoker: &'a I, config: RunnerConfig) -> Self {
        BenchmarkRunner {
            invoker,
            config,
            lengths: LengthCache::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every configuration against every pair and summarize
    ///
    /// Configurations are keyed by name: when names repeat, the last
    /// definition wins and keeps the first one's position.
    pub fn run(
        &self,
        pairs: &[GenomePair],
        configs: &[ParameterConfiguration],
    ) -> Result<BatchReport> {
        let unique = collect_configurations(configs.iter().cloned());
        if unique.len() < configs.len() {
            warn!(
                "[bench] {} configurations repeat an earlier name; keeping the last definition of each",
                configs.len() - unique.len()
            );
        }
        let configs: Vec<ParameterConfiguration> = unique.into_values().collect();

        let workdir = self.workdir()?;
        let staged = self.stage_genomes(pairs, workdir.path());
        let prepared = self.prepare_references(pairs, &staged, workdir.path());

        let jobs: Vec<(&ParameterConfiguration, &GenomePair)> = configs
            .iter()
            .flat_map(|config| pairs.iter().map(move |pair| (config, pair)))
            .collect();

        info!(
            "[bench] Running {} combinations ({} configurations x {} pairs)",
            jobs.len(),
            configs.len(),
            pairs.len()
        );

        let run_job = |&(config, pair): &(&ParameterConfiguration, &GenomePair)| {
            self.run_prepared(
                pair,
                config,
                &prepared[&pair.reference],
                &staged[&pair.query],
            )
        };

        let outcomes: Vec<Result<RunRecord, RunFailure>> = if self.config.threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .context("Failed to build worker pool")?;
            pool.install(|| jobs.par_iter().map(run_job).collect())
        } else {
            jobs.iter().map(run_job).collect()
        };

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(record) => report.records.push(record),
                Err(failure) => report.failures.push(failure),
            }
        }
        report.summaries = summarize(
            &configs,
            &report.records,
            &report.failures,
            &self.config.criteria,
        );
        Ok(report)
    }

    /// Run a single combination (genomes prepared on the fly)
    pub fn run_one(
        &self,
        pair: &GenomePair,
        config: &ParameterConfiguration,
        workdir: &Path,
    ) -> Result<RunRecord, RunFailure> {
        let reference = self.stage(&pair.reference, 0, workdir);
        let query = self.stage(&pair.query, 1, workdir);
        let prepared = self.prepare_reference(&pair.reference, &reference, 0, workdir);
        self.run_prepared(pair, config, &prepared, &query)
    }

    /// Time the heuristic aligner alone under each configuration
    pub fn probe_heuristic(
        &self,
        pair: &GenomePair,
        configs: &[ParameterConfiguration],
    ) -> Vec<Result<ProbeRun, RunFailure>> {
        let workdir = match self.create_workdir() {
            Ok(dir) => dir,
            Err(source) => {
                let error = Arc::new(BenchError::Io {
                    path: self.config.tempdir.clone().unwrap_or_else(std::env::temp_dir),
                    source,
                });
                return configs
                    .iter()
                    .map(|config| Err(shared_failure(pair, config, FailureStage::Reference, &error)))
                    .collect();
            }
        };

        let staged = self
            .stage(&pair.reference, 0, workdir.path())
            .map_err(|e| (FailureStage::Reference, e))
            .and_then(|reference| {
                self.stage(&pair.query, 1, workdir.path())
                    .map(|query| (reference, query))
                    .map_err(|e| (FailureStage::Query, e))
            });

        configs
            .iter()
            .map(|config| match &staged {
                Ok((reference, query)) => Ok(self.probe_one(reference, query, config)),
                Err((stage, error)) => Err(shared_failure(pair, config, *stage, error)),
            })
            .collect()
    }

    fn probe_one(
        &self,
        reference: &Path,
        query: &Path,
        config: &ParameterConfiguration,
    ) -> ProbeRun {
        let command = self
            .config
            .aligners
            .heuristic
            .command(reference, query, config);
        debug!("[{}] Command: {}", command.name(), command);

        let started = Instant::now();
        let invocation = self.invoker.invoke(&command);
        let seconds = match &invocation {
            Ok(inv) => inv.elapsed.as_secs_f64(),
            Err(_) => started.elapsed().as_secs_f64(),
        };
        let outcome = invocation
            .and_then(|inv| inv.check(&command))
            .and_then(|inv| {
                Ok(parse_output(HeuristicAligner::FORMAT, &inv.stdout)
                    .collect::<Result<Vec<_>, _>>()?
                    .len())
            });

        match &outcome {
            Ok(hits) => info!(
                "[{}] {}: {:.2}s, {} alignments",
                command.name(),
                config.name(),
                seconds,
                hits
            ),
            Err(e) => warn!(
                "[{}] {} failed after {:.2}s: {}",
                command.name(),
                config.name(),
                seconds,
                e
            ),
        }

        ProbeRun {
            configuration: config.name().to_string(),
            seconds,
            outcome: outcome.map_err(Arc::new),
        }
    }

    fn create_workdir(&self) -> std::io::Result<TempDir> {
        match &self.config.tempdir {
            Some(dir) => tempfile::Builder::new().prefix("alnbench_").tempdir_in(dir),
            None => tempfile::Builder::new().prefix("alnbench_").tempdir(),
        }
    }

    fn workdir(&self) -> Result<TempDir> {
        self.create_workdir()
            .context("Failed to create working directory for staged genomes and databases")
    }

    /// Decompress a genome into its own slot under `workdir` when needed
    fn stage(&self, genome: &Path, index: usize, workdir: &Path) -> Staged {
        let slot = workdir.join("genomes").join(index.to_string());
        stage_plain(genome, &slot).map_err(|e| {
            warn!("[bench] Cannot stage {}: {}", file_label(genome), e);
            Arc::new(e)
        })
    }

    /// Every distinct genome of the batch, staged once
    fn stage_genomes(&self, pairs: &[GenomePair], workdir: &Path) -> HashMap<PathBuf, Staged> {
        let mut staged = HashMap::new();
        for genome in pairs.iter().flat_map(|p| [&p.reference, &p.query]) {
            if staged.contains_key(genome) {
                continue;
            }
            let index = staged.len();
            staged.insert(genome.clone(), self.stage(genome, index, workdir));
        }
        staged
    }

    fn prepare_references(
        &self,
        pairs: &[GenomePair],
        staged: &HashMap<PathBuf, Staged>,
        workdir: &Path,
    ) -> HashMap<PathBuf, Preparation> {
        let mut prepared = HashMap::new();
        for pair in pairs {
            if prepared.contains_key(&pair.reference) {
                continue;
            }
            let index = prepared.len();
            let preparation =
                self.prepare_reference(&pair.reference, &staged[&pair.reference], index, workdir);
            prepared.insert(pair.reference.clone(), preparation);
        }
        prepared
    }

    fn prepare_reference(
        &self,
        reference: &Path,
        staged: &Staged,
        index: usize,
        workdir: &Path,
    ) -> Preparation {
        let sequence = staged.clone()?;
        let result = self.lengths.get_or_resolve(&sequence).and_then(|length| {
            info!(
                "[bench] Reference {}: {} bp",
                file_label(reference),
                length
            );
            let stem = sequence
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "reference".to_string());
            let database = workdir.join(format!("{index}_{stem}"));
            let command = self
                .config
                .aligners
                .exhaustive
                .makedb_command(&sequence, &database);
            info!("[{}] Creating database for {}", command.name(), file_label(reference));
            self.execute(&command)?;
            Ok(PreparedReference {
                length,
                sequence: sequence.clone(),
                database,
            })
        });

        result.map_err(|e| {
            warn!(
                "[bench] Reference {} unusable, skipping its combinations: {}",
                file_label(reference),
                e
            );
            Arc::new(e)
        })
    }

    fn run_prepared(
        &self,
        pair: &GenomePair,
        config: &ParameterConfiguration,
        prepared: &Preparation,
        query: &Staged,
    ) -> Result<RunRecord, RunFailure> {
        let reference = prepared
            .as_ref()
            .map_err(|e| shared_failure(pair, config, FailureStage::Reference, e))?;
        let query = query
            .as_ref()
            .map_err(|e| shared_failure(pair, config, FailureStage::Query, e))?;

        info!("[bench] {}: {}", config.name(), pair);
        let outcome = self.run_combination(pair, config, reference, query);
        if let Err(failure) = &outcome {
            warn!(
                "[bench] {}: {} failed at {} stage: {}",
                config.name(),
                pair,
                failure.stage,
                failure.error
            );
        }
        outcome
    }

    fn run_combination(
        &self,
        pair: &GenomePair,
        config: &ParameterConfiguration,
        reference: &PreparedReference,
        query: &Path,
    ) -> Result<RunRecord, RunFailure> {
        let aligners = &self.config.aligners;

        let exhaustive = self
            .run_tool(
                &aligners.exhaustive.search_command(query, &reference.database),
                ExhaustiveAligner::FORMAT,
                reference.length,
            )
            .map_err(|e| failure(pair, config, FailureStage::Exhaustive, e))?;

        let heuristic = self
            .run_tool(
                &aligners.heuristic.command(&reference.sequence, query, config),
                HeuristicAligner::FORMAT,
                reference.length,
            )
            .map_err(|e| failure(pair, config, FailureStage::Heuristic, e))?;

        let metrics = compare(&exhaustive.profile, &heuristic.profile)
            .map_err(|e| failure(pair, config, FailureStage::Compare, e))?;

        Ok(RunRecord {
            pair: pair.clone(),
            configuration: config.name().to_string(),
            reference_length: reference.length,
            exhaustive_seconds: exhaustive.seconds,
            heuristic_seconds: heuristic.seconds,
            speedup: speedup(exhaustive.seconds, heuristic.seconds),
            exhaustive_hits: exhaustive.profile.records(),
            heuristic_hits: heuristic.profile.records(),
            metrics,
        })
    }

    fn run_tool(
        &self,
        command: &ToolCommand,
        format: TabularFormat,
        reference_length: usize,
    ) -> Result<ToolRun, BenchError> {
        let (stdout, seconds) = self.execute(command)?;
        let profile = IdentityProfile::fold(parse_output(format, &stdout), reference_length)?;
        info!(
            "[{}] Runtime: {:.2}s, {} alignments, {:.2}% coverage",
            command.name(),
            seconds,
            profile.records(),
            profile.coverage()
        );
        Ok(ToolRun { profile, seconds })
    }

    /// Invoke and require a zero exit status; returns stdout and seconds
    fn execute(&self, command: &ToolCommand) -> Result<(String, f64), BenchError> {
        debug!("[{}] Command: {}", command.name(), command);
        let invocation = self.invoker.invoke(command)?.check(command)?;
        let seconds = invocation.elapsed.as_secs_f64();
        Ok((invocation.stdout, seconds))
    }
}

fn failure(
    pair: &GenomePair,
    config: &ParameterConfiguration,
    stage: FailureStage,
    error: BenchError,
) -> RunFailure {
    RunFailure {
        pair: pair.clone(),
        configuration: config.name().to_string(),
        stage,
        error: Arc::new(error),
    }
}

/// Failure whose error is shared with other combinations
fn shared_failure(
    pair: &GenomePair,
    config: &ParameterConfiguration,
    stage: FailureStage,
    error: &Arc<BenchError>,
) -> RunFailure {
    RunFailure {
        pair: pair.clone(),
        configuration: config.name().to_string(),
        stage,
        error: Arc::clone(error),
    }
}

/// Exhaustive over heuristic runtime, 0 when the heuristic took no time
pub fn speedup(exhaustive_seconds: f64, heuristic_seconds: f64) -> f64 {
    if heuristic_seconds > 0.0 {
        exhaustive_seconds / heuristic_seconds
    } else {
        0.0
    }
}

/// Average each configuration's successful runs and apply the pass criteria
pub fn summarize(
    configs: &[ParameterConfiguration],
    records: &[RunRecord],
    failures: &[RunFailure],
    criteria: &PassCriteria,
) -> Vec<ConfigSummary> {
    configs
        .iter()
        .map(|config| {
            let name = config.name();
            let runs: Vec<&RunRecord> = records
                .iter()
                .filter(|r| r.configuration == name)
                .collect();
            let failed = failures.iter().filter(|f| f.configuration == name).count();

            let average_agreement = mean(runs.iter().map(|r| r.metrics.agreement_pct));
            let average_overlap = mean(runs.iter().map(|r| r.metrics.overlap_coverage));
            let passed = !runs.is_empty()
                && average_agreement >= criteria.min_agreement
                && criteria
                    .min_overlap
                    .map_or(true, |min| average_overlap >= min);

            ConfigSummary {
                name: name.to_string(),
                completed: runs.len(),
                failed,
                average_agreement,
                average_correlation: mean(runs.iter().map(|r| r.metrics.pearson_correlation)),
                average_speedup: mean(runs.iter().map(|r| r.speedup)),
                average_overlap,
                passed,
            }
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(config: &str, agreement: f64, correlation: f64, speedup: f64) -> RunRecord {
        RunRecord {
            pair: GenomePair::new("a.fna", "b.fna"),
            configuration: config.to_string(),
            reference_length: 100,
            exhaustive_seconds: 1.0,
            heuristic_seconds: 1.0,
            speedup,
            exhaustive_hits: 1,
            heuristic_hits: 1,
            metrics: MetricSet {
                agreement_pct: agreement,
                pearson_correlation: correlation,
                overlap_coverage: 70.0,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_speedup() {
        assert_eq!(speedup(20.0, 10.0), 2.0);
        assert_eq!(speedup(20.0, 0.0), 0.0);
    }

    #[test]
    fn test_summarize_averages_and_threshold() {
        let configs = vec![
            ParameterConfiguration::new("good"),
            ParameterConfiguration::new("bad"),
            ParameterConfiguration::new("empty"),
        ];
        let records = vec![
            record("good", 96.0, 0.9, 2.0),
            record("good", 98.0, 0.7, 4.0),
            record("bad", 90.0, 0.5, 10.0),
        ];
        let failures = vec![RunFailure {
            pair: GenomePair::new("a.fna", "c.fna"),
            configuration: "bad".to_string(),
            stage: FailureStage::Heuristic,
            error: Arc::new(BenchError::Timeout {
                command: "lastz".to_string(),
                limit: std::time::Duration::from_secs(1),
            }),
        }];

        let summaries = summarize(&configs, &records, &failures, &PassCriteria::default());
        assert_eq!(summaries.len(), 3);

        let good = &summaries[0];
        assert_eq!(good.completed, 2);
        assert_eq!(good.failed, 0);
        assert!((good.average_agreement - 97.0).abs() < 1e-12);
        assert!((good.average_correlation - 0.8).abs() < 1e-12);
        assert!((good.average_speedup - 3.0).abs() < 1e-12);
        assert!(good.passed);

        let bad = &summaries[1];
        assert_eq!((bad.completed, bad.failed), (1, 1));
        assert!(!bad.passed);

        let empty = &summaries[2];
        assert_eq!(empty.completed, 0);
        assert_eq!(empty.average_agreement, 0.0);
        assert!(!empty.passed);
    }

    #[test]
    fn test_overlap_criterion() {
        let configs = vec![ParameterConfiguration::new("good")];
        let records = vec![record("good", 99.0, 0.9, 2.0)];
        let strict = PassCriteria {
            min_overlap: Some(80.0),
            ..Default::default()
        };
        assert!(!summarize(&configs, &records, &[], &strict)[0].passed);

        let lenient = PassCriteria {
            min_overlap: Some(65.0),
            ..Default::default()
        };
        assert!(summarize(&configs, &records, &[], &lenient)[0].passed);
    }
}
