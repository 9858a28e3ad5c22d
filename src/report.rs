//! Human-readable and tab-separated renderings of benchmark results

use crate::compare::MetricSet;
use crate::runner::{BatchReport, ConfigSummary, PassCriteria, ProbeRun, RunFailure, RunRecord};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Columns of the per-combination TSV export
pub const TSV_HEADER: &[&str] = &[
    "configuration",
    "reference",
    "query",
    "status",
    "reference_length",
    "exhaustive_seconds",
    "heuristic_seconds",
    "speedup",
    "exhaustive_hits",
    "heuristic_hits",
    "coverage_exhaustive",
    "coverage_heuristic",
    "overlap_coverage",
    "agreement_pct",
    "mean_abs_diff",
    "correlation",
    "error",
];

pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Metric block shared by the benchmark and the offline comparison
pub fn write_metrics<W: Write>(out: &mut W, labels: (&str, &str), m: &MetricSet) -> Result<()> {
    writeln!(out, "Coverage:")?;
    writeln!(out, "  {:<10} {:>8.2}%", labels.0, m.coverage_a)?;
    writeln!(out, "  {:<10} {:>8.2}%", labels.1, m.coverage_b)?;
    writeln!(out, "  {:<10} {:>8.2}%", "Overlap", m.overlap_coverage)?;
    writeln!(out, "\nIdentity comparison (bases covered by both):")?;
    writeln!(out, "  Bases with same identity (±1%): {:.2}%", m.agreement_pct)?;
    writeln!(out, "  Mean absolute difference:       {:.2}%", m.mean_absolute_difference)?;
    writeln!(out, "  Correlation:                    {:.4}", m.pearson_correlation)?;
    Ok(())
}

pub fn write_record<W: Write>(out: &mut W, record: &RunRecord) -> Result<()> {
    writeln!(out, "\n{}", "=".repeat(60))?;
    writeln!(out, "{} | {}", record.configuration, record.pair)?;
    writeln!(
        out,
        "Reference length: {} bp",
        format_number(record.reference_length)
    )?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "Runtime:")?;
    writeln!(
        out,
        "  Exhaustive: {:.2}s ({} alignments)",
        record.exhaustive_seconds,
        format_number(record.exhaustive_hits)
    )?;
    writeln!(
        out,
        "  Heuristic:  {:.2}s ({} alignments)",
        record.heuristic_seconds,
        format_number(record.heuristic_hits)
    )?;
    writeln!(out, "  Speedup:    {:.2}x\n", record.speedup)?;
    write_metrics(out, ("Exhaustive", "Heuristic"), &record.metrics)
}

pub fn write_failures<W: Write>(out: &mut W, failures: &[RunFailure]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    writeln!(out, "\nFailed combinations ({}):", failures.len())?;
    writeln!(out, "{}", "-".repeat(60))?;
    for f in failures {
        writeln!(
            out,
            "{} | {} [{} / {}]: {}",
            f.configuration,
            f.pair,
            f.stage,
            f.error.kind(),
            f.error
        )?;
    }
    Ok(())
}

pub fn write_summary<W: Write>(
    out: &mut W,
    summaries: &[ConfigSummary],
    criteria: &PassCriteria,
) -> Result<()> {
    writeln!(out, "\n{}", "#".repeat(60))?;
    writeln!(out, "# SUMMARY")?;
    writeln!(out, "{}", "#".repeat(60))?;
    for s in summaries {
        writeln!(
            out,
            "{:15} | Similarity: {:6.2}% | Correlation: {:.4} | Overlap: {:6.2}% | Speedup: {:.2}x | {}/{} runs | {}",
            s.name,
            s.average_agreement,
            s.average_correlation,
            s.average_overlap,
            s.average_speedup,
            s.completed,
            s.completed + s.failed,
            if s.passed { "PASS" } else { "FAIL" }
        )?;
    }
    write!(out, "\nTarget: >= {}% similarity", criteria.min_agreement)?;
    if let Some(min) = criteria.min_overlap {
        write!(out, " and >= {min}% overlap")?;
    }
    writeln!(out)?;
    Ok(())
}

/// Heuristic-only table; failed runs keep their runtime and error text
pub fn write_probe<W: Write>(out: &mut W, probes: &[Result<ProbeRun, RunFailure>]) -> Result<()> {
    writeln!(out, "{:<30} | {:<10} | {:<10}", "Configuration", "Runtime", "Hits")?;
    writeln!(out, "{}", "-".repeat(60))?;
    for probe in probes {
        match probe {
            Ok(run) => match &run.outcome {
                Ok(hits) => writeln!(
                    out,
                    "{:<30} | {:>9.2}s | {:>10}",
                    run.configuration,
                    run.seconds,
                    format_number(*hits)
                )?,
                Err(error) => {
                    writeln!(
                        out,
                        "{:<30} | FAILED after {:.2}s",
                        run.configuration, run.seconds
                    )?;
                    writeln!(out, "    {}", single_line(&error.to_string()))?;
                }
            },
            Err(failure) => {
                writeln!(
                    out,
                    "{:<30} | FAILED ({} not usable)",
                    failure.configuration, failure.stage
                )?;
                writeln!(out, "    {}", single_line(&failure.error.to_string()))?;
            }
        }
    }
    Ok(())
}

fn single_line(message: &str) -> String {
    message.replace(['\t', '\n'], " ")
}

/// Print the full batch report to `out`
pub fn write_report<W: Write>(
    out: &mut W,
    report: &BatchReport,
    criteria: &PassCriteria,
) -> Result<()> {
    for record in &report.records {
        write_record(out, record)?;
    }
    write_failures(out, &report.failures)?;
    write_summary(out, &report.summaries, criteria)
}

/// One row per combination, successful or not
pub fn write_tsv<P: AsRef<Path>>(path: P, report: &BatchReport) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_tsv_rows(&mut out, report)?;
    out.flush()?;
    Ok(())
}

pub fn write_tsv_rows<W: Write>(out: &mut W, report: &BatchReport) -> Result<()> {
    writeln!(out, "{}", TSV_HEADER.join("\t"))?;
    for r in &report.records {
        let m = &r.metrics;
        writeln!(
            out,
            "{}\t{}\t{}\tok\t{}\t{:.3}\t{:.3}\t{:.3}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.6}\t",
            r.configuration,
            r.pair.reference_name(),
            r.pair.query_name(),
            r.reference_length,
            r.exhaustive_seconds,
            r.heuristic_seconds,
            r.speedup,
            r.exhaustive_hits,
            r.heuristic_hits,
            m.coverage_a,
            m.coverage_b,
            m.overlap_coverage,
            m.agreement_pct,
            m.mean_absolute_difference,
            m.pearson_correlation,
        )?;
    }
    for f in &report.failures {
        let empty = "\t".repeat(TSV_HEADER.len() - 4);
        let message = single_line(&f.error.to_string());
        writeln!(
            out,
            "{}\t{}\t{}\tfailed:{}{}{}",
            f.configuration,
            f.pair.reference_name(),
            f.pair.query_name(),
            f.stage,
            empty,
            message
        )?;
    }
    Ok(())
}
