//! Command lines for the two aligners under comparison
//!
//! The exhaustive aligner searches a query genome against a nucleotide
//! database built from the reference and reports the standard tabular layout.
//! The heuristic aligner reads both genomes directly and reports the extended
//! tabular layout.

use crate::invoke::ToolCommand;
use crate::params::ParameterConfiguration;
use crate::tabular::TabularFormat;
use std::path::{Path, PathBuf};

/// Output columns requested from the exhaustive aligner
pub const EXHAUSTIVE_OUTFMT: &str =
    "6 qseqid sseqid pident length qstart qend sstart send evalue bitscore";

/// Exhaustive aligner settings
#[derive(Debug, Clone)]
pub struct ExhaustiveAligner {
    pub program: PathBuf,
    pub makedb_program: PathBuf,
    pub evalue: String,
    pub threads: usize,
}

impl Default for ExhaustiveAligner {
    fn default() -> Self {
        ExhaustiveAligner {
            program: PathBuf::from("blastn"),
            makedb_program: PathBuf::from("makeblastdb"),
            evalue: "1e-10".to_string(),
            threads: 4,
        }
    }
}

impl ExhaustiveAligner {
    pub const FORMAT: TabularFormat = TabularFormat::Standard;

    /// Build a nucleotide database from `reference` at `database`
    pub fn makedb_command(&self, reference: &Path, database: &Path) -> ToolCommand {
        ToolCommand::new(&self.makedb_program)
            .arg("-in")
            .arg(reference.to_string_lossy())
            .args(["-dbtype", "nucl", "-out"])
            .arg(database.to_string_lossy())
    }

    pub fn search_command(&self, query: &Path, database: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("-query")
            .arg(query.to_string_lossy())
            .arg("-db")
            .arg(database.to_string_lossy())
            .args(["-outfmt", EXHAUSTIVE_OUTFMT, "-task", "blastn", "-evalue"])
            .arg(self.evalue.as_str())
            .arg("-num_threads")
            .arg(self.threads.to_string())
    }
}

/// Heuristic aligner settings
#[derive(Debug, Clone)]
pub struct HeuristicAligner {
    pub program: PathBuf,
}

impl Default for HeuristicAligner {
    fn default() -> Self {
        HeuristicAligner {
            program: PathBuf::from("lastz"),
        }
    }
}

impl HeuristicAligner {
    pub const FORMAT: TabularFormat = TabularFormat::Extended;

    /// Align `query` to `reference` with the normalized configuration
    pub fn command(
        &self,
        reference: &Path,
        query: &Path,
        config: &ParameterConfiguration,
    ) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg(reference.to_string_lossy())
            .arg(query.to_string_lossy())
            .args(config.normalize().to_args())
            .arg("--format=BLASTN")
    }
}

/// Both aligners, as configured for one benchmark
#[derive(Debug, Clone, Default)]
pub struct AlignerSet {
    pub exhaustive: ExhaustiveAligner,
    pub heuristic: HeuristicAligner,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_makedb_command() {
        let cmd = ExhaustiveAligner::default()
            .makedb_command(Path::new("ref.fna"), Path::new("/tmp/db/ref"));
        assert_eq!(
            cmd.args,
            vec!["-in", "ref.fna", "-dbtype", "nucl", "-out", "/tmp/db/ref"]
        );
        assert_eq!(cmd.program, PathBuf::from("makeblastdb"));
    }

    #[test]
    fn test_search_command() {
        let aligner = ExhaustiveAligner {
            threads: 8,
            ..Default::default()
        };
        let cmd = aligner.search_command(Path::new("q.fna"), Path::new("db"));
        assert_eq!(
            cmd.args,
            vec![
                "-query",
                "q.fna",
                "-db",
                "db",
                "-outfmt",
                EXHAUSTIVE_OUTFMT,
                "-task",
                "blastn",
                "-evalue",
                "1e-10",
                "-num_threads",
                "8",
            ]
        );
    }

    #[test]
    fn test_heuristic_command_normalizes_configuration() {
        let config = ParameterConfiguration::new("gapped")
            .with_flag("gapped")
            .with_flag("chain");
        let cmd = HeuristicAligner::default().command(
            Path::new("ref.fna"),
            Path::new("query.fna"),
            &config,
        );
        assert_eq!(
            cmd.to_string(),
            "lastz ref.fna query.fna --gapped --chain --ambiguous=iupac --format=BLASTN"
        );
    }
}
