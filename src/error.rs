//! Error taxonomy shared by the parsing, folding, comparison and invocation stages.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// A sequence or alignment file could not be opened or read.
    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read alignment stream")]
    Stream(#[from] io::Error),

    /// An external aligner exited with a non-zero status.
    #[error("Command `{command}` failed with exit status {}: {}", format_code(.code), .stderr.trim())]
    ExternalTool {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command `{command}` exceeded the time limit of {}s", .limit.as_secs_f64())]
    Timeout { command: String, limit: Duration },

    #[error("Could not run command `{command}`")]
    Process {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Line {line}: invalid {field} '{value}'")]
    Parse {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: missing {field} field")]
    MissingField { line: usize, field: &'static str },

    #[error("Cannot compare identity vectors of different lengths ({left} vs {right})")]
    ShapeMismatch { left: usize, right: usize },

    /// Normalized record coordinates fall outside the reference.
    #[error(
        "Alignment interval [{start}, {end}) lies outside the reference of length {reference_length}; \
         the alignment output does not belong to this reference"
    )]
    Range {
        start: u64,
        end: u64,
        reference_length: usize,
    },
}

impl BenchError {
    /// Short category label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::Io { .. } | BenchError::Stream(_) => "io",
            BenchError::ExternalTool { .. } => "external-tool",
            BenchError::Timeout { .. } => "timeout",
            BenchError::Process { .. } => "process",
            BenchError::Parse { .. } | BenchError::MissingField { .. } => "parse",
            BenchError::ShapeMismatch { .. } => "shape-mismatch",
            BenchError::Range { .. } => "range",
        }
    }
}

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
