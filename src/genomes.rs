//! Genome discovery and pair enumeration

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Sequence file extensions recognized in a genome directory
pub const GENOME_EXTENSIONS: &[&str] = &["fna", "fa", "fasta"];

/// A reference genome and the query aligned against it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomePair {
    pub reference: PathBuf,
    pub query: PathBuf,
}

impl GenomePair {
    pub fn new(reference: impl Into<PathBuf>, query: impl Into<PathBuf>) -> Self {
        GenomePair {
            reference: reference.into(),
            query: query.into(),
        }
    }

    pub fn reference_name(&self) -> String {
        file_label(&self.reference)
    }

    pub fn query_name(&self) -> String {
        file_label(&self.query)
    }
}

impl fmt::Display for GenomePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.reference_name(), self.query_name())
    }
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Whether `path` looks like a (possibly compressed) sequence file
pub fn is_genome_file(path: &Path) -> bool {
    let name = file_label(path);
    let name = name
        .strip_suffix(".gz")
        .or_else(|| name.strip_suffix(".bgz"))
        .unwrap_or(&name);
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| GENOME_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Sequence files directly inside `dir`, sorted by file name
pub fn discover_genomes(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read genome directory: {}", dir.display()))?;

    let mut genomes = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_genome_file(&path) {
            genomes.push(path);
        }
    }
    genomes.sort_by_key(|p| file_label(p));
    Ok(genomes)
}

/// Every unordered pair once, the earlier genome acting as reference
pub fn all_pairs(genomes: &[PathBuf]) -> Vec<GenomePair> {
    let mut pairs = Vec::new();
    for (i, reference) in genomes.iter().enumerate() {
        for query in &genomes[i + 1..] {
            pairs.push(GenomePair::new(reference.clone(), query.clone()));
        }
    }
    pairs
}
