//! Reference length resolution
//!
//! The identity vector of a reference is sized by the total number of bases in
//! its sequence file. Header lines (`>`) are excluded, every other line counts
//! with trailing whitespace removed.

use crate::error::BenchError;
use crate::input::open_input;
use log::debug;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Total base count of every record in a sequence file
pub fn sequence_length<P: AsRef<Path>>(path: P) -> Result<usize, BenchError> {
    let path = path.as_ref();
    let reader = open_input(path)?;
    let total = count_bases(reader).map_err(|source| BenchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("[length] {}: {} bp", path.display(), total);
    Ok(total)
}

/// Count non-header characters of a sequence stream
pub fn count_bases<R: BufRead>(reader: R) -> std::io::Result<usize> {
    let mut total = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            continue;
        }
        total += line.trim_end().len();
    }
    Ok(total)
}

/// Reference lengths keyed by path, computed once and read many times
#[derive(Debug, Default)]
pub struct LengthCache {
    lengths: RwLock<HashMap<PathBuf, usize>>,
}

impl LengthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of `path`, resolving it on first use
    pub fn get_or_resolve(&self, path: &Path) -> Result<usize, BenchError> {
        if let Some(&len) = self.read_guard().get(path) {
            return Ok(len);
        }

        let len = sequence_length(path)?;
        let mut lengths = match self.lengths.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A concurrent resolver may have won; both computed the same value.
        Ok(*lengths.entry(path.to_path_buf()).or_insert(len))
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, usize>> {
        match self.lengths.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_count_bases_skips_headers() {
        let fasta = ">chr1 description\nACGT\nACG\n>chr2\nNNNNN\n";
        assert_eq!(count_bases(fasta.as_bytes()).unwrap(), 12);
    }

    #[test]
    fn test_trailing_whitespace_and_crlf() {
        let fasta = ">chr1\r\nACGT  \r\nAC\t\n\n";
        assert_eq!(count_bases(fasta.as_bytes()).unwrap(), 6);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(count_bases("".as_bytes()).unwrap(), 0);
        assert_eq!(count_bases(">only_header\n".as_bytes()).unwrap(), 0);
    }

    #[test]
    fn test_sequence_length_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, ">seq\nACGTACGTAC\nACGTA\n").unwrap();
        assert_eq!(sequence_length(file.path()).unwrap(), 15);
    }

    #[test]
    fn test_missing_file() {
        let err = sequence_length("/nonexistent/alnbench/ref.fna").unwrap_err();
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_cache_resolves_once() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, ">seq\nACGT\n").unwrap();

        let cache = LengthCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_resolve(file.path()).unwrap(), 4);

        // Later reads come from the cache even if the file changes
        std::fs::write(file.path(), ">seq\nACGTACGT\n").unwrap();
        assert_eq!(cache.get_or_resolve(file.path()).unwrap(), 4);
        assert_eq!(cache.len(), 1);
    }
}
