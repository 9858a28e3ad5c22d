use crate::error::BenchError;
use flate2::read::MultiGzDecoder;
use noodles::bgzf;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const GZ_BUF_SIZE: usize = 1 << 20;

/// Whether a path names a gzip or bgzip-compressed file, judged by extension
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false)
}

/// File name with any `.gz`/`.bgz` suffix removed
pub fn uncompressed_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match name.strip_suffix(".gz").or_else(|| name.strip_suffix(".bgz")) {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

/// BGZF blocks are gzip members whose extra field carries a `BC` subfield
fn is_bgzf(header: &[u8]) -> bool {
    header.len() >= 14
        && header[..4] == [0x1f, 0x8b, 0x08, 0x04]
        && header[12] == b'B'
        && header[13] == b'C'
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BenchError + '_ {
    move |source| BenchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Open a text file, transparently decompressing `.gz`/`.bgz` input
///
/// BGZF goes through noodles; any other gzip stream (plain or multi-member)
/// through flate2.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>, BenchError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_error(path))?;

    if !is_compressed(path) {
        return Ok(Box::new(BufReader::new(file)));
    }

    let mut reader = BufReader::new(file);
    let blocked = is_bgzf(reader.fill_buf().map_err(io_error(path))?);
    if blocked {
        Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(reader))))
    } else {
        Ok(Box::new(BufReader::with_capacity(
            GZ_BUF_SIZE,
            MultiGzDecoder::new(reader),
        )))
    }
}

/// Path the aligners can read: compressed files are decompressed into `dir`,
/// anything else is returned unchanged
pub fn stage_plain(path: &Path, dir: &Path) -> Result<PathBuf, BenchError> {
    if !is_compressed(path) {
        return Ok(path.to_path_buf());
    }

    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let target = dir.join(uncompressed_name(path));
    let mut reader = open_input(path)?;
    let file = File::create(&target).map_err(io_error(&target))?;
    let mut writer = BufWriter::new(file);
    io::copy(&mut reader, &mut writer).map_err(io_error(path))?;
    writer.flush().map_err(io_error(&target))?;
    Ok(target)
}
