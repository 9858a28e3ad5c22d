/// Error handling tests for malformed and invalid inputs
///
/// Checks that bad alignment text, bad coordinates and unreadable files are
/// reported with the right error category instead of being folded silently.
use alnbench::error::BenchError;
use alnbench::identity::IdentityProfile;
use alnbench::sequence_length::sequence_length;
use alnbench::tabular::{open_tabular, parse_output, TabularFormat};
use std::fs;
use std::io::Write;
use tempfile::TempDir;

fn fold(format: TabularFormat, text: &str, len: usize) -> Result<IdentityProfile, BenchError> {
    IdentityProfile::fold(parse_output(format, text), len)
}

/// Short lines in lastz output are informational and carry no record
#[test]
fn test_short_extended_line_is_skipped() {
    let text = "\
# lastz comment line
q1 chr1 90.0 4 0
q1 chr1 90.0 4 0 0 1 4 3 6 1e-20 50
";
    let profile = fold(TabularFormat::Extended, text, 10).unwrap();
    assert_eq!(profile.records(), 1);
    assert_eq!(profile.covered_bases(), 4);
}

#[test]
fn test_non_numeric_identity_is_parse_error() {
    let text = "q1\tchr1\tninety\t100\t1\t100\t3\t6\t1e-50\t200\n";
    match fold(TabularFormat::Standard, text, 10) {
        Err(BenchError::Parse { line, field, value }) => {
            assert_eq!(line, 1);
            assert_eq!(field, "percent identity");
            assert_eq!(value, "ninety");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_truncated_standard_line_is_missing_field() {
    let text = "q1\tchr1\t90.0\t100\t1\t100\t3\t6\t1e-50\t200\nq1\tchr1\t90.0\t100\n";
    let err = fold(TabularFormat::Standard, text, 10).unwrap_err();
    assert!(matches!(err, BenchError::MissingField { line: 2, .. }), "{err}");
    assert_eq!(err.kind(), "parse");
}

#[test]
fn test_nan_identity_and_zero_coordinate_rejected() {
    let nan = "q1\tchr1\tnan\t100\t1\t100\t3\t6\t1e-50\t200\n";
    assert_eq!(fold(TabularFormat::Standard, nan, 10).unwrap_err().kind(), "parse");

    let zero = "q1 chr1 90.0 4 0 0 1 4 0 6 1e-20 50\n";
    assert_eq!(fold(TabularFormat::Extended, zero, 10).unwrap_err().kind(), "parse");
}

#[test]
fn test_record_past_reference_end() {
    let text = "q1\tchr1\t90.0\t100\t1\t100\t8\t12\t1e-50\t200\n";
    match fold(TabularFormat::Standard, text, 10) {
        Err(BenchError::Range {
            start,
            end,
            reference_length,
        }) => {
            assert_eq!((start, end, reference_length), (7, 12, 10));
        }
        other => panic!("expected range error, got {other:?}"),
    }
}

/// Parsing stops at the first bad line even when later lines are fine
#[test]
fn test_first_error_wins() {
    let text = "\
q1\tchr1\t90.0\t100\t1\t100\t1\t2\t0\t1
q1\tchr1\tbad\t100\t1\t100\t1\t2\t0\t1
q1\tchr1\t90.0\t100\t1\t100\t1\t20\t0\t1
";
    let err = fold(TabularFormat::Standard, text, 10).unwrap_err();
    assert!(matches!(err, BenchError::Parse { line: 2, .. }));
}

#[test]
fn test_missing_files_are_io_errors() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.fna");
    assert_eq!(sequence_length(&missing).unwrap_err().kind(), "io");
    assert!(open_tabular(TabularFormat::Standard, &missing).is_err());
}

#[test]
fn test_compressed_inputs() {
    let dir = TempDir::new().unwrap();

    let reference = dir.path().join("ref.fna.gz");
    let mut writer = noodles::bgzf::io::writer::Writer::new(fs::File::create(&reference).unwrap());
    writer.write_all(b">chr1\nACGTACGTAC\n>chr2\nACGTA\n").unwrap();
    writer.finish().unwrap();
    assert_eq!(sequence_length(&reference).unwrap(), 15);

    let hits = dir.path().join("hits.tsv.bgz");
    let mut writer = noodles::bgzf::io::writer::Writer::new(fs::File::create(&hits).unwrap());
    writer
        .write_all(b"q1\tchr1\t80.0\t100\t1\t100\t15\t11\t1e-50\t200\n")
        .unwrap();
    writer.finish().unwrap();

    let profile = IdentityProfile::fold(open_tabular(TabularFormat::Standard, &hits).unwrap(), 15)
        .unwrap();
    assert_eq!(profile.covered_bases(), 5);
    assert_eq!(profile.identity()[10], 80.0);
    assert_eq!(profile.identity()[9], 0.0);
}

/// NCBI ships genomes as plain (not blocked) gzip
#[test]
fn test_plain_gzip_reference_length() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let dir = TempDir::new().unwrap();
    let reference = dir.path().join("GCF_000005845.2_genomic.fna.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&reference).unwrap(), Compression::default());
    encoder.write_all(b">NC_000913.3\nACGTACGTAC\nACGTA\n").unwrap();
    encoder.finish().unwrap();
    assert_eq!(sequence_length(&reference).unwrap(), 15);
}
