//! K-mer File Reader
//!
//! Input files hold one record per line, `<KMER> <B><F>`, where `B` and `F` are the
//! backward and forward extensions. Blank lines are ignored.
//!
//! Each rank reads a contiguous block of records so that the blocks of all ranks
//! together cover the file exactly once.

use super::types::{KmerPair, ParseError};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::Path;

fn open(path: &Path) -> Result<BufReader<File>, ParseError> {
    Ok(BufReader::new(File::open(path)?))
}

fn parse_line(line: &str, line_no: usize) -> Result<KmerPair, ParseError> {
    line.parse::<KmerPair>().map_err(|e| ParseError::Line {
        line: line_no,
        source: Box::new(e),
    })
}

/// Length of the k-mers in `path`, taken from its first record.
pub fn kmer_size(path: &Path) -> Result<usize, ParseError> {
    for (idx, line) in open(path)?.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        return Ok(parse_line(&line, idx + 1)?.kmer.len());
    }

    Err(ParseError::EmptyFile {
        path: path.to_path_buf(),
    })
}

/// Number of records (non-blank lines) in `path`.
pub fn line_count(path: &Path) -> Result<usize, ParseError> {
    let mut count = 0;
    for line in open(path)?.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Record indices `[n*r/R, n*(r+1)/R)` owned by `rank_me`.
pub(crate) fn rank_block(total: usize, rank_n: usize, rank_me: usize) -> Range<usize> {
    let start = total * rank_me / rank_n;
    let end = total * (rank_me + 1) / rank_n;
    start..end
}

/// Reads the block of records belonging to `rank_me` out of `rank_n` ranks.
///
/// Every record in the block must have a k-mer of exactly `kmer_len` bases.
pub fn read_kmers(
    path: &Path,
    kmer_len: usize,
    rank_n: usize,
    rank_me: usize,
) -> Result<Vec<KmerPair>, ParseError> {
    let total = line_count(path)?;
    let block = rank_block(total, rank_n.max(1), rank_me);
    let mut kmers = Vec::with_capacity(block.len());

    let mut record_idx = 0;
    for (idx, line) in open(path)?.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if record_idx >= block.end {
            break;
        }
        if block.contains(&record_idx) {
            let pair = parse_line(&line, idx + 1)?;
            if pair.kmer.len() != kmer_len {
                return Err(ParseError::LengthMismatch {
                    line: idx + 1,
                    expected: kmer_len,
                    actual: pair.kmer.len(),
                });
            }
            kmers.push(pair);
        }
        record_idx += 1;
    }

    tracing::debug!(
        "Rank {} read records {}..{} of {}",
        rank_me,
        block.start,
        block.end,
        total
    );

    Ok(kmers)
}
