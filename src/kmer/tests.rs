//! K-mer Module Tests
//!
//! ## Test Scopes
//! - **Codec**: Parsing, rendering and packing of k-mers and records.
//! - **Graph step**: `shifted` / `next_kmer` agree with plain string manipulation.
//! - **Reader**: Per-rank blocks cover the input file exactly once.

#[cfg(test)]
mod tests {
    use crate::kmer::reader::rank_block;
    use crate::kmer::types::{Extension, Kmer, KmerPair, Nucleotide, ParseError};
    use crate::kmer::{kmer_size, line_count, read_kmers};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn kmer_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    // ============================================================
    // CODEC
    // ============================================================

    #[test]
    fn test_kmer_display_matches_input() {
        let text = "ACGTTGCAACGTTGCAACGTTGCAACGTTGCAACGTTGCA"; // 40 bases, two words
        let kmer: Kmer = text.parse().unwrap();

        assert_eq!(kmer.len(), 40);
        assert_eq!(kmer.to_string(), text);
    }

    #[test]
    fn test_kmer_rejects_invalid_input() {
        assert!(matches!("".parse::<Kmer>(), Err(ParseError::EmptyKmer)));
        assert!(matches!(
            "ACNT".parse::<Kmer>(),
            Err(ParseError::InvalidBase('N'))
        ));
    }

    #[test]
    fn test_kmer_lowercase_is_normalised() {
        let upper: Kmer = "ACGT".parse().unwrap();
        let lower: Kmer = "acgt".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.hash64(), lower.hash64());
    }

    #[test]
    fn test_hash_is_deterministic_and_key_dependent() {
        let a: Kmer = "AATCG".parse().unwrap();
        let b: Kmer = "AATCG".parse().unwrap();
        let c: Kmer = "AATCC".parse().unwrap();

        assert_eq!(a.hash64(), b.hash64());
        assert_ne!(a.hash64(), c.hash64());
    }

    #[test]
    fn test_hash_value_is_pinned() {
        // Slot placement must agree between separately built ranks.
        let kmer: Kmer = "ACGT".parse().unwrap();
        assert_eq!(kmer.hash64(), 0x1bd8_40cb_f354_88dc);
    }

    #[test]
    fn test_hash_distinguishes_length() {
        // "A" and "AA" pack to the same word; the length must still separate them.
        let short: Kmer = "A".parse().unwrap();
        let long: Kmer = "AA".parse().unwrap();
        assert_ne!(short, long);
        assert_ne!(short.hash64(), long.hash64());
    }

    #[test]
    fn test_record_parse_and_display() {
        let pair: KmerPair = "AAT FC".parse().unwrap();

        assert_eq!(pair.kmer.to_string(), "AAT");
        assert_eq!(pair.backward, Extension::Fence);
        assert_eq!(pair.forward, Extension::Base(Nucleotide::C));
        assert!(pair.is_start());
        assert!(!pair.is_end());
        assert_eq!(pair.to_string(), "AAT FC");
    }

    #[test]
    fn test_record_rejects_malformed_lines() {
        assert!(matches!(
            "AAT".parse::<KmerPair>(),
            Err(ParseError::MalformedRecord(_))
        ));
        assert!(matches!(
            "AAT FCG".parse::<KmerPair>(),
            Err(ParseError::MalformedRecord(_))
        ));
        assert!(matches!(
            "AAT FX".parse::<KmerPair>(),
            Err(ParseError::InvalidExtension('X'))
        ));
    }

    // ============================================================
    // GRAPH STEP
    // ============================================================

    #[test]
    fn test_shifted_matches_string_shift() {
        let text = "GATTACAGATTACAGATTACAGATTACAGATTACA";
        let kmer: Kmer = text.parse().unwrap();

        let next = kmer.shifted(Nucleotide::G);
        let expected = format!("{}G", &text[1..]);

        assert_eq!(next.to_string(), expected);
        assert_eq!(next, expected.parse().unwrap());
    }

    #[test]
    fn test_next_kmer_follows_forward_extension() {
        let pair: KmerPair = "ATC AG".parse().unwrap();
        assert_eq!(pair.next_kmer().unwrap().to_string(), "TCG");

        let end: KmerPair = "TCG TF".parse().unwrap();
        assert!(end.is_end());
        assert!(end.next_kmer().is_none());
    }

    // ============================================================
    // READER
    // ============================================================

    #[test]
    fn test_rank_blocks_cover_every_record_once() {
        for total in [0usize, 1, 7, 100] {
            for rank_n in 1..6 {
                let mut covered = vec![0; total];
                for rank in 0..rank_n {
                    for idx in rank_block(total, rank_n, rank) {
                        covered[idx] += 1;
                    }
                }
                assert!(covered.iter().all(|&c| c == 1), "total={total} ranks={rank_n}");
            }
        }
    }

    #[test]
    fn test_read_kmers_splits_file_between_ranks() {
        let file = kmer_file(&["AAT FC", "ATC AG", "", "TCG TF", "GGA FA", "GAC GF"]);

        assert_eq!(kmer_size(file.path()).unwrap(), 3);
        assert_eq!(line_count(file.path()).unwrap(), 5);

        let mut all = Vec::new();
        for rank in 0..2 {
            all.extend(read_kmers(file.path(), 3, 2, rank).unwrap());
        }

        let rendered: Vec<String> = all.iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered, vec!["AAT FC", "ATC AG", "TCG TF", "GGA FA", "GAC GF"]);
    }

    #[test]
    fn test_read_kmers_rejects_length_mismatch() {
        let file = kmer_file(&["AAT FC", "ATCG AG"]);

        let err = read_kmers(file.path(), 3, 1, 0).unwrap_err();
        assert!(matches!(
            err,
            ParseError::LengthMismatch {
                line: 2,
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_read_kmers_reports_line_of_bad_record() {
        let file = kmer_file(&["AAT FC", "ANC AG"]);

        let err = read_kmers(file.path(), 3, 1, 0).unwrap_err();
        assert!(matches!(err, ParseError::Line { line: 2, .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_kmer_size_of_empty_file() {
        let file = kmer_file(&[]);
        assert!(matches!(
            kmer_size(file.path()),
            Err(ParseError::EmptyFile { .. })
        ));
    }
}
