//! Pipeline Module Tests
//!
//! ## Test Scopes
//! - **Driver**: Whole runs over small k-mer files on in-process clusters, in both
//!   output modes.
//! - **Fatal Errors**: K-mer length mismatches and broken successor links abort the run.

#[cfg(test)]
mod tests {
    use crate::assembly::AssemblyError;
    use crate::cluster::local::LocalCluster;
    use crate::config::{AssemblyConfig, ConfigError, OutputMode};
    use crate::pipeline::driver::run_rank;
    use crate::pipeline::types::RankReport;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    /// Three contigs (AATCG, GGTAC, CCCAG) with one start record in each third of the
    /// file.
    const THREE_CONTIGS: &[&str] = &[
        "AAT FC", "GTA GC", "CAG AF", "ATC AG", "GGT FA", "CCA CG", "TCG TF", "TAC TF",
        "CCC FA",
    ];

    fn write_kmers(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    async fn run_cluster(ranks: usize, config: AssemblyConfig) -> Vec<anyhow::Result<RankReport>> {
        let config = Arc::new(config);
        let mut tasks = Vec::new();
        for transport in LocalCluster::spawn(ranks) {
            let config = config.clone();
            tasks.push(tokio::spawn(
                async move { run_rank(transport, &config).await },
            ));
        }

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }
        results
    }

    // ============================================================
    // DRIVER
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_three_ranks_write_test_output() {
        let input = write_kmers(THREE_CONTIGS);
        let out_dir = tempfile::tempdir().unwrap();
        let prefix = out_dir.path().join("test");

        let config = AssemblyConfig::new(input.path())
            .with_kmer_len(3)
            .with_output(OutputMode::Test {
                prefix: prefix.clone(),
            });
        let reports: Vec<RankReport> = run_cluster(3, config)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let expected = ["AATCG\n", "GGTAC\n", "CCCAG\n"];
        for (rank, report) in reports.iter().enumerate() {
            let path = out_dir.path().join(format!("test_{}.dat", rank));
            assert_eq!(report.output_file.as_deref(), Some(path.as_path()));
            assert_eq!(std::fs::read_to_string(&path).unwrap(), expected[rank]);

            assert_eq!(report.records_read, 3);
            assert_eq!(report.global_size, 18);
            assert_eq!(report.start_count, 1);
            assert_eq!(report.contig_count, 1);
            assert_eq!(report.truncated(), 0);
        }

        let occupied: usize = reports.iter().map(|r| r.local_occupancy).sum();
        assert_eq!(occupied, THREE_CONTIGS.len());
    }

    #[tokio::test]
    async fn test_single_rank_report_mode() {
        let input = write_kmers(THREE_CONTIGS);
        let config = AssemblyConfig::new(input.path());

        let mut results = run_cluster(1, config).await;
        let report = results.remove(0).unwrap();

        assert_eq!(report.kmer_len, 3);
        assert_eq!(report.records_read, 9);
        assert_eq!(report.contig_count, 3);
        assert_eq!(report.contig_records, 9);
        assert!(report.output_file.is_none());
        assert!(report.total_time >= report.insert_time);
    }

    #[tokio::test]
    async fn test_report_counts_truncated_contigs() {
        // TAC -> ACG -> CGT -> GTA -> TAC
        let input = write_kmers(&["TAC FG", "ACG TT", "CGT AA", "GTA CC"]);
        let config = AssemblyConfig::new(input.path());

        let report = run_cluster(1, config).await.remove(0).unwrap();

        assert_eq!(report.contig_count, 1);
        assert_eq!(report.contig_records, 4);
        assert_eq!(report.truncated_cycle, 1);
        assert_eq!(report.truncated_length, 0);
    }

    #[tokio::test]
    async fn test_report_serializes_to_json() {
        let input = write_kmers(THREE_CONTIGS);
        let report = run_cluster(1, AssemblyConfig::new(input.path()))
            .await
            .remove(0)
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["contig_count"], 3);
        assert_eq!(json["rank"], 0);
    }

    // ============================================================
    // FATAL ERRORS
    // ============================================================

    #[tokio::test]
    async fn test_kmer_length_mismatch_aborts() {
        let input = write_kmers(THREE_CONTIGS);
        let config = AssemblyConfig::new(input.path()).with_kmer_len(19);

        let err = run_cluster(1, config).await.remove(0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::KmerLengthMismatch {
                expected: 19,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_broken_chain_aborts() {
        // ATC is missing.
        let input = write_kmers(&["AAT FC", "TCG TF"]);
        let config = AssemblyConfig::new(input.path());

        let err = run_cluster(1, config).await.remove(0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AssemblyError>(),
            Some(AssemblyError::KeyNotFound { .. })
        ));
    }
}
