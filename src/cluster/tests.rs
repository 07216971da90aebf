//! Cluster Module Tests
//!
//! ## Test Scopes
//! - **Shard Directory**: Validation of gathered handles.
//! - **Local Transport**: Mailbox round trips, stale handles, barriers and all-gather
//!   between in-process ranks.
//! - **HTTP Transport**: Two-rank clusters on loopback building a table and running a
//!   whole assembly end to end.

#[cfg(test)]
mod tests {
    use crate::cluster::handlers::CoordinatorState;
    use crate::cluster::http::HttpTransport;
    use crate::cluster::local::LocalCluster;
    use crate::cluster::transport::Transport;
    use crate::cluster::types::{Rank, ShardDirectory, ShardHandle, TransportError};
    use crate::config::{AssemblyConfig, OutputMode};
    use crate::kmer::KmerPair;
    use crate::pipeline::run_rank;
    use crate::storage::handlers::ShardService;
    use crate::storage::memory::DistributedHashMap;
    use crate::storage::protocol::{ShardEnvelope, ShardReply, ShardRequest};
    use crate::storage::shard::LocalShard;
    use crate::storage::types::ShardError;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    // ============================================================
    // SHARD DIRECTORY
    // ============================================================

    #[test]
    fn test_directory_sorts_gathered_handles() {
        let handles = vec![
            ShardHandle::new(Rank(2)),
            ShardHandle::new(Rank(0)),
            ShardHandle::new(Rank(1)),
        ];
        let directory = ShardDirectory::from_gathered(handles, 3).unwrap();

        assert_eq!(directory.len(), 3);
        for idx in 0..3u32 {
            assert_eq!(directory.handle(Rank(idx)).unwrap().rank, Rank(idx));
        }
        assert!(directory.handle(Rank(3)).is_none());
    }

    #[test]
    fn test_directory_rejects_duplicates_and_gaps() {
        let duplicate = vec![ShardHandle::new(Rank(0)), ShardHandle::new(Rank(0))];
        assert!(matches!(
            ShardDirectory::from_gathered(duplicate, 2),
            Err(TransportError::Directory(_))
        ));

        let short = vec![ShardHandle::new(Rank(0))];
        assert!(matches!(
            ShardDirectory::from_gathered(short, 2),
            Err(TransportError::Directory(_))
        ));
    }

    #[test]
    fn test_handles_get_fresh_tokens() {
        let a = ShardHandle::new(Rank(0));
        let b = ShardHandle::new(Rank(0));
        assert_ne!(a, b, "Each construction mints a new capability");
    }

    #[test]
    fn test_coordinator_counts_each_rank_once() {
        let state = CoordinatorState::new();
        assert_eq!(state.arrive(0, Rank(1)), 1);
        assert_eq!(state.arrive(0, Rank(1)), 1);
        assert_eq!(state.arrive(0, Rank(0)), 2);
        assert_eq!(state.arrived(1), 0);

        let first = ShardHandle::new(Rank(1));
        let second = ShardHandle::new(Rank(1));
        state.contribute(0, first);
        state.contribute(0, second.clone());
        assert_eq!(state.gathered(0), vec![second]);
    }

    // ============================================================
    // LOCAL TRANSPORT
    // ============================================================

    fn attach_shard(transport: &impl Transport, slots: usize) -> Arc<ShardService> {
        let service = Arc::new(ShardService::new(
            ShardHandle::new(transport.rank_me()),
            LocalShard::new(slots),
        ));
        transport.attach(service.clone()).unwrap();
        service
    }

    #[tokio::test]
    async fn test_local_call_reaches_owner_shard() {
        let ranks = LocalCluster::spawn(2);
        let owner = attach_shard(ranks[1].as_ref(), 4);

        let claim = ShardEnvelope {
            handle: owner.handle().clone(),
            request: ShardRequest::ClaimSlot { offset: 3 },
        };
        let first = ranks[0].call(Rank(1), claim.clone()).await.unwrap();
        let second = ranks[0].call(Rank(1), claim).await.unwrap();

        assert_eq!(first, ShardReply::Claimed(true));
        assert_eq!(second, ShardReply::Claimed(false));
        assert!(owner.shard().is_used(3).unwrap());
    }

    #[tokio::test]
    async fn test_local_call_before_attach_fails() {
        let ranks = LocalCluster::spawn(2);
        let envelope = ShardEnvelope {
            handle: ShardHandle::new(Rank(1)),
            request: ShardRequest::ReadFlag { offset: 0 },
        };

        let err = ranks[0].call(Rank(1), envelope).await.unwrap_err();
        assert!(matches!(err, TransportError::NotAttached(Rank(1))));
    }

    #[tokio::test]
    async fn test_local_call_rejects_foreign_token() {
        let ranks = LocalCluster::spawn(2);
        attach_shard(ranks[1].as_ref(), 4);

        let forged = ShardEnvelope {
            handle: ShardHandle::new(Rank(1)),
            request: ShardRequest::ReadFlag { offset: 0 },
        };
        let err = ranks[0].call(Rank(1), forged).await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::Remote {
                rank: Rank(1),
                source: ShardError::StaleHandle(Rank(1))
            }
        ));
    }

    #[tokio::test]
    async fn test_local_call_to_unknown_rank() {
        let ranks = LocalCluster::spawn(1);
        let envelope = ShardEnvelope {
            handle: ShardHandle::new(Rank(5)),
            request: ShardRequest::ReadFlag { offset: 0 },
        };

        let err = ranks[0].call(Rank(5), envelope).await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownRank { .. }));
    }

    #[tokio::test]
    async fn test_local_barrier_holds_until_all_ranks_arrive() {
        let ranks = LocalCluster::spawn(3);
        let arrived = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for transport in ranks {
            let arrived = arrived.clone();
            tasks.push(tokio::spawn(async move {
                arrived.fetch_add(1, Ordering::SeqCst);
                transport.barrier().await.unwrap();
                // Nobody leaves before everyone has entered.
                arrived.load(Ordering::SeqCst)
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), 3);
        }
    }

    #[tokio::test]
    async fn test_local_all_gather_returns_every_handle() {
        let ranks = LocalCluster::spawn(3);

        let mut tasks = Vec::new();
        for transport in ranks {
            tasks.push(tokio::spawn(async move {
                let handle = ShardHandle::new(transport.rank_me());
                transport.all_gather(handle).await.unwrap()
            }));
        }

        let mut views = Vec::new();
        for task in tasks {
            views.push(task.await.unwrap());
        }

        assert_eq!(views[0].len(), 3);
        assert!(views.iter().all(|view| view == &views[0]));
    }

    // ============================================================
    // HTTP TRANSPORT
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_http_cluster_insert_and_find() {
        let listeners = vec![
            TcpListener::bind("127.0.0.1:0").await.unwrap(),
            TcpListener::bind("127.0.0.1:0").await.unwrap(),
        ];
        let peers: Vec<_> = listeners
            .iter()
            .map(|listener| listener.local_addr().unwrap())
            .collect();

        let mut transports = Vec::new();
        for (idx, listener) in listeners.into_iter().enumerate() {
            let transport = Arc::new(HttpTransport::new(Rank(idx as u32), peers.clone()).unwrap());
            assert_eq!(transport.bind_addr(), peers[idx]);
            transport.serve(listener);
            transports.push(transport);
        }

        let records = ["AAT FC", "ATC AG", "TCG TF", "GGA FA", "GAC GF", "ACT CF"];

        let mut tasks = Vec::new();
        for transport in transports {
            tasks.push(tokio::spawn(async move {
                let rank = transport.rank_me().index();
                let table = DistributedHashMap::new(transport.clone(), 16).await.unwrap();

                for line in records.iter().skip(rank).step_by(2) {
                    let pair: KmerPair = line.parse().unwrap();
                    table.insert(&pair).await.unwrap();
                }
                transport.barrier().await.unwrap();

                let mut found = Vec::new();
                for line in records {
                    let pair: KmerPair = line.parse().unwrap();
                    found.push(table.find(&pair.kmer).await.unwrap());
                }
                let missing = table.find(&"CCC".parse().unwrap()).await.unwrap();
                transport.barrier().await.unwrap();
                (found, missing)
            }));
        }

        for task in tasks {
            let (found, missing) = task.await.unwrap();
            for (line, pair) in records.iter().zip(found) {
                assert_eq!(pair.unwrap().to_string(), *line);
            }
            assert!(missing.is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_http_cluster_runs_pipeline_and_shuts_down() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        for line in ["AAT FC", "ATC AG", "GTA GC", "GGT FA", "TCG TF", "TAC TF"] {
            writeln!(input, "{}", line).unwrap();
        }
        let out_dir = tempfile::tempdir().unwrap();
        let config = Arc::new(AssemblyConfig::new(input.path()).with_output(OutputMode::Test {
            prefix: out_dir.path().join("http"),
        }));

        let listeners = vec![
            TcpListener::bind("127.0.0.1:0").await.unwrap(),
            TcpListener::bind("127.0.0.1:0").await.unwrap(),
        ];
        let peers: Vec<_> = listeners
            .iter()
            .map(|listener| listener.local_addr().unwrap())
            .collect();

        let mut tasks = Vec::new();
        for (idx, listener) in listeners.into_iter().enumerate() {
            let transport = Arc::new(HttpTransport::new(Rank(idx as u32), peers.clone()).unwrap());
            let server = transport.serve(listener);
            let config = config.clone();
            tasks.push(tokio::spawn(async move {
                let report = run_rank(transport.clone(), &config).await.unwrap();
                transport.shutdown(server).await.unwrap();
                report
            }));
        }

        let mut contigs = Vec::new();
        for task in tasks {
            let report = task.await.unwrap();
            assert_eq!(report.contig_count, 1);
            let path = report.output_file.unwrap();
            contigs.push(std::fs::read_to_string(path).unwrap());
        }
        contigs.sort();
        assert_eq!(contigs, vec!["AATCG\n".to_string(), "GGTAC\n".to_string()]);
    }
}
