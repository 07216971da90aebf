use super::types::RankReport;
use crate::assembly::{Assembler, Contig};
use crate::cluster::transport::Transport;
use crate::config::AssemblyConfig;
use crate::kmer::{KmerPair, kmer_size, line_count, read_kmers};
use crate::storage::memory::DistributedHashMap;

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs the whole assembly on one rank.
///
/// Collective: every rank of the transport's cluster must call it with the same
/// `config`. Any error is fatal for the run; the other ranks are left waiting at
/// the next barrier, so callers are expected to abort the whole cluster.
pub async fn run_rank<T: Transport>(transport: Arc<T>, config: &AssemblyConfig) -> Result<RankReport> {
    let started = Instant::now();
    let rank = transport.rank_me();
    let rank_n = transport.rank_n();
    let path = config.kmer_file();

    // 1. Sizing
    let found_len = kmer_size(path)
        .with_context(|| format!("reading k-mer length from {}", path.display()))?;
    let kmer_len = config.resolve_kmer_len(found_len)?;
    let n_records = line_count(path)?;
    let global_size = config.global_size(n_records);

    tracing::info!(
        "Rank {} of {}: {} records of {}-mers, table of {} slots",
        rank,
        rank_n,
        n_records,
        kmer_len,
        global_size
    );

    // 2. Table construction (barriers on both sides of the handle exchange)
    let table = DistributedHashMap::new(transport.clone(), global_size).await?;

    // 3. Read this rank's block
    let records = read_kmers(path, kmer_len, rank_n, rank.index())
        .with_context(|| format!("reading k-mer block of rank {}", rank))?;
    transport.barrier().await?;

    // 4. Bulk insert
    let insert_started = Instant::now();
    for record in &records {
        table.insert(record).await?;
    }
    transport.barrier().await?;
    let insert_time = insert_started.elapsed();

    // 5. Local start records
    let starts: Vec<KmerPair> = records.iter().filter(|r| r.is_start()).cloned().collect();
    tracing::debug!("Rank {} found {} start records", rank, starts.len());

    // 6. Assembly
    let assembly_started = Instant::now();
    let contigs = Assembler::new(&table, config.max_chain_length)
        .assemble(&starts)
        .await?;
    transport.barrier().await?;
    let assembly_time = assembly_started.elapsed();

    let mut report = RankReport {
        rank,
        rank_n,
        kmer_len,
        global_size,
        records_read: records.len(),
        local_occupancy: table.local_shard().occupied_count(),
        start_count: starts.len(),
        contig_count: 0,
        contig_records: 0,
        truncated_length: 0,
        truncated_cycle: 0,
        insert_time,
        assembly_time,
        total_time: Duration::ZERO,
        output_file: None,
    };
    report.tally(&contigs);
    report.total_time = started.elapsed();

    // 7. Output
    match config.output.output_path(rank) {
        Some(output) => {
            write_contigs(&output, &contigs)?;
            report.output_file = Some(output);
        }
        None => log_report(&report),
    }

    Ok(report)
}

/// Writes one contig per line.
fn write_contigs(path: &Path, contigs: &[Contig]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for contig in contigs {
        writeln!(out, "{}", contig.sequence())?;
    }
    out.flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn log_report(report: &RankReport) {
    if report.truncated() > 0 {
        tracing::warn!(
            "Rank {} truncated {} contigs ({} at max length, {} on cycles)",
            report.rank,
            report.truncated(),
            report.truncated_length,
            report.truncated_cycle
        );
    }

    tracing::info!(
        "Rank {} assembled {} contigs with {} records in total",
        report.rank,
        report.contig_count,
        report.contig_records
    );
    tracing::info!(
        "Rank {} finished: insert {:.3}s, assembly {:.3}s, total {:.3}s",
        report.rank,
        report.insert_time.as_secs_f64(),
        report.assembly_time.as_secs_f64(),
        report.total_time.as_secs_f64()
    );
}
