use clap::{Parser, Subcommand};
use distributed_assembly::cluster::http::HttpTransport;
use distributed_assembly::cluster::local::LocalCluster;
use distributed_assembly::cluster::types::Rank;
use distributed_assembly::config::{AssemblyConfig, DEFAULT_LOAD_FACTOR, OutputMode, RunMode};
use distributed_assembly::pipeline::{RankReport, run_rank};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Debug, Parser)]
#[command(about = "Distributed de Bruijn graph contig assembler")]
struct Cli {
    /// K-mer file, one `<KMER> <B><F>` record per line.
    kmer_file: PathBuf,

    /// Expected k-mer length; inferred from the file when omitted.
    #[arg(long)]
    kmer_len: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_LOAD_FACTOR)]
    load_factor: f64,

    #[arg(long, default_value_t = distributed_assembly::assembly::DEFAULT_MAX_CHAIN_LENGTH)]
    max_chain_length: usize,

    /// Write `<prefix>_<rank>.dat` instead of logging a report.
    #[arg(long)]
    test_prefix: Option<PathBuf>,

    /// Print each rank's report as JSON on stdout.
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run every rank inside this process.
    Local {
        #[arg(long, default_value_t = 1)]
        ranks: usize,
    },
    /// Run one rank of a multi-process cluster.
    Http {
        #[arg(long)]
        rank: u32,
        /// Address of every rank, in rank order.
        #[arg(long, value_delimiter = ',', required = true)]
        peers: Vec<SocketAddr>,
    },
}

impl Cli {
    fn config(&self) -> AssemblyConfig {
        let mut config = AssemblyConfig::new(&self.kmer_file)
            .with_load_factor(self.load_factor)
            .with_max_chain_length(self.max_chain_length);
        if let Some(kmer_len) = self.kmer_len {
            config = config.with_kmer_len(kmer_len);
        }
        if let Some(prefix) = &self.test_prefix {
            config = config.with_output(OutputMode::Test {
                prefix: prefix.clone(),
            });
        }
        config
    }

    fn run_mode(&self) -> RunMode {
        match &self.mode {
            Mode::Local { ranks } => RunMode::Local { ranks: *ranks },
            Mode::Http { rank, peers } => RunMode::Http {
                rank: Rank(*rank),
                peers: peers.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    if let Err(e) = run(&cli).await {
        tracing::error!("Assembly failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.config();
    let mode = cli.run_mode();
    config.validate()?;
    mode.validate()?;

    let reports = match mode {
        RunMode::Local { ranks } => run_local(ranks, config).await?,
        RunMode::Http { rank, peers } => vec![run_http(rank, peers, config).await?],
    };

    if cli.json {
        for report in &reports {
            println!("{}", serde_json::to_string(report)?);
        }
    }
    Ok(())
}

/// Runs all ranks as tasks. The first failing rank aborts the others, which would
/// otherwise wait at the next barrier forever.
async fn run_local(ranks: usize, config: AssemblyConfig) -> anyhow::Result<Vec<RankReport>> {
    tracing::info!("Starting {} in-process ranks", ranks);

    let config = Arc::new(config);
    let mut tasks = JoinSet::new();
    for transport in LocalCluster::spawn(ranks) {
        let config = config.clone();
        tasks.spawn(async move { run_rank(transport, &config).await });
    }

    let mut reports = Vec::with_capacity(ranks);
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(report) => reports.push(report),
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    reports.sort_by_key(|report| report.rank);
    Ok(reports)
}

async fn run_http(
    rank: Rank,
    peers: Vec<SocketAddr>,
    config: AssemblyConfig,
) -> anyhow::Result<RankReport> {
    let transport = Arc::new(HttpTransport::new(rank, peers)?);
    let bind_addr = transport.bind_addr();

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Rank {} listening on {}", rank, bind_addr);
    let server = transport.serve(listener);

    let report = run_rank(transport.clone(), &config).await?;

    transport.shutdown(server).await?;
    Ok(report)
}
