use casino_wallet::application::orchestrator::TransactionOrchestrator;
use casino_wallet::domain::ports::LedgerBox;
use casino_wallet::infrastructure::in_memory::InMemoryLedger;
#[cfg(feature = "storage-rocksdb")]
use casino_wallet::infrastructure::rocksdb::RocksDBLedger;
use casino_wallet::interfaces::csv::wallet_reader::WalletReader;
use casino_wallet::interfaces::csv::wallet_writer::WalletWriter;
use casino_wallet::interfaces::json::request::handle_line;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-lines request file, or `-` for stdin
    requests: PathBuf,

    /// Seed wallets CSV loaded before any request runs
    #[arg(long)]
    wallets: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "CASINO_WALLET_DB")]
    db_path: Option<PathBuf>,

    /// Write every wallet row to this CSV file once all requests ran
    #[arg(long)]
    state_out: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerBox> {
    match db_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening persistent ledger");
            Ok(Box::new(RocksDBLedger::open(path).into_diagnostic()?))
        }
        None => Ok(Box::new(InMemoryLedger::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerBox> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, \
             but 'storage-rocksdb' feature is not enabled. \
             Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryLedger::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casino_wallet=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let ledger = open_ledger(cli.db_path)?;

    if let Some(path) = cli.wallets {
        let file = File::open(path).into_diagnostic()?;
        for wallet in WalletReader::new(file).wallets().into_diagnostic()? {
            match wallet {
                Ok(wallet) => ledger.open_account(wallet).await.into_diagnostic()?,
                Err(e) => tracing::warn!(error = %e, "skipping seed wallet"),
            }
        }
    }

    let orchestrator = TransactionOrchestrator::new(ledger);

    let input: Box<dyn BufRead> = if cli.requests.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&cli.requests).into_diagnostic()?))
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in input.lines() {
        let line = line.into_diagnostic()?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&orchestrator, &line).await;
        serde_json::to_writer(&mut out, &response).into_diagnostic()?;
        writeln!(out).into_diagnostic()?;
    }
    out.flush().into_diagnostic()?;

    if let Some(path) = cli.state_out {
        let wallets = orchestrator.into_results().await.into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        WalletWriter::new(file)
            .write_wallets(wallets)
            .into_diagnostic()?;
    }

    Ok(())
}
