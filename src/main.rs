use clap::Parser;
use payledger::application::engine::PaymentEngine;
use payledger::domain::ports::{SettlementGatewayBox, TransactionStoreBox};
use payledger::infrastructure::in_memory::{InMemorySettlementGateway, InMemoryTransactionStore};
use payledger::interfaces::csv::batch::BatchRunner;
use payledger::interfaces::csv::command_reader::CommandReader;
use payledger::interfaces::csv::result_writer::ResultWriter;
use payledger::telemetry::{self, LogFormat};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log output format (logs are written to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    let engine = build_engine(cli.db_path)?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let stdout = io::stdout();
    let mut writer = ResultWriter::new(stdout.lock());
    let mut runner = BatchRunner::new(&engine);

    for command in reader.commands() {
        match command {
            Ok(command) => {
                let row = runner.run(command).await;
                writer.write(&row).into_diagnostic()?;
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_engine(db_path: Option<PathBuf>) -> Result<PaymentEngine> {
    use payledger::infrastructure::rocksdb::RocksDBStore;

    if let Some(db_path) = db_path {
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        let ts_store: TransactionStoreBox = Box::new(store.clone());
        let gateway: SettlementGatewayBox = Box::new(store);
        return Ok(PaymentEngine::new(ts_store, gateway));
    }
    Ok(in_memory_engine())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_engine(db_path: Option<PathBuf>) -> Result<PaymentEngine> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_engine())
}

fn in_memory_engine() -> PaymentEngine {
    let ts_store: TransactionStoreBox = Box::new(InMemoryTransactionStore::new());
    let gateway: SettlementGatewayBox = Box::new(InMemorySettlementGateway::new());
    PaymentEngine::new(ts_store, gateway)
}
