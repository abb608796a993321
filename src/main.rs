//! # ciciot-dl CLI
//!
//! Interactive front end for the ciciot-dl library: a numbered menu that runs
//! the CSV pipeline, the capture pipeline or cleanup until the user exits.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use ciciot_dl::core::config::{DEFAULT_CSV_URL, DEFAULT_PCAP_URL};
use ciciot_dl::{
    AssumeYes, CleanupOutcome, Confirm, CsvOutcome, DatasetConfig, Downloader, Mergecap, PcapOutcome,
    StdinConfirm,
};
use clap::Parser;
use log::{error, info};

mod cli;

use cli::{MenuChoice, ProgressManager};

/// Command-line interface for ciciot-dl
#[derive(Parser)]
#[command(name = "ciciot-dl")]
#[command(about = "Downloads and consolidates the CIC IoT 2023 network-traffic dataset")]
#[command(long_about = "Downloads and consolidates the CIC IoT 2023 network-traffic dataset.

Operations are chosen from an interactive menu:
  [1] download every CSV file and merge them into one table
  [2] download every packet capture and merge them with mergecap
  [3] delete all downloaded and merged data
  [0] exit

Flags only configure where data lives and how the network is used.")]
#[command(version)]
struct Cli {
    /// Directory that holds data/raw and data/processed
    #[arg(long, env = "CICIOT_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Directory index listing the CSV files
    #[arg(long, env = "CICIOT_CSV_URL", default_value = DEFAULT_CSV_URL)]
    csv_url: String,

    /// Directory index listing the capture directories
    #[arg(long, env = "CICIOT_PCAP_URL", default_value = DEFAULT_PCAP_URL)]
    pcap_url: String,

    /// Capture merge utility, invoked as `<tool> -w <output> <inputs>...`
    #[arg(long, env = "CICIOT_MERGE_TOOL", default_value = "mergecap")]
    merge_tool: String,

    /// Seconds allowed for establishing a connection
    #[arg(long, env = "CICIOT_CONNECT_TIMEOUT", default_value_t = 10)]
    connect_timeout: u64,

    /// Seconds allowed for fetching an index page
    #[arg(long, env = "CICIOT_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    /// Seconds a download may stall before it is abandoned
    #[arg(long, env = "CICIOT_READ_TIMEOUT", default_value_t = 60)]
    read_timeout: u64,

    /// Extra attempts for index pages failing with network errors
    #[arg(long, env = "CICIOT_RETRIES", default_value_t = 0)]
    retries: u32,

    /// Answer yes to every delete/overwrite confirmation
    #[arg(short, long)]
    yes: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn dataset_config(&self) -> ciciot_dl::Result<DatasetConfig> {
        let config = DatasetConfig {
            csv_url: ciciot_dl::parse_index_url(&self.csv_url)?,
            pcap_url: ciciot_dl::parse_index_url(&self.pcap_url)?,
            merge_tool: self.merge_tool.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            request_timeout: Duration::from_secs(self.request_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            listing_retries: self.retries,
            ..DatasetConfig::rooted_at(&self.data_dir)
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_target(false)
        .init();

    let config = cli.dataset_config().context("invalid configuration")?;
    ciciot_dl::ensure_layout(&config)
        .with_context(|| format!("failed to create data directories under {}", cli.data_dir.display()))?;

    let progress = ProgressManager::new(!io::stderr().is_terminal());
    let downloader = Downloader::new(&config)?.with_progress(progress.factory());
    let merger = Mergecap::new(config.merge_tool.clone());
    let confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    };

    if cli.verbose {
        eprintln!("ciciot-dl v{} starting...", env!("CARGO_PKG_VERSION"));
        eprintln!("📁 Data directory: {}", cli.data_dir.display());
    }

    cli::print_menu();
    let stdin = io::stdin();
    loop {
        eprint!("[ciciot-dl] Enter your choice: ");
        io::stderr().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            eprintln!();
            break;
        }

        let Some(choice) = MenuChoice::parse(&line) else {
            eprintln!("Unknown option '{}': choose 1, 2, 3 or 0.", line.trim());
            continue;
        };

        match choice {
            MenuChoice::ProcessCsv => {
                let result = ciciot_dl::process_csv(&config, &downloader, confirm.as_ref()).await;
                report_csv(&config, result);
            }
            MenuChoice::ProcessPcap => {
                let result =
                    ciciot_dl::process_pcap(&config, &downloader, confirm.as_ref(), &merger).await;
                report_pcap(result);
            }
            MenuChoice::Cleanup => {
                report_cleanup(ciciot_dl::cleanup(&config, confirm.as_ref()));
            }
            MenuChoice::Exit => {
                info!("Exiting program. Goodbye!");
                break;
            }
        }
        cli::print_menu();
    }

    Ok(())
}

fn report_csv(config: &DatasetConfig, result: ciciot_dl::Result<CsvOutcome>) {
    match result {
        Ok(CsvOutcome::Merged(summary)) => {
            eprintln!(
                "✅ Combined dataset saved to {} in {:.2} seconds.",
                config.merged_csv_path.display(),
                summary.elapsed.as_secs_f64()
            );
            eprintln!(
                "\t* Dataset contains {} rows and {} columns ({} rows with missing values dropped).",
                summary.rows, summary.columns, summary.dropped
            );
        }
        Ok(CsvOutcome::MergeDeclined) => eprintln!("⏭️  Kept the existing merged dataset."),
        Ok(CsvOutcome::NoInputs) => eprintln!("⚠️  No CSV files to merge."),
        Err(e) => error!("❌ CSV processing failed: {e}"),
    }
}

fn report_pcap(result: ciciot_dl::Result<PcapOutcome>) {
    match result {
        Ok(PcapOutcome::Merged { inputs, output }) => {
            eprintln!("✅ Merged {inputs} capture files into {}.", output.display());
        }
        Ok(PcapOutcome::MergeDeclined) => eprintln!("⏭️  Kept the existing merged capture."),
        Ok(PcapOutcome::NoInputs) => eprintln!("⚠️  No capture files to merge."),
        Ok(PcapOutcome::MergerMissing(msg)) => {
            eprintln!("⚠️  Captures downloaded but not merged: {msg}");
        }
        Ok(PcapOutcome::MergerFailed(msg)) => {
            eprintln!("⚠️  Captures downloaded but merging failed: {msg}");
        }
        Err(e) => error!("❌ PCAP processing failed: {e}"),
    }
}

fn report_cleanup(result: ciciot_dl::Result<CleanupOutcome>) {
    match result {
        Ok(CleanupOutcome::Removed { entries }) => eprintln!("🗑️  Removed {entries} entries."),
        Ok(CleanupOutcome::Declined) => eprintln!("Nothing was deleted."),
        Err(e) => error!("❌ Cleanup failed: {e}"),
    }
}
