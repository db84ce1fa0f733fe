use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use offer_sheet_sync::config::Config;
use offer_sheet_sync::marketplace::MarketplaceClient;
use offer_sheet_sync::session::StaticTokenProvider;
use offer_sheet_sync::sheet::google::GoogleSheetsBackend;
use offer_sheet_sync::sheet::record::RecordStore;
use offer_sheet_sync::workflow::{self, OfferSync};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "offer-sheet-sync")]
#[command(about = "Keep marketplace offers in line with a spreadsheet")]
struct Args {
    /// Environment file read before configuration (falls back to .env)
    #[arg(long, default_value = "setting.env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process runnable rows forever, sleeping between rounds
    Run,
    /// Process runnable rows once and exit
    Once,
    /// Print the resolved attributes for one row as JSON
    Resolve {
        /// 1-based sheet row
        #[arg(long)]
        row: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if dotenv::from_path(&args.env_file).is_err() {
        dotenv::dotenv().ok();
    }
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Offer sheet sync starting...");
    info!("Spreadsheet: {} / {}", config.spreadsheet_key, config.sheet_name);

    let sheets_token = config
        .sheets_access_token
        .clone()
        .ok_or_else(|| anyhow!("SHEETS_ACCESS_TOKEN is not set"))?;
    let backend = GoogleSheetsBackend::new(config.sheets_api_base_url.clone(), sheets_token);
    let store = RecordStore::new(backend, config.sheet_retry_policy());
    let client = Arc::new(MarketplaceClient::new(
        config.marketplace_api_base_url.clone(),
        config.api_retry_policy(),
    ));

    if let Commands::Resolve { row } = args.command {
        let resolved = workflow::resolve_row(
            &store,
            &config.spreadsheet_key,
            &config.sheet_name,
            row,
            client.as_ref(),
        )
        .await?;
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    let token = config
        .marketplace_token
        .clone()
        .ok_or_else(|| anyhow!("MARKETPLACE_TOKEN is not set"))?;
    let session = Arc::new(StaticTokenProvider::new(token)?);
    let sync = OfferSync::new(
        store,
        client.clone(),
        client,
        session,
        config.spreadsheet_key.clone(),
        config.sheet_name.clone(),
    );

    let stop = Arc::new(AtomicBool::new(false));
    match args.command {
        Commands::Once => {
            let summary = sync.run_pass(&stop).await?;
            info!("Pass finished: {:?}", summary);
        }
        _ => run_forever(&sync, stop, config.relax_time_each_round).await,
    }

    Ok(())
}

async fn run_forever<B>(sync: &OfferSync<B>, stop: Arc<AtomicBool>, relax: Duration)
where
    B: offer_sheet_sync::sheet::backend::SheetBackend,
{
    let wake = Arc::new(tokio::sync::Notify::new());
    {
        let stop = stop.clone();
        let wake = wake.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, finishing current row");
                stop.store(true, Ordering::SeqCst);
                wake.notify_one();
            }
        });
    }

    while !stop.load(Ordering::SeqCst) {
        match sync.run_pass(&stop).await {
            Ok(summary) => info!(
                "Pass finished: {} processed, {} failed",
                summary.processed, summary.failed
            ),
            Err(e) => error!("Pass aborted: {}", e),
        }
        if stop.load(Ordering::SeqCst) {
            break;
        }

        info!("Sleep for {:?} before next round", relax);
        tokio::select! {
            _ = tokio::time::sleep(relax) => {}
            _ = wake.notified() => {}
        }
    }
    info!("Stopped");
}
