use alloy::primitives::Address;
use anyhow::Result;
use chrono::{DateTime, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use scheduled_tx_dispatcher::config::DEFAULT_CONFIG_PATH;
use scheduled_tx_dispatcher::{
    due_specs, standard_catalog, BlockchainClient, ChainConfig, Dispatcher,
    LocalTxSigner, OutputStore, RunSummary, ScheduleSlot, SpecOutcome, TxSigner,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Sends the scheduled stake, wrap, unstake and swap transactions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dispatches every transaction due now
    Run {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
        /// Treat every transaction as due, regardless of the clock
        #[arg(long)]
        test_mode: bool,
    },
    /// Lists the transactions that would be dispatched, without sending anything
    Due {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
        /// UTC time to evaluate, as HH:MM (defaults to now)
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        test_mode: bool,
    },
    /// Prints the recorded swap outputs
    Outputs {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, test_mode } => run(&config, test_mode).await,
        Commands::Due {
            config,
            at,
            test_mode,
        } => show_due(&config, at.as_deref(), test_mode),
        Commands::Outputs { config } => show_outputs(&config),
    }
}

async fn run(config_path: &str, test_mode_flag: bool) -> Result<()> {
    let config = ChainConfig::load(config_path)?;
    let test_mode = test_mode_flag || config.test_mode_from_env();

    // Credential first: nothing touches the network without it.
    let private_key = config.read_private_key()?;
    let signer = LocalTxSigner::from_private_key(
        &private_key,
        config.chain.chain_id,
        config.gas_price_wei()?,
    )?;

    let recipient = config.recipient_override()?.unwrap_or_else(|| signer.address());
    let catalog = standard_catalog(&config.catalog_addresses()?, recipient)?;

    // An unreachable endpoint or a wrong chain is fatal; no retry at startup.
    let client =
        BlockchainClient::connect(&config.chain.rpc_url, config.chain.chain_id, config.poll_interval())
            .await?;

    let dispatcher = Dispatcher::new(
        Arc::new(client),
        Arc::new(signer),
        catalog,
        OutputStore::new(config.storage.outputs_file.clone()),
        config.dispatch_settings(test_mode),
    )?;

    let summary = dispatcher.run().await;
    print_summary(&summary);

    if summary.has_failures() {
        let failed: Vec<_> = summary.failed().map(|r| r.name.as_str()).collect();
        return Err(anyhow::anyhow!("Failed transactions: {}", failed.join(", ")));
    }
    Ok(())
}

fn show_due(config_path: &str, at: Option<&str>, test_mode_flag: bool) -> Result<()> {
    let config = ChainConfig::load(config_path)?;
    let test_mode = test_mode_flag || config.test_mode_from_env();
    let now = evaluation_time(at)?;

    let recipient = config.recipient_override()?.unwrap_or(Address::ZERO);
    let catalog = standard_catalog(&config.catalog_addresses()?, recipient)?;
    let due = due_specs(&catalog, now, test_mode);

    println!("🕒 {} UTC{}", now.format("%H:%M"), if test_mode { " (test mode)" } else { "" });
    if due.is_empty() {
        println!("⏳ Nothing due");
    }
    for d in &due {
        println!(
            "  • {} [{}] x{} slot {}",
            d.spec.name,
            d.spec.kind,
            d.spec.repeat_count,
            d.matched_slot.map(|s| s.key()).unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

fn show_outputs(config_path: &str) -> Result<()> {
    let config = ChainConfig::load(config_path)?;
    let store = OutputStore::new(config.storage.outputs_file.clone());

    println!("📁 {}", store.path().display());
    for (key, amount) in store.read()? {
        println!("  {} → {}", key, amount);
    }
    Ok(())
}

fn evaluation_time(at: Option<&str>) -> Result<DateTime<Utc>> {
    let now = Utc::now();
    let Some(at) = at else {
        return Ok(now);
    };

    let slot = ScheduleSlot::parse(at)?;
    let time = NaiveTime::from_hms_opt(slot.hour, slot.minute, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid time {}", at))?;
    Ok(now.date_naive().and_time(time).and_utc())
}

fn print_summary(summary: &RunSummary) {
    info!("📊 Run summary");
    for report in &summary.reports {
        let icon = match report.outcome {
            SpecOutcome::Completed { .. } => "✅",
            SpecOutcome::Skipped { .. } => "⏭️",
            SpecOutcome::Failed { .. } => "❌",
        };
        info!("  {} {}: {}", icon, report.name, report.outcome);
        for hash in &report.tx_hashes {
            info!("      {:?}", hash);
        }
    }
    if !summary.not_due.is_empty() {
        info!("  ⏳ Not due: {}", summary.not_due.join(", "));
    }
}
