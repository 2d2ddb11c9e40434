use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};
use std::str::FromStr;

use crate::config::Config;
use crate::domain::{format_usd, TxHash};
use crate::startup::{self, AppContext};

#[derive(Parser)]
#[command(name = "streamertip")]
#[command(about = "StreamerTip - tip submission toolkit", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration validation (default)
    Config,

    /// Convert a tip amount to token units
    Units {
        /// Amount in dollars, e.g. 1.50
        #[arg(value_name = "AMOUNT")]
        amount: String,
    },

    /// Print the block explorer link for a transaction
    Link {
        #[arg(value_name = "TX_HASH")]
        hash: TxHash,
    },

    /// Follow a transaction until it is confirmed
    Track {
        #[arg(value_name = "TX_HASH")]
        hash: TxHash,
    },

    /// Check configuration and reachability of the RPC node and tip API
    Check,
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Config) {
        Commands::Config => handle_config_validate(&config),
        Commands::Units { amount } => handle_units(&config, &amount),
        Commands::Link { hash } => handle_link(&config, &hash),
        Commands::Track { hash } => {
            let context = startup::init(config)?;
            handle_track(context, hash).await
        }
        Commands::Check => {
            let context = startup::init(config)?;
            handle_check(context).await
        }
    }
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  App Name: {}", config.wallet.app_name);
    println!("  Tip API Endpoint: {}", config.tip_api_endpoint);
    println!("  Submit Mode: {:?}", config.submit_mode);
    println!(
        "  Chain: {} ({}) via {}",
        config.wallet.chain.name, config.wallet.chain.id, config.wallet.chain.rpc_url
    );
    println!(
        "  Token: {} {} ({} decimals)",
        config.token.symbol,
        config.token.address.short(),
        config.token.decimals
    );
    println!("  Minimum Tip: {}", format_usd(&config.min_tip_amount));
    println!(
        "  Presets: {}",
        config
            .tip_presets
            .iter()
            .map(format_usd)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Recipients: {}", config.recipients.len());
    for (name, address) in &config.recipients {
        println!("    @{} -> {}", name, address.short());
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub fn handle_units(config: &Config, amount: &str) -> anyhow::Result<()> {
    let amount = BigDecimal::from_str(amount.trim())
        .map_err(|_| anyhow::anyhow!("'{}' is not a decimal amount", amount))?;
    let units = config.token.to_units(&amount)?;

    println!(
        "{} = {} {} units ({} decimals)",
        format_usd(&amount),
        units.value,
        config.token.symbol,
        units.decimals
    );

    Ok(())
}

pub fn handle_link(config: &Config, hash: &TxHash) -> anyhow::Result<()> {
    println!("{}", config.explorer_tx_url(hash));
    Ok(())
}

pub async fn handle_track(context: &AppContext, hash: TxHash) -> anyhow::Result<()> {
    let tracker = context.tracker();

    tracing::info!(tx_hash = %hash, "Tracking transaction...");
    println!("Tracking {}", hash);

    let status = tracker
        .track(hash, |status| {
            if status.is_confirming {
                println!("… waiting for confirmation");
            }
        })
        .await?;

    if status.is_confirmed {
        println!("✓ Transaction confirmed");
        println!("  {}", context.config.explorer_tx_url(&hash));
    }

    Ok(())
}

pub async fn handle_check(context: &AppContext) -> anyhow::Result<()> {
    let report = startup::validate_environment(context).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Startup validation failed");
    }

    Ok(())
}
