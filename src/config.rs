use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::domain::{Address, TxHash};

pub mod token;

pub use token::TokenConfig;

pub const DEFAULT_TIP_API_ENDPOINT: &str = "https://api.streamertip.app/tip";

/// How a tip reaches the streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// POST to the tip API through the x402 payment client.
    Http,
    /// ERC-20 transfer signed by the wallet and tracked on chain.
    Direct,
}

impl FromStr for SubmitMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" | "x402" => Ok(SubmitMode::Http),
            "direct" | "onchain" => Ok(SubmitMode::Direct),
            other => anyhow::bail!("TIP_SUBMIT_MODE must be 'http' or 'direct', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub id: u64,
    /// Network name as used in x402 challenges, e.g. `base`.
    pub name: String,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletPreference {
    All,
    SmartWalletOnly,
    EoaOnly,
}

impl FromStr for WalletPreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" => Ok(WalletPreference::All),
            "smartWalletOnly" => Ok(WalletPreference::SmartWalletOnly),
            "eoaOnly" => Ok(WalletPreference::EoaOnly),
            other => anyhow::bail!("unknown wallet preference '{}'", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorConfig {
    CoinbaseWallet { preference: WalletPreference },
}

/// Wallet wiring handed to whoever owns the wallet session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    pub app_name: String,
    pub chain: ChainConfig,
    pub connectors: Vec<ConnectorConfig>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tip_api_endpoint: String,
    pub submit_mode: SubmitMode,
    pub wallet: WalletConfig,
    pub token: TokenConfig,
    pub explorer_host: String,
    pub min_tip_amount: BigDecimal,
    pub tip_presets: Vec<BigDecimal>,
    pub success_reset: Duration,
    pub error_reset: Duration,
    pub settle_delay: Duration,
    pub confirm_poll_interval: Duration,
    pub required_confirmations: u64,
    pub confirm_timeout: Option<Duration>,
    pub recipients: Vec<(String, Address)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let tip_api_endpoint = var("TIP_API_ENDPOINT", DEFAULT_TIP_API_ENDPOINT);
        Url::parse(&tip_api_endpoint).context("TIP_API_ENDPOINT is not a valid URL")?;

        let rpc_url = var("CHAIN_RPC_URL", "https://mainnet.base.org");
        Url::parse(&rpc_url).context("CHAIN_RPC_URL is not a valid URL")?;

        let preference = var("WALLET_PREFERENCE", "smartWalletOnly").parse()?;

        let token = TokenConfig {
            address: var("TOKEN_ADDRESS", token::DEFAULT_TOKEN_ADDRESS)
                .parse()
                .context("TOKEN_ADDRESS is not a valid address")?,
            decimals: var("TOKEN_DECIMALS", "6").parse()?,
            symbol: var("TOKEN_SYMBOL", token::DEFAULT_TOKEN_SYMBOL),
        };
        if token.decimals > 30 {
            anyhow::bail!("TOKEN_DECIMALS must be at most 30");
        }

        let confirm_poll_interval = Duration::from_millis(var("CONFIRM_POLL_MS", "2000").parse()?);
        if confirm_poll_interval.is_zero() {
            anyhow::bail!("CONFIRM_POLL_MS must be greater than 0");
        }

        let min_tip_amount = BigDecimal::from_str(&var("MIN_TIP_AMOUNT", "0.1"))
            .context("MIN_TIP_AMOUNT is not a decimal")?;

        Ok(Config {
            tip_api_endpoint,
            submit_mode: var("TIP_SUBMIT_MODE", "http").parse()?,
            wallet: WalletConfig {
                app_name: var("APP_NAME", "StreamerTip"),
                chain: ChainConfig {
                    id: var("CHAIN_ID", "8453").parse()?,
                    name: var("CHAIN_NAME", "base"),
                    rpc_url,
                },
                connectors: vec![ConnectorConfig::CoinbaseWallet { preference }],
            },
            token,
            explorer_host: var("EXPLORER_HOST", "basescan.org"),
            min_tip_amount,
            tip_presets: parse_presets(&var("TIP_PRESETS", "0.1,1,5,10"))?,
            success_reset: Duration::from_secs(var("SUCCESS_RESET_SECS", "5").parse()?),
            error_reset: Duration::from_secs(var("ERROR_RESET_SECS", "8").parse()?),
            settle_delay: Duration::from_millis(var("SETTLE_DELAY_MS", "3000").parse()?),
            confirm_poll_interval,
            required_confirmations: var("REQUIRED_CONFIRMATIONS", "1").parse()?,
            confirm_timeout: lookup("CONFIRM_TIMEOUT_SECS")
                .map(|raw| raw.parse().map(Duration::from_secs))
                .transpose()?,
            recipients: parse_recipients(&var("TIP_RECIPIENTS", ""))?,
        })
    }

    /// Endpoint split into base URL and path, e.g. `https://host` + `/tip`.
    pub fn api_base_and_path(&self) -> (String, String) {
        match Url::parse(&self.tip_api_endpoint) {
            Ok(url) => {
                let path = match url.path() {
                    "" | "/" => "/tip".to_string(),
                    path => path.to_string(),
                };
                let base = self
                    .tip_api_endpoint
                    .trim_end_matches('/')
                    .trim_end_matches(path.as_str())
                    .to_string();
                (base, path)
            }
            Err(_) => (self.tip_api_endpoint.clone(), "/tip".to_string()),
        }
    }

    pub fn explorer_tx_url(&self, hash: &TxHash) -> String {
        explorer_tx_url(&self.explorer_host, hash)
    }
}

pub fn explorer_tx_url(host: &str, hash: &TxHash) -> String {
    format!("https://{}/tx/{}", host.trim_end_matches('/'), hash)
}

fn parse_presets(raw: &str) -> anyhow::Result<Vec<BigDecimal>> {
    let presets = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(BigDecimal::from_str)
        .collect::<Result<Vec<_>, _>>()
        .context("TIP_PRESETS must be a comma-separated list of decimals")?;

    if presets.is_empty() || presets.iter().any(|p| p <= &BigDecimal::from(0)) {
        anyhow::bail!("TIP_PRESETS must contain at least one positive amount");
    }

    Ok(presets)
}

fn parse_recipients(raw: &str) -> anyhow::Result<Vec<(String, Address)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> anyhow::Result<(String, Address)> {
            let (name, address) = entry
                .split_once('=')
                .with_context(|| format!("TIP_RECIPIENTS entry '{}' must be name=0xaddress", entry))?;
            let address = address
                .trim()
                .parse::<Address>()
                .with_context(|| format!("invalid address for '{}'", name.trim()))?;
            Ok((name.trim().to_string(), address))
        })
        .collect()
}
