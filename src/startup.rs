use crate::adapters::{RpcChainClient, StaticDirectory};
use crate::config::{Config, SubmitMode};
use crate::ports::WalletSession;
use crate::services::submitter::{DirectTransferBackend, HttpTipBackend, TipBackend};
use crate::services::tracker::TransactionTracker;
use crate::use_cases::send_tip::{FlowSettings, TipFlow};
use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Process-wide wiring built once from [`Config`] and kept for the life of
/// the process.
pub struct AppContext {
    pub config: Config,
    pub http: reqwest::Client,
    pub chain: RpcChainClient,
    pub directory: Arc<StaticDirectory>,
}

static APP_CONTEXT: OnceLock<AppContext> = OnceLock::new();

/// Initializes the process-wide context. Later calls return the first
/// context and ignore their argument.
pub fn init(config: Config) -> Result<&'static AppContext> {
    if let Some(existing) = APP_CONTEXT.get() {
        tracing::warn!("App context already initialized; ignoring new config");
        return Ok(existing);
    }

    let context = AppContext::new(config)?;
    Ok(APP_CONTEXT.get_or_init(|| context))
}

pub fn context() -> Option<&'static AppContext> {
    APP_CONTEXT.get()
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("{}/{}", config.wallet.app_name, env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let chain = RpcChainClient::new(config.wallet.chain.rpc_url.clone());
        let directory = Arc::new(StaticDirectory::new(config.recipients.clone()));

        tracing::info!(
            app = %config.wallet.app_name,
            chain_id = config.wallet.chain.id,
            mode = ?config.submit_mode,
            "App context initialized"
        );

        Ok(Self {
            config,
            http,
            chain,
            directory,
        })
    }

    pub fn tracker(&self) -> TransactionTracker {
        TransactionTracker::new(Arc::new(self.chain.clone()), self.config.confirm_poll_interval)
            .with_required_confirmations(self.config.required_confirmations)
            .with_timeout(self.config.confirm_timeout)
    }

    pub fn backend(&self) -> Arc<dyn TipBackend> {
        match self.config.submit_mode {
            SubmitMode::Http => {
                let (base_url, path) = self.config.api_base_and_path();
                Arc::new(HttpTipBackend::new(
                    self.http.clone(),
                    base_url,
                    path,
                    self.config.wallet.chain.name.clone(),
                    self.config.token.address,
                ))
            }
            SubmitMode::Direct => Arc::new(DirectTransferBackend::new(
                self.directory.clone(),
                self.config.token.clone(),
            )),
        }
    }

    /// Tip flow for one streamer page, using the configured submission mode.
    pub fn flow_for(&self, recipient: &str, wallet: Arc<dyn WalletSession>) -> TipFlow {
        TipFlow::new(
            recipient,
            wallet,
            self.backend(),
            Some(self.tracker()),
            FlowSettings::from_config(&self.config),
        )
    }
}

pub struct ValidationReport {
    pub environment: bool,
    pub rpc: bool,
    pub tip_api: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.rpc && self.tip_api
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Configuration:      {}", status(self.environment));
        println!("Chain RPC:          {}", status(self.rpc));
        println!("Tip API:            {}", status(self.tip_api));

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(context: &AppContext) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        rpc: true,
        tip_api: true,
        errors: Vec::new(),
    };

    if let Err(e) = validate_config(&context.config) {
        report.environment = false;
        report.errors.push(format!("Configuration: {}", e));
    }

    if let Err(e) = validate_rpc(context).await {
        report.rpc = false;
        report.errors.push(format!("Chain RPC: {:#}", e));
    }

    if let Err(e) = validate_tip_api(context).await {
        report.tip_api = false;
        report.errors.push(format!("Tip API: {:#}", e));
    }

    report
}

fn validate_config(config: &Config) -> Result<()> {
    if config.explorer_host.trim().is_empty() {
        anyhow::bail!("EXPLORER_HOST is empty");
    }
    if config.min_tip_amount <= bigdecimal::BigDecimal::from(0) {
        anyhow::bail!("MIN_TIP_AMOUNT must be greater than 0");
    }
    if config.confirm_poll_interval.is_zero() {
        anyhow::bail!("CONFIRM_POLL_MS must be greater than 0");
    }
    if config.submit_mode == SubmitMode::Direct && config.recipients.is_empty() {
        anyhow::bail!("TIP_SUBMIT_MODE=direct needs TIP_RECIPIENTS to resolve streamers");
    }

    Ok(())
}

async fn validate_rpc(context: &AppContext) -> Result<()> {
    let head = context
        .chain
        .block_number()
        .await
        .context("Failed to query block number")?;
    tracing::debug!(head, "Chain RPC reachable");
    Ok(())
}

/// Any HTTP answer (including 402 or 405) means the API is reachable.
async fn validate_tip_api(context: &AppContext) -> Result<()> {
    let (base_url, _) = context.config.api_base_and_path();
    let response = context
        .http
        .get(&base_url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .context("Failed to connect to tip API")?;

    if response.status().is_server_error() {
        anyhow::bail!("Tip API returned status: {}", response.status());
    }

    Ok(())
}
