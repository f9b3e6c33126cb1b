//! Intent Executor CLI
//!
//! Command-line interface for quoting and executing intents.

use clap::{Parser, Subcommand};
use intent_executor::{
    AuditLog, ChainRegistry, Config, Error, ExecuteRequest, ExecutionOrchestrator,
    ExecutionResult, HttpConnector, HttpQuoteClient, QuoteRequest, QuoteService, Result, Secrets,
    SecureWallet,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "intent-exec")]
#[command(about = "Quote and execute cross-chain trading intents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

/// Trading intent flags shared by `quote` and `swap`
#[derive(clap::Args)]
struct IntentArgs {
    /// Chain the input tokens live on
    #[arg(long)]
    chain_id: u64,

    /// Input as TOKEN=AMOUNT (base units); repeatable
    #[arg(short, long = "input", required = true)]
    inputs: Vec<String>,

    /// Output as TOKEN=WEIGHT, weights summing to 1; repeatable
    #[arg(short, long = "output", required = true)]
    outputs: Vec<String>,

    /// Sender address (defaults to the configured key's address)
    #[arg(long)]
    sender: Option<String>,

    /// Receiver address (defaults to the sender)
    #[arg(long)]
    receiver: Option<String>,

    /// Max slippage as a fraction, e.g. 0.005
    #[arg(long)]
    slippage: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported chains
    Chains,

    /// Show current configuration (secrets are never printed)
    Config,

    /// Request a quote
    Quote {
        #[command(flatten)]
        intent: IntentArgs,
    },

    /// Execute a quote
    Execute {
        /// JSON file holding an execute request
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Quote id (overrides the request file)
        #[arg(short, long)]
        quote_id: Option<String>,

        /// Permit2 signature produced elsewhere
        #[arg(long)]
        permit2_signature: Option<String>,

        /// Bridge signature produced elsewhere
        #[arg(long)]
        bridge_signature: Option<String>,

        /// Chain id used when the permit2 payload has none
        #[arg(long)]
        source_chain_id: Option<u64>,

        /// Return the unsigned transaction instead of broadcasting
        #[arg(long)]
        no_broadcast: bool,
    },

    /// Quote, then execute the quote with the configured key
    Swap {
        #[command(flatten)]
        intent: IntentArgs,

        /// Return the unsigned transaction instead of broadcasting
        #[arg(long)]
        no_broadcast: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging; stdout carries the JSON results
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    let fmt_layer = if cli.log_json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    // Load config
    let config = if let Some(config_path) = &cli.config {
        let content =
            std::fs::read_to_string(config_path).map_err(|e| Error::Config(e.to_string()))?;
        serde_json::from_str::<Config>(&content).map_err(|e| Error::Config(e.to_string()))?
    } else {
        Config::default()
    }
    .with_env_overrides();
    let secrets = Secrets::from_env();

    match cli.command {
        Commands::Chains => list_chains(&config),
        Commands::Config => show_config(&config, &secrets),
        Commands::Quote { intent } => run_quote(&config, &secrets, intent).await,
        Commands::Execute {
            request,
            quote_id,
            permit2_signature,
            bridge_signature,
            source_chain_id,
            no_broadcast,
        } => {
            let mut request = match request {
                Some(path) => {
                    let content =
                        std::fs::read_to_string(&path).map_err(|e| Error::Config(e.to_string()))?;
                    serde_json::from_str::<ExecuteRequest>(&content)?
                }
                None => {
                    let quote_id = quote_id.clone().ok_or_else(|| {
                        Error::InvalidArgument("--quote-id or --request is required".into())
                    })?;
                    ExecuteRequest::new(quote_id)
                }
            };
            if let Some(quote_id) = quote_id {
                request.quote_id = quote_id;
            }
            if permit2_signature.is_some() {
                request.permit2_signature = permit2_signature;
            }
            if bridge_signature.is_some() {
                request.bridge_signature = bridge_signature;
            }
            if source_chain_id.is_some() {
                request.source_chain_id = source_chain_id;
            }
            if no_broadcast {
                request.broadcast = false;
            }

            let orchestrator = build_orchestrator(&config, &secrets)?;
            report(orchestrator.execute(request).await)
        }
        Commands::Swap {
            intent,
            no_broadcast,
        } => run_swap(&config, &secrets, intent, no_broadcast).await,
    }
}

fn list_chains(config: &Config) -> Result<()> {
    let registry = ChainRegistry::new(config.rpc_config());
    for chain in registry.iter() {
        let marker = if chain.chain_id == config.default_chain_id {
            " (default)"
        } else {
            ""
        };
        println!(
            "{:>7}  {:<10} {:<6} {}{}",
            chain.chain_id, chain.name, chain.native_currency.symbol, chain.explorer_url, marker
        );
    }
    Ok(())
}

fn show_config(config: &Config, secrets: &Secrets) -> Result<()> {
    let mut value = serde_json::to_value(config)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "private_key_configured".into(),
            secrets.private_key.is_some().into(),
        );
        obj.insert("api_key_configured".into(), secrets.api_key.is_some().into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn load_wallet(secrets: &Secrets) -> Result<Option<SecureWallet>> {
    match &secrets.private_key {
        Some(key) => {
            let wallet = SecureWallet::from_secret(key)?;
            tracing::info!(address = %wallet.address(), "Loaded wallet from PRIVATE_KEY");
            Ok(Some(wallet))
        }
        None => {
            tracing::debug!("No PRIVATE_KEY set");
            Ok(None)
        }
    }
}

fn build_orchestrator(config: &Config, secrets: &Secrets) -> Result<ExecutionOrchestrator> {
    let registry = Arc::new(ChainRegistry::new(config.rpc_config()));
    let quotes = Arc::new(HttpQuoteClient::new(&config.api, secrets.api_key.clone())?);

    let mut orchestrator = ExecutionOrchestrator::new(registry, quotes, Arc::new(HttpConnector))
        .with_default_chain(config.default_chain_id);

    if let Some(wallet) = load_wallet(secrets)? {
        orchestrator = orchestrator.with_wallet(Arc::new(wallet));
    }
    if let Some(path) = &config.audit_log_path {
        orchestrator = orchestrator.with_audit_log(AuditLog::new(path));
    }
    Ok(orchestrator)
}

fn parse_pairs<T: std::str::FromStr>(pairs: &[String], what: &str) -> Result<BTreeMap<String, T>> {
    pairs
        .iter()
        .map(|pair| {
            let (token, amount) = pair.split_once('=').ok_or_else(|| {
                Error::InvalidArgument(format!("Expected TOKEN=VALUE for {}, got '{}'", what, pair))
            })?;
            let amount = amount.trim().parse::<T>().map_err(|_| {
                Error::InvalidArgument(format!("Invalid {} value in '{}'", what, pair))
            })?;
            Ok((token.trim().to_string(), amount))
        })
        .collect()
}

fn quote_request(intent: IntentArgs, secrets: &Secrets) -> Result<QuoteRequest> {
    let sender = match intent.sender {
        Some(sender) => sender,
        None => load_wallet(secrets)?
            .map(|w| w.address().to_string())
            .ok_or_else(|| {
                Error::InvalidArgument("--sender is required without PRIVATE_KEY".into())
            })?,
    };

    let request = QuoteRequest {
        chain_id: intent.chain_id,
        sender,
        inputs: parse_pairs::<String>(&intent.inputs, "input")?,
        outputs: parse_pairs::<f64>(&intent.outputs, "output")?,
        slippage: intent.slippage,
        receiver: intent.receiver,
    };
    request.validate()?;
    Ok(request)
}

async fn run_quote(config: &Config, secrets: &Secrets, intent: IntentArgs) -> Result<()> {
    let request = quote_request(intent, secrets)?;
    let client = HttpQuoteClient::new(&config.api, secrets.api_key.clone())?;
    let quote = client.get_quote(&request).await?;
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn run_swap(
    config: &Config,
    secrets: &Secrets,
    intent: IntentArgs,
    no_broadcast: bool,
) -> Result<()> {
    let chain_id = intent.chain_id;
    let request = quote_request(intent, secrets)?;
    let client = HttpQuoteClient::new(&config.api, secrets.api_key.clone())?;
    let quote = client.get_quote(&request).await?;
    tracing::info!(quote_id = %quote.quote_id, "Executing fresh quote");

    let mut execute = ExecuteRequest::from_quote(&quote);
    execute.source_chain_id = Some(chain_id);
    execute.broadcast = !no_broadcast;

    let orchestrator = build_orchestrator(config, secrets)?;
    report(orchestrator.execute(execute).await)
}

/// Print the result; a failed run exits non-zero
fn report(result: ExecutionResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
