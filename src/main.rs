//! Lilixy Bridge CLI
//!
//! Command-line front end for the bridge core:
//! - browse chains and tokens
//! - fetch a quote (optionally reversed)
//! - submit a bridge transaction with the configured signer
//! - inspect and watch local transaction history

use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use tracing::info;

use lilixy_bridge::amount::{from_raw_amount, parse_raw};
use lilixy_bridge::api::{AggregatorApi, LifiClient};
use lilixy_bridge::catalog::{filter_chains, filter_tokens, CatalogLoader};
use lilixy_bridge::evm_wallet::LocalEvmWallet;
use lilixy_bridge::format::{format_amount, format_usd, short_address};
use lilixy_bridge::history::{explorer_tx_url, HistoryTracker};
use lilixy_bridge::prefs::Settings;
use lilixy_bridge::quote::QuoteState;
use lilixy_bridge::store::{JsonFileStore, KeyValueStore};
use lilixy_bridge::submit::SubmitOutcome;
use lilixy_bridge::types::{Quote, Side, TransactionRecord};
use lilixy_bridge::wallet::{NoWallet, WalletProvider};
use lilixy_bridge::{BridgeController, Config};

#[derive(Parser)]
#[command(name = "lilixy")]
#[command(about = "Cross-chain bridge client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args, Clone)]
struct RouteArgs {
    /// Source chain id (default: Ethereum)
    #[arg(long)]
    from_chain: Option<u64>,

    /// Destination chain id (default: Polygon)
    #[arg(long)]
    to_chain: Option<u64>,

    /// Source token symbol or address (default: chain's preferred token)
    #[arg(long)]
    from_token: Option<String>,

    /// Destination token symbol or address
    #[arg(long)]
    to_token: Option<String>,

    /// Amount in source token units, e.g. 1.5
    #[arg(short, long)]
    amount: Option<String>,

    /// Recipient address on the destination chain
    #[arg(long)]
    recipient: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported mainnet chains
    Chains {
        /// Filter by name
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List tokens on a chain
    Tokens {
        #[arg(short, long)]
        chain: u64,

        /// Filter by symbol, name, or address
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Look up a token by contract address
    Token {
        #[arg(short, long)]
        chain: u64,

        #[arg(short, long)]
        address: String,
    },

    /// Fetch a bridge quote
    Quote {
        #[command(flatten)]
        route: RouteArgs,

        /// Also show the quote for the reversed direction
        #[arg(long)]
        reverse: bool,
    },

    /// Quote and submit a bridge transaction with the configured wallet
    Bridge {
        #[command(flatten)]
        route: RouteArgs,

        /// Use a percentage (25, 50, 75, 100) of the source balance instead of --amount
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        percent: Option<u8>,
    },

    /// Show local transaction history
    History {
        /// Keep polling pending transactions until Ctrl+C
        #[arg(short, long)]
        watch: bool,
    },

    /// Re-check the status of pending transactions once
    Status,

    /// Query a token balance
    Balance {
        #[arg(short, long)]
        chain: u64,

        #[arg(short, long)]
        token: String,

        /// Wallet address (default: configured wallet)
        #[arg(short, long)]
        wallet: Option<String>,
    },

    /// Delete all local transaction history
    ClearHistory,

    /// Show or change display settings
    Settings {
        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        theme: Option<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;
    info!(api = %config.api_url, data_dir = ?config.data_dir, "Configuration loaded");

    let api: Arc<dyn AggregatorApi> =
        Arc::new(LifiClient::new(&config).wrap_err("Failed to create API client")?);
    let store: Arc<dyn KeyValueStore> = Arc::new(
        JsonFileStore::open(&config.data_dir).wrap_err("Failed to open data directory")?,
    );

    match cli.command {
        Commands::Chains { filter } => {
            let chains = CatalogLoader::new(api).load_chains().await?;
            for chain in filter_chains(&chains, filter.as_deref().unwrap_or("")) {
                println!("{:>10}  {}", chain.id, chain.name);
            }
        }

        Commands::Tokens { chain, filter } => {
            let catalog = CatalogLoader::new(api);
            let list = catalog.load_tokens(chain).await?;
            let query = filter.unwrap_or_default();
            let found = catalog.search_token(chain, &query, &list.tokens).await;
            for token in filter_tokens(&list.tokens, &query, found.as_ref()) {
                let marker = if list.default.as_ref() == Some(&token) { "*" } else { " " };
                println!("{} {:<10} {:<44} {}", marker, token.symbol, token.address, token.name);
            }
        }

        Commands::Token { chain, address } => match api.token(chain, &address).await? {
            Some(token) => println!(
                "{} ({}) decimals={} address={}",
                token.symbol, token.name, token.decimals, token.address
            ),
            None => println!("Token not found"),
        },

        Commands::Quote { route, reverse } => {
            let mut controller = controller(&config, api, Arc::new(NoWallet), store);
            prepare_route(&mut controller, &route).await?;
            let quote = controller_quote(&mut controller).await?;
            print_quote(&controller, quote);

            if reverse {
                controller.reverse();
                controller.wait_for_tokens().await;
                let quote = controller_quote(&mut controller).await?;
                println!();
                println!("Reversed:");
                print_quote(&controller, quote);
            }
        }

        Commands::Bridge { route, percent } => {
            let provider = local_wallet(&config)?;
            let mut controller = controller(&config, api, provider, store);
            prepare_route(&mut controller, &route).await?;
            controller.connect_wallet().await?;

            if let Some(percent) = percent {
                wait_for_balance(&mut controller, &config).await?;
                controller.set_percent(percent)?;
            }

            let quote = controller_quote(&mut controller).await?;
            print_quote(&controller, quote);

            match controller.submit().await? {
                SubmitOutcome::ConnectionRequested => {
                    println!("Wallet connected; run the command again to submit");
                }
                SubmitOutcome::Submitted(record) => print_record(&record),
            }
        }

        Commands::History { watch } => {
            let mut history = HistoryTracker::load(store);
            if history.records().is_empty() {
                println!("No transactions");
                return Ok(());
            }
            history.records().iter().for_each(print_record);

            if watch {
                let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
                tokio::spawn(async move {
                    wait_for_shutdown_signal().await;
                    let _ = shutdown_tx.send(()).await;
                });
                history
                    .run(api.as_ref(), config.history_poll_interval(), shutdown_rx)
                    .await?;
            }
        }

        Commands::Status => {
            let mut history = HistoryTracker::load(store);
            let changed = history.refresh(api.as_ref()).await?;
            history.records().iter().for_each(print_record);
            println!("{} status change(s)", changed);
        }

        Commands::Balance {
            chain,
            token,
            wallet,
        } => {
            let wallet = match wallet {
                Some(w) => w,
                None => local_wallet(&config)?
                    .request_accounts()
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| eyre!("Wallet exposes no account"))?,
            };
            let raw = api.balance(chain, &token, &wallet).await?;
            let decimals = api
                .token(chain, &token)
                .await?
                .map(|t| t.decimals)
                .unwrap_or(18);
            println!("{}", format_amount(&from_raw_amount(raw, decimals, decimals)));
        }

        Commands::ClearHistory => {
            let mut history = HistoryTracker::load(store);
            let count = history.records().len();
            history.clear()?;
            println!("Removed {} transaction(s)", count);
        }

        Commands::Settings { language, theme } => {
            let mut settings = Settings::load(store.as_ref());
            if language.is_some() || theme.is_some() {
                if let Some(language) = language {
                    settings.language = language;
                }
                if let Some(theme) = theme {
                    settings.theme = theme;
                }
                settings.save(store.as_ref())?;
            }
            println!("language={} theme={}", settings.language, settings.theme);
        }
    }

    Ok(())
}

fn controller(
    config: &Config,
    api: Arc<dyn AggregatorApi>,
    provider: Arc<dyn WalletProvider>,
    store: Arc<dyn KeyValueStore>,
) -> BridgeController {
    BridgeController::new(config, api, provider, store)
}

fn local_wallet(config: &Config) -> Result<Arc<dyn WalletProvider>> {
    let key = config
        .wallet_private_key
        .as_deref()
        .ok_or_else(|| eyre!("WALLET_PRIVATE_KEY is not set"))?;
    let initial_chain = config.rpc_urls.keys().min().copied().unwrap_or(1);
    Ok(Arc::new(LocalEvmWallet::new(
        key,
        config.rpc_urls.clone(),
        initial_chain,
    )?))
}

/// Load the catalog and apply the route arguments to the form.
async fn prepare_route(controller: &mut BridgeController, route: &RouteArgs) -> Result<()> {
    controller.init().await?;

    for (side, chain) in [(Side::From, route.from_chain), (Side::To, route.to_chain)] {
        if let Some(id) = chain {
            if !controller.select_chain(side, id) {
                return Err(eyre!("Unknown {} chain {}", side.as_str(), id));
            }
        }
    }
    controller.wait_for_tokens().await;
    if let Some(error) = &controller.state().error {
        return Err(eyre!("{}", error));
    }

    for (side, token) in [
        (Side::From, route.from_token.as_deref()),
        (Side::To, route.to_token.as_deref()),
    ] {
        if let Some(query) = token {
            if !controller.select_token(side, query) {
                return Err(eyre!("Unknown {} token {}", side.as_str(), query));
            }
        }
    }

    if let Some(recipient) = &route.recipient {
        controller.set_recipient(recipient);
    }
    if let Some(amount) = &route.amount {
        controller.set_amount(amount);
    }
    Ok(())
}

async fn controller_quote(controller: &mut BridgeController) -> Result<Quote> {
    match controller.wait_for_quote().await {
        QuoteState::Ready(quote) => Ok(quote.clone()),
        QuoteState::NoRoute(message) => Err(eyre!("{}", message)),
        QuoteState::Idle | QuoteState::Pending => Err(eyre!("Enter an amount to get a quote")),
    }
}

async fn wait_for_balance(controller: &mut BridgeController, config: &Config) -> Result<()> {
    tokio::time::timeout(config.http_timeout(), async {
        while controller.source_balance().is_none() {
            if !controller.step().await {
                break;
            }
        }
    })
    .await
    .wrap_err("Timed out waiting for balance")?;
    Ok(())
}

fn print_quote(controller: &BridgeController, quote: Quote) {
    let state = controller.state();
    let (Some(from), Some(to)) = (state.from.token.as_ref(), state.to.token.as_ref()) else {
        return;
    };
    let received = parse_raw(&quote.estimate.to_amount)
        .map(|raw| from_raw_amount(raw, to.decimals, 6))
        .unwrap_or_default();

    println!(
        "{} {} -> {} {} via {}",
        format_amount(&state.amount),
        from.symbol,
        format_amount(&received),
        to.symbol,
        quote.tool_details.name
    );
    if let Some(usd) = format_usd(&received, to.price_usd.as_deref()) {
        println!("  value:    {}", usd);
    }
    println!("  gas:      ${:.2}", quote.estimate.total_gas_usd());
    if let Some(seconds) = quote.estimate.execution_duration {
        println!("  duration: ~{}s", seconds.round() as u64);
    }
    if let Some(balance) = controller.source_balance() {
        println!("  balance:  {} {}", format_amount(&balance), from.symbol);
    }
}

fn print_record(record: &TransactionRecord) {
    let when = chrono::DateTime::from_timestamp_millis(record.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{}  {:<8} {} {} {} -> {}  {}",
        when,
        record.status,
        format_amount(&record.amount),
        record.from_token.symbol,
        record.from_chain.name,
        record.to_chain.name,
        short_address(&record.hash),
    );
    if let Some(url) = explorer_tx_url(&record.from_chain, &record.hash) {
        println!("    {}", url);
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "info,lilixy_bridge=debug"
    } else {
        "warn,lilixy_bridge=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
