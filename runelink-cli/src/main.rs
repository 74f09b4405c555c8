use std::{process::ExitCode, time::Duration};

use clap::{Args, Parser, Subcommand};
use runelink_bitcoin_transactions::{constants::DUST_LIMIT, RuneTxError};
use runelink_indexer::{IndexerConfig, RuneId, RuneNetwork, DEFAULT_PAGE_SIZE};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(author, version, about = "Build unsigned Rune transactions", long_about = None)]
struct Cli {
    /// Bitcoin network: mainnet or testnet
    #[arg(long, env = "RUNELINK_NETWORK", default_value = "mainnet")]
    network: RuneNetwork,

    /// Indexer API key, sent as a bearer token
    #[arg(long, env = "RUNELINK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the indexer base URL
    #[arg(long, env = "RUNELINK_INDEXER_URL")]
    indexer_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "RUNELINK_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Page size for paginated indexer endpoints
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn indexer_config(&self) -> IndexerConfig {
        let mut config = IndexerConfig::new(self.network)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_page_size(self.page_size);

        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.clone());
        }
        if let Some(base_url) = &self.indexer_url {
            config = config.with_base_url(base_url.clone());
        }

        config
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the rune balances held by an address
    Balances {
        address: String,
    },
    /// Send runes to another address
    Transfer(TransferArgs),
    /// Mint units of an open rune
    Mint(MintArgs),
    /// Etch a new rune
    Etch(EtchArgs),
}

#[derive(Debug, Args)]
struct FundingArgs {
    /// Fee rate in sat/vB
    #[arg(long, default_value_t = 2.0)]
    fee_rate: f64,

    /// Allow outputs the indexer flags as low-fee to fund the transaction
    #[arg(long)]
    include_low_fee: bool,
}

#[derive(Debug, Args)]
struct TransferArgs {
    /// Address holding the runes and paying the fee
    #[arg(long)]
    from: String,

    #[arg(long)]
    to: String,

    /// Rune id as `block:tx`
    #[arg(long)]
    rune_id: RuneId,

    /// Amount in the rune's smallest unit
    #[arg(long)]
    amount: u128,

    /// Receives unsent runes, defaults to `--from`
    #[arg(long)]
    rune_change_address: Option<String>,

    /// Receives BTC change, defaults to `--from`
    #[arg(long)]
    btc_change_address: Option<String>,

    /// Value of each rune-carrying output
    #[arg(long, default_value_t = DUST_LIMIT)]
    postage: u64,

    #[command(flatten)]
    funding: FundingArgs,
}

#[derive(Debug, Args)]
struct MintArgs {
    #[arg(long)]
    address: String,

    #[arg(long)]
    rune_id: RuneId,

    #[command(flatten)]
    funding: FundingArgs,
}

#[derive(Debug, Args)]
struct EtchArgs {
    #[arg(long)]
    address: String,

    /// Rune name, `•` or `.` may separate words
    #[arg(long)]
    rune_name: String,

    #[arg(long)]
    symbol: Option<char>,

    #[arg(long, default_value_t = 0)]
    divisibility: u8,

    #[arg(long, default_value_t = 0)]
    premine: u128,

    /// Units per mint
    #[arg(long)]
    mint_amount: Option<u128>,

    /// Maximum number of mints
    #[arg(long)]
    mint_cap: Option<u128>,

    #[arg(long)]
    height_start: Option<u64>,

    #[arg(long)]
    height_end: Option<u64>,

    #[arg(long)]
    offset_start: Option<u64>,

    #[arg(long)]
    offset_end: Option<u64>,

    #[arg(long)]
    turbo: bool,

    #[command(flatten)]
    funding: FundingArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => match error.downcast_ref::<RuneTxError>() {
            Some(tx_error) => {
                eprintln!("error[{}]: {}", u32::from(tx_error.clone()), tx_error);
                ExitCode::from(2)
            }
            None => {
                eprintln!("error: {:#}", error);
                ExitCode::FAILURE
            }
        },
    }
}
