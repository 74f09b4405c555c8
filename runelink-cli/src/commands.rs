use anyhow::{Context, Result};
use runelink_bitcoin_transactions::{
    constants::DUST_LIMIT, BuilderConfig, EtchingRequest, FeeRate, MintRequest, MintTerms,
    TransactionBuilder, TransferRequest, UnsignedRuneTransaction,
};
use runelink_indexer::{IndexerClient, RuneNetwork, UtxoFilter};
use tracing::info;

use crate::{Cli, Command, EtchArgs, FundingArgs, MintArgs, TransferArgs};

pub async fn run(cli: Cli) -> Result<()> {
    let client =
        IndexerClient::new(cli.indexer_config()).context("failed to create indexer client")?;
    info!(network = %cli.network, base_url = %client.config().base_url, "using indexer");

    let network = cli.network;
    match cli.command {
        Command::Balances { address } => balances(&client, &address).await,
        Command::Transfer(args) => {
            let config = builder_config(network, &args.funding, args.postage);
            transfer(client, config, args).await
        }
        Command::Mint(args) => {
            let config = builder_config(network, &args.funding, DUST_LIMIT);
            mint(client, config, args).await
        }
        Command::Etch(args) => {
            let config = builder_config(network, &args.funding, DUST_LIMIT);
            etch(client, config, args).await
        }
    }
}

fn builder_config(network: RuneNetwork, funding: &FundingArgs, postage: u64) -> BuilderConfig {
    BuilderConfig::new(network)
        .with_postage(postage)
        .with_utxo_filter(UtxoFilter::default().with_low_fee(funding.include_low_fee))
}

fn print_transaction(unsigned: &UnsignedRuneTransaction) -> Result<()> {
    let summary = serde_json::to_string_pretty(&unsigned.summary())?;
    println!("{}", summary);
    Ok(())
}

async fn balances(client: &IndexerClient, address: &str) -> Result<()> {
    let balances = client
        .try_get_rune_balances(address)
        .await
        .with_context(|| format!("failed to fetch rune balances of {}", address))?;

    if balances.is_empty() {
        println!("no runes held by {}", address);
    }
    for balance in balances {
        println!(
            "{}\t{}\t{}\t{}",
            balance.rune_id, balance.spaced_rune_name, balance.amount, balance.symbol
        );
    }

    Ok(())
}

async fn transfer(client: IndexerClient, config: BuilderConfig, args: TransferArgs) -> Result<()> {
    let builder = TransactionBuilder::new(client, config);

    let mut request = TransferRequest::new(
        args.from,
        args.to,
        args.rune_id,
        args.amount,
        FeeRate::try_from(args.funding.fee_rate)?,
    );
    request.rune_change_address = args.rune_change_address;
    request.btc_change_address = args.btc_change_address;

    let unsigned = builder.create_transfer_psbt(&request).await?;
    print_transaction(&unsigned)
}

async fn mint(client: IndexerClient, config: BuilderConfig, args: MintArgs) -> Result<()> {
    let builder = TransactionBuilder::new(client, config);
    let funding = builder.spendable_utxos(&args.address).await;

    let request = MintRequest {
        address: args.address,
        rune_id: args.rune_id,
        fee_rate: FeeRate::try_from(args.funding.fee_rate)?,
    };

    let unsigned = builder.create_mint_psbt(&funding, &request)?;
    print_transaction(&unsigned)
}

async fn etch(client: IndexerClient, config: BuilderConfig, args: EtchArgs) -> Result<()> {
    let builder = TransactionBuilder::new(client, config);
    let funding = builder.spendable_utxos(&args.address).await;

    let request = EtchingRequest {
        address: args.address,
        rune_name: args.rune_name,
        symbol: args.symbol,
        divisibility: args.divisibility,
        premine: args.premine,
        terms: Some(MintTerms {
            amount: args.mint_amount,
            cap: args.mint_cap,
            height_start: args.height_start,
            height_end: args.height_end,
            offset_start: args.offset_start,
            offset_end: args.offset_end,
        }),
        turbo: args.turbo,
        fee_rate: FeeRate::try_from(args.funding.fee_rate)?,
    };

    let unsigned = builder.create_etching_psbt(&funding, &request)?;
    print_transaction(&unsigned)
}
