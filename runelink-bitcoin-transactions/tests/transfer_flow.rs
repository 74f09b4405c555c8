use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use bitcoin::{hashes::Hash, Txid};
use ordinals::{Artifact, Runestone};
use runelink_bitcoin_transactions::{
    fee::estimate_fee_for, BuilderConfig, EtchingRequest, FeeRate, MintRequest, MintTerms,
    RuneTxError, TransactionBuilder, TransferRequest,
};
use runelink_indexer::{
    AvailableUtxo, RuneBalance, RuneId, RuneNetwork, Utxo, UtxoProvider, UtxoWithRunes,
};

const SENDER: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
const RECIPIENT: &str = "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3";
const RUNE_ID: RuneId = RuneId {
    block: 840_000,
    tx: 3,
};

#[derive(Default)]
struct InMemoryProvider {
    rune_utxos: HashMap<String, Vec<UtxoWithRunes>>,
    available: HashMap<String, Vec<AvailableUtxo>>,
    low_fee_requests: Mutex<Vec<bool>>,
}

#[async_trait]
impl UtxoProvider for InMemoryProvider {
    async fn rune_utxos(&self, address: &str, rune_id: &RuneId) -> Vec<UtxoWithRunes> {
        self.rune_utxos
            .get(address)
            .map(|utxos| {
                utxos
                    .iter()
                    .filter(|utxo| utxo.holds_rune(rune_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn available_utxos(&self, address: &str, include_low_fee: bool) -> Vec<AvailableUtxo> {
        self.low_fee_requests.lock().unwrap().push(include_low_fee);
        self.available.get(address).cloned().unwrap_or_default()
    }
}

fn rune_utxo(txid_byte: u8, value: u64, amount: u128) -> UtxoWithRunes {
    UtxoWithRunes {
        utxo: Utxo::new(Txid::from_byte_array([txid_byte; 32]), 0, value),
        runes: vec![RuneBalance {
            rune_id: RUNE_ID,
            rune_name: "UNCOMMONGOODS".to_string(),
            spaced_rune_name: "UNCOMMON•GOODS".to_string(),
            symbol: "⧉".to_string(),
            divisibility: 0,
            amount,
        }],
        height: 840_100,
        confirmations: 3,
        address: SENDER.to_string(),
    }
}

fn plain_utxo(txid_byte: u8, value: u64) -> AvailableUtxo {
    AvailableUtxo {
        utxo: Utxo::new(Txid::from_byte_array([txid_byte; 32]), 1, value),
        address: SENDER.to_string(),
        height: 840_100,
        is_spent: false,
        is_low_fee: false,
        inscriptions_count: 0,
    }
}

fn provider(rune_utxos: Vec<UtxoWithRunes>, available: Vec<AvailableUtxo>) -> InMemoryProvider {
    InMemoryProvider {
        rune_utxos: HashMap::from([(SENDER.to_string(), rune_utxos)]),
        available: HashMap::from([(SENDER.to_string(), available)]),
        ..Default::default()
    }
}

fn transfer(amount: u128) -> TransferRequest {
    TransferRequest::new(
        SENDER,
        RECIPIENT,
        RUNE_ID,
        amount,
        FeeRate::try_from(2.0).unwrap(),
    )
}

#[tokio::test]
async fn transfer_of_part_of_a_single_output() {
    let builder = TransactionBuilder::new(
        provider(vec![rune_utxo(1, 3_000, 1_000)], vec![]),
        BuilderConfig::default(),
    );

    let unsigned = builder.create_transfer_psbt(&transfer(400)).await.unwrap();
    let tx = unsigned.unsigned_tx();

    let fee_rate = FeeRate::try_from(2.0).unwrap();
    let fee = estimate_fee_for(1, 4, unsigned.message_len, &fee_rate).unwrap();
    assert_eq!(unsigned.fee, fee);
    assert_eq!(tx.input.len(), 1);
    assert_eq!(tx.output.len(), 4);
    assert_eq!(tx.output[1].value.to_sat(), 546);
    assert_eq!(tx.output[2].value.to_sat(), 546);
    assert_eq!(tx.output[3].value.to_sat(), 3_000 - fee - 1_092);

    let Some(Artifact::Runestone(runestone)) = Runestone::decipher(tx) else {
        panic!("expected runestone");
    };
    let amounts: Vec<(u128, u32)> = runestone
        .edicts
        .iter()
        .map(|edict| (edict.amount, edict.output))
        .collect();
    assert_eq!(amounts, vec![(400, 1), (600, 2)]);
}

#[tokio::test]
async fn transfer_from_a_thin_output_reports_the_shortfall() {
    let builder = TransactionBuilder::new(
        provider(vec![rune_utxo(1, 2_000, 1_000)], vec![]),
        BuilderConfig::default(),
    );

    let error = builder
        .create_transfer_psbt(&transfer(400))
        .await
        .unwrap_err();

    let RuneTxError::InsufficientFunds {
        required,
        available,
    } = error
    else {
        panic!("expected insufficient funds, got {:?}", error);
    };
    assert_eq!(available, 2_000);
    assert!(error.shortfall_sats().unwrap() > 0);
    assert_eq!(required - available, error.shortfall_sats().unwrap());
}

#[tokio::test]
async fn transfer_draws_fee_inputs_when_rune_output_is_postage_only() {
    let builder = TransactionBuilder::new(
        provider(
            vec![rune_utxo(1, 546, 1_000)],
            vec![plain_utxo(2, 700), plain_utxo(3, 20_000)],
        ),
        BuilderConfig::default(),
    );

    let unsigned = builder.create_transfer_psbt(&transfer(1_000)).await.unwrap();
    let tx = unsigned.unsigned_tx();

    assert_eq!(tx.input.len(), 2);
    assert_eq!(tx.input[1].previous_output, plain_utxo(3, 20_000).utxo.outpoint());
    assert_eq!(
        unsigned.total_input() - unsigned.total_output(),
        unsigned.fee
    );
    assert!(tx.output[3].value.to_sat() >= 546);
    assert_eq!(tx.output[2].value.to_sat(), 546);
    assert_eq!(*builder.provider().low_fee_requests.lock().unwrap(), vec![false]);

    // The whole balance moves, so the change edict carries nothing but stays encoded.
    let Some(Artifact::Runestone(runestone)) = Runestone::decipher(tx) else {
        panic!("expected runestone");
    };
    let amounts: Vec<(u128, u32)> = runestone
        .edicts
        .iter()
        .map(|edict| (edict.amount, edict.output))
        .collect();
    assert_eq!(amounts, vec![(1_000, 1), (0, 2)]);
}

#[tokio::test]
async fn thin_output_is_topped_up_from_spare_sats() {
    let builder = TransactionBuilder::new(
        provider(
            vec![rune_utxo(1, 2_000, 1_000)],
            vec![plain_utxo(2, 100_000)],
        ),
        BuilderConfig::default(),
    );

    let unsigned = builder.create_transfer_psbt(&transfer(400)).await.unwrap();
    let tx = unsigned.unsigned_tx();

    let fee_rate = FeeRate::try_from(2.0).unwrap();
    let fee = estimate_fee_for(2, 4, unsigned.message_len, &fee_rate).unwrap();
    assert_eq!(unsigned.fee, fee);
    assert_eq!(tx.input.len(), 2);
    assert_eq!(tx.output[3].value.to_sat(), 102_000 - fee - 1_092);
}

#[tokio::test]
async fn unknown_sender_has_no_rune_balance() {
    let builder = TransactionBuilder::new(InMemoryProvider::default(), BuilderConfig::default());

    assert_eq!(
        builder.create_transfer_psbt(&transfer(1)).await,
        Err(RuneTxError::InsufficientRuneBalance {
            rune_id: RUNE_ID,
            required: 1,
            available: 0
        })
    );
}

#[tokio::test]
async fn etch_and_mint_use_spendable_outputs() {
    let mut inscribed = plain_utxo(4, 50_000);
    inscribed.inscriptions_count = 1;
    let builder = TransactionBuilder::new(
        provider(vec![], vec![plain_utxo(5, 10_000), inscribed]),
        BuilderConfig::new(RuneNetwork::Mainnet),
    );

    let funding = builder.spendable_utxos(SENDER).await;
    assert_eq!(funding, vec![plain_utxo(5, 10_000)]);

    let etching = builder
        .create_etching_psbt(
            &funding,
            &EtchingRequest {
                address: SENDER.to_string(),
                rune_name: "UNCOMMON•GOODS".to_string(),
                symbol: Some('⧉'),
                divisibility: 0,
                premine: 0,
                terms: Some(MintTerms {
                    amount: Some(1),
                    cap: Some(u128::from(u64::MAX)),
                    ..Default::default()
                }),
                turbo: true,
                fee_rate: FeeRate::try_from(5.0).unwrap(),
            },
        )
        .unwrap();
    assert_eq!(etching.unsigned_tx().output.len(), 2);
    assert_eq!(
        etching.unsigned_tx().output[1].value.to_sat(),
        10_000 - etching.fee
    );

    let mint = builder
        .create_mint_psbt(
            &funding,
            &MintRequest {
                address: SENDER.to_string(),
                rune_id: RUNE_ID,
                fee_rate: FeeRate::try_from(5.0).unwrap(),
            },
        )
        .unwrap();
    assert!(mint.to_base64().starts_with("cHNidP8"));
}
