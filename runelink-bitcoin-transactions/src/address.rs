use std::str::FromStr;

use bitcoin::{Address, ScriptBuf};
use runelink_indexer::RuneNetwork;

use crate::error::RuneTxError;

/// Parses `address` and checks it belongs to `network`, returning its output script.
pub fn script_for_address(address: &str, network: RuneNetwork) -> Result<ScriptBuf, RuneTxError> {
    let invalid = |reason: String| RuneTxError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let unchecked = Address::from_str(address).map_err(|e| invalid(e.to_string()))?;
    let checked = unchecked
        .require_network(network.to_bitcoin_network())
        .map_err(|e| invalid(e.to_string()))?;

    Ok(checked.script_pubkey())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAINNET_P2WPKH: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const TESTNET_P2WPKH: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

    #[test]
    fn returns_script_for_matching_network() {
        let script = script_for_address(MAINNET_P2WPKH, RuneNetwork::Mainnet).unwrap();
        assert!(script.is_p2wpkh());
    }

    #[test]
    fn rejects_other_network() {
        assert!(matches!(
            script_for_address(TESTNET_P2WPKH, RuneNetwork::Mainnet),
            Err(RuneTxError::InvalidAddress { .. })
        ));
        assert!(script_for_address(TESTNET_P2WPKH, RuneNetwork::Testnet).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let error = script_for_address("not-an-address", RuneNetwork::Mainnet).unwrap_err();
        assert!(matches!(
            error,
            RuneTxError::InvalidAddress { address, .. } if address == "not-an-address"
        ));
    }
}
