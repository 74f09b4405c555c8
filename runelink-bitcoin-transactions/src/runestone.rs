//! Runestone messages and the codec boundary.
//!
//! The builders describe *what* a transaction says ([`RunestoneMessage`]) and hand it to a
//! [`RunestoneCodec`]. Codecs are free to return raw bytes, a finished script, or a JSON
//! rendering of the bytes; [`normalize_encoded_bytes`] turns any of those into the payload
//! that is then wrapped as `OP_RETURN OP_13 <pushes>` by [`build_op_return_script`].

use std::collections::BTreeMap;

use bitcoin::{
    opcodes::all::{OP_PUSHNUM_13, OP_RETURN},
    script::{Builder, Instruction, PushBytes},
    Script, ScriptBuf,
};
use runelink_indexer::RuneId;
use serde_json::Value;

use crate::{constants::MAX_PUSH_SIZE, error::EncodingError};

/// Transfers `amount` of `id` to output index `output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edict {
    pub id: RuneId,
    pub amount: u128,
    pub output: u32,
}

/// Open-mint terms. Heights are absolute, offsets relative to the etching block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Terms {
    pub amount: Option<u128>,
    pub cap: Option<u128>,
    pub height: (Option<u64>, Option<u64>),
    pub offset: (Option<u64>, Option<u64>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EtchingMessage {
    /// Validated name, possibly containing `•` spacers.
    pub rune_name: String,
    pub symbol: Option<char>,
    pub divisibility: Option<u8>,
    pub premine: Option<u128>,
    pub terms: Option<Terms>,
    pub turbo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunestoneMessage {
    Etching(EtchingMessage),
    Mint(RuneId),
    Transfer {
        edicts: Vec<Edict>,
        /// Output receiving runes not claimed by any edict.
        pointer: Option<u32>,
    },
}

/// What a codec may hand back.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedRunestone {
    Bytes(Vec<u8>),
    /// A complete `OP_RETURN OP_13` script.
    Script(ScriptBuf),
    Json(Value),
}

pub trait RunestoneCodec {
    fn encode(&self, message: &RunestoneMessage) -> Result<EncodedRunestone, EncodingError>;
}

/// Codec backed by the `ordinals` crate's reference encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinalsCodec;

impl RunestoneCodec for OrdinalsCodec {
    fn encode(&self, message: &RunestoneMessage) -> Result<EncodedRunestone, EncodingError> {
        let runestone = to_ordinals_runestone(message)?;
        Ok(EncodedRunestone::Script(runestone.encipher()))
    }
}

fn to_ordinals_rune_id(id: &RuneId) -> ordinals::RuneId {
    ordinals::RuneId {
        block: id.block,
        tx: id.tx,
    }
}

fn to_ordinals_runestone(message: &RunestoneMessage) -> Result<ordinals::Runestone, EncodingError> {
    let runestone = match message {
        RunestoneMessage::Etching(etching) => {
            let spaced_rune = etching
                .rune_name
                .parse::<ordinals::SpacedRune>()
                .map_err(|e| EncodingError::InvalidMessage(e.to_string()))?;

            ordinals::Runestone {
                etching: Some(ordinals::Etching {
                    divisibility: etching.divisibility,
                    premine: etching.premine,
                    rune: Some(spaced_rune.rune),
                    spacers: (spaced_rune.spacers != 0).then_some(spaced_rune.spacers),
                    symbol: etching.symbol,
                    terms: etching.terms.map(|terms| ordinals::Terms {
                        amount: terms.amount,
                        cap: terms.cap,
                        height: terms.height,
                        offset: terms.offset,
                    }),
                    turbo: etching.turbo,
                }),
                ..Default::default()
            }
        }
        RunestoneMessage::Mint(rune_id) => ordinals::Runestone {
            mint: Some(to_ordinals_rune_id(rune_id)),
            ..Default::default()
        },
        RunestoneMessage::Transfer { edicts, pointer } => ordinals::Runestone {
            edicts: edicts
                .iter()
                .map(|edict| ordinals::Edict {
                    id: to_ordinals_rune_id(&edict.id),
                    amount: edict.amount,
                    output: edict.output,
                })
                .collect(),
            pointer: *pointer,
            ..Default::default()
        },
    };

    Ok(runestone)
}

/// Converts any codec output into the raw runestone payload.
///
/// # Errors
/// * [`EncodingError::Empty`] when the payload has no bytes.
/// * [`EncodingError::UnrecognisedShape`] when a JSON value is neither a byte array, an
///   index-keyed object, a `{data | bytes}` wrapper nor a hex string.
pub fn normalize_encoded_bytes(raw: EncodedRunestone) -> Result<Vec<u8>, EncodingError> {
    let bytes = match raw {
        EncodedRunestone::Bytes(bytes) => bytes,
        EncodedRunestone::Script(script) => payload_from_script(&script)?,
        EncodedRunestone::Json(value) => bytes_from_json(&value, 0)?,
    };

    if bytes.is_empty() {
        return Err(EncodingError::Empty);
    }

    Ok(bytes)
}

fn payload_from_script(script: &Script) -> Result<Vec<u8>, EncodingError> {
    let mut instructions = script.instructions();

    match instructions.next() {
        Some(Ok(Instruction::Op(op))) if op == OP_RETURN => {}
        _ => return Err(EncodingError::NotARunestoneScript),
    }
    match instructions.next() {
        Some(Ok(Instruction::Op(op))) if op == OP_PUSHNUM_13 => {}
        _ => return Err(EncodingError::NotARunestoneScript),
    }

    let mut payload = Vec::new();
    for instruction in instructions {
        match instruction.map_err(|e| EncodingError::MalformedScript(e.to_string()))? {
            Instruction::PushBytes(push) => payload.extend_from_slice(push.as_bytes()),
            Instruction::Op(_) => return Err(EncodingError::NotARunestoneScript),
        }
    }

    Ok(payload)
}

// Wrappers seen from JS-style encoders, e.g. `{"type": "Buffer", "data": [..]}`.
const WRAPPER_KEYS: [&str; 2] = ["data", "bytes"];
const MAX_WRAPPER_DEPTH: usize = 4;

fn bytes_from_json(value: &Value, depth: usize) -> Result<Vec<u8>, EncodingError> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| json_byte(index, item))
            .collect(),
        Value::String(encoded) => hex::decode(encoded.trim_start_matches("0x"))
            .map_err(|e| EncodingError::UnrecognisedShape(format!("string is not hex: {}", e))),
        Value::Object(map) => {
            if let Some(inner) = WRAPPER_KEYS.iter().find_map(|key| map.get(*key)) {
                if depth >= MAX_WRAPPER_DEPTH {
                    return Err(EncodingError::UnrecognisedShape(
                        "too many nested wrappers".to_string(),
                    ));
                }
                return bytes_from_json(inner, depth + 1);
            }

            let mut indexed = BTreeMap::new();
            for (key, item) in map {
                let index: usize = key.parse().map_err(|_| {
                    EncodingError::UnrecognisedShape(format!("unexpected key `{}`", key))
                })?;
                indexed.insert(index, json_byte(index, item)?);
            }

            // Keys must be exactly 0..len.
            if indexed.keys().enumerate().any(|(position, index)| position != *index) {
                return Err(EncodingError::UnrecognisedShape(
                    "object keys are not contiguous indices".to_string(),
                ));
            }

            Ok(indexed.into_values().collect())
        }
        other => Err(EncodingError::UnrecognisedShape(format!(
            "unsupported JSON value {}",
            other
        ))),
    }
}

fn json_byte(index: usize, item: &Value) -> Result<u8, EncodingError> {
    item.as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| EncodingError::ByteOutOfRange {
            index,
            value: item.to_string(),
        })
}

/// `OP_RETURN OP_13` followed by `payload` in pushes of at most 520 bytes.
pub fn build_op_return_script(payload: &[u8]) -> Result<ScriptBuf, EncodingError> {
    let mut builder = Builder::new()
        .push_opcode(OP_RETURN)
        .push_opcode(OP_PUSHNUM_13);

    for chunk in payload.chunks(MAX_PUSH_SIZE) {
        let push: &PushBytes = chunk
            .try_into()
            .map_err(|_| EncodingError::MalformedScript(format!("push of {} bytes", chunk.len())))?;
        builder = builder.push_slice(push);
    }

    Ok(builder.into_script())
}

/// A message after encoding: the payload whose length feeds the fee model, and the script
/// placed in output 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    pub payload: Vec<u8>,
    pub script: ScriptBuf,
}

impl EncodedMessage {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Encodes, normalizes and wraps `message`.
pub fn encode_message<C: RunestoneCodec + ?Sized>(
    codec: &C,
    message: &RunestoneMessage,
) -> Result<EncodedMessage, EncodingError> {
    let payload = normalize_encoded_bytes(codec.encode(message)?)?;
    let script = build_op_return_script(&payload)?;

    Ok(EncodedMessage { payload, script })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{
        absolute::LockTime, transaction::Version, Amount, Transaction, TxOut,
    };
    use ordinals::{Artifact, Runestone};
    use serde_json::json;

    fn decipher(script: ScriptBuf) -> Runestone {
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![
                TxOut {
                    value: Amount::ZERO,
                    script_pubkey: script,
                },
                TxOut {
                    value: Amount::from_sat(546),
                    script_pubkey: ScriptBuf::new(),
                },
                TxOut {
                    value: Amount::from_sat(546),
                    script_pubkey: ScriptBuf::new(),
                },
            ],
        };

        match Runestone::decipher(&tx) {
            Some(Artifact::Runestone(runestone)) => runestone,
            other => panic!("expected a runestone, got {:?}", other),
        }
    }

    mod normalize {
        use super::*;

        #[test]
        fn accepts_raw_bytes() {
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Bytes(vec![20, 1, 0])).unwrap(),
                vec![20, 1, 0]
            );
        }

        #[test]
        fn rejects_empty_bytes() {
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Bytes(vec![])),
                Err(EncodingError::Empty)
            );
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Json(json!([]))),
                Err(EncodingError::Empty)
            );
        }

        #[test]
        fn accepts_json_array() {
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Json(json!([0, 255, 7]))).unwrap(),
                vec![0, 255, 7]
            );
        }

        #[test]
        fn accepts_index_keyed_object() {
            let value = json!({"1": 2, "0": 1, "2": 3});
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Json(value)).unwrap(),
                vec![1, 2, 3]
            );
        }

        #[test]
        fn accepts_buffer_wrapper() {
            let value = json!({"type": "Buffer", "data": [9, 8]});
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Json(value)).unwrap(),
                vec![9, 8]
            );

            let value = json!({"bytes": "0a0b"});
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Json(value)).unwrap(),
                vec![10, 11]
            );
        }

        #[test]
        fn rejects_unknown_shapes() {
            assert!(matches!(
                normalize_encoded_bytes(EncodedRunestone::Json(json!(42))),
                Err(EncodingError::UnrecognisedShape(_))
            ));
            assert!(matches!(
                normalize_encoded_bytes(EncodedRunestone::Json(json!({"foo": 1}))),
                Err(EncodingError::UnrecognisedShape(_))
            ));
            assert!(matches!(
                normalize_encoded_bytes(EncodedRunestone::Json(json!({"0": 1, "2": 3}))),
                Err(EncodingError::UnrecognisedShape(_))
            ));
            assert!(matches!(
                normalize_encoded_bytes(EncodedRunestone::Json(json!("zz"))),
                Err(EncodingError::UnrecognisedShape(_))
            ));
        }

        #[test]
        fn rejects_out_of_range_values() {
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Json(json!([1, 256]))),
                Err(EncodingError::ByteOutOfRange {
                    index: 1,
                    value: "256".to_string()
                })
            );
        }

        #[test]
        fn extracts_script_payload() {
            let script = build_op_return_script(&[1, 2, 3]).unwrap();
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Script(script)).unwrap(),
                vec![1, 2, 3]
            );
        }

        #[test]
        fn rejects_scripts_without_magic() {
            let data: &PushBytes = [1u8, 2].as_slice().try_into().unwrap();
            let script = Builder::new()
                .push_opcode(OP_RETURN)
                .push_slice(data)
                .into_script();
            assert_eq!(
                normalize_encoded_bytes(EncodedRunestone::Script(script)),
                Err(EncodingError::NotARunestoneScript)
            );
        }
    }

    mod op_return {
        use super::*;

        #[test]
        fn splits_long_payloads() {
            let payload = vec![7u8; MAX_PUSH_SIZE + 10];
            let script = build_op_return_script(&payload).unwrap();

            let pushes: Vec<usize> = script
                .instructions()
                .filter_map(|i| match i.unwrap() {
                    Instruction::PushBytes(push) => Some(push.len()),
                    Instruction::Op(_) => None,
                })
                .collect();
            assert_eq!(pushes, vec![MAX_PUSH_SIZE, 10]);
            assert!(script.is_op_return());
        }
    }

    mod ordinals_codec {
        use super::*;

        #[test]
        fn transfer_round_trips_through_decipher() {
            let rune_id = RuneId::new(840_000, 3);
            let message = RunestoneMessage::Transfer {
                edicts: vec![
                    Edict {
                        id: rune_id,
                        amount: 400,
                        output: 1,
                    },
                    Edict {
                        id: rune_id,
                        amount: 600,
                        output: 2,
                    },
                ],
                pointer: None,
            };

            let encoded = encode_message(&OrdinalsCodec, &message).unwrap();
            let runestone = decipher(encoded.script);

            let id = ordinals::RuneId {
                block: 840_000,
                tx: 3,
            };
            assert_eq!(
                runestone.edicts,
                vec![
                    ordinals::Edict {
                        id,
                        amount: 400,
                        output: 1
                    },
                    ordinals::Edict {
                        id,
                        amount: 600,
                        output: 2
                    },
                ]
            );
            assert_eq!(runestone.pointer, None);
        }

        #[test]
        fn mint_carries_rune_id() {
            let encoded =
                encode_message(&OrdinalsCodec, &RunestoneMessage::Mint(RuneId::new(1, 0))).unwrap();
            let runestone = decipher(encoded.script);
            assert_eq!(runestone.mint, Some(ordinals::RuneId { block: 1, tx: 0 }));
        }

        #[test]
        fn rejects_unparseable_rune_names() {
            let message = RunestoneMessage::Etching(EtchingMessage {
                rune_name: "lowercase".to_string(),
                ..Default::default()
            });
            assert!(matches!(
                OrdinalsCodec.encode(&message),
                Err(EncodingError::InvalidMessage(_))
            ));
        }
    }
}
