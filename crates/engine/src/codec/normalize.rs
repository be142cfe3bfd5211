//! Normalization of off-chain message records.

use super::{parse_b256, parse_bytes, parse_u256, parse_u64, ExtraArgsInput};
use crate::{families::FamilyRegistry, CcipError, CcipResult};
use alloy_primitives::{Bytes, U256};
use ccip_primitives::{
    CcipMessage, ChainAddress, ChainFamily, Endianness, MessageHeader, NetworkInfo, TokenTransfer,
};
use serde_json::{Map, Value};

/// Keys holding addresses on the sending chain.
const SENDER_SIDE_KEYS: &[&str] =
    &["sender", "token", "feeToken", "sourcePoolAddress", "sourceTokenAddress", "onRampAddress"];

/// Keys holding addresses on the receiving chain.
const RECEIVER_SIDE_KEYS: &[&str] = &["receiver", "destTokenAddress", "offRampAddress"];

/// Keys holding integers that may exceed the range of a JSON number.
const NUMERIC_KEYS: &[&str] = &[
    "sequenceNumber",
    "nonce",
    "sourceChainSelector",
    "destChainSelector",
    "gasLimit",
    "amount",
    "feeTokenAmount",
    "feeValueJuels",
    "destGasAmount",
    "computeUnits",
    "accountIsWritableBitmap",
];

/// Converts a `snake_case` key to `camelCase`. Keys without underscores are returned as-is.
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for (i, c) in key.chars().enumerate() {
        if c == '_' && i > 0 {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn camelize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (to_camel_case(&k), camelize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(camelize).collect()),
        other => other,
    }
}

/// Guesses the family of a textual address whose network is unknown.
fn guess_family(address: &str) -> ChainFamily {
    if address.contains(':') {
        return ChainFamily::Ton;
    }
    match address.strip_prefix("0x") {
        Some(digits) if digits.len() <= 40 => ChainFamily::Evm,
        Some(digits) if digits.len() == 64 && digits[..24].bytes().all(|b| b == b'0') => {
            ChainFamily::Evm
        }
        Some(_) => ChainFamily::Aptos,
        None => ChainFamily::Solana,
    }
}

fn side_family(obj: &Map<String, Value>, selector_key: &str, address_key: &str) -> ChainFamily {
    obj.get(selector_key)
        .and_then(parse_u64)
        .and_then(|selector| NetworkInfo::by_selector(selector).ok())
        .map(|network| network.family)
        .or_else(|| obj.get(address_key).and_then(Value::as_str).map(guess_family))
        .unwrap_or(ChainFamily::Evm)
}

/// Returns the (sending, receiving) families of a camelCase record.
fn record_families(obj: &Map<String, Value>) -> (ChainFamily, ChainFamily) {
    (
        side_family(obj, "sourceChainSelector", "sender"),
        side_family(obj, "destChainSelector", "receiver"),
    )
}

/// Decodes a per-token destination gas amount with the sending family's byte order.
pub(crate) fn decode_token_gas(data: &[u8], endianness: Endianness) -> Option<u32> {
    if data.is_empty() {
        return None;
    }
    let value = match endianness {
        Endianness::Big => U256::try_from_be_slice(data)?,
        Endianness::Little => U256::try_from_le_slice(data)?,
    };
    u32::try_from(value).ok()
}

fn normalize_values(
    value: &mut Value,
    source: ChainFamily,
    dest: ChainFamily,
    key: Option<&str>,
) -> CcipResult<()> {
    match value {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                normalize_values(v, source, dest, Some(k.as_str()))?;
            }
            let gas = match (map.get("destGasAmount"), map.get("destExecData")) {
                (None, Some(exec_data)) => parse_bytes(exec_data)
                    .and_then(|data| decode_token_gas(&data, source.token_gas_endianness())),
                _ => None,
            };
            if let Some(gas) = gas {
                map.insert("destGasAmount".into(), Value::String(gas.to_string()));
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize_values(item, source, dest, key)?;
            }
        }
        Value::String(text) => {
            let Some(key) = key else { return Ok(()) };
            let family = if SENDER_SIDE_KEYS.contains(&key) {
                Some(source)
            } else if RECEIVER_SIDE_KEYS.contains(&key) {
                Some(dest)
            } else {
                None
            };
            if let Some(family) = family {
                let address = ChainAddress::parse(family, text)
                    .map_err(|err| CcipError::Decode(format!("{key}: {err}")))?;
                *text = address.to_string();
            } else if NUMERIC_KEYS.contains(&key) {
                let number = parse_u256(&Value::String(text.clone()))
                    .ok_or_else(|| CcipError::Decode(format!("{key}: not an integer: {text}")))?;
                *text = number.to_string();
            }
        }
        Value::Number(number) => {
            if key.is_some_and(|key| NUMERIC_KEYS.contains(&key)) {
                let number = parse_u256(&Value::Number(number.clone())).ok_or_else(|| {
                    CcipError::Decode(format!("{}: not an unsigned integer", key.unwrap_or("")))
                })?;
                *value = Value::String(number.to_string());
            }
        }
        Value::Null | Value::Bool(_) => {}
    }
    Ok(())
}

/// Normalizes a message record into its canonical camelCase shape.
///
/// - keys are converted to camelCase, recursively;
/// - a nested `header` object is flattened into the top level;
/// - an `extraArgs` blob (or object) is decoded with the sending family's codec and merged into
///   the top level, tagged with its schema in `_tag`;
/// - address fields are re-encoded in the canonical form of their family: receiver-side fields
///   use the receiving family, sender-side fields the sending family;
/// - integer fields become decimal strings;
/// - per-token `destExecData` is decoded into `destGasAmount` with the sending family's byte
///   order.
pub fn normalize_record(registry: &FamilyRegistry, value: &Value) -> CcipResult<Value> {
    let Value::Object(mut record) = camelize(value.clone()) else {
        return Err(CcipError::Decode("message record is not an object".into()));
    };

    if let Some(Value::Object(header)) = record.remove("header") {
        for (key, value) in header {
            record.entry(key).or_insert(value);
        }
    }

    let (source, dest) = record_families(&record);

    match record.remove("extraArgs") {
        Some(Value::String(blob)) => {
            let bytes = parse_bytes(&Value::String(blob))
                .ok_or_else(|| CcipError::Decode("extraArgs: not hex".into()))?;
            let args = registry.get(source)?.decode_extra_args(&bytes)?;
            let Value::Object(fields) = serde_json::to_value(&args)
                .map_err(|err| CcipError::Decode(format!("extraArgs: {err}")))?
            else {
                return Err(CcipError::Decode("extraArgs: unexpected shape".into()));
            };
            record.extend(fields);
        }
        Some(Value::Object(fields)) => record.extend(fields),
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(CcipError::Decode(format!("extraArgs: unexpected value {other}")));
        }
    }

    let mut normalized = Value::Object(record);
    normalize_values(&mut normalized, source, dest, None)?;
    Ok(normalized)
}

fn missing(key: &str) -> CcipError {
    CcipError::Decode(format!("message record: missing or invalid {key}"))
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|value| !value.is_null())
}

fn address(obj: &Map<String, Value>, key: &str, family: ChainFamily) -> CcipResult<ChainAddress> {
    let text = field(obj, key).and_then(Value::as_str).ok_or_else(|| missing(key))?;
    ChainAddress::parse(family, text).map_err(|err| CcipError::Decode(format!("{key}: {err}")))
}

fn optional_address(
    obj: &Map<String, Value>,
    key: &str,
    family: ChainFamily,
) -> CcipResult<Option<ChainAddress>> {
    field(obj, key).map(|_| address(obj, key, family)).transpose()
}

fn bytes_or_empty(obj: &Map<String, Value>, key: &str) -> CcipResult<Bytes> {
    field(obj, key).map_or(Ok(Bytes::new()), |value| parse_bytes(value).ok_or_else(|| missing(key)))
}

/// Decodes a message record (index or user supplied) into a [CcipMessage].
pub fn decode_record(registry: &FamilyRegistry, value: &Value) -> CcipResult<CcipMessage> {
    let normalized = normalize_record(registry, value)?;
    let Value::Object(obj) = &normalized else {
        return Err(CcipError::Decode("message record is not an object".into()));
    };
    let (source, dest) = record_families(obj);
    let u64_field = |key: &str| field(obj, key).and_then(parse_u64).ok_or_else(|| missing(key));

    let header = MessageHeader {
        message_id: field(obj, "messageId")
            .and_then(parse_b256)
            .ok_or_else(|| missing("messageId"))?,
        sequence_number: u64_field("sequenceNumber")?,
        nonce: field(obj, "nonce").map_or(Ok(0), |_| u64_field("nonce"))?,
        source_chain_selector: u64_field("sourceChainSelector")?,
        dest_chain_selector: field(obj, "destChainSelector")
            .map(|_| u64_field("destChainSelector"))
            .transpose()?,
    };

    let token_amounts = match field(obj, "tokenAmounts") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let item = item.as_object().ok_or_else(|| missing("tokenAmounts"))?;
                Ok(TokenTransfer {
                    token: optional_address(item, "token", source)?,
                    source_pool_address: optional_address(item, "sourcePoolAddress", source)?,
                    dest_token_address: optional_address(item, "destTokenAddress", dest)?,
                    amount: field(item, "amount")
                        .and_then(parse_u256)
                        .ok_or_else(|| missing("amount"))?,
                    extra_data: bytes_or_empty(item, "extraData")?,
                    dest_gas_amount: field(item, "destGasAmount")
                        .map(|value| {
                            parse_u64(value)
                                .and_then(|gas| u32::try_from(gas).ok())
                                .ok_or_else(|| missing("destGasAmount"))
                        })
                        .transpose()?,
                    dest_exec_data: bytes_or_empty(item, "destExecData")?,
                })
            })
            .collect::<CcipResult<Vec<_>>>()?,
        Some(_) => return Err(missing("tokenAmounts")),
    };

    let source_token_data = match field(obj, "sourceTokenData") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| parse_bytes(item).ok_or_else(|| missing("sourceTokenData")))
            .collect::<CcipResult<Vec<_>>>()?,
        Some(_) => return Err(missing("sourceTokenData")),
    };

    let tag = field(obj, "_tag").and_then(Value::as_str);
    let extra_args = ExtraArgsInput::from_record(obj)?.into_extra_args(tag, U256::ZERO)?;

    Ok(CcipMessage {
        header,
        sender: address(obj, "sender", source)?,
        receiver: address(obj, "receiver", dest)?,
        data: bytes_or_empty(obj, "data")?,
        token_amounts,
        fee_token: address(obj, "feeToken", source)?,
        fee_token_amount: field(obj, "feeTokenAmount").map_or(Ok(U256::ZERO), |value| {
            parse_u256(value).ok_or_else(|| missing("feeTokenAmount"))
        })?,
        fee_value_juels: field(obj, "feeValueJuels")
            .map(|value| parse_u256(value).ok_or_else(|| missing("feeValueJuels")))
            .transpose()?,
        extra_args,
        strict: field(obj, "strict").and_then(Value::as_bool).unwrap_or(false),
        source_token_data,
    })
}
