//! The message codec.
//!
//! Messages reach the engine as raw event bytes, as chain logs, as off-chain JSON records (from
//! the index or from user input) or already decoded. [decode_message] turns any of them into
//! the canonical [CcipMessage].

use crate::{families::FamilyRegistry, CcipError, CcipResult};
use alloy_primitives::{hex, Bytes, B256, U256};
use ccip_primitives::{CcipMessage, ChainAddress, ChainFamily, ChainLog};
use serde_json::Value;
use tracing::trace;

mod normalize;
pub(crate) use normalize::decode_token_gas;
pub use normalize::{decode_record, normalize_record, to_camel_case};

mod build;
pub use build::{build_message_for_dest, ExtraArgsInput, MessageDraft};

/// Any of the representations a message may be decoded from.
#[derive(Debug, Clone, Copy)]
pub enum MessageInput<'a> {
    /// Raw ABI / native event payload.
    Bytes(&'a [u8]),
    /// A chain log carrying a send event.
    Log(&'a ChainLog),
    /// An off-chain record.
    Json(&'a Value),
    /// A JSON record or hex payload in text form.
    Text(&'a str),
    /// An already decoded message.
    Message(&'a CcipMessage),
}

/// Decodes a message with the globally registered family codecs.
pub fn decode_message(input: MessageInput<'_>) -> CcipResult<CcipMessage> {
    decode_message_with(FamilyRegistry::global(), input)
}

/// Decodes a message with the codecs of `registry`.
///
/// Byte and log inputs are offered to every registered family decoder in turn; the first
/// success wins.
pub fn decode_message_with(
    registry: &FamilyRegistry,
    input: MessageInput<'_>,
) -> CcipResult<CcipMessage> {
    match input {
        MessageInput::Message(message) => Ok(message.clone()),
        MessageInput::Json(value) => decode_record(registry, value),
        MessageInput::Text(text) => {
            let text = text.trim();
            if text.starts_with('{') {
                let value: Value = serde_json::from_str(text)
                    .map_err(|err| CcipError::Decode(format!("message record: {err}")))?;
                decode_record(registry, &value)
            } else {
                let bytes = hex::decode(text)
                    .map_err(|_| CcipError::Decode("message is neither JSON nor hex".into()))?;
                decode_message_with(registry, MessageInput::Bytes(&bytes))
            }
        }
        MessageInput::Bytes(bytes) => {
            for codec in registry.codecs() {
                match codec.decode_message_bytes(bytes) {
                    Ok(message) => return Ok(message),
                    Err(err) => {
                        trace!(target: "codec", "{} decoder rejected bytes: {err}", codec.family())
                    }
                }
            }
            Err(CcipError::Decode(format!("no family decoder accepted {} bytes", bytes.len())))
        }
        MessageInput::Log(log) => {
            for codec in registry.codecs() {
                match codec.decode_message(log) {
                    Ok(message) => return Ok(message),
                    Err(err) => {
                        trace!(target: "codec", "{} decoder rejected log: {err}", codec.family())
                    }
                }
            }
            Err(CcipError::Decode(format!(
                "no family decoder accepted log {} of {}",
                log.log_index, log.transaction_hash
            )))
        }
    }
}

/// Parses an unsigned integer given as a JSON number, a decimal string or a `0x` hex string.
pub fn parse_u256(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => s.trim().parse::<U256>().ok(),
        _ => None,
    }
}

/// Parses a `u64` in any of the forms accepted by [parse_u256].
pub fn parse_u64(value: &Value) -> Option<u64> {
    parse_u256(value).and_then(|n| u64::try_from(n).ok())
}

/// Parses a byte string given as hex (with or without `0x`) or as an array of byte values.
pub fn parse_bytes(value: &Value) -> Option<Bytes> {
    match value {
        Value::Null => Some(Bytes::new()),
        Value::String(s) => hex::decode(s.trim()).ok().map(Into::into),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Into::into),
        _ => None,
    }
}

/// Parses a 32-byte word given as hex or base58.
pub fn parse_b256(value: &Value) -> Option<B256> {
    let text = value.as_str()?.trim();
    let bytes = match hex::decode(text) {
        Ok(bytes) => bytes,
        Err(_) => bs58_decode(text)?,
    };
    (bytes.len() == 32).then(|| B256::from_slice(&bytes))
}

fn bs58_decode(text: &str) -> Option<Vec<u8>> {
    ChainAddress::parse(ChainFamily::Solana, text).ok().map(|address| address.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_forms() {
        assert_eq!(parse_u64(&json!(42)), Some(42));
        assert_eq!(parse_u64(&json!("42")), Some(42));
        assert_eq!(parse_u64(&json!("0x2a")), Some(42));
        assert_eq!(parse_u64(&json!("5009297550715157269")), Some(5_009_297_550_715_157_269));
        assert_eq!(parse_u64(&json!("0x1ffffffffffffffff")), None);
        assert_eq!(
            parse_u256(&json!("0x1ffffffffffffffff")),
            Some(U256::from(u64::MAX) * U256::from(2) + U256::from(1))
        );
        assert_eq!(parse_u64(&json!(true)), None);
    }

    #[test]
    fn test_byte_forms() {
        assert_eq!(parse_bytes(&json!("0x0102")).unwrap().as_ref(), &[1, 2]);
        assert_eq!(parse_bytes(&json!("0102")).unwrap().as_ref(), &[1, 2]);
        assert_eq!(parse_bytes(&json!([1, 2])).unwrap().as_ref(), &[1, 2]);
        assert!(parse_bytes(&json!([256])).is_none());
        assert!(parse_bytes(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_word_forms() {
        let word = B256::repeat_byte(0xab);
        assert_eq!(parse_b256(&json!(word.to_string())), Some(word));
        let base58 =
            ChainAddress::from_bytes(ChainFamily::Solana, word.as_slice()).unwrap().to_string();
        assert_eq!(parse_b256(&json!(base58)), Some(word));
        assert_eq!(parse_b256(&json!("0x01")), None);
    }

    #[test]
    fn test_text_must_be_json_or_hex() {
        assert!(matches!(
            decode_message(MessageInput::Text("not a message")),
            Err(CcipError::Decode(_))
        ));
        assert!(matches!(
            decode_message(MessageInput::Bytes(&[0u8; 3])),
            Err(CcipError::Decode(_))
        ));
    }
}
