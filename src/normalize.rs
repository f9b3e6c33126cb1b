//! Quote-service payload normalization
//!
//! The quote service serializes large integers as wrapper objects such as
//! `{"type": "BigNumber", "hex": "0x0de0b6b3a7640000"}` or
//! `{"_hex": "0x01", "_isBigNumber": true}`. Wallets expect plain hex strings
//! in EIP-712 messages, and transaction construction needs real numbers, so
//! one recursive traversal is run with one of two leaf strategies:
//!
//! - [`StringMode`] replaces a wrapper with its hex string (typed-data signing)
//! - [`NumericMode`] replaces a wrapper with its decimal value (transactions)
//!
//! The traversal never mutates its input and keeps key order (serde_json is
//! built with `preserve_order`) and sequence order.

use crate::types::TransactionCall;
use crate::{Error, Result};
use alloy::dyn_abi::TypedData;
use alloy::primitives::{Address, Bytes, U256};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Wrapper keys that carry the hex payload
const HEX_KEYS: &[&str] = &["hex", "_hex"];

/// Marker keys allowed next to the hex payload
const MARKER_KEYS: &[&str] = &["type", "_isBigNumber"];

/// Permit2 primary types, checked in order against the type dictionary
const PERMIT2_PRIMARY_TYPES: &[&str] = &["PermitBatch", "PermitSingle"];

const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// Leaf strategy applied to each wrapped big integer
pub trait BigIntMode {
    fn convert(&self, hex: &str) -> Value;
}

/// Keep the hex string
#[derive(Debug, Clone, Copy, Default)]
pub struct StringMode;

impl BigIntMode for StringMode {
    fn convert(&self, hex: &str) -> Value {
        Value::String(hex.to_string())
    }
}

/// Decode to a decimal integer string
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericMode;

impl BigIntMode for NumericMode {
    fn convert(&self, hex: &str) -> Value {
        match U256::from_str(hex) {
            Ok(n) => Value::String(n.to_string()),
            Err(_) => Value::String(hex.to_string()),
        }
    }
}

/// Recursively replace wrapped big integers, returning a new value
pub fn normalize<M: BigIntMode>(value: &Value, mode: &M) -> Value {
    match value {
        Value::Object(map) => match wrapped_hex(map) {
            Some(hex) => mode.convert(hex),
            None => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize(v, mode)))
                    .collect(),
            ),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| normalize(v, mode)).collect()),
        scalar => scalar.clone(),
    }
}

/// String-mode shorthand
pub fn normalize_for_signing(value: &Value) -> Value {
    normalize(value, &StringMode)
}

/// Numeric-mode shorthand
pub fn normalize_for_transaction(value: &Value) -> Value {
    normalize(value, &NumericMode)
}

/// Hex payload of a big-integer wrapper object, if `map` is one
fn wrapped_hex(map: &Map<String, Value>) -> Option<&str> {
    let mut hex = None;
    for (key, value) in map {
        if HEX_KEYS.contains(&key.as_str()) {
            let s = value.as_str()?;
            if hex.is_some() || !is_hex_string(s) {
                return None;
            }
            hex = Some(s);
        } else if key == "type" {
            if value.as_str() != Some("BigNumber") {
                return None;
            }
        } else if !MARKER_KEYS.contains(&key.as_str()) {
            return None;
        }
    }
    hex
}

fn is_hex_string(s: &str) -> bool {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    matches!(digits, Some(d) if !d.is_empty() && d.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse an integer from a JSON number, decimal string, or 0x-hex string
pub fn parse_u256(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                U256::from_str(s).ok()
            }
        }
        _ => None,
    }
}

/// Parse `{to, data, value}` after numeric-mode normalization
///
/// Missing `data` is empty calldata; missing `value` is zero.
pub fn parse_transaction_call(raw: &Value) -> Result<TransactionCall> {
    let normalized = normalize_for_transaction(raw);
    let obj = normalized
        .as_object()
        .ok_or_else(|| Error::InvalidArgument("transaction must be an object".to_string()))?;

    let to = obj
        .get("to")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidArgument("transaction is missing 'to'".to_string()))?;
    let to = Address::from_str(to)
        .map_err(|e| Error::InvalidArgument(format!("Invalid 'to' address: {}", e)))?;

    let data = match obj.get("data").and_then(Value::as_str) {
        Some(hex) if !hex.is_empty() => Bytes::from_str(hex)
            .map_err(|e| Error::InvalidArgument(format!("Invalid calldata: {}", e)))?,
        _ => Bytes::new(),
    };

    let value = match obj.get("value") {
        None | Some(Value::Null) => U256::ZERO,
        Some(v) => parse_u256(v)
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid value: {}", v)))?,
    };

    Ok(TransactionCall { to, data, value })
}

/// EIP-712 domain as emitted upstream; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningDomain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl SigningDomain {
    /// Present fields must be well formed; a dropped field would change the
    /// domain separator and the signature would not verify upstream
    fn from_value(value: Option<&Value>) -> Result<Self> {
        let obj = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(obj)) => obj,
            Some(other) => {
                return Err(Error::InvalidArgument(format!(
                    "domain must be an object, got {}",
                    other
                )))
            }
        };

        let chain_id = match domain_field(obj, "chainId") {
            Some(v) => {
                let id = parse_u256(v).and_then(|id| u64::try_from(id).ok());
                Some(id.ok_or_else(|| {
                    Error::InvalidArgument(format!("Invalid domain chainId: {}", v))
                })?)
            }
            None => None,
        };

        let verifying_contract = match domain_string(obj, "verifyingContract")? {
            Some(s) => Some(Address::from_str(&s).map_err(|e| {
                Error::InvalidArgument(format!("Invalid verifyingContract: {}", e))
            })?),
            None => None,
        };

        Ok(Self {
            name: domain_string(obj, "name")?,
            version: domain_string(obj, "version")?,
            chain_id,
            verifying_contract,
            salt: domain_string(obj, "salt")?,
        })
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(name) = &self.name {
            obj.insert("name".into(), json!(name));
        }
        if let Some(version) = &self.version {
            obj.insert("version".into(), json!(version));
        }
        if let Some(chain_id) = self.chain_id {
            obj.insert("chainId".into(), json!(format!("{:#x}", chain_id)));
        }
        if let Some(contract) = &self.verifying_contract {
            obj.insert("verifyingContract".into(), json!(contract.to_string()));
        }
        if let Some(salt) = &self.salt {
            obj.insert("salt".into(), json!(salt));
        }
        Value::Object(obj)
    }
}

fn domain_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn domain_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match domain_field(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::InvalidArgument(format!(
            "Invalid domain {}: expected a string, got {}",
            key, other
        ))),
    }
}

/// Canonical EIP-712 payload, ready for any signer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPayload {
    pub domain: SigningDomain,
    /// Type name → field list
    pub types: Map<String, Value>,
    pub primary_type: String,
    pub message: Value,
}

impl SigningPayload {
    /// Convert into alloy's dynamic typed-data representation
    pub fn to_typed_data(&self) -> Result<TypedData> {
        let mut types = self.types.clone();
        types.remove(EIP712_DOMAIN_TYPE);

        let value = json!({
            "domain": self.domain.to_json(),
            "types": types,
            "primaryType": self.primary_type,
            "message": self.message,
        });
        serde_json::from_value(value)
            .map_err(|e| Error::InvalidArgument(format!("Malformed typed data: {}", e)))
    }
}

/// Normalize the permit2 payload
///
/// The primary type is the explicit one when given, otherwise whichever of
/// `PermitBatch`/`PermitSingle` appears in the type dictionary.
pub fn normalize_permit2_payload(raw: &Value) -> Result<SigningPayload> {
    let (domain, types, explicit, message) = split_payload(raw)?;

    let primary_type = match explicit {
        Some(primary) => primary,
        None => PERMIT2_PRIMARY_TYPES
            .iter()
            .find(|name| types.contains_key(**name))
            .map(|name| name.to_string())
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "permit2 payload has neither PermitBatch nor PermitSingle".to_string(),
                )
            })?,
    };

    Ok(SigningPayload {
        domain,
        types,
        primary_type,
        message,
    })
}

/// Normalize the bridge payload
///
/// The primary type defaults to the first type-dictionary key that is not
/// the domain type.
pub fn normalize_bridge_payload(raw: &Value) -> Result<SigningPayload> {
    let (domain, types, explicit, message) = split_payload(raw)?;

    let primary_type = match explicit {
        Some(primary) => primary,
        None => types
            .keys()
            .find(|name| name.as_str() != EIP712_DOMAIN_TYPE)
            .cloned()
            .ok_or_else(|| Error::InvalidArgument("bridge payload has no types".to_string()))?,
    };

    Ok(SigningPayload {
        domain,
        types,
        primary_type,
        message,
    })
}

type PayloadParts = (SigningDomain, Map<String, Value>, Option<String>, Value);

fn split_payload(raw: &Value) -> Result<PayloadParts> {
    let normalized = normalize_for_signing(raw);
    let obj = normalized
        .as_object()
        .ok_or_else(|| Error::InvalidArgument("signing payload must be an object".to_string()))?;

    let domain = SigningDomain::from_value(obj.get("domain"))?;
    let types = obj
        .get("types")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| Error::InvalidArgument("signing payload is missing 'types'".to_string()))?;
    let primary_type = obj
        .get("primaryType")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from);
    // ethers-style payloads call the message `values`
    let message = obj
        .get("message")
        .or_else(|| obj.get("values"))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    Ok((domain, types, primary_type, message))
}
