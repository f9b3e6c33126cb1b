//! Quote service wire types

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Upstream error code for a quote past its validity window
pub const QUOTE_EXPIRED_CODE: &str = "QUOTE_EXPIRED";

/// Output weights must sum to 1 within this tolerance
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Trading intent sent to `/quote`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub chain_id: u64,
    /// Address that will sign and send
    pub sender: String,
    /// Input token address → amount in base units
    pub inputs: BTreeMap<String, String>,
    /// Output token address → portion of the output value
    pub outputs: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl QuoteRequest {
    /// Basic shape checks before spending a request on the service
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::InvalidArgument("at least one input token is required".into()));
        }
        if self.outputs.is_empty() {
            return Err(Error::InvalidArgument("at least one output token is required".into()));
        }
        if self.outputs.values().any(|w| !(*w > 0.0)) {
            return Err(Error::InvalidArgument("output weights must be positive".into()));
        }
        let total: f64 = self.outputs.values().sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(Error::InvalidArgument(format!(
                "output weights must sum to 1, got {}",
                total
            )));
        }
        if let Some(slippage) = self.slippage {
            if !(0.0..1.0).contains(&slippage) {
                return Err(Error::InvalidArgument(format!(
                    "slippage must be a fraction in [0, 1), got {}",
                    slippage
                )));
            }
        }
        Ok(())
    }
}

/// Quote returned by `/quote`
///
/// The signing payloads, approvals and accounting entries are kept in wire
/// form; the normalizer turns them into canonical values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub quote_id: String,
    #[serde(default)]
    pub approvals: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit2: Option<Value>,
    #[serde(default)]
    pub is_complex_bridge: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_bridge: Option<Value>,
    #[serde(default)]
    pub funds: Vec<Value>,
    #[serde(default)]
    pub fees: Vec<Value>,
    #[serde(default)]
    pub balances: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<Value>,
}

impl QuoteResponse {
    /// Typed-data payload of the permit2 signature, if the quote needs one
    pub fn permit2_payload(&self) -> Option<&Value> {
        let permit2 = self.permit2.as_ref()?;
        permit2
            .get("eip712")
            .or_else(|| permit2.get("typedData"))
            .or(Some(permit2))
            .filter(|v| v.get("types").is_some())
    }

    /// Typed-data payload of the bridge signature, if the quote needs one
    pub fn bridge_payload(&self) -> Option<&Value> {
        let bridge = self.destination_bridge.as_ref()?;
        bridge
            .get("eip712")
            .or_else(|| bridge.get("typedData"))
            .or(Some(bridge))
            .filter(|v| v.get("types").is_some())
    }
}

/// Request body for `/solve`; absent signatures are omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub quote_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit2_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_signature: Option<String>,
}

/// Non-success response (or transport failure) from the quote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    /// HTTP status; `None` when the request never got a response
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl UpstreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// A 2xx response whose body is not what the service documents
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: Some("INVALID_RESPONSE".to_string()),
            message: message.into(),
        }
    }

    /// The quote's validity window has passed; a fresh quote is needed
    pub fn is_quote_expired(&self) -> bool {
        self.code.as_deref() == Some(QUOTE_EXPIRED_CODE) || self.status == Some(410)
    }

    /// Build from a status and response body of any shape
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed
            .as_ref()
            .map(|v| v.get("error").unwrap_or(v))
            .cloned();

        let (code, message) = match error {
            Some(Value::String(message)) => (None, message),
            Some(obj @ Value::Object(_)) => (
                obj.get("code").map(|c| match c {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
                obj.get("message")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| body.to_string()),
            ),
            _ => (None, body.to_string()),
        };

        Self {
            status: Some(status),
            code,
            message,
        }
    }
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "quote service returned {}", status)?,
            None => write!(f, "quote service request failed")?,
        }
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        write!(f, ": {}", self.message)?;
        if self.is_quote_expired() {
            write!(f, " (quote expired, request a fresh quote)")?;
        }
        Ok(())
    }
}

impl std::error::Error for UpstreamError {}
