//! Remote quoting service
//!
//! All pricing, routing and bridging happens upstream. The service turns an
//! intent into a quote (`POST /quote`) and a quote plus signatures into an
//! unsigned transaction (`POST /solve`). Quotes expire roughly 30 seconds
//! after issuance.

mod client;
mod types;

pub use client::HttpQuoteClient;
pub use types::{QuoteRequest, QuoteResponse, SolveRequest, UpstreamError, QUOTE_EXPIRED_CODE};

use async_trait::async_trait;
use serde_json::Value;

/// Quote and solve calls
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, UpstreamError>;

    /// Returns the raw `{to, data, value}` transaction, not yet normalized
    async fn solve(&self, request: &SolveRequest) -> Result<Value, UpstreamError>;
}
