//! HTTP client for the quote service

use super::types::{QuoteRequest, QuoteResponse, SolveRequest, UpstreamError};
use super::QuoteService;
use crate::config::ApiConfig;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-api-key";

/// `QuoteService` over HTTPS
pub struct HttpQuoteClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpQuoteClient {
    pub fn new(config: &ApiConfig, api_key: Option<SecretString>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, UpstreamError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.endpoint(path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let err = UpstreamError::from_body(status.as_u16(), &text);
            tracing::warn!(path, status = status.as_u16(), error = %err, "Quote service error");
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| UpstreamError {
            status: Some(status.as_u16()),
            code: None,
            message: format!("Failed to parse response: {}", e),
        })
    }
}

#[async_trait]
impl QuoteService for HttpQuoteClient {
    async fn get_quote(
        &self,
        request: &QuoteRequest,
    ) -> std::result::Result<QuoteResponse, UpstreamError> {
        tracing::debug!(chain_id = request.chain_id, "Requesting quote");
        let quote: QuoteResponse = self.post("quote", request).await?;
        tracing::info!(
            quote_id = %quote.quote_id,
            approvals = quote.approvals.len(),
            permit2 = quote.permit2.is_some(),
            complex_bridge = quote.is_complex_bridge,
            "Quote received"
        );
        Ok(quote)
    }

    async fn solve(&self, request: &SolveRequest) -> std::result::Result<Value, UpstreamError> {
        tracing::debug!(quote_id = %request.quote_id, "Solving quote");
        let body: Value = self.post("solve", request).await?;
        // Some deployments nest the transaction
        let nested = body
            .get("transaction")
            .or_else(|| body.get("tx"))
            .cloned();
        Ok(nested.unwrap_or(body))
    }
}
