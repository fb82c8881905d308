use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CallListResponse, CallRecord};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Client for the Vapi call-listing API.
#[derive(Clone)]
pub struct VapiService {
    client: Client,
    base_url: String,
    limit: u32,
}

impl VapiService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Self::with_base_url(config.vapi_base_url.clone(), config.call_list_limit)
    }

    pub fn with_base_url(base_url: String, limit: u32) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::ExternalApiError(format!("Failed to create Vapi client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        })
    }

    /// Lists the most recent calls (`GET /call?limit=N`).
    pub async fn list_calls(&self, api_key: &str) -> Result<Vec<CallRecord>, AppError> {
        let limit = self.limit.to_string();
        let url = Url::parse_with_params(
            &format!("{}/call", self.base_url),
            &[("limit", limit.as_str())],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Fetching up to {} calls from Vapi", self.limit);

        let response = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Vapi request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Vapi returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Vapi returned status {}: {}",
                status, error_text
            )));
        }

        let result: CallListResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Vapi response: {}", e))
        })?;

        let calls = result.into_calls();
        tracing::info!("Fetched {} calls from Vapi", calls.len());
        Ok(calls)
    }
}
