use crate::errors::AppError;
use crate::models::PropertyListResponse;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Write actions understood by the property workflow webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    Add,
    Update,
    Delete,
}

impl WebhookAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookAction::Add => "add",
            WebhookAction::Update => "update",
            WebhookAction::Delete => "delete",
        }
    }
}

/// Client for the n8n workflow webhook that is the remote source of truth
/// for property listings.
///
/// One URL serves both directions: `GET ?action=get_all` lists properties,
/// `POST` with an `action` field records a write.
#[derive(Clone)]
pub struct PropertyWebhookClient {
    client: reqwest::Client,
    webhook_url: String,
}

impl PropertyWebhookClient {
    pub fn new(webhook_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create webhook client: {}", e))
            })?;

        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Fetches every property the workflow knows about, as raw JSON items.
    pub async fn fetch_all(&self) -> Result<Vec<Value>, AppError> {
        let url = Url::parse_with_params(&self.webhook_url, &[("action", "get_all")])
            .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Fetching properties from webhook");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Property webhook returned {}: {}",
                status, error_text
            )));
        }

        let data: PropertyListResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse property listing: {}", e))
        })?;

        Ok(data.into_items())
    }

    /// Posts `{...payload, action}` to the webhook. The response body is not consumed.
    pub async fn notify(&self, action: WebhookAction, payload: &Value) -> Result<(), AppError> {
        let mut body = match payload {
            Value::Object(map) => map.clone(),
            other => {
                return Err(AppError::InternalError(format!(
                    "Webhook payload must be an object, got {}",
                    other
                )))
            }
        };
        body.insert("action".to_string(), Value::String(action.as_str().to_string()));

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Webhook {} failed: {}", action.as_str(), e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Webhook {} returned {}",
                action.as_str(),
                response.status()
            )));
        }

        tracing::debug!("Webhook acknowledged '{}'", action.as_str());
        Ok(())
    }
}
