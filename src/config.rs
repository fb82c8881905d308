use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub property_webhook_url: String,
    pub vapi_base_url: String,
    pub vapi_api_key: Option<String>,
    pub storage_dir: PathBuf,
    pub dashboard_pin: Option<String>,
    pub call_list_limit: u32,
    pub pending_call_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            property_webhook_url: std::env::var("PROPERTY_WEBHOOK_URL")
                .or_else(|_| std::env::var("N8N_WEBHOOK_URL"))
                .map_err(|_| {
                    anyhow::anyhow!(
                        "PROPERTY_WEBHOOK_URL or N8N_WEBHOOK_URL environment variable required"
                    )
                })
                .and_then(|url| validate_http_url("PROPERTY_WEBHOOK_URL", url))?,
            vapi_base_url: std::env::var("VAPI_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| validate_http_url("VAPI_BASE_URL", url))
                .transpose()?
                .unwrap_or_else(|| DEFAULT_VAPI_BASE_URL.to_string()),
            vapi_api_key: std::env::var("VAPI_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            storage_dir: std::env::var("STORAGE_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            dashboard_pin: std::env::var("DASHBOARD_PIN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            call_list_limit: validate_call_list_limit(
                &std::env::var("CALL_LIST_LIMIT").unwrap_or_else(|_| "50".to_string()),
            )?,
            pending_call_ttl_secs: std::env::var("PENDING_CALL_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PENDING_CALL_TTL_SECS must be a number of seconds"))?,
        };

        // Never log the API key or the PIN
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Property webhook URL: {}", config.property_webhook_url);
        tracing::debug!("Vapi Base URL: {}", config.vapi_base_url);
        tracing::debug!("Storage directory: {}", config.storage_dir.display());
        tracing::debug!("Server Port: {}", config.port);
        if config.vapi_api_key.is_none() {
            tracing::warn!("VAPI_API_KEY not set; call logs need a key saved in settings");
        }
        if config.dashboard_pin.is_none() {
            tracing::warn!("DASHBOARD_PIN not set; dashboard routes are not PIN gated");
        }

        Ok(config)
    }
}

fn validate_http_url(name: &str, url: String) -> anyhow::Result<String> {
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn validate_call_list_limit(raw: &str) -> anyhow::Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => anyhow::bail!("CALL_LIST_LIMIT must be a positive number"),
    }
}
