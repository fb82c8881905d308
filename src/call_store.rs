//! Read-through cache of Vapi call logs.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::local_storage::{LocalStorage, CALLS_KEY};
use crate::models::CallRecord;
use crate::services::VapiService;

/// Value shipped in the settings template; never a usable key.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_VAPI_PLACEHOLDER";

/// Returns the key if it can be sent to Vapi: present, not blank, not the placeholder.
pub fn usable_api_key(api_key: Option<&str>) -> Option<&str> {
    api_key
        .map(str::trim)
        .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
}

/// Result of [`CallLogStore::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// No usable API key; nothing was fetched.
    ConfigurationRequired,
    /// Fresh calls were fetched and cached.
    Refreshed(Vec<CallRecord>),
    /// The fetch failed; these are the previously cached calls.
    Stale(Vec<CallRecord>),
}

impl RefreshOutcome {
    pub fn calls(&self) -> &[CallRecord] {
        match self {
            RefreshOutcome::ConfigurationRequired => &[],
            RefreshOutcome::Refreshed(calls) | RefreshOutcome::Stale(calls) => calls,
        }
    }

    pub fn into_calls(self) -> Vec<CallRecord> {
        match self {
            RefreshOutcome::ConfigurationRequired => Vec::new(),
            RefreshOutcome::Refreshed(calls) | RefreshOutcome::Stale(calls) => calls,
        }
    }
}

#[derive(Clone)]
pub struct CallLogStore {
    calls: Arc<RwLock<Vec<CallRecord>>>,
    storage: LocalStorage,
    vapi: VapiService,
}

impl CallLogStore {
    pub fn new(storage: LocalStorage, vapi: VapiService) -> Self {
        Self::with_calls(storage, vapi, Vec::new())
    }

    pub fn with_calls(storage: LocalStorage, vapi: VapiService, calls: Vec<CallRecord>) -> Self {
        Self {
            calls: Arc::new(RwLock::new(calls)),
            storage,
            vapi,
        }
    }

    /// Loads the persisted call snapshot; corrupt or missing means empty.
    pub async fn init(&self) -> usize {
        let loaded: Vec<CallRecord> = self.storage.load(CALLS_KEY).await.unwrap_or_default();
        let count = loaded.len();
        *self.calls.write().await = loaded;
        tracing::info!("Call cache initialized with {} call(s)", count);
        count
    }

    pub async fn dispose(&self) -> Result<(), AppError> {
        let mut calls = self.calls.write().await;
        self.storage.save(CALLS_KEY, &*calls).await?;
        calls.clear();
        tracing::debug!("Call cache disposed");
        Ok(())
    }

    /// Every cached call, verbatim.
    pub async fn get_cached(&self) -> Vec<CallRecord> {
        self.calls.read().await.clone()
    }

    /// Fetches the latest calls with the caller's API key.
    ///
    /// Without a usable key this returns immediately and touches neither the
    /// network nor the cache.
    pub async fn refresh(&self, api_key: Option<&str>) -> RefreshOutcome {
        let Some(api_key) = usable_api_key(api_key) else {
            tracing::info!("Call refresh skipped: Vapi API key not configured");
            return RefreshOutcome::ConfigurationRequired;
        };

        let fresh = match self.vapi.list_calls(api_key).await {
            Ok(calls) => calls,
            Err(e) => {
                tracing::warn!("Call refresh failed, serving cached calls: {}", e);
                return RefreshOutcome::Stale(self.get_cached().await);
            }
        };

        let mut calls = self.calls.write().await;
        *calls = fresh;
        if let Err(e) = self.storage.save(CALLS_KEY, &*calls).await {
            tracing::warn!("Refreshed calls could not be persisted: {}", e);
        }
        RefreshOutcome::Refreshed(calls.clone())
    }
}
