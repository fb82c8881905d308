//! Optimistically cached property listings.
//!
//! The in-memory collection is what the dashboard renders. It is loaded from
//! the local snapshot on [`PropertyStore::init`], replaced wholesale by a
//! successful [`PropertyStore::refresh`], and mutated locally by writes,
//! which then notify the remote webhook without waiting for it.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::local_storage::{LocalStorage, PROPERTIES_KEY};
use crate::models::{PropertyInput, PropertyRecord};
use crate::normalize::{normalize_property, normalize_remote_item, KnownTimestamps};
use crate::webhook_client::{PropertyWebhookClient, WebhookAction};

/// A local write, applied by [`PropertyStore::commit_local`].
#[derive(Debug, Clone)]
pub enum LocalMutation {
    Create(PropertyInput),
    Update(PropertyInput),
    Delete(String),
}

/// What a committed mutation should tell the remote webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteNotice {
    pub action: WebhookAction,
    pub payload: Value,
}

#[derive(Clone)]
pub struct PropertyStore {
    records: Arc<RwLock<Vec<PropertyRecord>>>,
    storage: LocalStorage,
    remote: PropertyWebhookClient,
}

impl PropertyStore {
    pub fn new(storage: LocalStorage, remote: PropertyWebhookClient) -> Self {
        Self::with_records(storage, remote, Vec::new())
    }

    /// Builds a store around an explicit initial collection.
    pub fn with_records(
        storage: LocalStorage,
        remote: PropertyWebhookClient,
        records: Vec<PropertyRecord>,
    ) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            storage,
            remote,
        }
    }

    /// Loads the persisted snapshot into memory. A missing or corrupt snapshot
    /// leaves the collection empty. Returns the number of records loaded.
    pub async fn init(&self) -> usize {
        let loaded: Vec<PropertyRecord> = self.storage.load(PROPERTIES_KEY).await.unwrap_or_default();
        let count = loaded.len();
        *self.records.write().await = loaded;
        tracing::info!("Property cache initialized with {} record(s)", count);
        count
    }

    /// Flushes the current collection to the snapshot and releases it from memory.
    pub async fn dispose(&self) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        self.storage.save(PROPERTIES_KEY, &*records).await?;
        records.clear();
        tracing::debug!("Property cache disposed");
        Ok(())
    }

    /// Active records in their current order.
    pub async fn get_cached(&self) -> Vec<PropertyRecord> {
        let records = self.records.read().await;
        active_subset(&records)
    }

    /// Active record with the given id.
    pub async fn get(&self, id: &str) -> Option<PropertyRecord> {
        let records = self.records.read().await;
        records.iter().find(|r| r.active && r.id == id).cloned()
    }

    /// Replaces the collection with the remote listing.
    ///
    /// Any failure (transport, status, body) is logged and the current
    /// cached subset is returned unchanged.
    pub async fn refresh(&self) -> Vec<PropertyRecord> {
        let items = match self.remote.fetch_all().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Property refresh failed, serving cached data: {}", e);
                return self.get_cached().await;
            }
        };

        let known: KnownTimestamps = {
            let records = self.records.read().await;
            records
                .iter()
                .map(|r| (r.id.clone(), (r.created_at, r.updated_at)))
                .collect()
        };

        let now = Utc::now();
        let fresh: Vec<PropertyRecord> = items
            .into_iter()
            .filter_map(|item| normalize_remote_item(item, now, &known))
            .collect();

        let mut records = self.records.write().await;
        *records = fresh;
        if let Err(e) = self.storage.save(PROPERTIES_KEY, &*records).await {
            tracing::warn!("Refreshed properties could not be persisted: {}", e);
        }

        let active = active_subset(&records);
        tracing::info!(
            "Property refresh complete: {} record(s), {} active",
            records.len(),
            active.len()
        );
        active
    }

    /// Adds a property. Returns `true` once the local snapshot is written;
    /// the webhook is notified in the background.
    pub async fn create(&self, input: PropertyInput) -> Result<bool, AppError> {
        let committed = self.commit_local(LocalMutation::Create(input)).await?;
        Ok(self.dispatch(committed))
    }

    /// Replaces the active record with the same id. Returns `false` (and
    /// changes nothing) when no such record exists.
    pub async fn update(&self, input: PropertyInput) -> Result<bool, AppError> {
        let committed = self.commit_local(LocalMutation::Update(input)).await?;
        Ok(self.dispatch(committed))
    }

    /// Soft-deletes the record: it stays in the snapshot with `active = false`
    /// and disappears from every read. Returns `false` for unknown ids.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let committed = self
            .commit_local(LocalMutation::Delete(id.to_string()))
            .await?;
        Ok(self.dispatch(committed))
    }

    /// Applies a mutation to memory and the snapshot.
    ///
    /// Returns the notice to send to the remote, or `None` when the mutation
    /// matched nothing. Errors only when the snapshot cannot be written, in
    /// which case the in-memory collection is left as it was.
    pub async fn commit_local(
        &self,
        mutation: LocalMutation,
    ) -> Result<Option<RemoteNotice>, AppError> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let mut next = records.clone();

        let notice = match mutation {
            LocalMutation::Create(mut input) => {
                let existing = input
                    .id
                    .as_deref()
                    .and_then(|id| next.iter().position(|r| r.id == id));
                if let Some(idx) = existing {
                    input.created_at = Some(next[idx].created_at.to_rfc3339());
                }
                let record = normalize_property(input, now);
                let payload = serde_json::to_value(&record)?;
                match existing {
                    Some(idx) => next[idx] = record,
                    None => next.push(record),
                }
                RemoteNotice {
                    action: WebhookAction::Add,
                    payload,
                }
            }
            LocalMutation::Update(mut input) => {
                let Some(id) = input.id.clone().filter(|id| !id.trim().is_empty()) else {
                    return Ok(None);
                };
                let Some(existing) = next.iter_mut().find(|r| r.active && r.id == id) else {
                    tracing::warn!("Update ignored: no active property with id {}", id);
                    return Ok(None);
                };
                input.created_at = Some(existing.created_at.to_rfc3339());
                input.updated_at = None;
                let record = normalize_property(input, now);
                let payload = serde_json::to_value(&record)?;
                *existing = record;
                RemoteNotice {
                    action: WebhookAction::Update,
                    payload,
                }
            }
            LocalMutation::Delete(id) => {
                let Some(existing) = next.iter_mut().find(|r| r.active && r.id == id) else {
                    tracing::warn!("Delete ignored: no active property with id {}", id);
                    return Ok(None);
                };
                existing.active = false;
                existing.updated_at = now;
                RemoteNotice {
                    action: WebhookAction::Delete,
                    payload: json!({ "id": id }),
                }
            }
        };

        self.storage.save(PROPERTIES_KEY, &next).await?;
        *records = next;
        Ok(Some(notice))
    }

    /// Sends one notice to the webhook. Failures are logged, never returned:
    /// the local commit already happened and is not rolled back.
    pub async fn notify_remote(&self, notice: RemoteNotice) {
        let action = notice.action;
        match self.remote.notify(action, &notice.payload).await {
            Ok(()) => tracing::debug!("Remote notified of property {}", action.as_str()),
            Err(e) => tracing::error!("Remote property {} failed: {}", action.as_str(), e),
        }
    }

    fn dispatch(&self, committed: Option<RemoteNotice>) -> bool {
        match committed {
            Some(notice) => {
                let store = self.clone();
                tokio::spawn(async move {
                    store.notify_remote(notice).await;
                });
                true
            }
            None => false,
        }
    }
}

fn active_subset(records: &[PropertyRecord]) -> Vec<PropertyRecord> {
    records.iter().filter(|r| r.active).cloned().collect()
}
