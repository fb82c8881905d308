use crate::analytics::{daily_volume, filter_by_assistants, CallStats, CallView, PropertySummary};
use crate::call_store::{CallLogStore, RefreshOutcome};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::local_storage::LocalStorage;
use crate::models::{CallRecord, PropertyInput, PropertyRecord};
use crate::pin_gate::require_pin;
use crate::property_store::PropertyStore;
use crate::services::VapiService;
use crate::settings::{Settings, SettingsStore, SettingsView};
use crate::webhook_client::PropertyWebhookClient;
use crate::webhook_handler;
use crate::webhook_models::PendingCall;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Optimistic cache of property listings.
    pub properties: PropertyStore,
    /// Read-through cache of Vapi calls.
    pub calls: CallLogStore,
    /// Dashboard settings (Vapi key, assistants).
    pub settings: SettingsStore,
    /// Call prefills received through the form webhook, keyed by call session id.
    pub pending_calls: Cache<String, PendingCall>,
}

impl AppState {
    /// Opens local storage, builds the remote clients and loads every snapshot.
    pub async fn from_config(config: Config) -> Result<Self, AppError> {
        let storage = LocalStorage::open(config.storage_dir.clone())
            .await
            .context("Opening local storage")?;

        let webhook = PropertyWebhookClient::new(config.property_webhook_url.clone())?;
        let vapi = VapiService::new(&config)?;

        let properties = PropertyStore::new(storage.clone(), webhook);
        properties.init().await;

        let calls = CallLogStore::new(storage.clone(), vapi);
        calls.init().await;

        let seed = Settings {
            vapi_api_key: config.vapi_api_key.clone(),
            assistants: Vec::new(),
        };
        let settings = SettingsStore::load(storage, seed).await;

        let pending_calls = Cache::builder()
            .time_to_live(Duration::from_secs(config.pending_call_ttl_secs))
            .max_capacity(10_000)
            .build();

        Ok(Self {
            config,
            properties,
            calls,
            settings,
            pending_calls,
        })
    }
}

/// Builds the application router.
///
/// Dashboard routes sit behind the PIN gate; health and the form webhook do not.
pub fn build_router(state: Arc<AppState>) -> Router {
    let dashboard_routes = Router::new()
        .route("/api/v1/properties", get(list_properties).post(create_property))
        .route("/api/v1/properties/refresh", post(refresh_properties))
        .route("/api/v1/properties/summary", get(property_summary))
        .route(
            "/api/v1/properties/:id",
            put(update_property).delete(delete_property),
        )
        .route("/api/v1/calls", get(list_calls))
        .route("/api/v1/calls/refresh", post(refresh_calls))
        .route("/api/v1/calls/stats", get(call_stats))
        .route("/api/v1/settings", get(get_settings).put(put_settings))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_pin));

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/webhooks/form",
            post(webhook_handler::form_webhook),
        )
        .route(
            "/api/v1/webhooks/form/:call_session_id",
            get(webhook_handler::get_pending_call),
        )
        .merge(dashboard_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-estate-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Properties ============

/// GET /api/v1/properties
///
/// Cached active listings; never touches the network.
pub async fn list_properties(State(state): State<Arc<AppState>>) -> Json<Vec<PropertyRecord>> {
    Json(state.properties.get_cached().await)
}

/// POST /api/v1/properties/refresh
///
/// Pulls the remote listing. Falls back to the cached listings on failure,
/// so this always answers 200.
pub async fn refresh_properties(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<PropertyRecord>> {
    Json(state.properties.refresh().await)
}

/// GET /api/v1/properties/summary
pub async fn property_summary(State(state): State<Arc<AppState>>) -> Json<PropertySummary> {
    let records = state.properties.get_cached().await;
    Json(PropertySummary::from_records(&records))
}

/// POST /api/v1/properties
pub async fn create_property(
    State(state): State<Arc<AppState>>,
    Json(mut input): Json<PropertyInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let missing_id = input
        .id
        .as_deref()
        .map(|id| id.trim().is_empty())
        .unwrap_or(true);
    if missing_id {
        input.id = Some(Uuid::new_v4().to_string());
    }
    let id = input.id.clone().unwrap_or_default();

    let success = state
        .properties
        .create(input)
        .await
        .with_context(|| format!("Creating property {}", id))?;

    tracing::info!("Property {} created", id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": success, "id": id })),
    ))
}

/// PUT /api/v1/properties/:id
pub async fn update_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut input): Json<PropertyInput>,
) -> Result<Json<Value>, AppError> {
    input.id = Some(id.clone());

    let updated = state
        .properties
        .update(input)
        .await
        .with_context(|| format!("Updating property {}", id))?;
    if !updated {
        return Err(AppError::NotFound(format!("Property {} not found", id)));
    }

    tracing::info!("Property {} updated", id);
    Ok(Json(json!({ "success": true, "id": id })))
}

/// DELETE /api/v1/properties/:id
pub async fn delete_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let deleted = state
        .properties
        .delete(&id)
        .await
        .with_context(|| format!("Deleting property {}", id))?;
    if !deleted {
        return Err(AppError::NotFound(format!("Property {} not found", id)));
    }

    tracing::info!("Property {} deleted", id);
    Ok(Json(json!({ "success": true, "id": id })))
}

// ============ Calls ============

#[derive(Debug, Deserialize)]
pub struct CallQueryParams {
    /// Restrict to one assistant; defaults to every configured assistant.
    pub assistant_id: Option<String>,
}

/// Calls within the requested assistant scope, plus the settings used to label them.
async fn scoped_calls(
    state: &AppState,
    params: &CallQueryParams,
    calls: &[CallRecord],
) -> (Vec<CallRecord>, Settings) {
    let settings = state.settings.get().await;
    let ids = match &params.assistant_id {
        Some(id) => vec![id.clone()],
        None => settings.assistant_ids(),
    };
    (filter_by_assistants(calls, &ids), settings)
}

async fn visible_calls(
    state: &AppState,
    params: &CallQueryParams,
    calls: &[CallRecord],
) -> Vec<CallView> {
    let (scoped, settings) = scoped_calls(state, params, calls).await;
    scoped
        .into_iter()
        .map(|call| CallView::new(call, &settings.assistants))
        .collect()
}

/// GET /api/v1/calls
pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallQueryParams>,
) -> Json<Vec<CallView>> {
    let calls = state.calls.get_cached().await;
    Json(visible_calls(&state, &params, &calls).await)
}

/// POST /api/v1/calls/refresh
///
/// `configurationRequired` is set when no usable Vapi key is saved; `stale`
/// when the fetch failed and cached calls are returned.
pub async fn refresh_calls(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallQueryParams>,
) -> Json<Value> {
    let api_key = state.settings.vapi_api_key().await;
    let outcome = state.calls.refresh(api_key.as_deref()).await;

    let configuration_required = outcome == RefreshOutcome::ConfigurationRequired;
    let stale = matches!(outcome, RefreshOutcome::Stale(_));
    let calls = visible_calls(&state, &params, outcome.calls()).await;

    Json(json!({
        "calls": calls,
        "configurationRequired": configuration_required,
        "stale": stale,
    }))
}

/// GET /api/v1/calls/stats
pub async fn call_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallQueryParams>,
) -> Json<Value> {
    let calls = state.calls.get_cached().await;
    let (visible, _) = scoped_calls(&state, &params, &calls).await;

    Json(json!({
        "stats": CallStats::from_calls(&visible),
        "dailyVolume": daily_volume(&visible),
    }))
}

// ============ Settings ============

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsView> {
    Json(state.settings.view().await)
}

/// PUT /api/v1/settings
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Settings>,
) -> Result<Json<SettingsView>, AppError> {
    let view = state.settings.save(settings).await?;
    Ok(Json(view))
}
