//! Real-Estate Dashboard Sync Library
//!
//! Data-access layer behind the real-estate admin dashboard: optimistic
//! local caches for property listings and Vapi call logs, kept in sync with
//! an n8n property webhook and the Vapi call-listing API.
//!
//! # Modules
//!
//! - `analytics`: Call duration/outcome derivation and chart aggregates.
//! - `call_store`: Read-through cache of call logs.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `local_storage`: Integrity-checked JSON snapshot storage.
//! - `models`: Property and call data models.
//! - `normalize`: Property normalization rules.
//! - `pin_gate`: Optional dashboard PIN check.
//! - `property_store`: Optimistic property cache with webhook sync.
//! - `services`: Vapi API client.
//! - `settings`: Persisted dashboard settings.
//! - `webhook_client`: n8n property webhook client.
//! - `webhook_handler`: Form ingress webhook.
//! - `webhook_models`: Form ingress payloads.

pub mod analytics;
pub mod call_store;
pub mod config;
pub mod errors;
pub mod handlers;
mod lenient;
pub mod local_storage;
pub mod models;
pub mod normalize;
pub mod pin_gate;
pub mod property_store;
pub mod services;
pub mod settings;
pub mod webhook_client;
pub mod webhook_handler;
pub mod webhook_models;
