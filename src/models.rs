use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lenient;

/// Sentinel stored when a property has no RERA registration.
pub const RERA_NOT_APPLICABLE: &str = "N/A";

// ============ Properties ============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    Apartment,
    Villa,
    Commercial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Available,
    Sold,
    Rented,
}

/// One unit configuration of a listing (e.g. "2 BHK").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: String,
    pub name: String,
    pub size: String,
    pub total_units: u32,
    /// Always within `0..=total_units`.
    pub units_sold: u32,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A fully normalized property listing. Every field is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub location: String,
    pub city: String,
    pub micro_location: String,
    pub description: String,
    pub area: String,
    /// Minimum configuration price.
    pub price: f64,
    pub status: PropertyStatus,
    pub configurations: Vec<Configuration>,
    pub amenities: Vec<String>,
    /// `false` marks a soft-deleted listing.
    pub active: bool,
    pub images: Vec<String>,
    pub pdfs: Vec<String>,
    pub rera_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PropertyRecord {
    /// Units across every configuration. Summed as `u64` since each
    /// configuration may hold up to `u32::MAX` units.
    pub fn total_units(&self) -> u64 {
        self.configurations.iter().map(|c| u64::from(c.total_units)).sum()
    }

    pub fn units_sold(&self) -> u64 {
        self.configurations.iter().map(|c| u64::from(c.units_sold)).sum()
    }
}

/// Partially specified property as received from the dashboard form or the
/// remote webhook. Passed through `normalize::normalize_property` before it
/// is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInput {
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub title: Option<String>,
    #[serde(
        rename = "type",
        alias = "propertyType",
        alias = "property_type",
        default,
        deserialize_with = "lenient::enum_opt"
    )]
    pub property_type: Option<PropertyType>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub city: Option<String>,
    #[serde(alias = "micro_location", default, deserialize_with = "lenient::string_opt")]
    pub micro_location: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::enum_opt")]
    pub status: Option<PropertyStatus>,
    #[serde(default, deserialize_with = "lenient::objects_opt")]
    pub configurations: Option<Vec<ConfigurationInput>>,
    #[serde(default, deserialize_with = "lenient::strings_opt")]
    pub amenities: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::bool_opt")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient::strings_opt")]
    pub images: Option<Vec<String>>,
    #[serde(alias = "documents", default, deserialize_with = "lenient::strings_opt")]
    pub pdfs: Option<Vec<String>>,
    #[serde(alias = "rera_id", default, deserialize_with = "lenient::string_opt")]
    pub rera_id: Option<String>,
    #[serde(alias = "created_at", default, deserialize_with = "lenient::string_opt")]
    pub created_at: Option<String>,
    #[serde(alias = "updated_at", default, deserialize_with = "lenient::string_opt")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationInput {
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub size: Option<String>,
    #[serde(alias = "total_units", default, deserialize_with = "lenient::i64_opt")]
    pub total_units: Option<i64>,
    #[serde(alias = "units_sold", default, deserialize_with = "lenient::i64_opt")]
    pub units_sold: Option<i64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub description: Option<String>,
}

// ============ Calls ============

/// A call as returned by the Vapi `/call` endpoint.
///
/// Kept verbatim: fields the dashboard does not model are preserved in
/// `extra` so the cached snapshot round-trips the raw payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_reason: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::f64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_seconds: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::f64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::f64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CallCustomer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CallAnalysis>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallRecord {
    /// Tri-state success evaluation from the call analysis.
    pub fn success_evaluation(&self) -> Option<bool> {
        self.analysis.as_ref().and_then(|a| a.success_evaluation)
    }

    pub fn customer_number(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.number.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCustomer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalysis {
    /// `true`/`false` when the platform evaluated the call, absent otherwise.
    #[serde(
        default,
        deserialize_with = "lenient::bool_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub success_evaluation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A voice agent configured in the dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    pub name: String,
}

// ============ Remote payload shapes ============

/// Property listing response: bare array or `{ "properties": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyListResponse {
    List(Vec<Value>),
    Wrapped { properties: Vec<Value> },
}

impl PropertyListResponse {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            PropertyListResponse::List(items) => items,
            PropertyListResponse::Wrapped { properties } => properties,
        }
    }
}

/// Call listing response: bare array or `{ "calls": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CallListResponse {
    List(Vec<CallRecord>),
    Wrapped { calls: Vec<CallRecord> },
}

impl CallListResponse {
    pub fn into_calls(self) -> Vec<CallRecord> {
        match self {
            CallListResponse::List(calls) => calls,
            CallListResponse::Wrapped { calls } => calls,
        }
    }
}
