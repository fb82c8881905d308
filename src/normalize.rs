//! Property normalization.
//!
//! Every record entering the property store, whether typed into the
//! dashboard or returned by the webhook, passes through
//! [`normalize_property`]. The result has every field populated, at least one
//! configuration, and a top-level price equal to the cheapest configuration.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

use crate::lenient::parse_timestamp;
use crate::models::{
    Configuration, ConfigurationInput, PropertyInput, PropertyRecord, PropertyStatus,
    RERA_NOT_APPLICABLE,
};

/// Name given to the configuration synthesized for listings that have none.
pub const DEFAULT_CONFIGURATION_NAME: &str = "Standard";

pub fn normalize_property(input: PropertyInput, now: DateTime<Utc>) -> PropertyRecord {
    let id = non_blank(input.id).unwrap_or_else(|| Uuid::new_v4().to_string());
    let status = input.status.unwrap_or_default();
    let area = input.area.unwrap_or_default();
    let top_level_price = input.price.unwrap_or(0.0);

    let mut configurations: Vec<Configuration> = input
        .configurations
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, c)| normalize_configuration(&id, idx, c))
        .collect();

    if configurations.is_empty() {
        configurations.push(default_configuration(&id, &area, top_level_price, status));
    }

    let price = configurations
        .iter()
        .map(|c| c.price)
        .fold(f64::INFINITY, f64::min);

    PropertyRecord {
        title: input.title.unwrap_or_default(),
        property_type: input.property_type.unwrap_or_default(),
        location: input.location.unwrap_or_default(),
        city: input.city.unwrap_or_default(),
        micro_location: input.micro_location.unwrap_or_default(),
        description: input.description.unwrap_or_default(),
        area,
        price,
        status,
        configurations,
        amenities: input.amenities.unwrap_or_default(),
        active: input.active.unwrap_or(true),
        images: input.images.unwrap_or_default(),
        pdfs: input.pdfs.unwrap_or_default(),
        rera_id: non_blank(input.rera_id).unwrap_or_else(|| RERA_NOT_APPLICABLE.to_string()),
        created_at: input
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now),
        updated_at: input
            .updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now),
        id,
    }
}

/// Timestamps already known for a property id, used to keep refreshes stable
/// when the remote omits them.
pub type KnownTimestamps = HashMap<String, (DateTime<Utc>, DateTime<Utc>)>;

/// Normalizes one raw item from the remote listing.
///
/// Items that are not JSON objects are dropped. A missing id is derived from
/// the item's content and missing timestamps are taken from `known`, so an
/// unchanged remote response always normalizes to the same records.
pub fn normalize_remote_item(
    value: Value,
    now: DateTime<Utc>,
    known: &KnownTimestamps,
) -> Option<PropertyRecord> {
    if !value.is_object() {
        tracing::warn!("Skipping non-object property item: {}", value);
        return None;
    }

    let content_id = content_id(&value);
    let mut input = match serde_json::from_value::<PropertyInput>(value) {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!("Skipping malformed property item: {}", e);
            return None;
        }
    };

    let id = non_blank(input.id.take()).unwrap_or(content_id);
    if let Some((created_at, updated_at)) = known.get(&id) {
        if input.created_at.is_none() {
            input.created_at = Some(created_at.to_rfc3339());
        }
        if input.updated_at.is_none() {
            input.updated_at = Some(updated_at.to_rfc3339());
        }
    }
    input.id = Some(id);

    Some(normalize_property(input, now))
}

fn content_id(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("prop-{}", &digest[..16])
}

fn normalize_configuration(property_id: &str, idx: usize, input: ConfigurationInput) -> Configuration {
    let total_units = clamp_units(input.total_units.unwrap_or(0));
    let units_sold = clamp_units(input.units_sold.unwrap_or(0)).min(total_units);

    Configuration {
        id: non_blank(input.id).unwrap_or_else(|| format!("{}-cfg-{}", property_id, idx + 1)),
        name: non_blank(input.name).unwrap_or_else(|| format!("Configuration {}", idx + 1)),
        size: input.size.unwrap_or_default(),
        total_units,
        units_sold,
        price: input.price.unwrap_or(0.0),
        description: non_blank(input.description),
    }
}

fn default_configuration(
    property_id: &str,
    area: &str,
    price: f64,
    status: PropertyStatus,
) -> Configuration {
    let units_sold = match status {
        PropertyStatus::Available => 0,
        PropertyStatus::Sold | PropertyStatus::Rented => 1,
    };

    Configuration {
        id: format!("{}-default", property_id),
        name: DEFAULT_CONFIGURATION_NAME.to_string(),
        size: area.to_string(),
        total_units: 1,
        units_sold,
        price,
        description: None,
    }
}

fn clamp_units(raw: i64) -> u32 {
    raw.clamp(0, i64::from(u32::MAX)) as u32
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyType;
    use serde_json::json;

    fn input(value: Value) -> PropertyInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_input_gets_defaults() {
        let now = Utc::now();
        let record = normalize_property(PropertyInput::default(), now);

        assert!(!record.id.is_empty());
        assert_eq!(record.property_type, PropertyType::Apartment);
        assert_eq!(record.status, PropertyStatus::Available);
        assert_eq!(record.rera_id, RERA_NOT_APPLICABLE);
        assert!(record.active);
        assert_eq!(record.configurations.len(), 1);
        assert_eq!(record.configurations[0].name, DEFAULT_CONFIGURATION_NAME);
        assert_eq!(record.price, 0.0);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn test_price_is_minimum_configuration_price() {
        let record = normalize_property(
            input(json!({
                "id": "p1",
                "price": 1,
                "configurations": [
                    {"name": "3 BHK", "price": 9_500_000, "totalUnits": 10},
                    {"name": "2 BHK", "price": "6,200,000", "totalUnits": 20},
                    {"name": "4 BHK", "price": 14_000_000, "totalUnits": 4}
                ]
            })),
            Utc::now(),
        );

        assert_eq!(record.price, 6_200_000.0);
        assert_eq!(record.configurations[1].id, "p1-cfg-2");
    }

    #[test]
    fn test_units_sold_clamped() {
        let record = normalize_property(
            input(json!({
                "configurations": [
                    {"totalUnits": 5, "unitsSold": 9, "price": 10},
                    {"totalUnits": -3, "unitsSold": -1, "price": 20}
                ]
            })),
            Utc::now(),
        );

        assert_eq!(record.configurations[0].units_sold, 5);
        assert_eq!(record.configurations[1].total_units, 0);
        assert_eq!(record.configurations[1].units_sold, 0);
    }

    #[test]
    fn test_synthesized_configuration_follows_status() {
        let record = normalize_property(
            input(json!({"id": "v9", "price": 30_000_000, "area": "4200 sqft", "status": "sold"})),
            Utc::now(),
        );

        let cfg = &record.configurations[0];
        assert_eq!(cfg.id, "v9-default");
        assert_eq!(cfg.size, "4200 sqft");
        assert_eq!(cfg.units_sold, 1);
        assert_eq!(cfg.price, 30_000_000.0);
        assert_eq!(record.price, 30_000_000.0);
    }

    #[test]
    fn test_blank_rera_uses_sentinel() {
        let record = normalize_property(input(json!({"reraId": "  "})), Utc::now());
        assert_eq!(record.rera_id, RERA_NOT_APPLICABLE);
    }

    #[test]
    fn test_remote_item_skips_non_objects() {
        let known = KnownTimestamps::new();
        assert!(normalize_remote_item(json!("nope"), Utc::now(), &known).is_none());
        assert!(normalize_remote_item(json!({"title": "Ok"}), Utc::now(), &known).is_some());
    }

    #[test]
    fn test_remote_item_without_id_is_stable() {
        let known = KnownTimestamps::new();
        let item = json!({"title": "Palm Grove", "price": 100});
        let a = normalize_remote_item(item.clone(), Utc::now(), &known).unwrap();
        let b = normalize_remote_item(item, Utc::now(), &known).unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("prop-"));
    }

    #[test]
    fn test_remote_item_reuses_known_timestamps() {
        let then = Utc::now() - chrono::Duration::days(3);
        let mut known = KnownTimestamps::new();
        known.insert("p1".to_string(), (then, then));

        let record = normalize_remote_item(json!({"id": "p1"}), Utc::now(), &known).unwrap();
        assert_eq!(record.created_at, then);
        assert_eq!(record.updated_at, then);
    }
}
