//! Derived call metrics and the aggregates behind the dashboard charts.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::lenient::parse_timestamp;
use crate::models::{Assistant, CallRecord, PropertyRecord, PropertyStatus, PropertyType};

/// `endedReason` values that mean nobody picked up.
const NO_ANSWER_REASONS: &[&str] = &[
    "customer-did-not-answer",
    "customer-busy",
    "voicemail",
    "silence-timed-out",
    "no-answer",
];

/// Call length in whole seconds.
///
/// Priority: `durationSeconds`, then `duration`, then `endedAt - startedAt`,
/// then zero.
pub fn call_duration_secs(call: &CallRecord) -> u64 {
    if let Some(secs) = call.duration_seconds {
        return whole_seconds(secs);
    }
    if let Some(secs) = call.duration {
        return whole_seconds(secs);
    }
    let started = call.started_at.as_deref().and_then(parse_timestamp);
    let ended = call.ended_at.as_deref().and_then(parse_timestamp);
    match (started, ended) {
        (Some(start), Some(end)) => {
            let millis = (end - start).num_milliseconds();
            whole_seconds(millis as f64 / 1000.0)
        }
        _ => 0,
    }
}

/// Longest duration a single call is credited with (one year).
const MAX_CALL_SECS: f64 = 365.0 * 24.0 * 3600.0;

fn whole_seconds(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.min(MAX_CALL_SECS).round() as u64
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Successful,
    Unsuccessful,
    NoAnswer,
    Completed,
    /// Not finished yet; carries the raw platform status.
    InProgress(String),
}

impl CallOutcome {
    pub fn label(&self) -> &str {
        match self {
            CallOutcome::Successful => "Successful",
            CallOutcome::Unsuccessful => "Unsuccessful",
            CallOutcome::NoAnswer => "No Answer",
            CallOutcome::Completed => "Completed",
            CallOutcome::InProgress(status) => status,
        }
    }
}

/// Classifies a call: the success evaluation wins, then a no-answer end
/// reason, then "ended", then whatever status the platform reported.
pub fn classify_call(call: &CallRecord) -> CallOutcome {
    match call.success_evaluation() {
        Some(true) => return CallOutcome::Successful,
        Some(false) => return CallOutcome::Unsuccessful,
        None => {}
    }

    let status = call.status.as_deref().unwrap_or("unknown");
    if status != "ended" {
        return CallOutcome::InProgress(status.to_string());
    }

    let no_answer = call
        .ended_reason
        .as_deref()
        .map(|reason| NO_ANSWER_REASONS.contains(&reason))
        .unwrap_or(false);
    if no_answer {
        CallOutcome::NoAnswer
    } else {
        CallOutcome::Completed
    }
}

/// Keeps calls placed by one of `assistant_ids`; an empty set keeps everything.
pub fn filter_by_assistants(calls: &[CallRecord], assistant_ids: &[String]) -> Vec<CallRecord> {
    if assistant_ids.is_empty() {
        return calls.to_vec();
    }
    let wanted: HashSet<&str> = assistant_ids.iter().map(String::as_str).collect();
    calls
        .iter()
        .filter(|c| {
            c.assistant_id
                .as_deref()
                .map(|id| wanted.contains(id))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Display name of the assistant that handled the call.
pub fn assistant_label(call: &CallRecord, assistants: &[Assistant]) -> String {
    let Some(id) = call.assistant_id.as_deref() else {
        return "Unknown".to_string();
    };
    assistants
        .iter()
        .find(|a| a.id == id)
        .map(|a| a.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Keys [`CallView`] writes itself; copies of them in the raw payload are dropped.
const DERIVED_KEYS: &[&str] = &["assistantName", "durationSecs", "outcome"];

/// A call plus the fields the dashboard derives from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallView {
    #[serde(flatten)]
    pub call: CallRecord,
    pub assistant_name: String,
    pub duration_secs: u64,
    pub outcome: CallOutcome,
}

impl CallView {
    pub fn new(mut call: CallRecord, assistants: &[Assistant]) -> Self {
        for key in DERIVED_KEYS {
            call.extra.remove(*key);
        }
        Self {
            assistant_name: assistant_label(&call, assistants),
            duration_secs: call_duration_secs(&call),
            outcome: classify_call(&call),
            call,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStats {
    pub total: usize,
    pub successful: usize,
    pub unsuccessful: usize,
    pub no_answer: usize,
    pub completed: usize,
    pub in_progress: usize,
    /// Share of evaluated calls marked successful, 0.0 when none were evaluated.
    pub success_rate: f64,
    pub total_duration_secs: u64,
    pub average_duration_secs: f64,
    pub total_cost: f64,
}

impl CallStats {
    pub fn from_calls(calls: &[CallRecord]) -> Self {
        let mut stats = CallStats {
            total: calls.len(),
            ..Default::default()
        };

        for call in calls {
            match classify_call(call) {
                CallOutcome::Successful => stats.successful += 1,
                CallOutcome::Unsuccessful => stats.unsuccessful += 1,
                CallOutcome::NoAnswer => stats.no_answer += 1,
                CallOutcome::Completed => stats.completed += 1,
                CallOutcome::InProgress(_) => stats.in_progress += 1,
            }
            stats.total_duration_secs = stats
                .total_duration_secs
                .saturating_add(call_duration_secs(call));
            stats.total_cost += call.cost.unwrap_or(0.0);
        }

        let evaluated = stats.successful + stats.unsuccessful;
        if evaluated > 0 {
            stats.success_rate = stats.successful as f64 / evaluated as f64;
        }
        if stats.total > 0 {
            stats.average_duration_secs = stats.total_duration_secs as f64 / stats.total as f64;
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub calls: usize,
}

/// Calls per UTC day, oldest first. Calls without a parseable
/// `createdAt`/`startedAt` are left out.
pub fn daily_volume(calls: &[CallRecord]) -> Vec<DailyVolume> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for call in calls {
        let stamp = call
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| call.started_at.as_deref().and_then(parse_timestamp));
        if let Some(stamp) = stamp {
            *per_day.entry(stamp.date_naive()).or_default() += 1;
        }
    }
    per_day
        .into_iter()
        .map(|(date, calls)| DailyVolume { date, calls })
        .collect()
}

/// Inventory numbers for the property charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub total: usize,
    pub available: usize,
    pub sold: usize,
    pub rented: usize,
    pub apartments: usize,
    pub villas: usize,
    pub commercial: usize,
    pub total_units: u64,
    pub units_sold: u64,
    pub lowest_price: Option<f64>,
}

impl PropertySummary {
    /// Summarizes the active records only.
    pub fn from_records(records: &[PropertyRecord]) -> Self {
        let mut summary = PropertySummary::default();
        for record in records.iter().filter(|r| r.active) {
            summary.total += 1;
            match record.status {
                PropertyStatus::Available => summary.available += 1,
                PropertyStatus::Sold => summary.sold += 1,
                PropertyStatus::Rented => summary.rented += 1,
            }
            match record.property_type {
                PropertyType::Apartment => summary.apartments += 1,
                PropertyType::Villa => summary.villas += 1,
                PropertyType::Commercial => summary.commercial += 1,
            }
            summary.total_units = summary.total_units.saturating_add(record.total_units());
            summary.units_sold = summary.units_sold.saturating_add(record.units_sold());
            summary.lowest_price = Some(match summary.lowest_price {
                Some(lowest) => lowest.min(record.price),
                None => record.price,
            });
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(value: serde_json::Value) -> CallRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_duration_from_timestamps() {
        let c = call(json!({
            "id": "c1",
            "startedAt": "2024-01-01T00:00:00Z",
            "endedAt": "2024-01-01T00:02:30Z"
        }));
        assert_eq!(call_duration_secs(&c), 150);
    }

    #[test]
    fn test_duration_priority() {
        let c = call(json!({
            "durationSeconds": 42.4,
            "duration": 99,
            "startedAt": "2024-01-01T00:00:00Z",
            "endedAt": "2024-01-01T00:02:30Z"
        }));
        assert_eq!(call_duration_secs(&c), 42);

        let c = call(json!({
            "duration": "99",
            "startedAt": "2024-01-01T00:00:00Z",
            "endedAt": "2024-01-01T00:02:30Z"
        }));
        assert_eq!(call_duration_secs(&c), 99);

        let c = call(json!({"startedAt": "2024-01-01T00:00:00Z"}));
        assert_eq!(call_duration_secs(&c), 0);
    }

    #[test]
    fn test_classification_priority() {
        let evaluated = call(json!({
            "status": "ended",
            "endedReason": "customer-did-not-answer",
            "analysis": {"successEvaluation": false}
        }));
        assert_eq!(classify_call(&evaluated), CallOutcome::Unsuccessful);

        let no_answer = call(json!({"status": "ended", "endedReason": "customer-busy"}));
        assert_eq!(classify_call(&no_answer), CallOutcome::NoAnswer);

        let completed = call(json!({"status": "ended", "endedReason": "assistant-ended-call"}));
        assert_eq!(classify_call(&completed), CallOutcome::Completed);

        let live = call(json!({"status": "in-progress"}));
        assert_eq!(classify_call(&live), CallOutcome::InProgress("in-progress".to_string()));
        assert_eq!(classify_call(&live).label(), "in-progress");
    }

    #[test]
    fn test_filter_by_assistants() {
        let calls = vec![
            call(json!({"id": "1", "assistantId": "a"})),
            call(json!({"id": "2", "assistantId": "b"})),
            call(json!({"id": "3"})),
        ];
        assert_eq!(filter_by_assistants(&calls, &[]).len(), 3);

        let only_a = filter_by_assistants(&calls, &["a".to_string()]);
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].id, "1");
    }

    #[test]
    fn test_stats_and_daily_volume() {
        let calls = vec![
            call(json!({"createdAt": "2024-03-01T10:00:00Z", "status": "ended",
                        "analysis": {"successEvaluation": true}, "duration": 60, "cost": 0.5})),
            call(json!({"createdAt": "2024-03-01T12:00:00Z", "status": "ended",
                        "analysis": {"successEvaluation": false}, "duration": 30, "cost": 0.25})),
            call(json!({"createdAt": "2024-03-02T09:00:00Z", "status": "queued"})),
        ];

        let stats = CallStats::from_calls(&calls);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.success_rate, 0.5);
        assert_eq!(stats.total_duration_secs, 90);
        assert_eq!(stats.average_duration_secs, 30.0);
        assert_eq!(stats.total_cost, 0.75);

        let volume = daily_volume(&calls);
        assert_eq!(volume.len(), 2);
        assert_eq!(volume[0].calls, 2);
        assert_eq!(volume[1].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[test]
    fn test_assistant_label_falls_back_to_id() {
        let assistants = vec![Assistant {
            id: "a".to_string(),
            name: "Sales Desk".to_string(),
        }];
        assert_eq!(assistant_label(&call(json!({"assistantId": "a"})), &assistants), "Sales Desk");
        assert_eq!(assistant_label(&call(json!({"assistantId": "z"})), &assistants), "z");
        assert_eq!(assistant_label(&call(json!({})), &assistants), "Unknown");
    }

    #[test]
    fn test_huge_durations_do_not_overflow_stats() {
        let calls = vec![
            call(json!({"id": "1", "status": "ended", "durationSeconds": 1e20})),
            call(json!({"id": "2", "status": "ended", "durationSeconds": 1e20})),
        ];

        assert_eq!(call_duration_secs(&calls[0]), MAX_CALL_SECS as u64);
        let stats = CallStats::from_calls(&calls);
        assert_eq!(stats.total_duration_secs, 2 * MAX_CALL_SECS as u64);
    }

    #[test]
    fn test_summary_handles_max_unit_counts() {
        let input = serde_json::from_value(json!({
            "id": "tower",
            "configurations": [
                {"price": 1, "totalUnits": 4294967295u64, "unitsSold": 4294967295u64},
                {"price": 2, "totalUnits": 5, "unitsSold": 5}
            ]
        }))
        .unwrap();
        let record = crate::normalize::normalize_property(input, chrono::Utc::now());

        let summary = PropertySummary::from_records(&[record.clone(), record]);
        assert_eq!(summary.total_units, 2 * (u64::from(u32::MAX) + 5));
        assert_eq!(summary.units_sold, summary.total_units);
    }

    #[test]
    fn test_call_view_drops_colliding_raw_keys() {
        let raw = call(json!({
            "id": "c1",
            "assistantId": "a",
            "assistantName": "Stale Name",
            "outcome": "whatever",
            "status": "ended"
        }));
        let assistants = vec![Assistant {
            id: "a".to_string(),
            name: "Sales Desk".to_string(),
        }];

        let view = CallView::new(raw, &assistants);
        let text = serde_json::to_string(&view).unwrap();

        assert_eq!(text.matches("\"assistantName\"").count(), 1);
        assert_eq!(text.matches("\"outcome\"").count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["assistantName"], "Sales Desk");
        assert_eq!(value["outcome"]["kind"], "completed");
    }
}
