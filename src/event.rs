//! Temporal event entities
//!
//! A `TemporalEvent` is the atomic timestamped measurement that feeds the
//! dense temporal grids. A `CorrelatedEvent` wraps an event with correlation
//! metadata and back-references to related events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Measurement payload carried by a temporal event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Float(f64),
    Bool(bool),
    Text(String),
}

impl EventValue {
    /// Numeric view of the payload. Non-numeric payloads contribute 0.0
    /// to downstream statistics.
    pub fn as_f64(&self) -> f64 {
        match self {
            EventValue::Float(v) => *v,
            EventValue::Bool(_) | EventValue::Text(_) => 0.0,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, EventValue::Float(_))
    }
}

impl From<f64> for EventValue {
    fn from(v: f64) -> Self {
        EventValue::Float(v)
    }
}

/// Atomic timestamped measurement.
///
/// `event_id` is assigned once at construction and never changes. The only
/// mutable state is the payload and metadata, via the explicit update methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalEvent {
    pub event_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub value: EventValue,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TemporalEvent {
    /// Create a new event with a fresh unique identifier
    pub fn new(timestamp: DateTime<Utc>, value: EventValue) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            patient_id: None,
            timestamp,
            value,
            metadata: HashMap::new(),
        }
    }

    /// Create a new event owned by a patient
    pub fn for_patient(patient_id: Uuid, timestamp: DateTime<Utc>, value: EventValue) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Self::new(timestamp, value)
        }
    }

    /// Replace the measurement payload
    pub fn update_value(&mut self, value: EventValue) {
        self.value = value;
    }

    /// Attach a metadata entry (last write wins per key)
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}

/// Relationship classification between correlated events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationType {
    Causation,
    Association,
    Temporal,
    CausalChain,
    Bidirectional,
}

impl CorrelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationType::Causation => "causation",
            CorrelationType::Association => "association",
            CorrelationType::Temporal => "temporal",
            CorrelationType::CausalChain => "causal_chain",
            CorrelationType::Bidirectional => "bidirectional",
        }
    }
}

/// Temporal event enriched with correlation metadata.
///
/// `correlated_events` holds back-references only; linked events are not
/// owned and may outlive (or predate) this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedEvent {
    pub event: TemporalEvent,
    pub correlation_type: CorrelationType,
    correlation_strength: f64,
    #[serde(default)]
    pub correlated_events: HashSet<Uuid>,
}

impl CorrelatedEvent {
    /// Wrap an event with correlation metadata. Strength is clamped to [0, 1].
    pub fn new(event: TemporalEvent, correlation_type: CorrelationType, strength: f64) -> Self {
        Self {
            event,
            correlation_type,
            correlation_strength: strength.clamp(0.0, 1.0),
            correlated_events: HashSet::new(),
        }
    }

    pub fn correlation_strength(&self) -> f64 {
        self.correlation_strength
    }

    /// Update the correlation strength, clamped to [0, 1]
    pub fn set_correlation_strength(&mut self, strength: f64) {
        self.correlation_strength = strength.clamp(0.0, 1.0);
    }

    /// Record a back-reference to another event
    pub fn link(&mut self, other: Uuid) {
        self.correlated_events.insert(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = TemporalEvent::new(ts(), EventValue::Float(0.5));
        let b = TemporalEvent::new(ts(), EventValue::Float(0.5));
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_update_value_and_metadata() {
        let mut event = TemporalEvent::new(ts(), EventValue::Float(0.2));
        event.update_value(EventValue::Float(0.8));
        event.add_metadata("source", "wearable");
        event.add_metadata("source", "lab");

        assert_eq!(event.value, EventValue::Float(0.8));
        assert_eq!(event.metadata.get("source").map(String::as_str), Some("lab"));
    }

    #[test]
    fn test_non_numeric_values_coerce_to_zero() {
        assert_eq!(EventValue::Float(1.5).as_f64(), 1.5);
        assert_eq!(EventValue::Bool(true).as_f64(), 0.0);
        assert_eq!(EventValue::Text("n/a".to_string()).as_f64(), 0.0);
    }

    #[test]
    fn test_correlation_strength_clamped() {
        let event = TemporalEvent::new(ts(), EventValue::Float(0.5));
        let mut correlated = CorrelatedEvent::new(event, CorrelationType::Association, 1.7);
        assert_eq!(correlated.correlation_strength(), 1.0);

        correlated.set_correlation_strength(-0.3);
        assert_eq!(correlated.correlation_strength(), 0.0);

        correlated.set_correlation_strength(0.42);
        assert_eq!(correlated.correlation_strength(), 0.42);
    }

    #[test]
    fn test_link_is_back_reference_only() {
        let a = TemporalEvent::new(ts(), EventValue::Float(0.5));
        let b_id = Uuid::new_v4();

        let mut correlated = CorrelatedEvent::new(a, CorrelationType::Temporal, 0.6);
        correlated.link(b_id);
        correlated.link(b_id);

        assert_eq!(correlated.correlated_events.len(), 1);
        assert!(correlated.correlated_events.contains(&b_id));
    }

    #[test]
    fn test_event_value_serde_untagged() {
        let json = serde_json::to_string(&EventValue::Float(0.75)).unwrap();
        assert_eq!(json, "0.75");
        let back: EventValue = serde_json::from_str("0.75").unwrap();
        assert_eq!(back, EventValue::Float(0.75));
        let text: EventValue = serde_json::from_str("\"elevated\"").unwrap();
        assert_eq!(text, EventValue::Text("elevated".to_string()));
    }
}
