//! Temporal Twin - Temporal neurotransmitter time-series and biometric
//! correlation engine for psychiatric digital twins
//!
//! The engine models multi-dimensional biometric and neurotransmitter
//! measurements over time and discovers their relationship to symptom
//! severity: raw measurement → nearest-slot insertion into a dense temporal
//! grid → trend and anomaly statistics → lagged biometric-symptom
//! correlation search.
//!
//! ## Modules
//!
//! - **event / neuro**: atomic timestamped measurements and the
//!   neurotransmitter × brain-region vocabulary
//! - **grid / sequence**: fixed-resolution dense time grids
//! - **analysis**: trend classification, anomaly statistics, lag search
//! - **twin**: per-patient biometric aggregate with baseline bookkeeping
//! - **service**: orchestration facades with graceful degradation

pub mod analysis;
pub mod error;
pub mod event;
pub mod grid;
pub mod model;
pub mod neuro;
pub mod schema;
pub mod sequence;
pub mod service;
pub mod twin;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::TwinError;
pub use event::{CorrelatedEvent, CorrelationType, EventValue, TemporalEvent};
pub use grid::{Resolution, TemporalGrid};
pub use neuro::{
    create_default_neurotransmitter_mapping, feature_key, BrainRegion, Neurotransmitter,
};
pub use sequence::NeurotransmitterSequence;
pub use service::{ConcentrationService, CorrelationReport, CorrelationService};
pub use twin::{BiometricDataPoint, BiometricTwin};

// Schema exports
pub use schema::{RawSample, SampleAdapter, SymptomSeries, SCHEMA_VERSION};

/// Engine version embedded in reports and FFI payloads
pub const TWIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const ENGINE_NAME: &str = "temporal-twin";
