//! Neurotransmitter concentration sequence
//!
//! A [`TemporalGrid`] specialization whose columns are the complete cross
//! product of [`Neurotransmitter`] × [`BrainRegion`]. Columns are resolved by
//! ordinal, so recording a level never parses a feature string, and levels
//! are clamped to the normalized [0, 1] concentration range before storage.

use crate::error::TwinError;
use crate::grid::{Resolution, TemporalGrid};
use crate::neuro::{feature_key, BrainRegion, Neurotransmitter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dense concentration grid over every (neurotransmitter, region) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeurotransmitterSequence {
    grid: TemporalGrid,
}

impl NeurotransmitterSequence {
    /// Create a sequence spanning `[start, end]` at the given resolution.
    ///
    /// One column per (neurotransmitter, region) pair, in
    /// `nt.index() * BrainRegion::ALL.len() + region.index()` order.
    pub fn new(
        patient_id: Option<Uuid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: Resolution,
    ) -> Result<Self, TwinError> {
        let features: Vec<String> = Neurotransmitter::ALL
            .iter()
            .flat_map(|nt| {
                BrainRegion::ALL
                    .iter()
                    .map(move |region| feature_key(*nt, *region))
            })
            .collect();

        Ok(Self {
            grid: TemporalGrid::new(patient_id, features, start, end, resolution)?,
        })
    }

    fn column_of(nt: Neurotransmitter, region: BrainRegion) -> usize {
        nt.index() * BrainRegion::ALL.len() + region.index()
    }

    /// Record a concentration level in the nearest timestamp slot.
    ///
    /// The level is clamped to [0, 1] before storage. Returns `false` when the
    /// timestamp is more than one resolution unit from every slot.
    pub fn record(
        &mut self,
        timestamp: DateTime<Utc>,
        nt: Neurotransmitter,
        region: BrainRegion,
        level: f64,
    ) -> bool {
        self.grid
            .insert_at_column(timestamp, Self::column_of(nt, region), level.clamp(0.0, 1.0))
    }

    /// String-keyed variant of [`record`](Self::record) for boundary callers
    pub fn record_feature(&mut self, timestamp: DateTime<Utc>, feature: &str, level: f64) -> bool {
        if !self.grid.contains_feature(feature) {
            return false;
        }
        self.grid.insert(timestamp, feature, level.clamp(0.0, 1.0))
    }

    /// Concentration series for one (neurotransmitter, region) pair
    pub fn series(&self, nt: Neurotransmitter, region: BrainRegion) -> Vec<(DateTime<Utc>, f64)> {
        self.grid
            .feature_series(&feature_key(nt, region))
            .unwrap_or_default()
    }

    /// Per-slot average of one neurotransmitter across all regions
    pub fn series_for_neurotransmitter(
        &self,
        nt: Neurotransmitter,
    ) -> Vec<(DateTime<Utc>, f64)> {
        let prefix = format!("{}_", nt.as_str());
        self.grid.averaged_series(|name| name.starts_with(&prefix))
    }

    /// Per-slot average of one region across all neurotransmitters
    pub fn series_for_region(&self, region: BrainRegion) -> Vec<(DateTime<Utc>, f64)> {
        let suffix = format!("_{}", region.as_str());
        self.grid.averaged_series(|name| name.ends_with(&suffix))
    }

    pub fn grid(&self) -> &TemporalGrid {
        &self.grid
    }

    pub fn sequence_id(&self) -> Uuid {
        self.grid.sequence_id
    }
}
