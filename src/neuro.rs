//! Neurotransmitter and brain-region vocabulary
//!
//! Closed sum types for the measured neurotransmitters and the brain regions
//! they are sampled in, plus the feature-key convention used by the dense
//! temporal grids: one column per (neurotransmitter, region) pair named
//! `"{neurotransmitter}_{brain_region}"`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Measured neurotransmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neurotransmitter {
    Serotonin,
    Dopamine,
    Norepinephrine,
    Gaba,
    Glutamate,
    Acetylcholine,
}

impl Neurotransmitter {
    pub const ALL: [Neurotransmitter; 6] = [
        Neurotransmitter::Serotonin,
        Neurotransmitter::Dopamine,
        Neurotransmitter::Norepinephrine,
        Neurotransmitter::Gaba,
        Neurotransmitter::Glutamate,
        Neurotransmitter::Acetylcholine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Neurotransmitter::Serotonin => "serotonin",
            Neurotransmitter::Dopamine => "dopamine",
            Neurotransmitter::Norepinephrine => "norepinephrine",
            Neurotransmitter::Gaba => "gaba",
            Neurotransmitter::Glutamate => "glutamate",
            Neurotransmitter::Acetylcholine => "acetylcholine",
        }
    }

    /// Stable ordinal within [`Neurotransmitter::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Neurotransmitter::Serotonin => 0,
            Neurotransmitter::Dopamine => 1,
            Neurotransmitter::Norepinephrine => 2,
            Neurotransmitter::Gaba => 3,
            Neurotransmitter::Glutamate => 4,
            Neurotransmitter::Acetylcholine => 5,
        }
    }
}

/// Brain region a measurement is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrainRegion {
    PrefrontalCortex,
    Amygdala,
    Hippocampus,
    NucleusAccumbens,
    VentralTegmentalArea,
    Hypothalamus,
}

impl BrainRegion {
    pub const ALL: [BrainRegion; 6] = [
        BrainRegion::PrefrontalCortex,
        BrainRegion::Amygdala,
        BrainRegion::Hippocampus,
        BrainRegion::NucleusAccumbens,
        BrainRegion::VentralTegmentalArea,
        BrainRegion::Hypothalamus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrainRegion::PrefrontalCortex => "prefrontal_cortex",
            BrainRegion::Amygdala => "amygdala",
            BrainRegion::Hippocampus => "hippocampus",
            BrainRegion::NucleusAccumbens => "nucleus_accumbens",
            BrainRegion::VentralTegmentalArea => "ventral_tegmental_area",
            BrainRegion::Hypothalamus => "hypothalamus",
        }
    }

    /// Stable ordinal within [`BrainRegion::ALL`]
    pub fn index(&self) -> usize {
        match self {
            BrainRegion::PrefrontalCortex => 0,
            BrainRegion::Amygdala => 1,
            BrainRegion::Hippocampus => 2,
            BrainRegion::NucleusAccumbens => 3,
            BrainRegion::VentralTegmentalArea => 4,
            BrainRegion::Hypothalamus => 5,
        }
    }
}

/// Grid column name for a (neurotransmitter, region) pair
pub fn feature_key(nt: Neurotransmitter, region: BrainRegion) -> String {
    format!("{}_{}", nt.as_str(), region.as_str())
}

/// Inverse of [`feature_key`]. Intended for boundary parsing (CLI, ingestion);
/// grid inserts resolve columns by ordinal, never by string.
pub fn parse_feature_key(key: &str) -> Option<(Neurotransmitter, BrainRegion)> {
    for nt in Neurotransmitter::ALL {
        let prefix = nt.as_str();
        if let Some(rest) = key.strip_prefix(prefix) {
            let Some(region_str) = rest.strip_prefix('_') else {
                continue;
            };
            for region in BrainRegion::ALL {
                if region.as_str() == region_str {
                    return Some((nt, region));
                }
            }
        }
    }
    None
}

/// Snapshot of one neurotransmitter level in one region.
///
/// Levels are exposed through the explicit [`level`](NeurotransmitterState::level)
/// accessor; this type does not pretend to be a raw float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeurotransmitterState {
    pub neurotransmitter: Neurotransmitter,
    pub region: BrainRegion,
    level: f64,
}

impl NeurotransmitterState {
    /// Create a state snapshot. Level is clamped to the normalized [0, 1] range.
    pub fn new(nt: Neurotransmitter, region: BrainRegion, level: f64) -> Self {
        Self {
            neurotransmitter: nt,
            region,
            level: level.clamp(0.0, 1.0),
        }
    }

    /// Normalized concentration level in [0, 1]
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Signed deviation from the expected level in `mapping`, if one is defined
    pub fn deviation_from(&self, mapping: &NeurotransmitterMapping) -> Option<f64> {
        mapping
            .expected_level(self.neurotransmitter, self.region)
            .map(|expected| self.level - expected)
    }
}

/// Expected baseline levels per (neurotransmitter, region) pair.
///
/// Produced by [`create_default_neurotransmitter_mapping`]; treat the value as
/// immutable reference data, not process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeurotransmitterMapping {
    expected: HashMap<String, f64>,
}

impl NeurotransmitterMapping {
    /// Expected normalized level for a pair, if the mapping defines one
    pub fn expected_level(&self, nt: Neurotransmitter, region: BrainRegion) -> Option<f64> {
        self.expected.get(&feature_key(nt, region)).copied()
    }

    /// Number of pairs with a defined expectation
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}

/// Build the default expected-level mapping covering the complete
/// neurotransmitter × region cross product.
///
/// Every pair starts at a neutral 0.5; pairs with a well-characterized
/// production or receptor profile carry an adjusted expectation.
pub fn create_default_neurotransmitter_mapping() -> NeurotransmitterMapping {
    let mut expected = HashMap::new();
    for nt in Neurotransmitter::ALL {
        for region in BrainRegion::ALL {
            expected.insert(feature_key(nt, region), 0.5);
        }
    }

    // Region-specific expectations for the dominant systems
    let adjusted = [
        (Neurotransmitter::Serotonin, BrainRegion::PrefrontalCortex, 0.6),
        (Neurotransmitter::Dopamine, BrainRegion::NucleusAccumbens, 0.7),
        (Neurotransmitter::Dopamine, BrainRegion::VentralTegmentalArea, 0.7),
        (Neurotransmitter::Norepinephrine, BrainRegion::Amygdala, 0.6),
        (Neurotransmitter::Gaba, BrainRegion::Hippocampus, 0.6),
        (Neurotransmitter::Glutamate, BrainRegion::PrefrontalCortex, 0.65),
        (Neurotransmitter::Acetylcholine, BrainRegion::Hippocampus, 0.65),
    ];
    for (nt, region, level) in adjusted {
        expected.insert(feature_key(nt, region), level);
    }

    NeurotransmitterMapping { expected }
}
