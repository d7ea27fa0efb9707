//! Service orchestration
//!
//! Two service facades sit on top of the pure analysis functions:
//! - [`ConcentrationService`]: per-patient neurotransmitter streams with
//!   dense-grid history and trend analysis
//! - [`CorrelationService`]: biometric-vs-symptom correlation discovery with
//!   graceful degradation at the service boundary
//!
//! The pure computation underneath is synchronous and side-effect-free;
//! these facades own the mutable per-patient state and must be written to
//! from a single writer at a time.

use crate::analysis::stats::two_tailed_p_value;
use crate::analysis::trend::{analyze_trend, TrendReport};
use crate::error::TwinError;
use crate::event::{CorrelatedEvent, CorrelationType, EventValue, TemporalEvent};
use crate::grid::Resolution;
use crate::model::{CorrelationModel, LagSearchModel, ModelMetrics};
use crate::neuro::{feature_key, BrainRegion, Neurotransmitter};
use crate::schema::{SamplePoint, SymptomSeries};
use crate::sequence::NeurotransmitterSequence;
use crate::twin::{BiometricDataPoint, BiometricTwin};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use uuid::Uuid;

/// Source of symptom severity series for a patient
pub trait SymptomProvider {
    fn symptom_series(
        &self,
        patient_id: Uuid,
        lookback_days: u32,
    ) -> Result<Vec<SymptomSeries>, TwinError>;
}

/// In-memory provider over a fixed set of series; used by the CLI, the FFI
/// surface, and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSymptomProvider {
    series: Vec<SymptomSeries>,
}

impl StaticSymptomProvider {
    pub fn new(series: Vec<SymptomSeries>) -> Self {
        Self { series }
    }
}

impl SymptomProvider for StaticSymptomProvider {
    fn symptom_series(
        &self,
        _patient_id: Uuid,
        _lookback_days: u32,
    ) -> Result<Vec<SymptomSeries>, TwinError> {
        Ok(self.series.clone())
    }
}

/// Tuning knobs for correlation discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Lag search horizon in days
    pub max_lag_days: usize,
    /// Total sample count below which a report is low-reliability
    pub min_viable_samples: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            max_lag_days: 7,
            min_viable_samples: 10,
        }
    }
}

/// Coarse confidence label for a whole report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    Low,
    Moderate,
    High,
}

impl Reliability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reliability::Low => "low",
            Reliability::Moderate => "moderate",
            Reliability::High => "high",
        }
    }
}

/// One surfaced biometric-symptom association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationFinding {
    pub biometric_type: String,
    pub symptom_type: String,
    pub coefficient: f64,
    /// Days by which the biometric signal precedes the symptom signal
    pub lag_days: usize,
    pub confidence: f64,
    pub p_value: f64,
}

/// Human-readable takeaway for one finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub kind: String,
    pub message: String,
    pub action: String,
}

/// Result of a correlation analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub patient_id: Uuid,
    pub reliability: Reliability,
    pub correlations: Vec<CorrelationFinding>,
    pub insights: Vec<Insight>,
    /// Fraction of the lookback window covered by samples, per biometric type
    pub biometric_coverage: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_metrics: Option<ModelMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CorrelationReport {
    fn empty(patient_id: Uuid, reliability: Reliability) -> Self {
        Self {
            patient_id,
            reliability,
            correlations: Vec::new(),
            insights: Vec::new(),
            biometric_coverage: HashMap::new(),
            model_metrics: None,
            warning: None,
            error: None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Biometric-symptom correlation discovery service
pub struct CorrelationService<P: SymptomProvider> {
    provider: P,
    model: Box<dyn CorrelationModel>,
    config: CorrelationConfig,
}

impl<P: SymptomProvider> CorrelationService<P> {
    /// Create a service with the reference lag-search model
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            model: Box::new(LagSearchModel),
            config: CorrelationConfig::default(),
        }
    }

    /// Swap in an external correlation model
    pub fn with_model(provider: P, model: Box<dyn CorrelationModel>) -> Self {
        Self {
            provider,
            model,
            config: CorrelationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CorrelationConfig) -> Self {
        self.config = config;
        self
    }

    /// Discover lagged correlations between the supplied biometric series and
    /// the patient's symptom series.
    ///
    /// Empty input is a caller error and raises; insufficient input degrades
    /// to a low-reliability report; internal failures are caught and surfaced
    /// in the report's `error` field.
    pub fn analyze_correlations(
        &self,
        patient_id: Uuid,
        biometric_data: &HashMap<String, Vec<SamplePoint>>,
        lookback_days: u32,
        correlation_threshold: f64,
    ) -> Result<CorrelationReport, TwinError> {
        if biometric_data.is_empty() {
            return Err(TwinError::EmptyBiometricData);
        }

        let total_samples: usize = biometric_data.values().map(Vec::len).sum();
        let coverage = biometric_coverage(biometric_data, lookback_days);

        if total_samples < self.config.min_viable_samples {
            let mut report = CorrelationReport::empty(patient_id, Reliability::Low);
            report.biometric_coverage = coverage;
            report.warning = Some(format!(
                "insufficient_data: need at least {} samples across biometric types, got {}",
                self.config.min_viable_samples, total_samples
            ));
            return Ok(report);
        }

        match self.run_analysis(patient_id, biometric_data, lookback_days, correlation_threshold)
        {
            Ok((findings, metrics)) => {
                let reliability = if total_samples < self.config.min_viable_samples * 3 {
                    Reliability::Moderate
                } else {
                    Reliability::High
                };
                let insights = findings.iter().map(build_insight).collect();
                let mut report = CorrelationReport::empty(patient_id, reliability);
                report.correlations = findings;
                report.insights = insights;
                report.biometric_coverage = coverage;
                report.model_metrics = Some(metrics);
                Ok(report)
            }
            Err(e) => {
                warn!(patient_id = %patient_id, error = %e, "correlation analysis failed");
                let mut report = CorrelationReport::empty(patient_id, Reliability::Low);
                report.biometric_coverage = coverage;
                report.error = Some(e.to_string());
                Ok(report)
            }
        }
    }

    fn run_analysis(
        &self,
        patient_id: Uuid,
        biometric_data: &HashMap<String, Vec<SamplePoint>>,
        lookback_days: u32,
        correlation_threshold: f64,
    ) -> Result<(Vec<CorrelationFinding>, ModelMetrics), TwinError> {
        let Some(anchor) = biometric_data
            .values()
            .flatten()
            .map(|p| p.timestamp)
            .max()
        else {
            // Non-empty map but all series empty
            return Ok((
                Vec::new(),
                ModelMetrics {
                    name: self.model.name().to_string(),
                    version: self.model.version().to_string(),
                    pairs_evaluated: 0,
                },
            ));
        };
        let window_start = anchor - Duration::days(lookback_days as i64);

        let symptoms = self.provider.symptom_series(patient_id, lookback_days)?;
        let symptom_dailies: Vec<(String, Vec<(DateTime<Utc>, f64)>)> = symptoms
            .iter()
            .map(|s| {
                (
                    s.symptom_type.clone(),
                    resample_daily_pairs(&s.to_points(), window_start, anchor),
                )
            })
            .filter(|(_, daily)| !daily.is_empty())
            .collect();

        let mut findings = Vec::new();
        let mut pairs_evaluated = 0usize;

        // Deterministic iteration order for stable reports
        let ordered: BTreeMap<&String, &Vec<SamplePoint>> = biometric_data.iter().collect();
        for (biometric_type, points) in ordered {
            let daily = resample_daily(points, window_start, anchor);
            if daily.is_empty() {
                debug!(biometric_type = %biometric_type, "no samples inside lookback window");
                continue;
            }

            for (symptom_type, symptom_daily) in &symptom_dailies {
                let outcome =
                    self.model
                        .correlate(&daily, symptom_daily, self.config.max_lag_days)?;
                pairs_evaluated += 1;

                if outcome.sample_count < 2
                    || outcome.coefficient.abs() < correlation_threshold
                {
                    continue;
                }

                let data_factor =
                    (outcome.sample_count as f64 / lookback_days.max(1) as f64).clamp(0.0, 1.0);
                findings.push(CorrelationFinding {
                    biometric_type: biometric_type.clone(),
                    symptom_type: symptom_type.clone(),
                    coefficient: outcome.coefficient,
                    lag_days: outcome.lag_steps,
                    confidence: (0.6 * outcome.coefficient.abs() + 0.4 * data_factor)
                        .clamp(0.0, 1.0),
                    p_value: two_tailed_p_value(outcome.coefficient, outcome.sample_count),
                });
            }
        }

        findings.sort_by(|a, b| {
            b.coefficient
                .abs()
                .partial_cmp(&a.coefficient.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok((
            findings,
            ModelMetrics {
                name: self.model.name().to_string(),
                version: self.model.version().to_string(),
                pairs_evaluated,
            },
        ))
    }
}

/// Fraction of the lookback window covered by samples, per type
fn biometric_coverage(
    biometric_data: &HashMap<String, Vec<SamplePoint>>,
    lookback_days: u32,
) -> HashMap<String, f64> {
    let anchor = biometric_data.values().flatten().map(|p| p.timestamp).max();
    let mut coverage = HashMap::with_capacity(biometric_data.len());
    for (data_type, points) in biometric_data {
        let fraction = match anchor {
            Some(anchor) if lookback_days > 0 => {
                let window_start = anchor - Duration::days(lookback_days as i64);
                let distinct_days: std::collections::HashSet<_> = points
                    .iter()
                    .filter(|p| p.timestamp >= window_start)
                    .map(|p| p.timestamp.date_naive())
                    .collect();
                (distinct_days.len() as f64 / lookback_days as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };
        coverage.insert(data_type.clone(), fraction);
    }
    coverage
}

/// Bucket samples by calendar day, averaging same-day values, bounded to the
/// window. Output timestamps sit at midnight UTC of each day.
fn resample_daily(
    points: &[SamplePoint],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, f64)> {
    let pairs: Vec<(DateTime<Utc>, f64)> =
        points.iter().map(|p| (p.timestamp, p.value)).collect();
    resample_daily_pairs(&pairs, window_start, window_end)
}

fn resample_daily_pairs(
    points: &[(DateTime<Utc>, f64)],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, f64)> {
    let mut buckets: BTreeMap<chrono::NaiveDate, (f64, usize)> = BTreeMap::new();
    for (ts, value) in points {
        if *ts < window_start || *ts > window_end {
            continue;
        }
        let entry = buckets.entry(ts.date_naive()).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(date, (sum, count))| {
            let midnight = date.and_time(NaiveTime::MIN).and_utc();
            (midnight, sum / count as f64)
        })
        .collect()
}

fn build_insight(finding: &CorrelationFinding) -> Insight {
    let direction = if finding.coefficient >= 0.0 {
        "rises and falls with"
    } else {
        "moves inversely to"
    };
    let timing = if finding.lag_days == 0 {
        "on the same day".to_string()
    } else {
        format!("{} day(s) ahead", finding.lag_days)
    };
    Insight {
        kind: "biometric_correlation".to_string(),
        message: format!(
            "{} {} {} severity {} (r = {:.2})",
            finding.biometric_type, direction, finding.symptom_type, timing, finding.coefficient
        ),
        action: format!(
            "Review {} patterns when assessing {}; shifts may precede symptom changes by {} day(s)",
            finding.biometric_type, finding.symptom_type, finding.lag_days
        ),
    }
}

/// Tuning knobs for the concentration service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationConfig {
    /// Grid resolution for history and trend sequences
    pub resolution: Resolution,
    /// Trailing window, in days, a trend analysis looks back over
    pub retention_days: i64,
    /// Moving-average window for trend classification
    pub trend_window: usize,
}

impl Default for ConcentrationConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Hourly,
            retention_days: 14,
            trend_window: 3,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredConcentration {
    event: TemporalEvent,
    neurotransmitter: Neurotransmitter,
    region: BrainRegion,
}

#[derive(Debug, Clone)]
struct PatientStream {
    sequence_id: Uuid,
    events: Vec<StoredConcentration>,
}

/// Per-patient neurotransmitter concentration streams.
///
/// Raw measurements are kept as temporal events; dense grids are built on
/// demand for history queries and trend analysis.
#[derive(Default)]
pub struct ConcentrationService {
    config: ConcentrationConfig,
    streams: HashMap<Uuid, PatientStream>,
    twins: HashMap<Uuid, BiometricTwin>,
    correlated: HashMap<Uuid, CorrelatedEvent>,
}

impl ConcentrationService {
    pub fn new(config: ConcentrationConfig) -> Self {
        Self {
            config,
            streams: HashMap::new(),
            twins: HashMap::new(),
            correlated: HashMap::new(),
        }
    }

    /// Record one concentration measurement; returns the patient's stable
    /// sequence id. Levels are clamped when the grid is built, not here; the
    /// raw measurement is preserved as delivered.
    pub fn record_concentration(
        &mut self,
        patient_id: Uuid,
        nt: Neurotransmitter,
        region: BrainRegion,
        level: f64,
        timestamp: DateTime<Utc>,
    ) -> Uuid {
        let stream = self.streams.entry(patient_id).or_insert_with(|| PatientStream {
            sequence_id: Uuid::new_v4(),
            events: Vec::new(),
        });
        stream.events.push(StoredConcentration {
            event: TemporalEvent::for_patient(patient_id, timestamp, EventValue::Float(level)),
            neurotransmitter: nt,
            region,
        });
        stream.sequence_id
    }

    /// Dense concentration history for one (neurotransmitter, region) pair
    /// over `[start, end]`. The returned sequence spans the full feature
    /// cross product; only the requested pair's column is populated.
    pub fn get_concentration_history(
        &self,
        patient_id: Uuid,
        nt: Neurotransmitter,
        region: BrainRegion,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<NeurotransmitterSequence, TwinError> {
        self.history_sequence(patient_id, start, end, Some((nt, region)))
    }

    /// Classify the trend of one pair over the trailing retention window,
    /// with the full grid populated so cross-feature correlations surface.
    pub fn analyze_trend(
        &self,
        patient_id: Uuid,
        nt: Neurotransmitter,
        region: BrainRegion,
        window_size: usize,
    ) -> Result<TrendReport, TwinError> {
        let stream = self
            .streams
            .get(&patient_id)
            .ok_or(TwinError::UnknownPatient(patient_id))?;
        let anchor = stream
            .events
            .iter()
            .map(|s| s.event.timestamp)
            .max()
            .ok_or(TwinError::UnknownPatient(patient_id))?;

        let start = anchor - Duration::days(self.config.retention_days);
        let sequence = self.history_sequence(patient_id, start, anchor, None)?;
        let window = if window_size == 0 {
            self.config.trend_window
        } else {
            window_size
        };
        Ok(analyze_trend(sequence.grid(), &feature_key(nt, region), window))
    }

    fn history_sequence(
        &self,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: Option<(Neurotransmitter, BrainRegion)>,
    ) -> Result<NeurotransmitterSequence, TwinError> {
        let stream = self
            .streams
            .get(&patient_id)
            .ok_or(TwinError::UnknownPatient(patient_id))?;

        let mut sequence =
            NeurotransmitterSequence::new(Some(patient_id), start, end, self.config.resolution)?;
        for stored in &stream.events {
            if let Some((nt, region)) = filter {
                if stored.neurotransmitter != nt || stored.region != region {
                    continue;
                }
            }
            let ts = stored.event.timestamp;
            if ts < start || ts > end {
                continue;
            }
            if !sequence.record(
                ts,
                stored.neurotransmitter,
                stored.region,
                stored.event.value.as_f64(),
            ) {
                debug!(event_id = %stored.event.event_id, "sample outside grid slots, skipped");
            }
        }
        Ok(sequence)
    }

    /// Link two recorded events as correlated, with mutual back-references.
    /// Strength is clamped to [0, 1].
    pub fn correlate_events(
        &mut self,
        a: Uuid,
        b: Uuid,
        correlation_type: CorrelationType,
        strength: f64,
    ) -> Result<(), TwinError> {
        let event_a = self.find_event(a)?;
        let event_b = self.find_event(b)?;

        self.correlated
            .entry(a)
            .or_insert_with(|| CorrelatedEvent::new(event_a, correlation_type, strength))
            .link(b);
        self.correlated
            .entry(b)
            .or_insert_with(|| CorrelatedEvent::new(event_b, correlation_type, strength))
            .link(a);
        Ok(())
    }

    /// Correlation metadata for an event, if any has been recorded
    pub fn correlated_event(&self, event_id: Uuid) -> Option<&CorrelatedEvent> {
        self.correlated.get(&event_id)
    }

    fn find_event(&self, event_id: Uuid) -> Result<TemporalEvent, TwinError> {
        self.streams
            .values()
            .flat_map(|s| s.events.iter())
            .find(|s| s.event.event_id == event_id)
            .map(|s| s.event.clone())
            .ok_or(TwinError::UnknownEvent(event_id))
    }

    /// Event ids recorded for a patient, in arrival order
    pub fn event_ids(&self, patient_id: Uuid) -> Vec<Uuid> {
        self.streams
            .get(&patient_id)
            .map(|s| s.events.iter().map(|e| e.event.event_id).collect())
            .unwrap_or_default()
    }

    /// The patient's biometric twin, created on first access
    pub fn twin_mut(&mut self, patient_id: Uuid) -> &mut BiometricTwin {
        self.twins
            .entry(patient_id)
            .or_insert_with(|| BiometricTwin::new(patient_id))
    }

    pub fn twin(&self, patient_id: Uuid) -> Option<&BiometricTwin> {
        self.twins.get(&patient_id)
    }

    /// Append a biometric point to the patient's twin
    pub fn add_biometric_point(&mut self, patient_id: Uuid, point: BiometricDataPoint) {
        self.twin_mut(patient_id).add_data_point(point);
    }

    /// Anomalous points for a patient's data type; empty when the patient has
    /// no twin or no established baseline.
    pub fn detect_anomalies(
        &mut self,
        patient_id: Uuid,
        data_type: &str,
        threshold: f64,
        window_days: i64,
    ) -> Vec<BiometricDataPoint> {
        match self.twins.get_mut(&patient_id) {
            Some(twin) => twin.detect_anomalies(data_type, threshold, window_days),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SymptomObservation;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 8, 0, 0).unwrap()
    }

    fn daily_samples(days: u32, f: impl Fn(u32) -> f64) -> Vec<SamplePoint> {
        (1..=days)
            .map(|d| SamplePoint {
                timestamp: day(d),
                value: f(d),
            })
            .collect()
    }

    fn symptom_series(name: &str, days: u32, f: impl Fn(u32) -> f64) -> SymptomSeries {
        SymptomSeries {
            symptom_type: name.to_string(),
            observations: (1..=days)
                .map(|d| SymptomObservation {
                    date: day(d),
                    severity: f(d),
                })
                .collect(),
        }
    }

    struct FailingProvider;

    impl SymptomProvider for FailingProvider {
        fn symptom_series(
            &self,
            _patient_id: Uuid,
            _lookback_days: u32,
        ) -> Result<Vec<SymptomSeries>, TwinError> {
            Err(TwinError::ProviderError("indicator store offline".to_string()))
        }
    }

    #[test]
    fn test_empty_biometric_data_raises() {
        let service = CorrelationService::new(StaticSymptomProvider::default());
        let result =
            service.analyze_correlations(Uuid::new_v4(), &HashMap::new(), 30, 0.3);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Empty biometric data"));
    }

    #[test]
    fn test_single_sample_degrades_to_low_reliability() {
        let service = CorrelationService::new(StaticSymptomProvider::default());
        let mut data = HashMap::new();
        data.insert(
            "heart_rate_variability".to_string(),
            vec![SamplePoint {
                timestamp: day(1),
                value: 45.0,
            }],
        );

        let report = service
            .analyze_correlations(Uuid::new_v4(), &data, 30, 0.3)
            .unwrap();
        assert_eq!(report.reliability, Reliability::Low);
        assert!(report.correlations.is_empty());
        assert!(report.insights.is_empty());
        assert!(report.warning.as_deref().unwrap().starts_with("insufficient_data"));
        assert!(report.error.is_none());
    }

    #[test]
    fn test_analyze_finds_inverse_correlation() {
        // HRV declines while anxiety rises over 30 days
        let provider = StaticSymptomProvider::new(vec![symptom_series(
            "anxiety",
            30,
            |d| 0.2 + d as f64 * 0.02,
        )]);
        let service = CorrelationService::new(provider);

        let mut data = HashMap::new();
        data.insert(
            "heart_rate_variability".to_string(),
            daily_samples(30, |d| 80.0 - d as f64),
        );

        let patient = Uuid::new_v4();
        let report = service.analyze_correlations(patient, &data, 30, 0.5).unwrap();

        assert_eq!(report.patient_id, patient);
        assert_eq!(report.reliability, Reliability::High);
        assert_eq!(report.correlations.len(), 1);

        let finding = &report.correlations[0];
        assert_eq!(finding.biometric_type, "heart_rate_variability");
        assert_eq!(finding.symptom_type, "anxiety");
        assert!(finding.coefficient < -0.9);
        assert!(finding.p_value < 0.05);
        assert!(finding.confidence > 0.5);

        assert_eq!(report.insights.len(), 1);
        assert!(report.insights[0].message.contains("heart_rate_variability"));
        assert!(report.insights[0].message.contains("anxiety"));

        let coverage = report.biometric_coverage["heart_rate_variability"];
        assert!(coverage > 0.9);

        let metrics = report.model_metrics.unwrap();
        assert_eq!(metrics.name, "lag-search-reference");
        assert_eq!(metrics.pairs_evaluated, 1);
    }

    #[test]
    fn test_threshold_filters_weak_pairs() {
        let provider = StaticSymptomProvider::new(vec![symptom_series(
            "mood",
            30,
            // Alternating noise, uncorrelated with a steady ramp
            |d| if d % 2 == 0 { 0.8 } else { 0.2 },
        )]);
        let service = CorrelationService::new(provider);

        let mut data = HashMap::new();
        data.insert("steps".to_string(), daily_samples(30, |d| d as f64));

        let report = service
            .analyze_correlations(Uuid::new_v4(), &data, 30, 0.9)
            .unwrap();
        assert!(report.correlations.is_empty());
        assert!(report.insights.is_empty());
        assert!(report.error.is_none());
    }

    #[test]
    fn test_provider_failure_degrades_gracefully() {
        let service = CorrelationService::new(FailingProvider);
        let mut data = HashMap::new();
        data.insert("heart_rate".to_string(), daily_samples(30, |d| 60.0 + d as f64));

        let report = service
            .analyze_correlations(Uuid::new_v4(), &data, 30, 0.3)
            .unwrap();
        assert!(report.error.as_deref().unwrap().contains("indicator store offline"));
        assert!(report.correlations.is_empty());
        assert!(report.insights.is_empty());
    }

    #[test]
    fn test_record_and_history() {
        let mut service = ConcentrationService::new(ConcentrationConfig {
            resolution: Resolution::Daily,
            retention_days: 14,
            trend_window: 3,
        });
        let patient = Uuid::new_v4();

        let seq_a = service.record_concentration(
            patient,
            Neurotransmitter::Serotonin,
            BrainRegion::PrefrontalCortex,
            0.4,
            day(2),
        );
        let seq_b = service.record_concentration(
            patient,
            Neurotransmitter::Dopamine,
            BrainRegion::Amygdala,
            0.6,
            day(3),
        );
        assert_eq!(seq_a, seq_b);

        let history = service
            .get_concentration_history(
                patient,
                Neurotransmitter::Serotonin,
                BrainRegion::PrefrontalCortex,
                day(1),
                day(5),
            )
            .unwrap();

        let series =
            history.series(Neurotransmitter::Serotonin, BrainRegion::PrefrontalCortex);
        assert!(series.iter().any(|(_, v)| (*v - 0.4).abs() < 1e-9));

        // Filtered history leaves other pairs untouched
        let dopamine = history.series(Neurotransmitter::Dopamine, BrainRegion::Amygdala);
        assert!(dopamine.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_history_unknown_patient() {
        let service = ConcentrationService::default();
        let result = service.get_concentration_history(
            Uuid::new_v4(),
            Neurotransmitter::Serotonin,
            BrainRegion::Amygdala,
            day(1),
            day(5),
        );
        assert!(matches!(result, Err(TwinError::UnknownPatient(_))));
    }

    #[test]
    fn test_trend_over_recorded_stream() {
        let mut service = ConcentrationService::new(ConcentrationConfig {
            resolution: Resolution::Daily,
            retention_days: 14,
            trend_window: 3,
        });
        let patient = Uuid::new_v4();
        for d in 1..=10 {
            service.record_concentration(
                patient,
                Neurotransmitter::Serotonin,
                BrainRegion::PrefrontalCortex,
                0.05 * d as f64,
                day(d),
            );
        }

        let report = service
            .analyze_trend(
                patient,
                Neurotransmitter::Serotonin,
                BrainRegion::PrefrontalCortex,
                0,
            )
            .unwrap();
        assert_eq!(
            report.direction,
            crate::analysis::trend::TrendDirection::Increasing
        );
    }

    #[test]
    fn test_correlate_events_links_both_sides() {
        let mut service = ConcentrationService::default();
        let patient = Uuid::new_v4();
        service.record_concentration(
            patient,
            Neurotransmitter::Serotonin,
            BrainRegion::PrefrontalCortex,
            0.4,
            day(1),
        );
        service.record_concentration(
            patient,
            Neurotransmitter::Gaba,
            BrainRegion::Hippocampus,
            0.7,
            day(1),
        );

        let ids = service.event_ids(patient);
        service
            .correlate_events(ids[0], ids[1], CorrelationType::Association, 1.4)
            .unwrap();

        let a = service.correlated_event(ids[0]).unwrap();
        assert!(a.correlated_events.contains(&ids[1]));
        assert_eq!(a.correlation_strength(), 1.0);

        let b = service.correlated_event(ids[1]).unwrap();
        assert!(b.correlated_events.contains(&ids[0]));

        let missing = service.correlate_events(ids[0], Uuid::new_v4(), CorrelationType::Temporal, 0.5);
        assert!(matches!(missing, Err(TwinError::UnknownEvent(_))));
    }

    #[test]
    fn test_twin_anomalies_through_service() {
        let mut service = ConcentrationService::default();
        let patient = Uuid::new_v4();

        // No twin yet: empty result, no panic
        assert!(service.detect_anomalies(patient, "heart_rate", 2.0, 7).is_empty());

        for required in crate::twin::REQUIRED_BASELINE_TYPES {
            for d in 1..=7 {
                service.add_biometric_point(
                    patient,
                    BiometricDataPoint::new(
                        required,
                        EventValue::Float(60.0),
                        day(d),
                        "wearable",
                        0.9,
                    )
                    .unwrap(),
                );
            }
        }
        assert!(service.twin_mut(patient).establish_baseline(day(7)));

        for d in 1..=7 {
            service.add_biometric_point(
                patient,
                BiometricDataPoint::new(
                    "hrv",
                    EventValue::Float(if d == 7 { 150.0 } else { 50.0 }),
                    day(d),
                    "wearable",
                    0.9,
                )
                .unwrap(),
            );
        }
        let anomalies = service.detect_anomalies(patient, "hrv", 2.0, 7);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].value.as_f64(), 150.0);
    }
}
