use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::filters::SitePredicate;
use crate::core::{distance, eligibility, normalize, relevance};
use crate::models::{
    ConfigError, MatchConfig, MatchReport, PatientProfile, RawTrialRecord, ScoredTrial, Trial,
    Verdict,
};
use crate::services::{GeoResolver, TextScorer};

/// Trial matching orchestrator
///
/// # Pipeline
/// 1. Normalize raw records (per-record failures are skipped and counted)
/// 2. Optional site filter and geocode backfill
/// 3. Per-trial scoring (relevance, proximity, eligibility) with bounded
///    concurrency
/// 4. Hard-filter ineligible trials, rank deterministically, truncate
///
/// Capabilities are injected at construction so tests can substitute fakes.
/// The engine holds no request state; every call re-scores from raw input.
pub struct MatchingEngine {
    scorer: Arc<dyn TextScorer>,
    geo_resolver: Option<Arc<dyn GeoResolver>>,
    site_filter: Option<SitePredicate>,
    config: MatchConfig,
}

/// Per-trial signals collected before aggregation. Each scoring task
/// produces one of these in isolation; nothing is shared while scoring.
struct TrialSignals {
    trial: Trial,
    relevance: Option<f64>,
    degraded_note: Option<String>,
    proximity_km: Option<f64>,
    proximity_contribution: f64,
    verdict: Verdict,
    reasons: Vec<String>,
}

impl MatchingEngine {
    /// Create an engine with a validated configuration. Invalid
    /// configuration is rejected here, before any request is processed.
    pub fn new(scorer: Arc<dyn TextScorer>, config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            scorer,
            geo_resolver: None,
            site_filter: None,
            config,
        })
    }

    pub fn with_geo_resolver(mut self, resolver: Arc<dyn GeoResolver>) -> Self {
        self.geo_resolver = Some(resolver);
        self
    }

    pub fn with_site_filter(mut self, predicate: SitePredicate) -> Self {
        self.site_filter = Some(predicate);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Match a patient against a batch of raw trial records
    ///
    /// `top_n_override` replaces the configured result count for this call
    /// only. An empty input yields an empty report, not an error.
    pub async fn match_trials(
        &self,
        patient: &PatientProfile,
        raw_trials: Vec<RawTrialRecord>,
        top_n_override: Option<usize>,
    ) -> MatchReport {
        let total_candidates = raw_trials.len();
        let mut errors = Vec::new();
        let mut skipped_count = 0usize;

        // Stage 1: normalization, isolated per record
        let mut trials = Vec::with_capacity(total_candidates);
        for raw in &raw_trials {
            match normalize::normalize(raw) {
                Ok(trial) => trials.push(trial),
                Err(e) => {
                    skipped_count += 1;
                    tracing::warn!("Skipping malformed trial record: {}", e);
                    errors.push(format!("record skipped: {}", e));
                }
            }
        }

        // Stage 2: site filter before scoring, so filtered trials cost no
        // embedding calls
        if let Some(predicate) = &self.site_filter {
            trials.retain(|trial| predicate(patient, trial));
        }

        if let Some(resolver) = &self.geo_resolver {
            for trial in &mut trials {
                for location in &mut trial.locations {
                    if location.coordinates.is_none() {
                        location.coordinates = resolver
                            .resolve(&location.facility, &location.city, &location.country)
                            .await;
                    }
                }
            }
        }

        // The patient embedding is computed once and shared across trials
        let patient_embedding = if patient.medical_record.trim().is_empty() {
            None
        } else {
            match self.scorer.embed(&patient.medical_record).await {
                Ok(vector) => Some(Arc::new(vector)),
                Err(e) => {
                    tracing::warn!("Patient embedding failed, relevance degraded: {}", e);
                    errors.push(format!("patient embedding failed: {}", e));
                    None
                }
            }
        };

        // Stage 3: fan out per-trial scoring under a concurrency bound
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let reference_km = self.config.proximity_reference_km;
        let mut join_set = JoinSet::new();

        for trial in trials {
            let scorer = Arc::clone(&self.scorer);
            let semaphore = Arc::clone(&semaphore);
            let patient_embedding = patient_embedding.clone();
            let patient = patient.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                score_trial(
                    trial,
                    &patient,
                    patient_embedding.as_deref().map(Vec::as_slice),
                    scorer.as_ref(),
                    reference_km,
                )
                .await
            });
        }

        let signals = self
            .collect_signals(&mut join_set, &mut skipped_count, &mut errors)
            .await;

        let degraded_count = signals
            .iter()
            .filter(|s| s.degraded_note.is_some())
            .count();

        // Stage 4: hard-filter, rank, truncate. An ineligible trial is not a
        // low-score match; it is not a match.
        let weights = self.config.effective_weights();
        let mut matches: Vec<ScoredTrial> = signals
            .into_iter()
            .filter(|s| s.verdict != Verdict::Ineligible)
            .map(|s| {
                let composite =
                    weights.0 * s.relevance.unwrap_or(0.0) + weights.1 * s.proximity_contribution;
                let explanation = build_explanation(&s, weights);
                ScoredTrial {
                    relevance_score: s.relevance,
                    proximity_km: s.proximity_km,
                    proximity_contribution: s.proximity_contribution,
                    verdict: s.verdict,
                    composite_score: composite,
                    explanation,
                    trial: s.trial,
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| cmp_proximity(a.proximity_km, b.proximity_km))
                .then_with(|| a.trial.id.cmp(&b.trial.id))
        });

        matches.truncate(top_n_override.unwrap_or(self.config.top_n));

        MatchReport {
            matches,
            total_candidates,
            skipped_count,
            degraded_count,
            errors,
        }
    }

    /// Join all scoring tasks, honoring the configured deadline. On expiry,
    /// in-flight tasks are abandoned and only fully scored trials survive.
    async fn collect_signals(
        &self,
        join_set: &mut JoinSet<TrialSignals>,
        skipped_count: &mut usize,
        errors: &mut Vec<String>,
    ) -> Vec<TrialSignals> {
        let deadline = self
            .config
            .timeout
            .map(|t| tokio::time::Instant::now() + t);

        let mut signals = Vec::with_capacity(join_set.len());

        while !join_set.is_empty() {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, join_set.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        let abandoned = join_set.len();
                        join_set.abort_all();
                        tracing::warn!("Scoring deadline exceeded, abandoned {} trials", abandoned);
                        *skipped_count += abandoned;
                        errors.push(format!(
                            "scoring deadline exceeded; {} trials not scored",
                            abandoned
                        ));
                        break;
                    }
                },
                None => join_set.join_next().await,
            };

            match next {
                Some(Ok(trial_signals)) => signals.push(trial_signals),
                Some(Err(e)) => {
                    *skipped_count += 1;
                    errors.push(format!("scoring task failed: {}", e));
                }
                None => break,
            }
        }

        signals
    }
}

async fn score_trial(
    trial: Trial,
    patient: &PatientProfile,
    patient_embedding: Option<&[f32]>,
    scorer: &dyn TextScorer,
    reference_km: f64,
) -> TrialSignals {
    let (relevance, degraded_note) = match patient_embedding {
        Some(embedding) => {
            relevance::score_relevance(embedding, &trial.relevance_text(), scorer).await
        }
        None => (
            None,
            Some("relevance unavailable: no patient embedding".to_string()),
        ),
    };

    let proximity_km = distance::nearest_site_km(patient.coordinates(), &trial.locations);
    let proximity_contribution = distance::proximity_contribution(proximity_km, reference_km);
    let (verdict, reasons) = eligibility::evaluate(patient, &trial);

    TrialSignals {
        trial,
        relevance,
        degraded_note,
        proximity_km,
        proximity_contribution,
        verdict,
        reasons,
    }
}

/// Known proximity sorts ascending; unknown distance sorts last
fn cmp_proximity(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn build_explanation(signals: &TrialSignals, weights: (f64, f64)) -> String {
    let mut parts = Vec::new();

    if let Some(relevance) = signals.relevance {
        parts.push(format!("relevance {:.2} (weight {:.2})", relevance, weights.0));
    }
    if let Some(note) = &signals.degraded_note {
        parts.push(note.clone());
    }

    match signals.proximity_km {
        Some(km) => parts.push(format!(
            "nearest site {:.1} km (proximity {:.2}, weight {:.2})",
            km, signals.proximity_contribution, weights.1
        )),
        None => parts.push("site distance unknown".to_string()),
    }

    let heading = match signals.verdict {
        Verdict::Eligible => "eligibility",
        Verdict::Ineligible => "ineligible",
        Verdict::Unknown => "eligibility unknown",
    };
    if signals.reasons.is_empty() {
        parts.push(heading.to_string());
    } else {
        parts.push(format!("{}: {}", heading, signals.reasons.join(", ")));
    }

    parts.join("; ")
}
