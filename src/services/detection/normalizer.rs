// Label Normalizer
// Maps heterogeneous classifier label vocabularies onto the canonical
// {authentic, synthetic} pair. Classifiers are black boxes with no agreed
// label schema; case-insensitive substring matching is the only robust
// generalization across sources.

use crate::models::LabelScore;

/// Substrings that indicate a fake/synthetic label.
pub const FAKE_MARKERS: [&str; 4] = ["fake", "deepfake", "synthetic", "manipulated"];
/// Substrings that indicate a real/authentic label.
pub const REAL_MARKERS: [&str; 3] = ["real", "authentic", "genuine"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedLabels {
    /// Max-scoring match per bucket, 0.0 where a bucket had no match.
    Scores { fake: f64, real: f64 },
    /// No recognizable label in either bucket. Callers decide how to treat
    /// this; silently defaulting to authentic here would hide the condition.
    Inconclusive,
}

pub fn normalize_labels(labels: &[LabelScore]) -> NormalizedLabels {
    let fake = bucket_score(labels, &FAKE_MARKERS);
    let real = bucket_score(labels, &REAL_MARKERS);

    match (fake, real) {
        (None, None) => NormalizedLabels::Inconclusive,
        _ => NormalizedLabels::Scores {
            fake: fake.unwrap_or(0.0),
            real: real.unwrap_or(0.0),
        },
    }
}

fn bucket_score(labels: &[LabelScore], markers: &[&str]) -> Option<f64> {
    labels
        .iter()
        .filter(|l| {
            let lower = l.label.to_lowercase();
            markers.iter().any(|m| lower.contains(m))
        })
        .map(|l| l.score)
        .fold(None, |acc: Option<f64>, score| {
            Some(acc.map_or(score, |best| best.max(score)))
        })
}
