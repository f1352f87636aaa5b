// Feature Score Derivation
// Cosmetic feature vectors derived from the verdict and its confidence.
// Jitter is seedable so tests can pin exact values; it never influences
// the synthetic/authentic decision.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::FeatureScores;

const TEXTURE_SYNTHETIC_FACTOR: f64 = 0.85;
const LIGHTING_SYNTHETIC_FACTOR: f64 = 0.8;
const TEXTURE_AUTHENTIC_FACTOR: f64 = 0.9;
const LIGHTING_AUTHENTIC_FACTOR: f64 = 0.88;
const DEFAULT_SPREAD: f64 = 3.0;

/// Seedable randomness source for cosmetic feature variety.
pub struct FeatureJitter {
    rng: StdRng,
    spread: f64,
}

impl FeatureJitter {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            spread: DEFAULT_SPREAD,
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spread: DEFAULT_SPREAD,
        }
    }

    /// Zero-spread jitter; feature values come out exactly as derived.
    pub fn fixed() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
            spread: 0.0,
        }
    }

    pub fn apply(&mut self, base: f64) -> f64 {
        if self.spread == 0.0 {
            return base.clamp(0.0, 100.0);
        }
        let offset = self.rng.gen_range(-self.spread..=self.spread);
        (base + offset).clamp(0.0, 100.0)
    }
}

/// Derive feature scores from the normalized fake/real percentages.
/// artificial + natural ≈ 100 as a loose visual convention only.
pub fn derive_features(
    is_synthetic: bool,
    fake_pct: f64,
    real_pct: f64,
    jitter: &mut FeatureJitter,
) -> FeatureScores {
    if is_synthetic {
        FeatureScores {
            artificial_patterns: jitter.apply(fake_pct),
            natural_features: jitter.apply(100.0 - fake_pct),
            texture_consistency: jitter.apply((100.0 - fake_pct) * TEXTURE_SYNTHETIC_FACTOR),
            lighting: jitter.apply((100.0 - fake_pct) * LIGHTING_SYNTHETIC_FACTOR),
        }
    } else {
        FeatureScores {
            artificial_patterns: jitter.apply(100.0 - real_pct),
            natural_features: jitter.apply(real_pct),
            texture_consistency: jitter.apply(real_pct * TEXTURE_AUTHENTIC_FACTOR),
            lighting: jitter.apply(real_pct * LIGHTING_AUTHENTIC_FACTOR),
        }
    }
}

/// Fixed feature shapes for the heuristic tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeaturePreset {
    Webcam,
    FakeMarked,
    DefaultAuthentic,
}

pub fn preset_features(preset: FeaturePreset, jitter: &mut FeatureJitter) -> FeatureScores {
    let (artificial, natural, texture, lighting) = match preset {
        FeaturePreset::Webcam => (8.0, 94.0, 93.0, 91.0),
        FeaturePreset::FakeMarked => (75.0, 25.0, 35.0, 40.0),
        FeaturePreset::DefaultAuthentic => (18.0, 88.0, 85.0, 87.0),
    };
    FeatureScores {
        artificial_patterns: jitter.apply(artificial),
        natural_features: jitter.apply(natural),
        texture_consistency: jitter.apply(texture),
        lighting: jitter.apply(lighting),
    }
}
