// Multi-Frame Aggregation
// Runs the fallback chain independently over each sampled video frame and
// fuses the per-frame verdicts with an OR-of-two-signals quorum rule:
// either enough individually flagged frames (one clearly manipulated
// segment) or a high mean fake-probability (uniformly suspicious asset).

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::models::{AggregateOutcome, ResolvedVerdict, Verdict};
use crate::services::providers::ClassifierBackend;
use crate::services::registry::SourceRegistry;

use super::features::{derive_features, FeatureJitter};
use super::heuristic;
use super::orchestrator::{clamp_confidence, classify_frame};

/// Frame cap per asset.
pub const MAX_FRAMES: usize = 16;
/// Per-frame fake-probability above which a frame counts as flagged.
/// Tuned ad hoc; tunable, not authoritative.
pub const FRAME_FLAG_THRESHOLD: f64 = 0.15;
/// Mean fake-probability above which the whole asset is judged synthetic.
/// Tuned ad hoc; tunable, not authoritative.
pub const MEAN_FAKE_THRESHOLD: f64 = 0.12;
/// Concurrent per-frame classifications in flight (external rate limits).
pub const FRAME_CONCURRENCY: usize = 4;

const SYNTHETIC_CONFIDENCE_BASE: f64 = 55.0;
const SYNTHETIC_MEAN_WEIGHT: f64 = 35.0;
const SYNTHETIC_FLAGGED_WEIGHT: f64 = 15.0;
const AUTHENTIC_CONFIDENCE_BASE: f64 = 97.0;
const AUTHENTIC_MEAN_WEIGHT: f64 = 180.0;

/// Minimum count of flagged frames required to declare the asset synthetic.
pub fn quorum(frame_count: usize) -> usize {
    std::cmp::max(2, frame_count.div_ceil(8))
}

/// Classify up to MAX_FRAMES frames concurrently and fuse the verdicts.
/// Frames are analyzed in isolation; result order does not matter to the
/// quorum rule, but per-frame diagnostics keep their input order.
pub async fn aggregate_frames<B>(
    backend: Arc<B>,
    registry: Arc<SourceRegistry>,
    frames: Vec<Vec<u8>>,
    file_name: Option<String>,
    jitter_seed: Option<u64>,
) -> AggregateOutcome
where
    B: ClassifierBackend + Send + Sync + 'static,
{
    let frames: Vec<Vec<u8>> = frames.into_iter().take(MAX_FRAMES).collect();
    let payload_len: usize = frames.iter().map(|f| f.len()).sum();
    info!("[AGGREGATOR] analyzing {} frames", frames.len());

    let semaphore = Arc::new(Semaphore::new(FRAME_CONCURRENCY));
    let mut join_set: JoinSet<Option<(usize, ResolvedVerdict)>> = JoinSet::new();

    for (idx, image) in frames.into_iter().enumerate() {
        let backend = backend.clone();
        let registry = registry.clone();
        let semaphore = semaphore.clone();
        let file_name = file_name.clone();

        join_set.spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return None,
            };
            let mut jitter = match jitter_seed {
                Some(seed) => FeatureJitter::from_seed(seed.wrapping_add(idx as u64)),
                None => FeatureJitter::from_entropy(),
            };
            let resolved = classify_frame(
                backend.as_ref(),
                &registry,
                &image,
                file_name.as_deref(),
                &mut jitter,
            )
            .await;
            Some((idx, resolved))
        });
    }

    let mut indexed: Vec<(usize, ResolvedVerdict)> = Vec::new();
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(Some(entry)) => indexed.push(entry),
            Ok(None) => {}
            Err(e) => warn!("[AGGREGATOR] frame task failed: {}", e),
        }
    }
    indexed.sort_by_key(|(idx, _)| *idx);
    let frame_verdicts: Vec<ResolvedVerdict> = indexed.into_iter().map(|(_, v)| v).collect();

    if frame_verdicts.is_empty() {
        // Total failure: fall back to the filename heuristic for the asset.
        warn!("[AGGREGATOR] no frame produced a verdict, using asset-level heuristic");
        let mut jitter = match jitter_seed {
            Some(seed) => FeatureJitter::from_seed(seed),
            None => FeatureJitter::from_entropy(),
        };
        let fused = heuristic::estimate(payload_len, file_name.as_deref(), &mut jitter);
        return AggregateOutcome {
            fused,
            frames: Vec::new(),
            flagged_frames: 0,
        };
    }

    let mut jitter = match jitter_seed {
        Some(seed) => FeatureJitter::from_seed(seed),
        None => FeatureJitter::from_entropy(),
    };
    let (fused, flagged_frames) = fuse_verdicts(&frame_verdicts, &mut jitter);
    info!(
        "[AGGREGATOR] fused verdict: synthetic={} confidence={:.1} flagged={}/{}",
        fused.is_synthetic,
        fused.confidence_percent,
        flagged_frames,
        frame_verdicts.len()
    );

    AggregateOutcome {
        fused,
        frames: frame_verdicts,
        flagged_frames,
    }
}

/// Fuse per-frame verdicts into one asset verdict. Order-independent.
pub fn fuse_verdicts(frames: &[ResolvedVerdict], jitter: &mut FeatureJitter) -> (Verdict, usize) {
    let n = frames.len().max(1);
    let mean_fake: f64 =
        frames.iter().map(|f| f.verdict.fake_probability).sum::<f64>() / n as f64;
    let flagged = frames
        .iter()
        .filter(|f| f.verdict.fake_probability > FRAME_FLAG_THRESHOLD)
        .count();

    let is_synthetic = flagged >= quorum(frames.len()) || mean_fake > MEAN_FAKE_THRESHOLD;

    let raw_confidence = if is_synthetic {
        SYNTHETIC_CONFIDENCE_BASE
            + mean_fake * SYNTHETIC_MEAN_WEIGHT
            + (flagged as f64 / n as f64) * SYNTHETIC_FLAGGED_WEIGHT
    } else {
        AUTHENTIC_CONFIDENCE_BASE - mean_fake * AUTHENTIC_MEAN_WEIGHT
    };

    let fake_pct = (mean_fake * 100.0).clamp(0.0, 100.0);
    let fused = Verdict {
        is_synthetic,
        confidence_percent: clamp_confidence(raw_confidence),
        fake_probability: mean_fake.clamp(0.0, 1.0),
        features: derive_features(is_synthetic, fake_pct, 100.0 - fake_pct, jitter),
    };

    (fused, flagged)
}
