// Analyze Endpoint
// One POST, four resolution paths: single-image classification, single-image
// heuristic, multi-frame video aggregation and whole-asset video heuristic.
// The endpoint never surfaces a bare failure once image data was provided;
// the heuristic tier absorbs every upstream outage.

use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AggregateOutcome, AnalyzeRequest, AnalyzeResponse, ResolvedVerdict};
use crate::services::detection::{
    aggregate_frames, classify_frame, heuristic, FeatureJitter, HEURISTIC_SOURCE, MAX_FRAMES,
};
use crate::services::media;
use crate::services::providers::ClassifierBackend;
use crate::services::registry::SourceRegistry;

use super::error::{ApiJson, AppError, AppResult};
use super::AppState;

const ANALYSIS_IMAGE_ML: &str = "image_ml";
const ANALYSIS_IMAGE_HEURISTIC: &str = "image_heuristic";
const ANALYSIS_VIDEO_MULTI_FRAME: &str = "video_multi_frame";
const ANALYSIS_VIDEO_HEURISTIC: &str = "video_heuristic";

pub async fn analyze(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    let request_id = Uuid::new_v4().to_string();
    let response = run_analysis(
        state.backend.clone(),
        state.registry.clone(),
        request,
        request_id,
    )
    .await?;
    Ok(Json(response))
}

/// Full analysis flow, generic over the classifier backend.
pub async fn run_analysis<B>(
    backend: Arc<B>,
    registry: Arc<SourceRegistry>,
    request: AnalyzeRequest,
    request_id: String,
) -> AppResult<AnalyzeResponse>
where
    B: ClassifierBackend + Send + Sync + 'static,
{
    let has_frames = request
        .frames_base64
        .as_ref()
        .map(|f| f.iter().any(|s| !s.trim().is_empty()))
        .unwrap_or(false);

    if request.image_base64.trim().is_empty() && !has_frames {
        return Err(AppError::MissingImage);
    }

    let file_name = request.file_name.clone();
    let is_video = has_frames
        || media::is_video_input(&request.image_base64, file_name.as_deref());

    info!(
        "[SERVER] request {}: video={} file={:?}",
        request_id, is_video, file_name
    );

    if is_video {
        analyze_video(backend, registry, &request, file_name, request_id).await
    } else {
        analyze_image(backend, registry, &request, file_name, request_id).await
    }
}

async fn analyze_image<B>(
    backend: Arc<B>,
    registry: Arc<SourceRegistry>,
    request: &AnalyzeRequest,
    file_name: Option<String>,
    request_id: String,
) -> AppResult<AnalyzeResponse>
where
    B: ClassifierBackend + Send + Sync + 'static,
{
    let mut jitter = FeatureJitter::from_entropy();

    let resolved = match media::decode_data_url(&request.image_base64) {
        Ok(image) => {
            classify_frame(
                backend.as_ref(),
                &registry,
                &image,
                file_name.as_deref(),
                &mut jitter,
            )
            .await
        }
        Err(e) => {
            // Undecodable payload still gets a best-effort verdict.
            warn!("[SERVER] request {}: undecodable image ({})", request_id, e);
            ResolvedVerdict {
                verdict: heuristic::estimate(
                    request.image_base64.len(),
                    file_name.as_deref(),
                    &mut jitter,
                ),
                source: HEURISTIC_SOURCE.to_string(),
                raw_predictions: None,
            }
        }
    };

    Ok(image_response(request_id, resolved))
}

async fn analyze_video<B>(
    backend: Arc<B>,
    registry: Arc<SourceRegistry>,
    request: &AnalyzeRequest,
    file_name: Option<String>,
    request_id: String,
) -> AppResult<AnalyzeResponse>
where
    B: ClassifierBackend + Send + Sync + 'static,
{
    let mut frames: Vec<Vec<u8>> = Vec::new();
    if let Some(encoded_frames) = &request.frames_base64 {
        for encoded in encoded_frames.iter().take(MAX_FRAMES) {
            match media::decode_data_url(encoded) {
                Ok(bytes) => frames.push(bytes),
                Err(e) => warn!("[SERVER] request {}: skipping bad frame ({})", request_id, e),
            }
        }
    }

    if frames.is_empty() {
        // Video asset without usable frames: score the whole asset by name
        // and size, never a raw failure.
        let payload_len = media::decode_data_url(&request.image_base64)
            .map(|bytes| bytes.len())
            .unwrap_or(request.image_base64.len());
        let mut jitter = FeatureJitter::from_entropy();
        let verdict = heuristic::estimate(payload_len, file_name.as_deref(), &mut jitter);
        return Ok(AnalyzeResponse {
            is_deepfake: verdict.is_synthetic,
            confidence: verdict.confidence_percent,
            features: verdict.features,
            analysis_type: ANALYSIS_VIDEO_HEURISTIC.to_string(),
            source: HEURISTIC_SOURCE.to_string(),
            request_id,
            frames_analyzed: None,
            flagged_frames: None,
            raw_predictions: None,
        });
    }

    let outcome = aggregate_frames(backend, registry, frames, file_name, None).await;
    Ok(video_response(request_id, outcome))
}

/// Assemble the single-image response; pure.
fn image_response(request_id: String, resolved: ResolvedVerdict) -> AnalyzeResponse {
    let analysis_type = if resolved.source == HEURISTIC_SOURCE {
        ANALYSIS_IMAGE_HEURISTIC
    } else {
        ANALYSIS_IMAGE_ML
    };

    AnalyzeResponse {
        is_deepfake: resolved.verdict.is_synthetic,
        confidence: resolved.verdict.confidence_percent,
        features: resolved.verdict.features,
        analysis_type: analysis_type.to_string(),
        source: resolved.source,
        request_id,
        frames_analyzed: None,
        flagged_frames: None,
        raw_predictions: resolved.raw_predictions,
    }
}

/// Assemble the multi-frame response; pure. The asset counts as ML-analyzed
/// when at least one frame got a classifier answer.
fn video_response(request_id: String, outcome: AggregateOutcome) -> AnalyzeResponse {
    let ml_source = outcome
        .frames
        .iter()
        .find(|f| f.source != HEURISTIC_SOURCE)
        .map(|f| f.source.clone());

    let (analysis_type, source) = match ml_source {
        Some(source) => (ANALYSIS_VIDEO_MULTI_FRAME, source),
        None => (ANALYSIS_VIDEO_HEURISTIC, HEURISTIC_SOURCE.to_string()),
    };

    AnalyzeResponse {
        is_deepfake: outcome.fused.is_synthetic,
        confidence: outcome.fused.confidence_percent,
        features: outcome.fused.features,
        analysis_type: analysis_type.to_string(),
        source,
        request_id,
        frames_analyzed: Some(outcome.frames.len()),
        flagged_frames: Some(outcome.flagged_frames),
        raw_predictions: None,
    }
}
