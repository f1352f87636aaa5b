// Veriframe Data Models
// Wire contract for the analyze endpoint plus the internal verdict types.

use serde::{Deserialize, Serialize};

// ============ Analyze Request ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Data-URL encoded media payload. For video inputs this is the first
    /// sampled frame (or the raw asset when frame sampling failed client-side).
    #[serde(default)]
    pub image_base64: String,
    /// Advisory source filename; only the heuristic path and the webcam
    /// override read it.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Pre-sampled video frames, data-URL encoded, evenly spaced by the client.
    #[serde(default)]
    pub frames_base64: Option<Vec<String>>,
}

// ============ Classifier Output ============

/// One (label, score) pair as emitted by a raw classifier. Labels are
/// free text; multiple labels may describe the same semantic bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

// ============ Feature Scores ============

/// Cosmetic per-verdict scores in [0, 100]. Derived from confidence and
/// verdict only; they carry no independent signal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureScores {
    pub artificial_patterns: f64,
    pub natural_features: f64,
    pub texture_consistency: f64,
    pub lighting: f64,
}

// ============ Verdict ============

/// Canonical verdict for one still image, or the fused verdict for a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_synthetic: bool,
    /// Reported confidence, clamped to [60, 98].
    pub confidence_percent: f64,
    /// Raw fake probability in [0, 1]; feeds the multi-frame quorum rule.
    pub fake_probability: f64,
    pub features: FeatureScores,
}

/// A verdict plus the identity of the source that produced it
/// ("heuristic" for the fallback tier).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVerdict {
    pub verdict: Verdict,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_predictions: Option<Vec<LabelScore>>,
}

// ============ Aggregate Outcome ============

/// Per-frame verdicts plus the fused asset verdict. Lives for the duration
/// of one analysis call; never retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    pub fused: Verdict,
    pub frames: Vec<ResolvedVerdict>,
    pub flagged_frames: usize,
}

// ============ Analyze Response ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub is_deepfake: bool,
    pub confidence: f64,
    pub features: FeatureScores,
    /// Which analysis path resolved the request: image_ml, image_heuristic,
    /// video_multi_frame or video_heuristic.
    pub analysis_type: String,
    /// Classifier source id, or "heuristic".
    pub source: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_analyzed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged_frames: Option<usize>,
    /// Raw label/score pairs from the winning classifier (single-image path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_predictions: Option<Vec<LabelScore>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{"imageBase64":"data:image/jpeg;base64,abcd","fileName":"a.jpg"}"#;
        let req: AnalyzeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.file_name.as_deref(), Some("a.jpg"));
        assert!(req.frames_base64.is_none());
    }

    #[test]
    fn test_response_omits_empty_diagnostics() {
        let resp = AnalyzeResponse {
            is_deepfake: false,
            confidence: 82.0,
            features: FeatureScores::default(),
            analysis_type: "image_ml".to_string(),
            source: "av-deepfake".to_string(),
            request_id: "r1".to_string(),
            frames_analyzed: None,
            flagged_frames: None,
            raw_predictions: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"isDeepfake\":false"));
        assert!(!json.contains("framesAnalyzed"));
        assert!(!json.contains("rawPredictions"));
    }
}
