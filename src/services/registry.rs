// Classifier Source Registry
// Ordered, read-only list of remote classification sources to attempt.
// Configuration data, not runtime state: built once by the caller and
// injected into the orchestrator (no lazy global singletons).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Hosted image-classification endpoint returning (label, score) pairs.
    HostedModel,
    /// Hosted Space accepting form-encoded image data, returning a free-text
    /// prediction string plus optional confidence.
    Space,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierSource {
    /// Stable identifier used in diagnostics and logs.
    pub id: String,
    /// Remote model path (hosted models) or endpoint name (spaces).
    pub model: String,
    pub kind: SourceKind,
}

impl ClassifierSource {
    pub fn hosted(id: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            model: model.to_string(),
            kind: SourceKind::HostedModel,
        }
    }

    pub fn space(id: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            model: model.to_string(),
            kind: SourceKind::Space,
        }
    }
}

/// Priority-ordered classifier chain. Read-only during a request.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<ClassifierSource>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<ClassifierSource>) -> Self {
        Self { sources }
    }

    /// Default priority order: specialized deepfake detector first, generic
    /// image classifier second, alternate specialized detector third, then
    /// the hosted Space.
    pub fn default_chain() -> Self {
        Self::new(vec![
            ClassifierSource::hosted("av-deepfake", "maggleboy/av_deepfake_detection"),
            ClassifierSource::hosted("image-classifier", "google/vit-base-patch16-224"),
            ClassifierSource::hosted("fakebuster", "shreyankbr/FakeBuster"),
            ClassifierSource::space("detector-space", "deepfake-detector"),
        ])
    }

    pub fn sources(&self) -> &[ClassifierSource] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}
