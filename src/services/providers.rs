// Classifier Provider Service
// Implements hosted inference and Space API calls.
// One attempt per call, no internal retries: any network failure, non-2xx
// status or malformed payload is terminal for that source and the
// orchestrator moves on to the next one.

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use super::config_store::ConfigStore;
use super::registry::{ClassifierSource, SourceKind};
use crate::models::LabelScore;

const INFERENCE_DEFAULT_URL: &str = "https://api-inference.huggingface.co";
const SPACE_DEFAULT_URL: &str = "https://veriframe-detector.hf.space/api/predict";

// Transport-level ceiling only; the orchestrator owns the per-attempt
// timeout policy.
const HTTP_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Malformed classifier payload: {0}")]
    MalformedPayload(String),
    #[error("API token not configured")]
    MissingToken,
}

/// Seam between the orchestration logic and the remote calls, so the fallback
/// chain and the aggregator can be exercised with scripted classifiers.
pub trait ClassifierBackend: Send + Sync {
    fn classify(
        &self,
        source: &ClassifierSource,
        image: &[u8],
        file_name: &str,
    ) -> impl Future<Output = Result<Vec<LabelScore>, ClassifierError>> + Send;
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct SpaceResponse {
    prediction: Option<String>,
    confidence: Option<f64>,
    #[serde(default)]
    data: Vec<String>,
}

pub struct ClassifierClient {
    client: Client,
    inference_url: String,
    space_url: String,
    api_token: Option<String>,
}

impl Default for ClassifierClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let inference_url = env::var("VERIFRAME_INFERENCE_URL")
            .unwrap_or_else(|_| INFERENCE_DEFAULT_URL.to_string());
        let space_url = env::var("VERIFRAME_SPACE_URL")
            .ok()
            .or_else(|| get_source_url("detector-space"))
            .unwrap_or_else(|| SPACE_DEFAULT_URL.to_string());
        let api_token = get_api_token("huggingface");

        Self {
            client,
            inference_url,
            space_url,
            api_token,
        }
    }

    /// Send raw image bytes to a hosted image-classification endpoint and
    /// parse the (label, score) array it returns.
    async fn classify_image(
        &self,
        source: &ClassifierSource,
        image: &[u8],
    ) -> Result<Vec<LabelScore>, ClassifierError> {
        let token = self.api_token.as_ref().ok_or(ClassifierError::MissingToken)?;
        let url = format!("{}/models/{}", self.inference_url, source.model);

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let predictions: Vec<RawPrediction> = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedPayload(e.to_string()))?;

        debug!(
            "[PROVIDERS] {} returned {} labels in {}ms",
            source.id,
            predictions.len(),
            start.elapsed().as_millis()
        );

        if predictions.is_empty() {
            return Err(ClassifierError::MalformedPayload(
                "empty prediction array".to_string(),
            ));
        }

        Ok(predictions
            .into_iter()
            .map(|p| LabelScore {
                label: p.label,
                score: p.score,
            })
            .collect())
    }

    /// Send form-encoded image data to the hosted Space and parse its
    /// free-text prediction into (label, score) pairs.
    async fn classify_space(
        &self,
        source: &ClassifierSource,
        image: &[u8],
        file_name: &str,
    ) -> Result<Vec<LabelScore>, ClassifierError> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name(if file_name.is_empty() {
                "upload.jpg".to_string()
            } else {
                file_name.to_string()
            })
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let start = Instant::now();

        let response = self.client.post(&self.space_url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: SpaceResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedPayload(e.to_string()))?;

        debug!(
            "[PROVIDERS] {} answered in {}ms",
            source.id,
            start.elapsed().as_millis()
        );

        let text = body
            .prediction
            .or_else(|| body.data.into_iter().next())
            .ok_or_else(|| {
                ClassifierError::MalformedPayload("no prediction text in response".to_string())
            })?;

        let labels = parse_space_prediction(&text, body.confidence);
        if labels.is_empty() {
            return Err(ClassifierError::MalformedPayload(format!(
                "unparseable prediction text: {}",
                text
            )));
        }
        Ok(labels)
    }
}

impl ClassifierBackend for ClassifierClient {
    fn classify(
        &self,
        source: &ClassifierSource,
        image: &[u8],
        file_name: &str,
    ) -> impl Future<Output = Result<Vec<LabelScore>, ClassifierError>> + Send {
        async move {
            match source.kind {
                SourceKind::HostedModel => self.classify_image(source, image).await,
                SourceKind::Space => self.classify_space(source, image, file_name).await,
            }
        }
    }
}

/// Turn a free-text Space prediction ("Fake (87.2%)", "looks real") into
/// label/score pairs. An inline percentage wins over the reported
/// confidence; with neither, the score defaults to a weak 0.5.
pub fn parse_space_prediction(text: &str, confidence: Option<f64>) -> Vec<LabelScore> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let score = percent_re()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|p| p / 100.0)
        .or(confidence)
        .unwrap_or(0.5);

    vec![LabelScore {
        label: trimmed.to_lowercase(),
        score: score.clamp(0.0, 1.0),
    }]
}

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap())
}

/// Get an API token from environment or config file
pub fn get_api_token(provider: &str) -> Option<String> {
    let env_keys = match provider {
        "huggingface" => vec!["VERIFRAME_HF_TOKEN", "HF_TOKEN"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    if let Some(config_dir) = ConfigStore::default_config_dir() {
        let store = ConfigStore::new(config_dir);
        if let Ok(Some(token)) = store.get_api_token(provider) {
            return Some(token);
        }
    }

    None
}

/// Get a source base-URL override from the config file
pub fn get_source_url(source: &str) -> Option<String> {
    let config_dir = ConfigStore::default_config_dir()?;
    let store = ConfigStore::new(config_dir);
    store.get_source_url(source).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_space_prediction_with_percent() {
        let labels = parse_space_prediction("Fake (87.2%)", Some(0.5));
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].label, "fake (87.2%)");
        assert!((labels[0].score - 0.872).abs() < 1e-9);
    }

    #[test]
    fn test_parse_space_prediction_with_confidence() {
        let labels = parse_space_prediction("Real", Some(0.93));
        assert_eq!(labels[0].label, "real");
        assert!((labels[0].score - 0.93).abs() < 1e-9);
    }

    #[test]
    fn test_parse_space_prediction_defaults() {
        let labels = parse_space_prediction("genuine photograph", None);
        assert!((labels[0].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_space_prediction_empty() {
        assert!(parse_space_prediction("   ", Some(0.9)).is_empty());
    }

    #[test]
    fn test_client_creation() {
        let client = ClassifierClient::new();
        assert!(client.inference_url.starts_with("http"));
        assert!(client.space_url.starts_with("http"));
    }
}
