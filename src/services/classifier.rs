use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::config::Config;
use crate::core::errors::ClassifyError;
use crate::core::types::Prediction;
use crate::services::snippet;
use crate::utils::Metrics;

/// Raw prediction element as returned by the inference endpoint
#[derive(Debug, Deserialize)]
struct RawPrediction {
    label: Option<String>,
    score: Option<f64>,
}

/// Client for the external image classification endpoint
pub struct ClassifierClient {
    config: Arc<Config>,
    http_client: reqwest::Client,
    metrics: Option<Metrics>,
}

impl ClassifierClient {
    pub fn new(config: Arc<Config>, metrics: Option<Metrics>) -> Result<Self> {
        // HTTP client with timeout and connection pooling
        let http_client = reqwest::Client::builder()
            .timeout(config.classifier.timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
            metrics,
        })
    }

    fn model_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.classifier.endpoint.trim_end_matches('/'),
            self.config.classifier.model
        )
    }

    /// Classify a normalized JPEG into a food label.
    ///
    /// Sends the raw bytes to the inference endpoint and extracts the top
    /// prediction. While the upstream reports a cold start ("model loading"),
    /// waits the configured backoff and retries, up to the configured retry
    /// budget. Every other failure is returned immediately.
    pub async fn classify(&self, jpeg_bytes: &[u8]) -> Result<Prediction, ClassifyError> {
        let url = self.model_url();
        let max_retries = self.config.classifier.warmup_retries;

        for attempt in 0..=max_retries {
            let started = Instant::now();
            let result = self
                .http_client
                .post(&url)
                .header(
                    AUTHORIZATION,
                    format!("Bearer {}", self.config.classifier.api_key),
                )
                .header(CONTENT_TYPE, "image/jpeg")
                .body(jpeg_bytes.to_vec())
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    self.record(false, started.elapsed());
                    return Err(ClassifyError::Request(e));
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    self.record(false, started.elapsed());
                    return Err(ClassifyError::Request(e));
                }
            };

            let value: serde_json::Value = match serde_json::from_str(&body) {
                Ok(value) => value,
                Err(_) => {
                    self.record(false, started.elapsed());
                    return Err(ClassifyError::InvalidJson {
                        status: status.as_u16(),
                        snippet: snippet(&body),
                    });
                }
            };

            // Cold-start and other upstream errors arrive as an object with
            // an `error` field, regardless of status code
            if let Some(error_text) = value.get("error").and_then(|e| e.as_str()) {
                self.record(false, started.elapsed());
                if is_loading_message(error_text) {
                    if attempt < max_retries {
                        warn!(
                            "model is warming up ({}), retrying in {:?} ({}/{})",
                            error_text,
                            self.config.classifier.warmup_backoff,
                            attempt + 1,
                            max_retries
                        );
                        tokio::time::sleep(self.config.classifier.warmup_backoff).await;
                        continue;
                    }
                    return Err(ClassifyError::ModelLoading {
                        attempts: attempt + 1,
                        message: error_text.to_string(),
                    });
                }
                return Err(ClassifyError::Upstream {
                    status: status.as_u16(),
                    message: error_text.to_string(),
                });
            }

            if !status.is_success() {
                self.record(false, started.elapsed());
                return Err(ClassifyError::Upstream {
                    status: status.as_u16(),
                    message: snippet(&body),
                });
            }

            self.record(true, started.elapsed());

            let predictions: Vec<RawPrediction> =
                serde_json::from_value(value).map_err(|_| ClassifyError::NoPrediction)?;
            let top = predictions
                .into_iter()
                .next()
                .ok_or(ClassifyError::NoPrediction)?;

            let prediction = Prediction {
                label: top
                    .label
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| "unknown".to_string())
                    .to_lowercase(),
                confidence: top.score.unwrap_or(0.0),
            };
            debug!(
                "classified image as {:?} (confidence {:.3})",
                prediction.label, prediction.confidence
            );
            return Ok(prediction);
        }

        Err(ClassifyError::ModelLoading {
            attempts: max_retries + 1,
            message: "retry budget exhausted".to_string(),
        })
    }

    fn record(&self, success: bool, duration: Duration) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_api_call(success, duration);
        }
    }
}

/// The upstream signals a cold start through the error text rather than a
/// dedicated status code
fn is_loading_message(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    lowered.contains("loading") || lowered.contains("warming up")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, retries: u32, backoff_ms: u64) -> ClassifierClient {
        let mut config = Config::test_defaults();
        config.classifier.endpoint = server.url("/hf-models");
        config.classifier.model = "food-test".to_string();
        config.classifier.warmup_retries = retries;
        config.classifier.warmup_backoff = Duration::from_millis(backoff_ms);
        ClassifierClient::new(Arc::new(config), None).unwrap()
    }

    #[test]
    fn test_loading_message_detection() {
        assert!(is_loading_message("Model nateraw/food is currently loading"));
        assert!(is_loading_message("The model is warming up"));
        assert!(!is_loading_message("quota exceeded"));
        assert!(!is_loading_message("internal error"));
    }

    #[tokio::test]
    async fn test_classify_extracts_top_prediction() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/hf-models/food-test")
                .header("authorization", "Bearer test-key")
                .header("content-type", "image/jpeg");
            then.status(200).json_body(json!([
                {"label": "Sushi", "score": 0.98},
                {"label": "ramen", "score": 0.01}
            ]));
        });

        let client = client_for(&server, 1, 50);
        let prediction = client.classify(b"jpeg bytes").await.unwrap();

        mock.assert();
        assert_eq!(prediction.label, "sushi");
        assert_eq!(prediction.confidence, 0.98);
    }

    #[tokio::test]
    async fn test_missing_score_defaults_to_zero() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(200).json_body(json!([{"label": "Pizza"}]));
        });

        let client = client_for(&server, 1, 50);
        let prediction = client.classify(b"jpeg bytes").await.unwrap();

        assert_eq!(prediction.label, "pizza");
        assert_eq!(prediction.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_loading_then_success_retries_once_after_backoff() {
        let server = MockServer::start();
        let mut loading_mock = server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(503)
                .json_body(json!({"error": "Model food-test is currently loading"}));
        });

        let client = Arc::new(client_for(&server, 1, 300));
        let started = Instant::now();
        let task = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.classify(b"jpeg bytes").await })
        };

        // Wait for the first attempt to land, then swap in a success response
        // while the client sleeps out its backoff
        for _ in 0..100 {
            if loading_mock.hits() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(loading_mock.hits(), 1);
        loading_mock.delete();
        let success_mock = server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(200)
                .json_body(json!([{"label": "sushi", "score": 0.91}]));
        });

        let prediction = task.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        success_mock.assert();
        assert_eq!(prediction.label, "sushi");
    }

    #[tokio::test]
    async fn test_loading_exhausts_retry_budget() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(503)
                .json_body(json!({"error": "Model food-test is currently loading"}));
        });

        let client = client_for(&server, 1, 30);
        let err = client.classify(b"jpeg bytes").await.unwrap_err();

        // One initial attempt plus exactly one retry
        mock.assert_hits(2);
        assert!(matches!(err, ClassifyError::ModelLoading { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_non_loading_error_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(429).json_body(json!({"error": "quota exceeded"}));
        });

        let client = client_for(&server, 1, 30);
        let err = client.classify(b"jpeg bytes").await.unwrap_err();

        mock.assert_hits(1);
        assert!(matches!(err, ClassifyError::Upstream { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_non_json_body_is_a_protocol_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(200).body("<html>gateway timeout</html>");
        });

        let client = client_for(&server, 1, 30);
        let err = client.classify(b"jpeg bytes").await.unwrap_err();

        assert!(matches!(err, ClassifyError::InvalidJson { .. }));
    }

    #[tokio::test]
    async fn test_empty_prediction_list_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(200).json_body(json!([]));
        });

        let client = client_for(&server, 1, 30);
        let err = client.classify(b"jpeg bytes").await.unwrap_err();

        assert!(matches!(err, ClassifyError::NoPrediction));
    }

    #[tokio::test]
    async fn test_non_list_body_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hf-models/food-test");
            then.status(200).json_body(json!({"unexpected": "shape"}));
        });

        let client = client_for(&server, 1, 30);
        let err = client.classify(b"jpeg bytes").await.unwrap_err();

        assert!(matches!(err, ClassifyError::NoPrediction));
    }
}
