use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::core::config::Config;
use crate::core::errors::TranslationError;
use crate::services::snippet;
use crate::utils::Metrics;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

/// Client for the translation endpoint
pub struct TranslationClient {
    config: Arc<Config>,
    http_client: reqwest::Client,
    metrics: Option<Metrics>,
}

impl TranslationClient {
    pub fn new(config: Arc<Config>, metrics: Option<Metrics>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.translation.timeout)
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

    /// Translate one text fragment into the configured target language
    pub async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let started = Instant::now();
        let result = self
            .http_client
            .post(&self.config.translation.endpoint)
            .header(
                AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.config.translation.api_key),
            )
            .form(&[
                ("text", text),
                ("target_lang", self.config.translation.target_lang.as_str()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.record(false, started.elapsed());
                return Err(TranslationError::Request(e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.record(false, started.elapsed());
                return Err(TranslationError::Request(e));
            }
        };

        if !status.is_success() {
            self.record(false, started.elapsed());
            return Err(TranslationError::Upstream {
                status: status.as_u16(),
                message: snippet(&body),
            });
        }

        let parsed: TranslateResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) => {
                self.record(false, started.elapsed());
                return Err(TranslationError::InvalidResponse(snippet(&body)));
            }
        };

        let translated = parsed
            .translations
            .into_iter()
            .map(|t| t.text)
            .find(|t| !t.is_empty());

        match translated {
            Some(translated) => {
                self.record(true, started.elapsed());
                Ok(translated)
            }
            None => {
                self.record(false, started.elapsed());
                Err(TranslationError::InvalidResponse(
                    "response carried no translations".to_string(),
                ))
            }
        }
    }

    /// Translate a field, falling back to the source text on any failure.
    ///
    /// Empty input short-circuits without an upstream call.
    pub async fn translate_or_original(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        match self.translate(text).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("translation failed, keeping source text: {e}");
                text.to_string()
            }
        }
    }

    fn record(&self, success: bool, duration: Duration) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_api_call(success, duration);
        }
    }
}
