use crate::core::errors::ConfigError;
use std::env;
use std::time::Duration;
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
}

/// Upload normalization configuration
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Longest allowed side of the normalized image, in pixels
    pub max_dimension: u32,
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
}

/// Classification service configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Base URL of the inference router; the model id is appended as a path segment
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Extra attempts allowed while the model reports a cold start
    pub warmup_retries: u32,
    pub warmup_backoff: Duration,
}

/// Recipe API configuration
#[derive(Debug, Clone)]
pub struct RecipeConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Candidate query templates, each containing a `{label}` placeholder
    pub query_templates: Vec<String>,
}

/// Translation service configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: String,
    pub target_lang: String,
    pub timeout: Duration,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub image: ImageConfig,
    pub classifier: ClassifierConfig,
    pub recipes: RecipeConfig,
    pub translation: TranslationConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env();
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Self {
        // Parse log level
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        // Candidate query templates (comma-separated) or the built-in ladder
        let query_templates = env::var("RECIPE_QUERY_TEMPLATES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|templates| !templates.is_empty())
            .unwrap_or_else(|| {
                vec![
                    "{label}".to_string(),
                    "{label} recipe".to_string(),
                    "how to make {label}".to_string(),
                ]
            });

        Self {
            server: ServerConfig {
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8000),
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                log_level,
            },
            image: ImageConfig {
                max_dimension: env::var("MAX_IMAGE_DIMENSION")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(512),
                jpeg_quality: env::var("JPEG_QUALITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(85),
            },
            classifier: ClassifierConfig {
                endpoint: env::var("CLASSIFIER_ENDPOINT").unwrap_or_else(|_| {
                    "https://router.huggingface.co/hf-inference/models".to_string()
                }),
                model: env::var("HUGGINGFACE_MODEL")
                    .unwrap_or_else(|_| "nateraw/food".to_string()),
                api_key: env::var("HUGGINGFACE_API_KEY").unwrap_or_default(),
                timeout: Duration::from_secs(
                    env::var("CLASSIFY_TIMEOUT_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(60),
                ),
                warmup_retries: env::var("WARMUP_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
                warmup_backoff: Duration::from_secs(
                    env::var("WARMUP_BACKOFF_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(15),
                ),
            },
            recipes: RecipeConfig {
                base_url: env::var("RECIPE_API_BASE")
                    .unwrap_or_else(|_| "https://api.spoonacular.com".to_string()),
                api_key: env::var("SPOONACULAR_API_KEY").unwrap_or_default(),
                timeout: Duration::from_secs(
                    env::var("RECIPE_TIMEOUT_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(20),
                ),
                query_templates,
            },
            translation: TranslationConfig {
                enabled: env::var("TRANSLATION_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                endpoint: env::var("TRANSLATION_ENDPOINT")
                    .unwrap_or_else(|_| "https://api-free.deepl.com/v2/translate".to_string()),
                api_key: env::var("TRANSLATION_API_KEY").unwrap_or_default(),
                target_lang: env::var("TARGET_LANGUAGE").unwrap_or_else(|_| "JA".to_string()),
                timeout: Duration::from_secs(
                    env::var("TRANSLATION_TIMEOUT_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(20),
                ),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Note: upstream API keys are not required here - a missing key fails
        // per-request with an upstream error instead of blocking startup

        if !(64..=4096).contains(&self.image.max_dimension) {
            return Err(ConfigError::InvalidImageConfig(format!(
                "max_dimension must be between 64 and 4096, got {}",
                self.image.max_dimension
            )));
        }

        if !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(ConfigError::InvalidImageConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.image.jpeg_quality
            )));
        }

        if self.classifier.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidClassifierConfig(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.classifier.model.trim().is_empty() {
            return Err(ConfigError::InvalidClassifierConfig(
                "model id must not be empty".to_string(),
            ));
        }
        if self.classifier.timeout.is_zero() {
            return Err(ConfigError::InvalidClassifierConfig(
                "timeout must be > 0".to_string(),
            ));
        }

        if self.recipes.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidRecipeConfig(
                "base_url must not be empty".to_string(),
            ));
        }
        if self.recipes.timeout.is_zero() {
            return Err(ConfigError::InvalidRecipeConfig(
                "timeout must be > 0".to_string(),
            ));
        }
        for template in &self.recipes.query_templates {
            if !template.contains("{label}") {
                return Err(ConfigError::InvalidRecipeConfig(format!(
                    "query template {template:?} is missing the {{label}} placeholder"
                )));
            }
        }

        if self.translation.enabled {
            if self.translation.api_key.trim().is_empty() {
                return Err(ConfigError::InvalidTranslationConfig(
                    "TRANSLATION_API_KEY must be set when translation is enabled".to_string(),
                ));
            }
            if self.translation.target_lang.trim().is_empty() {
                return Err(ConfigError::InvalidTranslationConfig(
                    "target language must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Baseline config for unit tests; callers override the fields under test
    #[cfg(test)]
    pub(crate) fn test_defaults() -> Self {
        Self {
            server: ServerConfig {
                port: 8000,
                host: "127.0.0.1".to_string(),
                log_level: Level::INFO,
            },
            image: ImageConfig {
                max_dimension: 512,
                jpeg_quality: 85,
            },
            classifier: ClassifierConfig {
                endpoint: "http://localhost/models".to_string(),
                model: "test/model".to_string(),
                api_key: "test-key".to_string(),
                timeout: Duration::from_secs(5),
                warmup_retries: 1,
                warmup_backoff: Duration::from_millis(50),
            },
            recipes: RecipeConfig {
                base_url: "http://localhost".to_string(),
                api_key: "test-key".to_string(),
                timeout: Duration::from_secs(5),
                query_templates: vec![
                    "{label}".to_string(),
                    "{label} recipe".to_string(),
                    "how to make {label}".to_string(),
                ],
            },
            translation: TranslationConfig {
                enabled: false,
                endpoint: "http://localhost/translate".to_string(),
                api_key: "test-key".to_string(),
                target_lang: "JA".to_string(),
                timeout: Duration::from_secs(5),
            },
        }
    }
}

// Note: No Default implementation because Config::new() can fail
// Users should explicitly call Config::new()? and handle errors
