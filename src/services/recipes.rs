use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::config::Config;
use crate::core::errors::RecipeError;
use crate::core::types::{
    Ingredient, RecipeDetail, NO_INSTRUCTIONS_PLACEHOLDER, UNKNOWN_RECIPE_TITLE,
};
use crate::services::snippet;
use crate::utils::Metrics;

/// Hits requested per search call; the resolver only consumes the top one
const SEARCH_PAGE_SIZE: &str = "1";

/// Search hit from the recipe API
#[derive(Debug, Deserialize)]
pub struct RecipeHit {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RecipeHit>,
}

/// Wire shape of the recipe information endpoint
#[derive(Debug, Deserialize)]
struct InformationResponse {
    title: Option<String>,
    image: Option<String>,
    instructions: Option<String>,
    #[serde(rename = "extendedIngredients", default)]
    extended_ingredients: Vec<RawIngredient>,
    #[serde(rename = "sourceUrl")]
    source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIngredient {
    name: Option<String>,
    amount: Option<f64>,
    unit: Option<String>,
}

impl InformationResponse {
    fn into_detail(self) -> RecipeDetail {
        let ingredients = self
            .extended_ingredients
            .into_iter()
            .map(|ing| Ingredient {
                name: ing.name.unwrap_or_default(),
                amount: format_measure(ing.amount, ing.unit.as_deref()),
            })
            .collect();

        RecipeDetail {
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_RECIPE_TITLE.to_string()),
            image_url: self.image,
            instructions: self
                .instructions
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| NO_INSTRUCTIONS_PLACEHOLDER.to_string()),
            ingredients,
            source_url: self.source_url,
        }
    }
}

/// Synthesize the human-readable measure string from amount and unit
fn format_measure(amount: Option<f64>, unit: Option<&str>) -> String {
    let amount_part = amount
        .map(|a| {
            if a.fract() == 0.0 {
                format!("{}", a as i64)
            } else {
                format!("{a}")
            }
        })
        .unwrap_or_default();
    let unit_part = unit.unwrap_or("").trim();
    format!("{amount_part} {unit_part}").trim().to_string()
}

/// Client for the recipe search and detail endpoints
pub struct RecipeClient {
    config: Arc<Config>,
    http_client: reqwest::Client,
    metrics: Option<Metrics>,
}

impl RecipeClient {
    pub fn new(config: Arc<Config>, metrics: Option<Metrics>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.recipes.timeout)
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

    fn base_url(&self) -> &str {
        self.config.recipes.base_url.trim_end_matches('/')
    }

    /// Search recipes matching a free-text query.
    ///
    /// A well-formed response with no results yields an empty list; anything
    /// else (transport failure, non-success status, malformed body) is an
    /// error so the caller never mistakes an upstream fault for a miss.
    pub async fn search(&self, query: &str) -> Result<Vec<RecipeHit>, RecipeError> {
        let url = format!("{}/recipes/complexSearch", self.base_url());
        debug!("searching recipes for {:?}", query);
        let body = self
            .get_text(
                &url,
                &[
                    ("query", query),
                    ("number", SEARCH_PAGE_SIZE),
                    ("apiKey", self.config.recipes.api_key.as_str()),
                ],
            )
            .await?;

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| RecipeError::InvalidJson(e.to_string()))?;
        Ok(parsed.results)
    }

    /// Fetch full detail for a resolved recipe id in canonical form
    pub async fn information(&self, recipe_id: u64) -> Result<RecipeDetail, RecipeError> {
        let url = format!("{}/recipes/{}/information", self.base_url(), recipe_id);
        let body = self
            .get_text(&url, &[("apiKey", self.config.recipes.api_key.as_str())])
            .await?;

        let parsed: InformationResponse =
            serde_json::from_str(&body).map_err(|e| RecipeError::InvalidJson(e.to_string()))?;
        Ok(parsed.into_detail())
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, RecipeError> {
        let started = Instant::now();
        let result = self.http_client.get(url).query(query).send().await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.record(false, started.elapsed());
                // drop the URL before the error escapes; its query string
                // carries the API key
                return Err(RecipeError::Request(e.without_url()));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.record(false, started.elapsed());
                return Err(RecipeError::Request(e.without_url()));
            }
        };

        if !status.is_success() {
            self.record(false, started.elapsed());
            return Err(RecipeError::Upstream {
                status: status.as_u16(),
                message: snippet(&body),
            });
        }

        self.record(true, started.elapsed());
        Ok(body)
    }

    fn record(&self, success: bool, duration: Duration) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_api_call(success, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::PipelineError;
    use crate::core::types::PipelineOutcome;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> RecipeClient {
        let mut config = Config::test_defaults();
        config.recipes.base_url = server.base_url();
        RecipeClient::new(Arc::new(config), None).unwrap()
    }

    #[test]
    fn test_format_measure() {
        assert_eq!(format_measure(Some(2.0), Some("cups")), "2 cups");
        assert_eq!(format_measure(Some(1.5), Some("tbsp")), "1.5 tbsp");
        assert_eq!(format_measure(Some(3.0), None), "3");
        assert_eq!(format_measure(None, Some("pinch")), "pinch");
        assert_eq!(format_measure(None, None), "");
    }

    #[tokio::test]
    async fn test_search_parses_hits() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/recipes/complexSearch")
                .query_param("query", "sushi")
                .query_param("number", "1")
                .query_param("apiKey", "test-key");
            then.status(200)
                .json_body(json!({"results": [{"id": 715538, "title": "Sushi"}]}));
        });

        let client = client_for(&server);
        let hits = client.search("sushi").await.unwrap();

        mock.assert();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 715538);
    }

    #[tokio::test]
    async fn test_search_with_missing_results_key_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/recipes/complexSearch");
            then.status(200).json_body(json!({"offset": 0, "number": 1}));
        });

        let client = client_for(&server);
        let hits = client.search("sushi").await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_upstream_error_is_not_a_miss() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/recipes/complexSearch");
            then.status(402)
                .json_body(json!({"status": "failure", "message": "quota exhausted"}));
        });

        let client = client_for(&server);
        let err = client.search("sushi").await.unwrap_err();
        assert!(matches!(err, RecipeError::Upstream { status: 402, .. }));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_the_api_key() {
        // bind-and-drop leaves a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = Config::test_defaults();
        config.recipes.base_url = format!("http://127.0.0.1:{port}");
        config.recipes.api_key = "sk-live-recipe-credential".to_string();
        let client = RecipeClient::new(Arc::new(config), None).unwrap();

        let err = client.search("sushi").await.unwrap_err();
        assert!(matches!(err, RecipeError::Request(_)));
        let message = err.to_string();
        assert!(!message.contains("sk-live-recipe-credential"));
        assert!(!message.contains("apiKey"));

        let envelope = PipelineOutcome::Failed(PipelineError::Search(err)).into_envelope();
        let serialized = serde_json::to_string(&envelope).unwrap();
        assert!(serialized.contains("recipe search failed"));
        assert!(!serialized.contains("sk-live-recipe-credential"));
    }

    #[tokio::test]
    async fn test_information_canonicalizes_full_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/recipes/715538/information")
                .query_param("apiKey", "test-key");
            then.status(200).json_body(json!({
                "title": "Sushi Bowl",
                "image": "https://img.example/sushi.jpg",
                "instructions": "Cook the rice. Slice the fish.",
                "extendedIngredients": [
                    {"name": "rice", "amount": 2.0, "unit": "cups"},
                    {"name": "salmon", "amount": 200.0, "unit": "g"},
                    {"name": "nori", "amount": 4.0, "unit": ""}
                ],
                "sourceUrl": "https://example.com/sushi-bowl"
            }));
        });

        let client = client_for(&server);
        let detail = client.information(715538).await.unwrap();

        mock.assert();
        assert_eq!(detail.title, "Sushi Bowl");
        assert_eq!(
            detail.image_url.as_deref(),
            Some("https://img.example/sushi.jpg")
        );
        assert_eq!(detail.instructions, "Cook the rice. Slice the fish.");
        assert_eq!(detail.ingredients.len(), 3);
        assert_eq!(detail.ingredients[0].name, "rice");
        assert_eq!(detail.ingredients[0].amount, "2 cups");
        assert_eq!(detail.ingredients[2].amount, "4");
        assert_eq!(
            detail.source_url.as_deref(),
            Some("https://example.com/sushi-bowl")
        );
    }

    #[tokio::test]
    async fn test_information_defaults_missing_fields() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/recipes/42/information");
            then.status(200).json_body(json!({
                "extendedIngredients": [{"name": "salt"}]
            }));
        });

        let client = client_for(&server);
        let detail = client.information(42).await.unwrap();

        assert_eq!(detail.title, UNKNOWN_RECIPE_TITLE);
        assert_eq!(detail.instructions, NO_INSTRUCTIONS_PLACEHOLDER);
        assert!(detail.image_url.is_none());
        assert!(detail.source_url.is_none());
        assert_eq!(detail.ingredients[0].amount, "");
    }

    #[tokio::test]
    async fn test_information_empty_instructions_get_placeholder() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/recipes/42/information");
            then.status(200)
                .json_body(json!({"title": "Plain Rice", "instructions": ""}));
        });

        let client = client_for(&server);
        let detail = client.information(42).await.unwrap();
        assert_eq!(detail.instructions, NO_INSTRUCTIONS_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_information_upstream_failure_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/recipes/42/information");
            then.status(500).body("internal error");
        });

        let client = client_for(&server);
        let err = client.information(42).await.unwrap_err();
        assert!(matches!(err, RecipeError::Upstream { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_information_malformed_body_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/recipes/42/information");
            then.status(200).body("not json at all");
        });

        let client = client_for(&server);
        let err = client.information(42).await.unwrap_err();
        assert!(matches!(err, RecipeError::InvalidJson(_)));
    }
}
