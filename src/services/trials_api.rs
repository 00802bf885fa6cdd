use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{ErrorResponse, HealthStatus, SearchOptions, Trial};

/// Errors that can occur when talking to the trial search backend
#[derive(Debug, Error)]
pub enum TrialApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    Api(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Trial search collaborator
#[async_trait]
pub trait TrialSearch: Send + Sync {
    /// Search trials for a condition near a city.
    ///
    /// Returns raw, unranked records. A response that is valid but not a
    /// list of trials yields an empty list.
    async fn search(
        &self,
        condition: &str,
        city: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Trial>, TrialApiError>;
}

/// Connectivity probe, reported to the user but never consulted by ranking
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check_health(&self) -> Result<HealthStatus, TrialApiError>;
}

/// HTTP client for the trial search backend
///
/// Endpoints:
/// - `GET /api/trials/search?condition=..&location=..&maxDistance=..&limit=..`
/// - `GET /api/health`
pub struct TrialApiClient {
    base_url: String,
    client: Client,
}

impl TrialApiClient {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TrialApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn search_url(&self, condition: &str, city: &str, options: &SearchOptions) -> String {
        let mut url = format!(
            "{}?condition={}",
            self.endpoint("/api/trials/search"),
            urlencoding::encode(condition)
        );

        if !city.is_empty() {
            url.push_str(&format!("&location={}", urlencoding::encode(city)));
        }
        if let Some(max_distance) = options.max_distance {
            url.push_str(&format!("&maxDistance={}", max_distance));
        }
        if let Some(limit) = options.result_cap {
            url.push_str(&format!("&limit={}", limit));
        }

        url
    }
}

#[async_trait]
impl TrialSearch for TrialApiClient {
    async fn search(
        &self,
        condition: &str,
        city: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Trial>, TrialApiError> {
        let url = self.search_url(condition, city, options);

        tracing::debug!("Searching trials: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(TrialApiError::Api(format!("Trial search failed: {}", message)));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| TrialApiError::InvalidResponse(format!("Failed to parse search response: {}", e)))?;

        parse_trials(json)
    }
}

#[async_trait]
impl HealthCheck for TrialApiClient {
    async fn check_health(&self) -> Result<HealthStatus, TrialApiError> {
        let response = self.client.get(self.endpoint("/api/health")).send().await?;

        if !response.status().is_success() {
            return Err(TrialApiError::Api(format!(
                "Health check failed: {}",
                response.status()
            )));
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| TrialApiError::InvalidResponse(format!("Failed to parse health response: {}", e)))
    }
}

/// Turn a search response body into trials
///
/// Malformed elements are dropped individually; a `{"error": ..}` body is an
/// API error; any other non-array body is treated as no results.
fn parse_trials(json: Value) -> Result<Vec<Trial>, TrialApiError> {
    let items = match json {
        Value::Array(items) => items,
        Value::Object(obj) if obj.contains_key("error") => {
            let error: ErrorResponse = serde_json::from_value(Value::Object(obj))
                .map_err(|e| TrialApiError::InvalidResponse(e.to_string()))?;
            let message = match error.details {
                Some(details) => format!("{} ({})", error.error, details),
                None => error.error,
            };
            return Err(TrialApiError::Api(message));
        }
        other => {
            tracing::warn!("Search response is not a list of trials: {}", other);
            return Ok(Vec::new());
        }
    };

    let total = items.len();
    let trials: Vec<Trial> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Trial>(item) {
            Ok(trial) => Some(trial),
            Err(e) => {
                tracing::warn!("Dropping malformed trial record: {}", e);
                None
            }
        })
        .collect();

    tracing::debug!("Parsed {} of {} trial records", trials.len(), total);

    Ok(trials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = TrialApiClient::new("http://localhost:2000/", Duration::from_secs(5)).unwrap();

        assert_eq!(client.endpoint("/api/health"), "http://localhost:2000/api/health");
    }

    #[test]
    fn test_search_url_encoding() {
        let client = TrialApiClient::new("http://localhost:2000", Duration::from_secs(5)).unwrap();
        let options = SearchOptions {
            max_distance: Some(50),
            result_cap: Some(20),
        };

        let url = client.search_url("Type 2 Diabetes", "San Ramon", &options);

        assert_eq!(
            url,
            "http://localhost:2000/api/trials/search?condition=Type%202%20Diabetes&location=San%20Ramon&maxDistance=50&limit=20"
        );
        assert_eq!(
            client.search_url("Asthma", "", &SearchOptions::default()),
            "http://localhost:2000/api/trials/search?condition=Asthma"
        );
    }

    #[test]
    fn test_parse_trials_drops_malformed_records() {
        let json = serde_json::json!([
            { "id": "NCT1", "conditions": ["Asthma"] },
            { "id": "NCT2", "conditions": "not-a-list" },
            { "id": "NCT3" }
        ]);

        let trials = parse_trials(json).unwrap();
        let ids: Vec<&str> = trials.iter().map(|t| t.id.as_str()).collect();

        assert_eq!(ids, vec!["NCT1", "NCT3"]);
    }

    #[test]
    fn test_parse_trials_error_body() {
        let json = serde_json::json!({ "error": "Failed to fetch clinical trials", "details": "503" });

        let result = parse_trials(json);

        assert!(matches!(result, Err(TrialApiError::Api(msg)) if msg.contains("503")));
    }

    #[test]
    fn test_parse_trials_unexpected_shape_is_empty() {
        assert!(parse_trials(serde_json::json!({ "studies": [] })).unwrap().is_empty());
        assert!(parse_trials(Value::Null).unwrap().is_empty());
    }
}
