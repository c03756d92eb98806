//! Remote plate-recognition service
//!
//! Client for a Plate Recognizer compatible `plate-reader` endpoint. The
//! service ranks its own guesses; callers take them in the order returned.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::PlateServiceConfig;
use crate::error::PlateServiceError;

const USER_AGENT: &str = concat!("platescan/", env!("CARGO_PKG_VERSION"));

/// One plate guess. `score` is 0.0–1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateGuess {
    pub plate: String,
    pub score: f64,
}

/// A remote service that reads plates from an encoded image.
#[async_trait]
pub trait PlateService: Send + Sync {
    fn name(&self) -> &str;

    /// Guesses in the service's own preference order. An empty vector is a
    /// valid answer meaning "no plate seen".
    async fn recognize_plate(&self, image: &[u8]) -> Result<Vec<PlateGuess>, PlateServiceError>;
}

#[derive(Debug, Deserialize)]
struct PlateReaderResponse {
    #[serde(default)]
    results: Vec<PlateGuess>,
}

/// Plate Recognizer API client
pub struct PlateRecognizerClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    regions: Vec<String>,
}

impl PlateRecognizerClient {
    pub fn new(config: &PlateServiceConfig) -> Result<Self, PlateServiceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PlateServiceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.trim().to_string(),
            regions: config.regions.clone(),
        })
    }
}

#[async_trait]
impl PlateService for PlateRecognizerClient {
    fn name(&self) -> &str {
        "plate-recognizer"
    }

    async fn recognize_plate(&self, image: &[u8]) -> Result<Vec<PlateGuess>, PlateServiceError> {
        let upload = base64::engine::general_purpose::STANDARD.encode(image);
        let mut form: Vec<(&str, &str)> = vec![("upload", upload.as_str())];
        form.extend(self.regions.iter().map(|r| ("regions", r.as_str())));

        tracing::debug!(endpoint = %self.endpoint, bytes = image.len(), "Querying plate service");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlateServiceError::Timeout
                } else {
                    PlateServiceError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PlateServiceError::InvalidApiKey);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlateServiceError::Api(status.as_u16(), error_text));
        }

        let body: PlateReaderResponse = response
            .json()
            .await
            .map_err(|e| PlateServiceError::Parse(e.to_string()))?;

        if let Some(top) = body.results.first() {
            tracing::debug!(plate = %top.plate, score = top.score, guesses = body.results.len(), "Plate service answered");
        }

        Ok(body.results)
    }
}
