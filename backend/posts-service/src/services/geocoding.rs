//! Address to coordinates lookup.

use crate::config::GeocodingConfig;
use crate::metrics;
use crate::models::Location;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no coordinates found for address")]
    NoResults,

    #[error("geocoding is not configured")]
    Disabled,

    #[error("geocoding request failed: {0}")]
    Request(String),

    #[error("unexpected geocoding response: {0}")]
    InvalidResponse(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Location, GeocodeError>;
}

/// Google Geocoding JSON API client
pub struct GoogleGeocoder {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

impl GoogleGeocoder {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Result<Location, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        match body.status.as_str() {
            "OK" => body
                .results
                .into_iter()
                .next()
                .map(|r| r.geometry.location)
                .ok_or(GeocodeError::NoResults),
            "ZERO_RESULTS" => Err(GeocodeError::NoResults),
            other => Err(GeocodeError::InvalidResponse(format!(
                "{}: {}",
                other,
                body.error_message.unwrap_or_default()
            ))),
        }
    }
}

/// Used when no API key is configured; every lookup fails.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Location, GeocodeError> {
        Err(GeocodeError::Disabled)
    }
}

/// Pick the geocoder for the current configuration.
pub fn from_config(config: &GeocodingConfig) -> Result<Box<dyn Geocoder>, GeocodeError> {
    match &config.api_key {
        Some(key) => Ok(Box::new(GoogleGeocoder::new(
            key.clone(),
            config.base_url.clone(),
            Duration::from_millis(config.timeout_ms),
        )?)),
        None => {
            tracing::warn!("GOOGLE_API_KEY not set, address lookups will fail");
            Ok(Box::new(DisabledGeocoder))
        }
    }
}

/// Resolve an address and record the outcome.
pub async fn resolve_recorded(
    geocoder: &dyn Geocoder,
    address: &str,
) -> Result<Location, GeocodeError> {
    let result = geocoder.resolve(address).await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(GeocodeError::NoResults) => "no_results",
        Err(_) => "error",
    };
    metrics::GEOCODE_REQUESTS_TOTAL
        .with_label_values(&[outcome])
        .inc();

    if let Err(e) = &result {
        tracing::warn!(error = %e, "address lookup failed");
    }
    result
}
