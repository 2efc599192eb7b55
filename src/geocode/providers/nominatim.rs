use crate::GeocodeConfig;
use crate::geocode::{GeocodeError, GeocodeProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
}

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimProvider {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl NominatimProvider {
    pub fn new(config: &GeocodeConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let lat = latitude.to_string();
        let lon = longitude.to_string();
        debug!("Reverse geocoding {}, {} via {}", lat, lon, self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("accept-language", self.language.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::StatusError(status.as_u16()));
        }

        let body: ReverseResponse = response.json().await?;
        body.display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(GeocodeError::MissingPlace)
    }

    fn name(&self) -> &str {
        "Nominatim"
    }
}
