use crate::geocode::{GeocodeError, GeocodeProvider};
use async_trait::async_trait;
use tracing::debug;

/// Never contacts a service; every lookup falls back to coordinates.
pub struct OfflineProvider;

impl OfflineProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeocodeProvider for OfflineProvider {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        debug!(
            "Offline geocoder asked for {}, {}; no lookup performed",
            latitude, longitude
        );
        Err(GeocodeError::Offline)
    }

    fn name(&self) -> &str {
        "Offline"
    }
}
