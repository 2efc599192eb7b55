pub mod error;
pub mod providers;

pub use error::GeocodeError;

use crate::GeocodeConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;
    fn name(&self) -> &str;
}

pub type DynGeocodeProvider = Arc<dyn GeocodeProvider>;

/// Fallback place string: both coordinates to four decimals.
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{:.4}, {:.4}", latitude, longitude)
}

/// Turns coordinates into a place name. Lookups are bounded by a timeout and
/// any failure yields the numeric coordinates instead of an error.
pub struct GeocodeResolver {
    provider: DynGeocodeProvider,
    timeout: Duration,
    default_location: String,
}

impl GeocodeResolver {
    pub fn new(
        provider: DynGeocodeProvider,
        timeout: Duration,
        default_location: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            timeout,
            default_location: default_location.into(),
        }
    }

    pub fn from_config(config: &GeocodeConfig, offline: bool) -> Self {
        let provider: DynGeocodeProvider = if offline {
            Arc::new(providers::offline::OfflineProvider::new())
        } else {
            match providers::nominatim::NominatimProvider::new(config) {
                Ok(provider) => Arc::new(provider),
                Err(e) => {
                    warn!("Failed to set up geocoding client, staying offline: {}", e);
                    Arc::new(providers::offline::OfflineProvider::new())
                }
            }
        };

        Self::new(
            provider,
            Duration::from_secs(config.timeout_secs),
            config.default_location.clone(),
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn resolve(&self, latitude: f64, longitude: f64) -> String {
        let lookup = self.provider.reverse(latitude, longitude);
        let result = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(GeocodeError::Timeout(self.timeout)),
        };

        match result {
            Ok(place) => {
                info!("Resolved {}, {} to '{}'", latitude, longitude, place);
                place
            }
            Err(e) => {
                warn!(
                    "Geocoding {}, {} with {} failed, using coordinates: {}",
                    latitude,
                    longitude,
                    self.provider.name(),
                    e
                );
                format_coordinates(latitude, longitude)
            }
        }
    }

    /// Resolve a position if there is one, otherwise use the default location.
    pub async fn resolve_or_default(&self, position: Option<(f64, f64)>) -> String {
        match position {
            Some((latitude, longitude)) => self.resolve(latitude, longitude).await,
            None => self.default_location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use providers::nominatim::NominatimProvider;
    use providers::offline::OfflineProvider;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    struct FixedProvider(&'static str);

    #[async_trait]
    impl GeocodeProvider for FixedProvider {
        async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<String, GeocodeError> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl GeocodeProvider for SlowProvider {
        async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<String, GeocodeError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }

        fn name(&self) -> &str {
            "Slow"
        }
    }

    /// Serve a single HTTP response and report the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buffer = vec![0u8; 8192];
                let read = socket.read(&mut buffer).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buffer[..read]);
                let request_line = request.lines().next().unwrap_or_default().to_string();
                let _ = request_tx.send(request_line);

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/reverse", addr), request_rx)
    }

    fn config_for(endpoint: String) -> GeocodeConfig {
        GeocodeConfig {
            endpoint,
            timeout_secs: 5,
            ..Config::default().geocode
        }
    }

    fn resolver_for(provider: DynGeocodeProvider) -> GeocodeResolver {
        GeocodeResolver::new(provider, Duration::from_millis(200), "Hà Nội, Việt Nam")
    }

    #[test]
    fn test_format_coordinates() {
        assert_eq!(format_coordinates(21.028511, 105.804817), "21.0285, 105.8048");
        assert_eq!(format_coordinates(-33.9, 18.4241), "-33.9000, 18.4241");
        assert_eq!(format_coordinates(0.0, 0.0), "0.0000, 0.0000");
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let resolver = resolver_for(Arc::new(FixedProvider("Hoàn Kiếm, Hà Nội")));
        assert_eq!(resolver.resolve(21.0, 105.8).await, "Hoàn Kiếm, Hà Nội");
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_coordinates() {
        let resolver = resolver_for(Arc::new(OfflineProvider::new()));
        assert_eq!(resolver.resolve(10.762622, 106.660172).await, "10.7626, 106.6602");
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_coordinates() {
        let resolver = resolver_for(Arc::new(SlowProvider));
        let started = std::time::Instant::now();
        assert_eq!(resolver.resolve(1.0, 2.0).await, "1.0000, 2.0000");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_resolve_or_default() {
        let resolver = resolver_for(Arc::new(FixedProvider("Somewhere")));
        assert_eq!(resolver.resolve_or_default(None).await, "Hà Nội, Việt Nam");
        assert_eq!(
            resolver.resolve_or_default(Some((1.0, 1.0))).await,
            "Somewhere"
        );
    }

    #[tokio::test]
    async fn test_nominatim_request_and_response() {
        let (endpoint, request) =
            serve_once("200 OK", r#"{"display_name":"Hồ Gươm, Hà Nội, Việt Nam"}"#).await;
        let provider = NominatimProvider::new(&config_for(endpoint)).unwrap();

        let place = provider.reverse(21.0288, 105.8525).await.unwrap();
        assert_eq!(place, "Hồ Gươm, Hà Nội, Việt Nam");

        let request_line = request.await.unwrap();
        assert!(request_line.starts_with("GET /reverse?"));
        assert!(request_line.contains("format=json"));
        assert!(request_line.contains("lat=21.0288"));
        assert!(request_line.contains("lon=105.8525"));
        assert!(request_line.contains("accept-language=vi"));
    }

    #[tokio::test]
    async fn test_nominatim_missing_field() {
        let (endpoint, _request) = serve_once("200 OK", r#"{"error":"Unable to geocode"}"#).await;
        let provider = NominatimProvider::new(&config_for(endpoint)).unwrap();
        assert!(matches!(
            provider.reverse(0.0, 0.0).await,
            Err(GeocodeError::MissingPlace)
        ));
    }

    #[tokio::test]
    async fn test_nominatim_failures_fall_back() {
        let (endpoint, _request) = serve_once("500 Internal Server Error", "{}").await;
        let resolver = GeocodeResolver::from_config(&config_for(endpoint), false);
        assert_eq!(resolver.provider_name(), "Nominatim");
        assert_eq!(resolver.resolve(12.5, 99.25).await, "12.5000, 99.2500");

        let (endpoint, _request) = serve_once("200 OK", "not json").await;
        let resolver = GeocodeResolver::from_config(&config_for(endpoint), false);
        assert_eq!(resolver.resolve(12.5, 99.25).await, "12.5000, 99.2500");
    }

    #[tokio::test]
    async fn test_from_config_offline() {
        let resolver = GeocodeResolver::from_config(&Config::default().geocode, true);
        assert_eq!(resolver.provider_name(), "Offline");
        assert_eq!(resolver.resolve(5.0, 6.0).await, "5.0000, 6.0000");
    }
}
