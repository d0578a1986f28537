use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The approximate geographic location of a public address.
///
/// All fields are provider-dependent and optional. Place names are
/// uppercased at the provider boundary so downstream comparisons are
/// case-insensitive-safe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GeoLocation {
    /// Whether the location carries no data at all.
    ///
    /// A provider response with every field absent does not count as a
    /// successful geolocation.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.city.is_none()
            && self.postal_code.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }
}

/// The outcome of geolocation resolution for a single hop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeolocationOutcome {
    /// Exactly one provider produced a non-empty location.
    Geolocated(GeoLocation),
    /// Every configured provider failed or had no data.
    Ungeolocated,
}

/// A geolocation capability.
///
/// Implementations must not fail for ordinary "cannot geolocate"
/// responses: those are `Ok(None)`. Only transport-level and payload
/// decoding failures are errors, and the resolver recovers from both.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// The provider name used in logs.
    fn name(&self) -> &'static str;

    /// Look up the location of `addr`.
    async fn lookup(&self, addr: Ipv4Addr) -> Result<Option<GeoLocation>, ProviderError>;
}

/// Resolve the location of public addresses against a ranked provider
/// list.
///
/// Providers are tried in priority order and the first successful
/// non-empty result wins. Provider failures of any kind advance to the
/// next provider; if every provider fails the outcome is
/// [`GeolocationOutcome::Ungeolocated`], never an error.
pub struct GeolocationResolver {
    providers: Vec<Arc<dyn GeolocationProvider>>,
    call_timeout: Duration,
}

impl GeolocationResolver {
    /// Create a resolver over a ranked, non-empty provider list.
    ///
    /// Each provider call is bounded by `call_timeout` so a hung
    /// provider cannot stall report assembly.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn GeolocationProvider>>, call_timeout: Duration) -> Self {
        Self {
            providers,
            call_timeout,
        }
    }

    /// Resolve the location of `addr`.
    pub async fn resolve(&self, addr: Ipv4Addr) -> GeolocationOutcome {
        for provider in &self.providers {
            match tokio::time::timeout(self.call_timeout, provider.lookup(addr)).await {
                Ok(Ok(Some(location))) if !location.is_empty() => {
                    debug!("geolocated {addr} via {}", provider.name());
                    return GeolocationOutcome::Geolocated(location);
                }
                Ok(Ok(_)) => {
                    debug!("{} has no location for {addr}", provider.name());
                }
                Ok(Err(err)) => {
                    warn!("{} failed for {addr}: {err}", provider.name());
                }
                Err(_) => {
                    warn!("{} timed out for {addr}", provider.name());
                }
            }
        }
        GeolocationOutcome::Ungeolocated
    }
}
