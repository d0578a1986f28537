use crate::credentials::CredentialPool;
use async_trait::async_trait;
use hopsight_core::{GeoLocation, GeolocationProvider, ProviderError};
use reqwest::StatusCode;
use std::net::Ipv4Addr;
use tracing::debug;

/// The GeoLite web service host.
const DEFAULT_HOST: &str = "geolite.info";

/// A MaxMind web service credential.
#[derive(Debug, Clone)]
pub struct MaxMindCredential {
    pub account_id: String,
    pub license_key: String,
}

/// The MaxMind GeoLite city web service.
///
/// See <https://dev.maxmind.com/geoip/docs/web-services/requests>.
pub struct MaxMind {
    client: reqwest::Client,
    credentials: CredentialPool<MaxMindCredential>,
    host: String,
}

impl MaxMind {
    #[must_use]
    pub fn new(credentials: CredentialPool<MaxMindCredential>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            host: String::from(DEFAULT_HOST),
        }
    }

    /// Override the web service host, i.e. for the commercial `GeoIP2`
    /// endpoint.
    #[must_use]
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }
}

#[async_trait]
impl GeolocationProvider for MaxMind {
    fn name(&self) -> &'static str {
        "maxmind"
    }

    async fn lookup(&self, addr: Ipv4Addr) -> Result<Option<GeoLocation>, ProviderError> {
        let credential = self.credentials.pick();
        let url = format!("https://{}/geoip/v2.1/city/{addr}", self.host);
        let response = self
            .client
            .get(&url)
            .basic_auth(&credential.account_id, Some(&credential.license_key))
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        match response.status() {
            StatusCode::OK => {}
            // the address is not in the database
            StatusCode::NOT_FOUND => return Ok(None),
            status => return Err(ProviderError::Status(status.as_u16())),
        }
        let city: response::City = response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        debug!("GeoLite city record for {addr}: {city:?}");
        Ok(geolocation_from(city))
    }
}

/// Convert a city record into a `GeoLocation`.
///
/// A record without coordinates counts as "cannot geolocate", matching
/// the web service's notion of an unlocatable address.
fn geolocation_from(city: response::City) -> Option<GeoLocation> {
    let location = city.location?;
    Some(GeoLocation {
        country: city.country.as_ref().and_then(response::Named::english_upper),
        city: city.city.as_ref().and_then(response::Named::english_upper),
        postal_code: city.postal.and_then(|postal| postal.code),
        latitude: location.latitude,
        longitude: location.longitude,
    })
}

mod response {
    use serde::Deserialize;
    use std::collections::HashMap;

    /// The subset of the GeoLite city response the pipeline uses.
    #[derive(Debug, Deserialize)]
    pub(super) struct City {
        pub(super) country: Option<Named>,
        pub(super) city: Option<Named>,
        pub(super) postal: Option<Postal>,
        pub(super) location: Option<Location>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Named {
        pub(super) names: HashMap<String, String>,
    }

    impl Named {
        /// The english place name, uppercased for case-insensitive
        /// downstream comparison.
        pub(super) fn english_upper(&self) -> Option<String> {
            self.names.get("en").map(|name| name.to_uppercase())
        }
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Postal {
        pub(super) code: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Location {
        pub(super) latitude: Option<f64>,
        pub(super) longitude: Option<f64>,
    }
}
