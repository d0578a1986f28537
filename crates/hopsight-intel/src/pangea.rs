use crate::credentials::CredentialPool;
use async_trait::async_trait;
use hopsight_core::{
    GeoLocation, GeolocationProvider, ProviderError, ReputationProvider, ReputationVerdict,
};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::net::Ipv4Addr;
use tracing::debug;

/// The IP Intel service base URL.
const DEFAULT_BASE_URL: &str = "https://ip-intel.aws.us.pangea.cloud";

/// The upstream source consulted by the geolocate endpoint.
const GEOLOCATE_UPSTREAM: &str = "digitalelement";

/// The upstream source consulted by the reputation endpoint.
const REPUTATION_UPSTREAM: &str = "crowdstrike";

/// The Pangea IP Intel service.
///
/// A single client serves as both the fallback geolocation provider and
/// the reputation provider; the two endpoints share authentication and
/// the request envelope.
///
/// See <https://pangea.cloud/docs/api/ip-intel>.
pub struct Pangea {
    client: reqwest::Client,
    tokens: CredentialPool<String>,
    base_url: String,
}

impl Pangea {
    #[must_use]
    pub fn new(tokens: CredentialPool<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }

    /// Override the service base URL, i.e. for another deployment
    /// region.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        upstream: &str,
        addr: Ipv4Addr,
    ) -> Result<response::Envelope<T>, ProviderError> {
        let token = self.tokens.pick();
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "provider": upstream,
                "ip": addr.to_string(),
            }))
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl GeolocationProvider for Pangea {
    fn name(&self) -> &'static str {
        "pangea"
    }

    async fn lookup(&self, addr: Ipv4Addr) -> Result<Option<GeoLocation>, ProviderError> {
        let envelope: response::Envelope<response::GeolocateData> =
            self.post("/v1/geolocate", GEOLOCATE_UPSTREAM, addr).await?;
        debug!("IP Intel geolocate for {addr}: {}", envelope.status);
        if !envelope.is_success() {
            return Ok(None);
        }
        Ok(envelope
            .result
            .map(|result| geolocation_from(result.data))
            .filter(|location| !location.is_empty()))
    }
}

#[async_trait]
impl ReputationProvider for Pangea {
    fn name(&self) -> &'static str {
        "pangea"
    }

    async fn lookup(&self, addr: Ipv4Addr) -> Result<Option<ReputationVerdict>, ProviderError> {
        let envelope: response::Envelope<response::ReputationData> = self
            .post("/v1/reputation", REPUTATION_UPSTREAM, addr)
            .await?;
        debug!("IP Intel reputation for {addr}: {}", envelope.status);
        if !envelope.is_success() {
            return Ok(None);
        }
        let summary = envelope.summary;
        Ok(envelope
            .result
            .map(|result| verdict_from(result.data, summary)))
    }
}

fn geolocation_from(data: response::GeolocateData) -> GeoLocation {
    GeoLocation {
        country: data.country.map(|country| country.to_uppercase()),
        city: data.city.map(|city| city.to_uppercase()),
        postal_code: data.postal_code,
        latitude: data.latitude,
        longitude: data.longitude,
    }
}

fn verdict_from(data: response::ReputationData, summary: Option<String>) -> ReputationVerdict {
    ReputationVerdict {
        score: data.score,
        verdict: data.verdict,
        category: data
            .category
            .filter(|categories| !categories.is_empty())
            .map(|categories| categories.iter().join(", ")),
        summary,
    }
}

mod response {
    use serde::Deserialize;

    /// The IP Intel response envelope.
    #[derive(Debug, Deserialize)]
    pub(super) struct Envelope<T> {
        pub(super) status: String,
        pub(super) summary: Option<String>,
        pub(super) result: Option<EnvelopeResult<T>>,
    }

    impl<T> Envelope<T> {
        pub(super) fn is_success(&self) -> bool {
            self.status.eq_ignore_ascii_case("success")
        }
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct EnvelopeResult<T> {
        pub(super) data: T,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct GeolocateData {
        pub(super) country: Option<String>,
        pub(super) city: Option<String>,
        pub(super) postal_code: Option<String>,
        pub(super) latitude: Option<f64>,
        pub(super) longitude: Option<f64>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ReputationData {
        pub(super) score: Option<i64>,
        pub(super) verdict: Option<String>,
        pub(super) category: Option<Vec<String>>,
    }
}
