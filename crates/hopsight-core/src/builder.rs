use crate::config::PipelineConfig;
use crate::consumer::DiscoverySource;
use crate::error::{Error, Result};
use crate::geolocate::{GeolocationProvider, GeolocationResolver};
use crate::pipeline::Pipeline;
use crate::reputation::{ReputationProvider, ReputationResolver};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// Build a hop enrichment pipeline.
///
/// Geolocation providers are ranked in the order they are added; at
/// least one is required. The reputation provider is optional as
/// reputation enrichment is purely additive.
///
/// # Examples
///
/// ```no_run
/// # use std::net::Ipv4Addr;
/// # use std::sync::Arc;
/// # use hopsight_core::{Builder, DiscoverySource, GeolocationProvider, ReputationProvider};
/// # fn build(
/// #     discovery: Arc<dyn DiscoverySource>,
/// #     primary: Arc<dyn GeolocationProvider>,
/// #     fallback: Arc<dyn GeolocationProvider>,
/// #     reputation: Arc<dyn ReputationProvider>,
/// # ) -> anyhow::Result<()> {
/// let pipeline = Builder::new(Ipv4Addr::new(203, 0, 113, 7), discovery)
///     .geolocation_provider(primary)
///     .geolocation_provider(fallback)
///     .reputation_provider(reputation)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct Builder {
    config: PipelineConfig,
    discovery: Arc<dyn DiscoverySource>,
    geolocation_providers: Vec<Arc<dyn GeolocationProvider>>,
    reputation_provider: Option<Arc<dyn ReputationProvider>>,
}

impl Builder {
    /// Create a builder for a pipeline probing from `local_addr`.
    #[must_use]
    pub fn new(local_addr: Ipv4Addr, discovery: Arc<dyn DiscoverySource>) -> Self {
        Self {
            config: PipelineConfig::new(local_addr),
            discovery,
            geolocation_providers: Vec::new(),
            reputation_provider: None,
        }
    }

    /// Add the next-ranked geolocation provider.
    #[must_use]
    pub fn geolocation_provider(mut self, provider: Arc<dyn GeolocationProvider>) -> Self {
        self.geolocation_providers.push(provider);
        self
    }

    /// Set the reputation provider.
    #[must_use]
    pub fn reputation_provider(mut self, provider: Arc<dyn ReputationProvider>) -> Self {
        self.reputation_provider = Some(provider);
        self
    }

    /// Set the per-call provider timeout.
    #[must_use]
    pub const fn provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.config.provider_timeout = provider_timeout;
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadConfig`] if no geolocation provider was added.
    pub fn build(self) -> Result<Pipeline> {
        if self.geolocation_providers.is_empty() {
            return Err(Error::BadConfig(String::from(
                "at least one geolocation provider is required",
            )));
        }
        let geolocation =
            GeolocationResolver::new(self.geolocation_providers, self.config.provider_timeout);
        let reputation = self
            .reputation_provider
            .map(|provider| ReputationResolver::new(provider, self.config.provider_timeout));
        Ok(Pipeline::new(
            self.config,
            self.discovery,
            geolocation,
            reputation,
        ))
    }
}
