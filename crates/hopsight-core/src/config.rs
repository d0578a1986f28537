use std::net::Ipv4Addr;
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `provider-timeout`.
    ///
    /// Bounds every individual geolocation/reputation provider call so a
    /// hung provider cannot stall report assembly.
    pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(3);

    /// The round trip time recorded for the synthetic origin hop.
    pub const ORIGIN_RTT: &str = "0 ms";
}

/// Pipeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// The address of the probing machine, used as the synthetic origin
    /// hop.
    pub local_addr: Ipv4Addr,
    /// The per-call timeout for provider lookups.
    pub provider_timeout: Duration,
}

impl PipelineConfig {
    #[must_use]
    pub const fn new(local_addr: Ipv4Addr) -> Self {
        Self {
            local_addr,
            provider_timeout: defaults::DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}
