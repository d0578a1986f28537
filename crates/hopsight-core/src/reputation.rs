use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The threat reputation verdict for a public address.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationVerdict {
    /// The numeric threat score.
    pub score: Option<i64>,
    /// The categorical verdict label, i.e. `malicious` or `benign`.
    pub verdict: Option<String>,
    /// The threat category.
    pub category: Option<String>,
    /// A free text summary of the verdict.
    pub summary: Option<String>,
}

/// A threat reputation capability.
///
/// Same contract as [`crate::GeolocationProvider`]: `Ok(None)` for
/// ordinary "no data" responses, errors only for transport and payload
/// decoding failures.
#[async_trait]
pub trait ReputationProvider: Send + Sync {
    /// The provider name used in logs.
    fn name(&self) -> &'static str;

    /// Look up the reputation of `addr`.
    async fn lookup(&self, addr: Ipv4Addr) -> Result<Option<ReputationVerdict>, ProviderError>;
}

/// Resolve the threat reputation of public addresses.
///
/// Reputation enrichment is best-effort and purely additive: any
/// provider failure degrades to `None` and never aborts the trace or
/// alters classification and geolocation outcomes.
pub struct ReputationResolver {
    provider: Arc<dyn ReputationProvider>,
    call_timeout: Duration,
}

impl ReputationResolver {
    /// Create a resolver over a single upstream provider.
    #[must_use]
    pub fn new(provider: Arc<dyn ReputationProvider>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// Resolve the reputation of `addr`.
    pub async fn resolve(&self, addr: Ipv4Addr) -> Option<ReputationVerdict> {
        match tokio::time::timeout(self.call_timeout, self.provider.lookup(addr)).await {
            Ok(Ok(Some(verdict))) => {
                debug!("reputation for {addr} via {}", self.provider.name());
                Some(verdict)
            }
            Ok(Ok(None)) => {
                debug!("{} has no reputation for {addr}", self.provider.name());
                None
            }
            Ok(Err(err)) => {
                warn!("{} failed for {addr}: {err}", self.provider.name());
                None
            }
            Err(_) => {
                warn!("{} timed out for {addr}", self.provider.name());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    struct StubProvider {
        result: Result<Option<ReputationVerdict>, ProviderError>,
    }

    #[async_trait]
    impl ReputationProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn lookup(
            &self,
            _addr: Ipv4Addr,
        ) -> Result<Option<ReputationVerdict>, ProviderError> {
            match &self.result {
                Ok(verdict) => Ok(verdict.clone()),
                Err(_) => Err(ProviderError::Status(503)),
            }
        }
    }

    fn verdict() -> ReputationVerdict {
        ReputationVerdict {
            score: Some(100),
            verdict: Some(String::from("malicious")),
            category: Some(String::from("proxy")),
            summary: Some(String::from("IP was found to be malicious")),
        }
    }

    fn addr() -> Ipv4Addr {
        Ipv4Addr::new(93, 184, 216, 34)
    }

    #[tokio::test]
    async fn test_resolve_verdict() {
        let provider = Arc::new(StubProvider {
            result: Ok(Some(verdict())),
        });
        let resolver = ReputationResolver::new(provider, TIMEOUT);
        assert_eq!(Some(verdict()), resolver.resolve(addr()).await);
    }

    #[tokio::test]
    async fn test_no_data_resolves_to_none() {
        let provider = Arc::new(StubProvider { result: Ok(None) });
        let resolver = ReputationResolver::new(provider, TIMEOUT);
        assert_eq!(None, resolver.resolve(addr()).await);
    }

    #[tokio::test]
    async fn test_provider_failure_resolves_to_none() {
        let provider = Arc::new(StubProvider {
            result: Err(ProviderError::Status(503)),
        });
        let resolver = ReputationResolver::new(provider, TIMEOUT);
        assert_eq!(None, resolver.resolve(addr()).await);
    }

    struct HungProvider;

    #[async_trait]
    impl ReputationProvider for HungProvider {
        fn name(&self) -> &'static str {
            "hung"
        }

        async fn lookup(
            &self,
            _addr: Ipv4Addr,
        ) -> Result<Option<ReputationVerdict>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_hung_provider_resolves_to_none() {
        let resolver = ReputationResolver::new(Arc::new(HungProvider), TIMEOUT);
        assert_eq!(None, resolver.resolve(addr()).await);
    }
}
