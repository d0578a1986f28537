use crate::classify::{classify, AddressClass};
use crate::config::{defaults, PipelineConfig};
use crate::consumer::{Consumer, Discovery, DiscoverySource, RawHop};
use crate::error::{Error, Result};
use crate::geolocate::GeolocationResolver;
use crate::report::{EnrichedHop, TraceReport};
use crate::reputation::ReputationResolver;
use futures::future::join_all;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// The hop enrichment pipeline.
///
/// Owns all ordering, concurrency and failure policy: discovery events
/// are folded into a raw hop sequence, every hop is classified, public
/// hops are enriched concurrently and the report is assembled in
/// positional order. Each invocation is independent; nothing is cached
/// across runs.
pub struct Pipeline {
    config: PipelineConfig,
    discovery: Arc<dyn DiscoverySource>,
    geolocation: GeolocationResolver,
    reputation: Option<ReputationResolver>,
}

/// A raw hop with its class and, for public hops, the parsed address.
struct ClassifiedHop {
    hop: RawHop,
    class: AddressClass,
    public_addr: Option<Ipv4Addr>,
}

impl Pipeline {
    pub(crate) fn new(
        config: PipelineConfig,
        discovery: Arc<dyn DiscoverySource>,
        geolocation: GeolocationResolver,
        reputation: Option<ReputationResolver>,
    ) -> Self {
        Self {
            config,
            discovery,
            geolocation,
            reputation,
        }
    }

    /// Produce the diagnostic report for `host`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ProbeFailed`] if the discovery stream itself
    /// errors and with [`Error::InvalidAddress`] if the prober reports a
    /// destination or hop address that is not a dotted-quad. Individual
    /// enrichment failures degrade the affected hop's fields to absent
    /// and never abort the trace.
    #[instrument(skip(self), level = "debug")]
    pub async fn run(&self, host: &str) -> Result<TraceReport> {
        let started = Instant::now();
        let discovery = self.discover(host).await?;
        let destination = discovery.destination.clone();
        let close_code = discovery.close_code;
        let classified = self.assemble(discovery)?;
        let hops = join_all(classified.into_iter().map(|hop| self.enrich(hop))).await;
        let execution_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "traced {} hops to {destination} in {execution_time_ms}ms",
            hops.len()
        );
        Ok(TraceReport {
            destination,
            hops,
            close_code,
            execution_time_ms,
        })
    }

    /// Drive the discovery source and fold its events into a
    /// [`Discovery`].
    async fn discover(&self, host: &str) -> Result<Discovery> {
        let mut events = self.discovery.start(host).await?;
        let mut consumer = Consumer::start();
        while let Some(event) = events.recv().await {
            consumer.on_event(event);
            if consumer.is_terminal() {
                break;
            }
        }
        consumer.finish()
    }

    /// Prepend the synthetic origin, pin the final hop to the resolved
    /// destination and classify every hop.
    ///
    /// The prober may report the true final hop as unroutable even on
    /// success, so the last hop's address is overwritten with the
    /// destination and its class forced to public, as is the origin's.
    fn assemble(&self, discovery: Discovery) -> Result<Vec<ClassifiedHop>> {
        let Discovery {
            destination, hops, ..
        } = discovery;
        let destination_addr = Ipv4Addr::from_str(&destination)
            .map_err(|_| Error::InvalidAddress(destination.clone()))?;
        let mut raw = Vec::with_capacity(hops.len() + 1);
        raw.push(RawHop {
            index: 0,
            address: self.config.local_addr.to_string(),
            round_trip_time: Some(String::from(defaults::ORIGIN_RTT)),
        });
        raw.extend(hops);
        if let Some(last) = raw.last_mut() {
            last.address.clone_from(&destination);
        }
        let last_index = raw.len() - 1;
        raw.into_iter()
            .enumerate()
            .map(|(i, hop)| {
                if i == last_index {
                    Ok(ClassifiedHop {
                        hop,
                        class: AddressClass::Public,
                        public_addr: Some(destination_addr),
                    })
                } else if i == 0 {
                    Ok(ClassifiedHop {
                        hop,
                        class: AddressClass::Public,
                        public_addr: Some(self.config.local_addr),
                    })
                } else {
                    let class = classify(&hop.address)?;
                    let public_addr = if class.is_public() {
                        Ipv4Addr::from_str(&hop.address).ok()
                    } else {
                        None
                    };
                    Ok(ClassifiedHop {
                        hop,
                        class,
                        public_addr,
                    })
                }
            })
            .collect()
    }

    /// Enrich a single hop.
    ///
    /// Geolocation and reputation run concurrently with each other and
    /// independently of every other hop's enrichment.
    async fn enrich(&self, classified: ClassifiedHop) -> EnrichedHop {
        let ClassifiedHop {
            hop,
            class,
            public_addr,
        } = classified;
        let Some(addr) = public_addr else {
            return EnrichedHop::unenriched(hop, class);
        };
        let (geolocation, reputation) = tokio::join!(self.geolocation.resolve(addr), async {
            match &self.reputation {
                Some(resolver) => resolver.resolve(addr).await,
                None => None,
            }
        });
        EnrichedHop {
            index: hop.index,
            address: hop.address,
            round_trip_time: hop.round_trip_time,
            class,
            geolocation: Some(geolocation),
            reputation,
        }
    }
}
