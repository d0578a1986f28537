use async_trait::async_trait;
use hopsight_core::{
    AddressClass, Builder, CloseCode, DiscoveryEvent, DiscoverySource, Error, GeoLocation,
    GeolocationOutcome, GeolocationProvider, ProviderError, RawHop, ReputationProvider,
    ReputationVerdict, Result,
};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const LOCAL_ADDR: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);
const DESTINATION: &str = "93.184.216.34";

/// Replays a canned event sequence as a discovery stream.
struct StubDiscovery {
    events: Vec<DiscoveryEvent>,
}

impl StubDiscovery {
    fn new(events: Vec<DiscoveryEvent>) -> Arc<Self> {
        Arc::new(Self { events })
    }

    /// A three hop stream where hop 2 did not respond.
    fn three_hops() -> Arc<Self> {
        Self::new(vec![
            DiscoveryEvent::Destination(String::from(DESTINATION)),
            DiscoveryEvent::Hop(hop(1, "8.8.8.8")),
            DiscoveryEvent::Hop(hop(2, "*")),
            DiscoveryEvent::Hop(hop(3, "*")),
            DiscoveryEvent::Close(CloseCode(0)),
        ])
    }
}

#[async_trait]
impl DiscoverySource for StubDiscovery {
    async fn start(&self, _host: &str) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        let (tx, rx) = mpsc::channel(16);
        let events = self.events.clone();
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// Counts calls and answers with a fixed location after a fixed delay.
struct StubGeolocation {
    location: Option<GeoLocation>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubGeolocation {
    fn found() -> Arc<Self> {
        Arc::new(Self {
            location: Some(location()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn not_found() -> Arc<Self> {
        Arc::new(Self {
            location: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            location: Some(location()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl GeolocationProvider for StubGeolocation {
    fn name(&self) -> &'static str {
        "stub-geo"
    }

    async fn lookup(&self, _addr: Ipv4Addr) -> std::result::Result<Option<GeoLocation>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.location.clone())
    }
}

/// Records the addresses it was queried for.
struct StubReputation {
    calls: AtomicUsize,
    delay: Duration,
}

impl StubReputation {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }
}

#[async_trait]
impl ReputationProvider for StubReputation {
    fn name(&self) -> &'static str {
        "stub-rep"
    }

    async fn lookup(
        &self,
        addr: Ipv4Addr,
    ) -> std::result::Result<Option<ReputationVerdict>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Some(ReputationVerdict {
            score: Some(0),
            verdict: Some(String::from("benign")),
            category: None,
            summary: Some(format!("no threat intel for {addr}")),
        }))
    }
}

fn hop(index: u16, address: &str) -> RawHop {
    RawHop {
        index,
        address: String::from(address),
        round_trip_time: Some(format!("{index}.5 ms")),
    }
}

fn location() -> GeoLocation {
    GeoLocation {
        country: Some(String::from("UNITED STATES")),
        city: Some(String::from("LOS ANGELES")),
        postal_code: Some(String::from("90009")),
        latitude: Some(34.05),
        longitude: Some(-118.24),
    }
}

#[tokio::test]
async fn test_three_hop_trace_with_unroutable_hop() -> anyhow::Result<()> {
    let geolocation = StubGeolocation::found();
    let reputation = StubReputation::new();
    let pipeline = Builder::new(LOCAL_ADDR, StubDiscovery::three_hops())
        .geolocation_provider(geolocation.clone())
        .reputation_provider(reputation.clone())
        .build()?;

    let report = pipeline.run("example.com").await?;

    assert_eq!(DESTINATION, report.destination);
    assert_eq!(CloseCode(0), report.close_code);
    assert_eq!(4, report.hops.len());

    let origin = &report.hops[0];
    assert_eq!(0, origin.index);
    assert_eq!(LOCAL_ADDR.to_string(), origin.address);
    assert_eq!(AddressClass::Public, origin.class);
    assert_eq!(Some("0 ms"), origin.round_trip_time.as_deref());

    let unroutable = &report.hops[2];
    assert_eq!(2, unroutable.index);
    assert_eq!(AddressClass::Unroutable, unroutable.class);
    assert_eq!(None, unroutable.geolocation);
    assert_eq!(None, unroutable.reputation);

    let last = &report.hops[3];
    assert_eq!(DESTINATION, last.address);
    assert_eq!(AddressClass::Public, last.class);
    assert_eq!(
        Some(&GeolocationOutcome::Geolocated(location())),
        last.geolocation.as_ref()
    );
    assert!(last.reputation.is_some());

    // origin, hop 1 and the destination are public, hops 2 and 3 are not
    assert_eq!(3, geolocation.calls.load(Ordering::SeqCst));
    assert_eq!(3, reputation.calls.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test]
async fn test_private_hops_pass_through_unenriched() -> anyhow::Result<()> {
    let geolocation = StubGeolocation::found();
    let discovery = StubDiscovery::new(vec![
        DiscoveryEvent::Destination(String::from(DESTINATION)),
        DiscoveryEvent::Hop(hop(1, "192.168.1.1")),
        DiscoveryEvent::Hop(hop(2, "10.11.12.13")),
        DiscoveryEvent::Hop(hop(3, "142.250.80.46")),
        DiscoveryEvent::Close(CloseCode(0)),
    ]);
    let pipeline = Builder::new(LOCAL_ADDR, discovery)
        .geolocation_provider(geolocation.clone())
        .build()?;

    let report = pipeline.run("example.com").await?;

    assert_eq!(AddressClass::Private, report.hops[1].class);
    assert_eq!(None, report.hops[1].geolocation);
    assert_eq!(AddressClass::Private, report.hops[2].class);
    assert_eq!(None, report.hops[2].geolocation);
    // origin, hop 3 and the destination
    assert_eq!(3, geolocation.calls.load(Ordering::SeqCst));
    // no reputation provider configured, still no failure
    assert!(report.hops.iter().all(|hop| hop.reputation.is_none()));
    Ok(())
}

#[tokio::test]
async fn test_all_geolocation_providers_not_found() -> anyhow::Result<()> {
    let pipeline = Builder::new(LOCAL_ADDR, StubDiscovery::three_hops())
        .geolocation_provider(StubGeolocation::not_found())
        .geolocation_provider(StubGeolocation::not_found())
        .build()?;

    let report = pipeline.run("example.com").await?;

    assert_eq!(4, report.hops.len());
    for public_hop in report.hops.iter().filter(|hop| hop.class.is_public()) {
        assert_eq!(
            Some(&GeolocationOutcome::Ungeolocated),
            public_hop.geolocation.as_ref()
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_ranked_fallback_to_second_provider() -> anyhow::Result<()> {
    let primary = StubGeolocation::not_found();
    let fallback = StubGeolocation::found();
    let pipeline = Builder::new(LOCAL_ADDR, StubDiscovery::three_hops())
        .geolocation_provider(primary.clone())
        .geolocation_provider(fallback.clone())
        .build()?;

    let report = pipeline.run("example.com").await?;

    assert_eq!(
        Some(&GeolocationOutcome::Geolocated(location())),
        report.hops[0].geolocation.as_ref()
    );
    assert_eq!(3, primary.calls.load(Ordering::SeqCst));
    assert_eq!(3, fallback.calls.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test]
async fn test_error_event_fails_with_probe_failed() -> anyhow::Result<()> {
    let discovery = StubDiscovery::new(vec![
        DiscoveryEvent::Destination(String::from(DESTINATION)),
        DiscoveryEvent::Hop(hop(1, "8.8.8.8")),
        DiscoveryEvent::Error(String::from("prober process failed")),
    ]);
    let pipeline = Builder::new(LOCAL_ADDR, discovery)
        .geolocation_provider(StubGeolocation::found())
        .build()?;

    let result = pipeline.run("example.com").await;

    assert!(matches!(
        result,
        Err(Error::ProbeFailed(reason)) if reason == "prober process failed"
    ));
    Ok(())
}

#[tokio::test]
async fn test_unparsable_destination_fails_with_invalid_address() -> anyhow::Result<()> {
    let discovery = StubDiscovery::new(vec![
        DiscoveryEvent::Destination(String::from("not-a-dotted-quad")),
        DiscoveryEvent::Hop(hop(1, "8.8.8.8")),
        DiscoveryEvent::Close(CloseCode(0)),
    ]);
    let pipeline = Builder::new(LOCAL_ADDR, discovery)
        .geolocation_provider(StubGeolocation::found())
        .build()?;

    let result = pipeline.run("example.com").await;

    assert!(matches!(
        result,
        Err(Error::InvalidAddress(addr)) if addr == "not-a-dotted-quad"
    ));
    Ok(())
}

#[tokio::test]
async fn test_enrichment_is_parallel_across_hops() -> anyhow::Result<()> {
    const DELAY: Duration = Duration::from_millis(150);
    let discovery = StubDiscovery::new(vec![
        DiscoveryEvent::Destination(String::from(DESTINATION)),
        DiscoveryEvent::Hop(hop(1, "8.8.8.8")),
        DiscoveryEvent::Hop(hop(2, "8.8.4.4")),
        DiscoveryEvent::Hop(hop(3, "1.1.1.1")),
        DiscoveryEvent::Hop(hop(4, "9.9.9.9")),
        DiscoveryEvent::Close(CloseCode(0)),
    ]);
    let pipeline = Builder::new(LOCAL_ADDR, discovery)
        .geolocation_provider(StubGeolocation::slow(DELAY))
        .reputation_provider(StubReputation::slow(DELAY))
        .build()?;

    let started = Instant::now();
    let report = pipeline.run("example.com").await?;
    let elapsed = started.elapsed();

    // 5 public hops each waiting 150ms for geolocation and reputation:
    // sequential enrichment would take >= 750ms, parallel roughly one
    // hop's worth.
    assert_eq!(5, report.hops.len());
    assert!(elapsed >= DELAY);
    assert!(
        elapsed < DELAY * 3,
        "enrichment took {elapsed:?}, expected about {DELAY:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_reruns_are_deterministic() -> anyhow::Result<()> {
    let pipeline = Builder::new(LOCAL_ADDR, StubDiscovery::three_hops())
        .geolocation_provider(StubGeolocation::found())
        .reputation_provider(StubReputation::new())
        .build()?;

    let first = pipeline.run("example.com").await?;
    let second = pipeline.run("example.com").await?;

    assert_eq!(first.destination, second.destination);
    assert_eq!(first.close_code, second.close_code);
    assert_eq!(first.hops, second.hops);
    Ok(())
}

#[tokio::test]
async fn test_non_zero_close_code_is_recorded() -> anyhow::Result<()> {
    let discovery = StubDiscovery::new(vec![
        DiscoveryEvent::Destination(String::from(DESTINATION)),
        DiscoveryEvent::Hop(hop(1, "8.8.8.8")),
        DiscoveryEvent::Close(CloseCode(2)),
    ]);
    let pipeline = Builder::new(LOCAL_ADDR, discovery)
        .geolocation_provider(StubGeolocation::found())
        .build()?;

    let report = pipeline.run("example.com").await?;

    assert_eq!(CloseCode(2), report.close_code);
    Ok(())
}
