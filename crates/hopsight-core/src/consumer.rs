use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A single reported routing hop.
///
/// Produced by the discovery source, immutable once created. `index` is
/// the 1-based position as reported by the prober, with 0 reserved for
/// the synthetic origin hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHop {
    pub index: u16,
    pub address: String,
    pub round_trip_time: Option<String>,
}

/// The terminal status code reported by the prober.
///
/// A non-zero code is recorded in the report, never treated as fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CloseCode(pub i32);

/// An event emitted by the raw hop-discovery stream.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// The resolved target address.
    Destination(String),
    /// One reported routing hop.
    Hop(RawHop),
    /// The stream completed with the given status code.
    Close(CloseCode),
    /// The stream failed.
    Error(String),
}

/// The outcome of a completed discovery run.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// The resolved target address.
    pub destination: String,
    /// The reported hops, in arrival order.
    pub hops: Vec<RawHop>,
    /// The terminal status code.
    pub close_code: CloseCode,
}

/// The source of discovery events.
///
/// This is the external collaborator boundary: implementations drive a
/// prober process or stream and emit exactly one
/// [`DiscoveryEvent::Destination`] and one terminal event
/// ([`DiscoveryEvent::Close`] xor [`DiscoveryEvent::Error`]) per
/// invocation.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Start discovering the path to `host` and return the event stream.
    async fn start(&self, host: &str) -> Result<mpsc::Receiver<DiscoveryEvent>>;
}

#[derive(Debug)]
enum State {
    AwaitingDestination,
    CollectingHops {
        destination: String,
        hops: Vec<RawHop>,
    },
    Closed(Discovery),
    Errored(String),
}

/// Folds the discovery event stream into a [`Discovery`].
///
/// The consumer is an explicit state machine: `AwaitingDestination` →
/// `CollectingHops` → `Closed` | `Errored`. Hop events are accepted in
/// `CollectingHops` only and any event arriving after a terminal state is
/// ignored. The consumer is idle until constructed with
/// [`Consumer::start`].
#[derive(Debug)]
pub struct Consumer {
    state: State,
}

impl Consumer {
    /// Start consuming a fresh event stream.
    #[must_use]
    pub const fn start() -> Self {
        Self {
            state: State::AwaitingDestination,
        }
    }

    /// Whether a terminal event has been consumed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.state, State::Closed(_) | State::Errored(_))
    }

    /// Consume the next discovery event.
    pub fn on_event(&mut self, event: DiscoveryEvent) {
        match (&mut self.state, event) {
            (State::AwaitingDestination, DiscoveryEvent::Destination(destination)) => {
                debug!("destination resolved to {destination}");
                self.state = State::CollectingHops {
                    destination,
                    hops: Vec::new(),
                };
            }
            (State::AwaitingDestination, DiscoveryEvent::Hop(hop)) => {
                warn!("ignoring hop {} before destination", hop.index);
            }
            (State::AwaitingDestination, DiscoveryEvent::Close(code)) => {
                self.state = State::Errored(format!(
                    "stream closed with code {} before destination",
                    code.0
                ));
            }
            (State::CollectingHops { hops, .. }, DiscoveryEvent::Hop(hop)) => {
                debug!("hop {}: {}", hop.index, hop.address);
                hops.push(hop);
            }
            (State::CollectingHops { .. }, DiscoveryEvent::Destination(destination)) => {
                warn!("ignoring duplicate destination {destination}");
            }
            (State::CollectingHops { destination, hops }, DiscoveryEvent::Close(code)) => {
                debug!("stream closed with code {}", code.0);
                let discovery = Discovery {
                    destination: std::mem::take(destination),
                    hops: std::mem::take(hops),
                    close_code: code,
                };
                self.state = State::Closed(discovery);
            }
            (
                State::AwaitingDestination | State::CollectingHops { .. },
                DiscoveryEvent::Error(reason),
            ) => {
                self.state = State::Errored(reason);
            }
            (State::Closed(_) | State::Errored(_), event) => {
                debug!("ignoring event after terminal state: {event:?}");
            }
        }
    }

    /// Finish consuming and return the discovery outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProbeFailed`] if the stream errored or ended
    /// without a terminal event.
    pub fn finish(self) -> Result<Discovery> {
        match self.state {
            State::Closed(discovery) => Ok(discovery),
            State::Errored(reason) => Err(Error::ProbeFailed(reason)),
            State::AwaitingDestination | State::CollectingHops { .. } => Err(Error::ProbeFailed(
                String::from("discovery stream ended without a terminal event"),
            )),
        }
    }
}
