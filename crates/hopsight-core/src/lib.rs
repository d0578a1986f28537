//! Hopsight - a hop enrichment pipeline for network-path diagnostics.
//!
//! This crate turns a stream of raw hop-discovery events into an ordered,
//! enriched [`TraceReport`]: each discovered hop is classified as
//! unroutable, private or public, and every public hop is annotated with
//! an approximate geographic location and a threat reputation verdict.
//!
//! The crate owns all ordering, concurrency and failure policy but none
//! of the outward-facing plumbing: hop discovery is consumed through the
//! [`DiscoverySource`] capability and geolocation/reputation data through
//! the [`GeolocationProvider`] and [`ReputationProvider`] capabilities.
//!
//! # Example
//!
//! ```no_run
//! # use std::net::Ipv4Addr;
//! # use std::sync::Arc;
//! # use hopsight_core::{Builder, DiscoverySource, GeolocationProvider};
//! # async fn run(
//! #     discovery: Arc<dyn DiscoverySource>,
//! #     provider: Arc<dyn GeolocationProvider>,
//! # ) -> anyhow::Result<()> {
//! let pipeline = Builder::new(Ipv4Addr::new(203, 0, 113, 7), discovery)
//!     .geolocation_provider(provider)
//!     .build()?;
//! let report = pipeline.run("example.com").await?;
//! println!("{} hops to {}", report.hops.len(), report.destination);
//! # Ok(())
//! # }
//! ```
#![warn(clippy::all, clippy::pedantic, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![deny(unsafe_code)]

mod builder;
mod classify;
mod config;
mod consumer;
mod error;
mod geolocate;
mod pipeline;
mod report;
mod reputation;

pub use builder::Builder;
pub use classify::{classify, AddressClass};
pub use config::{defaults, PipelineConfig};
pub use consumer::{CloseCode, Consumer, Discovery, DiscoveryEvent, DiscoverySource, RawHop};
pub use error::{Error, ProviderError, Result};
pub use geolocate::{GeoLocation, GeolocationOutcome, GeolocationProvider, GeolocationResolver};
pub use pipeline::Pipeline;
pub use report::{EnrichedHop, TraceReport};
pub use reputation::{ReputationProvider, ReputationResolver, ReputationVerdict};
