//! Geolocation and reputation provider clients for Hopsight.
//!
//! Concrete implementations of the `hopsight-core` provider
//! capabilities: the MaxMind GeoLite web service and the Pangea IP
//! Intel service, plus the credential pool used to spread rate-limited
//! quota across equivalent API keys.
#![warn(clippy::all, clippy::pedantic, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![deny(unsafe_code)]

mod credentials;
mod maxmind;
mod pangea;

pub use credentials::CredentialPool;
pub use maxmind::{MaxMind, MaxMindCredential};
pub use pangea::Pangea;
