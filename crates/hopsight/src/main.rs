//! Hopsight - a network-path diagnostic server.
#![warn(clippy::all, clippy::pedantic, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![deny(unsafe_code)]

mod server;
mod trace;

use clap::Parser;
use hopsight_core::{Builder, Pipeline};
use hopsight_intel::{CredentialPool, MaxMind, MaxMindCredential, Pangea};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Network-path diagnostic server.
#[derive(Parser, Debug)]
#[command(name = "hopsight")]
#[command(version)]
#[command(about = "Traces the route to a host and enriches every hop")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "HOPSIGHT_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Public address of this instance, reported as the origin hop.
    #[arg(long, env = "DEVICE_IP")]
    device_ip: Ipv4Addr,

    /// MaxMind account ids, comma separated.
    #[arg(long, env = "MAXMIND_ACCOUNT_NO", value_delimiter = ',')]
    maxmind_account_no: Vec<String>,

    /// MaxMind license keys, one per account id.
    #[arg(long, env = "MAXMIND_TOKEN", value_delimiter = ',')]
    maxmind_token: Vec<String>,

    /// Pangea IP Intel tokens, comma separated.
    #[arg(long, env = "PANGEA_TOKEN", value_delimiter = ',')]
    pangea_token: Vec<String>,

    /// Per-call provider timeout in milliseconds.
    #[arg(long, env = "PROVIDER_TIMEOUT_MS", default_value_t = 3000)]
    provider_timeout_ms: u64,

    /// Log filter, i.e. `hopsight=debug,hopsight_core=trace`.
    #[arg(long, env = "HOPSIGHT_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log.as_str())
        .init();
    let pipeline = build_pipeline(&args)?;
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!("listening on {}", args.addr);
    axum::serve(listener, server::router(Arc::new(pipeline))).await?;
    Ok(())
}

/// Wire the pipeline from the configured providers.
///
/// MaxMind ranks ahead of Pangea for geolocation; Pangea is the sole
/// reputation provider.
fn build_pipeline(args: &Args) -> anyhow::Result<Pipeline> {
    let mut builder = Builder::new(args.device_ip, Arc::new(trace::SystemDiscovery))
        .provider_timeout(Duration::from_millis(args.provider_timeout_ms));
    if args.maxmind_account_no.len() != args.maxmind_token.len() {
        anyhow::bail!("maxmind account ids and license keys must pair up");
    }
    let maxmind_credentials = args
        .maxmind_account_no
        .iter()
        .zip(&args.maxmind_token)
        .map(|(account_id, license_key)| MaxMindCredential {
            account_id: account_id.clone(),
            license_key: license_key.clone(),
        })
        .collect();
    if let Some(pool) = CredentialPool::from_vec(maxmind_credentials) {
        builder = builder.geolocation_provider(Arc::new(MaxMind::new(pool)));
    } else {
        warn!("no maxmind credentials configured");
    }
    if let Some(tokens) = CredentialPool::from_vec(args.pangea_token.clone()) {
        let pangea = Arc::new(Pangea::new(tokens));
        builder = builder
            .geolocation_provider(pangea.clone())
            .reputation_provider(pangea);
    } else {
        warn!("no pangea tokens configured");
    }
    Ok(builder.build()?)
}
