//! Hop discovery via the system `traceroute` binary.

use async_trait::async_trait;
use hopsight_core::{CloseCode, DiscoveryEvent, DiscoverySource, Error, RawHop, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A [`DiscoverySource`] that spawns the system `traceroute` binary and
/// adapts its numeric output into discovery events.
///
/// The prober is started with `-n` (no reverse DNS) and a single query
/// per hop. It is killed if the event receiver is dropped, so a
/// cancelled request abandons the probe rather than leaking it.
pub(crate) struct SystemDiscovery;

#[async_trait]
impl DiscoverySource for SystemDiscovery {
    async fn start(&self, host: &str) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        let mut child = Command::new("traceroute")
            .args(["-n", "-q", "1", host])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| Error::ProbeFailed(format!("failed to spawn traceroute: {err}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ProbeFailed(String::from("traceroute stdout unavailable")))?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut destination_seen = false;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        debug!("traceroute: {line}");
                        let event = if destination_seen {
                            parse_hop(&line).map(DiscoveryEvent::Hop)
                        } else {
                            parse_destination(&line).map(|destination| {
                                destination_seen = true;
                                DiscoveryEvent::Destination(destination)
                            })
                        };
                        if let Some(event) = event {
                            if tx.send(event).await.is_err() {
                                // receiver dropped, the request was cancelled
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        let event = match child.wait().await {
                            Ok(status) => {
                                DiscoveryEvent::Close(CloseCode(status.code().unwrap_or(-1)))
                            }
                            Err(err) => {
                                DiscoveryEvent::Error(format!("traceroute wait failed: {err}"))
                            }
                        };
                        let _ = tx.send(event).await;
                        break;
                    }
                    Err(err) => {
                        let _ = tx
                            .send(DiscoveryEvent::Error(format!(
                                "traceroute read failed: {err}"
                            )))
                            .await;
                        break;
                    }
                }
            }
        });
        Ok(rx)
    }
}

/// Extract the resolved destination from the traceroute header line,
/// i.e. `traceroute to example.com (93.184.216.34), 64 hops max`.
fn parse_destination(line: &str) -> Option<String> {
    if !line.starts_with("traceroute") {
        return None;
    }
    let start = line.find('(')? + 1;
    let end = line[start..].find(')')? + start;
    Some(String::from(&line[start..end]))
}

/// Parse a numeric hop line, i.e. ` 3  172.16.4.1  12.345 ms` or
/// ` 4  * * *` for a hop that did not respond.
fn parse_hop(line: &str) -> Option<RawHop> {
    let mut parts = line.split_whitespace();
    let index = parts.next()?.parse::<u16>().ok()?;
    let address = String::from(parts.next()?);
    let round_trip_time = match (parts.next(), parts.next()) {
        (Some(value), Some("ms")) => Some(format!("{value} ms")),
        _ => None,
    };
    Some(RawHop {
        index,
        address,
        round_trip_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_destination() {
        let line = "traceroute to example.com (93.184.216.34), 64 hops max, 52 byte packets";
        assert_eq!(Some(String::from("93.184.216.34")), parse_destination(line));
    }

    #[test]
    fn test_parse_destination_rejects_hop_line() {
        assert_eq!(None, parse_destination(" 1  192.168.1.1  1.2 ms"));
    }

    #[test]
    fn test_parse_hop() {
        let hop = parse_hop(" 3  142.250.80.46  12.345 ms").unwrap();
        assert_eq!(3, hop.index);
        assert_eq!("142.250.80.46", hop.address);
        assert_eq!(Some("12.345 ms"), hop.round_trip_time.as_deref());
    }

    #[test]
    fn test_parse_unroutable_hop() {
        let hop = parse_hop(" 4  * * *").unwrap();
        assert_eq!(4, hop.index);
        assert_eq!("*", hop.address);
        assert_eq!(None, hop.round_trip_time);
    }

    #[test]
    fn test_parse_hop_rejects_header() {
        assert_eq!(
            None,
            parse_hop("traceroute to example.com (93.184.216.34), 64 hops max")
        );
    }
}
