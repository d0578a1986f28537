use crate::classify::AddressClass;
use crate::consumer::{CloseCode, RawHop};
use crate::geolocate::GeolocationOutcome;
use crate::reputation::ReputationVerdict;
use serde::Serialize;

/// A routing hop annotated with its class and enrichment data.
///
/// Geolocation and reputation are attempted for public hops only;
/// private and unroutable hops pass through unenriched with both fields
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedHop {
    pub index: u16,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_trip_time: Option<String>,
    pub class: AddressClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<GeolocationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<ReputationVerdict>,
}

impl EnrichedHop {
    /// A hop for which enrichment was not attempted.
    pub(crate) fn unenriched(hop: RawHop, class: AddressClass) -> Self {
        Self {
            index: hop.index,
            address: hop.address,
            round_trip_time: hop.round_trip_time,
            class,
            geolocation: None,
            reputation: None,
        }
    }
}

/// The network-path diagnostic report for a target host.
///
/// Hops are ordered by index ascending: hop 0 is the synthetic local
/// origin and the last hop's address is the resolved destination. Built
/// once per request and immutable after assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceReport {
    /// The resolved target address.
    pub destination: String,
    /// The ordered, enriched hop sequence.
    pub hops: Vec<EnrichedHop>,
    /// The terminal status reported by the prober.
    pub close_code: CloseCode,
    /// Wall-clock time of the whole run in milliseconds.
    pub execution_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unenriched_hop_serialization() {
        let hop = EnrichedHop::unenriched(
            RawHop {
                index: 2,
                address: String::from("*"),
                round_trip_time: None,
            },
            AddressClass::Unroutable,
        );
        let json = serde_json::to_value(&hop).unwrap();
        assert_eq!(2, json["index"]);
        assert_eq!("*", json["address"]);
        assert_eq!("UNROUTABLE", json["class"]);
        assert!(json.get("roundTripTime").is_none());
        assert!(json.get("geolocation").is_none());
        assert!(json.get("reputation").is_none());
    }

    #[test]
    fn test_report_serialization() {
        let report = TraceReport {
            destination: String::from("93.184.216.34"),
            hops: vec![],
            close_code: CloseCode(0),
            execution_time_ms: 1234,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!("93.184.216.34", json["destination"]);
        assert_eq!(0, json["closeCode"]);
        assert_eq!(1234, json["executionTimeMs"]);
    }
}
