use crate::error::Error;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// The sentinel the prober reports when a hop did not respond.
pub(crate) const WILDCARD: &str = "*";

/// The routability class of a reported hop address.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressClass {
    /// The hop did not respond to the probe.
    Unroutable,
    /// The address is not globally routable.
    Private,
    /// The address is globally routable.
    Public,
}

impl AddressClass {
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

impl Display for AddressClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unroutable => write!(f, "unroutable"),
            Self::Private => write!(f, "private"),
            Self::Public => write!(f, "public"),
        }
    }
}

const fn ip(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (c as u32) << 8 | d as u32
}

/// Reserved and otherwise non-globally-routable IPv4 ranges.
///
/// Inclusive bounds, compared numerically rather than textually so that
/// range boundaries such as `172.15.255.255` vs `172.16.0.0` are exact.
const RESERVED_RANGES: [(u32, u32); 11] = [
    (ip(10, 0, 0, 0), ip(10, 255, 255, 255)),
    (ip(100, 64, 0, 0), ip(100, 127, 255, 255)),
    (ip(172, 16, 0, 0), ip(172, 31, 255, 255)),
    (ip(192, 0, 0, 0), ip(192, 0, 0, 255)),
    (ip(192, 0, 2, 0), ip(192, 0, 2, 255)),
    (ip(192, 88, 99, 0), ip(192, 88, 99, 255)),
    (ip(192, 168, 0, 0), ip(192, 168, 255, 255)),
    (ip(198, 18, 0, 0), ip(198, 19, 255, 255)),
    (ip(198, 51, 100, 0), ip(198, 51, 100, 255)),
    (ip(203, 0, 113, 0), ip(203, 0, 113, 255)),
    (ip(224, 0, 0, 0), ip(255, 255, 255, 255)),
];

/// Classify a textual hop address.
///
/// The wildcard `*` is always [`AddressClass::Unroutable`], addresses
/// inside any reserved range are [`AddressClass::Private`] and everything
/// else is [`AddressClass::Public`].
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the address is neither the
/// wildcard nor a valid dotted-quad.
pub fn classify(address: &str) -> Result<AddressClass, Error> {
    if address == WILDCARD {
        return Ok(AddressClass::Unroutable);
    }
    let addr = Ipv4Addr::from_str(address)
        .map_err(|_| Error::InvalidAddress(String::from(address)))?;
    let value = u32::from(addr);
    if RESERVED_RANGES
        .iter()
        .any(|&(low, high)| (low..=high).contains(&value))
    {
        Ok(AddressClass::Private)
    } else {
        Ok(AddressClass::Public)
    }
}
