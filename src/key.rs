use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// Prefix of IPv4 multiaddrs, e.g. "/ip4/66.6.44.4"
const IP4_MULTIADDR_PREFIX: &str = "/ip4/";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error(r#"invalid IP address "{input}": {error}"#)]
    Invalid {
        input: String,
        error: AddrParseError,
    },
    #[error("IPv6 address {0} has no IPv4 counterpart to look up")]
    Ipv6(Ipv6Addr),
}

/// IPv4 address octets read as a big-endian integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupKey(u32);

impl LookupKey {
    pub const MIN: Self = Self(u32::MIN);
    pub const MAX: Self = Self(u32::MAX);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn to_ipv4(self) -> Ipv4Addr {
        self.0.into()
    }
}

impl From<u32> for LookupKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Ipv4Addr> for LookupKey {
    fn from(address: Ipv4Addr) -> Self {
        Self(address.into())
    }
}

impl From<LookupKey> for u32 {
    fn from(key: LookupKey) -> Self {
        key.0
    }
}

impl TryFrom<IpAddr> for LookupKey {
    type Error = AddressError;

    fn try_from(address: IpAddr) -> Result<Self, AddressError> {
        match address.to_canonical() {
            IpAddr::V4(v4) => Ok(v4.into()),
            IpAddr::V6(v6) => Err(AddressError::Ipv6(v6)),
        }
    }
}

impl FromStr for LookupKey {
    type Err = AddressError;

    /// Accepts "a.b.c.d", "/ip4/a.b.c.d" and IPv4-mapped IPv6 addresses
    fn from_str(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.trim();
        let address = trimmed
            .strip_prefix(IP4_MULTIADDR_PREFIX)
            .unwrap_or(trimmed);
        let address: IpAddr = address.parse().map_err(|error| AddressError::Invalid {
            input: s.to_owned(),
            error,
        })?;
        address.try_into()
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ipv4())
    }
}
