//! Conversions between MAC addresses and EUI-64 based IPv6 addresses.
//!
//! babel identifies neighbours by link-local address; these helpers map a
//! node's hardware address to the address it will announce and back.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;
use thiserror::Error;

/// Link-local prefix `fe80::/64`.
pub const LINK_LOCAL_PREFIX: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0);

/// Universal/local bit of the first MAC octet, inverted in EUI-64.
const UNIVERSAL_LOCAL_BIT: u8 = 0x02;

/// Address conversion errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("{0} does not carry an EUI-64 interface identifier")]
    NotEui64(Ipv6Addr),
}

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddr {
    type Err = AddressError;

    /// Parses `aa:bb:cc:dd:ee:ff` (or with `-` separators).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidMac(s.to_string());

        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(MacAddr(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

/// Builds the address formed by the upper 64 bits of `prefix` and the
/// modified EUI-64 identifier of `mac`.
pub fn mac_to_ipv6(mac: MacAddr, prefix: Ipv6Addr) -> Ipv6Addr {
    let m = mac.0;
    let mut octets = prefix.octets();
    octets[8..].copy_from_slice(&[
        m[0] ^ UNIVERSAL_LOCAL_BIT,
        m[1],
        m[2],
        0xff,
        0xfe,
        m[3],
        m[4],
        m[5],
    ]);
    Ipv6Addr::from(octets)
}

/// Returns the `fe80::/64` address for `mac`.
pub fn mac_to_link_local(mac: MacAddr) -> Ipv6Addr {
    mac_to_ipv6(mac, LINK_LOCAL_PREFIX)
}

/// Recovers the MAC address from an EUI-64 based IPv6 address.
pub fn ipv6_to_mac(addr: Ipv6Addr) -> Result<MacAddr, AddressError> {
    let o = addr.octets();
    if o[11] != 0xff || o[12] != 0xfe {
        return Err(AddressError::NotEui64(addr));
    }
    Ok(MacAddr([
        o[8] ^ UNIVERSAL_LOCAL_BIT,
        o[9],
        o[10],
        o[13],
        o[14],
        o[15],
    ]))
}
