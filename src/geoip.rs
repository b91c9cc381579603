//! Geolocation lookup boundary.
//!
//! The selection code only needs "address in, coordinates out". Any backend
//! (a city database reader, a static table) implements [`GeoLookup`]; failed
//! lookups and records without coordinates collapse to [`GeoPoint::UNKNOWN`].

use std::net::IpAddr;

use log::{debug, warn};
use snafu::Snafu;

use crate::GeoPoint;

/// Error returned by a geolocation backend.
#[derive(Debug, Snafu)]
pub enum GeoLookupError {
    /// The backend failed to answer for this address.
    #[snafu(display("geolocation lookup for {addr} failed: {message}"))]
    Lookup { addr: IpAddr, message: String },
}

/// A source of coordinates for network addresses.
pub trait GeoLookup {
    /// Coordinates for `addr`, `Ok(None)` if the backend has no coordinates.
    fn city(&self, addr: IpAddr) -> Result<Option<GeoPoint>, GeoLookupError>;

    /// Coordinates for `addr`, unknown on any failure.
    fn locate(&self, addr: IpAddr) -> GeoPoint {
        match self.city(addr) {
            Ok(Some(point)) => point,
            Ok(None) => {
                debug!("no coordinates for {}", addr);
                GeoPoint::UNKNOWN
            }
            Err(e) => {
                warn!("{}", e);
                GeoPoint::UNKNOWN
            }
        }
    }

    /// [`GeoLookup::locate`] for each address, in order.
    fn locate_all(&self, addrs: &[IpAddr]) -> Vec<GeoPoint> {
        addrs.iter().map(|&addr| self.locate(addr)).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Network {
    addr: IpAddr,
    prefix_len: u8,
    point: GeoPoint,
}

impl Network {
    fn contains(&self, addr: IpAddr) -> bool {
        match (self.addr, addr) {
            (IpAddr::V4(net), IpAddr::V4(a)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix_len)).unwrap_or(0);
                u32::from(net) & mask == u32::from(a) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(a)) => {
                let mask = u128::MAX.checked_shl(128 - u32::from(self.prefix_len)).unwrap_or(0);
                u128::from(net) & mask == u128::from(a) & mask
            }
            _ => false,
        }
    }
}

/// In-memory geolocation table keyed by network prefix.
///
/// Lookups pick the longest matching prefix.
///
/// # Example
/// ```
/// use std::net::IpAddr;
/// use gslb_geo::{GeoLookup, GeoPoint, StaticGeoLookup};
///
/// let mut lookup = StaticGeoLookup::new();
/// lookup.insert("203.0.113.0".parse().unwrap(), 24, GeoPoint::new(1.3521, 103.8198));
///
/// let client: IpAddr = "203.0.113.77".parse().unwrap();
/// assert_eq!(lookup.locate(client), GeoPoint::new(1.3521, 103.8198));
/// assert!(lookup.locate("198.51.100.1".parse().unwrap()).is_unknown());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticGeoLookup {
    networks: Vec<Network>,
}

impl StaticGeoLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `addr/prefix_len` to `point`. Prefix lengths beyond the address
    /// width are clamped to a host route.
    pub fn insert(&mut self, addr: IpAddr, prefix_len: u8, point: GeoPoint) {
        let max_len = if addr.is_ipv4() { 32 } else { 128 };
        self.networks.push(Network {
            addr,
            prefix_len: prefix_len.min(max_len),
            point,
        });
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl GeoLookup for StaticGeoLookup {
    fn city(&self, addr: IpAddr) -> Result<Option<GeoPoint>, GeoLookupError> {
        Ok(self
            .networks
            .iter()
            .filter(|n| n.contains(addr))
            .max_by_key(|n| n.prefix_len)
            .map(|n| n.point)
            .filter(|p| !p.is_unknown()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLookup;

    impl GeoLookup for FailingLookup {
        fn city(&self, addr: IpAddr) -> Result<Option<GeoPoint>, GeoLookupError> {
            LookupSnafu { addr, message: "database closed" }.fail()
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut lookup = StaticGeoLookup::new();
        lookup.insert(ip("10.0.0.0"), 8, GeoPoint::new(40.7128, -74.0060));
        lookup.insert(ip("10.1.0.0"), 16, GeoPoint::new(43.6532, -79.3832));

        assert_eq!(lookup.locate(ip("10.1.2.3")), GeoPoint::new(43.6532, -79.3832));
        assert_eq!(lookup.locate(ip("10.2.2.3")), GeoPoint::new(40.7128, -74.0060));
    }

    #[test]
    fn test_ipv6_and_family_mismatch() {
        let mut lookup = StaticGeoLookup::new();
        lookup.insert(ip("2001:db8::"), 32, GeoPoint::new(50.1109, 8.6821));

        assert_eq!(lookup.locate(ip("2001:db8:1::5")), GeoPoint::new(50.1109, 8.6821));
        assert!(lookup.locate(ip("32.1.13.184")).is_unknown());
    }

    #[test]
    fn test_zero_prefix_matches_everything_in_family() {
        let mut lookup = StaticGeoLookup::new();
        lookup.insert(ip("0.0.0.0"), 0, GeoPoint::new(12.9716, 77.5946));
        assert_eq!(lookup.locate(ip("192.0.2.1")), GeoPoint::new(12.9716, 77.5946));
    }

    #[test]
    fn test_prefix_len_clamped() {
        let mut lookup = StaticGeoLookup::new();
        lookup.insert(ip("192.0.2.1"), 200, GeoPoint::new(1.0, 1.0));
        assert_eq!(lookup.locate(ip("192.0.2.1")), GeoPoint::new(1.0, 1.0));
        assert!(lookup.locate(ip("192.0.2.2")).is_unknown());
    }

    #[test]
    fn test_failures_become_unknown() {
        let located = FailingLookup.locate_all(&[ip("192.0.2.1"), ip("::1")]);
        assert_eq!(located, vec![GeoPoint::UNKNOWN, GeoPoint::UNKNOWN]);
        assert!(FailingLookup.city(ip("192.0.2.1")).is_err());
    }

    #[test]
    fn test_locate_all_preserves_order() {
        let mut lookup = StaticGeoLookup::new();
        lookup.insert(ip("198.51.100.0"), 24, GeoPoint::new(-33.8688, 151.2093));

        let located = lookup.locate_all(&[ip("192.0.2.1"), ip("198.51.100.9")]);
        assert!(located[0].is_unknown());
        assert_eq!(located[1], GeoPoint::new(-33.8688, 151.2093));
    }
}
