//! # GSLB Geo
//!
//! Nearest point-of-presence selection and RTT reference tables for global
//! server load balancing.
//!
//! This library provides:
//! - Great-circle distance and nearest-site selection over candidate sites
//! - Centroid computation for clusters of co-located servers
//! - A batch pipeline turning raw ping measurements into dense latency matrices
//! - Binary persistence for latency matrices and server location tables
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch nearest-site queries with rayon
//! - **`cli`** - Build the `rtt-table-prep` batch binary (default)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use gslb_geo::{GeoPoint, geo_utils};
//!
//! let pops = vec![
//!     GeoPoint::new(1.3521, 103.8198),   // Singapore
//!     GeoPoint::new(40.7128, -74.0060),  // New York
//!     GeoPoint::new(50.1109, 8.6821),    // Frankfurt
//! ];
//!
//! let client = GeoPoint::new(48.8566, 2.3522); // Paris
//! if let Some((index, pop)) = geo_utils::nearest(&client, &pops) {
//!     println!("Route to PoP #{} at {:?}", index, pop);
//! }
//! ```
//!
//! ## Unknown locations
//!
//! The coordinate pair (0.0, 0.0) is reserved to mean "location unknown".
//! Distances involving an unknown point are [`geo_utils::MAX_DISTANCE_KM`], so
//! unknown sites are never selected as nearest.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod geo_utils;
pub mod geoip;
pub mod index;
pub mod locations;
pub mod prep;
pub mod records;
pub mod rtt;
pub mod store;

pub use config::{ConfigError, PrepConfig};
pub use geo_utils::{average_location, distance_km, nearest, EARTH_RADIUS_KM, MAX_DISTANCE_KM};
pub use geoip::{GeoLookup, GeoLookupError, StaticGeoLookup};
pub use index::SiteIndex;
pub use locations::{build_location_table, LocationTable};
pub use prep::{PrepError, PrepOutput};
pub use records::{IngestError, Ping, Server};
pub use rtt::{build_rtt_table, LatencyMatrix, RttMap, RttSample, RttTable, TableError};
pub use store::StoreError;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude in degrees.
///
/// The pair (0.0, 0.0) is the unknown-location sentinel, which is also the
/// `Default` value.
///
/// # Example
/// ```
/// use gslb_geo::GeoPoint;
/// let point = GeoPoint::new(35.6762, 139.6503); // Tokyo
/// assert!(!point.is_unknown());
/// assert!(GeoPoint::default().is_unknown());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// The unknown-location sentinel.
    pub const UNKNOWN: GeoPoint = GeoPoint { latitude: 0.0, longitude: 0.0 };

    /// Create a new point.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True iff both coordinates are exactly 0.0.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(p: geo::Point<f64>) -> Self {
        GeoPoint::new(p.y(), p.x())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sentinel() {
        assert!(GeoPoint::UNKNOWN.is_unknown());
        assert!(GeoPoint::default().is_unknown());
        assert!(GeoPoint::new(0.0, -0.0).is_unknown());
        assert!(!GeoPoint::new(0.0, 1.0).is_unknown());
        assert!(!GeoPoint::new(1.0, 0.0).is_unknown());
    }

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_geo_point_conversion_swaps_axes() {
        let p = GeoPoint::new(1.3521, 103.8198);
        let g: geo::Point<f64> = p.into();
        assert_eq!(g.x(), 103.8198);
        assert_eq!(g.y(), 1.3521);
        assert_eq!(GeoPoint::from(g), p);
    }
}
