//! # Geographic Utilities
//!
//! Distance, nearest-site selection and centroid computation over [`GeoPoint`]s.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance_km`] | Great-circle distance between two points in kilometers |
//! | [`nearest`] | Closest known candidate to a reference point |
//! | [`nearest_batch`] | [`nearest`] for many reference points |
//! | [`average_location`] | Centroid of the known points in a cluster |
//!
//! ## Example
//!
//! ```rust
//! use gslb_geo::{GeoPoint, geo_utils};
//!
//! let tokyo = GeoPoint::new(35.6762, 139.6503);
//! let osaka = GeoPoint::new(34.6937, 135.5023);
//!
//! let km = geo_utils::distance_km(&tokyo, &osaka);
//! assert!((km - 392.4).abs() < 1.0);
//!
//! // Unknown points are "infinitely" far away
//! assert_eq!(
//!     geo_utils::distance_km(&tokyo, &GeoPoint::UNKNOWN),
//!     geo_utils::MAX_DISTANCE_KM,
//! );
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_KM`]. Reference:
//! [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Nearest-site search
//!
//! [`nearest`] is a linear scan, which is the right tool for the tens of sites
//! a GSLB deployment has. [`crate::SiteIndex`] answers the same query from an
//! R-tree when the candidate set is large.

use geo::{Centroid, MultiPoint};

use crate::GeoPoint;

/// Mean Earth radius used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance reported when either point is unknown.
///
/// Larger than any terrestrial distance (half the equator is ~20,000 km), so
/// an unknown point never wins a minimum search against a known one.
pub const MAX_DISTANCE_KM: f64 = 10_000_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle surface distance between two points, in kilometers.
///
/// Returns [`MAX_DISTANCE_KM`] if either point is unknown. Otherwise the
/// result is finite, non-negative, symmetric, and zero for identical points.
///
/// # Example
///
/// ```rust
/// use gslb_geo::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
///
/// let km = geo_utils::distance_km(&london, &paris);
/// assert!((km - 343.5).abs() < 1.0);
/// ```
pub fn distance_km(p: &GeoPoint, q: &GeoPoint) -> f64 {
    if p.is_unknown() || q.is_unknown() {
        return MAX_DISTANCE_KM;
    }

    let lat1 = p.latitude.to_radians();
    let lat2 = q.latitude.to_radians();
    let d_lat = (q.latitude - p.latitude).to_radians();
    let d_lon = (q.longitude - p.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

// =============================================================================
// Nearest-Site Selection
// =============================================================================

/// Find the candidate closest to `reference`.
///
/// Unknown candidates are skipped. On equal distances the first candidate in
/// scan order wins. Returns the candidate's index and point, or `None` when the
/// list is empty, every candidate is unknown, or `reference` itself is unknown.
///
/// # Example
///
/// ```rust
/// use gslb_geo::{GeoPoint, geo_utils};
///
/// let sites = vec![
///     GeoPoint::UNKNOWN,
///     GeoPoint::new(40.7128, -74.0060),  // New York
///     GeoPoint::new(43.6532, -79.3832),  // Toronto
/// ];
///
/// let montreal = GeoPoint::new(45.5017, -73.5673);
/// let (index, _) = geo_utils::nearest(&montreal, &sites).unwrap();
/// assert_eq!(index, 2);
///
/// assert!(geo_utils::nearest(&montreal, &[]).is_none());
/// ```
pub fn nearest(reference: &GeoPoint, candidates: &[GeoPoint]) -> Option<(usize, GeoPoint)> {
    let mut best = None;
    let mut min_distance = MAX_DISTANCE_KM;

    for (i, candidate) in candidates.iter().enumerate() {
        if candidate.is_unknown() {
            continue;
        }
        let distance = distance_km(reference, candidate);
        if distance < min_distance {
            min_distance = distance;
            best = Some((i, *candidate));
        }
    }

    best
}

/// Run [`nearest`] for every reference point against the same candidates.
///
/// Results are in the same order as `references`.
pub fn nearest_batch(
    references: &[GeoPoint],
    candidates: &[GeoPoint],
) -> Vec<Option<(usize, GeoPoint)>> {
    references
        .iter()
        .map(|r| nearest(r, candidates))
        .collect()
}

/// Parallel version of [`nearest_batch`].
///
/// Same results, computed with rayon. Worth it for thousands of references.
#[cfg(feature = "parallel")]
pub fn nearest_batch_parallel(
    references: &[GeoPoint],
    candidates: &[GeoPoint],
) -> Vec<Option<(usize, GeoPoint)>> {
    use rayon::prelude::*;

    references
        .par_iter()
        .map(|r| nearest(r, candidates))
        .collect()
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Compute the representative location of a cluster of points.
///
/// Unknown points are ignored. The result is the arithmetic mean of the
/// remaining latitudes and longitudes, or [`GeoPoint::UNKNOWN`] if no known
/// point remains.
///
/// # Notes
///
/// This is a planar mean. Clusters straddling the antimeridian average to the
/// wrong side of the globe; co-located PoP peers never do.
///
/// # Example
///
/// ```rust
/// use gslb_geo::{GeoPoint, geo_utils};
///
/// let peers = vec![
///     GeoPoint::new(50.10, 8.60),
///     GeoPoint::UNKNOWN,
///     GeoPoint::new(50.12, 8.70),
/// ];
///
/// let center = geo_utils::average_location(&peers);
/// assert!((center.latitude - 50.11).abs() < 1e-9);
/// assert!((center.longitude - 8.65).abs() < 1e-9);
/// ```
pub fn average_location(points: &[GeoPoint]) -> GeoPoint {
    let known: Vec<geo::Point<f64>> = points
        .iter()
        .filter(|p| !p.is_unknown())
        .map(|p| (*p).into())
        .collect();

    MultiPoint::new(known)
        .centroid()
        .map(GeoPoint::from)
        .unwrap_or(GeoPoint::UNKNOWN)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn arb_known_point() -> impl Strategy<Value = GeoPoint> {
        (-89.9f64..89.9, -179.9f64..179.9)
            .prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
            .prop_filter("must not be the unknown sentinel", |p| !p.is_unknown())
    }

    #[test]
    fn test_distance_same_point() {
        let p = GeoPoint::new(1.3521, 103.8198);
        assert_eq!(distance_km(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_known_value() {
        // New York to Frankfurt is approximately 6,200 km
        let new_york = GeoPoint::new(40.7128, -74.0060);
        let frankfurt = GeoPoint::new(50.1109, 8.6821);
        assert!(approx_eq(distance_km(&new_york, &frankfurt), 6_200.0, 50.0));
    }

    #[test]
    fn test_distance_antipodal_is_half_circumference() {
        let p = GeoPoint::new(10.0, 20.0);
        let q = GeoPoint::new(-10.0, -160.0);
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!(approx_eq(distance_km(&p, &q), half, 1e-3));
    }

    #[test]
    fn test_distance_unknown_is_sentinel() {
        let p = GeoPoint::new(51.5074, -0.1278);
        assert_eq!(distance_km(&p, &GeoPoint::UNKNOWN), MAX_DISTANCE_KM);
        assert_eq!(distance_km(&GeoPoint::UNKNOWN, &p), MAX_DISTANCE_KM);
        assert_eq!(distance_km(&GeoPoint::UNKNOWN, &GeoPoint::UNKNOWN), MAX_DISTANCE_KM);
    }

    #[test]
    fn test_nearest_empty() {
        let reference = GeoPoint::new(51.5074, -0.1278);
        assert_eq!(nearest(&reference, &[]), None);
    }

    #[test]
    fn test_nearest_all_unknown() {
        let reference = GeoPoint::new(51.5074, -0.1278);
        let candidates = vec![GeoPoint::UNKNOWN, GeoPoint::UNKNOWN];
        assert_eq!(nearest(&reference, &candidates), None);
    }

    #[test]
    fn test_nearest_unknown_reference() {
        let candidates = vec![GeoPoint::new(1.3521, 103.8198)];
        assert_eq!(nearest(&GeoPoint::UNKNOWN, &candidates), None);
    }

    #[test]
    fn test_nearest_single_valid_equal_to_reference() {
        let reference = GeoPoint::new(37.7749, -122.4194);
        let candidates = vec![GeoPoint::UNKNOWN, reference, GeoPoint::UNKNOWN];

        let (index, point) = nearest(&reference, &candidates).unwrap();
        assert_eq!(index, 1);
        assert_eq!(distance_km(&reference, &point), 0.0);
    }

    #[test]
    fn test_nearest_picks_closest() {
        let pops = vec![
            GeoPoint::new(1.3521, 103.8198),   // Singapore
            GeoPoint::new(40.7128, -74.0060),  // New York
            GeoPoint::new(37.7749, -122.4194), // San Francisco
            GeoPoint::new(43.6532, -79.3832),  // Toronto
            GeoPoint::new(50.1109, 8.6821),    // Frankfurt
        ];
        let amsterdam = GeoPoint::new(52.3676, 4.9041);
        let sydney = GeoPoint::new(-33.8688, 151.2093);

        assert_eq!(nearest(&amsterdam, &pops).map(|(i, _)| i), Some(4));
        assert_eq!(nearest(&sydney, &pops).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let site = GeoPoint::new(48.8566, 2.3522);
        let candidates = vec![GeoPoint::new(10.0, 10.0), site, site];
        let (index, _) = nearest(&site, &candidates).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_nearest_batch_preserves_order() {
        let candidates = vec![GeoPoint::new(10.0, 10.0), GeoPoint::new(-10.0, -10.0)];
        let references = vec![
            GeoPoint::new(-9.0, -9.0),
            GeoPoint::UNKNOWN,
            GeoPoint::new(9.0, 9.0),
        ];
        let results: Vec<Option<usize>> = nearest_batch(&references, &candidates)
            .into_iter()
            .map(|r| r.map(|(i, _)| i))
            .collect();
        assert_eq!(results, vec![Some(1), None, Some(0)]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_nearest_batch_parallel_matches_sequential() {
        let candidates: Vec<GeoPoint> = (0..20)
            .map(|i| GeoPoint::new(-60.0 + i as f64 * 6.0, -170.0 + i as f64 * 17.0))
            .collect();
        let references: Vec<GeoPoint> = (0..50)
            .map(|i| GeoPoint::new(-45.0 + i as f64 * 1.7, 120.0 - i as f64 * 5.0))
            .collect();
        assert_eq!(
            nearest_batch_parallel(&references, &candidates),
            nearest_batch(&references, &candidates)
        );
    }

    #[test]
    fn test_average_empty() {
        assert!(average_location(&[]).is_unknown());
    }

    #[test]
    fn test_average_all_unknown() {
        assert!(average_location(&[GeoPoint::UNKNOWN, GeoPoint::UNKNOWN]).is_unknown());
    }

    #[test]
    fn test_average_ignores_unknown() {
        let points = vec![
            GeoPoint::new(10.0, 20.0),
            GeoPoint::UNKNOWN,
            GeoPoint::new(20.0, 40.0),
        ];
        let center = average_location(&points);
        assert!(approx_eq(center.latitude, 15.0, 1e-9));
        assert!(approx_eq(center.longitude, 30.0, 1e-9));
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(p in arb_known_point(), q in arb_known_point()) {
            let pq = distance_km(&p, &q);
            let qp = distance_km(&q, &p);
            prop_assert!((pq - qp).abs() < 1e-9);
        }

        #[test]
        fn prop_distance_self_is_zero(p in arb_known_point()) {
            prop_assert_eq!(distance_km(&p, &p), 0.0);
        }

        #[test]
        fn prop_distance_bounded(p in arb_known_point(), q in arb_known_point()) {
            let d = distance_km(&p, &q);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
            prop_assert!(d <= MAX_DISTANCE_KM);
        }

        #[test]
        fn prop_distance_to_unknown_is_sentinel(p in arb_known_point()) {
            prop_assert_eq!(distance_km(&p, &GeoPoint::UNKNOWN), MAX_DISTANCE_KM);
        }

        #[test]
        fn prop_average_single_point(p in arb_known_point()) {
            let center = average_location(&[p]);
            prop_assert!((center.latitude - p.latitude).abs() < 1e-12);
            prop_assert!((center.longitude - p.longitude).abs() < 1e-12);
        }

        #[test]
        fn prop_nearest_is_minimum(
            reference in arb_known_point(),
            candidates in proptest::collection::vec(arb_known_point(), 1..20),
        ) {
            let (index, point) = nearest(&reference, &candidates).unwrap();
            prop_assert_eq!(point, candidates[index]);
            let best = distance_km(&reference, &point);
            for c in &candidates {
                prop_assert!(best <= distance_km(&reference, c));
            }
        }
    }
}
