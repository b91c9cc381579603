//! R-tree index for nearest-site queries over large candidate sets.
//!
//! Sites are stored as unit vectors on the sphere. The straight-line (chord)
//! distance between two unit vectors grows monotonically with their
//! great-circle distance, so the R-tree's Euclidean nearest neighbour is the
//! haversine nearest neighbour. Results match [`crate::geo_utils::nearest`]:
//! unknown candidates are never returned and ties go to the lowest index.
//! Candidates with out-of-range coordinates are not indexed at all.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::GeoPoint;

/// A candidate site with its position in the candidate list.
#[derive(Debug, Clone, Copy)]
struct IndexedSite {
    idx: usize,
    point: GeoPoint,
    xyz: [f64; 3],
}

impl RTreeObject for IndexedSite {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl PointDistance for IndexedSite {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.xyz[0] - point[0];
        let dy = self.xyz[1] - point[1];
        let dz = self.xyz[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

fn unit_vector(p: &GeoPoint) -> [f64; 3] {
    let lat = p.latitude.to_radians();
    let lon = p.longitude.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Spatial index answering "which candidate is nearest to this point".
///
/// Build once from the candidate list, then query from any number of threads.
///
/// # Example
/// ```
/// use gslb_geo::{GeoPoint, SiteIndex};
///
/// let sites = vec![
///     GeoPoint::new(1.3521, 103.8198),  // Singapore
///     GeoPoint::UNKNOWN,
///     GeoPoint::new(50.1109, 8.6821),   // Frankfurt
/// ];
/// let index = SiteIndex::new(&sites);
/// assert_eq!(index.len(), 2);
///
/// let amsterdam = GeoPoint::new(52.3676, 4.9041);
/// assert_eq!(index.nearest(&amsterdam).map(|(i, _)| i), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct SiteIndex {
    tree: RTree<IndexedSite>,
}

impl SiteIndex {
    /// Index every known candidate with in-range coordinates. Positions refer
    /// to `candidates`.
    pub fn new(candidates: &[GeoPoint]) -> Self {
        let sites: Vec<IndexedSite> = candidates
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_unknown() && p.is_valid())
            .map(|(idx, p)| IndexedSite {
                idx,
                point: *p,
                xyz: unit_vector(p),
            })
            .collect();

        Self {
            tree: RTree::bulk_load(sites),
        }
    }

    /// Number of indexed (known) sites.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest indexed site to `reference`, as (candidate index, point).
    ///
    /// `None` if the index is empty or `reference` is unknown.
    pub fn nearest(&self, reference: &GeoPoint) -> Option<(usize, GeoPoint)> {
        if reference.is_unknown() {
            return None;
        }
        let query = unit_vector(reference);

        let mut neighbors = self.tree.nearest_neighbor_iter_with_distance_2(&query);
        let (first, min_distance_2) = neighbors.next()?;

        // Equidistant sites come out of the iterator in arbitrary order
        let mut best = first;
        for (site, distance_2) in neighbors {
            if distance_2 > min_distance_2 {
                break;
            }
            if site.idx < best.idx {
                best = site;
            }
        }

        Some((best.idx, best.point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::{distance_km, nearest};
    use proptest::prelude::*;

    #[test]
    fn test_empty_index() {
        let index = SiteIndex::new(&[]);
        assert!(index.is_empty());
        assert_eq!(index.nearest(&GeoPoint::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_unknown_candidates_not_indexed() {
        let index = SiteIndex::new(&[GeoPoint::UNKNOWN, GeoPoint::UNKNOWN]);
        assert!(index.is_empty());
        assert_eq!(index.nearest(&GeoPoint::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_invalid_candidates_not_indexed() {
        let candidates = vec![
            GeoPoint::new(95.0, 10.0),
            GeoPoint::new(f64::NAN, 10.0),
            GeoPoint::new(10.0, 200.0),
            GeoPoint::new(45.0, 10.0),
        ];
        let index = SiteIndex::new(&candidates);
        assert_eq!(index.len(), 1);
        assert_eq!(index.nearest(&GeoPoint::new(89.0, 10.0)).map(|(i, _)| i), Some(3));
    }

    #[test]
    fn test_unknown_reference() {
        let index = SiteIndex::new(&[GeoPoint::new(10.0, 10.0)]);
        assert_eq!(index.nearest(&GeoPoint::UNKNOWN), None);
    }

    #[test]
    fn test_duplicate_sites_resolve_to_lowest_index() {
        let site = GeoPoint::new(37.7749, -122.4194);
        let candidates = vec![GeoPoint::new(-33.8688, 151.2093), site, site, site];
        let index = SiteIndex::new(&candidates);
        assert_eq!(index.nearest(&site).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_antimeridian_neighbors() {
        // Fiji and Samoa sit on opposite sides of the 180th meridian
        let candidates = vec![GeoPoint::new(-13.8, -171.8), GeoPoint::new(-18.1, 20.0)];
        let index = SiteIndex::new(&candidates);
        let fiji = GeoPoint::new(-17.7, 178.1);
        assert_eq!(index.nearest(&fiji).map(|(i, _)| i), Some(0));
    }

    fn arb_known_point() -> impl Strategy<Value = GeoPoint> {
        (-89.0f64..89.0, -179.0f64..179.0)
            .prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
            .prop_filter("must not be the unknown sentinel", |p| !p.is_unknown())
    }

    proptest! {
        #[test]
        fn prop_index_agrees_with_linear_scan(
            reference in arb_known_point(),
            candidates in proptest::collection::vec(arb_known_point(), 1..64),
        ) {
            let index = SiteIndex::new(&candidates);
            let (_, from_index) = index.nearest(&reference).unwrap();
            let (_, from_scan) = nearest(&reference, &candidates).unwrap();
            let a = distance_km(&reference, &from_index);
            let b = distance_km(&reference, &from_scan);
            prop_assert!((a - b).abs() < 1e-6);
        }
    }
}
