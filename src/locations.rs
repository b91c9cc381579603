//! Server location table: "where is server `id`".

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{average_location, nearest};
use crate::records::Server;
use crate::rtt::{slot_count, TableError};
use crate::GeoPoint;

/// Positions of servers, indexed by server id.
///
/// Ids that never appeared in the source data map to [`GeoPoint::UNKNOWN`].
/// Serializes as a plain sequence of `{latitude, longitude}` records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationTable {
    points: Vec<GeoPoint>,
}

impl LocationTable {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Location of server `id`, or unknown if the id is out of range.
    pub fn get(&self, id: u64) -> GeoPoint {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.points.get(i))
            .copied()
            .unwrap_or(GeoPoint::UNKNOWN)
    }

    /// Id and location of the server nearest to `reference`.
    pub fn nearest_server(&self, reference: &GeoPoint) -> Option<(u64, GeoPoint)> {
        nearest(reference, &self.points).map(|(i, p)| (i as u64, p))
    }

    /// Representative location of a group of servers, e.g. the peers of one PoP.
    ///
    /// Unknown or out-of-range ids are ignored; unknown if none remain.
    pub fn centroid_of(&self, ids: &[u64]) -> GeoPoint {
        let points: Vec<GeoPoint> = ids.iter().map(|&id| self.get(id)).collect();
        average_location(&points)
    }
}

/// Build the location table for a server list.
///
/// The table has `max id + 1` slots; slot `id` holds that server's
/// coordinates. If two rows share an id the later one wins.
///
/// # Errors
///
/// Returns [`TableError::IdTooLarge`] if a server id exceeds
/// [`MAX_SERVER_ID`](crate::rtt::MAX_SERVER_ID).
///
/// # Example
/// ```
/// use gslb_geo::{build_location_table, GeoPoint, Server};
///
/// let servers = vec![Server {
///     id: 2,
///     name: "Sydney".into(),
///     latitude: -33.8688,
///     longitude: 151.2093,
///     ..Default::default()
/// }];
/// let table = build_location_table(&servers).unwrap();
/// assert_eq!(table.len(), 3);
/// assert!(table.get(0).is_unknown());
/// assert_eq!(table.get(2), GeoPoint::new(-33.8688, 151.2093));
/// ```
pub fn build_location_table(servers: &[Server]) -> Result<LocationTable, TableError> {
    let max_id = servers.iter().map(|s| s.id).max().unwrap_or(0);

    let mut points = vec![GeoPoint::UNKNOWN; slot_count(max_id)?];
    for server in servers {
        points[server.id as usize] = server.coordinates();
    }

    debug!("location table: {} slots for {} servers", points.len(), servers.len());
    Ok(LocationTable::new(points))
}
