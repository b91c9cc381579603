//! Picking the closest PoP for a handful of clients.
//!
//! Run with: cargo run --example nearest_pop

use std::net::IpAddr;

use gslb_geo::{distance_km, nearest, GeoLookup, GeoPoint, SiteIndex, StaticGeoLookup};

fn main() {
    // PoP sites
    let pops = [
        ("Singapore", GeoPoint::new(1.3521, 103.8198)),
        ("NewYork", GeoPoint::new(40.7128, -74.0060)),
        ("SanFrancisco", GeoPoint::new(37.7749, -122.4194)),
        ("Toronto", GeoPoint::new(43.6532, -79.3832)),
        ("Frankfurt", GeoPoint::new(50.1109, 8.6821)),
    ];
    let pop_points: Vec<GeoPoint> = pops.iter().map(|(_, p)| *p).collect();

    // Client address ranges
    let mut lookup = StaticGeoLookup::new();
    lookup.insert("203.0.113.0".parse().unwrap(), 24, GeoPoint::new(-33.8688, 151.2093)); // Sydney
    lookup.insert("198.51.100.0".parse().unwrap(), 24, GeoPoint::new(52.3676, 4.9041)); // Amsterdam
    lookup.insert("2001:db8::".parse().unwrap(), 32, GeoPoint::new(12.9716, 77.5946)); // Bangalore

    let clients: Vec<IpAddr> = ["203.0.113.10", "198.51.100.200", "2001:db8::42", "192.0.2.1"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    println!("Linear scan\n");
    for (addr, location) in clients.iter().zip(lookup.locate_all(&clients)) {
        match nearest(&location, &pop_points) {
            Some((i, pop)) => println!(
                "  {:<16} -> {:<13} {:>8.1} km",
                addr,
                pops[i].0,
                distance_km(&location, &pop)
            ),
            None => println!("  {:<16} -> unknown location, no pick", addr),
        }
    }

    println!("\nR-tree index\n");
    let index = SiteIndex::new(&pop_points);
    for addr in &clients {
        let location = lookup.locate(*addr);
        match index.nearest(&location) {
            Some((i, _)) => println!("  {:<16} -> {}", addr, pops[i].0),
            None => println!("  {:<16} -> unknown location, no pick", addr),
        }
    }
}
