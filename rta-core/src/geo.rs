//! Geodesy and density clustering primitives
//!
//! Coordinates are plain angles in degrees. Distances use the haversine
//! formula on a sphere with the mean Earth radius.

use serde::{Deserialize, Serialize};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::VecDeque;

/// Mean Earth radius (IUGG), in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle length of one degree of arc
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// A GPS fix in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Mean latitude and longitude. None for an empty slice.
    pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (lat, lon) = points
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
        Some(GeoPoint::new(lat / n, lon / n))
    }
}

/// Haversine distance between two fixes, in kilometers
pub fn great_circle_distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

// ============================================================================
// Clustering
// ============================================================================

type IndexedFix = GeomWithData<[f64; 2], usize>;

/// R-tree over the finite fixes in an equirectangular projection
///
/// Longitudes are scaled by the cosine of the highest latitude in the set,
/// so a planar search of the angular radius returns every fix within
/// `radius_km`, plus a few that the haversine check then discards.
struct FixIndex<'a> {
    points: &'a [GeoPoint],
    tree: RTree<IndexedFix>,
    lon_scale: f64,
    radius_km: f64,
    search_radius_2: f64,
}

impl<'a> FixIndex<'a> {
    fn build(points: &'a [GeoPoint], radius_km: f64) -> Self {
        // Small margin for the flat-earth approximation
        let search_radius = radius_km / KM_PER_DEGREE * 1.01;
        let max_abs_lat = points
            .iter()
            .filter(|p| p.is_finite())
            .map(|p| p.lat.abs())
            .fold(0.0_f64, f64::max);
        let lon_scale = (max_abs_lat + search_radius)
            .min(90.0)
            .to_radians()
            .cos()
            .max(0.01);

        let fixes = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .map(|(i, p)| IndexedFix::new([p.lat, p.lon * lon_scale], i))
            .collect();

        Self {
            points,
            tree: RTree::bulk_load(fixes),
            lon_scale,
            radius_km,
            search_radius_2: search_radius * search_radius,
        }
    }

    /// Indices of all fixes within `radius_km` of `points[i]`, itself
    /// included
    fn region(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        let center = self.points[i];
        self.tree
            .locate_within_distance([center.lat, center.lon * self.lon_scale], self.search_radius_2)
            .map(|fix| fix.data)
            .filter(move |&j| great_circle_distance_km(center, self.points[j]) <= self.radius_km)
    }
}

/// DBSCAN over GPS fixes with the haversine metric
///
/// A point is a core point when at least `min_size` points (itself
/// included) lie within `radius_km`. Returns one label per input point:
/// `Some(cluster)` for members, `None` for noise. Clusters are numbered in
/// discovery order. Non-finite fixes are always noise.
pub fn density_cluster(points: &[GeoPoint], radius_km: f64, min_size: usize) -> Vec<Option<usize>> {
    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    if points.is_empty() || min_size == 0 {
        return labels;
    }

    let index = FixIndex::build(points, radius_km);
    // Set once a point has been examined or queued, so each point enters
    // the queue at most once
    let mut visited = vec![false; points.len()];
    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut next_cluster = 0;

    for i in 0..points.len() {
        if visited[i] || !points[i].is_finite() {
            continue;
        }
        visited[i] = true;

        let neighbors: Vec<usize> = index.region(i).collect();
        if neighbors.len() < min_size {
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[i] = Some(cluster);
        for k in neighbors {
            claim(k, cluster, &mut labels, &mut visited, &mut queue);
        }

        while let Some(j) = queue.pop_front() {
            let expansion: Vec<usize> = index.region(j).collect();
            if expansion.len() >= min_size {
                for k in expansion {
                    claim(k, cluster, &mut labels, &mut visited, &mut queue);
                }
            }
        }
    }

    labels
}

/// Label a density-reachable point and queue it if it was never examined.
/// Points already claimed by an earlier cluster keep their label.
fn claim(
    k: usize,
    cluster: usize,
    labels: &mut [Option<usize>],
    visited: &mut [bool],
    queue: &mut VecDeque<usize>,
) {
    if labels[k].is_none() {
        labels[k] = Some(cluster);
    }
    if !visited[k] {
        visited[k] = true;
        queue.push_back(k);
    }
}
