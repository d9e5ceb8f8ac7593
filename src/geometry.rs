//! Point geometry for facilities and zone centroids.
//!
//! Coordinates are either projected (metres, e.g. EPSG:27700) or geographic
//! (`x` = longitude, `y` = latitude). [`DistanceMetric`] says which.

use serde::{Deserialize, Serialize};

use crate::model::ZoneId;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// How distances between two points are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Straight line on projected coordinates given in metres.
    #[default]
    Euclidean,
    /// Great-circle distance on longitude/latitude degrees.
    Haversine,
}

impl DistanceMetric {
    pub fn distance_km(&self, from: Point, to: Point) -> f64 {
        match self {
            DistanceMetric::Euclidean => euclidean_km(from, to),
            DistanceMetric::Haversine => haversine_km(from, to),
        }
    }
}

fn euclidean_km(from: Point, to: Point) -> f64 {
    (to.x - from.x).hypot(to.y - from.y) / 1000.0
}

fn haversine_km(from: Point, to: Point) -> f64 {
    let lat1_rad = from.y.to_radians();
    let lat2_rad = to.y.to_radians();
    let delta_lat = (to.y - from.y).to_radians();
    let delta_lng = (to.x - from.x).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Representative point of a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCentroid {
    pub zone: ZoneId,
    pub x: f64,
    pub y: f64,
}

impl ZoneCentroid {
    pub fn new(zone: impl Into<ZoneId>, x: f64, y: f64) -> Self {
        Self {
            zone: zone.into(),
            x,
            y,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let p = Point::new(-1.55, 53.80);
        let dist = DistanceMetric::Haversine.distance_km(p, p);
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Leeds (53.80, -1.55) to York (53.96, -1.08), roughly 35 km apart
        let leeds = Point::new(-1.55, 53.80);
        let york = Point::new(-1.08, 53.96);
        let dist = DistanceMetric::Haversine.distance_km(leeds, york);
        assert!(dist > 30.0 && dist < 40.0, "Leeds to York should be ~35km, got {}", dist);
    }

    #[test]
    fn test_euclidean_is_in_km() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3000.0, 4000.0);
        assert!((DistanceMetric::Euclidean.distance_km(a, b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Point::new(-1.55, 53.80);
        let b = Point::new(-1.60, 53.85);
        for metric in [DistanceMetric::Euclidean, DistanceMetric::Haversine] {
            assert_eq!(metric.distance_km(a, b), metric.distance_km(b, a));
        }
    }
}
