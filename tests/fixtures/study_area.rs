//! A small synthetic study area on a projected grid.
//!
//! Zones sit on a 2 km grid in metres (British National Grid style), so
//! euclidean estimates are easy to reason about: neighbours are 2 km apart,
//! diagonals about 2.83 km.

use zone_assigner::geometry::ZoneCentroid;

/// A named zone centroid.
#[derive(Debug, Clone)]
pub struct Zone {
    pub code: &'static str,
    pub x: f64,
    pub y: f64,
}

impl Zone {
    pub const fn new(code: &'static str, x: f64, y: f64) -> Self {
        Self { code, x, y }
    }

    pub fn centroid(&self) -> ZoneCentroid {
        ZoneCentroid::new(self.code, self.x, self.y)
    }
}

// ============================================================================
// City Centre (2 x 2 grid)
// ============================================================================

pub const CITY_CENTRE: &[Zone] = &[
    Zone::new("E00056750", 430_000.0, 433_000.0),
    Zone::new("E00056751", 432_000.0, 433_000.0),
    Zone::new("E00056752", 430_000.0, 435_000.0),
    Zone::new("E00056753", 432_000.0, 435_000.0),
];

// ============================================================================
// Outskirts
// ============================================================================

pub const OUTSKIRTS: &[Zone] = &[
    Zone::new("E00170001", 440_000.0, 433_000.0),
    Zone::new("E00170002", 420_000.0, 433_000.0),
];

/// Every zone in the study area.
pub fn all_zones() -> Vec<Zone> {
    let mut all = Vec::with_capacity(CITY_CENTRE.len() + OUTSKIRTS.len());
    all.extend_from_slice(CITY_CENTRE);
    all.extend_from_slice(OUTSKIRTS);
    all
}

pub fn centroids() -> Vec<ZoneCentroid> {
    all_zones().iter().map(Zone::centroid).collect()
}
