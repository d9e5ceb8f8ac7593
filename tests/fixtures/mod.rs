//! Test fixtures for zone-assigner.
//!
//! Provides:
//! - A small synthetic study area of zone centroids
//! - Builders for activities, supply rows, facilities and travel time edges

#![allow(dead_code)]

pub mod study_area;

#[allow(unused_imports)]
pub use study_area::*;

use zone_assigner::facility::Facility;
use zone_assigner::geometry::Point;
use zone_assigner::model::{Activity, ActivityId, Mode, ZoneId};
use zone_assigner::supply::{SupplyRow, ZoneSupply};
use zone_assigner::travel_time::{TravelTimeEdge, TravelTimeKey, TravelTimes};

// ============================================================================
// Activities
// ============================================================================

/// Builder for test activities with sensible defaults: a 20 minute weekday
/// morning car trip.
#[derive(Clone, Debug)]
pub struct TestActivity {
    activity: Activity,
}

impl TestActivity {
    pub fn new(id: u64) -> Self {
        Self {
            activity: Activity {
                id: ActivityId(id),
                pid: id,
                hid: id,
                seq: 1,
                purpose: "work".to_string(),
                category: None,
                mode: Mode::Car,
                duration: 20.0,
                distance: None,
                start_time: 480.0,
                travel_day: 1,
                origin_zone: ZoneId::from("O"),
            },
        }
    }

    pub fn person(mut self, pid: u64, hid: u64, seq: u32) -> Self {
        self.activity.pid = pid;
        self.activity.hid = hid;
        self.activity.seq = seq;
        self
    }

    pub fn purpose(mut self, purpose: &str) -> Self {
        self.activity.purpose = purpose.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.activity.category = Some(category.to_string());
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.activity.mode = Mode::from(mode);
        self
    }

    pub fn duration(mut self, minutes: f64) -> Self {
        self.activity.duration = minutes;
        self
    }

    pub fn starts_at(mut self, minutes: f64, travel_day: u8) -> Self {
        self.activity.start_time = minutes;
        self.activity.travel_day = travel_day;
        self
    }

    pub fn from_zone(mut self, zone: &str) -> Self {
        self.activity.origin_zone = ZoneId::from(zone);
        self
    }

    pub fn build(self) -> Activity {
        self.activity
    }
}

// ============================================================================
// Tables
// ============================================================================

pub fn zone(id: &str) -> ZoneId {
    ZoneId::from(id)
}

pub fn zones(ids: &[&str]) -> Vec<ZoneId> {
    ids.iter().map(|id| ZoneId::from(*id)).collect()
}

pub fn supply_row(zone: &str, activity: &str, counts: u32, floor_area: f64) -> SupplyRow {
    SupplyRow {
        zone: ZoneId::from(zone),
        activity: activity.to_string(),
        counts,
        floor_area,
    }
}

pub fn supply(rows: Vec<SupplyRow>) -> ZoneSupply {
    ZoneSupply::new(rows)
}

pub fn facility(id: &str, zone: &str, activities: &[&str], floor_area: Option<f64>) -> Facility {
    Facility {
        id: id.to_string(),
        zone: ZoneId::from(zone),
        activities: activities.iter().map(|a| a.to_string()).collect(),
        floor_area,
        geometry: Point::new(0.0, 0.0),
    }
}

pub fn edge(from: &str, to: &str, combination: &str, minutes: f64) -> TravelTimeEdge {
    TravelTimeEdge {
        from_zone: ZoneId::from(from),
        to_zone: ZoneId::from(to),
        combination: TravelTimeKey::parse_combination(combination)
            .expect("fixture combination must be valid"),
        travel_time_p50: minutes,
    }
}

/// Car edges from `from` with the given (destination, minutes) pairs.
pub fn car_times(from: &str, times: &[(&str, f64)]) -> TravelTimes {
    TravelTimes::new(times.iter().map(|(to, minutes)| edge(from, to, "car", *minutes)))
}
