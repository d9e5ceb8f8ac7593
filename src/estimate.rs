//! Distance-based travel time estimates.
//!
//! Uses straight-line distance between zone centroids and an assumed speed
//! per mode. Less accurate than routed times (ignores the network) but always
//! available, so it backs activities the computed table could not place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::{DistanceMetric, ZoneCentroid};
use crate::model::{Activity, ActivityColumn, Mode, ZoneId};
use crate::supply::ZoneSupply;
use crate::traits::TravelTimeMatrixProvider;
use crate::travel_time::{TravelTimeEdge, TravelTimeKey};

/// Assumed average speeds in km/h.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSpeeds {
    pub car: f64,
    pub pt: f64,
    pub walk: f64,
    pub cycle: f64,
}

impl Default for ModeSpeeds {
    fn default() -> Self {
        Self {
            car: 20.0,
            pt: 15.0,
            walk: 5.0,
            cycle: 15.0,
        }
    }
}

impl ModeSpeeds {
    pub fn for_mode(&self, mode: &Mode) -> Result<f64> {
        match mode {
            Mode::Car => Ok(self.car),
            Mode::Pt => Ok(self.pt),
            Mode::Walk => Ok(self.walk),
            Mode::Cycle => Ok(self.cycle),
            Mode::Other(other) => Err(Error::UnsupportedMode {
                value: other.clone(),
                allowed: Mode::SUPPORTED,
            }),
        }
    }
}

/// Estimated minutes between two zones, per mode and averaged over modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatedTime {
    pub distance_km: f64,
    pub car: f64,
    pub pt: f64,
    pub walk: f64,
    pub cycle: f64,
    pub average: f64,
}

impl EstimatedTime {
    pub fn from_distance(distance_km: f64, speeds: &ModeSpeeds) -> Self {
        let minutes = |speed: f64| distance_km / speed * 60.0;
        let car = minutes(speeds.car);
        let pt = minutes(speeds.pt);
        let walk = minutes(speeds.walk);
        let cycle = minutes(speeds.cycle);
        Self {
            distance_km,
            car,
            pt,
            walk,
            cycle,
            average: (car + pt + walk + cycle) / 4.0,
        }
    }

    pub fn for_mode(&self, mode: &Mode) -> Result<f64> {
        match mode {
            Mode::Car => Ok(self.car),
            Mode::Pt => Ok(self.pt),
            Mode::Walk => Ok(self.walk),
            Mode::Cycle => Ok(self.cycle),
            Mode::Other(other) => Err(Error::UnsupportedMode {
                value: other.clone(),
                allowed: Mode::SUPPORTED,
            }),
        }
    }
}

/// Dense estimate table: origin zone -> destination zone -> estimate.
#[derive(Debug, Clone, Default)]
pub struct EstimatedTimes {
    times: HashMap<ZoneId, HashMap<ZoneId, EstimatedTime>>,
}

impl EstimatedTimes {
    pub fn insert(&mut self, from: ZoneId, to: ZoneId, time: EstimatedTime) {
        self.times.entry(from).or_default().insert(to, time);
    }

    pub fn get(&self, from: &ZoneId, to: &ZoneId) -> Option<&EstimatedTime> {
        self.times.get(from).and_then(|row| row.get(to))
    }

    /// Every (origin, destination, estimate) triple, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&ZoneId, &ZoneId, &EstimatedTime)> {
        self.times
            .iter()
            .flat_map(|(from, row)| row.iter().map(move |(to, time)| (from, to, time)))
    }

    pub fn len(&self) -> usize {
        self.times.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Estimates travel times from centroid distances.
#[derive(Debug, Clone, Default)]
pub struct EstimatedTimeModel {
    pub speeds: ModeSpeeds,
    pub metric: DistanceMetric,
}

impl EstimatedTimeModel {
    pub fn new(speeds: ModeSpeeds, metric: DistanceMetric) -> Self {
        Self { speeds, metric }
    }

    /// Estimates for every ordered pair of zones, including a zero-time
    /// entry for each zone to itself.
    pub fn estimate(&self, centroids: &[ZoneCentroid]) -> EstimatedTimes {
        let mut table = EstimatedTimes::default();
        for from in centroids {
            for to in centroids {
                let km = self.metric.distance_km(from.point(), to.point());
                table.insert(
                    from.zone.clone(),
                    to.zone.clone(),
                    EstimatedTime::from_distance(km, &self.speeds),
                );
            }
        }
        table
    }
}

impl TravelTimeMatrixProvider for EstimatedTimeModel {
    fn travel_times(&self, zones: &[ZoneCentroid], key: &TravelTimeKey) -> Result<Vec<TravelTimeEdge>> {
        let speed = self.speeds.for_mode(&key.mode)?;
        let mut edges = Vec::with_capacity(zones.len() * zones.len().saturating_sub(1));

        for (i, from) in zones.iter().enumerate() {
            for (j, to) in zones.iter().enumerate() {
                if i != j {
                    let km = self.metric.distance_km(from.point(), to.point());
                    edges.push(TravelTimeEdge {
                        from_zone: from.zone.clone(),
                        to_zone: to.zone.clone(),
                        combination: key.clone(),
                        travel_time_p50: km / speed * 60.0,
                    });
                }
            }
        }

        Ok(edges)
    }
}

/// Picks the zone whose estimated travel time best matches the reported one.
///
/// Candidates are the zones offering the activity's category, in supply
/// order. The first candidate wins ties, so the result only depends on the
/// inputs. Candidates without an estimate from the origin are skipped.
pub fn fill_missing_zone(
    activity: &Activity,
    estimated: &EstimatedTimes,
    supply: &ZoneSupply,
    activity_col: ActivityColumn,
    use_mode: bool,
) -> Result<Option<ZoneId>> {
    if use_mode && !activity.mode.is_supported() {
        return Err(Error::UnsupportedMode {
            value: activity.mode.to_string(),
            allowed: Mode::SUPPORTED,
        });
    }

    let category = activity.column(activity_col);
    let mut best: Option<(&ZoneId, f64)> = None;
    for zone in supply.zones_for_activity(category) {
        let Some(time) = estimated.get(&activity.origin_zone, zone) else {
            continue;
        };
        let time = if use_mode {
            time.for_mode(&activity.mode)?
        } else {
            time.average
        };
        let diff = (time - activity.duration).abs();
        if best.is_none_or(|(_, best_diff)| diff < best_diff) {
            best = Some((zone, diff));
        }
    }

    debug!(
        activity = %activity.id,
        category,
        zone = ?best.map(|(zone, _)| zone.as_str()),
        "estimated zone"
    );
    Ok(best.map(|(zone, _)| zone.clone()))
}
