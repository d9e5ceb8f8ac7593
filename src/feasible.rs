//! Feasible destination zones for each activity.
//!
//! A zone is feasible when the travel time from the activity's origin under
//! its reported mode lies within a tolerance band around the reported trip
//! duration. When nothing falls inside the band the single closest zone is
//! kept, so an origin with any outgoing edge always yields a candidate.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Activity, ActivityColumn, ActivityId, ZoneId};
use crate::supply::ZoneSupply;
use crate::travel_time::{TravelTimeKey, TravelTimes};

/// Origin zone -> candidate destination zones.
pub type CandidateZones = BTreeMap<ZoneId, Vec<ZoneId>>;

/// Candidate zones for every activity.
pub type FeasibleZones = BTreeMap<ActivityId, CandidateZones>;

#[derive(Debug, Clone)]
pub struct FeasibleOptions {
    /// Activity field matched against supply categories.
    pub activity_col: ActivityColumn,
    /// Only keep destinations that offer the activity's category.
    pub filter_by_activity: bool,
    /// Accepted travel times are `reported * (1 - tol) ..= reported * (1 + tol)`.
    pub time_tolerance: f64,
}

impl Default for FeasibleOptions {
    fn default() -> Self {
        Self {
            activity_col: ActivityColumn::Category,
            filter_by_activity: false,
            time_tolerance: 0.2,
        }
    }
}

impl FeasibleOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.time_tolerance) {
            return Err(Error::InvalidTolerance(self.time_tolerance));
        }
        Ok(())
    }
}

/// Finds candidate zones for all activities.
///
/// Activities are grouped by travel time key (mode, plus period for public
/// transport) so each group only reads its slice of the table. Every activity
/// gets an entry, possibly with an empty candidate list.
pub fn find_feasible_zones(
    activities: &[Activity],
    travel_times: &TravelTimes,
    supply: &ZoneSupply,
    options: &FeasibleOptions,
) -> Result<FeasibleZones> {
    options.validate()?;

    let mut groups: BTreeMap<TravelTimeKey, Vec<&Activity>> = BTreeMap::new();
    for activity in activities {
        groups
            .entry(TravelTimeKey::for_activity(activity))
            .or_default()
            .push(activity);
    }

    let mut results = FeasibleZones::new();
    for (key, group) in groups {
        let partition = travel_times.partition(&key);
        info!(
            combination = %key,
            activities = group.len(),
            origins = partition.map_or(0, |p| p.len()),
            "finding feasible zones"
        );

        let zones: Vec<(ActivityId, CandidateZones)> = group
            .par_iter()
            .map(|activity| {
                let edges = partition
                    .and_then(|p| p.get(&activity.origin_zone))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                (activity.id, feasible_zones_for(activity, edges, supply, options))
            })
            .collect();
        results.extend(zones);
    }

    Ok(results)
}

/// Candidate zones for one activity given the edges leaving its origin.
pub fn feasible_zones_for(
    activity: &Activity,
    edges: &[(ZoneId, f64)],
    supply: &ZoneSupply,
    options: &FeasibleOptions,
) -> CandidateZones {
    let category = activity.column(options.activity_col);
    let reachable: Vec<&(ZoneId, f64)> = edges
        .iter()
        .filter(|(zone, _)| !options.filter_by_activity || supply.has_activity_in(category, zone))
        .collect();
    debug!(
        activity = %activity.id,
        category,
        reachable = reachable.len(),
        "zones reachable with reported mode"
    );

    let reported = activity.duration;
    let low = reported - options.time_tolerance * reported;
    let high = reported + options.time_tolerance * reported;
    let mut zones: Vec<ZoneId> = reachable
        .iter()
        .filter(|(_, time)| (low..=high).contains(time))
        .map(|(zone, _)| zone.clone())
        .collect();

    if zones.is_empty() {
        debug!(
            activity = %activity.id,
            reported,
            "no zone within tolerance, keeping the closest travel time"
        );
        let closest = reachable.iter().fold(None, |best: Option<&(ZoneId, f64)>, edge| {
            match best {
                Some(b) if (b.1 - reported).abs() <= (edge.1 - reported).abs() => Some(b),
                _ => Some(*edge),
            }
        });
        zones.extend(closest.map(|(zone, _)| zone.clone()));
    } else {
        debug!(activity = %activity.id, feasible = zones.len(), "zones within tolerance");
    }

    let mut candidates = CandidateZones::new();
    candidates.insert(activity.origin_zone.clone(), zones);
    candidates
}
