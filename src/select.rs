//! Probabilistic choice of one destination zone per activity.
//!
//! Candidates come from the supply table restricted to the activity's
//! feasible zones. The category match is relaxed step by step (exact
//! category, then broad class, then any category) and the first step with
//! any rows is sampled from.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::feasible::FeasibleZones;
use crate::model::{Activity, ActivityColumn, ActivityId, ZoneId};
use crate::sampling::{activity_rng, choose_uniform, choose_weighted};
use crate::supply::{SupplyRow, ZoneSupply};

/// Supply attribute zones are sampled in proportion to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Weighting {
    FloorArea,
    Counts,
    #[default]
    None,
}

impl Weighting {
    pub const SUPPORTED: &'static [&'static str] = &["floor_area", "counts", "none"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weighting::FloorArea => "floor_area",
            Weighting::Counts => "counts",
            Weighting::None => "none",
        }
    }
}

impl FromStr for Weighting {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "floor_area" => Ok(Weighting::FloorArea),
            "counts" => Ok(Weighting::Counts),
            "none" => Ok(Weighting::None),
            other => Err(Error::UnsupportedWeighting {
                value: other.to_string(),
                allowed: Self::SUPPORTED,
            }),
        }
    }
}

impl TryFrom<String> for Weighting {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Weighting> for String {
    fn from(weighting: Weighting) -> Self {
        weighting.as_str().to_string()
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum CategoryMatch {
    Exact,
    BroadClass,
    Any,
}

const RELAXATION_ORDER: [CategoryMatch; 3] = [
    CategoryMatch::Exact,
    CategoryMatch::BroadClass,
    CategoryMatch::Any,
];

impl CategoryMatch {
    fn accepts(&self, row: &SupplyRow, category: &str) -> bool {
        match self {
            CategoryMatch::Exact => row.activity == category,
            CategoryMatch::BroadClass => row.activity.contains(broad_class(category)),
            CategoryMatch::Any => true,
        }
    }
}

/// Category prefix before the first `_`, e.g. "education" for
/// "education_university".
pub fn broad_class(category: &str) -> &str {
    category.split('_').next().unwrap_or(category)
}

/// Chooses a destination zone for one activity, matching supply rows on the
/// activity's `activity_col` value.
///
/// Returns `None` when the activity has no feasible zones or no supply row in
/// any of them.
pub fn select_zone<R: Rng + ?Sized>(
    activity: &Activity,
    feasible: &FeasibleZones,
    supply: &ZoneSupply,
    activity_col: ActivityColumn,
    weighting: Weighting,
    rng: &mut R,
) -> Option<ZoneId> {
    let candidates = feasible.get(&activity.id)?;
    let zones: HashSet<&ZoneId> = candidates
        .get(&activity.origin_zone)
        .or_else(|| candidates.values().next())?
        .iter()
        .collect();
    if zones.is_empty() {
        return None;
    }

    let category = activity.column(activity_col);
    let (level, rows) = RELAXATION_ORDER.iter().find_map(|level| {
        let rows: Vec<&SupplyRow> = supply
            .rows()
            .iter()
            .filter(|row| zones.contains(&row.zone) && level.accepts(row, category))
            .collect();
        (!rows.is_empty()).then_some((*level, rows))
    })?;
    debug!(
        activity = %activity.id,
        category,
        ?level,
        rows = rows.len(),
        "zone candidates"
    );

    sample_row(&rows, weighting, rng).map(|row| row.zone.clone())
}

fn sample_row<'a, R: Rng + ?Sized>(
    rows: &[&'a SupplyRow],
    weighting: Weighting,
    rng: &mut R,
) -> Option<&'a SupplyRow> {
    let weighted = match weighting {
        Weighting::FloorArea => match choose_weighted(rng, rows, |row| row.floor_area) {
            Some(row) => Some(*row),
            None => choose_weighted(rng, rows, |row| f64::from(row.counts)).copied(),
        },
        Weighting::Counts => choose_weighted(rng, rows, |row| f64::from(row.counts)).copied(),
        Weighting::None => None,
    };
    match weighted {
        Some(row) => Some(row),
        None => choose_uniform(rng, rows).copied(),
    }
}

/// Chooses zones for many activities in parallel.
///
/// Each activity draws from its own generator seeded from `seed` and its id,
/// so the result does not depend on how rows are scheduled.
pub fn select_zones<'a, I>(
    activities: I,
    feasible: &FeasibleZones,
    supply: &ZoneSupply,
    activity_col: ActivityColumn,
    weighting: Weighting,
    seed: u64,
) -> BTreeMap<ActivityId, Option<ZoneId>>
where
    I: IntoParallelIterator<Item = &'a Activity>,
{
    let selected: BTreeMap<ActivityId, Option<ZoneId>> = activities
        .into_par_iter()
        .map(|activity| {
            let mut rng = activity_rng(seed, activity.id);
            (activity.id, select_zone(activity, feasible, supply, activity_col, weighting, &mut rng))
        })
        .collect();

    info!(
        activities = selected.len(),
        unassigned = selected.values().filter(|zone| zone.is_none()).count(),
        %weighting,
        "selected zones"
    );
    selected
}
