//! Choosing a concrete facility inside an assigned zone.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::model::ZoneId;
use crate::sampling::{choose_uniform, choose_weighted};

/// A point of interest that can host one or more activity categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub zone: ZoneId,
    pub activities: Vec<String>,
    pub floor_area: Option<f64>,
    pub geometry: Point,
}

impl Facility {
    pub fn serves(&self, activity: &str) -> bool {
        self.activities.iter().any(|a| a == activity)
    }
}

/// Zone adjacency: zone -> neighboring zones.
pub type Neighbors = HashMap<ZoneId, Vec<ZoneId>>;

/// Facilities grouped by zone.
#[derive(Debug, Clone, Default)]
pub struct FacilityIndex {
    facilities: Vec<Facility>,
    by_zone: HashMap<ZoneId, Vec<usize>>,
}

impl FacilityIndex {
    pub fn new(facilities: Vec<Facility>) -> Self {
        let mut by_zone: HashMap<ZoneId, Vec<usize>> = HashMap::new();
        for (i, facility) in facilities.iter().enumerate() {
            by_zone.entry(facility.zone.clone()).or_default().push(i);
        }
        Self { facilities, by_zone }
    }

    pub fn in_zone<'a>(&'a self, zone: &ZoneId) -> impl Iterator<Item = &'a Facility> + use<'a> {
        self.by_zone
            .get(zone)
            .into_iter()
            .flatten()
            .map(move |&i| &self.facilities[i])
    }

    pub fn all(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

/// Facility attribute used as a sampling weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SampleColumn {
    FloorArea,
}

impl SampleColumn {
    pub const SUPPORTED: &'static [&'static str] = &["floor_area"];
}

impl FromStr for SampleColumn {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "floor_area" => Ok(SampleColumn::FloorArea),
            other => Err(Error::UnsupportedSampleColumn {
                value: other.to_string(),
                allowed: Self::SUPPORTED,
            }),
        }
    }
}

impl TryFrom<String> for SampleColumn {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SampleColumn> for String {
    fn from(column: SampleColumn) -> Self {
        column.to_string()
    }
}

impl fmt::Display for SampleColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleColumn::FloorArea => f.write_str("floor_area"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityOptions {
    /// More general category tried in the destination zone when nothing
    /// matches the activity type, e.g. "education" for "education_university".
    pub fallback_type: Option<String>,
    /// Take any facility in the destination zone as a last resort.
    pub fallback_to_random: bool,
    pub sample_col: Option<SampleColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityChoice {
    pub id: String,
    pub geometry: Point,
}

impl From<&Facility> for FacilityChoice {
    fn from(facility: &Facility) -> Self {
        Self {
            id: facility.id.clone(),
            geometry: facility.geometry,
        }
    }
}

/// Search steps, tried in order until one finds a facility.
#[derive(Debug, Clone, Copy)]
enum Search {
    Zone,
    Neighbors,
    FallbackType,
    AnyInZone,
}

const SEARCH_ORDER: [Search; 4] = [
    Search::Zone,
    Search::Neighbors,
    Search::FallbackType,
    Search::AnyInZone,
];

/// Picks a facility for an activity of `activity_type` in `destination_zone`.
///
/// Returns `None` when the zone is missing or nothing matches after all
/// enabled fallbacks, which is a normal outcome for sparse data.
pub fn select_facility<R: Rng + ?Sized>(
    activity_type: &str,
    destination_zone: Option<&ZoneId>,
    facilities: &FacilityIndex,
    options: &FacilityOptions,
    neighbors: Option<&Neighbors>,
    rng: &mut R,
) -> Option<FacilityChoice> {
    let zone = destination_zone?;

    let (step, candidates) = SEARCH_ORDER.iter().find_map(|step| {
        let found = search(*step, activity_type, zone, facilities, options, neighbors);
        (!found.is_empty()).then_some((*step, found))
    })?;
    debug!(
        zone = %zone,
        activity_type,
        ?step,
        candidates = candidates.len(),
        "found facilities"
    );

    let weighted = match options.sample_col {
        Some(SampleColumn::FloorArea) => {
            choose_weighted(rng, &candidates, |f| f.floor_area.unwrap_or(0.0))
        }
        None => None,
    };
    let facility = match weighted {
        Some(facility) => facility,
        None => choose_uniform(rng, &candidates)?,
    };
    Some(FacilityChoice::from(*facility))
}

fn search<'a>(
    step: Search,
    activity_type: &str,
    zone: &ZoneId,
    facilities: &'a FacilityIndex,
    options: &FacilityOptions,
    neighbors: Option<&Neighbors>,
) -> Vec<&'a Facility> {
    match step {
        Search::Zone => facilities
            .in_zone(zone)
            .filter(|f| f.serves(activity_type))
            .collect(),
        Search::Neighbors => neighbors
            .and_then(|n| n.get(zone))
            .into_iter()
            .flatten()
            .flat_map(|neighbor| facilities.in_zone(neighbor))
            .filter(|f| f.serves(activity_type))
            .collect(),
        Search::FallbackType => match &options.fallback_type {
            Some(fallback) => facilities
                .in_zone(zone)
                .filter(|f| f.serves(fallback))
                .collect(),
            None => Vec::new(),
        },
        Search::AnyInZone if options.fallback_to_random => facilities.in_zone(zone).collect(),
        Search::AnyInZone => Vec::new(),
    }
}
