//! Sparse zone-to-zone travel time table.
//!
//! Edges are partitioned by [`TravelTimeKey`] and then by origin zone, so a
//! lookup for one activity only touches the edges leaving its origin under its
//! mode (and, for public transport, its time of day and day type).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Activity, DayType, Mode, TimeOfDay, ZoneId};

/// Mode plus, for public transport, the period the time was computed for.
///
/// Serialized as a combination string: `car`, `walk`, `cycle`, `pt`, or
/// `pt_<wkday|wkend>_<time of day>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TravelTimeKey {
    pub mode: Mode,
    pub period: Option<(DayType, TimeOfDay)>,
}

impl TravelTimeKey {
    pub fn mode(mode: Mode) -> Self {
        Self { mode, period: None }
    }

    pub fn pt(day_type: DayType, time_of_day: TimeOfDay) -> Self {
        Self {
            mode: Mode::Pt,
            period: Some((day_type, time_of_day)),
        }
    }

    /// The table slice an activity should be looked up in.
    pub fn for_activity(activity: &Activity) -> Self {
        match &activity.mode {
            Mode::Pt => Self::pt(activity.day_type(), activity.time_of_day()),
            mode => Self::mode(mode.clone()),
        }
    }

    pub fn parse_combination(combination: &str) -> Result<Self> {
        let invalid = || Error::InvalidCombination(combination.to_string());
        let mut parts = combination.split('_');
        let mode = Mode::parse_supported(parts.next().ok_or_else(invalid)?).map_err(|_| invalid())?;

        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => Ok(Self::mode(mode)),
            (Some(day), Some(time), None) if mode == Mode::Pt => {
                let day_type = DayType::parse(day).ok_or_else(invalid)?;
                let time_of_day = TimeOfDay::parse(time).ok_or_else(invalid)?;
                Ok(Self::pt(day_type, time_of_day))
            }
            _ => Err(invalid()),
        }
    }

    pub fn combination(&self) -> String {
        match self.period {
            Some((day_type, time_of_day)) => format!(
                "{}_{}_{}",
                self.mode,
                day_type.as_str(),
                time_of_day.as_str()
            ),
            None => self.mode.to_string(),
        }
    }
}

impl fmt::Display for TravelTimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.combination())
    }
}

impl Serialize for TravelTimeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.combination())
    }
}

impl<'de> Deserialize<'de> for TravelTimeKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let combination = String::deserialize(deserializer)?;
        TravelTimeKey::parse_combination(&combination).map_err(serde::de::Error::custom)
    }
}

/// Median travel time in minutes from one zone to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelTimeEdge {
    pub from_zone: ZoneId,
    pub to_zone: ZoneId,
    pub combination: TravelTimeKey,
    pub travel_time_p50: f64,
}

/// Edges leaving each origin zone, in table order.
pub type OriginEdges = HashMap<ZoneId, Vec<(ZoneId, f64)>>;

#[derive(Debug, Clone, Default)]
pub struct TravelTimes {
    partitions: HashMap<TravelTimeKey, OriginEdges>,
    len: usize,
}

impl TravelTimes {
    pub fn new(edges: impl IntoIterator<Item = TravelTimeEdge>) -> Self {
        let mut table = Self::default();
        table.extend(edges);
        table
    }

    pub fn extend(&mut self, edges: impl IntoIterator<Item = TravelTimeEdge>) {
        for edge in edges {
            self.partitions
                .entry(edge.combination)
                .or_default()
                .entry(edge.from_zone)
                .or_default()
                .push((edge.to_zone, edge.travel_time_p50));
            self.len += 1;
        }
    }

    /// The slice of the table for one key. Public transport keys with a
    /// period fall back to a period-less `pt` slice if the table has one.
    pub fn partition(&self, key: &TravelTimeKey) -> Option<&OriginEdges> {
        self.partitions.get(key).or_else(|| {
            key.period
                .and_then(|_| self.partitions.get(&TravelTimeKey::mode(key.mode.clone())))
        })
    }

    pub fn from_origin(&self, key: &TravelTimeKey, origin: &ZoneId) -> &[(ZoneId, f64)] {
        self.partition(key)
            .and_then(|edges| edges.get(origin))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &TravelTimeKey> {
        self.partitions.keys()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
