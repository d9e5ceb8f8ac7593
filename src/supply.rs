//! Per-zone activity supply: how many facilities of each category a zone
//! has and their total floor area. This is the universe zones are sampled from.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::facility::Facility;
use crate::model::ZoneId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyRow {
    pub zone: ZoneId,
    pub activity: String,
    pub counts: u32,
    pub floor_area: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneSupply {
    rows: Vec<SupplyRow>,
    zones_by_activity: HashMap<String, HashSet<ZoneId>>,
}

impl ZoneSupply {
    pub fn new(rows: Vec<SupplyRow>) -> Self {
        let mut zones_by_activity: HashMap<String, HashSet<ZoneId>> = HashMap::new();
        for row in &rows {
            zones_by_activity
                .entry(row.activity.clone())
                .or_default()
                .insert(row.zone.clone());
        }
        Self {
            rows,
            zones_by_activity,
        }
    }

    /// Aggregates facilities into (zone, category) rows. A facility tagged
    /// with several categories counts towards each of them.
    pub fn from_facilities(facilities: &[Facility]) -> Self {
        let mut totals: BTreeMap<(ZoneId, String), (u32, f64)> = BTreeMap::new();
        for facility in facilities {
            for activity in &facility.activities {
                let entry = totals
                    .entry((facility.zone.clone(), activity.clone()))
                    .or_default();
                entry.0 += 1;
                entry.1 += facility.floor_area.filter(|area| area.is_finite()).unwrap_or(0.0);
            }
        }

        let rows = totals
            .into_iter()
            .map(|((zone, activity), (counts, floor_area))| SupplyRow {
                zone,
                activity,
                counts,
                floor_area,
            })
            .collect();
        Self::new(rows)
    }

    pub fn rows(&self) -> &[SupplyRow] {
        &self.rows
    }

    pub fn has_activity_in(&self, activity: &str, zone: &ZoneId) -> bool {
        self.zones_by_activity
            .get(activity)
            .is_some_and(|zones| zones.contains(zone))
    }

    /// Distinct zones offering `activity`, in table order.
    pub fn zones_for_activity(&self, activity: &str) -> Vec<&ZoneId> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| row.activity == activity)
            .map(|row| &row.zone)
            .filter(|zone| seen.insert(*zone))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
