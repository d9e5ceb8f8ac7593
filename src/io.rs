//! CSV readers and writers for the tables the pipeline exchanges.
//!
//! Missing values are read from empty fields or `NA` and written as `NA`.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::estimate::{EstimatedTime, EstimatedTimes};
use crate::facility::{Facility, Neighbors};
use crate::geometry::{Point, ZoneCentroid};
use crate::model::{Activity, ActivityId, ZoneId};
use crate::supply::{SupplyRow, ZoneSupply};
use crate::travel_time::{TravelTimeEdge, TravelTimes};
use crate::work::{OdFlows, WorkAssignment};

const NA: &str = "NA";

/// Reads an optional string where an empty field or `NA` means missing.
pub fn na_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty() && v != NA))
}

/// Reads an optional number where an empty field or `NA` means missing.
pub fn na_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<f64>, D::Error> {
    match na_string(deserializer)? {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn or_na<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| NA.to_string(), |v| v.to_string())
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "read table");
    Ok(rows)
}

pub fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), "wrote table");
    Ok(())
}

pub fn read_activities(path: &Path) -> Result<Vec<Activity>> {
    read_csv(path)
}

pub fn read_supply(path: &Path) -> Result<ZoneSupply> {
    Ok(ZoneSupply::new(read_csv::<SupplyRow>(path)?))
}

pub fn write_supply(path: &Path, supply: &ZoneSupply) -> Result<()> {
    write_csv(path, supply.rows())
}

pub fn read_travel_times(path: &Path) -> Result<TravelTimes> {
    Ok(TravelTimes::new(read_csv::<TravelTimeEdge>(path)?))
}

pub fn write_travel_times(path: &Path, edges: &[TravelTimeEdge]) -> Result<()> {
    write_csv(path, edges)
}

pub fn read_centroids(path: &Path) -> Result<Vec<ZoneCentroid>> {
    read_csv(path)
}

#[derive(Debug, Serialize, Deserialize)]
struct FacilityRecord {
    id: String,
    zone: ZoneId,
    /// Categories separated by `;`.
    activities: String,
    #[serde(default, deserialize_with = "na_f64")]
    floor_area: Option<f64>,
    x: f64,
    y: f64,
}

impl From<FacilityRecord> for Facility {
    fn from(record: FacilityRecord) -> Self {
        Facility {
            id: record.id,
            zone: record.zone,
            activities: record
                .activities
                .split(';')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect(),
            floor_area: record.floor_area,
            geometry: Point::new(record.x, record.y),
        }
    }
}

pub fn read_facilities(path: &Path) -> Result<Vec<Facility>> {
    Ok(read_csv::<FacilityRecord>(path)?.into_iter().map(Facility::from).collect())
}

#[derive(Debug, Deserialize)]
struct NeighborRecord {
    zone: ZoneId,
    neighbor: ZoneId,
}

pub fn read_neighbors(path: &Path) -> Result<Neighbors> {
    let mut neighbors = Neighbors::new();
    for record in read_csv::<NeighborRecord>(path)? {
        neighbors.entry(record.zone).or_default().push(record.neighbor);
    }
    Ok(neighbors)
}

#[derive(Debug, Deserialize)]
struct FlowRecord {
    origin_zone: ZoneId,
    destination_zone: ZoneId,
    flow: u32,
}

/// Reads observed OD flows. Repeated pairs are summed.
pub fn read_flows(path: &Path) -> Result<OdFlows> {
    let mut flows = OdFlows::new();
    for record in read_csv::<FlowRecord>(path)? {
        *flows
            .entry((record.origin_zone, record.destination_zone))
            .or_default() += record.flow;
    }
    Ok(flows)
}

#[derive(Debug, Serialize, Deserialize)]
struct EstimatedTimeRecord {
    from_zone: ZoneId,
    to_zone: ZoneId,
    distance_km: f64,
    car: f64,
    pt: f64,
    walk: f64,
    cycle: f64,
    average: f64,
}

pub fn read_estimated_times(path: &Path) -> Result<EstimatedTimes> {
    let mut table = EstimatedTimes::default();
    for r in read_csv::<EstimatedTimeRecord>(path)? {
        table.insert(
            r.from_zone,
            r.to_zone,
            EstimatedTime {
                distance_km: r.distance_km,
                car: r.car,
                pt: r.pt,
                walk: r.walk,
                cycle: r.cycle,
                average: r.average,
            },
        );
    }
    Ok(table)
}

/// Writes the estimate table sorted by origin then destination.
pub fn write_estimated_times(path: &Path, table: &EstimatedTimes) -> Result<()> {
    let mut rows: Vec<EstimatedTimeRecord> = table
        .iter()
        .map(|(from, to, t)| EstimatedTimeRecord {
            from_zone: from.clone(),
            to_zone: to.clone(),
            distance_km: t.distance_km,
            car: t.car,
            pt: t.pt,
            walk: t.walk,
            cycle: t.cycle,
            average: t.average,
        })
        .collect();
    rows.sort_by(|a, b| (&a.from_zone, &a.to_zone).cmp(&(&b.from_zone, &b.to_zone)));
    write_csv(path, rows)
}

#[derive(Debug, Serialize)]
struct WorkAssignmentRecord {
    id: ActivityId,
    origin_zone: String,
    assigned_zone: String,
    assignment_type: String,
}

pub fn write_work_assignments(path: &Path, assignments: &[WorkAssignment]) -> Result<()> {
    write_csv(
        path,
        assignments.iter().map(|a| WorkAssignmentRecord {
            id: a.activity_id,
            origin_zone: or_na(a.origin_zone.as_ref()),
            assigned_zone: or_na(a.assigned_zone.as_ref()),
            assignment_type: or_na(a.assignment_type),
        }),
    )
}

/// One enriched activity row as consumed by the population export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocatedActivity {
    pub dzone: Option<ZoneId>,
    pub facility: Option<String>,
    pub facility_geometry: Option<Point>,
    pub start_location: Option<String>,
    pub start_geometry: Option<Point>,
    pub end_location: Option<String>,
    pub end_geometry: Option<Point>,
}

#[derive(Debug, Serialize)]
struct LocatedActivityRecord<'a> {
    id: ActivityId,
    pid: u64,
    hid: u64,
    seq: u32,
    purpose: &'a str,
    category: &'a str,
    mode: &'a str,
    duration: f64,
    distance: String,
    start_time: f64,
    travel_day: u8,
    ozone: &'a str,
    dzone: String,
    facility: String,
    facility_x: String,
    facility_y: String,
    start_location: String,
    start_x: String,
    start_y: String,
    end_location: String,
    end_x: String,
    end_y: String,
}

pub fn write_located_activities(
    path: &Path,
    activities: &[Activity],
    locations: &BTreeMap<ActivityId, LocatedActivity>,
) -> Result<()> {
    let empty = LocatedActivity::default();
    write_csv(
        path,
        activities.iter().map(|activity| {
            let located = locations.get(&activity.id).unwrap_or(&empty);
            LocatedActivityRecord {
                id: activity.id,
                pid: activity.pid,
                hid: activity.hid,
                seq: activity.seq,
                purpose: &activity.purpose,
                category: activity.category(),
                mode: activity.mode.as_str(),
                duration: activity.duration,
                distance: or_na(activity.distance),
                start_time: activity.start_time,
                travel_day: activity.travel_day,
                ozone: activity.origin_zone.as_str(),
                dzone: or_na(located.dzone.as_ref()),
                facility: or_na(located.facility.as_ref()),
                facility_x: or_na(located.facility_geometry.map(|p| p.x)),
                facility_y: or_na(located.facility_geometry.map(|p| p.y)),
                start_location: or_na(located.start_location.as_ref()),
                start_x: or_na(located.start_geometry.map(|p| p.x)),
                start_y: or_na(located.start_geometry.map(|p| p.y)),
                end_location: or_na(located.end_location.as_ref()),
                end_x: or_na(located.end_geometry.map(|p| p.x)),
                end_y: or_na(located.end_geometry.map(|p| p.y)),
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_activities_with_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "activities.csv",
            "id,pid,hid,seq,purpose,category,mode,duration,distance,start_time,travel_day,origin_zone\n\
             1,10,100,1,work,NA,car,25,,480,2,E1\n\
             2,10,100,2,education,education_school,walk,10,0.8,1000,6,E2\n",
        );
        let activities = read_activities(&path).unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].category, None);
        assert_eq!(activities[0].distance, None);
        assert_eq!(activities[1].category.as_deref(), Some("education_school"));
        assert_eq!(activities[1].distance, Some(0.8));
    }

    #[test]
    fn test_read_facilities_splits_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "facilities.csv",
            "id,zone,activities,floor_area,x,y\n\
             f1,E1,shop;work,120.5,1.0,2.0\n\
             f2,E1,home,NA,3.0,4.0\n",
        );
        let facilities = read_facilities(&path).unwrap();
        assert_eq!(facilities[0].activities, vec!["shop", "work"]);
        assert_eq!(facilities[0].floor_area, Some(120.5));
        assert_eq!(facilities[1].floor_area, None);
        assert_eq!(facilities[1].geometry, Point::new(3.0, 4.0));
    }

    #[test]
    fn test_read_flows_sums_repeated_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "flows.csv",
            "origin_zone,destination_zone,flow\nA,B,3\nA,B,2\nA,C,1\n",
        );
        let flows = read_flows(&path).unwrap();
        assert_eq!(flows[&(ZoneId::from("A"), ZoneId::from("B"))], 5);
        assert_eq!(flows.len(), 2);
    }

    #[test]
    fn test_work_assignments_write_na() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("work.csv");
        write_work_assignments(
            &path,
            &[WorkAssignment {
                activity_id: ActivityId(4),
                origin_zone: Some(ZoneId::from("A")),
                assigned_zone: None,
                assignment_type: None,
            }],
        )
        .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id,origin_zone,assigned_zone,assignment_type\n4,A,NA,NA\n");
    }
}
