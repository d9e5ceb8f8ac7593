//! OSRM HTTP adapter for zone-to-zone travel times.
//!
//! Centroids must be geographic (`x` = longitude, `y` = latitude). Only road
//! profiles are served here; public transport times come from elsewhere.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geometry::ZoneCentroid;
use crate::model::Mode;
use crate::traits::TravelTimeMatrixProvider;
use crate::travel_time::{TravelTimeEdge, TravelTimeKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn table_url(&self, profile: &str, zones: &[ZoneCentroid]) -> String {
        let coords = zones
            .iter()
            .map(|zone| format!("{:.6},{:.6}", zone.x, zone.y))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?annotations=duration",
            self.config.base_url.trim_end_matches('/'),
            profile,
            coords
        )
    }
}

/// OSRM profile serving a mode.
pub fn profile_for(mode: &Mode) -> Result<&'static str> {
    match mode {
        Mode::Car => Ok("car"),
        Mode::Walk => Ok("foot"),
        Mode::Cycle => Ok("bike"),
        other => Err(Error::UnsupportedMode {
            value: other.to_string(),
            allowed: &["car", "walk", "cycle"],
        }),
    }
}

impl TravelTimeMatrixProvider for OsrmClient {
    fn travel_times(&self, zones: &[ZoneCentroid], key: &TravelTimeKey) -> Result<Vec<TravelTimeEdge>> {
        if zones.is_empty() {
            return Ok(Vec::new());
        }

        let profile = profile_for(&key.mode)?;
        let url = self.table_url(profile, zones);
        debug!(%url, "requesting OSRM table");

        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>())?;

        let edges = body.into_edges(zones, key);
        info!(profile, zones = zones.len(), edges = edges.len(), "fetched OSRM travel times");
        Ok(edges)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    /// Seconds; `null` where no route was found.
    durations: Option<Vec<Vec<Option<f64>>>>,
}

impl OsrmTableResponse {
    fn into_edges(self, zones: &[ZoneCentroid], key: &TravelTimeKey) -> Vec<TravelTimeEdge> {
        let mut edges = Vec::new();
        for (i, row) in self.durations.unwrap_or_default().into_iter().enumerate() {
            for (j, seconds) in row.into_iter().enumerate() {
                let (Some(from), Some(to), Some(seconds)) = (zones.get(i), zones.get(j), seconds) else {
                    continue;
                };
                if i == j {
                    continue;
                }
                edges.push(TravelTimeEdge {
                    from_zone: from.zone.clone(),
                    to_zone: to.zone.clone(),
                    combination: key.clone(),
                    travel_time_p50: seconds / 60.0,
                });
            }
        }
        edges
    }
}
