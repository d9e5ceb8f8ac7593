//! Run configuration, read from TOML.
//!
//! Every section has defaults so a minimal file only names what differs.
//! The configuration's content hash names the output directory, so two runs
//! with the same settings write to the same place.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::estimate::ModeSpeeds;
use crate::facility::{FacilityOptions, SampleColumn};
use crate::feasible::FeasibleOptions;
use crate::geometry::DistanceMetric;
use crate::model::ActivityColumn;
use crate::osrm::OsrmConfig;
use crate::select::Weighting;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parameters: Parameters,
    pub zone_selection: ZoneSelection,
    pub work_assignment: WorkAssignmentConfig,
    pub facilities: FacilityConfig,
    pub osrm: OsrmConfig,
    pub paths: Paths,
}

/// Where the travel time table comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelTimeSource {
    /// Precomputed file; estimated from centroids if the file is missing.
    #[default]
    Computed,
    Estimated,
    /// Road modes from an OSRM server, public transport estimated.
    Osrm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub seed: u64,
    pub region: String,
    pub time_tolerance: f64,
    pub filter_by_activity: bool,
    pub activity_col: ActivityColumn,
    pub travel_times: TravelTimeSource,
    pub distance_metric: DistanceMetric,
    pub speeds: ModeSpeeds,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            seed: 0,
            region: "leeds".to_string(),
            time_tolerance: 0.2,
            filter_by_activity: false,
            activity_col: ActivityColumn::Category,
            travel_times: TravelTimeSource::Computed,
            distance_metric: DistanceMetric::Euclidean,
            speeds: ModeSpeeds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneSelection {
    pub weighting: Weighting,
    /// Use mode-specific estimates in the estimate fallback instead of the
    /// average over modes.
    pub use_mode: bool,
}

impl Default for ZoneSelection {
    fn default() -> Self {
        Self {
            weighting: Weighting::FloorArea,
            use_mode: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    #[default]
    Iterative,
    Optimization,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Iterative => "iterative",
            Strategy::Optimization => "optimization",
        }
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "iterative" => Ok(Strategy::Iterative),
            "optimization" | "optimisation" => Ok(Strategy::Optimization),
            other => Err(Error::UnsupportedStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.as_str().to_string()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkAssignmentConfig {
    pub strategy: Strategy,
    pub use_percentages: bool,
    pub weight_max_dev: f64,
    pub weight_total_dev: f64,
    /// Fall back to a uniform draw when no feasible zone has flow left.
    pub random_assignment: bool,
    /// Candidate zones kept per activity before assignment.
    pub max_zones: Option<usize>,
}

impl Default for WorkAssignmentConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Iterative,
            use_percentages: true,
            weight_max_dev: 0.2,
            weight_total_dev: 0.8,
            random_assignment: true,
            max_zones: Some(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityConfig {
    pub sample_col: Option<SampleColumn>,
    /// Category tried for education trips when nothing matches exactly.
    pub education_fallback: Option<String>,
    /// Let non-work, non-education trips take any facility in their zone.
    pub random_fallback_for_other: bool,
    pub use_neighbors: bool,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            sample_col: Some(SampleColumn::FloorArea),
            education_fallback: Some("education".to_string()),
            random_fallback_for_other: true,
            use_neighbors: true,
        }
    }
}

impl FacilityConfig {
    pub fn options_for(&self, purpose: &str) -> FacilityOptions {
        match purpose {
            "education" => FacilityOptions {
                fallback_type: self.education_fallback.clone(),
                fallback_to_random: false,
                sample_col: self.sample_col,
            },
            "work" | "home" => FacilityOptions {
                fallback_type: None,
                fallback_to_random: false,
                sample_col: self.sample_col,
            },
            _ => FacilityOptions {
                fallback_type: None,
                fallback_to_random: self.random_fallback_for_other,
                sample_col: self.sample_col,
            },
        }
    }
}

/// Input and output locations. Relative paths are resolved against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub root: PathBuf,
    pub activities: PathBuf,
    /// Derived from facilities when absent.
    pub supply: Option<PathBuf>,
    pub travel_times: PathBuf,
    pub centroids: PathBuf,
    pub facilities: PathBuf,
    pub neighbors: Option<PathBuf>,
    pub flows: PathBuf,
    /// Defaults to `<root>/data/outputs/<config id>`.
    pub output: Option<PathBuf>,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            activities: PathBuf::from("data/interim/activities.csv"),
            supply: None,
            travel_times: PathBuf::from("data/interim/travel_times.csv"),
            centroids: PathBuf::from("data/interim/centroids.csv"),
            facilities: PathBuf::from("data/interim/facilities.csv"),
            neighbors: Some(PathBuf::from("data/interim/neighbors.csv")),
            flows: PathBuf::from("data/interim/od_flows.csv"),
            output: None,
        }
    }
}

impl Paths {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = contents.parse()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.feasible_options().validate()?;

        let work = &self.work_assignment;
        if work.weight_max_dev < 0.0 || work.weight_total_dev < 0.0 {
            return Err(Error::InvalidConfig(
                "work assignment weights must not be negative".to_string(),
            ));
        }
        if work.max_zones == Some(0) {
            return Err(Error::InvalidConfig("max_zones must be at least 1".to_string()));
        }
        let speeds = &self.parameters.speeds;
        if [speeds.car, speeds.pt, speeds.walk, speeds.cycle]
            .iter()
            .any(|speed| !(speed.is_finite() && *speed > 0.0))
        {
            return Err(Error::InvalidConfig("mode speeds must be positive".to_string()));
        }
        Ok(())
    }

    pub fn feasible_options(&self) -> FeasibleOptions {
        FeasibleOptions {
            activity_col: self.parameters.activity_col,
            filter_by_activity: self.parameters.filter_by_activity,
            time_tolerance: self.parameters.time_tolerance,
        }
    }

    /// First 10 hex characters of the SHA-256 of the config's JSON form.
    pub fn id(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let digest = Sha256::digest(canonical.as_bytes());
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Ok(hex[..10].to_string())
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.paths.output {
            Some(output) => Ok(self.paths.resolve(output)),
            None => Ok(self.paths.root.join("data").join("outputs").join(self.id()?)),
        }
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }
}
