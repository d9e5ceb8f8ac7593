//! End-to-end assignment run.
//!
//! Stages, in order:
//!
//! 1. feasible zones for every non-home trip
//! 2. work zones reconciled against observed OD flows
//! 3. probabilistic zone choice for education and other trips
//! 4. estimate fallback for trips still without a zone
//! 5. home trips return to the zone the person's day started in
//! 6. facility choice inside each zone (one home per household)
//! 7. start and end locations linked along each person's chain

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{Config, Strategy, TravelTimeSource};
use crate::error::Result;
use crate::estimate::{fill_missing_zone, EstimatedTimeModel, EstimatedTimes};
use crate::facility::{select_facility, FacilityChoice, FacilityIndex, Neighbors};
use crate::feasible::{find_feasible_zones, FeasibleZones};
use crate::geometry::ZoneCentroid;
use crate::io::{self, LocatedActivity};
use crate::model::{Activity, ActivityId, Mode, ZoneId};
use crate::osrm::OsrmClient;
use crate::sampling::activity_rng;
use crate::select::select_zones;
use crate::supply::ZoneSupply;
use crate::traits::TravelTimeMatrixProvider;
use crate::travel_time::{TravelTimeKey, TravelTimes};
use crate::work::{flow_rmse, limit_candidates, OdFlows, WorkAssignment, WorkZoneAssignment};

pub const HOME: &str = "home";
pub const WORK: &str = "work";

/// Tables a run reads.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub activities: Vec<Activity>,
    pub supply: ZoneSupply,
    pub travel_times: TravelTimes,
    pub estimated: EstimatedTimes,
    pub facilities: FacilityIndex,
    pub neighbors: Option<Neighbors>,
    pub flows: OdFlows,
}

impl Inputs {
    pub fn load(config: &Config) -> Result<Self> {
        let paths = &config.paths;
        let activities = io::read_activities(&paths.resolve(&paths.activities))?;
        let facilities = io::read_facilities(&paths.resolve(&paths.facilities))?;
        let supply = match &paths.supply {
            Some(path) => io::read_supply(&paths.resolve(path))?,
            None => ZoneSupply::from_facilities(&facilities),
        };
        let centroids = io::read_centroids(&paths.resolve(&paths.centroids))?;
        let model = EstimatedTimeModel::new(config.parameters.speeds, config.parameters.distance_metric);
        let travel_times = load_travel_times(config, &model, &centroids)?;
        let neighbors = match &paths.neighbors {
            Some(path) if paths.resolve(path).exists() => Some(io::read_neighbors(&paths.resolve(path))?),
            Some(path) => {
                warn!(path = %path.display(), "neighbor table not found, facility search stays in zone");
                None
            }
            None => None,
        };
        let flows = io::read_flows(&paths.resolve(&paths.flows))?;

        info!(
            activities = activities.len(),
            facilities = facilities.len(),
            supply_rows = supply.len(),
            travel_times = travel_times.len(),
            flows = flows.len(),
            "loaded inputs"
        );

        Ok(Self {
            activities,
            supply,
            travel_times,
            estimated: model.estimate(&centroids),
            facilities: FacilityIndex::new(facilities),
            neighbors,
            flows,
        })
    }
}

fn load_travel_times(config: &Config, model: &EstimatedTimeModel, centroids: &[ZoneCentroid]) -> Result<TravelTimes> {
    let estimate_all = || -> Result<TravelTimes> {
        let mut table = TravelTimes::default();
        for mode in [Mode::Car, Mode::Pt, Mode::Walk, Mode::Cycle] {
            table.extend(model.travel_times(centroids, &TravelTimeKey::mode(mode))?);
        }
        Ok(table)
    };

    let paths = &config.paths;
    match config.parameters.travel_times {
        TravelTimeSource::Computed => {
            let path = paths.resolve(&paths.travel_times);
            if path.exists() {
                io::read_travel_times(&path)
            } else {
                warn!(path = %path.display(), "computed travel times not found, estimating from centroids");
                estimate_all()
            }
        }
        TravelTimeSource::Estimated => estimate_all(),
        TravelTimeSource::Osrm => {
            let client = OsrmClient::new(config.osrm.clone())?;
            let mut table = TravelTimes::default();
            for mode in [Mode::Car, Mode::Walk, Mode::Cycle] {
                table.extend(client.travel_times(centroids, &TravelTimeKey::mode(mode))?);
            }
            table.extend(model.travel_times(centroids, &TravelTimeKey::mode(Mode::Pt))?);
            Ok(table)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub feasible: FeasibleZones,
    pub work: Vec<WorkAssignment>,
    pub locations: BTreeMap<ActivityId, LocatedActivity>,
    pub flow_rmse: f64,
}

pub struct Pipeline {
    config: Config,
    inputs: Inputs,
}

impl Pipeline {
    pub fn new(config: Config, inputs: Inputs) -> Self {
        Self { config, inputs }
    }

    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let inputs = Inputs::load(&config)?;
        Ok(Self::new(config, inputs))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn run(&self) -> Result<PipelineOutput> {
        let params = &self.config.parameters;
        let activities = &self.inputs.activities;
        let trips: Vec<Activity> = activities
            .iter()
            .filter(|a| a.purpose != HOME)
            .cloned()
            .collect();

        let feasible = find_feasible_zones(
            &trips,
            &self.inputs.travel_times,
            &self.inputs.supply,
            &self.config.feasible_options(),
        )?;

        let work = self.assign_work_zones(&trips, &feasible);
        let mut zones: BTreeMap<ActivityId, Option<ZoneId>> = BTreeMap::new();
        for row in &work {
            zones.entry(row.activity_id).or_insert_with(|| row.assigned_zone.clone());
        }

        let others: Vec<&Activity> = trips.iter().filter(|a| a.purpose != WORK).collect();
        zones.extend(select_zones(
            others,
            &feasible,
            &self.inputs.supply,
            params.activity_col,
            self.config.zone_selection.weighting,
            params.seed,
        ));

        let mut estimated = 0;
        for activity in &trips {
            let zone = zones.entry(activity.id).or_default();
            if zone.is_none() {
                *zone = fill_missing_zone(
                    activity,
                    &self.inputs.estimated,
                    &self.inputs.supply,
                    params.activity_col,
                    self.config.zone_selection.use_mode,
                )?;
                estimated += usize::from(zone.is_some());
            }
        }
        info!(estimated, "filled zones from estimated travel times");

        zones.extend(home_zones(activities));

        let locations = self.locate(&zones);
        let rmse = flow_rmse(&work, &self.inputs.flows);
        info!(rmse, "work zone flow fit");

        Ok(PipelineOutput {
            feasible,
            work,
            locations,
            flow_rmse: rmse,
        })
    }

    fn assign_work_zones(&self, trips: &[Activity], feasible: &FeasibleZones) -> Vec<WorkAssignment> {
        let settings = &self.config.work_assignment;
        let to_assign = trips
            .iter()
            .filter(|a| a.purpose == WORK)
            .map(|a| {
                let candidates = feasible.get(&a.id).cloned().unwrap_or_default();
                let candidates = match settings.max_zones {
                    Some(max) => limit_candidates(&candidates, &self.inputs.flows, max),
                    None => candidates,
                };
                (a.id, candidates)
            })
            .collect();
        let mut assignment = WorkZoneAssignment::new(to_assign, self.inputs.flows.clone());

        if settings.strategy == Strategy::Optimization {
            let result = assignment.select_work_zone_optimization(
                settings.use_percentages,
                settings.weight_max_dev,
                settings.weight_total_dev,
            );
            if !result.is_empty() {
                return result.assignments;
            }
            warn!("optimization returned no assignments, falling back to iterative");
        }

        let mut rng = StdRng::seed_from_u64(self.config.parameters.seed);
        assignment.select_work_zone_iterative(settings.random_assignment, &mut rng)
    }

    fn locate(&self, zones: &BTreeMap<ActivityId, Option<ZoneId>>) -> BTreeMap<ActivityId, LocatedActivity> {
        let seed = self.config.parameters.seed;
        let neighbors = if self.config.facilities.use_neighbors {
            self.inputs.neighbors.as_ref()
        } else {
            None
        };
        let homes = self.home_facilities(zones, neighbors);

        let facilities: BTreeMap<ActivityId, Option<FacilityChoice>> = self
            .inputs
            .activities
            .par_iter()
            .filter(|a| a.purpose != HOME)
            .map(|activity| {
                let zone = zones.get(&activity.id).and_then(Option::as_ref);
                let options = self.config.facilities.options_for(&activity.purpose);
                let mut rng = activity_rng(seed, activity.id);
                let choice = select_facility(
                    activity.category(),
                    zone,
                    &self.inputs.facilities,
                    &options,
                    neighbors,
                    &mut rng,
                );
                (activity.id, choice)
            })
            .collect();
        info!(
            trips = facilities.len(),
            located = facilities.values().filter(|f| f.is_some()).count(),
            households = homes.len(),
            "selected facilities"
        );

        let mut chains: Vec<&Activity> = self.inputs.activities.iter().collect();
        chains.sort_by_key(|a| (a.pid, a.seq));

        let mut located = BTreeMap::new();
        let mut previous: Option<(u64, Option<FacilityChoice>)> = None;
        for activity in chains {
            let home = homes.get(&activity.hid).cloned().flatten();
            let end = if activity.purpose == HOME {
                home.clone()
            } else {
                facilities.get(&activity.id).cloned().flatten()
            };
            let start = match previous.take() {
                Some((pid, previous_end)) if pid == activity.pid => previous_end,
                _ => home,
            };

            located.insert(
                activity.id,
                LocatedActivity {
                    dzone: zones.get(&activity.id).cloned().flatten(),
                    facility: end.as_ref().map(|f| f.id.clone()),
                    facility_geometry: end.as_ref().map(|f| f.geometry),
                    start_location: start.as_ref().map(|f| f.id.clone()),
                    start_geometry: start.as_ref().map(|f| f.geometry),
                    end_location: end.as_ref().map(|f| f.id.clone()),
                    end_geometry: end.as_ref().map(|f| f.geometry),
                },
            );
            previous = Some((activity.pid, end));
        }
        located
    }

    /// One home facility per household, in the zone its first trip leaves from.
    fn home_facilities(
        &self,
        zones: &BTreeMap<ActivityId, Option<ZoneId>>,
        neighbors: Option<&Neighbors>,
    ) -> BTreeMap<u64, Option<FacilityChoice>> {
        let mut home_zone: BTreeMap<u64, (u64, u32, ZoneId)> = BTreeMap::new();
        for activity in &self.inputs.activities {
            let zone = if activity.seq == 1 {
                activity.origin_zone.clone()
            } else if activity.purpose == HOME {
                match zones.get(&activity.id).cloned().flatten() {
                    Some(zone) => zone,
                    None => continue,
                }
            } else {
                continue;
            };
            let key = (activity.pid, activity.seq);
            home_zone
                .entry(activity.hid)
                .and_modify(|current| {
                    if key < (current.0, current.1) {
                        *current = (key.0, key.1, zone.clone());
                    }
                })
                .or_insert((key.0, key.1, zone));
        }

        let options = self.config.facilities.options_for(HOME);
        let mut rng = StdRng::seed_from_u64(self.config.parameters.seed);
        home_zone
            .into_iter()
            .map(|(hid, (_, _, zone))| {
                let choice = select_facility(
                    HOME,
                    Some(&zone),
                    &self.inputs.facilities,
                    &options,
                    neighbors,
                    &mut rng,
                );
                (hid, choice)
            })
            .collect()
    }

    /// Writes the enriched activity table, the work assignments, the flow
    /// fit and the config used into `dir`.
    pub fn write(&self, output: &PipelineOutput, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        io::write_located_activities(
            &dir.join("activities_assigned.csv"),
            &self.inputs.activities,
            &output.locations,
        )?;
        io::write_work_assignments(&dir.join("work_assignments.csv"), &output.work)?;
        std::fs::write(
            dir.join("workzone_rmse_results.txt"),
            format!("rmse: {:.4}\n", output.flow_rmse),
        )?;
        self.config.write(&dir.join("config.toml"))?;
        info!(dir = %dir.display(), "wrote outputs");
        Ok(())
    }
}

/// Home trips go back to the zone the person's first trip left from.
fn home_zones(activities: &[Activity]) -> HashMap<ActivityId, Option<ZoneId>> {
    let mut first: HashMap<u64, (u32, &ZoneId)> = HashMap::new();
    for activity in activities {
        first
            .entry(activity.pid)
            .and_modify(|current| {
                if activity.seq < current.0 {
                    *current = (activity.seq, &activity.origin_zone);
                }
            })
            .or_insert((activity.seq, &activity.origin_zone));
    }

    activities
        .iter()
        .filter(|a| a.purpose == HOME)
        .map(|a| (a.id, first.get(&a.pid).map(|(_, zone)| (*zone).clone())))
        .collect()
}
