//! Work zone assignment reconciled against observed origin-destination flows.
//!
//! Two strategies share the same inputs:
//!
//! * [`WorkZoneAssignment::select_work_zone_iterative`] walks activities in
//!   order and draws each destination in proportion to the flow still left
//!   on its OD pair, depleting it as it goes.
//! * [`WorkZoneAssignment::select_work_zone_optimization`] solves a small
//!   integer program that picks one destination per activity so assigned
//!   flows deviate as little as possible from observed ones.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, Solution, SolverModel, Variable,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::feasible::CandidateZones;
use crate::model::{ActivityId, ZoneId};
use crate::sampling::{choose_uniform, choose_weighted};

/// Observed flow per (origin, destination) pair.
pub type OdFlows = BTreeMap<(ZoneId, ZoneId), u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentType {
    /// Drawn in proportion to remaining observed flow.
    Weighted,
    /// No feasible zone had flow left, drawn uniformly instead.
    Random,
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentType::Weighted => f.write_str("Weighted"),
            AssignmentType::Random => f.write_str("Random"),
        }
    }
}

/// One output row. `assigned_zone` is `None` when no destination could be
/// chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkAssignment {
    pub activity_id: ActivityId,
    pub origin_zone: Option<ZoneId>,
    pub assigned_zone: Option<ZoneId>,
    pub assignment_type: Option<AssignmentType>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizationResult {
    pub assignments: Vec<WorkAssignment>,
    pub max_deviation: f64,
    pub total_deviation: f64,
}

impl OptimizationResult {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

pub struct WorkZoneAssignment {
    activities_to_assign: BTreeMap<ActivityId, CandidateZones>,
    actual_flows: OdFlows,
    remaining_flows: OdFlows,
    total_flows: BTreeMap<ZoneId, u32>,
    percentages: BTreeMap<(ZoneId, ZoneId), f64>,
}

impl WorkZoneAssignment {
    pub fn new(activities_to_assign: BTreeMap<ActivityId, CandidateZones>, actual_flows: OdFlows) -> Self {
        let mut total_flows: BTreeMap<ZoneId, u32> = BTreeMap::new();
        for ((origin, _), flow) in &actual_flows {
            *total_flows.entry(origin.clone()).or_default() += flow;
        }

        let percentages = actual_flows
            .iter()
            .filter_map(|((origin, destination), flow)| {
                let total = *total_flows.get(origin)?;
                (total > 0).then(|| {
                    (
                        (origin.clone(), destination.clone()),
                        f64::from(*flow) / f64::from(total),
                    )
                })
            })
            .collect();

        Self {
            activities_to_assign,
            remaining_flows: actual_flows.clone(),
            actual_flows,
            total_flows,
            percentages,
        }
    }

    pub fn actual_flows(&self) -> &OdFlows {
        &self.actual_flows
    }

    pub fn remaining_flows(&self) -> &OdFlows {
        &self.remaining_flows
    }

    pub fn total_flows(&self) -> &BTreeMap<ZoneId, u32> {
        &self.total_flows
    }

    pub fn percentages(&self) -> &BTreeMap<(ZoneId, ZoneId), f64> {
        &self.percentages
    }

    /// Greedy flow depletion in activity order.
    ///
    /// The outcome depends on order and on `rng`, not on any global state.
    pub fn select_work_zone_iterative<R: Rng + ?Sized>(
        &mut self,
        random_assignment: bool,
        rng: &mut R,
    ) -> Vec<WorkAssignment> {
        let mut assignments = Vec::with_capacity(self.activities_to_assign.len());

        for (activity_id, candidates) in &self.activities_to_assign {
            if candidates.is_empty() {
                assignments.push(WorkAssignment {
                    activity_id: *activity_id,
                    origin_zone: None,
                    assigned_zone: None,
                    assignment_type: None,
                });
                continue;
            }

            for (origin, zones) in candidates {
                let weighted: Vec<(&ZoneId, u32)> = zones
                    .iter()
                    .filter_map(|zone| {
                        let remaining = *self.remaining_flows.get(&(origin.clone(), zone.clone()))?;
                        (remaining > 0).then_some((zone, remaining))
                    })
                    .collect();

                let (assigned_zone, assignment_type) =
                    match choose_weighted(rng, &weighted, |(_, flow)| f64::from(*flow)) {
                        Some((zone, _)) => {
                            let key = (origin.clone(), (*zone).clone());
                            if let Some(flow) = self.remaining_flows.get_mut(&key) {
                                *flow -= 1;
                            }
                            (Some((*zone).clone()), Some(AssignmentType::Weighted))
                        }
                        None if random_assignment => match choose_uniform(rng, zones) {
                            Some(zone) => (Some(zone.clone()), Some(AssignmentType::Random)),
                            None => (None, None),
                        },
                        None => (None, None),
                    };
                debug!(
                    activity = %activity_id,
                    origin = %origin,
                    zone = ?assigned_zone.as_ref().map(ZoneId::as_str),
                    ?assignment_type,
                    "work zone"
                );

                assignments.push(WorkAssignment {
                    activity_id: *activity_id,
                    origin_zone: Some(origin.clone()),
                    assigned_zone,
                    assignment_type,
                });
            }
        }

        info!(
            assigned = assignments.iter().filter(|a| a.assigned_zone.is_some()).count(),
            total = assignments.len(),
            "iterative work zone assignment"
        );
        assignments
    }

    /// Picks destinations by minimizing weighted worst-case and total
    /// deviation from observed flows.
    ///
    /// Every observed OD pair gets a deviation, including pairs no activity
    /// can reach. Returns an empty result if no activity has a destination
    /// with observed flow or the solver fails; callers fall back to
    /// [`Self::select_work_zone_iterative`].
    pub fn select_work_zone_optimization(
        &self,
        use_percentages: bool,
        weight_max_dev: f64,
        weight_total_dev: f64,
    ) -> OptimizationResult {
        let mut vars = ProblemVariables::new();

        // (activity, origin, destination) indicators, grouped by activity
        let mut indicators: BTreeMap<ActivityId, Vec<(&ZoneId, &ZoneId, Variable)>> = BTreeMap::new();
        for (activity_id, candidates) in &self.activities_to_assign {
            for (origin, zones) in candidates {
                for zone in zones {
                    if self.actual_flows.contains_key(&(origin.clone(), zone.clone())) {
                        let x = vars.add(variable().binary());
                        indicators.entry(*activity_id).or_default().push((origin, zone, x));
                    }
                }
            }
        }

        if indicators.is_empty() {
            warn!("no work trip has a feasible destination with observed flow, nothing to optimize");
            return OptimizationResult::default();
        }

        let mut routed: HashMap<(&ZoneId, &ZoneId), Vec<Variable>> = HashMap::new();
        for (origin, zone, x) in indicators.values().flatten() {
            routed.entry((*origin, *zone)).or_default().push(*x);
        }

        let pairs: Vec<(&(ZoneId, ZoneId), u32)> = self
            .actual_flows
            .iter()
            .map(|(pair, flow)| (pair, *flow))
            .collect();
        let deviations: Vec<Variable> = pairs.iter().map(|_| vars.add(variable().min(0.0))).collect();
        let max_dev = vars.add(variable().min(0.0));

        let total_dev: Expression = deviations.iter().copied().sum();
        let objective = weight_max_dev * max_dev + weight_total_dev * total_dev;
        let mut model = vars.minimise(objective).using(default_solver);

        for choices in indicators.values() {
            let chosen: Expression = choices.iter().map(|(_, _, x)| *x).sum();
            model.add_constraint(constraint!(chosen == 1));
        }

        for ((pair, flow), dev) in pairs.iter().zip(&deviations) {
            let (origin, destination) = pair;
            let assigned: Expression = routed
                .get(&(origin, destination))
                .into_iter()
                .flatten()
                .copied()
                .sum();

            let (assigned, target) = if use_percentages {
                let scale = match self.total_flows.get(origin) {
                    Some(total) if *total > 0 => 1.0 / f64::from(*total),
                    _ => {
                        warn!(origin = %origin, "origin has no total flow, treating its assigned share as zero");
                        0.0
                    }
                };
                let target = self.percentages.get(*pair).copied().unwrap_or(0.0);
                (assigned * scale, target)
            } else {
                (assigned, f64::from(*flow))
            };

            model.add_constraint(constraint!(assigned.clone() - target <= *dev));
            model.add_constraint(constraint!(assigned + *dev >= target));
            model.add_constraint(constraint!(*dev <= max_dev));
        }

        let solution = match model.solve() {
            Ok(solution) => solution,
            Err(err) => {
                warn!(error = %err, "work zone optimization did not find an optimal solution");
                return OptimizationResult::default();
            }
        };

        let assignments = self
            .activities_to_assign
            .iter()
            .map(|(activity_id, candidates)| {
                let chosen = indicators
                    .get(activity_id)
                    .and_then(|choices| choices.iter().find(|(_, _, x)| solution.value(*x) > 0.5));
                match chosen {
                    Some((origin, zone, _)) => WorkAssignment {
                        activity_id: *activity_id,
                        origin_zone: Some((*origin).clone()),
                        assigned_zone: Some((*zone).clone()),
                        assignment_type: None,
                    },
                    None => WorkAssignment {
                        activity_id: *activity_id,
                        origin_zone: candidates.keys().next().cloned(),
                        assigned_zone: None,
                        assignment_type: None,
                    },
                }
            })
            .collect::<Vec<_>>();

        let result = OptimizationResult {
            assignments,
            max_deviation: solution.value(max_dev),
            total_deviation: deviations.iter().map(|dev| solution.value(*dev)).sum(),
        };
        info!(
            activities = result.assignments.len(),
            max_deviation = result.max_deviation,
            total_deviation = result.total_deviation,
            "optimized work zone assignment"
        );
        result
    }
}

/// Keeps at most `max_zones` candidates per origin, preferring zones with
/// observed flow from that origin. Relative order is otherwise preserved.
pub fn limit_candidates(candidates: &CandidateZones, flows: &OdFlows, max_zones: usize) -> CandidateZones {
    candidates
        .iter()
        .map(|(origin, zones)| {
            let has_flow = |zone: &ZoneId| flows.contains_key(&(origin.clone(), zone.clone()));
            let (observed, rest): (Vec<&ZoneId>, Vec<&ZoneId>) = zones.iter().partition(|zone| has_flow(*zone));
            let limited: Vec<ZoneId> = observed
                .into_iter()
                .chain(rest)
                .take(max_zones)
                .cloned()
                .collect();
            (origin.clone(), limited)
        })
        .collect()
}

/// Root mean squared error between assigned OD counts and observed flows,
/// over every pair that has either.
pub fn flow_rmse(assignments: &[WorkAssignment], actual_flows: &OdFlows) -> f64 {
    let mut assigned: BTreeMap<(ZoneId, ZoneId), u32> = BTreeMap::new();
    for assignment in assignments {
        if let (Some(origin), Some(zone)) = (&assignment.origin_zone, &assignment.assigned_zone) {
            *assigned.entry((origin.clone(), zone.clone())).or_default() += 1;
        }
    }

    let pairs: HashSet<&(ZoneId, ZoneId)> = assigned.keys().chain(actual_flows.keys()).collect();
    if pairs.is_empty() {
        return 0.0;
    }

    let squared: f64 = pairs
        .iter()
        .map(|pair| {
            let a = f64::from(assigned.get(*pair).copied().unwrap_or(0));
            let b = f64::from(actual_flows.get(*pair).copied().unwrap_or(0));
            (a - b).powi(2)
        })
        .sum();
    (squared / pairs.len() as f64).sqrt()
}
