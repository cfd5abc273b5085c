use derive_more::Display;
use log::debug;
use serde::Serialize;

use crate::models::arc_flow::sets_and_parameters::{NodeIndex, Sets};
use crate::problem::{Distance, Load, LocationId, Problem, VehicleIndex, DEPOT};
use crate::search::Assignment;

/// Relative tolerance when cross-checking the recomputed total distance
/// against the backend-reported objective.
const RELATIVE_TOLERANCE: f64 = 1e-6;

/// An arc value above this counts as traversed.
const ACTIVE: f64 = 0.5;

/// One vehicle's route: the visited locations bookended by the depot, plus
/// the realized load and travel distance. An unused vehicle has no stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub vehicle: VehicleIndex,
    pub stops: Vec<LocationId>,
    pub load: Load,
    pub distance: Distance,
}

impl Route {
    pub fn is_used(&self) -> bool {
        !self.stops.is_empty()
    }
}

/// The decoded result of a solve: one route per vehicle, in fleet order, and
/// the total distance recomputed from the distance matrix.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub routes: Vec<Route>,
    pub total_distance: Distance,
}

/// The ways a single vehicle's arc values can fail to describe a tour.
#[derive(Debug, Display)]
pub enum Malformation {
    /// A node with more than one active outgoing arc
    #[display(fmt = "multiple active outgoing arcs at node {}", _0)]
    MultipleSuccessors(NodeIndex),
    /// A node was entered but never left
    #[display(fmt = "no active outgoing arc at node {}", _0)]
    DeadEnd(NodeIndex),
    /// The walk did not return to the depot within the step bound
    #[display(fmt = "no return to the depot within {} steps", _0)]
    MissedDepotReturn(usize),
}

/// Post-solve integrity failures. These indicate a model defect or a backend
/// numerical artifact and are never silently repaired.
#[derive(Debug, Display)]
pub enum ExtractError {
    #[display(fmt = "malformed assignment for vehicle {}: {}", vehicle, kind)]
    MalformedAssignment {
        vehicle: VehicleIndex,
        kind: Malformation,
    },
    #[display(fmt = "customer {} is visited {} times", customer, visits)]
    InvariantViolation { customer: LocationId, visits: usize },
    #[display(
        fmt = "recomputed distance {} disagrees with the reported objective {}",
        recomputed,
        reported
    )]
    ConsistencyError { reported: f64, recomputed: f64 },
}

impl std::error::Error for ExtractError {}

/// Decode a solved arc assignment into validated routes.
///
/// Only the registered arc variables are consulted; auxiliary variables in
/// the assignment (e.g. visit ranks) are ignored. The recomputed total
/// distance is cross-checked against the objective the backend reported.
pub fn extract(
    problem: &Problem,
    sets: &Sets,
    assignment: &Assignment,
    objective: f64,
) -> Result<Solution, ExtractError> {
    let mut visits = vec![0_usize; sets.N.len()];
    let mut routes = Vec::with_capacity(sets.V.len());

    for &v in &sets.V {
        let route = follow_route(problem, sets, assignment, v, &mut visits)?;
        debug!(
            "Vehicle {}: {} stops, load {}, distance {}",
            v,
            route.stops.len(),
            route.load,
            route.distance
        );
        routes.push(route);
    }

    for c in problem.customers() {
        if visits[c] != 1 {
            return Err(ExtractError::InvariantViolation {
                customer: c,
                visits: visits[c],
            });
        }
    }

    let total_distance: Distance = routes.iter().map(|r| r.distance).sum();
    let tolerance = RELATIVE_TOLERANCE * total_distance.abs().max(1.0);
    if (total_distance - objective).abs() > tolerance {
        return Err(ExtractError::ConsistencyError {
            reported: objective,
            recomputed: total_distance,
        });
    }

    Ok(Solution {
        routes,
        total_distance,
    })
}

/// Walk one vehicle's tour: from the depot, repeatedly follow the unique
/// active outgoing arc until the depot is reached again.
fn follow_route(
    problem: &Problem,
    sets: &Sets,
    assignment: &Assignment,
    vehicle: VehicleIndex,
    visits: &mut [usize],
) -> Result<Route, ExtractError> {
    let n = sets.N.len();
    let malformed = |kind| ExtractError::MalformedAssignment { vehicle, kind };

    let mut successor: Vec<Option<NodeIndex>> = vec![None; n];
    for (a, arc) in sets.A.iter().enumerate() {
        if assignment.x[a][vehicle] > ACTIVE
            && successor[arc.from()].replace(arc.to()).is_some()
        {
            return Err(malformed(Malformation::MultipleSuccessors(arc.from())));
        }
    }

    // No departure from the depot: the vehicle is unused.
    if successor[DEPOT].is_none() {
        return Ok(Route {
            vehicle,
            stops: Vec::new(),
            load: 0,
            distance: 0.0,
        });
    }

    let mut stops = vec![DEPOT];
    let mut current = DEPOT;
    let mut load: Load = 0;
    let mut distance: Distance = 0.0;
    let mut steps = 0;

    loop {
        let next = successor[current].ok_or_else(|| malformed(Malformation::DeadEnd(current)))?;

        steps += 1;
        if steps > n {
            return Err(malformed(Malformation::MissedDepotReturn(steps)));
        }

        distance += problem.distance(current, next);
        load += problem.demand(next);
        stops.push(next);
        current = next;

        if current == DEPOT {
            break;
        }

        visits[current] += 1;
    }

    Ok(Route {
        vehicle,
        stops,
        load,
        distance,
    })
}
