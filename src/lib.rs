//! Exact solver for the capacitated vehicle routing problem: a fleet of
//! capacity-limited vehicles must visit every customer exactly once, at
//! minimum total travel distance. The problem is encoded as a MIP over arc
//! decision variables, handed to the backend, and the resulting assignment
//! is decoded into validated per-vehicle routes.

pub mod models;
pub mod problem;
pub mod search;
pub mod solution;

use derive_more::{Display, From};
use log::{info, warn};
use serde::Serialize;

use models::arc_flow::model::{ArcFlowSolver, BuildError};
use models::arc_flow::sets_and_parameters::{Parameters, Sets};
use problem::{Distance, Problem};
use search::{Outcome, OutcomeKind, SearchParams};
use solution::{ExtractError, Route};

/// Any failure of the build, search, extract pipeline. Search outcomes such
/// as `Infeasible` and `Unknown` are not errors; they are reported in the
/// [`SolveReport`].
#[derive(Debug, Display, From)]
pub enum SolveError {
    /// The instance was rejected before any search was invoked
    Build(BuildError),
    /// The backend failed while searching
    Search(grb::Error),
    /// The solved assignment failed a post-solve integrity check
    Extract(ExtractError),
}

impl std::error::Error for SolveError {}

/// What the caller, and ultimately the plotting collaborator, receives for
/// one solve. `Infeasible` and `Unknown` outcomes carry no routes.
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    /// How the search terminated
    pub outcome: OutcomeKind,
    /// The backend-reported objective, when a solution exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
    /// One route per vehicle, in fleet order
    pub routes: Vec<Route>,
    /// Total distance recomputed from the distance matrix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<Distance>,
}

/// Solve one VRP instance end to end: build the arc-flow model, drive the
/// backend within the given budget, and decode the assignment into validated
/// routes. Each call owns a fresh model, which is released on return.
pub fn solve(problem: &Problem, params: &SearchParams) -> Result<SolveReport, SolveError> {
    let sets = Sets::new(problem);
    let parameters = Parameters::new(problem, &sets);

    let (mut model, variables) = ArcFlowSolver::build(&sets, &parameters)?;
    let outcome = search::run(&mut model, &variables, params)?;

    let kind = outcome.kind();
    match outcome {
        Outcome::Optimal {
            objective,
            assignment,
        }
        | Outcome::Feasible {
            objective,
            assignment,
        } => {
            let solution = solution::extract(problem, &sets, &assignment, objective)?;
            info!(
                "Solve finished: {:?}, total distance {}",
                kind, solution.total_distance
            );

            Ok(SolveReport {
                outcome: kind,
                objective: Some(objective),
                routes: solution.routes,
                total_distance: Some(solution.total_distance),
            })
        }
        Outcome::Infeasible | Outcome::Unknown => {
            warn!("Search ended without a usable assignment: {:?}", kind);

            Ok(SolveReport {
                outcome: kind,
                objective: None,
                routes: Vec::new(),
                total_distance: None,
            })
        }
    }
}
