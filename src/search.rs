use grb::prelude::*;
use grb::Status;
use log::info;
use serde::Serialize;

use crate::models::arc_flow::model::Variables;
use crate::models::utils::ConvertVars;

/// Budget and termination parameters for one invocation of the backend
/// search.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Wall-clock budget for the search, in seconds
    pub time_limit: f64,
    /// Relative optimality gap at which the search may stop early
    pub mip_gap: Option<f64>,
    /// Number of parallel workers the backend may use
    pub threads: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            time_limit: 10.0,
            mip_gap: None,
            threads: 8,
        }
    }
}

/// How a search terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

/// The values bound to the arc decision variables, read back from the
/// backend once and treated as plain data from there on.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Value of x, indexed (arc, vehicle)
    pub x: Vec<Vec<f64>>,
}

/// The result of one search: the termination tag plus, when a solution
/// exists, the objective and variable assignment as reported by the backend.
#[derive(Debug)]
pub enum Outcome {
    /// Proven optimal assignment
    Optimal { objective: f64, assignment: Assignment },
    /// An incumbent found within the budget; optimality not proven
    Feasible { objective: f64, assignment: Assignment },
    /// The backend proved that no feasible assignment exists
    Infeasible,
    /// Budget exhausted with no conclusion
    Unknown,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Optimal { .. } => OutcomeKind::Optimal,
            Outcome::Feasible { .. } => OutcomeKind::Feasible,
            Outcome::Infeasible => OutcomeKind::Infeasible,
            Outcome::Unknown => OutcomeKind::Unknown,
        }
    }
}

/// Drive the backend over a built model within the given budget. No decoding
/// happens here; the assignment is exposed unmodified.
pub fn run(
    model: &mut Model,
    variables: &Variables,
    params: &SearchParams,
) -> grb::Result<Outcome> {
    model.set_param(param::TimeLimit, params.time_limit)?;
    model.set_param(param::Threads, params.threads as i32)?;
    if let Some(gap) = params.mip_gap {
        model.set_param(param::MIPGap, gap)?;
    }

    info!("Starting search with a {}s budget", params.time_limit);
    model.optimize()?;

    let status = model.status()?;
    let solutions = model.get_attr(attr::SolCount)?;
    info!("Search terminated: {:?}, {} solution(s)", status, solutions);

    let kind = classify(status, solutions);
    let outcome = match kind {
        OutcomeKind::Optimal | OutcomeKind::Feasible => {
            let objective = model.get_attr(attr::ObjVal)?;
            let assignment = Assignment {
                x: variables.x.convert(model)?,
            };

            match kind {
                OutcomeKind::Optimal => Outcome::Optimal {
                    objective,
                    assignment,
                },
                _ => Outcome::Feasible {
                    objective,
                    assignment,
                },
            }
        }
        OutcomeKind::Infeasible => Outcome::Infeasible,
        OutcomeKind::Unknown => Outcome::Unknown,
    };

    Ok(outcome)
}

/// Map the backend's termination status to the outcome taxonomy. Any budget
/// cutoff with an incumbent counts as feasible; without one it is unknown.
pub fn classify(status: Status, solutions: i32) -> OutcomeKind {
    match status {
        Status::Optimal => OutcomeKind::Optimal,
        Status::Infeasible | Status::InfOrUnbd => OutcomeKind::Infeasible,
        _ if solutions > 0 => OutcomeKind::Feasible,
        _ => OutcomeKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(classify(Status::Optimal, 1), OutcomeKind::Optimal);
        assert_eq!(classify(Status::Infeasible, 0), OutcomeKind::Infeasible);
        assert_eq!(classify(Status::InfOrUnbd, 0), OutcomeKind::Infeasible);
        assert_eq!(classify(Status::TimeLimit, 2), OutcomeKind::Feasible);
        assert_eq!(classify(Status::TimeLimit, 0), OutcomeKind::Unknown);
        assert_eq!(classify(Status::Interrupted, 0), OutcomeKind::Unknown);
    }
}
