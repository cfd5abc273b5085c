use derive_more::{Constructor, Display, From};
use float_ord::FloatOrd;
use grb::prelude::*;
use itertools::iproduct;
use log::info;

use super::sets_and_parameters::{NodeIndex, Parameters, Sets};
use crate::models::utils::AddVars;
use crate::problem::DEPOT;

/// The decision variables of the arc-flow model. These are the handles the
/// route extractor needs to look up the assignment after a solve.
#[derive(Constructor)]
pub struct Variables {
    /// 1 if the vehicle traverses the arc, 0 otherwise, indexed (arc, vehicle)
    pub x: Vec<Vec<Var>>,
    /// Visit rank of each customer, indexed by node - 1. Only used to rule
    /// out subtours; the extractor never reads these back.
    pub u: Vec<Var>,
}

#[derive(Debug, Display, From)]
pub enum BuildError {
    /// A customer demand that no vehicle can carry. No feasible assignment
    /// exists, so this is rejected before any model is handed to the backend.
    #[display(
        fmt = "demand {} of customer {} exceeds every vehicle capacity (max {})",
        demand,
        customer,
        max_capacity
    )]
    InfeasibleInstance {
        customer: NodeIndex,
        demand: f64,
        max_capacity: f64,
    },
    /// The backend rejected part of the model.
    #[display(fmt = "backend error: {}", _0)]
    #[from]
    Backend(grb::Error),
}

impl std::error::Error for BuildError {}

pub struct ArcFlowSolver {}

impl ArcFlowSolver {
    /// Translate a VRP instance into a MIP over arc decisions: one binary per
    /// (arc, vehicle), plus an integer visit rank per customer.
    pub fn build(sets: &Sets, parameters: &Parameters) -> Result<(Model, Variables), BuildError> {
        Self::validate(sets, parameters)?;

        info!(
            "Building arc-flow model: {} arcs, {} vehicles",
            sets.A.len(),
            sets.V.len()
        );

        let mut model = Model::new("arc_flow")?;
        model.set_param(param::OutputFlag, 0)?;

        // 1 if the vehicle traverses the arc, 0 otherwise
        let x = (sets.A.len(), sets.V.len()).binary(&mut model, "x")?;
        // Visit rank of each customer
        let u = sets
            .C
            .len()
            .int(&mut model, "u", &(1.0..parameters.max_rank as f64))?;

        model.update()?;

        Self::visit_once_constraints(&mut model, sets, &x)?;
        Self::depot_balance_constraints(&mut model, sets, parameters, &x)?;
        Self::flow_conservation_constraints(&mut model, sets, &x)?;
        Self::capacity_constraints(&mut model, sets, parameters, &x)?;
        Self::subtour_elimination_constraints(&mut model, sets, parameters, &x, &u)?;

        let total_cost = iproduct!(0..sets.A.len(), &sets.V)
            .map(|(a, v)| parameters.travel_cost[a] * x[a][*v])
            .grb_sum();
        model.set_objective(total_cost, Minimize)?;

        model.update()?;

        info!("Successfully built arc-flow model");

        Ok((model, Variables::new(x, u)))
    }

    /// Reject instances that cannot have a feasible assignment before any
    /// model is constructed.
    pub fn validate(sets: &Sets, parameters: &Parameters) -> Result<(), BuildError> {
        let max_capacity = parameters
            .capacity
            .iter()
            .copied()
            .map(FloatOrd)
            .max()
            .map(|FloatOrd(q)| q)
            .unwrap_or(0.0);

        for &c in &sets.C {
            if parameters.demand[c] > max_capacity {
                return Err(BuildError::InfeasibleInstance {
                    customer: c,
                    demand: parameters.demand[c],
                    max_capacity,
                });
            }
        }

        Ok(())
    }

    /// Every customer has exactly one predecessor and one successor across
    /// the whole fleet.
    fn visit_once_constraints(model: &mut Model, sets: &Sets, x: &[Vec<Var>]) -> grb::Result<()> {
        for &c in &sets.C {
            let incoming = iproduct!(&sets.Rs[c], &sets.V)
                .map(|(a, v)| x[*a][*v])
                .grb_sum();
            model.add_constr(&format!("visit_in_{c}"), c!(incoming == 1))?;

            let outgoing = iproduct!(&sets.Fs[c], &sets.V)
                .map(|(a, v)| x[*a][*v])
                .grb_sum();
            model.add_constr(&format!("visit_out_{c}"), c!(outgoing == 1))?;
        }

        Ok(())
    }

    /// A vehicle either stays parked or departs the depot and returns exactly
    /// once. With `use_all_vehicles`, parking is not an option.
    fn depot_balance_constraints(
        model: &mut Model,
        sets: &Sets,
        parameters: &Parameters,
        x: &[Vec<Var>],
    ) -> grb::Result<()> {
        for &v in &sets.V {
            let outgoing = sets.Fs[DEPOT].iter().map(|a| x[*a][v]).grb_sum();
            let incoming = sets.Rs[DEPOT].iter().map(|a| x[*a][v]).grb_sum();

            model.add_constr(
                &format!("depot_balance_{v}"),
                c!(outgoing.clone() == incoming),
            )?;

            let departures = match parameters.use_all_vehicles {
                true => c!(outgoing == 1),
                false => c!(outgoing <= 1),
            };
            model.add_constr(&format!("depot_departures_{v}"), departures)?;
        }

        Ok(())
    }

    /// A vehicle that enters a customer also leaves it.
    fn flow_conservation_constraints(
        model: &mut Model,
        sets: &Sets,
        x: &[Vec<Var>],
    ) -> grb::Result<()> {
        for (&c, &v) in iproduct!(&sets.C, &sets.V) {
            let incoming = sets.Rs[c].iter().map(|a| x[*a][v]).grb_sum();
            let outgoing = sets.Fs[c].iter().map(|a| x[*a][v]).grb_sum();
            model.add_constr(&format!("flow_{c}_{v}"), c!(incoming == outgoing))?;
        }

        Ok(())
    }

    /// The total demand served by a vehicle stays within its capacity.
    fn capacity_constraints(
        model: &mut Model,
        sets: &Sets,
        parameters: &Parameters,
        x: &[Vec<Var>],
    ) -> grb::Result<()> {
        for &v in &sets.V {
            let served = sets
                .C
                .iter()
                .flat_map(|&c| sets.Rs[c].iter().map(move |&a| (c, a)))
                .map(|(c, a)| parameters.demand[c] * x[a][v])
                .grb_sum();

            model.add_constr(&format!("capacity_{v}"), c!(served <= parameters.capacity[v]))?;
        }

        Ok(())
    }

    /// The visit rank strictly increases along every traversed arc between
    /// customers, so a cycle that avoids the depot cannot occur. Visit-once
    /// caps each customer-customer arc at one vehicle, which makes the plain
    /// sum over vehicles the aggregated arc indicator.
    fn subtour_elimination_constraints(
        model: &mut Model,
        sets: &Sets,
        parameters: &Parameters,
        x: &[Vec<Var>],
        u: &[Var],
    ) -> grb::Result<()> {
        let max_rank = parameters.max_rank as f64;

        for (a, arc) in sets.A.iter().enumerate() {
            if arc.from() == DEPOT || arc.to() == DEPOT {
                continue;
            }

            let traversed = sets.V.iter().map(|v| max_rank * x[a][*v]).grb_sum();
            // u is indexed by customer position, i.e. node - 1
            let lhs = u[arc.from() - 1] - u[arc.to() - 1] + traversed;

            model.add_constr(
                &format!("rank_{}_{}", arc.from(), arc.to()),
                c!(lhs <= max_rank - 1.0),
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Point, Problem, Vehicle};

    fn parameters_for(demands: Vec<u32>, capacities: Vec<u32>) -> (Sets, Parameters) {
        let locations = (0..=demands.len())
            .map(|i| Point(i as f64, 0.0))
            .collect();
        let vehicles = capacities.into_iter().map(Vehicle::new).collect();
        let problem = Problem::euclidean(locations, demands, vehicles).unwrap();

        let sets = Sets::new(&problem);
        let parameters = Parameters::new(&problem, &sets);
        (sets, parameters)
    }

    #[test]
    fn oversized_demand_is_rejected_before_search() {
        let (sets, parameters) = parameters_for(vec![10], vec![5]);

        let err = ArcFlowSolver::validate(&sets, &parameters).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InfeasibleInstance {
                customer: 1,
                ..
            }
        ));
    }

    #[test]
    fn demand_fitting_some_vehicle_passes_validation() {
        // Only the second vehicle can carry customer 2, which is enough.
        let (sets, parameters) = parameters_for(vec![3, 7], vec![4, 8]);
        assert!(ArcFlowSolver::validate(&sets, &parameters).is_ok());
    }
}
