use itertools::iproduct;
use log::trace;

use crate::problem::{LocationId, Problem, VehicleIndex};

pub type ArcIndex = usize;
pub type NodeIndex = LocationId;

/// A directed arc between two distinct locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    from: NodeIndex,
    to: NodeIndex,
}

impl Arc {
    pub fn new(from: NodeIndex, to: NodeIndex) -> Arc {
        Arc { from, to }
    }

    pub fn from(&self) -> NodeIndex {
        self.from
    }

    pub fn to(&self) -> NodeIndex {
        self.to
    }
}

#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of all nodes, depot first
    pub N: Vec<NodeIndex>,
    /// Set of customer nodes
    pub C: Vec<NodeIndex>,
    /// Set of vehicles
    pub V: Vec<VehicleIndex>,
    /// Set of all directed arcs between distinct nodes
    pub A: Vec<Arc>,
    /// Outgoing arc indices per node (forward star)
    pub Fs: Vec<Vec<ArcIndex>>,
    /// Incoming arc indices per node (reverse star)
    pub Rs: Vec<Vec<ArcIndex>>,
}

#[allow(non_snake_case)]
impl Sets {
    pub fn new(problem: &Problem) -> Sets {
        let n = problem.locations().len();

        let N: Vec<NodeIndex> = (0..n).collect();
        let C: Vec<NodeIndex> = problem.customers().collect();
        let V: Vec<VehicleIndex> = (0..problem.vehicles().len()).collect();

        let A: Vec<Arc> = iproduct!(0..n, 0..n)
            .filter(|(i, j)| i != j)
            .map(|(i, j)| Arc::new(i, j))
            .collect();

        let mut Fs: Vec<Vec<ArcIndex>> = vec![Vec::with_capacity(n - 1); n];
        let mut Rs: Vec<Vec<ArcIndex>> = vec![Vec::with_capacity(n - 1); n];
        for (a, arc) in A.iter().enumerate() {
            Fs[arc.from()].push(a);
            Rs[arc.to()].push(a);
        }

        trace!(
            "Sets: {} nodes, {} customers, {} vehicles, {} arcs",
            N.len(),
            C.len(),
            V.len(),
            A.len()
        );

        Sets { N, C, V, A, Fs, Rs }
    }

    /// The arc index of `from -> to`, if the arc exists (i.e. `from != to`).
    pub fn arc_between(&self, from: NodeIndex, to: NodeIndex) -> Option<ArcIndex> {
        self.Fs[from]
            .iter()
            .copied()
            .find(|&a| self.A[a].to() == to)
    }
}

#[allow(non_snake_case)]
pub struct Parameters {
    /// Travel cost of arc a
    pub travel_cost: Vec<f64>,
    /// Demand of node i, zero for the depot
    pub demand: Vec<f64>,
    /// Capacity of vehicle v
    pub capacity: Vec<f64>,
    /// Upper bound on the visit rank of a customer, i.e. the customer count
    pub max_rank: usize,
    /// Whether every vehicle must depart the depot exactly once
    pub use_all_vehicles: bool,
}

impl Parameters {
    pub fn new(problem: &Problem, sets: &Sets) -> Parameters {
        let travel_cost = sets
            .A
            .iter()
            .map(|arc| problem.distance(arc.from(), arc.to()))
            .collect();

        let demand = sets
            .N
            .iter()
            .map(|&i| problem.demand(i) as f64)
            .collect();

        let capacity = problem
            .vehicles()
            .iter()
            .map(|v| v.capacity() as f64)
            .collect();

        Parameters {
            travel_cost,
            demand,
            capacity,
            max_rank: sets.C.len(),
            use_all_vehicles: problem.use_all_vehicles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Point, Vehicle, DEPOT};

    fn line_problem() -> Problem {
        let locations = vec![Point(0.0, 0.0), Point(1.0, 0.0), Point(2.0, 0.0)];
        Problem::euclidean(locations, vec![1, 2], vec![Vehicle::new(3), Vehicle::new(4)]).unwrap()
    }

    #[test]
    fn arcs_exclude_self_loops() {
        let problem = line_problem();
        let sets = Sets::new(&problem);

        let n = sets.N.len();
        assert_eq!(sets.A.len(), n * (n - 1));
        assert!(sets.A.iter().all(|arc| arc.from() != arc.to()));
    }

    #[test]
    fn stars_are_consistent_with_arcs() {
        let problem = line_problem();
        let sets = Sets::new(&problem);

        for (node, outgoing) in sets.Fs.iter().enumerate() {
            assert_eq!(outgoing.len(), sets.N.len() - 1);
            assert!(outgoing.iter().all(|&a| sets.A[a].from() == node));
        }

        for (node, incoming) in sets.Rs.iter().enumerate() {
            assert_eq!(incoming.len(), sets.N.len() - 1);
            assert!(incoming.iter().all(|&a| sets.A[a].to() == node));
        }
    }

    #[test]
    fn arc_lookup() {
        let problem = line_problem();
        let sets = Sets::new(&problem);

        let a = sets.arc_between(1, 2).unwrap();
        assert_eq!(sets.A[a], Arc::new(1, 2));
        assert_eq!(sets.arc_between(2, 2), None);
    }

    #[test]
    fn parameters_follow_the_problem() {
        let problem = line_problem();
        let sets = Sets::new(&problem);
        let parameters = Parameters::new(&problem, &sets);

        let a = sets.arc_between(DEPOT, 2).unwrap();
        assert_eq!(parameters.travel_cost[a], 2.0);
        assert_eq!(parameters.demand, vec![0.0, 1.0, 2.0]);
        assert_eq!(parameters.capacity, vec![3.0, 4.0]);
        assert_eq!(parameters.max_rank, 2);
    }
}
