use derive_more::Display;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A point in Euclidean 2d-space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point(pub f64, pub f64);

impl Point {
    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> Distance {
        (self.0 - other.0).hypot(self.1 - other.1)
    }
}

/// The type used for distance
pub type Distance = f64;
/// The type used for demand and vehicle capacity
pub type Load = u32;

pub type LocationId = usize;
pub type VehicleIndex = usize;

/// The location identifier reserved for the depot.
pub const DEPOT: LocationId = 0;

/// A capacity-limited vehicle. The fleet is an ordered sequence of these,
/// fixed for the life of one solve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vehicle {
    /// The maximum total demand this vehicle can carry
    capacity: Load,
}

impl Vehicle {
    pub fn new(capacity: Load) -> Self {
        Self { capacity }
    }

    /// The maximum total demand this vehicle can carry
    pub fn capacity(&self) -> Load {
        self.capacity
    }
}

/// Travel cost between every ordered pair of locations. Non-negative and
/// square, but not necessarily symmetric.
#[derive(Debug, Clone)]
pub struct DistanceMatrix(Array2<Distance>);

impl DistanceMatrix {
    /// Derive a matrix of Euclidean distances from location coordinates.
    pub fn euclidean(locations: &[Point]) -> Self {
        let n = locations.len();
        Self(Array2::from_shape_fn((n, n), |(i, j)| {
            locations[i].distance_to(&locations[j])
        }))
    }

    /// Use an explicitly given matrix, e.g. read from an instance file.
    pub fn from_rows(rows: Vec<Vec<Distance>>) -> Result<Self, ProblemConstructionError> {
        let n = rows.len();
        for (from, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ProblemConstructionError::DistanceSizeMismatch {
                    expected: (n, n),
                    actual: (n, row.len()),
                });
            }

            for (to, &d) in row.iter().enumerate() {
                if !d.is_finite() || d < 0.0 {
                    return Err(ProblemConstructionError::InvalidDistance { from, to, value: d });
                }
            }
        }

        let mut matrix = Array2::zeros((n, n));
        for (from, row) in rows.into_iter().enumerate() {
            for (to, d) in row.into_iter().enumerate() {
                matrix[(from, to)] = d;
            }
        }

        Ok(Self(matrix))
    }

    /// The number of locations covered by this matrix
    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.0.nrows() == 0
    }

    /// The travel cost of the directed arc `from -> to`
    pub fn get(&self, from: LocationId, to: LocationId) -> Distance {
        self.0[(from, to)]
    }
}

#[derive(Debug, Display)]
pub enum ProblemConstructionError {
    /// There must be at least one customer in addition to the depot.
    #[display(fmt = "the problem has no customer locations")]
    NoCustomers,
    /// There must be at least one vehicle.
    #[display(fmt = "the problem has no vehicles")]
    NoVehicles,
    /// The number of demands must match the number of customers.
    #[display(fmt = "expected {} demands (one per customer), got {}", expected, actual)]
    DemandSizeMismatch { expected: usize, actual: usize },
    /// The size of the distance matrix is not as expected.
    #[display(fmt = "expected a {:?} distance matrix, got {:?}", expected, actual)]
    DistanceSizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Distances must be non-negative and finite.
    #[display(fmt = "invalid distance {} for arc ({}, {})", value, from, to)]
    InvalidDistance {
        from: LocationId,
        to: LocationId,
        value: Distance,
    },
}

impl std::error::Error for ProblemConstructionError {}

/// A single capacitated VRP instance: a depot, customers with demands, a
/// fleet, and travel costs. Read-only for the duration of a solve.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Coordinates of every location. Index 0 is the depot.
    locations: Vec<Point>,
    /// Demand per location, with a zero entry for the depot.
    demands: Vec<Load>,
    /// The fleet, ordered by vehicle index.
    vehicles: Vec<Vehicle>,
    /// Travel cost between every ordered pair of locations.
    distances: DistanceMatrix,
    /// Whether every vehicle must depart the depot, rather than at most once.
    use_all_vehicles: bool,
}

impl Problem {
    /// Construct a validated problem. `demands` holds one entry per customer,
    /// i.e. for `locations[1..]`.
    pub fn new(
        locations: Vec<Point>,
        demands: Vec<Load>,
        vehicles: Vec<Vehicle>,
        distances: DistanceMatrix,
        use_all_vehicles: bool,
    ) -> Result<Problem, ProblemConstructionError> {
        let n = locations.len();

        if n < 2 {
            return Err(ProblemConstructionError::NoCustomers);
        }

        if vehicles.is_empty() {
            return Err(ProblemConstructionError::NoVehicles);
        }

        if demands.len() != n - 1 {
            return Err(ProblemConstructionError::DemandSizeMismatch {
                expected: n - 1,
                actual: demands.len(),
            });
        }

        if distances.len() != n {
            return Err(ProblemConstructionError::DistanceSizeMismatch {
                expected: (n, n),
                actual: (distances.len(), distances.len()),
            });
        }

        // Store demands per location, so that lookups don't need to shift
        // around the depot.
        let mut per_location = Vec::with_capacity(n);
        per_location.push(0);
        per_location.extend(demands);

        Ok(Problem {
            locations,
            demands: per_location,
            vehicles,
            distances,
            use_all_vehicles,
        })
    }

    /// Construct a problem whose distances are Euclidean, derived from the
    /// location coordinates.
    pub fn euclidean(
        locations: Vec<Point>,
        demands: Vec<Load>,
        vehicles: Vec<Vehicle>,
    ) -> Result<Problem, ProblemConstructionError> {
        let distances = DistanceMatrix::euclidean(&locations);
        Self::new(locations, demands, vehicles, distances, false)
    }

    /// Coordinates of every location. Index 0 is the depot.
    pub fn locations(&self) -> &[Point] {
        &self.locations
    }

    /// The customer location identifiers, i.e. everything except the depot.
    pub fn customers(&self) -> impl Iterator<Item = LocationId> {
        1..self.locations.len()
    }

    /// The demand of a location. Zero for the depot.
    pub fn demand(&self, location: LocationId) -> Load {
        self.demands[location]
    }

    /// The fleet, ordered by vehicle index (continuous, starting at 0)
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// The travel cost of the directed arc `from -> to`
    pub fn distance(&self, from: LocationId, to: LocationId) -> Distance {
        self.distances.get(from, to)
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Whether every vehicle must depart the depot exactly once, rather than
    /// at most once.
    pub fn use_all_vehicles(&self) -> bool {
        self.use_all_vehicles
    }
}

/// The on-disk instance format consumed from the config/CLI collaborator.
/// `demands` holds one entry per customer (i.e. for `locations[1..]`), and
/// `distances` optionally overrides the Euclidean matrix derived from the
/// coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub locations: Vec<Point>,
    pub demands: Vec<Load>,
    /// Capacity per vehicle.
    pub vehicles: Vec<Load>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distances: Option<Vec<Vec<Distance>>>,
    #[serde(default)]
    pub use_all_vehicles: bool,
}

impl TryFrom<Instance> for Problem {
    type Error = ProblemConstructionError;

    fn try_from(instance: Instance) -> Result<Self, Self::Error> {
        let distances = match instance.distances {
            Some(rows) => DistanceMatrix::from_rows(rows)?,
            None => DistanceMatrix::euclidean(&instance.locations),
        };

        let vehicles = instance.vehicles.into_iter().map(Vehicle::new).collect();

        Problem::new(
            instance.locations,
            instance.demands,
            vehicles,
            distances,
            instance.use_all_vehicles,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point(0.0, 0.0),
            Point(0.0, 1.0),
            Point(1.0, 1.0),
            Point(1.0, 0.0),
        ]
    }

    #[test]
    fn euclidean_distances() {
        let matrix = DistanceMatrix::euclidean(&square());
        assert_eq!(matrix.get(0, 1), 1.0);
        assert_eq!(matrix.get(1, 3), std::f64::consts::SQRT_2);
        assert_eq!(matrix.get(2, 2), 0.0);
    }

    #[test]
    fn depot_has_zero_demand() {
        let problem = Problem::euclidean(square(), vec![2, 3, 4], vec![Vehicle::new(10)]).unwrap();
        assert_eq!(problem.demand(DEPOT), 0);
        assert_eq!(problem.demand(1), 2);
        assert_eq!(problem.demand(3), 4);
        assert_eq!(problem.customers().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn demand_count_must_match_customers() {
        let result = Problem::euclidean(square(), vec![2, 3], vec![Vehicle::new(10)]);
        assert!(matches!(
            result,
            Err(ProblemConstructionError::DemandSizeMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn at_least_one_customer_and_vehicle() {
        let depot_only = vec![Point(0.0, 0.0)];
        assert!(matches!(
            Problem::euclidean(depot_only, vec![], vec![Vehicle::new(1)]),
            Err(ProblemConstructionError::NoCustomers)
        ));

        assert!(matches!(
            Problem::euclidean(square(), vec![1, 1, 1], vec![]),
            Err(ProblemConstructionError::NoVehicles)
        ));
    }

    #[test]
    fn explicit_matrix_must_be_square_and_non_negative() {
        assert!(matches!(
            DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]),
            Err(ProblemConstructionError::DistanceSizeMismatch { .. })
        ));

        assert!(matches!(
            DistanceMatrix::from_rows(vec![vec![0.0, -1.0], vec![1.0, 0.0]]),
            Err(ProblemConstructionError::InvalidDistance { from: 0, to: 1, .. })
        ));
    }

    #[test]
    fn explicit_matrix_may_be_asymmetric() {
        let matrix = DistanceMatrix::from_rows(vec![vec![0.0, 2.0], vec![5.0, 0.0]]).unwrap();
        assert_eq!(matrix.get(0, 1), 2.0);
        assert_eq!(matrix.get(1, 0), 5.0);
    }

    #[test]
    fn instance_roundtrip() {
        let instance = Instance {
            locations: square(),
            demands: vec![1, 2, 3],
            vehicles: vec![4, 4],
            distances: None,
            use_all_vehicles: false,
        };

        let problem = Problem::try_from(instance).unwrap();
        assert_eq!(problem.vehicles().len(), 2);
        assert_eq!(problem.vehicles()[0].capacity(), 4);
        assert_eq!(problem.distance(0, 2), std::f64::consts::SQRT_2);
    }
}
