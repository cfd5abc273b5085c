use vrp_mip::models::arc_flow::model::BuildError;
use vrp_mip::problem::{DistanceMatrix, Point, Problem, Vehicle, DEPOT};
use vrp_mip::search::{OutcomeKind, SearchParams};
use vrp_mip::{solve, SolveError, SolveReport};

/// Checks the properties every solved instance must satisfy: closure,
/// coverage, capacity, and consistency of the recomputed distances with the
/// backend-reported objective.
fn assert_invariants(problem: &Problem, report: &SolveReport) {
    let mut seen = vec![0_usize; problem.locations().len()];

    for route in &report.routes {
        if !route.is_used() {
            continue;
        }

        assert_eq!(*route.stops.first().unwrap(), DEPOT);
        assert_eq!(*route.stops.last().unwrap(), DEPOT);

        for &stop in &route.stops[1..route.stops.len() - 1] {
            seen[stop] += 1;
        }

        let load: u32 = route.stops.iter().map(|&s| problem.demand(s)).sum();
        assert_eq!(load, route.load);
        assert!(load <= problem.vehicles()[route.vehicle].capacity());

        let distance: f64 = route
            .stops
            .windows(2)
            .map(|w| problem.distance(w[0], w[1]))
            .sum();
        assert!((distance - route.distance).abs() < 1e-6);
    }

    for customer in problem.customers() {
        assert_eq!(seen[customer], 1, "customer {} not covered once", customer);
    }

    let total: f64 = report.routes.iter().map(|r| r.distance).sum();
    let objective = report.objective.unwrap();
    assert!((total - objective).abs() <= 1e-6 * total.abs().max(1.0));
}

#[test]
fn three_customers_two_vehicles_is_optimal() {
    // Depot at the origin; two customers east, one north; capacity forces a
    // split into two routes. The optimum serves the east pair together.
    let problem = Problem::euclidean(
        vec![
            Point(0.0, 0.0),
            Point(1.0, 0.0),
            Point(2.0, 0.0),
            Point(0.0, 2.0),
        ],
        vec![2, 2, 3],
        vec![Vehicle::new(5), Vehicle::new(5)],
    )
    .unwrap();

    let report = solve(&problem, &SearchParams::default()).unwrap();

    assert_eq!(report.outcome, OutcomeKind::Optimal);
    assert_invariants(&problem, &report);
    assert!((report.total_distance.unwrap() - 8.0).abs() < 1e-6);
}

#[test]
fn oversized_demand_fails_before_search() {
    let problem = Problem::euclidean(
        vec![Point(0.0, 0.0), Point(1.0, 0.0)],
        vec![10],
        vec![Vehicle::new(5)],
    )
    .unwrap();

    let err = solve(&problem, &SearchParams::default()).unwrap_err();
    assert!(matches!(
        err,
        SolveError::Build(BuildError::InfeasibleInstance { customer: 1, .. })
    ));
}

#[test]
fn fleet_too_small_is_proven_infeasible() {
    // Each demand fits the vehicle, but their sum does not, and there is
    // only one vehicle. The backend has to prove infeasibility.
    let problem = Problem::euclidean(
        vec![Point(0.0, 0.0), Point(1.0, 0.0), Point(0.0, 1.0)],
        vec![3, 3],
        vec![Vehicle::new(4)],
    )
    .unwrap();

    let report = solve(&problem, &SearchParams::default()).unwrap();

    assert_eq!(report.outcome, OutcomeKind::Infeasible);
    assert!(report.routes.is_empty());
    assert!(report.objective.is_none());
    assert!(report.total_distance.is_none());
}

#[test]
fn repeated_solves_reach_the_same_objective() {
    let problem = Problem::euclidean(
        vec![
            Point(0.0, 0.0),
            Point(0.0, 1.0),
            Point(1.0, 1.0),
            Point(1.0, 0.0),
        ],
        vec![2, 2, 2],
        vec![Vehicle::new(4), Vehicle::new(4)],
    )
    .unwrap();

    let first = solve(&problem, &SearchParams::default()).unwrap();
    let second = solve(&problem, &SearchParams::default()).unwrap();

    assert_eq!(first.outcome, OutcomeKind::Optimal);
    assert_eq!(second.outcome, OutcomeKind::Optimal);
    assert!((first.objective.unwrap() - second.objective.unwrap()).abs() < 1e-6);
}

#[test]
fn all_vehicles_mode_uses_the_whole_fleet() {
    let locations = vec![
        Point(0.0, 0.0),
        Point(1.0, 0.0),
        Point(0.0, 1.0),
        Point(-1.0, 0.0),
    ];
    let distances = DistanceMatrix::euclidean(&locations);
    let problem = Problem::new(
        locations,
        vec![1, 1, 1],
        vec![Vehicle::new(10), Vehicle::new(10), Vehicle::new(10)],
        distances,
        true,
    )
    .unwrap();

    let report = solve(&problem, &SearchParams::default()).unwrap();

    assert_eq!(report.outcome, OutcomeKind::Optimal);
    assert!(report.routes.iter().all(|r| r.is_used()));
    assert_invariants(&problem, &report);
}

#[test]
fn asymmetric_distances_pick_the_cheap_orientation() {
    // Going clockwise costs 1 per arc, counter-clockwise 10. The optimal
    // tour must follow the cheap direction.
    let locations = vec![Point(0.0, 0.0), Point(1.0, 0.0), Point(0.0, 1.0)];
    let distances = DistanceMatrix::from_rows(vec![
        vec![0.0, 1.0, 10.0],
        vec![10.0, 0.0, 1.0],
        vec![1.0, 10.0, 0.0],
    ])
    .unwrap();
    let problem = Problem::new(
        locations,
        vec![1, 1],
        vec![Vehicle::new(5)],
        distances,
        false,
    )
    .unwrap();

    let report = solve(&problem, &SearchParams::default()).unwrap();

    assert_eq!(report.outcome, OutcomeKind::Optimal);
    assert_invariants(&problem, &report);
    assert!((report.total_distance.unwrap() - 3.0).abs() < 1e-6);
    assert_eq!(report.routes[0].stops, vec![0, 1, 2, 0]);
}

#[test]
fn larger_instance_satisfies_all_invariants() {
    let problem = Problem::euclidean(
        vec![
            Point(0.0, 0.0),
            Point(4.0, 1.0),
            Point(3.0, -2.0),
            Point(-1.0, 4.0),
            Point(-3.0, -3.0),
            Point(2.0, 5.0),
            Point(5.0, -4.0),
            Point(-4.0, 2.0),
            Point(1.0, -5.0),
        ],
        vec![3, 2, 4, 5, 1, 3, 2, 4],
        vec![Vehicle::new(9), Vehicle::new(9), Vehicle::new(9)],
    )
    .unwrap();

    let report = solve(&problem, &SearchParams::default()).unwrap();

    assert_eq!(report.outcome, OutcomeKind::Optimal);
    assert_invariants(&problem, &report);
}
