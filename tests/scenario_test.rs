//! End-to-end routing scenarios on the demo-sized grid.

use grid_replanning::{GridPathPlanner, PlanError};
use grid_util::point::Point;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The demo disaster layout on the 15x15 grid.
const DISASTERS: [(i32, i32); 7] = [(5, 5), (5, 6), (6, 5), (6, 6), (7, 7), (4, 9), (5, 9)];

fn demo_planner() -> GridPathPlanner {
    let mut planner = GridPathPlanner::default();
    for (x, y) in DISASTERS {
        planner.set_obstacle(Point::new(x, y)).unwrap();
    }
    planner
}

fn assert_valid_route(planner: &GridPathPlanner, route: &[Point], start: Point, goal: Point) {
    assert_eq!(route[0], start);
    assert_eq!(*route.last().unwrap(), goal);
    for pair in route.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        assert_ne!(a, b);
        assert!(
            (a.x - b.x).abs() <= 1 && (a.y - b.y).abs() <= 1,
            "{} and {} are not adjacent",
            a,
            b
        );
    }
    for cell in route {
        assert!(!planner.is_blocked(*cell), "route crosses obstacle at {}", cell);
    }
}

#[test]
fn emergency_route_avoids_disasters() {
    let mut planner = demo_planner();
    let start = Point::new(2, 2);
    let goal = Point::new(12, 12);
    planner.set_start(start).unwrap();
    planner.set_goal(goal).unwrap();
    let route = planner.compute_path().unwrap();
    assert!(route.len() <= 100);
    assert_valid_route(&planner, &route, start, goal);
}

#[test]
fn missing_endpoints_are_reported() {
    let mut planner = demo_planner();
    assert_eq!(planner.compute_path(), Err(PlanError::GoalUnset));
    planner.set_goal(Point::new(12, 12)).unwrap();
    assert_eq!(planner.compute_path(), Err(PlanError::StartUnset));
}

#[test]
fn repeated_calls_return_identical_routes() {
    let mut planner = demo_planner();
    planner.set_start(Point::new(2, 2)).unwrap();
    planner.set_goal(Point::new(12, 12)).unwrap();
    let first = planner.compute_path().unwrap();
    let second = planner.compute_path().unwrap();
    assert_eq!(first, second);
}

#[test]
fn start_equals_goal_yields_single_cell_route() {
    let mut planner = demo_planner();
    planner.set_start(Point::new(3, 3)).unwrap();
    planner.set_goal(Point::new(3, 3)).unwrap();
    assert_eq!(planner.compute_path(), Ok(vec![Point::new(3, 3)]));
}

#[test]
fn single_cell_grid() {
    let mut planner = GridPathPlanner::new(1, 1);
    planner.set_start(Point::new(0, 0)).unwrap();
    planner.set_goal(Point::new(0, 0)).unwrap();
    assert_eq!(planner.compute_path(), Ok(vec![Point::new(0, 0)]));
}

#[test]
fn enclosed_goal_reports_no_path() {
    let mut planner = GridPathPlanner::default();
    let start = Point::new(2, 2);
    let goal = Point::new(7, 7);
    planner.set_start(start).unwrap();
    planner.set_goal(goal).unwrap();
    for neighbour in goal.moore_neighborhood() {
        planner.set_obstacle(neighbour).unwrap();
    }
    match planner.compute_path() {
        Err(PlanError::NoPath { partial }) => {
            assert_eq!(partial[0], start);
            assert!(!partial.contains(&goal));
        }
        other => panic!("expected NoPath, got {:?}", other),
    }
}

#[test]
fn clearing_the_enclosure_restores_the_route() {
    let mut planner = GridPathPlanner::default();
    let start = Point::new(2, 2);
    let goal = Point::new(7, 7);
    planner.set_start(start).unwrap();
    planner.set_goal(goal).unwrap();
    for neighbour in goal.moore_neighborhood() {
        planner.set_obstacle(neighbour).unwrap();
    }
    assert!(planner.compute_path().is_err());
    planner.clear_obstacle(Point::new(6, 6)).unwrap();
    let route = planner.compute_path().unwrap();
    assert_valid_route(&planner, &route, start, goal);
}

#[test]
fn replanning_survives_a_disaster_series() {
    let mut planner = demo_planner();
    let start = Point::new(2, 2);
    let goal = Point::new(12, 12);
    planner.set_start(start).unwrap();
    planner.set_goal(goal).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    for _ in 0..40 {
        planner.add_random_obstacle(&mut rng).unwrap();
        match planner.compute_path() {
            Ok(route) => assert_valid_route(&planner, &route, start, goal),
            Err(PlanError::NoPath { partial }) => {
                assert_eq!(partial[0], start);
                assert!(!partial.iter().any(|c| planner.is_blocked(*c)));
            }
            Err(other) => panic!("unexpected failure: {:?}", other),
        }
    }
}
