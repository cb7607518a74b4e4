use grid_replanning::{GridPathPlanner, Landmarks, PlanError};
use grid_util::point::Point;
use rand::rngs::StdRng;
use rand::SeedableRng;

// An ambulance is dispatched from AIIMS to the Airport on the demo grid.
// Disasters block cells; one more strikes while the vehicle is under way,
// forcing a replan from its current position.
fn main() {
    let landmarks = Landmarks::delhi();
    let mut planner = GridPathPlanner::default();
    for (x, y) in [(5, 5), (5, 6), (6, 5), (6, 6), (7, 7), (4, 9), (5, 9)] {
        planner
            .set_obstacle(Point::new(x, y))
            .expect("demo disaster layout fits the grid");
    }

    let start = landmarks.get("AIIMS").unwrap();
    let goal = landmarks.get("Airport").unwrap();
    planner.set_start(start).unwrap();
    planner.set_goal(goal).unwrap();

    println!("City map (S = ambulance, G = hospital airlift):");
    print!("{}", planner);

    let route = match planner.compute_path() {
        Ok(route) => route,
        Err(e) => {
            println!("dispatch failed: {}", e);
            return;
        }
    };
    println!("\nDispatched route ({} cells):", route.len());
    for cell in &route {
        println!("  {}", cell);
    }

    // The ambulance advances three cells, then a fresh disaster strikes.
    let underway = route[3.min(route.len() - 1)];
    planner.set_start(underway).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let struck = planner.add_random_obstacle(&mut rng).unwrap();
    println!("\nDisaster at {} while the ambulance is at {}; replanning...", struck, underway);

    match planner.compute_path() {
        Ok(route) => {
            println!("Updated route ({} cells):", route.len());
            for cell in &route {
                println!("  {}", cell);
            }
        }
        Err(PlanError::NoPath { partial }) => {
            println!("The airlift is cut off; the ambulance can only reach {}.", partial.last().unwrap());
        }
        Err(e) => println!("replan failed: {}", e),
    }
}
