//! The planner facade owning the grid, the endpoints and the search state.

use crate::dstar::DStarCore;
use crate::error::{MutationError, PlanError};
use crate::grid::OccupancyGrid;
use crate::snapshot::GridSnapshot;
use crate::{heuristic, DEFAULT_GRID_SIZE};
use core::fmt;
use grid_util::grid::Grid;
use grid_util::point::Point;
use log::{info, warn};
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tunables of [GridPathPlanner].
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PlannerConfig {
    /// Hard cap on extraction steps, a defensive guard against pathological
    /// cost fields. `None` caps at the number of grid cells, which a cycle
    /// free walk can never exceed.
    #[serde(default)]
    pub step_cap: Option<usize>,
}

/// Incremental shortest-path planner over a 2D occupancy grid.
///
/// The planner keeps a goal-rooted cost field alive between calls: grid
/// edits requeue only the vertices they touch, so replanning after a few
/// obstacle changes costs a fraction of a from-scratch search. Paths are
/// 8-connected with Euclidean step costs.
///
/// ```
/// use grid_replanning::GridPathPlanner;
/// use grid_util::Point;
///
/// let mut planner = GridPathPlanner::new(15, 15);
/// planner.set_start(Point::new(2, 2)).unwrap();
/// planner.set_goal(Point::new(12, 12)).unwrap();
/// let route = planner.compute_path().unwrap();
/// assert_eq!(route[0], Point::new(2, 2));
/// assert_eq!(*route.last().unwrap(), Point::new(12, 12));
/// ```
#[derive(Debug)]
pub struct GridPathPlanner {
    grid: OccupancyGrid,
    core: DStarCore,
    start: Option<Point>,
    goal: Option<Point>,
    initialized: bool,
    config: PlannerConfig,
}

impl GridPathPlanner {
    /// Creates a planner over an all-free grid of the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_config(width, height, PlannerConfig::default())
    }

    pub fn with_config(width: usize, height: usize, config: PlannerConfig) -> Self {
        GridPathPlanner {
            grid: OccupancyGrid::new(width, height, false),
            core: DStarCore::new(),
            start: None,
            goal: None,
            initialized: false,
            config,
        }
    }

    /// Rebuilds a planner from a persisted snapshot, re-validating every
    /// obstacle and endpoint against the same rules as the mutation calls.
    pub fn from_snapshot(snapshot: &GridSnapshot) -> Result<Self, MutationError> {
        let mut planner = Self::new(snapshot.width, snapshot.height);
        for &(x, y) in &snapshot.obstacles {
            planner.set_obstacle(Point::new(x, y))?;
        }
        if let Some((x, y)) = snapshot.start {
            planner.set_start(Point::new(x, y))?;
        }
        if let Some((x, y)) = snapshot.goal {
            planner.set_goal(Point::new(x, y))?;
        }
        Ok(planner)
    }

    /// Captures the persistent grid state: dimensions, obstacles, endpoints.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            obstacles: self.obstacles().iter().map(|p| (p.x, p.y)).collect(),
            start: self.start.map(|p| (p.x, p.y)),
            goal: self.goal.map(|p| (p.x, p.y)),
        }
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }
    pub fn height(&self) -> usize {
        self.grid.height()
    }
    pub fn start(&self) -> Option<Point> {
        self.start
    }
    pub fn goal(&self) -> Option<Point> {
        self.goal
    }
    /// Read-only view of the underlying occupancy grid.
    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }
    pub fn is_blocked(&self, c: Point) -> bool {
        self.grid.is_blocked(c)
    }
    /// Blocked cells in scan order.
    pub fn obstacles(&self) -> Vec<Point> {
        self.grid
            .cells()
            .filter(|p| self.grid.is_blocked(*p))
            .collect()
    }
    /// Traversal cost of the edge between two adjacent cells; infinite when
    /// either end is blocked or out of bounds.
    pub fn edge_cost(&self, u: Point, v: Point) -> f64 {
        self.grid.edge_cost(u, v)
    }
    /// Converged cost from `c` to the goal as of the last
    /// [compute_path](Self::compute_path) call; infinite for unreached or
    /// blocked cells.
    pub fn cost_to_goal(&self, c: Point) -> f64 {
        self.core.g(c)
    }

    /// Blocks a free cell. The start and goal cells refuse obstacles.
    pub fn set_obstacle(&mut self, c: Point) -> Result<(), MutationError> {
        if !self.grid.point_in_bounds(c) {
            return Err(MutationError::OutOfBounds(c));
        }
        if self.start == Some(c) || self.goal == Some(c) {
            return Err(MutationError::EndpointConflict(c));
        }
        if self.grid.is_blocked(c) {
            return Ok(());
        }
        self.set_cell(c, true);
        Ok(())
    }

    /// Unblocks a cell. Clearing an already free cell is a no-op.
    pub fn clear_obstacle(&mut self, c: Point) -> Result<(), MutationError> {
        if !self.grid.point_in_bounds(c) {
            return Err(MutationError::OutOfBounds(c));
        }
        if !self.grid.is_blocked(c) {
            return Ok(());
        }
        self.set_cell(c, false);
        Ok(())
    }

    /// Blocks a uniformly random free cell that is neither the start nor the
    /// goal and returns it.
    pub fn add_random_obstacle<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Point, MutationError> {
        let candidate = self
            .grid
            .free_cells()
            .filter(|p| self.start != Some(*p) && self.goal != Some(*p))
            .choose(rng)
            .ok_or(MutationError::GridFull)?;
        self.set_cell(candidate, true);
        Ok(candidate)
    }

    /// Moves the start. When a search is already converged the priority
    /// offset is raised by the distance moved, keeping queued keys valid.
    pub fn set_start(&mut self, c: Point) -> Result<(), MutationError> {
        if !self.grid.point_in_bounds(c) {
            return Err(MutationError::OutOfBounds(c));
        }
        if self.grid.is_blocked(c) {
            return Err(MutationError::Blocked(c));
        }
        if self.initialized {
            if let Some(old) = self.start {
                if old != c {
                    self.core.raise_km(heuristic(old, c));
                }
            }
        }
        self.start = Some(c);
        Ok(())
    }

    /// Moves the goal. The cost field is rooted at the goal, so moving it
    /// discards all labels and reseeds the search on the next replan.
    pub fn set_goal(&mut self, c: Point) -> Result<(), MutationError> {
        if !self.grid.point_in_bounds(c) {
            return Err(MutationError::OutOfBounds(c));
        }
        if self.grid.is_blocked(c) {
            return Err(MutationError::Blocked(c));
        }
        if self.goal != Some(c) {
            self.goal = Some(c);
            self.initialized = false;
        }
        Ok(())
    }

    /// Clears the endpoints and all derived cost state; obstacles stay.
    pub fn reset_endpoints(&mut self) {
        self.start = None;
        self.goal = None;
        self.initialized = false;
        self.core.clear();
    }

    fn set_cell(&mut self, c: Point, blocked: bool) {
        self.grid.set(c.x as usize, c.y as usize, blocked);
        if self.initialized {
            if let (Some(start), Some(goal)) = (self.start, self.goal) {
                self.core.edge_costs_changed(&self.grid, c, start, goal);
            }
        }
    }

    /// Computes the best known path from start to goal as an ordered cell
    /// sequence `[start, ..., goal]`.
    ///
    /// Repeated calls reuse the converged cost field; only vertices touched
    /// by grid edits since the previous call are reprocessed. The result is
    /// deterministic: without intervening mutations two calls return the
    /// identical sequence.
    pub fn compute_path(&mut self) -> Result<Vec<Point>, PlanError> {
        let goal = self.goal.ok_or(PlanError::GoalUnset)?;
        let start = self.start.ok_or(PlanError::StartUnset)?;
        if start == goal {
            return Ok(vec![start]);
        }
        self.grid.update();
        if self.grid.unreachable(&start, &goal) {
            info!("{} is not reachable from {}", goal, start);
            return Err(PlanError::NoPath {
                partial: vec![start],
            });
        }
        if !self.initialized {
            self.core.reset(start, goal);
            self.initialized = true;
        }
        self.core.compute_shortest_path(&self.grid, start, goal);
        let path = self.extract_path(start, goal);
        if path.last() == Some(&goal) {
            Ok(path)
        } else {
            warn!("Reachable goal could not be pathed to, is the cost field converged?");
            Err(PlanError::NoPath { partial: path })
        }
    }

    /// Greedy descent of the cost field: from each cell, step to the free
    /// neighbour minimising edge cost plus cost to goal. The summed cost
    /// strictly decreases along the walk, so it cannot cycle.
    fn extract_path(&self, start: Point, goal: Point) -> Vec<Point> {
        let cap = self
            .config
            .step_cap
            .unwrap_or(self.grid.width() * self.grid.height());
        let mut path = vec![start];
        let mut current = start;
        for _ in 0..cap {
            if current == goal {
                break;
            }
            let mut next: Option<(Point, f64)> = None;
            for v in self.grid.free_neighbours(current) {
                let through = self.grid.edge_cost(current, v) + self.core.g(v);
                if next.map_or(true, |(_, best)| through < best) {
                    next = Some((v, through));
                }
            }
            match next {
                Some((v, through)) if through.is_finite() => {
                    path.push(v);
                    current = v;
                }
                _ => break,
            }
        }
        path
    }
}

impl Default for GridPathPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE)
    }
}

impl fmt::Display for GridPathPlanner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.grid.height() as i32 {
            for x in 0..self.grid.width() as i32 {
                let p = Point::new(x, y);
                let c = if self.start == Some(p) {
                    'S'
                } else if self.goal == Some(p) {
                    'G'
                } else if self.grid.is_blocked(p) {
                    '#'
                } else {
                    '.'
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_cost;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn planner_with_wall() -> GridPathPlanner {
        let mut planner = GridPathPlanner::new(10, 10);
        for y in 0..9 {
            planner.set_obstacle(Point::new(5, y)).unwrap();
        }
        planner.set_start(Point::new(1, 1)).unwrap();
        planner.set_goal(Point::new(8, 1)).unwrap();
        planner
    }

    #[test]
    fn mutations_report_conflicts() {
        let mut planner = GridPathPlanner::new(4, 4);
        planner.set_start(Point::new(0, 0)).unwrap();
        assert_eq!(
            planner.set_obstacle(Point::new(0, 0)),
            Err(MutationError::EndpointConflict(Point::new(0, 0)))
        );
        assert_eq!(
            planner.set_obstacle(Point::new(7, 0)),
            Err(MutationError::OutOfBounds(Point::new(7, 0)))
        );
        planner.set_obstacle(Point::new(1, 1)).unwrap();
        assert_eq!(
            planner.set_goal(Point::new(1, 1)),
            Err(MutationError::Blocked(Point::new(1, 1)))
        );
    }

    #[test]
    fn replan_after_breach_matches_fresh_search() {
        let mut planner = planner_with_wall();
        let detour = planner.compute_path().unwrap();
        // Opening the wall shortens the route; the incremental result must
        // agree with a planner that never saw the wall closed.
        planner.clear_obstacle(Point::new(5, 1)).unwrap();
        let direct = planner.compute_path().unwrap();
        let mut fresh = GridPathPlanner::from_snapshot(&planner.snapshot()).unwrap();
        let reference = fresh.compute_path().unwrap();
        assert!(path_cost(&direct) < path_cost(&detour));
        assert!((path_cost(&direct) - path_cost(&reference)).abs() < 1e-9);
    }

    #[test]
    fn blocking_a_cell_never_lowers_cost_to_goal() {
        let mut planner = planner_with_wall();
        planner.compute_path().unwrap();
        let sampled: Vec<Point> = planner.grid().free_cells().collect();
        let before: Vec<f64> = sampled.iter().map(|p| planner.cost_to_goal(*p)).collect();
        planner.set_obstacle(Point::new(7, 2)).unwrap();
        planner.compute_path().unwrap();
        for (p, old) in sampled.iter().zip(before) {
            if planner.is_blocked(*p) {
                continue;
            }
            assert!(
                planner.cost_to_goal(*p) >= old - 1e-9,
                "cost to goal dropped at {}",
                p
            );
        }
    }

    #[test]
    fn moving_start_keeps_replanning_consistent() {
        let mut planner = planner_with_wall();
        let route = planner.compute_path().unwrap();
        // Advance two cells along the route, as a vehicle following it would.
        planner.set_start(route[2]).unwrap();
        planner.set_obstacle(Point::new(6, 9)).unwrap();
        let replanned = planner.compute_path().unwrap();
        assert_eq!(replanned[0], route[2]);
        let mut fresh = GridPathPlanner::from_snapshot(&planner.snapshot()).unwrap();
        let reference = fresh.compute_path().unwrap();
        assert!((path_cost(&replanned) - path_cost(&reference)).abs() < 1e-9);
    }

    #[test]
    fn random_obstacle_avoids_endpoints() {
        let mut planner = GridPathPlanner::new(2, 2);
        planner.set_start(Point::new(0, 0)).unwrap();
        planner.set_goal(Point::new(1, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let a = planner.add_random_obstacle(&mut rng).unwrap();
        let b = planner.add_random_obstacle(&mut rng).unwrap();
        assert_ne!(a, b);
        assert!(planner.start() != Some(a) && planner.goal() != Some(a));
        assert!(planner.start() != Some(b) && planner.goal() != Some(b));
        assert_eq!(
            planner.add_random_obstacle(&mut rng),
            Err(MutationError::GridFull)
        );
    }

    #[test]
    fn reset_endpoints_keeps_obstacles() {
        let mut planner = planner_with_wall();
        planner.compute_path().unwrap();
        let obstacles = planner.obstacles();
        planner.reset_endpoints();
        assert_eq!(planner.start(), None);
        assert_eq!(planner.goal(), None);
        assert_eq!(planner.obstacles(), obstacles);
        assert_eq!(planner.compute_path(), Err(PlanError::GoalUnset));
    }

    #[test]
    fn display_marks_endpoints_and_obstacles() {
        let mut planner = GridPathPlanner::new(3, 2);
        planner.set_start(Point::new(0, 0)).unwrap();
        planner.set_goal(Point::new(2, 1)).unwrap();
        planner.set_obstacle(Point::new(1, 0)).unwrap();
        assert_eq!(planner.to_string(), "S#.\n..G\n");
    }
}
