//! Occupancy grid with connected-component bookkeeping.

use crate::heuristic;
use core::fmt;
use grid_util::grid::{BoolGrid, Grid};
use grid_util::point::Point;
use itertools::Itertools;
use log::info;
use petgraph::unionfind::UnionFind;
use smallvec::SmallVec;

/// [OccupancyGrid] maintains information about components using a [UnionFind]
/// structure in addition to the raw [bool] grid values in the [BoolGrid] that
/// determine whether a cell is blocked ([true]) or free ([false]). Components
/// let reachability questions be answered without flood-filling the grid.
/// Implements [Grid] by building on [BoolGrid].
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    pub grid: BoolGrid,
    pub components: UnionFind<usize>,
    pub components_dirty: bool,
}

impl OccupancyGrid {
    /// In-bounds cells of the 8-connected (Moore) neighbourhood, blocked or not.
    pub fn neighbours(&self, point: Point) -> SmallVec<[Point; 8]> {
        point
            .moore_neighborhood()
            .into_iter()
            .filter(|p| self.point_in_bounds(*p))
            .collect()
    }
    /// In-bounds free cells of the 8-connected neighbourhood.
    pub fn free_neighbours(&self, point: Point) -> SmallVec<[Point; 8]> {
        point
            .moore_neighborhood()
            .into_iter()
            .filter(|p| self.is_free(*p))
            .collect()
    }
    pub fn is_free(&self, pos: Point) -> bool {
        self.point_in_bounds(pos) && !self.grid.get_point(pos)
    }
    /// Whether the cell holds an obstacle. Out-of-bounds positions count as
    /// blocked since they can never be traversed.
    pub fn is_blocked(&self, pos: Point) -> bool {
        !self.is_free(pos)
    }
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && self.grid.index_in_bounds(x as usize, y as usize)
    }
    pub fn point_in_bounds(&self, pos: Point) -> bool {
        self.in_bounds(pos.x, pos.y)
    }
    fn get_ix_point(&self, point: &Point) -> usize {
        self.grid.get_ix(point.x as usize, point.y as usize)
    }

    /// Traversal cost of the edge between two adjacent cells: the Euclidean
    /// distance between their centres (1 for cardinal moves, sqrt(2) for
    /// diagonal ones) when both cells are free, infinite otherwise.
    pub fn edge_cost(&self, u: Point, v: Point) -> f64 {
        if self.is_free(u) && self.is_free(v) {
            heuristic(u, v)
        } else {
            f64::INFINITY
        }
    }

    /// All cells of the grid in column-major scan order.
    pub fn cells(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.grid.width as i32)
            .cartesian_product(0..self.grid.height as i32)
            .map(|(x, y)| Point::new(x, y))
    }
    /// All free cells of the grid in column-major scan order.
    pub fn free_cells(&self) -> impl Iterator<Item = Point> + '_ {
        self.cells().filter(|p| !self.grid.get_point(*p))
    }

    /// Retrieves the component id a given [Point] belongs to.
    pub fn get_component(&self, point: &Point) -> usize {
        self.components.find(self.get_ix_point(point))
    }
    /// Checks if start and goal are on the same component.
    pub fn reachable(&self, start: &Point, goal: &Point) -> bool {
        !self.unreachable(start, goal)
    }
    /// Checks if start and goal are not on the same component.
    pub fn unreachable(&self, start: &Point, goal: &Point) -> bool {
        if self.point_in_bounds(*start) && self.point_in_bounds(*goal) {
            let start_ix = self.get_ix_point(start);
            let goal_ix = self.get_ix_point(goal);
            !self.components.equiv(start_ix, goal_ix)
        } else {
            true
        }
    }

    /// Regenerates the components if they are marked as dirty.
    pub fn update(&mut self) {
        if self.components_dirty {
            self.generate_components();
        }
    }
    /// Generates a new [UnionFind] structure and links up free grid neighbours
    /// to the same components.
    pub fn generate_components(&mut self) {
        info!("Generating connected components");
        let w = self.grid.width;
        let h = self.grid.height;
        self.components = UnionFind::new(w * h);
        self.components_dirty = false;
        for x in 0..w as i32 {
            for y in 0..h as i32 {
                let point = Point::new(x, y);
                if self.grid.get_point(point) {
                    continue;
                }
                let parent_ix = self.get_ix_point(&point);
                // Forward half of the neighbourhood; the other half is
                // covered when the scan reaches those cells.
                let neighbours = [
                    Point::new(x, y + 1),
                    Point::new(x + 1, y),
                    Point::new(x + 1, y + 1),
                    Point::new(x + 1, y - 1),
                ];
                for p in neighbours {
                    if self.point_in_bounds(p) && !self.grid.get_point(p) {
                        self.components.union(parent_ix, self.get_ix_point(&p));
                    }
                }
            }
        }
    }
}

impl Grid<bool> for OccupancyGrid {
    fn new(width: usize, height: usize, default_value: bool) -> Self {
        let mut base_grid = OccupancyGrid {
            grid: BoolGrid::new(width, height, default_value),
            components: UnionFind::new(width * height),
            components_dirty: false,
        };
        base_grid.generate_components();
        base_grid
    }
    fn get(&self, x: usize, y: usize) -> bool {
        self.grid.get(x, y)
    }
    /// Updates a position on the grid. Joins newly connected components and
    /// flags the components as dirty if components are (potentially) broken
    /// apart into multiple.
    fn set(&mut self, x: usize, y: usize, blocked: bool) {
        let p = Point::new(x as i32, y as i32);
        if self.grid.get(x, y) != blocked && blocked {
            self.components_dirty = true;
        } else if !blocked {
            for n in self.free_neighbours(p) {
                self.components
                    .union(self.grid.get_ix(x, y), self.get_ix_point(&n));
            }
        }
        self.grid.set(x, y, blocked);
    }
    fn width(&self) -> usize {
        self.grid.width()
    }
    fn height(&self) -> usize {
        self.grid.height()
    }
}

impl fmt::Display for OccupancyGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.grid.height {
            for x in 0..self.grid.width {
                write!(f, "{}", if self.grid.get(x, y) { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
