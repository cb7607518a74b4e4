//! Goal-rooted cost propagation for incremental replanning.
//!
//! Holds the `g`/`rhs` labels and the open set of the D* Lite formulation.
//! The open set pairs a [BinaryHeap] with an [IndexMap] recording each queued
//! vertex's current key; heap entries whose key no longer matches the map are
//! stale and skipped on pop instead of being removed eagerly.

use crate::grid::OccupancyGrid;
use crate::heuristic;
use fxhash::{FxBuildHasher, FxHashMap};
use grid_util::point::Point;
use indexmap::IndexMap;
use log::debug;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Vertex priority: lexicographic `(k1, k2)` where
/// `k1 = min(g, rhs) + h(start, vertex) + km` and `k2 = min(g, rhs)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Key {
    k1: f64,
    k2: f64,
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        // Neither component can be NaN: both are sums of distances, infinity
        // at worst.
        match self.k1.partial_cmp(&other.k1) {
            Some(Ordering::Equal) => self.k2.partial_cmp(&other.k2).unwrap_or(Ordering::Equal),
            Some(ord) => ord,
            None => Ordering::Equal,
        }
    }
}

#[derive(Debug)]
struct OpenEntry {
    key: Key,
    vertex: Point,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key.eq(&other.key)
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the smallest key sits on top of the max-heap.
        other.key.cmp(&self.key)
    }
}

#[derive(Clone, Copy, Debug)]
struct VertexCost {
    g: f64,
    rhs: f64,
}

impl Default for VertexCost {
    fn default() -> Self {
        VertexCost {
            g: f64::INFINITY,
            rhs: f64::INFINITY,
        }
    }
}

/// The mutable search state shared by all replans against one goal.
#[derive(Debug)]
pub(crate) struct DStarCore {
    costs: FxHashMap<Point, VertexCost>,
    heap: BinaryHeap<OpenEntry>,
    open: FxIndexMap<Point, Key>,
    km: f64,
}

impl DStarCore {
    pub(crate) fn new() -> Self {
        DStarCore {
            costs: FxHashMap::default(),
            heap: BinaryHeap::new(),
            open: FxIndexMap::default(),
            km: 0.0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.costs.clear();
        self.heap.clear();
        self.open.clear();
        self.km = 0.0;
    }

    /// Discards all labels and reseeds the search at the goal.
    pub(crate) fn reset(&mut self, start: Point, goal: Point) {
        self.clear();
        self.set_rhs(goal, 0.0);
        let key = self.key_of(goal, start);
        self.push_open(goal, key);
    }

    pub(crate) fn g(&self, p: Point) -> f64 {
        self.costs.get(&p).map_or(f64::INFINITY, |c| c.g)
    }
    pub(crate) fn rhs(&self, p: Point) -> f64 {
        self.costs.get(&p).map_or(f64::INFINITY, |c| c.rhs)
    }
    fn set_g(&mut self, p: Point, g: f64) {
        self.costs.entry(p).or_default().g = g;
    }
    fn set_rhs(&mut self, p: Point, rhs: f64) {
        self.costs.entry(p).or_default().rhs = rhs;
    }

    /// Shifts all queued priorities after the start moved by `delta`, the
    /// heuristic distance between the old and new start. Keys computed before
    /// the move then stay lower bounds of recomputed ones.
    pub(crate) fn raise_km(&mut self, delta: f64) {
        self.km += delta;
    }

    fn key_of(&self, u: Point, start: Point) -> Key {
        let reach = self.g(u).min(self.rhs(u));
        Key {
            k1: reach + heuristic(start, u) + self.km,
            k2: reach,
        }
    }

    fn push_open(&mut self, u: Point, key: Key) {
        self.open.insert(u, key);
        self.heap.push(OpenEntry { key, vertex: u });
    }

    /// Recomputes the one-step lookahead of `u` and requeues it when its
    /// labels disagree.
    fn update_vertex(&mut self, grid: &OccupancyGrid, u: Point, start: Point, goal: Point) {
        if u != goal {
            let mut best = f64::INFINITY;
            for v in grid.neighbours(u) {
                let through = grid.edge_cost(u, v) + self.g(v);
                if through < best {
                    best = through;
                }
            }
            self.set_rhs(u, best);
        }
        if self.g(u) != self.rhs(u) {
            let key = self.key_of(u, start);
            self.push_open(u, key);
        } else {
            self.open.swap_remove(&u);
        }
    }

    /// Requeues every vertex whose incident edge costs changed when the cell
    /// at `c` flipped between free and blocked.
    pub(crate) fn edge_costs_changed(
        &mut self,
        grid: &OccupancyGrid,
        c: Point,
        start: Point,
        goal: Point,
    ) {
        self.update_vertex(grid, c, start, goal);
        for v in grid.neighbours(c) {
            self.update_vertex(grid, v, start, goal);
        }
    }

    /// Drains the open set until the start is locally consistent and no
    /// queued vertex precedes it, the exit condition of the D* Lite main
    /// loop. Terminates on its own since every vertex key is bounded by the
    /// finite grid.
    pub(crate) fn compute_shortest_path(
        &mut self,
        grid: &OccupancyGrid,
        start: Point,
        goal: Point,
    ) {
        let mut expanded = 0usize;
        loop {
            let Some(top) = self.heap.peek() else { break };
            if self.open.get(&top.vertex) != Some(&top.key) {
                // Superseded or removed entry.
                self.heap.pop();
                continue;
            }
            let start_key = self.key_of(start, start);
            if !(top.key < start_key) && self.g(start) == self.rhs(start) {
                break;
            }
            let entry = self.heap.pop().unwrap();
            let u = entry.vertex;
            self.open.swap_remove(&u);
            expanded += 1;
            let k_new = self.key_of(u, start);
            if entry.key < k_new {
                // The key went stale while queued.
                self.push_open(u, k_new);
            } else if self.g(u) > self.rhs(u) {
                let rhs = self.rhs(u);
                self.set_g(u, rhs);
                for v in grid.neighbours(u) {
                    self.update_vertex(grid, v, start, goal);
                }
            } else {
                self.set_g(u, f64::INFINITY);
                self.update_vertex(grid, u, start, goal);
                for v in grid.neighbours(u) {
                    self.update_vertex(grid, v, start, goal);
                }
            }
        }
        debug!("expanded {} vertices", expanded);
    }
}
