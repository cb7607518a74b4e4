//! Persistable grid state.

use serde::{Deserialize, Serialize};

/// The persistent part of a planner: dimensions, obstacles and endpoints.
/// Cost labels are derived state and deliberately not captured; a planner
/// rebuilt from a snapshot reconverges on its first replan.
///
/// Coordinates are stored as plain `(x, y)` pairs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub obstacles: Vec<(i32, i32)>,
    #[serde(default)]
    pub start: Option<(i32, i32)>,
    #[serde(default)]
    pub goal: Option<(i32, i32)>,
}
