use grid_util::point::Point;
use thiserror::Error;

/// Rejected grid mutation.
///
/// Every mutation on [GridPathPlanner](crate::GridPathPlanner) reports why it
/// was refused instead of silently doing nothing, so callers can tell a
/// successful edit apart from an invalid one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    /// The coordinate lies outside the grid.
    #[error("coordinate {0} is outside the grid")]
    OutOfBounds(Point),
    /// The cell is blocked and cannot hold a start or goal.
    #[error("cell {0} is blocked")]
    Blocked(Point),
    /// The cell holds the start or goal and cannot be blocked.
    #[error("cell {0} holds an endpoint")]
    EndpointConflict(Point),
    /// No free cell is left to place a random obstacle on.
    #[error("no free cell is available for a new obstacle")]
    GridFull,
}

/// Failed path computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// No start has been set.
    #[error("no start has been set")]
    StartUnset,
    /// No goal has been set.
    #[error("no goal has been set")]
    GoalUnset,
    /// The goal cannot be reached from the start. `partial` holds the walk
    /// from the start up to the last cell with a finite cost to the goal,
    /// which is `[start]` alone when the start is fully cut off.
    #[error("the goal cannot be reached from the start")]
    NoPath { partial: Vec<Point> },
}
