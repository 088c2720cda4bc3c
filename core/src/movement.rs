//! Per-tick movement decisions exchanged between policies, controllers, and followers.

use crate::CellCoord;

/// One tick's worth of desired motion along the current path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementIntent {
    speed_scale: f32,
}

impl MovementIntent {
    /// Follow the current path at the archetype's full speed.
    #[must_use]
    pub const fn full_speed() -> Self {
        Self { speed_scale: 1.0 }
    }

    /// Follow the current path at a fraction of the archetype's speed.
    ///
    /// Negative or non-finite scales are treated as a hold.
    #[must_use]
    pub fn scaled(scale: f32) -> Self {
        let speed_scale = if scale.is_finite() { scale.max(0.0) } else { 0.0 };
        Self { speed_scale }
    }

    /// Stay in place this tick while keeping the current path.
    #[must_use]
    pub const fn hold() -> Self {
        Self { speed_scale: 0.0 }
    }

    /// Multiplier applied to the archetype's speed.
    #[must_use]
    pub const fn speed_scale(&self) -> f32 {
        self.speed_scale
    }

    /// Whether the intent keeps the actor still.
    #[must_use]
    pub fn is_hold(&self) -> bool {
        self.speed_scale <= 0.0
    }
}

/// Outcome of a movement policy evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum MovementDecision {
    /// Keep following the current path with the provided intent.
    Proceed(MovementIntent),
    /// Discard the current path and plan a new one.
    RequestReplan(PlanRequest),
    /// Drop the current path and stand still.
    Abandon,
}

/// Parameters of a single planning request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanRequest {
    /// Cell the path starts from.
    pub start: CellCoord,
    /// Cell the path should reach.
    pub goal: CellCoord,
    /// Cells the planner should prefer to route around.
    pub avoid: Vec<CellCoord>,
    /// Extra cost paid for entering an avoided cell.
    pub avoid_penalty: u32,
    /// Maximum number of node expansions, or `None` for an exhaustive search.
    pub horizon: Option<u32>,
    /// Whether a path towards the closest reachable cell is acceptable.
    pub allow_partial: bool,
    /// Cost of driving through a brick wall by shooting it down, or `None`
    /// when bricks block the search like any other obstacle.
    pub brick_cost: Option<u32>,
}

impl PlanRequest {
    /// Creates an exhaustive request for a full path.
    #[must_use]
    pub fn new(start: CellCoord, goal: CellCoord) -> Self {
        Self {
            start,
            goal,
            avoid: Vec::new(),
            avoid_penalty: 0,
            horizon: None,
            allow_partial: false,
            brick_cost: None,
        }
    }

    /// Biases the search away from the provided cells.
    #[must_use]
    pub fn with_avoidance(mut self, avoid: Vec<CellCoord>, penalty: u32) -> Self {
        self.avoid = avoid;
        self.avoid_penalty = penalty;
        self
    }

    /// Lets the search cross brick walls at the given per-cell cost.
    ///
    /// Costs below one are raised to one.
    #[must_use]
    pub fn with_brick_cost(mut self, cost: u32) -> Self {
        self.brick_cost = Some(cost.max(1));
        self
    }

    /// Caps the search and accepts partial paths.
    #[must_use]
    pub fn with_horizon(mut self, horizon: u32) -> Self {
        self.horizon = Some(horizon);
        self.allow_partial = true;
        self
    }
}
