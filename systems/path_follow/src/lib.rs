#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Converts discrete cell paths into continuous actor motion.
//!
//! A [`GridPathFollower`] steers a world position from cell centre to cell
//! centre along its current [`Path`]. It never performs local avoidance: when
//! the next cell of the path stops being traversable the follower halts in the
//! [`FollowState::Blocked`] state and leaves replanning to its owner.

use std::time::Duration;

use battle_city_core::{CellCoord, GridError, MovementIntent, Path};
use battle_city_world::GridMap;
use glam::Vec2;

/// Lifecycle of a path follower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FollowState {
    /// No path is assigned.
    #[default]
    Idle,
    /// The follower is moving along its path.
    Following,
    /// The final cell of the path was reached.
    Arrived,
    /// The next cell of the path became non-traversable.
    Blocked,
}

/// State change produced by a single update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowTransition {
    /// The follower came to rest within tolerance of the final cell.
    Arrived {
        /// Final cell of the path.
        cell: CellCoord,
    },
    /// The follower stopped in front of a non-traversable cell.
    Blocked {
        /// Cell that blocked the path.
        cell: CellCoord,
        /// Last path cell whose centre the follower reached.
        reached: CellCoord,
    },
}

/// Outcome of a single follower update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FollowReport {
    /// Whether the driven position changed.
    pub moved: bool,
    /// Transition that happened during the update, if any.
    pub transition: Option<FollowTransition>,
}

/// Drives one actor's world position along a [`Path`].
#[derive(Clone, Debug)]
pub struct GridPathFollower {
    speed: f32,
    arrival_tolerance: f32,
    state: FollowState,
    path: Option<Path>,
    next: usize,
}

impl GridPathFollower {
    /// Creates an idle follower moving at `speed` world units per second.
    #[must_use]
    pub fn new(speed: f32, arrival_tolerance: f32) -> Self {
        Self {
            speed: speed.max(0.0),
            arrival_tolerance: arrival_tolerance.max(0.0),
            state: FollowState::Idle,
            path: None,
            next: 0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> FollowState {
        self.state
    }

    /// Speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Distance from the final cell centre that counts as arrival.
    #[must_use]
    pub const fn arrival_tolerance(&self) -> f32 {
        self.arrival_tolerance
    }

    /// Path currently assigned to the follower.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Cell the follower is steering towards.
    #[must_use]
    pub fn target(&self) -> Option<CellCoord> {
        self.path
            .as_ref()
            .and_then(|path| path.cells().get(self.next).copied())
    }

    /// Cells still ahead of the follower, starting with the current target.
    #[must_use]
    pub fn remaining(&self) -> &[CellCoord] {
        self.path
            .as_ref()
            .and_then(|path| path.cells().get(self.next..))
            .unwrap_or(&[])
    }

    /// Assigns a fresh path and starts following it from its first cell.
    pub fn set_path(&mut self, path: Path) {
        self.path = Some(path);
        self.next = 0;
        self.state = FollowState::Following;
    }

    /// Drops the path and returns to idle.
    pub fn cancel(&mut self) {
        self.path = None;
        self.next = 0;
        self.state = FollowState::Idle;
    }

    /// Advances `position` along the path for `dt` of simulated time.
    ///
    /// The movement budget is carried across intermediate cell centres within
    /// a tick. The position never passes the final cell's centre.
    pub fn update(
        &mut self,
        dt: Duration,
        intent: MovementIntent,
        grid: &GridMap,
        position: &mut Vec2,
    ) -> Result<FollowReport, GridError> {
        let mut report = FollowReport::default();
        if self.state != FollowState::Following {
            return Ok(report);
        }

        let Some(path) = self.path.as_ref() else {
            self.state = FollowState::Idle;
            return Ok(report);
        };

        let cells = path.cells();
        debug_assert!(
            self.next < cells.len(),
            "follower index past the end of its path"
        );
        let last = cells.len() - 1;
        let mut budget = self.speed * intent.speed_scale() * dt.as_secs_f32();

        loop {
            let target = cells[self.next];
            if self.next > 0 && !grid.is_traversable(target)? {
                let reached = cells[self.next - 1];
                self.state = FollowState::Blocked;
                report.transition = Some(FollowTransition::Blocked {
                    cell: target,
                    reached,
                });
                tracing::trace!(?target, ?reached, "path blocked");
                return Ok(report);
            }

            let centre = grid.cell_to_world(target)?;
            let distance = position.distance(centre);

            if self.next == last {
                if distance > self.arrival_tolerance && budget > 0.0 {
                    if budget >= distance {
                        *position = centre;
                    } else {
                        *position += (centre - *position) * (budget / distance);
                    }
                    report.moved = true;
                }

                if position.distance(centre) <= self.arrival_tolerance {
                    self.state = FollowState::Arrived;
                    report.transition = Some(FollowTransition::Arrived { cell: target });
                }
                return Ok(report);
            }

            if budget >= distance {
                if distance > 0.0 {
                    *position = centre;
                    report.moved = true;
                }
                budget -= distance;
                self.next += 1;
                continue;
            }

            if budget > 0.0 {
                *position += (centre - *position) * (budget / distance);
                report.moved = true;
            }
            return Ok(report);
        }
    }
}
