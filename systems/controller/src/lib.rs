#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-enemy controller tying goal, movement, planning, and path following together.
//!
//! Each [`EnemyController`] owns exactly one goal policy, one movement policy,
//! one path follower, and the enemy's position. Controllers share no mutable
//! state with each other; the planner scratch buffers are lent to them one at
//! a time. A tick is split in two halves so the match can keep its ordering:
//! [`EnemyController::think`] consults policies and plans, then
//! [`EnemyController::advance`] moves the enemy.

use std::time::Duration;

use battle_city_core::{
    Archetype, CellCoord, EnemyId, Event, GoalSpec, MovementDecision, MovementIntent, PlanError,
    PlanRequest, Tick, WorldSnapshot,
};
use battle_city_system_goals::{GoalConfig, GoalContext, GoalPolicy};
use battle_city_system_movement::{MovementConfig, MovementContext, MovementPolicy, PursuitConfig};
use battle_city_system_path_follow::{FollowState, FollowTransition, GridPathFollower};
use battle_city_world::{GridMap, Planner};
use glam::Vec2;
use serde::{Deserialize, Serialize};

mod state;

pub use state::{transition, ActivePhase, ControllerState, ControllerTuning, Signal};

const DEFAULT_SPEED: f32 = 2.0;
const DEFAULT_ARRIVAL_TOLERANCE: f32 = 0.05;
const DEFAULT_BRICK_COST: u32 = 10;

/// Lets an archetype plan through brick walls and shoot them down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreachConfig {
    /// Planning cost of entering a brick cell.
    pub brick_cost: u32,
}

impl Default for BreachConfig {
    fn default() -> Self {
        Self {
            brick_cost: DEFAULT_BRICK_COST,
        }
    }
}

/// Stats and policy pairing that define an enemy archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeConfig {
    /// Movement strategy.
    pub movement: MovementConfig,
    /// Replanning thresholds for goal-driven movement.
    pub pursuit: PursuitConfig,
    /// Goal strategy.
    pub goal: GoalConfig,
    /// Speed in world units per second.
    pub speed: f32,
    /// Distance from the final cell centre that counts as arrival.
    pub arrival_tolerance: f32,
    /// Brick breaching; `None` makes bricks block like steel.
    pub breach: Option<BreachConfig>,
}

impl Default for ArchetypeConfig {
    fn default() -> Self {
        Self {
            movement: MovementConfig::default(),
            pursuit: PursuitConfig::default(),
            goal: GoalConfig::default(),
            speed: DEFAULT_SPEED,
            arrival_tolerance: DEFAULT_ARRIVAL_TOLERANCE,
            breach: None,
        }
    }
}

/// State machine driving a single enemy.
#[derive(Clone, Debug)]
pub struct EnemyController {
    id: EnemyId,
    archetype: Archetype,
    state: ControllerState,
    tuning: ControllerTuning,
    goals: GoalPolicy,
    movement: MovementPolicy,
    follower: GridPathFollower,
    breach: Option<BreachConfig>,
    goal: Option<GoalSpec>,
    intent: MovementIntent,
    position: Vec2,
    cell: CellCoord,
}

impl EnemyController {
    /// Creates a controller in the spawning state at the cell's position.
    #[must_use]
    pub fn new(
        id: EnemyId,
        archetype: Archetype,
        config: &ArchetypeConfig,
        tuning: ControllerTuning,
        cell: CellCoord,
        position: Vec2,
    ) -> Self {
        Self {
            id,
            archetype,
            state: ControllerState::Spawning,
            tuning,
            goals: GoalPolicy::new(config.goal, id),
            movement: MovementPolicy::new(&config.movement, config.pursuit, id),
            follower: GridPathFollower::new(config.speed, config.arrival_tolerance),
            breach: config.breach,
            goal: None,
            intent: MovementIntent::hold(),
            position,
            cell,
        }
    }

    /// Identifier of the enemy.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Archetype of the enemy.
    #[must_use]
    pub fn archetype(&self) -> &Archetype {
        &self.archetype
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Goal currently pursued.
    #[must_use]
    pub const fn goal(&self) -> Option<GoalSpec> {
        self.goal
    }

    /// World position written by the follower.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Cell the enemy occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// State of the owned path follower.
    #[must_use]
    pub const fn follow_state(&self) -> FollowState {
        self.follower.state()
    }

    /// Whether the follower still has motion to perform.
    #[must_use]
    pub fn has_pending_motion(&self) -> bool {
        self.follower.state() == FollowState::Following
    }

    /// Completes spawning; the enemy acts from the current tick on.
    pub fn activate(&mut self, now: Tick) {
        self.apply_signal(Signal::Activated, now);
    }

    /// Handles a death signal from the damage system.
    pub fn kill(&mut self, now: Tick) {
        self.apply_signal(Signal::Died, now);
    }

    /// Removes the enemy without a death, discarding any motion.
    pub fn despawn(&mut self, now: Tick) {
        self.apply_signal(Signal::Despawned, now);
    }

    /// Consults the goal and movement policies and performs at most one plan.
    pub fn think(
        &mut self,
        now: Tick,
        snapshot: &WorldSnapshot,
        grid: &GridMap,
        planner: &mut Planner,
        out_events: &mut Vec<Event>,
    ) {
        let ControllerState::Active(phase) = self.state else {
            return;
        };

        match phase {
            ActivePhase::BackingOff { until } => {
                if now < until {
                    self.intent = MovementIntent::hold();
                    return;
                }
                self.apply_signal(Signal::BackoffElapsed, now);
                self.poll_goal(now, snapshot);
            }
            ActivePhase::Idle { repoll_at } => {
                if now >= repoll_at {
                    self.poll_goal(now, snapshot);
                }
            }
            ActivePhase::Engaged => self.poll_goal(now, snapshot),
        }

        let remaining = self.follower.remaining();
        let context = MovementContext {
            enemy: self.id,
            cell: self.cell,
            following: self.follower.state() == FollowState::Following,
            remaining,
        };
        let goal = self.goal;
        let decision = self
            .movement
            .decide(&context, goal.as_ref(), snapshot, grid);

        match decision {
            MovementDecision::Proceed(intent) => self.intent = intent,
            MovementDecision::Abandon => {
                self.follower.cancel();
                self.intent = MovementIntent::hold();
            }
            MovementDecision::RequestReplan(request) => {
                self.plan(now, request, grid, planner, out_events);
            }
        }
    }

    /// Moves the enemy along its path and reports what happened.
    ///
    /// The occupied cell only follows the position into traversable cells, so
    /// an enemy caught mid-transit by a closing cell keeps the cell it came
    /// from.
    pub fn advance(
        &mut self,
        dt: Duration,
        grid: &GridMap,
        now: Tick,
        out_events: &mut Vec<Event>,
    ) {
        if !self.state.is_active() {
            return;
        }

        let report = match self
            .follower
            .update(dt, self.intent, grid, &mut self.position)
        {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(enemy = self.id.get(), %error, "follower left the grid");
                self.follower.cancel();
                return;
            }
        };

        if report.moved {
            match grid.world_to_cell(self.position) {
                Ok(cell) => {
                    if grid.is_traversable(cell).unwrap_or(false) {
                        self.cell = cell;
                    }
                }
                Err(error) => {
                    tracing::warn!(enemy = self.id.get(), %error, "enemy position off grid");
                }
            }
            out_events.push(Event::EnemyMoved {
                enemy: self.id,
                position: self.position,
            });
        }

        match report.transition {
            Some(FollowTransition::Arrived { cell }) => {
                out_events.push(Event::EnemyArrived {
                    enemy: self.id,
                    cell,
                });
                self.apply_signal(Signal::Arrived, now);
            }
            Some(FollowTransition::Blocked { cell, reached }) => {
                tracing::debug!(
                    enemy = self.id.get(),
                    ?cell,
                    ?reached,
                    "path blocked, replanning"
                );
                self.follower.cancel();
                self.cell = reached;
                out_events.push(Event::PathBlocked {
                    enemy: self.id,
                    cell,
                });
                if self.breach.is_some() && grid.is_breachable(cell).unwrap_or(false) {
                    out_events.push(Event::FireRequested {
                        enemy: self.id,
                        cell,
                    });
                }
                self.apply_signal(Signal::PathBlocked, now);
            }
            None => {}
        }
    }

    fn poll_goal(&mut self, now: Tick, snapshot: &WorldSnapshot) {
        let context = GoalContext {
            enemy: self.id,
            cell: self.cell,
            tick: now,
        };
        self.goal = self.goals.select_goal(&context, snapshot);
        let signal = if self.goal.is_some() {
            Signal::GoalAcquired
        } else {
            Signal::NoGoal
        };
        self.apply_signal(signal, now);
    }

    fn plan(
        &mut self,
        now: Tick,
        mut request: PlanRequest,
        grid: &GridMap,
        planner: &mut Planner,
        out_events: &mut Vec<Event>,
    ) {
        if let Some(breach) = self.breach {
            request = request.with_brick_cost(breach.brick_cost);
        }

        match planner.plan(grid, &request) {
            Ok(path) => {
                out_events.push(Event::PathPlanned {
                    enemy: self.id,
                    goal: request.goal,
                    steps: path.steps(),
                    reached_goal: path.reached_goal(),
                });
                tracing::debug!(
                    enemy = self.id.get(),
                    goal = ?request.goal,
                    steps = path.steps(),
                    "path planned"
                );
                self.follower.set_path(path);
                self.intent = MovementIntent::full_speed();
                self.apply_signal(Signal::PlanSucceeded, now);
            }
            Err(error) => {
                if !matches!(error, PlanError::NoPathFound { .. }) {
                    tracing::warn!(enemy = self.id.get(), %error, "planning rejected");
                }

                self.movement.plan_failed();
                self.follower.cancel();
                self.intent = MovementIntent::hold();
                self.apply_signal(Signal::PlanFailed, now);
                let retry_at = match self.state {
                    ControllerState::Active(ActivePhase::BackingOff { until }) => until,
                    _ => now,
                };
                tracing::debug!(
                    enemy = self.id.get(),
                    goal = ?request.goal,
                    retry_at = retry_at.get(),
                    "no path, backing off"
                );
                out_events.push(Event::PlanFailed {
                    enemy: self.id,
                    goal: request.goal,
                    retry_at,
                });
            }
        }
    }

    fn apply_signal(&mut self, signal: Signal, now: Tick) {
        let next = transition(self.state, signal, now, &self.tuning);
        if next != self.state {
            tracing::trace!(
                enemy = self.id.get(),
                from = ?self.state,
                to = ?next,
                ?signal,
                "controller transition"
            );
        }
        self.state = next;

        if self.state.is_terminal() {
            self.follower.cancel();
            self.goal = None;
            self.intent = MovementIntent::hold();
        }
    }
}
