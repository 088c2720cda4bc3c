//! Enemy lifecycle states and their pure transition function.

use battle_city_core::Tick;
use serde::{Deserialize, Serialize};

const DEFAULT_GOAL_REPOLL_TICKS: u64 = 30;
const DEFAULT_PLAN_BACKOFF_TICKS: u64 = 20;
const MIN_PLAN_BACKOFF_TICKS: u64 = 2;

/// Timing knobs shared by every enemy controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerTuning {
    /// Ticks an idle controller waits before asking its goal policy again.
    pub goal_repoll_ticks: u64,
    /// Ticks a controller waits after a failed plan before trying again.
    pub plan_backoff_ticks: u64,
}

impl ControllerTuning {
    /// Creates tuning with explicit intervals.
    #[must_use]
    pub const fn new(goal_repoll_ticks: u64, plan_backoff_ticks: u64) -> Self {
        Self {
            goal_repoll_ticks,
            plan_backoff_ticks,
        }
    }

    /// Effective idle re-poll interval; at least one tick.
    #[must_use]
    pub fn repoll_interval(&self) -> u64 {
        self.goal_repoll_ticks.max(1)
    }

    /// Effective planning backoff.
    ///
    /// Never shorter than two ticks so a failed plan is never retried on the
    /// immediately following tick.
    #[must_use]
    pub fn backoff(&self) -> u64 {
        self.plan_backoff_ticks.max(MIN_PLAN_BACKOFF_TICKS)
    }
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self::new(DEFAULT_GOAL_REPOLL_TICKS, DEFAULT_PLAN_BACKOFF_TICKS)
    }
}

/// Sub-state of a controller that is alive on the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivePhase {
    /// No goal; the goal policy is polled again at `repoll_at`.
    Idle {
        /// Tick of the next goal poll.
        repoll_at: Tick,
    },
    /// A goal is held and the controller plans towards it.
    Engaged,
    /// Planning failed; nothing is planned before `until`.
    BackingOff {
        /// First tick at which planning may resume.
        until: Tick,
    },
}

/// Lifecycle of an enemy controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Created by the spawner but not yet acting.
    Spawning,
    /// Alive and acting on the field.
    Active(ActivePhase),
    /// Killed by the damage system. Terminal.
    Dead,
    /// Removed without dying. Terminal.
    Despawned,
}

impl ControllerState {
    /// Whether no further transitions can happen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Dead | Self::Despawned)
    }

    /// Whether the controller is acting on the field.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// Inputs that drive controller transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The spawner finished creating the enemy.
    Activated,
    /// The goal policy returned a goal.
    GoalAcquired,
    /// The goal policy returned no goal.
    NoGoal,
    /// A requested plan produced a path.
    PlanSucceeded,
    /// A requested plan failed.
    PlanFailed,
    /// The follower stopped in front of a blocked cell.
    PathBlocked,
    /// The follower reached the end of its path.
    Arrived,
    /// The backoff deadline may have passed.
    BackoffElapsed,
    /// The damage system killed the enemy.
    Died,
    /// The match removed the enemy.
    Despawned,
}

/// Computes the state that follows `state` after `signal` at tick `now`.
///
/// Terminal states absorb every signal. Death and despawn are accepted from
/// any other state. A blocked path does not back off: the controller stays
/// engaged and replans on its next update.
#[must_use]
pub fn transition(
    state: ControllerState,
    signal: Signal,
    now: Tick,
    tuning: &ControllerTuning,
) -> ControllerState {
    use ControllerState::{Active, Dead, Despawned, Spawning};

    match (state, signal) {
        (Dead | Despawned, _) => state,
        (_, Signal::Died) => Dead,
        (_, Signal::Despawned) => Despawned,
        (Spawning, Signal::Activated) => Active(ActivePhase::Idle { repoll_at: now }),
        (Spawning, _) => Spawning,
        (Active(_), Signal::GoalAcquired) => Active(ActivePhase::Engaged),
        (Active(_), Signal::NoGoal) => Active(ActivePhase::Idle {
            repoll_at: now.after(tuning.repoll_interval()),
        }),
        (Active(_), Signal::PlanFailed) => Active(ActivePhase::BackingOff {
            until: now.after(tuning.backoff()),
        }),
        (Active(ActivePhase::BackingOff { until }), Signal::BackoffElapsed) if now >= until => {
            Active(ActivePhase::Idle { repoll_at: now })
        }
        (
            Active(_),
            Signal::Activated
            | Signal::PlanSucceeded
            | Signal::PathBlocked
            | Signal::Arrived
            | Signal::BackoffElapsed,
        ) => state,
    }
}
