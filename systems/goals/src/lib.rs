#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Goal policies that decide what an enemy currently wants to reach.
//!
//! Goal selection is independent of how the enemy moves. A policy reads the
//! world snapshot and returns a [`GoalSpec`], or `None` when nothing is worth
//! pursuing. Ties between equally distant players always resolve to the lower
//! player identifier. Randomised strategies draw from a per-enemy ChaCha
//! stream derived from the configured seed and the enemy identifier.

use battle_city_core::{CellCoord, EnemyId, GoalSpec, PlayerSnapshot, Tick, WorldSnapshot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Goal strategy assigned to an archetype.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalConfig {
    /// Always target the player base.
    #[default]
    AttackBase,
    /// Target the closest live player, re-evaluating only every few ticks.
    HuntNearestPlayer {
        /// Ticks between re-evaluations of the nearest player.
        reevaluate_every: u64,
    },
    /// Target the closest player inside the aggro radius, else the base.
    Opportunistic {
        /// Grid distance within which players draw aggro.
        aggro_radius: u32,
    },
    /// Switch between players and the base depending on how many enemies remain.
    AdvantageBias {
        /// At or below this many live enemies the policy hunts players.
        low: u32,
        /// At or above this many live enemies the policy attacks the base.
        high: u32,
    },
    /// Decide once, on the first selection, whether to hunt players or the base.
    RandomFixed {
        /// Probability of hunting players, in `[0, 1]`.
        hunt_player_chance: f32,
        /// Seed of the decision stream.
        seed: u64,
    },
    /// Redraw between players and the base every few ticks.
    ///
    /// The hunt chance grows by `advantage_bias` when live enemies are at or
    /// below `low`, shrinks by it at or above `high`, and is jittered by up to
    /// `jitter` on every draw.
    WeightedDynamic {
        /// Base probability of hunting players.
        hunt_player_chance: f32,
        /// Shift applied to the chance depending on the live enemy count.
        advantage_bias: f32,
        /// Maximum random offset added to each draw.
        jitter: f32,
        /// At or below this many live enemies the chance is raised.
        low: u32,
        /// At or above this many live enemies the chance is lowered.
        high: u32,
        /// Ticks between draws.
        reevaluate_every: u64,
        /// Seed of the decision stream.
        seed: u64,
    },
}

/// The enemy's own situation as seen by its goal policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GoalContext {
    /// Enemy selecting a goal.
    pub enemy: EnemyId,
    /// Cell the enemy occupies.
    pub cell: CellCoord,
    /// Current simulation tick.
    pub tick: Tick,
}

#[derive(Clone, Debug)]
enum Strategy {
    AttackBase,
    HuntNearestPlayer {
        reevaluate_every: u64,
        evaluated_at: Option<Tick>,
    },
    Opportunistic {
        aggro_radius: u32,
    },
    AdvantageBias {
        low: u32,
        high: u32,
        hunting: bool,
    },
    RandomFixed {
        hunt_player_chance: f32,
        rng: ChaCha8Rng,
        hunting: Option<bool>,
    },
    WeightedDynamic {
        hunt_player_chance: f32,
        advantage_bias: f32,
        jitter: f32,
        low: u32,
        high: u32,
        reevaluate_every: u64,
        rng: ChaCha8Rng,
        hunting: bool,
        drawn_at: Option<Tick>,
    },
}

/// Per-enemy goal policy instance.
#[derive(Clone, Debug)]
pub struct GoalPolicy {
    strategy: Strategy,
    current: Option<GoalSpec>,
}

impl GoalPolicy {
    /// Instantiates the configured strategy for one enemy.
    #[must_use]
    pub fn new(config: GoalConfig, enemy: EnemyId) -> Self {
        let strategy = match config {
            GoalConfig::AttackBase => Strategy::AttackBase,
            GoalConfig::HuntNearestPlayer { reevaluate_every } => Strategy::HuntNearestPlayer {
                reevaluate_every: reevaluate_every.max(1),
                evaluated_at: None,
            },
            GoalConfig::Opportunistic { aggro_radius } => Strategy::Opportunistic { aggro_radius },
            GoalConfig::AdvantageBias { low, high } => Strategy::AdvantageBias {
                low,
                high: high.max(low),
                hunting: false,
            },
            GoalConfig::RandomFixed {
                hunt_player_chance,
                seed,
            } => Strategy::RandomFixed {
                hunt_player_chance: probability(hunt_player_chance),
                rng: enemy_stream(seed, enemy),
                hunting: None,
            },
            GoalConfig::WeightedDynamic {
                hunt_player_chance,
                advantage_bias,
                jitter,
                low,
                high,
                reevaluate_every,
                seed,
            } => Strategy::WeightedDynamic {
                hunt_player_chance: probability(hunt_player_chance),
                advantage_bias: if advantage_bias.is_finite() {
                    advantage_bias
                } else {
                    0.0
                },
                jitter: probability(jitter),
                low,
                high: high.max(low),
                reevaluate_every: reevaluate_every.max(1),
                rng: enemy_stream(seed, enemy),
                hunting: false,
                drawn_at: None,
            },
        };

        Self {
            strategy,
            current: None,
        }
    }

    /// Goal returned by the most recent selection.
    #[must_use]
    pub const fn current(&self) -> Option<GoalSpec> {
        self.current
    }

    /// Selects the goal the enemy should pursue, or `None` to idle.
    pub fn select_goal(
        &mut self,
        context: &GoalContext,
        snapshot: &WorldSnapshot,
    ) -> Option<GoalSpec> {
        let selected = match &mut self.strategy {
            Strategy::AttackBase => base_goal(snapshot),
            Strategy::HuntNearestPlayer {
                reevaluate_every,
                evaluated_at,
            } => {
                let kept = self
                    .current
                    .and_then(|goal| goal.refreshed(snapshot))
                    .filter(|goal| goal.player().is_some());
                let due = evaluated_at
                    .map_or(true, |tick| context.tick.since(tick) >= *reevaluate_every);

                match kept {
                    Some(goal) if !due => Some(goal),
                    _ => {
                        *evaluated_at = Some(context.tick);
                        nearest_player_goal(snapshot, context.cell, None)
                    }
                }
            }
            Strategy::Opportunistic { aggro_radius } => {
                nearest_player_goal(snapshot, context.cell, Some(*aggro_radius))
                    .or_else(|| base_goal(snapshot))
            }
            Strategy::AdvantageBias { low, high, hunting } => {
                let alive = snapshot.alive_enemies();
                if alive <= *low {
                    *hunting = true;
                } else if alive >= *high {
                    *hunting = false;
                }

                split_goal(*hunting, snapshot, context.cell)
            }
            Strategy::RandomFixed {
                hunt_player_chance,
                rng,
                hunting,
            } => {
                let hunting =
                    *hunting.get_or_insert_with(|| rng.gen::<f32>() < *hunt_player_chance);
                split_goal(hunting, snapshot, context.cell)
            }
            Strategy::WeightedDynamic {
                hunt_player_chance,
                advantage_bias,
                jitter,
                low,
                high,
                reevaluate_every,
                rng,
                hunting,
                drawn_at,
            } => {
                let due = drawn_at
                    .map_or(true, |tick| context.tick.since(tick) >= *reevaluate_every);
                if due {
                    let alive = snapshot.alive_enemies();
                    let mut chance = *hunt_player_chance;
                    if alive >= *high {
                        chance -= *advantage_bias;
                    } else if alive <= *low {
                        chance += *advantage_bias;
                    }
                    chance += rng.gen_range(-*jitter..=*jitter);
                    *hunting = rng.gen::<f32>() < chance.clamp(0.0, 1.0);
                    *drawn_at = Some(context.tick);
                    tracing::trace!(
                        enemy = context.enemy.get(),
                        alive,
                        chance,
                        hunting = *hunting,
                        "goal redrawn"
                    );
                }
                split_goal(*hunting, snapshot, context.cell)
            }
        };

        if selected != self.current {
            tracing::debug!(
                enemy = context.enemy.get(),
                goal = ?selected,
                "goal changed"
            );
        }
        self.current = selected;
        selected
    }
}

fn enemy_stream(seed: u64, enemy: EnemyId) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ u64::from(enemy.get()))
}

fn probability(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Prefers players when `hunting`, else the base, falling back to the other.
fn split_goal(hunting: bool, snapshot: &WorldSnapshot, from: CellCoord) -> Option<GoalSpec> {
    if hunting {
        nearest_player_goal(snapshot, from, None).or_else(|| base_goal(snapshot))
    } else {
        base_goal(snapshot).or_else(|| nearest_player_goal(snapshot, from, None))
    }
}

fn base_goal(snapshot: &WorldSnapshot) -> Option<GoalSpec> {
    snapshot.base().map(|cell| GoalSpec::Base { cell })
}

fn nearest_player_goal(
    snapshot: &WorldSnapshot,
    from: CellCoord,
    within: Option<u32>,
) -> Option<GoalSpec> {
    snapshot
        .nearest_live_player(from, within)
        .map(|player: &PlayerSnapshot| GoalSpec::Player {
            id: player.id,
            cell: player.cell,
        })
}
