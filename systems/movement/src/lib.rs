#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement policies that decide whether an enemy keeps, replaces, or drops its path.
//!
//! A policy never plans by itself. Each tick it inspects the enemy's
//! situation, the current goal, and a read-only battlefield snapshot, and
//! answers with a [`MovementDecision`]. The owning controller performs any
//! requested planning. Policies are chosen once per archetype and never
//! swapped during an enemy's lifetime.

use std::collections::BTreeSet;

use battle_city_core::{
    Adjacency, CellCoord, EnemyId, GoalSpec, MovementDecision, MovementIntent, PlanRequest,
    WorldSnapshot,
};
use battle_city_world::GridMap;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const DEFAULT_REPLAN_THRESHOLD: u32 = 1;
const DEFAULT_PLAYER_HORIZON: u32 = 64;

/// Movement strategy assigned to an archetype.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MovementConfig {
    /// Plan straight to the goal and replan when it drifts too far.
    #[default]
    DirectPursue,
    /// Cycle through waypoints while no goal is active.
    Patrol {
        /// Cells visited in order, wrapping around.
        waypoints: Vec<CellCoord>,
    },
    /// Route around cells threatened by player projectiles.
    Evasive {
        /// Distance from a projectile trajectory, in cells, that counts as dangerous.
        danger_radius: f32,
        /// Extra planning cost for entering a dangerous cell.
        avoid_penalty: u32,
    },
    /// Wander in goal-biased random strides until close to the goal.
    Wander {
        /// Goal distance in cells beyond which wandering is active.
        activate_beyond: u32,
        /// Shortest stride in cells.
        min_stride: u32,
        /// Longest stride in cells.
        max_stride: u32,
        /// Weight of the goal direction against random jitter.
        bias: f32,
        /// Seed mixed with the enemy identifier.
        seed: u64,
    },
}

/// Replanning thresholds shared by every goal-driven movement policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuitConfig {
    /// Goal drift in cells that must be exceeded before replanning.
    pub replan_threshold: u32,
    /// Expansion cap used when chasing players; partial paths are accepted.
    pub player_horizon: Option<u32>,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            replan_threshold: DEFAULT_REPLAN_THRESHOLD,
            player_horizon: Some(DEFAULT_PLAYER_HORIZON),
        }
    }
}

/// The enemy's own situation as seen by its movement policy.
#[derive(Clone, Copy, Debug)]
pub struct MovementContext<'a> {
    /// Enemy being decided for.
    pub enemy: EnemyId,
    /// Cell the enemy occupies.
    pub cell: CellCoord,
    /// Whether the enemy's follower is currently moving along a path.
    pub following: bool,
    /// Cells of the current path still ahead of the enemy.
    pub remaining: &'a [CellCoord],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Planned {
    Goal(CellCoord),
    Waypoint(usize),
    Stride(CellCoord),
}

#[derive(Clone, Debug)]
enum Strategy {
    DirectPursue,
    Patrol {
        waypoints: Vec<CellCoord>,
        cursor: usize,
    },
    Evasive {
        danger_radius: f32,
        avoid_penalty: u32,
        last_danger: Vec<CellCoord>,
    },
    Wander {
        activate_beyond: u32,
        min_stride: u32,
        max_stride: u32,
        bias: f32,
        rng: ChaCha8Rng,
    },
}

/// Per-enemy movement policy instance.
#[derive(Clone, Debug)]
pub struct MovementPolicy {
    strategy: Strategy,
    pursuit: PursuitConfig,
    planned: Option<Planned>,
}

impl MovementPolicy {
    /// Instantiates the configured strategy for one enemy.
    #[must_use]
    pub fn new(config: &MovementConfig, pursuit: PursuitConfig, enemy: EnemyId) -> Self {
        let strategy = match config {
            MovementConfig::DirectPursue => Strategy::DirectPursue,
            MovementConfig::Patrol { waypoints } => Strategy::Patrol {
                waypoints: waypoints.clone(),
                cursor: 0,
            },
            MovementConfig::Evasive {
                danger_radius,
                avoid_penalty,
            } => Strategy::Evasive {
                danger_radius: danger_radius.max(0.0),
                avoid_penalty: *avoid_penalty,
                last_danger: Vec::new(),
            },
            MovementConfig::Wander {
                activate_beyond,
                min_stride,
                max_stride,
                bias,
                seed,
            } => {
                let min_stride = (*min_stride).max(1);
                Strategy::Wander {
                    activate_beyond: *activate_beyond,
                    min_stride,
                    max_stride: (*max_stride).max(min_stride),
                    bias: *bias,
                    rng: ChaCha8Rng::seed_from_u64(seed ^ u64::from(enemy.get())),
                }
            }
        };

        Self {
            strategy,
            pursuit,
            planned: None,
        }
    }

    /// Decides what the enemy should do with its path this tick.
    pub fn decide(
        &mut self,
        context: &MovementContext<'_>,
        goal: Option<&GoalSpec>,
        snapshot: &WorldSnapshot,
        grid: &GridMap,
    ) -> MovementDecision {
        let adjacency = snapshot.adjacency();

        match &mut self.strategy {
            Strategy::DirectPursue => match goal {
                Some(goal) => self.pursue(context, goal, adjacency),
                None => self.without_goal(context),
            },
            Strategy::Patrol { waypoints, cursor } => match goal {
                Some(goal) => self.pursue(context, goal, adjacency),
                None => {
                    if waypoints.is_empty() {
                        return self.without_goal(context);
                    }

                    if context.following && matches!(self.planned, Some(Planned::Waypoint(_))) {
                        return MovementDecision::Proceed(MovementIntent::full_speed());
                    }

                    if context.cell == waypoints[*cursor] {
                        *cursor = (*cursor + 1) % waypoints.len();
                    }

                    let waypoint = waypoints[*cursor];
                    if context.cell == waypoint {
                        self.planned = None;
                        return MovementDecision::Proceed(MovementIntent::hold());
                    }

                    self.planned = Some(Planned::Waypoint(*cursor));
                    MovementDecision::RequestReplan(PlanRequest::new(context.cell, waypoint))
                }
            },
            Strategy::Evasive {
                danger_radius,
                avoid_penalty,
                last_danger,
            } => {
                let Some(goal) = goal else {
                    last_danger.clear();
                    return self.without_goal(context);
                };

                let danger = danger_cells(snapshot, grid, *danger_radius);
                let threatened = context.following
                    && danger != *last_danger
                    && context
                        .remaining
                        .iter()
                        .any(|cell| danger.binary_search(cell).is_ok());

                let drifted = goal_needs_plan(
                    self.planned,
                    self.pursuit.replan_threshold,
                    context,
                    goal.cell(),
                    adjacency,
                );
                if !threatened && !drifted {
                    return MovementDecision::Proceed(MovementIntent::full_speed());
                }

                tracing::trace!(
                    enemy = context.enemy.get(),
                    danger = danger.len(),
                    threatened,
                    "evasive replan"
                );
                last_danger.clone_from(&danger);
                let avoidance = Some((danger, *avoid_penalty));
                self.planned = Some(Planned::Goal(goal.cell()));
                MovementDecision::RequestReplan(goal_request(
                    self.pursuit,
                    context.cell,
                    goal,
                    avoidance,
                ))
            }
            Strategy::Wander {
                activate_beyond,
                min_stride,
                max_stride,
                bias,
                rng,
            } => {
                let Some(goal) = goal else {
                    return self.without_goal(context);
                };

                let target = goal.cell();
                if adjacency.distance(context.cell, target) <= *activate_beyond {
                    return self.pursue(context, goal, adjacency);
                }

                if context.following {
                    return match self.planned {
                        Some(Planned::Stride(_)) => {
                            MovementDecision::Proceed(MovementIntent::full_speed())
                        }
                        _ => self.pursue(context, goal, adjacency),
                    };
                }

                let stride = rng.gen_range(*min_stride..=*max_stride);
                let heading = choose_heading(rng, context.cell, target, *bias);
                match stride_end(grid, context.cell, heading, stride) {
                    Some(end) => {
                        self.planned = Some(Planned::Stride(end));
                        MovementDecision::RequestReplan(PlanRequest::new(context.cell, end))
                    }
                    None => self.pursue(context, goal, adjacency),
                }
            }
        }
    }

    /// Informs the policy that its last requested plan could not be produced.
    pub fn plan_failed(&mut self) {
        if let (Strategy::Patrol { waypoints, cursor }, Some(Planned::Waypoint(_))) =
            (&mut self.strategy, self.planned)
        {
            if !waypoints.is_empty() {
                *cursor = (*cursor + 1) % waypoints.len();
            }
        }
        self.planned = None;
    }

    /// Cell of the goal the current path was planned for, if goal driven.
    #[must_use]
    pub fn planned_goal(&self) -> Option<CellCoord> {
        match self.planned {
            Some(Planned::Goal(cell)) => Some(cell),
            _ => None,
        }
    }

    fn pursue(
        &mut self,
        context: &MovementContext<'_>,
        goal: &GoalSpec,
        adjacency: Adjacency,
    ) -> MovementDecision {
        let target = goal.cell();
        if !goal_needs_plan(
            self.planned,
            self.pursuit.replan_threshold,
            context,
            target,
            adjacency,
        ) {
            let intent = if context.following {
                MovementIntent::full_speed()
            } else {
                MovementIntent::hold()
            };
            return MovementDecision::Proceed(intent);
        }

        self.planned = Some(Planned::Goal(target));
        MovementDecision::RequestReplan(goal_request(self.pursuit, context.cell, goal, None))
    }

    fn without_goal(&mut self, context: &MovementContext<'_>) -> MovementDecision {
        if context.following && self.planned.is_some() {
            self.planned = None;
            return MovementDecision::Abandon;
        }
        MovementDecision::Proceed(MovementIntent::hold())
    }
}

/// Cells whose centres lie within `radius` cells of any projectile trajectory.
///
/// The result is sorted and free of duplicates.
#[must_use]
pub fn danger_cells(snapshot: &WorldSnapshot, grid: &GridMap, radius: f32) -> Vec<CellCoord> {
    let cell_size = grid.cell_size();
    let reach = radius * cell_size;
    let mut cells = BTreeSet::new();

    for trace in snapshot.projectiles() {
        let end = trace.origin + trace.direction.normalize_or_zero() * trace.range.max(0.0);
        let low = trace.origin.min(end) - Vec2::splat(reach);
        let high = trace.origin.max(end) + Vec2::splat(reach);

        let Some((first_column, last_column)) = cell_span(low.x, high.x, cell_size, grid.columns())
        else {
            continue;
        };
        let Some((first_row, last_row)) = cell_span(low.y, high.y, cell_size, grid.rows()) else {
            continue;
        };

        for row in first_row..=last_row {
            for column in first_column..=last_column {
                let cell = CellCoord::new(column, row);
                let Ok(centre) = grid.cell_to_world(cell) else {
                    continue;
                };
                if trace.distance_to(centre) <= reach {
                    let _ = cells.insert(cell);
                }
            }
        }
    }

    cells.into_iter().collect()
}

fn goal_needs_plan(
    planned: Option<Planned>,
    replan_threshold: u32,
    context: &MovementContext<'_>,
    target: CellCoord,
    adjacency: Adjacency,
) -> bool {
    if !context.following {
        return context.cell != target;
    }

    match planned {
        Some(Planned::Goal(last)) => adjacency.distance(last, target) > replan_threshold,
        _ => true,
    }
}

fn goal_request(
    pursuit: PursuitConfig,
    start: CellCoord,
    goal: &GoalSpec,
    avoidance: Option<(Vec<CellCoord>, u32)>,
) -> PlanRequest {
    let mut request = PlanRequest::new(start, goal.cell());
    if let Some((avoid, penalty)) = avoidance {
        request = request.with_avoidance(avoid, penalty);
    }
    if let (Some(_), Some(horizon)) = (goal.player(), pursuit.player_horizon) {
        request = request.with_horizon(horizon);
    }
    request
}

fn cell_span(low: f32, high: f32, cell_size: f32, count: u32) -> Option<(u32, u32)> {
    if count == 0 || high < 0.0 {
        return None;
    }

    let first = (low / cell_size).floor().max(0.0);
    let last = (high / cell_size).floor().min((count - 1) as f32);
    if first > last {
        return None;
    }

    Some((first as u32, last as u32))
}

fn choose_heading(rng: &mut ChaCha8Rng, from: CellCoord, goal: CellCoord, bias: f32) -> (i32, i32) {
    let toward = Vec2::new(
        goal.column() as f32 - from.column() as f32,
        goal.row() as f32 - from.row() as f32,
    )
    .normalize_or_zero();

    let mut best = (0, -1);
    let mut best_score = f32::NEG_INFINITY;
    for &(columns, rows) in Adjacency::Cardinal.offsets() {
        let jitter: f32 = rng.gen();
        let score = jitter + bias * toward.dot(Vec2::new(columns as f32, rows as f32));
        if score > best_score {
            best = (columns, rows);
            best_score = score;
        }
    }
    best
}

fn stride_end(
    grid: &GridMap,
    from: CellCoord,
    (columns, rows): (i32, i32),
    stride: u32,
) -> Option<CellCoord> {
    let mut end = from;
    for _ in 0..stride {
        let Some(next) = end.offset(columns, rows) else {
            break;
        };
        if !grid.is_traversable(next).unwrap_or(false) {
            break;
        }
        end = next;
    }
    (end != from).then_some(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_city_world::GridConfig;

    #[test]
    fn cell_span_clamps_to_grid() {
        assert_eq!(cell_span(-3.0, 2.5, 1.0, 4), Some((0, 2)));
        assert_eq!(cell_span(1.0, 99.0, 2.0, 4), Some((0, 3)));
        assert_eq!(cell_span(-5.0, -1.0, 1.0, 4), None);
        assert_eq!(cell_span(9.0, 12.0, 1.0, 4), None);
    }

    #[test]
    fn stride_stops_before_walls_and_edges() {
        let mut grid =
            GridMap::new(GridConfig::new(6, 1, 1.0, Adjacency::Cardinal)).expect("grid");
        let _ = grid
            .set_traversable(CellCoord::new(3, 0), false)
            .expect("in range");
        let from = CellCoord::new(1, 0);
        assert_eq!(stride_end(&grid, from, (1, 0), 5), Some(CellCoord::new(2, 0)));
        assert_eq!(stride_end(&grid, from, (-1, 0), 5), Some(CellCoord::new(0, 0)));
        assert_eq!(stride_end(&grid, from, (0, -1), 5), None);
    }

    #[test]
    fn heavy_bias_points_at_the_goal() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..16 {
            let heading =
                choose_heading(&mut rng, CellCoord::new(5, 5), CellCoord::new(5, 0), 10.0);
            assert_eq!(heading, (0, -1));
        }
    }
}
