//! Minimal stand-in for the game engine that a headless run talks to.

use battle_city_core::{
    Archetype, CellCoord, EnemyFactory, EnemyId, PlayerId, PlayerSnapshot, ProjectileTrace,
};
use battle_city_world::GridMap;
use glam::Vec2;

const PATROL_REACH: u32 = 4;
const TICKS_PER_STEP: u64 = 20;
const PLAYER_HEALTH: u32 = 3;
const SHOT_RANGE: f32 = 6.0;

/// Hands out sequential enemy identifiers starting at one.
#[derive(Debug, Default)]
pub(crate) struct StubHost {
    next_enemy: u32,
}

impl EnemyFactory for StubHost {
    fn create_enemy(&mut self, archetype: &Archetype, position: Vec2) -> EnemyId {
        self.next_enemy += 1;
        tracing::trace!(
            enemy = self.next_enemy,
            archetype = archetype.as_str(),
            x = position.x,
            y = position.y,
            "actor created"
        );
        EnemyId::new(self.next_enemy)
    }
}

/// Player that paces back and forth west of its start and fires north.
#[derive(Debug)]
pub(crate) struct ScriptedPlayer {
    id: PlayerId,
    route: Vec<CellCoord>,
    step: usize,
}

impl ScriptedPlayer {
    pub(crate) fn new(id: PlayerId, start: CellCoord, grid: &GridMap) -> Self {
        let mut route = vec![start];
        let mut cell = start;
        for _ in 0..PATROL_REACH {
            match cell.offset(-1, 0) {
                Some(next) if grid.is_traversable(next).unwrap_or(false) => {
                    route.push(next);
                    cell = next;
                }
                _ => break,
            }
        }
        let back: Vec<CellCoord> = route.iter().rev().skip(1).copied().collect();
        if back.len() > 1 {
            route.extend(back.iter().take(back.len() - 1));
        }
        Self { id, route, step: 0 }
    }

    pub(crate) fn cell(&self) -> CellCoord {
        self.route[self.step % self.route.len()]
    }

    /// Moves one cell along the route every few ticks.
    pub(crate) fn advance(&mut self, tick: u64) {
        if tick > 0 && tick % TICKS_PER_STEP == 0 {
            self.step = (self.step + 1) % self.route.len();
        }
    }

    pub(crate) fn snapshot(&self, grid: &GridMap) -> PlayerSnapshot {
        let cell = self.cell();
        PlayerSnapshot {
            id: self.id,
            cell,
            position: grid.cell_to_world(cell).unwrap_or(Vec2::ZERO),
            health: PLAYER_HEALTH,
            alive: true,
        }
    }

    pub(crate) fn shot(&self, grid: &GridMap) -> ProjectileTrace {
        ProjectileTrace {
            owner: self.id,
            origin: grid.cell_to_world(self.cell()).unwrap_or(Vec2::ZERO),
            direction: Vec2::new(0.0, -1.0),
            range: SHOT_RANGE * grid.cell_size(),
        }
    }

    /// First obstacle cell straight north of the player, if any.
    pub(crate) fn target_obstacle(&self, grid: &GridMap) -> Option<CellCoord> {
        let mut cell = self.cell();
        while let Some(next) = cell.offset(0, -1) {
            if !grid.contains(next) {
                return None;
            }
            if grid.obstacle_at(next).ok().flatten().is_some() {
                return Some(next);
            }
            cell = next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_city_core::{Adjacency, ObstacleKind};
    use battle_city_world::{GridConfig, LegendEntry, MapLayout};

    #[test]
    fn route_paces_west_and_back() {
        let grid = GridMap::new(GridConfig::new(8, 2, 1.0, Adjacency::Cardinal)).expect("grid");
        let mut player = ScriptedPlayer::new(PlayerId::new(1), CellCoord::new(2, 1), &grid);
        let mut visited = Vec::new();
        for tick in 0..(TICKS_PER_STEP * 5) {
            player.advance(tick);
            if tick % TICKS_PER_STEP == 0 {
                visited.push(player.cell().column());
            }
        }
        assert_eq!(visited, vec![2, 1, 0, 1, 2]);
    }

    #[test]
    fn finds_the_first_obstacle_to_the_north() {
        let mut layout = MapLayout {
            rows: vec!["#".to_owned(), ".".to_owned(), ".".to_owned()],
            ..MapLayout::default()
        };
        let _ = layout
            .legend
            .insert('#', LegendEntry::obstacle(ObstacleKind::Brick));
        let (grid, _) = layout.build().expect("layout");
        let player = ScriptedPlayer::new(PlayerId::new(1), CellCoord::new(0, 2), &grid);
        assert_eq!(player.target_obstacle(&grid), Some(CellCoord::new(0, 0)));
    }

    #[test]
    fn host_ids_are_sequential() {
        let mut host = StubHost::default();
        let archetype = Archetype::new("basic");
        assert_eq!(host.create_enemy(&archetype, Vec2::ZERO), EnemyId::new(1));
        assert_eq!(host.create_enemy(&archetype, Vec2::ZERO), EnemyId::new(2));
    }
}
