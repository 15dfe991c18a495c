#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded spawning system responsible for emitting cell spawn commands.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use virus_smash_core::{
    BossSnapshot, CellIndex, Command, Event, GridView, Phase, SpawnKind, BOSS_READINESS_THRESHOLD,
    BOSS_SPAWN_DRAW,
};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that answers scheduler ticks with spawn commands.
#[derive(Debug)]
pub struct Spawning {
    rng: ChaCha8Rng,
    boss_readiness: Duration,
    claimed: Vec<CellIndex>,
    candidates: Vec<CellIndex>,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            boss_readiness: Duration::ZERO,
            claimed: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Time accumulated toward the next boss encounter.
    #[must_use]
    pub fn boss_readiness(&self) -> Duration {
        self.boss_readiness
    }

    /// Consumes world events and the current grid to emit spawn commands.
    ///
    /// Every [`Event::SpawnDue`] yields at most one [`Command::SpawnCell`].
    /// Positions chosen earlier in the same batch are treated as occupied, so a
    /// burst of overdue ticks never aims two spawns at one cell.
    pub fn handle(
        &mut self,
        events: &[Event],
        grid: GridView<'_>,
        boss: Option<BossSnapshot>,
        out: &mut Vec<Command>,
    ) {
        self.claimed.clear();
        let mut boss_active = boss.is_some();

        for event in events {
            match event {
                Event::SessionStarted { .. } => {
                    self.boss_readiness = Duration::ZERO;
                    self.claimed.clear();
                    boss_active = false;
                }
                Event::SpawnDue { phase, interval } => {
                    if let Some(command) = self.decide(*phase, *interval, grid, boss_active) {
                        if let Command::SpawnCell {
                            kind: SpawnKind::Boss,
                            ..
                        } = command
                        {
                            boss_active = true;
                        }
                        out.push(command);
                    }
                }
                _ => {}
            }
        }
    }

    fn decide(
        &mut self,
        phase: Phase,
        interval: Duration,
        grid: GridView<'_>,
        boss_active: bool,
    ) -> Option<Command> {
        self.candidates.clear();
        let claimed = &self.claimed;
        self.candidates
            .extend(grid.empty_cells().filter(|cell| !claimed.contains(cell)));
        if self.candidates.is_empty() {
            debug!("grid full, skipping spawn");
            return None;
        }

        self.boss_readiness = self.boss_readiness.saturating_add(interval);
        let kind = if !boss_active
            && self.boss_readiness > BOSS_READINESS_THRESHOLD
            && self.rng.gen::<f64>() > BOSS_SPAWN_DRAW
        {
            self.boss_readiness = Duration::ZERO;
            SpawnKind::Boss
        } else {
            phase.classify_roll(self.rng.gen::<f64>())
        };

        let cell = self.candidates[self.rng.gen_range(0..self.candidates.len())];
        self.claimed.push(cell);
        Some(Command::SpawnCell { cell, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virus_smash_core::{CellKind, Generation, Occupant, GRID_CELLS};

    #[test]
    fn full_grid_skips_without_charging_the_boss() {
        let cells = [Some(Occupant {
            kind: CellKind::Bomb,
            generation: Generation::new(1),
            placed_at: Duration::ZERO,
        }); GRID_CELLS];
        let mut spawning = Spawning::new(Config::new(7));
        let mut out = Vec::new();

        spawning.handle(
            &[Event::SpawnDue {
                phase: Phase::One,
                interval: Phase::One.spawn_interval(),
            }],
            GridView::new(&cells),
            None,
            &mut out,
        );

        assert!(out.is_empty());
        assert_eq!(spawning.boss_readiness(), Duration::ZERO);
    }
}
