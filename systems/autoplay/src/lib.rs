#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Simulated player that emits hit commands for headless runs.
//!
//! The player looks at every cell once it has been visible for the configured
//! reaction time and decides, once per cell instance, whether to act on it.

use std::{collections::BTreeMap, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use virus_smash_core::{CellKind, Command, Generation, GridView, SessionState};

/// Tuning knobs describing how the simulated player behaves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time a cell must be visible before the player reacts to it.
    #[serde(with = "millis")]
    pub reaction: Duration,
    /// Probability of engaging a virus or boss once it is noticed.
    pub accuracy: f64,
    /// Probability of clicking a bomb or file by mistake.
    pub blunder_rate: f64,
    /// Seed of the decision stream.
    pub rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reaction: Duration::from_millis(450),
            accuracy: 0.9,
            blunder_rate: 0.02,
            rng_seed: 0x0a11_ce5e_ed00_0001,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Engage,
    Ignore,
}

/// Pure system that plays the game on behalf of a user.
#[derive(Debug)]
pub struct Autoplay {
    config: Config,
    rng: ChaCha8Rng,
    decisions: BTreeMap<Generation, Decision>,
}

impl Autoplay {
    /// Creates a simulated player from the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            decisions: BTreeMap::new(),
        }
    }

    /// Inspects the grid and emits at most one hit per noticed cell.
    pub fn handle(
        &mut self,
        state: SessionState,
        grid: GridView<'_>,
        now: Duration,
        out: &mut Vec<Command>,
    ) {
        if state != SessionState::Active {
            self.decisions.clear();
            return;
        }

        self.decisions.retain(|generation, _| {
            grid.iter()
                .any(|(_, occupant)| occupant.map_or(false, |o| o.generation == *generation))
        });

        for (cell, occupant) in grid.iter() {
            let Some(occupant) = occupant else {
                continue;
            };
            if now.saturating_sub(occupant.placed_at) < self.config.reaction {
                continue;
            }

            let chance = match occupant.kind {
                CellKind::Virus | CellKind::Boss => self.config.accuracy,
                CellKind::Bomb | CellKind::File => self.config.blunder_rate,
                CellKind::Exploding => continue,
            };
            let rng = &mut self.rng;
            let decision = *self.decisions.entry(occupant.generation).or_insert_with(|| {
                if rng.gen_bool(chance.clamp(0.0, 1.0)) {
                    Decision::Engage
                } else {
                    Decision::Ignore
                }
            });

            if decision == Decision::Engage {
                out.push(Command::Hit { cell });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virus_smash_core::{CellIndex, Occupant, GRID_CELLS};

    fn grid_with(kind: CellKind) -> [Option<Occupant>; GRID_CELLS] {
        let mut cells = [None; GRID_CELLS];
        cells[5] = Some(Occupant {
            kind,
            generation: Generation::new(9),
            placed_at: Duration::from_millis(1_000),
        });
        cells
    }

    fn careful() -> Config {
        Config {
            reaction: Duration::from_millis(300),
            accuracy: 1.0,
            blunder_rate: 0.0,
            rng_seed: 1,
        }
    }

    #[test]
    fn waits_for_reaction_time() {
        let cells = grid_with(CellKind::Virus);
        let mut player = Autoplay::new(careful());
        let mut out = Vec::new();

        let view = GridView::new(&cells);
        player.handle(SessionState::Active, view, Duration::from_millis(1_200), &mut out);
        assert!(out.is_empty());

        player.handle(SessionState::Active, view, Duration::from_millis(1_300), &mut out);
        assert_eq!(
            out,
            vec![Command::Hit {
                cell: CellIndex::new(5)
            }]
        );
    }

    #[test]
    fn careful_player_leaves_traps_alone() {
        let mut out = Vec::new();
        for kind in [CellKind::Bomb, CellKind::File, CellKind::Exploding] {
            let cells = grid_with(kind);
            let mut player = Autoplay::new(careful());
            let view = GridView::new(&cells);
            player.handle(SessionState::Active, view, Duration::from_secs(5), &mut out);
        }
        assert!(out.is_empty());
    }

    #[test]
    fn idle_sessions_are_not_played() {
        let cells = grid_with(CellKind::Virus);
        let mut player = Autoplay::new(careful());
        let mut out = Vec::new();
        let view = GridView::new(&cells);
        player.handle(SessionState::Ended, view, Duration::from_secs(5), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn config_reads_reaction_as_millis() {
        let config: Config = serde_json::from_str(r#"{"reaction": 250, "accuracy": 0.5}"#)
            .expect("valid config");
        assert_eq!(config.reaction, Duration::from_millis(250));
        assert!((config.accuracy - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.rng_seed, Config::default().rng_seed);
    }
}
