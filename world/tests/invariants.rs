use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use virus_smash_core::{
    CellIndex, CellKind, Command, Event, SessionState, SpawnKind, GRID_CELLS, MAX_HEALTH,
};
use virus_smash_world::{self as world, query, World};

const SAFE_KINDS: [SpawnKind; 3] = [SpawnKind::Virus, SpawnKind::File, SpawnKind::Boss];

fn random_command(rng: &mut ChaCha8Rng) -> Command {
    match rng.gen_range(0..100) {
        0 => Command::StartSession,
        1..=30 => Command::Tick {
            dt: Duration::from_millis(rng.gen_range(1..900)),
        },
        31..=60 => Command::SpawnCell {
            cell: CellIndex::new(rng.gen_range(0..GRID_CELLS as u32 + 2)),
            // Bombs end the run instantly, so keep them rare to reach later phases.
            kind: if rng.gen_bool(0.02) {
                SpawnKind::Bomb
            } else {
                SAFE_KINDS[rng.gen_range(0..SAFE_KINDS.len())]
            },
        },
        _ => Command::Hit {
            cell: CellIndex::new(rng.gen_range(0..GRID_CELLS as u32 + 2)),
        },
    }
}

#[test]
fn random_play_preserves_session_invariants() {
    for seed in 0..16_u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(&mut world, Command::StartSession, &mut events);

        let mut last_score = 0;
        for _ in 0..2_000 {
            let command = random_command(&mut rng);
            let mut generated = Vec::new();
            world::apply(&mut world, command, &mut generated);

            let snapshot = query::session(&world);
            assert!(snapshot.health <= MAX_HEALTH, "seed {seed}: health overflow");

            let ended = generated
                .iter()
                .filter(|event| matches!(event, Event::SessionEnded { .. }))
                .count();
            assert!(ended <= 1, "seed {seed}: session ended twice in one step");

            if command == Command::StartSession {
                last_score = 0;
            }
            assert!(snapshot.score >= last_score, "seed {seed}: score decreased");
            last_score = snapshot.score;

            if snapshot.state == SessionState::Active {
                assert!(snapshot.health > 0, "seed {seed}: active session without health");
            }

            let grid = query::grid_view(&world);
            let bosses = grid
                .iter()
                .filter(|(_, occupant)| {
                    occupant.map_or(false, |occupant| occupant.kind == CellKind::Boss)
                })
                .count();
            assert!(bosses <= 1, "seed {seed}: more than one boss on the grid");
            assert_eq!(
                bosses == 1,
                snapshot.boss.is_some(),
                "seed {seed}: boss sub-state out of sync with the grid"
            );
            if snapshot.state == SessionState::Ended {
                assert_eq!(grid.empty_cells().count(), GRID_CELLS);
            }
        }
    }
}
