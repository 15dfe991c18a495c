//! Wires the world and its systems into a single step function.

use std::time::Duration;

use virus_smash_core::{Command, Event};
use virus_smash_system_autoplay::Autoplay;
use virus_smash_system_reporting::{Reporting, ScoreSink};
use virus_smash_system_spawning::{Config as SpawningConfig, Spawning};
use virus_smash_world::{self as world, query, World};

/// World plus the systems that react to it.
pub(crate) struct Engine<S> {
    world: World,
    spawning: Spawning,
    reporting: Reporting<S>,
}

impl<S: ScoreSink> Engine<S> {
    pub(crate) fn new(seed: u64, sink: S) -> Self {
        Self {
            world: World::new(),
            spawning: Spawning::new(SpawningConfig::new(seed)),
            reporting: Reporting::new(sink),
        }
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn reporting(&self) -> &Reporting<S> {
        &self.reporting
    }

    /// Applies `command`, lets the systems respond, and returns every resulting event.
    pub(crate) fn step(&mut self, command: Command, player: Option<&mut Autoplay>) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        let mut commands = Vec::new();
        self.spawning.handle(
            &events,
            query::grid_view(&self.world),
            query::boss(&self.world),
            &mut commands,
        );
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }

        if let Some(player) = player {
            let mut hits = Vec::new();
            player.handle(
                query::session_state(&self.world),
                query::grid_view(&self.world),
                query::now(&self.world),
                &mut hits,
            );
            for hit in hits {
                world::apply(&mut self.world, hit, &mut events);
            }
        }

        self.reporting.handle(&events);
        events
    }

    /// Advances time in frames of at most `frame`, collecting the events of every frame.
    pub(crate) fn advance(
        &mut self,
        total: Duration,
        frame: Duration,
        mut player: Option<&mut Autoplay>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let mut remaining = total;
        while !remaining.is_zero() {
            let dt = remaining.min(frame);
            remaining -= dt;
            events.extend(self.step(Command::Tick { dt }, player.as_deref_mut()));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virus_smash_core::SessionState;
    use virus_smash_system_reporting::MemorySink;

    #[test]
    fn advancing_spawns_cells_once_started() {
        let mut engine = Engine::new(9, MemorySink::new());
        let _ = engine.step(Command::StartSession, None);

        let events = engine.advance(Duration::from_millis(1_250), Duration::from_millis(100), None);

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::CellSpawned { .. })));
        assert_eq!(query::session_state(engine.world()), SessionState::Active);
        assert_eq!(query::now(engine.world()), Duration::from_millis(1_250));
    }
}
