#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session and grid state for Virus Smash.
//!
//! The world owns the only mutable copy of the session aggregate. Every
//! mutation flows through [`apply`], which also drives the explicit timer
//! queue that replaces ambient event-loop callbacks: the recurring spawn
//! scheduler, per-cell expiry, explosion clean-up and the post-game reveal.

mod timers;

use std::time::Duration;

use timers::{TimerId, TimerQueue};
use tracing::{debug, info, trace};
use virus_smash_core::{
    virus_reward, CellIndex, CellKind, Command, EndCause, Event, Generation, HealthChange,
    Occupant, Phase, SessionId, SessionState, SessionSummary, SpawnError, SpawnKind,
    BOSS_EXPIRY_DAMAGE, BOSS_HEAL, BOSS_HITS, BOSS_LIFETIME, BOSS_REWARD, EXPLOSION_LIFETIME,
    FILE_DAMAGE, GRID_CELLS, MAX_HEALTH, REVEAL_DELAY, VIRUS_EXPIRY_DAMAGE, WELCOME_BANNER,
};

/// Deferred actions tracked by the timer queue.
#[derive(Clone, Copy, Debug)]
enum Timer {
    Spawn,
    Expire {
        cell: CellIndex,
        generation: Generation,
    },
    ClearExplosion {
        cell: CellIndex,
        generation: Generation,
    },
    Reveal {
        session: SessionId,
    },
}

#[derive(Clone, Copy, Debug)]
struct Boss {
    cell: CellIndex,
    remaining_hits: u8,
}

/// Represents the authoritative Virus Smash world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    session: Option<SessionId>,
    state: SessionState,
    health: u32,
    score: u32,
    combo: u32,
    best_combo: u32,
    viruses_smashed: u32,
    bosses_defeated: u32,
    now: Duration,
    survival: Duration,
    phase: Phase,
    boss: Option<Boss>,
    revealed: bool,
    cells: [Option<Occupant>; GRID_CELLS],
    timers: TimerQueue<Timer>,
    spawn_timer: Option<TimerId>,
    last_spawn_decision: Duration,
    next_generation: u64,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a new world waiting for its first session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            session: None,
            state: SessionState::Idle,
            health: MAX_HEALTH,
            score: 0,
            combo: 0,
            best_combo: 0,
            viruses_smashed: 0,
            bosses_defeated: 0,
            now: Duration::ZERO,
            survival: Duration::ZERO,
            phase: Phase::One,
            boss: None,
            revealed: false,
            cells: [None; GRID_CELLS],
            timers: TimerQueue::new(),
            spawn_timer: None,
            last_spawn_decision: Duration::ZERO,
            next_generation: 0,
        }
    }

    fn start_session(&mut self, out_events: &mut Vec<Event>) {
        let session = SessionId::new(self.session.map_or(1, |id| id.get().wrapping_add(1)));

        self.timers.clear();
        self.cells = [None; GRID_CELLS];
        self.session = Some(session);
        self.state = SessionState::Active;
        self.health = MAX_HEALTH;
        self.score = 0;
        self.combo = 0;
        self.best_combo = 0;
        self.viruses_smashed = 0;
        self.bosses_defeated = 0;
        self.survival = Duration::ZERO;
        self.phase = Phase::One;
        self.boss = None;
        self.revealed = false;
        self.last_spawn_decision = self.now;
        self.spawn_timer = Some(self.timers.schedule(
            self.now.saturating_add(self.phase.spawn_interval()),
            Timer::Spawn,
        ));

        info!(session = session.get(), "session started");
        out_events.push(Event::SessionStarted { session });
    }

    fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        out_events.push(Event::TimeAdvanced { dt });

        let target = self.now.saturating_add(dt);
        // One grid's worth of overdue spawn ticks per tick; the rest are dropped.
        let mut spawn_budget = GRID_CELLS;
        let mut spawns_dropped = false;
        while let Some((due, timer)) = self.timers.pop_due(target) {
            self.advance_clock_to(due, out_events);
            if matches!(timer, Timer::Spawn) {
                if spawn_budget == 0 {
                    spawns_dropped = true;
                    if let Some(id) = self.spawn_timer.take() {
                        let _ = self.timers.cancel(id);
                    }
                    self.last_spawn_decision = self.now;
                    continue;
                }
                spawn_budget -= 1;
            }
            self.fire(timer, out_events);
        }
        self.advance_clock_to(target, out_events);

        if spawns_dropped && self.spawn_timer.is_none() && self.state == SessionState::Active {
            debug!("overdue spawn ticks dropped");
            self.spawn_timer = Some(self.timers.schedule(
                target.saturating_add(self.phase.spawn_interval()),
                Timer::Spawn,
            ));
        }
    }

    fn advance_clock_to(&mut self, instant: Duration, out_events: &mut Vec<Event>) {
        if instant <= self.now {
            return;
        }

        if self.state == SessionState::Active {
            self.survival = self.survival.saturating_add(instant - self.now);
        }
        self.now = instant;

        let phase = Phase::from_survival_secs(self.survival.as_secs());
        if phase != self.phase && self.state == SessionState::Active {
            self.phase = phase;
            self.rearm_spawn_for_phase();
            debug!(phase = phase.number(), "difficulty phase changed");
            out_events.push(Event::PhaseChanged { phase });
        }
    }

    /// Pulls the pending spawn forward so the new cadence applies immediately.
    fn rearm_spawn_for_phase(&mut self) {
        if let Some(id) = self.spawn_timer.take() {
            let _ = self.timers.cancel(id);
        }
        let due = self
            .last_spawn_decision
            .saturating_add(self.phase.spawn_interval())
            .max(self.now);
        self.spawn_timer = Some(self.timers.schedule(due, Timer::Spawn));
    }

    fn fire(&mut self, timer: Timer, out_events: &mut Vec<Event>) {
        match timer {
            Timer::Spawn => {
                if self.state != SessionState::Active {
                    return;
                }
                // A phase change at this very instant may already have re-armed the scheduler.
                if let Some(id) = self.spawn_timer.take() {
                    let _ = self.timers.cancel(id);
                }
                let interval = self.phase.spawn_interval();
                self.last_spawn_decision = self.now;
                self.spawn_timer = Some(
                    self.timers
                        .schedule(self.now.saturating_add(interval), Timer::Spawn),
                );
                out_events.push(Event::SpawnDue {
                    phase: self.phase,
                    interval,
                });
            }
            Timer::Expire { cell, generation } => self.expire(cell, generation, out_events),
            Timer::ClearExplosion { cell, generation } => {
                if self.take_if_current(cell, generation).is_some() {
                    out_events.push(Event::CellCleared { cell });
                }
            }
            Timer::Reveal { session } => {
                if self.session == Some(session) && self.state == SessionState::Ended {
                    self.revealed = true;
                    out_events.push(Event::ResultRevealed { session });
                }
            }
        }
    }

    /// Empties the cell only when it still holds the instance the timer was armed for.
    fn take_if_current(&mut self, cell: CellIndex, generation: Generation) -> Option<Occupant> {
        let slot = cell.slot()?;
        match self.cells[slot] {
            Some(occupant) if occupant.generation == generation => self.cells[slot].take(),
            _ => {
                trace!(cell = cell.get(), generation = generation.get(), "discarding stale timer");
                None
            }
        }
    }

    fn expire(&mut self, cell: CellIndex, generation: Generation, out_events: &mut Vec<Event>) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(occupant) = self.take_if_current(cell, generation) else {
            return;
        };

        // Only viruses and bosses arm expiry timers.
        let (kind, damage, cause) = match occupant.kind {
            CellKind::Boss => (SpawnKind::Boss, BOSS_EXPIRY_DAMAGE, HealthChange::BossExpired),
            _ => (SpawnKind::Virus, VIRUS_EXPIRY_DAMAGE, HealthChange::VirusExpired),
        };

        out_events.push(Event::CellExpired { cell, kind });
        if kind == SpawnKind::Boss {
            self.boss = None;
            out_events.push(Event::ScreenShake);
        }
        self.damage(damage, cause, out_events);
        self.reset_combo(out_events);
        self.end_if_depleted(EndCause::HealthDepleted, out_events);
    }

    fn spawn(&mut self, cell: CellIndex, kind: SpawnKind, out_events: &mut Vec<Event>) {
        let rejection = if self.state != SessionState::Active {
            Some(SpawnError::Inactive)
        } else if cell.slot().is_none() {
            Some(SpawnError::OutOfBounds)
        } else if kind == SpawnKind::Boss && self.boss.is_some() {
            Some(SpawnError::BossAlreadyActive)
        } else if !self.is_empty(cell) {
            Some(SpawnError::Occupied)
        } else {
            None
        };

        if let Some(reason) = rejection {
            debug!(cell = cell.get(), ?kind, ?reason, "spawn rejected");
            out_events.push(Event::SpawnRejected { cell, kind, reason });
            return;
        }

        let lifetime = match kind {
            SpawnKind::Virus => Some(self.phase.cell_lifetime()),
            SpawnKind::Boss => Some(BOSS_LIFETIME),
            SpawnKind::Bomb | SpawnKind::File => None,
        };
        let generation = self.place(cell, CellKind::from(kind));
        if let Some(lifetime) = lifetime {
            let _ = self.timers.schedule(
                self.now.saturating_add(lifetime),
                Timer::Expire { cell, generation },
            );
        }
        if kind == SpawnKind::Boss {
            self.boss = Some(Boss {
                cell,
                remaining_hits: BOSS_HITS,
            });
        }

        out_events.push(Event::CellSpawned {
            cell,
            kind,
            generation,
            lifetime,
        });
    }

    fn place(&mut self, cell: CellIndex, kind: CellKind) -> Generation {
        self.next_generation = self.next_generation.wrapping_add(1);
        let generation = Generation::new(self.next_generation);
        if let Some(slot) = cell.slot() {
            self.cells[slot] = Some(Occupant {
                kind,
                generation,
                placed_at: self.now,
            });
        }
        generation
    }

    fn is_empty(&self, cell: CellIndex) -> bool {
        cell.slot().map_or(false, |slot| self.cells[slot].is_none())
    }

    fn hit(&mut self, cell: CellIndex, out_events: &mut Vec<Event>) {
        if self.state != SessionState::Active {
            debug!(cell = cell.get(), "hit ignored outside an active session");
            return;
        }
        let Some(slot) = cell.slot() else {
            debug!(cell = cell.get(), "hit ignored outside the grid");
            return;
        };
        let Some(occupant) = self.cells[slot] else {
            return;
        };

        match occupant.kind {
            CellKind::Exploding => {}
            CellKind::Virus => {
                self.cells[slot] = None;
                let points = virus_reward(self.combo);
                self.score = self.score.saturating_add(points);
                self.combo += 1;
                self.best_combo = self.best_combo.max(self.combo);
                self.viruses_smashed += 1;
                out_events.push(Event::VirusSmashed {
                    cell,
                    points,
                    combo: self.combo,
                });
            }
            CellKind::Boss => self.hit_boss(cell, out_events),
            CellKind::Bomb => {
                self.detonate(cell);
                out_events.push(Event::BombDetonated { cell });
                out_events.push(Event::ScreenShake);
                self.health = 0;
                out_events.push(Event::HealthChanged {
                    health: 0,
                    cause: HealthChange::BombDetonated,
                });
                self.end_session(EndCause::BombDetonated, out_events);
            }
            CellKind::File => {
                self.detonate(cell);
                out_events.push(Event::FileOpened { cell });
                out_events.push(Event::ScreenShake);
                self.damage(FILE_DAMAGE, HealthChange::FileOpened, out_events);
                self.reset_combo(out_events);
                self.end_if_depleted(EndCause::HealthDepleted, out_events);
            }
        }
    }

    fn hit_boss(&mut self, cell: CellIndex, out_events: &mut Vec<Event>) {
        let Some(boss) = self.boss.as_mut() else {
            return;
        };

        if boss.remaining_hits > 1 {
            boss.remaining_hits -= 1;
            out_events.push(Event::BossDamaged {
                cell,
                remaining_hits: boss.remaining_hits,
            });
            return;
        }

        self.boss = None;
        if let Some(slot) = cell.slot() {
            self.cells[slot] = None;
        }
        self.score = self.score.saturating_add(BOSS_REWARD);
        self.bosses_defeated += 1;
        out_events.push(Event::BossDefeated {
            cell,
            points: BOSS_REWARD,
        });
        self.health = self.health.saturating_add(BOSS_HEAL).min(MAX_HEALTH);
        out_events.push(Event::HealthChanged {
            health: self.health,
            cause: HealthChange::BossDefeated,
        });
    }

    /// Turns the cell into a short-lived explosion.
    fn detonate(&mut self, cell: CellIndex) {
        let generation = self.place(cell, CellKind::Exploding);
        let _ = self.timers.schedule(
            self.now.saturating_add(EXPLOSION_LIFETIME),
            Timer::ClearExplosion { cell, generation },
        );
    }

    fn damage(&mut self, amount: u32, cause: HealthChange, out_events: &mut Vec<Event>) {
        self.health = self.health.saturating_sub(amount);
        out_events.push(Event::HealthChanged {
            health: self.health,
            cause,
        });
    }

    fn reset_combo(&mut self, out_events: &mut Vec<Event>) {
        if self.combo > 0 {
            self.combo = 0;
            out_events.push(Event::ComboReset);
        }
    }

    fn end_if_depleted(&mut self, cause: EndCause, out_events: &mut Vec<Event>) {
        if self.health == 0 {
            self.end_session(cause, out_events);
        }
    }

    /// Terminates the active session. Repeated calls are no-ops.
    fn end_session(&mut self, cause: EndCause, out_events: &mut Vec<Event>) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(session) = self.session else {
            return;
        };

        self.state = SessionState::Ended;
        self.timers.clear();
        self.spawn_timer = None;
        self.cells = [None; GRID_CELLS];
        self.boss = None;
        let _ = self.timers.schedule(
            self.now.saturating_add(REVEAL_DELAY),
            Timer::Reveal { session },
        );

        let summary = SessionSummary {
            session,
            final_score: self.score,
            survival_secs: self.survival.as_secs(),
            viruses_smashed: self.viruses_smashed,
            bosses_defeated: self.bosses_defeated,
            best_combo: self.best_combo,
            cause,
        };
        info!(
            session = session.get(),
            score = summary.final_score,
            survived = summary.survival_secs,
            ?cause,
            "session ended"
        );
        out_events.push(Event::SessionEnded { summary });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartSession => world.start_session(out_events),
        Command::Tick { dt } => world.advance(dt, out_events),
        Command::SpawnCell { cell, kind } => world.spawn(cell, kind, out_events),
        Command::Hit { cell } => world.hit(cell, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use virus_smash_core::{BossSnapshot, GridView, Phase, SessionSnapshot, SessionState};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Reports the lifecycle state of the current session.
    #[must_use]
    pub fn session_state(world: &World) -> SessionState {
        world.state
    }

    /// Reports the active difficulty phase.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase
    }

    /// Describes the active boss encounter, if any.
    #[must_use]
    pub fn boss(world: &World) -> Option<BossSnapshot> {
        world.boss.map(|boss| BossSnapshot {
            cell: boss.cell,
            remaining_hits: boss.remaining_hits,
        })
    }

    /// Captures an immutable snapshot of the session aggregate.
    #[must_use]
    pub fn session(world: &World) -> SessionSnapshot {
        SessionSnapshot {
            session: world.session,
            state: world.state,
            health: world.health,
            score: world.score,
            combo: world.combo,
            best_combo: world.best_combo,
            survival_secs: world.survival.as_secs(),
            phase: world.phase,
            boss: boss(world),
            revealed: world.revealed,
        }
    }

    /// Exposes a read-only view of the grid.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        GridView::new(&world.cells)
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.now
    }

    /// Number of deferred actions still armed.
    #[must_use]
    pub fn pending_timers(world: &World) -> usize {
        world.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> (World, Vec<Event>) {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, Command::StartSession, &mut events);
        (world, events)
    }

    #[test]
    fn new_world_is_idle() {
        let world = World::new();
        let snapshot = query::session(&world);
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(snapshot.session, None);
        assert_eq!(query::pending_timers(&world), 0);
    }

    #[test]
    fn start_arms_only_the_spawn_scheduler() {
        let (world, events) = started();
        assert_eq!(
            events,
            vec![Event::SessionStarted {
                session: SessionId::new(1)
            }]
        );
        assert_eq!(query::pending_timers(&world), 1);
        assert_eq!(query::grid_view(&world).empty_cells().count(), GRID_CELLS);
    }

    #[test]
    fn ticks_before_start_do_not_accumulate_survival() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(30),
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::TimeAdvanced { dt: Duration::from_secs(30) }]);
        assert_eq!(query::session(&world).survival_secs, 0);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let (mut world, _) = started();
        let cell = CellIndex::new(4);
        let first = world.place(cell, CellKind::Virus);
        let second = world.place(cell, CellKind::Virus);
        assert_ne!(first, second);

        assert!(world.take_if_current(cell, first).is_none());
        assert!(world.take_if_current(cell, second).is_some());
    }

    #[test]
    fn unhandled_virus_expiry_costs_ten_health_and_the_combo() {
        let (mut world, _) = started();
        world.health = 25;
        world.combo = 4;
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnCell {
                cell: CellIndex::new(0),
                kind: SpawnKind::Virus,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::Tick {
                dt: Phase::One.cell_lifetime(),
            },
            &mut events,
        );

        let snapshot = query::session(&world);
        assert_eq!(snapshot.health, 15);
        assert_eq!(snapshot.combo, 0);
        assert!(events.contains(&Event::ComboReset));
        assert!(query::grid_view(&world).is_empty(CellIndex::new(0)));
    }

    #[test]
    fn termination_reports_exactly_once() {
        let (mut world, _) = started();
        world.health = 0;
        let mut events = Vec::new();
        world.end_if_depleted(EndCause::HealthDepleted, &mut events);
        world.end_if_depleted(EndCause::HealthDepleted, &mut events);
        world.end_session(EndCause::BombDetonated, &mut events);

        let ended = events
            .iter()
            .filter(|event| matches!(event, Event::SessionEnded { .. }))
            .count();
        assert_eq!(ended, 1);
        assert_eq!(world.state, SessionState::Ended);
        assert_eq!(query::pending_timers(&world), 1, "only the reveal stays armed");
    }

    #[test]
    fn boss_heal_is_clamped() {
        let (mut world, _) = started();
        world.health = 190;
        let mut events = Vec::new();
        let cell = CellIndex::new(9);
        apply(
            &mut world,
            Command::SpawnCell {
                cell,
                kind: SpawnKind::Boss,
            },
            &mut events,
        );
        for _ in 0..BOSS_HITS {
            apply(&mut world, Command::Hit { cell }, &mut events);
        }
        assert_eq!(query::session(&world).health, MAX_HEALTH);
        assert_eq!(query::session(&world).score, BOSS_REWARD);
    }
}
