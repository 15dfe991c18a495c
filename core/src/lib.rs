#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Virus Smash engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Virus Smash.";

/// Number of columns laid out in the grid.
pub const GRID_COLUMNS: u32 = 4;
/// Number of rows laid out in the grid.
pub const GRID_ROWS: u32 = 4;
/// Total number of cell positions in the grid.
pub const GRID_CELLS: usize = (GRID_COLUMNS * GRID_ROWS) as usize;

/// Health a session starts with and can never exceed.
pub const MAX_HEALTH: u32 = 200;
/// Base points awarded for smashing a virus.
pub const VIRUS_BASE_REWARD: u32 = 10;
/// Upper bound of the combo bonus added to a virus reward.
pub const COMBO_BONUS_CAP: u32 = 20;
/// Health lost when a virus expires unhandled.
pub const VIRUS_EXPIRY_DAMAGE: u32 = 10;
/// Health lost when a suspicious file is opened.
pub const FILE_DAMAGE: u32 = 30;
/// Hits required to defeat a boss.
pub const BOSS_HITS: u8 = 5;
/// Points awarded for defeating a boss.
pub const BOSS_REWARD: u32 = 500;
/// Health restored when a boss is defeated.
pub const BOSS_HEAL: u32 = 30;
/// Health lost when a boss expires unhandled.
pub const BOSS_EXPIRY_DAMAGE: u32 = 100;
/// Lifetime of a boss cell, independent of the active phase.
pub const BOSS_LIFETIME: Duration = Duration::from_millis(4_000);
/// Accumulated spawn time that must be exceeded before a boss may appear.
pub const BOSS_READINESS_THRESHOLD: Duration = Duration::from_millis(20_000);
/// A boss spawns only when the readiness draw lands strictly above this value.
pub const BOSS_SPAWN_DRAW: f64 = 0.7;
/// Time an exploding cell lingers before reverting to empty.
pub const EXPLOSION_LIFETIME: Duration = Duration::from_millis(300);
/// Delay between the end of a session and the result reveal.
pub const REVEAL_DELAY: Duration = Duration::from_millis(3_000);

/// Commands that express all permissible world mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Starts a fresh session, replacing whatever session was running.
    StartSession,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new cell be placed on the grid.
    SpawnCell {
        /// Grid position that should receive the cell.
        cell: CellIndex,
        /// Kind of cell to place.
        kind: SpawnKind,
    },
    /// Resolves a player's interaction with a grid position.
    Hit {
        /// Grid position the player interacted with.
        cell: CellIndex,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Announces that a new session became active.
    SessionStarted {
        /// Identifier of the session that started.
        session: SessionId,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that survival time crossed into a new difficulty phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
    /// Signals that the spawn scheduler fired and a cell should be introduced.
    SpawnDue {
        /// Phase that was active when the scheduler fired.
        phase: Phase,
        /// Spawn interval of that phase.
        interval: Duration,
    },
    /// Confirms that a cell was placed on the grid.
    CellSpawned {
        /// Position of the new cell.
        cell: CellIndex,
        /// Kind of the new cell.
        kind: SpawnKind,
        /// Identity stamped on the cell instance.
        generation: Generation,
        /// Time until the cell expires, if it expires at all.
        lifetime: Option<Duration>,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Position named in the request.
        cell: CellIndex,
        /// Kind named in the request.
        kind: SpawnKind,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that a virus was smashed by the player.
    VirusSmashed {
        /// Position of the smashed virus.
        cell: CellIndex,
        /// Points awarded for the hit.
        points: u32,
        /// Combo counter after the hit.
        combo: u32,
    },
    /// Reports that a boss absorbed a non-lethal hit.
    BossDamaged {
        /// Position of the boss.
        cell: CellIndex,
        /// Hits still required to defeat the boss.
        remaining_hits: u8,
    },
    /// Confirms that a boss was defeated.
    BossDefeated {
        /// Position the boss occupied.
        cell: CellIndex,
        /// Points awarded for the defeat.
        points: u32,
    },
    /// Reports that the player clicked a bomb.
    BombDetonated {
        /// Position of the bomb.
        cell: CellIndex,
    },
    /// Reports that the player opened a suspicious file.
    FileOpened {
        /// Position of the file.
        cell: CellIndex,
    },
    /// Reports that a cell expired before the player handled it.
    CellExpired {
        /// Position of the expired cell.
        cell: CellIndex,
        /// Kind of the expired cell.
        kind: SpawnKind,
    },
    /// Reports that a transient explosion finished and the cell is empty again.
    CellCleared {
        /// Position that became empty.
        cell: CellIndex,
    },
    /// Requests a screen shake from presentation adapters.
    ScreenShake,
    /// Reports the session health after a mutation.
    HealthChanged {
        /// Health after the mutation.
        health: u32,
        /// What caused the mutation.
        cause: HealthChange,
    },
    /// Reports that the combo counter dropped back to zero.
    ComboReset,
    /// Announces that the session ended. Emitted exactly once per session.
    SessionEnded {
        /// Final tallies of the session.
        summary: SessionSummary,
    },
    /// Signals that the post-game reveal delay elapsed.
    ResultRevealed {
        /// Identifier of the session whose result is revealed.
        session: SessionId,
    },
}

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session has started yet.
    Idle,
    /// Cells spawn and the player may interact.
    Active,
    /// The session terminated; the grid is frozen and the score was reported.
    Ended,
}

/// Kinds of cells the spawn scheduler may introduce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnKind {
    /// Target the player should smash.
    Virus,
    /// Trap that ends the session when clicked.
    Bomb,
    /// Suspicious file that damages the player when clicked.
    File,
    /// Multi-hit target with large rewards and penalties.
    Boss,
}

/// Occupant state of a non-empty grid position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Target the player should smash.
    Virus,
    /// Trap that ends the session when clicked.
    Bomb,
    /// Suspicious file that damages the player when clicked.
    File,
    /// Multi-hit target with large rewards and penalties.
    Boss,
    /// Transient visual state left behind by a clicked bomb or file.
    Exploding,
}

impl From<SpawnKind> for CellKind {
    fn from(kind: SpawnKind) -> Self {
        match kind {
            SpawnKind::Virus => Self::Virus,
            SpawnKind::Bomb => Self::Bomb,
            SpawnKind::File => Self::File,
            SpawnKind::Boss => Self::Boss,
        }
    }
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// No session is active.
    Inactive,
    /// The requested position lies outside the grid.
    OutOfBounds,
    /// The requested position already holds a cell.
    Occupied,
    /// A boss is already active somewhere on the grid.
    BossAlreadyActive,
}

/// Reasons the session health changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthChange {
    /// A virus expired unhandled.
    VirusExpired,
    /// A boss expired unhandled.
    BossExpired,
    /// The player opened a suspicious file.
    FileOpened,
    /// The player clicked a bomb.
    BombDetonated,
    /// The player defeated a boss.
    BossDefeated,
}

/// Reasons a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndCause {
    /// Health was worn down to zero.
    HealthDepleted,
    /// The player clicked a bomb.
    BombDetonated,
}

/// Difficulty tier derived from survival time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Survival time below twenty seconds.
    One,
    /// Survival time from twenty up to forty seconds.
    Two,
    /// Survival time of forty seconds or more.
    Three,
}

impl Phase {
    /// Resolves the phase active after the provided whole seconds of survival.
    #[must_use]
    pub const fn from_survival_secs(seconds: u64) -> Self {
        if seconds < 20 {
            Self::One
        } else if seconds < 40 {
            Self::Two
        } else {
            Self::Three
        }
    }

    /// Delay between successive spawn decisions.
    #[must_use]
    pub const fn spawn_interval(self) -> Duration {
        match self {
            Self::One => Duration::from_millis(1_200),
            Self::Two => Duration::from_millis(800),
            Self::Three => Duration::from_millis(500),
        }
    }

    /// Time a virus stays on the grid before expiring.
    #[must_use]
    pub const fn cell_lifetime(self) -> Duration {
        match self {
            Self::One => Duration::from_millis(2_000),
            Self::Two => Duration::from_millis(1_500),
            Self::Three => Duration::from_millis(1_000),
        }
    }

    /// One-based ordinal of the phase.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Classifies a uniform draw in `[0, 1)` into a regular spawn kind.
    ///
    /// The final phase spawns noticeably more traps than the earlier ones.
    #[must_use]
    pub fn classify_roll(self, roll: f64) -> SpawnKind {
        let (bomb_above, file_below) = match self {
            Self::Three => (0.95, 0.25),
            Self::One | Self::Two => (0.97, 0.20),
        };

        if roll > bomb_above {
            SpawnKind::Bomb
        } else if roll < file_below {
            SpawnKind::File
        } else {
            SpawnKind::Virus
        }
    }
}

/// Points awarded for smashing a virus while the combo counter equals `combo`.
#[must_use]
pub fn virus_reward(combo: u32) -> u32 {
    VIRUS_BASE_REWARD + combo.min(COMBO_BONUS_CAP)
}

/// Position within the grid, counted row-major from the upper-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex(u32);

impl CellIndex {
    /// Creates a new cell index. Out-of-range values are accepted and later ignored by the world.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.0 % GRID_COLUMNS
    }

    /// Returns the slot this index addresses, or `None` when it lies outside the grid.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        let slot = usize::try_from(self.0).ok()?;
        (slot < GRID_CELLS).then_some(slot)
    }

    /// Iterator over every valid index in row-major order.
    pub fn all() -> impl Iterator<Item = CellIndex> {
        (0..GRID_CELLS as u32).map(CellIndex)
    }
}

/// Identity stamped on every cell instance placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    /// Creates a new generation with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the generation.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier assigned to a session when it starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u32);

impl SessionId {
    /// Creates a new session identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Final tallies of a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Identifier of the finished session.
    pub session: SessionId,
    /// Score at the moment the session ended.
    pub final_score: u32,
    /// Whole seconds survived.
    pub survival_secs: u64,
    /// Number of viruses smashed.
    pub viruses_smashed: u32,
    /// Number of bosses defeated.
    pub bosses_defeated: u32,
    /// Highest combo reached.
    pub best_combo: u32,
    /// Reason the session ended.
    pub cause: EndCause,
}

/// Read-only description of a non-empty grid position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Occupant {
    /// Current state of the cell.
    pub kind: CellKind,
    /// Identity of the cell instance.
    pub generation: Generation,
    /// Session time at which the instance was placed.
    pub placed_at: Duration,
}

/// Read-only view into the grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [Option<Occupant>],
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<Occupant>]) -> Self {
        Self { cells }
    }

    /// Returns the occupant of the provided cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellIndex) -> Option<Occupant> {
        cell.slot()
            .and_then(|slot| self.cells.get(slot).copied().flatten())
    }

    /// Reports whether the cell lies inside the grid and holds nothing.
    #[must_use]
    pub fn is_empty(&self, cell: CellIndex) -> bool {
        cell.slot()
            .and_then(|slot| self.cells.get(slot))
            .map_or(false, Option::is_none)
    }

    /// Iterator over the empty positions in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = CellIndex> + 'a {
        CellIndex::all()
            .zip(self.cells.iter())
            .filter_map(|(cell, occupant)| occupant.is_none().then_some(cell))
    }

    /// Iterator over every position paired with its occupant.
    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, Option<Occupant>)> + 'a {
        CellIndex::all().zip(self.cells.iter().copied())
    }
}

/// Read-only description of an active boss encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BossSnapshot {
    /// Position the boss occupies.
    pub cell: CellIndex,
    /// Hits still required to defeat it.
    pub remaining_hits: u8,
}

/// Immutable snapshot of the session aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionSnapshot {
    /// Identifier of the current session, if one ever started.
    pub session: Option<SessionId>,
    /// Lifecycle state.
    pub state: SessionState,
    /// Current health.
    pub health: u32,
    /// Current score.
    pub score: u32,
    /// Current combo counter.
    pub combo: u32,
    /// Highest combo reached this session.
    pub best_combo: u32,
    /// Whole seconds survived.
    pub survival_secs: u64,
    /// Active difficulty phase.
    pub phase: Phase,
    /// Active boss encounter, if any.
    pub boss: Option<BossSnapshot>,
    /// Whether the post-game reveal delay elapsed.
    pub revealed: bool,
}
