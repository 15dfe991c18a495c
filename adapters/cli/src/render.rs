//! Plain-text presentation of the grid and session.

use std::fmt::Write as _;

use virus_smash_core::{BossSnapshot, CellKind, GridView, SessionSnapshot, GRID_COLUMNS};

fn glyph(kind: Option<CellKind>, boss: Option<BossSnapshot>) -> char {
    match kind {
        None => '.',
        Some(CellKind::Virus) => 'V',
        Some(CellKind::Bomb) => 'B',
        Some(CellKind::File) => 'F',
        Some(CellKind::Exploding) => '*',
        Some(CellKind::Boss) => boss
            .and_then(|boss| char::from_digit(u32::from(boss.remaining_hits), 10))
            .unwrap_or('X'),
    }
}

/// Renders the grid as rows of glyphs followed by a status line.
pub(crate) fn frame(grid: GridView<'_>, session: &SessionSnapshot) -> String {
    let mut out = String::new();
    for (cell, occupant) in grid.iter() {
        out.push(glyph(occupant.map(|occupant| occupant.kind), session.boss));
        if cell.column() + 1 == GRID_COLUMNS {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    let _ = write!(
        out,
        "hp {:>3}  score {:>5}  combo {:>2}  t {:>3}s  phase {}",
        session.health,
        session.score,
        session.combo,
        session.survival_secs,
        session.phase.number()
    );
    out
}
