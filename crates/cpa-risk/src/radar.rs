//! ASCII radar view of the final target positions

use collision_avoidance::{TrackOutcome, Vec2};
use std::collections::BTreeMap;

/// Cells per side; own ship sits in the centre cell
pub const RADAR_GRID_SIZE: usize = 41;

const OWNSHIP: char = 'O';
const TARGET: char = 'X';
const RISK: char = 'C';
const EMPTY: char = '.';

/// Render final positions, relative to own ship, onto a fixed grid.
///
/// Scale is taken from the largest absolute coordinate of any target so the
/// farthest one lands on the edge. Top is +y, right is +x.
pub fn render_radar(outcomes: &BTreeMap<String, TrackOutcome>, own_pos: Vec2) -> String {
    if outcomes.is_empty() {
        return "No targets for radar.\n".to_string();
    }

    let center = (RADAR_GRID_SIZE / 2) as i64;
    let mut grid = vec![vec![EMPTY; RADAR_GRID_SIZE]; RADAR_GRID_SIZE];
    grid[center as usize][center as usize] = OWNSHIP;

    let points: Vec<(Vec2, bool)> = outcomes
        .values()
        .map(|o| (o.state.position() - own_pos, o.cpa.collision_risk))
        .collect();

    let max_abs = points
        .iter()
        .flat_map(|(p, _)| [p.x.abs(), p.y.abs()])
        .fold(1.0_f64, f64::max);
    let half_cells = center as f64;
    let scale = max_abs / half_cells;

    for (p, risk) in points {
        let col = center + (p.x / scale).round() as i64;
        let row = center - (p.y / scale).round() as i64;

        let size = RADAR_GRID_SIZE as i64;
        if !(0..size).contains(&row) || !(0..size).contains(&col) {
            continue;
        }

        let cell = &mut grid[row as usize][col as usize];
        if *cell != OWNSHIP {
            *cell = if risk { RISK } else { TARGET };
        }
    }

    let mut out = String::new();
    out.push_str("=== Radar View (final positions) ===\n");
    out.push_str("Top = +Y, Right = +X\n");
    out.push_str(&format!(
        "Approx. scale: {:.1} m ~ {:.1} cells\n\n",
        max_abs, half_cells
    ));
    for row in &grid {
        out.extend(row.iter());
        out.push('\n');
    }
    out.push_str("\nLegend: O = ownship, X = target, C = collision risk\n");
    out
}
