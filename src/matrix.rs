use crate::battle::{run_battle, BattleConfig, BattleResult, EndReason, Winner};
use crate::error::PvpError;
use crate::model::{Combatant, CombatantInput};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAX_RATING: f64 = 1000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterFile {
    pub left: Vec<CombatantInput>,
    /// Defaults to `left` (a mirror roster).
    #[serde(default)]
    pub right: Option<Vec<CombatantInput>>,
    #[serde(default)]
    pub max_turns: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupCell {
    pub left: String,
    pub right: String,
    pub winner: Winner,
    pub reason: EndReason,
    pub turns_elapsed: u32,
    pub rating: u32,
}

/// 500 plus half the HP-share swing, from the left side's point of view.
/// 1000 is a flawless left win, 0 a flawless right win.
pub fn battle_rating(result: &BattleResult, left: &Combatant, right: &Combatant) -> u32 {
    let left_share = result.left.hp_remaining as f64 / left.max_hp as f64;
    let right_share = result.right.hp_remaining as f64 / right.max_hp as f64;
    let rating = 500.0 * (left_share - right_share) + 500.0;
    rating.round().clamp(0.0, MAX_RATING) as u32
}

fn normalize_roster(roster: &[CombatantInput], prefix: &str) -> Vec<Combatant> {
    roster
        .iter()
        .enumerate()
        .map(|(idx, input)| Combatant::from_input(input, &format!("{prefix}{}", idx + 1)))
        .collect()
}

pub fn compute_matrix(
    left: &[CombatantInput],
    right: &[CombatantInput],
    config: &BattleConfig,
) -> Vec<Vec<MatchupCell>> {
    let left = normalize_roster(left, "left");
    let right = normalize_roster(right, "right");
    let tasks: Vec<(usize, usize)> = (0..left.len())
        .flat_map(|l| (0..right.len()).map(move |r| (l, r)))
        .collect();
    let cells: Vec<(usize, usize, MatchupCell)> = tasks
        .par_iter()
        .map(|&(l_idx, r_idx)| {
            let (l, r) = (&left[l_idx], &right[r_idx]);
            let result = run_battle(l, r, config);
            let cell = MatchupCell {
                left: l.name.clone(),
                right: r.name.clone(),
                winner: result.winner,
                reason: result.reason,
                turns_elapsed: result.turns_elapsed,
                rating: battle_rating(&result, l, r),
            };
            (l_idx, r_idx, cell)
        })
        .collect();

    let mut matrix: Vec<Vec<Option<MatchupCell>>> = vec![vec![None; right.len()]; left.len()];
    for (l_idx, r_idx, cell) in cells {
        matrix[l_idx][r_idx] = Some(cell);
    }
    matrix
        .into_iter()
        .map(|row| row.into_iter().flatten().collect())
        .collect()
}

pub fn compute_roster_matrix(roster: &RosterFile) -> Result<Vec<Vec<MatchupCell>>, PvpError> {
    let right = roster.right.as_deref().unwrap_or(&roster.left);
    if roster.left.is_empty() || right.is_empty() {
        return Err(PvpError::EmptyRoster);
    }
    let config = BattleConfig::clamped(roster.max_turns);
    Ok(compute_matrix(&roster.left, right, &config))
}

/// Ratings grid with a header row of right-side names and the left-side name
/// leading each row.
pub fn to_csv(matrix: &[Vec<MatchupCell>]) -> String {
    let mut out = String::new();
    if let Some(first) = matrix.first() {
        for cell in first {
            out.push(',');
            out.push_str(&cell.right);
        }
    }
    for row in matrix {
        out.push('\n');
        if let Some(cell) = row.first() {
            out.push_str(&cell.left);
        }
        for cell in row {
            out.push_str(&format!(",{}", cell.rating));
        }
    }
    out
}

pub fn write_csv(matrix: &[Vec<MatchupCell>], path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, to_csv(matrix))?;
    Ok(())
}
