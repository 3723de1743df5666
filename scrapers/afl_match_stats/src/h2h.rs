use serde::Serialize;
use tracing::debug;

use crate::{
    error::{PipelineError, Result},
    table::{
        parse_date, parse_result, StatTable, BEHINDS_COL, DATE_COL, DISPOSALS_COL, GOALS_COL,
        OPPONENT_COL, PLAYER_COL, RESULT_COL, ROUND_COL, YEAR_COL,
    },
    types::{H2HOutcome, H2HRecord, MatchResult, SeriesPoint},
};

fn text(table: &StatTable, row: usize, column: &str) -> String {
    table.cell(row, column).unwrap_or_default().to_string()
}

/// Every row of a head-to-head games log.
pub fn records(table: &StatTable) -> Result<Vec<H2HRecord>> {
    (0..table.rows.len())
        .map(|row| {
            Ok(H2HRecord {
                player: text(table, row, PLAYER_COL),
                year: text(table, row, YEAR_COL),
                round: text(table, row, ROUND_COL),
                opponent: text(table, row, OPPONENT_COL),
                disposals: table.number(row, DISPOSALS_COL)?,
                goals: table.number(row, GOALS_COL)?,
                behinds: table.number(row, BEHINDS_COL)?,
                date: parse_date(&table.name, table.cell(row, DATE_COL).unwrap_or_default())?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct H2HAverages {
    pub games: usize,
    pub disposals: f64,
    pub goals: f64,
}

/// A player's past meetings with one opponent, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct H2HHistory {
    pub player: String,
    pub opponent: String,
    pub games: Vec<H2HRecord>,
}

impl H2HHistory {
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    fn no_history(&self) -> PipelineError {
        PipelineError::NoHistory {
            player: self.player.clone(),
            opponent: self.opponent.clone(),
        }
    }

    pub fn averages(&self) -> Result<H2HAverages> {
        if self.games.is_empty() {
            return Err(self.no_history());
        }
        let n = self.games.len() as f64;
        Ok(H2HAverages {
            games: self.games.len(),
            disposals: self.games.iter().map(|g| g.disposals).sum::<f64>() / n,
            goals: self.games.iter().map(|g| g.goals).sum::<f64>() / n,
        })
    }

    /// Mean disposals after each meeting.
    pub fn running_disposal_average(&self) -> Vec<f64> {
        let mut total = 0.0;
        self.games
            .iter()
            .enumerate()
            .map(|(i, g)| {
                total += g.disposals;
                total / (i + 1) as f64
            })
            .collect()
    }

    /// Chart series labelled `"{year} {round}"`. Years stay display labels.
    pub fn series(&self) -> Vec<SeriesPoint> {
        self.games
            .iter()
            .map(|g| SeriesPoint {
                label: format!("{} {}", g.year, g.round),
                disposals: g.disposals,
                goals: g.goals,
                behinds: g.behinds,
            })
            .collect()
    }
}

pub fn player_history(table: &StatTable, player: &str, opponent: &str) -> Result<H2HHistory> {
    let mut games: Vec<H2HRecord> = records(table)?
        .into_iter()
        .filter(|r| r.player == player && r.opponent == opponent)
        .collect();
    games.sort_by_key(|g| g.date);

    debug!(
        "{} has {} meetings with {} in {}",
        player,
        games.len(),
        opponent,
        table.name
    );
    Ok(H2HHistory {
        player: player.to_string(),
        opponent: opponent.to_string(),
        games,
    })
}

/// Every row of a team's outcome log, in file order. The log is written
/// oldest first and round labels include finals (`QF`, `GF`), so rows are
/// never re-sorted here.
pub fn outcomes(table: &StatTable) -> Result<Vec<H2HOutcome>> {
    (0..table.rows.len())
        .map(|row| {
            let result = parse_result(&table.name, table.cell(row, RESULT_COL).unwrap_or_default())?;
            Ok(H2HOutcome {
                year: text(table, row, YEAR_COL),
                round: text(table, row, ROUND_COL),
                opponent: text(table, row, OPPONENT_COL),
                result,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlyphMap {
    pub win: String,
    pub draw: String,
    pub lose: String,
}

impl Default for GlyphMap {
    fn default() -> Self {
        Self {
            win: "✔️".to_string(),
            draw: "➖".to_string(),
            lose: "❌".to_string(),
        }
    }
}

impl GlyphMap {
    pub fn glyph(&self, result: MatchResult) -> &str {
        match result {
            MatchResult::Win => &self.win,
            MatchResult::Draw => &self.draw,
            MatchResult::Lose => &self.lose,
        }
    }
}

/// Concatenates one glyph per result, in order, with no separator.
pub fn outcome_glyphs<I>(results: I, glyphs: &GlyphMap) -> String
where
    I: IntoIterator<Item = MatchResult>,
{
    results.into_iter().map(|r| glyphs.glyph(r)).collect()
}
