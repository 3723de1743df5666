use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use regex::Regex;
use serde::Serialize;
use std::{fmt, sync::OnceLock};

use crate::{
    error::{PipelineError, Result},
    types::{AveragingWindow, MatchResult},
};

pub const PLAYER_COL: &str = "Player";
pub const TEAM_COL: &str = "Team";
pub const DISPOSALS_COL: &str = "Disposals";
pub const GOALS_COL: &str = "Goals";
pub const BEHINDS_COL: &str = "Behinds";
pub const YEAR_COL: &str = "Year";
pub const ROUND_COL: &str = "Round";
pub const OPPONENT_COL: &str = "Opponent";
pub const DATE_COL: &str = "Date";
pub const RESULT_COL: &str = "Result";

/// Columns the dashboard shades in average tables.
pub const STYLED_COLUMNS: &[&str] = &[
    "Disposals",
    "Goals",
    "Behinds",
    "Frees For",
    "15 Dis. %",
    "20 Dis. %",
    "25 Dis. %",
    "1 Goal %",
    "2 Goals %",
    "3 Goals %",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableKind {
    Average(AveragingWindow),
    H2HGames,
    H2HResults,
}

impl TableKind {
    pub fn suffix(self) -> &'static str {
        match self {
            TableKind::Average(window) => window.label(),
            TableKind::H2HGames => "H2H Games",
            TableKind::H2HResults => "H2H Results",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            TableKind::Average(_) => &[PLAYER_COL, DISPOSALS_COL, GOALS_COL],
            TableKind::H2HGames => &[
                PLAYER_COL,
                YEAR_COL,
                ROUND_COL,
                OPPONENT_COL,
                DISPOSALS_COL,
                GOALS_COL,
                BEHINDS_COL,
                DATE_COL,
            ],
            TableKind::H2HResults => &[YEAR_COL, ROUND_COL, OPPONENT_COL, RESULT_COL],
        }
    }

    fn numeric_columns(self) -> &'static [&'static str] {
        match self {
            TableKind::Average(_) => &[DISPOSALS_COL, GOALS_COL],
            TableKind::H2HGames => &[DISPOSALS_COL, GOALS_COL, BEHINDS_COL],
            TableKind::H2HResults => &[],
        }
    }
}

/// Logical identity of a stat file, parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableKey {
    pub team: String,
    pub kind: TableKind,
}

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<team>.+?) (?P<kind>Season Average|Last 10 Average|Last 5 Average|Last 3 Average|H2H Games|H2H Results)\.csv$",
        )
        .expect("table file name pattern is valid")
    })
}

impl TableKey {
    /// `None` for files outside the naming convention.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let caps = file_name_pattern().captures(file_name)?;
        let kind = match &caps["kind"] {
            "H2H Games" => TableKind::H2HGames,
            "H2H Results" => TableKind::H2HResults,
            label => TableKind::Average(AveragingWindow::from_label(label)?),
        };
        Some(Self {
            team: caps["team"].trim().to_string(),
            kind,
        })
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.team, self.kind.suffix())
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.team, self.kind.suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatTable {
    pub name: String,
    pub key: TableKey,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub(crate) fn parse_number(table: &str, column: &str, raw: &str) -> Result<f64> {
    let value = raw.trim().trim_end_matches('%');
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(PipelineError::malformed(
            table,
            format!("non-numeric value '{}' in column '{}'", raw, column),
        )),
    }
}

pub(crate) fn parse_date(table: &str, raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%d/%m/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .ok_or_else(|| PipelineError::malformed(table, format!("invalid date '{}'", raw)))
}

pub(crate) fn parse_result(table: &str, raw: &str) -> Result<MatchResult> {
    MatchResult::parse(raw)
        .ok_or_else(|| PipelineError::malformed(table, format!("unknown result '{}'", raw)))
}

impl StatTable {
    /// Parses CSV bytes and checks the columns required by the key's kind.
    pub fn parse(key: TableKey, bytes: &[u8]) -> Result<Self> {
        let name = key.name();
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
        let columns: Vec<String> = rdr
            .headers()
            .map_err(|e| PipelineError::malformed(&name, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| PipelineError::malformed(&name, e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let table = Self { name, key, columns, rows };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        for column in self.key.kind.required_columns() {
            if self.column(column).is_none() {
                return Err(PipelineError::malformed(
                    &self.name,
                    format!("missing column '{}'", column),
                ));
            }
        }
        for column in self.key.kind.numeric_columns() {
            for row in 0..self.rows.len() {
                self.number(row, column)?;
            }
        }
        for row in 0..self.rows.len() {
            match self.key.kind {
                TableKind::H2HGames => {
                    parse_date(&self.name, self.cell(row, DATE_COL).unwrap_or_default())?;
                }
                TableKind::H2HResults => {
                    parse_result(&self.name, self.cell(row, RESULT_COL).unwrap_or_default())?;
                }
                TableKind::Average(_) => {}
            }
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    pub fn number(&self, row: usize, column: &str) -> Result<f64> {
        let raw = self.cell(row, column).ok_or_else(|| {
            PipelineError::malformed(&self.name, format!("row {} has no '{}' value", row + 1, column))
        })?;
        parse_number(&self.name, column, raw)
    }

    /// New table ordered by disposals, highest first. Ties keep their original order.
    pub fn sorted_by_disposals(&self) -> Result<StatTable> {
        let mut keyed = Vec::with_capacity(self.rows.len());
        for (idx, row) in self.rows.iter().enumerate() {
            keyed.push((self.number(idx, DISPOSALS_COL)?, row.clone()));
        }
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(StatTable {
            name: self.name.clone(),
            key: self.key.clone(),
            columns: self.columns.clone(),
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
        })
    }
}
