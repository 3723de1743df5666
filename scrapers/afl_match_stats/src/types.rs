use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One scheduled match in the season fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub round: u32,
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_team_slug: String,
    pub away_team_slug: String,
    pub kickoff: NaiveDateTime,
    pub venue: String,
}

impl Fixture {
    /// Header line shown above a selected match, e.g.
    /// `Carlton v Collingwood - MCG - Thursday, 07:20 PM AEST`.
    pub fn header_display(&self) -> String {
        format!(
            "{} - {} - {} AEST",
            self.match_id,
            self.venue,
            self.kickoff.format("%A, %I:%M %p")
        )
    }

    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if team == self.home_team {
            Some(&self.away_team)
        } else if team == self.away_team {
            Some(&self.home_team)
        } else {
            None
        }
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn dir(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: EntryKind::Dir }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: EntryKind::File }
    }
}

/// Stat-aggregation horizon. The averages themselves are computed upstream;
/// the window only picks which table to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AveragingWindow {
    #[default]
    Season,
    Last10,
    Last5,
    Last3,
}

impl AveragingWindow {
    pub const ALL: [AveragingWindow; 4] = [
        AveragingWindow::Season,
        AveragingWindow::Last10,
        AveragingWindow::Last5,
        AveragingWindow::Last3,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AveragingWindow::Season => "Season Average",
            AveragingWindow::Last10 => "Last 10 Average",
            AveragingWindow::Last5 => "Last 5 Average",
            AveragingWindow::Last3 => "Last 3 Average",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.label() == label)
    }
}

impl fmt::Display for AveragingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A player's stat line for one averaging window, used as chart reference lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerAggregate {
    pub player: String,
    pub table: String,
    pub disposals: f64,
    pub goals: f64,
}

/// One past meeting between a player and an opponent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct H2HRecord {
    pub player: String,
    pub year: String,
    pub round: String,
    pub opponent: String,
    pub disposals: f64,
    pub goals: f64,
    pub behinds: f64,
    pub date: chrono::NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    Win,
    Draw,
    Lose,
}

impl MatchResult {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Win" | "W" => Some(MatchResult::Win),
            "Draw" | "D" => Some(MatchResult::Draw),
            "Lose" | "Loss" | "L" => Some(MatchResult::Lose),
            _ => None,
        }
    }
}

/// One row of a team's round-by-round head-to-head outcome log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct H2HOutcome {
    pub year: String,
    pub round: String,
    pub opponent: String,
    pub result: MatchResult,
}

/// A single point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub disposals: f64,
    pub goals: f64,
    pub behinds: f64,
}
