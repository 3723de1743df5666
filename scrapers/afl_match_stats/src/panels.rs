//! Presentation boundary: pipeline errors become empty states here so a bad
//! table or an unknown player never takes the whole page down.

use serde::Serialize;
use tracing::warn;

use crate::{
    error::{PipelineError, Result},
    h2h::{H2HAverages, H2HHistory},
    loader::SkippedTable,
    remote::ContentStore,
    selector::TableView,
    session::Session,
    types::{AveragingWindow, PlayerAggregate, SeriesPoint, Side},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Empty { message: String },
}

impl<T> Panel<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Panel::Ready(value),
            Err(e) => {
                warn!("Showing empty panel: {}", e);
                Panel::Empty {
                    message: empty_message(&e),
                }
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            Panel::Empty { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Panel::Ready(_))
    }
}

fn empty_message(error: &PipelineError) -> String {
    match error {
        PipelineError::RemoteFetch(_) => format!("{}. Try again shortly.", error),
        PipelineError::NoHistory { player, opponent } => {
            format!("{} has not played against {} before.", player, opponent)
        }
        PipelineError::PlayerNotFound { player, table } => {
            format!("No {} figures for {}.", table, player)
        }
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPanels {
    pub header: String,
    pub window: AveragingWindow,
    pub home: Panel<TableView>,
    pub away: Panel<TableView>,
    pub home_form: Panel<String>,
    pub away_form: Panel<String>,
    pub skipped: Vec<SkippedTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPanels {
    pub player: String,
    pub aggregate: Panel<PlayerAggregate>,
    pub history: Panel<H2HHistory>,
    pub history_averages: Panel<H2HAverages>,
    pub history_series: Panel<Vec<SeriesPoint>>,
    pub season_series: Panel<Vec<SeriesPoint>>,
}

/// Everything shown for the selected match. Fails only when no match is
/// selected; table problems become empty panels.
pub fn match_panels<S: ContentStore>(session: &mut Session<S>, columns: &[&str]) -> Result<MatchPanels> {
    let header = session.selected_fixture()?.header_display();
    let window = session.window();
    let skipped = match session.tables() {
        Ok(tables) => tables.skipped.clone(),
        Err(e) => {
            // every panel reads the same folder
            return Ok(MatchPanels {
                header,
                window,
                home: Panel::from_result(Err(e.clone())),
                away: Panel::from_result(Err(e.clone())),
                home_form: Panel::from_result(Err(e.clone())),
                away_form: Panel::from_result(Err(e)),
                skipped: Vec::new(),
            });
        }
    };

    Ok(MatchPanels {
        header,
        window,
        home: Panel::from_result(session.team_view(Side::Home, columns)),
        away: Panel::from_result(session.team_view(Side::Away, columns)),
        home_form: Panel::from_result(session.outcome_glyphs(Side::Home)),
        away_form: Panel::from_result(session.outcome_glyphs(Side::Away)),
        skipped,
    })
}

pub fn player_panels<S: ContentStore>(session: &mut Session<S>, side: Side, player: &str) -> PlayerPanels {
    let aggregate = Panel::from_result(session.select_player(side, player));
    let history = session.head_to_head(side, player);
    let (history_averages, history_series) = match &history {
        Ok(h) => (Panel::from_result(h.averages()), Panel::Ready(h.series())),
        Err(e) => (Panel::from_result(Err(e.clone())), Panel::from_result(Err(e.clone()))),
    };

    PlayerPanels {
        player: player.to_string(),
        aggregate,
        history: Panel::from_result(history),
        history_averages,
        history_series,
        season_series: Panel::from_result(session.season_series(player)),
    }
}
