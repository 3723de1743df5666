//! Per-player current-season game logs, located through the name-to-slug table.

use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use crate::{
    error::{PipelineError, Result},
    table::parse_number,
    types::SeriesPoint,
};

#[derive(Debug, Deserialize)]
struct SlugRow {
    #[serde(rename = "Player")]
    player: String,
    #[serde(rename = "url")]
    slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSlugs {
    by_name: HashMap<String, String>,
}

impl PlayerSlugs {
    pub fn parse(name: &str, bytes: &[u8]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
        let mut by_name = HashMap::new();
        for row in rdr.deserialize::<SlugRow>() {
            let row = row.map_err(|e| PipelineError::malformed(name, e.to_string()))?;
            by_name.insert(row.player, row.slug);
        }
        info!("Loaded {} player slugs", by_name.len());
        Ok(Self { by_name })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Exact-name lookup. An unmapped player is an error rather than a stale guess.
    pub fn slug(&self, player: &str) -> Result<&str> {
        self.by_name
            .get(player)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::UnmappedPlayer {
                player: player.to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct GameLogRow {
    #[serde(rename = "Round")]
    round: String,
    #[serde(rename = "Disposals")]
    disposals: String,
    #[serde(rename = "Goals")]
    goals: String,
    #[serde(rename = "Behinds")]
    behinds: String,
}

/// Round-by-round series from a player's season log, in file order.
pub fn season_series(name: &str, bytes: &[u8]) -> Result<Vec<SeriesPoint>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    let mut series = Vec::new();
    for row in rdr.deserialize::<GameLogRow>() {
        let row = row.map_err(|e| PipelineError::malformed(name, e.to_string()))?;
        series.push(SeriesPoint {
            disposals: parse_number(name, "Disposals", &row.disposals)?,
            goals: parse_number(name, "Goals", &row.goals)?,
            behinds: parse_number(name, "Behinds", &row.behinds)?,
            label: row.round,
        });
    }
    Ok(series)
}
