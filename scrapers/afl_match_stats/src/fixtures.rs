use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::{
    error::{PipelineError, Result},
    types::Fixture,
};

const ROUND_COL: &str = "Round Number";
const MATCH_COL: &str = "Match String";
const HOME_COL: &str = "Home Team";
const AWAY_COL: &str = "Away Team";
const HOME_URL_COL: &str = "Home Team url";
const AWAY_URL_COL: &str = "Away Team url";
const DATE_COL: &str = "Date";
const LOCATION_COL: &str = "Location";

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

fn parse_kickoff(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Parses the season fixture CSV. Columns are located by header name so the
/// export may carry extra columns in any order.
pub fn parse_schedule(name: &str, bytes: &[u8]) -> Result<Vec<Fixture>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::malformed(name, e.to_string()))?
        .clone();

    let index = |column: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::malformed(name, format!("missing column '{}'", column)))
    };
    let round_idx = index(ROUND_COL)?;
    let match_idx = index(MATCH_COL)?;
    let home_idx = index(HOME_COL)?;
    let away_idx = index(AWAY_COL)?;
    let home_url_idx = index(HOME_URL_COL)?;
    let away_url_idx = index(AWAY_URL_COL)?;
    let date_idx = index(DATE_COL)?;
    let location_idx = index(LOCATION_COL)?;

    let mut fixtures = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| PipelineError::malformed(name, e.to_string()))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        if is_blank(&record) {
            continue;
        }

        let round = field(round_idx).parse::<u32>().map_err(|_| {
            PipelineError::malformed(
                name,
                format!("row {}: invalid round '{}'", line + 1, field(round_idx)),
            )
        })?;
        let kickoff = parse_kickoff(field(date_idx)).ok_or_else(|| {
            PipelineError::malformed(
                name,
                format!("row {}: invalid date '{}'", line + 1, field(date_idx)),
            )
        })?;

        fixtures.push(Fixture {
            round,
            match_id: field(match_idx).to_string(),
            home_team: field(home_idx).to_string(),
            away_team: field(away_idx).to_string(),
            home_team_slug: field(home_url_idx).to_string(),
            away_team_slug: field(away_url_idx).to_string(),
            kickoff,
            venue: field(location_idx).to_string(),
        });
    }

    info!("Parsed {} fixtures from {}", fixtures.len(), name);
    Ok(fixtures)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.is_empty())
}

/// Fixtures scheduled for `round`, in schedule order.
pub fn fixtures_for_round(schedule: &[Fixture], round: u32) -> Result<Vec<Fixture>> {
    let fixtures: Vec<Fixture> = schedule
        .iter()
        .filter(|f| f.round == round)
        .cloned()
        .collect();

    if fixtures.is_empty() {
        return Err(PipelineError::EmptyRound { round });
    }
    debug!("Round {} has {} fixtures", round, fixtures.len());
    Ok(fixtures)
}
