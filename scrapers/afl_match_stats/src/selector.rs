use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{PipelineError, Result},
    table::{StatTable, DISPOSALS_COL, GOALS_COL, PLAYER_COL, STYLED_COLUMNS, TEAM_COL},
    types::PlayerAggregate,
};

/// A team's rows of a stat table, projected for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub name: String,
    pub team: String,
    pub columns: Vec<String>,
    /// Subset of `columns` the presentation layer shades.
    pub styled_columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn belongs_to(table: &StatTable, row: &[String], team: &str) -> bool {
    match table.column(TEAM_COL) {
        Some(idx) => row.get(idx).map(|t| t == team).unwrap_or(false),
        None => table.key.team == team,
    }
}

/// Rows of `team` projected onto `columns`, in table order. Requested columns
/// the table lacks are left out; an empty request keeps every column.
pub fn team_view(table: &StatTable, team: &str, columns: &[&str]) -> TableView {
    let projection: Vec<usize> = if columns.is_empty() {
        (0..table.columns.len()).collect()
    } else {
        columns.iter().filter_map(|c| table.column(c)).collect()
    };

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .filter(|row| belongs_to(table, row, team))
        .map(|row| {
            projection
                .iter()
                .map(|&idx| row.get(idx).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    let columns: Vec<String> = projection.iter().map(|&idx| table.columns[idx].clone()).collect();
    let styled_columns = columns
        .iter()
        .filter(|c| STYLED_COLUMNS.contains(&c.as_str()))
        .cloned()
        .collect();

    debug!("{} rows of {} belong to {}", rows.len(), table.name, team);
    TableView {
        name: table.name.clone(),
        team: team.to_string(),
        columns,
        styled_columns,
        rows,
    }
}

/// Player names in table order.
pub fn players(table: &StatTable) -> Vec<String> {
    (0..table.rows.len())
        .filter_map(|row| table.cell(row, PLAYER_COL))
        .map(str::to_string)
        .collect()
}

/// Disposals and goals of exactly `player`. Never falls back to another name;
/// duplicate rows log a warning and the first in table order wins.
pub fn player_aggregate(table: &StatTable, player: &str) -> Result<PlayerAggregate> {
    let matches: Vec<usize> = (0..table.rows.len())
        .filter(|&row| table.cell(row, PLAYER_COL) == Some(player))
        .collect();

    let row = match matches.as_slice() {
        [] => {
            return Err(PipelineError::PlayerNotFound {
                player: player.to_string(),
                table: table.name.clone(),
            })
        }
        [row] => *row,
        [row, ..] => {
            warn!(
                "{} appears {} times in {}, using the first row",
                player,
                matches.len(),
                table.name
            );
            *row
        }
    };

    Ok(PlayerAggregate {
        player: player.to_string(),
        table: table.name.clone(),
        disposals: table.number(row, DISPOSALS_COL)?,
        goals: table.number(row, GOALS_COL)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        table::{TableKey, TableKind},
        types::AveragingWindow,
    };
    use pretty_assertions::assert_eq;

    fn table(team: &str, csv: &str) -> StatTable {
        let key = TableKey {
            team: team.to_string(),
            kind: TableKind::Average(AveragingWindow::Season),
        };
        StatTable::parse(key, csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_sorted_selection() {
        let sorted = table("Carlton", "Player,Disposals,Goals\nA,10,1\nB,25,3\n")
            .sorted_by_disposals()
            .unwrap();
        assert_eq!(players(&sorted), vec!["B".to_string(), "A".to_string()]);

        let line = player_aggregate(&sorted, "B").unwrap();
        assert_eq!(line.disposals, 25.0);
        assert_eq!(line.goals, 3.0);
    }

    #[test]
    fn test_single_row_selection() {
        let t = table("Carlton", "Player,Disposals,Goals\nX,21.4,1.2\n");
        let line = player_aggregate(&t, "X").unwrap();
        assert_eq!((line.disposals, line.goals), (21.4, 1.2));
    }

    #[test]
    fn test_unknown_player_is_an_error() {
        let t = table("Carlton", "Player,Disposals,Goals\nX,21,1\n");
        assert_eq!(
            player_aggregate(&t, "Y"),
            Err(PipelineError::PlayerNotFound {
                player: "Y".to_string(),
                table: "Carlton Season Average".to_string(),
            })
        );
    }

    #[test_log::test]
    fn test_duplicate_player_rows_use_first_in_table_order() {
        let t = table("Carlton", "Player,Disposals,Goals\nX,21,1\nY,17,0\nX,30,3\n");
        let line = player_aggregate(&t, "X").unwrap();
        assert_eq!((line.disposals, line.goals), (21.0, 1.0));

        // sorting first changes which duplicate is seen first
        let sorted = t.sorted_by_disposals().unwrap();
        assert_eq!(player_aggregate(&sorted, "X").unwrap().disposals, 30.0);
    }

    #[test]
    fn test_team_view_uses_team_column_when_present() {
        let t = table(
            "Round",
            "Player,Team,Disposals,Goals,Frees For\nA,Carlton,20,1,2\nB,Geelong,18,0,1\nC,Carlton,15,2,0\n",
        );
        let view = team_view(&t, "Carlton", &["Player", "Disposals", "Frees For", "Kicks"]);
        assert_eq!(view.columns, vec!["Player", "Disposals", "Frees For"]);
        assert_eq!(view.styled_columns, vec!["Disposals", "Frees For"]);
        assert_eq!(
            view.rows,
            vec![
                vec!["A".to_string(), "20".to_string(), "2".to_string()],
                vec!["C".to_string(), "15".to_string(), "0".to_string()],
            ]
        );
    }

    #[test]
    fn test_team_view_falls_back_to_table_team() {
        let t = table("Carlton", "Player,Disposals,Goals\nA,20,1\n");
        assert_eq!(team_view(&t, "Carlton", &[]).rows.len(), 1);
        assert!(team_view(&t, "Geelong", &[]).rows.is_empty());
    }
}
