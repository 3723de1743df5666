use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    fixtures::{fixtures_for_round, parse_schedule},
    folders::{directory_names, fixture_for_folder, match_folders},
    h2h::{outcome_glyphs, outcomes, player_history, GlyphMap, H2HHistory},
    loader::{FolderTables, MalformedPolicy, StatTableLoader},
    players::{season_series, PlayerSlugs},
    remote::{join_path, ContentStore},
    selector::{player_aggregate, players, team_view, TableView},
    table::TableKind,
    types::{AveragingWindow, Fixture, MatchResult, PlayerAggregate, SeriesPoint, Side},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewState {
    NoMatchSelected,
    MatchSelected,
    TableLoaded,
    PlayerSelected,
}

#[derive(Debug, Clone)]
struct MatchSelection {
    folder: String,
    fixture: Fixture,
}

#[derive(Debug, Clone)]
struct PlayerSelection {
    side: Side,
    aggregate: PlayerAggregate,
}

/// One user's view of the current round: the store, the round's fixtures and
/// folders, memoized tables and the current selections.
pub struct Session<S: ContentStore> {
    store: S,
    config: PipelineConfig,
    fixtures: Vec<Fixture>,
    folders: Vec<String>,
    loader: StatTableLoader,
    selected: Option<MatchSelection>,
    window: AveragingWindow,
    player: Option<PlayerSelection>,
    slugs: Option<PlayerSlugs>,
    glyphs: GlyphMap,
}

impl<S: ContentStore> Session<S> {
    /// Reads the season schedule, resolves the current round and matches its
    /// fixtures to the round's folders.
    pub fn open(store: S, config: PipelineConfig) -> Result<Self> {
        let season = &config.season;
        let schedule_path = season.fixture_path();
        let schedule = parse_schedule(&schedule_path, &store.get_file_bytes(&schedule_path)?)?;
        let fixtures = fixtures_for_round(&schedule, season.current_round)?;

        let listing = directory_names(&store.list_directory(&season.round_path())?);
        let match_ids: Vec<&str> = fixtures.iter().map(|f| f.match_id.as_str()).collect();
        let folders = match_folders(&match_ids, &listing);
        info!(
            "Round {}: {} fixtures, {} match folders",
            season.current_round,
            fixtures.len(),
            folders.len()
        );

        Ok(Self {
            store,
            config,
            fixtures,
            folders,
            loader: StatTableLoader::default(),
            selected: None,
            window: AveragingWindow::default(),
            player: None,
            slugs: None,
            glyphs: GlyphMap::default(),
        })
    }

    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.loader = StatTableLoader::new(policy);
        self
    }

    pub fn with_glyphs(mut self, glyphs: GlyphMap) -> Self {
        self.glyphs = glyphs;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Folder names offered for selection, in fixture order.
    pub fn match_folders(&self) -> &[String] {
        &self.folders
    }

    pub fn window(&self) -> AveragingWindow {
        self.window
    }

    pub fn selected_folder(&self) -> Option<&str> {
        self.selected.as_ref().map(|s| s.folder.as_str())
    }

    pub fn selected_fixture(&self) -> Result<&Fixture> {
        self.selected
            .as_ref()
            .map(|s| &s.fixture)
            .ok_or(PipelineError::NoMatchSelected)
    }

    pub fn selected_player(&self) -> Option<&PlayerAggregate> {
        self.player.as_ref().map(|p| &p.aggregate)
    }

    pub fn state(&self) -> ViewState {
        let Some(selected) = &self.selected else {
            return ViewState::NoMatchSelected;
        };
        if self.player.is_some() {
            ViewState::PlayerSelected
        } else if self.loader.cached_folder() == Some(self.path_of(&selected.folder).as_str()) {
            ViewState::TableLoaded
        } else {
            ViewState::MatchSelected
        }
    }

    fn path_of(&self, folder: &str) -> String {
        join_path(&self.config.season.round_path(), folder)
    }

    fn folder_path(&self) -> Result<String> {
        let selected = self.selected.as_ref().ok_or(PipelineError::NoMatchSelected)?;
        Ok(self.path_of(&selected.folder))
    }

    /// Selects a match folder. Choosing a different folder discards memoized
    /// tables and the player selection; re-selecting the current one is a no-op.
    /// An unknown folder leaves the current selection untouched.
    pub fn select_match(&mut self, folder: &str) -> Result<&Fixture> {
        let unchanged = self.selected_folder() == Some(folder);
        if !unchanged {
            if !self.folders.iter().any(|f| f == folder) {
                return Err(PipelineError::UnknownFolder {
                    folder: folder.to_string(),
                });
            }
            let fixture = fixture_for_folder(&self.fixtures, folder)?.clone();
            self.reset();
            info!("Selected {} ({})", folder, fixture.match_id);
            self.selected = Some(MatchSelection {
                folder: folder.to_string(),
                fixture,
            });
        }
        self.selected_fixture()
    }

    fn reset(&mut self) {
        self.selected = None;
        self.player = None;
        self.loader.invalidate();
    }

    /// Drops memoized tables and the player selection; the match stays selected.
    pub fn invalidate(&mut self) {
        debug!("Invalidating session tables");
        self.player = None;
        self.slugs = None;
        self.loader.invalidate();
    }

    pub fn tables(&mut self) -> Result<&FolderTables> {
        let path = self.folder_path()?;
        self.loader.load(&self.store, &path)
    }

    fn team(&self, side: Side) -> Result<String> {
        Ok(self.selected_fixture()?.team(side).to_string())
    }

    /// Changes the averaging window and re-derives the selected player's line.
    /// If the player is missing from the new window's table the selection is dropped.
    pub fn set_window(&mut self, window: AveragingWindow) -> Result<()> {
        self.window = window;
        let Some(current) = self.player.take() else {
            return Ok(());
        };
        let aggregate = self.derive_aggregate(current.side, &current.aggregate.player)?;
        self.player = Some(PlayerSelection {
            side: current.side,
            aggregate,
        });
        Ok(())
    }

    fn derive_aggregate(&mut self, side: Side, player: &str) -> Result<PlayerAggregate> {
        let team = self.team(side)?;
        let window = self.window;
        let tables = self.tables()?;
        player_aggregate(tables.average(&team, window)?, player)
    }

    pub fn select_player(&mut self, side: Side, player: &str) -> Result<PlayerAggregate> {
        self.player = None;
        let aggregate = self.derive_aggregate(side, player)?;
        debug!(
            "{}: {} disposals, {} goals ({})",
            player, aggregate.disposals, aggregate.goals, self.window
        );
        self.player = Some(PlayerSelection {
            side,
            aggregate: aggregate.clone(),
        });
        Ok(aggregate)
    }

    pub fn team_players(&mut self, side: Side) -> Result<Vec<String>> {
        let team = self.team(side)?;
        let window = self.window;
        Ok(players(self.tables()?.average(&team, window)?))
    }

    /// The team's average table for the current window, ready for display.
    pub fn team_view(&mut self, side: Side, columns: &[&str]) -> Result<TableView> {
        let team = self.team(side)?;
        let window = self.window;
        let table = self.tables()?.average(&team, window)?;
        Ok(team_view(table, &team, columns))
    }

    /// The player's meetings with the other side of the selected fixture.
    pub fn head_to_head(&mut self, side: Side, player: &str) -> Result<H2HHistory> {
        let team = self.team(side)?;
        let opponent = self.team(side.other())?;
        let table = self.tables()?.require(&team, TableKind::H2HGames)?;
        player_history(table, player, &opponent)
    }

    pub fn outcome_glyphs(&mut self, side: Side) -> Result<String> {
        let team = self.team(side)?;
        let results: Vec<MatchResult> = outcomes(self.tables()?.require(&team, TableKind::H2HResults)?)?
            .into_iter()
            .map(|o| o.result)
            .collect();
        Ok(outcome_glyphs(results, &self.glyphs))
    }

    /// Round-by-round series from the player's current-season log.
    pub fn season_series(&mut self, player: &str) -> Result<Vec<SeriesPoint>> {
        let slugs = match self.slugs.take() {
            Some(slugs) => slugs,
            None => {
                let path = self.config.season.player_slugs_path();
                PlayerSlugs::parse(&path, &self.store.get_file_bytes(&path)?)?
            }
        };
        let slug = slugs.slug(player).map(str::to_string);
        self.slugs = Some(slugs);
        let slug = slug?;

        let path = self.config.season.player_log_path(&slug);
        season_series(&path, &self.store.get_file_bytes(&path)?)
    }
}
