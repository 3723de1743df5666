use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{
    error::{PipelineError, Result},
    remote::{join_path, ContentStore},
    table::{StatTable, TableKey, TableKind},
    types::{AveragingWindow, EntryKind},
};

/// What to do with a recognized file that does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    #[default]
    Fail,
    /// Keep the well-formed tables and report the rest in [`FolderTables::skipped`].
    Skip,
}

/// A recognized file rejected under [`MalformedPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTable {
    pub file: String,
    pub reason: String,
}

/// Every recognized table of one match folder, keyed by logical name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderTables {
    pub folder: String,
    pub tables: BTreeMap<String, StatTable>,
    pub skipped: Vec<SkippedTable>,
}

impl FolderTables {
    pub fn get(&self, name: &str) -> Option<&StatTable> {
        self.tables.get(name)
    }

    pub fn find(&self, team: &str, kind: TableKind) -> Option<&StatTable> {
        self.tables
            .values()
            .find(|t| t.key.team == team && t.key.kind == kind)
    }

    pub fn require(&self, team: &str, kind: TableKind) -> Result<&StatTable> {
        self.find(team, kind).ok_or_else(|| PipelineError::TableMissing {
            name: TableKey {
                team: team.to_string(),
                kind,
            }
            .name(),
        })
    }

    pub fn average(&self, team: &str, window: AveragingWindow) -> Result<&StatTable> {
        self.require(team, TableKind::Average(window))
    }
}

/// Loads folder tables on demand and memoizes the most recent folder.
#[derive(Debug, Default)]
pub struct StatTableLoader {
    policy: MalformedPolicy,
    memo: Option<FolderTables>,
}

impl StatTableLoader {
    pub fn new(policy: MalformedPolicy) -> Self {
        Self { policy, memo: None }
    }

    pub fn cached_folder(&self) -> Option<&str> {
        self.memo.as_ref().map(|m| m.folder.as_str())
    }

    pub fn invalidate(&mut self) {
        if let Some(memo) = self.memo.take() {
            debug!("Dropped memoized tables for {}", memo.folder);
        }
    }

    /// Returns the tables of `folder`, fetching them only when the memo holds
    /// another folder or nothing. A failed fetch leaves the memo empty.
    pub fn load<S: ContentStore + ?Sized>(&mut self, store: &S, folder: &str) -> Result<&FolderTables> {
        let tables = match self.memo.take() {
            Some(memo) if memo.folder == folder => {
                debug!("Using memoized tables for {}", folder);
                memo
            }
            _ => fetch_folder(store, folder, self.policy)?,
        };
        Ok(&*self.memo.insert(tables))
    }
}

/// Lists `folder` and parses every file that follows the table naming convention.
pub fn fetch_folder<S: ContentStore + ?Sized>(
    store: &S,
    folder: &str,
    policy: MalformedPolicy,
) -> Result<FolderTables> {
    let entries = store.list_directory(folder)?;
    let mut tables = BTreeMap::new();
    let mut skipped = Vec::new();

    for entry in entries.iter().filter(|e| e.kind == EntryKind::File) {
        let Some(key) = TableKey::from_file_name(&entry.name) else {
            debug!("Ignoring {} in {}", entry.name, folder);
            continue;
        };

        let bytes = store.get_file_bytes(&join_path(folder, &entry.name))?;
        let parsed = StatTable::parse(key, &bytes).and_then(|table| match table.key.kind {
            TableKind::Average(_) => table.sorted_by_disposals(),
            _ => Ok(table),
        });

        match parsed {
            Ok(table) => {
                tables.insert(table.name.clone(), table);
            }
            Err(e) if policy == MalformedPolicy::Skip => {
                warn!("Skipping {}: {}", entry.name, e);
                skipped.push(SkippedTable {
                    file: entry.name.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Loaded {} tables from {} ({} skipped)",
        tables.len(),
        folder,
        skipped.len()
    );
    Ok(FolderTables {
        folder: folder.to_string(),
        tables,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::RemoteError, types::DirEntry};
    use std::{cell::RefCell, collections::HashMap};

    #[derive(Default)]
    struct FakeStore {
        dirs: HashMap<String, Vec<DirEntry>>,
        files: HashMap<String, String>,
        fetches: RefCell<Vec<String>>,
    }

    impl FakeStore {
        fn with_file(mut self, folder: &str, name: &str, body: &str) -> Self {
            self.dirs
                .entry(folder.to_string())
                .or_default()
                .push(DirEntry::file(name));
            self.files.insert(join_path(folder, name), body.to_string());
            self
        }
    }

    impl ContentStore for FakeStore {
        fn list_directory(&self, path: &str) -> std::result::Result<Vec<DirEntry>, RemoteError> {
            self.dirs
                .get(path)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound { path: path.to_string() })
        }

        fn get_file_bytes(&self, path: &str) -> std::result::Result<Vec<u8>, RemoteError> {
            self.fetches.borrow_mut().push(path.to_string());
            self.files
                .get(path)
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| RemoteError::NotFound { path: path.to_string() })
        }
    }

    const AVERAGE: &str = "Player,Disposals,Goals\nA,10,1\nB,25,2\n";

    fn store() -> FakeStore {
        FakeStore::default()
            .with_file("Round_1/A v B", "A Season Average.csv", AVERAGE)
            .with_file("Round_1/A v B", "notes.txt", "ignore me")
            .with_file("Round_1/C v D", "C Last 5 Average.csv", AVERAGE)
    }

    #[test]
    fn test_second_load_is_memoized() {
        let store = store();
        let mut loader = StatTableLoader::default();

        let first = loader.load(&store, "Round_1/A v B").unwrap().clone();
        let second = loader.load(&store, "Round_1/A v B").unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(store.fetches.borrow().len(), 1);
        assert!(first.get("A Season Average").is_some());
        assert_eq!(first.tables.len(), 1);
    }

    #[test]
    fn test_new_folder_replaces_memo() {
        let store = store();
        let mut loader = StatTableLoader::default();
        loader.load(&store, "Round_1/A v B").unwrap();
        loader.load(&store, "Round_1/C v D").unwrap();
        assert_eq!(loader.cached_folder(), Some("Round_1/C v D"));

        loader.load(&store, "Round_1/A v B").unwrap();
        assert_eq!(store.fetches.borrow().len(), 3);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let store = store();
        let mut loader = StatTableLoader::default();
        loader.load(&store, "Round_1/A v B").unwrap();
        loader.invalidate();
        assert_eq!(loader.cached_folder(), None);
        loader.load(&store, "Round_1/A v B").unwrap();
        assert_eq!(store.fetches.borrow().len(), 2);
    }

    #[test]
    fn test_failed_load_clears_memo() {
        let store = store();
        let mut loader = StatTableLoader::default();
        loader.load(&store, "Round_1/A v B").unwrap();

        let err = loader.load(&store, "Round_1/Missing").unwrap_err();
        assert!(matches!(err, PipelineError::RemoteFetch(RemoteError::NotFound { .. })));
        assert_eq!(loader.cached_folder(), None);
    }

    #[test]
    fn test_average_tables_are_sorted_on_load() {
        let store = store();
        let mut loader = StatTableLoader::default();
        let tables = loader.load(&store, "Round_1/A v B").unwrap();
        let table = tables.average("A", AveragingWindow::Season).unwrap();
        assert_eq!(table.cell(0, "Player"), Some("B"));
        assert!(matches!(
            tables.average("A", AveragingWindow::Last3),
            Err(PipelineError::TableMissing { .. })
        ));
    }

    #[test]
    fn test_malformed_policy() {
        let store = store().with_file("Round_1/A v B", "B Season Average.csv", "Player,Goals\nX,1\n");

        let mut strict = StatTableLoader::new(MalformedPolicy::Fail);
        assert!(matches!(
            strict.load(&store, "Round_1/A v B"),
            Err(PipelineError::MalformedTable { .. })
        ));
        assert_eq!(strict.cached_folder(), None);

        let mut lenient = StatTableLoader::new(MalformedPolicy::Skip);
        let tables = lenient.load(&store, "Round_1/A v B").unwrap();
        assert_eq!(tables.tables.len(), 1);
        assert_eq!(tables.skipped.len(), 1);
        assert_eq!(tables.skipped[0].file, "B Season Average.csv");
    }

    #[test]
    fn test_h2h_rows_are_checked_on_load() {
        let store = FakeStore::default()
            .with_file("Round_1/A v B", "A Season Average.csv", AVERAGE)
            .with_file(
                "Round_1/A v B",
                "A H2H Games.csv",
                "Player,Year,Round,Opponent,Disposals,Goals,Behinds,Date\n\
                 X,2022,R1,B,20,1,0,2022-04-02\n\
                 Y,2022,R1,B,18,0,1,not a date\n",
            )
            .with_file(
                "Round_1/A v B",
                "A H2H Results.csv",
                "Year,Round,Opponent,Result\n2022,R1,B,Washout\n",
            );

        let mut strict = StatTableLoader::new(MalformedPolicy::Fail);
        assert_eq!(
            strict.load(&store, "Round_1/A v B").unwrap_err(),
            PipelineError::MalformedTable {
                table: "A H2H Games".to_string(),
                reason: "invalid date 'not a date'".to_string(),
            }
        );

        let mut lenient = StatTableLoader::new(MalformedPolicy::Skip);
        let tables = lenient.load(&store, "Round_1/A v B").unwrap();
        let skipped: Vec<&str> = tables.skipped.iter().map(|s| s.file.as_str()).collect();
        assert_eq!(skipped, vec!["A H2H Games.csv", "A H2H Results.csv"]);
        assert!(tables.skipped[1].reason.contains("unknown result 'Washout'"));
        assert!(tables.average("A", AveragingWindow::Season).is_ok());
        assert!(matches!(
            tables.require("A", TableKind::H2HGames),
            Err(PipelineError::TableMissing { .. })
        ));
    }
}
