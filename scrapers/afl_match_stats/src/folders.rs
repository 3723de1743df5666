use tracing::{debug, warn};

use crate::{
    error::{PipelineError, Result},
    types::{DirEntry, EntryKind, Fixture},
};

/// Orders the round folder listing by fixture.
///
/// Each match identifier is looked up by substring containment. A fixture
/// with no folder is dropped; a fixture contained in several folder names
/// contributes all of them, in listing order.
pub fn match_folders<S: AsRef<str>>(match_ids: &[S], listing: &[String]) -> Vec<String> {
    let mut folders = Vec::new();
    for match_id in match_ids {
        let match_id = match_id.as_ref();
        let before = folders.len();
        folders.extend(
            listing
                .iter()
                .filter(|name| name.contains(match_id))
                .cloned(),
        );
        match folders.len() - before {
            0 => debug!("No folder found for fixture '{}'", match_id),
            1 => {}
            n => warn!("Fixture '{}' matched {} folders", match_id, n),
        }
    }
    folders
}

/// Directory names from a listing. Plain files and other entries never name a match.
pub fn directory_names(entries: &[DirEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.kind == EntryKind::Dir)
        .map(|e| e.name.clone())
        .collect()
}

/// The first fixture, in schedule order, whose identifier the folder name contains.
pub fn fixture_for_folder<'a>(fixtures: &'a [Fixture], folder: &str) -> Result<&'a Fixture> {
    fixtures
        .iter()
        .find(|f| folder.contains(f.match_id.as_str()))
        .ok_or_else(|| PipelineError::UnknownFolder {
            folder: folder.to_string(),
        })
}
