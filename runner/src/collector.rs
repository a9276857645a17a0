use globset::GlobMatcher;
use ignore::{DirEntry, WalkBuilder};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub trait Collect {
    /// all matching files below `folder`, in walk order
    fn collect(&self, folder: &Path) -> Result<Vec<PathBuf>, ignore::Error>;
}

/// Finds files below a folder whose name matches a glob
#[derive(Debug, Clone)]
pub struct Collector {
    matcher: GlobMatcher,
}

impl Collector {
    pub fn new(matcher: GlobMatcher) -> Self {
        Self { matcher }
    }
}

impl Collect for Collector {
    /// Recursively collect all regular files in `folder` with a matching file name.
    /// A missing folder yields no files, any other walk error is returned.
    fn collect(&self, folder: &Path) -> Result<Vec<PathBuf>, ignore::Error> {
        if !folder.is_dir() {
            warn!(folder = ?folder, "Folder not found, no files collected");

            return Ok(Vec::new());
        }

        let mut builder = WalkBuilder::new(folder);

        // behave like find: no hidden or ignore file filtering
        builder
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        debug!("Filtering {folder:?} with glob: {:?}", self.matcher.glob());

        itertools::process_results(builder.build(), |entries| {
            entries
                .filter(|entry| entry.file_type().map_or(false, |kind| kind.is_file()))
                .filter(|entry| self.matcher.is_match(entry.file_name()))
                .map(DirEntry::into_path)
                .collect_vec()
        })
    }
}
