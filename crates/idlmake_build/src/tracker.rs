//! Source → output tracking at project-membership granularity.
//!
//! IDE hosts model sources as items in a project tree. A source removed from
//! the tree (rather than deleted from disk) must still have its generated
//! files reaped. [`FileTracker::reap`] walks the live tree, compares it with
//! the tracked sources and deletes the outputs of every source that is gone.
//!
//! Hosts call into the tracker from a single UI thread, and item callbacks
//! during the walk may re-enter [`FileTracker::reap`]; the nested call returns
//! [`ReapOutcome::Skipped`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::gc::remove_generated;

/// A node of the host's project item tree.
pub trait ProjectItem {
    /// Returns `true` if the item is a file.
    fn is_file(&self) -> bool;

    /// Returns `true` if the item is a folder whose children should be walked.
    fn is_folder(&self) -> bool;

    /// Returns the absolute path of the item, if it has one.
    fn full_path(&self) -> Option<PathBuf>;

    /// Returns the item's children.
    fn children(&self) -> Vec<&dyn ProjectItem>;
}

/// Plain in-memory [`ProjectItem`] tree.
#[derive(Debug, Clone)]
pub struct ItemNode {
    path: PathBuf,
    folder: bool,
    children: Vec<ItemNode>,
}

impl ItemNode {
    /// Creates a file item.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            folder: false,
            children: Vec::new(),
        }
    }

    /// Creates a folder item.
    pub fn folder(path: impl Into<PathBuf>, children: Vec<ItemNode>) -> Self {
        Self {
            path: path.into(),
            folder: true,
            children,
        }
    }
}

impl ProjectItem for ItemNode {
    fn is_file(&self) -> bool {
        !self.folder
    }

    fn is_folder(&self) -> bool {
        self.folder
    }

    fn full_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn children(&self) -> Vec<&dyn ProjectItem> {
        self.children.iter().map(|c| c as &dyn ProjectItem).collect()
    }
}

/// Result of [`FileTracker::reap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReapOutcome {
    /// Another reap was already running on this tracker.
    Skipped,
    /// The reap ran.
    Reaped {
        /// Tracked sources that were missing from the project tree.
        sources: Vec<PathBuf>,
        /// Generated files that were deleted.
        files: Vec<PathBuf>,
    },
}

type Associations = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Per-project source → generated-file associations.
#[derive(Debug, Default)]
pub struct FileTracker {
    projects: RefCell<BTreeMap<String, Associations>>,
    reaping: Cell<bool>,
}

/// Clears the reaping flag when dropped.
struct ReapGuard<'a>(&'a Cell<bool>);

impl Drop for ReapGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl FileTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outputs of `source`, replacing any previous association.
    pub fn track(&self, project: &str, source: &Path, outputs: Vec<PathBuf>) {
        self.projects
            .borrow_mut()
            .entry(project.to_string())
            .or_default()
            .insert(source.to_path_buf(), outputs);
    }

    /// Replaces every association of `project`.
    pub fn replace_project(&self, project: &str, associations: BTreeMap<PathBuf, Vec<PathBuf>>) {
        self.projects
            .borrow_mut()
            .insert(project.to_string(), associations);
    }

    /// Forgets `source`, returning the outputs it had.
    pub fn untrack(&self, project: &str, source: &Path) -> Vec<PathBuf> {
        self.projects
            .borrow_mut()
            .get_mut(project)
            .and_then(|p| p.remove(source))
            .unwrap_or_default()
    }

    /// Forgets a whole project.
    pub fn remove_project(&self, project: &str) {
        self.projects.borrow_mut().remove(project);
    }

    /// Returns the tracked outputs of `source`.
    pub fn outputs(&self, project: &str, source: &Path) -> Vec<PathBuf> {
        self.projects
            .borrow()
            .get(project)
            .and_then(|p| p.get(source).cloned())
            .unwrap_or_default()
    }

    /// Returns the tracked sources of `project`.
    pub fn sources(&self, project: &str) -> Vec<PathBuf> {
        self.projects
            .borrow()
            .get(project)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns `true` while a reap is in progress.
    pub fn is_reaping(&self) -> bool {
        self.reaping.get()
    }

    /// Deletes the outputs of tracked sources missing from the project tree.
    ///
    /// Deletion failures are logged and swallowed. A call made while another
    /// reap is running returns [`ReapOutcome::Skipped`] without doing anything.
    pub fn reap(&self, project: &str, root: &dyn ProjectItem) -> ReapOutcome {
        if self.reaping.replace(true) {
            debug!(project, "reap already in progress; skipping");
            return ReapOutcome::Skipped;
        }
        let _guard = ReapGuard(&self.reaping);

        let live = member_files(root);

        let gone: Vec<PathBuf> = self
            .sources(project)
            .into_iter()
            .filter(|s| !live.contains(s))
            .collect();

        let mut files = Vec::new();
        for source in &gone {
            for output in self.untrack(project, source) {
                if remove_generated(&output) {
                    files.push(output);
                }
            }
            debug!(project, source = %source.display(), "reaped removed source");
        }

        ReapOutcome::Reaped {
            sources: gone,
            files,
        }
    }
}

/// Collects the paths of every file item under `root`.
fn member_files(root: &dyn ProjectItem) -> HashSet<PathBuf> {
    let mut files = HashSet::new();
    let mut stack: Vec<&dyn ProjectItem> = vec![root];
    while let Some(item) = stack.pop() {
        if item.is_file() {
            if let Some(path) = item.full_path() {
                files.insert(path);
            }
        }
        if item.is_folder() {
            stack.extend(item.children());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, "generated").unwrap();
    }

    #[test]
    fn track_and_query() {
        let tracker = FileTracker::new();
        tracker.track("demo", Path::new("/w/A.ice"), vec![PathBuf::from("/g/A.java")]);
        assert_eq!(tracker.sources("demo"), vec![PathBuf::from("/w/A.ice")]);
        assert_eq!(tracker.outputs("demo", Path::new("/w/A.ice")).len(), 1);
        assert!(tracker.sources("other").is_empty());

        tracker.remove_project("demo");
        assert!(tracker.sources("demo").is_empty());
    }

    #[test]
    fn reap_deletes_outputs_of_removed_members() {
        let dir = tempfile::tempdir().unwrap();
        let a_out = dir.path().join("A.java");
        let b_out = dir.path().join("B.java");
        touch(&a_out);
        touch(&b_out);

        let tracker = FileTracker::new();
        tracker.track("demo", Path::new("/w/slice/A.ice"), vec![a_out.clone()]);
        tracker.track("demo", Path::new("/w/slice/B.ice"), vec![b_out.clone()]);

        let tree = ItemNode::folder(
            "/w",
            vec![ItemNode::folder("/w/slice", vec![ItemNode::file("/w/slice/A.ice")])],
        );
        let outcome = tracker.reap("demo", &tree);

        assert_eq!(
            outcome,
            ReapOutcome::Reaped {
                sources: vec![PathBuf::from("/w/slice/B.ice")],
                files: vec![b_out.clone()],
            }
        );
        assert!(a_out.exists());
        assert!(!b_out.exists());
        assert_eq!(tracker.sources("demo"), vec![PathBuf::from("/w/slice/A.ice")]);
        assert!(!tracker.is_reaping());
    }

    #[test]
    fn missing_output_is_swallowed() {
        let tracker = FileTracker::new();
        tracker.track("demo", Path::new("/w/A.ice"), vec![PathBuf::from("/nonexistent/A.java")]);
        let outcome = tracker.reap("demo", &ItemNode::folder("/w", vec![]));
        assert_eq!(
            outcome,
            ReapOutcome::Reaped {
                sources: vec![PathBuf::from("/w/A.ice")],
                files: vec![],
            }
        );
    }

    /// An item whose `children` callback tries to reap again.
    struct ReentrantItem<'t> {
        tracker: &'t FileTracker,
        nested: RefCell<Option<ReapOutcome>>,
    }

    impl ProjectItem for ReentrantItem<'_> {
        fn is_file(&self) -> bool {
            false
        }

        fn is_folder(&self) -> bool {
            true
        }

        fn full_path(&self) -> Option<PathBuf> {
            None
        }

        fn children(&self) -> Vec<&dyn ProjectItem> {
            let empty = ItemNode::folder("/w", vec![]);
            *self.nested.borrow_mut() = Some(self.tracker.reap("demo", &empty));
            Vec::new()
        }
    }

    #[test]
    fn nested_reap_is_skipped() {
        let tracker = FileTracker::new();
        tracker.track("demo", Path::new("/w/A.ice"), vec![]);
        let root = ReentrantItem {
            tracker: &tracker,
            nested: RefCell::new(None),
        };

        let outer = tracker.reap("demo", &root);
        assert_eq!(*root.nested.borrow(), Some(ReapOutcome::Skipped));
        assert!(matches!(outer, ReapOutcome::Reaped { .. }));
        assert!(!tracker.is_reaping());

        // The guard is released, so a later reap runs normally.
        tracker.track("demo", Path::new("/w/B.ice"), vec![]);
        let again = tracker.reap("demo", &ItemNode::folder("/w", vec![]));
        assert!(matches!(again, ReapOutcome::Reaped { sources, .. } if sources.len() == 1));
    }
}
