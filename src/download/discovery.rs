//! Depth-first walk of the remote tree that feeds the job queue.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_recursion::async_recursion;

use super::paths::{insert_suffix, sanitize_name};
use super::Job;
use crate::drive::{EntryKind, RemoteEntry, RemoteStore};
use crate::logging::TRANSFER_LOG;
use crate::progress::Progress;

/// What the walk ran into, for the final report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub folders: u64,
    /// Folders whose local directory could not be created.
    pub mkdir_errors: u64,
    /// Folders whose listing failed part-way.
    pub listing_errors: u64,
    /// Entries saved under an id-suffixed name because their local name was
    /// already taken in the same folder.
    pub renamed: u64,
}

/// Local names handed out so far inside one folder, plus the temp names the
/// transfers into them write through. Two jobs never share either.
struct LocalNames<'s> {
    temp_suffix: &'s str,
    taken: HashSet<String>,
}

impl<'s> LocalNames<'s> {
    fn new(temp_suffix: &'s str) -> Self {
        Self {
            temp_suffix,
            taken: HashSet::new(),
        }
    }

    fn is_free(&self, name: &str, writes_temp: bool) -> bool {
        !self.taken.contains(name)
            && !(writes_temp && self.taken.contains(&format!("{}{}", name, self.temp_suffix)))
    }

    fn claim(&mut self, name: String, writes_temp: bool) {
        if writes_temp {
            self.taken.insert(format!("{}{}", name, self.temp_suffix));
        }
        self.taken.insert(name);
    }

    /// Local name for `entry`, without any export extension. Returns `true`
    /// alongside when the sanitized name was taken and the entry id had to
    /// be worked in.
    fn assign(&mut self, entry: &RemoteEntry) -> (String, bool) {
        let base = sanitize_name(&entry.name);
        let (extension, writes_temp) = match &entry.kind {
            EntryKind::Folder => ("", false),
            EntryKind::File => ("", true),
            EntryKind::Native(kind) => match kind.export_format() {
                Some(format) => (format.extension, true),
                // Nothing is ever written for it.
                None => return (base, false),
            },
        };

        let wanted = format!("{}{}", base, extension);
        if self.is_free(&wanted, writes_temp) {
            self.claim(wanted, writes_temp);
            return (base, false);
        }

        let id = sanitize_name(&entry.id);
        let renamed = match entry.kind {
            EntryKind::File => insert_suffix(&base, &id),
            _ => format!("{}-{}", base, id),
        };
        self.claim(format!("{}{}", renamed, extension), writes_temp);
        (renamed, true)
    }
}

/// Everything one walk needs, passed down explicitly through the recursion.
pub struct Discovery<'a> {
    pub store: &'a dyn RemoteStore,
    pub queue: &'a async_channel::Sender<Job>,
    pub progress: &'a Arc<Progress>,
    /// Suffix the executor writes through, reserved next to every target.
    pub temp_suffix: &'a str,
}

impl<'a> Discovery<'a> {
    /// Walk `folder_id` into `local_dir`, queueing a job per file.
    ///
    /// Returns once every reachable folder was visited. Failures are
    /// contained to the folder they happen in.
    pub async fn run(&self, folder_id: &str, local_dir: &Path) -> DiscoveryStats {
        let mut stats = DiscoveryStats::default();
        self.walk(folder_id, local_dir, &mut stats).await;
        stats
    }

    #[async_recursion]
    async fn walk(&self, folder_id: &str, local_dir: &Path, stats: &mut DiscoveryStats) {
        stats.folders += 1;

        // Jobs are only queued below this point, so their directory exists
        // before any worker can see them.
        if let Err(e) = tokio::fs::create_dir_all(local_dir).await {
            stats.mkdir_errors += 1;
            tracing::error!(
                target: TRANSFER_LOG,
                "Failed to create local directory '{}': {}",
                local_dir.display(),
                e
            );
            return;
        }

        let mut names = LocalNames::new(self.temp_suffix);
        let mut page_token: Option<String> = None;
        loop {
            let page = match self.store.list(folder_id, page_token.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    stats.listing_errors += 1;
                    tracing::error!(
                        target: TRANSFER_LOG,
                        "Failed to list folder {} ('{}'): {}",
                        folder_id,
                        local_dir.display(),
                        e
                    );
                    return;
                }
            };

            for entry in page.entries {
                let (name, renamed) = names.assign(&entry);
                if renamed {
                    stats.renamed += 1;
                    tracing::warn!(
                        target: TRANSFER_LOG,
                        "'{}' ({}) clashes with another entry in '{}', saving as '{}'",
                        entry.name,
                        entry.id,
                        local_dir.display(),
                        name
                    );
                }
                let path = local_dir.join(name);
                if entry.is_folder() {
                    self.walk(&entry.id, &path, stats).await;
                    continue;
                }
                self.progress.job_found();
                if self.queue.send(Job { entry, target: path }).await.is_err() {
                    // Only happens if every worker is gone; nothing left to feed.
                    tracing::error!("Job queue closed while discovery was still running");
                    return;
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryStore, DOC_MIME};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    async fn collect(store: &MemoryStore, root: &Path) -> (DiscoveryStats, Vec<Job>, Arc<Progress>) {
        let (tx, rx) = async_channel::unbounded();
        let progress = Arc::new(Progress::new());
        let stats = Discovery {
            store,
            queue: &tx,
            progress: &progress,
            temp_suffix: ".tmp",
        }
        .run("root", root)
        .await;
        drop(tx);
        let mut jobs = Vec::new();
        while let Ok(job) = rx.recv().await {
            jobs.push(job);
        }
        (stats, jobs, progress)
    }

    fn targets(jobs: &[Job], root: &Path) -> BTreeSet<PathBuf> {
        jobs.iter()
            .map(|j| j.target.strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    #[tokio::test]
    async fn test_walks_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .folder("root", "F", "F")
            .file("F", "a", "a.txt", b"0123456789")
            .native("F", "d", "Doc", DOC_MIME, b"docx")
            .folder("F", "G", "G")
            .file("G", "b", "b.bin", b"b")
            .file("root", "top", "top.txt", b"t");

        let (stats, jobs, progress) = collect(&store, dir.path()).await;
        assert_eq!(stats.folders, 3);
        assert_eq!(jobs.len(), 4);
        assert_eq!(progress.snapshot().found, 4);
        assert_eq!(
            targets(&jobs, dir.path()),
            BTreeSet::from([
                PathBuf::from("F/a.txt"),
                PathBuf::from("F/Doc"),
                PathBuf::from("F/G/b.bin"),
                PathBuf::from("top.txt"),
            ])
        );
        assert!(dir.path().join("F").join("G").is_dir());
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .file("root", "1", "first", b"")
            .folder("root", "F", "F")
            .file("F", "2", "inner", b"")
            .file("root", "3", "last", b"");

        let (_, jobs, _) = collect(&store, dir.path()).await;
        let ids: Vec<_> = jobs.iter().map(|j| j.entry.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_follows_page_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new().with_page_size(2);
        for i in 0..7 {
            store.file("root", &format!("f{}", i), &format!("file{}.txt", i), b"x");
        }

        let (_, jobs, _) = collect(&store, dir.path()).await;
        assert_eq!(jobs.len(), 7);
        assert_eq!(store.list_calls(), 4);
    }

    #[tokio::test]
    async fn test_names_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .folder("root", "F", "a/b")
            .file("F", "x", "A/B:C", b"")
            .file("root", "up", "..", b"");

        let (_, jobs, _) = collect(&store, dir.path()).await;
        assert_eq!(
            targets(&jobs, dir.path()),
            BTreeSet::from([PathBuf::from("a_b/A_B_C"), PathBuf::from("__")])
        );
    }

    #[tokio::test]
    async fn test_listing_error_contained_to_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .folder("root", "bad", "bad")
            .file("bad", "lost", "lost.txt", b"")
            .folder("root", "good", "good")
            .file("good", "kept", "kept.txt", b"");
        store.break_listing("bad");

        let (stats, jobs, progress) = collect(&store, dir.path()).await;
        assert_eq!(stats.listing_errors, 1);
        assert_eq!(targets(&jobs, dir.path()), BTreeSet::from([PathBuf::from("good/kept.txt")]));
        assert_eq!(progress.snapshot().found, 1);
    }

    #[tokio::test]
    async fn test_mkdir_error_contained_to_subtree() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the folder should go makes create_dir_all fail.
        std::fs::write(dir.path().join("blocked"), b"").unwrap();
        let mut store = MemoryStore::new();
        store
            .folder("root", "B", "blocked")
            .file("B", "x", "x.txt", b"")
            .file("root", "y", "y.txt", b"");

        let (stats, jobs, _) = collect(&store, dir.path()).await;
        assert_eq!(stats.mkdir_errors, 1);
        assert_eq!(targets(&jobs, dir.path()), BTreeSet::from([PathBuf::from("y.txt")]));
    }

    #[tokio::test]
    async fn test_directory_exists_before_job_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .folder("root", "A", "A")
            .folder("A", "B", "B")
            .file("B", "f", "deep.txt", b"");

        let (tx, rx) = async_channel::bounded::<Job>(1);
        let progress = Arc::new(Progress::new());
        let consumer = tokio::spawn(async move {
            let mut seen = 0;
            while let Ok(job) = rx.recv().await {
                assert!(job.target.parent().unwrap().is_dir());
                seen += 1;
            }
            seen
        });
        Discovery {
            store: &store,
            queue: &tx,
            progress: &progress,
            temp_suffix: ".tmp",
        }
        .run("root", dir.path())
        .await;
        drop(tx);
        assert_eq!(consumer.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_names_get_distinct_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .file("root", "id1", "same.bin", b"a")
            .file("root", "id2", "same.bin", b"b")
            .file("root", "id3", "A:B", b"c")
            .file("root", "id4", "A/B", b"d");

        let (stats, jobs, _) = collect(&store, dir.path()).await;
        assert_eq!(stats.renamed, 2);
        assert_eq!(
            targets(&jobs, dir.path()),
            BTreeSet::from([
                PathBuf::from("same.bin"),
                PathBuf::from("same-id2.bin"),
                PathBuf::from("A_B"),
                PathBuf::from("A_B-id4"),
            ])
        );
    }

    #[tokio::test]
    async fn test_file_named_like_sibling_folder_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .folder("root", "F", "Reports")
            .file("F", "inner", "q1.txt", b"")
            .file("root", "f", "Reports", b"flat file");

        let (stats, jobs, _) = collect(&store, dir.path()).await;
        assert_eq!(stats.renamed, 1);
        assert_eq!(
            targets(&jobs, dir.path()),
            BTreeSet::from([PathBuf::from("Reports/q1.txt"), PathBuf::from("Reports-f")])
        );
    }

    #[tokio::test]
    async fn test_export_name_clash_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .file("root", "plain", "Plan.docx", b"uploaded")
            .native("root", "g", "Plan", DOC_MIME, b"exported");

        let (stats, jobs, _) = collect(&store, dir.path()).await;
        assert_eq!(stats.renamed, 1);
        assert_eq!(
            targets(&jobs, dir.path()),
            BTreeSet::from([PathBuf::from("Plan.docx"), PathBuf::from("Plan-g")])
        );
    }

    #[tokio::test]
    async fn test_temp_name_of_sibling_is_reserved() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .file("root", "x", "a.txt", b"")
            .file("root", "y", "a.txt.tmp", b"");

        let (stats, jobs, _) = collect(&store, dir.path()).await;
        assert_eq!(stats.renamed, 1);
        assert_eq!(
            targets(&jobs, dir.path()),
            BTreeSet::from([PathBuf::from("a.txt"), PathBuf::from("a.txt-y.tmp")])
        );
    }

    #[tokio::test]
    async fn test_same_name_in_different_folders_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::new();
        store
            .folder("root", "A", "A")
            .file("A", "1", "x.txt", b"")
            .folder("root", "B", "B")
            .file("B", "2", "x.txt", b"");

        let (stats, _, _) = collect(&store, dir.path()).await;
        assert_eq!(stats.renamed, 0);
    }
}
