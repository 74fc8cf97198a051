//! Watch mode: rebuild what a file change affects.
//!
//! Filesystem events are collected for [`DEBOUNCE_MS`] after the last one,
//! deduplicated per path, then sorted into [`Change`]s:
//!
//! | Changed file | Change | Builder call |
//! |---|---|---|
//! | the data file | `Data` | [`Builder::reload_data`] |
//! | a view, removed | `Rescan` | [`Builder::rescan`] |
//! | a view, created or modified | `Views` | [`Builder::build_views`] |
//! | a `.css`/`.js` file | `Asset` | [`Builder::rebuild_asset`] |
//!
//! Anything under the output directory is ignored. A failed rebuild is
//! reported and the watcher keeps going; the output of the last good build
//! stays in place.

use notify::{EventKind, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::SitePaths;
use crate::generate::{BuildError, BuildReport, Builder};

/// Quiet time after the last event before a rebuild starts.
pub const DEBOUNCE_MS: u64 = 300;

const ASSET_EXTENSIONS: &[&str] = &["css", "js"];

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("file watcher failed: {0}")]
    Notify(#[from] notify::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// Something to rebuild, derived from a batch of file events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Views(Vec<PathBuf>),
    Rescan(PathBuf),
    Asset(PathBuf),
    Data(PathBuf),
}

/// Collects events and releases them once things have been quiet for
/// [`DEBOUNCE_MS`].
#[derive(Debug, Default)]
pub struct Debouncer {
    changes: BTreeMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a notify event.
    ///
    /// - Removed then created/modified: the file was restored, keep the new kind
    /// - Modified then removed: removed
    /// - Created then removed: nothing happened
    /// - Anything else: first event wins
    pub fn add_event(&mut self, event: &notify::Event) {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            match (self.changes.get(path).copied(), kind) {
                (None, _) => {
                    self.changes.insert(path.clone(), kind);
                }
                (Some(ChangeKind::Removed), ChangeKind::Created | ChangeKind::Modified) => {
                    self.changes.insert(path.clone(), kind);
                }
                (Some(ChangeKind::Modified), ChangeKind::Removed) => {
                    self.changes.insert(path.clone(), ChangeKind::Removed);
                }
                (Some(ChangeKind::Created), ChangeKind::Removed) => {
                    self.changes.remove(path);
                }
                _ => continue,
            }
            log::trace!("{:?} {}", kind, path.display());
            self.last_event = Some(Instant::now());
        }
    }

    /// Pending changes, if the quiet period has passed.
    pub fn take_if_ready(&mut self) -> Option<BTreeMap<PathBuf, ChangeKind>> {
        let last = self.last_event?;
        if last.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return None;
        }
        self.last_event = None;
        let changes = std::mem::take(&mut self.changes);
        (!changes.is_empty()).then_some(changes)
    }

    /// How long to wait for the next event before checking again.
    pub fn sleep_duration(&self) -> Duration {
        match self.last_event {
            Some(last) => Duration::from_millis(DEBOUNCE_MS)
                .saturating_sub(last.elapsed())
                .max(Duration::from_millis(1)),
            None => Duration::from_secs(3600),
        }
    }
}

/// Editor swap and backup files.
fn is_temp_file(path: &Path) -> bool {
    let name = crate::paths::file_name(path);
    name.ends_with('~')
        || name.starts_with(".#")
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
}

/// Sort a debounced batch into changes, most sweeping first.
///
/// A data change rebuilds everything, so it absorbs the rest of the batch;
/// a removed view does the same through a rescan.
pub fn classify(changes: &BTreeMap<PathBuf, ChangeKind>, paths: &SitePaths) -> Vec<Change> {
    let mut views = Vec::new();
    let mut assets = Vec::new();

    for (path, kind) in changes {
        if path.starts_with(&paths.output) {
            continue;
        }
        if *path == paths.data {
            return vec![Change::Data(path.clone())];
        }
        if path.starts_with(&paths.views) {
            // A directory may bring or take any number of views.
            if *kind == ChangeKind::Removed || path.is_dir() {
                return vec![Change::Rescan(path.clone())];
            }
            views.push(path.clone());
            continue;
        }
        let is_asset = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| ASSET_EXTENSIONS.contains(&e));
        if is_asset && *kind != ChangeKind::Removed {
            assets.push(Change::Asset(path.clone()));
        }
    }

    let mut out = Vec::new();
    if !views.is_empty() {
        out.push(Change::Views(views));
    }
    out.extend(assets);
    out
}

/// Hand one change to the builder.
pub fn apply(builder: &mut Builder, change: &Change) -> Result<BuildReport, BuildError> {
    match change {
        Change::Views(views) => builder.build_views(views),
        Change::Rescan(_) => builder.rescan(),
        Change::Asset(path) => builder.rebuild_asset(path),
        Change::Data(_) => builder.reload_data(),
    }
}

/// Watch the project sources until the event channel closes.
///
/// `on_change` sees every change with the outcome of its rebuild.
pub fn run(
    builder: &mut Builder,
    mut on_change: impl FnMut(&Change, &Result<BuildReport, BuildError>),
) -> Result<(), WatchError> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                tx.send(event).ok();
            }
            Err(e) => log::warn!("watch error: {e}"),
        }
    })?;

    let paths = builder.paths().clone();
    watcher.watch(&paths.src, RecursiveMode::Recursive)?;
    log::info!("watching {}", paths.src.display());

    let mut debouncer = Debouncer::new();
    loop {
        match rx.recv_timeout(debouncer.sleep_duration()) {
            Ok(event) => debouncer.add_event(&event),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
        }
        let Some(changes) = debouncer.take_if_ready() else {
            continue;
        };
        for change in classify(&changes, &paths) {
            let result = apply(builder, &change);
            if let Err(e) = &result {
                log::debug!("rebuild failed, keeping previous output: {e}");
            }
            on_change(&change, &result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from(path))
    }

    fn created(path: &str) -> notify::Event {
        event(EventKind::Create(CreateKind::File), path)
    }

    fn modified(path: &str) -> notify::Event {
        event(EventKind::Modify(ModifyKind::Any), path)
    }

    fn removed(path: &str) -> notify::Event {
        event(EventKind::Remove(RemoveKind::File), path)
    }

    fn site() -> SitePaths {
        SitePaths::resolve(&SiteConfig::default(), Path::new("/site"))
    }

    fn batch(items: &[(&str, ChangeKind)]) -> BTreeMap<PathBuf, ChangeKind> {
        items
            .iter()
            .map(|(p, k)| (PathBuf::from(p), *k))
            .collect()
    }

    // =========================================================================
    // Debouncer
    // =========================================================================

    #[test]
    fn restored_file_keeps_new_kind() {
        let mut d = Debouncer::new();
        d.add_event(&removed("/site/views/a.html"));
        d.add_event(&created("/site/views/a.html"));
        assert_eq!(
            d.changes,
            batch(&[("/site/views/a.html", ChangeKind::Created)])
        );
    }

    #[test]
    fn modified_then_removed_is_removed() {
        let mut d = Debouncer::new();
        d.add_event(&modified("/site/views/a.html"));
        d.add_event(&removed("/site/views/a.html"));
        assert_eq!(
            d.changes,
            batch(&[("/site/views/a.html", ChangeKind::Removed)])
        );
    }

    #[test]
    fn created_then_removed_is_nothing() {
        let mut d = Debouncer::new();
        d.add_event(&created("/site/views/a.html"));
        d.add_event(&removed("/site/views/a.html"));
        assert!(d.changes.is_empty());
    }

    #[test]
    fn metadata_and_temp_files_are_ignored() {
        let mut d = Debouncer::new();
        d.add_event(&event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
            "/site/views/a.html",
        ));
        d.add_event(&modified("/site/views/.a.html.swp"));
        d.add_event(&modified("/site/views/a.html~"));
        assert!(d.changes.is_empty());
        assert!(d.last_event.is_none());
    }

    #[test]
    fn not_ready_inside_quiet_period() {
        let mut d = Debouncer::new();
        assert!(d.take_if_ready().is_none());
        d.add_event(&modified("/site/views/a.html"));
        assert!(d.take_if_ready().is_none());
        assert!(d.sleep_duration() <= Duration::from_millis(DEBOUNCE_MS));
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn views_and_assets() {
        let changes = classify(
            &batch(&[
                ("/site/views/a.html", ChangeKind::Modified),
                ("/site/views/b.html", ChangeKind::Created),
                ("/site/style/app.css", ChangeKind::Modified),
                ("/site/README.md", ChangeKind::Modified),
            ]),
            &site(),
        );
        assert_eq!(
            changes,
            vec![
                Change::Views(vec![
                    PathBuf::from("/site/views/a.html"),
                    PathBuf::from("/site/views/b.html")
                ]),
                Change::Asset(PathBuf::from("/site/style/app.css")),
            ]
        );
    }

    #[test]
    fn data_change_absorbs_batch() {
        let changes = classify(
            &batch(&[
                ("/site/jampass.data.json", ChangeKind::Modified),
                ("/site/views/a.html", ChangeKind::Modified),
            ]),
            &site(),
        );
        assert_eq!(
            changes,
            vec![Change::Data(PathBuf::from("/site/jampass.data.json"))]
        );
    }

    #[test]
    fn removed_view_rescans() {
        let changes = classify(
            &batch(&[("/site/views/a.html", ChangeKind::Removed)]),
            &site(),
        );
        assert_eq!(
            changes,
            vec![Change::Rescan(PathBuf::from("/site/views/a.html"))]
        );
    }

    #[test]
    fn new_view_directory_rescans() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = SitePaths::resolve(&SiteConfig::default(), tmp.path());
        let dir = paths.views.join("blog");
        std::fs::create_dir_all(&dir).unwrap();

        let changes = classify(&BTreeMap::from([(dir.clone(), ChangeKind::Created)]), &paths);
        assert_eq!(changes, vec![Change::Rescan(dir)]);
    }

    #[test]
    fn output_tree_is_ignored() {
        let changes = classify(
            &batch(&[
                ("/site/public/index.html", ChangeKind::Modified),
                ("/site/public/style/app.css", ChangeKind::Created),
                ("/site/style/old.css", ChangeKind::Removed),
            ]),
            &site(),
        );
        assert!(changes.is_empty());
    }
}
