//! Content cache for incremental builds.
//!
//! Rendering a view is cheap compared to what follows it: validating the HTML,
//! running every linked stylesheet and script through the transform chain,
//! minifying. This module lets the build driver skip all of that for views
//! whose content has not changed since the last build of the session.
//!
//! # Design
//!
//! The cache is **checksum-keyed** and lives for one build session (a single
//! `build`, or the whole lifetime of `watch`). Nothing is persisted: the first
//! build of a session always runs in bypass mode and renders everything.
//!
//! It tracks three things:
//!
//! - **Views** ([`CacheRecord`], keyed by source path): last seen SHA-256,
//!   whether the view is a partial, whether its HTML already passed
//!   validation, and the outputs it rendered to.
//! - **Assets** ([`AssetRecord`], keyed by asset source path): where the
//!   processed file was written and which pages link to it.
//! - **Page links** (keyed by page output path): the assets a page links,
//!   by source path, so a page can be re-linked without re-scanning its HTML.
//!
//! The relative link from a page to an asset is never stored. It depends on
//! the page's depth and is recomputed per pair with
//! [`distance`](crate::distance::distance).
//!
//! ## Partials
//!
//! A view whose stem starts with `__` or that lives under a partials directory
//! is a partial. Partials are registered by name (stem without the `__`
//! marker) the first time they are seen; a later file with the same name is
//! ignored. They are never rendered on their own.
//!
//! ## Sharing
//!
//! [`ContentCache`] locks internally, so render jobs running on the rayon pool
//! share it through `&ContentCache`. Every accessor returns owned clones;
//! nobody holds a reference into the tables.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::paths;

/// Prefix marking a view as a partial.
pub const PARTIAL_MARKER: &str = "__";

/// Length of the content hash used in processed asset file names.
pub const ASSET_HASH_LEN: usize = 10;

/// Partials registered so far: partial name → source path.
pub type PartialRegistry = BTreeMap<String, PathBuf>;

/// What the cache knows about one output file of a view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputMeta {
    /// Page url prefix the output was rendered under (`/`, `/2`, ...).
    pub page_url: String,
    pub bytes: usize,
}

/// Per-view state, created on first sighting and patched from then on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRecord {
    /// SHA-256 of the last content seen, 64 hex chars.
    pub checksum: Option<String>,
    pub is_partial: bool,
    pub validated: bool,
    pub outputs: BTreeMap<PathBuf, OutputMeta>,
}

/// Shallow patch for [`ContentCache::upsert`]: `Some` fields replace.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub checksum: Option<String>,
    pub is_partial: Option<bool>,
    pub validated: Option<bool>,
    pub outputs: Option<BTreeMap<PathBuf, OutputMeta>>,
}

impl CacheRecord {
    fn apply(&mut self, patch: RecordPatch) {
        if let Some(checksum) = patch.checksum {
            self.checksum = Some(checksum);
        }
        if let Some(is_partial) = patch.is_partial {
            self.is_partial = is_partial;
        }
        if let Some(validated) = patch.validated {
            self.validated = validated;
        }
        if let Some(outputs) = patch.outputs {
            self.outputs = outputs;
        }
    }
}

/// A processed asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub source_path: PathBuf,
    /// Where the processed file was written (hash-suffixed in production).
    pub output_path: PathBuf,
    pub processed_code: String,
    pub referencing_outputs: BTreeSet<PathBuf>,
}

impl AssetRecord {
    pub fn new(source_path: PathBuf, output_path: PathBuf, processed_code: String) -> Self {
        Self {
            source_path,
            output_path,
            processed_code,
            referencing_outputs: BTreeSet::new(),
        }
    }
}

/// Verdict of [`ContentCache::classify_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewClass {
    /// Render this view now.
    pub include: bool,
    pub is_partial: bool,
    /// Content differs from the last sighting (or there was none).
    pub changed: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    records: HashMap<PathBuf, CacheRecord>,
    assets: HashMap<PathBuf, AssetRecord>,
    page_links: HashMap<PathBuf, BTreeMap<PathBuf, PathBuf>>,
    missing_links: HashSet<PathBuf>,
}

/// Session-lifetime cache service. See the module docs.
#[derive(Debug)]
pub struct ContentCache {
    partials_dir: String,
    state: Mutex<CacheState>,
}

impl ContentCache {
    /// `partials_dir` is the directory name that marks partials.
    pub fn new(partials_dir: impl Into<String>) -> Self {
        Self {
            partials_dir: partials_dir.into(),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Insert `initial` for `path` unless a record already exists.
    pub fn add(&self, path: &Path, initial: CacheRecord) {
        self.state
            .lock()
            .records
            .entry(path.to_path_buf())
            .or_insert(initial);
    }

    /// Merge `patch` into the record for `path`, creating it if needed.
    pub fn upsert(&self, path: &Path, patch: RecordPatch) {
        self.state
            .lock()
            .records
            .entry(path.to_path_buf())
            .or_default()
            .apply(patch);
    }

    pub fn get(&self, path: &Path) -> Option<CacheRecord> {
        self.state.lock().records.get(path).cloned()
    }

    /// Add one rendered output to a view's record.
    pub fn record_output(&self, view: &Path, output: &Path, meta: OutputMeta) {
        self.state
            .lock()
            .records
            .entry(view.to_path_buf())
            .or_default()
            .outputs
            .insert(output.to_path_buf(), meta);
    }

    /// Whether `path` names a partial, by marker or by directory.
    pub fn is_partial_path(&self, path: &Path) -> bool {
        paths::stem(path).starts_with(PARTIAL_MARKER)
            || paths::has_dir_component(path, &self.partials_dir)
    }

    /// Decide whether a view must be rendered, updating its checksum.
    ///
    /// Partials are registered into `partials` (first name wins) and never
    /// included. Other views are included when their content changed, or
    /// always when `bypass` is set.
    pub fn classify_view(
        &self,
        path: &Path,
        content: &[u8],
        partials: &mut PartialRegistry,
        bypass: bool,
    ) -> ViewClass {
        let sum = checksum(content);
        let is_partial = self.is_partial_path(path);

        let mut state = self.state.lock();
        let record = state.records.entry(path.to_path_buf()).or_default();
        let changed = record.checksum.as_deref() != Some(sum.as_str());
        if changed {
            record.validated = false;
        }
        record.checksum = Some(sum);
        record.is_partial = is_partial;
        drop(state);

        if is_partial {
            partials
                .entry(partial_name(path))
                .or_insert_with(|| path.to_path_buf());
            return ViewClass {
                include: false,
                is_partial,
                changed,
            };
        }

        ViewClass {
            include: changed || bypass,
            is_partial,
            changed,
        }
    }

    // =========================================================================
    // Assets
    // =========================================================================

    pub fn asset(&self, source: &Path) -> Option<AssetRecord> {
        self.state.lock().assets.get(source).cloned()
    }

    /// Store a (re)processed asset. Pages already linking it stay linked.
    pub fn put_asset(&self, mut record: AssetRecord) {
        let mut state = self.state.lock();
        if let Some(old) = state.assets.get(&record.source_path) {
            record
                .referencing_outputs
                .extend(old.referencing_outputs.iter().cloned());
        }
        let source = record.source_path.clone();
        let output = record.output_path.clone();
        for page in &record.referencing_outputs {
            if let Some(links) = state.page_links.get_mut(page) {
                links.insert(source.clone(), output.clone());
            }
        }
        state.assets.insert(source, record);
    }

    /// Record that the page written at `page_output` links `asset`.
    ///
    /// Returns `false` when the link was already known.
    pub fn link_page_to_asset(&self, page_output: &Path, asset: &AssetRecord) -> bool {
        let mut state = self.state.lock();
        let added = state
            .assets
            .entry(asset.source_path.clone())
            .or_insert_with(|| asset.clone())
            .referencing_outputs
            .insert(page_output.to_path_buf());
        state
            .page_links
            .entry(page_output.to_path_buf())
            .or_default()
            .insert(asset.source_path.clone(), asset.output_path.clone());
        added
    }

    /// Assets linked by a page: asset source path → asset output path.
    pub fn assets_for_page(&self, page_output: &Path) -> BTreeMap<PathBuf, PathBuf> {
        self.state
            .lock()
            .page_links
            .get(page_output)
            .cloned()
            .unwrap_or_default()
    }

    /// Source paths of the views that rendered any of `outputs`.
    pub fn views_rendering(&self, outputs: &BTreeSet<PathBuf>) -> BTreeSet<PathBuf> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|(_, r)| r.outputs.keys().any(|o| outputs.contains(o)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Note a link that points at a missing file. `true` the first time only.
    pub fn mark_missing(&self, link: &Path) -> bool {
        self.state.lock().missing_links.insert(link.to_path_buf())
    }

    /// Forget missing links, so a file created since gets picked up.
    pub fn clear_missing(&self) {
        self.state.lock().missing_links.clear();
    }
}

/// Partial name: the stem without its partial marker.
pub fn partial_name(path: &Path) -> String {
    let stem = paths::stem(path);
    stem.strip_prefix(PARTIAL_MARKER).unwrap_or(stem).to_string()
}

/// SHA-256 of `content` as 64 hex chars.
pub fn checksum(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// First `len` hex chars of the SHA-256 of `content`.
pub fn short_hash(content: &[u8], len: usize) -> String {
    let mut hash = checksum(content);
    hash.truncate(len);
    hash
}

/// Summary of what one build pass did with the views it saw.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub rendered: u32,
    pub unchanged: u32,
    pub partials: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.rendered + self.unchanged + self.partials
    }

    pub fn count(&mut self, class: ViewClass) {
        if class.is_partial {
            self.partials += 1;
        } else if class.include {
            self.rendered += 1;
        } else {
            self.unchanged += 1;
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unchanged > 0 {
            write!(
                f,
                "{} rendered, {} unchanged ({} total)",
                self.rendered,
                self.unchanged,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.rendered)
        }
    }
}
