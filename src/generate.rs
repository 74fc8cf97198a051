//! The build driver: from views and data to a written page tree.
//!
//! ## Passes
//!
//! A build pass runs these steps in order:
//!
//! 1. **Classify**: every view under the views directory is checksummed
//!    against the [`ContentCache`]. Partials are registered with the template
//!    engine; other views are kept when they changed (or always, in bypass
//!    mode). When a partial changed, every view is kept.
//! 2. **Plan**: each kept view's file name is parsed as a
//!    [`RoutePattern`](crate::route::RoutePattern) and expanded into pages
//!    (see below). A name that fails to parse or resolve is skipped and
//!    reported, the rest of the build continues.
//! 3. **Render**: pages are rendered in batches of `build.chunk_size` on the
//!    rayon pool. Each page is rendered, validated (first page of a view,
//!    once per content), has its inline styles and linked assets processed,
//!    is minified in production, and is written.
//! 4. **Index**: `indexes.json` is written when the data asks for it, once
//!    per session or after the data file changes.
//!
//! ## Page expansion
//!
//! | View | Pages |
//! |---|---|
//! | `-[slug].html` (loop) | one per data item, under the item's page url |
//! | `index.html` while paginating | one per page, with that page's items as `data` |
//! | `[slug].html`, `[#2_slug].html` | one, with the explicit page's data |
//! | `about.html` | one, with all the data |
//!
//! Page urls prefix the output: page 1 is the output root, page `n` is
//! `<output>/n/`. A view's directory below the views root is kept, so
//! `views/blog/-[slug].html` writes `public/blog/<slug>.html`.
//!
//! ## Template locals
//!
//! ```text
//! data       the page's data (item, chunk, or everything)
//! pages      [{no, url}, ...]
//! page       {current, count, url}
//! site       {name, author}
//! url_path   {full: "/blog/a.html", short: "/blog/a.html", here: "/blog/"}
//! index      item index, loop views only
//! ```
//!
//! ## Failure
//!
//! A failed one-shot [`build`](Builder::build) deletes the output tree. In
//! watch mode errors are returned to the watcher and the previous output is
//! left alone.

use rayon::prelude::*;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::assets::{self, AssetError, AssetPipeline};
use crate::cache::{CacheStats, ContentCache, OutputMeta, RecordPatch, ViewClass, checksum};
use crate::config::{BuildMode, ConfigError, SiteConfig, SitePaths};
use crate::data::{self, DataError, Funneled};
use crate::engine::{
    AssetTransformer, BasicValidator, Diagnostic, EngineError, HandlebarsEngine, HtmlValidator,
    PassthroughTransformer, Severity, TemplateEngine,
};
use crate::pagination::page_url;
use crate::paths;
use crate::route::{DEFAULT_PAGE_NUMBER, RouteError, RoutePattern};
use crate::search::{self, SearchError};
use crate::snippet::code_snippet;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{}: {error}\n{snippet}", .view.display())]
    Render {
        view: PathBuf,
        error: EngineError,
        snippet: String,
    },
    #[error("{}: {error}", .view.display())]
    Partial { view: PathBuf, error: EngineError },
    #[error("{}: {count} validation problem(s) in {}", .view.display(), .output.display())]
    Validation {
        view: PathBuf,
        output: PathBuf,
        count: usize,
    },
    #[error("{}: {source}", .view.display())]
    Asset { view: PathBuf, source: AssetError },
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Progress events, sent to the CLI printer while a build runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    Started {
        views: usize,
        bypass: bool,
    },
    PageWritten {
        view: String,
        output: String,
    },
    RouteSkipped {
        view: String,
        reason: String,
    },
    AssetMissing {
        page: String,
        link: String,
    },
    Diagnostics {
        view: String,
        output: String,
        /// Each diagnostic with its snippet of the rendered page.
        items: Vec<(Diagnostic, String)>,
    },
    AssetRebuilt {
        source: String,
        output: String,
    },
    IndexWritten {
        path: String,
        entries: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Development build: no asset hashes, no minification.
    pub dev: bool,
    /// Running under the watcher: keep output on failure.
    pub watch: bool,
}

/// Outcome of one build pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuildReport {
    pub stats: CacheStats,
    pub pages: usize,
    pub assets: usize,
    pub skipped_routes: usize,
    pub index_entries: Option<usize>,
    pub elapsed: Duration,
}

/// One page a view expands to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPage {
    pub view: PathBuf,
    pub output: PathBuf,
    pub page_no: u32,
    pub page_url: String,
    pub locals: Value,
}

/// A view's route as printed by `jampass routes`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteListing {
    pub view: String,
    pub route: Option<RoutePattern>,
    pub outputs: Result<Vec<String>, String>,
}

struct RenderJob {
    page: PlannedPage,
    source: Arc<str>,
    /// First page of its view: the one that gets validated.
    first: bool,
}

/// Owns the cache, data and collaborators of one build session.
pub struct Builder {
    root: PathBuf,
    config: SiteConfig,
    paths: SitePaths,
    options: BuildOptions,
    cache: ContentCache,
    funneled: Funneled,
    engine: Box<dyn TemplateEngine>,
    transformer: Box<dyn AssetTransformer>,
    validator: Box<dyn HtmlValidator>,
    /// Partial name → checksum of the source handed to the engine.
    engine_partials: HashMap<String, String>,
    index_built: bool,
    events: Option<Sender<BuildEvent>>,
}

impl Builder {
    /// A builder with the built-in handlebars engine, passthrough transformer
    /// and basic validator.
    pub fn new(config: SiteConfig, root: &Path, options: BuildOptions) -> Result<Self, BuildError> {
        Self::with_collaborators(
            config,
            root,
            options,
            Box::new(HandlebarsEngine::new()),
            Box::new(PassthroughTransformer),
            Box::new(BasicValidator),
        )
    }

    pub fn with_collaborators(
        config: SiteConfig,
        root: &Path,
        options: BuildOptions,
        engine: Box<dyn TemplateEngine>,
        transformer: Box<dyn AssetTransformer>,
        validator: Box<dyn HtmlValidator>,
    ) -> Result<Self, BuildError> {
        let paths = SitePaths::resolve(&config, root);
        let funneled = data::load(&paths.data)?;
        Ok(Self {
            root: root.to_path_buf(),
            cache: ContentCache::new(config.paths.partials.clone()),
            config,
            paths,
            options,
            funneled,
            engine,
            transformer,
            validator,
            engine_partials: HashMap::new(),
            index_built: false,
            events: None,
        })
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: Sender<BuildEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn funneled(&self) -> &Funneled {
        &self.funneled
    }

    /// One-shot build of every view. Deletes the output tree on failure
    /// unless running under the watcher.
    pub fn build(&mut self) -> Result<BuildReport, BuildError> {
        let result = self.build_all(true);
        if result.is_err() && !self.options.watch {
            self.teardown();
        }
        result
    }

    /// Classify every view and render what needs rendering.
    ///
    /// `bypass` renders unchanged views too; the cache is kept either way.
    pub fn build_all(&mut self, bypass: bool) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let views = paths::list_files(&self.paths.views).map_err(|source| BuildError::Io {
            path: self.paths.views.clone(),
            source,
        })?;
        self.emit(BuildEvent::Started {
            views: views.len(),
            bypass,
        });

        let mut stats = CacheStats::default();
        let mut sources = BTreeMap::new();
        let mut kept = BTreeSet::new();
        for view in views {
            let content = match std::fs::read(&view) {
                Ok(c) => c,
                // Deleted since the listing; the next scan will not see it.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(BuildError::Io { path: view, source }),
            };
            let class = self.classify(&view, &content, bypass);
            stats.count(class);
            if !class.is_partial {
                if class.include {
                    kept.insert(view.clone());
                }
                sources.insert(view, content);
            }
        }

        if self.sync_partials()? {
            log::debug!("partials changed, rendering every view");
            kept = sources.keys().cloned().collect();
            stats.rendered += stats.unchanged;
            stats.unchanged = 0;
        }

        let mut report = self.render_views(&kept, &sources)?;
        report.stats = stats;
        report.index_entries = self.write_index()?;
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Incremental build after `changed` views were modified or created.
    ///
    /// A view that disappeared before it could be read turns into a full
    /// rescan that keeps the cache.
    pub fn build_views(&mut self, changed: &[PathBuf]) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let mut stats = CacheStats::default();
        let mut sources = BTreeMap::new();
        let mut kept = BTreeSet::new();
        let mut partial_changed = false;

        for view in changed {
            let content = match std::fs::read(view) {
                Ok(c) => c,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("{} vanished, rescanning", view.display());
                    return self.rescan();
                }
                Err(source) => {
                    return Err(BuildError::Io {
                        path: view.clone(),
                        source,
                    });
                }
            };
            let class = self.classify(view, &content, false);
            stats.count(class);
            if class.is_partial {
                partial_changed |= class.changed;
            } else if class.include {
                kept.insert(view.clone());
                sources.insert(view.clone(), content);
            }
        }

        if self.sync_partials()? || partial_changed {
            return self.build_all(true);
        }

        let mut report = self.render_views(&kept, &sources)?;
        report.stats = stats;
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Full pass in bypass mode, keeping the cache.
    pub fn rescan(&mut self) -> Result<BuildReport, BuildError> {
        self.cache.clear_missing();
        self.build_all(true)
    }

    /// Reload the data file and rebuild everything.
    pub fn reload_data(&mut self) -> Result<BuildReport, BuildError> {
        let partials = std::mem::take(&mut self.funneled.partials);
        self.funneled = data::load(&self.paths.data)?;
        self.funneled.partials = partials;
        self.index_built = false;
        self.build_all(true)
    }

    /// Re-run a changed stylesheet or script through the transform chain.
    ///
    /// Assets no page links are ignored. When the processed file moved (its
    /// hash changed), every view with a page linking it is rendered again.
    pub fn rebuild_asset(&mut self, source: &Path) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let Some(previous) = self.cache.asset(source) else {
            log::debug!("{} is not linked by any page", source.display());
            return Ok(BuildReport::default());
        };

        let pipeline = self.pipeline();
        let record = pipeline.reprocess(source).map_err(|e| BuildError::Asset {
            view: source.to_path_buf(),
            source: e,
        })?;
        self.emit(BuildEvent::AssetRebuilt {
            source: self.display(source),
            output: self.display(&record.output_path),
        });

        if record.output_path == previous.output_path {
            return Ok(BuildReport {
                assets: 1,
                elapsed: started.elapsed(),
                ..Default::default()
            });
        }

        let views = self.cache.views_rendering(&previous.referencing_outputs);
        let mut sources = BTreeMap::new();
        for view in &views {
            match std::fs::read(view) {
                Ok(content) => {
                    sources.insert(view.clone(), content);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(BuildError::Io {
                        path: view.clone(),
                        source,
                    });
                }
            }
        }
        let kept: BTreeSet<PathBuf> = sources.keys().cloned().collect();
        let mut report = self.render_views(&kept, &sources)?;
        report.assets = report.assets.max(1);
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Every view's route and outputs, without rendering.
    pub fn routes(&self) -> Result<Vec<RouteListing>, BuildError> {
        let views = paths::list_files(&self.paths.views).map_err(|source| BuildError::Io {
            path: self.paths.views.clone(),
            source,
        })?;
        Ok(views
            .iter()
            .filter(|v| !self.cache.is_partial_path(v))
            .map(|view| {
                let route = RoutePattern::parse(paths::file_name(view)).ok();
                let outputs = self
                    .plan_view(view)
                    .map(|pages| {
                        pages
                            .iter()
                            .map(|p| self.display(&p.output))
                            .collect::<Vec<_>>()
                    })
                    .map_err(|e| e.to_string());
                RouteListing {
                    view: self.display(view),
                    route,
                    outputs,
                }
            })
            .collect())
    }

    // =========================================================================
    // Classification and partials
    // =========================================================================

    fn classify(&mut self, view: &Path, content: &[u8], bypass: bool) -> ViewClass {
        self.cache
            .classify_view(view, content, &mut self.funneled.partials, bypass)
    }

    /// Hand new or changed partials to the engine. `true` if any changed.
    fn sync_partials(&mut self) -> Result<bool, BuildError> {
        let mut changed = false;
        for (name, path) in &self.funneled.partials {
            let source = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(BuildError::Io {
                        path: path.clone(),
                        source,
                    });
                }
            };
            let sum = checksum(source.as_bytes());
            if self.engine_partials.get(name) == Some(&sum) {
                continue;
            }
            self.engine
                .register_partial(name, &source)
                .map_err(|error| BuildError::Partial {
                    view: path.clone(),
                    error,
                })?;
            log::debug!("registered partial {name} from {}", path.display());
            changed |= self.engine_partials.insert(name.clone(), sum).is_some();
        }
        Ok(changed)
    }

    // =========================================================================
    // Planning
    // =========================================================================

    /// Expand a view into the pages it renders.
    pub fn plan_view(&self, view: &Path) -> Result<Vec<PlannedPage>, RouteError> {
        let route = RoutePattern::parse(paths::file_name(view))?;
        let rel = paths::strip_cwd(&self.paths.views, view);
        let dir = rel.parent().unwrap_or(Path::new(""));
        let pagination = &self.funneled.pagination;
        let items = self.funneled.items();

        if route.has_loop {
            let mut cursor = pagination.cursor();
            return items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let url = cursor.advance(i).to_string();
                    let placed = route.output_for(item, items)?;
                    Ok(self.planned(
                        view,
                        dir,
                        &placed,
                        cursor.current_page(),
                        url,
                        item.clone(),
                        Some(i),
                    ))
                })
                .collect();
        }

        if route.is_static() {
            if pagination.paginate && paths::stem(view) == "index" {
                return Ok(pagination
                    .meta_pages
                    .iter()
                    .zip(&pagination.pages)
                    .map(|(page, chunk)| {
                        self.planned(
                            view,
                            dir,
                            &route.raw_name,
                            page.no,
                            page.url.clone(),
                            Value::Array(chunk.clone()),
                            None,
                        )
                    })
                    .collect());
            }
            return Ok(vec![self.planned(
                view,
                dir,
                &route.raw_name,
                DEFAULT_PAGE_NUMBER,
                page_url(DEFAULT_PAGE_NUMBER),
                self.funneled.raw.clone(),
                None,
            )]);
        }

        let (data, dataset): (Value, &[Value]) = if pagination.paginate {
            let chunk = pagination
                .chunk(route.page)
                .ok_or_else(|| RouteError::PageOutOfRange {
                    name: route.raw_name.clone(),
                    page: route.page,
                    count: pagination.page_count(),
                })?;
            (Value::Array(chunk.to_vec()), chunk)
        } else if route.page == DEFAULT_PAGE_NUMBER {
            (self.funneled.raw.clone(), items)
        } else {
            return Err(RouteError::PageOutOfRange {
                name: route.raw_name.clone(),
                page: route.page,
                count: 1,
            });
        };
        let placed = route.output_for(&data, dataset)?;
        Ok(vec![self.planned(
            view,
            dir,
            &placed,
            route.page,
            page_url(route.page),
            data,
            None,
        )])
    }

    #[allow(clippy::too_many_arguments)]
    fn planned(
        &self,
        view: &Path,
        dir: &Path,
        placed: &str,
        page_no: u32,
        page_url: String,
        data: Value,
        index: Option<usize>,
    ) -> PlannedPage {
        let mut base = paths::join_url(&self.paths.output, &page_url);
        if !dir.as_os_str().is_empty() {
            base.push(dir);
        }
        let output = paths::join_url(&base, placed);
        let locals = self.locals(&output, data, page_no, &page_url, index);
        PlannedPage {
            view: view.to_path_buf(),
            output,
            page_no,
            page_url,
            locals,
        }
    }

    fn locals(
        &self,
        output: &Path,
        data: Value,
        page_no: u32,
        page_url: &str,
        index: Option<usize>,
    ) -> Value {
        let rel = paths::to_slash(paths::strip_cwd(&self.paths.output, output));
        let full = format!("/{rel}");
        let short = full
            .strip_suffix(crate::route::INDEX_PAGE)
            .unwrap_or(&full)
            .to_string();
        let here = match full.rfind('/') {
            Some(i) => full[..=i].to_string(),
            None => "/".to_string(),
        };

        let mut locals = json!({
            "data": data,
            "pages": self.funneled.pagination.meta_pages,
            "page": {
                "current": page_no,
                "count": self.funneled.pagination.page_count(),
                "url": page_url,
            },
            "site": {
                "name": self.config.site.name,
                "author": self.config.site.author,
            },
            "url_path": {
                "full": full,
                "short": short,
                "here": here,
            },
        });
        if let (Some(i), Value::Object(map)) = (index, &mut locals) {
            map.insert("index".into(), json!(i));
        }
        locals
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn pipeline(&self) -> AssetPipeline<'_> {
        AssetPipeline::new(
            &self.paths.src,
            &self.paths.output,
            self.options.dev,
            self.transformer.as_ref(),
            &self.cache,
        )
    }

    fn render_views(
        &self,
        views: &BTreeSet<PathBuf>,
        sources: &BTreeMap<PathBuf, Vec<u8>>,
    ) -> Result<BuildReport, BuildError> {
        let mut jobs = Vec::new();
        let mut skipped = 0;
        for view in views {
            let Some(bytes) = sources.get(view) else {
                continue;
            };
            let pages = match self.plan_view(view) {
                Ok(pages) => pages,
                Err(e) => {
                    log::debug!("skipping {}: {e}", view.display());
                    self.emit(BuildEvent::RouteSkipped {
                        view: self.display(view),
                        reason: e.to_string(),
                    });
                    skipped += 1;
                    continue;
                }
            };
            let source: Arc<str> = Arc::from(String::from_utf8_lossy(bytes).as_ref());
            jobs.extend(pages.into_iter().enumerate().map(|(i, page)| RenderJob {
                page,
                source: Arc::clone(&source),
                first: i == 0,
            }));
        }

        let pipeline = self.pipeline();
        let chunk_size = self.config.build.chunk_size.max(1);
        let mut pages = 0;
        for chunk in jobs.chunks(chunk_size) {
            let written: Vec<()> = chunk
                .par_iter()
                .map(|job| self.render_job(job, &pipeline))
                .collect::<Result<_, _>>()?;
            pages += written.len();
        }

        Ok(BuildReport {
            pages,
            assets: pipeline.processed(),
            skipped_routes: skipped,
            ..Default::default()
        })
    }

    fn render_job(&self, job: &RenderJob, pipeline: &AssetPipeline<'_>) -> Result<(), BuildError> {
        let page = &job.page;
        let view = &page.view;

        let html = self
            .engine
            .render(view, &job.source, &page.locals)
            .map_err(|error| BuildError::Render {
                view: view.clone(),
                snippet: error
                    .line()
                    .map(|line| code_snippet(&job.source, line, error.column(), 0))
                    .unwrap_or_default(),
                error,
            })?;

        if job.first {
            self.validate(view, &page.output, &html)?;
        }

        let asset_error = |source: AssetError| BuildError::Asset {
            view: view.clone(),
            source,
        };
        let html = pipeline.inline_styles(&html, view).map_err(asset_error)?;
        let linked = pipeline
            .link_page(&html, &page.output)
            .map_err(asset_error)?;
        for link in linked.missing {
            self.emit(BuildEvent::AssetMissing {
                page: self.display(&page.output),
                link,
            });
        }

        let html = if !self.options.dev && self.config.build.minify {
            assets::minify(&linked.html)
        } else {
            linked.html
        };

        assets::write_file(&page.output, html.as_bytes()).map_err(asset_error)?;
        self.cache.record_output(
            view,
            &page.output,
            OutputMeta {
                page_url: page.page_url.clone(),
                bytes: html.len(),
            },
        );
        self.emit(BuildEvent::PageWritten {
            view: self.display(view),
            output: self.display(&page.output),
        });
        Ok(())
    }

    /// Validate a view's first page, once per content version.
    fn validate(&self, view: &Path, output: &Path, html: &str) -> Result<(), BuildError> {
        let mode = self.config.build.mode;
        if !mode.validates() || self.cache.get(view).is_some_and(|r| r.validated) {
            return Ok(());
        }

        let found = self.validator.validate(html);
        if found.is_empty() {
            self.cache.upsert(
                view,
                RecordPatch {
                    validated: Some(true),
                    ..Default::default()
                },
            );
            return Ok(());
        }

        let fatal = found
            .iter()
            .filter(|d| d.severity == Severity::Error || mode == BuildMode::Strict)
            .count();
        let items = found
            .into_iter()
            .map(|d| {
                let snippet = code_snippet(html, d.line, Some(d.column), 0);
                (d, snippet)
            })
            .collect();
        self.emit(BuildEvent::Diagnostics {
            view: self.display(view),
            output: self.display(output),
            items,
        });

        if fatal > 0 {
            return Err(BuildError::Validation {
                view: view.to_path_buf(),
                output: output.to_path_buf(),
                count: fatal,
            });
        }
        self.cache.upsert(
            view,
            RecordPatch {
                validated: Some(true),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn write_index(&mut self) -> Result<Option<usize>, BuildError> {
        if self.index_built {
            return Ok(None);
        }
        let Some(index) = search::build_index(&self.funneled, &self.config.build.search)? else {
            return Ok(None);
        };
        let path = search::write_index(&index, &self.paths.output)?;
        self.index_built = true;
        self.emit(BuildEvent::IndexWritten {
            path: self.display(&path),
            entries: index.len(),
        });
        Ok(Some(index.len()))
    }

    fn teardown(&self) {
        if !self.paths.output.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.paths.output) {
            Ok(()) => log::debug!("removed {}", self.paths.output.display()),
            Err(e) => log::warn!("could not remove {}: {e}", self.paths.output.display()),
        }
    }

    /// Send `event` to the attached sink. Without one, the problems a user
    /// has to act on are logged instead.
    fn emit(&self, event: BuildEvent) {
        let Some(tx) = &self.events else {
            match &event {
                BuildEvent::RouteSkipped { view, reason } => {
                    log::warn!("skipped {view}: {reason}")
                }
                BuildEvent::AssetMissing { page, link } => {
                    log::warn!("missing {link} in {page}: not found locally, skipped")
                }
                BuildEvent::Diagnostics { view, items, .. } => {
                    for (d, snippet) in items {
                        log::warn!(
                            "{view}:{}:{} {} ({})\n{snippet}",
                            d.line,
                            d.column,
                            d.message,
                            d.rule_id
                        );
                    }
                }
                _ => {}
            }
            return;
        };
        tx.send(event).ok();
    }

    fn display(&self, path: &Path) -> String {
        paths::to_slash(paths::strip_cwd(&self.root, path))
    }
}
