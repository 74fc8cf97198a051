//! Stylesheets and scripts linked from rendered pages.
//!
//! After a page is rendered its HTML is scanned for local asset references
//! (`<link rel=.. href=..>`, `<script src=..>`). Each referenced file is run
//! through the [`AssetTransformer`] once per build, written into the output
//! tree, and every reference is rewritten to the processed file's path
//! relative to the page that links it.
//!
//! ```text
//! views/blog/-[slug].html links /style/app.css
//!
//! public/style/app.3f9a1c2b7d.css       written once
//! public/index.html                     href="style/app.3f9a1c2b7d.css"
//! public/blog/hello.html                href="../style/app.3f9a1c2b7d.css"
//! ```
//!
//! Two pages rendering in parallel that link the same stylesheet share one
//! transform: the first claims an in-flight slot keyed by the asset's source
//! path, the second waits on that slot and reuses its result.

use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, OnceLock};
use thiserror::Error;

use crate::cache::{AssetRecord, ContentCache};
use crate::distance::{self, DistanceError};
use crate::engine::{AssetTransformer, EngineError, line_col};
use crate::paths;
use crate::snippet::code_snippet;

#[derive(Error, Debug, Clone)]
pub enum AssetError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: Arc<io::Error> },
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: Arc<io::Error> },
    #[error("{}: {error}\n{snippet}", .path.display())]
    Transform {
        path: PathBuf,
        error: EngineError,
        snippet: String,
    },
    #[error(transparent)]
    Distance(#[from] DistanceError),
}

/// One asset reference found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    /// Byte range of the attribute value inside the HTML.
    pub span: Range<usize>,
    pub link: String,
}

static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(link|script)\b[^>]*>").unwrap());
static RE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\s([a-z][a-z0-9-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static RE_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(<style\b[^>]*>)(.*?)</style>").unwrap());

/// Find the local asset references of a page, in document order.
///
/// A `<link>` counts only when it carries a `rel` attribute; its `href` is
/// the reference. A `<script>` counts when it has a `src`. External urls and
/// empty values are skipped.
pub fn find_linked_assets(html: &str) -> Vec<LinkRef> {
    let mut found = Vec::new();
    for tag in RE_TAG.captures_iter(html) {
        let (Some(whole), Some(name)) = (tag.get(0), tag.get(1)) else {
            continue;
        };
        let is_link = name.as_str().eq_ignore_ascii_case("link");
        let wanted = if is_link { "href" } else { "src" };

        let mut has_rel = false;
        let mut value = None;
        for attr in RE_ATTR.captures_iter(whole.as_str()) {
            let Some(attr_name) = attr.get(1) else { continue };
            let Some(v) = attr.get(2).or_else(|| attr.get(3)) else {
                continue;
            };
            if attr_name.as_str().eq_ignore_ascii_case("rel") {
                has_rel = true;
            } else if attr_name.as_str().eq_ignore_ascii_case(wanted) && value.is_none() {
                value = Some(v);
            }
        }

        if is_link && !has_rel {
            continue;
        }
        let Some(v) = value else { continue };
        let link = v.as_str().trim();
        if link.is_empty() || paths::is_external_link(link) || link.starts_with('#') {
            continue;
        }
        let start = whole.start() + v.start();
        found.push(LinkRef {
            span: start..start + v.len(),
            link: link.to_string(),
        });
    }
    found
}

/// Source file a link refers to, resolved against the source root.
///
/// Query strings and fragments are dropped; absolute links are taken relative
/// to `src_root`. `None` when the link points above `src_root`.
pub fn resolve_link(link: &str, src_root: &Path) -> Option<PathBuf> {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    paths::join_url_within(src_root, path)
}

/// A page after asset linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedPage {
    pub html: String,
    /// Links that point at files missing from the source tree, reported for
    /// the first time by this page.
    pub missing: Vec<String>,
}

type InFlight = Arc<OnceLock<Result<AssetRecord, AssetError>>>;

/// Processes the assets of one build.
pub struct AssetPipeline<'a> {
    src_root: &'a Path,
    output_root: &'a Path,
    dev: bool,
    transformer: &'a dyn AssetTransformer,
    cache: &'a ContentCache,
    in_flight: Mutex<HashMap<PathBuf, InFlight>>,
}

impl<'a> AssetPipeline<'a> {
    pub fn new(
        src_root: &'a Path,
        output_root: &'a Path,
        dev: bool,
        transformer: &'a dyn AssetTransformer,
        cache: &'a ContentCache,
    ) -> Self {
        Self {
            src_root,
            output_root,
            dev,
            transformer,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Transform and write the asset at `source`, at most once per pipeline.
    pub fn process(&self, source: &Path) -> Result<AssetRecord, AssetError> {
        let slot = self
            .in_flight
            .lock()
            .entry(source.to_path_buf())
            .or_default()
            .clone();
        slot.get_or_init(|| self.build(source)).clone()
    }

    /// Number of distinct assets this pipeline has handled.
    pub fn processed(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Transform and write `source` unconditionally, replacing any result
    /// this pipeline already holds for it.
    pub fn reprocess(&self, source: &Path) -> Result<AssetRecord, AssetError> {
        self.in_flight.lock().remove(source);
        self.process(source)
    }

    fn build(&self, source: &Path) -> Result<AssetRecord, AssetError> {
        let text = std::fs::read_to_string(source).map_err(|e| AssetError::Read {
            path: source.to_path_buf(),
            source: Arc::new(e),
        })?;

        let out = self
            .transformer
            .transform(source, &text, self.dev)
            .map_err(|error| transform_error(source, &text, error, 0))?;

        let relative = paths::strip_cwd(self.src_root, source);
        let mut output_path = self.output_root.join(relative);
        if let Some(hash) = &out.hash {
            output_path = paths::with_hash_suffix(&output_path, hash);
        }

        write_file(&output_path, out.code.as_bytes())?;
        log::debug!(
            "asset {} -> {}",
            relative.display(),
            paths::strip_cwd(self.output_root, &output_path).display()
        );

        let record = AssetRecord::new(source.to_path_buf(), output_path, out.code);
        self.cache.put_asset(record.clone());
        Ok(record)
    }

    /// Rewrite the asset references of a page written at `page_output`.
    pub fn link_page(&self, html: &str, page_output: &Path) -> Result<LinkedPage, AssetError> {
        let mut rewritten = String::with_capacity(html.len());
        let mut missing = Vec::new();
        let mut last = 0;

        for found in find_linked_assets(html) {
            // Links outside the source root are left alone, like missing files.
            let source = match resolve_link(&found.link, self.src_root) {
                Some(source) if source.is_file() => source,
                source => {
                    let key = source.unwrap_or_else(|| PathBuf::from(&found.link));
                    if self.cache.mark_missing(&key) {
                        missing.push(found.link.clone());
                    }
                    continue;
                }
            };

            let record = self.process(&source)?;
            self.cache.link_page_to_asset(page_output, &record);
            let link = distance::distance(page_output, &record.output_path)?.distance;

            rewritten.push_str(&html[last..found.span.start]);
            rewritten.push_str(&link);
            last = found.span.end;
        }
        rewritten.push_str(&html[last..]);

        Ok(LinkedPage {
            html: rewritten,
            missing,
        })
    }

    /// Run every inline `<style>` block of `html` through the transformer.
    ///
    /// The transformer sees each block as a stylesheet named after `view`;
    /// error snippets are numbered by the block's position in `html`.
    pub fn inline_styles(&self, html: &str, view: &Path) -> Result<String, AssetError> {
        let style_path = view.with_extension("css");
        let mut out = String::with_capacity(html.len());
        let mut last = 0;

        for cap in RE_STYLE.captures_iter(html) {
            let Some(body) = cap.get(2) else { continue };
            let (line, _) = line_col(html, body.start());
            let transformed = self
                .transformer
                .transform(&style_path, body.as_str(), self.dev)
                .map_err(|error| transform_error(view, body.as_str(), error, line - 1))?;

            out.push_str(&html[last..body.start()]);
            out.push_str(&transformed.code);
            last = body.end();
        }
        out.push_str(&html[last..]);
        Ok(out)
    }
}

fn transform_error(path: &Path, code: &str, error: EngineError, start_index: usize) -> AssetError {
    let snippet = error
        .line()
        .map(|line| code_snippet(code, line, error.column(), start_index))
        .unwrap_or_default();
    AssetError::Transform {
        path: path.to_path_buf(),
        error,
        snippet,
    }
}

/// Write `bytes` to `path`, creating parent directories.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), AssetError> {
    let result = match path.parent() {
        Some(dir) => std::fs::create_dir_all(dir).and_then(|_| std::fs::write(path, bytes)),
        None => std::fs::write(path, bytes),
    };
    result.map_err(|e| AssetError::Write {
        path: path.to_path_buf(),
        source: Arc::new(e),
    })
}

/// Minify a rendered page.
pub fn minify(html: &str) -> String {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    let bytes = minify_html::minify(html.as_bytes(), &cfg);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PassthroughTransformer, Transformed};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts transforms; hashes like a production transformer.
    #[derive(Default)]
    struct CountingTransformer {
        calls: AtomicUsize,
    }

    impl AssetTransformer for CountingTransformer {
        fn transform(
            &self,
            _source_path: &Path,
            text: &str,
            _dev: bool,
        ) -> Result<Transformed, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Transformed {
                code: text.to_uppercase(),
                hash: Some("abc".into()),
            })
        }
    }

    fn site() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("style")).unwrap();
        fs::create_dir_all(tmp.path().join("script")).unwrap();
        fs::write(tmp.path().join("style/app.css"), "body {}").unwrap();
        fs::write(tmp.path().join("script/app.js"), "run()").unwrap();
        tmp
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    #[test]
    fn finds_links_and_scripts() {
        let html = r#"<link rel="stylesheet" href="/style/app.css">
<link href="/no-rel.css">
<script src='script/app.js'></script>
<script>inline()</script>
<link rel="icon" href="https://cdn.example.com/i.png">"#;
        let found = find_linked_assets(html);
        let links: Vec<&str> = found.iter().map(|f| f.link.as_str()).collect();
        assert_eq!(links, vec!["/style/app.css", "script/app.js"]);
        assert_eq!(&html[found[0].span.clone()], "/style/app.css");
        assert_eq!(&html[found[1].span.clone()], "script/app.js");
    }

    #[test]
    fn resolve_link_drops_query() {
        assert_eq!(
            resolve_link("/style/app.css?v=2#x", Path::new("site")),
            Some(PathBuf::from("site/style/app.css"))
        );
        assert_eq!(
            resolve_link("script/app.js", Path::new("site")),
            Some(PathBuf::from("site/script/app.js"))
        );
        assert_eq!(
            resolve_link("/style/../script/app.js", Path::new("site")),
            Some(PathBuf::from("site/script/app.js"))
        );
        assert_eq!(resolve_link("../outside.css", Path::new("site")), None);
        assert_eq!(resolve_link("/style/../../x.css", Path::new("site")), None);
    }

    // =========================================================================
    // Processing and linking
    // =========================================================================

    #[test]
    fn one_transform_for_many_pages() {
        let tmp = site();
        let src = tmp.path();
        let out = src.join("public");
        let cache = ContentCache::new("partials");
        let t = CountingTransformer::default();
        let pipeline = AssetPipeline::new(src, &out, false, &t, &cache);

        let html = r#"<link rel="stylesheet" href="/style/app.css">"#;
        let top = pipeline.link_page(html, &out.join("index.html")).unwrap();
        let deep = pipeline
            .link_page(html, &out.join("blog/2/post.html"))
            .unwrap();

        assert_eq!(t.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            top.html,
            r#"<link rel="stylesheet" href="style/app.abc.css">"#
        );
        assert_eq!(
            deep.html,
            r#"<link rel="stylesheet" href="../../style/app.abc.css">"#
        );
        assert_eq!(
            fs::read_to_string(out.join("style/app.abc.css")).unwrap(),
            "BODY {}"
        );

        let record = cache.asset(&src.join("style/app.css")).unwrap();
        assert_eq!(record.referencing_outputs.len(), 2);
    }

    #[test]
    fn parallel_pages_share_one_transform() {
        use rayon::prelude::*;

        let tmp = site();
        let src = tmp.path();
        let out = src.join("public");
        let cache = ContentCache::new("partials");
        let t = CountingTransformer::default();
        let pipeline = AssetPipeline::new(src, &out, false, &t, &cache);

        let html = r#"<script src="/script/app.js"></script>"#;
        (0..32).into_par_iter().for_each(|i| {
            pipeline
                .link_page(html, &out.join(format!("p{i}.html")))
                .unwrap();
        });
        assert_eq!(t.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_assets_reported_once_and_left_alone() {
        let tmp = site();
        let src = tmp.path();
        let out = src.join("public");
        let cache = ContentCache::new("partials");
        let pipeline = AssetPipeline::new(src, &out, true, &PassthroughTransformer, &cache);

        let html = r#"<script src="/gone.js"></script>"#;
        let first = pipeline.link_page(html, &out.join("a.html")).unwrap();
        let second = pipeline.link_page(html, &out.join("b.html")).unwrap();
        assert_eq!(first.missing, vec!["/gone.js".to_string()]);
        assert!(second.missing.is_empty());
        assert_eq!(first.html, html);
    }

    #[test]
    fn links_above_the_source_root_are_not_processed() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("site");
        fs::create_dir_all(&src).unwrap();
        fs::write(tmp.path().join("outside.css"), "body {}").unwrap();
        let out = src.join("public");
        let cache = ContentCache::new("partials");
        let t = CountingTransformer::default();
        let pipeline = AssetPipeline::new(&src, &out, false, &t, &cache);

        let html = r#"<link rel="stylesheet" href="../outside.css">"#;
        let page = pipeline.link_page(html, &out.join("index.html")).unwrap();
        assert_eq!(page.html, html);
        assert_eq!(page.missing, vec!["../outside.css".to_string()]);
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
        assert!(!out.exists());
        let mut entries: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["outside.css", "site"]);
    }

    #[test]
    fn dev_mode_keeps_file_names() {
        let tmp = site();
        let src = tmp.path();
        let out = src.join("public");
        let cache = ContentCache::new("partials");
        let pipeline = AssetPipeline::new(src, &out, true, &PassthroughTransformer, &cache);

        let record = pipeline.process(&src.join("style/app.css")).unwrap();
        assert_eq!(record.output_path, out.join("style/app.css"));
        assert!(out.join("style/app.css").exists());
    }

    #[test]
    fn reprocess_runs_the_transform_again() {
        let tmp = site();
        let src = tmp.path();
        let out = src.join("public");
        let cache = ContentCache::new("partials");
        let t = CountingTransformer::default();
        let pipeline = AssetPipeline::new(src, &out, false, &t, &cache);

        pipeline.process(&src.join("style/app.css")).unwrap();
        pipeline.reprocess(&src.join("style/app.css")).unwrap();
        assert_eq!(t.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn transform_error_carries_snippet() {
        let tmp = site();
        let src = tmp.path();
        fs::write(src.join("style/bad.css"), "a {}\n}\n").unwrap();
        let out = src.join("public");
        let cache = ContentCache::new("partials");
        let pipeline = AssetPipeline::new(src, &out, true, &PassthroughTransformer, &cache);

        let err = pipeline.process(&src.join("style/bad.css")).unwrap_err();
        match err {
            AssetError::Transform { snippet, .. } => assert!(snippet.contains("> 2 | }")),
            other => panic!("unexpected error: {other}"),
        }
    }

    // =========================================================================
    // Inline styles
    // =========================================================================

    #[test]
    fn inline_styles_are_transformed() {
        let tmp = site();
        let out = tmp.path().join("public");
        let cache = ContentCache::new("partials");
        let t = CountingTransformer::default();
        let pipeline = AssetPipeline::new(tmp.path(), &out, false, &t, &cache);

        let html = "<style>a{}</style><p>x</p><style media=\"print\">b{}</style>";
        let done = pipeline
            .inline_styles(html, Path::new("views/index.html"))
            .unwrap();
        assert_eq!(
            done,
            "<style>A{}</style><p>x</p><style media=\"print\">B{}</style>"
        );
    }

    #[test]
    fn inline_style_errors_point_into_page() {
        let tmp = site();
        let out = tmp.path().join("public");
        let cache = ContentCache::new("partials");
        let pipeline = AssetPipeline::new(tmp.path(), &out, true, &PassthroughTransformer, &cache);

        let html = "<html>\n<head>\n<style>\na {\n}}\n</style>";
        let err = pipeline
            .inline_styles(html, Path::new("views/index.html"))
            .unwrap_err();
        match err {
            AssetError::Transform { snippet, .. } => assert!(snippet.contains("> 5 | }}")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn minify_shrinks_whitespace() {
        let html = "<!DOCTYPE html>\n<html>\n  <body>\n    <p>  hi  </p>\n  </body>\n</html>";
        let small = minify(html);
        assert!(small.len() < html.len());
        assert!(small.contains("hi"));
    }
}
