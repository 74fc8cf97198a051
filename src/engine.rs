//! Collaborators the build hands work to: the template engine, the asset
//! transform chain and the HTML validator.
//!
//! Each one is a trait so the driver can be tested with recording mocks and
//! so a site can plug in a different engine. The built-in implementations are
//! deliberately small:
//!
//! - [`HandlebarsEngine`]: views and partials are handlebars templates.
//! - [`PassthroughTransformer`]: stylesheets and scripts are copied as-is
//!   (stylesheets are checked for balanced braces), hashed in production.
//! - [`BasicValidator`]: a handful of structural checks on rendered pages.

use handlebars::Handlebars;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use crate::cache::{ASSET_HASH_LEN, short_hash};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("render failed: {message}")]
    Render {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },
    #[error("partial \"{name}\" failed to compile: {message}")]
    Partial { name: String, message: String },
    #[error("transform failed: {message}")]
    Transform {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },
}

impl EngineError {
    /// 1-based line in the source the error points at, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Render { line, .. } | Self::Transform { line, .. } => *line,
            Self::Partial { .. } => None,
        }
    }

    pub fn column(&self) -> Option<usize> {
        match self {
            Self::Render { column, .. } | Self::Transform { column, .. } => *column,
            Self::Partial { .. } => None,
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Turns a view plus its locals into HTML.
pub trait TemplateEngine: Send + Sync {
    /// Make `source` available to views under `name`.
    fn register_partial(&mut self, name: &str, source: &str) -> Result<(), EngineError>;

    /// Render the view at `template` (whose text is `source`) with `locals`.
    fn render(&self, template: &Path, source: &str, locals: &Value) -> Result<String, EngineError>;
}

pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        Self {
            registry: Handlebars::new(),
        }
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn register_partial(&mut self, name: &str, source: &str) -> Result<(), EngineError> {
        self.registry
            .register_partial(name, source)
            .map_err(|e| EngineError::Partial {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    fn render(&self, _template: &Path, source: &str, locals: &Value) -> Result<String, EngineError> {
        self.registry
            .render_template(source, locals)
            .map_err(|e| EngineError::Render {
                message: e.desc.clone(),
                line: e.line_no,
                column: e.column_no,
            })
    }
}

// ============================================================================
// Asset transforms
// ============================================================================

/// Output of the transform chain for one stylesheet or script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub code: String,
    /// Content hash to put in the output file name, production only.
    pub hash: Option<String>,
}

pub trait AssetTransformer: Send + Sync {
    fn transform(&self, source_path: &Path, text: &str, dev: bool)
    -> Result<Transformed, EngineError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTransformer;

impl AssetTransformer for PassthroughTransformer {
    fn transform(
        &self,
        source_path: &Path,
        text: &str,
        dev: bool,
    ) -> Result<Transformed, EngineError> {
        let is_css = source_path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("css"));
        if is_css {
            check_braces(text)?;
        }
        Ok(Transformed {
            code: text.to_string(),
            hash: (!dev).then(|| short_hash(text.as_bytes(), ASSET_HASH_LEN)),
        })
    }
}

fn check_braces(css: &str) -> Result<(), EngineError> {
    let mut open: Vec<(usize, usize)> = Vec::new();
    for (i, line) in css.lines().enumerate() {
        for (j, c) in line.chars().enumerate() {
            match c {
                '{' => open.push((i + 1, j + 1)),
                '}' if open.pop().is_none() => {
                    return Err(EngineError::Transform {
                        message: "unexpected }".into(),
                        line: Some(i + 1),
                        column: Some(j + 1),
                    });
                }
                _ => {}
            }
        }
    }
    match open.pop() {
        Some((line, column)) => Err(EngineError::Transform {
            message: "unclosed block".into(),
            line: Some(line),
            column: Some(column),
        }),
        None => Ok(()),
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One finding of the HTML validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
}

pub trait HtmlValidator: Send + Sync {
    fn validate(&self, html: &str) -> Vec<Diagnostic>;
}

static RE_DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<!doctype\s+html\s*>").unwrap());
static RE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>\s*\S.*?</title>").unwrap());
static RE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sid\s*=\s*["']([^"']+)["']"#).unwrap());

/// Structural checks: doctype first, a non-empty title, unique ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicValidator;

impl HtmlValidator for BasicValidator {
    fn validate(&self, html: &str) -> Vec<Diagnostic> {
        let mut found = Vec::new();

        if !RE_DOCTYPE.is_match(html) {
            found.push(Diagnostic {
                line: 1,
                column: 1,
                rule_id: "doctype-first".into(),
                message: "document must start with <!DOCTYPE html>".into(),
                severity: Severity::Error,
            });
        }

        if !RE_TITLE.is_match(html) {
            found.push(Diagnostic {
                line: 1,
                column: 1,
                rule_id: "title-present".into(),
                message: "document has no title".into(),
                severity: Severity::Warning,
            });
        }

        let mut seen = HashSet::new();
        for cap in RE_ID.captures_iter(html) {
            let Some(id) = cap.get(1) else { continue };
            if !seen.insert(id.as_str()) {
                let (line, column) = line_col(html, id.start());
                found.push(Diagnostic {
                    line,
                    column,
                    rule_id: "no-dup-id".into(),
                    message: format!("duplicate id \"{}\"", id.as_str()),
                    severity: Severity::Error,
                });
            }
        }

        found
    }
}

/// 1-based line and column of a byte offset.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // HandlebarsEngine
    // =========================================================================

    #[test]
    fn renders_locals_and_partials() {
        let mut engine = HandlebarsEngine::new();
        engine
            .register_partial("header", "<h1>{{site.name}}</h1>")
            .unwrap();
        let html = engine
            .render(
                Path::new("views/index.html"),
                "{{> header}}<p>{{data.title}}</p>",
                &json!({"site": {"name": "Demo"}, "data": {"title": "Hi"}}),
            )
            .unwrap();
        assert_eq!(html, "<h1>Demo</h1><p>Hi</p>");
    }

    #[test]
    fn render_error_is_reported() {
        let engine = HandlebarsEngine::new();
        let err = engine
            .render(Path::new("v.html"), "<p>\n{{#each items}}\n</p>", &json!({}))
            .unwrap_err();
        assert!(matches!(err, EngineError::Render { .. }));
    }

    // =========================================================================
    // PassthroughTransformer
    // =========================================================================

    #[test]
    fn passthrough_hashes_in_production_only() {
        let t = PassthroughTransformer;
        let prod = t
            .transform(Path::new("app.css"), "body { color: red }", false)
            .unwrap();
        assert_eq!(prod.code, "body { color: red }");
        assert_eq!(prod.hash.as_deref().map(str::len), Some(ASSET_HASH_LEN));

        let dev = t
            .transform(Path::new("app.css"), "body { color: red }", true)
            .unwrap();
        assert_eq!(dev.hash, None);
    }

    #[test]
    fn unbalanced_css_points_at_line() {
        let t = PassthroughTransformer;
        let err = t
            .transform(Path::new("app.css"), "a {}\n}\n", true)
            .unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.column(), Some(1));

        let err = t
            .transform(Path::new("app.css"), "a {}\nb {\n", true)
            .unwrap_err();
        assert_eq!(err.line(), Some(2));

        // Scripts are not brace-checked.
        assert!(t.transform(Path::new("app.js"), "}", true).is_ok());
    }

    // =========================================================================
    // BasicValidator
    // =========================================================================

    #[test]
    fn valid_page_has_no_diagnostics() {
        let html = "<!DOCTYPE html>\n<html><head><title>T</title></head><body id=\"a\"></body></html>";
        assert!(BasicValidator.validate(html).is_empty());
    }

    #[test]
    fn reports_each_rule() {
        let html = "<html>\n<div id=\"x\"></div>\n<p id=\"x\"></p></html>";
        let found = BasicValidator.validate(html);
        let rules: Vec<&str> = found.iter().map(|d| d.rule_id.as_str()).collect();
        assert_eq!(rules, vec!["doctype-first", "title-present", "no-dup-id"]);
        assert_eq!(found[1].severity, Severity::Warning);
        assert_eq!((found[2].line, found[2].column), (3, 8));
    }

    #[test]
    fn line_col_of_offsets() {
        assert_eq!(line_col("abc", 0), (1, 1));
        assert_eq!(line_col("ab\ncd", 4), (2, 2));
    }
}
