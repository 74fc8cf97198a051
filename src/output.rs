//! CLI output formatting for builds, routes and the watcher.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Building 4 views
//!     views/index.html → public/index.html
//!     views/index.html → public/2/index.html
//!     views/-[slug].html → public/ada.html
//!     Skipped views/-[#2].html: attempting to loop single page "-[#2].html"
//!     Missing /img/logo.svg in public/about.html: not found locally, skipped
//! views/about.html → public/about.html
//!     warning title-present at 1:1: document has no title
//!         > 1 | <p>hello</p>
//! Index public/indexes.json (3 entries)
//!
//! 3 rendered, 1 unchanged (4 total)
//! Wrote 6 pages, 2 assets in 14ms
//! ```
//!
//! ## Routes
//!
//! ```text
//! views/-[slug].html (loop, page 1)
//!     public/ada.html
//!     public/2/edsger.html
//! views/about.html (static)
//!     public/about.html
//! views/[#9_slug].html (page 9)
//!     error: page 9 of "[#9_slug].html" does not exist (2 pages)
//! ```
//!
//! ## Watch
//!
//! ```text
//! Changed views/about.html
//! Asset style/app.css → public/style/app.css
//! ```
//!
//! # Architecture
//!
//! Each kind of output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::engine::Severity;
use crate::generate::{BuildEvent, BuildReport, RouteListing};
use crate::watch::Change;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn arrow(from: &str, to: &str) -> String {
    format!("{} \u{2192} {}", from, to)
}

// ============================================================================
// Build
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Started { views, bypass } => {
            let noun = if *views == 1 { "view" } else { "views" };
            if *bypass {
                vec![format!("Building {} {}", views, noun)]
            } else {
                vec![format!("Checking {} {}", views, noun)]
            }
        }
        BuildEvent::PageWritten { view, output } => {
            vec![format!("{}{}", indent(1), arrow(view, output))]
        }
        BuildEvent::RouteSkipped { view, reason } => {
            vec![format!("{}Skipped {}: {}", indent(1), view, reason)]
        }
        BuildEvent::AssetMissing { page, link } => vec![format!(
            "{}Missing {} in {}: not found locally, skipped",
            indent(1),
            link,
            page
        )],
        BuildEvent::Diagnostics {
            view,
            output,
            items,
        } => {
            let mut lines = vec![arrow(view, output)];
            for (diagnostic, snippet) in items {
                let level = match diagnostic.severity {
                    Severity::Warning => "warning",
                    Severity::Error => "error",
                };
                lines.push(format!(
                    "{}{} {} at {}:{}: {}",
                    indent(1),
                    level,
                    diagnostic.rule_id,
                    diagnostic.line,
                    diagnostic.column,
                    diagnostic.message
                ));
                lines.extend(
                    snippet
                        .lines()
                        .map(|l| format!("{}{}", indent(2), l)),
                );
            }
            lines
        }
        BuildEvent::AssetRebuilt { source, output } => {
            vec![format!("Asset {}", arrow(source, output))]
        }
        BuildEvent::IndexWritten { path, entries } => {
            vec![format!("Index {} ({} entries)", path, entries)]
        }
    }
}

/// Format the summary printed after a build pass.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![String::new()];
    if report.stats.total() > 0 {
        lines.push(report.stats.to_string());
    }

    let mut wrote = format!(
        "Wrote {} {}",
        report.pages,
        if report.pages == 1 { "page" } else { "pages" }
    );
    if report.assets > 0 {
        wrote.push_str(&format!(
            ", {} {}",
            report.assets,
            if report.assets == 1 { "asset" } else { "assets" }
        ));
    }
    wrote.push_str(&format!(" in {}ms", report.elapsed.as_millis()));
    lines.push(wrote);

    if report.skipped_routes > 0 {
        lines.push(format!("Skipped {} route(s)", report.skipped_routes));
    }
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Format the route listing: each view with its kind and outputs.
pub fn format_routes(routes: &[RouteListing]) -> Vec<String> {
    let mut lines = Vec::new();
    for listing in routes {
        let kind = match &listing.route {
            Some(r) if r.is_static() => "static".to_string(),
            Some(r) if r.has_loop => format!("loop, page {}", r.page),
            Some(r) => format!("page {}", r.page),
            None => "invalid".to_string(),
        };
        lines.push(format!("{} ({})", listing.view, kind));
        match &listing.outputs {
            Ok(outputs) if outputs.is_empty() => lines.push(format!("{}(no pages)", indent(1))),
            Ok(outputs) => {
                lines.extend(outputs.iter().map(|o| format!("{}{}", indent(1), o)));
            }
            Err(e) => lines.push(format!("{}error: {}", indent(1), e)),
        }
    }
    lines
}

pub fn print_routes(routes: &[RouteListing]) {
    for line in format_routes(routes) {
        println!("{}", line);
    }
}

// ============================================================================
// Watch
// ============================================================================

/// Format a detected change, with paths shown relative to `root`.
pub fn format_change(change: &Change, root: &Path) -> Vec<String> {
    let rel = |p: &Path| crate::paths::to_slash(crate::paths::strip_cwd(root, p));
    match change {
        Change::Views(views) => views.iter().map(|v| format!("Changed {}", rel(v))).collect(),
        Change::Rescan(path) => vec![format!("Removed {}, rescanning", rel(path))],
        Change::Asset(path) => vec![format!("Changed asset {}", rel(path))],
        Change::Data(path) => vec![format!("Changed data {}", rel(path))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::engine::Diagnostic;
    use crate::route::RoutePattern;
    use std::path::PathBuf;
    use std::time::Duration;

    // =========================================================================
    // Build events
    // =========================================================================

    #[test]
    fn started_line() {
        let full = BuildEvent::Started {
            views: 4,
            bypass: true,
        };
        let check = BuildEvent::Started {
            views: 1,
            bypass: false,
        };
        assert_eq!(format_build_event(&full), vec!["Building 4 views"]);
        assert_eq!(format_build_event(&check), vec!["Checking 1 view"]);
    }

    #[test]
    fn page_written_is_indented() {
        let lines = format_build_event(&BuildEvent::PageWritten {
            view: "views/about.html".into(),
            output: "public/about.html".into(),
        });
        assert_eq!(lines, vec!["    views/about.html \u{2192} public/about.html"]);
    }

    #[test]
    fn missing_asset_line() {
        let lines = format_build_event(&BuildEvent::AssetMissing {
            page: "public/about.html".into(),
            link: "/nope.js".into(),
        });
        assert_eq!(
            lines,
            vec!["    Missing /nope.js in public/about.html: not found locally, skipped"]
        );
    }

    #[test]
    fn diagnostics_carry_snippets() {
        let lines = format_build_event(&BuildEvent::Diagnostics {
            view: "views/about.html".into(),
            output: "public/about.html".into(),
            items: vec![(
                Diagnostic {
                    line: 1,
                    column: 1,
                    rule_id: "title-present".into(),
                    message: "document has no title".into(),
                    severity: Severity::Warning,
                },
                "> 1 | <p>hi</p>\n    | ^".into(),
            )],
        });
        assert_eq!(
            lines,
            vec![
                "views/about.html \u{2192} public/about.html",
                "    warning title-present at 1:1: document has no title",
                "        > 1 | <p>hi</p>",
                "            | ^",
            ]
        );
    }

    #[test]
    fn index_line() {
        let lines = format_build_event(&BuildEvent::IndexWritten {
            path: "public/indexes.json".into(),
            entries: 3,
        });
        assert_eq!(lines, vec!["Index public/indexes.json (3 entries)"]);
    }

    // =========================================================================
    // Build report
    // =========================================================================

    #[test]
    fn report_with_stats_and_assets() {
        let report = BuildReport {
            stats: CacheStats {
                rendered: 3,
                unchanged: 1,
                partials: 0,
            },
            pages: 6,
            assets: 2,
            elapsed: Duration::from_millis(14),
            ..Default::default()
        };
        assert_eq!(
            format_build_report(&report),
            vec![
                "",
                "3 rendered, 1 unchanged (4 total)",
                "Wrote 6 pages, 2 assets in 14ms"
            ]
        );
    }

    #[test]
    fn report_for_asset_only_rebuild() {
        let report = BuildReport {
            assets: 1,
            skipped_routes: 1,
            ..Default::default()
        };
        assert_eq!(
            format_build_report(&report),
            vec!["", "Wrote 0 pages, 1 asset in 0ms", "Skipped 1 route(s)"]
        );
    }

    // =========================================================================
    // Routes
    // =========================================================================

    #[test]
    fn routes_show_kind_and_outputs() {
        let routes = vec![
            RouteListing {
                view: "views/-[slug].html".into(),
                route: RoutePattern::parse("-[slug].html").ok(),
                outputs: Ok(vec!["public/ada.html".into()]),
            },
            RouteListing {
                view: "views/about.html".into(),
                route: RoutePattern::parse("about.html").ok(),
                outputs: Ok(vec![]),
            },
            RouteListing {
                view: "views/-[#2].html".into(),
                route: None,
                outputs: Err("attempting to loop single page".into()),
            },
        ];
        assert_eq!(
            format_routes(&routes),
            vec![
                "views/-[slug].html (loop, page 1)",
                "    public/ada.html",
                "views/about.html (static)",
                "    (no pages)",
                "views/-[#2].html (invalid)",
                "    error: attempting to loop single page",
            ]
        );
    }

    // =========================================================================
    // Watch
    // =========================================================================

    #[test]
    fn changes_are_relative_to_root() {
        let root = Path::new("/site");
        let change = Change::Views(vec![
            PathBuf::from("/site/views/a.html"),
            PathBuf::from("/site/views/b.html"),
        ]);
        assert_eq!(
            format_change(&change, root),
            vec!["Changed views/a.html", "Changed views/b.html"]
        );
        assert_eq!(
            format_change(&Change::Rescan(PathBuf::from("/site/views/c.html")), root),
            vec!["Removed views/c.html, rescanning"]
        );
    }
}
