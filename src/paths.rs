//! Path primitives shared by every stage of the build.
//!
//! Output paths are handled as [`Path`]s while building and as `/`-separated
//! strings whenever they end up inside HTML or JSON (links, urls). The helpers
//! here are the only place that converts between the two, so a page written on
//! Windows still links with forward slashes.

use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directory names never descended into while listing sources.
const IGNORED_DIRS: &[&str] = &["node_modules"];

/// List every file under `root`, recursively, skipping hidden entries
/// (dot-prefixed) and [`IGNORED_DIRS`].
///
/// Returns full paths sorted lexically. A missing `root` is not an error:
/// it simply has no files.
pub fn list_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e.file_name().to_str().unwrap_or("")));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}

/// Strip `cwd` from the front of `path`; paths outside `cwd` come back as-is.
///
/// ```
/// use jampass::paths::strip_cwd;
/// use std::path::Path;
/// assert_eq!(strip_cwd(Path::new("/site"), Path::new("/site/views/a.html")), Path::new("views/a.html"));
/// assert_eq!(strip_cwd(Path::new("/site"), Path::new("/other/a.html")), Path::new("/other/a.html"));
/// ```
pub fn strip_cwd<'a>(cwd: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(cwd).unwrap_or(path)
}

/// Render a path with `/` separators, dropping `.` components.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::CurDir => {}
            Component::Prefix(p) => out.push_str(&p.as_os_str().to_string_lossy()),
            Component::ParentDir => {
                push_segment(&mut out, "..");
            }
            Component::Normal(s) => push_segment(&mut out, &s.to_string_lossy()),
        }
    }
    out
}

fn push_segment(out: &mut String, segment: &str) {
    if !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    out.push_str(segment);
}

/// Join `/`-separated url parts onto a filesystem base, ignoring empty parts
/// and leading slashes.
///
/// ```
/// use jampass::paths::join_url;
/// use std::path::Path;
/// assert_eq!(join_url(Path::new("out"), "/2/blog/a.html"), Path::new("out/2/blog/a.html"));
/// assert_eq!(join_url(Path::new("out"), "/"), Path::new("out"));
/// ```
pub fn join_url(base: &Path, url: &str) -> PathBuf {
    url.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .fold(base.to_path_buf(), |acc, s| acc.join(s))
}

/// Like [`join_url`], but `..` parts step back up and a url that climbs
/// above `base` resolves to `None`.
///
/// ```
/// use jampass::paths::join_url_within;
/// use std::path::Path;
/// assert_eq!(join_url_within(Path::new("site"), "/a/../b.css"), Some(Path::new("site/b.css").to_path_buf()));
/// assert_eq!(join_url_within(Path::new("site"), "../b.css"), None);
/// ```
pub fn join_url_within(base: &Path, url: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for s in url.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if s == ".." {
            parts.pop()?;
        } else {
            parts.push(s);
        }
    }
    Some(parts.iter().fold(base.to_path_buf(), |acc, s| acc.join(s)))
}

/// The file stem (name without the last extension) as a `&str`, or `""`.
pub fn stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("")
}

/// The file name as a `&str`, or `""`.
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("")
}

/// The extension including its dot (`".css"`), or `""` when there is none.
pub fn dotted_ext(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

/// Insert a content hash before the extension: `app.css` → `app.1a2b3c.css`.
pub fn with_hash_suffix(path: &Path, hash: &str) -> PathBuf {
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}.{}", stem(path), hash, ext),
        None => format!("{}.{}", file_name(path), hash),
    };
    path.with_file_name(name)
}

/// Whether a link points somewhere other than a local file: any url with a
/// scheme (`https:`, `mailto:`, `data:`), or a protocol-relative `//host/..`.
pub fn is_external_link(link: &str) -> bool {
    if link.starts_with("//") {
        return true;
    }
    link.find(':').is_some_and(|pos| {
        pos > 0
            && link[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Whether any directory component of `path` equals `name`.
pub fn has_dir_component(path: &Path, name: &str) -> bool {
    path.parent()
        .map(|dir| {
            dir.components()
                .any(|c| matches!(c, Component::Normal(s) if s == name))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // list_files
    // =========================================================================

    #[test]
    fn list_files_recurses_and_skips_hidden() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("blog/drafts")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("index.html"), "").unwrap();
        fs::write(root.join("blog/post.html"), "").unwrap();
        fs::write(root.join("blog/drafts/wip.html"), "").unwrap();
        fs::write(root.join(".hidden.html"), "").unwrap();
        fs::write(root.join(".git/HEAD"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();

        let files: Vec<String> = list_files(root)
            .unwrap()
            .iter()
            .map(|p| to_slash(strip_cwd(root, p)))
            .collect();

        assert_eq!(
            files,
            vec!["blog/drafts/wip.html", "blog/post.html", "index.html"]
        );
    }

    #[test]
    fn list_files_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(list_files(&tmp.path().join("nope")).unwrap().is_empty());
    }

    // =========================================================================
    // String-ish helpers
    // =========================================================================

    #[test]
    fn to_slash_normalizes() {
        assert_eq!(to_slash(Path::new("a/./b/c.html")), "a/b/c.html");
        assert_eq!(to_slash(Path::new("/out/a")), "/out/a");
        assert_eq!(to_slash(Path::new("../a")), "../a");
    }

    #[test]
    fn join_url_skips_empty_parts() {
        assert_eq!(
            join_url(Path::new("public"), "//blog//a.html"),
            PathBuf::from("public/blog/a.html")
        );
    }

    #[test]
    fn join_url_within_stays_under_base() {
        assert_eq!(
            join_url_within(Path::new("site"), "style/./a/../app.css"),
            Some(PathBuf::from("site/style/app.css"))
        );
        assert_eq!(join_url_within(Path::new("site"), "style/../../app.css"), None);
        assert_eq!(join_url_within(Path::new("site"), ".."), None);
    }

    #[test]
    fn hash_suffix_goes_before_extension() {
        assert_eq!(
            with_hash_suffix(Path::new("out/style/app.css"), "abc123"),
            PathBuf::from("out/style/app.abc123.css")
        );
        assert_eq!(
            with_hash_suffix(Path::new("out/LICENSE"), "abc"),
            PathBuf::from("out/LICENSE.abc")
        );
    }

    #[test]
    fn dotted_ext_and_stem() {
        assert_eq!(dotted_ext(Path::new("a/b.html")), ".html");
        assert_eq!(dotted_ext(Path::new("a/b")), "");
        assert_eq!(stem(Path::new("a/__header.html")), "__header");
    }

    #[test]
    fn external_links() {
        assert!(is_external_link("https://cdn.example.com/app.js"));
        assert!(is_external_link("//cdn.example.com/app.js"));
        assert!(is_external_link("data:text/css;base64,AAAA"));
        assert!(!is_external_link("/style/app.css"));
        assert!(!is_external_link("style/app.css"));
        assert!(!is_external_link("./app.js"));
    }

    #[test]
    fn dir_component_ignores_file_name() {
        assert!(has_dir_component(Path::new("views/partials/nav.html"), "partials"));
        assert!(!has_dir_component(Path::new("views/partials"), "partials"));
        assert!(!has_dir_component(Path::new("views/my-partials/x.html"), "partials"));
    }
}
