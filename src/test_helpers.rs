//! Shared test utilities for the jampass test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! // build into tmp/public ...
//! assert!(read_output(&tmp, "about.html").contains("<h1>"));
//! assert_eq!(output_files(&tmp), vec!["about.html", "index.html"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::paths;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// The site has three items paginated two per page, a loop view, a
/// paginated index, a static page, a partial, a stylesheet and a script.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Output lookups
// =========================================================================

/// Read a file under `public/`. Panics with the path on miss.
pub fn read_output(tmp: &TempDir, rel: &str) -> String {
    let path = tmp.path().join("public").join(rel);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// Every file under `public/`, as sorted `/`-separated relative paths.
pub fn output_files(tmp: &TempDir) -> Vec<String> {
    let out = tmp.path().join("public");
    paths::list_files(&out)
        .unwrap_or_default()
        .iter()
        .map(|p| paths::to_slash(paths::strip_cwd(&out, p)))
        .collect()
}
