//! Relative links between two files of the same output tree.
//!
//! One processed asset is written once but linked from pages at many depths,
//! so the link text is computed per (page, asset) pair:
//!
//! ```text
//! public/a/b/page.html  ->  public/assets/app.css   =  ../../assets/app.css
//! public/index.html     ->  public/assets/app.css   =  assets/app.css
//! ```

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistanceError {
    #[error(
        "paths do not exist in the same root directory: {} and {}",
        .from.display(),
        .to.display()
    )]
    NoCommonRoot { from: PathBuf, to: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distance {
    /// Leading segments shared by both paths.
    pub root: PathBuf,
    /// Part of the source below `root`, file name included.
    pub source_only: PathBuf,
    /// Part of the target below `root`.
    pub target_only: PathBuf,
    /// The `../` run needed to climb from the source's directory to `root`.
    pub trail: String,
    /// `trail` followed by `target_only`, always `/`-separated.
    pub distance: String,
}

/// Compute the link from the file at `source` to the file at `target`.
///
/// Both paths must share at least one leading named segment (normally the
/// output root); otherwise the caller linked across trees and
/// [`DistanceError::NoCommonRoot`] is returned.
pub fn distance(source: &Path, target: &Path) -> Result<Distance, DistanceError> {
    let s: Vec<Component> = source.components().collect();
    let t: Vec<Component> = target.components().collect();

    let shared = s.iter().zip(&t).take_while(|(a, b)| a == b).count();
    let named = s[..shared]
        .iter()
        .any(|c| matches!(c, Component::Normal(_)));
    if !named {
        return Err(DistanceError::NoCommonRoot {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
        });
    }

    let root: PathBuf = s[..shared].iter().collect();
    let source_only: PathBuf = s[shared..].iter().collect();
    let target_only: PathBuf = t[shared..].iter().collect();

    let ups = s.len().saturating_sub(shared + 1);
    let trail = "../".repeat(ups);
    let distance = format!("{trail}{}", crate::paths::to_slash(&target_only));

    Ok(Distance {
        root,
        source_only,
        target_only,
        trail,
        distance,
    })
}
