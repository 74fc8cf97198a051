//! Site configuration module.
//!
//! Handles loading, validating, and merging `jampass.toml`. The user file is
//! layered over the stock defaults, so it only needs the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! src = "."                       # Project sources, relative to the config file
//!
//! [paths]
//! views = "views"                 # Templates, relative to src
//! output = "public"               # Output tree, relative to src
//! data = "jampass.data.json"      # Data source, relative to src
//! partials = "partials"           # Directory name marking partials
//!
//! [site]
//! name = ""
//! author = ""
//!
//! [build]
//! mode = "busy"                   # lazy | busy | strict
//! chunk_size = 500                # Pages post-processed per batch
//! minify = true                   # Minify HTML in production builds
//!
//! [build.search]
//! index_key_max_size = 100        # Longest value indexed
//! result_url = ""                 # Route pattern for result urls
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "jampass.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `jampass.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Project source root, relative to the directory of the config file.
    pub src: String,
    pub paths: PathsConfig,
    /// Free-form site details, exposed to templates as `site`.
    pub site: SiteInfo,
    pub build: BuildConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            src: ".".to_string(),
            paths: PathsConfig::default(),
            site: SiteInfo::default(),
            build: BuildConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "build.chunk_size must be at least 1".into(),
            ));
        }
        if self.build.search.index_key_max_size == 0 {
            return Err(ConfigError::Validation(
                "build.search.index_key_max_size must be at least 1".into(),
            ));
        }
        for (key, value) in [
            ("paths.views", &self.paths.views),
            ("paths.output", &self.paths.output),
            ("paths.data", &self.paths.data),
            ("paths.partials", &self.paths.partials),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.paths.partials.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "paths.partials must be a single directory name".into(),
            ));
        }
        if self.paths.views == self.paths.output {
            return Err(ConfigError::Validation(
                "paths.views and paths.output must differ".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub views: String,
    pub output: String,
    pub data: String,
    pub partials: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            views: "views".to_string(),
            output: "public".to_string(),
            data: "jampass.data.json".to_string(),
            partials: "partials".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    pub name: String,
    pub author: String,
}

/// How strictly rendered pages are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// No validation.
    Lazy,
    /// Validate; errors fail the build.
    #[default]
    Busy,
    /// Validate; warnings fail the build too.
    Strict,
}

impl BuildMode {
    pub fn validates(self) -> bool {
        self != BuildMode::Lazy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub mode: BuildMode,
    pub chunk_size: usize,
    pub minify: bool,
    pub search: SearchConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::default(),
            chunk_size: 500,
            minify: true,
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub index_key_max_size: usize,
    /// Route pattern placed per item for its search result url.
    pub result_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_key_max_size: 100,
            result_url: String::new(),
        }
    }
}

/// Absolute-ish locations derived from a config and the directory holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub src: PathBuf,
    pub views: PathBuf,
    pub output: PathBuf,
    pub data: PathBuf,
}

impl SitePaths {
    pub fn resolve(config: &SiteConfig, root: &Path) -> Self {
        let src: PathBuf = root.join(&config.src).components().collect();
        Self {
            views: src.join(&config.paths.views),
            output: src.join(&config.paths.output),
            data: src.join(&config.paths.data),
            src,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value; `Ok(None)` if it does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `config_path` over the stock defaults.
pub fn load_config(config_path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(config_path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `jampass.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Jampass Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Project sources, relative to this file.
src = "."

# ---------------------------------------------------------------------------
# Paths (relative to src)
# ---------------------------------------------------------------------------
[paths]
# Templates. File names are route patterns:
#   about.html          -> about.html
#   -[slug].html        -> one page per data item, named by its slug
#   [#2_slug].html      -> page 2 of the paginated data
views = "views"

# Where pages, processed assets and indexes.json are written.
output = "public"

# JSON data source. Either the data itself, or
#   { "data": ..., "pagination": { "every": 10 }, "indexes": ["name"] }
data = "jampass.data.json"

# Views inside a directory with this name (or named __*.html) are partials.
partials = "partials"

# ---------------------------------------------------------------------------
# Site details, available to templates as {{site.name}} / {{site.author}}
# ---------------------------------------------------------------------------
[site]
name = ""
author = ""

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# lazy:   skip HTML validation
# busy:   validate, fail on errors
# strict: validate, fail on errors and warnings
mode = "busy"

# Rendered pages post-processed per batch.
chunk_size = 500

# Minify HTML in production builds.
minify = true

# ---------------------------------------------------------------------------
# Search index (indexes.json); enabled by "indexes" in the data source
# ---------------------------------------------------------------------------
[build.search]
# Values longer than this are not indexed.
index_key_max_size = 100

# Route pattern giving each result's url, e.g. "[slug].html". Empty = no url.
result_url = ""
"##
}
