//! # Jampass
//!
//! A static site builder where file names are routes. Every template under
//! `views/` is rendered against one JSON data file, and its name decides how
//! many pages it produces and where they land:
//!
//! ```text
//! views/about.html          →  public/about.html
//! views/-[slug].html        →  public/ada.html, public/grace.html, public/2/edsger.html
//! views/index.html          →  public/index.html, public/2/index.html   (paginated)
//! views/[#2_slug:0].html    →  public/2/edsger.html
//! ```
//!
//! # Architecture
//!
//! A build session owns one [`generate::Builder`]. Each pass classifies the
//! views against the [`cache::ContentCache`], expands the ones that changed
//! into pages, renders them in parallel and post-processes the HTML:
//!
//! ```text
//! views ─ classify ─ plan (route × pagination) ─ render ─ validate
//!                                                   └─ inline styles ─ link assets ─ minify ─ write
//! ```
//!
//! The watcher feeds single changes back into the same session, so only what
//! a change affects is rebuilt.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`route`] | File-name route patterns: parsing, field resolution, output placement |
//! | [`pagination`] | Splitting the data into pages and walking them item by item |
//! | [`cache`] | Per-session view checksums, outputs, processed assets and page links |
//! | [`distance`] | Relative links between two files of the output tree |
//! | [`assets`] | Finding, processing and re-linking the stylesheets and scripts of a page |
//! | [`engine`] | Template engine, asset transformer and HTML validator seams, with built-ins |
//! | [`data`] | Loading the data file |
//! | [`search`] | `indexes.json` generation |
//! | [`generate`] | The build driver |
//! | [`watch`] | Watch mode |
//! | [`config`] | `jampass.toml` loading, merging, and validation |
//! | [`paths`] | Path and url helpers shared by every stage |
//! | [`snippet`] | Source excerpts for error messages |
//! | [`output`] | CLI output formatting |
//!
//! # Collaborators
//!
//! Rendering, asset transforms and validation sit behind the traits in
//! [`engine`]. The built-ins are a handlebars engine, a transformer that
//! passes stylesheets and scripts through (hashing them in production), and a
//! small structural validator. [`generate::Builder::with_collaborators`] takes
//! any other implementation.

pub mod assets;
pub mod cache;
pub mod config;
pub mod data;
pub mod distance;
pub mod engine;
pub mod generate;
pub mod output;
pub mod pagination;
pub mod paths;
pub mod route;
pub mod search;
pub mod snippet;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
