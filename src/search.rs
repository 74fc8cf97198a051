//! Search index: `indexes.json`, written at the output root.
//!
//! For every key listed under `indexes` in the data source, each item's value
//! for that key becomes an entry:
//!
//! ```json
//! { "ada": { "index": "name", "value": { "name": "ada", ... }, "url": "/ada.html" } }
//! ```
//!
//! The url is only present when `build.search.result_url` is set; it is that
//! route pattern placed for the item, under the page the item falls on.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SearchConfig;
use crate::data::Funneled;
use crate::route::{self, RouteError, RoutePattern};

pub const INDEX_FILE_NAME: &str = "indexes.json";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid search result url: {0}")]
    ResultUrl(#[from] RouteError),
    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to serialize search index: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    /// Key the entry was indexed under.
    pub index: String,
    /// The whole data item.
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub type SearchIndex = BTreeMap<String, IndexEntry>;

/// Build the index, or `None` when the data source asks for no indexes.
pub fn build_index(
    funneled: &Funneled,
    search: &SearchConfig,
) -> Result<Option<SearchIndex>, SearchError> {
    if funneled.indexes.is_empty() {
        return Ok(None);
    }

    let result_url = match search.result_url.trim() {
        "" => None,
        pattern => Some(RoutePattern::parse(pattern)?),
    };

    let items = funneled.items();
    let mut cursor = funneled.pagination.cursor();
    let mut index = SearchIndex::new();

    for (i, item) in items.iter().enumerate() {
        let page_url = cursor.advance(i).to_string();
        let entries = item_entries(
            item,
            items,
            &funneled.indexes,
            search.index_key_max_size,
            result_url.as_ref(),
            &page_url,
        );
        index.extend(entries);
    }

    Ok(Some(index))
}

fn item_entries(
    item: &Value,
    items: &[Value],
    keys: &[String],
    max_size: usize,
    result_url: Option<&RoutePattern>,
    page_url: &str,
) -> SearchIndex {
    let mut entries = SearchIndex::new();
    for key in keys {
        let value = match route::access_property(item, key) {
            Ok(Value::String(s)) => s,
            Ok(_) => {
                log::debug!("skipped: \"{key}\" is not a string, cannot set index");
                continue;
            }
            Err(_) => {
                log::debug!("skipped: \"{key}\" is undefined, cannot set index");
                continue;
            }
        };
        if value.chars().count() > max_size {
            continue;
        }

        let url = match result_url {
            Some(pattern) => match pattern.output_for(item, items) {
                Ok(placed) => Some(page_join(page_url, &placed)),
                Err(e) => {
                    log::debug!("skipped: no result url for \"{value}\": {e}");
                    continue;
                }
            },
            None => None,
        };

        entries.insert(
            value.clone(),
            IndexEntry {
                index: key.clone(),
                value: item.clone(),
                url,
            },
        );
    }
    entries
}

/// `/` + `a.html` = `/a.html`; `/2` + `a.html` = `/2/a.html`.
fn page_join(page_url: &str, placed: &str) -> String {
    format!(
        "{}/{}",
        page_url.trim_end_matches('/'),
        placed.trim_start_matches('/')
    )
}

/// Write the index into `output_dir`, returning the file written.
pub fn write_index(index: &SearchIndex, output_dir: &Path) -> Result<PathBuf, SearchError> {
    let path = output_dir.join(INDEX_FILE_NAME);
    let json = serde_json::to_string(index)?;
    std::fs::create_dir_all(output_dir)
        .and_then(|_| std::fs::write(&path, json))
        .map_err(|source| SearchError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}
