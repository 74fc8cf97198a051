//! The data source: one JSON file feeding every view.
//!
//! The file is either the data itself (any JSON value, usually an array of
//! items) or an envelope that also carries pagination and search settings:
//!
//! ```json
//! {
//!   "data": [{ "name": "ada" }, { "name": "grace" }],
//!   "pagination": { "every": 10 },
//!   "indexes": ["name"]
//! }
//! ```
//!
//! A missing data file is an empty dataset.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::PartialRegistry;
use crate::pagination::{self, Pagination, PaginationConfig};

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read data file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse data file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Keys recognized in the envelope form.
const ENVELOPE_KEYS: &[&str] = &["data", "pagination", "indexes"];

/// Runtime data every view and the search index read from.
#[derive(Debug, Clone)]
pub struct Funneled {
    pub raw: Value,
    pub pagination_config: PaginationConfig,
    pub pagination: Pagination,
    /// Item keys to build the search index from.
    pub indexes: Vec<String>,
    pub partials: PartialRegistry,
}

impl Funneled {
    pub fn new(raw: Value, pagination_config: PaginationConfig, indexes: Vec<String>) -> Self {
        let pagination = pagination::paginate(&pagination_config, &raw);
        Self {
            raw,
            pagination_config,
            pagination,
            indexes,
            partials: PartialRegistry::new(),
        }
    }

    /// Parse a data file's JSON text.
    ///
    /// Once a value is recognized as an envelope its `data` is always the
    /// dataset. A malformed `pagination` or `indexes` falls back to the
    /// default with a warning.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) if is_envelope(&map) => {
                let data = map.remove("data").unwrap_or(Value::Null);
                let pagination = envelope_field(&mut map, "pagination");
                let indexes = envelope_field(&mut map, "indexes");
                Self::new(data, pagination, indexes)
            }
            value => Self::new(value, PaginationConfig::default(), Vec::new()),
        }
    }

    /// Items of the dataset, pagination chunks removed.
    pub fn items(&self) -> &[Value] {
        &self.pagination.flat_pages
    }
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    map.contains_key("data") && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str()))
}

fn envelope_field<T: DeserializeOwned + Default>(map: &mut Map<String, Value>, key: &str) -> T {
    let Some(value) = map.remove(key) else {
        return T::default();
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("ignoring data file `{key}`: {e}");
        T::default()
    })
}

/// Load the data file at `path`.
pub fn load(path: &Path) -> Result<Funneled, DataError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("no data file at {}, using an empty dataset", path.display());
            return Ok(Funneled::new(
                Value::Array(Vec::new()),
                PaginationConfig::default(),
                Vec::new(),
            ));
        }
        Err(source) => {
            return Err(DataError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let value: Value = serde_json::from_str(&text).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Funneled::from_value(value))
}
