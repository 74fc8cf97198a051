//! Pagination: splitting the dataset into pages and tracking which page an
//! item lands on while views are expanded.
//!
//! Page 1 lives at the output root (`/`), every later page under its number
//! (`/2`, `/3`, ...). Paginating is opt-in: it happens only when the data
//! source asks for `every` items per page and has at least that many items.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::route::DEFAULT_PAGE_NUMBER;

/// Pagination settings read from the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Items per page. Anything but a positive integer turns paginating off.
    #[serde(deserialize_with = "positive_count")]
    pub every: Option<usize>,
    /// Pre-chunked pages. Flattened and used instead of the raw data.
    /// Ignored unless it is an array.
    #[serde(deserialize_with = "array_only")]
    pub pages: Option<Vec<Value>>,
}

fn positive_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok()))
}

fn array_only<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(pages)) => Ok(Some(pages)),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub no: u32,
    pub url: String,
}

impl Page {
    pub fn new(no: u32) -> Self {
        Self {
            no,
            url: page_url(no),
        }
    }
}

/// Url of a page: `/` for the first page, `/<no>` for the rest.
pub fn page_url(no: u32) -> String {
    if no <= DEFAULT_PAGE_NUMBER {
        "/".to_string()
    } else {
        format!("/{no}")
    }
}

/// Ordered, contiguous pages starting at 1.
pub type PageSet = Vec<Page>;

/// Result of partitioning a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    /// Page chunks. A single chunk holding everything when not paginating.
    pub pages: Vec<Vec<Value>>,
    pub meta_pages: PageSet,
    pub paginate: bool,
    pub every: usize,
    /// Every item in order, chunk boundaries removed.
    pub flat_pages: Vec<Value>,
}

impl Pagination {
    pub fn page_count(&self) -> u32 {
        self.meta_pages.len() as u32
    }

    /// Items of page `no`, if it exists.
    pub fn chunk(&self, no: u32) -> Option<&[Value]> {
        let i = no.checked_sub(DEFAULT_PAGE_NUMBER)? as usize;
        self.pages.get(i).map(Vec::as_slice)
    }

    /// A cursor for one sequential pass over `flat_pages`.
    pub fn cursor(&self) -> PageCursor {
        PageCursor::new(self.every, self.paginate)
    }
}

/// Partition `raw` (or the pre-chunked `config.pages`) into pages.
pub fn paginate(config: &PaginationConfig, raw: &Value) -> Pagination {
    let flat_pages: Vec<Value> = match &config.pages {
        Some(pages) => flatten(pages),
        None => as_items(raw),
    };

    let every = config.every.unwrap_or(0);
    let paginate = every > 0 && every <= flat_pages.len();

    let pages: Vec<Vec<Value>> = if paginate {
        flat_pages.chunks(every).map(<[Value]>::to_vec).collect()
    } else {
        vec![flat_pages.clone()]
    };

    let meta_pages = (1..=pages.len() as u32).map(Page::new).collect();

    Pagination {
        pages,
        meta_pages,
        paginate,
        every,
        flat_pages,
    }
}

fn flatten(pages: &[Value]) -> Vec<Value> {
    pages
        .iter()
        .flat_map(|chunk| match chunk {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        })
        .collect()
}

/// The items of a dataset: an array's elements, nothing for `null`, or the
/// value itself as a single item.
pub fn as_items(raw: &Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Sequential page lookup for item indices.
///
/// Indices must be passed in strictly increasing order within one pass; debug
/// builds assert this. Out-of-order calls in release builds return the page
/// the cursor has already reached, which is stale for earlier items.
#[derive(Debug, Clone)]
pub struct PageCursor {
    every: usize,
    paginate: bool,
    current_page: u32,
    current_url: String,
    last_index: Option<usize>,
}

impl PageCursor {
    pub fn new(every: usize, paginate: bool) -> Self {
        Self {
            every,
            paginate,
            current_page: DEFAULT_PAGE_NUMBER,
            current_url: page_url(DEFAULT_PAGE_NUMBER),
            last_index: None,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Move to item `index` and return the url of the page it falls on.
    pub fn advance(&mut self, index: usize) -> &str {
        debug_assert!(
            self.last_index.is_none_or(|last| index > last),
            "page cursor advanced out of order: {index} after {:?}",
            self.last_index
        );
        self.last_index = Some(index);

        if self.paginate && self.every > 0 {
            let target = (index / self.every) as u32 + DEFAULT_PAGE_NUMBER;
            if target > self.current_page {
                self.current_page = target;
                self.current_url = page_url(target);
            }
        }
        &self.current_url
    }
}
