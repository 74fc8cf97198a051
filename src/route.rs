//! Route patterns: how a view's file name maps to one or more output paths.
//!
//! A view name either is its own output path (`about.html`), or carries a
//! *field region* in square brackets naming the data properties that build the
//! output path:
//!
//! ```text
//! about.html             static route, written as-is
//! [slug].html            one page, named after the data's `slug`
//! -[slug].html           one page per data item (`-` is the loop marker)
//! -[author_slug].html    nested path: <author>/<slug>.html
//! -[slug:0].html         `slug` read from dataset item 0, not the current item
//! [#2_slug].html         explicit page 2 of the paginated data
//! -[dir/].html           value ending in `/` becomes `<value>/index.html`
//! ```
//!
//! Inside the field region, `_` separates sub-keys (path segments), `:` pins a
//! sub-key to a dataset index, and `#` marks a page number. Keys may use dots
//! to reach nested properties (`[author.name].html`).
//!
//! A leading number before the field region (`2[slug].html`) is also read as a
//! page number. That makes a view literally named `3[x].html` ambiguous with
//! "page 3"; the behavior is kept for compatibility.

use serde_json::Value;
use thiserror::Error;

pub const FIELD_BEGIN_TOKEN: char = '[';
pub const FIELD_END_TOKEN: char = ']';
pub const PATH_TOKEN: char = '_';
pub const INDEX_TOKEN: char = ':';
pub const LOOP_TOKEN: char = '-';
pub const PAGE_TOKEN: char = '#';

/// Document appended when a placed value ends in a directory separator.
pub const INDEX_PAGE: &str = "index.html";
pub const DEFAULT_PAGE_NUMBER: u32 = 1;
/// Property paths with this many segments or more are refused.
pub const MAX_RECURSIVE_ACCESS: usize = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("page is not a number in \"{name}\": \"{page}\"")]
    PageNotNumber { name: String, page: String },
    #[error("attempting to loop single page \"{0}\"")]
    LoopWithoutKey(String),
    #[error("data key \"{0}\" is undefined")]
    UndefinedKey(String),
    #[error("index \"{index}\" in \"{name}\" is not a number")]
    IndexNotNumber { name: String, index: String },
    #[error("reached max recursive access {} for \"{}\"", MAX_RECURSIVE_ACCESS, .0)]
    MaxRecursiveAccess(String),
    #[error("data key \"{0}\" does not hold a path value")]
    NotAPathValue(String),
    #[error("page {page} of \"{name}\" does not exist ({count} pages)")]
    PageOutOfRange { name: String, page: u32, count: u32 },
}

/// One sub-key of a field region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    /// Property path to read; `None` means "the item itself" (or a page token).
    pub key: Option<String>,
    /// Dataset index the key is pinned to, instead of the current item.
    pub index: Option<String>,
}

impl FieldKey {
    fn parse(raw: &str) -> Self {
        let (key, index) = match raw.split_once(INDEX_TOKEN) {
            Some((k, i)) => (k, Some(i)),
            None => (raw, None),
        };
        let key = (!key.is_empty() && !key.starts_with(PAGE_TOKEN)).then(|| key.to_string());
        let index = index.filter(|i| !i.is_empty()).map(str::to_string);
        Self { key, index }
    }
}

/// Parsed description of how a view file name maps to output paths.
///
/// Built fresh from a name whenever the view is scheduled; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pub raw_name: String,
    pub has_loop: bool,
    pub page: u32,
    pub field_keys: Vec<FieldKey>,
    /// Text before the field region, loop marker removed. Empty for static routes.
    pub prefix: String,
    /// Text after the field region, normally the extension.
    pub suffix: String,
    dynamic: bool,
}

impl RoutePattern {
    /// Parse a bare file name (no directory parts).
    pub fn parse(file_name: &str) -> Result<Self, RouteError> {
        let (Some(begin), Some(end)) = (
            file_name.find(FIELD_BEGIN_TOKEN),
            file_name.find(FIELD_END_TOKEN),
        ) else {
            return Ok(Self::static_route(file_name));
        };
        if end < begin {
            return Ok(Self::static_route(file_name));
        }

        let prefix = &file_name[..begin];
        let suffix = &file_name[end + FIELD_END_TOKEN.len_utf8()..];
        let field = &file_name[begin + FIELD_BEGIN_TOKEN.len_utf8()..end];

        let has_loop = prefix.starts_with(LOOP_TOKEN);
        let prefix = prefix.strip_prefix(LOOP_TOKEN).unwrap_or(prefix);

        let page = match prefix.parse::<u32>() {
            Ok(n) => n,
            Err(_) => match field.strip_prefix(PAGE_TOKEN) {
                Some(rest) => {
                    let digits = rest.split(PATH_TOKEN).next().unwrap_or("");
                    match digits.parse::<u32>() {
                        Ok(n) if n >= DEFAULT_PAGE_NUMBER => n,
                        _ => {
                            return Err(RouteError::PageNotNumber {
                                name: file_name.to_string(),
                                page: digits.to_string(),
                            });
                        }
                    }
                }
                None => DEFAULT_PAGE_NUMBER,
            },
        };

        let field_keys: Vec<FieldKey> = field.split(PATH_TOKEN).map(FieldKey::parse).collect();

        if has_loop && field_keys.iter().all(|k| k.key.is_none()) {
            return Err(RouteError::LoopWithoutKey(file_name.to_string()));
        }

        Ok(Self {
            raw_name: file_name.to_string(),
            has_loop,
            page,
            field_keys,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            dynamic: true,
        })
    }

    fn static_route(name: &str) -> Self {
        Self {
            raw_name: name.to_string(),
            has_loop: false,
            page: DEFAULT_PAGE_NUMBER,
            field_keys: Vec::new(),
            prefix: String::new(),
            suffix: String::new(),
            dynamic: false,
        }
    }

    /// Whether the name had a field region at all.
    pub fn is_static(&self) -> bool {
        !self.dynamic
    }

    /// Final output path for a resolved value.
    ///
    /// Static routes ignore the value. A value ending in `/` combined with an
    /// extension suffix becomes a directory index.
    pub fn place(&self, value: &str) -> String {
        if !self.dynamic {
            return self.raw_name.clone();
        }
        if value.ends_with('/') && self.suffix.starts_with('.') {
            return format!("{}{}{}", self.prefix, value, INDEX_PAGE);
        }
        format!("{}{}{}", self.prefix, value, self.suffix)
    }

    /// Resolve the field keys against `item` (the current data item) and
    /// `dataset` (for index-pinned keys), producing the value for [`place`].
    ///
    /// Parts are joined with `/`; page-token and empty entries contribute
    /// nothing.
    ///
    /// [`place`]: RoutePattern::place
    pub fn resolve_value(&self, item: &Value, dataset: &[Value]) -> Result<String, RouteError> {
        let mut parts = Vec::with_capacity(self.field_keys.len());
        for field in &self.field_keys {
            let source = match &field.index {
                Some(index) => {
                    let i: usize = index.parse().map_err(|_| RouteError::IndexNotNumber {
                        name: self.raw_name.clone(),
                        index: index.clone(),
                    })?;
                    dataset
                        .get(i)
                        .ok_or_else(|| RouteError::UndefinedKey(format!("{INDEX_TOKEN}{i}")))?
                }
                None if field.key.is_none() => continue,
                None => item,
            };
            let value = match &field.key {
                Some(key) => access_property(source, key)?,
                None => source,
            };
            let label = field.key.as_deref().unwrap_or("");
            parts.push(path_value(value, label)?);
        }
        Ok(parts.join("/"))
    }

    /// Resolve and place in one step.
    pub fn output_for(&self, item: &Value, dataset: &[Value]) -> Result<String, RouteError> {
        if !self.dynamic {
            return Ok(self.raw_name.clone());
        }
        Ok(self.place(&self.resolve_value(item, dataset)?))
    }
}

/// Turn a scalar data value into a path part.
fn path_value(value: &Value, key: &str) -> Result<String, RouteError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(RouteError::NotAPathValue(key.to_string())),
    }
}

/// Read a dot-separated property path from a JSON value.
///
/// Numeric segments index into arrays. Missing, `null`, `false` and empty
/// string values are all "undefined".
pub fn access_property<'a>(value: &'a Value, key: &str) -> Result<&'a Value, RouteError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.len() >= MAX_RECURSIVE_ACCESS {
        return Err(RouteError::MaxRecursiveAccess(key.to_string()));
    }

    let mut current = value;
    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        };
        current = match next {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {
                return Err(RouteError::UndefinedKey(segment.to_string()));
            }
            Some(Value::String(s)) if s.is_empty() => {
                return Err(RouteError::UndefinedKey(segment.to_string()));
            }
            Some(v) => v,
        };
    }
    Ok(current)
}
