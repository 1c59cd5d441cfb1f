//! Search, sort and paginate helper shared by the admin list views.
//!
//! A resource describes what may be searched and sorted with a [`ListSpec`].
//! The raw query string becomes a [`ListQuery`], which [`ListSpec::resolve`]
//! turns into a [`ResolvedQuery`]: every value clamped, the sort field checked
//! against the allow-list, and the SQL fragments ready for storage to splice
//! into its statements. Sort columns only ever come from the allow-list, so
//! user input reaches SQL through bound parameters alone.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Page size used when the request does not name one.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Largest accepted page size.
pub const MAX_PER_PAGE: u32 = 100;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// Normalize a raw direction: `asc` in any case is ascending, anything
    /// else is descending. Missing input yields `default`.
    #[must_use]
    pub fn parse(raw: Option<&str>, default: Self) -> Self {
        match raw.map(str::trim) {
            None | Some("") => default,
            Some(s) if s.eq_ignore_ascii_case("asc") => Self::Asc,
            Some(_) => Self::Desc,
        }
    }

    /// The SQL keyword.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Per-resource list configuration.
#[derive(Debug, Clone, Copy)]
pub struct ListSpec {
    /// SQL expressions matched against the search term, OR-combined.
    pub searchable: &'static [&'static str],
    /// Allowed sort fields as `(query name, SQL expression)`.
    pub sortable: &'static [(&'static str, &'static str)],
    /// Query name of the fallback sort field. Must appear in `sortable`.
    pub default_sort: &'static str,
    /// Direction used when none is given.
    pub default_direction: SortDirection,
    /// Appended to every ORDER BY so equal keys stay in a stable order.
    pub tiebreak: &'static str,
}

/// Raw list parameters as they arrive in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Substring to look for.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size.
    #[serde(alias = "perPage")]
    pub per_page: Option<i64>,
    /// Requested sort field.
    #[serde(alias = "sortField")]
    pub sort_field: Option<String>,
    /// Requested direction.
    #[serde(alias = "sortDirection")]
    pub sort_direction: Option<String>,
}

impl ListQuery {
    /// A query for the given page with everything else defaulted.
    #[must_use]
    pub fn page(page: i64) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }
}

/// A [`ListQuery`] after clamping and allow-list checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    /// Trimmed, non-empty search term.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Page size within `1..=MAX_PER_PAGE`.
    pub per_page: u32,
    /// Accepted sort field name.
    pub sort_field: &'static str,
    /// SQL expression for the sort field.
    pub sort_sql: &'static str,
    /// Normalized direction.
    pub sort_direction: SortDirection,
    searchable: &'static [&'static str],
    tiebreak: &'static str,
}

impl ListSpec {
    /// Resolve raw parameters against this spec.
    ///
    /// Unknown sort fields fall back to the default. This never fails.
    #[must_use]
    pub fn resolve(&self, query: &ListQuery) -> ResolvedQuery {
        let requested = query.sort_field.as_deref().map(str::trim);
        let (sort_field, sort_sql) = requested
            .and_then(|name| self.sortable.iter().find(|(field, _)| *field == name))
            .or_else(|| {
                self.sortable
                    .iter()
                    .find(|(field, _)| *field == self.default_sort)
            })
            .copied()
            .unwrap_or((self.default_sort, self.tiebreak));

        let per_page = query
            .per_page
            .map_or(DEFAULT_PER_PAGE, |n| clamp_to_u32(n, 1, MAX_PER_PAGE));
        let page = query.page.map_or(1, |n| clamp_to_u32(n, 1, u32::MAX));

        ResolvedQuery {
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
            page,
            per_page,
            sort_field,
            sort_sql,
            sort_direction: SortDirection::parse(
                query.sort_direction.as_deref(),
                self.default_direction,
            ),
            searchable: self.searchable,
            tiebreak: self.tiebreak,
        }
    }
}

fn clamp_to_u32(value: i64, min: u32, max: u32) -> u32 {
    u32::try_from(value.clamp(i64::from(min), i64::from(max))).unwrap_or(min)
}

impl ResolvedQuery {
    /// The search condition and its parameters, if a term was given.
    ///
    /// The term is matched literally: `%`, `_` and `\` are escaped.
    #[must_use]
    pub fn search_condition(&self) -> Option<(String, Vec<Value>)> {
        let term = self.search.as_deref()?;
        if self.searchable.is_empty() {
            return None;
        }
        let pattern = format!("%{}%", escape_like(term));
        let clause = self
            .searchable
            .iter()
            .map(|column| format!("{column} LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let params = self
            .searchable
            .iter()
            .map(|_| Value::Text(pattern.clone()))
            .collect();
        Some((format!("({clause})"), params))
    }

    /// The `ORDER BY` clause.
    #[must_use]
    pub fn order_clause(&self) -> String {
        let dir = self.sort_direction.as_sql();
        if self.sort_sql == self.tiebreak {
            format!("ORDER BY {} {dir}", self.sort_sql)
        } else {
            format!("ORDER BY {} {dir}, {} {dir}", self.sort_sql, self.tiebreak)
        }
    }

    /// `LIMIT` and `OFFSET` values for this page.
    #[must_use]
    pub fn limit_offset(&self) -> (i64, i64) {
        let limit = i64::from(self.per_page);
        let offset = (i64::from(self.page) - 1).saturating_mul(limit);
        (limit, offset)
    }

    /// The filter state echoed back to the client.
    #[must_use]
    pub fn filters(&self) -> Filters {
        Filters {
            search: self.search.clone(),
            per_page: self.per_page,
            sort_field: self.sort_field.to_string(),
            sort_direction: self.sort_direction,
        }
    }
}

/// Escape LIKE wildcards so the term matches literally under `ESCAPE '\'`.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One page of results with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The rows on this page.
    pub data: Vec<T>,
    /// 1-based page number.
    pub current_page: u32,
    /// Page size.
    pub per_page: u32,
    /// Total matching rows.
    pub total: u64,
    /// Last page number, at least 1.
    pub last_page: u64,
    /// 1-based index of the first row on this page.
    pub from: Option<u64>,
    /// 1-based index of the last row on this page.
    pub to: Option<u64>,
}

impl<T> Page<T> {
    /// Assemble a page from its rows and the total match count.
    #[must_use]
    pub fn new(data: Vec<T>, current_page: u32, per_page: u32, total: u64) -> Self {
        let per_page_u64 = u64::from(per_page.max(1));
        let last_page = total.div_ceil(per_page_u64).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let first = u64::from(current_page.saturating_sub(1)) * per_page_u64 + 1;
            (Some(first), Some(first + data.len() as u64 - 1))
        };
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
            from,
            to,
        }
    }

    /// Transform every row, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
            from: self.from,
            to: self.to,
        }
    }
}

/// Echo of the applied filter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Applied search term.
    pub search: Option<String>,
    /// Applied page size.
    pub per_page: u32,
    /// Applied sort field.
    pub sort_field: String,
    /// Applied direction.
    pub sort_direction: SortDirection,
}

/// A page plus the filters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    /// The page, flattened into the response body.
    #[serde(flatten)]
    pub page: Page<T>,
    /// Applied filters.
    pub filters: Filters,
}
