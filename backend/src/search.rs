//! Keyword search over teams and players.
//!
//! A [`SearchQuery`] carries everything a backend needs to run a search:
//! the normalized keyword, optional cursor bounds (`next_id` / `last_id`),
//! the sort key and the page. The in-memory backend evaluates it with
//! [`apply`]; the postgres backend translates the same pieces into SQL
//! (`ILIKE` patterns from [`LikePatterns`] and a `CASE` ranking that mirrors
//! [`match_rank`]), so both backends return rows in the same order.
//! Name sorts compare lowercased names byte-wise; the postgres `fullname`
//! columns use the `C` collation to get the same order. Postgres only
//! folds ASCII letters under that collation, so names whose non-ASCII
//! letters differ in case alone can still order differently.
//!
//! Relevance ranking, first hit wins:
//!
//! | rank | condition                  |
//! |------|----------------------------|
//! | 0    | name equals keyword        |
//! | 1    | name starts with keyword   |
//! | 2    | name contains keyword      |
//! | 3    | name ends with keyword     |
//! | 4    | anything else              |
//!
//! All comparisons are case-insensitive.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::models::{Page, PageRequest, Player, Team};

/// Errors raised while building a search from request parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Keyword must not be empty")]
    MissingKeyword,
    #[error("Unsupported sort key '{0}', expected one of: match, id, -id, name, -name")]
    UnsupportedSort(String),
}

/// Supported orderings for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Relevance rank ascending, ties by id ascending.
    #[default]
    Match,
    IdAsc,
    IdDesc,
    NameAsc,
    NameDesc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Match => "match",
            SortKey::IdAsc => "id",
            SortKey::IdDesc => "-id",
            SortKey::NameAsc => "name",
            SortKey::NameDesc => "-name",
        }
    }
}

impl FromStr for SortKey {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" | "" => Ok(SortKey::Match),
            "id" => Ok(SortKey::IdAsc),
            "-id" => Ok(SortKey::IdDesc),
            "name" => Ok(SortKey::NameAsc),
            "-name" => Ok(SortKey::NameDesc),
            other => Err(SearchError::UnsupportedSort(other.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive id bounds used for cursor pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorBounds {
    /// Only ids strictly below this value.
    pub next_id: Option<i64>,
    /// Only ids strictly above this value.
    pub last_id: Option<i64>,
}

impl CursorBounds {
    pub fn admits(&self, id: i64) -> bool {
        self.next_id.map_or(true, |next| id < next) && self.last_id.map_or(true, |last| id > last)
    }
}

/// A fully parsed search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    keyword: String,
    pub sort: SortKey,
    pub bounds: CursorBounds,
    pub page: PageRequest,
}

impl SearchQuery {
    /// Build a query from the raw keyword.
    ///
    /// A missing or blank keyword is an error. A keyword made only of
    /// punctuation is accepted but normalizes to empty; such a query matches
    /// nothing (see [`SearchQuery::is_empty`]).
    pub fn new(
        raw_keyword: Option<&str>,
        sort: SortKey,
        bounds: CursorBounds,
        page: PageRequest,
    ) -> Result<Self, SearchError> {
        let raw = raw_keyword
            .filter(|k| !k.trim().is_empty())
            .ok_or(SearchError::MissingKeyword)?;

        Ok(Self {
            keyword: normalize_keyword(raw),
            sort,
            bounds,
            page,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// True when normalization left nothing to search for.
    pub fn is_empty(&self) -> bool {
        self.keyword.is_empty()
    }

    pub fn like_patterns(&self) -> LikePatterns {
        LikePatterns::new(&self.keyword)
    }
}

/// Strip ASCII punctuation from both ends of the keyword, then surrounding
/// whitespace. Punctuation inside the keyword is kept.
pub fn normalize_keyword(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_string()
}

/// Relevance rank of `name` for `keyword`; lower is a closer match.
pub fn match_rank(name: &str, keyword: &str) -> u8 {
    let name = name.to_lowercase();
    let keyword = keyword.to_lowercase();

    if name == keyword {
        0
    } else if name.starts_with(&keyword) {
        1
    } else if name.contains(&keyword) {
        2
    } else if name.ends_with(&keyword) {
        3
    } else {
        4
    }
}

/// `LIKE` patterns for the four ranking conditions, with `%`, `_` and `\`
/// in the keyword escaped so they match literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePatterns {
    pub exact: String,
    pub prefix: String,
    pub contains: String,
    pub suffix: String,
}

impl LikePatterns {
    pub fn new(keyword: &str) -> Self {
        let escaped = escape_like(keyword);
        Self {
            prefix: format!("{}%", escaped),
            contains: format!("%{}%", escaped),
            suffix: format!("%{}", escaped),
            exact: escaped,
        }
    }
}

pub fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Rows that can be searched by name.
pub trait Searchable {
    fn search_id(&self) -> i64;
    fn search_name(&self) -> &str;
    fn is_hidden(&self) -> bool;
}

impl Searchable for Team {
    fn search_id(&self) -> i64 {
        self.id.value()
    }

    fn search_name(&self) -> &str {
        &self.fullname
    }

    fn is_hidden(&self) -> bool {
        self.is_deleted
    }
}

impl Searchable for Player {
    fn search_id(&self) -> i64 {
        self.id.value()
    }

    fn search_name(&self) -> &str {
        &self.fullname
    }

    fn is_hidden(&self) -> bool {
        self.is_deleted
    }
}

/// Ordering used by `sort` for two rows of the same kind.
pub fn compare<T: Searchable>(sort: SortKey, keyword: &str, a: &T, b: &T) -> Ordering {
    let by_id = a.search_id().cmp(&b.search_id());
    match sort {
        SortKey::Match => match_rank(a.search_name(), keyword)
            .cmp(&match_rank(b.search_name(), keyword))
            .then(by_id),
        SortKey::IdAsc => by_id,
        SortKey::IdDesc => by_id.reverse(),
        SortKey::NameAsc => a
            .search_name()
            .to_lowercase()
            .cmp(&b.search_name().to_lowercase())
            .then(by_id),
        SortKey::NameDesc => b
            .search_name()
            .to_lowercase()
            .cmp(&a.search_name().to_lowercase())
            .then(by_id.reverse()),
    }
}

/// Evaluate a search against an in-memory collection.
pub fn apply<T, I>(query: &SearchQuery, rows: I) -> Page<T>
where
    T: Searchable,
    I: IntoIterator<Item = T>,
{
    if query.is_empty() {
        return Page::no_match(query.page);
    }

    let needle = query.keyword.to_lowercase();
    let mut matched: Vec<T> = rows
        .into_iter()
        .filter(|row| !row.is_hidden())
        .filter(|row| query.bounds.admits(row.search_id()))
        .filter(|row| row.search_name().to_lowercase().contains(&needle))
        .collect();

    matched.sort_by(|a, b| compare(query.sort, &query.keyword, a, b));
    Page::from_vec(matched, query.page)
}
