//! Page arithmetic and hypermedia pagination links.

use serde::Serialize;
use url::Url;

/// A hypermedia link (`{href, method, rel}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
    pub method: String,
    pub rel: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, method: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            method: method.into(),
            rel: rel.into(),
        }
    }
}

/// Requested page. `page` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub page: u64,
    pub per_page: u64,
    /// Only known when a count was explicitly requested.
    pub total_items: Option<u64>,
}

impl PaginationState {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page,
            total_items: None,
        }
    }

    pub fn with_total(self, total_items: Option<u64>) -> Self {
        Self {
            total_items,
            ..self
        }
    }

    pub fn offset(&self) -> u64 {
        offset(self.page, self.per_page)
    }

    /// Whether a page follows this one. Optimistic when the total is unknown.
    pub fn has_next(&self) -> bool {
        match self.total_items {
            Some(total) => self.offset().saturating_add(self.per_page) < total,
            None => true,
        }
    }

    /// Index of the last page, when the total is known.
    pub fn last_page(&self) -> Option<u64> {
        let total = self.total_items?;
        if total == 0 || self.per_page == 0 {
            return Some(0);
        }
        Some((total - 1) / self.per_page)
    }
}

pub fn offset(page: u64, per_page: u64) -> u64 {
    page.saturating_mul(per_page)
}

/// Pagination links for `state`, relative to `base`.
///
/// `first` and `self` are always present, `previous` only past the first page,
/// `next` per [`PaginationState::has_next`], `last` only with a known total.
/// Other query parameters of `base` are preserved.
pub fn links(base: &Url, state: &PaginationState) -> Vec<Link> {
    let mut links = vec![
        Link::new("self", "GET", page_href(base, state.page, state.per_page)),
        Link::new("first", "GET", page_href(base, 0, state.per_page)),
    ];
    if state.page > 0 {
        links.push(Link::new(
            "previous",
            "GET",
            page_href(base, state.page - 1, state.per_page),
        ));
    }
    if state.has_next() {
        links.push(Link::new(
            "next",
            "GET",
            page_href(base, state.page + 1, state.per_page),
        ));
    }
    if let Some(last) = state.last_page() {
        links.push(Link::new("last", "GET", page_href(base, last, state.per_page)));
    }
    links
}

/// `base` with its `page`/`per_page` query parameters replaced.
pub fn page_href(base: &Url, page: u64, per_page: u64) -> String {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != "page" && k != "per_page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &per_page.to_string());
    url.to_string()
}

/// Partition an in-memory list into pages of `per_page` items.
pub fn split_into_chunks<T>(items: Vec<T>, per_page: usize) -> Vec<Vec<T>> {
    if per_page == 0 {
        return vec![items];
    }
    let mut chunks = Vec::new();
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(per_page).collect());
    }
    chunks
}
