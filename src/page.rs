#![forbid(unsafe_code)]

//! Paged results and the pagination engine seam.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::Value;
use crate::sql::{BoundStatement, Dialect};
use crate::error::Result;

/// Requested page and the row window it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    /// 1-based page number.
    pub page_num: i32,
    /// Rows per page; `< 1` means unlimited.
    pub page_size: i32,
    /// Rows skipped before the page.
    pub offset: i64,
}

impl PageWindow {
    /// Window for `page_num`/`page_size`; pages before the first start at row 0.
    pub fn new(page_num: i32, page_size: i32) -> Self {
        let offset = if page_num > 0 {
            (i64::from(page_num) - 1) * i64::from(page_size)
        } else {
            0
        };
        Self {
            page_num,
            page_size,
            offset,
        }
    }

    /// Row limit, `None` when unlimited.
    pub fn limit(&self) -> Option<i64> {
        (self.page_size > 0).then_some(i64::from(self.page_size))
    }

    /// Page count for `total` rows.
    pub fn pages(&self, total: i64) -> i32 {
        if self.page_size < 1 || total <= 0 {
            return 0;
        }
        let size = i64::from(self.page_size);
        i32::try_from((total + size - 1) / size).unwrap_or(i32::MAX)
    }
}

/// One page of results plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows of this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page_num: i32,
    /// Rows per page.
    pub page_size: i32,
    /// Total matching rows.
    pub total: i64,
    /// Total pages.
    pub pages: i32,
    /// Rows skipped before this page.
    pub offset: i64,
}

impl<T> Page<T> {
    /// Page holding `items` within `window` of `total` rows.
    pub fn new(items: Vec<T>, window: PageWindow, total: i64) -> Self {
        Self {
            items,
            page_num: window.page_num,
            page_size: window.page_size,
            total,
            pages: window.pages(total),
            offset: window.offset,
        }
    }

    /// Maps every item into a new page with identical metadata.
    pub fn convert<R, F>(&self, f: F) -> Page<R>
    where
        F: FnMut(&T) -> R,
    {
        Page {
            items: self.items.iter().map(f).collect(),
            page_num: self.page_num,
            page_size: self.page_size,
            total: self.total,
            pages: self.pages,
            offset: self.offset,
        }
    }

    /// True when the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates the page's items.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Pagination collaborator.
///
/// The engine decides the row window of a page request and restricts a list
/// statement to it.
pub trait PageEngine: Send + Sync {
    /// Window covered by `page_num`/`page_size`.
    fn window(&self, page_num: i32, page_size: i32) -> PageWindow {
        PageWindow::new(page_num, page_size)
    }

    /// Restricts `statement` to `window`.
    fn restrict(&self, statement: BoundStatement, window: &PageWindow, dialect: Dialect) -> BoundStatement;
}

/// `LIMIT ? OFFSET ?` pagination.
#[derive(Debug, Default, Clone, Copy)]
pub struct LimitOffsetPages;

impl PageEngine for LimitOffsetPages {
    fn restrict(&self, mut statement: BoundStatement, window: &PageWindow, dialect: Dialect) -> BoundStatement {
        let Some(limit) = window.limit() else {
            return statement;
        };
        statement.sql.push_str(" LIMIT ");
        statement.params.push(Value::Int(limit));
        dialect.write_placeholder(&mut statement.sql, statement.params.len());
        statement.sql.push_str(" OFFSET ");
        statement.params.push(Value::Int(window.offset));
        dialect.write_placeholder(&mut statement.sql, statement.params.len());
        statement
    }
}

/// Runs a paged query: counts first, then lists the window unless nothing matched.
pub fn select_page<T, C, L>(
    engine: &dyn PageEngine,
    page_num: i32,
    page_size: i32,
    count: C,
    list: L,
) -> Result<Page<T>>
where
    C: FnOnce() -> Result<i64>,
    L: FnOnce(&PageWindow) -> Result<Vec<T>>,
{
    let total = count()?;
    select_page_with_total(engine, page_num, page_size, total, list)
}

/// Runs a paged query whose total is already known.
pub fn select_page_with_total<T, L>(
    engine: &dyn PageEngine,
    page_num: i32,
    page_size: i32,
    total: i64,
    list: L,
) -> Result<Page<T>>
where
    L: FnOnce(&PageWindow) -> Result<Vec<T>>,
{
    let window = engine.window(page_num, page_size);
    if total <= 0 {
        trace!(page_num, page_size, "empty page; skipping list query");
        return Ok(Page::new(Vec::new(), window, 0));
    }
    let items = list(&window)?;
    Ok(Page::new(items, window, total))
}
