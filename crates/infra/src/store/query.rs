//! Paging and sorting for order listings.
//!
//! Sort keys come from request input, so they are checked against an allowlist and
//! mapped to fixed column names before they reach any query.

use serde::{Deserialize, Serialize};

use marketplace_core::{DomainError, DomainResult};
use marketplace_orders::Order;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE: u32 = 10_000_000;

/// Sortable order columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    CreatedAt,
    TotalPrice,
    Quantity,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::CreatedAt => "created_at",
            SortField::TotalPrice => "total_price",
            SortField::Quantity => "quantity",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(SortField::Id),
            "created_at" => Some(SortField::CreatedAt),
            "total_price" => Some(SortField::TotalPrice),
            "quantity" => Some(SortField::Quantity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl Sort {
    /// Parse `field` or `-field` against the allowlist.
    pub fn parse(s: &str) -> DomainResult<Self> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = SortField::parse(name).ok_or_else(|| {
            DomainError::validation(format!(
                "invalid sort value: {s} (allowed: id, created_at, total_price, quantity, optionally prefixed with '-')"
            ))
        })?;
        Ok(Self { field, descending })
    }

    pub fn direction(&self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            descending: false,
        }
    }
}

/// Validated paging request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort: Sort,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
        }
    }
}

impl ListQuery {
    pub fn new(page: Option<u32>, page_size: Option<u32>, sort: Option<&str>) -> DomainResult<Self> {
        let page = page.unwrap_or(1);
        if page == 0 || page > MAX_PAGE {
            return Err(DomainError::validation(format!(
                "page must be between 1 and {MAX_PAGE}"
            )));
        }
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(DomainError::validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let sort = match sort {
            Some(s) if !s.is_empty() => Sort::parse(s)?,
            _ => Sort::default(),
        };
        Ok(Self {
            page,
            page_size,
            sort,
        })
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Sort `orders` in memory the same way the SQL backend orders rows.
    ///
    /// Ties break on id so paging is stable.
    pub fn sort_orders(&self, orders: &mut [Order]) {
        use marketplace_core::AggregateRoot;

        orders.sort_by(|a, b| {
            let primary = match self.sort.field {
                SortField::Id => a.id().cmp(b.id()),
                SortField::CreatedAt => a.created_at().cmp(&b.created_at()),
                SortField::TotalPrice => a.total_price().cmp(&b.total_price()),
                SortField::Quantity => a.quantity().cmp(&b.quantity()),
            };
            let primary = if self.sort.descending { primary.reverse() } else { primary };
            primary.then_with(|| a.id().cmp(b.id()))
        });
    }
}

/// Paging metadata returned next to a page of results.
///
/// All zeros when there are no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    pub current_page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub last_page: u32,
    pub total_records: u64,
}

impl PageMetadata {
    pub fn calculate(total_records: u64, query: &ListQuery) -> Self {
        if total_records == 0 {
            return Self::default();
        }
        let last_page = total_records.div_ceil(u64::from(query.page_size));
        Self {
            current_page: query.page,
            page_size: query.page_size,
            first_page: 1,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            total_records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub metadata: PageMetadata,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let q = ListQuery::new(None, None, None).unwrap();
        assert_eq!(q, ListQuery::default());
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn parses_descending_sort() {
        let q = ListQuery::new(Some(3), Some(20), Some("-total_price")).unwrap();
        assert_eq!(q.sort.field, SortField::TotalPrice);
        assert_eq!(q.sort.direction(), "DESC");
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn rejects_unknown_sort_and_bad_bounds() {
        assert!(matches!(
            ListQuery::new(None, None, Some("email; DROP TABLE orders")),
            Err(DomainError::Validation(_))
        ));
        assert!(ListQuery::new(Some(0), None, None).is_err());
        assert!(ListQuery::new(None, Some(0), None).is_err());
        assert!(ListQuery::new(None, Some(101), None).is_err());
    }

    #[test]
    fn metadata_rounds_last_page_up() {
        let q = ListQuery::new(Some(2), Some(10), None).unwrap();
        let m = PageMetadata::calculate(21, &q);
        assert_eq!(m.first_page, 1);
        assert_eq!(m.last_page, 3);
        assert_eq!(m.current_page, 2);
        assert_eq!(m.total_records, 21);
    }

    #[test]
    fn metadata_is_empty_without_records() {
        let q = ListQuery::default();
        assert_eq!(PageMetadata::calculate(0, &q), PageMetadata::default());
    }
}
