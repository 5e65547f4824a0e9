use serde::{Deserialize, Serialize};

const MAX_PER_PAGE: i64 = 100;
const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl PaginationQuery {
    /// Clamp out-of-range values instead of rejecting the request.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.clamp(1, MAX_PAGE),
            per_page: if (1..=MAX_PER_PAGE).contains(&self.per_page) {
                self.per_page
            } else {
                default_per_page()
            },
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PaginationMeta {
    pub current_page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(query: &PaginationQuery, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            (total_items + query.per_page - 1) / query.per_page
        };

        Self {
            current_page: query.page,
            per_page: query.per_page,
            total_items,
            total_pages,
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    50
}
