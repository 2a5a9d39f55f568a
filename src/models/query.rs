use serde::Deserialize;
use std::collections::BTreeMap;

use crate::api::middleware::AppError;

/// A single result row, keyed by column label in select-list order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Statistics of one table: `<column>_<stat>` to value, `None` when the aggregate is NULL.
pub type ColumnStatistics = BTreeMap<String, Option<f64>>;

pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Zero-based pagination request for data previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    size: u64,
}

impl PageRequest {
    pub fn of(page: i64, size: i64) -> Result<Self, AppError> {
        if page < 0 {
            return Err(AppError::Validation(format!(
                "Page index must not be negative, got {}",
                page
            )));
        }
        if size < 1 {
            return Err(AppError::Validation(format!(
                "Page size must be a positive integer, got {}",
                size
            )));
        }
        Ok(Self {
            page: page as u64,
            size: size as u64,
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE as u64,
        }
    }
}

/// Query string of the data preview endpoint.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl TryFrom<PageParams> for PageRequest {
    type Error = AppError;

    fn try_from(params: PageParams) -> Result<Self, Self::Error> {
        PageRequest::of(params.page, params.size)
    }
}
