//! Common API types and utilities

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::shared::error::{PlatformError, Result};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Response header carrying the filtered row count of a list call.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Validated limit/offset window. Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);

        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(PlatformError::invalid_argument(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }
        if offset < 0 {
            return Err(PlatformError::invalid_argument(format!(
                "offset must be >= 0, got {}",
                offset
            )));
        }

        Ok(Self { limit, offset })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page size, 1..=200 (default 50)
    pub limit: Option<i64>,
    /// Rows to skip (default 0)
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn page(&self) -> Result<Page> {
        Page::new(self.limit, self.offset)
    }
}

/// Body listing ids for bulk operations
#[derive(Debug, Deserialize, ToSchema)]
pub struct IdsRequest {
    pub ids: Vec<i64>,
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` substring match.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Count of affected rows
#[derive(Debug, Serialize, ToSchema)]
pub struct ChangedResponse {
    pub changed: u64,
}
