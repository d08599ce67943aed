use serde::{Deserialize, Serialize};

use crate::{ApiError, ApiResult};

/// `?page=N`, 1-based.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
}

impl PageParams {
    /// Zero-based page index for the ORM paginator.
    pub fn index(&self) -> ApiResult<u64> {
        match self.page {
            None => Ok(0),
            Some(0) => Err(ApiError::invalid_field("page", "page numbers start at 1")),
            Some(n) => Ok(n - 1),
        }
    }

    /// Zero-based index checked against the result size. Only the first page
    /// may be empty; anything past the last page is a 404.
    pub fn index_within(&self, count: u64, page_size: u64) -> ApiResult<u64> {
        let index = self.index()?;
        let pages = count.div_ceil(page_size.max(1));
        if index > 0 && index >= pages {
            return Err(ApiError::NotFound("page"));
        }
        Ok(index)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, index: u64, page_size: u64) -> Self {
        let pages = count.div_ceil(page_size.max(1));
        let number = index + 1;
        Self {
            count,
            next: (number < pages).then_some(number + 1),
            previous: (index > 0).then_some(index),
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
