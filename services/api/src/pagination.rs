//! Page-number pagination for list endpoints
//!
//! Lists accept `page` (1-based) and `page_size` query parameters and answer
//! with a `{count, next, previous, results}` envelope. The `next` and
//! `previous` links keep every other query parameter of the request.

use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri, Query},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};

use crate::{config::ApiConfig, error::ApiError, state::AppState};

/// Raw pagination parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Paginated response envelope
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Requested page of a list endpoint
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    base_url: String,
    path: String,
    query: Option<String>,
}

impl Pagination {
    /// Resolve the page parameters against the configured bounds
    pub fn new(
        params: PageParams,
        config: &ApiConfig,
        path: &str,
        query: Option<&str>,
    ) -> Result<Self, ApiError> {
        let page = match params.page.as_deref() {
            None | Some("") => 1,
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|page| *page > 0)
                .ok_or(ApiError::NotFound)?,
        };

        let page_size = match params.page_size.as_deref() {
            None | Some("") => config.default_page_size,
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid page size: {}", value)))?
                .min(config.max_page_size),
        };

        Ok(Self {
            page,
            page_size,
            base_url: config.public_url.clone(),
            path: path.to_string(),
            query: query.map(str::to_string),
        })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Row offset of the requested page
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    fn last_page(&self, count: i64) -> u32 {
        let pages = (count + self.limit() - 1) / self.limit();
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    /// Wrap a page of results
    ///
    /// A page past the end is not found, except the first page of an empty list.
    pub fn respond<T>(&self, results: Vec<T>, count: i64) -> Result<Paginated<T>, ApiError> {
        let last_page = self.last_page(count);
        if self.page > last_page {
            return Err(ApiError::NotFound);
        }

        let next = (self.page < last_page).then(|| self.page_url(self.page + 1));
        let previous = (self.page > 1).then(|| self.page_url(self.page - 1));

        Ok(Paginated {
            count,
            next,
            previous,
            results,
        })
    }

    fn page_url(&self, page: u32) -> String {
        let mut pairs: Vec<String> = self
            .query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
            .map(str::to_string)
            .collect();

        if page > 1 {
            pairs.push(format!("page={}", page));
        }

        if pairs.is_empty() {
            format!("{}{}", self.base_url, self.path)
        } else {
            format!("{}{}?{}", self.base_url, self.path, pairs.join("&"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Pagination {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PageParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let OriginalUri(uri) = OriginalUri::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServerError)?;

        Pagination::new(params, &state.config, uri.path(), uri.query())
    }
}
