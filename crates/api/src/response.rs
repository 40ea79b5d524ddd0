//! API response types.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use foodgram_common::AppSettings;
use foodgram_db::Page;
use serde::{Deserialize, Serialize};

/// Page-number pagination parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum.
    pub limit: Option<u64>,
}

impl PageParams {
    /// Resolve to `(offset, limit)`.
    #[must_use]
    pub fn resolve(&self, settings: &AppSettings, default_limit: u64) -> (u64, u64) {
        let limit = settings.clamp_limit(self.limit, default_limit);
        let page = self.page.unwrap_or(1).max(1);
        ((page - 1).saturating_mul(limit), limit)
    }
}

/// Paginated list body.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub count: u64,
    pub results: Vec<T>,
}

impl<T: Serialize> From<Page<T>> for Paginated<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            count: page.total,
            results: page.items,
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `201 Created` with a JSON body.
#[derive(Debug)]
pub struct Created<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// Plain-text file download.
#[derive(Debug)]
pub struct TextAttachment {
    pub file_name: String,
    pub content: String,
}

impl IntoResponse for TextAttachment {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.file_name),
                ),
            ],
            self.content,
        )
            .into_response()
    }
}

/// Empty success response.
#[must_use]
pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
