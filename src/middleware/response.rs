use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::session::Notice;

/// Success envelope: `{"success": true, "data": ..., "notices": [...]}`.
///
/// Notices queued on the session ride along with whatever the handler
/// returns, so a message raised by one request shows on the next page.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
    pub notices: Vec<Notice>,
    pub set_cookie: Option<HeaderValue>,
    pub location: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
            notices: Vec::new(),
            set_cookie: None,
            location: None,
        }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::success(data)
        }
    }

    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    /// 303 to `location`, the way form posts hand the browser its next page.
    pub fn see_other(data: T, location: &'static str) -> Self {
        Self {
            location: Some(location),
            ..Self::with_status(data, StatusCode::SEE_OTHER)
        }
    }

    pub fn notices(mut self, notices: impl IntoIterator<Item = Notice>) -> Self {
        self.notices.extend(notices);
        self
    }

    pub fn notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    pub fn cookie(mut self, value: Option<HeaderValue>) -> Self {
        self.set_cookie = value;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        let envelope = json!({
            "success": true,
            "data": data_value,
            "notices": self.notices,
        });

        let mut response = (status, Json(envelope)).into_response();
        let headers = response.headers_mut();
        if let Some(cookie) = self.set_cookie {
            headers.insert(header::SET_COOKIE, cookie);
        }
        if let Some(location) = self.location {
            headers.insert(header::LOCATION, HeaderValue::from_static(location));
        }
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
