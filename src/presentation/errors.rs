// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::application::usecases::submit_analysis::SubmitError;

/// API错误类型
///
/// 统一的HTTP错误出口，响应体固定为 {error, code, details}
#[derive(Error, Debug)]
pub enum ApiError {
    /// 请求体未通过校验
    #[error("{0}")]
    InvalidInput(String),

    /// URL被安全校验拒绝
    #[error("{0}")]
    SsrfRejected(String),

    /// 触发限流
    #[error("Rate limit exceeded: maximum 5 requests per 15 minutes")]
    RateLimitExceeded,

    /// 等待队列已满
    #[error("Analysis queue is full, please try again later")]
    QueueFull,

    /// 资源不存在
    #[error("Not found")]
    NotFound,

    /// 结果已过期
    #[error("The analysis result has expired")]
    Gone,

    /// 内部错误，细节只进日志不出接口
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::SsrfRejected(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimitExceeded | ApiError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Gone => StatusCode::GONE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::SsrfRejected(_) => "SSRF_REJECTED",
            ApiError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ApiError::QueueFull => "QUEUE_FULL",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Gone => "RESULT_EXPIRED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            error!("Internal error: {:#}", e);
        }
        let status = self.status();
        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
            "details": null,
        });
        (status, Json(body)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(msg) => ApiError::InvalidInput(msg),
            SubmitError::UnsafeUrl(e) => ApiError::SsrfRejected(e.to_string()),
            SubmitError::RateLimited(_) => ApiError::RateLimitExceeded,
            SubmitError::Admission(_) => ApiError::QueueFull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_classes() {
        assert_eq!(
            ApiError::InvalidInput("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::RateLimitExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::QueueFull.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Gone.status(), StatusCode::GONE);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ApiError::Gone.code(), "RESULT_EXPIRED");
        assert_eq!(ApiError::QueueFull.code(), "QUEUE_FULL");
    }
}
