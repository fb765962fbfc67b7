// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::Path;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::infrastructure::result_store::{ResultStore, ResultStoreError};
use crate::presentation::errors::ApiError;

/// 下载分析报告
///
/// GET /api/v1/download/{task_id}
pub async fn download(
    Extension(results): Extension<Arc<ResultStore>>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (_entry, artifact) = results.get(task_id, Utc::now()).await.map_err(|e| match e {
        ResultStoreError::NotFound => ApiError::NotFound,
        ResultStoreError::Expired => ApiError::Gone,
        ResultStoreError::Storage(e) => ApiError::Internal(e.into()),
    })?;

    let headers = [
        (CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"seo-report-{}.md\"", task_id),
        ),
    ];
    Ok((StatusCode::OK, headers, artifact))
}
