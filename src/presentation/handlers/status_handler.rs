// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::Path;
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::analyze_response::{estimate_remaining, StatusResponseDto};
use crate::config::settings::Settings;
use crate::domain::models::task::{FailureKind, TaskStatus};
use crate::infrastructure::result_store::ResultStore;
use crate::presentation::errors::ApiError;
use crate::queue::task_store::TaskStore;

/// 查询任务状态
///
/// GET /api/v1/status/{task_id}
pub async fn status(
    Extension(store): Extension<Arc<TaskStore>>,
    Extension(results): Extension<Arc<ResultStore>>,
    Extension(settings): Extension<Arc<Settings>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<StatusResponseDto>, ApiError> {
    let task = store.snapshot(task_id).ok_or(ApiError::NotFound)?;

    let mut response = StatusResponseDto {
        task_id: task.id,
        status: task.status.to_string(),
        progress: task.progress,
        current_step: task.current_step.clone(),
        estimated_time_remaining: None,
        download_url: None,
        expires_at: None,
        error: None,
    };

    match task.status {
        TaskStatus::Queued | TaskStatus::Processing => {
            response.estimated_time_remaining =
                Some(estimate_remaining(task.progress).to_string());
        }
        TaskStatus::Complete => {
            if let Some(entry) = results.entry(task_id) {
                response.download_url = Some(format!("/api/v1/download/{}", task_id));
                response.expires_at = Some(entry.expires_at);
            }
        }
        TaskStatus::Failed => {
            // Quota and timeout messages are safe to show as recorded;
            // stage errors may carry upstream detail, so outside debug
            // mode they collapse to a generic message.
            let verbatim = matches!(
                task.failure_kind,
                Some(FailureKind::QuotaExhausted) | Some(FailureKind::Timeout)
            ) || settings.server.debug;
            response.error = if verbatim {
                task.error.clone()
            } else {
                Some("Analysis failed, please try again later".to_string())
            };
        }
    }

    Ok(Json(response))
}
