// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::debug;

use crate::application::dto::analyze_request::AnalyzeRequestDto;
use crate::application::dto::analyze_response::{AnalyzeResponseDto, ESTIMATED_TOTAL};
use crate::application::usecases::submit_analysis::SubmitAnalysisUseCase;
use crate::presentation::errors::ApiError;
use crate::presentation::extractors::client_id::ClientId;

/// 提交分析任务
///
/// POST /api/v1/analyze
pub async fn analyze(
    Extension(use_case): Extension<Arc<SubmitAnalysisUseCase>>,
    ClientId(client_id): ClientId,
    Json(request): Json<AnalyzeRequestDto>,
) -> Result<(StatusCode, Json<AnalyzeResponseDto>), ApiError> {
    debug!("Analyze request from {} for {}", client_id, request.url);

    let task = use_case.submit(&client_id, request).await?;

    let response = AnalyzeResponseDto {
        task_id: task.id,
        status: task.status.to_string(),
        estimated_time: ESTIMATED_TOTAL.to_string(),
        status_url: format!("/api/v1/status/{}", task.id),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}
