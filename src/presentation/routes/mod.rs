// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    routing::{get, post},
    Extension, Json,
};
use axum::Router;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::dto::analyze_response::HealthResponseDto;
use crate::config::settings::Settings;
use crate::presentation::handlers::{analyze_handler, download_handler, status_handler};

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let api_routes = Router::new()
        .route("/api/v1/analyze", post(analyze_handler::analyze))
        .route("/api/v1/status/{task_id}", get(status_handler::status))
        .route("/api/v1/download/{task_id}", get(download_handler::download));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// API信息端点
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "SEO Analysis API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "analyze": "POST /api/v1/analyze",
            "status": "GET /api/v1/status/{task_id}",
            "download": "GET /api/v1/download/{task_id}",
        },
    }))
}

/// 健康检查端点
///
/// Gemini密钥未配置时服务降级但仍可接受请求
pub async fn health_check(
    Extension(settings): Extension<Arc<Settings>>,
) -> Json<HealthResponseDto> {
    let gemini_available = settings.gemini.is_configured();
    Json(HealthResponseDto {
        status: if gemini_available {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        gemini_available,
    })
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
