// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 提交分析任务的估计总时长
pub const ESTIMATED_TOTAL: &str = "15 minutes";

/// 根据进度估算剩余时间
pub fn estimate_remaining(progress: u8) -> &'static str {
    match progress {
        0..=32 => "10 minutes",
        33..=65 => "5 minutes",
        _ => "1 minute",
    }
}

/// 提交响应DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponseDto {
    pub task_id: Uuid,
    pub status: String,
    pub estimated_time: String,
    pub status_url: String,
}

/// 状态查询响应DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponseDto {
    pub task_id: Uuid,
    pub status: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 健康检查响应DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponseDto {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub gemini_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time_shrinks_with_progress() {
        assert_eq!(estimate_remaining(0), "10 minutes");
        assert_eq!(estimate_remaining(33), "5 minutes");
        assert_eq!(estimate_remaining(66), "1 minute");
        assert_eq!(estimate_remaining(100), "1 minute");
    }

    #[test]
    fn status_response_omits_absent_fields() {
        let dto = StatusResponseDto {
            task_id: Uuid::new_v4(),
            status: "queued".to_string(),
            progress: 0,
            current_step: None,
            estimated_time_remaining: None,
            download_url: None,
            expires_at: None,
            error: None,
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("download_url").is_none());
    }
}
