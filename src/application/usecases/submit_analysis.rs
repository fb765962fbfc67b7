// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use validator::Validate;

use crate::application::dto::analyze_request::AnalyzeRequestDto;
use crate::config::settings::Settings;
use crate::domain::models::task::AnalysisTask;
use crate::infrastructure::metrics::{QUEUE_REJECTED, RATE_LIMITED, TASKS_SUBMITTED};
use crate::limits::rate_limiter::{RateLimitError, SlidingWindowLimiter};
use crate::queue::admission::{AdmissionError, AdmissionQueue};
use crate::queue::task_store::TaskStore;
use crate::utils::validators;

/// 提交失败错误
#[derive(Error, Debug)]
pub enum SubmitError {
    /// 请求体未通过结构校验
    #[error("{0}")]
    Validation(String),

    /// URL未通过安全校验
    #[error(transparent)]
    UnsafeUrl(#[from] validators::ValidationError),

    /// 触发限流
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    /// 等待队列已满或已关闭
    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

/// 提交分析用例
///
/// 汇聚提交路径上的所有准入检查：结构校验 → URL安全 → 限流 →
/// 建立任务记录 → FIFO队列准入。队列拒绝时回滚任务记录，
/// 不留下永久排队的孤儿任务
pub struct SubmitAnalysisUseCase {
    settings: Arc<Settings>,
    limiter: Arc<SlidingWindowLimiter>,
    store: Arc<TaskStore>,
    queue: AdmissionQueue,
}

impl SubmitAnalysisUseCase {
    pub fn new(
        settings: Arc<Settings>,
        limiter: Arc<SlidingWindowLimiter>,
        store: Arc<TaskStore>,
        queue: AdmissionQueue,
    ) -> Self {
        Self {
            settings,
            limiter,
            store,
            queue,
        }
    }

    /// 提交一次分析
    ///
    /// 成功时返回已入队的任务快照
    pub async fn submit(
        &self,
        client_id: &str,
        request: AnalyzeRequestDto,
    ) -> Result<AnalysisTask, SubmitError> {
        request
            .validate()
            .map_err(|e| SubmitError::Validation(e.to_string()))?;

        validators::validate_url(&request.url).await?;

        if let Err(e) = self.limiter.admit(client_id, Utc::now()) {
            counter!(RATE_LIMITED).increment(1);
            return Err(e.into());
        }

        let mut input = request.into_input();
        input.options.max_pages = input
            .options
            .max_pages
            .min(self.settings.analysis.max_pages_per_site);

        let task = AnalysisTask::new(input);
        let task_id = task.id;
        self.store.insert(task.clone());

        if let Err(e) = self.queue.submit(task_id) {
            // Roll the record back so a rejected submission leaves no trace.
            self.store.remove(task_id);
            counter!(QUEUE_REJECTED).increment(1);
            return Err(e.into());
        }

        counter!(TASKS_SUBMITTED).increment(1);
        info!("Task {} queued for {}", task_id, task.input.url);
        Ok(task)
    }
}
