// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::models::task::FailureKind;
use crate::engines::traits::{AiAnalyzer, EngineError, ReportRenderer, SiteCrawler};
use crate::infrastructure::metrics::{QUOTA_SELECTED, TASKS_COMPLETED, TASKS_FAILED};
use crate::infrastructure::result_store::{ResultStore, ResultStoreError};
use crate::limits::quota::{QuotaError, QuotaManager};
use crate::queue::admission::TaskReceiver;
use crate::queue::task_store::{TaskStore, TaskStoreError};

/// 阶段执行错误
///
/// 携带失败分类，工作器据此在任务上记录失败原因
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Invalid target URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Daily AI quota exhausted, please try again tomorrow")]
    QuotaExhausted,

    #[error(transparent)]
    Store(#[from] TaskStoreError),

    #[error("Failed to store the report: {0}")]
    ResultStore(#[from] ResultStoreError),
}

impl StageError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            StageError::QuotaExhausted => FailureKind::QuotaExhausted,
            _ => FailureKind::Stage,
        }
    }
}

/// 分析工作器
///
/// 从共享的准入队列领取任务，按 爬取 → AI分析 → 渲染报告 的顺序
/// 推进任务，整个流程受单任务期限约束
pub struct AnalysisWorker {
    store: Arc<TaskStore>,
    results: Arc<ResultStore>,
    quota: Arc<QuotaManager>,
    crawler: Arc<dyn SiteCrawler>,
    analyzer: Arc<dyn AiAnalyzer>,
    renderer: Arc<dyn ReportRenderer>,
    max_pages_cap: u32,
    task_timeout: Duration,
    worker_id: Uuid,
}

impl AnalysisWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<TaskStore>,
        results: Arc<ResultStore>,
        quota: Arc<QuotaManager>,
        crawler: Arc<dyn SiteCrawler>,
        analyzer: Arc<dyn AiAnalyzer>,
        renderer: Arc<dyn ReportRenderer>,
        max_pages_cap: u32,
        task_timeout: Duration,
    ) -> Self {
        Self {
            store,
            results,
            quota,
            crawler,
            analyzer,
            renderer,
            max_pages_cap,
            task_timeout,
            worker_id: Uuid::new_v4(),
        }
    }

    /// 运行工作器循环
    ///
    /// 接收端由K个工作器共享，通道关闭时退出
    pub async fn run(&self, receiver: TaskReceiver) {
        info!("Analysis worker {} started", self.worker_id);

        loop {
            // Hold the receiver lock only for the recv itself so that
            // sibling workers can pick up tasks while this one processes.
            let task_id = {
                let mut rx = receiver.lock().await;
                rx.recv().await
            };
            let Some(task_id) = task_id else {
                info!("Analysis worker {} stopping: queue closed", self.worker_id);
                break;
            };
            self.process_task(task_id).await;
        }
    }

    #[instrument(skip(self), fields(worker_id = %self.worker_id))]
    async fn process_task(&self, task_id: Uuid) {
        if let Err(e) = self.store.mark_processing(task_id) {
            // The task may have been swept while it sat in the queue.
            warn!("Skipping task {}: {}", task_id, e);
            return;
        }

        match tokio::time::timeout(self.task_timeout, self.run_stages(task_id)).await {
            Ok(Ok(artifact)) => match self.finalize(task_id, artifact).await {
                Ok(()) => {
                    counter!(TASKS_COMPLETED).increment(1);
                    info!("Task {} completed", task_id);
                }
                Err(e) => self.finish_failed(task_id, e.failure_kind(), e.to_string()),
            },
            Ok(Err(stage_err)) => {
                self.finish_failed(task_id, stage_err.failure_kind(), stage_err.to_string());
            }
            Err(_) => {
                self.finish_failed(
                    task_id,
                    FailureKind::Timeout,
                    format!(
                        "Task exceeded the {}s deadline",
                        self.task_timeout.as_secs()
                    ),
                );
            }
        }
    }

    async fn run_stages(&self, task_id: Uuid) -> Result<Vec<u8>, StageError> {
        let input = self
            .store
            .snapshot(task_id)
            .ok_or(TaskStoreError::NotFound)?
            .input;

        self.store.advance(task_id, 0, "Crawling website")?;
        let target = Url::parse(&input.url)?;
        let max_pages = input.options.max_pages.min(self.max_pages_cap) as usize;
        let crawl = self.crawler.crawl(&target, max_pages).await?;

        self.store.advance(task_id, 33, "Running AI analysis")?;
        let backend = self
            .quota
            .select_backend(chrono::Utc::now())
            .map_err(|QuotaError::Exhausted| StageError::QuotaExhausted)?;
        counter!(QUOTA_SELECTED, "backend" => backend.to_string()).increment(1);
        self.store.assign_backend(task_id, backend)?;
        let analysis = self.analyzer.analyze(backend, &crawl, &input).await?;

        self.store.advance(task_id, 66, "Generating report")?;
        let artifact = self.renderer.render(&input, &crawl, &analysis)?;
        Ok(artifact)
    }

    /// 登记结果并翻转任务状态
    ///
    /// 在期限范围之外执行，期限不能把任务留在
    /// "已登记结果但未完成"的状态上
    async fn finalize(&self, task_id: Uuid, artifact: Vec<u8>) -> Result<(), StageError> {
        self.results
            .put(task_id, &artifact, chrono::Utc::now())
            .await?;
        self.store.mark_complete(task_id)?;
        Ok(())
    }

    fn finish_failed(&self, task_id: Uuid, kind: FailureKind, reason: String) {
        error!("Task {} failed ({:?}): {}", task_id, kind, reason);
        counter!(TASKS_FAILED).increment(1);
        if let Err(e) = self.store.mark_failed(task_id, kind, reason) {
            error!("Could not record failure for task {}: {}", task_id, e);
        }
    }
}
