// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::engines::traits::{AiAnalyzer, ReportRenderer, SiteCrawler};
use crate::infrastructure::result_store::ResultStore;
use crate::limits::quota::QuotaManager;
use crate::queue::admission::TaskReceiver;
use crate::queue::task_store::TaskStore;
use crate::workers::analysis_worker::AnalysisWorker;

/// 工作管理器
///
/// 启动K个分析工作器共享同一个队列接收端，
/// 工作器数量即同时处理任务数的上限
pub struct WorkerManager {
    store: Arc<TaskStore>,
    results: Arc<ResultStore>,
    quota: Arc<QuotaManager>,
    crawler: Arc<dyn SiteCrawler>,
    analyzer: Arc<dyn AiAnalyzer>,
    renderer: Arc<dyn ReportRenderer>,
    max_pages_cap: u32,
    task_timeout: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
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
            handles: Vec::new(),
        }
    }

    /// 启动工作进程
    ///
    /// 创建并启动指定数量的分析工作器
    ///
    /// # 参数
    ///
    /// * `count` - 要启动的工作器数量
    /// * `receiver` - 所有工作器共享的队列接收端
    pub fn start_workers(&mut self, count: usize, receiver: TaskReceiver) {
        for _ in 0..count {
            let worker = AnalysisWorker::new(
                self.store.clone(),
                self.results.clone(),
                self.quota.clone(),
                self.crawler.clone(),
                self.analyzer.clone(),
                self.renderer.clone(),
                self.max_pages_cap,
                self.task_timeout,
            );

            let receiver = receiver.clone();
            // We spawn the worker loop on a separate task to avoid blocking the main thread
            // or the loop that spawns workers.
            let handle = tokio::spawn(async move {
                worker.run(receiver).await;
            });
            self.handles.push(handle);
        }
        info!("Started {} analysis workers", count);
    }

    /// 关闭工作进程
    ///
    /// 中止所有工作器循环；队列里尚未领取的任务保持排队状态
    pub fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Workers shut down successfully");
    }
}
