use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::infrastructure::metrics::RESULTS_SWEPT;
use crate::infrastructure::result_store::ResultStore;
use crate::limits::rate_limiter::SlidingWindowLimiter;
use crate::queue::task_store::TaskStore;

/// 结果过期清理工作器
///
/// 定期清扫过期的结果条目及其磁盘工件，并一并移除对应的任务
/// 记录；没有结果的失败任务在同样的保留期后被修剪，
/// 限流器中整窗过期的客户端日志也在同一轮回收
pub struct ExpirationWorker {
    results: Arc<ResultStore>,
    store: Arc<TaskStore>,
    limiter: Arc<SlidingWindowLimiter>,
    retention: ChronoDuration,
    interval: Duration,
}

impl ExpirationWorker {
    pub fn new(
        results: Arc<ResultStore>,
        store: Arc<TaskStore>,
        limiter: Arc<SlidingWindowLimiter>,
        retention: ChronoDuration,
    ) -> Self {
        Self {
            results,
            store,
            limiter,
            retention,
            interval: Duration::from_secs(5 * 60), // 每5分钟运行一次
        }
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!("Result expiration worker started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            let count = self.sweep_once(Utc::now()).await;
            if count > 0 {
                info!("Cleaned up {} expired results", count);
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// 执行一轮清扫，返回回收的条目数
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let removed = self.results.sweep(now).await;
        for task_id in &removed {
            self.store.remove(*task_id);
        }

        // Failed tasks never registered a result; prune them once they
        // age past the same retention window.
        let mut pruned = 0usize;
        for task_id in self.store.failed_finished_before(now - self.retention) {
            if self.store.remove(task_id).is_some() {
                pruned += 1;
            }
        }

        let evicted = self.limiter.prune_stale(now);
        if evicted > 0 {
            debug!("Evicted {} stale rate-limit windows", evicted);
        }

        let total = removed.len() + pruned;
        if total > 0 {
            counter!(RESULTS_SWEPT).increment(total as u64);
        }
        total
    }
}

#[cfg(test)]
#[path = "expiration_worker_test.rs"]
mod tests;
