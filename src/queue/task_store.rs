// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{
    AnalysisTask, BackendKind, DomainError, FailureKind, TaskStatus,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

/// 任务表错误类型
#[derive(Error, Debug)]
pub enum TaskStoreError {
    /// 未找到任务
    #[error("Task not found")]
    NotFound,

    /// 领域错误
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// 内存任务表
///
/// 任务记录的唯一持有者。所有写入都经由本表的方法在对应条目的
/// 分片锁内完成（单写者），其他组件只能拿到只读快照。
#[derive(Default)]
pub struct TaskStore {
    tasks: DashMap<Uuid, AnalysisTask>,
}

impl TaskStore {
    /// 创建新的任务表实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入新任务
    pub fn insert(&self, task: AnalysisTask) {
        self.tasks.insert(task.id, task);
    }

    /// 移除任务记录
    ///
    /// 任务记录随其结果一并删除，或在准入失败时回滚
    pub fn remove(&self, id: Uuid) -> Option<AnalysisTask> {
        self.tasks.remove(&id).map(|(_, task)| task)
    }

    /// 获取任务的只读快照
    pub fn snapshot(&self, id: Uuid) -> Option<AnalysisTask> {
        self.tasks.get(&id).map(|task| task.clone())
    }

    /// 当前任务数
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// 任务表是否为空
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 在条目锁内对单个任务执行一次写操作
    fn with_task<F>(&self, id: Uuid, f: F) -> Result<(), TaskStoreError>
    where
        F: FnOnce(&mut AnalysisTask) -> Result<(), DomainError>,
    {
        let mut entry = self.tasks.get_mut(&id).ok_or(TaskStoreError::NotFound)?;
        f(&mut entry)?;
        Ok(())
    }

    /// 将任务标记为处理中
    pub fn mark_processing(&self, id: Uuid) -> Result<(), TaskStoreError> {
        self.with_task(id, |task| task.start())
    }

    /// 推进任务进度
    pub fn advance(&self, id: Uuid, progress: u8, step: &str) -> Result<(), TaskStoreError> {
        self.with_task(id, |task| task.advance(progress, step))
    }

    /// 记录选定的AI后端
    pub fn assign_backend(&self, id: Uuid, backend: BackendKind) -> Result<(), TaskStoreError> {
        self.with_task(id, |task| task.assign_backend(backend))
    }

    /// 将任务标记为完成
    pub fn mark_complete(&self, id: Uuid) -> Result<(), TaskStoreError> {
        self.with_task(id, |task| task.complete())
    }

    /// 将任务标记为失败
    pub fn mark_failed(
        &self,
        id: Uuid,
        kind: FailureKind,
        reason: String,
    ) -> Result<(), TaskStoreError> {
        self.with_task(id, |task| task.fail(kind, reason))
    }

    /// 列出在截止时间之前就已失败的任务
    ///
    /// 失败任务没有结果条目，由清扫按同一保留期修剪，
    /// 避免任务表无界增长
    pub fn failed_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<Uuid> {
        self.tasks
            .iter()
            .filter(|entry| {
                entry.status == TaskStatus::Failed
                    && entry.finished_at.is_some_and(|at| at <= cutoff)
            })
            .map(|entry| entry.id)
            .collect()
    }
}
