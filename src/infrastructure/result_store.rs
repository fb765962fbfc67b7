// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::infrastructure::storage::{ArtifactStorage, StorageError};

/// 结果存储错误类型
#[derive(Error, Debug)]
pub enum ResultStoreError {
    /// 结果不存在（未知任务、已清扫、或磁盘工件丢失）
    #[error("Result not found")]
    NotFound,

    /// 结果已过期但尚未被清扫
    #[error("Result has expired")]
    Expired,

    /// 底层存储失败
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 结果条目
///
/// 任务完成时登记，保留期满后随工件一起被清扫
#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub task_id: Uuid,
    pub artifact_key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub download_count: u64,
}

impl ResultEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 结果存储
///
/// 内存条目表加工件存储。读取路径先做实时过期判定再碰磁盘，
/// 保证过期结果在清扫之前就不可下载
pub struct ResultStore {
    entries: DashMap<Uuid, ResultEntry>,
    storage: Arc<dyn ArtifactStorage>,
    retention: Duration,
}

impl ResultStore {
    pub fn new(storage: Arc<dyn ArtifactStorage>, retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            storage,
            retention,
        }
    }

    /// 保存报告工件并登记结果条目
    pub async fn put(
        &self,
        task_id: Uuid,
        artifact: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ResultEntry, ResultStoreError> {
        let key = format!("{}.md", task_id);
        self.storage.save(&key, artifact).await?;
        let entry = ResultEntry {
            task_id,
            artifact_key: key,
            created_at: now,
            expires_at: now + self.retention,
            download_count: 0,
        };
        self.entries.insert(task_id, entry.clone());
        debug!("Stored result for task {} (expires {})", task_id, entry.expires_at);
        Ok(entry)
    }

    /// 条目快照，不读磁盘、不计下载
    pub fn entry(&self, task_id: Uuid) -> Option<ResultEntry> {
        self.entries.get(&task_id).map(|e| e.clone())
    }

    /// 读取结果工件
    ///
    /// 过期条目即使尚未被清扫也返回`Expired`；条目存在但磁盘
    /// 工件缺失（与清扫竞态）报告`NotFound`，绝不返回陈旧数据
    pub async fn get(
        &self,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(ResultEntry, Vec<u8>), ResultStoreError> {
        let entry = {
            let mut guard = self
                .entries
                .get_mut(&task_id)
                .ok_or(ResultStoreError::NotFound)?;
            if guard.is_expired(now) {
                return Err(ResultStoreError::Expired);
            }
            guard.download_count += 1;
            guard.clone()
        };

        match self.storage.read(&entry.artifact_key).await? {
            Some(data) => Ok((entry, data)),
            None => {
                warn!("Result entry for task {} has no artifact on disk", task_id);
                Err(ResultStoreError::NotFound)
            }
        }
    }

    /// 清扫过期结果
    ///
    /// 删除过期条目及其磁盘工件，返回被回收的任务id，
    /// 调用方据此一并移除对应的任务记录
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let expired: Vec<(Uuid, String)> = self
            .entries
            .iter()
            .filter(|e| e.is_expired(now))
            .map(|e| (e.task_id, e.artifact_key.clone()))
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for (task_id, key) in expired {
            if let Err(e) = self.storage.delete(&key).await {
                warn!("Failed to delete expired artifact {}: {}", key, e);
                continue;
            }
            self.entries.remove(&task_id);
            removed.push(task_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::LocalStorage;

    fn store_with_retention(dir: &std::path::Path, hours: i64) -> ResultStore {
        ResultStore::new(Arc::new(LocalStorage::new(dir)), Duration::hours(hours))
    }

    #[tokio::test]
    async fn get_returns_artifact_and_counts_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_retention(dir.path(), 24);
        let id = Uuid::new_v4();
        let now = Utc::now();

        store.put(id, b"# Report", now).await.unwrap();
        let (entry, data) = store.get(id, now).await.unwrap();
        assert_eq!(data, b"# Report");
        assert_eq!(entry.download_count, 1);

        let (entry, _) = store.get(id, now).await.unwrap();
        assert_eq!(entry.download_count, 2);
    }

    #[tokio::test]
    async fn expired_entry_is_rejected_before_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_retention(dir.path(), 1);
        let id = Uuid::new_v4();
        let created = Utc::now();

        store.put(id, b"# Report", created).await.unwrap();
        let later = created + Duration::hours(2);
        assert!(matches!(
            store.get(id, later).await,
            Err(ResultStoreError::Expired)
        ));
        // Entry still registered until the sweep runs.
        assert!(store.entry(id).is_some());
    }

    #[tokio::test]
    async fn sweep_removes_entry_and_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_retention(dir.path(), 1);
        let id = Uuid::new_v4();
        let created = Utc::now();

        store.put(id, b"# Report", created).await.unwrap();
        assert_eq!(store.len(), 1);
        let later = created + Duration::hours(2);
        let removed = store.sweep(later).await;
        assert_eq!(removed, vec![id]);
        assert!(store.is_empty());

        assert!(matches!(
            store.get(id, later).await,
            Err(ResultStoreError::NotFound)
        ));
        assert!(!dir.path().join(format!("{}.md", id)).exists());
    }

    #[tokio::test]
    async fn sweep_leaves_fresh_entries_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_retention(dir.path(), 24);
        let id = Uuid::new_v4();
        let now = Utc::now();

        store.put(id, b"# Report", now).await.unwrap();
        let removed = store.sweep(now + Duration::hours(1)).await;
        assert!(removed.is_empty());
        assert!(store.get(id, now + Duration::hours(1)).await.is_ok());
    }
}
