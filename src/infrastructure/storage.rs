// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 报告工件存储特质
///
/// 键是相对文件名（例如"{task_id}.md"），由结果存储分配
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// 保存工件
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// 读取工件，不存在时返回None
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// 删除工件，不存在视为已删除
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// 本地文件系统存储
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait]
impl ArtifactStorage for LocalStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let path = self.path_for(key);
        tokio::fs::write(&path, data).await?;
        debug!("Saved artifact {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
