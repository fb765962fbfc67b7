// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use uuid::Uuid;

/// 准入错误类型
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// 等待队列已满，提交被直接拒绝而不是无界增长
    #[error("Analysis queue is full")]
    QueueFull,

    /// 队列已关闭
    #[error("Analysis queue is closed")]
    Closed,
}

/// 工作器共享的任务接收端
pub type TaskReceiver = Arc<Mutex<mpsc::Receiver<Uuid>>>;

/// 有界FIFO准入队列
///
/// 提交端为任务分配等待位；K个分析工作器共享接收端，
/// 处理槽位空出时按FIFO顺序取走下一个任务ID。
/// 同时处理数由工作器数量约束，等待数由通道容量约束。
pub struct AdmissionQueue {
    tx: mpsc::Sender<Uuid>,
}

impl AdmissionQueue {
    /// 创建队列，返回队列与共享接收端
    ///
    /// # 参数
    ///
    /// * `queue_capacity` - 等待队列容量，必须大于0
    pub fn new(queue_capacity: usize) -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        (Self { tx }, Arc::new(Mutex::new(rx)))
    }

    /// 提交任务ID进入等待队列
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 已入队
    /// * `Err(AdmissionError)` - 队列已满或已关闭
    pub fn submit(&self, task_id: Uuid) -> Result<(), AdmissionError> {
        self.tx.try_send(task_id).map_err(|err| match err {
            TrySendError::Full(_) => AdmissionError::QueueFull,
            TrySendError::Closed(_) => AdmissionError::Closed,
        })
    }
}
