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

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use thiserror::Error;

/// 速率限制错误类型
#[derive(Error, Debug)]
pub enum RateLimitError {
    /// 请求过多错误
    #[error("Too many requests")]
    TooManyRequests,
}

/// 滑动窗口速率限制器
///
/// 为每个客户端标识维护一份窗口内的请求时间戳日志。
/// 准入时先丢弃窗口外的时间戳，再比较剩余数量与容量；
/// 记录与判定在同一个条目锁内完成，不同客户端互不争用。
pub struct SlidingWindowLimiter {
    /// 每客户端的时间戳日志
    windows: DashMap<String, VecDeque<DateTime<Utc>>>,
    /// 窗口长度
    window: Duration,
    /// 窗口内的请求容量
    capacity: usize,
}

impl SlidingWindowLimiter {
    /// 创建新的滑动窗口限制器实例
    ///
    /// # 参数
    ///
    /// * `window` - 窗口长度
    /// * `capacity` - 窗口内每个客户端允许的最大请求数
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            capacity,
        }
    }

    /// 检查并记录一次请求
    ///
    /// # 参数
    ///
    /// * `client_id` - 客户端标识
    /// * `now` - 当前时间，由调用方传入
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 请求被允许，时间戳已记录
    /// * `Err(RateLimitError)` - 窗口内请求数已达容量
    pub fn admit(&self, client_id: &str, now: DateTime<Utc>) -> Result<(), RateLimitError> {
        // The entry guard serializes prune-check-record for this client
        let mut log = self.windows.entry(client_id.to_string()).or_default();
        let cutoff = now - self.window;
        while log.front().is_some_and(|t| *t <= cutoff) {
            log.pop_front();
        }
        if log.len() >= self.capacity {
            return Err(RateLimitError::TooManyRequests);
        }
        log.push_back(now);
        Ok(())
    }

    /// 清理所有时间戳都已滑出窗口的客户端条目
    ///
    /// 准入路径只修剪当前客户端自己的日志；不再回访的客户端
    /// 由周期清扫回收，客户端标识来自请求方，映射不能无界增长。
    /// 返回被移除的条目数
    pub fn prune_stale(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, log| log.back().is_some_and(|t| *t > cutoff));
        before - self.windows.len()
    }
}
