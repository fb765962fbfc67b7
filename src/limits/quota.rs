// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::BackendKind;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use thiserror::Error;

/// 配额错误类型
#[derive(Error, Debug)]
pub enum QuotaError {
    /// 两个后端的当日配额均已耗尽
    #[error("Daily quota exhausted for all AI backends")]
    Exhausted,
}

/// 单个后端的每日配额计数器
///
/// 以UTC日历日为键；重置是"观测到新的一天"的纯函数，
/// 不依赖定时器
#[derive(Debug)]
struct QuotaCounter {
    day: NaiveDate,
    count: u32,
    limit: u32,
}

impl QuotaCounter {
    fn new(limit: u32, today: NaiveDate) -> Self {
        Self {
            day: today,
            count: 0,
            limit,
        }
    }

    /// 将计数器对齐到观测到的UTC日期，跨日即清零
    fn reconcile(&mut self, today: NaiveDate) {
        if self.day != today {
            self.day = today;
            self.count = 0;
        }
    }

    fn try_consume(&mut self) -> bool {
        if self.count < self.limit {
            self.count += 1;
            true
        } else {
            false
        }
    }
}

/// 每日配额管理器
///
/// 跟踪主/回退两个AI后端的当日调用数。选择与计数递增在
/// 同一把锁内原子完成，同一单位配额不会被两个调用者消费。
pub struct QuotaManager {
    counters: Mutex<(QuotaCounter, QuotaCounter)>,
}

impl QuotaManager {
    /// 创建新的配额管理器实例
    ///
    /// # 参数
    ///
    /// * `primary_limit` - 主后端每日上限
    /// * `fallback_limit` - 回退后端每日上限
    pub fn new(primary_limit: u32, fallback_limit: u32) -> Self {
        let today = Utc::now().date_naive();
        Self {
            counters: Mutex::new((
                QuotaCounter::new(primary_limit, today),
                QuotaCounter::new(fallback_limit, today),
            )),
        }
    }

    /// 选择一个尚有配额的后端并消费一个单位
    ///
    /// 先将两个计数器对齐到`now`的UTC日期，再按主→回退的顺序尝试。
    /// 耗尽时请求方应立即失败，当日不会再有容量出现。
    ///
    /// # 参数
    ///
    /// * `now` - 当前时间，由调用方传入
    ///
    /// # 返回值
    ///
    /// * `Ok(BackendKind)` - 选定的后端，配额已扣减
    /// * `Err(QuotaError)` - 两个后端均已耗尽
    pub fn select_backend(&self, now: DateTime<Utc>) -> Result<BackendKind, QuotaError> {
        let today = now.date_naive();
        let mut counters = self.counters.lock();
        counters.0.reconcile(today);
        counters.1.reconcile(today);

        if counters.0.try_consume() {
            Ok(BackendKind::Primary)
        } else if counters.1.try_consume() {
            Ok(BackendKind::Fallback)
        } else {
            Err(QuotaError::Exhausted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn primary_first_then_fallback_then_exhausted() {
        let quota = QuotaManager::new(2, 1);
        let now = Utc::now();
        assert_eq!(quota.select_backend(now).unwrap(), BackendKind::Primary);
        assert_eq!(quota.select_backend(now).unwrap(), BackendKind::Primary);
        assert_eq!(quota.select_backend(now).unwrap(), BackendKind::Fallback);
        assert!(quota.select_backend(now).is_err());
    }

    #[test]
    fn utc_day_rollover_resets_counters() {
        let quota = QuotaManager::new(1, 0);
        let now = Utc::now();
        assert_eq!(quota.select_backend(now).unwrap(), BackendKind::Primary);
        assert!(quota.select_backend(now).is_err());
        let tomorrow = now + Duration::days(1);
        assert_eq!(
            quota.select_backend(tomorrow).unwrap(),
            BackendKind::Primary
        );
    }

    #[test]
    fn zero_limits_are_immediately_exhausted() {
        let quota = QuotaManager::new(0, 0);
        assert!(matches!(
            quota.select_backend(Utc::now()),
            Err(QuotaError::Exhausted)
        ));
    }
}
