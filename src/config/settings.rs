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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 进程启动时构建一次，校验后以不可变引用传入各组件，
/// 不提供任何全局可变查找
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 速率限制配置
    pub rate_limiting: RateLimitingSettings,
    /// 并发控制配置
    pub concurrency: ConcurrencySettings,
    /// Gemini后端配置
    pub gemini: GeminiSettings,
    /// 分析流程配置
    pub analysis: AnalysisSettings,
    /// 结果存储配置
    pub storage: StorageSettings,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 调试模式：失败任务的原始错误原因是否对客户端可见
    pub debug: bool,
}

/// 速率限制配置设置
#[derive(Debug, Deserialize)]
pub struct RateLimitingSettings {
    /// 滑动窗口长度（秒）
    pub window_secs: u64,
    /// 窗口内每个客户端允许的最大请求数
    pub max_requests: usize,
}

/// 并发控制配置设置
#[derive(Debug, Deserialize)]
pub struct ConcurrencySettings {
    /// 同时处理的分析任务上限（工作器数量）
    pub max_concurrent_analyses: usize,
    /// 等待队列容量，超出后直接拒绝提交
    pub queue_capacity: usize,
}

/// Gemini后端配置设置
#[derive(Debug, Deserialize)]
pub struct GeminiSettings {
    /// API密钥，未配置时健康检查报告degraded
    pub api_key: Option<String>,
    /// REST API基础URL
    pub api_base_url: String,
    /// 主模型名称
    pub primary_model: String,
    /// 主模型每日调用上限
    pub primary_daily_limit: u32,
    /// 回退模型名称
    pub fallback_model: String,
    /// 回退模型每日调用上限
    pub fallback_daily_limit: u32,
}

/// 分析流程配置设置
#[derive(Debug, Deserialize)]
pub struct AnalysisSettings {
    /// 单站点爬取页数上限（请求中的max_pages会被截断到此值）
    pub max_pages_per_site: u32,
    /// 单个任务的总时间预算（秒），超出后强制失败
    pub task_timeout_secs: u64,
}

/// 结果存储配置设置
#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    /// 报告工件的本地目录
    pub results_dir: String,
    /// 结果保留时长（小时）
    pub retention_hours: i64,
}

impl GeminiSettings {
    /// 判断Gemini API是否已配置
    pub fn is_configured(&self) -> bool {
        matches!(&self.api_key, Some(key) if key.len() > 10)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载并通过校验的配置
    /// * `Err(ConfigError)` - 配置加载或校验失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("server.debug", true)?
            // Default Rate Limiting settings: 5 requests per 15 minutes
            .set_default("rate_limiting.window_secs", 900)?
            .set_default("rate_limiting.max_requests", 5)?
            // Default Concurrency settings
            .set_default("concurrency.max_concurrent_analyses", 3)?
            .set_default("concurrency.queue_capacity", 10)?
            // Default Gemini settings (free tier daily limits)
            .set_default(
                "gemini.api_base_url",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("gemini.primary_model", "gemini-1.5-flash")?
            .set_default("gemini.primary_daily_limit", 1500)?
            .set_default("gemini.fallback_model", "gemini-1.5-pro")?
            .set_default("gemini.fallback_daily_limit", 50)?
            // Default Analysis settings
            .set_default("analysis.max_pages_per_site", 50)?
            .set_default("analysis.task_timeout_secs", 900)?
            // Default Storage settings
            .set_default("storage.results_dir", "/tmp/seors-results")?
            .set_default("storage.retention_hours", 24)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SEORS").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// 校验配置取值范围
    ///
    /// 所有配置在启动时一次性校验，之后不可变
    fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limiting.max_requests == 0 {
            return Err(ConfigError::Message(
                "rate_limiting.max_requests must be at least 1".into(),
            ));
        }
        if self.rate_limiting.window_secs == 0 {
            return Err(ConfigError::Message(
                "rate_limiting.window_secs must be at least 1".into(),
            ));
        }
        if self.concurrency.max_concurrent_analyses == 0 {
            return Err(ConfigError::Message(
                "concurrency.max_concurrent_analyses must be at least 1".into(),
            ));
        }
        if self.concurrency.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "concurrency.queue_capacity must be at least 1".into(),
            ));
        }
        if self.analysis.max_pages_per_site == 0 || self.analysis.max_pages_per_site > 100 {
            return Err(ConfigError::Message(
                "analysis.max_pages_per_site must be between 1 and 100".into(),
            ));
        }
        if self.analysis.task_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "analysis.task_timeout_secs must be at least 1".into(),
            ));
        }
        if self.storage.retention_hours <= 0 {
            return Err(ConfigError::Message(
                "storage.retention_hours must be positive".into(),
            ));
        }
        Ok(())
    }
}
