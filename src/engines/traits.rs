// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::{AiAnalysis, CrawlSummary};
use crate::domain::models::task::{AnalysisInput, BackendKind};
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// 引擎错误类型
///
/// 外部协作者的单次阶段失败；编排器不做跨阶段重试，
/// 协作者可以在自己的阶段内部重试
#[derive(Error, Debug)]
pub enum EngineError {
    /// 爬取失败
    #[error("Crawl failed: {0}")]
    Crawl(String),

    /// AI分析失败
    #[error("AI analysis failed: {0}")]
    Analysis(String),

    /// 报告渲染失败
    #[error("Report rendering failed: {0}")]
    Render(String),
}

/// 站点爬取引擎特质
#[async_trait]
pub trait SiteCrawler: Send + Sync {
    /// 从目标URL出发爬取同站页面，提取SEO信号
    ///
    /// # 参数
    ///
    /// * `target` - 爬取起点，提交时已通过安全校验
    /// * `max_pages` - 页数上限
    async fn crawl(&self, target: &Url, max_pages: usize) -> Result<CrawlSummary, EngineError>;
}

/// AI分析引擎特质
#[async_trait]
pub trait AiAnalyzer: Send + Sync {
    /// 用指定后端对爬取结果做SEO评分与建议
    ///
    /// # 参数
    ///
    /// * `backend` - 配额管理器选定的后端，决定使用的模型
    /// * `crawl` - 爬取汇总
    /// * `input` - 业务背景与关键词
    async fn analyze(
        &self,
        backend: BackendKind,
        crawl: &CrawlSummary,
        input: &AnalysisInput,
    ) -> Result<AiAnalysis, EngineError>;
}

/// 报告渲染器特质
pub trait ReportRenderer: Send + Sync {
    /// 将爬取结果和AI分析渲染为报告工件
    fn render(
        &self,
        input: &AnalysisInput,
        crawl: &CrawlSummary,
        analysis: &AiAnalysis,
    ) -> Result<Vec<u8>, EngineError>;
}
