// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 单个页面的SEO信号快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// 页面URL
    pub url: String,
    /// 页面标题
    pub title: Option<String>,
    /// meta description内容
    pub meta_description: Option<String>,
    /// 页面上的h1文本
    pub h1: Vec<String>,
    /// 正文词数
    pub word_count: usize,
    /// 站内链接数
    pub internal_links: usize,
    /// 站外链接数
    pub external_links: usize,
    /// 缺少alt文本的图片数
    pub images_missing_alt: usize,
}

/// 一次站点爬取的汇总结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSummary {
    /// 爬取起点URL
    pub root_url: String,
    /// 已抓取页面的快照
    pub pages: Vec<PageSnapshot>,
    /// 实际抓取的页面数
    pub pages_crawled: usize,
}

/// AI分析给出的单条改进建议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// 建议标题
    pub title: String,
    /// 具体说明
    #[serde(default)]
    pub detail: String,
    /// 优先级（high/medium/low）
    #[serde(default)]
    pub priority: String,
}

/// 单个关键词的覆盖洞察
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordInsight {
    /// 关键词
    pub keyword: String,
    /// 站点当前对该关键词的覆盖情况
    #[serde(default)]
    pub coverage: String,
    /// 改进建议
    #[serde(default)]
    pub suggestion: String,
}

/// AI分析阶段的结构化输出
///
/// 由Gemini以JSON返回并解析得到；缺失字段取默认值，
/// 以容忍模型输出的轻微偏差
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    /// 总体SEO评分（0-100）
    pub overall_score: u8,
    /// 分析摘要
    #[serde(default)]
    pub summary: String,
    /// 改进建议列表
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    /// 逐关键词洞察
    #[serde(default)]
    pub keyword_insights: Vec<KeywordInsight>,
}
