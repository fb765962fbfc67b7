// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::config::settings::GeminiSettings;
use crate::domain::models::report::{AiAnalysis, CrawlSummary};
use crate::domain::models::task::{AnalysisInput, BackendKind};
use crate::engines::traits::{AiAnalyzer, EngineError};

/// 瞬时失败的阶段内重试次数上限
const MAX_RETRIES: u32 = 2;
/// 首次重试前的退避时间（毫秒）
const INITIAL_BACKOFF_MS: u64 = 500;

/// Gemini分析引擎
///
/// 通过REST API调用Gemini对爬取结果做SEO评分。模型由配额管理器
/// 选定的后端决定；对429和5xx做有界的指数退避重试，重试只发生在
/// 本阶段内部，编排器看到的是单次成败。
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base_url: String,
    primary_model: String,
    fallback_model: String,
}

impl GeminiAnalyzer {
    /// 从配置创建新的分析引擎实例
    ///
    /// API密钥允许缺失（健康检查报告degraded），
    /// 实际调用时才返回错误
    pub fn new(settings: &GeminiSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            primary_model: settings.primary_model.clone(),
            fallback_model: settings.fallback_model.clone(),
        })
    }

    fn model_for(&self, backend: BackendKind) -> &str {
        match backend {
            BackendKind::Primary => &self.primary_model,
            BackendKind::Fallback => &self.fallback_model,
        }
    }

    /// 构建分析提示词
    ///
    /// 包含业务背景、目标关键词和逐页SEO信号；要求模型只输出
    /// 符合固定schema的JSON
    fn build_prompt(crawl: &CrawlSummary, input: &AnalysisInput) -> String {
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "You are an SEO expert. Analyze the website {} for a business in the {} industry \
             targeting {}.",
            crawl.root_url, input.business_info.industry, input.business_info.target_audience
        );
        if let Some(location) = &input.business_info.location {
            let _ = writeln!(prompt, "The business serves: {}.", location);
        }
        let _ = writeln!(prompt, "Target keywords: {}.", input.keywords.join(", "));
        if input.options.include_competitor_analysis {
            let _ = writeln!(
                prompt,
                "Also comment on how the site likely compares to competitors ranking for these \
                 keywords."
            );
        }
        let _ = writeln!(
            prompt,
            "\nCrawled {} page(s). Per-page SEO signals:",
            crawl.pages_crawled
        );
        for page in &crawl.pages {
            let _ = writeln!(
                prompt,
                "- {} | title: {} | meta description: {} | h1 count: {} | words: {} | \
                 internal links: {} | images missing alt: {}",
                page.url,
                page.title.as_deref().unwrap_or("(missing)"),
                page.meta_description.as_deref().unwrap_or("(missing)"),
                page.h1.len(),
                page.word_count,
                page.internal_links,
                page.images_missing_alt,
            );
        }
        let _ = writeln!(
            prompt,
            "\nReturn ONLY a valid JSON object, no markdown formatting, with this shape: \
             {{\"overall_score\": <0-100>, \"summary\": <string>, \
             \"recommendations\": [{{\"title\": <string>, \"detail\": <string>, \
             \"priority\": <\"high\"|\"medium\"|\"low\">}}], \
             \"keyword_insights\": [{{\"keyword\": <string>, \"coverage\": <string>, \
             \"suggestion\": <string>}}]}}"
        );
        prompt
    }

    /// 从Gemini响应中取出文本并解析为结构化分析
    fn parse_response(value: &Value) -> Result<AiAnalysis, EngineError> {
        let text = value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::Analysis("Gemini response contained no candidate text".to_string())
            })?;
        serde_json::from_str(strip_code_fences(text)).map_err(|e| {
            EngineError::Analysis(format!("Gemini returned unparseable JSON: {}", e))
        })
    }
}

/// 剥离模型偶尔包裹的Markdown代码围栏
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_prefix = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_prefix
        .strip_suffix("```")
        .unwrap_or(without_prefix)
        .trim()
}

#[async_trait]
impl AiAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        backend: BackendKind,
        crawl: &CrawlSummary,
        input: &AnalysisInput,
    ) -> Result<AiAnalysis, EngineError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            EngineError::Analysis("Gemini API key not configured".to_string())
        })?;

        let model = self.model_for(backend);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base_url, model, api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": Self::build_prompt(crawl, input) }] }],
            "generationConfig": {
                "temperature": 0.2,
                "responseMimeType": "application/json"
            }
        });

        let mut attempt: u32 = 0;
        loop {
            let result = self.client.post(&url).json(&body).send().await;
            match result {
                Ok(response) if response.status().is_success() => {
                    let value: Value = response.json().await.map_err(|e| {
                        EngineError::Analysis(format!("failed to read Gemini response: {}", e))
                    })?;
                    return Self::parse_response(&value);
                }
                Ok(response) => {
                    let status = response.status();
                    let transient =
                        status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if transient && attempt < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
                        warn!(
                            "Gemini ({}) returned {}, retrying in {}ms",
                            model, status, backoff_ms
                        );
                        attempt += 1;
                        sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }
                    return Err(EngineError::Analysis(format!(
                        "Gemini ({}) returned status {}",
                        model, status
                    )));
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
                        warn!("Gemini request failed ({}), retrying in {}ms", e, backoff_ms);
                        attempt += 1;
                        sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }
                    return Err(EngineError::Analysis(format!(
                        "Gemini request failed: {}",
                        e
                    )));
                }
            }
        }
    }
}
