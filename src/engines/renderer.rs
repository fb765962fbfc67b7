// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use std::fmt::Write as _;

use crate::domain::models::report::{AiAnalysis, CrawlSummary};
use crate::domain::models::task::AnalysisInput;
use crate::engines::traits::{EngineError, ReportRenderer};

/// Markdown报告渲染器
///
/// 把爬取摘要和AI分析拼装成最终的报告制品，纯函数、无IO
pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer {
    fn render(
        &self,
        input: &AnalysisInput,
        crawl: &CrawlSummary,
        analysis: &AiAnalysis,
    ) -> Result<Vec<u8>, EngineError> {
        let mut out = String::new();
        let w = &mut out;

        let _ = writeln!(w, "# SEO Analysis Report");
        let _ = writeln!(w);
        let _ = writeln!(w, "- **Website:** {}", input.url);
        let _ = writeln!(w, "- **Industry:** {}", input.business_info.industry);
        let _ = writeln!(
            w,
            "- **Target audience:** {}",
            input.business_info.target_audience
        );
        if let Some(location) = &input.business_info.location {
            let _ = writeln!(w, "- **Location:** {}", location);
        }
        let _ = writeln!(w, "- **Generated:** {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(w);

        let _ = writeln!(w, "## Overall Score: {}/100", analysis.overall_score);
        let _ = writeln!(w);
        let _ = writeln!(w, "{}", analysis.summary);
        let _ = writeln!(w);

        let _ = writeln!(w, "## Crawl Overview");
        let _ = writeln!(w);
        let _ = writeln!(w, "Pages analyzed: {}", crawl.pages_crawled);
        let _ = writeln!(w);

        if !analysis.recommendations.is_empty() {
            let _ = writeln!(w, "## Recommendations");
            let _ = writeln!(w);
            for rec in &analysis.recommendations {
                let _ = writeln!(w, "### {} ({})", rec.title, rec.priority);
                let _ = writeln!(w);
                let _ = writeln!(w, "{}", rec.detail);
                let _ = writeln!(w);
            }
        }

        if !analysis.keyword_insights.is_empty() {
            let _ = writeln!(w, "## Keyword Insights");
            let _ = writeln!(w);
            let _ = writeln!(w, "| Keyword | Coverage | Suggestion |");
            let _ = writeln!(w, "|---|---|---|");
            for insight in &analysis.keyword_insights {
                let _ = writeln!(
                    w,
                    "| {} | {} | {} |",
                    insight.keyword, insight.coverage, insight.suggestion
                );
            }
            let _ = writeln!(w);
        }

        let _ = writeln!(w, "## Page Findings");
        let _ = writeln!(w);
        for page in &crawl.pages {
            let _ = writeln!(w, "### {}", page.url);
            let _ = writeln!(w);
            let _ = writeln!(
                w,
                "- Title: {}",
                page.title.as_deref().unwrap_or("*missing*")
            );
            let _ = writeln!(
                w,
                "- Meta description: {}",
                page.meta_description.as_deref().unwrap_or("*missing*")
            );
            let _ = writeln!(w, "- H1 headings: {}", page.h1.len());
            let _ = writeln!(w, "- Word count: {}", page.word_count);
            let _ = writeln!(
                w,
                "- Links: {} internal / {} external",
                page.internal_links, page.external_links
            );
            if page.images_missing_alt > 0 {
                let _ = writeln!(
                    w,
                    "- Images missing alt text: {}",
                    page.images_missing_alt
                );
            }
            let _ = writeln!(w);
        }

        Ok(out.into_bytes())
    }
}
