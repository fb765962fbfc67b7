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

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::domain::models::report::{CrawlSummary, PageSnapshot};
use crate::engines::traits::{EngineError, SiteCrawler};
use crate::utils::validators;

/// 基于reqwest的站点爬取引擎
///
/// 从目标URL做同站广度优先爬取，为每个页面提取SEO信号。
/// 每个待跟进的链接都重新通过主机安全检查，防御首次校验后的
/// DNS重绑定和跳转到内网目标。
pub struct ReqwestCrawler {
    client: reqwest::Client,
}

impl ReqwestCrawler {
    /// 创建新的爬取引擎实例
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("seors/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, EngineError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| EngineError::Crawl(format!("request to {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| EngineError::Crawl(format!("{} returned an error status: {}", url, e)))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.is_empty() && !content_type.contains("text/html") {
            return Err(EngineError::Crawl(format!(
                "{} is not an HTML page ({})",
                url, content_type
            )));
        }

        response
            .text()
            .await
            .map_err(|e| EngineError::Crawl(format!("failed to read body of {}: {}", url, e)))
    }
}

/// 解析单个页面，返回SEO信号快照和页面上发现的链接
///
/// 同步函数：`scraper::Html`不是Send，必须在下一个await点之前释放
pub(crate) fn parse_page(page_url: &Url, html: &str) -> (PageSnapshot, Vec<Url>) {
    let document = Html::parse_document(html);

    let title_sel = Selector::parse("title").unwrap();
    let meta_sel = Selector::parse("meta[name='description']").unwrap();
    let h1_sel = Selector::parse("h1").unwrap();
    let body_sel = Selector::parse("body").unwrap();
    let img_sel = Selector::parse("img").unwrap();
    let link_sel = Selector::parse("a[href]").unwrap();

    let title = document
        .select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let meta_description = document
        .select(&meta_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let h1 = document
        .select(&h1_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    let word_count = document
        .select(&body_sel)
        .next()
        .map(|body| body.text().flat_map(str::split_whitespace).count())
        .unwrap_or(0);

    let images_missing_alt = document
        .select(&img_sel)
        .filter(|img| {
            img.value()
                .attr("alt")
                .map(|alt| alt.trim().is_empty())
                .unwrap_or(true)
        })
        .count();

    let page_host = page_url.host_str().map(str::to_string);
    let mut internal_links = 0;
    let mut external_links = 0;
    let mut links = Vec::new();

    for href in document
        .select(&link_sel)
        .filter_map(|el| el.value().attr("href"))
    {
        let Ok(resolved) = page_url.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if resolved.host_str().map(str::to_string) == page_host {
            internal_links += 1;
        } else {
            external_links += 1;
        }
        links.push(resolved);
    }

    let snapshot = PageSnapshot {
        url: page_url.to_string(),
        title,
        meta_description,
        h1,
        word_count,
        internal_links,
        external_links,
        images_missing_alt,
    };

    (snapshot, links)
}

#[async_trait]
impl SiteCrawler for ReqwestCrawler {
    async fn crawl(&self, target: &Url, max_pages: usize) -> Result<CrawlSummary, EngineError> {
        let root_host = target
            .host_str()
            .ok_or_else(|| EngineError::Crawl("target URL has no host".to_string()))?
            .to_string();

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<Url> = VecDeque::new();
        let mut pages: Vec<PageSnapshot> = Vec::new();
        frontier.push_back(target.clone());

        while let Some(url) = frontier.pop_front() {
            if pages.len() >= max_pages {
                break;
            }
            let mut dedup_key = url.clone();
            dedup_key.set_fragment(None);
            if !visited.insert(dedup_key.to_string()) {
                continue;
            }

            let body = match self.fetch_page(&url).await {
                Ok(body) => body,
                Err(e) => {
                    // The root page failing means there is nothing to analyze;
                    // deeper pages are skipped individually
                    if pages.is_empty() {
                        return Err(e);
                    }
                    warn!("Skipping page {}: {}", url, e);
                    continue;
                }
            };

            let (snapshot, links) = parse_page(&url, &body);
            debug!(
                "Crawled {} ({} words, {} links)",
                snapshot.url,
                snapshot.word_count,
                links.len()
            );
            pages.push(snapshot);

            for link in links {
                // Same-host only, and every followed link passes the host
                // safety check again
                if link.host_str() == Some(root_host.as_str())
                    && validators::is_safe_link(&link)
                {
                    frontier.push_back(link);
                }
            }
        }

        let pages_crawled = pages.len();
        Ok(CrawlSummary {
            root_url: target.to_string(),
            pages,
            pages_crawled,
        })
    }
}
