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

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::models::task::{AnalysisInput, AnalysisOptions, BusinessInfo};

/// 分析请求DTO
///
/// URL的结构在这里校验，可达性与SSRF安全在用例层校验
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalyzeRequestDto {
    /// 待分析的站点URL
    #[validate(url(message = "url must be a valid URL"))]
    pub url: String,

    /// 业务背景信息
    #[validate(nested)]
    pub business_info: BusinessInfoDto,

    /// 目标关键词，去除空白后3-10个
    #[validate(custom(function = "validate_keywords"))]
    pub keywords: Vec<String>,

    /// 分析选项
    #[validate(nested)]
    #[serde(default)]
    pub options: AnalysisOptionsDto,
}

/// 业务背景DTO
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BusinessInfoDto {
    /// 行业或细分领域
    #[validate(length(min = 2, max = 100, message = "industry must be 2-100 characters"))]
    pub industry: String,

    /// 目标受众描述
    #[validate(length(
        min = 2,
        max = 200,
        message = "target_audience must be 2-200 characters"
    ))]
    pub target_audience: String,

    /// 地理服务范围（可选）
    #[validate(length(max = 100, message = "location must be at most 100 characters"))]
    pub location: Option<String>,
}

/// 分析选项DTO
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalysisOptionsDto {
    /// 是否在AI分析中包含竞争对手角度
    #[serde(default)]
    pub include_competitor_analysis: bool,

    /// 爬取页数上限
    #[validate(range(min = 1, max = 100, message = "max_pages must be between 1 and 100"))]
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// 可选的Google OAuth令牌透传
    pub google_auth_token: Option<String>,
}

impl Default for AnalysisOptionsDto {
    fn default() -> Self {
        Self {
            include_competitor_analysis: false,
            max_pages: default_max_pages(),
            google_auth_token: None,
        }
    }
}

fn default_max_pages() -> u32 {
    50
}

/// 校验关键词列表：去除空白后必须剩3-10个非空项
fn validate_keywords(keywords: &Vec<String>) -> Result<(), ValidationError> {
    let meaningful = keywords.iter().filter(|k| !k.trim().is_empty()).count();
    if !(3..=10).contains(&meaningful) {
        return Err(ValidationError::new("keywords")
            .with_message("keywords must contain 3-10 non-empty keywords".into()));
    }
    Ok(())
}

impl AnalyzeRequestDto {
    /// 固化为不可变的分析输入，关键词去除空白
    pub fn into_input(self) -> AnalysisInput {
        AnalysisInput {
            url: self.url,
            business_info: BusinessInfo {
                industry: self.business_info.industry,
                target_audience: self.business_info.target_audience,
                location: self.business_info.location,
            },
            keywords: self
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            options: AnalysisOptions {
                include_competitor_analysis: self.options.include_competitor_analysis,
                max_pages: self.options.max_pages,
                google_auth_token: self.options.google_auth_token,
            },
        }
    }
}
