// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 分析任务实体
///
/// 表示一次客户端发起的站点SEO分析，从提交跟踪到终态。
/// 任务ID在提交时生成，不可变且永不复用；输入在提交后不可变；
/// 进度在任务内单调不减。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisTask {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 任务状态，跟踪任务在其生命周期中的当前阶段
    pub status: TaskStatus,
    /// 进度百分比（0-100），单调不减
    pub progress: u8,
    /// 当前阶段的人类可读标签
    pub current_step: Option<String>,
    /// 提交时间
    pub submitted_at: DateTime<Utc>,
    /// 准入开始处理的时间
    pub started_at: Option<DateTime<Utc>>,
    /// 到达终态的时间
    pub finished_at: Option<DateTime<Utc>>,
    /// 失败原因（仅status=failed时存在），逐字记录用于诊断
    pub error: Option<String>,
    /// 失败类别（仅status=failed时存在）
    pub failure_kind: Option<FailureKind>,
    /// 分析输入，提交后不可变
    pub input: AnalysisInput,
    /// 配额管理器为AI分析阶段选定的后端
    pub chosen_backend: Option<BackendKind>,
}

/// 分析输入
///
/// 提交时固化，之后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// 待分析的站点URL
    pub url: String,
    /// 业务背景信息
    pub business_info: BusinessInfo,
    /// 目标关键词（已去除空白，3-10个）
    pub keywords: Vec<String>,
    /// 分析选项
    pub options: AnalysisOptions,
}

/// 业务背景信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessInfo {
    /// 行业或细分领域
    pub industry: String,
    /// 目标受众描述
    pub target_audience: String,
    /// 地理服务范围（可选）
    pub location: Option<String>,
}

/// 分析选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// 是否在AI分析中包含竞争对手角度
    pub include_competitor_analysis: bool,
    /// 爬取页数上限
    pub max_pages: u32,
    /// 可选的Google OAuth令牌透传
    pub google_auth_token: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_competitor_analysis: false,
            max_pages: 50,
            google_auth_token: None,
        }
    }
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Queued → Processing → Complete/Failed
/// 终态没有出边；Failed可以从任何进行中的阶段到达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 已入队，任务已创建但尚未获得处理槽位
    #[default]
    Queued,
    /// 处理中，任务正在执行分析阶段
    Processing,
    /// 已完成，报告工件已注册
    Complete,
    /// 已失败，error字段记录原因
    Failed,
}

impl TaskStatus {
    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Complete => write!(f, "complete"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "processing" => Ok(TaskStatus::Processing),
            "complete" => Ok(TaskStatus::Complete),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(()),
        }
    }
}

/// AI后端类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// 主后端，每日配额较大
    Primary,
    /// 回退后端，主配额耗尽后使用
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendKind::Primary => write!(f, "primary"),
            BackendKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// 失败类别
///
/// 决定失败原因对客户端的暴露策略：配额耗尽和超时始终原样返回，
/// 阶段失败在非调试模式下只返回通用消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 两个AI后端的当日配额均已耗尽
    QuotaExhausted,
    /// 超出任务时间预算
    Timeout,
    /// 某个阶段的外部协作者出错
    Stage,
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换，当任务状态转换不符合生命周期规则时发生
    #[error("Invalid state transition")]
    InvalidStateTransition,
}

impl AnalysisTask {
    /// 创建一个新的分析任务
    ///
    /// # 参数
    ///
    /// * `input` - 固化后的分析输入
    ///
    /// # 返回值
    ///
    /// 返回状态为Queued的新任务
    pub fn new(input: AnalysisInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TaskStatus::Queued,
            progress: 0,
            current_step: None,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
            failure_kind: None,
            input,
            chosen_backend: None,
        }
    }

    /// 启动任务
    ///
    /// 将任务状态从Queued变更为Processing，准入即发生
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 转换成功
    /// * `Err(DomainError)` - 状态转换失败
    pub fn start(&mut self) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Queued => {
                self.status = TaskStatus::Processing;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 推进任务进度
    ///
    /// 进度只增不减，超过100会被截断；只有处理中的任务可以推进
    ///
    /// # 参数
    ///
    /// * `progress` - 新的进度百分比
    /// * `step` - 当前阶段的人类可读标签
    pub fn advance(&mut self, progress: u8, step: &str) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Processing => {
                self.progress = self.progress.max(progress.min(100));
                self.current_step = Some(step.to_string());
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 记录配额管理器选定的后端
    pub fn assign_backend(&mut self, backend: BackendKind) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Processing => {
                self.chosen_backend = Some(backend);
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 完成任务
    ///
    /// 将任务状态从Processing变更为Complete；终态恰好到达一次
    pub fn complete(&mut self) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Processing => {
                self.status = TaskStatus::Complete;
                self.progress = 100;
                self.current_step = None;
                self.finished_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 标记任务失败
    ///
    /// Failed可以从Queued或Processing到达（例如提交后尚未准入即被判定失败）
    ///
    /// # 参数
    ///
    /// * `kind` - 失败类别
    /// * `reason` - 逐字记录的失败原因
    pub fn fail(&mut self, kind: FailureKind, reason: String) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Queued | TaskStatus::Processing => {
                self.status = TaskStatus::Failed;
                self.error = Some(reason);
                self.failure_kind = Some(kind);
                self.current_step = None;
                self.finished_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }
}
