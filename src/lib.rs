// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含提交流水线的用例和HTTP数据传输对象
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体：分析任务及其生命周期状态机
pub mod domain;

/// 引擎模块
///
/// 外部协作者的适配器：站点爬取、AI分析和报告渲染
pub mod engines;

/// 基础设施模块
///
/// 提供工件存储、结果保存与过期、指标导出等能力
pub mod infrastructure;

/// 限额模块
///
/// 实现滑动窗口限流和每日AI配额管理
pub mod limits;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由、处理器和提取器
pub mod presentation;

/// 队列模块
///
/// 实现任务表和有界FIFO准入队列
pub mod queue;

/// 工具模块
///
/// 提供URL安全校验和遥测初始化
pub mod utils;

/// 工作器模块
///
/// 实现分析阶段驱动和后台清扫工作器
pub mod workers;
