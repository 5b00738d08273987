//! # TestRail Upload
//!
//! 把本地测试结果上传到 TestRail 的命令行工具
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 连接，只暴露 `send` 能力
//! - `Transport` - 传输层抽象，测试中可替换为脚本化实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ApiClient` - 远端 API 调用与字段提取
//! - `Prompter` - 是/否确认
//! - `ProgressReporter` - 批量请求进度
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"与远端对齐"的完整流程
//! - `UploadContext` - 日志 / 确认 / 进度 / 中断信号
//! - `ReconciliationEngine` - 项目 → 套件 → 分区 → 用例
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_submitter` - 有界并发的批量提交，快速失败并回收在途结果
//! - `orchestrator/upload_orchestrator` - 七个阶段的上传流水线
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{FatalError, UploadResult, UploadStage};
pub use infrastructure::{HttpTransport, Transport};
pub use models::{EntityStore, Suite};
pub use orchestrator::{BatchSubmitter, UploadOrchestrator, UploadSummary};
pub use workflow::{ReconciliationEngine, UploadContext};
