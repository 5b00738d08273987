//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_submitter` - 批量提交器
//! - 有界工作池并发执行一批互不依赖的请求
//! - 第一个失败后取消尚未开始的请求，回收已在途的结果
//! - 响应外部中断（Ctrl-C）
//!
//! ### `upload_orchestrator` - 上传编排器
//! - 按顺序执行七个阶段
//! - 任一阶段失败即记录诊断并终止
//! - 输出耗时统计
//!
//! ## 层次关系
//!
//! ```text
//! upload_orchestrator (七个阶段)
//!     ↓
//! workflow::ReconciliationEngine (项目 / 套件 / 分区 / 用例对齐)
//!     ↓
//! batch_submitter (并发创建)
//!     ↓
//! services (能力层：api_client / prompter / progress)
//!     ↓
//! infrastructure (基础设施：Transport)
//! ```

pub mod batch_submitter;
pub mod upload_orchestrator;

pub use batch_submitter::{BatchKind, BatchOutcome, BatchSubmitter};
pub use upload_orchestrator::{UploadOrchestrator, UploadSummary};
