//! 流程层（Workflow）
//!
//! 定义"让远端与本地一致"的完整流程，以及贯穿各组件的上下文

pub mod reconciliation;
pub mod upload_ctx;

pub use reconciliation::{ReconcileOutcome, ReconciliationEngine, ReconciliationResult};
pub use upload_ctx::UploadContext;
