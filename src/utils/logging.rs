//! 日志工具模块
//!
//! 提供 tracing 初始化、面向用户的 [`Logger`] 以及日志格式化辅助函数

use std::time::Duration;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 面向用户的输出
///
/// 所有用户可见的文字都通过它输出，便于测试时替换为记录器
pub trait Logger: Send + Sync {
    /// 普通信息
    fn log(&self, message: &str);
    /// 详细信息（仅在 verbose 模式下可见）
    fn vlog(&self, message: &str);
}

/// 基于 tracing 的 Logger
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        info!("{}", message);
    }

    fn vlog(&self, message: &str) {
        debug!("{}", message);
    }
}

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，其余为 info
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录上传开始
pub fn log_upload_start(logger: &dyn Logger, project: &str, suite: &str) {
    logger.log(&"=".repeat(60));
    logger.log(&format!(
        "🚀 开始上传 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    logger.log(&format!("📁 项目: {}", project));
    logger.log(&format!("📦 测试套件: {}", suite));
    logger.log(&"=".repeat(60));
}

/// 记录阶段完成
pub fn log_stage_done(logger: &dyn Logger, stage: &str, detail: &str) {
    logger.log(&format!("✓ {}: {}", stage, detail));
}

/// 打印耗时统计
pub fn print_elapsed(logger: &dyn Logger, total: Duration, cases: Duration, results: Duration) {
    logger.log(&"─".repeat(60));
    logger.log(&format!("执行耗时: {}", format_duration(total)));
    logger.log(&format!("添加测试用例耗时: {}", format_duration(cases)));
    logger.log(&format!("添加测试结果耗时: {}", format_duration(results)));
    logger.log(&"─".repeat(60));
}

/// 秒数保留两位小数
pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("登录页面测试", 2), "登录...");
        assert_eq!(truncate_text("abc", 5), "abc");
    }
}
