//! 进度反馈服务 - 业务能力层

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

/// 批量请求的进度反馈
///
/// 只由编排线程调用，工作任务不直接推进进度
pub trait ProgressReporter: Send + Sync {
    fn start(&self, prefix: &str, total: u64);
    fn advance(&self, delta: u64);
    fn finish(&self, message: &str);
}

/// 不输出任何进度
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _prefix: &str, _total: u64) {}
    fn advance(&self, _delta: u64) {}
    fn finish(&self, _message: &str) {}
}

/// 终端进度条
#[derive(Default)]
pub struct IndicatifProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for IndicatifProgress {
    fn start(&self, prefix: &str, total: u64) {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{prefix}: {wide_bar:.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(prefix.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn advance(&self, delta: u64) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(delta);
            }
        }
    }

    fn finish(&self, message: &str) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_with_message(message.to_string());
            }
        }
    }
}
