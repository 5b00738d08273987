//! 上传上下文
//!
//! 把日志、确认、进度和中断信号打包，传入每个组件的构造函数

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::services::{NoProgress, ProgressReporter, Prompter};
use crate::utils::Logger;

/// 上传上下文
#[derive(Clone)]
pub struct UploadContext {
    pub logger: Arc<dyn Logger>,
    pub prompter: Arc<dyn Prompter>,
    pub progress: Arc<dyn ProgressReporter>,
    /// 外部中断信号（Ctrl-C）
    pub interrupt: CancellationToken,
}

impl UploadContext {
    pub fn new(
        logger: Arc<dyn Logger>,
        prompter: Arc<dyn Prompter>,
        progress: Arc<dyn ProgressReporter>,
        interrupt: CancellationToken,
    ) -> Self {
        Self {
            logger,
            prompter,
            progress,
            interrupt,
        }
    }

    /// 不显示进度条、没有外部中断源的上下文
    pub fn quiet(logger: Arc<dyn Logger>, prompter: Arc<dyn Prompter>) -> Self {
        Self::new(logger, prompter, Arc::new(NoProgress), CancellationToken::new())
    }

    /// 询问用户；等待期间收到中断信号时立即返回 false
    pub async fn confirm(&self, message: &str) -> bool {
        tokio::select! {
            biased;
            _ = self.interrupt.cancelled() => false,
            answer = self.prompter.confirm(message) => answer,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    pub fn log(&self, message: &str) {
        self.logger.log(message);
    }

    pub fn vlog(&self, message: &str) {
        self.logger.vlog(message);
    }
}
