//! 用户确认服务 - 业务能力层
//!
//! 只负责"问用户是否继续"，不关心问的是什么

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tracing::warn;

/// 是/否确认
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// 固定回答（对应 `--yes` / `--no`）
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompter {
    answer: bool,
}

impl AutoPrompter {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

#[async_trait]
impl Prompter for AutoPrompter {
    async fn confirm(&self, _message: &str) -> bool {
        self.answer
    }
}

/// 从终端读取回答
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

#[async_trait]
impl Prompter for StdinPrompter {
    async fn confirm(&self, message: &str) -> bool {
        let message = message.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(stdout, "{} [y/N]: ", message)?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                warn!("读取用户输入失败: {}", e);
                false
            }
            Err(e) => {
                warn!("确认任务执行失败: {}", e);
                false
            }
        }
    }
}

/// 只有 y / yes（不区分大小写）算同意
pub fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_auto_prompter() {
        assert!(tokio_test::block_on(AutoPrompter::new(true).confirm("继续?")));
        assert!(!tokio_test::block_on(AutoPrompter::new(false).confirm("继续?")));
    }
}
