//! 传输层抽象
//!
//! 只负责"发一次请求"：方法 + 路径 + 请求体 → 解码后的 JSON 或错误字符串。
//! 从不重试。

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// 传输层
///
/// 实现必须可以在多个工作任务之间共享
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;
}
