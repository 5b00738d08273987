//! 基于 reqwest 的 HTTP 传输层

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::TransportError;
use crate::infrastructure::transport::{Method, Transport};

/// HTTP 传输层
///
/// 请求地址为 `{host}/index.php?/api/v2/{path}`，使用 Basic 认证
pub struct HttpTransport {
    client: Client,
    base_url: String,
    username: String,
    secret: Option<String>,
}

impl HttpTransport {
    /// 根据配置创建传输层
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::new(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client,
            base_url: api_base_url(&config.host),
            username: config.username.clone(),
            secret: config.key.clone().or_else(|| config.password.clone()),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .basic_auth(&self.username, self.secret.as_deref())
        .header(CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::new(format!("请求 {} 失败: {}", path, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("读取 {} 响应失败: {}", path, e)))?;

        if !status.is_success() {
            return Err(TransportError::new(error_message(path, status.as_u16(), &text)));
        }

        if text.trim().is_empty() {
            return Ok(json!({}));
        }

        serde_json::from_str(&text)
            .map_err(|e| TransportError::new(format!("无法解析 {} 的响应: {}", path, e)))
    }
}

fn api_base_url(host: &str) -> String {
    format!("{}/index.php?/api/v2/", host.trim_end_matches('/'))
}

/// 从错误响应中提取可读信息，优先使用 `error` 字段
fn error_message(path: &str, status: u16, text: &str) -> String {
    let detail = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string());

    if detail.is_empty() {
        format!("{} 返回状态码 {}", path, status)
    } else {
        format!("{} 返回状态码 {}: {}", path, status, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_url_strips_trailing_slash() {
        assert_eq!(
            api_base_url("https://example.testrail.io/"),
            "https://example.testrail.io/index.php?/api/v2/"
        );
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        let msg = error_message("add_case/3", 400, r#"{"error": "Field :title is required"}"#);
        assert_eq!(msg, "add_case/3 返回状态码 400: Field :title is required");

        let msg = error_message("get_projects", 502, "");
        assert_eq!(msg, "get_projects 返回状态码 502");
    }
}
