/// TestRail API 客户端
///
/// 封装所有与远端 API 相关的调用逻辑，只做字段提取，不做流程判断
use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::TransportError;
use crate::infrastructure::{Method, Transport};
use crate::utils::logging::truncate_text;

/// 远端项目
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProject {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub suite_mode: i64,
}

/// 远端测试套件
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSuite {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: i64,
}

/// TestRail API 客户端
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 获取全部项目
    pub async fn get_projects(&self) -> Result<Vec<RemoteProject>, TransportError> {
        let response = self.get("get_projects").await?;
        extract_list(&response, "projects")
    }

    /// 获取项目下的测试套件
    pub async fn get_suites(&self, project_id: i64) -> Result<Vec<RemoteSuite>, TransportError> {
        let response = self.get(&format!("get_suites/{}", project_id)).await?;
        extract_list(&response, "suites")
    }

    /// 创建测试套件
    pub async fn add_suite(&self, project_id: i64, body: &Value) -> Result<RemoteSuite, TransportError> {
        let response = self.post(&format!("add_suite/{}", project_id), body).await?;
        decode(response)
    }

    /// 获取套件中已有的分区 ID
    pub async fn get_section_ids(
        &self,
        project_id: i64,
        suite_id: i64,
    ) -> Result<HashSet<i64>, TransportError> {
        let path = format!("get_sections/{}&suite_id={}", project_id, suite_id);
        let response = self.get(&path).await?;
        let sections: Vec<IdOnly> = extract_list(&response, "sections")?;
        Ok(sections.into_iter().map(|s| s.id).collect())
    }

    /// 获取套件中已有的用例 ID
    pub async fn get_case_ids(
        &self,
        project_id: i64,
        suite_id: i64,
    ) -> Result<HashSet<i64>, TransportError> {
        let path = format!("get_cases/{}&suite_id={}", project_id, suite_id);
        let response = self.get(&path).await?;
        let cases: Vec<IdOnly> = extract_list(&response, "cases")?;
        Ok(cases.into_iter().map(|c| c.id).collect())
    }

    /// 创建测试运行，返回运行 ID
    pub async fn add_run(&self, project_id: i64, body: &Value) -> Result<i64, TransportError> {
        let response = self.post(&format!("add_run/{}", project_id), body).await?;
        let run: IdOnly = decode(response)?;
        Ok(run.id)
    }

    /// 关闭测试运行
    pub async fn close_run(&self, run_id: i64) -> Result<Value, TransportError> {
        self.post(&format!("close_run/{}", run_id), &json!({ "run_id": run_id }))
            .await
    }

    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let response = self.transport.send(Method::Get, path, None).await?;
        debug!("GET {} -> {}", path, truncate_text(&response.to_string(), 200));
        Ok(response)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let response = self.transport.send(Method::Post, path, Some(body)).await?;
        debug!("POST {} -> {}", path, truncate_text(&response.to_string(), 200));
        Ok(response)
    }
}

/// 列表接口既可能直接返回数组，也可能包在 `{ key: [...] }` 中
fn extract_list<T: DeserializeOwned>(response: &Value, key: &str) -> Result<Vec<T>, TransportError> {
    let list = match response {
        Value::Array(_) => response.clone(),
        Value::Object(map) => map.get(key).cloned().ok_or_else(|| {
            TransportError::new(format!("响应中缺少字段 '{}'", key))
        })?,
        other => {
            return Err(TransportError::new(format!(
                "无法识别的响应格式: {}",
                truncate_text(&other.to_string(), 80)
            )))
        }
    };
    decode(list)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::new(format!("无法解析响应: {}", e)))
}
