#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use testrail_upload::config::Config;
use testrail_upload::error::TransportError;
use testrail_upload::infrastructure::{Method, Transport};
use testrail_upload::models::{Case, CaseResult, EntityStore, Section, Suite};
use testrail_upload::services::{NoProgress, Prompter};
use testrail_upload::utils::Logger;
use testrail_upload::workflow::UploadContext;

/// 失败规则：返回 Some(错误信息) 时该请求失败
type FailRule = Box<dyn Fn(&str, Option<&Value>) -> Option<String> + Send + Sync>;

#[derive(Debug, Default)]
pub struct FakeState {
    /// (id, name, suite_mode)
    pub projects: Vec<(i64, String, i64)>,
    pub suites: Vec<i64>,
    pub sections: Vec<i64>,
    pub cases: Vec<i64>,
    pub next_id: i64,
    pub calls: Vec<(Method, String)>,
    /// 已提交的结果行
    pub results: Vec<Value>,
}

/// 内存中的 TestRail
pub struct FakeTestRail {
    state: Mutex<FakeState>,
    fail: Option<FailRule>,
}

impl FakeTestRail {
    pub fn new(project: &str, suite_mode: i64) -> Self {
        let state = FakeState {
            projects: vec![(1, project.to_string(), suite_mode)],
            next_id: 1000,
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            fail: None,
        }
    }

    pub fn with_project(self, id: i64, name: &str, suite_mode: i64) -> Self {
        self.state
            .lock()
            .unwrap()
            .projects
            .push((id, name.to_string(), suite_mode));
        self
    }

    pub fn with_suites(self, ids: &[i64]) -> Self {
        self.state.lock().unwrap().suites.extend_from_slice(ids);
        self
    }

    pub fn with_sections(self, ids: &[i64]) -> Self {
        self.state.lock().unwrap().sections.extend_from_slice(ids);
        self
    }

    pub fn with_cases(self, ids: &[i64]) -> Self {
        self.state.lock().unwrap().cases.extend_from_slice(ids);
        self
    }

    pub fn failing_when(
        mut self,
        rule: impl Fn(&str, Option<&Value>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.fail = Some(Box::new(rule));
        self
    }

    /// 以给定前缀开头的请求次数
    pub fn count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, path)| path.starts_with(prefix))
            .count()
    }

    pub fn paths(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn submitted_results(&self) -> Vec<Value> {
        self.state.lock().unwrap().results.clone()
    }

    pub fn suites(&self) -> Vec<i64> {
        self.state.lock().unwrap().suites.clone()
    }

    fn handle(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((method, path.to_string()));

        let (action, rest) = path.split_once('/').unwrap_or((path, ""));
        let target: i64 = rest
            .split('&')
            .next()
            .and_then(|id| id.parse().ok())
            .unwrap_or_default();
        let field = |name: &str| body.map(|b| b[name].clone()).unwrap_or(Value::Null);

        match action {
            "get_projects" => {
                let projects: Vec<Value> = state
                    .projects
                    .iter()
                    .map(|(id, name, mode)| json!({"id": id, "name": name, "suite_mode": mode}))
                    .collect();
                Ok(json!({ "offset": 0, "projects": projects }))
            }
            "get_suites" => Ok(Value::Array(
                state
                    .suites
                    .iter()
                    .map(|id| json!({"id": id, "name": format!("套件 {}", id)}))
                    .collect(),
            )),
            "add_suite" => {
                state.next_id += 1;
                let id = state.next_id;
                state.suites.push(id);
                Ok(json!({"id": id, "name": field("name")}))
            }
            "get_sections" => {
                let sections: Vec<Value> = state.sections.iter().map(|id| json!({"id": id})).collect();
                Ok(json!({ "sections": sections }))
            }
            "add_section" => {
                state.next_id += 1;
                let id = state.next_id;
                state.sections.push(id);
                Ok(json!({"id": id, "suite_id": field("suite_id"), "name": field("name")}))
            }
            "get_cases" => {
                let cases: Vec<Value> = state.cases.iter().map(|id| json!({"id": id})).collect();
                Ok(json!({ "cases": cases }))
            }
            "add_case" => {
                state.next_id += 1;
                let id = state.next_id;
                state.cases.push(id);
                Ok(json!({"id": id, "section_id": target, "title": field("title")}))
            }
            "add_run" => Ok(json!({"id": 900})),
            "add_results_for_cases" => {
                let rows = field("results").as_array().cloned().unwrap_or_default();
                state.results.extend(rows.iter().cloned());
                Ok(Value::Array(rows))
            }
            "close_run" => Ok(json!({})),
            other => Err(format!("未知接口 {}", other)),
        }
    }
}

#[async_trait]
impl Transport for FakeTestRail {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        if let Some(message) = self.fail.as_ref().and_then(|rule| rule(path, body)) {
            self.state
                .lock()
                .unwrap()
                .calls
                .push((method, path.to_string()));
            return Err(TransportError::new(message));
        }
        tokio::task::yield_now().await;
        self.handle(method, path, body).map_err(TransportError::new)
    }
}

/// 记录所有输出
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn vlog(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

/// 固定回答并统计询问次数
pub struct ScriptedPrompter {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedPrompter {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, _message: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// 被询问时触发中断，之后一直不回答
pub struct InterruptingPrompter {
    interrupt: CancellationToken,
}

impl InterruptingPrompter {
    pub fn new(interrupt: CancellationToken) -> Self {
        Self { interrupt }
    }
}

#[async_trait]
impl Prompter for InterruptingPrompter {
    async fn confirm(&self, _message: &str) -> bool {
        self.interrupt.cancel();
        std::future::pending::<bool>().await
    }
}

pub struct Harness {
    pub remote: Arc<FakeTestRail>,
    pub logger: Arc<RecordingLogger>,
    pub prompter: Arc<ScriptedPrompter>,
    pub ctx: UploadContext,
}

pub fn harness(remote: FakeTestRail, answer: bool) -> Harness {
    let remote = Arc::new(remote);
    let logger = Arc::new(RecordingLogger::default());
    let prompter = Arc::new(ScriptedPrompter::new(answer));
    let ctx = UploadContext::quiet(logger.clone(), prompter.clone());
    Harness {
        remote,
        logger,
        prompter,
        ctx,
    }
}

/// 使用给定中断信号和确认器的上下文
pub fn interruptible_ctx(
    h: &Harness,
    prompter: Arc<dyn Prompter>,
    interrupt: CancellationToken,
) -> UploadContext {
    UploadContext::new(h.logger.clone(), prompter, Arc::new(NoProgress), interrupt)
}

pub fn config(project: &str) -> Config {
    Config {
        host: "https://tr.example.com".to_string(),
        project: project.to_string(),
        username: "qa@example.com".to_string(),
        key: Some("secret".to_string()),
        ..Default::default()
    }
}

/// 每个用例都带一个通过的结果；`ids` 为真时分区和用例带上 ID
///
/// 分区 ID 从 10 开始，用例 ID 为 分区 ID * 10 + 序号
pub fn suite(sections: usize, cases_per_section: usize, ids: bool) -> Suite {
    Suite {
        id: None,
        name: "回归测试".to_string(),
        description: None,
        sections: (0..sections)
            .map(|s| {
                let section_id = 10 + s as i64;
                Section {
                    id: ids.then_some(section_id),
                    name: format!("分区 {}", s + 1),
                    cases: (0..cases_per_section)
                        .map(|c| Case {
                            id: ids.then_some(section_id * 10 + c as i64),
                            title: format!("用例 {}-{}", s + 1, c + 1),
                            result: Some(CaseResult {
                                status_id: 1,
                                ..Default::default()
                            }),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                }
            })
            .collect(),
    }
}

pub fn store(sections: usize, cases_per_section: usize, ids: bool) -> EntityStore {
    EntityStore::new(suite(sections, cases_per_section, ids))
}

/// `suite(.., true)` 生成的全部分区 ID 和用例 ID
pub fn synced_ids(sections: usize, cases_per_section: usize) -> (Vec<i64>, Vec<i64>) {
    let section_ids: Vec<i64> = (0..sections).map(|s| 10 + s as i64).collect();
    let case_ids = section_ids
        .iter()
        .flat_map(|sid| (0..cases_per_section).map(move |c| sid * 10 + c as i64))
        .collect();
    (section_ids, case_ids)
}
