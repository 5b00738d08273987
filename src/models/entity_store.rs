//! 本地实体树
//!
//! 持有解析得到的 套件 → 分区 → 用例 → 结果 树，负责：
//! - 为"创建缺失资源"生成请求体
//! - 在一批请求全部结束后，把远端返回的 ID 合并回树中
//!
//! 合并操作只由编排线程在两批请求之间调用，工作任务从不直接修改本结构。

use std::collections::{BTreeSet, HashSet};

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::models::entities::{
    CaseRef, CaseResult, EntityKind, SectionRef, Suite, SuiteRef,
};
use crate::models::pending::{CaseKey, ChunkKey, Completed, PendingBody, SectionKey};

/// 本地实体树
#[derive(Debug, Clone)]
pub struct EntityStore {
    suite: Suite,
}

impl EntityStore {
    /// 创建实体树
    ///
    /// 套件名称为空时自动生成一个；已知的父级 ID 会向下传递。
    pub fn new(mut suite: Suite) -> Self {
        if suite.name.trim().is_empty() {
            suite.name = format!(
                "自动创建的测试套件 {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }
        let mut store = Self { suite };
        store.cascade_suite_id();
        for index in 0..store.suite.sections.len() {
            store.cascade_section_id(index);
        }
        store
    }

    /// 使用调用方指定的套件 ID（优先于解析结果）
    pub fn with_suite_id(mut self, suite_id: Option<i64>) -> Self {
        if let Some(id) = suite_id {
            self.suite.id = Some(id);
            self.cascade_suite_id();
        }
        self
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub fn suite_ref(&self) -> SuiteRef {
        SuiteRef {
            id: self.suite.id,
            name: self.suite.name.clone(),
        }
    }

    pub fn section_refs(&self) -> Vec<SectionRef> {
        self.suite
            .sections
            .iter()
            .map(|s| SectionRef {
                id: s.id,
                suite_id: s.suite_id,
                name: s.name.clone(),
            })
            .collect()
    }

    pub fn case_refs(&self) -> Vec<CaseRef> {
        self.suite
            .sections
            .iter()
            .flat_map(|s| s.cases.iter())
            .map(|c| CaseRef {
                id: c.id,
                section_id: c.section_id,
                title: c.title.clone(),
            })
            .collect()
    }

    /// 已解析的分区 ID
    pub fn section_ids(&self) -> BTreeSet<i64> {
        self.suite.sections.iter().filter_map(|s| s.id).collect()
    }

    /// 已解析的用例 ID
    pub fn case_ids(&self) -> BTreeSet<i64> {
        self.suite
            .sections
            .iter()
            .flat_map(|s| s.cases.iter())
            .filter_map(|c| c.id)
            .collect()
    }

    // ========== 差异计算 ==========

    /// 本地声明但远端不存在的分区（没有 ID 的分区一律视为缺失）
    pub fn missing_sections(&self, remote: &HashSet<i64>) -> Vec<SectionKey> {
        self.suite
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.id.map_or(true, |id| !remote.contains(&id)))
            .map(|(index, _)| SectionKey(index))
            .collect()
    }

    /// 本地声明但远端不存在的用例
    pub fn missing_cases(&self, remote: &HashSet<i64>) -> Vec<CaseKey> {
        let mut missing = Vec::new();
        for (section, s) in self.suite.sections.iter().enumerate() {
            for (case, c) in s.cases.iter().enumerate() {
                if c.id.map_or(true, |id| !remote.contains(&id)) {
                    missing.push(CaseKey { section, case });
                }
            }
        }
        missing
    }

    // ========== 请求体 ==========

    /// `add_suite` 请求体
    pub fn suite_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(self.suite.name));
        if let Some(description) = &self.suite.description {
            body.insert("description".to_string(), json!(description));
        }
        Value::Object(body)
    }

    /// 缺失分区的 `add_section` 请求
    pub fn section_bodies(
        &self,
        project_id: i64,
        keys: &[SectionKey],
    ) -> Result<Vec<PendingBody<SectionKey>>, ReconcileError> {
        let suite_id = self.suite.id.ok_or_else(|| ReconcileError::UnresolvedParent {
            kind: EntityKind::Section,
            name: self.suite.name.clone(),
        })?;

        let mut units = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(section) = self.suite.sections.get(key.0) else {
                continue;
            };
            let mut body = Map::new();
            body.insert("suite_id".to_string(), json!(suite_id));
            body.insert("name".to_string(), json!(section.name));
            if let Some(description) = &section.description {
                body.insert("description".to_string(), json!(description));
            }
            units.push(PendingBody::new(
                *key,
                format!("add_section/{}", project_id),
                Value::Object(body),
            ));
        }
        Ok(units)
    }

    /// 缺失用例的 `add_case` 请求，父分区必须已有 ID
    pub fn case_bodies(&self, keys: &[CaseKey]) -> Result<Vec<PendingBody<CaseKey>>, ReconcileError> {
        let mut units = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(section) = self.suite.sections.get(key.section) else {
                continue;
            };
            let Some(case) = section.cases.get(key.case) else {
                continue;
            };
            let section_id = section.id.ok_or_else(|| ReconcileError::UnresolvedParent {
                kind: EntityKind::Case,
                name: case.title.clone(),
            })?;

            let mut body = Map::new();
            body.insert("title".to_string(), json!(case.title));
            if let Some(refs) = &case.refs {
                body.insert("refs".to_string(), json!(refs));
            }
            units.push(PendingBody::new(
                *key,
                format!("add_case/{}", section_id),
                Value::Object(body),
            ));
        }
        Ok(units)
    }

    /// `add_run` 请求体，只包含本次带 ID 的用例
    pub fn run_body(&self, title: &str) -> Value {
        let case_ids: Vec<i64> = self.case_ids().into_iter().collect();
        let mut body = Map::new();
        body.insert("name".to_string(), json!(title));
        if let Some(suite_id) = self.suite.id {
            body.insert("suite_id".to_string(), json!(suite_id));
        }
        if let Some(description) = &self.suite.description {
            body.insert("description".to_string(), json!(description));
        }
        body.insert("include_all".to_string(), json!(false));
        body.insert("case_ids".to_string(), json!(case_ids));
        Value::Object(body)
    }

    /// 按 `batch_size` 切分的 `add_results_for_cases` 请求
    ///
    /// 只提交带结果且已有 ID 的用例，每个分块的权重等于其中的结果条数。
    pub fn result_chunks(&self, run_id: i64, batch_size: usize) -> Vec<PendingBody<ChunkKey>> {
        let rows: Vec<Value> = self
            .suite
            .sections
            .iter()
            .flat_map(|s| s.cases.iter())
            .filter_map(|c| match (c.id, &c.result) {
                (Some(id), Some(result)) => Some(result_row(id, result)),
                _ => None,
            })
            .collect();

        rows.chunks(batch_size.max(1))
            .enumerate()
            .map(|(index, chunk)| {
                PendingBody::new(
                    ChunkKey(index),
                    format!("add_results_for_cases/{}", run_id),
                    json!({ "results": chunk }),
                )
                .with_weight(chunk.len() as u64)
            })
            .collect()
    }

    // ========== 合并远端 ID ==========

    /// 合并解析或创建得到的套件 ID
    pub fn merge_suite(&mut self, suite_id: i64) -> SuiteRef {
        self.suite.id = Some(suite_id);
        self.cascade_suite_id();
        self.suite_ref()
    }

    /// 合并批量创建的分区
    pub fn merge_sections(&mut self, completed: &[Completed<SectionKey>]) -> Vec<SectionRef> {
        let mut created = Vec::with_capacity(completed.len());
        for done in completed {
            let Some(id) = response_id(&done.response) else {
                warn!("add_section 响应中缺少 id: {}", done.response);
                continue;
            };
            let Some(section) = self.suite.sections.get_mut(done.key.0) else {
                continue;
            };
            section.id = Some(id);
            if let Some(suite_id) = done.response.get("suite_id").and_then(Value::as_i64) {
                section.suite_id = Some(suite_id);
            }
            debug!("分区 '{}' -> {}", section.name, id);
            created.push(SectionRef {
                id: Some(id),
                suite_id: section.suite_id,
                name: section.name.clone(),
            });
            self.cascade_section_id(done.key.0);
        }
        created
    }

    /// 合并批量创建的用例
    pub fn merge_cases(&mut self, completed: &[Completed<CaseKey>]) -> Vec<CaseRef> {
        let mut created = Vec::with_capacity(completed.len());
        for done in completed {
            let Some(id) = response_id(&done.response) else {
                warn!("add_case 响应中缺少 id: {}", done.response);
                continue;
            };
            let Some(case) = self
                .suite
                .sections
                .get_mut(done.key.section)
                .and_then(|s| s.cases.get_mut(done.key.case))
            else {
                continue;
            };
            case.id = Some(id);
            if let Some(section_id) = done.response.get("section_id").and_then(Value::as_i64) {
                case.section_id = Some(section_id);
            }
            created.push(CaseRef {
                id: Some(id),
                section_id: case.section_id,
                title: case.title.clone(),
            });
        }
        created
    }

    fn cascade_suite_id(&mut self) {
        if let Some(suite_id) = self.suite.id {
            for section in &mut self.suite.sections {
                section.suite_id = Some(suite_id);
            }
        }
    }

    fn cascade_section_id(&mut self, index: usize) {
        if let Some(section) = self.suite.sections.get_mut(index) {
            if let Some(section_id) = section.id {
                for case in &mut section.cases {
                    case.section_id = Some(section_id);
                }
            }
        }
    }
}

fn response_id(response: &Value) -> Option<i64> {
    response.get("id").and_then(Value::as_i64)
}

fn result_row(case_id: i64, result: &CaseResult) -> Value {
    let mut row = match serde_json::to_value(result) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    row.insert("case_id".to_string(), json!(case_id));
    Value::Object(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entities::{Case, Section};

    fn sample_suite() -> Suite {
        Suite {
            id: None,
            name: "回归测试".to_string(),
            description: None,
            sections: vec![
                Section {
                    id: Some(10),
                    name: "登录".to_string(),
                    cases: vec![
                        Case {
                            id: Some(100),
                            title: "正确密码".to_string(),
                            result: Some(CaseResult {
                                status_id: 1,
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        Case {
                            id: None,
                            title: "错误密码".to_string(),
                            result: Some(CaseResult {
                                status_id: 5,
                                comment: Some("断言失败".to_string()),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                Section {
                    id: None,
                    name: "支付".to_string(),
                    cases: vec![Case {
                        id: None,
                        title: "下单".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_new_cascades_known_parent_ids() {
        let store = EntityStore::new(sample_suite()).with_suite_id(Some(7));
        let sections = store.section_refs();
        assert!(sections.iter().all(|s| s.suite_id == Some(7)));
        let cases = store.case_refs();
        assert_eq!(cases[0].section_id, Some(10));
        assert_eq!(cases[2].section_id, None);
    }

    #[test]
    fn test_empty_suite_name_is_generated() {
        let store = EntityStore::new(Suite::default());
        assert!(store.suite().name.starts_with("自动创建的测试套件"));
    }

    #[test]
    fn test_missing_sections_and_cases() {
        let store = EntityStore::new(sample_suite());
        let remote: HashSet<i64> = [10].into_iter().collect();
        assert_eq!(store.missing_sections(&remote), vec![SectionKey(1)]);

        let remote_cases: HashSet<i64> = [100].into_iter().collect();
        assert_eq!(
            store.missing_cases(&remote_cases),
            vec![
                CaseKey { section: 0, case: 1 },
                CaseKey { section: 1, case: 0 }
            ]
        );

        // 本地 ID 在远端不存在，同样算缺失
        assert_eq!(store.missing_sections(&HashSet::new()).len(), 2);
    }

    #[test]
    fn test_section_bodies_require_suite_id() {
        let store = EntityStore::new(sample_suite());
        let err = store.section_bodies(1, &[SectionKey(1)]).unwrap_err();
        assert!(matches!(err, ReconcileError::UnresolvedParent { .. }));

        let store = store.with_suite_id(Some(3));
        let units = store.section_bodies(1, &[SectionKey(1)]).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, "add_section/1");
        assert_eq!(units[0].body["suite_id"], 3);
        assert_eq!(units[0].body["name"], "支付");
    }

    #[test]
    fn test_case_bodies_use_parent_section_in_path() {
        let store = EntityStore::new(sample_suite());
        let units = store
            .case_bodies(&[CaseKey { section: 0, case: 1 }])
            .unwrap();
        assert_eq!(units[0].path, "add_case/10");
        assert_eq!(units[0].body["title"], "错误密码");

        let err = store
            .case_bodies(&[CaseKey { section: 1, case: 0 }])
            .unwrap_err();
        assert!(matches!(err, ReconcileError::UnresolvedParent { .. }));
    }

    #[test]
    fn test_merge_sections_then_cases() {
        let mut store = EntityStore::new(sample_suite()).with_suite_id(Some(3));
        let created = store.merge_sections(&[Completed {
            key: SectionKey(1),
            response: json!({"id": 11, "suite_id": 3, "name": "支付"}),
            weight: 1,
        }]);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, Some(11));
        assert_eq!(store.case_refs()[2].section_id, Some(11));

        let created = store.merge_cases(&[
            Completed {
                key: CaseKey { section: 0, case: 1 },
                response: json!({"id": 101, "section_id": 10, "title": "错误密码"}),
                weight: 1,
            },
            Completed {
                key: CaseKey { section: 1, case: 0 },
                response: json!({"title": "没有 id"}),
                weight: 1,
            },
        ]);
        assert_eq!(created.len(), 1);
        assert_eq!(
            store.case_ids().into_iter().collect::<Vec<_>>(),
            vec![100, 101]
        );
    }

    #[test]
    fn test_result_chunks_only_include_resolved_cases() {
        let mut store = EntityStore::new(sample_suite());
        // 两个用例都有结果，但只有已解析 ID 的那个计入
        let chunks = store.result_chunks(9, 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks.iter().map(|c| c.weight).sum::<u64>(), 1);

        store.merge_cases(&[Completed {
            key: CaseKey { section: 0, case: 1 },
            response: json!({"id": 101}),
            weight: 1,
        }]);
        let chunks = store.result_chunks(9, 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].path, "add_results_for_cases/9");
        assert_eq!(chunks[1].body["results"][0]["case_id"], 101);
        assert_eq!(chunks[1].body["results"][0]["comment"], "断言失败");

        let chunks = store.result_chunks(9, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].weight, 2);
    }

    #[test]
    fn test_run_body_lists_case_ids() {
        let store = EntityStore::new(sample_suite()).with_suite_id(Some(3));
        let body = store.run_body("夜间构建");
        assert_eq!(body["name"], "夜间构建");
        assert_eq!(body["suite_id"], 3);
        assert_eq!(body["include_all"], false);
        assert_eq!(body["case_ids"], json!([100]));
    }
}
