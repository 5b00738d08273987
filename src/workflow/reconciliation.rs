//! 远端对齐流程 - 流程层
//!
//! 核心职责：让远端的 项目 → 套件 → 分区 → 用例 与本地实体树一致
//!
//! 流程顺序：
//! 1. 按名称解析项目
//! 2. 按套件模式解析（或创建）测试套件
//! 3. 对比分区差异 → 询问用户 → 批量创建
//! 4. 对比用例差异 → 询问用户 → 批量创建
//!
//! 差异为空时既不询问也不写入，因此对已同步的项目重复执行不会产生任何创建请求。

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{
    BatchError, ProjectResolutionError, ReconcileError, SuiteResolutionError, TransportError,
};
use crate::models::{CreatedRef, EntityKind, EntityStore, ProjectRef, SuiteMode, SuiteRef};
use crate::orchestrator::batch_submitter::{BatchKind, BatchSubmitter};
use crate::services::ApiClient;
use crate::workflow::upload_ctx::UploadContext;

/// 对齐结果
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Success,
    Declined,
    Failed(ReconcileError),
}

/// 一次分区 / 用例对齐的结果
///
/// 即使失败，`created` 中也包含已经成功创建并合并进实体树的资源
#[derive(Debug, Clone)]
pub struct ReconciliationResult {
    pub kind: EntityKind,
    /// 对齐结束后本地已知的远端 ID
    pub resolved_ids: BTreeSet<i64>,
    pub created: Vec<CreatedRef>,
    pub outcome: ReconcileOutcome,
}

impl ReconciliationResult {
    fn success(kind: EntityKind, resolved_ids: BTreeSet<i64>, created: Vec<CreatedRef>) -> Self {
        Self {
            kind,
            resolved_ids,
            created,
            outcome: ReconcileOutcome::Success,
        }
    }

    fn declined(kind: EntityKind, resolved_ids: BTreeSet<i64>) -> Self {
        Self {
            kind,
            resolved_ids,
            created: Vec::new(),
            outcome: ReconcileOutcome::Declined,
        }
    }

    fn failed(
        kind: EntityKind,
        resolved_ids: BTreeSet<i64>,
        created: Vec<CreatedRef>,
        error: ReconcileError,
    ) -> Self {
        Self {
            kind,
            resolved_ids,
            created,
            outcome: ReconcileOutcome::Failed(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ReconcileOutcome::Success)
    }

    /// 成功时返回新创建的资源，拒绝或失败时返回对应错误
    pub fn into_result(self) -> Result<Vec<CreatedRef>, ReconcileError> {
        match self.outcome {
            ReconcileOutcome::Success => Ok(self.created),
            ReconcileOutcome::Declined => Err(ReconcileError::Declined { kind: self.kind }),
            ReconcileOutcome::Failed(error) => Err(error),
        }
    }
}

/// 远端对齐引擎
pub struct ReconciliationEngine {
    api: ApiClient,
    submitter: BatchSubmitter,
    ctx: UploadContext,
    project_name: String,
}

impl ReconciliationEngine {
    pub fn new(
        api: ApiClient,
        submitter: BatchSubmitter,
        ctx: UploadContext,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            api,
            submitter,
            ctx,
            project_name: project_name.into(),
        }
    }

    /// 按名称精确匹配项目
    pub async fn resolve_project(&self) -> Result<ProjectRef, ProjectResolutionError> {
        let projects = self
            .api
            .get_projects()
            .await
            .map_err(ProjectResolutionError::Transport)?;

        let mut matches = projects.into_iter().filter(|p| p.name == self.project_name);
        match (matches.next(), matches.next()) {
            (None, _) => Err(ProjectResolutionError::NotFound {
                name: self.project_name.clone(),
            }),
            (Some(_), Some(_)) => Err(ProjectResolutionError::Ambiguous {
                name: self.project_name.clone(),
            }),
            (Some(project), None) => {
                debug!(
                    "项目 {} -> id {}, suite_mode {}",
                    project.name, project.id, project.suite_mode
                );
                Ok(ProjectRef {
                    id: project.id,
                    name: project.name,
                    suite_mode: SuiteMode::from(project.suite_mode),
                })
            }
        }
    }

    /// 解析测试套件，成功后把套件 ID 合并进实体树
    ///
    /// - 已指定套件 ID：只检查它是否属于该项目
    /// - 多套件模式：询问用户后创建
    /// - 单套件 + 基线模式：必须恰好存在一个套件
    /// - 单套件模式：取第一个套件
    pub async fn resolve_suite(
        &self,
        store: &mut EntityStore,
        project: &ProjectRef,
    ) -> Result<SuiteRef, SuiteResolutionError> {
        if let Some(suite_id) = store.suite().id {
            let suites = self
                .api
                .get_suites(project.id)
                .await
                .map_err(SuiteResolutionError::Transport)?;
            if suites.iter().any(|s| s.id == suite_id) {
                return Ok(store.merge_suite(suite_id));
            }
            return Err(SuiteResolutionError::Missing { suite_id });
        }

        let suite_id = match project.suite_mode {
            SuiteMode::MultipleSuites => self.create_suite(store, project).await?,
            SuiteMode::SingleSuiteWithBaselines => {
                let ids = self.suite_ids(project).await?;
                match ids.as_slice() {
                    [] => {
                        return Err(SuiteResolutionError::NoSuites {
                            project: project.name.clone(),
                        })
                    }
                    [only] => *only,
                    _ => {
                        return Err(SuiteResolutionError::NotUnique {
                            project: project.name.clone(),
                        })
                    }
                }
            }
            SuiteMode::SingleSuite => {
                let ids = self.suite_ids(project).await?;
                *ids.first().ok_or_else(|| SuiteResolutionError::NoSuites {
                    project: project.name.clone(),
                })?
            }
            SuiteMode::Unknown(code) => return Err(SuiteResolutionError::UnknownMode(code)),
        };

        Ok(store.merge_suite(suite_id))
    }

    /// 创建本地分区中远端缺失的部分
    pub async fn reconcile_sections(
        &self,
        store: &mut EntityStore,
        project: &ProjectRef,
    ) -> ReconciliationResult {
        let kind = EntityKind::Section;
        let Some(suite_id) = store.suite().id else {
            return ReconciliationResult::failed(
                kind,
                store.section_ids(),
                Vec::new(),
                ReconcileError::UnresolvedParent {
                    kind,
                    name: store.suite().name.clone(),
                },
            );
        };

        let remote = match self.api.get_section_ids(project.id, suite_id).await {
            Ok(ids) => ids,
            Err(e) => return check_failed(kind, store.section_ids(), e),
        };

        let missing = store.missing_sections(&remote);
        if missing.is_empty() {
            info!("✓ 所有分区在远端均已存在");
            return ReconciliationResult::success(kind, store.section_ids(), Vec::new());
        }

        let prompt = format!(
            "项目 {} 中缺少 {} 个分区，是否创建？",
            project.name,
            missing.len()
        );
        if !self.ctx.confirm(&prompt).await {
            return ReconciliationResult::declined(kind, store.section_ids());
        }
        self.ctx.log("正在向测试套件添加缺失的分区...");

        let units = match store.section_bodies(project.id, &missing) {
            Ok(units) => units,
            Err(e) => return ReconciliationResult::failed(kind, store.section_ids(), Vec::new(), e),
        };
        let outcome = self.submitter.submit(units, BatchKind::Sections).await;
        let created: Vec<CreatedRef> = store
            .merge_sections(&outcome.completed)
            .into_iter()
            .map(CreatedRef::Section)
            .collect();

        finish_creation(kind, store.section_ids(), created, outcome.error)
    }

    /// 创建本地用例中远端缺失的部分
    pub async fn reconcile_cases(
        &self,
        store: &mut EntityStore,
        project: &ProjectRef,
    ) -> ReconciliationResult {
        let kind = EntityKind::Case;
        let Some(suite_id) = store.suite().id else {
            return ReconciliationResult::failed(
                kind,
                store.case_ids(),
                Vec::new(),
                ReconcileError::UnresolvedParent {
                    kind,
                    name: store.suite().name.clone(),
                },
            );
        };

        let remote = match self.api.get_case_ids(project.id, suite_id).await {
            Ok(ids) => ids,
            Err(e) => return check_failed(kind, store.case_ids(), e),
        };

        let missing = store.missing_cases(&remote);
        if missing.is_empty() {
            info!("✓ 所有测试用例在远端均已存在");
            return ReconciliationResult::success(kind, store.case_ids(), Vec::new());
        }

        let prompt = format!(
            "项目 {} 中缺少 {} 个测试用例，是否创建？",
            project.name,
            missing.len()
        );
        if !self.ctx.confirm(&prompt).await {
            return ReconciliationResult::declined(kind, store.case_ids());
        }
        self.ctx.log("正在向测试套件添加缺失的测试用例...");

        let units = match store.case_bodies(&missing) {
            Ok(units) => units,
            Err(e) => return ReconciliationResult::failed(kind, store.case_ids(), Vec::new(), e),
        };
        let outcome = self.submitter.submit(units, BatchKind::Cases).await;
        let created: Vec<CreatedRef> = store
            .merge_cases(&outcome.completed)
            .into_iter()
            .map(CreatedRef::Case)
            .collect();

        finish_creation(kind, store.case_ids(), created, outcome.error)
    }

    /// 多套件模式：询问后创建套件
    async fn create_suite(
        &self,
        store: &EntityStore,
        project: &ProjectRef,
    ) -> Result<i64, SuiteResolutionError> {
        let prompt = format!(
            "项目 {} 中将创建新的测试套件 '{}'，是否继续？",
            project.name,
            store.suite().name
        );
        if !self.ctx.confirm(&prompt).await {
            return Err(SuiteResolutionError::Declined);
        }

        self.ctx
            .log(&format!("正在向项目 {} 添加缺失的测试套件...", project.name));
        let created = self
            .api
            .add_suite(project.id, &store.suite_body())
            .await
            .map_err(SuiteResolutionError::CreationFailed)?;
        info!("✓ 已创建测试套件 '{}' (id {})", created.name, created.id);
        Ok(created.id)
    }

    async fn suite_ids(&self, project: &ProjectRef) -> Result<Vec<i64>, SuiteResolutionError> {
        let suites = self
            .api
            .get_suites(project.id)
            .await
            .map_err(SuiteResolutionError::Transport)?;
        Ok(suites.into_iter().map(|s| s.id).collect())
    }
}

fn check_failed(
    kind: EntityKind,
    resolved_ids: BTreeSet<i64>,
    e: TransportError,
) -> ReconciliationResult {
    ReconciliationResult::failed(
        kind,
        resolved_ids,
        Vec::new(),
        ReconcileError::CheckFailed { kind, source: e },
    )
}

fn finish_creation(
    kind: EntityKind,
    resolved_ids: BTreeSet<i64>,
    created: Vec<CreatedRef>,
    error: Option<BatchError>,
) -> ReconciliationResult {
    match error {
        None => {
            info!("✓ 已创建 {} 个{}", created.len(), kind);
            ReconciliationResult::success(kind, resolved_ids, created)
        }
        Some(source) => ReconciliationResult::failed(
            kind,
            resolved_ids,
            created,
            ReconcileError::CreationFailed { kind, source },
        ),
    }
}
