//! 上传编排器 - 编排层
//!
//! ## 职责
//!
//! 按固定顺序执行上传流水线的七个阶段：
//!
//! 1. **解析项目**：按名称精确匹配
//! 2. **解析测试套件**：按套件模式解析或创建
//! 3. **同步分区**：创建远端缺失的分区
//! 4. **同步测试用例**：创建远端缺失的用例
//! 5. **测试运行**：复用指定的运行，或新建一个
//! 6. **提交测试结果**：按 `batch_size` 分块并发提交
//! 7. **关闭测试运行**：无论运行是否由本程序创建
//!
//! 任一阶段失败都只输出一行诊断信息（阶段 + 原因），随后返回 [`FatalError`]，
//! 不重试，也不继续执行后续阶段。
//!
//! 每个阶段开始前检查中断信号；阶段内收到中断时，该阶段的错误一律记为中断。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Config;
use crate::error::{FatalError, RunError, StageError, UploadResult, UploadStage};
use crate::infrastructure::Transport;
use crate::models::{EntityStore, ProjectRef, RunRef};
use crate::orchestrator::batch_submitter::{BatchKind, BatchSubmitter};
use crate::services::ApiClient;
use crate::utils::logging::{log_stage_done, log_upload_start, print_elapsed};
use crate::workflow::{ReconciliationEngine, UploadContext};

/// 一次成功上传的汇总
#[derive(Debug, Clone, Default)]
pub struct UploadSummary {
    pub project_id: i64,
    pub suite_id: i64,
    pub run_id: i64,
    /// 运行是否由本次上传创建
    pub run_created: bool,
    pub added_sections: usize,
    pub added_cases: usize,
    pub results_submitted: u64,
    pub elapsed: Duration,
    pub cases_elapsed: Duration,
    pub results_elapsed: Duration,
}

/// 上传编排器
pub struct UploadOrchestrator {
    api: ApiClient,
    engine: ReconciliationEngine,
    submitter: BatchSubmitter,
    ctx: UploadContext,
    title: String,
    run_id: Option<i64>,
    batch_size: usize,
}

impl UploadOrchestrator {
    pub fn new(config: &Config, transport: Arc<dyn Transport>, ctx: UploadContext) -> Self {
        let api = ApiClient::new(transport.clone());
        let submitter = BatchSubmitter::new(transport, config.workers, ctx.clone());
        let engine = ReconciliationEngine::new(
            api.clone(),
            submitter.clone(),
            ctx.clone(),
            config.project.clone(),
        );
        Self {
            api,
            engine,
            submitter,
            ctx,
            title: config.title.clone(),
            run_id: config.run_id,
            batch_size: config.batch_size,
        }
    }

    /// 执行完整的上传流水线
    pub async fn upload(&self, store: &mut EntityStore) -> UploadResult<UploadSummary> {
        let started = Instant::now();
        let mut summary = UploadSummary::default();

        // ① 项目
        self.checkpoint(UploadStage::Project)?;
        let project = self
            .engine
            .resolve_project()
            .await
            .map_err(|e| self.fatal(UploadStage::Project, e))?;
        summary.project_id = project.id;
        log_upload_start(self.ctx.logger.as_ref(), &project.name, &store.suite().name);
        self.ctx
            .vlog(&format!("项目 id {}, 套件模式 {:?}", project.id, project.suite_mode));

        // ② 测试套件
        self.checkpoint(UploadStage::Suite)?;
        let suite = self
            .engine
            .resolve_suite(store, &project)
            .await
            .map_err(|e| self.fatal(UploadStage::Suite, e))?;
        let suite_id = suite.id.unwrap_or_default();
        summary.suite_id = suite_id;
        log_stage_done(
            self.ctx.logger.as_ref(),
            "测试套件",
            &format!("{} (id {})", suite.name, suite_id),
        );

        // ③ 分区
        self.checkpoint(UploadStage::Sections)?;
        let sections = self
            .engine
            .reconcile_sections(store, &project)
            .await
            .into_result()
            .map_err(|e| self.fatal(UploadStage::Sections, e))?;
        summary.added_sections = sections.len();
        log_stage_done(
            self.ctx.logger.as_ref(),
            "分区",
            &format!("新建 {} 个", sections.len()),
        );

        // ④ 测试用例
        self.checkpoint(UploadStage::Cases)?;
        let cases_started = Instant::now();
        let cases = self
            .engine
            .reconcile_cases(store, &project)
            .await
            .into_result()
            .map_err(|e| self.fatal(UploadStage::Cases, e))?;
        summary.cases_elapsed = cases_started.elapsed();
        summary.added_cases = cases.len();
        log_stage_done(
            self.ctx.logger.as_ref(),
            "测试用例",
            &format!("新建 {} 个", cases.len()),
        );

        // ⑤ 测试运行
        self.checkpoint(UploadStage::Run)?;
        let run = self.obtain_run(store, &project).await?;
        summary.run_id = run.id;
        summary.run_created = self.run_id.is_none();

        // ⑥ 测试结果
        self.checkpoint(UploadStage::Results)?;
        let results_started = Instant::now();
        summary.results_submitted = self.submit_results(store, &run).await?;
        summary.results_elapsed = results_started.elapsed();

        // ⑦ 关闭运行
        self.checkpoint(UploadStage::CloseRun)?;
        self.ctx.log("正在关闭测试运行...");
        self.api
            .close_run(run.id)
            .await
            .map_err(|e| self.fatal(UploadStage::CloseRun, RunError::CloseFailed(e)))?;
        self.ctx.log("完成");

        summary.elapsed = started.elapsed();
        print_elapsed(
            self.ctx.logger.as_ref(),
            summary.elapsed,
            summary.cases_elapsed,
            summary.results_elapsed,
        );
        Ok(summary)
    }

    async fn obtain_run(&self, store: &EntityStore, project: &ProjectRef) -> UploadResult<RunRef> {
        if let Some(id) = self.run_id {
            self.ctx.vlog(&format!("使用已有的测试运行 {}", id));
            return Ok(RunRef { id });
        }

        self.ctx.log("正在创建测试运行...");
        let id = self
            .api
            .add_run(project.id, &store.run_body(&self.title))
            .await
            .map_err(|e| self.fatal(UploadStage::Run, RunError::CreationFailed(e)))?;
        self.ctx.log("完成");
        debug!("新建测试运行 id {}", id);
        Ok(RunRef { id })
    }

    /// 提交全部结果，返回成功提交的条数
    async fn submit_results(&self, store: &EntityStore, run: &RunRef) -> UploadResult<u64> {
        let chunks = store.result_chunks(run.id, self.batch_size);
        if chunks.is_empty() {
            self.ctx.log("没有需要提交的测试结果");
            return Ok(0);
        }

        let total: u64 = chunks.iter().map(|c| c.weight).sum();
        self.ctx.log(&format!(
            "正在向测试运行 {} 添加 {} 条测试结果...",
            run.id, total
        ));
        let outcome = self.submitter.submit(chunks, BatchKind::Results).await;
        let submitted = outcome.completed_weight();

        if let Some(e) = outcome.error {
            self.ctx
                .log(&format!("已成功提交 {} 条测试结果后中止", submitted));
            return Err(self.fatal(UploadStage::Results, e));
        }

        log_stage_done(
            self.ctx.logger.as_ref(),
            "测试结果",
            &format!("提交 {} 条", submitted),
        );
        Ok(submitted)
    }

    /// 已收到中断信号时终止流水线
    fn checkpoint(&self, stage: UploadStage) -> UploadResult<()> {
        if self.ctx.is_interrupted() {
            return Err(self.fatal(stage, StageError::Interrupted));
        }
        Ok(())
    }

    /// 记录诊断信息并构造致命错误
    ///
    /// 已收到中断信号时，原始错误（例如等待确认时被打断的拒绝）记为中断
    fn fatal(&self, stage: UploadStage, source: impl Into<StageError>) -> FatalError {
        let mut error = FatalError::new(stage, source);
        if self.ctx.is_interrupted() && !error.is_interrupt() {
            error = FatalError::new(stage, StageError::Interrupted);
        }
        self.ctx.log(&format!("\n❌ {}", error));
        error
    }
}
