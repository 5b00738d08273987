//! 批量提交器 - 编排层
//!
//! ## 职责
//!
//! 在有界的工作池中并发执行一批互不依赖的创建请求。
//!
//! ## 核心流程
//!
//! 1. **分发**：固定数量的工作任务从共享队列中取单元，结果经 mpsc 通道回传
//! 2. **汇总**：只有编排线程读取通道，记录成功结果并推进进度条
//! 3. **快速失败**：第一个失败发生后设置取消信号，尚未开始的单元不再发出
//! 4. **回收**：取消后继续读通道直到所有已发出的请求返回，
//!    保证 `completed` 是已知成功的最大子集
//! 5. **中断**：外部中断走同样的取消 + 回收流程，之后以 `Interrupted` 返回
//!
//! 工作池只存在于一次 `submit` 调用内部，返回前所有工作任务都已结束。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::WorkerWidths;
use crate::error::{BatchError, TransportError};
use crate::infrastructure::{Method, Transport};
use crate::models::{Completed, PendingBody};
use crate::workflow::UploadContext;

/// 批量请求的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Sections,
    Cases,
    Results,
}

impl BatchKind {
    /// 日志中的动作名
    pub fn action(&self) -> &'static str {
        match self {
            BatchKind::Sections => "add_section",
            BatchKind::Cases => "add_case",
            BatchKind::Results => "add_results",
        }
    }

    /// 进度条前缀
    pub fn label(&self) -> &'static str {
        match self {
            BatchKind::Sections => "添加分区",
            BatchKind::Cases => "添加测试用例",
            BatchKind::Results => "添加测试结果",
        }
    }

    pub fn width(&self, widths: &WorkerWidths) -> usize {
        match self {
            BatchKind::Sections => widths.sections,
            BatchKind::Cases => widths.cases,
            BatchKind::Results => widths.results,
        }
    }
}

/// 一批请求的结果
#[derive(Debug)]
pub struct BatchOutcome<K> {
    /// 已成功完成的单元（包括取消后回收到的）
    pub completed: Vec<Completed<K>>,
    /// 第一个失败，或外部中断
    pub error: Option<BatchError>,
}

impl<K> BatchOutcome<K> {
    fn empty() -> Self {
        Self {
            completed: Vec::new(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// 成功单元的权重之和
    pub fn completed_weight(&self) -> u64 {
        self.completed.iter().map(|c| c.weight).sum()
    }
}

/// 工作任务回传的单元结果
struct UnitDone<K> {
    key: K,
    weight: u64,
    result: Result<serde_json::Value, TransportError>,
}

/// 批量提交器
#[derive(Clone)]
pub struct BatchSubmitter {
    transport: Arc<dyn Transport>,
    widths: WorkerWidths,
    ctx: UploadContext,
}

impl BatchSubmitter {
    pub fn new(transport: Arc<dyn Transport>, widths: WorkerWidths, ctx: UploadContext) -> Self {
        Self {
            transport,
            widths,
            ctx,
        }
    }

    /// 并发提交一批单元
    pub async fn submit<K>(&self, units: Vec<PendingBody<K>>, kind: BatchKind) -> BatchOutcome<K>
    where
        K: Send + 'static,
    {
        if units.is_empty() {
            return BatchOutcome::empty();
        }

        let total_weight: u64 = units.iter().map(|u| u.weight).sum();
        let width = kind.width(&self.widths).clamp(1, units.len());
        debug!(
            "{}: {} 个请求, 并发数 {}",
            kind.action(),
            units.len(),
            width
        );
        self.ctx.progress.start(kind.label(), total_weight);

        let queue = Arc::new(Mutex::new(VecDeque::from(units)));
        let (tx, mut rx) = mpsc::unbounded_channel::<UnitDone<K>>();
        let cancel = CancellationToken::new();

        let mut workers = JoinSet::new();
        for _ in 0..width {
            workers.spawn(run_worker(
                queue.clone(),
                tx.clone(),
                cancel.clone(),
                self.transport.clone(),
            ));
        }
        // 所有工作任务退出后通道关闭，读循环随之结束
        drop(tx);

        let mut completed = Vec::new();
        let mut error: Option<BatchError> = None;
        let mut interrupted = false;

        loop {
            // 回收阶段同样监听中断，中断优先于先前的失败
            let next = tokio::select! {
                biased;
                next = rx.recv() => next,
                _ = self.ctx.interrupt.cancelled(), if !interrupted => {
                    interrupted = true;
                    self.ctx.log(&format!(
                        "\n中止: {}，正在取消尚未开始的请求...",
                        kind.action()
                    ));
                    cancel.cancel();
                    continue;
                }
            };

            let Some(done) = next else {
                break;
            };

            match done.result {
                Ok(response) => {
                    self.ctx.progress.advance(done.weight);
                    completed.push(Completed {
                        key: done.key,
                        response,
                        weight: done.weight,
                    });
                }
                Err(e) if error.is_none() => {
                    self.ctx.log(&format!(
                        "\n{} 过程中出错，正在取消尚未开始的请求...",
                        kind.action()
                    ));
                    error = Some(BatchError::Failed {
                        action: kind.action(),
                        message: e.to_string(),
                    });
                    cancel.cancel();
                }
                Err(e) => {
                    debug!("{} 后续失败（已忽略）: {}", kind.action(), e);
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("{} 工作任务异常退出: {}", kind.action(), e);
            }
        }

        if interrupted {
            error = Some(BatchError::Interrupted {
                action: kind.action(),
            });
        }

        match &error {
            None => self.ctx.progress.finish("完成"),
            Some(_) => self.ctx.progress.finish("已中止"),
        }

        BatchOutcome { completed, error }
    }
}

/// 工作任务：取单元 → 发请求 → 回传结果，直到队列为空或收到取消信号
async fn run_worker<K>(
    queue: Arc<Mutex<VecDeque<PendingBody<K>>>>,
    tx: mpsc::UnboundedSender<UnitDone<K>>,
    cancel: CancellationToken,
    transport: Arc<dyn Transport>,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let unit = match queue.lock() {
            Ok(mut pending) => pending.pop_front(),
            Err(_) => None,
        };
        let Some(unit) = unit else {
            break;
        };

        let result = transport
            .send(Method::Post, &unit.path, Some(&unit.body))
            .await;

        let done = UnitDone {
            key: unit.key,
            weight: unit.weight,
            result,
        };
        if tx.send(done).is_err() {
            break;
        }
    }
}
