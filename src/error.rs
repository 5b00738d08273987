//! 错误类型
//!
//! 每个阶段一个错误枚举，最终都汇总为 [`FatalError`]，
//! 由编排层统一记录日志并终止流水线。

use std::fmt;

use thiserror::Error;

use crate::models::EntityKind;

/// 传输层错误
///
/// 传输层的所有失败都以单个错误字符串的形式穿过边界
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// 项目解析错误
#[derive(Debug, Clone, Error)]
pub enum ProjectResolutionError {
    /// 没有同名项目
    #[error("项目 {name} 不存在")]
    NotFound { name: String },
    /// 存在多个同名项目
    #[error("存在多个名为 {name} 的项目，无法确定上传目标")]
    Ambiguous { name: String },
    /// 查询项目列表失败
    #[error("检查项目时出错: {0}")]
    Transport(TransportError),
}

/// 测试套件解析错误
#[derive(Debug, Clone, Error)]
pub enum SuiteResolutionError {
    /// 指定的套件 ID 不在项目中
    #[error("测试套件 ID {suite_id} 不存在")]
    Missing { suite_id: i64 },
    /// 用户拒绝创建套件
    #[error("用户拒绝创建测试套件，上传终止")]
    Declined,
    /// 创建套件失败
    #[error("创建测试套件失败: {0}")]
    CreationFailed(TransportError),
    /// 项目中没有任何套件
    #[error("项目 {project} 中没有任何测试套件")]
    NoSuites { project: String },
    /// 单套件 + 基线模式下存在多个套件
    #[error("项目 {project} 使用单套件+基线模式，但存在多个测试套件，请通过 --suite-id 指定")]
    NotUnique { project: String },
    /// 无法识别的套件模式
    #[error("无法识别的套件模式: {0}")]
    UnknownMode(i64),
    /// 查询套件失败
    #[error("检查测试套件时出错: {0}")]
    Transport(TransportError),
}

/// 批量提交错误
///
/// 已完成的部分保存在 `BatchOutcome::completed` 中，这里只描述失败原因
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    /// 第一个失败的单元
    #[error("{action} 过程中出错: {message}")]
    Failed {
        action: &'static str,
        message: String,
    },
    /// 外部中断（Ctrl-C）
    #[error("{action} 被用户中断")]
    Interrupted { action: &'static str },
}

impl BatchError {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, BatchError::Interrupted { .. })
    }
}

/// 分区 / 用例对齐错误
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// 查询远端列表失败
    #[error("检查缺失的{kind}时出错: {source}")]
    CheckFailed {
        kind: EntityKind,
        source: TransportError,
    },
    /// 用户拒绝创建
    #[error("用户拒绝创建缺失的{kind}，上传终止")]
    Declined { kind: EntityKind },
    /// 批量创建失败
    #[error("创建{kind}失败: {source}")]
    CreationFailed { kind: EntityKind, source: BatchError },
    /// 父级资源还没有远端 ID
    #[error("{kind} '{name}' 的父级尚未获得远端 ID")]
    UnresolvedParent { kind: EntityKind, name: String },
}

/// 测试运行错误
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("创建测试运行失败: {0}")]
    CreationFailed(TransportError),
    #[error("关闭测试运行失败: {0}")]
    CloseFailed(TransportError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少必填项
    #[error("缺少必填配置项: {field}")]
    MissingField { field: &'static str },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: &'static str,
        value: String,
        expected_type: &'static str,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
}

// ========== 流水线阶段 ==========

/// 上传流水线的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Project,
    Suite,
    Sections,
    Cases,
    Run,
    Results,
    CloseRun,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Project => "解析项目",
            UploadStage::Suite => "解析测试套件",
            UploadStage::Sections => "同步分区",
            UploadStage::Cases => "同步测试用例",
            UploadStage::Run => "创建测试运行",
            UploadStage::Results => "提交测试结果",
            UploadStage::CloseRun => "关闭测试运行",
        };
        f.write_str(name)
    }
}

/// 各阶段错误的汇总
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error(transparent)]
    Project(#[from] ProjectResolutionError),
    #[error(transparent)]
    Suite(#[from] SuiteResolutionError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Run(#[from] RunError),
    /// 在阶段之间或等待确认时收到中断信号
    #[error("上传被用户中断")]
    Interrupted,
}

/// 终止整条流水线的错误
#[derive(Debug, Clone, Error)]
#[error("[{stage}] {source}")]
pub struct FatalError {
    pub stage: UploadStage,
    #[source]
    pub source: StageError,
}

impl FatalError {
    pub fn new(stage: UploadStage, source: impl Into<StageError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// 是否由用户中断引起
    pub fn is_interrupt(&self) -> bool {
        match &self.source {
            StageError::Interrupted => true,
            StageError::Batch(e) => e.is_interrupt(),
            StageError::Reconcile(ReconcileError::CreationFailed { source, .. }) => {
                source.is_interrupt()
            }
            _ => false,
        }
    }

    /// 进程退出码：中断为 130，其余失败为 1
    pub fn exit_code(&self) -> u8 {
        if self.is_interrupt() {
            130
        } else {
            1
        }
    }
}

/// 应用程序结果类型
pub type UploadResult<T> = Result<T, FatalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_error_display_names_stage() {
        let err = FatalError::new(
            UploadStage::Project,
            ProjectResolutionError::NotFound {
                name: "Demo".to_string(),
            },
        );
        assert_eq!(err.to_string(), "[解析项目] 项目 Demo 不存在");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_interrupt_inside_reconcile_maps_to_130() {
        let err = FatalError::new(
            UploadStage::Cases,
            ReconcileError::CreationFailed {
                kind: EntityKind::Case,
                source: BatchError::Interrupted { action: "add_case" },
            },
        );
        assert!(err.is_interrupt());
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_interrupt_between_stages_maps_to_130() {
        let err = FatalError::new(UploadStage::Run, StageError::Interrupted);
        assert_eq!(err.to_string(), "[创建测试运行] 上传被用户中断");
        assert_eq!(err.exit_code(), 130);
    }
}
