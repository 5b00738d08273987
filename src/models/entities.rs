use std::fmt;

use serde::{Deserialize, Serialize};

/// 项目的套件组织方式
///
/// 远端以整数表示：1 = 单套件，2 = 单套件 + 基线，3 = 多套件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteMode {
    SingleSuite,
    SingleSuiteWithBaselines,
    MultipleSuites,
    /// 无法识别的取值，遇到即报错
    Unknown(i64),
}

impl From<i64> for SuiteMode {
    fn from(code: i64) -> Self {
        match code {
            1 => SuiteMode::SingleSuite,
            2 => SuiteMode::SingleSuiteWithBaselines,
            3 => SuiteMode::MultipleSuites,
            other => SuiteMode::Unknown(other),
        }
    }
}

/// 实体类别（用于日志和错误信息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Section,
    Case,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Section => "分区",
            EntityKind::Case => "测试用例",
        };
        f.write_str(label)
    }
}

// ========== 远端引用 ==========

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: i64,
    pub name: String,
    pub suite_mode: SuiteMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteRef {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRef {
    pub id: Option<i64>,
    pub suite_id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRef {
    pub id: Option<i64>,
    pub section_id: Option<i64>,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRef {
    pub id: i64,
}

/// 本次上传中新创建的远端资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedRef {
    Section(SectionRef),
    Case(CaseRef),
}

// ========== 本地实体树 ==========

/// 测试套件（解析结果的根节点）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suite {
    #[serde(default, alias = "suite_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// 分区
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, alias = "section_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub suite_id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cases: Vec<Case>,
}

/// 测试用例
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Case {
    #[serde(default, alias = "case_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub section_id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CaseResult>,
}

/// 单条测试结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub status_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defects: Option<String>,
}
