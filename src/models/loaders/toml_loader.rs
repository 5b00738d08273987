use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;

use crate::models::entities::Suite;
use crate::models::loaders::ResultParser;

/// 结果文件的顶层结构
#[derive(Debug, Deserialize)]
struct ResultFile {
    suite: Suite,
}

/// 从 TOML 文件加载测试套件
pub async fn load_toml_to_suite(toml_file_path: &Path) -> Result<Suite> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let file: ResultFile = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    let case_count: usize = file.suite.sections.iter().map(|s| s.cases.len()).sum();
    tracing::info!(
        "成功加载 {} 个分区, {} 个测试用例: {}",
        file.suite.sections.len(),
        case_count,
        toml_file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
    );

    Ok(file.suite)
}

/// 基于 TOML 结果文件的解析器
pub struct TomlResultParser {
    path: PathBuf,
}

impl TomlResultParser {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResultParser for TomlResultParser {
    async fn parse(&self) -> Result<Suite> {
        if !self.path.exists() {
            anyhow::bail!("结果文件不存在: {}", self.path.display());
        }
        load_toml_to_suite(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[suite]
name = "夜间回归"

[[suite.sections]]
name = "登录"
id = 12

[[suite.sections.cases]]
title = "正确密码"
case_id = 345

[suite.sections.cases.result]
status_id = 1
elapsed = "3s"

[[suite.sections.cases]]
title = "错误密码"

[suite.sections.cases.result]
status_id = 5
comment = "期望提示错误"
"#;

    #[tokio::test]
    async fn test_parse_toml_result_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let suite = TomlResultParser::new(file.path()).parse().await.unwrap();

        assert_eq!(suite.name, "夜间回归");
        assert_eq!(suite.id, None);
        assert_eq!(suite.sections.len(), 1);
        let section = &suite.sections[0];
        assert_eq!(section.id, Some(12));
        assert_eq!(section.cases.len(), 2);
        assert_eq!(section.cases[0].id, Some(345));
        assert_eq!(
            section.cases[0].result.as_ref().unwrap().elapsed.as_deref(),
            Some("3s")
        );
        assert_eq!(section.cases[1].result.as_ref().unwrap().status_id, 5);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let parser = TomlResultParser::new("/definitely/not/here.toml");
        let err = parser.parse().await.unwrap_err();
        assert!(err.to_string().contains("结果文件不存在"));
    }
}
