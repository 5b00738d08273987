use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// 各类批量请求的并发宽度
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerWidths {
    /// 创建分区的并发数（为 1 时按本地顺序创建）
    pub sections: usize,
    /// 创建测试用例的并发数
    pub cases: usize,
    /// 提交测试结果的并发数
    pub results: usize,
}

impl Default for WorkerWidths {
    fn default() -> Self {
        Self {
            sections: 1,
            cases: 5,
            results: 10,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TestRail 地址
    pub host: String,
    /// 项目名称
    pub project: String,
    pub username: String,
    pub password: Option<String>,
    /// API key（优先于密码）
    pub key: Option<String>,
    /// 新建测试运行的标题
    pub title: String,
    /// 复用已有的测试运行
    pub run_id: Option<i64>,
    /// 指定测试套件
    pub suite_id: Option<i64>,
    /// 每个结果请求包含的最大条数
    pub batch_size: usize,
    /// 单个请求超时（秒）
    pub timeout_secs: u64,
    pub workers: WorkerWidths,
    /// 自动回答确认提示：Some(true) 全部同意，Some(false) 全部拒绝
    pub auto_answer: Option<bool>,
    /// 是否显示详细日志
    pub verbose: bool,
    /// 结果文件
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            project: String::new(),
            username: String::new(),
            password: None,
            key: None,
            title: "自动化测试运行".to_string(),
            run_id: None,
            suite_id: None,
            batch_size: 50,
            timeout_secs: 30,
            workers: WorkerWidths::default(),
            auto_answer: None,
            verbose: false,
            file: None,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 依次叠加：默认值 → 配置文件 → 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// 用 `TR_*` 环境变量覆盖当前值
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    fn apply_env_with(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = var("TR_HOST") {
            self.host = v;
        }
        if let Some(v) = var("TR_PROJECT") {
            self.project = v;
        }
        if let Some(v) = var("TR_USERNAME") {
            self.username = v;
        }
        if let Some(v) = var("TR_PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = var("TR_KEY") {
            self.key = Some(v);
        }
        if let Some(v) = var("TR_TITLE") {
            self.title = v;
        }
        if let Some(v) = var("TR_RUN_ID") {
            self.run_id = Some(parse_env("TR_RUN_ID", &v, "整数")?);
        }
        if let Some(v) = var("TR_SUITE_ID") {
            self.suite_id = Some(parse_env("TR_SUITE_ID", &v, "整数")?);
        }
        if let Some(v) = var("TR_BATCH_SIZE") {
            self.batch_size = parse_env("TR_BATCH_SIZE", &v, "正整数")?;
        }
        if let Some(v) = var("TR_TIMEOUT") {
            self.timeout_secs = parse_env("TR_TIMEOUT", &v, "秒数")?;
        }
        if let Some(v) = var("TR_SECTION_WORKERS") {
            self.workers.sections = parse_env("TR_SECTION_WORKERS", &v, "正整数")?;
        }
        if let Some(v) = var("TR_CASE_WORKERS") {
            self.workers.cases = parse_env("TR_CASE_WORKERS", &v, "正整数")?;
        }
        if let Some(v) = var("TR_RESULT_WORKERS") {
            self.workers.results = parse_env("TR_RESULT_WORKERS", &v, "正整数")?;
        }
        if let Some(v) = var("TR_VERBOSE") {
            self.verbose = parse_env("TR_VERBOSE", &v, "布尔值")?;
        }
        Ok(())
    }

    /// 检查必填项和取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "host" });
        }
        if !self.host.starts_with("http://") && !self.host.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: format!("'{}' 必须以 http:// 或 https:// 开头", self.host),
            });
        }
        if self.project.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "project" });
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "username" });
        }
        if self.password.is_none() && self.key.is_none() {
            return Err(ConfigError::MissingField {
                field: "password / key",
            });
        }
        if self.file.is_none() {
            return Err(ConfigError::MissingField { field: "file" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "必须大于 0".to_string(),
            });
        }
        let WorkerWidths {
            sections,
            cases,
            results,
        } = self.workers;
        if sections == 0 || cases == 0 || results == 0 {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "并发数必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(
    var_name: &'static str,
    value: &str,
    expected_type: &'static str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name,
            value: value.to_string(),
            expected_type,
        })
}
