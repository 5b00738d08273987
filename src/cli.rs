//! 命令行参数
//!
//! 命令行参数优先级最高，覆盖配置文件和环境变量

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

/// 把测试结果上传到 TestRail
#[derive(Parser, Debug, Default)]
#[command(name = "testrail-upload", about = "上传测试结果到 TestRail", version)]
pub struct Cli {
    /// TOML 配置文件
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// TestRail 地址，例如 https://example.testrail.io
    #[arg(long)]
    pub host: Option<String>,

    /// 项目名称
    #[arg(long)]
    pub project: Option<String>,

    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(short, long)]
    pub password: Option<String>,

    /// API key（优先于密码）
    #[arg(short, long)]
    pub key: Option<String>,

    /// 新建测试运行的标题
    #[arg(short, long)]
    pub title: Option<String>,

    /// 把结果提交到已有的测试运行
    #[arg(short, long)]
    pub run_id: Option<i64>,

    /// 指定测试套件
    #[arg(short, long)]
    pub suite_id: Option<i64>,

    /// 每个结果请求包含的最大条数
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// 单个请求超时（秒）
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 对所有确认提示回答"是"
    #[arg(short, long, conflicts_with = "no")]
    pub yes: bool,

    /// 对所有确认提示回答"否"
    #[arg(short, long)]
    pub no: bool,

    /// 显示详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 测试结果文件
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl Cli {
    /// 把命令行中出现的参数写入配置
    pub fn apply(&self, config: &mut Config) {
        if let Some(v) = &self.host {
            config.host = v.clone();
        }
        if let Some(v) = &self.project {
            config.project = v.clone();
        }
        if let Some(v) = &self.username {
            config.username = v.clone();
        }
        if let Some(v) = &self.password {
            config.password = Some(v.clone());
        }
        if let Some(v) = &self.key {
            config.key = Some(v.clone());
        }
        if let Some(v) = &self.title {
            config.title = v.clone();
        }
        if self.run_id.is_some() {
            config.run_id = self.run_id;
        }
        if self.suite_id.is_some() {
            config.suite_id = self.suite_id;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.timeout {
            config.timeout_secs = v;
        }
        if self.yes {
            config.auto_answer = Some(true);
        } else if self.no {
            config.auto_answer = Some(false);
        }
        if self.verbose {
            config.verbose = true;
        }
        if let Some(v) = &self.file {
            config.file = Some(v.clone());
        }
    }
}
