use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use testrail_upload::cli::Cli;
use testrail_upload::config::Config;
use testrail_upload::infrastructure::HttpTransport;
use testrail_upload::models::{EntityStore, ResultParser, TomlResultParser};
use testrail_upload::orchestrator::UploadOrchestrator;
use testrail_upload::services::{AutoPrompter, IndicatifProgress, Prompter, StdinPrompter};
use testrail_upload::utils::{init_tracing, TracingLogger};
use testrail_upload::workflow::UploadContext;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // 配置加载失败时日志可能尚未初始化
            init_tracing(false);
            error!("❌ {:#}", e);
            1
        }
    };
    // 被中断的确认提示可能仍阻塞在 stdin 上，直接退出而不等待运行时关闭
    std::process::exit(i32::from(code));
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();

    // 加载配置：默认值 → 配置文件 → 环境变量 → 命令行
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // 初始化日志
    init_tracing(config.verbose);

    config.validate()?;
    let file = config.file.clone().context("缺少结果文件")?;

    // 解析结果文件
    let suite = TomlResultParser::new(file).parse().await?;
    let mut store = EntityStore::new(suite).with_suite_id(config.suite_id);

    let transport = Arc::new(HttpTransport::new(&config)?);

    // Ctrl-C 只设置中断信号，由批量提交器负责取消与回收
    let interrupt = CancellationToken::new();
    let signal = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在停止...");
            signal.cancel();
        }
    });

    let prompter: Arc<dyn Prompter> = match config.auto_answer {
        Some(answer) => Arc::new(AutoPrompter::new(answer)),
        None => Arc::new(StdinPrompter),
    };
    let ctx = UploadContext::new(
        Arc::new(TracingLogger),
        prompter,
        Arc::new(IndicatifProgress::new()),
        interrupt,
    );

    let orchestrator = UploadOrchestrator::new(&config, transport, ctx);
    match orchestrator.upload(&mut store).await {
        Ok(_) => Ok(0),
        Err(e) => Ok(e.exit_code()),
    }
}
