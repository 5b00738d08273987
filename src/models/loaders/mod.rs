pub mod toml_loader;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::entities::Suite;

pub use toml_loader::{load_toml_to_suite, TomlResultParser};

/// 结果文件解析器
///
/// 把输入文件转换为本地实体树，具体格式由实现决定
#[async_trait]
pub trait ResultParser: Send + Sync {
    async fn parse(&self) -> Result<Suite>;
}
