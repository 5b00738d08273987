//! 业务能力层（Services）
//!
//! 描述"我能做什么"：调用远端 API、询问用户、反馈进度

pub mod api_client;
pub mod progress;
pub mod prompter;

pub use api_client::{ApiClient, RemoteProject, RemoteSuite};
pub use progress::{IndicatifProgress, NoProgress, ProgressReporter};
pub use prompter::{AutoPrompter, Prompter, StdinPrompter};
