//! 基础设施层（Infrastructure）
//!
//! 持有网络连接，只暴露"发请求"的能力，不认识套件 / 用例

pub mod http_transport;
pub mod transport;

pub use http_transport::HttpTransport;
pub use transport::{Method, Transport};
