//! 批量提交的输入与输出单元

use serde_json::Value;

/// 等待提交的创建请求
///
/// `key` 指回本地实体树中的位置，`path` 中已经带上父级 ID
/// （例如 `add_case/{section_id}`），`weight` 是进度条推进量。
#[derive(Debug, Clone)]
pub struct PendingBody<K> {
    pub key: K,
    pub path: String,
    pub body: Value,
    pub weight: u64,
}

impl<K> PendingBody<K> {
    pub fn new(key: K, path: impl Into<String>, body: Value) -> Self {
        Self {
            key,
            path: path.into(),
            body,
            weight: 1,
        }
    }

    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }
}

/// 已成功完成的请求
#[derive(Debug, Clone)]
pub struct Completed<K> {
    pub key: K,
    pub response: Value,
    pub weight: u64,
}

/// 分区在本地树中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey(pub usize);

/// 用例在本地树中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseKey {
    pub section: usize,
    pub case: usize,
}

/// 结果分块的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(pub usize);
