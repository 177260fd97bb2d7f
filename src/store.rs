//! 按路径缓存已加载策略的并发存储。
//! A concurrent store caching loaded policies by path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::dna::RemyDna;
use crate::error::Result;

/// A path-keyed store of loaded policies.
///
/// Each DNA file is parsed once and then shared: every flow using the same
/// policy gets a clone of one `Arc<RemyDna>`. Ownership replaces manual
/// release — the memory goes away when the store entry is evicted and the
/// last flow drops its handle, so use-after-release and double-release are
/// unrepresentable. Evicting while other threads still evaluate is safe.
///
/// 以路径为键的已加载策略存储。
///
/// 每个 DNA 文件只解析一次后共享：使用同一策略的每条流得到同一个
/// `Arc<RemyDna>` 的克隆。所有权取代了手工释放——存储条目被逐出且最后
/// 一条流放下句柄后内存即释放，因此释放后使用与重复释放无从表达。
/// 其他线程仍在评估时逐出也是安全的。
#[derive(Debug, Default)]
pub struct PolicyStore {
    policies: DashMap<PathBuf, Arc<RemyDna>>,
}

impl PolicyStore {
    /// Creates an empty store.
    /// 创建一个空存储。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the policy for `path`, loading it on first use.
    ///
    /// A failed load inserts nothing, so a corrected file can be retried at
    /// the same path.
    ///
    /// 返回 `path` 对应的策略，首次使用时加载。
    ///
    /// 加载失败不会插入任何条目，因此修正后的文件可以在同一路径重试。
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<RemyDna>> {
        if let Some(policy) = self.policies.get(path) {
            return Ok(Arc::clone(&policy));
        }
        // Two racing loaders may both parse; entry() makes one result win
        // and both callers share it.
        let loaded = Arc::new(RemyDna::load(path)?);
        let shared = self
            .policies
            .entry(path.to_path_buf())
            .or_insert(loaded)
            .clone();
        debug!(path = %path.display(), cached = self.policies.len(), "policy ready");
        Ok(shared)
    }

    /// Removes a policy from the store. Returns whether an entry existed.
    /// Flows still holding the `Arc` keep evaluating undisturbed.
    ///
    /// 从存储中移除一个策略。返回是否存在条目。仍持有 `Arc` 的流不受
    /// 影响，继续评估。
    pub fn evict(&self, path: &Path) -> bool {
        let removed = self.policies.remove(path).is_some();
        if removed {
            debug!(path = %path.display(), "policy evicted");
        }
        removed
    }

    /// Drops every cached policy.
    /// 丢弃所有缓存的策略。
    pub fn clear(&self) {
        self.policies.clear();
    }

    /// The number of cached policies.
    /// 缓存的策略数量。
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the store is empty.
    /// 存储是否为空。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
