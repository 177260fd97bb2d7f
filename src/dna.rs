//! 已加载的 Remy 策略及其评估接口。
//! The loaded Remy policy and its evaluation interface.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, Result};

pub mod action;
pub mod codec;
pub mod cube;
pub mod point;
pub mod rule_tree;

pub use action::{Action, Reaction};
pub use cube::Cube;
pub use point::Point;
pub use rule_tree::{RuleTree, RuleTreeNode};

/// The filename suffix of a serialized whisker tree.
/// 序列化 whisker 树的文件名后缀。
pub const DNA_SUFFIX: &str = ".remy.dna";

/// The window bound used when evaluating a bare policy, matching the
/// trainer's clamp. Flows that want a different bound go through
/// [`crate::controller`] and its config.
///
/// 直接评估策略时使用的窗口上限，与训练器的截断一致。需要其他上限的流
/// 应通过 [`crate::controller`] 及其配置。
pub const DEFAULT_MAX_CWND: u32 = 1_000_000;

/// A trait for congestion-control policies queried per ack.
///
/// 每个 ack 查询一次的拥塞控制策略的 trait。
pub trait RemyPolicy: Send + Sync {
    /// Returns the action for a statistics snapshot. Total: implementations
    /// clamp out-of-range points rather than fail.
    ///
    /// 返回统计快照对应的动作。全函数：实现对越界的点做截断而不是失败。
    fn action(&self, point: &Point) -> Action;
}

impl<T: RemyPolicy + ?Sized> RemyPolicy for &T {
    fn action(&self, point: &Point) -> Action {
        T::action(self, point)
    }
}

impl<T: RemyPolicy + ?Sized> RemyPolicy for std::sync::Arc<T> {
    fn action(&self, point: &Point) -> Action {
        T::action(self, point)
    }
}

/// A loaded congestion-control policy. Immutable after construction, so a
/// shared reference is all that evaluation ever needs, and any number of
/// threads may evaluate concurrently. Releasing is just dropping the value.
///
/// 已加载的拥塞控制策略。构建后不可变，评估只需要共享引用，任意数量的
/// 线程都可以并发评估。释放即丢弃该值。
#[derive(Debug, Clone, PartialEq)]
pub struct RemyDna {
    tree: RuleTree,
}

impl RemyDna {
    /// Wraps a rule tree as a policy.
    /// 将规则树包装为策略。
    #[must_use]
    pub const fn new(tree: RuleTree) -> Self {
        RemyDna { tree }
    }

    /// Whether the path carries the `.remy.dna` suffix.
    /// 路径是否带有 `.remy.dna` 后缀。
    #[must_use]
    pub fn valid_path(path: &Path) -> bool {
        path.to_str().is_some_and(|p| p.ends_with(DNA_SUFFIX))
    }

    /// Loads a policy from a DNA file.
    ///
    /// Fails with [`Error::NotFound`] if the path does not resolve,
    /// [`Error::InvalidPath`] for a non-DNA suffix (notably the neural
    /// `.remyr.dna` variant, which this crate does not evaluate), and a
    /// parse error if the contents are not a well-formed whisker tree.
    ///
    /// 从 DNA 文件加载策略。
    ///
    /// 路径无法解析时返回 [`Error::NotFound`]；后缀不是 DNA（特别是本库
    /// 不评估的神经网络 `.remyr.dna` 变体）时返回 [`Error::InvalidPath`]；
    /// 内容不是合法 whisker 树时返回解析错误。
    pub fn load(path: &Path) -> Result<Self> {
        if !Self::valid_path(path) {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        let buf = fs::read(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::NotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let tree = codec::decode(Bytes::from(buf))?;
        debug!(path = %path.display(), rules = tree.num_rules(), "loaded DNA");
        Ok(RemyDna { tree })
    }

    /// Serializes the policy back to a DNA file.
    /// 将策略重新序列化为 DNA 文件。
    pub fn save(&self, path: &Path) -> Result<()> {
        if !Self::valid_path(path) {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        fs::write(path, codec::encode(&self.tree))?;
        debug!(path = %path.display(), rules = self.tree.num_rules(), "saved DNA");
        Ok(())
    }

    /// Serializes the policy to wire bytes.
    /// 将策略序列化为线路字节。
    #[must_use]
    pub fn serialize(&self) -> Bytes {
        codec::encode(&self.tree)
    }

    /// Deserializes a policy from wire bytes.
    /// 从线路字节反序列化策略。
    pub fn deserialize(buf: Bytes) -> Result<Self> {
        Ok(RemyDna {
            tree: codec::decode(buf)?,
        })
    }

    /// The underlying rule tree.
    /// 底层规则树。
    #[must_use]
    pub const fn tree(&self) -> &RuleTree {
        &self.tree
    }

    /// Evaluates the policy for one decision epoch: picks the rule for the
    /// snapshot and applies its window update to `current_window`. Pure,
    /// deterministic, and total over finite inputs.
    ///
    /// 为一个决策周期评估策略：选出快照对应的规则，并将其窗口更新应用到
    /// `current_window`。纯函数、确定性，对有限输入是全函数。
    #[must_use]
    pub fn evaluate(&self, point: &Point, current_window: u32) -> Reaction {
        let action = self.tree.action(point);
        Reaction {
            new_window: action.apply_to(current_window, DEFAULT_MAX_CWND),
            intersend: action.intersend(),
        }
    }
}

impl RemyPolicy for RemyDna {
    fn action(&self, point: &Point) -> Action {
        self.tree.action(point).clone()
    }
}
