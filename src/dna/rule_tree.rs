//! 把统计空间划分为规则的 whisker 树。
//! The whisker tree partitioning the statistics space into rules.

use super::action::Action;
use super::cube::Cube;
use super::point::Point;
use crate::error::{Error, Result};

/// One node of the flattened rule tree.
///
/// 扁平化规则树中的一个节点。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTreeNode {
    /// An interior node whose children partition its domain.
    /// 内部节点，其子节点划分其定义域。
    Node {
        /// The domain covered by this subtree.
        /// 此子树覆盖的定义域。
        domain: Cube,
        /// Arena indices of the children. Always precede this node's own
        /// index (the arena is stored in post-order).
        /// 子节点在 arena 中的下标。总是小于本节点自身的下标
        /// （arena 按后序存储）。
        children: Vec<usize>,
    },
    /// A leaf holding the action for its domain.
    /// 持有其定义域对应动作的叶子。
    Leaf {
        /// The domain this rule applies to.
        /// 此规则适用的定义域。
        domain: Cube,
        /// The trained action.
        /// 训练得到的动作。
        action: Action,
    },
}

impl RuleTreeNode {
    /// The domain of this node, leaf or not.
    /// 本节点的定义域，无论是否叶子。
    #[must_use]
    pub const fn domain(&self) -> &Cube {
        match self {
            RuleTreeNode::Node { domain, .. } | RuleTreeNode::Leaf { domain, .. } => domain,
        }
    }
}

/// A whisker tree stored as a post-order arena. Immutable once built, so
/// lookups can run concurrently from any number of threads.
///
/// 以后序 arena 存储的 whisker 树。构建后不可变，因此任意数量的线程都
/// 可以并发查找。
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTree {
    root: usize,
    nodes: Vec<RuleTreeNode>,
}

impl RuleTree {
    /// Builds a tree from an arena, validating the structural invariants:
    /// the arena is non-empty, interior nodes have at least one child, and
    /// children precede their parent.
    ///
    /// 由 arena 构建一棵树，并校验结构不变量：arena 非空、内部节点至少有
    /// 一个子节点、子节点排在父节点之前。
    pub fn new(nodes: Vec<RuleTreeNode>, root: usize) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::EmptyTree);
        }
        if root >= nodes.len() {
            return Err(Error::MalformedNode);
        }
        for (idx, node) in nodes.iter().enumerate() {
            if let RuleTreeNode::Node { children, .. } = node {
                if children.is_empty() || children.iter().any(|&child| child >= idx) {
                    return Err(Error::MalformedNode);
                }
            }
        }
        Ok(RuleTree { root, nodes })
    }

    /// A tree with a single rule covering the default training domain.
    /// 只有一条规则、覆盖默认训练域的树。
    #[must_use]
    pub fn single_rule(action: Action) -> Self {
        RuleTree {
            root: 0,
            nodes: vec![RuleTreeNode::Leaf {
                domain: Cube::default(),
                action,
            }],
        }
    }

    /// Looks up the action for a point. Total: a point outside every rule's
    /// domain is clamped to the nearest rule at each level of the descent,
    /// so a congestion-control callback can never fail mid-flow.
    ///
    /// 查找某个点对应的动作。全函数：落在所有规则定义域之外的点，在下降的
    /// 每一层被截断到最近的规则，因此拥塞控制回调绝不会在流中途失败。
    #[must_use]
    pub fn action(&self, point: &Point) -> &Action {
        let point = point.sanitized();
        let mut current = self.root;
        loop {
            match &self.nodes[current] {
                RuleTreeNode::Node { children, .. } => {
                    current = children
                        .iter()
                        .copied()
                        .find(|&idx| self.nodes[idx].domain().contains(&point))
                        .unwrap_or_else(|| self.nearest_child(children, &point));
                }
                RuleTreeNode::Leaf { action, .. } => return action,
            }
        }
    }

    // Children are non-empty by construction, so the fold always yields one.
    fn nearest_child(&self, children: &[usize], point: &Point) -> usize {
        let mut best = children[0];
        let mut best_distance = self.nodes[best].domain().distance_squared(point);
        for &idx in &children[1..] {
            let distance = self.nodes[idx].domain().distance_squared(point);
            if distance < best_distance {
                best = idx;
                best_distance = distance;
            }
        }
        best
    }

    /// The number of rules (leaves) in the tree.
    /// 树中规则（叶子）的数量。
    #[must_use]
    pub fn num_rules(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, RuleTreeNode::Leaf { .. }))
            .count()
    }

    pub(crate) const fn root(&self) -> usize {
        self.root
    }

    pub(crate) fn nodes(&self) -> &[RuleTreeNode] {
        &self.nodes
    }
}
