//! 定义了策略评估和流控制器的可配置参数。
//! Defines configurable parameters for policy evaluation and the flow
//! controller.

/// A structure containing all configurable parameters for a Remy-driven flow.
///
/// 包含 Remy 驱动的流的所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct Config {
    /// The congestion window a flow starts with, before the first action has
    /// been applied.
    /// 在第一个动作被应用之前，流的初始拥塞窗口。
    pub initial_cwnd_packets: u32,

    /// The hard upper bound on the congestion window an action may produce.
    /// 动作可以产生的拥塞窗口的硬性上限。
    pub max_cwnd_packets: u32,

    /// The smoothing factor for the ack and send inter-arrival EWMAs.
    /// ack 与发送到达间隔 EWMA 的平滑因子。
    pub ewma_alpha: f64,

    /// If set, a freshly chosen action is re-used for a uniformly sampled
    /// number of acks in `0..=max_action_repeat` before the policy is
    /// queried again. Cuts lookup cost on dense ack streams.
    ///
    /// 若设置，新选出的动作会在再次查询策略之前，被复用于
    /// `0..=max_action_repeat` 中均匀采样的若干个 ack。可降低密集 ack
    /// 流上的查找开销。
    pub max_action_repeat: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_cwnd_packets: 1,
            max_cwnd_packets: 1_000_000,
            ewma_alpha: 1.0 / 8.0,
            max_action_repeat: None,
        }
    }
}
