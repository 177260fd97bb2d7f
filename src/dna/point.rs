//! 策略统计空间中的一个点。
//! A point in the policy's statistics space.

/// A snapshot of the flow statistics a policy decides on.
///
/// 策略据以决策的流统计快照。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Smoothed inter-arrival time of acks, in milliseconds.
    /// ack 到达间隔的平滑值（毫秒）。
    pub ack_ewma: f64,
    /// Smoothed inter-send time of the acked packets, in milliseconds.
    /// 被确认包的发送间隔的平滑值（毫秒）。
    pub send_ewma: f64,
    /// Current RTT over the minimum RTT observed so far. Unitless, >= 1.0 on
    /// a well-behaved path.
    /// 当前 RTT 与迄今观测到的最小 RTT 之比。无量纲，路径正常时 >= 1.0。
    pub rtt_ratio: f64,
}

impl Point {
    /// The lower corner of the default training domain.
    /// 默认训练域的下角点。
    pub const MIN: Point = Point {
        ack_ewma: 0.,
        send_ewma: 0.,
        rtt_ratio: 0.,
    };

    /// The upper corner of the default training domain, matching the bounds
    /// the original trainer uses.
    /// 默认训练域的上角点，与原始训练器使用的边界一致。
    pub const MAX: Point = Point {
        ack_ewma: 163_840.,
        send_ewma: 163_840.,
        rtt_ratio: 163_840.,
    };

    /// Replaces non-finite coordinates so that every lookup maps to some
    /// rule. NaN becomes zero; infinities keep their sign and are clamped by
    /// the tree descent itself.
    ///
    /// 替换非有限坐标，使每次查找都能映射到某条规则。NaN 变为零；
    /// 无穷大保留符号，由树的下降过程自行截断。
    #[must_use]
    pub fn sanitized(self) -> Point {
        fn fix(x: f64) -> f64 {
            if x.is_nan() { 0.0 } else { x }
        }
        Point {
            ack_ewma: fix(self.ack_ewma),
            send_ewma: fix(self.send_ewma),
            rtt_ratio: fix(self.rtt_ratio),
        }
    }
}
