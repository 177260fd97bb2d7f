//! 规则叶子所携带的发送动作。
//! The sending action carried by a rule leaf.

use std::fmt::{self, Display};
use std::time::Duration;

/// The action stored in a rule leaf, as trained: a linear window update plus
/// a minimum inter-send delay.
///
/// 规则叶子中按训练结果存储的动作：窗口的线性更新加上最小发送间隔。
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Multiplier applied to the current congestion window.
    /// 作用于当前拥塞窗口的乘数。
    pub window_multiplier: f64,
    /// Increment added after the multiplication. May be negative.
    /// 乘法之后加上的增量。可以为负。
    pub window_increment: i32,
    /// Minimum delay between consecutive sends, in milliseconds as stored in
    /// the DNA file. May be zero for unpaced sending.
    /// 相邻两次发送之间的最小间隔，按 DNA 文件中的毫秒存储。为零表示不做
    /// 节拍控制。
    pub intersend_ms: f64,
}

impl Action {
    /// Applies the window update to a current window, clamped into
    /// `0..=max_window`. A result of zero is a valid stall decision.
    ///
    /// 将窗口更新应用到当前窗口，截断到 `0..=max_window`。结果为零是
    /// 合法的停发决策。
    #[must_use]
    pub fn apply_to(&self, window: u32, max_window: u32) -> u32 {
        let updated = f64::from(window) * self.window_multiplier + f64::from(self.window_increment);
        if updated.is_nan() {
            return 0;
        }
        // f64 -> u32 after explicit range clamp
        updated.clamp(0.0, f64::from(max_window)) as u32
    }

    /// The inter-send delay as a `Duration`. Negative stored values clamp to
    /// zero, so the returned delay is never negative.
    ///
    /// 以 `Duration` 表示的发送间隔。存储值为负时截断为零，因此返回的
    /// 间隔永不为负。
    #[must_use]
    pub fn intersend(&self) -> Duration {
        let seconds = self.intersend_ms / 1000.0;
        if seconds.is_finite() && seconds > 0.0 {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::ZERO
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action {{ window_multiplier: {:.3}, window_increment: {}, intersend_ms: {:.3} }}",
            self.window_multiplier, self.window_increment, self.intersend_ms,
        )
    }
}

/// The outcome of one policy evaluation: the next congestion window and the
/// pacing delay to respect while it is in force.
///
/// 一次策略评估的结果：下一个拥塞窗口，以及其生效期间应遵守的节拍间隔。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    /// The congestion window to use from now on, in packets.
    /// 从现在起使用的拥塞窗口（以包为单位）。
    pub new_window: u32,
    /// The minimum delay between consecutive sends.
    /// 相邻两次发送之间的最小间隔。
    pub intersend: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_to_clamps_below_zero() {
        let action = Action {
            window_multiplier: 0.5,
            window_increment: -10,
            intersend_ms: 0.0,
        };
        assert_eq!(action.apply_to(4, 1_000_000), 0);
    }

    #[test]
    fn test_apply_to_clamps_above_max() {
        let action = Action {
            window_multiplier: 1000.0,
            window_increment: 0,
            intersend_ms: 0.0,
        };
        assert_eq!(action.apply_to(5000, 1_000_000), 1_000_000);
    }

    #[test]
    fn test_apply_to_rounds_toward_zero() {
        let action = Action {
            window_multiplier: 1.5,
            window_increment: 1,
            intersend_ms: 0.0,
        };
        // 5 * 1.5 + 1 = 8.5 -> 8
        assert_eq!(action.apply_to(5, 1_000_000), 8);
    }

    #[test]
    fn test_intersend_never_negative() {
        let action = Action {
            window_multiplier: 1.0,
            window_increment: 0,
            intersend_ms: -3.0,
        };
        assert_eq!(action.intersend(), Duration::ZERO);
        let action = Action {
            intersend_ms: 2.5,
            ..action
        };
        assert_eq!(action.intersend(), Duration::from_micros(2500));
    }
}
