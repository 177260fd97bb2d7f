//! 由 Remy 策略驱动的单流拥塞控制器。
//! A per-flow congestion controller driven by a Remy policy.
//!
//! The policy itself is a pure lookup; this module owns the state around it:
//! the smoothed inter-arrival statistics, the RTT bookkeeping, and the
//! currently applied action. Time is supplied by the caller as offsets from
//! an arbitrary flow epoch, so both real and simulated clocks work.
//!
//! 策略本身是纯查找；本模块持有其周边状态：平滑的到达间隔统计、RTT 记录
//! 以及当前生效的动作。时间由调用者以任意流起点的偏移量提供，因此真实
//! 时钟和模拟时钟都可使用。

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::Config;
use crate::dna::{Action, Point, RemyPolicy};

/// A trait for per-flow congestion controllers.
///
/// 单流拥塞控制器的 trait。
pub trait CongestionControl: Send + 'static {
    /// Called when a packet is acknowledged. `sent_time` is when the acked
    /// packet left, `received_time` when its ack arrived; both are offsets
    /// from the flow's epoch.
    ///
    /// 当一个包被确认时调用。`sent_time` 是被确认包的发出时刻，
    /// `received_time` 是其 ack 的到达时刻；二者都是流起点的偏移量。
    fn on_ack(&mut self, sent_time: Duration, received_time: Duration);

    /// Called when a packet is sent.
    ///
    /// 当一个包被发出时调用。
    fn on_packet_sent(&mut self, now: Duration);

    /// Gets the current congestion window size in packets.
    ///
    /// 获取当前的拥塞窗口大小（以包为单位）。
    fn congestion_window(&self) -> u32;

    /// Gets the minimum delay to respect between consecutive sends.
    ///
    /// 获取相邻两次发送之间应遵守的最小间隔。
    fn intersend(&self) -> Duration;
}

/// An exponentially weighted moving average, unset until the first sample.
/// 指数加权移动平均，收到第一个样本前无值。
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    value: Option<f64>,
}

impl Ewma {
    /// Creates an EWMA with the given smoothing factor.
    /// 以给定平滑因子创建一个 EWMA。
    #[must_use]
    pub const fn new(alpha: f64) -> Self {
        Ewma { alpha, value: None }
    }

    /// Folds in a new sample.
    /// 并入一个新样本。
    pub fn update(&mut self, sample: f64) {
        self.value = Some(match self.value {
            Some(previous) => self.alpha * sample + (1.0 - self.alpha) * previous,
            None => sample,
        });
    }

    /// The current average, if any sample has arrived.
    /// 当前均值（若已有样本）。
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        self.value
    }
}

#[derive(Debug, Clone)]
struct Rtt {
    min: Duration,
    current: Duration,
}

/// A congestion controller that queries a Remy policy on every ack.
///
/// 每个 ack 查询一次 Remy 策略的拥塞控制器。
pub struct RemyController<T> {
    policy: T,
    config: Config,
    ack_ewma: Ewma,
    send_ewma: Ewma,
    last_ack: Option<Duration>,
    last_ack_send: Option<Duration>,
    rtt: Option<Rtt>,
    last_send: Option<Duration>,
    /// Remaining acks for which the held action keeps being re-used.
    /// 当前动作继续被复用的剩余 ack 数。
    repeat: Option<(u32, Action)>,
    rng: SmallRng,
    cwnd: u32,
    intersend: Duration,
}

impl<T> std::fmt::Debug for RemyController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemyController")
            .field("ack_ewma", &self.ack_ewma)
            .field("send_ewma", &self.send_ewma)
            .field("rtt", &self.rtt)
            .field("cwnd", &self.cwnd)
            .field("intersend", &self.intersend)
            .finish_non_exhaustive()
    }
}

impl<T> RemyController<T>
where
    T: RemyPolicy,
{
    /// Creates a controller for one flow.
    /// 为一条流创建控制器。
    #[must_use]
    pub fn new(policy: T, config: Config) -> Self {
        let cwnd = config.initial_cwnd_packets;
        RemyController {
            policy,
            ack_ewma: Ewma::new(config.ewma_alpha),
            send_ewma: Ewma::new(config.ewma_alpha),
            last_ack: None,
            last_ack_send: None,
            rtt: None,
            last_send: None,
            repeat: None,
            rng: SmallRng::from_os_rng(),
            cwnd,
            intersend: Duration::ZERO,
            config,
        }
    }

    /// The statistics snapshot the policy is queried with.
    /// 查询策略时使用的统计快照。
    fn point(&self) -> Point {
        Point {
            ack_ewma: self.ack_ewma.value().unwrap_or(0.0),
            send_ewma: self.send_ewma.value().unwrap_or(0.0),
            rtt_ratio: self.rtt.as_ref().map_or(0.0, |rtt| {
                if rtt.min.is_zero() {
                    1.0
                } else {
                    rtt.current.as_secs_f64() / rtt.min.as_secs_f64()
                }
            }),
        }
    }

    fn next_action(&mut self) -> Action {
        if let Some((remaining, action)) = &mut self.repeat {
            let action = action.clone();
            if *remaining == 0 {
                self.repeat = None;
            } else {
                *remaining -= 1;
            }
            return action;
        }
        let action = self.policy.action(&self.point());
        if let Some(max_repeat) = self.config.max_action_repeat {
            let count = self.rng.random_range(0..=max_repeat);
            self.repeat = Some((count, action.clone()));
        }
        action
    }

    /// The earliest time the next packet may be sent, if pacing applies.
    /// Never earlier than `now`, so a caller that polls late is not handed
    /// a deadline in the past.
    ///
    /// 若有节拍限制，下一个包最早可发送的时刻。不早于 `now`，因此轮询
    /// 迟到的调用者不会拿到一个已经过去的时限。
    #[must_use]
    pub fn next_send_time(&self, now: Duration) -> Option<Duration> {
        self.last_send.map(|sent| (sent + self.intersend).max(now))
    }
}

impl<T> CongestionControl for RemyController<T>
where
    T: RemyPolicy + 'static,
{
    fn on_ack(&mut self, sent_time: Duration, received_time: Duration) {
        if let Some(last_ack) = self.last_ack {
            self.ack_ewma
                .update(received_time.saturating_sub(last_ack).as_secs_f64() * 1000.0);
        }
        if let Some(last_ack_send) = self.last_ack_send {
            self.send_ewma
                .update(sent_time.saturating_sub(last_ack_send).as_secs_f64() * 1000.0);
        }
        self.last_ack = Some(received_time);
        self.last_ack_send = Some(sent_time);

        let current = received_time.saturating_sub(sent_time);
        let min = self
            .rtt
            .as_ref()
            .map_or(current, |rtt| rtt.min.min(current));
        self.rtt = Some(Rtt { min, current });

        let action = self.next_action();
        self.cwnd = action.apply_to(self.cwnd, self.config.max_cwnd_packets);
        self.intersend = action.intersend();
        trace!(
            cwnd = self.cwnd,
            intersend_us = self.intersend.as_micros() as u64,
            rtt_ratio = self.point().rtt_ratio,
            "applied action"
        );
    }

    fn on_packet_sent(&mut self, now: Duration) {
        self.last_send = Some(now);
    }

    fn congestion_window(&self) -> u32 {
        self.cwnd
    }

    fn intersend(&self) -> Duration {
        self.intersend
    }
}
