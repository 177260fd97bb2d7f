//! 统计空间中的轴对齐长方体，即一条规则的定义域。
//! An axis-aligned box in the statistics space, i.e. the domain of one rule.

use super::point::Point;

/// The domain of a rule: half-open on every axis, `[min, max)`.
///
/// 一条规则的定义域：每个轴上半开，`[min, max)`。
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    /// The inclusive lower corner.
    /// 下角点（含）。
    pub min: Point,
    /// The exclusive upper corner.
    /// 上角点（不含）。
    pub max: Point,
}

impl Default for Cube {
    fn default() -> Self {
        Self {
            min: Point::MIN,
            max: Point::MAX,
        }
    }
}

fn within(min: f64, x: f64, max: f64) -> bool {
    min <= x && x < max
}

fn axis_distance(min: f64, x: f64, max: f64) -> f64 {
    if x < min {
        min - x
    } else if x >= max {
        x - max
    } else {
        0.0
    }
}

impl Cube {
    /// Whether the point lies inside this domain.
    /// 点是否位于此定义域内。
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        within(self.min.rtt_ratio, point.rtt_ratio, self.max.rtt_ratio)
            && within(self.min.ack_ewma, point.ack_ewma, self.max.ack_ewma)
            && within(self.min.send_ewma, point.send_ewma, self.max.send_ewma)
    }

    /// Squared distance from the point to this domain; zero iff contained.
    /// Used to clamp out-of-range lookups to the nearest rule.
    ///
    /// 点到此定义域的距离平方；点被包含时为零。用于将越界查找
    /// 截断到最近的规则。
    #[must_use]
    pub fn distance_squared(&self, point: &Point) -> f64 {
        let da = axis_distance(self.min.ack_ewma, point.ack_ewma, self.max.ack_ewma);
        let ds = axis_distance(self.min.send_ewma, point.send_ewma, self.max.send_ewma);
        let dr = axis_distance(self.min.rtt_ratio, point.rtt_ratio, self.max.rtt_ratio);
        da * da + ds * ds + dr * dr
    }
}
