//! Easing curves for committed transitions

use serde::{Deserialize, Serialize};

/// Easing function applied to normalized time
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseOutQuad,
    #[default]
    EaseOutCubic,
    EaseInOutCubic,
    EaseOutQuart,
    /// CSS-style `cubic-bezier(x1, y1, x2, y2)`
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Map `t` in `[0, 1]` to eased progress. Inputs outside the range are clamped.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t).powi(2),
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    1.0 - (2.0 - 2.0 * t).powi(3) / 2.0
                }
            }
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::CubicBezier(x1, y1, x2, y2) => bezier_ease(t, x1, y1, x2, y2),
        }
    }
}

/// Solve the bezier x(s) = t for s, then return y(s).
///
/// Newton iterations first; bisection when the slope flattens out.
fn bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if t <= 0.0 || t >= 1.0 {
        return t;
    }

    let target = t as f64;
    let (x1, y1, x2, y2) = (x1 as f64, y1 as f64, x2 as f64, y2 as f64);

    let mut s = target;
    for _ in 0..8 {
        let err = curve(s, x1, x2) - target;
        if err.abs() < 1e-7 {
            return curve(s, y1, y2) as f32;
        }
        let slope = curve_slope(s, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        s = (s - err / slope).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    s = target;
    for _ in 0..24 {
        let x = curve(s, x1, x2);
        if (x - target).abs() < 1e-7 {
            break;
        }
        if x < target {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) * 0.5;
    }

    curve(s, y1, y2) as f32
}

/// One axis of a cubic bezier anchored at 0 and 1
#[inline]
fn curve(s: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * s + b) * s + c) * s
}

#[inline]
fn curve_slope(s: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * s + 2.0 * b) * s + c
}
