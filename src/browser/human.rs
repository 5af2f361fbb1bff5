//! Human-like pointer and scroll activity
//!
//! Pointer paths follow a cubic Bézier curve with randomly offset control
//! points; scrolling is split into uneven increments with short pauses.

use crate::identity::Viewport;
use rand::Rng;
use std::time::Duration;

/// Pointer and scroll steps to replay in a rendered page
#[derive(Debug, Clone, PartialEq)]
pub struct HumanPlan {
    /// Viewport coordinates, start to end
    pub pointer_path: Vec<(i64, i64)>,
    /// Duration of each pointer move
    pub pointer_step: Duration,
    /// Vertical scroll deltas in pixels
    pub scroll_deltas: Vec<i64>,
    /// Pause after each scroll step
    pub scroll_pause: Duration,
}

/// Plans pointer movement and scrolling for one page visit
pub fn plan<R: Rng + ?Sized>(viewport: Viewport, rng: &mut R) -> HumanPlan {
    let width = f64::from(viewport.width.max(2));
    let height = f64::from(viewport.height.max(2));

    let from = (rng.gen_range(0.0..width), rng.gen_range(0.0..height));
    let to = (rng.gen_range(0.0..width), rng.gen_range(0.0..height));
    let steps = rng.gen_range(12..=30);

    let pointer_path = bezier_path(from, to, steps, rng)
        .into_iter()
        .map(|(x, y)| (clamp(x, width), clamp(y, height)))
        .collect();

    let page_height = rng.gen_range(2..=5) * i64::from(viewport.height);
    HumanPlan {
        pointer_path,
        pointer_step: Duration::from_millis(rng.gen_range(8..=25)),
        scroll_deltas: scroll_steps(page_height, rng),
        scroll_pause: Duration::from_millis(rng.gen_range(80..=250)),
    }
}

/// Points along a cubic Bézier curve from `from` to `to`
///
/// The two inner control points are placed at random along the straight line
/// and pushed off it by up to a quarter of the distance, which gives the
/// slight arc of a hand-driven pointer.
pub fn bezier_path<R: Rng + ?Sized>(
    from: (f64, f64),
    to: (f64, f64),
    steps: usize,
    rng: &mut R,
) -> Vec<(f64, f64)> {
    let steps = steps.max(2);
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let spread = (dx.hypot(dy) / 4.0).max(1.0);

    let mut control = || {
        let t: f64 = rng.gen_range(0.2..0.8);
        (
            from.0 + dx * t + rng.gen_range(-spread..spread),
            from.1 + dy * t + rng.gen_range(-spread..spread),
        )
    };
    let c1 = control();
    let c2 = control();

    (0..steps)
        .map(|i| {
            let t = i as f64 / (steps - 1) as f64;
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            (
                a * from.0 + b * c1.0 + c * c2.0 + d * to.0,
                a * from.1 + b * c1.1 + c * c2.1 + d * to.1,
            )
        })
        .collect()
}

/// Uneven scroll increments that add up to `distance`
pub fn scroll_steps<R: Rng + ?Sized>(distance: i64, rng: &mut R) -> Vec<i64> {
    let mut remaining = distance.max(0);
    let mut steps = Vec::new();
    while remaining > 0 {
        let step = rng.gen_range(120..=480).min(remaining);
        steps.push(step);
        remaining -= step;
    }
    steps
}

fn clamp(value: f64, limit: f64) -> i64 {
    value.round().clamp(0.0, limit - 1.0) as i64
}
