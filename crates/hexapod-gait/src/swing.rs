//! Swing foot trajectory.
//!
//! The foot moves on a straight line between its liftoff and touchdown
//! offsets while a parabolic lift `h · 4t(1 − t)` is added on the vertical
//! axis. The lift is zero at both ends and peaks at `h` when `t = 0.5`.

use nalgebra::Vector3;

/// Vertical lift at swing parameter `t` in `[0, 1]`.
pub fn lift_height(t: f32, step_height: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    step_height * 4.0 * t * (1.0 - t)
}

/// Foot offset at swing parameter `t` (clamped to `[0, 1]`).
pub fn swing_offset(
    start: &Vector3<f32>,
    end: &Vector3<f32>,
    t: f32,
    step_height: f32,
) -> Vector3<f32> {
    let t = t.clamp(0.0, 1.0);
    let mut offset = start.lerp(end, t);
    offset.y += lift_height(t, step_height);
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn swing_starts_at_start() {
        let start = Vector3::new(0.1, 0.0, 0.2);
        let end = Vector3::new(0.4, 0.0, -0.1);
        assert_relative_eq!(swing_offset(&start, &end, 0.0, 0.2), start);
    }

    #[test]
    fn swing_ends_at_end() {
        let start = Vector3::new(0.1, 0.0, 0.2);
        let end = Vector3::new(0.4, 0.0, -0.1);
        assert_relative_eq!(swing_offset(&start, &end, 1.0, 0.2), end, epsilon = 1e-6);
    }

    #[test]
    fn peak_lift_at_midpoint() {
        let start = Vector3::zeros();
        let end = Vector3::new(0.0, 0.0, 0.5);
        let mid = swing_offset(&start, &end, 0.5, 0.2);
        assert_relative_eq!(mid.y, 0.2, epsilon = 1e-6);
        assert_relative_eq!(mid.z, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn lift_is_symmetric() {
        assert_relative_eq!(lift_height(0.25, 0.2), lift_height(0.75, 0.2), epsilon = 1e-6);
        assert!(lift_height(0.5, 0.2) > lift_height(0.25, 0.2));
    }

    #[test]
    fn parameter_is_clamped() {
        let start = Vector3::zeros();
        let end = Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(swing_offset(&start, &end, 1.7, 0.2), end, epsilon = 1e-6);
        assert_relative_eq!(lift_height(-0.5, 0.2), 0.0);
    }
}
