//! Finite-difference normal/tangent estimation
//!
//! Works on any row-major height sample grid: the coarse field and the
//! sub-tile patches share this estimator. Central differences where both
//! neighbors exist, single-step differences at the borders. The
//! `skip_border` variant additionally avoids sampling the outermost
//! row/column so coarse-mesh edges do not pick up samples that a sub-tile
//! is about to replace.

use glam::DVec3;

/// Slope along one axis: `(dz, run)` for sample `i` of `m`.
fn axis_slope(i: usize, m: usize, step: f64, skip_border: bool, s: impl Fn(usize) -> f64) -> (f64, f64) {
    if skip_border && m >= 4 {
        if i > 1 && i < m - 2 {
            (s(i + 1) - s(i - 1), step * 2.0)
        } else if i == 0 {
            (s(2) - s(1), step)
        } else if i == 1 {
            (s(2) - s(1), step)
        } else if i == m - 1 {
            (s(m - 2) - s(m - 3), step)
        } else {
            // i == m - 2
            (s(i) - s(i - 1), step)
        }
    } else if i != 0 && i != m - 1 {
        (s(i + 1) - s(i - 1), step * 2.0)
    } else if i == 0 {
        (s(1) - s(0), step)
    } else {
        (s(i) - s(i - 1), step)
    }
}

/// Estimates the unit normal and tangent at sample `(x, y)` of a
/// `mx x my` height grid (`heights` row-major with stride `mx`).
/// `scale` applies the world x/y/z scale factors to the slopes. Flat
/// patches yield normal `(0, 0, 1)`.
pub fn normal_tangent(
    x: usize,
    y: usize,
    mx: usize,
    my: usize,
    step_x: f64,
    step_y: f64,
    scale: [f64; 3],
    heights: &[f64],
    skip_border: bool,
) -> ([f32; 3], [f32; 4]) {
    let (dz_x, run_x) = axis_slope(x, mx, step_x, skip_border, |i| heights[y * mx + i]);
    let (dz_y, run_y) = axis_slope(y, my, step_y, skip_border, |i| heights[i * mx + x]);

    let vz1 = dz_x * scale[2];
    let vx1 = run_x * scale[0];
    let vz2 = dz_y * scale[2];
    let vy2 = run_y * scale[1];

    let normal = DVec3::new(-vz1 * vy2, -vz2 * vx1, vx1 * vy2).normalize();
    let tangent = DVec3::new(vx1, vy2, vz1 + vz2).normalize();

    (
        [normal.x as f32, normal.y as f32, normal.z as f32],
        [tangent.x as f32, tangent.y as f32, tangent.z as f32, 0.0],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: [f64; 3] = [1.0, 1.0, 1.0];

    fn len3(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn test_flat_patch_points_up() {
        let heights = vec![2.5; 25];
        for skip in [false, true] {
            let (n, t) = normal_tangent(2, 2, 5, 5, 1.0, 1.0, SCALE, &heights, skip);
            assert!((n[0]).abs() < 1e-6 && (n[1]).abs() < 1e-6);
            assert!((n[2] - 1.0).abs() < 1e-6);
            assert!((len3([t[0], t[1], t[2]]) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_inclined_plane_slope() {
        // h = x over a 5x5 grid, step 1: slope 1 in x, 0 in y
        let mut heights = vec![0.0; 25];
        for y in 0..5 {
            for x in 0..5 {
                heights[y * 5 + x] = x as f64;
            }
        }
        let (n, _) = normal_tangent(2, 2, 5, 5, 1.0, 1.0, SCALE, &heights, false);
        // normal of z = x is (-1, 0, 1) / sqrt(2)
        let inv_sqrt2 = std::f32::consts::FRAC_1_SQRT_2;
        assert!((n[0] + inv_sqrt2).abs() < 1e-6);
        assert!(n[1].abs() < 1e-6);
        assert!((n[2] - inv_sqrt2).abs() < 1e-6);
        assert!((len3(n) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_border_skip_ignores_outer_samples() {
        // spike the outermost column; the skip variant at x=0 must not see it
        let mut heights = vec![0.0; 25];
        for y in 0..5 {
            heights[y * 5] = 100.0;
        }
        let (n, _) = normal_tangent(0, 2, 5, 5, 1.0, 1.0, SCALE, &heights, true);
        assert!((n[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_small_grid_falls_back_to_plain_differences() {
        // 2 samples per axis cannot skip a 2-wide border
        let heights = vec![0.0, 1.0, 0.0, 1.0];
        let (n, _) = normal_tangent(0, 0, 2, 2, 1.0, 1.0, SCALE, &heights, true);
        assert!(n[0] < 0.0);
        assert!((len3(n) - 1.0).abs() < 1e-6);
    }
}
