//! Bicubic resampling of square rasters.
//!
//! The kernel is a separable cubic spline through the samples with
//! parabolically terminated ends: every row is resampled first, then every
//! column of the intermediate grid. Source and target grids are corner
//! aligned, so the four corner samples map onto each other exactly.
//!
//! Lines are independent and run in parallel with rayon. The arithmetic per
//! line is sequential, so the output does not depend on the thread count.

use crate::raster::{Raster, VoidPolicy};
use rayon::prelude::*;

/// Resample `src` to `target` samples per side.
///
/// Void samples are replaced by the policy's fill value before
/// interpolation. Output samples are rounded to the nearest integer and
/// clamped to the `i16` range.
pub fn resample(src: &Raster, target: usize, void: &VoidPolicy) -> Raster {
    let n = src.size();
    let values: Vec<f64> = src
        .samples()
        .iter()
        .map(|&s| f64::from(void.apply(s)))
        .collect();

    // rows: n x n -> n x target
    let rows = resample_lines(&values, n, target);
    drop(values);
    // columns: transpose, resample, transpose back
    let columns = transpose(&rows, n, target);
    drop(rows);
    let cols = resample_lines(&columns, n, target);
    drop(columns);
    let out = transpose(&cols, target, target);

    let data = out.into_iter().map(to_sample).collect();
    // Length is target * target by construction
    Raster::from_vec(target, data).unwrap_or_else(|_| Raster::new(target))
}

fn to_sample(v: f64) -> i16 {
    (v + 0.5)
        .floor()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Resample each `src_len` line of `data` to `dst_len` samples.
fn resample_lines(data: &[f64], src_len: usize, dst_len: usize) -> Vec<f64> {
    let lines = data.len() / src_len.max(1);
    let mut out = vec![0.0; lines * dst_len];
    out.par_chunks_mut(dst_len)
        .zip(data.par_chunks(src_len))
        .for_each_init(
            || vec![0.0; src_len],
            |slopes, (dst, src)| resample_line(src, dst, slopes),
        );
    out
}

/// `rows x cols` row-major to `cols x rows` row-major.
fn transpose(data: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}

/// Resample one line. `slopes` is scratch space of `src.len()`.
fn resample_line(src: &[f64], dst: &mut [f64], slopes: &mut [f64]) {
    let n = src.len();
    let m = dst.len();
    if n == 0 || m == 0 {
        return;
    }
    if n == 1 {
        dst.fill(src[0]);
        return;
    }

    spline_slopes(src, slopes);
    let scale = if m > 1 {
        (n - 1) as f64 / (m - 1) as f64
    } else {
        0.0
    };
    for (j, out) in dst.iter_mut().enumerate() {
        let t = j as f64 * scale;
        let k = (t.floor() as usize).min(n - 2);
        let s = t - k as f64;
        *out = hermite(src[k], src[k + 1], slopes[k], slopes[k + 1], s);
    }
}

/// Cubic Hermite interpolation on the unit interval.
#[inline]
fn hermite(y0: f64, y1: f64, d0: f64, d1: f64, s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    (2.0 * s3 - 3.0 * s2 + 1.0) * y0
        + (s3 - 2.0 * s2 + s) * d0
        + (-2.0 * s3 + 3.0 * s2) * y1
        + (s3 - s2) * d1
}

/// First derivatives of the cubic spline through `y` at unit spacing.
///
/// Ends are parabolically terminated. Two-point lines are linear.
fn spline_slopes(y: &[f64], d: &mut [f64]) {
    let n = y.len();
    if n == 2 {
        let slope = y[1] - y[0];
        d[0] = slope;
        d[1] = slope;
        return;
    }

    // Tridiagonal system, solved with the Thomas algorithm. `d` holds the
    // modified right-hand side and `c` the modified super-diagonal.
    let mut c = vec![0.0; n];
    c[0] = 1.0;
    d[0] = 2.0 * (y[1] - y[0]);
    for i in 1..n {
        let (a, b, upper, rhs) = if i == n - 1 {
            (1.0, 1.0, 0.0, 2.0 * (y[i] - y[i - 1]))
        } else {
            (1.0, 4.0, 1.0, 3.0 * (y[i + 1] - y[i - 1]))
        };
        let m = b - a * c[i - 1];
        c[i] = upper / m;
        d[i] = (rhs - a * d[i - 1]) / m;
    }
    for i in (0..n - 1).rev() {
        d[i] -= c[i] * d[i + 1];
    }
}
