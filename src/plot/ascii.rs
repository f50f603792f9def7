//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Layers, later ones drawn on top:
//! - every converged bootstrap line: `.`
//! - median bootstrap line: `=`
//! - original best fit: `-`
//! - data points: `o` detected, `v` Y upper limit, `<` X upper limit, `x` both

use crate::domain::{BootstrapEnsemble, Dataset, FitResult, SummaryStats};
use crate::models::Censoring;

pub const DEFAULT_WIDTH: usize = 72;
pub const DEFAULT_HEIGHT: usize = 24;

/// Render the dataset with the fitted lines of a run.
///
/// The median line is only drawn when `summary` is given.
pub fn render_ascii_plot(
    data: &Dataset,
    ensemble: &BootstrapEnsemble,
    summary: Option<&SummaryStats>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(data).unwrap_or((0.0, 1.0));
    let original = &ensemble.original;
    let (y_min, y_max) = y_range(data, original, x_min, x_max).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let frame = Frame {
        x_min,
        x_max,
        y_min,
        y_max,
        width,
        height,
    };

    let mut grid = vec![vec![' '; width]; height];

    for fit in ensemble.converged_fits() {
        draw_fit_line(&mut grid, &frame, fit.intercept, fit.slope, '.');
    }
    if let Some(s) = summary {
        draw_fit_line(
            &mut grid,
            &frame,
            s.intercept.median_across_trials,
            s.slope.median_across_trials,
            '=',
        );
    }
    draw_fit_line(&mut grid, &frame, original.intercept, original.slope, '-');

    for p in data.points() {
        let col = map_x(p.x, x_min, x_max, width);
        let row = map_y(p.y, y_min, y_max, height).clamp(0, height as isize - 1) as usize;
        grid[row][col] = point_symbol(p.censoring());
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

pub fn point_symbol(censoring: Censoring) -> char {
    match censoring {
        Censoring::BothDetected => 'o',
        Censoring::XDetectedYCensored => 'v',
        Censoring::YDetectedXCensored => '<',
        Censoring::BothCensored => 'x',
    }
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

fn x_range(data: &Dataset) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for p in data.points() {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

/// Data points plus the original line at both ends of the x range.
fn y_range(data: &Dataset, original: &FitResult, x_min: f64, x_max: f64) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let line_ends = [original.line_at(x_min), original.line_at(x_max)];
    for y in data.points().iter().map(|p| p.y).chain(line_ends) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

/// Row for `y`, unclamped so off-grid lines stay straight; row 0 is the top.
fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> isize {
    let height = height.max(2) as f64;
    let u = (y - y_min) / (y_max - y_min);
    let row = (height - 1.0 - u * (height - 1.0)).round();
    row.clamp(-1e6, 1e6) as isize
}

/// Sample `a + b·x` once per column and join the samples.
fn draw_fit_line(grid: &mut [Vec<char>], frame: &Frame, intercept: f64, slope: f64, ch: char) {
    if !(intercept.is_finite() && slope.is_finite()) {
        return;
    }
    let mut prev: Option<(isize, isize)> = None;
    for col in 0..frame.width {
        let u = col as f64 / (frame.width as f64 - 1.0);
        let x = frame.x_min + u * (frame.x_max - frame.x_min);
        let row = map_y(intercept + slope * x, frame.y_min, frame.y_max, frame.height);
        let here = (col as isize, row);
        let (x0, y0) = prev.unwrap_or(here);
        draw_line(grid, x0, y0, here.0, here.1, ch);
        prev = Some(here);
    }
}

/// Integer line drawing (Bresenham-ish); cells outside the grid are skipped.
fn draw_line(grid: &mut [Vec<char>], x0: isize, y0: isize, x1: isize, y1: isize, ch: char) {
    let mut x0 = x0;
    let mut y0 = y0;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
