//! # Chart Rendering Module
//!
//! Rendering dei due grafici PNG del report tramite le primitive raster
//! della crate `image`:
//! - bar chart delle riduzioni per file (valori negativi clampati a zero,
//!   per non mostrare una barra verso l'alto quando il file è cresciuto)
//! - pie chart del totale original vs optimized
//!
//! Le etichette e i titoli vivono nell'HTML che incapsula le immagini.

use crate::error::OptimizeError;
use crate::result::{BatchTotals, OptimizationResult};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const BAR_CHART_FILE: &str = "per_file_savings.png";
pub const PIE_CHART_FILE: &str = "total_pie.png";

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const BAR: Rgb<u8> = Rgb([66, 133, 244]);
const BEFORE: Rgb<u8> = Rgb([79, 129, 189]);
const AFTER: Rgb<u8> = Rgb([237, 125, 49]);

/// Paths of the two rendered chart images
#[derive(Debug, Clone)]
pub struct ChartPaths {
    pub bar: PathBuf,
    pub pie: PathBuf,
}

/// Render both charts into `charts_dir`, creating it if absent
pub fn render_charts(
    results: &[OptimizationResult],
    charts_dir: &Path,
) -> Result<ChartPaths, OptimizeError> {
    fs::create_dir_all(charts_dir)
        .map_err(|e| OptimizeError::Report(format!("Cannot create charts directory: {e}")))?;

    let bar = charts_dir.join(BAR_CHART_FILE);
    render_bar_chart(results, &bar)?;

    let pie = charts_dir.join(PIE_CHART_FILE);
    render_pie_chart(&BatchTotals::from_results(results), &pie)?;

    Ok(ChartPaths { bar, pie })
}

/// Per-file reduction percentages with negative values clamped to zero
pub fn clamped_reductions(results: &[OptimizationResult]) -> Vec<f64> {
    results.iter().map(|r| r.reduction_pct.max(0.0)).collect()
}

fn render_bar_chart(results: &[OptimizationResult], path: &Path) -> Result<(), OptimizeError> {
    const WIDTH: u32 = 900;
    const HEIGHT: u32 = 600;
    const LEFT: u32 = 60;
    const RIGHT: u32 = 880;
    const TOP: u32 = 40;
    const BOTTOM: u32 = 540;

    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);
    let reductions = clamped_reductions(results);
    let y_max = reductions.iter().cloned().fold(1.0f64, f64::max);
    let plot_height = (BOTTOM - TOP) as f64;

    // Horizontal gridlines at each quarter of the scale
    for quarter in 1..=4u32 {
        let y = BOTTOM - ((BOTTOM - TOP) * quarter) / 4;
        fill_rect(&mut img, LEFT, y, RIGHT, y + 1, GRID);
    }

    // Axes
    fill_rect(&mut img, LEFT - 1, TOP, LEFT, BOTTOM + 1, AXIS);
    fill_rect(&mut img, LEFT - 1, BOTTOM, RIGHT, BOTTOM + 1, AXIS);

    if !reductions.is_empty() {
        let slot = (RIGHT - LEFT) as f64 / reductions.len() as f64;
        for (i, value) in reductions.iter().enumerate() {
            let x0 = LEFT as f64 + i as f64 * slot + slot * 0.1;
            let x1 = LEFT as f64 + (i + 1) as f64 * slot - slot * 0.1;
            let bar_height = (value / y_max * plot_height).round() as u32;
            let y0 = BOTTOM.saturating_sub(bar_height);
            fill_rect(&mut img, x0 as u32, y0, (x1 as u32).max(x0 as u32 + 1), BOTTOM, BAR);
        }
    }

    img.save(path)
        .map_err(|e| OptimizeError::Report(format!("Cannot write bar chart: {e}")))
}

fn render_pie_chart(totals: &BatchTotals, path: &Path) -> Result<(), OptimizeError> {
    const SIZE: u32 = 500;
    const CENTER: f64 = 250.0;
    const RADIUS: f64 = 180.0;

    let mut img = RgbImage::from_pixel(SIZE, SIZE, WHITE);
    let sum = (totals.total_original + totals.total_optimized) as f64;

    if sum > 0.0 {
        let before_share = totals.total_original as f64 / sum;
        for y in 0..SIZE {
            for x in 0..SIZE {
                let dx = x as f64 - CENTER;
                let dy = y as f64 - CENTER;
                if dx * dx + dy * dy > RADIUS * RADIUS {
                    continue;
                }
                // Angle measured clockwise from 12 o'clock, normalized to [0, 1)
                let mut angle = dx.atan2(-dy);
                if angle < 0.0 {
                    angle += std::f64::consts::TAU;
                }
                let share = angle / std::f64::consts::TAU;
                let color = if share < before_share { BEFORE } else { AFTER };
                img.put_pixel(x, y, color);
            }
        }
    }

    img.save(path)
        .map_err(|e| OptimizeError::Report(format!("Cannot write pie chart: {e}")))
}

/// Fill the half-open pixel rectangle `[x0, x1) x [y0, y1)`, clamped to the
/// image bounds
fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}
