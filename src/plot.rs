//! PNG renderings of the learned filters and of the training curves.

use crate::error::{Error, Result};
use burn::prelude::*;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;

pub const CYAN: Rgb<u8> = Rgb([0, 191, 191]);
pub const RED: Rgb<u8> = Rgb([214, 39, 40]);

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);

/// Renders channel 0 of every filter as a grayscale tile.
///
/// Each tile is min-max normalized on its own and scaled up by `scale`.
/// Tiles are laid out row by row, `columns` per row, one pixel apart.
///
/// # Shapes
///   - weights [filters, channels, kernel_height, kernel_width]
pub fn filter_grid<B: Backend>(
    weights: Tensor<B, 4>,
    columns: usize,
    scale: usize,
) -> Result<GrayImage> {
    let [filters, channels, kernel_height, kernel_width] = weights.dims();
    if filters == 0 || kernel_height == 0 || kernel_width == 0 {
        return Ok(GrayImage::new(0, 0));
    }
    let columns = columns.clamp(1, filters.max(1));
    let scale = scale.max(1);
    let rows = filters.div_ceil(columns);

    let values = weights
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::TensorData(format!("{e:?}")))?;

    let gap = 1;
    let tile_width = kernel_width * scale;
    let tile_height = kernel_height * scale;
    let width = columns * (tile_width + gap) - gap;
    let height = rows * (tile_height + gap) - gap;
    let mut image = GrayImage::from_pixel(width as u32, height as u32, Luma([255]));

    let filter_len = channels * kernel_height * kernel_width;
    for filter in 0..filters {
        // channel 0
        let start = filter * filter_len;
        let tile = &values[start..start + kernel_height * kernel_width];
        let (min, max) = tile
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;

        let x0 = (filter % columns) * (tile_width + gap);
        let y0 = (filter / columns) * (tile_height + gap);
        for ky in 0..kernel_height {
            for kx in 0..kernel_width {
                let v = tile[ky * kernel_width + kx];
                let level = if range > 0.0 { (v - min) / range } else { 0.5 };
                let luma = Luma([(level * 255.0).round() as u8]);
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = x0 + kx * scale + dx;
                        let y = y0 + ky * scale + dy;
                        image.put_pixel(x as u32, y as u32, luma);
                    }
                }
            }
        }
    }

    Ok(image)
}

pub fn save_filter_grid<B: Backend>(
    weights: Tensor<B, 4>,
    columns: usize,
    scale: usize,
    path: &Path,
) -> Result<()> {
    let image = filter_grid(weights, columns, scale)?;
    image.save(path).map_err(|source| Error::Image {
        path: path.to_owned(),
        source,
    })?;
    tracing::info!(path = ?path, "saved filter grid");
    Ok(())
}

/// Line chart of a per-iteration series.
///
/// The x axis spans the iterations, the y axis spans the value range.
/// Non-finite values are skipped.
pub fn curve(values: &[f32], color: Rgb<u8>, width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    let margin = 24i64;
    let (left, top) = (margin, margin / 2);
    let (right, bottom) = (width as i64 - margin / 2, height as i64 - margin);
    if right <= left || bottom <= top {
        return image;
    }

    // horizontal grid at quarters
    for q in 1..4 {
        let y = top + (bottom - top) * q / 4;
        draw_line(&mut image, (left, y), (right, y), GRID);
    }
    draw_line(&mut image, (left, top), (left, bottom), AXIS);
    draw_line(&mut image, (left, bottom), (right, bottom), AXIS);

    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        return image;
    }
    let range = if max > min { max - min } else { 1.0 };
    let steps = values.len().saturating_sub(1).max(1) as f64;

    let to_point = |i: usize, v: f32| {
        let x = left + ((right - left) as f64 * i as f64 / steps).round() as i64;
        let y = bottom - ((bottom - top) as f64 * ((v - min) / range) as f64).round() as i64;
        (x, y)
    };

    let mut previous = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            previous = None;
            continue;
        }
        let point = to_point(i, v);
        match previous {
            Some(from) => draw_line(&mut image, from, point, color),
            None => put(&mut image, point, color),
        }
        previous = Some(point);
    }

    image
}

pub fn save_curve(values: &[f32], color: Rgb<u8>, path: &Path) -> Result<()> {
    let image = curve(values, color, 800, 480);
    image.save(path).map_err(|source| Error::Image {
        path: path.to_owned(),
        source,
    })?;
    tracing::info!(path = ?path, points = values.len(), "saved curve");
    Ok(())
}

fn put(image: &mut RgbImage, (x, y): (i64, i64), color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham.
fn draw_line(image: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;
    loop {
        put(image, (x, y), color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn grid_layout() {
        let device = Default::default();
        let weights = Tensor::<B, 1, Int>::arange(0..32 * 25, &device)
            .float()
            .reshape([32, 1, 5, 5]);

        let image = filter_grid(weights, 8, 4).unwrap();
        // 8 tiles of 20px plus 7 gaps, 4 rows
        assert_eq!(8 * 20 + 7, image.width());
        assert_eq!(4 * 20 + 3, image.height());

        // first kernel value is each tile's minimum, last is its maximum
        assert_eq!(Luma([0]), *image.get_pixel(0, 0));
        assert_eq!(Luma([255]), *image.get_pixel(19, 19));
        // gap column
        assert_eq!(Luma([255]), *image.get_pixel(20, 0));
        assert_eq!(Luma([0]), *image.get_pixel(21, 0));
    }

    #[test]
    fn constant_filter_is_mid_gray() {
        let device = Default::default();
        let weights = Tensor::<B, 4>::ones([1, 1, 3, 3], &device);
        let image = filter_grid(weights, 8, 1).unwrap();
        assert_eq!((3, 3), image.dimensions());
        assert!(image.pixels().all(|p| *p == Luma([128])));
    }

    #[test]
    fn curve_draws_series() {
        let values: Vec<f32> = (0..50).map(|i| (i as f32 / 10.0).sin()).collect();
        let image = curve(&values, RED, 200, 120);
        assert_eq!((200, 120), image.dimensions());
        assert!(image.pixels().any(|p| *p == RED));

        // the last point lands on the right edge of the plot area
        assert!((0..120).any(|y| *image.get_pixel(188, y) == RED));
    }

    #[test]
    fn curve_tolerates_degenerate_input() {
        assert!(!curve(&[], CYAN, 100, 60).pixels().any(|p| *p == CYAN));
        let flat = curve(&[1.0, 1.0, f32::NAN, 1.0], CYAN, 100, 60);
        assert!(flat.pixels().any(|p| *p == CYAN));
    }
}
