//! キャンバス生成（リサイズ + 透過パディング）

use image::RgbaImage;
use tracing::{debug, error};

use crate::config::MosaicConfig;
use crate::error::{Result, SlicerError};
use super::grid::{GridPlan, GridShape};
use super::ops::{ImageOps, Padding, ResizeTarget, TRANSPARENT};

/// リサイズ・パディング済みの作業画像
///
/// 幅・高さは常にタイルサイズの整数倍で、`grid` と一致する。
#[derive(Debug, Clone)]
pub struct Canvas {
    pub(crate) pixels: RgbaImage,
    pub(crate) grid: GridShape,
    pub(crate) tile_size: u32,
}

impl Canvas {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }
}

/// 整列までに必要な余白
pub fn alignment_padding(length: u32, tile_size: u32) -> u32 {
    (tile_size - length % tile_size) % tile_size
}

/// 正立済み画像をリサイズし、短辺の末尾側を透過で埋める
///
/// 短辺の長さは必ずリサイズ後の実測値を使う。
pub fn build_canvas<O: ImageOps + ?Sized>(
    ops: &O,
    upright: RgbaImage,
    plan: &GridPlan,
    config: &MosaicConfig,
) -> Result<Canvas> {
    let tile_size = config.tile_size;
    let resized = ops.resize(&upright, plan.resize)?;
    drop(upright);

    let (measured_width, measured_height) = resized.dimensions();
    debug!(
        "Resized to {}x{} (target {:?})",
        measured_width, measured_height, plan.resize
    );

    // 長辺は目標ピクセル数ちょうど、短辺は実測値
    let (long_expected, long_measured, short_measured) = match plan.resize {
        ResizeTarget::Width(target) => (target, measured_width, measured_height),
        ResizeTarget::Height(target) => (target, measured_height, measured_width),
    };
    if long_measured != long_expected {
        return Err(SlicerError::Validation(format!(
            "resize produced {} px on the long axis, expected {}",
            long_measured, long_expected
        )));
    }
    if short_measured == 0 {
        return Err(SlicerError::Validation("resize produced an empty short axis".to_string()));
    }

    let pad = alignment_padding(short_measured, tile_size);
    let short_cells = (short_measured + pad) / tile_size;

    // 原点側には余白を付けない（左上寄せ）
    let (padding, columns, rows) = match plan.resize {
        ResizeTarget::Width(_) => (
            Padding {
                bottom: pad,
                ..Padding::default()
            },
            plan.long_axis_cells,
            short_cells,
        ),
        ResizeTarget::Height(_) => (
            Padding {
                right: pad,
                ..Padding::default()
            },
            short_cells,
            plan.long_axis_cells,
        ),
    };

    let grid = GridShape::new(columns, rows, plan.long_axis(), config.max_cells)?;

    let pixels = ops.extend_canvas(resized, padding, TRANSPARENT)?;

    if pixels.width() != columns * tile_size || pixels.height() != rows * tile_size {
        error!(
            "Canvas {}x{} does not match grid {}x{} of {} px tiles",
            pixels.width(),
            pixels.height(),
            columns,
            rows,
            tile_size
        );
        return Err(SlicerError::Validation(format!(
            "canvas {}x{} is not aligned to a {}x{} grid",
            pixels.width(),
            pixels.height(),
            columns,
            rows
        )));
    }

    debug!(
        "Canvas {}x{} (padding {:?}), grid {}x{}",
        pixels.width(),
        pixels.height(),
        padding,
        columns,
        rows
    );

    Ok(Canvas {
        pixels,
        grid,
        tile_size,
    })
}
