//! タイル切り出し

use image::RgbaImage;
use tracing::{debug, error};

use crate::error::Result;
use super::canvas::Canvas;
use super::ops::ImageOps;

/// 1 セル分のタイル
#[derive(Debug, Clone)]
pub struct Tile {
    pub column: u32,
    pub row: u32,
    pub pixels: RgbaImage,
}

/// キャンバスを行優先でタイルに分割する
///
/// 範囲外の切り出しは内部不変条件違反としてそのままエラーにする。
pub fn extract_tiles<O: ImageOps + ?Sized>(ops: &O, canvas: &Canvas) -> Result<Vec<Tile>> {
    let grid = canvas.grid();
    let tile_size = canvas.tile_size();
    let mut tiles = Vec::with_capacity(grid.cell_count());

    for row in 0..grid.rows {
        for column in 0..grid.columns {
            let left = column * tile_size;
            let top = row * tile_size;

            let pixels = ops
                .extract_region(canvas.pixels(), left, top, tile_size, tile_size)
                .map_err(|e| {
                    error!("Tile ({}, {}) extraction failed: {}", column, row, e);
                    e
                })?;

            tiles.push(Tile { column, row, pixels });
        }
    }

    debug!("Extracted {} tiles ({}x{})", tiles.len(), grid.columns, grid.rows);
    Ok(tiles)
}
