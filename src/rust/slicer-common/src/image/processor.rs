//! 画像処理パイプライン

use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info};

use crate::config::MosaicConfig;
use crate::error::{Result, SlicerError};
use super::canvas::build_canvas;
use super::formats;
use super::grid::{select_grid, Axis};
use super::ops::{ImageOps, RasterOps};
use super::orientation::{normalize, ImageDimensions};
use super::tiles::extract_tiles;

/// PNG エンコード済みタイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTile {
    pub column: u32,
    pub row: u32,
    pub png: Vec<u8>,
}

impl EncodedTile {
    /// `data:image/png;base64,...` 形式
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// 処理結果
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub columns: u32,
    pub rows: u32,
    pub long_axis: Axis,
    pub tiles: Vec<EncodedTile>,
    /// 正立後の元画像寸法
    pub source: ImageDimensions,
    pub original_format: String,
    pub processing_time_ms: u64,
}

/// モザイク分割処理
pub struct MosaicProcessor<O = RasterOps> {
    config: MosaicConfig,
    ops: O,
}

impl MosaicProcessor<RasterOps> {
    pub fn new(config: MosaicConfig) -> Self {
        let ops = RasterOps::new(config.resize_filter.to_filter_type());
        Self { config, ops }
    }
}

impl<O: ImageOps> MosaicProcessor<O> {
    /// 任意の画像操作実装で生成
    pub fn with_ops(config: MosaicConfig, ops: O) -> Self {
        Self { config, ops }
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// 1 枚の画像をタイル列に分割する（全成功か失敗のどちらか）
    pub fn process(&self, image_data: &[u8]) -> Result<Mosaic> {
        let start = Instant::now();

        // 1. サイズ・フォーマット検証
        let original_format = formats::screen(image_data, self.config.max_input_bytes)?;

        // 2. デコード
        let decoded = self.ops.decode(image_data)?;

        // 3. 向き正規化（回転はリサイズより前）
        let normalized = normalize(decoded.width, decoded.height, decoded.orientation)?;
        let upright = self.ops.rotate_to_upright(decoded.pixels, decoded.orientation);
        let dims = normalized.dimensions;
        if upright.dimensions() != (dims.width, dims.height) {
            return Err(SlicerError::Decode(format!(
                "decoded pixels {}x{} disagree with metadata {}x{} (orientation {})",
                upright.width(),
                upright.height(),
                dims.width,
                dims.height,
                decoded.orientation
            )));
        }
        debug!(
            "Normalized {}x{} -> {}x{} ({:?})",
            decoded.width, decoded.height, dims.width, dims.height, normalized.hint
        );

        // 4. グリッド選択
        let plan = select_grid(dims, &self.config)?;

        // 5. リサイズ + パディング
        let canvas = build_canvas(&self.ops, upright, &plan, &self.config)?;
        let grid = canvas.grid();

        // 6. 切り出し + エンコード
        let tiles = extract_tiles(&self.ops, &canvas)?;
        drop(canvas);

        let tiles = tiles
            .into_iter()
            .map(|tile| {
                Ok(EncodedTile {
                    column: tile.column,
                    row: tile.row,
                    png: self.ops.encode(&tile.pixels)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Sliced {} {}x{} image into {}x{} grid ({} tiles) in {}ms",
            original_format,
            dims.width,
            dims.height,
            grid.columns,
            grid.rows,
            tiles.len(),
            processing_time_ms
        );

        Ok(Mosaic {
            columns: grid.columns,
            rows: grid.rows,
            long_axis: grid.long_axis,
            tiles,
            source: dims,
            original_format,
            processing_time_ms,
        })
    }
}
