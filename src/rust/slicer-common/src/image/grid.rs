//! グリッド選択
//!
//! アスペクト比から分割方針を決め、長辺のセル数とリサイズ目標を確定する。
//! 短辺のセル数はリサイズ後の実測値で決まるため、ここでは決めない。

use serde::Serialize;
use tracing::debug;

use crate::config::MosaicConfig;
use crate::error::{Result, SlicerError};
use super::ops::ResizeTarget;
use super::orientation::ImageDimensions;

/// 長辺の向き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
    Square,
}

/// アスペクト比による分割方針
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPolicy {
    /// 縦長（高さ > 幅 かつ 幅/高さ <= 閾値）
    StrongPortrait,
    /// 横長（幅 > 高さ かつ 高さ/幅 <= 閾値）
    StrongLandscape,
    /// 正方形寄り（上記以外、同寸を含む）
    SquareFallback,
}

impl GridPolicy {
    /// 方針を判定する（上から順に最初に一致したもの）
    pub fn classify(dims: ImageDimensions, threshold: f64) -> Self {
        let ratio = dims.aspect_ratio();

        if dims.height > dims.width && ratio <= threshold {
            GridPolicy::StrongPortrait
        } else if dims.width > dims.height && ratio <= threshold {
            GridPolicy::StrongLandscape
        } else {
            GridPolicy::SquareFallback
        }
    }

    pub fn long_axis(self) -> Axis {
        match self {
            GridPolicy::StrongPortrait => Axis::Vertical,
            GridPolicy::StrongLandscape => Axis::Horizontal,
            GridPolicy::SquareFallback => Axis::Square,
        }
    }
}

/// 選択段の出力：長辺の向き・固定セル数・リサイズ目標
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPlan {
    pub policy: GridPolicy,
    pub long_axis_cells: u32,
    pub resize: ResizeTarget,
}

impl GridPlan {
    pub fn long_axis(&self) -> Axis {
        self.policy.long_axis()
    }
}

/// 確定したグリッド形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridShape {
    pub columns: u32,
    pub rows: u32,
    pub long_axis: Axis,
}

impl GridShape {
    /// セル予算を検証して生成（切り詰めはしない）
    pub fn new(columns: u32, rows: u32, long_axis: Axis, max_cells: u32) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(SlicerError::Validation(format!(
                "grid must have at least one cell per axis: {}x{}",
                columns, rows
            )));
        }

        let cells = columns as u64 * rows as u64;
        if cells > max_cells as u64 {
            return Err(SlicerError::Validation(format!(
                "grid {}x{} = {} cells exceeds budget of {}",
                columns, rows, cells, max_cells
            )));
        }

        Ok(Self {
            columns,
            rows,
            long_axis,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

/// 真の寸法からグリッド方針を選ぶ
pub fn select_grid(dims: ImageDimensions, config: &MosaicConfig) -> Result<GridPlan> {
    let policy = GridPolicy::classify(dims, config.aspect_threshold);

    let long_axis_cells = match policy {
        GridPolicy::StrongPortrait | GridPolicy::StrongLandscape => {
            // 短辺が長辺の 1/strip 以下なら 1 行（1 列）で収まる
            if dims.short_side() as u64 * config.strip_long_axis_cells as u64
                <= dims.long_side() as u64
            {
                config.strip_long_axis_cells
            } else {
                config.max_long_axis_cells
            }
        }
        GridPolicy::SquareFallback => config.square_cells,
    };

    let target = long_axis_cells
        .checked_mul(config.tile_size)
        .ok_or_else(|| SlicerError::Validation("long axis pixel target overflow".to_string()))?;

    let resize = match policy {
        GridPolicy::StrongPortrait => ResizeTarget::Height(target),
        GridPolicy::StrongLandscape => ResizeTarget::Width(target),
        // 大きい方の辺を目標に合わせる（同寸なら幅）
        GridPolicy::SquareFallback if dims.height > dims.width => ResizeTarget::Height(target),
        GridPolicy::SquareFallback => ResizeTarget::Width(target),
    };

    debug!(
        "Grid policy for {}x{}: {:?}, {} long-axis cells, resize {:?}",
        dims.width, dims.height, policy, long_axis_cells, resize
    );

    Ok(GridPlan {
        policy,
        long_axis_cells,
        resize,
    })
}
