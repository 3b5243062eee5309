//! 向き正規化
//!
//! EXIF の 8 方向のうち、後段に影響するのは幅と高さが入れ替わるかどうかだけ。

use serde::Serialize;

use crate::error::{Result, SlicerError};

/// 正立後（真の向き）の画像寸法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// 幅・高さが正であることを検証して生成
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SlicerError::Validation(format!(
                "image dimensions must be positive: {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }

    /// 短辺 / 長辺（0 < r <= 1）
    pub fn aspect_ratio(&self) -> f64 {
        self.short_side() as f64 / self.long_side() as f64
    }
}

/// 向きのクラス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrientationHint {
    Normal,
    Rotated90,
}

impl OrientationHint {
    /// EXIF タグ値から判定（5..=8 は 90 度系）
    ///
    /// 0（タグなし）と 1..=8 の範囲外は Normal 扱い。
    pub fn from_exif(tag: u8) -> Self {
        match tag {
            5..=8 => OrientationHint::Rotated90,
            _ => OrientationHint::Normal,
        }
    }

    pub fn must_rotate(self) -> bool {
        self == OrientationHint::Rotated90
    }
}

/// 正規化結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedOrientation {
    pub dimensions: ImageDimensions,
    pub hint: OrientationHint,
}

impl NormalizedOrientation {
    pub fn must_rotate(&self) -> bool {
        self.hint.must_rotate()
    }
}

/// メタデータ上の寸法と EXIF タグから真の寸法を求める
pub fn normalize(width: u32, height: u32, orientation: u8) -> Result<NormalizedOrientation> {
    let hint = OrientationHint::from_exif(orientation);
    let (width, height) = if hint.must_rotate() {
        (height, width)
    } else {
        (width, height)
    };

    Ok(NormalizedOrientation {
        dimensions: ImageDimensions::new(width, height)?,
        hint,
    })
}
