//! 画像操作コラボレータ
//!
//! デコード・回転・リサイズ・余白追加・切り出し・エンコードをまとめたトレイト。
//! パイプラインはこのトレイト経由でしかピクセルに触れない。

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgba, RgbaImage};
use tracing::debug;

use crate::error::{Result, SlicerError};

/// 完全透過の塗りつぶし色
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// デコード結果
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// 回転前のピクセル
    pub pixels: RgbaImage,
    /// メタデータ上の幅（回転前）
    pub width: u32,
    /// メタデータ上の高さ（回転前）
    pub height: u32,
    /// EXIF Orientation タグ（読めなければ 0）
    pub orientation: u8,
}

/// リサイズ目標（片方の辺のみ指定）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTarget {
    Width(u32),
    Height(u32),
}

/// 各辺に追加する余白ピクセル数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }
}

/// 画像操作インターフェース
pub trait ImageOps {
    /// バイト列をデコード
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;

    /// EXIF タグに従って正立させる（正立済みなら何もしない）
    fn rotate_to_upright(&self, pixels: RgbaImage, orientation: u8) -> RgbaImage;

    /// 片辺を指定してアスペクト比を保ったままリサイズ
    ///
    /// 実際の出力サイズは戻り値の寸法を読むこと。
    fn resize(&self, pixels: &RgbaImage, target: ResizeTarget) -> Result<RgbaImage>;

    /// 指定辺に余白を追加
    fn extend_canvas(&self, pixels: RgbaImage, padding: Padding, fill: Rgba<u8>) -> Result<RgbaImage>;

    /// 矩形領域を切り出す（範囲外はエラー、クランプしない）
    fn extract_region(
        &self,
        pixels: &RgbaImage,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage>;

    /// PNG にエンコード
    fn encode(&self, pixels: &RgbaImage) -> Result<Vec<u8>>;
}

/// `image` クレートによる標準実装
#[derive(Debug, Clone, Copy)]
pub struct RasterOps {
    filter: FilterType,
}

impl RasterOps {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for RasterOps {
    fn default() -> Self {
        Self::new(FilterType::Lanczos3)
    }
}

/// EXIF 値 (1-8) から Orientation へ
pub fn orientation_from_exif(tag: u8) -> Option<Orientation> {
    match tag {
        1 => Some(Orientation::NoTransforms),
        2 => Some(Orientation::FlipHorizontal),
        3 => Some(Orientation::Rotate180),
        4 => Some(Orientation::FlipVertical),
        5 => Some(Orientation::Rotate90FlipH),
        6 => Some(Orientation::Rotate90),
        7 => Some(Orientation::Rotate270FlipH),
        8 => Some(Orientation::Rotate270),
        _ => None,
    }
}

/// Orientation から EXIF 値へ
pub fn orientation_to_exif(orientation: Orientation) -> u8 {
    match orientation {
        Orientation::NoTransforms => 1,
        Orientation::FlipHorizontal => 2,
        Orientation::Rotate180 => 3,
        Orientation::FlipVertical => 4,
        Orientation::Rotate90FlipH => 5,
        Orientation::Rotate90 => 6,
        Orientation::Rotate270FlipH => 7,
        Orientation::Rotate270 => 8,
        #[allow(unreachable_patterns)]
        _ => 0,
    }
}

/// `other * target / this` を四捨五入（最低 1）
fn scale_side(other: u32, target: u32, this: u32) -> u32 {
    let scaled = (other as u64 * target as u64 + this as u64 / 2) / this as u64;
    scaled.clamp(1, u32::MAX as u64) as u32
}

impl ImageOps for RasterOps {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| SlicerError::Decode(format!("failed to guess image format: {}", e)))?;

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| SlicerError::Decode(format!("failed to create decoder: {}", e)))?;

        let (width, height) = decoder.dimensions();
        let orientation = match decoder.orientation() {
            Ok(orientation) => orientation_to_exif(orientation),
            Err(e) => {
                debug!("Orientation unreadable, treating as absent: {}", e);
                0
            }
        };

        let pixels = DynamicImage::from_decoder(decoder)
            .map_err(|e| SlicerError::Decode(format!("failed to decode image: {}", e)))?
            .into_rgba8();

        debug!("Decoded {}x{} (orientation tag {})", width, height, orientation);

        Ok(DecodedImage {
            pixels,
            width,
            height,
            orientation,
        })
    }

    fn rotate_to_upright(&self, pixels: RgbaImage, orientation: u8) -> RgbaImage {
        match orientation_from_exif(orientation) {
            None | Some(Orientation::NoTransforms) => pixels,
            Some(transform) => {
                debug!("Applying orientation transform {:?}", transform);
                let mut img = DynamicImage::ImageRgba8(pixels);
                img.apply_orientation(transform);
                img.into_rgba8()
            }
        }
    }

    fn resize(&self, pixels: &RgbaImage, target: ResizeTarget) -> Result<RgbaImage> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(SlicerError::Validation(format!(
                "cannot resize empty image {}x{}",
                width, height
            )));
        }

        let (new_width, new_height) = match target {
            ResizeTarget::Width(0) | ResizeTarget::Height(0) => {
                return Err(SlicerError::Validation("resize target must be positive".to_string()));
            }
            ResizeTarget::Width(w) => (w, scale_side(height, w, width)),
            ResizeTarget::Height(h) => (scale_side(width, h, height), h),
        };

        Ok(imageops::resize(pixels, new_width, new_height, self.filter))
    }

    fn extend_canvas(&self, pixels: RgbaImage, padding: Padding, fill: Rgba<u8>) -> Result<RgbaImage> {
        if padding.is_zero() {
            return Ok(pixels);
        }

        let (width, height) = pixels.dimensions();
        let new_width = width
            .checked_add(padding.left)
            .and_then(|w| w.checked_add(padding.right))
            .ok_or_else(|| SlicerError::Validation("canvas width overflow".to_string()))?;
        let new_height = height
            .checked_add(padding.top)
            .and_then(|h| h.checked_add(padding.bottom))
            .ok_or_else(|| SlicerError::Validation("canvas height overflow".to_string()))?;

        let mut canvas = RgbaImage::from_pixel(new_width, new_height, fill);
        imageops::replace(&mut canvas, &pixels, padding.left as i64, padding.top as i64);

        Ok(canvas)
    }

    fn extract_region(
        &self,
        pixels: &RgbaImage,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage> {
        let (canvas_width, canvas_height) = pixels.dimensions();
        let right = left as u64 + width as u64;
        let bottom = top as u64 + height as u64;

        if width == 0 || height == 0 || right > canvas_width as u64 || bottom > canvas_height as u64 {
            return Err(SlicerError::OutOfBounds {
                x: left,
                y: top,
                width,
                height,
                canvas_width,
                canvas_height,
            });
        }

        Ok(imageops::crop_imm(pixels, left, top, width, height).to_image())
    }

    fn encode(&self, pixels: &RgbaImage) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        pixels
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| SlicerError::Encode(format!("PNG encode failed: {}", e)))?;
        Ok(buf)
    }
}
