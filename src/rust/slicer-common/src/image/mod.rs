//! 画像処理モジュール
//!
//! 向き正規化 → グリッド選択 → キャンバス生成 → タイル切り出し の一方向パイプライン。

pub mod canvas;
pub mod formats;
pub mod grid;
pub mod ops;
pub mod orientation;
pub mod processor;
pub mod tiles;

// 公開API
pub use canvas::{build_canvas, Canvas};
pub use grid::{select_grid, Axis, GridPlan, GridPolicy, GridShape};
pub use ops::{DecodedImage, ImageOps, Padding, RasterOps, ResizeTarget};
pub use orientation::{normalize, ImageDimensions, OrientationHint};
pub use processor::{EncodedTile, Mosaic, MosaicProcessor};
pub use tiles::{extract_tiles, Tile};

#[cfg(test)]
pub(crate) mod testing {
    //! テスト用の画像操作スタブ

    use super::ops::{DecodedImage, ImageOps, Padding, RasterOps, ResizeTarget};
    use crate::error::Result;
    use image::imageops::{self, FilterType};
    use image::{Rgba, RgbaImage};

    /// RasterOps に委譲しつつ、リサイズ結果や EXIF タグを差し替える
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct StubOps {
        inner: RasterOps,
        forced_resize: Option<(u32, u32)>,
        orientation: Option<u8>,
    }

    impl StubOps {
        pub(crate) fn new() -> Self {
            Self {
                inner: RasterOps::new(FilterType::Nearest),
                forced_resize: None,
                orientation: None,
            }
        }

        /// リサイズ出力を固定（丸め誤差の再現用）
        pub(crate) fn forced_resize(mut self, width: u32, height: u32) -> Self {
            self.forced_resize = Some((width, height));
            self
        }

        /// デコード時の EXIF タグを上書き
        pub(crate) fn orientation(mut self, tag: u8) -> Self {
            self.orientation = Some(tag);
            self
        }
    }

    impl ImageOps for StubOps {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
            let mut decoded = self.inner.decode(bytes)?;
            if let Some(tag) = self.orientation {
                decoded.orientation = tag;
            }
            Ok(decoded)
        }

        fn rotate_to_upright(&self, pixels: RgbaImage, orientation: u8) -> RgbaImage {
            self.inner.rotate_to_upright(pixels, orientation)
        }

        fn resize(&self, pixels: &RgbaImage, target: ResizeTarget) -> Result<RgbaImage> {
            match self.forced_resize {
                Some((width, height)) => Ok(imageops::resize(pixels, width, height, FilterType::Nearest)),
                None => self.inner.resize(pixels, target),
            }
        }

        fn extend_canvas(&self, pixels: RgbaImage, padding: Padding, fill: Rgba<u8>) -> Result<RgbaImage> {
            self.inner.extend_canvas(pixels, padding, fill)
        }

        fn extract_region(
            &self,
            pixels: &RgbaImage,
            left: u32,
            top: u32,
            width: u32,
            height: u32,
        ) -> Result<RgbaImage> {
            self.inner.extract_region(pixels, left, top, width, height)
        }

        fn encode(&self, pixels: &RgbaImage) -> Result<Vec<u8>> {
            self.inner.encode(pixels)
        }
    }

    /// 単色 PNG を生成
    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        RasterOps::default()
            .encode(&img)
            .expect("PNG encoding of an in-memory image should succeed")
    }

    /// PNG の IHDR 直後に EXIF Orientation だけを持つ eXIf チャンクを差し込む
    pub(crate) fn with_exif_orientation(png: &[u8], tag: u16) -> Vec<u8> {
        // big-endian TIFF ヘッダ + IFD 1 エントリ（0x0112, SHORT, 1 個）
        let mut exif = b"MM\x00\x2a\x00\x00\x00\x08\x00\x01".to_vec();
        exif.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        exif.extend_from_slice(&tag.to_be_bytes());
        exif.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        let mut chunk = (exif.len() as u32).to_be_bytes().to_vec();
        let mut body = b"eXIf".to_vec();
        body.extend_from_slice(&exif);
        chunk.extend_from_slice(&body);
        chunk.extend_from_slice(&crc32(&body).to_be_bytes());

        // シグネチャ 8 + IHDR (4 + 4 + 13 + 4)
        let ihdr_end = 8 + 25;
        let mut out = png[..ihdr_end].to_vec();
        out.extend_from_slice(&chunk);
        out.extend_from_slice(&png[ihdr_end..]);
        out
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in data {
            crc ^= byte as u32;
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }
}
