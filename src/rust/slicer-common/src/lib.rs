//! emoji-slicer 共通ライブラリ
//!
//! 画像をチャット用の絵文字モザイク（固定サイズの正方タイル列）に分割する。

pub mod error;
pub mod config;
pub mod image;
pub mod api;

// バージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

// 主要な型の再エクスポート
pub use error::{SlicerError, Result};
pub use config::{MosaicConfig, Settings};
pub use crate::image::{Mosaic, MosaicProcessor, EncodedTile, GridShape, ImageOps, RasterOps};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "emoji-slicer-common");
    }
}
