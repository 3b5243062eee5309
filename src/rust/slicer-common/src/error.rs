//! 共通エラー型定義

use thiserror::Error;

/// スライサー共通エラー型
#[derive(Debug, Error)]
pub enum SlicerError {
    /// 画像のデコードに失敗（破損・非対応）
    #[error("Decode error: {0}")]
    Decode(String),

    /// グリッド予算超過・寸法不正
    #[error("Validation error: {0}")]
    Validation(String),

    /// キャンバス範囲外の切り出し（内部不変条件違反）
    #[error("Region out of bounds: {x},{y} {width}x{height} exceeds {canvas_width}x{canvas_height}")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    /// サポートされていない画像形式
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 入力サイズ超過
    #[error("Image too large: {0} bytes (max: {1} bytes)")]
    ImageTooLarge(usize, usize),

    /// 無効なパラメータ
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// タイルのエンコード失敗
    #[error("Encode error: {0}")]
    Encode(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO エラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON パースエラー
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 デコードエラー
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result型のエイリアス
pub type Result<T> = std::result::Result<T, SlicerError>;

impl SlicerError {
    /// HTTPステータスコードを返す
    ///
    /// 境界ではすべて 400 に畳み込まれるが、ログでは原因を区別する。
    pub fn status_code(&self) -> u16 {
        match self {
            SlicerError::Decode(_)
            | SlicerError::Validation(_)
            | SlicerError::UnsupportedFormat(_)
            | SlicerError::InvalidParameter(_)
            | SlicerError::Base64(_) => 400,
            SlicerError::ImageTooLarge(_, _) => 413,
            SlicerError::OutOfBounds { .. }
            | SlicerError::Encode(_)
            | SlicerError::Config(_)
            | SlicerError::Io(_)
            | SlicerError::Json(_) => 500,
        }
    }

    /// エラーコードを返す（ログ用）
    pub fn error_code(&self) -> &str {
        match self {
            SlicerError::Decode(_) => "DECODE_ERROR",
            SlicerError::Validation(_) => "VALIDATION_ERROR",
            SlicerError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
            SlicerError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            SlicerError::ImageTooLarge(_, _) => "IMAGE_TOO_LARGE",
            SlicerError::InvalidParameter(_) => "INVALID_PARAMETER",
            SlicerError::Encode(_) => "ENCODE_ERROR",
            SlicerError::Config(_) => "CONFIG_ERROR",
            SlicerError::Io(_) => "IO_ERROR",
            SlicerError::Json(_) => "JSON_ERROR",
            SlicerError::Base64(_) => "BASE64_ERROR",
        }
    }
}

impl From<image::ImageError> for SlicerError {
    fn from(err: image::ImageError) -> Self {
        SlicerError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SlicerError::Decode("x".into()).status_code(), 400);
        assert_eq!(SlicerError::Validation("x".into()).status_code(), 400);
        assert_eq!(SlicerError::ImageTooLarge(11, 10).status_code(), 413);

        let oob = SlicerError::OutOfBounds {
            x: 64,
            y: 0,
            width: 64,
            height: 64,
            canvas_width: 64,
            canvas_height: 64,
        };
        assert_eq!(oob.status_code(), 500);
        assert_eq!(oob.error_code(), "OUT_OF_BOUNDS");
    }

    #[test]
    fn test_out_of_bounds_message() {
        let oob = SlicerError::OutOfBounds {
            x: 0,
            y: 64,
            width: 64,
            height: 64,
            canvas_width: 128,
            canvas_height: 64,
        };
        assert_eq!(
            oob.to_string(),
            "Region out of bounds: 0,64 64x64 exceeds 128x64"
        );
    }
}
