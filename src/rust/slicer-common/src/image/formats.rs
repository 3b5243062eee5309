//! 画像フォーマット検出

use crate::error::{Result, SlicerError};

/// 画像フォーマットをマジックバイトから検出
pub fn detect_format(data: &[u8]) -> String {
    if data.len() < 4 {
        return "unknown".to_string();
    }

    match data {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => "jpeg".to_string(),

        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => "png".to_string(),

        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => "gif".to_string(),

        // BMP: 42 4D
        [0x42, 0x4D, ..] => "bmp".to_string(),

        // WebP: "RIFF" ???? "WEBP"
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp".to_string(),

        // TIFF: II*\0 / MM\0*
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => "tiff".to_string(),

        _ => "unknown".to_string(),
    }
}

/// ファイルサイズ制限チェック
pub fn validate_size(data: &[u8], max_size: usize) -> Result<()> {
    if data.len() > max_size {
        return Err(SlicerError::ImageTooLarge(data.len(), max_size));
    }

    Ok(())
}

/// 入力画像の事前検査（サイズ・形式）
///
/// 検出したフォーマット名を返す。
pub fn screen(data: &[u8], max_size: usize) -> Result<String> {
    if data.is_empty() {
        return Err(SlicerError::InvalidParameter("empty image payload".to_string()));
    }

    validate_size(data, max_size)?;

    let format = detect_format(data);
    if format == "unknown" {
        return Err(SlicerError::UnsupportedFormat("unknown image format".to_string()));
    }

    Ok(format)
}
