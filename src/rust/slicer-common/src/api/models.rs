//! 共通APIモデル定義

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::MosaicConfig;
use crate::error::{Result, SlicerError};
use crate::image::Mosaic;

/// スライス結果（/api/slice のレスポンス）
#[derive(Debug, Serialize, Deserialize)]
pub struct SliceResponse {
    pub columns: u32,
    pub rows: u32,
    /// 行優先の PNG data URI
    pub tiles: Vec<String>,
}

impl From<&Mosaic> for SliceResponse {
    fn from(mosaic: &Mosaic) -> Self {
        SliceResponse {
            columns: mosaic.columns,
            rows: mosaic.rows,
            tiles: mosaic.tiles.iter().map(|tile| tile.to_data_uri()).collect(),
        }
    }
}

/// サービス情報（/api/info のレスポンス）
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub mosaic: MosaicConfig,
}

/// 汎用APIレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// base64 ペイロードを画像バイト列に戻す
///
/// 前後・途中の空白と `data:...;base64,` 接頭辞は許容する。
pub fn decode_payload(body: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(body)
        .map_err(|e| SlicerError::InvalidParameter(format!("payload is not UTF-8: {}", e)))?
        .trim();

    let text = match text.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| SlicerError::InvalidParameter("data URI is not base64".to_string()))?,
        None => text,
    };

    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(SlicerError::InvalidParameter("empty payload".to_string()));
    }

    Ok(STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_base64() {
        assert_eq!(decode_payload(b"AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_payload(b"  AQ\nID\r\n").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(decode_payload(b"data:image/png;base64,AQID").unwrap(), vec![1, 2, 3]);
        assert!(decode_payload(b"data:image/png,AQID").is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_payload(b""), Err(SlicerError::InvalidParameter(_))));
        assert!(matches!(decode_payload(b"   "), Err(SlicerError::InvalidParameter(_))));
        assert!(matches!(decode_payload(b"@@@@"), Err(SlicerError::Base64(_))));
        assert!(decode_payload(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success(42);
        assert!(response.success);
        assert_eq!(response.data, 42);
        assert!(!response.timestamp.is_empty());
    }
}
