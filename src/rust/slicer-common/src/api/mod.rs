//! 共通APIモジュール

pub mod models;
pub mod handlers;

// 再エクスポート
pub use models::{ApiResponse, ServiceInfo, SliceResponse};
pub use handlers::{process_slice, routes, service_info, AppState};

// multipart アップロード（http-endpoints有効時のみ）
#[cfg(feature = "http-endpoints")]
pub use handlers::upload_slice;
