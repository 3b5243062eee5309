//! 共通APIハンドラー実装

use actix_web::{web, HttpResponse};
use tracing::{error, info, warn};

#[cfg(feature = "http-endpoints")]
use actix_multipart::{Field, Multipart};
#[cfg(feature = "http-endpoints")]
use futures_util::stream::StreamExt as _;
#[cfg(feature = "http-endpoints")]
use tracing::debug;

use crate::config::MosaicConfig;
use crate::image::MosaicProcessor;
use super::models::{decode_payload, ApiResponse, ServiceInfo, SliceResponse};

/// ハンドラー共有状態
pub struct AppState {
    pub processor: MosaicProcessor,
}

impl AppState {
    pub fn new(config: MosaicConfig) -> Self {
        Self {
            processor: MosaicProcessor::new(config),
        }
    }
}

/// ルート登録
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { HttpResponse::Ok().body("OK") }))
        .route("/api/info", web::get().to(service_info))
        .route("/api/slice", web::post().to(process_slice));

    #[cfg(feature = "http-endpoints")]
    cfg.route("/api/slice/upload", web::post().to(upload_slice));
}

/// エラー原因は返さない（本文なしの 400）
fn bad_request() -> HttpResponse {
    HttpResponse::BadRequest().finish()
}

/// 画像 1 枚をパイプラインに通してレスポンスを作る
///
/// 処理は同期なのでブロッキングプールで実行する。
async fn run_pipeline(state: web::Data<AppState>, image_data: Vec<u8>) -> HttpResponse {
    let result = web::block(move || state.processor.process(&image_data)).await;

    match result {
        Ok(Ok(mosaic)) => {
            info!(
                "Slice completed: {}x{} grid, {} tiles, source {}x{} ({}), {}ms",
                mosaic.columns,
                mosaic.rows,
                mosaic.tiles.len(),
                mosaic.source.width,
                mosaic.source.height,
                mosaic.original_format,
                mosaic.processing_time_ms
            );
            HttpResponse::Ok().json(SliceResponse::from(&mosaic))
        }
        Ok(Err(e)) => {
            warn!("Slice failed [{}]: {}", e.error_code(), e);
            bad_request()
        }
        Err(e) => {
            error!("Slice worker failed: {}", e);
            bad_request()
        }
    }
}

/// base64 画像スライス
/// POST /api/slice
pub async fn process_slice(body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    info!("Slice request received: {} bytes", body.len());

    if body.is_empty() {
        warn!("Slice request without body");
        return bad_request();
    }

    let image_data = match decode_payload(&body) {
        Ok(data) => data,
        Err(e) => {
            warn!("Invalid slice payload [{}]: {}", e.error_code(), e);
            return bad_request();
        }
    };

    run_pipeline(state, image_data).await
}

/// サービス情報
/// GET /api/info
pub async fn service_info(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(ServiceInfo {
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        mosaic: state.processor.config().clone(),
    }))
}

/// フォームアップロード型スライス
/// POST /api/slice/upload
#[cfg(feature = "http-endpoints")]
pub async fn upload_slice(mut payload: Multipart, state: web::Data<AppState>) -> HttpResponse {
    let mut image_data: Option<Vec<u8>> = None;
    let limit = state.processor.config().max_input_bytes;

    info!("Processing slice upload request");

    while let Some(field_result) = payload.next().await {
        let mut field = match field_result {
            Ok(field) => field,
            Err(e) => {
                warn!("Multipart field error: {}", e);
                return bad_request();
            }
        };

        let field_name = field.name().to_string();
        match field_name.as_str() {
            "file" => match read_field_data(&mut field, limit).await {
                Ok(data) => {
                    info!("Image file received, size: {} bytes", data.len());
                    image_data = Some(data);
                }
                Err(e) => {
                    warn!("Failed to read file field: {}", e);
                    return bad_request();
                }
            },
            _ => {
                debug!("Unknown field ignored: {}", field_name);
            }
        }
    }

    match image_data {
        Some(data) if !data.is_empty() => run_pipeline(state, data).await,
        _ => {
            warn!("No image file provided in multipart request");
            bad_request()
        }
    }
}

/// フィールドデータを読み取る補助関数
///
/// `limit` バイトを超えた時点で読み取りを打ち切る。
#[cfg(feature = "http-endpoints")]
async fn read_field_data(
    field: &mut Field,
    limit: usize,
) -> std::result::Result<Vec<u8>, actix_web::Error> {
    let mut data = Vec::new();

    while let Some(chunk_result) = field.next().await {
        let chunk = chunk_result.map_err(|e| {
            error!("Field chunk read error: {}", e);
            actix_web::error::ErrorBadRequest(format!("Field read error: {}", e))
        })?;
        if data.len() + chunk.len() > limit {
            return Err(actix_web::error::ErrorBadRequest(format!(
                "Field exceeds {} bytes",
                limit
            )));
        }
        data.extend_from_slice(&chunk);
    }

    debug!("Read field data: {} bytes", data.len());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::testing::png_bytes;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(MosaicConfig::default()))
    }

    #[actix_web::test]
    async fn test_slice_returns_grid_and_tiles() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let payload = STANDARD.encode(png_bytes(400, 900, [255, 0, 0, 255]));
        let req = test::TestRequest::post()
            .uri("/api/slice")
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: SliceResponse = test::read_body_json(resp).await;
        assert_eq!((body.columns, body.rows), (3, 5));
        assert_eq!(body.tiles.len(), 15);
        assert!(body.tiles.iter().all(|t| t.starts_with("data:image/png;base64,")));
    }

    #[actix_web::test]
    async fn test_slice_accepts_data_uri() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let payload = format!(
            "data:image/png;base64,{}",
            STANDARD.encode(png_bytes(64, 64, [0, 0, 0, 255]))
        );
        let req = test::TestRequest::post()
            .uri("/api/slice")
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_slice_errors_are_empty_400() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let payloads: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"not base64 !!".to_vec(),
            STANDARD.encode([0u8; 64]).into_bytes(),
        ];

        for payload in payloads {
            let req = test::TestRequest::post()
                .uri("/api/slice")
                .set_payload(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body = test::read_body(resp).await;
            assert!(body.is_empty());
        }
    }

    #[actix_web::test]
    async fn test_budget_violation_is_400() {
        let config = MosaicConfig {
            max_long_axis_cells: 6,
            ..MosaicConfig::default()
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(config)))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/slice")
            .set_payload(STANDARD.encode(png_bytes(600, 800, [0, 0, 0, 255])))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health_and_info() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"OK"));

        let req = test::TestRequest::get().uri("/api/info").to_request();
        let info: ApiResponse<ServiceInfo> = test::call_and_read_body_json(&app, req).await;
        assert!(info.success);
        assert_eq!(info.data.name, crate::NAME);
        assert_eq!(info.data.mosaic.max_cells, 23);
    }

    #[cfg(feature = "http-endpoints")]
    const BOUNDARY: &str = "----emoji-slicer-boundary";

    /// multipart/form-data の本文を組み立てる
    #[cfg(feature = "http-endpoints")]
    fn multipart_body(name: &str, filename: Option<&str>, data: &[u8]) -> Vec<u8> {
        let disposition = match filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png",
                name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"", name),
        };

        let mut body = format!("--{}\r\n{}\r\n\r\n", BOUNDARY, disposition).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    #[cfg(feature = "http-endpoints")]
    fn upload_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/slice/upload")
            .insert_header((
                actix_web::http::header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    #[cfg(feature = "http-endpoints")]
    #[actix_web::test]
    async fn test_upload_returns_grid_and_tiles() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let body = multipart_body("file", Some("wide.png"), &png_bytes(1600, 900, [0, 0, 255, 255]));
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // 幅 320、高さ 180 → 192
        let body: SliceResponse = test::read_body_json(resp).await;
        assert_eq!((body.columns, body.rows), (5, 3));
        assert_eq!(body.tiles.len(), 15);
    }

    #[cfg(feature = "http-endpoints")]
    #[actix_web::test]
    async fn test_upload_without_file_is_empty_400() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let body = multipart_body("note", None, b"hello");
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(test::read_body(resp).await.is_empty());
    }

    #[cfg(feature = "http-endpoints")]
    #[actix_web::test]
    async fn test_upload_over_limit_is_empty_400() {
        let config = MosaicConfig {
            max_input_bytes: 32,
            ..MosaicConfig::default()
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(config)))
                .configure(routes),
        )
        .await;

        let image = png_bytes(64, 64, [0, 0, 0, 255]);
        assert!(image.len() > 32);
        let req = upload_request(multipart_body("file", Some("a.png"), &image)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(test::read_body(resp).await.is_empty());
    }
}
