//! emoji-slicer サーバー

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emoji_slicer_common::{api, Result, Settings, NAME, VERSION};

#[actix_web::main]
async fn main() -> Result<()> {
    // 設定読み込み（ログレベルを決めるため先に行う）
    let (settings, config_warnings) = Settings::new()?;

    // ログ初期化（RUST_LOG 優先、なければ設定ファイルのレベル）
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for warning in &config_warnings {
        warn!("{}", warning);
    }

    // ビルド番号を取得
    const BUILD_NUMBER: &str = env!("BUILD_NUMBER");
    info!(
        "{} starting (version {}, build #{}, {} for {}, built {})",
        NAME,
        VERSION,
        BUILD_NUMBER,
        env!("GIT_HASH"),
        env!("BUILD_TARGET"),
        env!("BUILD_TIME")
    );

    settings.validate()?;
    info!("Configuration validated successfully");
    info!(
        "Mosaic: {}px tiles, max {} cells, long axis {} (strip {}, square {})",
        settings.mosaic.tile_size,
        settings.mosaic.max_cells,
        settings.mosaic.max_long_axis_cells,
        settings.mosaic.strip_long_axis_cells,
        settings.mosaic.square_cells
    );

    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Starting HTTP server on {}", bind_address);

    let app_state = web::Data::new(api::AppState::new(settings.mosaic.clone()));
    let max_body_size = settings.api.max_body_size;
    let cors_origins = settings.api.cors_origins.clone();

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(max_body_size))
            .wrap(middleware::Logger::default())
            .wrap(build_cors(&cors_origins))
            .configure(api::routes)
    })
    .client_request_timeout(std::time::Duration::from_secs(settings.server.request_timeout_secs));

    if let Some(workers) = settings.server.workers {
        server = server.workers(workers);
    }

    let server = server.bind(&bind_address)?.run();

    info!("Server running at http://{}", bind_address);

    // actix が SIGINT/SIGTERM でグレースフルに停止する
    server.await?;

    info!("Server stopped");
    Ok(())
}

/// CORS設定（"*" は全許可）
fn build_cors(origins: &[String]) -> Cors {
    if origins.iter().any(|o| o == "*") {
        return Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);
    }

    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST"])
        .allow_any_header()
        .max_age(3600)
}
