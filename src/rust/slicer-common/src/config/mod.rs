//! 共通設定管理モジュール

use serde::{Deserialize, Serialize};
use std::env;
use crate::error::{SlicerError, Result};

/// サーバー設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// バインドするホストアドレス
    pub host: String,

    /// ポート番号
    pub port: u16,

    /// ワーカースレッド数
    pub workers: Option<usize>,

    /// リクエストタイムアウト（秒）
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 18080,
            workers: None,
            request_timeout_secs: 30,
        }
    }
}

/// ロギング設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// ログレベル（EnvFilter 形式も可）
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// API設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// CORS許可オリジン
    pub cors_origins: Vec<String>,

    /// 最大リクエストボディサイズ（バイト）
    ///
    /// base64 は元データの約 4/3 倍になるため、画像上限より大きく取る。
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            cors_origins: vec!["*".to_string()],
            max_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// リサイズフィルタ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl ResizeFilter {
    pub fn to_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl std::str::FromStr for ResizeFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(ResizeFilter::Nearest),
            "triangle" => Ok(ResizeFilter::Triangle),
            "catmullrom" => Ok(ResizeFilter::CatmullRom),
            "gaussian" => Ok(ResizeFilter::Gaussian),
            "lanczos3" => Ok(ResizeFilter::Lanczos3),
            _ => Err(format!("Invalid resize filter: {}", s)),
        }
    }
}

/// モザイク分割設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// タイル一辺のピクセル数
    pub tile_size: u32,

    /// 縦長・横長画像の長辺セル数
    pub max_long_axis_cells: u32,

    /// 1行（1列）モードの長辺セル数
    pub strip_long_axis_cells: u32,

    /// 正方形寄り画像の長辺セル数
    pub square_cells: u32,

    /// 1メッセージあたりの最大セル数
    pub max_cells: u32,

    /// 短辺/長辺 がこの値以下なら細長い画像とみなす
    pub aspect_threshold: f64,

    /// リサイズフィルタ
    pub resize_filter: ResizeFilter,

    /// 入力画像の最大バイト数
    pub max_input_bytes: usize,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        MosaicConfig {
            tile_size: 64,
            max_long_axis_cells: 5,
            strip_long_axis_cells: 7,
            square_cells: 4,
            max_cells: 23,
            aspect_threshold: 0.75,
            resize_filter: ResizeFilter::Lanczos3,
            max_input_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl MosaicConfig {
    /// モザイク設定を検証
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(SlicerError::Config("tile_size must be positive".to_string()));
        }

        let counts = [
            ("max_long_axis_cells", self.max_long_axis_cells),
            ("strip_long_axis_cells", self.strip_long_axis_cells),
            ("square_cells", self.square_cells),
            ("max_cells", self.max_cells),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(SlicerError::Config(format!("{} must be positive", name)));
            }
            if value > self.max_cells {
                return Err(SlicerError::Config(format!(
                    "{} ({}) exceeds max_cells ({})",
                    name, value, self.max_cells
                )));
            }
        }

        if !(self.aspect_threshold > 0.0 && self.aspect_threshold <= 1.0) {
            return Err(SlicerError::Config(format!(
                "aspect_threshold must be within (0, 1]: {}",
                self.aspect_threshold
            )));
        }

        if self.max_input_bytes == 0 {
            return Err(SlicerError::Config("max_input_bytes must be positive".to_string()));
        }

        Ok(())
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// サーバー設定
    pub server: ServerConfig,

    /// ロギング設定
    pub logging: LoggingConfig,

    /// API設定
    pub api: ApiConfig,

    /// モザイク設定
    pub mosaic: MosaicConfig,
}

impl Settings {
    /// 設定を読み込む
    ///
    /// 読み込み優先順位：
    /// 1. 環境変数
    /// 2. 設定ファイル（CONFIG_FILE で指定された場合）
    /// 3. デフォルト値
    ///
    /// 適用できなかった環境変数の警告も返す（ロガー初期化前に呼ばれるため）。
    pub fn new() -> Result<(Self, Vec<String>)> {
        let mut settings = Self::default();

        if let Ok(config_path) = env::var("CONFIG_FILE") {
            settings = Self::from_file(&config_path)?;
        }

        let warnings = settings.override_from_env();

        Ok((settings, warnings))
    }

    /// 設定ファイルから読み込む
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SlicerError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_str_with_format(&content, path)
    }

    /// 拡張子に応じて文字列をパース
    fn from_str_with_format(content: &str, path: &str) -> Result<Self> {
        // JSON形式
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .map_err(|e| SlicerError::Config(format!("Failed to parse JSON config: {}", e)))
        }
        // TOML形式
        else if path.ends_with(".toml") {
            toml::from_str(content)
                .map_err(|e| SlicerError::Config(format!("Failed to parse TOML config: {}", e)))
        }
        // YAML形式
        else if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(content)
                .map_err(|e| SlicerError::Config(format!("Failed to parse YAML config: {}", e)))
        } else {
            Err(SlicerError::Config("Unsupported config file format".to_string()))
        }
    }

    /// 環境変数で設定を上書き
    fn override_from_env(&mut self) -> Vec<String> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// キー参照関数から上書きを適用（テストでは環境変数を汚さずに使う）
    ///
    /// 解釈できない値は無視し、警告メッセージとして返す。
    fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        fn parsed<T: std::str::FromStr>(
            key: &str,
            value: Option<String>,
            warnings: &mut Vec<String>,
        ) -> Option<T> {
            let value = value?;
            match value.parse() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    warnings.push(format!("Ignoring {}={:?}: not a valid value", key, value));
                    None
                }
            }
        }

        // サーバー設定
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed("PORT", lookup("PORT"), &mut warnings) {
            self.server.port = port;
        }
        if let Some(workers) = parsed("WORKERS", lookup("WORKERS"), &mut warnings) {
            self.server.workers = Some(workers);
        }

        // ロギング設定
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }

        // API設定
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.api.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(size) = parsed("MAX_BODY_SIZE", lookup("MAX_BODY_SIZE"), &mut warnings) {
            self.api.max_body_size = size;
        }

        // モザイク設定
        if let Some(tile_size) = parsed("TILE_SIZE", lookup("TILE_SIZE"), &mut warnings) {
            self.mosaic.tile_size = tile_size;
        }
        if let Some(max_cells) = parsed("MAX_CELLS", lookup("MAX_CELLS"), &mut warnings) {
            self.mosaic.max_cells = max_cells;
        }
        if let Some(filter) = parsed("RESIZE_FILTER", lookup("RESIZE_FILTER"), &mut warnings) {
            self.mosaic.resize_filter = filter;
        }

        warnings
    }

    /// 設定を検証
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SlicerError::Config("Invalid port number: 0".to_string()));
        }

        if self.api.max_body_size == 0 {
            return Err(SlicerError::Config("max_body_size must be positive".to_string()));
        }

        self.mosaic.validate()
    }

    /// 設定をファイルに保存
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = if path.ends_with(".json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| SlicerError::Config(format!("Failed to serialize to JSON: {}", e)))?
        } else if path.ends_with(".toml") {
            toml::to_string_pretty(self)
                .map_err(|e| SlicerError::Config(format!("Failed to serialize to TOML: {}", e)))?
        } else if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::to_string(self)
                .map_err(|e| SlicerError::Config(format!("Failed to serialize to YAML: {}", e)))?
        } else {
            return Err(SlicerError::Config("Unsupported config file format".to_string()));
        };

        std::fs::write(path, content)
            .map_err(|e| SlicerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
