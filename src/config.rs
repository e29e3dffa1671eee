use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Configuration for the video detector service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Detection model settings
    pub model: ModelConfig,

    /// Document store settings
    pub storage: StorageConfig,

    /// Scratch directory settings
    pub scratch: ScratchConfig,

    /// Video download settings
    pub download: DownloadConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX detection model
    pub model_path: PathBuf,

    /// Optional label file, one class name per line
    pub labels_path: Option<PathBuf>,

    /// Square input size expected by the model
    pub input_size: u32,

    /// Minimum class score for a candidate box
    pub confidence_threshold: f32,

    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// MongoDB connection string
    pub uri: Option<String>,

    /// Logical database holding user records
    pub database: String,

    /// Collection holding one document per (user, video)
    pub collection: String,

    /// Keep documents in process memory instead of MongoDB
    pub in_memory: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Root under which each run creates its own directory
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Timeout for a whole video download (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/gymze-customized.onnx"),
            labels_path: None,
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "users".to_string(),
            collection: "videos".to_string(),
            in_memory: false,
        }
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("temp"),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 600, // large uploads on slow links
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Filter directives for this crate and the HTTP layer; `verbose` forces debug
    pub fn directives(&self, verbose: bool) -> String {
        let level = if verbose { "debug" } else { self.level.as_str() };
        format!("video_detector={},tower_http={}", level, level)
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config_paths = [
            "video-detector.toml",
            "config/video-detector.toml",
            "/etc/video-detector/config.toml",
        ];

        let mut config = Self::default();
        for path in &config_paths {
            let path = Path::new(path);
            if path.exists() {
                config = Self::from_file(path)?;
                tracing::info!("📄 Loaded configuration from: {}", path.display());
                break;
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from an explicit file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override settings from environment variables
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = var("MONGODB_URI") {
            self.storage.uri = Some(uri);
        }

        if let Some(host) = var("DETECTOR_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("DETECTOR_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid DETECTOR_PORT: {}", port),
            }
        }

        if let Some(model_path) = var("DETECTOR_MODEL_PATH") {
            self.model.model_path = PathBuf::from(model_path);
        }

        if let Some(labels_path) = var("DETECTOR_LABELS_PATH") {
            self.model.labels_path = Some(PathBuf::from(labels_path));
        }

        if let Some(scratch_dir) = var("DETECTOR_SCRATCH_DIR") {
            self.scratch.root_dir = PathBuf::from(scratch_dir);
        }

        if let Some(level) = var("DETECTOR_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".to_string()));
        }

        if self.model.input_size == 0 {
            return Err(ConfigError::Invalid("input_size must be greater than 0".to_string()));
        }

        let confidence = self.model.confidence_threshold;
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(ConfigError::Invalid(
                "confidence_threshold must be within (0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.model.iou_threshold) {
            return Err(ConfigError::Invalid("iou_threshold must be within [0, 1]".to_string()));
        }

        if !self.storage.in_memory {
            match &self.storage.uri {
                Some(uri) if !uri.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "MONGODB_URI must be set to reach the document store".to_string(),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Detector Configuration:\n\
            - Listen: {}:{}\n\
            - Model: {}\n\
            - Input Size: {}\n\
            - Confidence Threshold: {:.2}\n\
            - Store: {}\n\
            - Scratch Root: {}",
            self.server.host,
            self.server.port,
            self.model.model_path.display(),
            self.model.input_size,
            self.model.confidence_threshold,
            if self.storage.in_memory {
                "in-memory".to_string()
            } else {
                format!("mongodb {}.{}", self.storage.database, self.storage.collection)
            },
            self.scratch.root_dir.display(),
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.config.model.model_path = path;
        self
    }

    pub fn with_storage_uri(mut self, uri: String) -> Self {
        self.config.storage.uri = Some(uri);
        self
    }

    pub fn with_in_memory_store(mut self, enable: bool) -> Self {
        self.config.storage.in_memory = enable;
        self
    }

    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.config.scratch.root_dir = dir;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.model.confidence_threshold = threshold;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.database, "users");
        assert_eq!(config.storage.collection, "videos");
        assert_eq!(config.scratch.root_dir, PathBuf::from("temp"));
        assert_eq!(config.model.input_size, 640);
    }

    #[test]
    fn test_missing_storage_uri_fails_validation() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new()
            .with_storage_uri("mongodb://localhost:27017".to_string())
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_in_memory_store_needs_no_uri() {
        let config = ConfigBuilder::new().with_in_memory_store(true).build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let config = ConfigBuilder::new()
            .with_in_memory_store(true)
            .with_confidence_threshold(1.5)
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_confidence_threshold_rejected() {
        let zero = ConfigBuilder::new()
            .with_in_memory_store(true)
            .with_confidence_threshold(0.0)
            .build();
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));

        let one = ConfigBuilder::new()
            .with_in_memory_store(true)
            .with_confidence_threshold(1.0)
            .build();
        assert!(one.validate().is_ok());
    }

    #[test]
    fn test_logging_directives() {
        let logging = LoggingConfig {
            level: "warn".to_string(),
        };
        assert_eq!(logging.directives(false), "video_detector=warn,tower_http=warn");
        assert_eq!(logging.directives(true), "video_detector=debug,tower_http=debug");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9100

            [storage]
            uri = "mongodb://db:27017"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.uri.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(config.storage.collection, "videos");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MONGODB_URI", "mongodb://env:27017"),
            ("DETECTOR_PORT", "9000"),
            ("DETECTOR_SCRATCH_DIR", "/tmp/scratch"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.storage.uri.as_deref(), Some("mongodb://env:27017"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.scratch.root_dir, PathBuf::from("/tmp/scratch"));
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_vars(|key| (key == "DETECTOR_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 8000);
    }
}
