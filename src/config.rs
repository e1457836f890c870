//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the SQLite URL / 覆盖 SQLite 地址的环境变量
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Candidate store configuration / 存储后端配置
    pub backend: BackendConfig,
    /// Search tuning / 搜索参数
    pub search: SearchConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Backend configuration / 后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// memory | document | sqlite
    pub kind: String,
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// JSON lines file for the document store (relative to data_dir) / 文档文件
    pub document_file: String,
    /// SQLite file (relative to data_dir) / 数据库文件
    pub sqlite_file: String,
    /// Optional seed file loaded at startup / 启动时导入的种子文件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<String>,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub suggestion_limit: usize,
    pub related_limit: usize,
    pub suggested_tags_limit: usize,
    /// Same viewer counts once per window / 浏览量去重窗口（秒）
    pub view_throttle_secs: u64,
    pub history_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8180,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            data_dir: "data".to_string(),
            document_file: "contents.jsonl".to_string(),
            sqlite_file: "search.db".to_string(),
            seed_file: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: 10,
            related_limit: 5,
            suggested_tags_limit: 5,
            view_throttle_secs: 3600,
            history_capacity: 1000,
        }
    }
}

impl BackendConfig {
    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Get the document store path / 获取文档文件路径
    pub fn get_document_path(&self) -> PathBuf {
        self.get_data_dir().join(&self.document_file)
    }

    /// Get the SQLite URL, `DATABASE_URL` wins when set / 获取数据库URL
    pub fn get_sqlite_url(&self) -> String {
        match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                let db_path = self.get_data_dir().join(&self.sqlite_file);
                format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
            }
        }
    }

    /// Seed file path, absolute or relative to the working directory / 种子文件路径
    pub fn get_seed_path(&self) -> Option<PathBuf> {
        self.seed_file
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    }
}

impl AppConfig {
    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from `path`, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config_from(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, path)?;
        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }
}

/// Load `config.json` from the working directory / 加载工作目录下的配置
pub fn load_config() -> anyhow::Result<AppConfig> {
    load_config_from(&get_config_path())
}

/// Save configuration to file / 保存配置到文件
pub fn save_config_to(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}
