use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub converters: ConverterConfig,
    pub watcher: WatcherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, which bounds upload size
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that catalog paths and static files are resolved against
    pub site_root: PathBuf,
    /// Catalog JSON file, relative to `site_root`
    pub catalog_path: PathBuf,
    /// Upload tree, relative to `site_root`
    pub upload_root: PathBuf,
    /// Scratch space for uploads that are not committed yet; the system temp
    /// directory when unset. Kept outside the upload tree so the watcher
    /// never sees half-finished files.
    pub staging_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// LibreOffice binary; discovered when unset
    pub soffice_path: Option<PathBuf>,
    pub docx2pdf_command: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub enabled: bool,
    pub command: String,
    pub script: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            site_root: PathBuf::from("."),
            catalog_path: PathBuf::from("data/notes-data.json"),
            upload_root: PathBuf::from("data/notes"),
            staging_dir: None,
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            soffice_path: None,
            docx2pdf_command: "docx2pdf".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "node".to_string(),
            script: PathBuf::from("scripts/auto-update-watcher.js"),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // Environment variables like NOTES__SERVER__PORT=8080
        config = config.add_source(
            config::Environment::with_prefix("NOTES")
                .separator("__")
                .prefix_separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl StorageConfig {
    pub fn catalog_file(&self) -> PathBuf {
        self.site_root.join(&self.catalog_path)
    }

    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("notes-catalog-staging"))
    }
}

const SOFFICE_CANDIDATES: &[&str] = &[
    "/usr/bin/soffice",
    "/usr/local/bin/soffice",
    "/usr/lib/libreoffice/program/soffice",
    "/opt/libreoffice/program/soffice",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
    r"C:\Program Files\LibreOffice\program\soffice.exe",
];

impl ConverterConfig {
    /// Configured LibreOffice binary, else the first well-known install
    /// location that exists, else `soffice` looked up on `PATH`.
    pub fn resolve_soffice(&self) -> PathBuf {
        if let Some(path) = &self.soffice_path {
            return path.clone();
        }
        SOFFICE_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|candidate| candidate.is_file())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("soffice"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
