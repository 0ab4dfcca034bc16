use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use aem_core::constants::PARALLELISM;

pub const DOWNLOAD_DIR: &str = "build/aem/files";
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpOptions {
    pub user: Option<String>,
    pub password: Option<String>,
    /// Acepta certificados no válidos (instancias locales con certificados propios).
    pub ignore_ssl: bool,
    pub connect_timeout_secs: u64,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self { user: None,
               password: None,
               ignore_ssl: true,
               connect_timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SftpOptions {
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmbOptions {
    /// Directorio donde están montados los shares: `smb://host/share/a.zip`
    /// se lee de `<mount_root>/host/share/a.zip`.
    pub mount_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub download_dir: PathBuf,
    pub parallelism: usize,
    pub http: HttpOptions,
    pub sftp: SftpOptions,
    pub smb: SmbOptions,
    pub maven_repositories: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { download_dir: PathBuf::from(DOWNLOAD_DIR),
               parallelism: PARALLELISM,
               http: HttpOptions::default(),
               sftp: SftpOptions::default(),
               smb: SmbOptions::default(),
               maven_repositories: vec![MAVEN_CENTRAL.to_string()] }
    }
}

impl ResolverConfig {
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }
}
