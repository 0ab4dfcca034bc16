//! aem-resolver: resolución de archivos (HTTP, SFTP, SMB, URL, dependencias
//! Maven y paths locales) con caché en disco por fingerprint y grupos.
pub mod config;
pub mod downloader;
pub mod errors;
pub mod group;
pub mod resolution;
pub mod resolver;

pub use config::{HttpOptions, ResolverConfig, SftpOptions, SmbOptions};
pub use downloader::{DependencyNotation, DependencyOptions, Downloader, SourceKind};
pub use errors::{DownloadError, DownloadResult};
pub use group::{FileGroup, DEFAULT_GROUP};
pub use resolution::{fingerprint, FileResolution, MARKER_FILE};
pub use resolver::{FileResolver, GroupScope};
