use async_trait::async_trait;
use std::path::Path;

use super::Downloader;
use crate::config::SftpOptions;
use crate::errors::{DownloadError, DownloadResult};

/// Descargas `sftp://[user[:password]@]host[:port]/path`. Las credenciales de
/// la URL tienen prioridad sobre las de `SftpOptions`.
#[derive(Debug, Clone)]
pub struct SftpDownloader {
    options: SftpOptions,
}

impl SftpDownloader {
    pub fn new(options: SftpOptions) -> Self {
        Self { options }
    }
}

#[cfg(feature = "sftp")]
fn fetch(source: &str, target: &Path, options: &SftpOptions) -> DownloadResult<()> {
    use reqwest::Url;
    use ssh2::Session;
    use std::net::TcpStream;

    let url = Url::parse(source).map_err(|_| DownloadError::InvalidSource(source.to_string()))?;
    let host = url.host_str()
                  .ok_or_else(|| DownloadError::InvalidSource(source.to_string()))?;
    let port = url.port().unwrap_or(22);
    let user = match url.username() {
        "" => options.user.clone().unwrap_or_else(|| "anonymous".to_string()),
        u => u.to_string(),
    };
    let password = url.password()
                      .map(str::to_string)
                      .or_else(|| options.password.clone())
                      .unwrap_or_default();

    let sftp_err = |e: ssh2::Error| DownloadError::Sftp(e.to_string());
    let tcp = TcpStream::connect((host, port))?;
    let mut session = Session::new().map_err(sftp_err)?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(sftp_err)?;
    session.userauth_password(&user, &password).map_err(sftp_err)?;
    let sftp = session.sftp().map_err(sftp_err)?;
    let mut remote = sftp.open(Path::new(url.path())).map_err(sftp_err)?;
    let mut local = std::fs::File::create(target)?;
    std::io::copy(&mut remote, &mut local)?;
    local.sync_all()?;
    Ok(())
}

#[cfg(not(feature = "sftp"))]
fn fetch(source: &str, _target: &Path, _options: &SftpOptions) -> DownloadResult<()> {
    Err(DownloadError::Unsupported(format!("'{source}' requires the 'sftp' feature")))
}

#[async_trait]
impl Downloader for SftpDownloader {
    async fn download(&self, source: &str, target: &Path) -> DownloadResult<()> {
        let source = source.to_string();
        let target = target.to_path_buf();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || fetch(&source, &target, &options))
            .await
            .map_err(|e| DownloadError::Sftp(format!("transfer task failed: {e}")))?
    }
}
