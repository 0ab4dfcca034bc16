//! Notación de dependencias `group:name:version[:classifier][@ext]` resuelta
//! contra repositorios Maven.

use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::Downloader;
use crate::errors::{DownloadError, DownloadResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNotation {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    pub ext: String,
}

impl DependencyNotation {
    pub fn parse(notation: &str) -> Option<Self> {
        if notation.contains(['/', '\\']) || notation.contains("://") {
            return None;
        }
        let (coordinates, ext) = match notation.rsplit_once('@') {
            Some((c, e)) if !e.is_empty() => (c, e.to_string()),
            Some(_) => return None,
            None => (notation, "jar".to_string()),
        };
        let parts: Vec<&str> = coordinates.split(':').collect();
        if !(3..=4).contains(&parts.len()) || parts.iter().any(|p| p.trim().is_empty()) {
            return None;
        }
        Some(Self { group: parts[0].to_string(),
                    name: parts[1].to_string(),
                    version: parts[2].to_string(),
                    classifier: parts.get(3).map(|c| c.to_string()),
                    ext })
    }

    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.name, self.version, c, self.ext),
            None => format!("{}-{}.{}", self.name, self.version, self.ext),
        }
    }

    /// Path relativo dentro de un repositorio con layout Maven.
    pub fn repository_path(&self) -> String {
        format!("{}/{}/{}/{}",
                self.group.replace('.', "/"),
                self.name,
                self.version,
                self.file_name())
    }
}

impl fmt::Display for DependencyNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        write!(f, "@{}", self.ext)
    }
}

/// Construcción tipada de una notación.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyOptions {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    pub ext: Option<String>,
}

impl DependencyOptions {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { group: group.into(),
               name: name.into(),
               version: version.into(),
               ..Self::default() }
    }

    pub fn classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }

    pub fn notation(&self) -> String {
        let mut text = format!("{}:{}:{}", self.group, self.name, self.version);
        if let Some(c) = &self.classifier {
            text.push(':');
            text.push_str(c);
        }
        if let Some(e) = &self.ext {
            text.push('@');
            text.push_str(e);
        }
        text
    }
}

/// Prueba los repositorios en orden con el downloader HTTP; gana el primero
/// que tenga el artefacto.
pub struct DependencyDownloader {
    repositories: Vec<String>,
    http: Arc<dyn Downloader>,
}

impl DependencyDownloader {
    pub fn new(repositories: Vec<String>, http: Arc<dyn Downloader>) -> Self {
        Self { repositories, http }
    }
}

#[async_trait]
impl Downloader for DependencyDownloader {
    async fn download(&self, source: &str, target: &Path) -> DownloadResult<()> {
        let notation = DependencyNotation::parse(source).ok_or_else(|| DownloadError::InvalidSource(source.to_string()))?;
        let mut tried = Vec::new();
        for repository in &self.repositories {
            let url = format!("{}/{}", repository.trim_end_matches('/'), notation.repository_path());
            match self.http.download(&url, target).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!("'{notation}' not available at '{url}': {e}");
                    tried.push(repository.clone());
                }
            }
        }
        Err(DownloadError::NotInRepositories { notation: notation.to_string(),
                                               tried: tried.join(", ") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_notation() {
        let n = DependencyNotation::parse("com.adobe.aem:uber-jar:6.5.0:apis@jar").unwrap();
        assert_eq!(n.classifier.as_deref(), Some("apis"));
        assert_eq!(n.repository_path(), "com/adobe/aem/uber-jar/6.5.0/uber-jar-6.5.0-apis.jar");
    }

    #[test]
    fn rejects_non_notation() {
        assert!(DependencyNotation::parse("a:b").is_none());
        assert!(DependencyNotation::parse("a::c").is_none());
        assert!(DependencyNotation::parse("a:b:c@").is_none());
        assert!(DependencyNotation::parse("/tmp/a:b:c").is_none());
    }

    #[test]
    fn options_build_notation() {
        let opts = DependencyOptions::new("org.example", "tool", "1.0").classifier("bin").ext("zip");
        assert_eq!(opts.notation(), "org.example:tool:1.0:bin@zip");
        assert!(DependencyNotation::parse(&opts.notation()).is_some());
    }
}
