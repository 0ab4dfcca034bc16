//! Configuración de conexión desde variables de entorno.
//! Convención `DATABASE_URL` más parámetros opcionales del pool.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(),
               min_connections: DEFAULT_MIN_CONNECTIONS,
               max_connections: DEFAULT_MAX_CONNECTIONS }
    }

    /// Lee `DATABASE_URL`, `DATABASE_MIN_CONNECTIONS` y
    /// `DATABASE_MAX_CONNECTIONS`. Sin URL devuelve error de configuración.
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        let url = env::var("DATABASE_URL").map_err(|_| PersistenceError::Config("DATABASE_URL is not set".into()))?;
        Ok(Self { url,
                  min_connections: parse_env("DATABASE_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS)?,
                  max_connections: parse_env("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)? })
    }

    /// Variante opcional: `None` si `DATABASE_URL` no está definida.
    pub fn from_env_opt() -> Result<Option<Self>, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        if env::var("DATABASE_URL").is_err() {
            return Ok(None);
        }
        Self::from_env().map(Some)
    }
}

fn parse_env(key: &str, default: u32) -> Result<u32, PersistenceError> {
    match env::var(key) {
        Ok(raw) => raw.trim()
                      .parse()
                      .map_err(|_| PersistenceError::Config(format!("{key} must be a positive integer, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
