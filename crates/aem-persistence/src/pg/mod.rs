//! Implementaciones Postgres (Diesel) de los traits del core.
//!
//! - `PgStepStateStore`: `StepStateRepository` con una fila por
//!   (instancia, step). `save` reemplaza el conjunto completo de la instancia
//!   dentro de una transacción.
//! - `PgEventStore`: `EventStore` append-only con orden total por `seq`
//!   (BIGSERIAL). Los eventos `StepFailed` guardan además la clase del error
//!   para auditoría.
//!
//! Diesel es síncrono: ambos stores corren sus consultas (y los reintentos
//! de `with_retry`) en `spawn_blocking`, fuera de los workers async.

mod events;
mod step_states;

pub use events::{EventRow, PgEventStore};
pub use step_states::{PgStepStateStore, StepStateRow};

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::{info, warn};

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

/// Pool r2d2 de conexiones Postgres (`min_idle` / `max_size`).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o uno de pruebas sin acoplar los stores a
/// r2d2. Debe devolver una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Reintento con backoff lineal corto (hasta 3 reintentos: 15, 30, 45 ms).
/// Sólo repite la unidad de trabajo cuando el error es transitorio.
pub(crate) fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Construye un pool Postgres y ejecuta las migraciones pendientes.
///
/// Tamaños en cero se elevan a 1; si `min_size > max_size` se usa
/// `min_size = max_size`.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_max = max_size.max(1);
    let validated_min = min_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({} > {}), using min=max", validated_min, validated_max);
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    info!("postgres pool ready (min_idle={}, max_size={})",
          validated_min.min(validated_max),
          validated_max);
    Ok(pool)
}

pub fn build_pool_with(cfg: &DbConfig) -> Result<PgPool, PersistenceError> {
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = DbConfig::from_env()?;
    build_pool_with(&cfg)
}
