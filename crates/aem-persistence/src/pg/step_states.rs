use std::sync::Arc;

use aem_core::{AemError, Instance, StepState, StepStateRepository, StepStates, StepStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;

use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::step_states;

/// Fila de `step_states` en el orden de columnas de la tabla.
#[derive(Queryable, Debug)]
pub struct StepStateRow {
    pub instance: String,
    pub step_id: String,
    pub status: String,
    pub version: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub counter: i32,
    pub error: Option<String>,
}

impl StepStateRow {
    fn into_state(self) -> Result<StepState, PersistenceError> {
        let Some(status) = StepStatus::parse(&self.status) else {
            return Err(PersistenceError::Corrupt(format!("unknown status '{}' for step '{}'", self.status, self.step_id)));
        };
        Ok(StepState { step_id: self.step_id,
                       status,
                       version: self.version,
                       started_at: self.started_at,
                       ended_at: self.ended_at,
                       counter: u32::try_from(self.counter).unwrap_or(0),
                       error: self.error })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = step_states)]
struct NewStepStateRow<'a> {
    instance: &'a str,
    step_id: &'a str,
    status: &'a str,
    version: &'a str,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    counter: i32,
    error: Option<&'a str>,
}

/// `StepStateRepository` sobre Postgres.
pub struct PgStepStateStore<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> Clone for PgStepStateStore<P> {
    fn clone(&self) -> Self {
        Self { provider: self.provider.clone() }
    }
}

impl<P: ConnectionProvider> PgStepStateStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }

    /// Lectura síncrona; usada por `load` dentro de `spawn_blocking`.
    pub fn load_blocking(&self, instance: &str) -> Result<StepStates, PersistenceError> {
        let rows: Vec<StepStateRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            step_states::table.filter(step_states::instance.eq(instance))
                              .order(step_states::step_id.asc())
                              .load::<StepStateRow>(&mut conn)
                              .map_err(PersistenceError::from)
        })?;
        debug!("step_states:load instance={instance} rows={}", rows.len());
        rows.into_iter()
            .map(|row| row.into_state().map(|state| (state.step_id.clone(), state)))
            .collect()
    }

    /// Reemplaza todas las filas de la instancia en una única transacción.
    pub fn save_blocking(&self, instance: &str, states: &StepStates) -> Result<(), PersistenceError> {
        let rows: Vec<NewStepStateRow<'_>> = states.values()
                                                   .map(|s| NewStepStateRow { instance,
                                                                              step_id: &s.step_id,
                                                                              status: s.status.as_str(),
                                                                              version: &s.version,
                                                                              started_at: s.started_at,
                                                                              ended_at: s.ended_at,
                                                                              counter: i32::try_from(s.counter).unwrap_or(i32::MAX),
                                                                              error: s.error.as_deref() })
                                                   .collect();
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    diesel::delete(step_states::table.filter(step_states::instance.eq(instance))).execute(tx)?;
                    if !rows.is_empty() {
                        diesel::insert_into(step_states::table).values(&rows).execute(tx)?;
                    }
                    Ok::<_, PersistenceError>(())
                })
        })?;
        debug!("step_states:save instance={instance} rows={}", rows.len());
        Ok(())
    }
}

#[async_trait]
impl<P: ConnectionProvider> StepStateRepository for PgStepStateStore<P> {
    async fn load(&self, instance: &Instance) -> Result<StepStates, AemError> {
        let store = self.clone();
        let name = instance.name.clone();
        tokio::task::spawn_blocking(move || store.load_blocking(&name))
            .await
            .map_err(|e| AemError::Internal(format!("step state load task: {e}")))?
            .map_err(AemError::from)
    }

    async fn save(&self, instance: &Instance, states: &StepStates) -> Result<(), AemError> {
        let store = self.clone();
        let name = instance.name.clone();
        let states = states.clone();
        tokio::task::spawn_blocking(move || store.save_blocking(&name, &states))
            .await
            .map_err(|e| AemError::Internal(format!("step state save task: {e}")))?
            .map_err(AemError::from)
    }
}
