use aem_core::errors::ErrorClass;
use aem_core::{AemError, EventStore, ProvisionEvent, ProvisionEventKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::provision_events;

/// Fila de `provision_events`.
///
/// - `seq`: BIGSERIAL global a la tabla.
/// - `event_type`: código corto de `ProvisionEventKind::code`.
/// - `payload`: JSON completo del enum.
/// - `error_class`: sólo en eventos `StepFailed`.
#[derive(Queryable, Debug)]
pub struct EventRow {
    pub seq: i64,
    pub run_id: Uuid,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub payload: Value,
    pub error_class: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = provision_events)]
struct NewEventRow<'a> {
    run_id: &'a Uuid,
    event_type: &'a str,
    payload: &'a Value,
    error_class: Option<&'a str>,
}

fn error_class_of(kind: &ProvisionEventKind) -> Option<&'static str> {
    match kind {
        ProvisionEventKind::StepFailed { error, .. } => Some(match error.class() {
                                                             ErrorClass::Configuration => "configuration",
                                                             ErrorClass::Transient => "transient",
                                                             ErrorClass::Permanent => "permanent",
                                                         }),
        _ => None,
    }
}

/// `EventStore` append-only sobre Postgres. Las consultas corren en
/// `spawn_blocking`.
pub struct PgEventStore<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> Clone for PgEventStore<P> {
    fn clone(&self) -> Self {
        Self { provider: self.provider.clone() }
    }
}

impl<P: ConnectionProvider> PgEventStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }

    /// Cantidad de fallos de un run agrupados por clase de error.
    pub fn failures_by_class(&self, run_id: Uuid) -> Result<Vec<(String, i64)>, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            provision_events::table.filter(provision_events::run_id.eq(run_id))
                                   .filter(provision_events::error_class.is_not_null())
                                   .group_by(provision_events::error_class)
                                   .select((provision_events::error_class, diesel::dsl::count_star()))
                                   .order(provision_events::error_class.asc())
                                   .load::<(Option<String>, i64)>(&mut conn)
                                   .map_err(PersistenceError::from)
        }).map(|rows| rows.into_iter().filter_map(|(class, n)| class.map(|c| (c, n))).collect())
    }

    pub fn append_blocking(&self, run_id: Uuid, kind: ProvisionEventKind) -> Result<ProvisionEvent, PersistenceError> {
        debug!("append_kind:start run_id={run_id} kind={}", kind.code());
        let payload = serde_json::to_value(&kind).map_err(|e| PersistenceError::Unknown(format!("ser: {e}")))?;
        let row = NewEventRow { run_id: &run_id,
                                event_type: kind.code(),
                                payload: &payload,
                                error_class: error_class_of(&kind) };
        let (seq, ts): (i64, DateTime<Utc>) = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(provision_events::table).values(&row)
                                                         .returning((provision_events::seq, provision_events::ts))
                                                         .get_result(&mut conn)
                                                         .map_err(PersistenceError::from)
        })?;
        Ok(ProvisionEvent { seq: seq as u64,
                            run_id,
                            kind,
                            ts })
    }

    pub fn list_blocking(&self, run_id: Uuid) -> Result<Vec<ProvisionEvent>, PersistenceError> {
        let rows: Vec<EventRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            provision_events::table.filter(provision_events::run_id.eq(run_id))
                                   .order(provision_events::seq.asc())
                                   .load::<EventRow>(&mut conn)
                                   .map_err(PersistenceError::from)
        })?;
        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<ProvisionEventKind>(row.payload) {
                Ok(kind) => events.push(ProvisionEvent { seq: row.seq as u64,
                                                         run_id: row.run_id,
                                                         kind,
                                                         ts: row.ts }),
                Err(e) => warn!("skip undecodable event seq={} type={}: {e}", row.seq, row.event_type),
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl<P: ConnectionProvider> EventStore for PgEventStore<P> {
    async fn append_kind(&self, run_id: Uuid, kind: ProvisionEventKind) -> Result<ProvisionEvent, AemError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.append_blocking(run_id, kind))
            .await
            .map_err(|e| AemError::Internal(format!("event append task: {e}")))?
            .map_err(AemError::from)
    }

    async fn list(&self, run_id: Uuid) -> Result<Vec<ProvisionEvent>, AemError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.list_blocking(run_id))
            .await
            .map_err(|e| AemError::Internal(format!("event list task: {e}")))?
            .map_err(AemError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg::PgPooledConnection;
    use std::sync::Mutex;
    use std::thread::ThreadId;

    /// Proveedor sin base de datos: anota el hilo que pide la conexión.
    #[derive(Default)]
    struct UnavailableProvider {
        threads: Mutex<Vec<ThreadId>>,
    }

    impl ConnectionProvider for UnavailableProvider {
        fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Err(PersistenceError::TransientIo("pool error: unavailable".into()))
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn event_queries_leave_the_async_worker() {
        let store = PgEventStore::new(UnavailableProvider::default());
        let run_id = Uuid::new_v4();
        let appended = store.append_kind(run_id,
                                         ProvisionEventKind::RunStarted { instances: vec!["local-author".into()],
                                                                          step_count: 1 })
                            .await;
        assert!(appended.is_err());
        assert!(store.list(run_id).await.is_err());

        let worker = std::thread::current().id();
        let threads = store.provider.threads.lock().unwrap();
        // conexión inicial más tres reintentos, por operación
        assert_eq!(threads.len(), 8);
        assert!(threads.iter().all(|t| *t != worker));
    }

    #[test]
    fn only_failures_carry_error_class() {
        let failed = ProvisionEventKind::StepFailed { instance: "local-author".into(),
                                                      step_index: 0,
                                                      step_id: "s1".into(),
                                                      fingerprint: "fp".into(),
                                                      error: AemError::remote("local-author", "refused") };
        assert_eq!(error_class_of(&failed), Some("transient"));
        let skipped = ProvisionEventKind::StepSkipped { instance: "local-author".into(),
                                                        step_index: 0,
                                                        step_id: "s1".into() };
        assert_eq!(error_class_of(&skipped), None);
    }
}
