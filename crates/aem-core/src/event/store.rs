use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{ProvisionEvent, ProvisionEventKind};
use crate::errors::AemError;

/// Almacenamiento de eventos append-only. Los steps de distintas instancias
/// se ejecutan en paralelo, por eso los métodos toman `&self`. Un store con
/// I/O bloqueante no debe retener el worker async.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Agrega un evento y devuelve el evento completo (con seq y ts).
    async fn append_kind(&self, run_id: Uuid, kind: ProvisionEventKind) -> Result<ProvisionEvent, AemError>;
    /// Eventos de un run en orden ascendente de seq.
    async fn list(&self, run_id: Uuid) -> Result<Vec<ProvisionEvent>, AemError>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: DashMap<Uuid, Vec<ProvisionEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_kind(&self, run_id: Uuid, kind: ProvisionEventKind) -> Result<ProvisionEvent, AemError> {
        let mut events = self.inner.entry(run_id).or_default();
        let ev = ProvisionEvent { seq: events.len() as u64,
                                  run_id,
                                  kind,
                                  ts: Utc::now() };
        events.push(ev.clone());
        Ok(ev)
    }

    async fn list(&self, run_id: Uuid) -> Result<Vec<ProvisionEvent>, AemError> {
        Ok(self.inner.get(&run_id).map(|e| e.clone()).unwrap_or_default())
    }
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    async fn append_kind(&self, run_id: Uuid, kind: ProvisionEventKind) -> Result<ProvisionEvent, AemError> {
        (**self).append_kind(run_id, kind).await
    }

    async fn list(&self, run_id: Uuid) -> Result<Vec<ProvisionEvent>, AemError> {
        (**self).list(run_id).await
    }
}
