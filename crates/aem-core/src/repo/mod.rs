//! Persistencia del estado de steps por instancia.
//!
//! `StepStateRepository` carga y guarda el mapa `step id -> StepState` de una
//! instancia. Implementaciones en el core: memoria, archivo JSON y nodos del
//! propio repositorio de la instancia. Postgres vive en `aem-persistence`.

mod file;
mod memory;
mod remote;

pub use file::FileStepStateRepository;
pub use memory::InMemoryStepStateRepository;
pub use remote::RemoteStepStateRepository;

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::AemError;
use crate::instance::Instance;
use crate::step::StepStates;

#[async_trait]
pub trait StepStateRepository: Send + Sync {
    /// Estados conocidos de la instancia (vacío si nunca se provisionó).
    async fn load(&self, instance: &Instance) -> Result<StepStates, AemError>;
    /// Reemplaza los estados de la instancia.
    async fn save(&self, instance: &Instance, states: &StepStates) -> Result<(), AemError>;
}

#[async_trait]
impl<T: StepStateRepository + ?Sized> StepStateRepository for Arc<T> {
    async fn load(&self, instance: &Instance) -> Result<StepStates, AemError> {
        (**self).load(instance).await
    }

    async fn save(&self, instance: &Instance, states: &StepStates) -> Result<(), AemError> {
        (**self).save(instance, states).await
    }
}
