//! Cableado de servicios.
//!
//! `AemServices` construye, a partir de un `AemConfig`, el canal remoto, el
//! registro de instancias, los stores de provisioning y el resolver. Cada
//! servicio se crea de forma independiente; no hay estado global.
use aem_adapters::{HttpInstanceSync, SyncOptions};
use aem_core::{AemError, AwaitConfig, AwaitResult, AwaitState, AwaitStatus, AwaitUp, EventStore, FileStepStateRepository, InMemoryEventStore, Instance,
               InstanceRegistry, InstanceSync, LogNotifier, LogProgress, Notifier, ProgressReporter, ProvisionPlan,
               ProvisionSummary, Provisioner, RemoteStepStateRepository, Step, StepStateRepository};
use aem_persistence::{build_pool, PgEventStore, PgStepStateStore, PoolProvider};
use aem_resolver::FileResolver;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;

use crate::config::{AemConfig, StateStoreKind};

pub type DynProvisioner = Provisioner<Arc<dyn EventStore>, Arc<dyn StepStateRepository>>;

pub struct AemServices {
    config: AemConfig,
    registry: Arc<InstanceRegistry>,
    sync: Arc<dyn InstanceSync>,
    notifier: Arc<dyn Notifier>,
    progress: Arc<dyn ProgressReporter>,
}

impl AemServices {
    /// Servicios con el cliente HTTP real.
    pub fn new(config: AemConfig) -> Result<Self, AemError> {
        let options = SyncOptions { ignore_ssl: config.resolver.http.ignore_ssl,
                                    ..SyncOptions::default() };
        let sync = Arc::new(HttpInstanceSync::new(&options)?);
        Self::with_sync(config, sync)
    }

    pub fn with_sync(config: AemConfig, sync: Arc<dyn InstanceSync>) -> Result<Self, AemError> {
        let registry = Arc::new(config.registry()?);
        Ok(Self { config,
                  registry,
                  sync,
                  notifier: Arc::new(LogNotifier),
                  progress: Arc::new(LogProgress) })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &AemConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    pub fn sync(&self) -> Arc<dyn InstanceSync> {
        self.sync.clone()
    }

    /// Instancias configuradas, opcionalmente filtradas por patrón de nombre.
    pub fn instances(&self, filter: Option<&str>) -> Vec<Instance> {
        match filter {
            Some(pattern) => self.registry.filter(pattern),
            None => self.registry.all(),
        }
    }

    pub async fn await_up(&self, filter: Option<&str>) -> Result<AwaitResult, AemError> {
        self.await_up_until(filter, std::future::pending()).await
    }

    /// Espera a las instancias; con `resume` salta las registradas estables
    /// en el run anterior. Un run que no termina estable guarda las estables
    /// para el próximo resume; uno estable borra el estado.
    pub async fn await_up_until<F>(&self, filter: Option<&str>, shutdown: F) -> Result<AwaitResult, AemError>
        where F: Future<Output = ()>
    {
        let instances = self.instances(filter);
        let state_file = self.config.provision.await_state_file();
        let mut await_up = AwaitUp::new(self.sync.clone()).with_progress(self.progress.clone())
                                                          .with_registry(self.registry.clone());
        if self.config.await_up.resume {
            if let Some(prior) = AwaitState::load(&state_file).await? {
                debug!("await state loaded from {} ({} stable)", state_file.display(), prior.stable.len());
                await_up = await_up.with_prior_state(prior);
            }
        }
        // el timeout se escala después de guardar el estado
        let config = AwaitConfig { escalate_timeout: false,
                                   ..self.config.await_up.clone() };
        let result = await_up.await_up_until(&instances, &config, shutdown).await?;
        let persisted = match result.status {
            AwaitStatus::NothingToAwait => Ok(()),
            AwaitStatus::Stable => AwaitState::clear(&state_file).await,
            _ => AwaitState::from_result(&result).save(&state_file).await,
        };
        if let Err(e) = persisted {
            warn!("cannot update await state: {e}");
        }
        if result.status == AwaitStatus::TimedOut && self.config.await_up.escalate_timeout {
            return result.into_result();
        }
        Ok(result)
    }

    /// Stores de provisioning según `provision.state_store`. Los eventos sólo
    /// se persisten con Postgres; en los demás casos quedan en memoria.
    pub async fn stores(&self) -> Result<(Arc<dyn EventStore>, Arc<dyn StepStateRepository>), AemError> {
        match self.config.provision.state_store {
            StateStoreKind::File => Ok((Arc::new(InMemoryEventStore::new()),
                                        Arc::new(FileStepStateRepository::new(self.config.provision.state_dir.clone())))),
            StateStoreKind::Instance => Ok((Arc::new(InMemoryEventStore::new()),
                                            Arc::new(RemoteStepStateRepository::new(self.sync.clone())))),
            StateStoreKind::Postgres => {
                let db = self.config
                             .database
                             .clone()
                             .ok_or_else(|| AemError::config("Provision state store 'postgres' requires DATABASE_URL."))?;
                let pool = tokio::task::spawn_blocking(move || build_pool(&db.url, db.min_connections, db.max_connections))
                    .await
                    .map_err(|e| AemError::Internal(format!("pool task: {e}")))??;
                info!("provision state stored in postgres");
                Ok((Arc::new(PgEventStore::new(PoolProvider { pool: pool.clone() })),
                    Arc::new(PgStepStateStore::new(PoolProvider { pool }))))
            }
        }
    }

    pub async fn provisioner(&self, steps: Vec<Step>) -> Result<DynProvisioner, AemError> {
        let (events, states) = self.stores().await?;
        Provisioner::builder(events, states).sync(self.sync.clone())
                                            .notifier(self.notifier.clone())
                                            .parallelism(self.config.provision.parallelism)
                                            .steps(steps)
                                            .build()
    }

    pub async fn provision_plan(&self, plan: ProvisionPlan, filter: Option<&str>) -> Result<ProvisionSummary, AemError> {
        let steps = plan.into_steps(self.sync.clone());
        let provisioner = self.provisioner(steps).await?;
        provisioner.provision(&self.instances(filter)).await
    }

    pub fn resolver(&self) -> Result<FileResolver, AemError> {
        FileResolver::new(self.config.resolver.clone())
    }
}
