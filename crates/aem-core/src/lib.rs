//! aem-core: await de instancias y provisioning idempotente.
pub mod await_up;
pub mod check;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod instance;
pub mod notify;
pub mod patterns;
pub mod plan;
pub mod repo;
pub mod repository;
pub mod step;
pub mod sync;

pub use await_up::{AwaitConfig, AwaitResult, AwaitState, AwaitStatus, AwaitUp, InstanceOutcome};
pub use check::{Check, CheckReport, CheckState};
pub use engine::{ProvisionSummary, Provisioner, ProvisionerBuilder, StepExecution};
pub use errors::AemError;
pub use event::{EventStore, InMemoryEventStore, ProvisionEvent, ProvisionEventKind};
pub use instance::{Credentials, Instance, InstanceKind, InstanceRegistry, Reachability};
pub use notify::{LogNotifier, LogProgress, NoopProgress, Notifier, ProgressReporter};
pub use plan::ProvisionPlan;
pub use repo::{FileStepStateRepository, InMemoryStepStateRepository, RemoteStepStateRepository, StepStateRepository};
pub use repository::{Node, Repository};
pub use step::{action_fn, Condition, ConditionContext, Step, StepAction, StepState, StepStates, StepStatus};
pub use sync::{InstanceSync, Method, SyncRequest, SyncResponse};
