//! Steps de provisioning.
//!
//! Un `Step` declara una acción idempotente sobre una instancia: `id`,
//! `version` (string libre del usuario), `condition` y `continue_on_fail`.
//! El fingerprint combina versión del motor, id y versión: si cambia, un
//! step `Once` vuelve a ser debido.

mod condition;
mod definition;
mod state;
mod status;

pub use condition::{Condition, ConditionContext};
pub use definition::{action_fn, FnAction, Step, StepAction};
pub use state::{StepState, StepStates};
pub use status::StepStatus;
