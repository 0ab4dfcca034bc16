//! Constantes del núcleo.
//!
//! Agrupa los valores por defecto de await, provisioning y endpoints remotos.
//! Son la capa más baja de la configuración (default < entorno < explícito).
//! `ENGINE_VERSION` forma parte del fingerprint de cada step: cambiarla obliga
//! a re-ejecutar todos los steps con condición `Once`.

use std::time::Duration;

/// Versión lógica del provisioner incluida en el fingerprint de los steps.
pub const ENGINE_VERSION: &str = "P1.0";

/// Presupuesto total de tiempo para que las instancias queden estables.
pub const AWAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Espera entre ciclos de sondeo.
pub const AWAIT_DELAY: Duration = Duration::from_millis(1000);

/// Ventana durante la cual un evento OSGi reciente mantiene la instancia inestable.
pub const EVENTS_UNSTABLE_AGE: Duration = Duration::from_millis(5000);

pub const EVENTS_UNSTABLE_TOPICS: &[&str] = &["org/osgi/framework/ServiceEvent/*",
                                              "org/osgi/framework/FrameworkEvent/*",
                                              "org/osgi/framework/BundleEvent/*"];

pub const COMPONENTS_PLATFORM: &[&str] = &["com.day.crx.packaging.*", "org.apache.sling.installer.*"];

/// Límite de instancias procesadas en paralelo.
pub const PARALLELISM: usize = 4;

pub const BUNDLES_ENDPOINT: &str = "/system/console/bundles.json";
pub const EVENTS_ENDPOINT: &str = "/system/console/events.json";
pub const COMPONENTS_ENDPOINT: &str = "/system/console/components.json";

/// Nodo raíz bajo el cual se guarda el estado de los steps en la propia instancia.
pub const PROVISION_STATE_ROOT: &str = "/var/aemflow/provision/step";

pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
