//! aem-adapters: implementaciones concretas de los puertos del core.
//!
//! - `HttpInstanceSync`: canal de sincronización sobre la API HTTP de las
//!   instancias (reqwest, basic auth).

pub mod http_sync;

pub use http_sync::{HttpInstanceSync, SyncOptions};
