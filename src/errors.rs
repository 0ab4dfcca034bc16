//! Errores expuestos por la librería: el enum del core y los errores
//! internos de persistencia y descarga, que se convierten a `AemError`.
pub use aem_core::errors::{classify_error, AemError, ErrorClass};
pub use aem_persistence::PersistenceError;
pub use aem_resolver::DownloadError;
