//! Subcomandos.

pub mod await_up;
pub mod provision;
pub mod resolve;
