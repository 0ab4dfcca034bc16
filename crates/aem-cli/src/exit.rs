//! Códigos de salida del binario.

use aemflow_rust::AemError;

pub const OK: u8 = 0;
pub const FAILURE: u8 = 1;
pub const USAGE: u8 = 2;
pub const AWAIT_FAILED: u8 = 3;
pub const PROVISION_FAILED: u8 = 4;
pub const RESOLVE_FAILED: u8 = 5;

/// Código para un error que llegó hasta `main`.
pub fn code_for(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<AemError>() {
        Some(AemError::Configuration(_)) => USAGE,
        Some(AemError::AwaitTimeout { .. }) => AWAIT_FAILED,
        Some(AemError::ProvisioningStep { .. }) => PROVISION_FAILED,
        Some(AemError::Download { .. }) => RESOLVE_FAILED,
        _ => FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds() {
        assert_eq!(code_for(&AemError::config("bad").into()), USAGE);
        assert_eq!(code_for(&AemError::download("a.zip", "404").into()), RESOLVE_FAILED);
        assert_eq!(code_for(&AemError::AwaitTimeout { instances: vec![], elapsed_secs: 1 }.into()), AWAIT_FAILED);
        assert_eq!(code_for(&anyhow::anyhow!("boom")), FAILURE);
    }
}
