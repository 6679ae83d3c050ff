//! Account nonce lookup.

use alloy_core::primitives::Address;

use crate::{DeployError, backend::ExecutionBackend};

/// Pending transaction count of `account`, i.e. the nonce its next transaction will carry.
pub fn current_nonce<B: ExecutionBackend>(backend: &B, account: Address) -> Result<u64, DeployError> {
    let nonce = backend
        .pending_nonce(account)
        .map_err(|e| DeployError::BackendUnavailable(e.to_string()))?;

    tracing::debug!(%account, nonce, "Queried pending nonce");
    Ok(nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        TransactOpts,
        artifacts::MOCK_VERIFIER,
        backend::{GenesisAlloc, SimulatedBackend},
    };
    use alloy_core::primitives::U256;

    #[test]
    fn test_nonce_tracks_pending_transactions() {
        let opts = TransactOpts::random(1337);
        let genesis = GenesisAlloc::from([(opts.address(), U256::from(10u64).pow(U256::from(20)))]);
        let mut backend = SimulatedBackend::new(genesis, 30_000_000, 1337);

        assert_eq!(current_nonce(&backend, opts.address()).unwrap(), 0);

        backend.deploy_contract(&opts, &MOCK_VERIFIER, &[]).unwrap();
        assert_eq!(current_nonce(&backend, opts.address()).unwrap(), 1);
    }

    #[test]
    fn test_unknown_account_starts_at_zero() {
        let backend = SimulatedBackend::new(GenesisAlloc::new(), 30_000_000, 1337);
        assert_eq!(current_nonce(&backend, Address::repeat_byte(0x42)).unwrap(), 0);
    }

    #[test]
    fn test_closed_backend() {
        let mut backend = SimulatedBackend::new(GenesisAlloc::new(), 30_000_000, 1337);
        backend.close();

        assert!(matches!(
            current_nonce(&backend, Address::ZERO),
            Err(DeployError::BackendUnavailable(_))
        ));
    }
}
