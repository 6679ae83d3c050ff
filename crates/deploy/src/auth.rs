//! Transaction authorization: deployer credentials and the per-account registry.

use std::collections::HashMap;

use alloy_core::primitives::{Address, keccak256};
use k256::ecdsa::SigningKey;

use crate::DeployError;

/// Credentials authorizing transactions from one account on one chain.
#[derive(Clone)]
pub struct TransactOpts {
    signing_key: SigningKey,
    from: Address,
    chain_id: u64,
    /// Optional per-transaction gas ceiling. `None` lets the backend use the block limit.
    pub gas_limit: Option<u64>,
}

impl std::fmt::Debug for TransactOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactOpts")
            .field("from", &self.from)
            .field("chain_id", &self.chain_id)
            .field("gas_limit", &self.gas_limit)
            .finish_non_exhaustive()
    }
}

impl TransactOpts {
    /// Create credentials from a signing key.
    pub fn new(signing_key: SigningKey, chain_id: u64) -> Self {
        let from = address_from_signing_key(&signing_key);
        Self {
            signing_key,
            from,
            chain_id,
            gas_limit: None,
        }
    }

    /// Create credentials from a 32-byte private key as hex (with or without 0x prefix).
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> Result<Self, DeployError> {
        let private_key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);

        let private_key_bytes: [u8; 32] = hex::decode(private_key_hex)
            .map_err(|e| DeployError::InvalidInput(format!("Private key is not valid hex: {e}")))?
            .try_into()
            .map_err(|_| DeployError::InvalidInput("Private key must be exactly 32 bytes".into()))?;

        let signing_key = SigningKey::from_bytes(&private_key_bytes.into()).map_err(|e| {
            DeployError::InvalidInput(format!("Invalid secp256k1 private key: {e}"))
        })?;

        Ok(Self::new(signing_key, chain_id))
    }

    /// Generate credentials for a fresh random account.
    pub fn random(chain_id: u64) -> Self {
        use rand::Rng;

        let mut rng = rand::rng();
        loop {
            let private_key_bytes: [u8; 32] = rng.random();
            // Zero and values above the curve order are the only rejected keys.
            if let Ok(signing_key) = SigningKey::from_bytes(&private_key_bytes.into()) {
                return Self::new(signing_key, chain_id);
            }
        }
    }

    /// Set a per-transaction gas ceiling.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// The account these credentials sign for.
    pub fn address(&self) -> Address {
        self.from
    }

    /// The chain these credentials sign for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The private key, hex-encoded without prefix.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

/// Derive the account address of a secp256k1 key: the last 20 bytes of the keccak hash of
/// the uncompressed public key without its 0x04 marker.
fn address_from_signing_key(signing_key: &SigningKey) -> Address {
    let public_key = signing_key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&public_key.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Per-account authorization registry, keyed by address.
#[derive(Debug, Clone)]
pub struct AuthRegistry {
    chain_id: u64,
    auths: HashMap<Address, TransactOpts>,
}

impl AuthRegistry {
    /// Create an empty registry accepting credentials for `chain_id`.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            auths: HashMap::new(),
        }
    }

    /// Register `opts`, replacing any credentials already held for the same address.
    pub fn add_or_replace(&mut self, opts: TransactOpts) -> Result<(), DeployError> {
        if opts.chain_id() != self.chain_id {
            return Err(DeployError::AuthorizationRegistrationFailed {
                address: opts.address(),
                reason: format!(
                    "credentials sign for chain {} but the backend runs chain {}",
                    opts.chain_id(),
                    self.chain_id
                ),
            });
        }

        let address = opts.address();
        if self.auths.insert(address, opts).is_some() {
            tracing::debug!(%address, "Replaced registered authorization");
        } else {
            tracing::debug!(%address, "Registered authorization");
        }
        Ok(())
    }

    /// The chain registered credentials must sign for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Credentials registered for `address`.
    pub fn get(&self, address: &Address) -> Option<&TransactOpts> {
        self.auths.get(address)
    }

    /// Addresses holding registered credentials.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.auths.keys()
    }

    pub fn len(&self) -> usize {
        self.auths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::address;

    const HARDHAT_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const HARDHAT_KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_address_from_private_key() {
        let opts = TransactOpts::from_private_key(HARDHAT_KEY_0, 1337).unwrap();
        assert_eq!(
            opts.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );

        let opts = TransactOpts::from_private_key(HARDHAT_KEY_1, 1337).unwrap();
        assert_eq!(
            opts.address(),
            address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );
    }

    #[test]
    fn test_invalid_private_keys() {
        assert!(TransactOpts::from_private_key("0x1234", 1337).is_err());
        assert!(TransactOpts::from_private_key("zz", 1337).is_err());
        assert!(TransactOpts::from_private_key(&"00".repeat(32), 1337).is_err());
    }

    #[test]
    fn test_private_key_hex_round_trip() {
        let opts = TransactOpts::random(1337);
        let restored = TransactOpts::from_private_key(&opts.private_key_hex(), 1337).unwrap();
        assert_eq!(opts.address(), restored.address());
    }

    #[test]
    fn test_debug_hides_key() {
        let opts = TransactOpts::from_private_key(HARDHAT_KEY_0, 1337).unwrap();
        let debug = format!("{opts:?}");
        assert!(!debug.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478"));
    }

    #[test]
    fn test_registry_add_or_replace() {
        let mut registry = AuthRegistry::new(1337);
        let opts = TransactOpts::from_private_key(HARDHAT_KEY_0, 1337).unwrap();
        let address = opts.address();

        registry.add_or_replace(opts.clone()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&address).unwrap().gas_limit, None);

        registry
            .add_or_replace(opts.with_gas_limit(5_000_000))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&address).unwrap().gas_limit, Some(5_000_000));
    }

    #[test]
    fn test_registry_rejects_foreign_chain() {
        let mut registry = AuthRegistry::new(1337);
        let opts = TransactOpts::from_private_key(HARDHAT_KEY_0, 1).unwrap();

        let result = registry.add_or_replace(opts);
        assert!(matches!(
            result,
            Err(DeployError::AuthorizationRegistrationFailed { .. })
        ));
        assert!(registry.is_empty());
    }
}
