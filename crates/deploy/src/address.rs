//! Contract-creation address derivation.
//!
//! A contract created by a plain `CREATE` transaction lands at the last 20 bytes of
//! `keccak256(rlp([sender, nonce]))`. Knowing the sender and the nonce a future create
//! transaction will use is therefore enough to know where the contract will live before it
//! exists, which is what lets mutually-referencing contracts be wired together at
//! construction time.

use std::str::FromStr;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::DeployError;

/// A contract address computed ahead of the create transaction that will produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictedAddress {
    /// The account sending the create transaction.
    pub sender: Address,
    /// The nonce the create transaction will be sent with.
    pub nonce: u64,
    /// The resulting contract address.
    pub address: Address,
}

impl PredictedAddress {
    /// Predict the address of the contract `sender` creates with `nonce`.
    pub fn new(sender: Address, nonce: u64) -> Result<Self, DeployError> {
        Ok(Self {
            sender,
            nonce,
            address: predict_create_address(sender, nonce)?,
        })
    }

    /// Predict the address of the contract `sender` creates `offset` transactions after `base`.
    pub fn at_offset(sender: Address, base: u64, offset: u64) -> Result<Self, DeployError> {
        let nonce = base.checked_add(offset).ok_or_else(|| {
            DeployError::InvalidInput(format!("nonce {base} + offset {offset} overflows"))
        })?;
        Self::new(sender, nonce)
    }
}

/// Compute the address of the contract created by `sender` at `nonce`.
///
/// Nonces are capped at `u64::MAX - 1` (EIP-2681), so `u64::MAX` is rejected.
pub fn predict_create_address(sender: Address, nonce: u64) -> Result<Address, DeployError> {
    if nonce == u64::MAX {
        return Err(DeployError::InvalidInput(format!(
            "nonce {nonce} exceeds the maximum account nonce"
        )));
    }

    Ok(sender.create(nonce))
}

/// Same as [`predict_create_address`] for a textual, 0x-prefixed sender address.
pub fn predict_create_address_str(sender: &str, nonce: u64) -> Result<Address, DeployError> {
    let sender = Address::from_str(sender)
        .map_err(|e| DeployError::InvalidInput(format!("invalid sender address '{sender}': {e}")))?;
    predict_create_address(sender, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::address;
    use std::collections::HashSet;

    const HARDHAT_DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn test_known_create_addresses() {
        let expected = [
            address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
            address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"),
            address!("Cf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9"),
            address!("Dc64a140Aa3E981100a9becA4E685f962f0cF6C9"),
            address!("5FC8d32690cc91D4c39d9d3abcBD16989F875707"),
        ];

        for (nonce, expected) in expected.into_iter().enumerate() {
            assert_eq!(
                predict_create_address(HARDHAT_DEPLOYER, nonce as u64).unwrap(),
                expected,
                "Wrong address for nonce {nonce}"
            );
        }
    }

    #[test]
    fn test_known_create_addresses_other_sender() {
        let sender = address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");

        assert_eq!(
            predict_create_address(sender, 0).unwrap(),
            address!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            predict_create_address(sender, 1).unwrap(),
            address!("343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
        assert_eq!(
            predict_create_address(sender, 2).unwrap(),
            address!("f778b86fa74e846c4f0a1fbd1335fe81c00a0c91")
        );
        assert_eq!(
            predict_create_address(sender, 3).unwrap(),
            address!("fffd933a0bc612844eaf0c6fe3e5b8e9b6c1d19c")
        );
    }

    #[test]
    fn test_prediction_is_deterministic() {
        for nonce in [0, 1, 127, 128, 255, 256, 1 << 32, u64::MAX - 1] {
            assert_eq!(
                predict_create_address(HARDHAT_DEPLOYER, nonce).unwrap(),
                predict_create_address(HARDHAT_DEPLOYER, nonce).unwrap()
            );
        }
    }

    #[test]
    fn test_no_collisions_across_nonces() {
        let addresses: HashSet<Address> = (0..2048)
            .map(|nonce| predict_create_address(HARDHAT_DEPLOYER, nonce).unwrap())
            .collect();

        assert_eq!(addresses.len(), 2048);
    }

    #[test]
    fn test_nonce_encoding_boundaries() {
        // Nonces around the single-byte and multi-byte RLP thresholds.
        let addresses: HashSet<Address> = [0, 1, 0x7f, 0x80, 0xff, 0x100, u64::MAX - 1]
            .into_iter()
            .map(|nonce| predict_create_address(HARDHAT_DEPLOYER, nonce).unwrap())
            .collect();

        assert_eq!(addresses.len(), 7);
    }

    #[test]
    fn test_max_nonce_is_rejected() {
        let result = predict_create_address(HARDHAT_DEPLOYER, u64::MAX);
        assert!(matches!(result, Err(DeployError::InvalidInput(_))));
    }

    #[test]
    fn test_offset_overflow_is_rejected() {
        let result = PredictedAddress::at_offset(HARDHAT_DEPLOYER, u64::MAX - 1, 2);
        assert!(matches!(result, Err(DeployError::InvalidInput(_))));
    }

    #[test]
    fn test_offset_prediction() {
        let predicted = PredictedAddress::at_offset(HARDHAT_DEPLOYER, 3, 2).unwrap();

        assert_eq!(predicted.nonce, 5);
        assert_eq!(predicted.sender, HARDHAT_DEPLOYER);
        assert_eq!(
            predicted.address,
            address!("5FC8d32690cc91D4c39d9d3abcBD16989F875707")
        );
    }

    #[test]
    fn test_textual_sender() {
        assert_eq!(
            predict_create_address_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266", 0).unwrap(),
            address!("5FbDB2315678afecb367f032d93F642f64180aa3")
        );
        assert!(matches!(
            predict_create_address_str("0x1234", 0),
            Err(DeployError::InvalidInput(_))
        ));
        assert!(matches!(
            predict_create_address_str("not an address", 0),
            Err(DeployError::InvalidInput(_))
        ));
    }
}
