//! State signing.
//!
//! The matching core never verifies signatures; it only needs something that
//! turns a state digest into a signature the clearinghouse will accept. That
//! collaborator is the `StateSigner` trait, implemented in production by the
//! broker's wallet key.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::H256;
use sha3::{Digest, Keccak256};

use super::adjudicator::StateAllocation;
use super::ChannelError;

pub trait StateSigner: Send + Sync {
    /// Sign a 32-byte digest, returning a 0x-prefixed hex signature.
    fn sign_digest(&self, digest: [u8; 32]) -> Result<String, ChannelError>;

    /// The signer's address, 0x-prefixed hex.
    fn address(&self) -> String;
}

/// Keccak digest of the signed portion of a channel state. The allocation
/// slice must already be in deterministic (participant) order.
pub fn state_digest(channel_id: &str, version: u64, allocations: &[StateAllocation]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(channel_id.as_bytes());
    hasher.update(version.to_be_bytes());
    for allocation in allocations {
        hasher.update(allocation.participant.as_bytes());
        hasher.update(allocation.amount.as_bytes());
    }
    hasher.finalize().into()
}

/// Production signer backed by the broker's private key.
pub struct BrokerSigner {
    wallet: LocalWallet,
}

impl BrokerSigner {
    pub fn from_hex_key(hex_key: &str) -> anyhow::Result<Self> {
        let raw = hex::decode(hex_key.trim_start_matches("0x"))?;
        let wallet = LocalWallet::from_bytes(&raw)?;
        Ok(Self { wallet })
    }
}

impl StateSigner for BrokerSigner {
    fn sign_digest(&self, digest: [u8; 32]) -> Result<String, ChannelError> {
        let signature = self
            .wallet
            .sign_hash(H256::from(digest))
            .map_err(|e| ChannelError::Signer(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }

    fn address(&self) -> String {
        format!("0x{}", hex::encode(self.wallet.address().as_bytes()))
    }
}
