//! Off-Chain Settlement Channel
//!
//! State progression for clearinghouse channels: a versioned, value-conserving
//! allocation per channel, a pure adjudicator for candidate states, the signed
//! transport to the clearinghouse, and the session manager tying them
//! together. Transport failures never block or undo matching; the channel
//! re-converges on the next trade batch.

pub mod adjudicator;
pub mod allocation;
pub mod session;
pub mod signer;
pub mod transport;

pub use adjudicator::{adjudicate, ChannelConfig, ChannelState, StateAllocation};
pub use allocation::{AllocationError, AllocationSnapshot, ChannelAllocation};
pub use session::{ChannelSession, SessionManager};
pub use signer::{BrokerSigner, StateSigner};
pub use transport::{ChannelTransport, ClearinghouseClient, CreateChannelRequest};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session is closed: {0}")]
    SessionClosed(String),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("clearinghouse transport: {0}")]
    Transport(String),
}
