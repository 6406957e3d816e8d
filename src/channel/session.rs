//! Channel Session Manager
//!
//! One session per open clearinghouse channel: the latest allocation, the
//! latest app-data blob, and the history of transmitted states. A tokio mutex
//! serializes updates so at most one is in flight per session; the version is
//! rolled back when the transport fails so the next attempt reuses it.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::services::matching::Trade;

use super::adjudicator::{ChannelConfig, ChannelState, StateAllocation};
use super::allocation::ChannelAllocation;
use super::signer::{state_digest, StateSigner};
use super::transport::{ChannelTransport, CreateChannelRequest};
use super::ChannelError;

struct SessionState {
    allocation: ChannelAllocation,
    app_data: serde_json::Value,
    active: bool,
    /// Transmitted states, oldest first. This is the proof history the
    /// adjudicator consumes on dispute.
    proofs: Vec<ChannelState>,
}

pub struct ChannelSession {
    channel_id: String,
    participants: Vec<String>,
    transport: Arc<dyn ChannelTransport>,
    signer: Arc<dyn StateSigner>,
    adjudicator: String,
    state: Mutex<SessionState>,
}

impl ChannelSession {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn config(&self) -> ChannelConfig {
        ChannelConfig {
            channel_id: self.channel_id.clone(),
            participants: self.participants.clone(),
            adjudicator: self.adjudicator.clone(),
        }
    }

    pub async fn version(&self) -> u64 {
        self.state.lock().await.allocation.version()
    }

    fn build_state(
        &self,
        allocation: &ChannelAllocation,
        app_data: serde_json::Value,
    ) -> Result<ChannelState, ChannelError> {
        let snapshot = allocation.snapshot();
        let allocations: Vec<StateAllocation> = snapshot
            .balances
            .into_iter()
            .map(|(participant, amount)| StateAllocation {
                participant,
                amount,
            })
            .collect();

        let digest = state_digest(&self.channel_id, snapshot.version, &allocations);
        let signature = self.signer.sign_digest(digest)?;

        Ok(ChannelState {
            channel_id: self.channel_id.clone(),
            version: snapshot.version,
            allocations,
            app_data,
            signatures: vec![signature],
        })
    }

    /// Bump the version by one and transmit the current allocation. Used for
    /// the opening update and any out-of-band refresh.
    pub async fn push_update(&self, app_data: serde_json::Value) -> Result<u64, ChannelError> {
        let mut state = self.state.lock().await;
        if !state.active {
            return Err(ChannelError::SessionClosed(self.channel_id.clone()));
        }

        let previous = state.allocation.version();
        state.allocation.set_version(previous + 1);

        let wire = self.build_state(&state.allocation, app_data.clone())?;
        match self.transport.update_channel(&wire).await {
            Ok(()) => {
                state.app_data = app_data;
                state.proofs.push(wire);
                Ok(previous + 1)
            }
            Err(e) => {
                state.allocation.set_version(previous);
                Err(e)
            }
        }
    }

    /// Mirror a batch of matched trades into the allocation and transmit the
    /// resulting state. Trades whose parties are not channel participants are
    /// skipped. On transport failure the version rolls back to the pre-batch
    /// value; the amounts are kept and re-transmitted with the next batch.
    pub async fn sync_trades(
        &self,
        trades: &[Trade],
        app_data: serde_json::Value,
    ) -> Result<u64, ChannelError> {
        let mut state = self.state.lock().await;
        if !state.active {
            return Err(ChannelError::SessionClosed(self.channel_id.clone()));
        }

        let previous = state.allocation.version();
        for trade in trades {
            if !state.allocation.contains(&trade.buyer) || !state.allocation.contains(&trade.seller)
            {
                continue;
            }
            if let Err(e) =
                state
                    .allocation
                    .apply_trade(&trade.buyer, &trade.seller, trade.price, trade.quantity)
            {
                warn!(channel_id = %self.channel_id, trade_id = %trade.id, error = %e,
                    "trade not mirrored into channel");
            }
        }
        if state.allocation.version() == previous {
            // Nothing applied; no state to transmit.
            return Ok(previous);
        }

        let wire = self.build_state(&state.allocation, app_data.clone())?;
        match self.transport.update_channel(&wire).await {
            Ok(()) => {
                let version = state.allocation.version();
                state.app_data = app_data;
                state.proofs.push(wire);
                Ok(version)
            }
            Err(e) => {
                state.allocation.set_version(previous);
                Err(e)
            }
        }
    }

    /// Transmit a close request with the final allocation and mark the
    /// session inactive. Further updates fail with `SessionClosed`.
    pub async fn close(&self) -> Result<(), ChannelError> {
        let mut state = self.state.lock().await;
        if !state.active {
            return Err(ChannelError::SessionClosed(self.channel_id.clone()));
        }

        let wire = self.build_state(&state.allocation, state.app_data.clone())?;
        self.transport.close_channel(&wire).await?;
        state.active = false;
        info!(channel_id = %self.channel_id, version = wire.version, "channel closed");
        Ok(())
    }

    /// Latest transmitted state plus the proofs that precede it, for dispute
    /// adjudication.
    pub async fn dispute_material(&self) -> Option<(ChannelState, Vec<ChannelState>)> {
        let state = self.state.lock().await;
        let (candidate, proofs) = state.proofs.split_last()?;
        Some((candidate.clone(), proofs.to_vec()))
    }
}

pub struct SessionManager {
    transport: Arc<dyn ChannelTransport>,
    signer: Arc<dyn StateSigner>,
    adjudicator: String,
    sessions: DashMap<String, Arc<ChannelSession>>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        signer: Arc<dyn StateSigner>,
        adjudicator: String,
    ) -> Self {
        Self {
            transport,
            signer,
            adjudicator,
            sessions: DashMap::new(),
        }
    }

    /// Open a channel with the clearinghouse and register the session. The
    /// opening allocation is transmitted as version 1 right after create; a
    /// failure there is logged and retried with the next trade batch.
    pub async fn create(
        &self,
        participants: Vec<String>,
        initial_allocations: HashMap<String, i64>,
    ) -> Result<Arc<ChannelSession>, ChannelError> {
        let allocation = ChannelAllocation::new(initial_allocations);
        let request = CreateChannelRequest {
            participants: participants.clone(),
            allocation: allocation.snapshot(),
            adjudicator: self.adjudicator.clone(),
            broker: self.signer.address(),
            signature: {
                let snapshot = allocation.snapshot();
                let allocations: Vec<StateAllocation> = snapshot
                    .balances
                    .into_iter()
                    .map(|(participant, amount)| StateAllocation {
                        participant,
                        amount,
                    })
                    .collect();
                self.signer
                    .sign_digest(state_digest("", snapshot.version, &allocations))?
            },
        };

        let channel_id = self.transport.create_channel(&request).await?;
        info!(%channel_id, participants = participants.len(), "channel session created");

        let session = Arc::new(ChannelSession {
            channel_id: channel_id.clone(),
            participants,
            transport: Arc::clone(&self.transport),
            signer: Arc::clone(&self.signer),
            adjudicator: self.adjudicator.clone(),
            state: Mutex::new(SessionState {
                allocation,
                app_data: serde_json::Value::Null,
                active: true,
                proofs: Vec::new(),
            }),
        });
        self.sessions.insert(channel_id.clone(), Arc::clone(&session));

        if let Err(e) = session.push_update(serde_json::Value::Null).await {
            warn!(%channel_id, error = %e, "opening channel update failed, will retry on next trade");
        }

        Ok(session)
    }

    pub fn get(&self, channel_id: &str) -> Option<Arc<ChannelSession>> {
        self.sessions.get(channel_id).map(|s| Arc::clone(&s))
    }

    /// Close a session and drop it from the registry.
    pub async fn close(&self, channel_id: &str) -> Result<(), ChannelError> {
        let session = self
            .get(channel_id)
            .ok_or_else(|| ChannelError::SessionNotFound(channel_id.to_string()))?;
        session.close().await?;
        self.sessions.remove(channel_id);
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    use crate::services::matching::Outcome;

    struct StubSigner;

    impl StateSigner for StubSigner {
        fn sign_digest(&self, _digest: [u8; 32]) -> Result<String, ChannelError> {
            Ok("0xstub".to_string())
        }

        fn address(&self) -> String {
            "0xbroker".to_string()
        }
    }

    #[derive(Default)]
    struct StubTransport {
        fail_updates: AtomicBool,
        updates: SyncMutex<Vec<ChannelState>>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl ChannelTransport for StubTransport {
        async fn create_channel(
            &self,
            _request: &CreateChannelRequest,
        ) -> Result<String, ChannelError> {
            Ok("ch-test".to_string())
        }

        async fn update_channel(&self, state: &ChannelState) -> Result<(), ChannelError> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(ChannelError::Transport("stubbed failure".to_string()));
            }
            self.updates.lock().push(state.clone());
            Ok(())
        }

        async fn close_channel(&self, _state: &ChannelState) -> Result<(), ChannelError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manager(transport: Arc<StubTransport>) -> SessionManager {
        SessionManager::new(transport, Arc::new(StubSigner), "0xadjudicator".to_string())
    }

    fn trade(buyer: &str, seller: &str, price: i64, quantity: i64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            market_id: Uuid::new_v4(),
            outcome: Outcome::Yes,
            buy_order_id: Uuid::new_v4(),
            sell_order_id: Uuid::new_v4(),
            buyer: buyer.to_string(),
            seller: seller.to_string(),
            price,
            quantity,
            timestamp: 0,
        }
    }

    fn initial() -> HashMap<String, i64> {
        HashMap::from([("a".to_string(), 100), ("b".to_string(), 100)])
    }

    #[tokio::test]
    async fn trade_batches_progress_versions_and_conserve_total() {
        let transport = Arc::new(StubTransport::default());
        let manager = manager(Arc::clone(&transport));

        let session = manager
            .create(vec!["a".to_string(), "b".to_string()], initial())
            .await
            .unwrap();
        // Opening update is version 1.
        assert_eq!(session.version().await, 1);

        let v = session
            .sync_trades(&[trade("a", "b", 2_000, 100)], serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(v, 2);
        let v = session
            .sync_trades(&[trade("a", "b", 2_000, 100)], serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(v, 3);

        let updates = transport.updates.lock();
        assert_eq!(updates.len(), 3);
        for state in updates.iter() {
            assert_eq!(state.total(), Some(200));
        }
        assert_eq!(updates[1].version, 2);
        assert_eq!(updates[2].version, 3);
    }

    #[tokio::test]
    async fn transport_failure_rolls_back_version() {
        let transport = Arc::new(StubTransport::default());
        let manager = manager(Arc::clone(&transport));
        let session = manager
            .create(vec!["a".to_string(), "b".to_string()], initial())
            .await
            .unwrap();

        transport.fail_updates.store(true, Ordering::SeqCst);
        let err = session
            .sync_trades(&[trade("a", "b", 2_000, 100)], serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
        assert_eq!(session.version().await, 1);

        // Next batch re-converges: versions continue from the rolled-back
        // value and the balances include both batches.
        transport.fail_updates.store(false, Ordering::SeqCst);
        let v = session
            .sync_trades(&[trade("a", "b", 1_000, 100)], serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(v, 2);

        let updates = transport.updates.lock();
        let last = updates.last().unwrap();
        let a = last
            .allocations
            .iter()
            .find(|x| x.participant == "a")
            .unwrap();
        // 100 - 20 (failed batch, amounts kept) - 10 = 70.
        assert_eq!(a.amount, "70");
    }

    #[tokio::test]
    async fn trades_from_non_participants_are_skipped() {
        let transport = Arc::new(StubTransport::default());
        let manager = manager(Arc::clone(&transport));
        let session = manager
            .create(vec!["a".to_string(), "b".to_string()], initial())
            .await
            .unwrap();

        let v = session
            .sync_trades(&[trade("mallory", "b", 2_000, 100)], serde_json::Value::Null)
            .await
            .unwrap();
        // Nothing applied, nothing transmitted.
        assert_eq!(v, 1);
        assert_eq!(transport.updates.lock().len(), 1);
    }

    #[tokio::test]
    async fn closed_session_rejects_updates() {
        let transport = Arc::new(StubTransport::default());
        let manager = manager(Arc::clone(&transport));
        let session = manager
            .create(vec!["a".to_string(), "b".to_string()], initial())
            .await
            .unwrap();

        manager.close("ch-test").await.unwrap();
        assert!(transport.closed.load(Ordering::SeqCst));
        assert!(manager.get("ch-test").is_none());

        let err = session
            .sync_trades(&[trade("a", "b", 2_000, 100)], serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::SessionClosed(_)));
    }

    #[tokio::test]
    async fn dispute_material_splits_latest_from_history() {
        let transport = Arc::new(StubTransport::default());
        let manager = manager(Arc::clone(&transport));
        let session = manager
            .create(vec!["a".to_string(), "b".to_string()], initial())
            .await
            .unwrap();
        session
            .sync_trades(&[trade("a", "b", 2_000, 100)], serde_json::Value::Null)
            .await
            .unwrap();

        let (candidate, proofs) = session.dispute_material().await.unwrap();
        assert_eq!(candidate.version, 2);
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].version, 1);
    }
}
