//! Settlement Adjudicator
//!
//! Pure validation of candidate channel states against a proof history. No
//! I/O, no clocks: the same inputs always produce the same verdict.

use serde::{Deserialize, Serialize};

/// Static parameters of one channel, fixed at open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub participants: Vec<String>,
    pub adjudicator: String,
}

/// One line of a state's allocation, amount as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAllocation {
    pub participant: String,
    pub amount: String,
}

/// A signed channel state as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelState {
    pub channel_id: String,
    pub version: u64,
    pub allocations: Vec<StateAllocation>,
    pub app_data: serde_json::Value,
    pub signatures: Vec<String>,
}

impl ChannelState {
    /// Sum of the allocation amounts, or `None` if any amount fails to parse.
    pub fn total(&self) -> Option<i64> {
        self.allocations
            .iter()
            .map(|a| a.amount.parse::<i64>().ok())
            .sum()
    }
}

/// Decide whether `candidate` is admissible given the channel parameters and
/// the proof history.
///
/// Rules:
/// 1. Against the last proof (if any), the candidate's version must be
///    strictly greater and its allocation total unchanged.
/// 2. The candidate must carry exactly one signature per declared participant.
/// 3. With no proofs, any candidate satisfying (2) is accepted.
pub fn adjudicate(
    config: &ChannelConfig,
    candidate: &ChannelState,
    proofs: &[ChannelState],
) -> bool {
    if let Some(last) = proofs.last() {
        if candidate.version <= last.version {
            return false;
        }
        match (candidate.total(), last.total()) {
            (Some(candidate_total), Some(proof_total)) if candidate_total == proof_total => {}
            _ => return false,
        }
    }

    candidate.signatures.len() == config.participants.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChannelConfig {
        ChannelConfig {
            channel_id: "ch-1".to_string(),
            participants: vec!["a".to_string(), "b".to_string()],
            adjudicator: "0xadjudicator".to_string(),
        }
    }

    fn state(version: u64, amounts: &[(&str, i64)], signatures: usize) -> ChannelState {
        ChannelState {
            channel_id: "ch-1".to_string(),
            version,
            allocations: amounts
                .iter()
                .map(|(participant, amount)| StateAllocation {
                    participant: participant.to_string(),
                    amount: amount.to_string(),
                })
                .collect(),
            app_data: serde_json::Value::Null,
            signatures: (0..signatures).map(|i| format!("0xsig{i}")).collect(),
        }
    }

    #[test]
    fn accepts_first_state_with_full_signatures() {
        let candidate = state(1, &[("a", 100), ("b", 100)], 2);
        assert!(adjudicate(&config(), &candidate, &[]));
    }

    #[test]
    fn rejects_wrong_signature_count() {
        let candidate = state(1, &[("a", 100), ("b", 100)], 1);
        assert!(!adjudicate(&config(), &candidate, &[]));

        let candidate = state(1, &[("a", 100), ("b", 100)], 3);
        assert!(!adjudicate(&config(), &candidate, &[]));
    }

    #[test]
    fn rejects_stale_version_against_proof() {
        let proofs = vec![state(2, &[("a", 80), ("b", 120)], 2)];

        // Same version as the proof: rejected (scenario S6).
        let candidate = state(2, &[("a", 60), ("b", 140)], 2);
        assert!(!adjudicate(&config(), &candidate, &proofs));

        let candidate = state(1, &[("a", 60), ("b", 140)], 2);
        assert!(!adjudicate(&config(), &candidate, &proofs));

        let candidate = state(3, &[("a", 60), ("b", 140)], 2);
        assert!(adjudicate(&config(), &candidate, &proofs));
    }

    #[test]
    fn rejects_total_drift() {
        let proofs = vec![state(1, &[("a", 100), ("b", 100)], 2)];
        let candidate = state(2, &[("a", 100), ("b", 101)], 2);
        assert!(!adjudicate(&config(), &candidate, &proofs));
    }

    #[test]
    fn rejects_unparsable_amounts() {
        let proofs = vec![state(1, &[("a", 100), ("b", 100)], 2)];
        let mut candidate = state(2, &[("a", 100), ("b", 100)], 2);
        candidate.allocations[0].amount = "not-a-number".to_string();
        assert!(!adjudicate(&config(), &candidate, &proofs));
    }

    #[test]
    fn only_last_proof_matters() {
        let proofs = vec![
            state(5, &[("a", 100), ("b", 100)], 2),
            state(2, &[("a", 80), ("b", 120)], 2),
        ];
        // Version 3 beats the last proof (2) even though an earlier proof had 5.
        let candidate = state(3, &[("a", 60), ("b", 140)], 2);
        assert!(adjudicate(&config(), &candidate, &proofs));
    }
}
