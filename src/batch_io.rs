//! Batch I/O - Load scenarios from JSON files
//!
//! A scenario seeds a `MemoryLedger` with accounts and pending
//! transfers, then lists the batches to submit in order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core_types::{AccountId, BatchIndex};
use crate::transfer::{AccountBalance, MemoryLedger, Outcome, PendingTransfer, Transfer};

pub const DEFAULT_SCENARIO: &str = "fixtures/scenario.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub id: AccountId,
    #[serde(flatten)]
    pub balance: AccountBalance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
    #[serde(default)]
    pub pending: Vec<PendingTransfer>,
    #[serde(default)]
    pub batches: Vec<Vec<Transfer>>,
}

impl Scenario {
    /// Build the starting ledger
    pub fn ledger(&self) -> Result<MemoryLedger> {
        let mut ledger = MemoryLedger::new();
        for seed in &self.accounts {
            ledger
                .create_account(seed.id, seed.balance)
                .with_context(|| format!("Invalid account seed {}", seed.id))?;
        }
        for pending in &self.pending {
            ledger
                .insert_pending(pending.clone())
                .with_context(|| format!("Invalid pending seed {}", pending.id))?;
        }
        Ok(ledger)
    }
}

pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    parse_scenario(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_scenario(content: &str) -> Result<Scenario> {
    Ok(serde_json::from_str(content)?)
}

/// One line of output per transfer, keyed by its position in the batch
pub fn outcome_json(
    index: BatchIndex,
    transfer: &Transfer,
    outcome: &Outcome,
) -> serde_json::Value {
    match outcome {
        Outcome::Accept(intent) => serde_json::json!({
            "index": index,
            "id": transfer.id,
            "result": "ok",
            "intent": intent,
        }),
        Outcome::Reject(reason) => serde_json::json!({
            "index": index,
            "id": transfer.id,
            "result": reason.as_str(),
            "code": reason.code(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{RejectReason, TransferCoordinator};

    const SCENARIO: &str = r#"{
        "accounts": [
            {"id": 1, "available": 1000},
            {"id": 2, "available": 0, "credit_capacity": 50}
        ],
        "pending": [
            {"id": 100, "debit_account_id": 1, "credit_account_id": 2, "amount": 40}
        ],
        "batches": [
            [{"id": 1, "debit_account_id": 1, "credit_account_id": 2, "amount": 5, "flags": 1},
             {"id": 2, "pending_id": 100, "flags": 4}]
        ]
    }"#;

    #[test]
    fn test_parse_and_seed() {
        let scenario = parse_scenario(SCENARIO).unwrap();
        assert_eq!(scenario.accounts.len(), 2);
        assert_eq!(scenario.batches[0].len(), 2);

        let ledger = scenario.ledger().unwrap();
        let alice = ledger.balance(1).unwrap();
        assert_eq!((alice.available, alice.reserved), (960, 40));
        assert_eq!(ledger.balance(2).unwrap().credit_capacity, Some(10));
    }

    #[test]
    fn test_duplicate_account_seed() {
        let scenario = Scenario {
            accounts: vec![
                AccountSeed {
                    id: 1,
                    balance: AccountBalance::new(0),
                },
                AccountSeed {
                    id: 1,
                    balance: AccountBalance::new(0),
                },
            ],
            ..Default::default()
        };
        let err = scenario.ledger().unwrap_err();
        assert!(err.to_string().contains("Invalid account seed 1"));
    }

    #[test]
    fn test_outcome_json() {
        let transfer = Transfer::new(7, 1, 2, 5);
        let value = outcome_json(
            3,
            &transfer,
            &Outcome::Reject(RejectReason::InsufficientBalance),
        );
        assert_eq!(value["index"], 3);
        assert_eq!(value["result"], "INSUFFICIENT_BALANCE");
        assert_eq!(value["code"], 17);
    }

    #[test]
    fn test_unknown_flag_bits_rejected_per_transfer() {
        let scenario = parse_scenario(
            r#"{
                "accounts": [{"id": 1, "available": 100}, {"id": 2, "available": 0}],
                "batches": [
                    [{"id": 1, "debit_account_id": 1, "credit_account_id": 2, "amount": 5, "flags": 65536},
                     {"id": 2, "debit_account_id": 1, "credit_account_id": 2, "amount": 5}]
                ]
            }"#,
        )
        .unwrap();
        let ledger = scenario.ledger().unwrap();
        let batch = &scenario.batches[0];
        let result = TransferCoordinator::default()
            .validate(&ledger, batch)
            .unwrap();

        assert_eq!(result.outcomes()[0].reason(), Some(RejectReason::InvalidFlags));
        assert!(result.outcomes()[1].is_accept());

        let lines: Vec<_> = batch
            .iter()
            .zip(result.outcomes())
            .enumerate()
            .map(|(i, (transfer, outcome))| outcome_json(i as BatchIndex, transfer, outcome))
            .collect();
        assert_eq!(lines[0]["index"], 0);
        assert_eq!(lines[0]["result"], "INVALID_FLAGS");
        assert_eq!(lines[1]["index"], 1);
        assert_eq!(lines[1]["result"], "ok");
    }

    #[test]
    fn test_missing_file() {
        assert!(load_scenario("fixtures/missing.json").is_err());
    }
}
