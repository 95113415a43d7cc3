//! Transfer Intent - batch validation runner
//!
//! Replays a JSON scenario through the coordinator:
//!
//! ```text
//! ┌──────────┐    ┌─────────────┐    ┌──────────────┐    ┌──────────┐
//! │ Scenario │───▶│ Coordinator │───▶│ MemoryLedger │───▶│  Output  │
//! │  (JSON)  │    │ (validate)  │    │   (apply)    │    │ (JSONL)  │
//! └──────────┘    └─────────────┘    └──────────────┘    └──────────┘
//! ```

use anyhow::{Context, Result};
use tracing::{error, info};

use transfer_intent::batch_io::{DEFAULT_SCENARIO, load_scenario, outcome_json};
use transfer_intent::config::AppConfig;
use transfer_intent::core_types::BatchIndex;
use transfer_intent::logging::init_logging;
use transfer_intent::transfer::TransferCoordinator;

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1).cloned())
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn get_input() -> String {
    get_arg(&["--input", "-i"]).unwrap_or_else(|| DEFAULT_SCENARIO.to_string())
}

fn main() -> Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _guard = init_logging(&config);

    info!(
        env = %env,
        git_hash = env!("GIT_HASH"),
        "transfer_intent starting"
    );

    let input = get_input();
    let scenario = load_scenario(&input)?;
    let mut ledger = scenario.ledger()?;
    let coordinator = TransferCoordinator::new(config.validator.clone());

    for (batch_no, batch) in scenario.batches.iter().enumerate() {
        let result = match coordinator.validate(&ledger, batch) {
            Ok(result) => result,
            Err(e) => {
                error!(batch = batch_no, error = %e, "Batch refused");
                println!("{}", serde_json::json!({ "batch": batch_no, "error": e.to_string() }));
                continue;
            }
        };

        for (i, (transfer, outcome)) in batch.iter().zip(result.outcomes()).enumerate() {
            println!("{}", outcome_json(i as BatchIndex, transfer, outcome));
        }

        let applied = ledger
            .apply(&result)
            .with_context(|| format!("Failed to apply batch {}", batch_no))?;
        info!(
            batch = batch_no,
            applied = applied,
            rejected = result.len() - applied,
            "Batch applied"
        );
    }

    Ok(())
}
