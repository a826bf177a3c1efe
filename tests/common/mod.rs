use casino_wallet::application::orchestrator::TransactionOrchestrator;
use casino_wallet::domain::ports::Ledger;
use casino_wallet::domain::wallet::{DisplayState, Wallet};
use casino_wallet::infrastructure::in_memory::InMemoryLedger;

/// An orchestrator over a fresh in-memory ledger holding `wallets`.
pub async fn orchestrator_with(wallets: Vec<Wallet>) -> TransactionOrchestrator {
    let ledger = InMemoryLedger::new();
    for wallet in wallets {
        ledger.open_account(wallet).await.unwrap();
    }
    TransactionOrchestrator::new(Box::new(ledger))
}

pub fn on_screen(mut wallet: Wallet, state: DisplayState, entry: &str) -> Wallet {
    wallet.display_state = state;
    wallet.entry = entry.to_string();
    wallet
}

/// Parses stdout of the binary into one JSON value per line.
#[allow(dead_code)]
pub fn response_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
