//! Application layer orchestrating wallet and ATM operations.
//!
//! [`orchestrator::TransactionOrchestrator`] is the entry point. Each operation
//! opens one unit of work on the ledger, applies the domain rules and commits
//! only when every step succeeded.

pub mod orchestrator;
