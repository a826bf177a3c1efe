//! Domain layer: denominations, stacks, exchange rules and the ATM screen.
//!
//! Nothing in here touches storage; the ledger is reached only through the
//! traits in [`ports`].

pub mod atm;
pub mod combination;
pub mod denomination;
pub mod exchange;
pub mod ports;
pub mod stack;
pub mod wallet;
