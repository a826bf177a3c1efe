use super::wallet::{Column, ColumnValue, Wallet};
use crate::error::Result;
use async_trait::async_trait;

/// Storage the orchestrator runs against.
///
/// Units of work opened on one ledger are isolated from each other: `begin`
/// waits until any unit already in flight is committed or dropped.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn begin(&self) -> Result<UnitOfWorkBox>;
    /// Provisions a row, replacing any existing row with the same id.
    async fn open_account(&self, wallet: Wallet) -> Result<()>;
    /// Every row, ordered by id.
    async fn all_wallets(&self) -> Result<Vec<Wallet>>;
}

/// Column-level access to the ledger inside one atomic unit.
///
/// Writes are staged and become visible to other units only on `commit`.
/// Dropping a unit without committing discards them.
#[async_trait]
pub trait UnitOfWork: Send {
    /// `Ok(None)` when the row exists but has no such column. An unknown id is
    /// `InvalidInput`.
    async fn read(&mut self, id: &str, column: Column) -> Result<Option<ColumnValue>>;
    async fn write(&mut self, id: &str, column: Column, value: ColumnValue) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
}

pub type LedgerBox = Box<dyn Ledger>;
pub type UnitOfWorkBox = Box<dyn UnitOfWork>;
