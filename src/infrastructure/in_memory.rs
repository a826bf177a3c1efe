use crate::domain::ports::{Ledger, UnitOfWork, UnitOfWorkBox};
use crate::domain::wallet::{Column, ColumnValue, Wallet};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Row = BTreeMap<Column, ColumnValue>;
type Rows = BTreeMap<String, Row>;

/// A thread-safe in-memory ledger.
///
/// A unit of work holds the table lock from `begin` until it is committed or
/// dropped, so units run one at a time. Ideal for tests and for runs that do
/// not need persistence.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    rows: Arc<Mutex<Rows>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row with exactly the given columns.
    ///
    /// Lets callers provision rows that lack some columns.
    pub async fn insert_row(
        &self,
        id: &str,
        columns: impl IntoIterator<Item = (Column, ColumnValue)>,
    ) {
        let mut rows = self.rows.lock().await;
        rows.insert(id.to_string(), columns.into_iter().collect());
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        let rows = self.rows.clone().lock_owned().await;
        Ok(Box::new(InMemoryUnit {
            rows,
            staged: BTreeMap::new(),
        }))
    }

    async fn open_account(&self, wallet: Wallet) -> Result<()> {
        self.insert_row(&wallet.wallet_id, wallet.to_columns()).await;
        Ok(())
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        let rows = self.rows.lock().await;
        rows.iter()
            .map(|(id, row)| Wallet::from_columns(id, |column| row.get(&column).cloned()))
            .collect()
    }
}

/// Staged writes over a locked snapshot of the table.
pub struct InMemoryUnit {
    rows: OwnedMutexGuard<Rows>,
    staged: BTreeMap<(String, Column), ColumnValue>,
}

impl InMemoryUnit {
    fn row(&self, id: &str) -> Result<&Row> {
        self.rows
            .get(id)
            .ok_or_else(|| LedgerError::InvalidInput(format!("unknown wallet {id}")))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnit {
    async fn read(&mut self, id: &str, column: Column) -> Result<Option<ColumnValue>> {
        let row = self.row(id)?;
        if let Some(value) = self.staged.get(&(id.to_string(), column)) {
            return Ok(Some(value.clone()));
        }
        Ok(row.get(&column).cloned())
    }

    async fn write(&mut self, id: &str, column: Column, value: ColumnValue) -> Result<()> {
        self.row(id)?;
        self.staged.insert((id.to_string(), column), value);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnit { mut rows, staged } = *self;
        for ((id, column), value) in staged {
            if let Some(row) = rows.get_mut(&id) {
                row.insert(column, value);
            }
        }
        Ok(())
    }
}
