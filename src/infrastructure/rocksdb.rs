use crate::domain::ports::{Ledger, UnitOfWork, UnitOfWorkBox};
use crate::domain::wallet::{Column, ColumnValue, Wallet};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Column Family listing every provisioned wallet id.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family holding one entry per `(wallet id, column)`.
pub const CF_COLUMNS: &str = "columns";

/// A persistent ledger backed by RocksDB.
///
/// Staged writes of a unit of work land in a single `WriteBatch`, so a commit is
/// all-or-nothing on disk. A process-local lock serializes units.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBLedger {
    db: Arc<DB>,
    gate: Arc<Mutex<()>>,
}

impl RocksDBLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_columns = ColumnFamilyDescriptor::new(CF_COLUMNS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_columns])?;

        Ok(Self {
            db: Arc::new(db),
            gate: Arc::new(Mutex::new(())),
        })
    }

    fn column_key(id: &str, column: Column) -> Vec<u8> {
        format!("{id}\u{0}{}", column.name()).into_bytes()
    }

    fn row_exists(db: &DB, id: &str) -> Result<bool> {
        let cf = cf_handle(db, CF_ACCOUNTS)?;
        Ok(db.get_pinned_cf(&cf, id.as_bytes())?.is_some())
    }

    fn read_column(db: &DB, id: &str, column: Column) -> Result<Option<ColumnValue>> {
        let cf = cf_handle(db, CF_COLUMNS)?;
        match db.get_cf(&cf, Self::column_key(id, column))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn cf_handle<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        LedgerError::Storage(Box::new(std::io::Error::other(format!(
            "{name} column family not found"
        ))))
    })
}

fn encode(value: &ColumnValue) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        LedgerError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode(bytes: &[u8]) -> Result<ColumnValue> {
    serde_json::from_slice(bytes).map_err(|e| {
        LedgerError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl Ledger for RocksDBLedger {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        let guard = self.gate.clone().lock_owned().await;
        Ok(Box::new(RocksDBUnit {
            db: self.db.clone(),
            _guard: guard,
            staged: BTreeMap::new(),
        }))
    }

    async fn open_account(&self, wallet: Wallet) -> Result<()> {
        let _guard = self.gate.lock().await;
        let accounts = cf_handle(&self.db, CF_ACCOUNTS)?;
        let columns = cf_handle(&self.db, CF_COLUMNS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&accounts, wallet.wallet_id.as_bytes(), b"");
        for (column, value) in wallet.to_columns() {
            batch.put_cf(
                &columns,
                Self::column_key(&wallet.wallet_id, column),
                encode(&value)?,
            );
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        let accounts = cf_handle(&self.db, CF_ACCOUNTS)?;

        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(&accounts, IteratorMode::Start) {
            let (key, _value) = item?;
            let id = String::from_utf8_lossy(&key).into_owned();

            let mut row = BTreeMap::new();
            for column in Column::all() {
                if let Some(value) = Self::read_column(&self.db, &id, column)? {
                    row.insert(column, value);
                }
            }
            wallets.push(Wallet::from_columns(&id, |column| row.get(&column).cloned())?);
        }
        Ok(wallets)
    }
}

pub struct RocksDBUnit {
    db: Arc<DB>,
    _guard: OwnedMutexGuard<()>,
    staged: BTreeMap<(String, Column), ColumnValue>,
}

impl RocksDBUnit {
    fn require_row(&self, id: &str) -> Result<()> {
        if RocksDBLedger::row_exists(&self.db, id)? {
            Ok(())
        } else {
            Err(LedgerError::InvalidInput(format!("unknown wallet {id}")))
        }
    }
}

#[async_trait]
impl UnitOfWork for RocksDBUnit {
    async fn read(&mut self, id: &str, column: Column) -> Result<Option<ColumnValue>> {
        self.require_row(id)?;
        if let Some(value) = self.staged.get(&(id.to_string(), column)) {
            return Ok(Some(value.clone()));
        }
        RocksDBLedger::read_column(&self.db, id, column)
    }

    async fn write(&mut self, id: &str, column: Column, value: ColumnValue) -> Result<()> {
        self.require_row(id)?;
        self.staged.insert((id.to_string(), column), value);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let columns = cf_handle(&self.db, CF_COLUMNS)?;
        let mut batch = WriteBatch::default();
        for ((id, column), value) in &self.staged {
            batch.put_cf(&columns, RocksDBLedger::column_key(id, *column), encode(value)?);
        }
        self.db.write(batch)?;
        Ok(())
    }
}
