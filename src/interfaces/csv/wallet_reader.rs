use crate::domain::wallet::{Column, ColumnValue, Wallet};
use crate::error::{LedgerError, Result};
use std::collections::BTreeMap;
use std::io::Read;

/// Header naming the row id in wallet CSV files.
pub const WALLET_ID_HEADER: &str = "wallet_id";

/// Reads seed wallets from a CSV source.
///
/// Headers are matched against the ledger column names (`ones`, `chip_fives`,
/// `account_balance`, ...). Columns missing from the file keep their defaults.
pub struct WalletReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> WalletReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses one wallet per record.
    pub fn wallets(mut self) -> Result<impl Iterator<Item = Result<Wallet>>> {
        let headers = self.reader.headers()?.clone();
        let id_index = headers
            .iter()
            .position(|h| h == WALLET_ID_HEADER)
            .ok_or_else(|| {
                LedgerError::InvalidInput(format!("missing {WALLET_ID_HEADER} header"))
            })?;
        let columns: Vec<Option<Column>> = headers
            .iter()
            .map(|h| Column::all().find(|c| c.name() == h))
            .collect();

        Ok(self.reader.into_records().map(move |record| -> Result<Wallet> {
            let record = record?;
            let id = record
                .get(id_index)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| LedgerError::InvalidInput("record without wallet_id".to_string()))?;

            let mut row = BTreeMap::new();
            for (field, column) in record.iter().zip(&columns) {
                if let Some(column) = column
                    && !field.is_empty()
                {
                    row.insert(*column, parse_field(*column, field)?);
                }
            }
            Wallet::from_columns(id, |column| row.remove(&column))
        }))
    }
}

fn parse_field(column: Column, field: &str) -> Result<ColumnValue> {
    match column {
        Column::Count(_) => field
            .parse()
            .map(ColumnValue::Count)
            .map_err(|e| invalid_field(column, field, e)),
        Column::DebitCard => field
            .parse()
            .map(ColumnValue::Flag)
            .map_err(|e| invalid_field(column, field, e)),
        Column::AccountBalance | Column::DisplayState | Column::Entry => {
            Ok(ColumnValue::Text(field.to_string()))
        }
    }
}

fn invalid_field(column: Column, field: &str, err: impl std::fmt::Display) -> LedgerError {
    LedgerError::InvalidInput(format!("{column} {field:?}: {err}"))
}
