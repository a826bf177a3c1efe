use super::wallet_reader::WALLET_ID_HEADER;
use crate::domain::wallet::{Column, ColumnValue, Wallet};
use crate::error::Result;
use std::io::Write;

/// Writes wallet rows as CSV, one column per ledger column.
///
/// The output is accepted back by [`super::wallet_reader::WalletReader`].
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets<I>(&mut self, wallets: I) -> Result<()>
    where
        I: IntoIterator<Item = Wallet>,
    {
        self.writer.write_record(
            std::iter::once(WALLET_ID_HEADER).chain(Column::all().map(Column::name)),
        )?;
        for wallet in wallets {
            let fields = wallet.to_columns().into_iter().map(|(_, value)| match value {
                ColumnValue::Count(count) => count.to_string(),
                ColumnValue::Flag(flag) => flag.to_string(),
                ColumnValue::Text(text) => text,
            });
            self.writer
                .write_record(std::iter::once(wallet.wallet_id.clone()).chain(fields))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
