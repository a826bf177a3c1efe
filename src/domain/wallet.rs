use super::denomination::{BILLS_DESCENDING, CHIPS_DESCENDING, Category, Denomination};
use super::stack::DenominationStack;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest keypad entry the ATM accepts.
pub const MAX_ENTRY_LEN: usize = 9;

/// Entry shown on a freshly reset screen.
pub const EMPTY_ENTRY: &str = "0";

/// The screen an ATM is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    #[default]
    Insert,
    Home,
    Initiate,
    Confirm,
    Deposit,
    Balance,
    Activity,
}

impl DisplayState {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayState::Insert => "insert",
            DisplayState::Home => "home",
            DisplayState::Initiate => "initiate",
            DisplayState::Confirm => "confirm",
            DisplayState::Deposit => "deposit",
            DisplayState::Balance => "balance",
            DisplayState::Activity => "activity",
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayState {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(DisplayState::Insert),
            "home" => Ok(DisplayState::Home),
            "initiate" => Ok(DisplayState::Initiate),
            "confirm" => Ok(DisplayState::Confirm),
            "deposit" => Ok(DisplayState::Deposit),
            "balance" => Ok(DisplayState::Balance),
            "activity" => Ok(DisplayState::Activity),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown display state {other}"
            ))),
        }
    }
}

/// A named field of a wallet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Count(Denomination),
    DebitCard,
    AccountBalance,
    DisplayState,
    Entry,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Count(denomination) => denomination.column(),
            Column::DebitCard => "debit_card",
            Column::AccountBalance => "account_balance",
            Column::DisplayState => "display_state",
            Column::Entry => "entry",
        }
    }

    /// Every column of a fully provisioned row.
    pub fn all() -> impl Iterator<Item = Column> {
        BILLS_DESCENDING
            .into_iter()
            .chain(CHIPS_DESCENDING)
            .map(Column::Count)
            .chain([
                Column::DebitCard,
                Column::AccountBalance,
                Column::DisplayState,
                Column::Entry,
            ])
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw value stored in one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Count(u64),
    Flag(bool),
    Text(String),
}

impl ColumnValue {
    pub fn as_count(&self, column: Column) -> Result<u64> {
        match self {
            ColumnValue::Count(count) => Ok(*count),
            other => Err(Self::mismatch(column, other)),
        }
    }

    pub fn as_flag(&self, column: Column) -> Result<bool> {
        match self {
            ColumnValue::Flag(flag) => Ok(*flag),
            other => Err(Self::mismatch(column, other)),
        }
    }

    pub fn as_text(&self, column: Column) -> Result<&str> {
        match self {
            ColumnValue::Text(text) => Ok(text),
            other => Err(Self::mismatch(column, other)),
        }
    }

    fn mismatch(column: Column, value: &ColumnValue) -> LedgerError {
        LedgerError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("column {column} holds unexpected value {value:?}"),
        )))
    }
}

/// Parses a stored balance. Balances are kept as text and must round-trip exactly.
pub fn parse_balance(text: &str) -> Result<Decimal> {
    Decimal::from_str(text.trim())
        .map_err(|e| LedgerError::InvalidInput(format!("balance {text:?}: {e}")))
}

/// Parses a keypad entry as a monetary amount.
pub fn parse_entry(entry: &str) -> Result<Decimal> {
    if entry.is_empty()
        || entry.len() > MAX_ENTRY_LEN
        || !entry.chars().all(|c| c.is_ascii_digit())
    {
        return Err(LedgerError::InvalidInput(format!(
            "entry {entry:?} must be 1 to {MAX_ENTRY_LEN} digits"
        )));
    }
    Decimal::from_str(entry).map_err(|e| LedgerError::InvalidInput(format!("entry {entry:?}: {e}")))
}

/// A whole wallet row: held bills and chips, the account balance and the ATM screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: String,
    pub debit_card: bool,
    pub bills: DenominationStack,
    pub chips: DenominationStack,
    pub account_balance: Decimal,
    pub display_state: DisplayState,
    pub entry: String,
}

impl Wallet {
    pub fn new(wallet_id: impl Into<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            debit_card: true,
            bills: DenominationStack::new(),
            chips: DenominationStack::new(),
            account_balance: Decimal::ZERO,
            display_state: DisplayState::Insert,
            entry: EMPTY_ENTRY.to_string(),
        }
    }

    pub fn with_bills(mut self, bills: DenominationStack) -> Self {
        self.bills = bills;
        self
    }

    pub fn with_chips(mut self, chips: DenominationStack) -> Self {
        self.chips = chips;
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.account_balance = balance;
        self
    }

    /// Flattens the row into column writes.
    pub fn to_columns(&self) -> Vec<(Column, ColumnValue)> {
        Column::all()
            .map(|column| {
                let value = match column {
                    Column::Count(denomination) => ColumnValue::Count(
                        self.bills.count(denomination) + self.chips.count(denomination),
                    ),
                    Column::DebitCard => ColumnValue::Flag(self.debit_card),
                    Column::AccountBalance => ColumnValue::Text(self.account_balance.to_string()),
                    Column::DisplayState => {
                        ColumnValue::Text(self.display_state.as_str().to_string())
                    }
                    Column::Entry => ColumnValue::Text(self.entry.clone()),
                };
                (column, value)
            })
            .collect()
    }

    /// Rebuilds a row from column reads. Absent counts read as zero.
    pub fn from_columns<F>(wallet_id: &str, mut read: F) -> Result<Self>
    where
        F: FnMut(Column) -> Option<ColumnValue>,
    {
        let mut wallet = Wallet::new(wallet_id);
        for column in Column::all() {
            let Some(value) = read(column) else {
                continue;
            };
            match column {
                Column::Count(denomination) => {
                    let held =
                        DenominationStack::from_counts([(denomination, value.as_count(column)?)]);
                    match denomination.category() {
                        Category::Bill => wallet.bills = wallet.bills.add(&held),
                        Category::Chip => wallet.chips = wallet.chips.add(&held),
                    }
                }
                Column::DebitCard => wallet.debit_card = value.as_flag(column)?,
                Column::AccountBalance => {
                    wallet.account_balance = parse_balance(value.as_text(column)?)?
                }
                Column::DisplayState => wallet.display_state = value.as_text(column)?.parse()?,
                Column::Entry => wallet.entry = value.as_text(column)?.to_string(),
            }
        }
        Ok(wallet)
    }
}

/// What the ATM screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtmView {
    pub atm_id: String,
    pub display_state: DisplayState,
    pub entry: String,
}
