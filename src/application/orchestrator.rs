use crate::domain::atm::{self, Effect, KeyInput};
use crate::domain::denomination::{BILLS_DESCENDING, Category, Denomination};
use crate::domain::exchange::{ExchangeKind, ExchangeRule};
use crate::domain::ports::{Ledger, LedgerBox, UnitOfWork, UnitOfWorkBox};
use crate::domain::stack::DenominationStack;
use crate::domain::wallet::{
    AtmView, Column, ColumnValue, DisplayState, Wallet, parse_balance, parse_entry,
};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Flat fee charged on every ATM withdrawal.
pub const WITHDRAWAL_FEE: Decimal = dec!(3);

/// Which way money moves through the ATM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown transaction type {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeReceipt {
    pub kind: ExchangeKind,
    pub rule: ExchangeRule,
    pub given_remaining: u64,
    pub received_total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReceipt {
    pub amount: Decimal,
    /// Bills taken out of the wallet.
    pub bills: DenominationStack,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalReceipt {
    pub amount: Decimal,
    pub fee: Decimal,
    /// Bills dispensed into the wallet.
    pub bills: DenominationStack,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionReceipt {
    Deposit(DepositReceipt),
    Withdrawal(WithdrawalReceipt),
}

/// Screen after a key press, plus the transaction it completed, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeypadOutcome {
    pub atm: AtmView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionReceipt>,
}

/// Runs every wallet and ATM operation as one unit of work on the ledger.
///
/// An operation either commits all of its writes or, when it fails, none of
/// them. The ATM id addresses the same row as the wallet id.
pub struct TransactionOrchestrator {
    ledger: LedgerBox,
}

impl TransactionOrchestrator {
    pub fn new(ledger: LedgerBox) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    /// Trades one bill for its chip equivalent.
    pub async fn exchange_bills(
        &self,
        wallet_id: &str,
        bill: Denomination,
    ) -> Result<ExchangeReceipt> {
        let rule = ExchangeRule::bills_to_chips(bill);
        self.run_exchange(wallet_id, ExchangeKind::BillsToChips, rule).await
    }

    /// Trades chips back for one bill of the given denomination.
    pub async fn exchange_chips(
        &self,
        wallet_id: &str,
        bill: Denomination,
    ) -> Result<ExchangeReceipt> {
        let rule = ExchangeRule::chips_to_bills(bill);
        self.run_exchange(wallet_id, ExchangeKind::ChipsToBills, rule).await
    }

    pub async fn change_chips(
        &self,
        wallet_id: &str,
        given: Denomination,
        received: Denomination,
    ) -> Result<ExchangeReceipt> {
        let rule = ExchangeRule::change_chips(given, received);
        self.run_exchange(wallet_id, ExchangeKind::ChipChange, rule).await
    }

    /// Breaks one bill into smaller bills.
    pub async fn break_bills(
        &self,
        wallet_id: &str,
        bill: Denomination,
    ) -> Result<ExchangeReceipt> {
        let rule = ExchangeRule::break_bill(bill);
        self.run_exchange(wallet_id, ExchangeKind::BillBreak, rule).await
    }

    /// Runs an exchange named by face values, e.g. a `"20"` bill or a
    /// `"25"` to `"100"` chip change.
    pub async fn exchange(
        &self,
        wallet_id: &str,
        kind: ExchangeKind,
        given: Decimal,
        received: Option<Decimal>,
    ) -> Result<ExchangeReceipt> {
        let rule = kind.rule_for_values(given, received);
        self.run_exchange(wallet_id, kind, rule).await
    }

    async fn run_exchange(
        &self,
        wallet_id: &str,
        kind: ExchangeKind,
        rule: Result<ExchangeRule>,
    ) -> Result<ExchangeReceipt> {
        let operation = kind.as_str();
        let rule = match rule {
            Ok(rule) => rule,
            Err(err) => return Err(rejected(operation, wallet_id, err)),
        };
        let mut unit = self.ledger.begin().await?;
        let outcome = apply_rule(unit.as_mut(), wallet_id, rule)
            .await
            .map(|(given_remaining, received_total)| ExchangeReceipt {
                kind,
                rule,
                given_remaining,
                received_total,
            });
        finish(operation, wallet_id, unit, outcome).await
    }

    /// Adds one chip to the wallet. Returns the new count.
    pub async fn add_chip(&self, wallet_id: &str, chip: Denomination) -> Result<u64> {
        self.adjust_chip(wallet_id, chip, 1).await
    }

    /// Removes one chip from the wallet. Returns the new count.
    pub async fn remove_chip(&self, wallet_id: &str, chip: Denomination) -> Result<u64> {
        self.adjust_chip(wallet_id, chip, -1).await
    }

    async fn adjust_chip(&self, wallet_id: &str, chip: Denomination, delta: i64) -> Result<u64> {
        let operation = if delta > 0 { "add-chip" } else { "remove-chip" };
        if chip.category() != Category::Chip {
            let err = LedgerError::InvalidInput(format!("{chip} is not a chip"));
            return Err(rejected(operation, wallet_id, err));
        }

        let mut unit = self.ledger.begin().await?;
        let outcome = adjust_count(unit.as_mut(), wallet_id, chip, delta).await;
        finish(operation, wallet_id, unit, outcome).await
    }

    /// Pays the keypad entry into the account using an exact subset of held bills.
    pub async fn process_deposit(&self, atm_id: &str) -> Result<DepositReceipt> {
        let mut unit = self.ledger.begin().await?;
        let outcome = deposit(unit.as_mut(), atm_id).await;
        finish("deposit", atm_id, unit, outcome).await
    }

    /// Dispenses the keypad entry as bills and charges it plus the fee.
    pub async fn process_withdrawal(&self, atm_id: &str) -> Result<WithdrawalReceipt> {
        let mut unit = self.ledger.begin().await?;
        let outcome = withdraw(unit.as_mut(), atm_id).await;
        finish("withdrawal", atm_id, unit, outcome).await
    }

    pub async fn process_transaction(
        &self,
        atm_id: &str,
        kind: TransactionKind,
    ) -> Result<TransactionReceipt> {
        match kind {
            TransactionKind::Deposit => self
                .process_deposit(atm_id)
                .await
                .map(TransactionReceipt::Deposit),
            TransactionKind::Withdrawal => self
                .process_withdrawal(atm_id)
                .await
                .map(TransactionReceipt::Withdrawal),
        }
    }

    /// Moves the debit card between wallet and ATM.
    pub async fn toggle_card(&self, atm_id: &str) -> Result<AtmView> {
        let mut unit = self.ledger.begin().await?;
        let outcome = flip_card(unit.as_mut(), atm_id).await;
        finish("card", atm_id, unit, outcome).await
    }

    /// Feeds one key press to the ATM screen.
    ///
    /// A press that completes a deposit or withdrawal commits together with
    /// the transaction. If the transaction is rejected the screen stays put.
    pub async fn press_key(&self, atm_id: &str, key: KeyInput) -> Result<KeypadOutcome> {
        let mut unit = self.ledger.begin().await?;
        let outcome = handle_key(unit.as_mut(), atm_id, key).await;
        finish("keypad", atm_id, unit, outcome).await
    }

    pub async fn fetch_atm(&self, atm_id: &str) -> Result<AtmView> {
        let mut unit = self.ledger.begin().await?;
        read_view(unit.as_mut(), atm_id).await
    }

    pub async fn fetch_wallet(&self, wallet_id: &str) -> Result<Wallet> {
        let mut unit = self.ledger.begin().await?;
        let mut row = BTreeMap::new();
        for column in Column::all() {
            if let Some(value) = unit.read(wallet_id, column).await? {
                row.insert(column, value);
            }
        }
        Wallet::from_columns(wallet_id, |column| row.remove(&column))
    }

    /// Consumes the orchestrator and returns the final state of every wallet.
    pub async fn into_results(self) -> Result<Vec<Wallet>> {
        self.ledger.all_wallets().await
    }
}

async fn finish<T>(
    operation: &'static str,
    id: &str,
    unit: UnitOfWorkBox,
    outcome: Result<T>,
) -> Result<T> {
    match outcome {
        Ok(value) => {
            unit.commit().await?;
            tracing::info!(operation, id, "committed");
            Ok(value)
        }
        Err(err) => {
            drop(unit);
            Err(rejected(operation, id, err))
        }
    }
}

fn rejected(operation: &'static str, id: &str, err: LedgerError) -> LedgerError {
    if err.is_fatal() {
        tracing::error!(operation, id, reason = err.reason_code(), error = %err, "aborted");
    } else {
        tracing::warn!(operation, id, reason = err.reason_code(), error = %err, "rejected");
    }
    err
}

async fn read_required(
    unit: &mut dyn UnitOfWork,
    id: &str,
    column: Column,
) -> Result<ColumnValue> {
    unit.read(id, column)
        .await?
        .ok_or_else(|| LedgerError::MissingColumn {
            id: id.to_string(),
            column: column.name(),
        })
}

async fn read_count(
    unit: &mut dyn UnitOfWork,
    id: &str,
    denomination: Denomination,
) -> Result<u64> {
    let column = Column::Count(denomination);
    read_required(unit, id, column).await?.as_count(column)
}

async fn write_count(
    unit: &mut dyn UnitOfWork,
    id: &str,
    denomination: Denomination,
    count: u64,
) -> Result<()> {
    unit.write(id, Column::Count(denomination), ColumnValue::Count(count))
        .await
}

async fn read_flag(unit: &mut dyn UnitOfWork, id: &str, column: Column) -> Result<bool> {
    read_required(unit, id, column).await?.as_flag(column)
}

async fn read_text(unit: &mut dyn UnitOfWork, id: &str, column: Column) -> Result<String> {
    let value = read_required(unit, id, column).await?;
    value.as_text(column).map(str::to_string)
}

async fn read_balance(unit: &mut dyn UnitOfWork, id: &str) -> Result<Decimal> {
    parse_balance(&read_text(unit, id, Column::AccountBalance).await?)
}

async fn write_balance(unit: &mut dyn UnitOfWork, id: &str, balance: Decimal) -> Result<()> {
    unit.write(id, Column::AccountBalance, ColumnValue::Text(balance.to_string()))
        .await
}

async fn read_display_state(unit: &mut dyn UnitOfWork, id: &str) -> Result<DisplayState> {
    read_text(unit, id, Column::DisplayState).await?.parse()
}

async fn write_display_state(
    unit: &mut dyn UnitOfWork,
    id: &str,
    state: DisplayState,
) -> Result<()> {
    unit.write(id, Column::DisplayState, ColumnValue::Text(state.as_str().to_string()))
        .await
}

async fn write_entry(unit: &mut dyn UnitOfWork, id: &str, entry: String) -> Result<()> {
    unit.write(id, Column::Entry, ColumnValue::Text(entry)).await
}

async fn read_view(unit: &mut dyn UnitOfWork, id: &str) -> Result<AtmView> {
    Ok(AtmView {
        atm_id: id.to_string(),
        display_state: read_display_state(unit, id).await?,
        entry: read_text(unit, id, Column::Entry).await?,
    })
}

async fn read_bills(unit: &mut dyn UnitOfWork, id: &str) -> Result<DenominationStack> {
    let mut counts = Vec::with_capacity(BILLS_DESCENDING.len());
    for bill in BILLS_DESCENDING {
        counts.push((bill, read_count(unit, id, bill).await?));
    }
    Ok(DenominationStack::from_counts(counts))
}

async fn write_bills(unit: &mut dyn UnitOfWork, id: &str, bills: &DenominationStack) -> Result<()> {
    for bill in BILLS_DESCENDING {
        write_count(unit, id, bill, bills.count(bill)).await?;
    }
    Ok(())
}

/// Returns the given-side count left and the received-side total.
async fn apply_rule(unit: &mut dyn UnitOfWork, id: &str, rule: ExchangeRule) -> Result<(u64, u64)> {
    let held = read_count(unit, id, rule.given).await?;
    if held < rule.given_quantity {
        return Err(LedgerError::InsufficientFunds {
            source_of_funds: rule.given.column(),
            available: held.into(),
            required: rule.given_quantity.into(),
        });
    }
    let received = read_count(unit, id, rule.received).await?;

    let given_remaining = held - rule.given_quantity;
    let received_total = received.saturating_add(rule.received_quantity);
    write_count(unit, id, rule.given, given_remaining).await?;
    write_count(unit, id, rule.received, received_total).await?;
    Ok((given_remaining, received_total))
}

async fn adjust_count(
    unit: &mut dyn UnitOfWork,
    id: &str,
    denomination: Denomination,
    delta: i64,
) -> Result<u64> {
    let current = read_count(unit, id, denomination).await?;
    let step = delta.unsigned_abs();
    let updated = if delta >= 0 {
        current.saturating_add(step)
    } else {
        current
            .checked_sub(step)
            .ok_or(LedgerError::InsufficientFunds {
                source_of_funds: denomination.column(),
                available: current.into(),
                required: step.into(),
            })?
    };
    write_count(unit, id, denomination, updated).await?;
    Ok(updated)
}

async fn flip_card(unit: &mut dyn UnitOfWork, id: &str) -> Result<AtmView> {
    let in_wallet = read_flag(unit, id, Column::DebitCard).await?;
    let toggle = atm::toggle_card(in_wallet);
    unit.write(id, Column::DebitCard, ColumnValue::Flag(toggle.debit_card))
        .await?;
    write_display_state(unit, id, toggle.display_state).await?;
    if toggle.reset_entry {
        write_entry(unit, id, atm::reset_entry()).await?;
    }
    read_view(unit, id).await
}

async fn positive_entry(unit: &mut dyn UnitOfWork, id: &str) -> Result<Decimal> {
    let amount = parse_entry(&read_text(unit, id, Column::Entry).await?)?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(amount)
}

async fn deposit(unit: &mut dyn UnitOfWork, id: &str) -> Result<DepositReceipt> {
    let amount = positive_entry(unit, id).await?;
    let held = read_bills(unit, id).await?;
    let paid = held
        .find_bill_combination(amount)
        .ok_or(LedgerError::NoExactCombination(amount))?;
    let balance = read_balance(unit, id).await? + amount;

    write_bills(unit, id, &held.subtract(&paid)).await?;
    write_balance(unit, id, balance).await?;
    write_display_state(unit, id, DisplayState::Home).await?;
    Ok(DepositReceipt {
        amount,
        bills: paid,
        balance,
    })
}

async fn withdraw(unit: &mut dyn UnitOfWork, id: &str) -> Result<WithdrawalReceipt> {
    let amount = positive_entry(unit, id).await?;
    let balance = read_balance(unit, id).await?;
    if amount > balance + WITHDRAWAL_FEE {
        return Err(LedgerError::InsufficientFunds {
            source_of_funds: "account_balance plus fee allowance",
            available: balance + WITHDRAWAL_FEE,
            required: amount,
        });
    }
    let held = read_bills(unit, id).await?;
    let dispensed = DenominationStack::bills_from_total(amount);
    let balance = balance - amount - WITHDRAWAL_FEE;

    write_bills(unit, id, &held.add(&dispensed)).await?;
    write_balance(unit, id, balance).await?;
    write_display_state(unit, id, DisplayState::Home).await?;
    Ok(WithdrawalReceipt {
        amount,
        fee: WITHDRAWAL_FEE,
        bills: dispensed,
        balance,
    })
}

async fn handle_key(unit: &mut dyn UnitOfWork, id: &str, key: KeyInput) -> Result<KeypadOutcome> {
    let state = read_display_state(unit, id).await?;
    let mut transaction = None;

    match atm::transition(state, key) {
        Effect::Ignore => {}
        Effect::Show(next) => write_display_state(unit, id, next).await?,
        Effect::ResetEntryAndShow(next) => {
            write_entry(unit, id, atm::reset_entry()).await?;
            write_display_state(unit, id, next).await?;
        }
        Effect::ResetEntry => write_entry(unit, id, atm::reset_entry()).await?,
        Effect::AppendDigit(digit) => {
            let entry = read_text(unit, id, Column::Entry).await?;
            if let Some(entry) = atm::append_digit(&entry, digit) {
                write_entry(unit, id, entry).await?;
            }
        }
        Effect::ConfirmEntry => {
            let entry = read_text(unit, id, Column::Entry).await?;
            if parse_entry(&entry).is_ok_and(|amount| amount > Decimal::ZERO) {
                write_display_state(unit, id, DisplayState::Confirm).await?;
            }
        }
        Effect::Withdraw => {
            transaction = Some(TransactionReceipt::Withdrawal(withdraw(unit, id).await?));
        }
        Effect::Deposit => {
            transaction = Some(TransactionReceipt::Deposit(deposit(unit, id).await?));
        }
    }

    Ok(KeypadOutcome {
        atm: read_view(unit, id).await?,
        transaction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::atm::{ActionKey, ControlKey};
    use crate::infrastructure::in_memory::InMemoryLedger;
    use Denomination::*;

    async fn orchestrator_with(wallet: Wallet) -> TransactionOrchestrator {
        let ledger = InMemoryLedger::new();
        ledger.open_account(wallet).await.unwrap();
        TransactionOrchestrator::new(Box::new(ledger))
    }

    fn at_screen(mut wallet: Wallet, state: DisplayState, entry: &str) -> Wallet {
        wallet.display_state = state;
        wallet.entry = entry.to_string();
        wallet
    }

    #[tokio::test]
    async fn test_exchange_bills_moves_counts() {
        let engine = orchestrator_with(
            Wallet::new("1").with_bills(DenominationStack::from_counts([(BillTwenty, 1)])),
        )
        .await;

        let receipt = engine.exchange_bills("1", BillTwenty).await.unwrap();
        assert_eq!(receipt.given_remaining, 0);
        assert_eq!(receipt.received_total, 4);

        let wallet = engine.fetch_wallet("1").await.unwrap();
        assert_eq!(wallet.bills.count(BillTwenty), 0);
        assert_eq!(wallet.chips.count(ChipFive), 4);
        assert_eq!(wallet.chips.value(), dec!(20));
    }

    #[tokio::test]
    async fn test_exchange_without_bill_is_rejected() {
        let wallet = Wallet::new("1").with_chips(DenominationStack::from_counts([(ChipFive, 3)]));
        let engine = orchestrator_with(wallet.clone()).await;

        let err = engine.exchange_bills("1", BillTen).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(engine.fetch_wallet("1").await.unwrap(), wallet);
    }

    #[tokio::test]
    async fn test_change_chips_and_break_bills() {
        let engine = orchestrator_with(
            Wallet::new("1")
                .with_bills(DenominationStack::from_counts([(BillFifty, 1)]))
                .with_chips(DenominationStack::from_counts([(ChipTwentyFive, 4)])),
        )
        .await;

        engine
            .change_chips("1", ChipTwentyFive, ChipHundred)
            .await
            .unwrap();
        engine.break_bills("1", BillFifty).await.unwrap();

        let wallet = engine.fetch_wallet("1").await.unwrap();
        assert_eq!(wallet.chips, DenominationStack::from_counts([(ChipHundred, 1)]));
        assert_eq!(wallet.bills, DenominationStack::from_counts([(BillTen, 5)]));
    }

    #[tokio::test]
    async fn test_unknown_pair_never_opens_a_unit() {
        let engine = orchestrator_with(Wallet::new("1")).await;
        let err = engine.change_chips("1", ChipOne, ChipHundred).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownDenominationPair { .. }));

        let err = engine.break_bills("1", BillOne).await.unwrap_err();
        assert_eq!(err.reason_code(), "unknown_denomination_pair");
    }

    #[tokio::test]
    async fn test_missing_received_column_aborts() {
        let ledger = InMemoryLedger::new();
        ledger
            .insert_row("1", [(Column::Count(BillTen), ColumnValue::Count(1))])
            .await;
        let engine = TransactionOrchestrator::new(Box::new(ledger));

        let err = engine.exchange_bills("1", BillTen).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MissingColumn {
                column: "chip_fives",
                ..
            }
        ));
        let mut unit = engine.ledger().begin().await.unwrap();
        assert_eq!(
            unit.read("1", Column::Count(BillTen)).await.unwrap(),
            Some(ColumnValue::Count(1))
        );
    }

    #[tokio::test]
    async fn test_exchange_by_face_value() {
        let engine = orchestrator_with(
            Wallet::new("1").with_chips(DenominationStack::from_counts([(ChipFive, 2)])),
        )
        .await;

        let receipt = engine
            .exchange("1", ExchangeKind::ChipsToBills, dec!(10), None)
            .await
            .unwrap();
        assert_eq!(receipt.rule.received, BillTen);

        let err = engine
            .exchange("1", ExchangeKind::ChipChange, dec!(2.5), Some(dec!(1)))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "unknown_denomination_pair");
    }

    #[tokio::test]
    async fn test_add_and_remove_chip() {
        let engine = orchestrator_with(Wallet::new("1")).await;

        assert_eq!(engine.add_chip("1", ChipTwoFifty).await.unwrap(), 1);
        assert_eq!(engine.remove_chip("1", ChipTwoFifty).await.unwrap(), 0);
        assert!(matches!(
            engine.remove_chip("1", ChipTwoFifty).await,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            engine.add_chip("1", BillFive).await,
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_deposit_uses_exact_bills() {
        let wallet = Wallet::new("1")
            .with_bills(DenominationStack::from_counts([(BillOne, 2), (BillFive, 1)]))
            .with_balance(dec!(10));
        let engine = orchestrator_with(at_screen(wallet, DisplayState::Deposit, "7")).await;

        let receipt = engine.process_deposit("1").await.unwrap();
        assert_eq!(receipt.balance, dec!(17));
        assert_eq!(receipt.bills.value(), dec!(7));

        let wallet = engine.fetch_wallet("1").await.unwrap();
        assert!(wallet.bills.is_empty());
        assert_eq!(wallet.account_balance, dec!(17));
        assert_eq!(wallet.display_state, DisplayState::Home);
    }

    #[tokio::test]
    async fn test_deposit_without_exact_combination_changes_nothing() {
        let wallet = Wallet::new("1")
            .with_bills(DenominationStack::from_counts([(BillOne, 2), (BillFive, 1)]))
            .with_balance(dec!(10));
        let wallet = at_screen(wallet, DisplayState::Deposit, "9");
        let engine = orchestrator_with(wallet.clone()).await;

        let err = engine.process_deposit("1").await.unwrap_err();
        assert!(matches!(err, LedgerError::NoExactCombination(amount) if amount == dec!(9)));
        assert_eq!(engine.fetch_wallet("1").await.unwrap(), wallet);
    }

    #[tokio::test]
    async fn test_withdrawal_charges_fee_and_dispenses_bills() {
        let wallet = Wallet::new("1").with_balance(dec!(100));
        let engine = orchestrator_with(at_screen(wallet, DisplayState::Confirm, "37")).await;

        let receipt = engine
            .process_transaction("1", TransactionKind::Withdrawal)
            .await
            .unwrap();
        let TransactionReceipt::Withdrawal(receipt) = receipt else {
            panic!("expected a withdrawal receipt");
        };
        assert_eq!(receipt.balance, dec!(60));
        assert_eq!(
            receipt.bills,
            DenominationStack::from_counts([
                (BillTwenty, 1),
                (BillTen, 1),
                (BillFive, 1),
                (BillOne, 2)
            ])
        );

        let wallet = engine.fetch_wallet("1").await.unwrap();
        assert_eq!(wallet.bills.value(), dec!(37));
        assert_eq!(wallet.display_state, DisplayState::Home);
    }

    #[tokio::test]
    async fn test_withdrawal_may_overdraw_by_fee() {
        let wallet = Wallet::new("1").with_balance(dec!(10));
        let engine = orchestrator_with(at_screen(wallet, DisplayState::Confirm, "13")).await;

        let receipt = engine.process_withdrawal("1").await.unwrap();
        assert_eq!(receipt.balance, dec!(-6));
    }

    #[tokio::test]
    async fn test_withdrawal_over_allowance_is_rejected() {
        let wallet = at_screen(
            Wallet::new("1").with_balance(dec!(10)),
            DisplayState::Confirm,
            "14",
        );
        let engine = orchestrator_with(wallet.clone()).await;

        let err = engine.process_withdrawal("1").await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(engine.fetch_wallet("1").await.unwrap(), wallet);
    }

    #[tokio::test]
    async fn test_zero_entry_is_invalid() {
        let engine = orchestrator_with(Wallet::new("1").with_balance(dec!(10))).await;
        assert!(matches!(
            engine.process_withdrawal("1").await,
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.process_deposit("1").await,
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_card_round_trip() {
        let engine =
            orchestrator_with(at_screen(Wallet::new("1"), DisplayState::Insert, "55")).await;

        let view = engine.toggle_card("1").await.unwrap();
        assert_eq!(view.display_state, DisplayState::Home);
        assert_eq!(view.entry, "0");
        assert!(!engine.fetch_wallet("1").await.unwrap().debit_card);

        let view = engine.toggle_card("1").await.unwrap();
        assert_eq!(view.display_state, DisplayState::Insert);
        assert!(engine.fetch_wallet("1").await.unwrap().debit_card);
    }

    #[tokio::test]
    async fn test_keypad_withdrawal_flow() {
        let engine = orchestrator_with(
            at_screen(Wallet::new("1"), DisplayState::Home, "0").with_balance(dec!(50)),
        )
        .await;

        engine.press_key("1", KeyInput::Control(ControlKey::Ne)).await.unwrap();
        engine.press_key("1", KeyInput::Digit(2)).await.unwrap();
        let outcome = engine.press_key("1", KeyInput::Digit(0)).await.unwrap();
        assert_eq!(outcome.atm.display_state, DisplayState::Initiate);
        assert_eq!(outcome.atm.entry, "020");

        let outcome = engine.press_key("1", KeyInput::Action(ActionKey::Enter)).await.unwrap();
        assert_eq!(outcome.atm.display_state, DisplayState::Confirm);

        let outcome = engine.press_key("1", KeyInput::Control(ControlKey::Ne)).await.unwrap();
        assert_eq!(outcome.atm.display_state, DisplayState::Home);
        assert!(matches!(
            outcome.transaction,
            Some(TransactionReceipt::Withdrawal(WithdrawalReceipt { balance, .. }))
                if balance == dec!(27)
        ));
    }

    #[tokio::test]
    async fn test_enter_with_zero_entry_stays_on_initiate() {
        let engine =
            orchestrator_with(at_screen(Wallet::new("1"), DisplayState::Initiate, "0")).await;
        let outcome = engine
            .press_key("1", KeyInput::Action(ActionKey::Enter))
            .await
            .unwrap();
        assert_eq!(outcome.atm.display_state, DisplayState::Initiate);
        assert!(outcome.transaction.is_none());
    }

    #[tokio::test]
    async fn test_se_on_initiate_keeps_entry() {
        let wallet =
            at_screen(Wallet::new("1"), DisplayState::Initiate, "40").with_balance(dec!(50));
        let engine = orchestrator_with(wallet.clone()).await;

        let outcome = engine
            .press_key("1", KeyInput::Control(ControlKey::Se))
            .await
            .unwrap();
        assert_eq!(outcome.atm.display_state, DisplayState::Initiate);
        assert_eq!(outcome.atm.entry, "40");
        assert!(outcome.transaction.is_none());
        assert_eq!(engine.fetch_wallet("1").await.unwrap(), wallet);
    }

    #[tokio::test]
    async fn test_rejected_keypad_deposit_keeps_screen() {
        let wallet = at_screen(
            Wallet::new("1").with_bills(DenominationStack::from_counts([(BillTen, 1)])),
            DisplayState::Deposit,
            "5",
        );
        let engine = orchestrator_with(wallet.clone()).await;

        let err = engine
            .press_key("1", KeyInput::Action(ActionKey::Enter))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "no_exact_combination");
        assert_eq!(engine.fetch_wallet("1").await.unwrap(), wallet);
    }

    #[tokio::test]
    async fn test_entry_is_capped() {
        let engine = orchestrator_with(at_screen(
            Wallet::new("1"),
            DisplayState::Deposit,
            "012345678",
        ))
        .await;
        let outcome = engine.press_key("1", KeyInput::Digit(9)).await.unwrap();
        assert_eq!(outcome.atm.entry, "012345678");
    }
}
