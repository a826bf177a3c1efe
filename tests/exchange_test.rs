mod common;

use casino_wallet::application::orchestrator::TransactionOrchestrator;
use casino_wallet::domain::denomination::{BILLS_DESCENDING, CHIPS_DESCENDING, Denomination::*};
use casino_wallet::domain::exchange::ExchangeKind;
use casino_wallet::domain::ports::{Ledger, UnitOfWork};
use casino_wallet::domain::stack::DenominationStack;
use casino_wallet::domain::wallet::{Column, ColumnValue, Wallet};
use casino_wallet::error::LedgerError;
use casino_wallet::infrastructure::in_memory::InMemoryLedger;
use common::orchestrator_with;
use rust_decimal_macros::dec;

fn holding_everything() -> Wallet {
    Wallet::new("1")
        .with_bills(DenominationStack::from_counts(BILLS_DESCENDING.map(|bill| (bill, 10))))
        .with_chips(DenominationStack::from_counts(CHIPS_DESCENDING.map(|chip| (chip, 10))))
}

fn worth(wallet: &Wallet) -> rust_decimal::Decimal {
    wallet.bills.value() + wallet.chips.value()
}

#[tokio::test]
async fn test_every_exchange_preserves_value() {
    let engine = orchestrator_with(vec![holding_everything()]).await;
    let start = worth(&engine.fetch_wallet("1").await.unwrap());

    for bill in BILLS_DESCENDING {
        engine.exchange_bills("1", bill).await.unwrap();
        engine.exchange_chips("1", bill).await.unwrap();
    }
    for bill in [BillHundred, BillFifty, BillTwenty, BillTen, BillFive] {
        engine.break_bills("1", bill).await.unwrap();
    }
    for (given, received) in [
        (ChipOne, ChipFive),
        (ChipFive, ChipOne),
        (ChipFive, ChipTwentyFive),
        (ChipTwentyFive, ChipFive),
        (ChipTwentyFive, ChipHundred),
        (ChipHundred, ChipTwentyFive),
    ] {
        engine.change_chips("1", given, received).await.unwrap();
    }

    assert_eq!(worth(&engine.fetch_wallet("1").await.unwrap()), start);
}

#[tokio::test]
async fn test_bill_round_trip_restores_holdings() {
    let before = holding_everything();
    let engine = orchestrator_with(vec![before.clone()]).await;

    engine.exchange_bills("1", BillFifty).await.unwrap();
    let mid = engine.fetch_wallet("1").await.unwrap();
    assert_eq!(mid.bills.count(BillFifty), 9);
    assert_eq!(mid.chips.count(ChipTwentyFive), 12);

    engine.exchange_chips("1", BillFifty).await.unwrap();
    assert_eq!(engine.fetch_wallet("1").await.unwrap(), before);
}

#[tokio::test]
async fn test_short_given_side_rejects() {
    let engine = orchestrator_with(vec![
        Wallet::new("1").with_chips(DenominationStack::from_counts([(ChipTwentyFive, 3)])),
    ])
    .await;

    let err = engine
        .change_chips("1", ChipTwentyFive, ChipHundred)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { source_of_funds: "chip_twentyfives", .. }
    ));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_face_value_lookups() {
    let engine = orchestrator_with(vec![holding_everything()]).await;

    let receipt = engine
        .exchange("1", ExchangeKind::ChipChange, dec!(100), Some(dec!(25)))
        .await
        .unwrap();
    assert_eq!(receipt.received_total, 14);

    for (kind, given, received) in [
        (ExchangeKind::BillsToChips, dec!(2.5), None),
        (ExchangeKind::ChipsToBills, dec!(25), None),
        (ExchangeKind::BillBreak, dec!(1), None),
        (ExchangeKind::ChipChange, dec!(1), Some(dec!(25))),
    ] {
        let err = engine.exchange("1", kind, given, received).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::UnknownDenominationPair { .. }),
            "{kind} {given}"
        );
    }
}

#[tokio::test]
async fn test_missing_received_column_is_fatal_and_writes_nothing() {
    let ledger = InMemoryLedger::new();
    ledger
        .insert_row("1", [(Column::Count(BillHundred), ColumnValue::Count(2))])
        .await;
    let engine = TransactionOrchestrator::new(Box::new(ledger));

    let err = engine.exchange_bills("1", BillHundred).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.reason_code(), "missing_column");

    let mut unit = engine.ledger().begin().await.unwrap();
    assert_eq!(
        unit.read("1", Column::Count(BillHundred)).await.unwrap(),
        Some(ColumnValue::Count(2))
    );
}
