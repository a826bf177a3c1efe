use super::denomination::Denomination::{self, *};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// The four families of conversion a wallet can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangeKind {
    BillsToChips,
    ChipsToBills,
    ChipChange,
    BillBreak,
}

impl ExchangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeKind::BillsToChips => "bills-to-chips",
            ExchangeKind::ChipsToBills => "chips-to-bills",
            ExchangeKind::ChipChange => "chip-change",
            ExchangeKind::BillBreak => "bill-break",
        }
    }

    /// Resolves a rule from face values as they arrive over the wire.
    ///
    /// `BillsToChips`, `ChipsToBills` and `BillBreak` are keyed by a bill value,
    /// `ChipChange` by a pair of chip values.
    pub fn rule_for_values(
        self,
        given: Decimal,
        received: Option<Decimal>,
    ) -> Result<ExchangeRule> {
        let unknown = || LedgerError::UnknownDenominationPair {
            kind: self.as_str(),
            key: match received {
                Some(received) => format!("{given} -> {received}"),
                None => given.to_string(),
            },
        };
        match self {
            ExchangeKind::ChipChange => {
                let given = Denomination::chip_with_value(given).ok_or_else(unknown)?;
                let received = received
                    .and_then(Denomination::chip_with_value)
                    .ok_or_else(unknown)?;
                ExchangeRule::change_chips(given, received)
            }
            _ => {
                let bill = Denomination::bill_with_value(given).ok_or_else(unknown)?;
                match self {
                    ExchangeKind::BillsToChips => ExchangeRule::bills_to_chips(bill),
                    ExchangeKind::ChipsToBills => ExchangeRule::chips_to_bills(bill),
                    _ => ExchangeRule::break_bill(bill),
                }
            }
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Surrender `given_quantity` of `given` to receive `received_quantity` of `received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeRule {
    pub given: Denomination,
    pub given_quantity: u64,
    pub received: Denomination,
    pub received_quantity: u64,
}

const fn rule(
    given: Denomination,
    given_quantity: u64,
    received: Denomination,
    received_quantity: u64,
) -> ExchangeRule {
    ExchangeRule {
        given,
        given_quantity,
        received,
        received_quantity,
    }
}

impl ExchangeRule {
    /// One bill in, the matching chips out.
    pub fn bills_to_chips(bill: Denomination) -> Result<Self> {
        match bill {
            BillOne => Ok(rule(BillOne, 1, ChipOne, 1)),
            BillFive => Ok(rule(BillFive, 1, ChipFive, 1)),
            BillTen => Ok(rule(BillTen, 1, ChipFive, 2)),
            BillTwenty => Ok(rule(BillTwenty, 1, ChipFive, 4)),
            BillFifty => Ok(rule(BillFifty, 1, ChipTwentyFive, 2)),
            BillHundred => Ok(rule(BillHundred, 1, ChipHundred, 1)),
            ChipOne | ChipTwoFifty | ChipFive | ChipTwentyFive | ChipHundred => {
                Err(Self::unknown(ExchangeKind::BillsToChips, bill, None))
            }
        }
    }

    /// Chips in, one `bill` out. Exact inverse of [`ExchangeRule::bills_to_chips`].
    pub fn chips_to_bills(bill: Denomination) -> Result<Self> {
        Self::bills_to_chips(bill)
            .map(|rule| rule.inverse())
            .map_err(|_| Self::unknown(ExchangeKind::ChipsToBills, bill, None))
    }

    /// Directed chip-for-chip change. Only the listed pairs exist.
    pub fn change_chips(given: Denomination, received: Denomination) -> Result<Self> {
        match (given, received) {
            (ChipOne, ChipFive) => Ok(rule(ChipOne, 5, ChipFive, 1)),
            (ChipFive, ChipOne) => Ok(rule(ChipFive, 1, ChipOne, 5)),
            (ChipFive, ChipTwentyFive) => Ok(rule(ChipFive, 5, ChipTwentyFive, 1)),
            (ChipTwentyFive, ChipFive) => Ok(rule(ChipTwentyFive, 1, ChipFive, 5)),
            (ChipTwentyFive, ChipHundred) => Ok(rule(ChipTwentyFive, 4, ChipHundred, 1)),
            (ChipHundred, ChipTwentyFive) => Ok(rule(ChipHundred, 1, ChipTwentyFive, 4)),
            _ => Err(Self::unknown(ExchangeKind::ChipChange, given, Some(received))),
        }
    }

    /// One larger bill in, smaller bills of equal value out.
    pub fn break_bill(bill: Denomination) -> Result<Self> {
        match bill {
            BillFive => Ok(rule(BillFive, 1, BillOne, 5)),
            BillTen => Ok(rule(BillTen, 1, BillFive, 2)),
            BillTwenty => Ok(rule(BillTwenty, 1, BillTen, 2)),
            BillFifty => Ok(rule(BillFifty, 1, BillTen, 5)),
            BillHundred => Ok(rule(BillHundred, 1, BillTwenty, 5)),
            _ => Err(Self::unknown(ExchangeKind::BillBreak, bill, None)),
        }
    }

    pub fn inverse(&self) -> Self {
        rule(
            self.received,
            self.received_quantity,
            self.given,
            self.given_quantity,
        )
    }

    pub fn given_value(&self) -> Decimal {
        self.given.face_value() * Decimal::from(self.given_quantity)
    }

    pub fn received_value(&self) -> Decimal {
        self.received.face_value() * Decimal::from(self.received_quantity)
    }

    fn unknown(
        kind: ExchangeKind,
        given: Denomination,
        received: Option<Denomination>,
    ) -> LedgerError {
        LedgerError::UnknownDenominationPair {
            kind: kind.as_str(),
            key: match received {
                Some(received) => format!("{given} -> {received}"),
                None => given.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::denomination::{BILLS_DESCENDING, CHIPS_DESCENDING};
    use rust_decimal_macros::dec;

    #[test]
    fn test_every_rule_preserves_value() {
        let mut rules = Vec::new();
        for bill in BILLS_DESCENDING {
            rules.extend(ExchangeRule::bills_to_chips(bill));
            rules.extend(ExchangeRule::chips_to_bills(bill));
            rules.extend(ExchangeRule::break_bill(bill));
        }
        for given in CHIPS_DESCENDING {
            for received in CHIPS_DESCENDING {
                rules.extend(ExchangeRule::change_chips(given, received));
            }
        }
        // 6 + 6 + 5 + 6
        assert_eq!(rules.len(), 23);
        for rule in rules {
            assert_eq!(rule.given_value(), rule.received_value(), "{rule:?}");
        }
    }

    #[test]
    fn test_bills_to_chips_table() {
        assert_eq!(
            ExchangeRule::bills_to_chips(BillTwenty).unwrap(),
            rule(BillTwenty, 1, ChipFive, 4)
        );
        assert_eq!(
            ExchangeRule::bills_to_chips(BillFifty).unwrap(),
            rule(BillFifty, 1, ChipTwentyFive, 2)
        );
    }

    #[test]
    fn test_chips_to_bills_is_inverse() {
        for bill in BILLS_DESCENDING {
            let forward = ExchangeRule::bills_to_chips(bill).unwrap();
            let back = ExchangeRule::chips_to_bills(bill).unwrap();
            assert_eq!(back, forward.inverse());
            assert_eq!(back.received_quantity, 1);
        }
    }

    #[test]
    fn test_unknown_inputs_are_rejected() {
        assert!(matches!(
            ExchangeRule::bills_to_chips(ChipFive),
            Err(LedgerError::UnknownDenominationPair { kind: "bills-to-chips", .. })
        ));
        assert!(matches!(
            ExchangeRule::change_chips(ChipOne, ChipHundred),
            Err(LedgerError::UnknownDenominationPair { kind: "chip-change", .. })
        ));
        assert!(matches!(
            ExchangeRule::change_chips(ChipTwoFifty, ChipOne),
            Err(LedgerError::UnknownDenominationPair { .. })
        ));
        assert!(ExchangeRule::break_bill(BillOne).is_err());
    }

    #[test]
    fn test_bill_break_table() {
        assert_eq!(
            ExchangeRule::break_bill(BillTen).unwrap(),
            rule(BillTen, 1, BillFive, 2)
        );
        assert_eq!(
            ExchangeRule::break_bill(BillFifty).unwrap(),
            rule(BillFifty, 1, BillTen, 5)
        );
        assert_eq!(
            ExchangeRule::break_bill(BillHundred).unwrap(),
            rule(BillHundred, 1, BillTwenty, 5)
        );
    }

    #[test]
    fn test_rule_for_values() {
        let rule = ExchangeKind::ChipChange
            .rule_for_values(dec!(25), Some(dec!(100)))
            .unwrap();
        assert_eq!(rule.given_quantity, 4);

        let rule = ExchangeKind::ChipsToBills
            .rule_for_values(dec!(10), None)
            .unwrap();
        assert_eq!(rule.given, ChipFive);
        assert_eq!(rule.received, BillTen);

        // 25 is a chip value only; no silent fallback to the one-dollar rule
        let err = ExchangeKind::BillsToChips
            .rule_for_values(dec!(25), None)
            .unwrap_err();
        assert_eq!(err.reason_code(), "unknown_denomination_pair");
        assert!(ExchangeKind::ChipChange.rule_for_values(dec!(5), None).is_err());
    }
}
