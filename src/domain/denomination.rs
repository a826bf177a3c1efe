use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bill,
    Chip,
}

/// A physical unit the wallet can hold.
///
/// Bills and chips of equal face value are distinct denominations; moving value
/// between the two families always goes through an exchange rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Denomination {
    BillOne,
    BillFive,
    BillTen,
    BillTwenty,
    BillFifty,
    BillHundred,
    ChipOne,
    ChipTwoFifty,
    ChipFive,
    ChipTwentyFive,
    ChipHundred,
}

use Denomination::*;

/// Bills, largest first. Greedy decomposition walks this order.
pub const BILLS_DESCENDING: [Denomination; 6] = [
    BillHundred,
    BillFifty,
    BillTwenty,
    BillTen,
    BillFive,
    BillOne,
];

/// Chips, largest first.
pub const CHIPS_DESCENDING: [Denomination; 5] =
    [ChipHundred, ChipTwentyFive, ChipFive, ChipTwoFifty, ChipOne];

impl Denomination {
    pub fn face_value(self) -> Decimal {
        match self {
            BillOne | ChipOne => dec!(1),
            ChipTwoFifty => dec!(2.5),
            BillFive | ChipFive => dec!(5),
            BillTen => dec!(10),
            BillTwenty => dec!(20),
            ChipTwentyFive => dec!(25),
            BillFifty => dec!(50),
            BillHundred | ChipHundred => dec!(100),
        }
    }

    pub fn category(self) -> Category {
        match self {
            BillOne | BillFive | BillTen | BillTwenty | BillFifty | BillHundred => Category::Bill,
            ChipOne | ChipTwoFifty | ChipFive | ChipTwentyFive | ChipHundred => Category::Chip,
        }
    }

    /// Name of the wallet column holding this denomination's count.
    pub fn column(self) -> &'static str {
        match self {
            BillOne => "ones",
            BillFive => "fives",
            BillTen => "tens",
            BillTwenty => "twenties",
            BillFifty => "fifties",
            BillHundred => "hundreds",
            ChipOne => "chip_ones",
            ChipTwoFifty => "chip_twofifties",
            ChipFive => "chip_fives",
            ChipTwentyFive => "chip_twentyfives",
            ChipHundred => "chip_hundreds",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BillOne => "bill-one",
            BillFive => "bill-five",
            BillTen => "bill-ten",
            BillTwenty => "bill-twenty",
            BillFifty => "bill-fifty",
            BillHundred => "bill-hundred",
            ChipOne => "chip-one",
            ChipTwoFifty => "chip-two-fifty",
            ChipFive => "chip-five",
            ChipTwentyFive => "chip-twenty-five",
            ChipHundred => "chip-hundred",
        }
    }

    pub fn bill_with_value(value: Decimal) -> Option<Self> {
        BILLS_DESCENDING
            .into_iter()
            .find(|d| d.face_value() == value)
    }

    pub fn chip_with_value(value: Decimal) -> Option<Self> {
        CHIPS_DESCENDING
            .into_iter()
            .find(|d| d.face_value() == value)
    }

    /// Smaller chips worth half of one unit of `self`.
    ///
    /// Used by the 1.5x payout. Bills never split.
    pub fn half_split(self) -> &'static [(Denomination, u64)] {
        match self {
            ChipHundred => &[(ChipTwentyFive, 2)],
            ChipTwentyFive => &[(ChipFive, 2), (ChipTwoFifty, 1)],
            ChipFive => &[(ChipTwoFifty, 1)],
            ChipTwoFifty => &[(ChipOne, 1)],
            _ => &[],
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Denomination {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BILLS_DESCENDING
            .into_iter()
            .chain(CHIPS_DESCENDING)
            .find(|d| d.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidInput(format!("unknown denomination {s}")))
    }
}
