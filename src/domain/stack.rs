use super::combination;
use super::denomination::{BILLS_DESCENDING, CHIPS_DESCENDING, Denomination};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, Sub};

/// An immutable multiset of denomination counts.
///
/// Every operation returns a new stack. Counts never go below zero: anything
/// that would push a count negative clamps it to zero instead. Zero counts are
/// not stored, so two stacks holding the same units always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenominationStack(BTreeMap<Denomination, u64>);

impl DenominationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (Denomination, u64)>,
    {
        counts
            .into_iter()
            .fold(Self::new(), |stack, (denomination, count)| {
                stack.with_count(denomination, count)
            })
    }

    /// Builds the canonical largest-units-first decomposition of `total`.
    ///
    /// `denominations` must be in descending face value. The result is worth
    /// exactly `total` whenever the smallest denomination divides it.
    pub fn from_total_greedy(total: Decimal, denominations: &[Denomination]) -> Self {
        let mut stack = Self::new();
        let mut remainder = total;
        for &denomination in denominations {
            let value = denomination.face_value();
            let units = (remainder / value).floor();
            remainder %= value;
            stack = stack.with_count(denomination, units.to_u64().unwrap_or(0));
        }
        stack
    }

    pub fn bills_from_total(total: Decimal) -> Self {
        Self::from_total_greedy(total, &BILLS_DESCENDING)
    }

    pub fn chips_from_total(total: Decimal) -> Self {
        Self::from_total_greedy(total, &CHIPS_DESCENDING)
    }

    /// Count held for `denomination`; zero when absent.
    pub fn count(&self, denomination: Denomination) -> u64 {
        self.0.get(&denomination).copied().unwrap_or(0)
    }

    pub fn add(&self, other: &Self) -> Self {
        other.iter().fold(self.clone(), |stack, (denomination, count)| {
            let sum = stack.count(denomination).saturating_add(count);
            stack.with_count(denomination, sum)
        })
    }

    /// Pointwise difference, clamped at zero.
    ///
    /// Value is silently lost when `other` is not contained in `self`.
    pub fn subtract(&self, other: &Self) -> Self {
        other.iter().fold(self.clone(), |stack, (denomination, count)| {
            let difference = stack.count(denomination).saturating_sub(count);
            stack.with_count(denomination, difference)
        })
    }

    pub fn modify(&self, denomination: Denomination, delta: i64) -> Self {
        let current = i128::from(self.count(denomination));
        let updated = (current + i128::from(delta)).clamp(0, i128::from(u64::MAX));
        self.clone().with_count(denomination, updated as u64)
    }

    pub fn value(&self) -> Decimal {
        self.iter()
            .map(|(denomination, count)| denomination.face_value() * Decimal::from(count))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.value().is_zero()
    }

    /// True when every count in `other` is covered by the count in `self`.
    pub fn contains(&self, other: &Self) -> bool {
        other
            .iter()
            .all(|(denomination, count)| count <= self.count(denomination))
    }

    /// Scales the stack for a payout.
    ///
    /// A factor of exactly 1.5 keeps the original units and adds, per unit, the
    /// smaller chips worth half of it (see [`Denomination::half_split`]). Any
    /// other factor multiplies each count independently and floors the result.
    pub fn scale_by_factor(&self, factor: Decimal) -> Self {
        if factor == dec!(1.5) {
            let mut scaled = self.clone();
            for (denomination, count) in self.iter() {
                for &(smaller, quantity) in denomination.half_split() {
                    let extra = quantity.saturating_mul(count);
                    let total = scaled.count(smaller).saturating_add(extra);
                    scaled = scaled.with_count(smaller, total);
                }
            }
            scaled
        } else {
            Self::from_counts(self.iter().map(|(denomination, count)| {
                let scaled = (Decimal::from(count) * factor).floor();
                (denomination, scaled.to_u64().unwrap_or(0))
            }))
        }
    }

    /// Finds held bills summing exactly to `target`, largest bills tried first.
    pub fn find_bill_combination(&self, target: Decimal) -> Option<Self> {
        self.find_combination(target, &BILLS_DESCENDING)
    }

    /// Finds held units of the given denominations summing exactly to `target`.
    pub fn find_combination(&self, target: Decimal, order: &[Denomination]) -> Option<Self> {
        let groups: Vec<(Denomination, u64)> = order
            .iter()
            .map(|&denomination| (denomination, self.count(denomination)))
            .collect();
        combination::find_combination(target, &groups)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Denomination, u64)> + '_ {
        self.0.iter().map(|(denomination, count)| (*denomination, *count))
    }

    fn with_count(mut self, denomination: Denomination, count: u64) -> Self {
        if count == 0 {
            self.0.remove(&denomination);
        } else {
            self.0.insert(denomination, count);
        }
        self
    }
}

impl Add for &DenominationStack {
    type Output = DenominationStack;
    fn add(self, rhs: Self) -> Self::Output {
        DenominationStack::add(self, rhs)
    }
}

impl Sub for &DenominationStack {
    type Output = DenominationStack;
    fn sub(self, rhs: Self) -> Self::Output {
        self.subtract(rhs)
    }
}
