//! Exact subset-sum search over held units.
//!
//! Units of one denomination are interchangeable, so the search walks
//! `(denomination, count)` groups and, for each group, tries the largest usable
//! count first. That is the order an include-before-exclude walk over the
//! individual units would find, without ever listing the units one by one.
//!
//! The walk runs on an explicit frame stack. A state `(group, remaining)` is a
//! dead end when `remaining` exceeds what the later groups hold, when it is not
//! a multiple of their common divisor, or when it already failed once. None of
//! these cuts changes which combination comes back.

use super::denomination::Denomination;
use super::stack::DenominationStack;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashSet;

/// Every face value is a multiple of a half unit.
const HALVES_PER_UNIT: Decimal = Decimal::TWO;

#[derive(Debug)]
struct Frame {
    group: usize,
    remaining: u64,
    /// Count currently taken from `group`; `None` until the frame is expanded.
    taken: Option<u64>,
    /// Smallest count that still leaves a reachable remainder.
    least: u64,
}

impl Frame {
    fn fresh(group: usize, remaining: u64) -> Self {
        Self {
            group,
            remaining,
            taken: None,
            least: 0,
        }
    }
}

/// Held amounts of the groups from `group` onwards.
struct Suffixes {
    totals: Vec<u64>,
    divisors: Vec<u64>,
}

impl Suffixes {
    fn new(groups: &[(u64, u64)]) -> Self {
        let mut totals = vec![0u64; groups.len() + 1];
        let mut divisors = vec![0u64; groups.len() + 1];
        for (index, &(value, count)) in groups.iter().enumerate().rev() {
            totals[index] = totals[index + 1].saturating_add(value.saturating_mul(count));
            divisors[index] = if count == 0 {
                divisors[index + 1]
            } else {
                gcd(divisors[index + 1], value)
            };
        }
        Self { totals, divisors }
    }

    fn can_reach(&self, group: usize, remaining: u64) -> bool {
        let divisor = self.divisors[group];
        remaining <= self.totals[group] && (divisor == 0 || remaining % divisor == 0)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Returns the first selection from `groups` worth exactly `target`, or `None`.
///
/// `groups` lists each denomination with the count held, in the order to try
/// them. A zero target is met by the empty selection.
pub fn find_combination(
    target: Decimal,
    groups: &[(Denomination, u64)],
) -> Option<DenominationStack> {
    let target = to_halves(target)?;
    let values = groups
        .iter()
        .map(|&(denomination, count)| Some((to_halves(denomination.face_value())?, count)))
        .collect::<Option<Vec<_>>>()?;

    let taken = search(target, &values)?;
    Some(DenominationStack::from_counts(
        groups
            .iter()
            .zip(taken)
            .map(|(&(denomination, _), count)| (denomination, count)),
    ))
}

fn to_halves(value: Decimal) -> Option<u64> {
    let halves = value * HALVES_PER_UNIT;
    if halves.fract().is_zero() {
        halves.to_u64()
    } else {
        None
    }
}

/// Count taken from each group, or `None` when no exact selection exists.
fn search(target: u64, groups: &[(u64, u64)]) -> Option<Vec<u64>> {
    let suffixes = Suffixes::new(groups);
    let mut dead_ends: HashSet<(usize, u64)> = HashSet::new();
    let mut frames = vec![Frame::fresh(0, target)];

    while let Some(top) = frames.last_mut() {
        let Some(taken) = top.taken else {
            if top.remaining == 0 {
                let mut selection = vec![0; groups.len()];
                for frame in &frames {
                    if let Some(taken) = frame.taken {
                        selection[frame.group] = taken;
                    }
                }
                return Some(selection);
            }
            if top.group == groups.len()
                || !suffixes.can_reach(top.group, top.remaining)
                || dead_ends.contains(&(top.group, top.remaining))
            {
                frames.pop();
                continue;
            }

            let (value, count) = groups[top.group];
            let most = if value == 0 { 0 } else { count.min(top.remaining / value) };
            let rest = suffixes.totals[top.group + 1];
            top.least = match top.remaining.checked_sub(rest) {
                Some(excess) if excess > 0 && value > 0 => excess.div_ceil(value),
                _ => 0,
            };
            if top.least > most {
                dead_ends.insert((top.group, top.remaining));
                frames.pop();
                continue;
            }
            top.taken = Some(most);
            let next = Frame::fresh(top.group + 1, top.remaining - most * value);
            frames.push(next);
            continue;
        };

        // The child for `taken` failed; try one unit fewer.
        if taken == top.least {
            dead_ends.insert((top.group, top.remaining));
            frames.pop();
            continue;
        }
        let fewer = taken - 1;
        top.taken = Some(fewer);
        let next = Frame::fresh(top.group + 1, top.remaining - fewer * groups[top.group].0);
        frames.push(next);
    }
    None
}
