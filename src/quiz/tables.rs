use std::num::NonZeroU32;

use crate::quiz::{QuestionItem, QuestionSequence};

// Every table covers the factors 0 through 10
const FACTORS: std::ops::RangeInclusive<u32> = 0..=10;

/// Largest table whose every product fits in a `u32`.
pub const MAX_FACTOR: u32 = u32::MAX / 10;

/// `n x x` for every factor `n`, e.g. `7 x 3` -> `21`.
/// Products that do not fit in a `u32` are left out.
pub fn multiplications(x: u32) -> QuestionSequence {
    FACTORS
        .filter_map(|n| {
            let product = n.checked_mul(x)?;
            Some(QuestionItem::new(format!("{} x {}", n, x), product.to_string()))
        })
        .collect()
}

/// `(n * x) : x` for every factor `n`, e.g. `21 : 3` -> `7`.
/// Dividends that do not fit in a `u32` are left out.
pub fn divisions(x: NonZeroU32) -> QuestionSequence {
    let x = x.get();
    FACTORS
        .filter_map(|n| {
            let dividend = n.checked_mul(x)?;
            Some(QuestionItem::new(format!("{} : {}", dividend, x), n.to_string()))
        })
        .collect()
}

/// Multiplications and divisions for all of `factors`, in that order.
/// Division tables are skipped for a zero factor.
pub fn mixed(factors: &[u32]) -> QuestionSequence {
    let mut sets: Vec<QuestionSequence> = factors.iter().map(|&x| multiplications(x)).collect();
    sets.extend(
        factors
            .iter()
            .filter_map(|&x| NonZeroU32::new(x))
            .map(divisions),
    );
    QuestionSequence::concat(&sets)
}
