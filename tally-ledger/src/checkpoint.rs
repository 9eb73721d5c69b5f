//! Fixed-width checkpoint store
//!
//! A checkpoint records a quantity's value as of a point in a monotonic
//! ordering (the execution context's block number). Each tracked key keeps an
//! append-only sequence of checkpoints; updates landing in the same block
//! coalesce into the in-progress entry instead of appending a new one.
//!
//! Checkpoint values are bounded by the 2^192 - 1 supply ceiling so that an
//! entry always fits a packed 64+192-bit layout. The bound is established at
//! mint time; the store re-asserts it defensively on every write.

use serde::{Deserialize, Serialize};
use tally_common::prelude::*;

/// A single (block, value) checkpoint entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Block number the value was recorded at
    pub block: BlockNumber,
    /// Recorded value; always <= 2^192 - 1
    pub value: U256,
}

/// Direction of a checkpoint adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Add,
    Subtract,
}

/// Append-only checkpoint sequence for one tracked key.
///
/// Entries are strictly ascending by block number, except that the final
/// entry may be amended in place while its block is still the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<Checkpoint>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Checkpoint] {
        &self.entries
    }

    /// Value of the most recent checkpoint, or zero for an empty history
    pub fn latest(&self) -> U256 {
        self.entries.last().map(|c| c.value).unwrap_or(U256::ZERO)
    }

    /// Apply a delta to the tracked quantity at the given block.
    ///
    /// Reads the last recorded value (zero if empty), applies the delta, and
    /// either amends the final entry in place (same block) or appends a new
    /// one. Returns `(from_value, to_value)` for event emission.
    ///
    /// Subtraction below zero is unreachable when callers uphold the balance
    /// invariants; it is still checked and surfaces as `Underflow` rather
    /// than wrapping.
    pub fn append_or_merge(
        &mut self,
        block: BlockNumber,
        delta: U256,
        op: Adjust,
    ) -> TokenResult<(U256, U256)> {
        debug_assert!(
            self.entries.last().map_or(true, |last| block >= last.block),
            "checkpoint blocks must be non-decreasing"
        );

        let from_value = self.latest();
        let to_value = match op {
            Adjust::Add => from_value.checked_add(delta).ok_or(TokenError::Overflow)?,
            Adjust::Subtract => from_value.checked_sub(delta).ok_or(TokenError::Underflow)?,
        };

        // Unreachable given the mint-time ceiling; asserted anyway so a bug
        // upstream cannot write a value the packed layout cannot hold.
        if to_value > VOTING_SUPPLY_CEILING {
            return Err(TokenError::SupplyCeilingExceeded);
        }

        match self.entries.last_mut() {
            Some(last) if last.block == block => last.value = to_value,
            _ => self.entries.push(Checkpoint { block, value: to_value }),
        }

        Ok((from_value, to_value))
    }

    /// Point-in-time lookup: the value as of `target`.
    ///
    /// Returns zero for an empty history or a target before the first entry,
    /// the final value for a target at or past the last entry, and otherwise
    /// the rightmost entry recorded at or before `target` via binary search.
    ///
    /// Callers querying "history" semantics must pass a target strictly less
    /// than the current block; that precondition is theirs to enforce.
    pub fn lookup_at(&self, target: BlockNumber) -> U256 {
        let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) else {
            return U256::ZERO;
        };

        // Fast path: most queries are near "now"
        if target >= last.block {
            return last.value;
        }
        if target < first.block {
            return U256::ZERO;
        }

        // Rightmost entry with block <= target. The invariant throughout is
        // entries[lo].block <= target < entries[hi + 1].block.
        let mut lo = 0usize;
        let mut hi = self.entries.len() - 1;
        while lo < hi {
            let mid = hi - (hi - lo) / 2;
            let entry = &self.entries[mid];
            if entry.block == target {
                return entry.value;
            }
            if entry.block < target {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        self.entries[lo].value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(points: &[(u64, u64)]) -> History {
        let mut history = History::new();
        let mut prev = U256::ZERO;
        for &(block, value) in points {
            let value = U256::from(value);
            let (op, delta) = if value >= prev {
                (Adjust::Add, value - prev)
            } else {
                (Adjust::Subtract, prev - value)
            };
            history.append_or_merge(block, delta, op).unwrap();
            prev = value;
        }
        history
    }

    #[test]
    fn empty_history_reads_zero() {
        let history = History::new();
        assert_eq!(history.lookup_at(0), U256::ZERO);
        assert_eq!(history.lookup_at(u64::MAX), U256::ZERO);
        assert_eq!(history.latest(), U256::ZERO);
    }

    #[test]
    fn lookup_before_first_entry_is_zero() {
        let history = history_of(&[(10, 100), (20, 250)]);
        assert_eq!(history.lookup_at(9), U256::ZERO);
        assert_eq!(history.lookup_at(0), U256::ZERO);
    }

    #[test]
    fn lookup_at_or_after_last_takes_fast_path() {
        let history = history_of(&[(10, 100), (20, 250)]);
        assert_eq!(history.lookup_at(20), U256::from(250));
        assert_eq!(history.lookup_at(10_000), U256::from(250));
    }

    #[test]
    fn lookup_exact_and_between_entries() {
        let history = history_of(&[(10, 100), (20, 250), (30, 75), (45, 300)]);
        // Exact matches
        assert_eq!(history.lookup_at(10), U256::from(100));
        assert_eq!(history.lookup_at(20), U256::from(250));
        assert_eq!(history.lookup_at(30), U256::from(75));
        // Between entries the previous value holds
        assert_eq!(history.lookup_at(15), U256::from(100));
        assert_eq!(history.lookup_at(29), U256::from(250));
        assert_eq!(history.lookup_at(44), U256::from(75));
    }

    #[test]
    fn lookup_is_stable_across_repeated_queries() {
        let history = history_of(&[(1, 10), (5, 20), (9, 15)]);
        for _ in 0..3 {
            assert_eq!(history.lookup_at(5), U256::from(20));
        }
    }

    #[test]
    fn same_block_updates_coalesce() {
        let mut history = History::new();
        history.append_or_merge(7, U256::from(100), Adjust::Add).unwrap();
        history.append_or_merge(7, U256::from(50), Adjust::Add).unwrap();
        history.append_or_merge(7, U256::from(30), Adjust::Subtract).unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0], Checkpoint { block: 7, value: U256::from(120) });

        history.append_or_merge(8, U256::from(1), Adjust::Add).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn append_reports_from_and_to_values() {
        let mut history = History::new();
        let (from, to) = history.append_or_merge(1, U256::from(500), Adjust::Add).unwrap();
        assert_eq!((from, to), (U256::ZERO, U256::from(500)));

        let (from, to) = history.append_or_merge(2, U256::from(200), Adjust::Subtract).unwrap();
        assert_eq!((from, to), (U256::from(500), U256::from(300)));
    }

    #[test]
    fn subtract_below_zero_is_rejected() {
        let mut history = History::new();
        history.append_or_merge(1, U256::from(10), Adjust::Add).unwrap();
        let err = history.append_or_merge(2, U256::from(11), Adjust::Subtract);
        assert!(matches!(err, Err(TokenError::Underflow)));
    }

    #[test]
    fn values_past_the_packing_ceiling_are_rejected() {
        let mut history = History::new();
        history
            .append_or_merge(1, VOTING_SUPPLY_CEILING, Adjust::Add)
            .unwrap();
        let err = history.append_or_merge(2, U256::from(1), Adjust::Add);
        assert!(matches!(err, Err(TokenError::SupplyCeilingExceeded)));
    }

    #[test]
    fn blocks_are_non_decreasing_and_values_cumulative() {
        let history = history_of(&[(1, 5), (3, 12), (3, 12), (8, 4)]);
        let entries = history.entries();
        for pair in entries.windows(2) {
            assert!(pair[0].block < pair[1].block);
        }
        assert_eq!(history.latest(), U256::from(4));
    }
}
