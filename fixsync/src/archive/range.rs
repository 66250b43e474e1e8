//! Compact labels for sets of sequence numbers.
//!
//! The label becomes part of the installer filename (`FIX_<label>.exe`), so
//! it has to stay short: consecutive runs collapse to `start-end`, and an
//! overlong label falls back to `first...last(count_items)`.

use std::collections::BTreeSet;

/// Label used when no sequence numbers were processed.
pub const EMPTY_RANGE_LABEL: &str = "№";

/// Longest label emitted before switching to the overflow form.
pub const MAX_RANGE_LABEL_LEN: usize = 30;

/// Collapse sequence numbers into a compact label.
///
/// Input may contain duplicates and be in any order.
///
/// # Examples
///
/// ```
/// use fixsync::archive::format_sequence_range;
///
/// assert_eq!(format_sequence_range([1, 2, 3, 5, 7, 8, 9]), "1-3,5,7-9");
/// assert_eq!(format_sequence_range([5]), "5");
/// assert_eq!(format_sequence_range([7, 3, 3]), "3,7");
/// assert_eq!(format_sequence_range(Vec::<u32>::new()), "№");
/// ```
pub fn format_sequence_range(numbers: impl IntoIterator<Item = u32>) -> String {
    let sorted: Vec<u32> = numbers
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    match sorted.as_slice() {
        [] => EMPTY_RANGE_LABEL.to_string(),
        [single] => single.to_string(),
        [first, .., last] => {
            let label = collapse_runs(&sorted).join(",");
            if label.len() > MAX_RANGE_LABEL_LEN {
                format!("{}...{}({}_items)", first, last, sorted.len())
            } else {
                label
            }
        }
    }
}

/// Turn a sorted, deduplicated slice into `start-end` / `n` tokens.
fn collapse_runs(sorted: &[u32]) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut iter = sorted.iter().copied();

    let Some(mut start) = iter.next() else {
        return tokens;
    };
    let mut end = start;

    for value in iter {
        if end.checked_add(1) == Some(value) {
            end = value;
            continue;
        }
        tokens.push(run_token(start, end));
        start = value;
        end = value;
    }
    tokens.push(run_token(start, end));

    tokens
}

fn run_token(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mixed_runs() {
        assert_eq!(format_sequence_range([1, 2, 3, 5, 7, 8, 9]), "1-3,5,7-9");
    }

    #[test]
    fn test_unsorted_with_duplicates() {
        assert_eq!(format_sequence_range([9, 1, 8, 2, 7, 3, 5, 5]), "1-3,5,7-9");
    }

    #[test]
    fn test_two_consecutive_values() {
        assert_eq!(format_sequence_range([4, 5]), "4-5");
    }

    #[test]
    fn test_isolated_values() {
        assert_eq!(format_sequence_range([3, 7]), "3,7");
    }

    #[test]
    fn test_empty() {
        assert_eq!(format_sequence_range(std::iter::empty()), EMPTY_RANGE_LABEL);
    }

    #[test]
    fn test_overflow_form() {
        // Every other number from 1 to 39: "1,3,5,...,39" is well over 30 chars.
        let numbers: Vec<u32> = (1..40).step_by(2).collect();
        assert_eq!(format_sequence_range(numbers), "1...39(20_items)");
    }

    #[test]
    fn test_label_under_limit_is_kept() {
        let numbers = [1000, 1002, 1004, 1006, 1008, 1010];
        let label = format_sequence_range(numbers);
        assert_eq!(label.len(), 29);
        assert_eq!(label, "1000,1002,1004,1006,1008,1010");
    }

    #[test]
    fn test_long_run_stays_compact() {
        assert_eq!(format_sequence_range(1..=500), "1-500");
    }

    proptest! {
        #[test]
        fn prop_label_is_bounded_or_overflow(values in proptest::collection::vec(0u32..10_000, 0..64)) {
            let label = format_sequence_range(values.clone());
            let distinct: BTreeSet<u32> = values.into_iter().collect();
            if distinct.len() > 1 && label.contains("...") {
                let suffix = format!("({}_items)", distinct.len());
                prop_assert!(label.ends_with(&suffix), "{} lacks {}", label, suffix);
            } else if distinct.len() > 1 {
                prop_assert!(label.len() <= MAX_RANGE_LABEL_LEN);
            }
        }

        #[test]
        fn prop_order_does_not_matter(mut values in proptest::collection::vec(0u32..200, 0..32)) {
            let forward = format_sequence_range(values.clone());
            values.reverse();
            prop_assert_eq!(forward, format_sequence_range(values));
        }
    }
}
