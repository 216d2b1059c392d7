//! Result assembler.
//!
//! A pure index-shaping stage. By the time results reach here, mode
//! selection, the `Composite` post-filter, and the `multi` reduction have
//! already happened in `engine.rs` — each left element's candidates are
//! already final. This stage only fills in kept non-matches, builds the
//! flat/grouped shape, and enforces cardinality.

use crate::error::CardinalityError;
use crate::options::{Cardinality, NonMatches, Side, SideOptions};

/// Shape produced by one `core_join` call (always in "grouped by first
/// argument" terms — `engine.rs` relabels this as `GroupedByLeft` or
/// `GroupedByRight` depending on whether sides were swapped for the call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembledIndices {
    /// `(i_L, i_R)` pairs in ascending `i_L`, `None` marking a kept
    /// non-match on that side.
    Flat(Vec<(Option<usize>, Option<usize>)>),
    /// One entry per left element that is either matched or kept as an
    /// empty non-match group, plus the right-side indices that never
    /// matched anything. A grouped-by-left shape has no natural slot for a
    /// bare right non-match (it isn't attached to any left group), so
    /// `right_orphans` is carried alongside rather than folded into
    /// `groups` — see DESIGN.md.
    Grouped {
        groups: Vec<(usize, Vec<usize>)>,
        right_orphans: Vec<usize>,
    },
}

/// Assemble already-filtered, already-`multi`-reduced per-left candidate
/// lists into a flat or left-grouped index result. `candidates[i]` is the
/// final set of right indices matched by left element `i`.
pub fn assemble(
    n_left: usize,
    n_right: usize,
    candidates: &[Vec<usize>],
    left: SideOptions,
    right: SideOptions,
    grouped: bool,
) -> Result<AssembledIndices, CardinalityError> {
    debug_assert_eq!(candidates.len(), n_left);

    let mut seen_right = vec![false; n_right];
    let mut right_counts = vec![0usize; n_right];
    for group in candidates {
        for &i_r in group {
            seen_right[i_r] = true;
            right_counts[i_r] += 1;
        }
    }

    check_cardinality(Side::Left, left.cardinality, candidates.iter().map(Vec::len))?;
    check_cardinality(Side::Right, right.cardinality, right_counts.iter().copied())?;

    let right_orphans: Vec<usize> = if right.nonmatches == NonMatches::Keep {
        (0..n_right).filter(|&j| !seen_right[j]).collect()
    } else {
        Vec::new()
    };

    if grouped {
        let mut groups = Vec::with_capacity(n_left);
        for (i_l, group) in candidates.iter().enumerate() {
            if group.is_empty() && left.nonmatches != NonMatches::Keep {
                continue;
            }
            groups.push((i_l, group.clone()));
        }
        Ok(AssembledIndices::Grouped { groups, right_orphans })
    } else {
        let mut pairs = Vec::new();
        for (i_l, group) in candidates.iter().enumerate() {
            if group.is_empty() {
                if left.nonmatches == NonMatches::Keep {
                    pairs.push((Some(i_l), None));
                }
            } else {
                pairs.extend(group.iter().map(|&i_r| (Some(i_l), Some(i_r))));
            }
        }
        pairs.extend(right_orphans.into_iter().map(|j| (None, Some(j))));
        Ok(AssembledIndices::Flat(pairs))
    }
}

fn check_cardinality(
    side: Side,
    cardinality: Cardinality,
    counts: impl Iterator<Item = usize>,
) -> Result<(), CardinalityError> {
    if matches!(cardinality, Cardinality::Any) {
        return Ok(());
    }
    for (index, observed) in counts.enumerate() {
        if !cardinality.admits(observed) {
            return Err(CardinalityError {
                side,
                index,
                observed,
                expected: cardinality,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_inner_join_drops_empty_groups() {
        let candidates = vec![vec![0, 1], vec![], vec![2]];
        let left = SideOptions::default();
        let right = SideOptions::default();
        let got = assemble(3, 3, &candidates, left, right, false).unwrap();
        assert_eq!(
            got,
            AssembledIndices::Flat(vec![
                (Some(0), Some(0)),
                (Some(0), Some(1)),
                (Some(2), Some(2)),
            ])
        );
    }

    #[test]
    fn left_join_keeps_empty_as_non_match() {
        let candidates = vec![vec![0, 1], vec![], vec![2]];
        let mut left = SideOptions::default();
        left.nonmatches = NonMatches::Keep;
        let right = SideOptions::default();
        let got = assemble(3, 3, &candidates, left, right, false).unwrap();
        assert_eq!(
            got,
            AssembledIndices::Flat(vec![
                (Some(0), Some(0)),
                (Some(0), Some(1)),
                (Some(1), None),
                (Some(2), Some(2)),
            ])
        );
    }

    #[test]
    fn right_nonmatches_keep_appends_orphans_ascending() {
        let candidates = vec![vec![0]];
        let left = SideOptions::default();
        let mut right = SideOptions::default();
        right.nonmatches = NonMatches::Keep;
        let got = assemble(1, 3, &candidates, left, right, false).unwrap();
        assert_eq!(
            got,
            AssembledIndices::Flat(vec![(Some(0), Some(0)), (None, Some(1)), (None, Some(2))])
        );
    }

    #[test]
    fn grouped_by_left_keeps_empty_groups_when_requested() {
        let candidates = vec![vec![0], vec![]];
        let mut left = SideOptions::default();
        left.nonmatches = NonMatches::Keep;
        let right = SideOptions::default();
        let got = assemble(2, 1, &candidates, left, right, true).unwrap();
        assert_eq!(
            got,
            AssembledIndices::Grouped {
                groups: vec![(0, vec![0]), (1, vec![])],
                right_orphans: vec![],
            }
        );
    }

    #[test]
    fn cardinality_violation_reports_first_offending_index() {
        let candidates = vec![vec![0, 1], vec![0]];
        let mut left = SideOptions::default();
        left.cardinality = Cardinality::Exact(1);
        let right = SideOptions::default();
        let err = assemble(2, 2, &candidates, left, right, false).unwrap_err();
        assert_eq!(err.side, Side::Left);
        assert_eq!(err.index, 0);
        assert_eq!(err.observed, 2);
    }
}
