//! Property tests for the engine's universal invariants: mode equivalence,
//! swap symmetry, conjunction-as-intersection, non-match completeness,
//! first/last determinism, closest-under-distance, cardinality enforcement,
//! and no-input-mutation.

use proptest::prelude::*;

use joinkit_engine::{
    by_distance, by_key2, by_pred, join_indices, scalar_accessor, Cardinality, DistanceMetric,
    EngineConfig, JoinIndexResult, JoinOptions, Mode, Multi, Operator, PredAccessor, RadiusPred,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rec {
    key: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct Pt {
    x: f32,
}

fn small_points() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-5i32..6, 0..10).prop_map(|v| v.into_iter().map(|x| x as f32).collect())
}

fn small_keys() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..6, 0..12)
}

fn flat_pairs(result: JoinIndexResult) -> Vec<(Option<usize>, Option<usize>)> {
    match result {
        JoinIndexResult::Flat(pairs) => pairs,
        other => panic!("expected flat result, got {other:?}"),
    }
}

proptest! {
    /// Property 1: every mode capable of an equi-join condition returns the
    /// same set of (i_L, i_R) pairs as the unindexed NestedLoop oracle.
    #[test]
    fn mode_equivalence_for_equi_join(left_keys in small_keys(), right_keys in small_keys()) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let oracle = flat_pairs(
            join_indices(&left, &right, &cond, &JoinOptions::inner().with_mode(Mode::NestedLoop), &config)
                .unwrap(),
        );

        for mode in [Mode::Hash, Mode::Sort, Mode::SortChain] {
            let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
            let opts = JoinOptions::inner().with_mode(mode);
            let got = flat_pairs(join_indices(&left, &right, &cond, &opts, &config).unwrap());
            prop_assert_eq!(got, oracle.clone());
        }
    }

    /// Property 2: swapping L and R and swapping the condition accessors
    /// yields the mirrored pair set.
    #[test]
    fn swap_symmetry(left_keys in small_keys(), right_keys in small_keys()) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let forward = flat_pairs(
            join_indices(&left, &right, &cond, &JoinOptions::inner(), &config).unwrap(),
        );

        let swapped_cond = by_key2(|r: &Rec| r.key, |l: &Rec| l.key);
        let backward = flat_pairs(
            join_indices(&right, &left, &swapped_cond, &JoinOptions::inner(), &config).unwrap(),
        );

        let mut forward_mirrored: Vec<_> = forward.iter().map(|&(a, b)| (b, a)).collect();
        let mut backward_sorted = backward.clone();
        forward_mirrored.sort();
        backward_sorted.sort();
        prop_assert_eq!(forward_mirrored, backward_sorted);
    }

    /// Property 3: a conjunction of two equi-join conditions on the same key
    /// produces exactly the same pairs as the single condition alone (the
    /// second conjunct is redundant, so conjunction degenerates to
    /// intersection with itself).
    #[test]
    fn conjunction_of_identical_conditions_is_intersection(
        left_keys in small_keys(), right_keys in small_keys()
    ) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();

        let single = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let single_result = flat_pairs(
            join_indices(&left, &right, &single, &JoinOptions::inner(), &config).unwrap(),
        );

        let a = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let b = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let anded = a.and(b);
        let anded_result = flat_pairs(
            join_indices(&left, &right, &anded, &JoinOptions::inner(), &config).unwrap(),
        );

        prop_assert_eq!(single_result, anded_result);
    }

    /// Property 4: a left join's output, restricted to rows with `i_R =
    /// None`, is exactly the set of left indices absent from the inner
    /// join's matched set.
    #[test]
    fn non_match_completeness(left_keys in small_keys(), right_keys in small_keys()) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let inner = flat_pairs(
            join_indices(&left, &right, &cond, &JoinOptions::inner(), &config).unwrap(),
        );
        let matched: std::collections::BTreeSet<usize> =
            inner.iter().filter_map(|&(l, _)| l).collect();

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let left_joined = flat_pairs(
            join_indices(&left, &right, &cond, &JoinOptions::left_join(), &config).unwrap(),
        );
        let non_matched: std::collections::BTreeSet<usize> = left_joined
            .iter()
            .filter_map(|&(l, r)| if r.is_none() { l } else { None })
            .collect();

        let all_left: std::collections::BTreeSet<usize> = (0..left.len()).collect();
        let expected_non_matched: std::collections::BTreeSet<usize> =
            all_left.difference(&matched).copied().collect();
        prop_assert_eq!(non_matched, expected_non_matched);
    }

    /// Property 5: `multi = first`/`last` is deterministic and always picks
    /// the minimum/maximum right index among the raw candidate set.
    #[test]
    fn first_last_pick_min_max_index(left_keys in small_keys(), right_keys in small_keys()) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let all = flat_pairs(
            join_indices(&left, &right, &cond, &JoinOptions::inner(), &config).unwrap(),
        );
        let mut by_left: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
        for (l, r) in all {
            if let (Some(l), Some(r)) = (l, r) {
                by_left.entry(l).or_default().push(r);
            }
        }

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let opts = JoinOptions::inner().with_multi(Multi::First);
        let first = flat_pairs(join_indices(&left, &right, &cond, &opts, &config).unwrap());
        for (l, r) in first {
            if let (Some(l), Some(r)) = (l, r) {
                prop_assert_eq!(Some(&r), by_left.get(&l).map(|v| v.iter().min().unwrap()));
            }
        }

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let opts = JoinOptions::inner().with_multi(Multi::Last);
        let last = flat_pairs(join_indices(&left, &right, &cond, &opts, &config).unwrap());
        for (l, r) in last {
            if let (Some(l), Some(r)) = (l, r) {
                prop_assert_eq!(Some(&r), by_left.get(&l).map(|v| v.iter().max().unwrap()));
            }
        }
    }

    /// Property 6: for a `by_distance` condition with `multi = Closest`, the
    /// emitted right index (when any exists) minimizes the condition's own
    /// metric distance over every right index within the radius, ties
    /// broken by smallest `i_R`.
    #[test]
    fn closest_by_distance_matches_value_oracle(
        left_xs in small_points(), right_xs in small_points()
    ) {
        let left: Vec<Pt> = left_xs.into_iter().map(|x| Pt { x }).collect();
        let right: Vec<Pt> = right_xs.into_iter().map(|x| Pt { x }).collect();
        let config = EngineConfig::default();
        let radius = 2.0f64;

        let cond = by_distance(
            |p: &Pt| vec![p.x],
            DistanceMetric::Euclidean,
            RadiusPred::Le(radius),
        );
        let opts = JoinOptions::inner().with_multi(Multi::Closest);
        let pairs = flat_pairs(join_indices(&left, &right, &cond, &opts, &config).unwrap());
        let mut got: std::collections::BTreeMap<usize, usize> = Default::default();
        for (l, r) in pairs {
            if let (Some(l), Some(r)) = (l, r) {
                got.insert(l, r);
            }
        }

        for (i_l, l) in left.iter().enumerate() {
            let oracle = right
                .iter()
                .enumerate()
                .map(|(i_r, r)| (i_r, ((l.x - r.x) as f64).abs()))
                .filter(|&(_, d)| d <= radius)
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)))
                .map(|(i_r, _)| i_r);
            prop_assert_eq!(got.get(&i_l).copied(), oracle);
        }
    }

    /// Property 6 (ordered `ByPred` variant): for `Lt`/`Le`/`Gt`/`Ge` with
    /// `multi = Closest`, the emitted right index is the one whose value is
    /// nearest to the left value among those satisfying the operator (not
    /// merely the smallest/largest raw candidate index).
    #[test]
    fn closest_by_pred_matches_value_oracle(left_keys in small_keys(), right_keys in small_keys()) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();

        for op in [Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge] {
            let left_acc: PredAccessor<Rec> = scalar_accessor(|r: &Rec| r.key);
            let right_acc: PredAccessor<Rec> = scalar_accessor(|r: &Rec| r.key);
            let cond = by_pred(left_acc, op, right_acc);
            let opts = JoinOptions::inner().with_multi(Multi::Closest);
            let pairs = flat_pairs(join_indices(&left, &right, &cond, &opts, &config).unwrap());
            let mut got: std::collections::BTreeMap<usize, usize> = Default::default();
            for (l, r) in pairs {
                if let (Some(l), Some(r)) = (l, r) {
                    got.insert(l, r);
                }
            }

            for (i_l, l) in left.iter().enumerate() {
                let matches = right.iter().enumerate().filter(|(_, r)| match op {
                    Operator::Lt => l.key < r.key,
                    Operator::Le => l.key <= r.key,
                    Operator::Gt => l.key > r.key,
                    Operator::Ge => l.key >= r.key,
                    _ => unreachable!(),
                });
                let oracle = match op {
                    Operator::Lt | Operator::Le => matches
                        .min_by(|a, b| a.1.key.cmp(&b.1.key).then(a.0.cmp(&b.0)))
                        .map(|(i_r, _)| i_r),
                    Operator::Gt | Operator::Ge => matches
                        .max_by(|a, b| a.1.key.cmp(&b.1.key).then(b.0.cmp(&a.0)))
                        .map(|(i_r, _)| i_r),
                    _ => unreachable!(),
                };
                prop_assert_eq!(got.get(&i_l).copied(), oracle);
            }
        }
    }

    /// Property 7: if a left element's observed match count falls outside
    /// the asserted cardinality, `join_indices` errors rather than silently
    /// returning a result.
    #[test]
    fn cardinality_enforcement(left_keys in small_keys(), right_keys in small_keys()) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let inner = flat_pairs(
            join_indices(&left, &right, &cond, &JoinOptions::inner(), &config).unwrap(),
        );
        let mut counts = vec![0usize; left.len()];
        for (l, _) in inner {
            if let Some(l) = l {
                counts[l] += 1;
            }
        }
        let violates_exactly_one = counts.iter().any(|&c| c != 1);

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let opts = JoinOptions::inner().with_cardinality_left(Cardinality::Exact(1));
        let result = join_indices(&left, &right, &cond, &opts, &config);
        prop_assert_eq!(result.is_err(), violates_exactly_one);
    }

    /// Property 8: `join_indices` never mutates either input collection.
    #[test]
    fn no_input_mutation(left_keys in small_keys(), right_keys in small_keys()) {
        let left: Vec<Rec> = left_keys.into_iter().map(|key| Rec { key }).collect();
        let right: Vec<Rec> = right_keys.into_iter().map(|key| Rec { key }).collect();
        let config = EngineConfig::default();
        let before_left = left.clone();
        let before_right = right.clone();

        let cond = by_key2(|l: &Rec| l.key, |r: &Rec| r.key);
        let _ = join_indices(&left, &right, &cond, &JoinOptions::inner(), &config);

        prop_assert_eq!(&left, &before_left);
        prop_assert_eq!(&right, &before_right);
    }
}
