//! End-to-end scenarios covering equi-join, left join, asof/range join,
//! interval containment, self-distance join, and cardinality violation,
//! run verbatim against the public `join_indices` API.

use joinkit_engine::{
    by_distance, by_key2, by_pred, interval_accessor, join_indices, not_same, scalar_accessor,
    Cardinality, DistanceMetric, EngineConfig, Interval, JoinIndexResult, JoinOptions, Multi,
    Operator, PredAccessor, RadiusPred, Side,
};

#[derive(Debug)]
struct Named {
    name: &'static str,
}

#[derive(Debug)]
struct Timed {
    name: &'static str,
    t: i64,
}

fn flat(result: JoinIndexResult) -> Vec<(Option<usize>, Option<usize>)> {
    match result {
        JoinIndexResult::Flat(pairs) => pairs,
        other => panic!("expected flat result, got {other:?}"),
    }
}

#[test]
fn s1_equi_join_inner() {
    let left = vec![
        Named { name: "A" },
        Named { name: "B" },
        Named { name: "D" },
        Named { name: "E" },
    ];
    let right = vec![
        Timed { name: "A", t: 2 },
        Timed { name: "A", t: 3 },
        Timed { name: "B", t: 2 },
    ];
    let cond = by_key2(|l: &Named| l.name.to_string(), |r: &Timed| r.name.to_string());
    let config = EngineConfig::default();
    let pairs = flat(join_indices(&left, &right, &cond, &JoinOptions::inner(), &config).unwrap());
    assert_eq!(
        pairs,
        vec![(Some(0), Some(0)), (Some(0), Some(1)), (Some(1), Some(2))]
    );
}

#[test]
fn s2_left_join_keeps_misses() {
    let left = vec![
        Named { name: "A" },
        Named { name: "B" },
        Named { name: "D" },
        Named { name: "E" },
    ];
    let right = vec![
        Timed { name: "A", t: 2 },
        Timed { name: "A", t: 3 },
        Timed { name: "B", t: 2 },
    ];
    let cond = by_key2(|l: &Named| l.name.to_string(), |r: &Timed| r.name.to_string());
    let config = EngineConfig::default();
    let pairs = flat(join_indices(&left, &right, &cond, &JoinOptions::left_join(), &config).unwrap());
    assert_eq!(
        pairs,
        vec![
            (Some(0), Some(0)),
            (Some(0), Some(1)),
            (Some(1), Some(2)),
            (Some(2), None),
            (Some(3), None),
        ]
    );
}

#[test]
fn s3_asof_via_lt_and_closest() {
    let left = vec![Timed { name: "q", t: 5 }];
    let right = vec![
        Timed { name: "r0", t: 1 },
        Timed { name: "r1", t: 4 },
        Timed { name: "r2", t: 6 },
        Timed { name: "r3", t: 9 },
    ];
    let left_acc: PredAccessor<Timed> = scalar_accessor(|t: &Timed| t.t);
    let right_acc: PredAccessor<Timed> = scalar_accessor(|t: &Timed| t.t);
    let cond = by_pred(left_acc, Operator::Lt, right_acc);
    let opts = JoinOptions::inner().with_multi(Multi::Closest);
    let config = EngineConfig::default();
    let pairs = flat(join_indices(&left, &right, &cond, &opts, &config).unwrap());
    assert_eq!(pairs, vec![(Some(0), Some(2))]);
}

#[test]
fn s4_interval_contains_point() {
    struct Span {
        a: i64,
        b: i64,
    }
    let left = vec![Span { a: 0, b: 3 }];
    let right = vec![
        Timed { name: "r0", t: -1 },
        Timed { name: "r1", t: 0 },
        Timed { name: "r2", t: 2 },
        Timed { name: "r3", t: 3 },
        Timed { name: "r4", t: 4 },
    ];
    let left_acc: PredAccessor<Span> = interval_accessor(|s: &Span| Interval::closed(s.a, s.b));
    let right_acc: PredAccessor<Timed> = scalar_accessor(|t: &Timed| t.t);
    let cond = by_pred(left_acc, Operator::Contains, right_acc);
    let config = EngineConfig::default();
    let pairs = flat(join_indices(&left, &right, &cond, &JoinOptions::inner(), &config).unwrap());
    assert_eq!(
        pairs,
        vec![(Some(0), Some(1)), (Some(0), Some(2)), (Some(0), Some(3))]
    );
}

#[test]
fn s5_distance_join_self_excludes_same_index() {
    #[derive(Debug)]
    struct Point {
        x: f32,
    }
    let points = vec![Point { x: 0.0 }, Point { x: 1.0 }, Point { x: 5.0 }];
    let dist_cond = by_distance(|p: &Point| vec![p.x], DistanceMetric::Euclidean, RadiusPred::Le(1.0));
    let cond = dist_cond.and(not_same());
    let config = EngineConfig::default();
    let pairs = flat(join_indices(&points, &points, &cond, &JoinOptions::inner(), &config).unwrap());
    assert_eq!(pairs, vec![(Some(0), Some(1)), (Some(1), Some(0))]);
}

#[test]
fn s6_cardinality_violation_reports_offending_side_index_and_count() {
    let left = vec![1i64, 2, 3];
    let right = vec![1i64, 1, 2, 2, 3, 3];
    let cond = by_key2(|l: &i64| *l, |r: &i64| *r);
    let opts = JoinOptions::inner().with_cardinality_left(Cardinality::Exact(1));
    let config = EngineConfig::default();
    let err = join_indices(&left, &right, &cond, &opts, &config).unwrap_err();
    match err {
        joinkit_engine::JoinError::Cardinality(e) => {
            assert_eq!(e.side, Side::Left);
            assert_eq!(e.index, 0);
            assert_eq!(e.observed, 2);
        }
        other => panic!("expected a cardinality error, got {other:?}"),
    }
}
