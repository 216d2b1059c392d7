//! Mode selection.
//!
//! Two decisions live here: which mode serves a single atomic condition,
//! and which child of a `Composite` becomes the anchor. Both consult the
//! static capability table rather than inspecting condition values.

use crate::capability::{capabilities, indexed_modes, AtomicKind, Mode};
use crate::condition::AtomicCondition;
use crate::error::ConfigurationError;

/// Pick the mode for one atomic condition.
///
/// With no pin, this crate additionally excludes `SortChain` from automatic
/// selection alongside `NestedLoop`: `SortChain` only means anything once
/// the caller has asserted the right side is pre-sorted, which nothing in
/// `JoinOptions` models implicitly, so it is available only by explicit
/// pin (see DESIGN.md).
pub fn select_atomic_mode(
    kind: AtomicKind,
    pinned: Option<Mode>,
) -> Result<Mode, ConfigurationError> {
    let caps = capabilities(kind);
    if let Some(mode) = pinned {
        return if caps.contains(&mode) {
            Ok(mode)
        } else {
            Err(ConfigurationError::UnsupportedMode {
                requested: mode,
                supported: caps.to_vec(),
            })
        };
    }
    caps.iter()
        .copied()
        .find(|&m| m != Mode::NestedLoop && m != Mode::SortChain)
        .ok_or(ConfigurationError::NestedLoopRequiresPin)
}

/// Pick the anchor child of a `Composite`:
/// the child whose best indexed mode is most selective, preferring
/// `Hash > Tree > Sort`. Returns `None` when no child supports an indexed
/// mode at all, meaning the whole composite falls back to `NestedLoop` —
/// unlike a bare atomic condition, this fallback is automatic.
pub fn select_anchor<L, R>(
    children: &[AtomicCondition<L, R>],
    pinned: Option<Mode>,
) -> Result<Option<(usize, Mode)>, ConfigurationError> {
    if let Some(mode) = pinned {
        if mode == Mode::NestedLoop {
            return Ok(None);
        }
        for (i, child) in children.iter().enumerate() {
            if capabilities(child.kind()).contains(&mode) {
                return Ok(Some((i, mode)));
            }
        }
        let mut supported = Vec::new();
        for child in children {
            for m in capabilities(child.kind()) {
                if !supported.contains(m) {
                    supported.push(*m);
                }
            }
        }
        return Err(ConfigurationError::UnsupportedMode {
            requested: mode,
            supported,
        });
    }

    const PREFERENCE: [Mode; 3] = [Mode::Hash, Mode::Tree, Mode::Sort];
    for &pref in &PREFERENCE {
        for (i, child) in children.iter().enumerate() {
            if indexed_modes(child.kind()).any(|m| m == pref) {
                return Ok(Some((i, pref)));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{by_key, Condition};

    #[derive(Debug)]
    struct Rec {
        t: i64,
    }

    fn atomic_children(children: Vec<Condition<Rec, Rec>>) -> Vec<AtomicCondition<Rec, Rec>> {
        children
            .into_iter()
            .flat_map(|c| match c {
                Condition::Atomic(a) => vec![a],
                Condition::Composite(cs) => cs,
            })
            .collect()
    }

    #[test]
    fn by_key_auto_selects_hash() {
        let mode = select_atomic_mode(AtomicKind::ByKey, None).unwrap();
        assert_eq!(mode, Mode::Hash);
    }

    #[test]
    fn nested_loop_only_kind_requires_explicit_pin() {
        let err = select_atomic_mode(AtomicKind::ByPredSetRelation, None).unwrap_err();
        assert!(matches!(err, ConfigurationError::NestedLoopRequiresPin));
        let ok = select_atomic_mode(AtomicKind::ByPredSetRelation, Some(Mode::NestedLoop));
        assert!(ok.is_ok());
    }

    #[test]
    fn pinning_unsupported_mode_is_rejected() {
        let err = select_atomic_mode(AtomicKind::ByKey, Some(Mode::Tree)).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedMode { .. }));
    }

    #[test]
    fn anchor_prefers_hash_over_sort() {
        let children = atomic_children(vec![by_key(|r: &Rec| r.t)]);
        let (idx, mode) = select_anchor(&children, None).unwrap().unwrap();
        assert_eq!(idx, 0);
        assert_eq!(mode, Mode::Hash);
    }
}
