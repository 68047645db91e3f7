//! Volume-matching arithmetic for the binary ("weak leg") bonus.
//!
//! A member accrues aggregate volume on each leg of their subtree. Volume
//! that has a counterpart on the opposite leg is "matched" and has already
//! paid out; the bonus owed next is a configurable percentage of the
//! smaller unmatched balance's deficit. This module is a pure function of
//! the reported snapshot; it performs no I/O and keeps no state.

use crate::index::Side;
use arrayvec::ArrayVec;

/// Per-member aggregate volumes, as reported by the remote store.
///
/// All amounts are in the smallest currency unit. The snapshot is an input
/// only; nothing in the core mutates it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSnapshot {
    /// Staking volume of the left subtree.
    pub volume_left: u128,
    /// Staking volume of the right subtree.
    pub volume_right: u128,
    /// Betting volume of the left subtree.
    pub bets_left: u128,
    /// Betting volume of the right subtree.
    pub bets_right: u128,
    /// Left volume already matched in previous payouts.
    pub matched_left: u128,
    /// Right volume already matched in previous payouts.
    pub matched_right: u128,
}

impl VolumeSnapshot {
    /// Contributing volume of the left leg.
    ///
    /// Bets contribute at 1% weight, truncating toward zero. The truncation
    /// is the documented weighting, not a rounding bug.
    pub fn total_left(&self) -> u128 {
        self.volume_left + self.bets_left / 100
    }

    /// Contributing volume of the right leg. See [`Self::total_left`].
    pub fn total_right(&self) -> u128 {
        self.volume_right + self.bets_right / 100
    }
}

/// A data-integrity warning: matched volume exceeded contributing volume on
/// one leg, indicating a stale or inconsistent snapshot. The corresponding
/// unmatched figure was clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInconsistency {
    /// The leg whose matched volume overran.
    pub leg: Side,
    /// The reported matched volume.
    pub matched: u128,
    /// The contributing volume it should not have exceeded.
    pub total: u128,
}

/// The outcome of a matching computation.
///
/// Figures are clamped at zero, never negative; any clamping is reported in
/// `warnings` rather than silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingResult {
    /// The leg with the larger unmatched balance. Ties resolve to
    /// [`Side::Right`]: the left leg is strong only when strictly larger.
    pub strong_leg: Side,
    /// Unmatched balance of the left leg.
    pub unmatched_left: u128,
    /// Unmatched balance of the right leg.
    pub unmatched_right: u128,
    /// How far the weak leg trails the strong one.
    pub weak_leg_deficit: u128,
    /// The bonus owed on the weak-leg deficit at the supplied rate.
    pub weak_leg_bonus: u128,
    /// Data-integrity warnings encountered, at most one per leg.
    pub warnings: ArrayVec<VolumeInconsistency, 2>,
}

/// Compute unmatched balances and the weak-leg bonus for one member.
///
/// `bonus_rate` is a percentage (8 means 8%). Bonus tiers differ between
/// program variants, so the rate is always caller-supplied and never
/// defaulted here.
pub fn compute_matching(snapshot: &VolumeSnapshot, bonus_rate: u128) -> MatchingResult {
    let mut warnings = ArrayVec::new();

    let total_left = snapshot.total_left();
    let total_right = snapshot.total_right();

    if snapshot.matched_left > total_left {
        warnings.push(VolumeInconsistency {
            leg: Side::Left,
            matched: snapshot.matched_left,
            total: total_left,
        });
    }
    if snapshot.matched_right > total_right {
        warnings.push(VolumeInconsistency {
            leg: Side::Right,
            matched: snapshot.matched_right,
            total: total_right,
        });
    }

    let unmatched_left = total_left.saturating_sub(snapshot.matched_left);
    let unmatched_right = total_right.saturating_sub(snapshot.matched_right);

    let strong_leg = if unmatched_left > unmatched_right {
        Side::Left
    } else {
        Side::Right
    };
    let weak_leg_deficit = unmatched_left.abs_diff(unmatched_right);

    MatchingResult {
        strong_leg,
        unmatched_left,
        unmatched_right,
        weak_leg_deficit,
        weak_leg_bonus: weak_leg_deficit * bonus_rate / 100,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_balances_and_bonus() {
        let snapshot = VolumeSnapshot {
            volume_left: 1000,
            volume_right: 400,
            matched_left: 200,
            matched_right: 100,
            ..Default::default()
        };
        let result = compute_matching(&snapshot, 8);
        assert_eq!(result.unmatched_left, 800);
        assert_eq!(result.unmatched_right, 300);
        assert_eq!(result.strong_leg, Side::Left);
        assert_eq!(result.weak_leg_deficit, 500);
        assert_eq!(result.weak_leg_bonus, 40);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn bets_contribute_at_one_percent_truncating() {
        let snapshot = VolumeSnapshot {
            volume_left: 10,
            bets_left: 199,
            volume_right: 10,
            bets_right: 100,
            ..Default::default()
        };
        // 199 / 100 truncates to 1.
        assert_eq!(snapshot.total_left(), 11);
        assert_eq!(snapshot.total_right(), 11);
    }

    #[test]
    fn overrun_matched_is_clamped_and_reported() {
        let snapshot = VolumeSnapshot {
            volume_left: 100,
            matched_left: 150,
            volume_right: 300,
            matched_right: 50,
            ..Default::default()
        };
        let result = compute_matching(&snapshot, 8);
        assert_eq!(result.unmatched_left, 0);
        assert_eq!(result.unmatched_right, 250);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.warnings[0],
            VolumeInconsistency {
                leg: Side::Left,
                matched: 150,
                total: 100,
            },
        );
    }

    #[test]
    fn tie_resolves_to_right() {
        let snapshot = VolumeSnapshot {
            volume_left: 500,
            volume_right: 500,
            ..Default::default()
        };
        let result = compute_matching(&snapshot, 8);
        assert_eq!(result.strong_leg, Side::Right);
        assert_eq!(result.weak_leg_deficit, 0);
        assert_eq!(result.weak_leg_bonus, 0);
    }

    #[test]
    fn zero_rate_pays_nothing() {
        let snapshot = VolumeSnapshot {
            volume_left: 1000,
            ..Default::default()
        };
        let result = compute_matching(&snapshot, 0);
        assert_eq!(result.weak_leg_bonus, 0);
        assert_eq!(result.weak_leg_deficit, 1000);
    }
}
