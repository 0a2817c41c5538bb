use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::tiers::Tier;
use crate::models::UserCalibration;

/// Top of the composite score scale.
pub const SCORE_MAX: u32 = 1000;

/// Resolved forecasts required before any volume credit is awarded.
pub const VOLUME_FLOOR: i32 = 50;

/// Resolved forecasts at which volume credit saturates.
pub const VOLUME_SATURATION: i32 = 500;

/// Brier value assumed when a user has no score yet (uninformative midpoint).
pub const DEFAULT_BRIER: f64 = 0.5;

/// Share of the base weight that every active user receives.
const BASE_SHARE: f64 = 0.5;

/// Weight partition of the composite score. The four weights sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub accuracy: f64,
    pub calibration: f64,
    pub volume: f64,
    pub base: f64,
}

impl ScoringWeights {
    pub const DEFAULT: ScoringWeights = ScoringWeights {
        accuracy: 0.55,
        calibration: 0.35,
        volume: 0.05,
        base: 0.05,
    };

    pub fn total(&self) -> f64 {
        self.accuracy + self.calibration + self.volume + self.base
    }

    /// Blend raw calibration statistics into a 0..=1000 score.
    pub fn composite_score(
        &self,
        total_forecasts: i32,
        resolved_forecasts: i32,
        avg_brier_score: Option<f64>,
        avg_time_weighted_brier: Option<f64>,
    ) -> u32 {
        if total_forecasts <= 0 {
            return 0;
        }

        let max = SCORE_MAX as f64;

        // Brier is an error measure, so invert before weighting.
        let brier_component =
            (1.0 - avg_brier_score.unwrap_or(DEFAULT_BRIER)) * max * self.accuracy;
        let calibration_component =
            (1.0 - avg_time_weighted_brier.unwrap_or(DEFAULT_BRIER)) * max * self.calibration;

        let volume_bonus = if resolved_forecasts >= VOLUME_FLOOR {
            let saturation = (resolved_forecasts as f64 / VOLUME_SATURATION as f64).min(1.0);
            saturation * max * self.volume
        } else {
            0.0
        };

        let base_bonus = self.base * max * BASE_SHARE;

        let total = brier_component + calibration_component + volume_bonus + base_bonus;
        total.round().clamp(0.0, max) as u32
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Composite score with the default weight table.
pub fn composite_score(
    total_forecasts: i32,
    resolved_forecasts: i32,
    avg_brier_score: Option<f64>,
    avg_time_weighted_brier: Option<f64>,
) -> u32 {
    ScoringWeights::DEFAULT.composite_score(
        total_forecasts,
        resolved_forecasts,
        avg_brier_score,
        avg_time_weighted_brier,
    )
}

/// Composite score for a stored calibration row.
pub fn score_calibration(calibration: &UserCalibration) -> u32 {
    composite_score(
        calibration.total_forecasts,
        calibration.resolved_forecasts,
        calibration.avg_brier_score,
        calibration.avg_time_weighted_brier,
    )
}

// ---------------------------------------------------------------------------
// Tier progress
// ---------------------------------------------------------------------------

/// Display-only progress through the current tier, in [0, 1].
///
/// The top tier keeps tracking improvement from its own threshold up to
/// [`SCORE_MAX`].
pub fn tier_progress(score: u32, current_tier: Tier) -> f64 {
    let low = current_tier.threshold() as f64;
    let high = current_tier
        .next()
        .map(|t| t.threshold())
        .unwrap_or(SCORE_MAX) as f64;

    if high <= low {
        return 1.0;
    }

    ((score as f64 - low) / (high - low)).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tier transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierDirection {
    Up,
    Down,
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChange {
    pub changed: bool,
    pub direction: TierDirection,
    pub delta: usize,
    pub should_celebrate: bool,
}

/// Compare two tiers. Only promotions are celebrated.
pub fn detect_tier_change(previous: Tier, new: Tier) -> TierChange {
    let direction = match new.ordinal().cmp(&previous.ordinal()) {
        Ordering::Greater => TierDirection::Up,
        Ordering::Less => TierDirection::Down,
        Ordering::Equal => TierDirection::Same,
    };
    let changed = previous != new;

    TierChange {
        changed,
        direction,
        delta: new.ordinal().abs_diff(previous.ordinal()),
        should_celebrate: changed && direction == TierDirection::Up,
    }
}

// ---------------------------------------------------------------------------
// Profile / leaderboard view
// ---------------------------------------------------------------------------

/// Reputation view of one user, as served on profile and leaderboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reputation {
    pub user_id: String,
    pub composite_score: u32,
    pub tier: Tier,
    pub tier_progress: f64,
    pub next_tier: Option<Tier>,
    pub next_tier_threshold: Option<u32>,
    pub global_rank: Option<i32>,
    pub total_forecasts: i32,
    pub resolved_forecasts: i32,
    pub avg_brier_score: Option<f64>,
    pub avg_time_weighted_brier: Option<f64>,
}

pub fn score_user(calibration: &UserCalibration) -> Reputation {
    let score = score_calibration(calibration);
    let tier = calibration.current_tier;

    Reputation {
        user_id: calibration.user_id.clone(),
        composite_score: score,
        tier,
        tier_progress: tier_progress(score, tier),
        next_tier: tier.next(),
        next_tier_threshold: tier.next().map(Tier::threshold),
        global_rank: calibration.global_rank,
        total_forecasts: calibration.total_forecasts,
        resolved_forecasts: calibration.resolved_forecasts,
        avg_brier_score: calibration.avg_brier_score,
        avg_time_weighted_brier: calibration.avg_time_weighted_brier,
    }
}

/// Score and order rows for the leaderboard: composite score descending,
/// then global rank ascending with unranked users last, then user id.
pub fn rank_leaderboard(rows: &[UserCalibration], limit: usize) -> Vec<Reputation> {
    let mut entries: Vec<Reputation> = rows.iter().map(score_user).collect();

    entries.sort_by(|a, b| {
        b.composite_score
            .cmp(&a.composite_score)
            .then_with(|| match (a.global_rank, b.global_rank) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    entries.truncate(limit);
    entries
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration(user: &str, total: i32, resolved: i32, brier: f64, tw: f64) -> UserCalibration {
        UserCalibration {
            total_forecasts: total,
            resolved_forecasts: resolved,
            avg_brier_score: Some(brier),
            avg_time_weighted_brier: Some(tw),
            ..UserCalibration::new(user)
        }
    }

    #[test]
    fn test_weights_partition_sums_to_one() {
        assert!((ScoringWeights::DEFAULT.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_composite_score_worked_example() {
        // 440 + 287 + 8 + 25
        assert_eq!(composite_score(100, 80, Some(0.2), Some(0.18)), 760);
    }

    #[test]
    fn test_no_forecasts_scores_zero() {
        assert_eq!(composite_score(0, 0, Some(0.0), Some(0.0)), 0);
        assert_eq!(composite_score(0, 120, None, None), 0);
    }

    #[test]
    fn test_missing_brier_defaults_to_midpoint() {
        // 275 + 175 + 0 + 25
        assert_eq!(composite_score(10, 0, None, None), 475);
        assert_eq!(
            composite_score(10, 0, None, None),
            composite_score(10, 0, Some(0.5), Some(0.5))
        );
    }

    #[test]
    fn test_volume_bonus_needs_floor() {
        let below = composite_score(100, 49, Some(0.2), Some(0.2));
        let at = composite_score(100, 50, Some(0.2), Some(0.2));
        // 50 / 500 * 1000 * 0.05 = 5
        assert_eq!(at - below, 5);
    }

    #[test]
    fn test_volume_bonus_saturates() {
        let at_cap = composite_score(2000, 500, Some(0.1), Some(0.1));
        let past_cap = composite_score(2000, 1500, Some(0.1), Some(0.1));
        assert_eq!(at_cap, past_cap);
    }

    #[test]
    fn test_perfect_forecaster_stays_in_bounds() {
        let score = composite_score(1000, 1000, Some(0.0), Some(0.0));
        // 550 + 350 + 50 + 25
        assert_eq!(score, 975);
        assert!(score <= SCORE_MAX);
    }

    #[test]
    fn test_score_non_increasing_in_error() {
        let mut last_brier = u32::MAX;
        let mut last_tw = u32::MAX;
        for i in 0..=20 {
            let err = i as f64 / 20.0;
            let by_brier = composite_score(200, 120, Some(err), Some(0.3));
            let by_tw = composite_score(200, 120, Some(0.3), Some(err));
            assert!(by_brier <= last_brier);
            assert!(by_tw <= last_tw);
            assert!(by_brier <= SCORE_MAX && by_tw <= SCORE_MAX);
            last_brier = by_brier;
            last_tw = by_tw;
        }
    }

    #[test]
    fn test_tier_progress_mid_band() {
        // Journeyman band is 200..400
        assert!((tier_progress(300, Tier::Journeyman) - 0.5).abs() < 1e-12);
        assert_eq!(tier_progress(150, Tier::Journeyman), 0.0);
        assert_eq!(tier_progress(760, Tier::Journeyman), 1.0);
    }

    #[test]
    fn test_tier_progress_top_tier_tracks_beyond_promotion() {
        assert_eq!(tier_progress(800, Tier::Grandmaster), 0.0);
        assert!((tier_progress(900, Tier::Grandmaster) - 0.5).abs() < 1e-12);
        assert_eq!(tier_progress(1000, Tier::Grandmaster), 1.0);
    }

    #[test]
    fn test_promotion_is_celebrated() {
        let change = detect_tier_change(Tier::Journeyman, Tier::Expert);
        assert!(change.changed);
        assert_eq!(change.direction, TierDirection::Up);
        assert_eq!(change.delta, 1);
        assert!(change.should_celebrate);
    }

    #[test]
    fn test_demotion_and_no_change_not_celebrated() {
        let down = detect_tier_change(Tier::Master, Tier::Apprentice);
        assert!(down.changed);
        assert_eq!(down.direction, TierDirection::Down);
        assert_eq!(down.delta, 3);
        assert!(!down.should_celebrate);

        let same = detect_tier_change(Tier::Expert, Tier::Expert);
        assert!(!same.changed);
        assert_eq!(same.direction, TierDirection::Same);
        assert_eq!(same.delta, 0);
        assert!(!same.should_celebrate);
    }

    #[test]
    fn test_score_user_uses_stored_tier() {
        // Score says Master, stored tier is still Journeyman
        let mut row = calibration("alice", 100, 80, 0.2, 0.18);
        row.current_tier = Tier::Journeyman;
        let rep = score_user(&row);
        assert_eq!(rep.composite_score, 760);
        assert_eq!(rep.tier, Tier::Journeyman);
        assert_eq!(rep.next_tier, Some(Tier::Expert));
        assert_eq!(rep.next_tier_threshold, Some(400));
        assert_eq!(rep.tier_progress, 1.0);
    }

    #[test]
    fn test_leaderboard_ordering_and_tie_break() {
        let mut a = calibration("a", 100, 80, 0.2, 0.18);
        a.global_rank = Some(2);
        let mut b = calibration("b", 100, 80, 0.2, 0.18);
        b.global_rank = Some(1);
        let c = calibration("c", 100, 80, 0.2, 0.18);
        let d = calibration("d", 100, 80, 0.1, 0.1);

        let board = rank_leaderboard(&[a, b, c, d], 10);
        let order: Vec<&str> = board.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(order, vec!["d", "b", "a", "c"]);

        let top = rank_leaderboard(&board_rows(), 1);
        assert_eq!(top.len(), 1);
    }

    fn board_rows() -> Vec<UserCalibration> {
        vec![
            calibration("x", 10, 5, 0.3, 0.3),
            calibration("y", 10, 5, 0.4, 0.4),
        ]
    }
}
