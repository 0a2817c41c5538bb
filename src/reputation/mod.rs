pub mod scorer;
pub mod tiers;

pub use scorer::{
    composite_score, detect_tier_change, rank_leaderboard, score_calibration, score_user,
    tier_progress, Reputation, ScoringWeights, TierChange, TierDirection,
};
pub use tiers::Tier;
