use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

use super::position_sizer::{size_position, Calculated};
use crate::models::{Forecast, ForecastInput, MarketSnapshot};

/// YES price assumed when the market has none (e.g. no liquidity yet).
///
/// This flips the sign of the edge for every probability other than 0.5,
/// so it is applied explicitly and never hidden inside the sizer.
pub const FALLBACK_YES_PRICE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("market {0} is not active")]
    InactiveMarket(String),

    #[error("forecast {0} is already attested")]
    AlreadyAttested(Uuid),

    #[error("forecast {0} is attested and cannot be deleted")]
    ImmutableForecast(Uuid),

    #[error("broken forecast chain at {id}: {reason}")]
    BrokenChain { id: Uuid, reason: &'static str },
}

/// A freshly built forecast version plus its sizing bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    pub forecast: Forecast,
    pub calculated: Calculated,
}

/// Build the next version of a (user, market) forecast chain.
///
/// `previous` must be the current chain head for the same user and market,
/// or `None` for the first forecast. The returned row is not persisted.
pub fn append(
    input: &ForecastInput,
    snapshot: &MarketSnapshot,
    previous: Option<&Forecast>,
) -> Result<Appended, LedgerError> {
    if !snapshot.is_active {
        return Err(LedgerError::InactiveMarket(input.market_id.clone()));
    }

    if let Some(prev) = previous {
        if prev.user_id != input.user_id || prev.market_id != input.market_id {
            return Err(LedgerError::BrokenChain {
                id: prev.id,
                reason: "predecessor belongs to a different user or market",
            });
        }
    }

    let price = snapshot.yes_price.unwrap_or(FALLBACK_YES_PRICE);
    let calculated = size_position(
        input.probability,
        price,
        input.kelly_fraction,
        previous.map(|p| p.probability),
    );

    let forecast = Forecast {
        id: Uuid::new_v4(),
        user_id: input.user_id.clone(),
        market_id: input.market_id.clone(),
        probability: input.probability,
        confidence: input.confidence,
        kelly_fraction: input.kelly_fraction,
        recommended_size: calculated.recommended_size,
        market_yes_price: snapshot.yes_price,
        market_no_price: snapshot.no_price,
        previous_forecast_id: previous.map(|p| p.id),
        is_public: input.is_public,
        eas_attestation_uid: None,
        eas_attested_at: None,
        created_at: next_created_at(previous),
    };

    Ok(Appended { forecast, calculated })
}

/// Creation time strictly after the predecessor's, at storage precision.
fn next_created_at(previous: Option<&Forecast>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match previous {
        Some(prev) => now.max(prev.created_at + Duration::microseconds(1)),
        None => now,
    }
}

/// Versions are never edited in place; revisions go through [`append`].
pub fn can_mutate(_forecast: &Forecast) -> bool {
    false
}

pub fn can_delete(forecast: &Forecast) -> bool {
    !forecast.is_attested()
}

pub fn ensure_deletable(forecast: &Forecast) -> Result<(), LedgerError> {
    if can_delete(forecast) {
        Ok(())
    } else {
        Err(LedgerError::ImmutableForecast(forecast.id))
    }
}

pub fn ensure_attestable(forecast: &Forecast) -> Result<(), LedgerError> {
    if forecast.is_attested() {
        Err(LedgerError::AlreadyAttested(forecast.id))
    } else {
        Ok(())
    }
}

/// One-way `created -> attested` transition. Re-attesting is an error.
pub fn attest(forecast: &Forecast, uid: &str, attested_at: DateTime<Utc>) -> Result<Forecast, LedgerError> {
    ensure_attestable(forecast)?;

    Ok(Forecast {
        eas_attestation_uid: Some(uid.to_string()),
        eas_attested_at: Some(attested_at),
        ..forecast.clone()
    })
}

/// Walk `previous_forecast_id` links backward from `head_id`.
///
/// Returns the chain newest first. Fails on a missing link, a cycle, or
/// creation times that do not strictly decrease.
pub fn chain_from(head_id: Uuid, versions: &[Forecast]) -> Result<Vec<Forecast>, LedgerError> {
    let by_id: HashMap<Uuid, &Forecast> = versions.iter().map(|f| (f.id, f)).collect();
    let mut seen = HashSet::new();
    let mut chain: Vec<Forecast> = Vec::new();
    let mut cursor = Some(head_id);

    while let Some(id) = cursor {
        if !seen.insert(id) {
            return Err(LedgerError::BrokenChain { id, reason: "cycle in version chain" });
        }

        let current = by_id
            .get(&id)
            .ok_or(LedgerError::BrokenChain { id, reason: "missing version" })?;

        if let Some(newer) = chain.last() {
            if current.created_at >= newer.created_at {
                return Err(LedgerError::BrokenChain { id, reason: "creation order not strictly decreasing" });
            }
        }

        cursor = current.previous_forecast_id;
        chain.push((*current).clone());
    }

    Ok(chain)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
