use serde::{Deserialize, Serialize};

/// Hard ceiling on any recommended stake, as a fraction of bankroll.
pub const MAX_POSITION_FRACTION: f64 = 0.25;

/// Default multiplier on full Kelly ("half Kelly").
pub const DEFAULT_KELLY_FRACTION: f64 = 0.5;

/// Edge of a stated probability over the market price.
pub fn compute_edge(stated_probability: f64, market_price: f64) -> f64 {
    stated_probability - market_price
}

/// Fractional-Kelly stake for a binary YES position, capped at
/// [`MAX_POSITION_FRACTION`].
///
/// Returns `None` when there is no positive edge. A price of 1 can never
/// carry a positive edge for a probability below 1, so the Kelly
/// denominator is only evaluated for prices strictly below 1.
pub fn recommended_size(stated_probability: f64, market_price: f64, kelly_fraction: f64) -> Option<f64> {
    let edge = compute_edge(stated_probability, market_price);
    if edge <= 0.0 || market_price >= 1.0 {
        return None;
    }

    // Full Kelly for a binary contract bought at `market_price`
    let raw_kelly = edge / (1.0 - market_price);
    let size = raw_kelly * kelly_fraction;

    Some(size.clamp(0.0, MAX_POSITION_FRACTION))
}

/// Edge relative to price, in percent. Display only.
pub fn edge_percentage(edge: f64, market_price: f64) -> f64 {
    if market_price > 0.0 {
        (edge / market_price) * 100.0
    } else {
        0.0
    }
}

/// Sizing bundle returned to clients on every forecast write.
///
/// Field names and null semantics are part of the public response shape:
/// `recommendedSize` and `priceChange` serialize as `null`, never absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculated {
    pub edge: f64,
    pub edge_percentage: f64,
    pub has_positive_edge: bool,
    pub recommended_size: Option<f64>,
    pub price_change: Option<f64>,
}

/// Compute the full sizing bundle for a forecast at `market_price`.
///
/// `previous_probability` is the probability of the version being replaced,
/// if any.
pub fn size_position(
    stated_probability: f64,
    market_price: f64,
    kelly_fraction: f64,
    previous_probability: Option<f64>,
) -> Calculated {
    let edge = compute_edge(stated_probability, market_price);

    Calculated {
        edge,
        edge_percentage: edge_percentage(edge, market_price),
        has_positive_edge: edge > 0.0,
        recommended_size: recommended_size(stated_probability, market_price, kelly_fraction),
        price_change: previous_probability.map(|prev| stated_probability - prev),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
