//! External market price input.
//!
//! The price of the reference asset is read once per batch of sols. A feed
//! failure is never surfaced: the sample falls back to a jittered default.

use rand::Rng;
use thiserror::Error;

use crate::config::MarketConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketFetchError {
    #[error("price feed unavailable")]
    Unavailable,
    #[error("price feed returned invalid price {0}")]
    InvalidPrice(f64),
    #[error("price feed failed: {0}")]
    Source(String),
}

/// A blocking source of the latest reference price. Implementations must
/// return (or fail) promptly; the turn engine never waits on them.
pub trait MarketFeed {
    fn latest_price(&mut self) -> Result<f64, MarketFetchError>;
}

/// Always reports the same price.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrice(pub f64);

impl MarketFeed for FixedPrice {
    fn latest_price(&mut self) -> Result<f64, MarketFetchError> {
        Ok(self.0)
    }
}

/// Never reachable; every sample uses the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFeed;

impl MarketFeed for OfflineFeed {
    fn latest_price(&mut self) -> Result<f64, MarketFetchError> {
        Err(MarketFetchError::Unavailable)
    }
}

/// `default_price` plus a uniform integer in `[-spread, spread]`.
pub fn fallback_price<R: Rng>(market: &MarketConfig, rng: &mut R) -> f64 {
    let spread = i64::from(market.spread);
    market.default_price + rng.random_range(-spread..=spread) as f64
}

/// Read the feed once, substituting the fallback on any failure or on a
/// non-positive price.
pub fn sample_price<F, R>(feed: &mut F, market: &MarketConfig, rng: &mut R) -> f64
where
    F: MarketFeed + ?Sized,
    R: Rng,
{
    let error = match feed.latest_price() {
        Ok(price) if price.is_finite() && price > 0.0 => return price,
        Ok(price) => MarketFetchError::InvalidPrice(price),
        Err(e) => e,
    };

    let price = fallback_price(market, rng);

    #[cfg(feature = "instrument")]
    tracing::warn!(
        target: "market",
        fallback_price = price,
        reason = %error,
    );
    #[cfg(not(feature = "instrument"))]
    let _ = error;

    price
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn market() -> MarketConfig {
        MarketConfig {
            default_price: 65_000.0,
            spread: 2000,
        }
    }

    #[test]
    fn live_price_passes_through() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let price = sample_price(&mut FixedPrice(71_250.5), &market(), &mut rng);
        assert_eq!(price, 71_250.5);
    }

    #[test]
    fn offline_feed_falls_back_within_spread() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let price = sample_price(&mut OfflineFeed, &market(), &mut rng);
            assert!((63_000.0..=67_000.0).contains(&price), "price = {price}");
            assert_eq!(price.fract(), 0.0);
        }
    }

    #[test]
    fn non_positive_price_is_masked() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let price = sample_price(&mut FixedPrice(-5.0), &market(), &mut rng);
        assert!(price >= 63_000.0, "price = {price}");

        let price = sample_price(&mut FixedPrice(f64::NAN), &market(), &mut rng);
        assert!(price >= 63_000.0, "price = {price}");
    }

    #[test]
    fn zero_spread_is_exactly_default() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let market = MarketConfig {
            default_price: 100.0,
            spread: 0,
        };
        assert_eq!(sample_price(&mut OfflineFeed, &market, &mut rng), 100.0);
    }
}
