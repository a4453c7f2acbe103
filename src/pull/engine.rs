use rand::Rng;

use crate::catalog::models::CardModel;
use crate::shared::AppError;

/// Draws one card from a weighted pool.
///
/// Selection probability is `pull_rate_i / sum(pull_rate)` over the pool.
/// The pool must be in a stable order (card creation order) so that a
/// seeded RNG reproduces the same sequence of outcomes.
///
/// Draws are with replacement: every call is an independent trial over the
/// full pool. An empty pool, an all-zero pool, or any negative/non-finite
/// weight is a configuration error, never a silent fallback to uniform.
pub fn draw_card<'a, R: Rng + ?Sized>(
    cards: &'a [CardModel],
    rng: &mut R,
) -> Result<&'a CardModel, AppError> {
    let total_weight = validate_pool(cards)?;

    let roll = rng.random_range(0.0..total_weight);

    let mut cumulative = 0.0;
    let mut last_positive = None;
    for card in cards {
        if card.pull_rate > 0.0 {
            cumulative += card.pull_rate;
            last_positive = Some(card);
            if roll < cumulative {
                return Ok(card);
            }
        }
    }

    // Float accumulation can leave the final cumulative fractionally below
    // total_weight; the roll then lands past the last bucket.
    last_positive.ok_or_else(|| {
        AppError::Configuration("All cards in box have zero pull rate".to_string())
    })
}

/// Checks that a pool is drawable and returns its total weight.
///
/// An unopenable box is a configuration error at creation time, not a
/// surprise at draw time.
pub fn validate_pool(cards: &[CardModel]) -> Result<f64, AppError> {
    if cards.is_empty() {
        return Err(AppError::Configuration(
            "Box has no cards to draw from".to_string(),
        ));
    }

    let mut total_weight = 0.0;
    for card in cards {
        if !card.pull_rate.is_finite() || card.pull_rate < 0.0 {
            return Err(AppError::Configuration(format!(
                "Card {} has invalid pull rate {}",
                card.id, card.pull_rate
            )));
        }
        total_weight += card.pull_rate;
    }
    if total_weight <= 0.0 {
        return Err(AppError::Configuration(
            "All cards in box have zero pull rate".to_string(),
        ));
    }

    Ok(total_weight)
}
