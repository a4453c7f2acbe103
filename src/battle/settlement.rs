use chrono::{DateTime, Utc};

use super::models::BattleMode;
use crate::shared::AppError;

/// A participant's final standing, as settlement sees it
#[derive(Debug, Clone)]
pub struct Standing {
    pub user_id: String,
    pub total_value: i64,
    pub joined_at: DateTime<Utc>,
}

/// The outcome of settling a battle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Single winner for NORMAL / UPSIDE_DOWN; None for pot-splitting modes
    pub winner: Option<String>,
    /// Every participant's payout in join order; zero entries included.
    /// Always sums to exactly the pot.
    pub payouts: Vec<(String, i64)>,
}

/// Computes the winner and payouts for a battle.
///
/// Pure function of the mode, pot, and standings; the caller owns
/// persistence and crediting. Ties in the single-winner modes go to the
/// earliest joiner. Pot-splitting modes use the largest-remainder method
/// so the payouts always sum to the pot exactly; when every total is zero
/// the pot is split equally, remainder coins to the earliest joiners.
pub fn settle(
    mode: BattleMode,
    total_prize: i64,
    standings: &[Standing],
) -> Result<Settlement, AppError> {
    if standings.is_empty() {
        return Err(AppError::State(
            "Cannot settle a battle with no participants".to_string(),
        ));
    }
    if total_prize < 0 {
        return Err(AppError::State(
            "Cannot settle a battle with a negative pot".to_string(),
        ));
    }

    match mode {
        BattleMode::Normal => Ok(winner_takes_pot(total_prize, standings, true)),
        BattleMode::UpsideDown => Ok(winner_takes_pot(total_prize, standings, false)),
        BattleMode::Jackpot | BattleMode::Share => Ok(proportional_split(total_prize, standings)),
    }
}

fn winner_takes_pot(total_prize: i64, standings: &[Standing], highest_wins: bool) -> Settlement {
    let mut best = &standings[0];
    for standing in &standings[1..] {
        let beats = if highest_wins {
            standing.total_value > best.total_value
        } else {
            standing.total_value < best.total_value
        };
        // Tie-break: earliest join wins, so a later equal total never displaces
        if beats || (standing.total_value == best.total_value && standing.joined_at < best.joined_at)
        {
            best = standing;
        }
    }

    let payouts = standings
        .iter()
        .map(|s| {
            let amount = if s.user_id == best.user_id {
                total_prize
            } else {
                0
            };
            (s.user_id.clone(), amount)
        })
        .collect();

    Settlement {
        winner: Some(best.user_id.clone()),
        payouts,
    }
}

fn proportional_split(total_prize: i64, standings: &[Standing]) -> Settlement {
    let total_value: i64 = standings.iter().map(|s| s.total_value).sum();

    if total_value == 0 {
        return equal_split(total_prize, standings);
    }

    // Floor each share, then hand the leftover coins to the largest
    // fractional remainders. i128 keeps prize * value from overflowing.
    let mut payouts: Vec<i64> = Vec::with_capacity(standings.len());
    let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(standings.len());
    let mut distributed: i64 = 0;

    for (index, standing) in standings.iter().enumerate() {
        let numerator = total_prize as i128 * standing.total_value as i128;
        let share = (numerator / total_value as i128) as i64;
        payouts.push(share);
        remainders.push((index, numerator % total_value as i128));
        distributed += share;
    }

    let mut leftover = total_prize - distributed;
    remainders.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| standings[a.0].joined_at.cmp(&standings[b.0].joined_at))
    });
    for (index, _) in remainders {
        if leftover == 0 {
            break;
        }
        payouts[index] += 1;
        leftover -= 1;
    }

    Settlement {
        winner: None,
        payouts: standings
            .iter()
            .zip(payouts)
            .map(|(s, amount)| (s.user_id.clone(), amount))
            .collect(),
    }
}

fn equal_split(total_prize: i64, standings: &[Standing]) -> Settlement {
    let count = standings.len() as i64;
    let base = total_prize / count;
    let remainder = total_prize % count;

    // Remainder coins go one each to the earliest joiners
    let mut order: Vec<usize> = (0..standings.len()).collect();
    order.sort_by(|a, b| standings[*a].joined_at.cmp(&standings[*b].joined_at));

    let mut payouts = vec![base; standings.len()];
    for index in order.into_iter().take(remainder as usize) {
        payouts[index] += 1;
    }

    Settlement {
        winner: None,
        payouts: standings
            .iter()
            .zip(payouts)
            .map(|(s, amount)| (s.user_id.clone(), amount))
            .collect(),
    }
}
