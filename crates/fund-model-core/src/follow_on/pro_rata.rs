use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Percent};

/// Ownership with and without taking up our pro-rata in a priced round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProRataOutcome {
    pub pro_rata_cost: Money,
    pub ownership_with_follow_on: Percent,
    pub ownership_without_follow_on: Percent,
    pub post_money_valuation: Money,
}

/// Computes pro-rata economics for a single upcoming round.
pub trait ProRataCalculator: Send + Sync {
    fn calculate(&self, ownership_pct: Percent, round_amount: Money, pre_money: Money) -> ProRataOutcome;
}

/// Plain priced-round dilution: new money buys `raise / post_money` of the
/// company; investing our share of the raise keeps ownership flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardProRata;

impl ProRataCalculator for StandardProRata {
    fn calculate(&self, ownership_pct: Percent, round_amount: Money, pre_money: Money) -> ProRataOutcome {
        let post_money = pre_money + round_amount;
        let fraction = ownership_pct / Decimal::ONE_HUNDRED;
        let ownership_without_follow_on = if post_money > Decimal::ZERO && pre_money > Decimal::ZERO {
            ownership_pct * pre_money / post_money
        } else {
            ownership_pct
        };
        ProRataOutcome {
            pro_rata_cost: fraction * round_amount,
            ownership_with_follow_on: ownership_pct,
            ownership_without_follow_on,
            post_money_valuation: post_money,
        }
    }
}
