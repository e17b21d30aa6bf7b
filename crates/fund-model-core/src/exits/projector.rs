use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::types::{Money, Rate};

/// Projects ARR forward from an annual growth rate.
pub trait ArrProjector: Send + Sync {
    fn project_arr(&self, current_arr: Money, annual_growth_rate: Rate, months: u32) -> Money;
}

/// Compounds growth year by year while the growth rate itself decays by
/// `annual_decay` after every full year. Partial years compound at the
/// fractional power of the current year's rate.
#[derive(Debug, Clone, Copy)]
pub struct DecayingGrowthProjector {
    pub annual_decay: Rate,
}

impl DecayingGrowthProjector {
    pub fn new(annual_decay: Rate) -> Self {
        DecayingGrowthProjector { annual_decay }
    }
}

impl Default for DecayingGrowthProjector {
    fn default() -> Self {
        DecayingGrowthProjector::new(dec!(0.85))
    }
}

impl ArrProjector for DecayingGrowthProjector {
    fn project_arr(&self, current_arr: Money, annual_growth_rate: Rate, months: u32) -> Money {
        let mut arr = current_arr;
        let mut growth = annual_growth_rate;

        for _ in 0..months / 12 {
            arr = arr.checked_mul(Decimal::ONE + growth).unwrap_or(Decimal::MAX);
            growth *= self.annual_decay;
        }

        let rem = months % 12;
        if rem > 0 {
            let exponent = Decimal::from(rem) / dec!(12);
            let factor = (Decimal::ONE + growth)
                .checked_powd(exponent)
                .unwrap_or(Decimal::ONE + growth * exponent);
            arr = arr.checked_mul(factor).unwrap_or(Decimal::MAX);
        }

        arr.max(Decimal::ZERO)
    }
}
