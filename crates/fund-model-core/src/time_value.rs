//! Dated cash-flow IRR solver.
//!
//! Newton-Raphson on `NPV(r) = Σ amount_i / (1+r)^(days_i/365)`, with days
//! measured from the earliest flow. When Newton cannot produce an answer the
//! caller falls back to the closed-form multiple approximation
//! `(total_value / total_invested)^(1/years) - 1`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FundModelError;
use crate::types::{CashFlow, Money, Rate, Years};
use crate::FundModelResult;

/// Relative NPV tolerance, scaled by the largest absolute flow.
const CONVERGENCE_THRESHOLD: Decimal = dec!(0.000000001);
const STEP_THRESHOLD: Decimal = dec!(0.000000000001);
const MIN_DERIVATIVE: Decimal = dec!(0.000000000001);
pub const MAX_IRR_ITERATIONS: u32 = 100;
pub const DEFAULT_IRR_GUESS: Rate = dec!(0.2);
pub const DAYS_PER_YEAR: Decimal = dec!(365);

const MIN_RATE: Decimal = dec!(-0.99);
const MAX_RATE: Decimal = dec!(10.0);

const MAX_BISECTION_ITERATIONS: u32 = 200;
const BRACKET_GRID: [Decimal; 13] = [
    dec!(-0.95),
    dec!(-0.9),
    dec!(-0.75),
    dec!(-0.5),
    dec!(-0.25),
    dec!(-0.1),
    dec!(0),
    dec!(0.1),
    dec!(0.25),
    dec!(0.5),
    dec!(1),
    dec!(3),
    dec!(10),
];

/// Which method produced an IRR figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrMethod {
    #[default]
    Xirr,
    SimpleMultiple,
}

/// IRR with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrEstimate {
    pub irr: Rate,
    pub method: IrrMethod,
    /// Why the solver was bypassed, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Year fraction between two dates on an actual/365 basis.
pub fn year_fraction(from: NaiveDate, to: NaiveDate) -> Years {
    Decimal::from((to - from).num_days()) / DAYS_PER_YEAR
}

fn base_date(flows: &[CashFlow]) -> Option<NaiveDate> {
    flows.iter().map(|cf| cf.date).min()
}

/// Net present value of dated flows at `rate`, discounted to the earliest date.
pub fn npv_dated(rate: Rate, flows: &[CashFlow]) -> FundModelResult<Money> {
    if rate <= dec!(-1) {
        return Err(FundModelError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let Some(base) = base_date(flows) else {
        return Ok(Decimal::ZERO);
    };
    npv_and_derivative(rate, flows, base)
        .map(|(npv, _)| npv)
        .ok_or_else(|| FundModelError::DivisionByZero {
            context: "NPV discount factor overflowed".into(),
        })
}

/// NPV and dNPV/dr. `None` on arithmetic overflow.
fn npv_and_derivative(
    rate: Rate,
    flows: &[CashFlow],
    base: NaiveDate,
) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut npv = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    for cf in flows {
        let years = year_fraction(base, cf.date);
        let discount = one_plus_r.checked_powd(years)?;
        if discount.is_zero() {
            return None;
        }
        npv = npv.checked_add(cf.amount.checked_div(discount)?)?;
        let slope = years
            .checked_mul(cf.amount)?
            .checked_div(one_plus_r.checked_mul(discount)?)?;
        dnpv = dnpv.checked_sub(slope)?;
    }
    Some((npv, dnpv))
}

/// Extended IRR for irregular cash flow dates using Newton-Raphson, with a
/// bracketing bisection when Newton fails from `guess`.
///
/// Errors (`InsufficientData`, `ConvergenceFailure`) mean "no answer"; callers
/// are expected to fall back rather than propagate.
pub fn xirr(flows: &[CashFlow], guess: Rate) -> FundModelResult<Rate> {
    if flows.len() < 2 {
        return Err(FundModelError::InsufficientData(
            "XIRR requires at least 2 cash flows".into(),
        ));
    }
    let has_negative = flows.iter().any(|cf| cf.amount < Decimal::ZERO);
    let has_positive = flows.iter().any(|cf| cf.amount > Decimal::ZERO);
    if !has_negative || !has_positive {
        return Err(FundModelError::InsufficientData(
            "XIRR requires at least one negative and one positive cash flow".into(),
        ));
    }

    let Some(base) = base_date(flows) else {
        return Err(FundModelError::InsufficientData("XIRR requires dated cash flows".into()));
    };
    let scale = flows
        .iter()
        .map(|cf| cf.amount.abs())
        .max()
        .unwrap_or(Decimal::ONE);
    let tolerance = CONVERGENCE_THRESHOLD * scale;

    let newton_err = match newton(flows, base, guess, tolerance) {
        Ok(rate) => return Ok(rate),
        Err(e) => e,
    };
    bisect(flows, base, tolerance).ok_or(newton_err)
}

fn newton(flows: &[CashFlow], base: NaiveDate, guess: Rate, tolerance: Decimal) -> FundModelResult<Rate> {
    let mut rate = guess.clamp(MIN_RATE, MAX_RATE);
    let mut last_npv = Decimal::ZERO;

    for i in 0..MAX_IRR_ITERATIONS {
        let Some((npv_val, dnpv)) = npv_and_derivative(rate, flows, base) else {
            // Overflow at extreme rates: pull back towards zero and retry
            rate /= dec!(2);
            continue;
        };
        last_npv = npv_val;

        if npv_val.abs() <= tolerance {
            return Ok(rate);
        }

        if dnpv.abs() < MIN_DERIVATIVE {
            return Err(FundModelError::ConvergenceFailure {
                function: "XIRR".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        let Some(step) = npv_val.checked_div(dnpv) else {
            break;
        };
        rate = (rate - step).clamp(MIN_RATE, MAX_RATE);

        if step.abs() < STEP_THRESHOLD {
            return Ok(rate);
        }
    }

    Err(FundModelError::ConvergenceFailure {
        function: "XIRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: last_npv,
    })
}

fn npv_at(rate: Rate, flows: &[CashFlow], base: NaiveDate) -> Option<Decimal> {
    npv_and_derivative(rate, flows, base).map(|(npv, _)| npv)
}

/// Bisection on the first sign change across `BRACKET_GRID`, for flows where
/// Newton diverges from the seed.
fn bisect(flows: &[CashFlow], base: NaiveDate, tolerance: Decimal) -> Option<Rate> {
    let points: Vec<(Rate, Decimal)> = BRACKET_GRID
        .iter()
        .filter_map(|&r| npv_at(r, flows, base).map(|npv| (r, npv)))
        .collect();
    let (mut lo, mut npv_lo, mut hi) = points.windows(2).find_map(|w| {
        let ((r0, v0), (r1, v1)) = (w[0], w[1]);
        if v0.is_zero() {
            Some((r0, v0, r0))
        } else if v0.is_sign_negative() != v1.is_sign_negative() {
            Some((r0, v0, r1))
        } else {
            None
        }
    })?;

    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let npv_mid = npv_at(mid, flows, base)?;
        if npv_mid.abs() <= tolerance || (hi - lo).abs() < STEP_THRESHOLD {
            return Some(mid);
        }
        if npv_mid.is_sign_negative() == npv_lo.is_sign_negative() {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }
    }
    Some((lo + hi) / dec!(2))
}

/// Closed-form annualised multiple: `(total_value / total_invested)^(1/years) - 1`.
///
/// Returns 0 when nothing was invested and -1 when nothing is left.
pub fn simple_multiple_irr(total_value: Money, total_invested: Money, years: Years) -> Rate {
    if total_invested <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if total_value <= Decimal::ZERO {
        return dec!(-1);
    }
    let years = if years > Decimal::ZERO { years } else { dec!(3) };
    let multiple = total_value / total_invested;
    match multiple.checked_powd(Decimal::ONE / years) {
        Some(annualised) => annualised - Decimal::ONE,
        None => Decimal::ZERO,
    }
}

/// Solve XIRR, falling back to the simple multiple on non-convergence.
pub fn irr_with_fallback(
    flows: &[CashFlow],
    total_value: Money,
    total_invested: Money,
    fallback_years: Years,
    guess: Rate,
) -> IrrEstimate {
    match xirr(flows, guess) {
        Ok(irr) => IrrEstimate {
            irr,
            method: IrrMethod::Xirr,
            fallback_reason: None,
        },
        Err(e) => IrrEstimate {
            irr: simple_multiple_irr(total_value, total_invested, fallback_years),
            method: IrrMethod::SimpleMultiple,
            fallback_reason: Some(e.to_string()),
        },
    }
}
