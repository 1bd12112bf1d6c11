pub mod fees;

use primitive_types::U256;

use crate::error::StableSwapError;
use crate::math::{casted_mul, mul_div, MathError, Rounding};
use fees::Fees;

/// Max number of iterations for curve computation using Newton-Raphson method.
pub const MAX_ITERATIONS: u8 = 255;

/// Computes the stable swap invariant (D).
///
/// Solves `A*n^n*SUM{x_i} + D = A*n^n*D + D^(n+1) / (n^n * PROD{x_i})`
/// iteratively, starting from `D_0 = SUM{x_i}`, until two consecutive
/// approximations differ by at most one unit.
///
/// A pool with any empty reserve has no curve to speak of; its invariant is
/// defined as zero and the solver short-circuits.
///
/// Exceeding [`MAX_ITERATIONS`] is a system failure, not a user error, and
/// aborts the calling operation.
pub fn compute_d(amounts: &[u128], amp_coef: u128) -> Result<U256, StableSwapError> {
    if amounts.iter().any(|&amount| amount == 0) {
        return Ok(U256::zero());
    }
    let amount_sum = amounts.iter().try_fold(U256::zero(), |acc, &amount| {
        acc.checked_add(amount.into())
            .ok_or(MathError::AddOverflow(1))
    })?;
    let n = amounts.len() as u32;
    // A * n^n
    let ann: U256 = casted_mul(
        amp_coef,
        n.checked_pow(n).ok_or(MathError::MulOverflow(1))?.into(),
    );
    // A * n^n * SUM{x_i}
    let ann_sum = ann
        .checked_mul(amount_sum)
        .ok_or(MathError::MulOverflow(2))?;
    // A * n^n - 1
    let ann_sub_one = ann
        .checked_sub(1.into())
        .ok_or(MathError::SubUnderflow(1))?;
    // n + 1
    let n_add_one = n.checked_add(1).ok_or(MathError::AddOverflow(2))?;
    let mut d = amount_sum;
    for _ in 0..MAX_ITERATIONS {
        let d_next = compute_d_next(d, n, amounts, ann_sum, ann_sub_one, n_add_one)?;
        if d_next > d {
            if d_next.checked_sub(d).ok_or(MathError::SubUnderflow(2))? <= 1.into() {
                return Ok(d);
            }
        } else if d.checked_sub(d_next).ok_or(MathError::SubUnderflow(3))? <= 1.into() {
            return Ok(d);
        }
        d = d_next;
    }
    tracing::error!(amp_coef, ?amounts, "invariant solver exhausted its iteration budget");
    Err(StableSwapError::NotConverged)
}

fn compute_d_next(
    d_prev: U256,
    n: u32,
    amounts: &[u128],
    ann_sum: U256,
    ann_sub_one: U256,
    n_add_one: u32,
) -> Result<U256, StableSwapError> {
    let mut d_prod = d_prev;
    // d_prod = ... * [d_prev / (x_(i) * n)] * ...
    // where i in (0,n)
    for amount in amounts {
        d_prod = d_prod
            .checked_mul(d_prev)
            .ok_or(MathError::MulOverflow(3))?
            .checked_div(
                amount
                    .checked_mul(n.into())
                    .ok_or(MathError::MulOverflow(4))?
                    .into(),
            )
            .ok_or(MathError::DivByZero(1))?;
    }
    let numerator = d_prev
        .checked_mul(
            d_prod
                .checked_mul(n.into())
                .ok_or(MathError::MulOverflow(5))?
                .checked_add(ann_sum)
                .ok_or(MathError::AddOverflow(3))?,
        )
        .ok_or(MathError::MulOverflow(6))?;
    let denominator = d_prev
        .checked_mul(ann_sub_one)
        .ok_or(MathError::MulOverflow(7))?
        .checked_add(
            d_prod
                .checked_mul(n_add_one.into())
                .ok_or(MathError::MulOverflow(8))?,
        )
        .ok_or(MathError::AddOverflow(4))?;
    numerator
        .checked_div(denominator)
        .ok_or(MathError::DivByZero(2))
        .map_err(Into::into)
}

/// Returns the new reserve of `y` tokens given a new reserve of `x` tokens,
/// holding the invariant `d` fixed.
///
/// NOTICE: it does not check if `token_x_id != token_y_id` and if the ids are
/// out of bounds.
pub fn compute_y(
    new_reserve_x: u128,
    reserves: &[u128],
    token_x_id: usize,
    token_y_id: usize,
    d: U256,
    amp_coef: u128,
) -> Result<u128, StableSwapError> {
    let n = reserves.len() as u32;
    let ann: U256 = casted_mul(
        amp_coef,
        n.checked_pow(n).ok_or(MathError::MulOverflow(9))?.into(),
    );
    let mut c = d
        .checked_mul(d)
        .ok_or(MathError::MulOverflow(10))?
        .checked_div(new_reserve_x.into())
        .ok_or(MathError::DivByZero(3))?;
    let mut reserves_sum: U256 = new_reserve_x.into();
    // reserves_sum = ... + x_(i') + ...
    // c = ... * d / x_(i') * ... * d^2 / x_(token_x_id)
    // where i' in (0,n) AND i' != token_y_id
    for (idx, &reserve) in reserves.iter().enumerate() {
        if idx != token_x_id && idx != token_y_id {
            reserves_sum = reserves_sum
                .checked_add(reserve.into())
                .ok_or(MathError::AddOverflow(5))?;
            c = c
                .checked_mul(d)
                .ok_or(MathError::MulOverflow(11))?
                .checked_div(reserve.into())
                .ok_or(MathError::DivByZero(4))?;
        }
    }
    newton_y(c, reserves_sum, d, ann, n)
}

/// Returns the new reserve of `token_y_id` for a target invariant `d`, with
/// every other reserve unchanged. Used by single-asset withdrawals, where
/// burning LP tokens lowers D while only one balance gives way.
pub fn compute_y_given_d(
    reserves: &[u128],
    token_y_id: usize,
    d: U256,
    amp_coef: u128,
) -> Result<u128, StableSwapError> {
    let n = reserves.len() as u32;
    let ann: U256 = casted_mul(
        amp_coef,
        n.checked_pow(n).ok_or(MathError::MulOverflow(25))?.into(),
    );
    let mut c = d;
    let mut reserves_sum = U256::zero();
    for (idx, &reserve) in reserves.iter().enumerate() {
        if idx != token_y_id {
            reserves_sum = reserves_sum
                .checked_add(reserve.into())
                .ok_or(MathError::AddOverflow(13))?;
            c = c
                .checked_mul(d)
                .ok_or(MathError::MulOverflow(26))?
                .checked_div(reserve.into())
                .ok_or(MathError::DivByZero(16))?;
        }
    }
    newton_y(c, reserves_sum, d, ann, n)
}

/// Newton iteration for the single-unknown form of the invariant,
/// `y^2 + (b - d)y - c = 0`. `c` arrives as `d * PROD{d / x_i}` over the
/// known reserves and is finalized here.
fn newton_y(
    c_partial: U256,
    reserves_sum: U256,
    d: U256,
    ann: U256,
    n: u32,
) -> Result<u128, StableSwapError> {
    // c = c_partial * d / (A * n^2n)
    let c = c_partial
        .checked_mul(d)
        .ok_or(MathError::MulOverflow(12))?
        .checked_div(
            ann.checked_mul(n.checked_pow(n).ok_or(MathError::MulOverflow(13))?.into())
                .ok_or(MathError::MulOverflow(14))?,
        )
        .ok_or(MathError::DivByZero(5))?;
    // b = reserves_sum + d / (A * n^n); d is subtracted inside the iteration
    let b: U256 = d
        .checked_div(ann)
        .ok_or(MathError::DivByZero(6))?
        .checked_add(reserves_sum)
        .ok_or(MathError::AddOverflow(6))?;

    let mut y_prev = d;
    for _ in 0..MAX_ITERATIONS {
        let y = compute_y_next(y_prev, b, c, d)?;
        if y > y_prev {
            if y.checked_sub(y_prev).ok_or(MathError::SubUnderflow(4))? <= 1.into() {
                return y.try_into().map_err(|_| MathError::CastOverflow(2).into());
            }
        } else if y_prev.checked_sub(y).ok_or(MathError::SubUnderflow(5))? <= 1.into() {
            return y.try_into().map_err(|_| MathError::CastOverflow(2).into());
        }
        y_prev = y;
    }
    tracing::error!("single-unknown invariant solver exhausted its iteration budget");
    Err(StableSwapError::NotConverged)
}

fn compute_y_next(y_prev: U256, b: U256, c: U256, d: U256) -> Result<U256, StableSwapError> {
    let numerator = y_prev
        .checked_pow(2.into())
        .ok_or(MathError::MulOverflow(15))?
        .checked_add(c)
        .ok_or(MathError::AddOverflow(7))?;
    let denominator = y_prev
        .checked_mul(2.into())
        .ok_or(MathError::MulOverflow(16))?
        .checked_add(b)
        .ok_or(MathError::AddOverflow(8))?
        .checked_sub(d)
        .ok_or(MathError::SubUnderflow(6))?;
    numerator
        .checked_div(denominator)
        .ok_or(MathError::DivByZero(7))
        .map_err(Into::into)
}

/// Computes the result of a swap given `token_in_amount` of `token_in_idx`.
///
/// The trade fee is applied to the token_out amount, after the invariant
/// solve. Returns `(amount_out, fee_amount)` where `fee_amount` is the gross
/// fee in token_out units (the pool decides what part of it goes to admins).
///
/// NOTICE: it does not check if `token_in_idx != token_out_idx` and if the
/// ids are out of bounds.
pub fn swap_to(
    token_in_idx: usize,
    token_in_amount: u128,
    token_out_idx: usize,
    current_reserves: &[u128],
    fees: &Fees,
    amp_coef: u128,
) -> Result<(u128, u128), StableSwapError> {
    let d = compute_d(current_reserves, amp_coef)?;
    let y = compute_y(
        token_in_amount
            .checked_add(current_reserves[token_in_idx])
            .ok_or(MathError::AddOverflow(9))?,
        current_reserves,
        token_in_idx,
        token_out_idx,
        d,
        amp_coef,
    )?;
    // sub 1 in case there are any rounding errors
    // https://github.com/curvefi/curve-contract/blob/b0bbf77f8f93c9c5f4e415bce9cd71f0cdee960e/contracts/pool-templates/base/SwapTemplateBase.vy#L466
    let dy = current_reserves[token_out_idx]
        .checked_sub(y)
        .ok_or(MathError::SubUnderflow(7))?
        .checked_sub(1)
        .ok_or(MathError::SubUnderflow(8))?;
    let (amount_swapped, fee) = fees.apply_trade_fee(dy)?;
    Ok((amount_swapped, fee))
}

/// Computes the input required to receive `token_out_amount` (net, after
/// fee) of `token_out_idx`. Returns `(amount_in, fee_amount)`; the fee is
/// applied to token_out, same as in [`swap_to`].
///
/// NOTICE: it does not check if `token_in_idx != token_out_idx` and if the
/// ids are out of bounds.
pub fn swap_from(
    token_out_idx: usize,
    token_out_amount: u128,
    token_in_idx: usize,
    current_reserves: &[u128],
    fees: &Fees,
    amp_coef: u128,
) -> Result<(u128, u128), StableSwapError> {
    let fee = fees.trade_fee_from_net(token_out_amount)?;
    let token_out_amount_plus_fee = token_out_amount
        .checked_add(fee)
        .ok_or(MathError::AddOverflow(10))?;
    if token_out_amount_plus_fee >= current_reserves[token_out_idx] {
        return Err(StableSwapError::InsufficientLiquidity);
    }

    let d = compute_d(current_reserves, amp_coef)?;
    let y = compute_y(
        current_reserves[token_out_idx]
            .checked_sub(token_out_amount_plus_fee)
            .ok_or(MathError::SubUnderflow(9))?,
        current_reserves,
        token_out_idx,
        token_in_idx,
        d,
        amp_coef,
    )?;
    // add 1 in case there are any rounding errors
    let dy: u128 = y
        .checked_sub(current_reserves[token_in_idx])
        .ok_or(MathError::SubUnderflow(10))?
        .checked_add(1)
        .ok_or(MathError::AddOverflow(11))?;

    Ok((dy, fee))
}

/// Computes the amount of LP tokens to mint for a deposit.
///
/// An imbalanced deposit pays the normalized trade fee on each asset's
/// deviation from the proportional ideal; minted shares are derived from the
/// fee-adjusted invariant, so shifting the pool is never rewarded.
///
/// Returns `(mint_amount, per_asset_fees)`, fees in token units.
pub fn compute_lp_amount_for_deposit(
    deposit_amounts: &[u128],
    old_reserves: &[u128],
    lp_supply: u128,
    fees: Option<&Fees>,
    amp_coef: u128,
) -> Result<(u128, Vec<u128>), StableSwapError> {
    let n_coins = old_reserves.len();
    if lp_supply == 0 {
        // The first deposit defines the pool's shape; every reserve must be
        // funded, and the minted supply equals the invariant.
        if deposit_amounts.iter().any(|&amount| amount == 0) {
            return Err(StableSwapError::ZeroAmount);
        }
        let mint_shares: u128 = compute_d(deposit_amounts, amp_coef)?
            .try_into()
            .map_err(|_| MathError::CastOverflow(3))?;
        return Ok((mint_shares, vec![0; n_coins]));
    }
    // Initial invariant
    let d_0 = compute_d(old_reserves, amp_coef)?;
    let mut new_reserves = old_reserves
        .iter()
        .zip(deposit_amounts.iter())
        .map(|(&reserve, &amount)| {
            reserve
                .checked_add(amount)
                .ok_or(MathError::AddOverflow(12))
        })
        .collect::<Result<Vec<u128>, MathError>>()?;
    // Invariant after the deposit
    let d_1 = compute_d(&new_reserves, amp_coef)?;
    if let Some(fees) = fees {
        // Charge each reserve for its deviation from the proportional ideal
        // and recompute the invariant from the reduced balances.
        let mut asset_fees = vec![0u128; n_coins];
        for i in 0..n_coins {
            let ideal_reserve: u128 = d_1
                .checked_mul(old_reserves[i].into())
                .ok_or(MathError::MulOverflow(17))?
                .checked_div(d_0)
                .ok_or(MathError::DivByZero(8))?
                .try_into()
                .map_err(|_| MathError::CastOverflow(4))?;
            let difference = ideal_reserve.abs_diff(new_reserves[i]);
            let fee = fees.normalized_trade_fee(n_coins as u16, difference)?;
            asset_fees[i] = fee;
            new_reserves[i] = new_reserves[i]
                .checked_sub(fee)
                .ok_or(MathError::SubUnderflow(11))?;
        }
        let d_2 = compute_d(&new_reserves, amp_coef)?;
        // d_1 >= d_2 >= d_0; (d_2 - d_0) prices the minted shares with the
        // imbalance fee already charged.
        let mint_shares: u128 = U256::from(lp_supply)
            .checked_mul(d_2.checked_sub(d_0).ok_or(MathError::SubUnderflow(12))?)
            .ok_or(MathError::MulOverflow(18))?
            .checked_div(d_0)
            .ok_or(MathError::DivByZero(9))?
            .try_into()
            .map_err(|_| MathError::CastOverflow(5))?;
        Ok((mint_shares, asset_fees))
    } else {
        let mint_shares: u128 = U256::from(lp_supply)
            .checked_mul(d_1.checked_sub(d_0).ok_or(MathError::SubUnderflow(13))?)
            .ok_or(MathError::MulOverflow(19))?
            .checked_div(d_0)
            .ok_or(MathError::DivByZero(10))?
            .try_into()
            .map_err(|_| MathError::CastOverflow(6))?;
        Ok((mint_shares, vec![0; n_coins]))
    }
}

/// Computes the amounts corresponding to an exactly proportional share of
/// every reserve for `lp_amount` of the supply. Rounds down; no invariant
/// solve and no fee.
pub fn compute_amounts_given_lp(
    lp_amount: u128,
    reserves: &[u128],
    lp_supply: u128,
) -> Result<Vec<u128>, StableSwapError> {
    reserves
        .iter()
        .map(|&reserve| {
            mul_div(reserve, lp_amount, lp_supply, Rounding::Down).map_err(Into::into)
        })
        .collect()
}

/// Computes the amount of LP tokens to burn for an imbalanced withdrawal of
/// `withdraw_amounts`. Mirrors [`compute_lp_amount_for_deposit`]: the
/// normalized trade fee is charged on each asset's deviation from the
/// proportional ideal. The burn rounds up; shares owed to the pool never
/// round in the withdrawer's favor.
///
/// Returns `(burn_amount, per_asset_fees)`, fees in token units.
pub fn compute_lp_amount_for_withdraw(
    withdraw_amounts: &[u128],
    old_reserves: &[u128],
    lp_supply: u128,
    fees: Option<&Fees>,
    amp_coef: u128,
) -> Result<(u128, Vec<u128>), StableSwapError> {
    let n_coins = old_reserves.len();
    // Initial invariant
    let d_0 = compute_d(old_reserves, amp_coef)?;
    let mut new_reserves = old_reserves
        .iter()
        .zip(withdraw_amounts.iter())
        .map(|(&reserve, &amount)| {
            reserve
                .checked_sub(amount)
                .ok_or(MathError::SubUnderflow(14))
        })
        .collect::<Result<Vec<u128>, MathError>>()?;
    // Invariant after the withdrawal
    let d_1 = compute_d(&new_reserves, amp_coef)?;
    if let Some(fees) = fees {
        let mut asset_fees = vec![0u128; n_coins];
        for i in 0..n_coins {
            let ideal_reserve: u128 = d_1
                .checked_mul(old_reserves[i].into())
                .ok_or(MathError::MulOverflow(20))?
                .checked_div(d_0)
                .ok_or(MathError::DivByZero(11))?
                .try_into()
                .map_err(|_| MathError::CastOverflow(7))?;
            let difference = ideal_reserve.abs_diff(new_reserves[i]);
            let fee = fees.normalized_trade_fee(n_coins as u16, difference)?;
            asset_fees[i] = fee;
            new_reserves[i] = new_reserves[i]
                .checked_sub(fee)
                .ok_or(MathError::SubUnderflow(15))?;
        }
        let d_2 = compute_d(&new_reserves, amp_coef)?;
        // d_0 >= d_1 >= d_2; (d_0 - d_2) prices the burned shares with the
        // imbalance fee included.
        let burn_shares: u128 = div_round_up(
            U256::from(lp_supply)
                .checked_mul(d_0.checked_sub(d_2).ok_or(MathError::SubUnderflow(16))?)
                .ok_or(MathError::MulOverflow(21))?,
            d_0,
        )?
        .try_into()
        .map_err(|_| MathError::CastOverflow(8))?;
        Ok((burn_shares, asset_fees))
    } else {
        let burn_shares: u128 = div_round_up(
            U256::from(lp_supply)
                .checked_mul(d_0.checked_sub(d_1).ok_or(MathError::SubUnderflow(17))?)
                .ok_or(MathError::MulOverflow(22))?,
            d_0,
        )?
        .try_into()
        .map_err(|_| MathError::CastOverflow(9))?;
        Ok((burn_shares, vec![0; n_coins]))
    }
}

fn div_round_up(numerator: U256, denominator: U256) -> Result<U256, MathError> {
    let quotient = numerator
        .checked_div(denominator)
        .ok_or(MathError::DivByZero(12))?;
    if (numerator % denominator).is_zero() {
        Ok(quotient)
    } else {
        quotient
            .checked_add(1.into())
            .ok_or(MathError::AddOverflow(14))
    }
}

/// Computes the amount of a single asset received for burning `lp_amount`.
///
/// Burning the shares lowers the target invariant to
/// `d_1 = d_0 - lp_amount * d_0 / lp_supply`; the out reserve is re-solved
/// at `d_1` with every other reserve fixed, and the withdrawal fee is
/// charged on the imbalance the single-sided exit creates.
///
/// Returns `(amount_out, fee_amount)`, fee in token_out units.
pub fn compute_withdraw_one_token(
    lp_amount: u128,
    token_out_idx: usize,
    reserves: &[u128],
    lp_supply: u128,
    fees: Option<&Fees>,
    amp_coef: u128,
) -> Result<(u128, u128), StableSwapError> {
    let n_coins = reserves.len();
    let d_0 = compute_d(reserves, amp_coef)?;
    let d_1 = d_0
        .checked_sub(
            d_0.checked_mul(lp_amount.into())
                .ok_or(MathError::MulOverflow(23))?
                .checked_div(lp_supply.into())
                .ok_or(MathError::DivByZero(14))?,
        )
        .ok_or(MathError::SubUnderflow(18))?;
    let new_y = compute_y_given_d(reserves, token_out_idx, d_1, amp_coef)?;
    let dy_no_fee = reserves[token_out_idx]
        .checked_sub(new_y)
        .ok_or(MathError::SubUnderflow(19))?;

    let Some(fees) = fees else {
        let dy = dy_no_fee.checked_sub(1).ok_or(MathError::SubUnderflow(20))?;
        return Ok((dy, 0));
    };

    // Reduce every reserve by the fee on its expected deviation from the
    // proportional ideal, then re-solve the out reserve at d_1.
    let mut reserves_reduced = Vec::with_capacity(n_coins);
    for (idx, &reserve) in reserves.iter().enumerate() {
        let ideal_reserve: u128 = d_1
            .checked_mul(reserve.into())
            .ok_or(MathError::MulOverflow(24))?
            .checked_div(d_0)
            .ok_or(MathError::DivByZero(15))?
            .try_into()
            .map_err(|_| MathError::CastOverflow(10))?;
        let expected_delta = if idx == token_out_idx {
            ideal_reserve
                .checked_sub(new_y)
                .ok_or(MathError::SubUnderflow(21))?
        } else {
            reserve
                .checked_sub(ideal_reserve)
                .ok_or(MathError::SubUnderflow(22))?
        };
        let fee = fees.normalized_trade_fee(n_coins as u16, expected_delta)?;
        reserves_reduced.push(reserve.checked_sub(fee).ok_or(MathError::SubUnderflow(23))?);
    }
    let y_after_fee = compute_y_given_d(&reserves_reduced, token_out_idx, d_1, amp_coef)?;
    // sub 1 in case there are any rounding errors
    let dy = reserves_reduced[token_out_idx]
        .checked_sub(y_after_fee)
        .ok_or(MathError::SubUnderflow(24))?
        .checked_sub(1)
        .ok_or(MathError::SubUnderflow(25))?;
    let fee = dy_no_fee.checked_sub(dy).ok_or(MathError::SubUnderflow(26))?;
    Ok((dy, fee))
}
