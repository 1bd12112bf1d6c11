use serde::{Deserialize, Serialize};

use crate::error::StableSwapError;
use crate::math::{mul_div, MathError, Rounding};

pub const FEE_BPS_DENOM: u16 = 10_000;

/// Trade and admin fee rates in basis points.
///
/// The admin fee is a share of an already-charged trade fee, not an
/// additional levy on the traded amount.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    pub trade_fee_bps: u16,
    pub admin_fee_bps: u16,
}

impl Fees {
    pub fn new(trade_fee_bps: u16, admin_fee_bps: u16) -> Result<Self, StableSwapError> {
        let fees = Self {
            trade_fee_bps,
            admin_fee_bps,
        };
        fees.validate()?;
        Ok(fees)
    }

    pub fn zero() -> Self {
        Self {
            trade_fee_bps: 0,
            admin_fee_bps: 0,
        }
    }

    pub fn validate(&self) -> Result<(), StableSwapError> {
        if self.trade_fee_bps >= FEE_BPS_DENOM || self.admin_fee_bps >= FEE_BPS_DENOM {
            return Err(StableSwapError::InvalidFeeBps);
        }
        Ok(())
    }

    /// Splits a gross amount into `(net, fee)`. `net + fee == amount` holds
    /// exactly for every fee rate.
    pub fn apply_trade_fee(&self, amount: u128) -> Result<(u128, u128), MathError> {
        let fee = self.trade_fee_from_gross(amount)?;
        let net = amount.checked_sub(fee).ok_or(MathError::SubUnderflow(61))?;
        Ok((net, fee))
    }

    /// Trade fee charged on a gross (pre-fee) amount.
    pub fn trade_fee_from_gross(&self, amount: u128) -> Result<u128, MathError> {
        u128_ratio(amount, self.trade_fee_bps, FEE_BPS_DENOM, Rounding::Down)
    }

    /// Trade fee implied by a net (post-fee) amount. Rounds up so that
    /// exact-out quotes never undercharge the pool.
    pub fn trade_fee_from_net(&self, amount: u128) -> Result<u128, MathError> {
        u128_ratio(
            amount,
            self.trade_fee_bps,
            FEE_BPS_DENOM
                .checked_sub(self.trade_fee_bps)
                .ok_or(MathError::SubUnderflow(62))?,
            Rounding::Up,
        )
    }

    /// Admin share of an already-charged trade fee. Rounds down; the
    /// remainder stays in the reserve for liquidity providers.
    pub fn admin_trade_fee(&self, fee: u128) -> Result<u128, MathError> {
        u128_ratio(fee, self.admin_fee_bps, FEE_BPS_DENOM, Rounding::Down)
    }

    /// Fee applied to the deviation from the proportional ideal when a
    /// deposit or withdrawal shifts pool balances. The `n/(4(n-1))` scaling
    /// makes an imbalanced deposit pay the same fee as achieving the
    /// equivalent position through swaps.
    /// https://github.com/curvefi/curve-contract/blob/e5fb8c0e0bcd2fe2e03634135806c0f36b245511/tests/simulation.py#L124
    pub fn normalized_trade_fee(&self, num_coins: u16, amount: u128) -> Result<u128, MathError> {
        let adjusted_fee_bps = self
            .trade_fee_bps
            .checked_mul(num_coins)
            .ok_or(MathError::MulOverflow(61))?
            .checked_div(
                num_coins
                    .checked_sub(1)
                    .ok_or(MathError::SubUnderflow(63))?
                    .checked_mul(4)
                    .ok_or(MathError::MulOverflow(62))?,
            )
            .ok_or(MathError::DivByZero(61))?;
        u128_ratio(amount, adjusted_fee_bps, FEE_BPS_DENOM, Rounding::Down)
    }
}

fn u128_ratio(
    amount: u128,
    num: u16,
    denom: u16,
    rounding: Rounding,
) -> Result<u128, MathError> {
    mul_div(amount, num.into(), denom.into(), rounding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_rates_validated_on_construction() {
        assert!(Fees::new(0, 0).is_ok());
        assert!(Fees::new(9_999, 9_999).is_ok());
        assert_eq!(
            Fees::new(10_000, 0),
            Err(StableSwapError::InvalidFeeBps)
        );
        assert_eq!(
            Fees::new(4, 10_000),
            Err(StableSwapError::InvalidFeeBps)
        );
    }

    #[test]
    fn gross_split_conserves_the_amount() {
        let amounts = [0u128, 1, 999, 880_265_296_841_066_047, u128::MAX];
        for bps in [0u16, 1, 4, 30, 2_137, 9_999] {
            let fees = Fees::new(bps, 0).unwrap();
            for &amount in &amounts {
                let (net, fee) = fees.apply_trade_fee(amount).unwrap();
                assert_eq!(net + fee, amount, "bps={bps} amount={amount}");
            }
        }
    }

    #[test]
    fn net_fee_covers_gross_fee() {
        // Charging the fee implied by a net amount, then re-deriving the fee
        // from the resulting gross amount, must never undercharge.
        for i in 1..100u128 {
            let net = 880_265_296_841_066_047 * i;
            let fees = Fees::new(30, 0).unwrap();
            let fee_from_net = fees.trade_fee_from_net(net).unwrap();
            let gross = net + fee_from_net;
            let fee_from_gross = fees.trade_fee_from_gross(gross).unwrap();
            assert!(fee_from_net >= fee_from_gross);
            assert!(fee_from_net - fee_from_gross <= 1);
        }
    }

    #[test]
    fn admin_share_never_exceeds_the_fee() {
        let fees = Fees::new(1_000, 5_000).unwrap();
        let fee = fees.trade_fee_from_gross(1_000_000).unwrap();
        let admin_fee = fees.admin_trade_fee(fee).unwrap();
        assert_eq!(fee, 100_000);
        assert_eq!(admin_fee, 50_000);
        assert!(fees.admin_trade_fee(1).unwrap() <= 1);
    }

    #[test]
    fn normalized_fee_scales_with_coin_count() {
        let fees = Fees::new(100, 0).unwrap();
        // n = 2: bps * 2 / 4 = half the trade fee.
        assert_eq!(fees.normalized_trade_fee(2, 1_000_000).unwrap(), 5_000);
        // n = 4: bps * 4 / 12 = a third of the trade fee.
        assert_eq!(fees.normalized_trade_fee(4, 1_200_000).unwrap(), 3_960);
    }
}
