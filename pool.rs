use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::constants::stable_pool::{MAX_AMP, MAX_COINS, MIN_AMP, MIN_COINS, VIRTUAL_PRICE_PRECISION};
use crate::error::StableSwapError;
use crate::math::MathError;
use crate::stable_swap_math as math;
use crate::stable_swap_math::fees::Fees;

/// Snapshot of a stable swap pool.
///
/// Operations never mutate the snapshot they are called on; each returns an
/// outcome embedding the successor state, so a failed call leaves nothing to
/// roll back. Amounts are assumed to be rescaled to a common precision
/// before they reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    balances: Vec<u128>,
    amp_coef: u128,
    lp_supply: u128,
    fees: Fees,
    /// Accrued admin fees per asset, held outside `balances` so they do not
    /// participate in pricing.
    admin_fee_balances: Vec<u128>,
}

/// Result of a swap quote applied to a pool snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub state: PoolState,
    pub amount_in: u128,
    pub amount_out: u128,
    /// Gross trade fee, in token-out units.
    pub fee: u128,
    /// Admin share of `fee`, moved out of the reserves.
    pub admin_fee: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositOutcome {
    pub state: PoolState,
    pub lp_minted: u128,
    /// Imbalance fee charged per asset, in token units.
    pub fees: Vec<u128>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawOutcome {
    pub state: PoolState,
    pub lp_burned: u128,
    pub amounts: Vec<u128>,
    /// Imbalance fee charged per asset, in token units.
    pub fees: Vec<u128>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawOneTokenOutcome {
    pub state: PoolState,
    pub lp_burned: u128,
    pub amount_out: u128,
    /// Withdrawal fee, in token-out units.
    pub fee: u128,
    pub admin_fee: u128,
}

impl PoolState {
    /// Creates an empty pool of `n_assets` tokens. Liquidity enters through
    /// [`PoolState::add_liquidity`].
    pub fn new(n_assets: usize, amp_coef: u128, fees: Fees) -> Result<Self, StableSwapError> {
        if !(MIN_COINS..=MAX_COINS).contains(&n_assets) {
            return Err(StableSwapError::IncorrectAssetCount);
        }
        Self::validate_amp_coef(amp_coef)?;
        fees.validate()?;
        Ok(Self {
            balances: vec![0; n_assets],
            amp_coef,
            lp_supply: 0,
            fees,
            admin_fee_balances: vec![0; n_assets],
        })
    }

    fn validate_amp_coef(amp_coef: u128) -> Result<(), StableSwapError> {
        if !(MIN_AMP..=MAX_AMP).contains(&amp_coef) {
            return Err(StableSwapError::InvalidAmpCoef);
        }
        Ok(())
    }

    pub fn balances(&self) -> &[u128] {
        &self.balances
    }

    pub fn amp_coef(&self) -> u128 {
        self.amp_coef
    }

    pub fn lp_supply(&self) -> u128 {
        self.lp_supply
    }

    pub fn fees(&self) -> &Fees {
        &self.fees
    }

    pub fn admin_fee_balances(&self) -> &[u128] {
        &self.admin_fee_balances
    }

    pub fn n_assets(&self) -> usize {
        self.balances.len()
    }

    /// Current value of the stable swap invariant (D) for this snapshot.
    /// Zero while any reserve is empty.
    pub fn invariant(&self) -> Result<U256, StableSwapError> {
        math::compute_d(&self.balances, self.amp_coef)
    }

    /// D per LP token, scaled by 10^18. Grows monotonically as fees accrue;
    /// a value below 10^18 indicates the pool has been drained beyond its
    /// minted shares.
    pub fn virtual_price(&self) -> Result<u128, StableSwapError> {
        if self.lp_supply == 0 {
            return Err(StableSwapError::InsufficientLpSupply);
        }
        self.invariant()?
            .checked_mul(VIRTUAL_PRICE_PRECISION.into())
            .ok_or(MathError::MulOverflow(101))?
            .checked_div(self.lp_supply.into())
            .ok_or(MathError::DivByZero(101))?
            .try_into()
            .map_err(|_| MathError::CastOverflow(101).into())
    }

    /// Swaps an exact `amount_in` of `token_in` for `token_out`. Fails with
    /// `InsufficientOutputAmount` if the quote falls below `min_amount_out`.
    pub fn swap_exact_in(
        &self,
        token_in: usize,
        token_out: usize,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<SwapOutcome, StableSwapError> {
        self.validate_token_pair(token_in, token_out)?;
        if amount_in == 0 {
            return Err(StableSwapError::ZeroAmount);
        }
        if self.lp_supply == 0 {
            return Err(StableSwapError::InsufficientLiquidity);
        }
        let (amount_out, fee) = math::swap_to(
            token_in,
            amount_in,
            token_out,
            &self.balances,
            &self.fees,
            self.amp_coef,
        )?;
        if amount_out < min_amount_out {
            return Err(StableSwapError::InsufficientOutputAmount);
        }
        let admin_fee = self.fees.admin_trade_fee(fee)?;
        let mut state = self.clone();
        state.increase_balance(token_in, amount_in)?;
        // The LP share of the fee stays in the reserve; only the net output
        // and the admin share leave it.
        state.decrease_balance(token_out, amount_out)?;
        state.decrease_balance(token_out, admin_fee)?;
        state.admin_fee_balances[token_out] = state.admin_fee_balances[token_out]
            .checked_add(admin_fee)
            .ok_or(MathError::AddOverflow(101))?;
        tracing::debug!(token_in, token_out, amount_in, amount_out, fee, "swap_exact_in");
        Ok(SwapOutcome {
            state,
            amount_in,
            amount_out,
            fee,
            admin_fee,
        })
    }

    /// Swaps `token_in` for an exact `amount_out` of `token_out`. Fails with
    /// `TooLargeInputAmount` if the required input exceeds `max_amount_in`.
    pub fn swap_exact_out(
        &self,
        token_in: usize,
        token_out: usize,
        amount_out: u128,
        max_amount_in: u128,
    ) -> Result<SwapOutcome, StableSwapError> {
        self.validate_token_pair(token_in, token_out)?;
        if amount_out == 0 {
            return Err(StableSwapError::ZeroAmount);
        }
        if self.lp_supply == 0 {
            return Err(StableSwapError::InsufficientLiquidity);
        }
        let (amount_in, fee) = math::swap_from(
            token_out,
            amount_out,
            token_in,
            &self.balances,
            &self.fees,
            self.amp_coef,
        )?;
        if amount_in > max_amount_in {
            return Err(StableSwapError::TooLargeInputAmount);
        }
        let admin_fee = self.fees.admin_trade_fee(fee)?;
        let mut state = self.clone();
        state.increase_balance(token_in, amount_in)?;
        state.decrease_balance(token_out, amount_out)?;
        state.decrease_balance(token_out, admin_fee)?;
        state.admin_fee_balances[token_out] = state.admin_fee_balances[token_out]
            .checked_add(admin_fee)
            .ok_or(MathError::AddOverflow(102))?;
        tracing::debug!(token_in, token_out, amount_in, amount_out, fee, "swap_exact_out");
        Ok(SwapOutcome {
            state,
            amount_in,
            amount_out,
            fee,
            admin_fee,
        })
    }

    /// Deposits `amounts` and mints LP tokens. The first deposit must fund
    /// every reserve and mints exactly the invariant; later deposits may be
    /// imbalanced and pay the normalized trade fee on the deviation.
    pub fn add_liquidity(
        &self,
        amounts: &[u128],
        min_mint_amount: u128,
    ) -> Result<DepositOutcome, StableSwapError> {
        self.validate_amounts_count(amounts)?;
        if amounts.iter().all(|&amount| amount == 0) {
            return Err(StableSwapError::ZeroAmount);
        }
        let (lp_minted, asset_fees) = math::compute_lp_amount_for_deposit(
            amounts,
            &self.balances,
            self.lp_supply,
            Some(&self.fees),
            self.amp_coef,
        )?;
        if lp_minted < min_mint_amount {
            return Err(StableSwapError::InsufficientLiquidityMinted);
        }
        let mut state = self.clone();
        for (idx, (&amount, &asset_fee)) in amounts.iter().zip(asset_fees.iter()).enumerate() {
            let admin_fee = self.fees.admin_trade_fee(asset_fee)?;
            state.increase_balance(idx, amount)?;
            state.decrease_balance(idx, admin_fee)?;
            state.admin_fee_balances[idx] = state.admin_fee_balances[idx]
                .checked_add(admin_fee)
                .ok_or(MathError::AddOverflow(103))?;
        }
        state.lp_supply = state
            .lp_supply
            .checked_add(lp_minted)
            .ok_or(MathError::AddOverflow(104))?;
        tracing::debug!(?amounts, lp_minted, "add_liquidity");
        Ok(DepositOutcome {
            state,
            lp_minted,
            fees: asset_fees,
        })
    }

    /// Burns `lp_amount` for a proportional share of every reserve. No fee;
    /// a proportional exit does not shift the pool. Burning the entire
    /// supply returns the reserves exactly, leaving no dust behind.
    pub fn remove_liquidity_by_shares(
        &self,
        lp_amount: u128,
        min_amounts: &[u128],
    ) -> Result<WithdrawOutcome, StableSwapError> {
        self.validate_amounts_count(min_amounts)?;
        if lp_amount == 0 {
            return Err(StableSwapError::ZeroAmount);
        }
        if lp_amount > self.lp_supply {
            return Err(StableSwapError::InsufficientLpSupply);
        }
        let amounts = if lp_amount == self.lp_supply {
            self.balances.clone()
        } else {
            math::compute_amounts_given_lp(lp_amount, &self.balances, self.lp_supply)?
        };
        if amounts
            .iter()
            .zip(min_amounts.iter())
            .any(|(amount, min)| amount < min)
        {
            return Err(StableSwapError::InsufficientOutputAmount);
        }
        let mut state = self.clone();
        for (idx, &amount) in amounts.iter().enumerate() {
            state.decrease_balance(idx, amount)?;
        }
        state.lp_supply = state
            .lp_supply
            .checked_sub(lp_amount)
            .ok_or(MathError::SubUnderflow(103))?;
        tracing::debug!(lp_amount, ?amounts, "remove_liquidity_by_shares");
        let n_assets = self.n_assets();
        Ok(WithdrawOutcome {
            state,
            lp_burned: lp_amount,
            amounts,
            fees: vec![0; n_assets],
        })
    }

    /// Withdraws exact `amounts`, burning whatever share they are worth plus
    /// the normalized trade fee on the imbalance. Fails with
    /// `InsufficientLiquidityBurned` if the burn exceeds `max_lp_burned`.
    pub fn remove_liquidity_by_amounts(
        &self,
        amounts: &[u128],
        max_lp_burned: u128,
    ) -> Result<WithdrawOutcome, StableSwapError> {
        self.validate_amounts_count(amounts)?;
        if amounts.iter().all(|&amount| amount == 0) {
            return Err(StableSwapError::ZeroAmount);
        }
        // Every reserve must stay strictly positive; emptying one collapses
        // the invariant. Use remove_liquidity_by_shares for a full exit.
        if amounts
            .iter()
            .zip(self.balances.iter())
            .any(|(amount, balance)| amount >= balance)
        {
            return Err(StableSwapError::InsufficientLiquidity);
        }
        let (lp_burned, asset_fees) = math::compute_lp_amount_for_withdraw(
            amounts,
            &self.balances,
            self.lp_supply,
            Some(&self.fees),
            self.amp_coef,
        )?;
        if lp_burned > self.lp_supply {
            return Err(StableSwapError::InsufficientLpSupply);
        }
        if lp_burned > max_lp_burned {
            return Err(StableSwapError::InsufficientLiquidityBurned);
        }
        let mut state = self.clone();
        for (idx, (&amount, &asset_fee)) in amounts.iter().zip(asset_fees.iter()).enumerate() {
            let admin_fee = self.fees.admin_trade_fee(asset_fee)?;
            state.decrease_balance(idx, amount)?;
            state.decrease_balance(idx, admin_fee)?;
            state.admin_fee_balances[idx] = state.admin_fee_balances[idx]
                .checked_add(admin_fee)
                .ok_or(MathError::AddOverflow(105))?;
        }
        state.lp_supply = state
            .lp_supply
            .checked_sub(lp_burned)
            .ok_or(MathError::SubUnderflow(101))?;
        tracing::debug!(?amounts, lp_burned, "remove_liquidity_by_amounts");
        Ok(WithdrawOutcome {
            state,
            lp_burned,
            amounts: amounts.to_vec(),
            fees: asset_fees,
        })
    }

    /// Burns `lp_amount` for a single asset, paying the withdrawal fee on
    /// the imbalance the one-sided exit creates. Burning the whole supply
    /// this way is rejected; the other reserves would be stranded.
    pub fn remove_liquidity_one_token(
        &self,
        lp_amount: u128,
        token_out: usize,
        min_amount_out: u128,
    ) -> Result<WithdrawOneTokenOutcome, StableSwapError> {
        self.validate_token_index(token_out)?;
        if lp_amount == 0 {
            return Err(StableSwapError::ZeroAmount);
        }
        if lp_amount >= self.lp_supply {
            return Err(StableSwapError::InsufficientLpSupply);
        }
        let (amount_out, fee) = math::compute_withdraw_one_token(
            lp_amount,
            token_out,
            &self.balances,
            self.lp_supply,
            Some(&self.fees),
            self.amp_coef,
        )?;
        if amount_out < min_amount_out {
            return Err(StableSwapError::InsufficientOutputAmount);
        }
        let admin_fee = self.fees.admin_trade_fee(fee)?;
        let mut state = self.clone();
        state.decrease_balance(token_out, amount_out)?;
        state.decrease_balance(token_out, admin_fee)?;
        state.admin_fee_balances[token_out] = state.admin_fee_balances[token_out]
            .checked_add(admin_fee)
            .ok_or(MathError::AddOverflow(106))?;
        state.lp_supply = state
            .lp_supply
            .checked_sub(lp_amount)
            .ok_or(MathError::SubUnderflow(104))?;
        tracing::debug!(lp_amount, token_out, amount_out, fee, "remove_liquidity_one_token");
        Ok(WithdrawOneTokenOutcome {
            state,
            lp_burned: lp_amount,
            amount_out,
            fee,
            admin_fee,
        })
    }

    fn validate_token_index(&self, token: usize) -> Result<(), StableSwapError> {
        if token >= self.n_assets() {
            return Err(StableSwapError::InvalidTokenIndex);
        }
        Ok(())
    }

    fn validate_token_pair(&self, token_in: usize, token_out: usize) -> Result<(), StableSwapError> {
        self.validate_token_index(token_in)?;
        self.validate_token_index(token_out)?;
        if token_in == token_out {
            return Err(StableSwapError::InvalidTokenIndex);
        }
        Ok(())
    }

    fn validate_amounts_count(&self, amounts: &[u128]) -> Result<(), StableSwapError> {
        if amounts.len() != self.n_assets() {
            return Err(StableSwapError::IncorrectAmountsCount);
        }
        Ok(())
    }

    fn increase_balance(&mut self, idx: usize, amount: u128) -> Result<(), StableSwapError> {
        self.balances[idx] = self.balances[idx]
            .checked_add(amount)
            .ok_or(MathError::AddOverflow(107))?;
        Ok(())
    }

    fn decrease_balance(&mut self, idx: usize, amount: u128) -> Result<(), StableSwapError> {
        self.balances[idx] = self.balances[idx]
            .checked_sub(amount)
            .ok_or(MathError::SubUnderflow(102))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_pool(balances: &[u128], amp_coef: u128, fees: Fees) -> PoolState {
        let pool = PoolState::new(balances.len(), amp_coef, fees)
            .unwrap_or_else(|err| panic!("Should create pool: {err:?}"));
        pool.add_liquidity(balances, 0)
            .unwrap_or_else(|err| panic!("Should fund pool: {err:?}"))
            .state
    }

    #[test]
    fn pool_construction_is_validated() {
        assert!(PoolState::new(2, 100, Fees::zero()).is_ok());
        assert!(PoolState::new(4, 100, Fees::zero()).is_ok());
        assert_eq!(
            PoolState::new(1, 100, Fees::zero()),
            Err(StableSwapError::IncorrectAssetCount)
        );
        assert_eq!(
            PoolState::new(5, 100, Fees::zero()),
            Err(StableSwapError::IncorrectAssetCount)
        );
        assert_eq!(
            PoolState::new(2, 0, Fees::zero()),
            Err(StableSwapError::InvalidAmpCoef)
        );
        assert_eq!(
            PoolState::new(2, 1_000_001, Fees::zero()),
            Err(StableSwapError::InvalidAmpCoef)
        );
    }

    #[test]
    fn first_deposit_mints_the_invariant() {
        let pool = PoolState::new(2, 100, Fees::new(4, 2_000).unwrap()).unwrap();
        let outcome = pool.add_liquidity(&[500, 500], 0).unwrap();
        let d: u128 = outcome.state.invariant().unwrap().as_u128();
        assert_eq!(outcome.lp_minted, d);
        assert_eq!(outcome.state.lp_supply(), d);
        assert_eq!(outcome.state.balances(), &[500, 500]);
        assert_eq!(outcome.fees, vec![0, 0]);
    }

    #[test]
    fn first_deposit_rejects_a_zero_amount() {
        let pool = PoolState::new(2, 100, Fees::zero()).unwrap();
        assert_eq!(
            pool.add_liquidity(&[500, 0], 0),
            Err(StableSwapError::ZeroAmount)
        );
    }

    #[test]
    fn swap_quote_stays_within_stable_bounds() {
        let pool = funded_pool(&[1_000_000, 1_000_000], 100, Fees::new(4, 0).unwrap());
        let outcome = pool.swap_exact_in(0, 1, 100_000, 0).unwrap();
        // Near peg, a stable swap returns slightly less than 1:1.
        assert!(outcome.amount_out < 100_000);
        assert!(outcome.amount_out > 99_500, "out={}", outcome.amount_out);
        assert_eq!(outcome.state.balances()[0], 1_100_000);
        assert_eq!(
            outcome.state.balances()[1],
            1_000_000 - outcome.amount_out
        );
    }

    #[test]
    fn swap_never_decreases_the_invariant() {
        let pool = funded_pool(&[1_000_000, 1_000_000], 100, Fees::new(30, 5_000).unwrap());
        let d_before = pool.invariant().unwrap();
        let outcome = pool.swap_exact_in(0, 1, 250_000, 0).unwrap();
        let d_after = outcome.state.invariant().unwrap();
        assert!(d_after >= d_before, "{d_after} < {d_before}");
    }

    #[test]
    fn swap_validations() {
        let pool = funded_pool(&[1_000_000, 1_000_000], 100, Fees::zero());
        assert_eq!(
            pool.swap_exact_in(0, 0, 1_000, 0),
            Err(StableSwapError::InvalidTokenIndex)
        );
        assert_eq!(
            pool.swap_exact_in(0, 2, 1_000, 0),
            Err(StableSwapError::InvalidTokenIndex)
        );
        assert_eq!(
            pool.swap_exact_in(0, 1, 0, 0),
            Err(StableSwapError::ZeroAmount)
        );
        assert_eq!(
            pool.swap_exact_in(0, 1, 1_000, 1_001),
            Err(StableSwapError::InsufficientOutputAmount)
        );
        let empty = PoolState::new(2, 100, Fees::zero()).unwrap();
        assert_eq!(
            empty.swap_exact_in(0, 1, 1_000, 0),
            Err(StableSwapError::InsufficientLiquidity)
        );
    }

    #[test]
    fn swap_exact_out_charges_at_least_the_forward_quote() {
        let pool = funded_pool(&[1_000_000, 1_000_000], 100, Fees::new(30, 0).unwrap());
        let forward = pool.swap_exact_in(0, 1, 50_000, 0).unwrap();
        let backward = pool
            .swap_exact_out(0, 1, forward.amount_out, u128::MAX)
            .unwrap();
        assert!(backward.amount_in + 2 >= 50_000);
        assert!(backward.amount_in <= 50_000 + 4);
        assert_eq!(
            pool.swap_exact_out(0, 1, forward.amount_out, forward.amount_out / 2),
            Err(StableSwapError::TooLargeInputAmount)
        );
    }

    #[test]
    fn admin_fee_accrues_outside_the_reserves() {
        let pool = funded_pool(&[1_000_000, 1_000_000], 100, Fees::new(1_000, 5_000).unwrap());
        let outcome = pool.swap_exact_in(0, 1, 100_000, 0).unwrap();
        assert!(outcome.fee > 0);
        assert_eq!(outcome.admin_fee, outcome.fee / 2);
        assert_eq!(outcome.state.admin_fee_balances(), &[0, outcome.admin_fee]);
        // reserve lost the net output plus only the admin share of the fee
        assert_eq!(
            outcome.state.balances()[1],
            1_000_000 - outcome.amount_out - outcome.admin_fee
        );
    }

    #[test]
    fn proportional_exit_pays_no_fee() {
        let pool = funded_pool(
            &[1_000_000_000, 1_000_000_000],
            200,
            Fees::new(30, 5_000).unwrap(),
        );
        // Balanced pool, so the supply equals the plain sum of reserves and
        // a 10% burn divides evenly.
        let lp = pool.lp_supply() / 10;
        let outcome = pool.remove_liquidity_by_shares(lp, &[0, 0]).unwrap();
        assert_eq!(outcome.fees, vec![0, 0]);
        assert_eq!(outcome.amounts, vec![100_000_000, 100_000_000]);
        assert_eq!(outcome.state.lp_supply(), pool.lp_supply() - lp);
        assert_eq!(
            pool.remove_liquidity_by_shares(lp, &[100_000_001, 0]),
            Err(StableSwapError::InsufficientOutputAmount)
        );
    }

    #[test]
    fn full_exit_returns_the_reserves_exactly() {
        let pool = funded_pool(&[1_000_003, 999_999], 100, Fees::new(30, 5_000).unwrap());
        let outcome = pool
            .remove_liquidity_by_shares(pool.lp_supply(), &[0, 0])
            .unwrap();
        assert_eq!(outcome.amounts, pool.balances().to_vec());
        assert_eq!(outcome.state.lp_supply(), 0);
        assert_eq!(outcome.state.balances(), &[0, 0]);
        assert_eq!(
            pool.remove_liquidity_by_shares(pool.lp_supply() + 1, &[0, 0]),
            Err(StableSwapError::InsufficientLpSupply)
        );
    }

    #[test]
    fn withdraw_by_amounts_burns_proportional_share_plus_fee() {
        let pool = funded_pool(&[1_000_000, 1_000_000], 100, Fees::new(30, 0).unwrap());
        let supply = pool.lp_supply();
        // Imbalanced withdrawal pays a fee, so it burns more than the
        // proportional share of the supply is worth.
        let outcome = pool
            .remove_liquidity_by_amounts(&[100_000, 0], u128::MAX)
            .unwrap();
        assert!(outcome.lp_burned > supply / 20);
        assert!(outcome.fees.iter().any(|&fee| fee > 0));
        assert_eq!(outcome.state.lp_supply(), supply - outcome.lp_burned);
        assert_eq!(
            pool.remove_liquidity_by_amounts(&[100_000, 0], 1),
            Err(StableSwapError::InsufficientLiquidityBurned)
        );
        assert_eq!(
            pool.remove_liquidity_by_amounts(&[1_000_000, 0], u128::MAX),
            Err(StableSwapError::InsufficientLiquidity)
        );
        assert_eq!(
            pool.remove_liquidity_by_amounts(&[0, 0], u128::MAX),
            Err(StableSwapError::ZeroAmount)
        );
    }

    #[test]
    fn withdraw_one_token_charges_the_imbalance_fee() {
        let pool = funded_pool(&[1_000_000, 1_000_000], 100, Fees::new(1_000, 5_000).unwrap());
        let lp = pool.lp_supply() / 100;
        let outcome = pool.remove_liquidity_one_token(lp, 0, 0).unwrap();
        assert!(outcome.amount_out > 0);
        assert!(outcome.fee > 0);
        assert_eq!(outcome.admin_fee, outcome.fee / 2);
        assert_eq!(outcome.state.admin_fee_balances()[0], outcome.admin_fee);
        assert_eq!(outcome.state.lp_supply(), pool.lp_supply() - lp);
        assert_eq!(
            pool.remove_liquidity_one_token(pool.lp_supply(), 0, 0),
            Err(StableSwapError::InsufficientLpSupply)
        );
        assert_eq!(
            pool.remove_liquidity_one_token(lp, 2, 0),
            Err(StableSwapError::InvalidTokenIndex)
        );
    }

    #[test]
    fn virtual_price_starts_at_one_and_grows_with_fees() {
        let pool = funded_pool(&[1_000_000_000, 1_000_000_000], 100, Fees::new(30, 0).unwrap());
        let price = pool.virtual_price().unwrap();
        assert_eq!(price, VIRTUAL_PRICE_PRECISION);
        let swapped = pool.swap_exact_in(0, 1, 100_000_000, 0).unwrap().state;
        assert!(swapped.virtual_price().unwrap() > price);
        let empty = PoolState::new(2, 100, Fees::zero()).unwrap();
        assert_eq!(
            empty.virtual_price(),
            Err(StableSwapError::InsufficientLpSupply)
        );
    }

    #[test]
    fn operations_are_deterministic() {
        let pool = funded_pool(&[123_456_789, 987_654_321], 85, Fees::new(2_137, 500).unwrap());
        let first = pool.swap_exact_in(1, 0, 55_555, 0).unwrap();
        let second = pool.swap_exact_in(1, 0, 55_555, 0).unwrap();
        assert_eq!(first, second);
    }
}
