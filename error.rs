use thiserror::Error;

use crate::math::MathError;

/// Failure of a pool operation.
///
/// `Math` and `NotConverged` are fatal: they indicate the computation could
/// not be carried out at all and the surrounding operation must be aborted.
/// The remaining kinds are caller errors, recoverable by retrying with
/// corrected input. No variant leaves a partially mutated pool behind;
/// operations only produce a new state on success.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StableSwapError {
    #[error(transparent)]
    Math(#[from] MathError),
    /// Newton iteration hit the iteration cap without reaching the
    /// convergence tolerance. Never retried internally.
    #[error("invariant computation did not converge")]
    NotConverged,
    #[error("requested amount is zero")]
    ZeroAmount,
    #[error("token index out of range or identical to its counterpart")]
    InvalidTokenIndex,
    #[error("amounts count does not match the pool's asset count")]
    IncorrectAmountsCount,
    #[error("pools support between 2 and 4 assets")]
    IncorrectAssetCount,
    #[error("amplification coefficient out of range")]
    InvalidAmpCoef,
    #[error("fee rate must be below 10000 bps")]
    InvalidFeeBps,
    #[error("pool reserves cannot cover the requested amount")]
    InsufficientLiquidity,
    #[error("burn amount exceeds the LP token supply")]
    InsufficientLpSupply,
    #[error("computed output is below the requested minimum")]
    InsufficientOutputAmount,
    #[error("required input exceeds the requested maximum")]
    TooLargeInputAmount,
    #[error("minted LP amount is below the requested minimum")]
    InsufficientLiquidityMinted,
    #[error("burned LP amount exceeds the requested maximum")]
    InsufficientLiquidityBurned,
}
