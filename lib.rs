//! Core math for a stable swap automated market maker.
//!
//! The pool trades between assets that are expected to hold a common peg,
//! using the invariant
//! `A * n^n * SUM{x_i} + D = A * n^n * D + D^(n+1) / (n^n * PROD{x_i})`,
//! which behaves like a constant sum near balance and like a constant
//! product as reserves drift apart. The amplification coefficient `A`
//! controls where the transition happens.
//!
//! [`pool::PoolState`] is the entry point: a value-semantics snapshot whose
//! operations (swaps, deposits, withdrawals) return a successor state
//! instead of mutating in place. The solvers and quoting primitives in
//! [`stable_swap_math`] are exposed directly for callers that manage their
//! own state.
//!
//! This crate does no I/O, keeps no clocks and talks to no ledger; token
//! transfers, access control and amount rescaling belong to the caller.

pub mod constants;
pub mod error;
pub mod math;
pub mod pool;
pub mod stable_swap_math;

pub use error::StableSwapError;
pub use pool::{
    DepositOutcome, PoolState, SwapOutcome, WithdrawOneTokenOutcome, WithdrawOutcome,
};
pub use stable_swap_math::fees::Fees;
