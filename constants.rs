pub mod stable_pool {
    /// Pools trade between 2 and 4 assets. All amounts are assumed to be
    /// rescaled to a common precision before they reach this crate.
    pub const MIN_COINS: usize = 2;
    pub const MAX_COINS: usize = 4;

    /// Min amplification coefficient.
    pub const MIN_AMP: u128 = 1;
    /// Max amplification coefficient.
    pub const MAX_AMP: u128 = 1_000_000;

    /// Virtual price (D per LP token) is reported with 18 decimal places.
    pub const VIRTUAL_PRICE_DECIMALS: u8 = 18;
    pub const VIRTUAL_PRICE_PRECISION: u128 = 10u128.pow(VIRTUAL_PRICE_DECIMALS as u32);
}
