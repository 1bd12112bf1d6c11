use primitive_types::U256;
use thiserror::Error;

/// Arithmetic failure. The payload is a unique call-site code which makes it
/// possible to locate the exact operation that failed from a logged error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("addition overflow ({0})")]
    AddOverflow(u8),
    #[error("subtraction underflow ({0})")]
    SubUnderflow(u8),
    #[error("multiplication overflow ({0})")]
    MulOverflow(u8),
    #[error("division by zero ({0})")]
    DivByZero(u8),
    #[error("cast overflow ({0})")]
    CastOverflow(u8),
}

/// Widening multiplication. The product of two `u128` always fits in `U256`,
/// so this cannot fail.
pub fn casted_mul(a: u128, b: u128) -> U256 {
    U256::from(a) * U256::from(b)
}

/// Rounding direction of a fixed-point division.
///
/// Amounts paid out by the pool round down, amounts owed to the pool round
/// up, so that rounding never works against liquidity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Computes `a * b / c` with the intermediate product widened to 256 bits.
pub fn mul_div(a: u128, b: u128, c: u128, rounding: Rounding) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivByZero(41));
    }
    let divisor = U256::from(c);
    let product = casted_mul(a, b);
    let quotient = match rounding {
        Rounding::Down => product / divisor,
        Rounding::Up => {
            if (product % divisor).is_zero() {
                product / divisor
            } else {
                product / divisor + 1
            }
        }
    };
    quotient
        .try_into()
        .map_err(|_| MathError::CastOverflow(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_rounds_in_requested_direction() {
        assert_eq!(mul_div(10, 10, 3, Rounding::Down), Ok(33));
        assert_eq!(mul_div(10, 10, 3, Rounding::Up), Ok(34));
        // Exact division is unaffected by the rounding direction.
        assert_eq!(mul_div(10, 9, 3, Rounding::Down), Ok(30));
        assert_eq!(mul_div(10, 9, 3, Rounding::Up), Ok(30));
    }

    #[test]
    fn mul_div_widens_the_intermediate_product() {
        assert_eq!(
            mul_div(u128::MAX, u128::MAX, u128::MAX, Rounding::Down),
            Ok(u128::MAX)
        );
    }

    #[test]
    fn mul_div_rejects_zero_divisor() {
        assert_eq!(
            mul_div(1, 1, 0, Rounding::Down),
            Err(MathError::DivByZero(41))
        );
    }

    #[test]
    fn mul_div_rejects_unrepresentable_result() {
        assert_eq!(
            mul_div(u128::MAX, u128::MAX, 1, Rounding::Down),
            Err(MathError::CastOverflow(1))
        );
    }
}
