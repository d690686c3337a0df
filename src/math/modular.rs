//! Modular arithmetic operations over Z_q
//!
//! Plain `u128`-widening helpers plus Shoup multiplication: when one operand `w`
//! is fixed, precomputing `w' = floor(w * 2^64 / q)` turns `x * w mod q` into one
//! multiply-high, two wrapping multiplies and a conditional subtraction.

/// Default modulus q = 2^60 - 2^14 + 1 (NTT-friendly prime).
///
/// q - 1 is divisible by 2^14, so negacyclic NTTs exist for ring dimensions up to 8192.
pub const DEFAULT_Q: u64 = 1152921504606830593;

/// Modular arithmetic operations over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q (inputs already reduced)
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = a + b;
        if sum >= q {
            sum - q
        } else {
            sum
        }
    }

    /// Subtract two values modulo q (inputs already reduced)
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        let prod = (a as u128) * (b as u128);
        (prod % (q as u128)) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Convert a signed integer to its representation in Z_q
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        if val >= 0 {
            (val as u64) % q
        } else {
            let abs = val.unsigned_abs() % q;
            if abs == 0 {
                0
            } else {
                q - abs
            }
        }
    }

    /// Modular exponentiation by squaring
    pub fn pow(mut base: u64, mut exp: u64, q: u64) -> u64 {
        let mut result = 1u64 % q;
        base %= q;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, q);
            }
            base = Self::mul(base, base, q);
            exp >>= 1;
        }
        result
    }

    /// Inverse modulo a prime q (Fermat). Returns `None` for zero.
    pub fn inverse(a: u64, q: u64) -> Option<u64> {
        if a % q == 0 {
            return None;
        }
        Some(Self::pow(a, q - 2, q))
    }

    /// Shoup quotient `floor(w * 2^64 / q)` for a fixed multiplicand `w < q`
    #[inline]
    pub fn shoup_precompute(w: u64, q: u64) -> u64 {
        (((w as u128) << 64) / q as u128) as u64
    }

    /// `x * w mod q` using the precomputed Shoup quotient of `w`.
    ///
    /// Requires `w < q < 2^63`; `x` may be any `u64`.
    #[inline]
    pub fn shoup_mul(x: u64, w: u64, w_shoup: u64, q: u64) -> u64 {
        let q_hat = ((x as u128 * w_shoup as u128) >> 64) as u64;
        let r = x.wrapping_mul(w).wrapping_sub(q_hat.wrapping_mul(q));
        if r >= q {
            r - q
        } else {
            r
        }
    }
}
