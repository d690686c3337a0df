//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Implements Cooley-Tukey radix-2 NTT for negacyclic convolution over
//! R_q = Z_q[X]/(X^d + 1). The NTT enables O(n log n) polynomial multiplication
//! instead of O(n²) naive multiplication.
//!
//! # Theory
//!
//! For negacyclic convolution (multiplication modulo X^n + 1), we use a
//! primitive 2n-th root of unity ψ where ψ^n = -1. The forward transform
//! evaluates a polynomial at the odd powers of ψ (output in bit-reversed order),
//! so multiplication becomes pointwise in the evaluation domain.
//!
//! Twiddle factors are stored together with their Shoup quotients, so every
//! butterfly costs one multiply-high instead of a 128-bit division.
//!
//! # Example
//!
//! ```
//! use recursive_pir::math::NttContext;
//!
//! let ctx = NttContext::with_default_q(256);
//!
//! let mut coeffs = vec![1u64; 256];
//! ctx.forward(&mut coeffs);
//! ctx.inverse(&mut coeffs);
//! assert_eq!(coeffs[0], 1);
//! ```

use super::modular::{ModQ, DEFAULT_Q};

/// Precomputed NTT context with twiddle factors.
///
/// Create once per (dimension, modulus) pair and share; all transforms take `&self`.
#[derive(Clone, Debug)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// Modulus q ≡ 1 (mod 2n).
    q: u64,
    /// Powers of ψ in bit-reversed order.
    psi_powers: Vec<u64>,
    psi_powers_shoup: Vec<u64>,
    /// Powers of ψ^(-1) in bit-reversed order.
    psi_inv_powers: Vec<u64>,
    psi_inv_powers_shoup: Vec<u64>,
    /// n^(-1) mod q for inverse NTT scaling.
    n_inv: u64,
    n_inv_shoup: u64,
}

impl NttContext {
    /// Creates an NTT context for the given dimension and modulus.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two, if q does not satisfy q ≡ 1 (mod 2n),
    /// or if q ≥ 2^63. Callers validate parameters before building a context.
    pub fn new(n: usize, q: u64) -> Self {
        assert!(n.is_power_of_two() && n >= 2, "n must be a power of two");
        assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");
        assert!(q < (1 << 63), "q must fit in 63 bits");

        let log_n = n.trailing_zeros();
        let psi = Self::find_primitive_root(2 * n as u64, q);
        let psi_inv = ModQ::pow(psi, q - 2, q);

        let psi_powers: Vec<u64> = (0..n)
            .map(|i| ModQ::pow(psi, Self::bit_reverse(i, log_n) as u64, q))
            .collect();
        let psi_inv_powers: Vec<u64> = (0..n)
            .map(|i| ModQ::pow(psi_inv, Self::bit_reverse(i, log_n) as u64, q))
            .collect();

        let psi_powers_shoup = psi_powers
            .iter()
            .map(|&w| ModQ::shoup_precompute(w, q))
            .collect();
        let psi_inv_powers_shoup = psi_inv_powers
            .iter()
            .map(|&w| ModQ::shoup_precompute(w, q))
            .collect();

        let n_inv = ModQ::pow(n as u64, q - 2, q);

        Self {
            n,
            q,
            psi_powers,
            psi_powers_shoup,
            psi_inv_powers,
            psi_inv_powers_shoup,
            n_inv,
            n_inv_shoup: ModQ::shoup_precompute(n_inv, q),
        }
    }

    /// Creates an NTT context with the default modulus.
    pub fn with_default_q(n: usize) -> Self {
        Self::new(n, DEFAULT_Q)
    }

    /// Returns the ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Returns the modulus q.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Performs forward NTT in-place using Cooley-Tukey decimation-in-time.
    ///
    /// Input coefficients must be reduced modulo q. Output is in bit-reversed order.
    pub fn forward(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "Input length must match dimension");

        let n = self.n;
        let q = self.q;
        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let j2 = j1 + t;
                let w = self.psi_powers[m + i];
                let w_shoup = self.psi_powers_shoup[m + i];

                for j in j1..j2 {
                    let u = coeffs[j];
                    let v = ModQ::shoup_mul(coeffs[j + t], w, w_shoup, q);
                    coeffs[j] = ModQ::add(u, v, q);
                    coeffs[j + t] = ModQ::sub(u, v, q);
                }
            }
            m <<= 1;
        }
    }

    /// Performs inverse NTT in-place using Gentleman-Sande decimation-in-frequency.
    ///
    /// Takes bit-reversed evaluations from [`forward`](Self::forward) and returns
    /// coefficients in natural order, scaled by n^(-1).
    pub fn inverse(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "Input length must match dimension");

        let n = self.n;
        let q = self.q;
        let mut t = 1;
        let mut m = n;

        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let w = self.psi_inv_powers[h + i];
                let w_shoup = self.psi_inv_powers_shoup[h + i];

                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = ModQ::add(u, v, q);
                    coeffs[j + t] = ModQ::shoup_mul(ModQ::sub(u, v, q), w, w_shoup, q);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }

        for c in coeffs.iter_mut() {
            *c = ModQ::shoup_mul(*c, self.n_inv, self.n_inv_shoup, q);
        }
    }

    /// Pointwise multiplication of two NTT-domain vectors.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        assert_eq!(a.len(), self.n);
        assert_eq!(b.len(), self.n);
        assert_eq!(result.len(), self.n);

        for ((r, &x), &y) in result.iter_mut().zip(a).zip(b) {
            *r = ModQ::mul(x, y, self.q);
        }
    }

    /// Finds ψ with ψ^(two_n) = 1 and ψ^(two_n / 2) = -1.
    fn find_primitive_root(two_n: u64, q: u64) -> u64 {
        let exponent = (q - 1) / two_n;
        let mut g = 2u64;
        loop {
            let candidate = ModQ::pow(g, exponent, q);
            if ModQ::pow(candidate, two_n / 2, q) == q - 1 {
                return candidate;
            }
            g += 1;
        }
    }

    fn bit_reverse(x: usize, bits: u32) -> usize {
        if bits == 0 {
            return 0;
        }
        x.reverse_bits() >> (usize::BITS - bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn schoolbook_negacyclic(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
        let n = a.len();
        let mut result = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let prod = ModQ::mul(a[i], b[j], q);
                let k = i + j;
                if k < n {
                    result[k] = ModQ::add(result[k], prod, q);
                } else {
                    result[k - n] = ModQ::sub(result[k - n], prod, q);
                }
            }
        }
        result
    }

    #[test]
    fn test_ntt_inverse_roundtrip_small() {
        let n = 16;
        let ctx = NttContext::with_default_q(n);

        let original: Vec<u64> = (0..n as u64).collect();
        let mut coeffs = original.clone();

        ctx.forward(&mut coeffs);
        ctx.inverse(&mut coeffs);

        assert_eq!(coeffs, original);
    }

    #[test]
    fn test_ntt_inverse_roundtrip_1024() {
        let n = 1024;
        let ctx = NttContext::with_default_q(n);

        let original: Vec<u64> = (0..n as u64).map(|i| (i * 12345) % DEFAULT_Q).collect();
        let mut coeffs = original.clone();

        ctx.forward(&mut coeffs);
        ctx.inverse(&mut coeffs);

        assert_eq!(coeffs, original);
    }

    #[test]
    fn test_ntt_zero_polynomial() {
        let n = 256;
        let ctx = NttContext::with_default_q(n);

        let mut coeffs = vec![0u64; n];
        ctx.forward(&mut coeffs);
        assert!(coeffs.iter().all(|&c| c == 0));

        ctx.inverse(&mut coeffs);
        assert!(coeffs.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_negacyclic_convolution() {
        // x * x^(n-1) = x^n = -1 in Z_q[X]/(X^n + 1)
        let n = 256;
        let q = DEFAULT_Q;
        let ctx = NttContext::with_default_q(n);

        let mut a = vec![0u64; n];
        a[1] = 1;
        let mut b = vec![0u64; n];
        b[n - 1] = 1;

        ctx.forward(&mut a);
        ctx.forward(&mut b);

        let mut result = vec![0u64; n];
        ctx.pointwise_mul(&a, &b, &mut result);
        ctx.inverse(&mut result);

        assert_eq!(result[0], q - 1);
        assert!(result[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_matches_schoolbook_random() {
        let n = 32;
        let q = DEFAULT_Q;
        let ctx = NttContext::with_default_q(n);
        let mut rng = rand::thread_rng();

        let a: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q)).collect();
        let b: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q)).collect();
        let expected = schoolbook_negacyclic(&a, &b, q);

        let mut a_ntt = a.clone();
        let mut b_ntt = b.clone();
        ctx.forward(&mut a_ntt);
        ctx.forward(&mut b_ntt);
        let mut product = vec![0u64; n];
        ctx.pointwise_mul(&a_ntt, &b_ntt, &mut product);
        ctx.inverse(&mut product);

        assert_eq!(product, expected);
    }

    #[test]
    fn test_linearity() {
        let n = 256;
        let ctx = NttContext::with_default_q(n);
        let q = DEFAULT_Q;

        let a: Vec<u64> = (0..n as u64).collect();
        let b: Vec<u64> = (0..n as u64).map(|i| (i * 2) % q).collect();

        let mut a_ntt = a.clone();
        let mut b_ntt = b.clone();
        ctx.forward(&mut a_ntt);
        ctx.forward(&mut b_ntt);

        let mut sum: Vec<u64> = a.iter().zip(&b).map(|(&x, &y)| (x + y) % q).collect();
        ctx.forward(&mut sum);

        for i in 0..n {
            assert_eq!(sum[i], ModQ::add(a_ntt[i], b_ntt[i], q));
        }
    }
}
