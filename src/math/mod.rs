//! Mathematical primitives for the Ring-LWE backend.
//!
//! - **Modular arithmetic** over Z_q, including Shoup multiplication
//! - **Number-Theoretic Transform (NTT)** for fast polynomial multiplication
//! - **Polynomial operations** over R_q = Z_q[X]/(X^d + 1)
//! - **Discrete Gaussian sampling** for secrets and errors
//! - **Bit packing** between byte strings and plaintext coefficients
//!
//! # Example
//!
//! ```
//! use recursive_pir::math::{NttContext, Poly};
//!
//! let ctx = NttContext::with_default_q(256);
//! let mut poly = Poly::random_with_rng(256, ctx.modulus(), &mut rand::thread_rng());
//! poly.to_ntt(&ctx);
//! assert!(poly.is_ntt());
//! ```

pub mod modular;
pub mod ntt;
pub mod packing;
pub mod poly;
pub mod sampler;

pub use modular::{ModQ, DEFAULT_Q};
pub use ntt::NttContext;
pub use packing::{bytes_to_coeffs, coeffs_to_bytes};
pub use poly::Poly;
pub use sampler::{GaussianSampler, DEFAULT_SIGMA};
