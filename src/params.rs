//! Parameter sets for recursive PIR
//!
//! [`RlweParams`] describes the Ring-LWE cryptosystem, [`PirParameters`] the
//! database layout (element count and size, aggregation, recursion dimensions)
//! shared by the client and server pipeline stages.

use serde::{Deserialize, Serialize};

use crate::crypto::CryptoParams;
use crate::error::{pir_err, Result};
use crate::math::{DEFAULT_Q, DEFAULT_SIGMA};

/// Smallest supported ring dimension
pub const MIN_RING_DIM: usize = 16;
/// Largest ring dimension the default modulus admits a negacyclic NTT for
pub const MAX_RING_DIM: usize = 8192;
/// Bit width of the default modulus
pub const MODULUS_BITS: u32 = 60;

/// Core cryptographic parameters for the Ring-LWE backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlweParams {
    /// Ring dimension d (power of two)
    pub ring_dim: usize,

    /// Ciphertext modulus q
    /// Must be NTT-friendly: q ≡ 1 (mod 2d)
    pub q: u64,

    /// Plaintext modulus is p = 2^plaintext_bits; each plaintext coefficient
    /// carries this many bits of database content
    pub plaintext_bits: u32,

    /// Standard deviation for Gaussian secret and error sampling
    pub sigma: f64,

    /// Nominal security label carried in parameter strings
    pub security_bits: u32,
}

impl RlweParams {
    /// Parameters with the default modulus, 16-bit plaintexts and σ = 3.2
    pub fn new(ring_dim: usize, security_bits: u32) -> Self {
        Self {
            ring_dim,
            q: DEFAULT_Q,
            plaintext_bits: 16,
            sigma: DEFAULT_SIGMA,
            security_bits,
        }
    }

    /// `LWE:80:1024:60`
    pub fn lwe_80_1024() -> Self {
        Self::new(1024, 80)
    }

    /// `LWE:80:2048:60`
    pub fn lwe_80_2048() -> Self {
        Self::new(2048, 80)
    }

    /// `LWE:128:4096:60`
    pub fn lwe_128_4096() -> Self {
        Self::new(4096, 128)
    }

    /// Plaintext modulus p = 2^plaintext_bits
    pub fn plaintext_modulus(&self) -> u64 {
        1u64 << self.plaintext_bits
    }

    /// Scaling factor Δ = ⌊q/p⌋
    pub fn delta(&self) -> u64 {
        self.q / self.plaintext_modulus()
    }

    /// Bytes carried by one plaintext polynomial
    pub fn plaintext_bytesize(&self) -> usize {
        self.ring_dim * self.plaintext_bits as usize / 8
    }

    /// Serialized ciphertext size: two polynomials of `u64` coefficients
    pub fn ciphertext_bytesize(&self) -> usize {
        2 * self.ring_dim * 8
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        if !self.ring_dim.is_power_of_two()
            || !(MIN_RING_DIM..=MAX_RING_DIM).contains(&self.ring_dim)
        {
            return Err(pir_err!(
                InvalidParameters,
                "ring dimension {} must be a power of two in [{}, {}]",
                self.ring_dim,
                MIN_RING_DIM,
                MAX_RING_DIM
            ));
        }
        if self.q >= 1 << 63 || self.q % (2 * self.ring_dim as u64) != 1 {
            return Err(pir_err!(
                InvalidParameters,
                "modulus {} must be below 2^63 and ≡ 1 (mod {})",
                self.q,
                2 * self.ring_dim
            ));
        }
        if !(1..=32).contains(&self.plaintext_bits)
            || (self.ring_dim * self.plaintext_bits as usize) % 8 != 0
        {
            return Err(pir_err!(
                InvalidParameters,
                "unsupported plaintext width of {} bits",
                self.plaintext_bits
            ));
        }
        if self.delta() < 2 {
            return Err(pir_err!(
                InvalidParameters,
                "plaintext modulus 2^{} leaves no room below q",
                self.plaintext_bits
            ));
        }
        if !(self.sigma > 0.0) {
            return Err(pir_err!(InvalidParameters, "sigma must be positive"));
        }
        Ok(())
    }
}

impl Default for RlweParams {
    fn default() -> Self {
        Self::lwe_80_2048()
    }
}

/// Database layout shared by all pipeline stages of one request.
///
/// Invariant (checked on construction and deserialization): the product of
/// the recursion dimensions covers the `ceil(num_elements / aggregation)`
/// aggregated rows. Dimension 0 is the most significant coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PirParameters {
    crypto: CryptoParams,
    num_elements: u64,
    bytes_per_element: u64,
    aggregation: u64,
    dimensions: Vec<u64>,
}

impl PirParameters {
    /// Create and validate a parameter set
    pub fn new(
        crypto: CryptoParams,
        num_elements: u64,
        bytes_per_element: u64,
        aggregation: u64,
        dimensions: Vec<u64>,
    ) -> Result<Self> {
        let params = Self {
            crypto,
            num_elements,
            bytes_per_element,
            aggregation,
            dimensions,
        };
        params.validate()?;
        Ok(params)
    }

    /// Create a parameter set with `depth` balanced recursion dimensions
    pub fn with_recursion_depth(
        crypto: CryptoParams,
        num_elements: u64,
        bytes_per_element: u64,
        aggregation: u64,
        depth: usize,
    ) -> Result<Self> {
        if depth == 0 {
            return Err(pir_err!(InvalidParameters, "recursion depth must be >= 1"));
        }
        if aggregation == 0 {
            return Err(pir_err!(InvalidParameters, "aggregation must be >= 1"));
        }
        let rows = num_elements.div_ceil(aggregation).max(1);
        let dimensions = balanced_dimensions(rows, depth);
        Self::new(
            crypto,
            num_elements,
            bytes_per_element,
            aggregation,
            dimensions,
        )
    }

    fn validate(&self) -> Result<()> {
        self.crypto.validate()?;
        if self.num_elements == 0 {
            return Err(pir_err!(InvalidParameters, "database has no elements"));
        }
        if self.bytes_per_element == 0 {
            return Err(pir_err!(InvalidParameters, "bytes per element must be > 0"));
        }
        if self.aggregation == 0 {
            return Err(pir_err!(InvalidParameters, "aggregation must be >= 1"));
        }
        if self.aggregation.checked_mul(self.bytes_per_element).is_none() {
            return Err(pir_err!(InvalidParameters, "aggregated row size overflows"));
        }
        if self.dimensions.is_empty() || self.dimensions.contains(&0) {
            return Err(pir_err!(
                InvalidParameters,
                "recursion dimensions {:?} must be non-empty and positive",
                self.dimensions
            ));
        }
        let capacity = self
            .dimensions
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(d))
            .unwrap_or(u64::MAX);
        if capacity < self.num_rows() {
            return Err(pir_err!(
                InvalidParameters,
                "recursion dimensions {:?} cover {} rows, {} needed",
                self.dimensions,
                capacity,
                self.num_rows()
            ));
        }
        if self.checked_query_element_count().is_none() {
            return Err(pir_err!(
                InvalidParameters,
                "recursion dimensions {:?} overflow the query size",
                self.dimensions
            ));
        }
        if self.checked_reply_count().is_none() {
            return Err(pir_err!(
                InvalidParameters,
                "{} rounds of expansion {} overflow the reply count",
                self.depth(),
                self.expansion_factor()
            ));
        }
        Ok(())
    }

    fn checked_query_element_count(&self) -> Option<u64> {
        self.dimensions
            .iter()
            .try_fold(0u64, |acc, &d| acc.checked_add(d))
    }

    fn checked_reply_count(&self) -> Option<u64> {
        let rounds = u32::try_from(self.depth() - 1).ok()?;
        self.expansion_factor()
            .checked_pow(rounds)?
            .checked_mul(self.polys_per_row())
    }

    /// Crypto parameter set
    pub fn crypto(&self) -> &CryptoParams {
        &self.crypto
    }

    /// Number of database elements
    pub fn num_elements(&self) -> u64 {
        self.num_elements
    }

    /// Bytes per database element (per chunk when importing in passes)
    pub fn bytes_per_element(&self) -> u64 {
        self.bytes_per_element
    }

    /// Number of consecutive elements packed into one aggregated row
    pub fn aggregation(&self) -> u64 {
        self.aggregation
    }

    /// Recursion dimension sizes, most significant first
    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    /// Number of recursion rounds
    pub fn depth(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of aggregated rows addressed by the query
    pub fn num_rows(&self) -> u64 {
        self.num_elements.div_ceil(self.aggregation)
    }

    /// Bytes in one aggregated row
    pub fn row_bytesize(&self) -> u64 {
        self.aggregation * self.bytes_per_element
    }

    /// Number of query ciphertexts: the sum of the dimensions
    pub fn query_element_count(&self) -> u64 {
        self.checked_query_element_count().unwrap_or(u64::MAX)
    }

    /// Plaintext polynomials needed to hold one aggregated row
    pub fn polys_per_row(&self) -> u64 {
        self.row_bytesize()
            .div_ceil(self.crypto.plaintext_bytesize() as u64)
    }

    /// Plaintexts needed to carry one serialized ciphertext into the next round
    pub fn expansion_factor(&self) -> u64 {
        (self.crypto.ciphertext_bytesize() as u64)
            .div_ceil(self.crypto.plaintext_bytesize() as u64)
    }

    /// Number of reply ciphertexts produced by one reply generation
    pub fn expected_reply_count(&self) -> u64 {
        self.checked_reply_count().unwrap_or(u64::MAX)
    }

    /// Reply ciphertexts nested under one plaintext of the retrieved row
    pub fn replies_per_plaintext(&self) -> u64 {
        self.expected_reply_count() / self.polys_per_row()
    }

    /// Byte range of `index` inside its extracted aggregated row
    pub fn element_range(&self, index: u64) -> std::ops::Range<u64> {
        let start = self.offset_in_row(index);
        start..start + self.bytes_per_element
    }

    /// Byte offset of `index` inside its extracted aggregated row
    pub fn offset_in_row(&self, index: u64) -> u64 {
        (index % self.aggregation) * self.bytes_per_element
    }

    /// Same layout with a different per-element byte count, describing one
    /// chunked import pass of `len` bytes
    pub fn for_chunk(&self, len: u64) -> Result<Self> {
        Self::new(
            self.crypto.clone(),
            self.num_elements,
            len,
            self.aggregation,
            self.dimensions.clone(),
        )
    }

    /// Serialize to bytes using bincode
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes and re-validate
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let params: Self = bincode::deserialize(bytes)?;
        params.validate()?;
        Ok(params)
    }
}

/// Split `rows` into `depth` dimensions whose product covers it, each close to
/// the `depth`-th root.
fn balanced_dimensions(rows: u64, depth: usize) -> Vec<u64> {
    let mut dims = Vec::with_capacity(depth);
    let mut remaining = rows;
    for i in 0..depth {
        let k = (depth - i) as u32;
        let dim = ceil_root(remaining, k);
        dims.push(dim);
        remaining = remaining.div_ceil(dim);
    }
    dims
}

/// Smallest x >= 1 with x^k >= n
fn ceil_root(n: u64, k: u32) -> u64 {
    let covers = |x: u64| x.checked_pow(k).map_or(true, |p| p >= n);
    let mut x = ((n as f64).powf(1.0 / k as f64).round() as u64).max(1);
    while !covers(x) {
        x += 1;
    }
    while x > 1 && covers(x - 1) {
        x -= 1;
    }
    x
}
