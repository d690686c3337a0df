//! Cryptosystem without encryption, for exercising the pipeline quickly.
//!
//! A ciphertext is the message coefficient vector itself (mod 2^plaintext_bits)
//! and the encryption of a bit is the vector with every coefficient equal to
//! that bit, so multiplying pointwise by a plaintext selects or clears it.
//! Serialized ciphertexts store each coefficient as a little-endian `u64`,
//! which makes them larger than plaintexts just like real ciphertexts.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{pir_err, Result};
use crate::math::{bytes_to_coeffs, coeffs_to_bytes};

use super::{CryptoParams, HomomorphicCrypto};

/// Shape of the mock message space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockParams {
    /// Coefficients per ciphertext
    pub num_coeffs: usize,
    /// Bits carried by each coefficient
    pub plaintext_bits: u32,
}

impl MockParams {
    pub fn new(num_coeffs: usize, plaintext_bits: u32) -> Self {
        Self {
            num_coeffs,
            plaintext_bits,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_coeffs == 0 {
            return Err(pir_err!(InvalidParameters, "mock ciphertexts need coefficients"));
        }
        if !(1..=32).contains(&self.plaintext_bits)
            || (self.num_coeffs * self.plaintext_bits as usize) % 8 != 0
        {
            return Err(pir_err!(
                InvalidParameters,
                "{} coefficients of {} bits do not fill whole bytes",
                self.num_coeffs,
                self.plaintext_bits
            ));
        }
        Ok(())
    }

    pub fn plaintext_bytesize(&self) -> usize {
        self.num_coeffs * self.plaintext_bits as usize / 8
    }

    pub fn ciphertext_bytesize(&self) -> usize {
        8 * self.num_coeffs
    }

    fn mask(&self) -> u64 {
        (1u64 << self.plaintext_bits) - 1
    }
}

/// Pass-through backend over [`MockParams`]
#[derive(Debug, Clone)]
pub struct MockCrypto {
    params: MockParams,
}

impl MockCrypto {
    pub fn new(params: MockParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl HomomorphicCrypto for MockCrypto {
    type Ciphertext = Vec<u64>;
    type Plaintext = Vec<u64>;
    type PreparedCiphertext = Vec<u64>;

    fn crypto_params(&self) -> CryptoParams {
        CryptoParams::Mock(self.params.clone())
    }

    fn ciphertext_bytesize(&self) -> usize {
        self.params.ciphertext_bytesize()
    }

    fn plaintext_bytesize(&self) -> usize {
        self.params.plaintext_bytesize()
    }

    fn encrypt_bit(&self, bit: bool) -> Vec<u64> {
        vec![bit as u64; self.params.num_coeffs]
    }

    fn decrypt(&self, ct: &Vec<u64>) -> Vec<u8> {
        coeffs_to_bytes(ct, self.params.plaintext_bits, self.plaintext_bytesize())
    }

    fn add(&self, a: &Vec<u64>, b: &Vec<u64>) -> Vec<u64> {
        let mask = self.params.mask();
        a.iter().zip(b).map(|(x, y)| (x + y) & mask).collect()
    }

    fn scalar_mul(&self, ct: &Vec<u64>, pt: &Vec<u64>) -> Vec<u64> {
        let mask = self.params.mask();
        ct.iter().zip(pt).map(|(x, y)| x.wrapping_mul(*y) & mask).collect()
    }

    fn encode_plaintext(&self, bytes: &[u8]) -> Vec<u64> {
        bytes_to_coeffs(bytes, self.params.plaintext_bits, self.params.num_coeffs)
    }

    fn serialize(&self, ct: &Vec<u64>) -> Vec<u8> {
        let mut bytes = vec![0u8; self.ciphertext_bytesize()];
        LittleEndian::write_u64_into(ct, &mut bytes);
        bytes
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u64>> {
        if bytes.len() != self.ciphertext_bytesize() {
            return Err(pir_err!(
                MalformedCiphertext,
                "expected {} bytes, got {}",
                self.ciphertext_bytesize(),
                bytes.len()
            ));
        }
        let mut ct = vec![0u64; self.params.num_coeffs];
        LittleEndian::read_u64_into(bytes, &mut ct);
        if let Some(pos) = ct.iter().position(|&c| c > self.params.mask()) {
            return Err(pir_err!(
                MalformedCiphertext,
                "coefficient {} exceeds {} bits",
                pos,
                self.params.plaintext_bits
            ));
        }
        Ok(ct)
    }

    fn prepare(&self, ct: &Vec<u64>) -> Vec<u64> {
        ct.clone()
    }

    fn dot_product(&self, query: &[Vec<u64>], rows: &[Option<&Vec<u64>>]) -> Vec<u64> {
        assert_eq!(query.len(), rows.len(), "one plaintext slot per query element");
        let zero = vec![0u64; self.params.num_coeffs];
        query
            .iter()
            .zip(rows)
            .filter_map(|(sel, row)| (*row).map(|row| self.scalar_mul(sel, row)))
            .fold(zero, |acc, term| self.add(&acc, &term))
    }
}
