//! Bit packing between byte strings and bounded polynomial coefficients.
//!
//! Bytes are read as one little-endian bit stream and cut into `bits`-wide
//! coefficients, so `n` coefficients carry exactly `n * bits / 8` bytes when
//! `n * bits` is a multiple of 8.

/// Pack `bytes` into `n` coefficients of `bits` bits each (LSB first).
///
/// Missing input bits are zero. Panics if the bytes do not fit.
pub fn bytes_to_coeffs(bytes: &[u8], bits: u32, n: usize) -> Vec<u64> {
    assert!((1..=56).contains(&bits), "coefficient width out of range");
    assert!(
        bytes.len() * 8 <= n * bits as usize,
        "{} bytes do not fit in {} coefficients of {} bits",
        bytes.len(),
        n,
        bits
    );

    let mask = (1u64 << bits) - 1;
    let mut coeffs = Vec::with_capacity(n);
    let mut acc = 0u64;
    let mut acc_bits = 0u32;
    let mut input = bytes.iter();

    for _ in 0..n {
        while acc_bits < bits {
            match input.next() {
                Some(&b) => {
                    acc |= (b as u64) << acc_bits;
                    acc_bits += 8;
                }
                None => {
                    acc_bits = bits;
                }
            }
        }
        coeffs.push(acc & mask);
        acc >>= bits;
        acc_bits -= bits;
    }
    coeffs
}

/// Unpack the low `bits` bits of every coefficient into `num_bytes` bytes.
pub fn coeffs_to_bytes(coeffs: &[u64], bits: u32, num_bytes: usize) -> Vec<u8> {
    assert!((1..=56).contains(&bits), "coefficient width out of range");
    assert!(
        num_bytes * 8 <= coeffs.len() * bits as usize,
        "{} coefficients of {} bits hold fewer than {} bytes",
        coeffs.len(),
        bits,
        num_bytes
    );

    let mask = (1u64 << bits) - 1;
    let mut bytes = Vec::with_capacity(num_bytes);
    let mut acc = 0u64;
    let mut acc_bits = 0u32;
    let mut input = coeffs.iter();

    while bytes.len() < num_bytes {
        while acc_bits < 8 {
            match input.next() {
                Some(&c) => {
                    acc |= (c & mask) << acc_bits;
                    acc_bits += bits;
                }
                None => break,
            }
        }
        bytes.push(acc as u8);
        acc >>= 8;
        acc_bits = acc_bits.saturating_sub(8);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixteen_bit_layout() {
        let coeffs = bytes_to_coeffs(&[0x34, 0x12, 0xcd, 0xab, 0x01], 16, 4);
        assert_eq!(coeffs, vec![0x1234, 0xabcd, 0x0001, 0]);
    }

    #[test]
    fn test_unaligned_width() {
        // 0b101 | 0b011 << 3 | 0b110 << 6 packs to 0b110_011_101 = 0x19d
        let bytes = coeffs_to_bytes(&[0b101, 0b011, 0b110], 3, 2);
        assert_eq!(bytes, vec![0x9d, 0x01]);
        assert_eq!(bytes_to_coeffs(&bytes, 3, 6)[..3], [0b101, 0b011, 0b110]);
    }

    #[test]
    fn test_high_bits_ignored_on_unpack() {
        let bytes = coeffs_to_bytes(&[0xff_ff01, 0xff_ff02], 8, 2);
        assert_eq!(bytes, vec![0x01, 0x02]);
    }

    #[test]
    fn test_random_bytes_survive_packing() {
        use rand::RngCore;
        let mut data = vec![0u8; 300];
        rand::thread_rng().fill_bytes(&mut data);
        for bits in [5u32, 12, 16, 20] {
            let n = (data.len() * 8).div_ceil(bits as usize);
            let coeffs = bytes_to_coeffs(&data, bits, n);
            assert!(coeffs.iter().all(|&c| c < (1 << bits)));
            assert_eq!(coeffs_to_bytes(&coeffs, bits, data.len()), data);
        }
    }

    #[test]
    #[should_panic]
    fn test_overflow_panics() {
        bytes_to_coeffs(&[0u8; 5], 16, 2);
    }
}
