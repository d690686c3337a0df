use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::{pir_err, Result};

use super::DbHandler;

/// Synthetic database of pseudo-random elements.
///
/// Element `i` is the ChaCha20 key stream for `seed` on stream `i`, so any
/// chunk of any element can be regenerated without materializing the rest.
#[derive(Debug, Clone)]
pub struct DbGenerator {
    num_elements: u64,
    element_bytesize: u64,
    seed: u64,
}

impl DbGenerator {
    pub fn new(num_elements: u64, element_bytesize: u64, seed: u64) -> Self {
        Self {
            num_elements,
            element_bytesize,
            seed,
        }
    }

    /// Full content of element `index`
    pub fn element(&self, index: u64) -> Result<Vec<u8>> {
        self.read_element_chunk(index, 0, self.element_bytesize as usize)
    }
}

impl DbHandler for DbGenerator {
    fn num_elements(&self) -> u64 {
        self.num_elements
    }

    fn max_element_bytesize(&self) -> u64 {
        self.element_bytesize
    }

    fn element_name(&self, index: u64) -> String {
        format!("generated-{}", index)
    }

    fn read_element_chunk(&self, index: u64, offset: u64, len: usize) -> Result<Vec<u8>> {
        if index >= self.num_elements {
            return Err(pir_err!(
                Database,
                "element {} out of range ({} elements)",
                index,
                self.num_elements
            ));
        }

        let mut out = vec![0u8; len];
        if offset >= self.element_bytesize {
            return Ok(out);
        }
        let available = ((self.element_bytesize - offset) as usize).min(len);

        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        rng.set_stream(index);
        rng.set_word_pos((offset / 4) as u128);
        let skip = (offset % 4) as usize;

        let mut buf = vec![0u8; skip + available];
        rng.fill_bytes(&mut buf);
        out[..available].copy_from_slice(&buf[skip..]);
        Ok(out)
    }
}
