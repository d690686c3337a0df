use crate::error::{pir_err, Result};

use super::{padded_slice, DbHandler};

/// Database held in memory as one byte vector per element
#[derive(Debug, Clone, Default)]
pub struct DbVectorProcessor {
    elements: Vec<Vec<u8>>,
    max_element_bytesize: u64,
}

impl DbVectorProcessor {
    pub fn new(elements: Vec<Vec<u8>>) -> Self {
        let max_element_bytesize = elements.iter().map(|e| e.len() as u64).max().unwrap_or(0);
        Self {
            elements,
            max_element_bytesize,
        }
    }

    /// Borrow element `index`
    pub fn element(&self, index: u64) -> Option<&[u8]> {
        self.elements.get(index as usize).map(Vec::as_slice)
    }
}

impl DbHandler for DbVectorProcessor {
    fn num_elements(&self) -> u64 {
        self.elements.len() as u64
    }

    fn max_element_bytesize(&self) -> u64 {
        self.max_element_bytesize
    }

    fn element_name(&self, index: u64) -> String {
        index.to_string()
    }

    fn read_element_chunk(&self, index: u64, offset: u64, len: usize) -> Result<Vec<u8>> {
        let element = self.element(index).ok_or_else(|| {
            pir_err!(
                Database,
                "element {} out of range ({} elements)",
                index,
                self.elements.len()
            )
        })?;
        Ok(padded_slice(element, offset, len))
    }
}
