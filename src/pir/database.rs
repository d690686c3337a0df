//! Server-side database import
//!
//! Raw elements are read from a [`DbHandler`], grouped into aggregated rows of
//! `aggregation` consecutive elements and cut into plaintext-sized pieces that
//! the cryptosystem encodes once, ahead of any query.

use rayon::prelude::*;
use tracing::debug;

use crate::crypto::HomomorphicCrypto;
use crate::db::DbHandler;
use crate::error::{pir_err, Result};
use crate::params::PirParameters;

/// Encoded database (or one chunk of every element) ready for reply generation
pub struct ImportedDatabase<P> {
    params: PirParameters,
    offset: u64,
    rows: Vec<Vec<P>>,
}

impl<P: Send> ImportedDatabase<P> {
    /// Read bytes `[offset, offset + len)` of every element and encode them.
    ///
    /// `params` describes the full database; the imported chunk is described
    /// by `params.for_chunk(len)`.
    pub fn import<C, D>(
        params: &PirParameters,
        crypto: &C,
        db: &D,
        offset: u64,
        len: u64,
    ) -> Result<Self>
    where
        C: HomomorphicCrypto<Plaintext = P>,
        D: DbHandler + ?Sized,
    {
        let chunk_params = params.for_chunk(len)?;
        if db.num_elements() < params.num_elements() {
            return Err(pir_err!(
                Database,
                "database has {} elements, parameters expect {}",
                db.num_elements(),
                params.num_elements()
            ));
        }

        let num_elements = params.num_elements();
        let aggregation = params.aggregation();
        let pt_bytes = crypto.plaintext_bytesize();
        let row_bytes = chunk_params.row_bytesize() as usize;
        debug!(
            "Importing {} rows of {} bytes (offset {}, {} plaintexts per row)",
            chunk_params.num_rows(),
            row_bytes,
            offset,
            chunk_params.polys_per_row()
        );

        let rows = (0..chunk_params.num_rows())
            .into_par_iter()
            .map(|row| -> Result<Vec<P>> {
                let mut bytes = Vec::with_capacity(row_bytes);
                for index in row * aggregation..(row + 1) * aggregation {
                    if index < num_elements {
                        bytes.extend(db.read_element_chunk(index, offset, len as usize)?);
                    } else {
                        bytes.resize(bytes.len() + len as usize, 0);
                    }
                }
                Ok(bytes
                    .chunks(pt_bytes)
                    .map(|piece| crypto.encode_plaintext(piece))
                    .collect())
            })
            .collect::<Result<Vec<Vec<P>>>>()?;

        Ok(Self {
            params: chunk_params,
            offset,
            rows,
        })
    }
}

impl<P> ImportedDatabase<P> {
    /// Layout of the imported chunk
    pub fn params(&self) -> &PirParameters {
        &self.params
    }

    /// Byte offset of the chunk inside each element
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes imported per element
    pub fn bytes_per_element(&self) -> u64 {
        self.params.bytes_per_element()
    }

    /// Encoded plaintexts of aggregated row `row`
    pub fn row(&self, row: usize) -> Option<&[P]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// Number of aggregated rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}
