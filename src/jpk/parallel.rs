use rayon::prelude::*;

use crate::error::{AfmError, Result};

use super::archive::JpkArchive;

impl JpkArchive {
    /// Decode the approach heights of every curve on the rayon pool.
    ///
    /// Each worker opens its own archive handle; only the header tables are
    /// shared between workers.
    pub(crate) fn approach_end_heights(&self) -> Result<Vec<f64>> {
        (0..self.curve_count())
            .into_par_iter()
            .map_init(
                || self.open_archive(),
                |archive, index| match archive {
                    Ok(archive) => self.approach_end_height(archive, index),
                    Err(e) => Err(AfmError::InvalidStructure(format!(
                        "cannot reopen archive: {}",
                        e
                    ))),
                },
            )
            .collect()
    }
}
